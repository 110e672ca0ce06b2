use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use gtk4::gio;
use gtk4::prelude::*;

use super::render::show_system;
use super::state::{AppState, BackendEvent};

/// Ask for a document and insert its text into the input box.
pub fn upload_file(state: &Rc<RefCell<AppState>>) {
    let Some(window) = state.borrow().window.as_ref().map(|w| w.window.clone()) else {
        return;
    };

    let documents = gtk4::FileFilter::new();
    documents.set_name(Some("Documents (*.txt *.docx *.pdf)"));
    for suffix in crate::ingest::SUFFIXES {
        documents.add_suffix(suffix);
    }
    let all = gtk4::FileFilter::new();
    all.set_name(Some("All Files (*)"));
    all.add_pattern("*");

    let filters = gio::ListStore::new::<gtk4::FileFilter>();
    filters.append(&documents);
    filters.append(&all);

    let dialog = gtk4::FileDialog::builder()
        .title("Upload File")
        .modal(true)
        .build();
    dialog.set_filters(Some(&filters));
    dialog.set_default_filter(Some(&documents));

    let state_clone = state.clone();
    dialog.open(Some(&window), gio::Cancellable::NONE, move |result| {
        match result {
            Ok(file) => match file.path() {
                Some(path) => dispatch_extraction(&state_clone, path),
                None => show_system(&state_clone, "Only local files can be uploaded"),
            },
            Err(e) => log::info!("File dialog closed: {e}"),
        }
    });
}

/// Extract text on a blocking worker so large PDFs don't freeze the UI.
fn dispatch_extraction(state: &Rc<RefCell<AppState>>, path: PathBuf) {
    let s = state.borrow();
    let sender = s.backend_sender.clone();

    s.tokio_rt.spawn(async move {
        let result =
            tokio::task::spawn_blocking(move || crate::ingest::extract_text(&path)).await;
        let event = match result {
            Ok(Ok(text)) => BackendEvent::FileExtracted(text),
            Ok(Err(e)) => BackendEvent::FileFailed(e.to_string()),
            Err(e) => BackendEvent::FileFailed(format!("Extraction task panicked: {e}")),
        };
        let _ = sender.send(event).await;
    });
}

pub fn on_file_extracted(state: &Rc<RefCell<AppState>>, text: &str) {
    log::info!("Inserted {} chars from upload", text.len());
    if let Some(buffer) = state.borrow().window.as_ref().map(|w| w.input_view.buffer()) {
        buffer.insert_at_cursor(text);
    }
}

pub fn on_file_failed(state: &Rc<RefCell<AppState>>, error: &str) {
    log::warn!("Upload failed: {error}");
    show_system(state, error);
}
