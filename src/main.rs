mod app;
mod config;
mod ingest;
mod ollama;
mod recorder;
mod session;
mod speech;
mod tts;
mod ui;

use std::cell::RefCell;
use std::rc::Rc;

use gtk4::prelude::*;

use app::{AppState, BackendEvent};

fn main() {
    env_logger::init();
    log::info!("Local AI Assistant starting");

    let application = libadwaita::Application::builder()
        .application_id("io.github.local_assistant.LocalAssistant")
        .build();

    application.connect_activate(on_activate);
    application.run();
}

fn on_activate(app: &libadwaita::Application) {
    // Background work → UI thread
    let (backend_tx, backend_rx) = async_channel::unbounded::<BackendEvent>();

    let state = Rc::new(RefCell::new(AppState::new(backend_tx)));

    let initial_status = state.borrow().status.label();
    let widgets = ui::window::build_main_window(app, &initial_status);

    {
        let state_clone = state.clone();
        widgets.new_chat_button.connect_clicked(move |_| {
            app::start_new_chat(&state_clone, true);
        });
    }

    {
        let state_clone = state.clone();
        widgets.session_list.connect_row_activated(move |_, row| {
            app::on_session_activated(&state_clone, row.index());
        });
    }

    {
        let state_clone = state.clone();
        widgets.upload_button.connect_clicked(move |_| {
            app::upload_file(&state_clone);
        });
    }

    {
        let state_clone = state.clone();
        widgets.voice_start_button.connect_clicked(move |_| {
            app::start_voice(&state_clone);
        });
    }

    {
        let state_clone = state.clone();
        widgets.voice_stop_button.connect_clicked(move |_| {
            app::stop_voice(&state_clone);
        });
    }

    {
        let state_clone = state.clone();
        widgets.model_dropdown.connect_selected_notify(move |dropdown| {
            app::on_model_selected(&state_clone, dropdown.selected());
        });
    }

    {
        let state_clone = state.clone();
        widgets.refresh_button.connect_clicked(move |_| {
            app::refresh_models(&state_clone);
        });
    }

    {
        let state_clone = state.clone();
        widgets.send_button.connect_clicked(move |_| {
            app::send_message(&state_clone);
        });
    }

    // Don't leave a speech engine talking after the window is gone
    {
        let state_clone = state.clone();
        widgets.window.connect_close_request(move |_| {
            app::stop_reading(&state_clone);
            gtk4::glib::Propagation::Proceed
        });
    }

    let window = widgets.window.clone();
    state.borrow_mut().window = Some(widgets);

    // Attach backend event handler
    {
        let state_clone = state.clone();
        gtk4::glib::spawn_future_local(async move {
            while let Ok(event) = backend_rx.recv().await {
                app::handle_backend_event(&state_clone, event);
            }
        });
    }

    app::start_new_chat(&state, false);
    app::refresh_models(&state);

    window.present();
}
