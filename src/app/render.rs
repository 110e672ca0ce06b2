use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use gtk4::glib;
use gtk4::prelude::*;

use super::speaker::{start_reading, stop_reading};
use super::state::AppState;
use crate::session::Role;
use crate::ui::bubble::{build_message_bubble, build_notice, BubbleWidgets};

/// Append a message bubble to the chat view and wire its buttons.
pub fn render_message(state: &Rc<RefCell<AppState>>, role: Role, text: &str) {
    let bubble = build_message_bubble(role, text);
    connect_bubble(state, &bubble, text);
    append_row(state, &bubble.row);
}

fn connect_bubble(state: &Rc<RefCell<AppState>>, bubble: &BubbleWidgets, text: &str) {
    if let Some(ref copy) = bubble.copy {
        let text = text.to_string();
        copy.connect_clicked(move |button| {
            button.clipboard().set_text(&text);
        });
    }

    if let Some(ref controls) = bubble.read_controls {
        let state_clone = state.clone();
        let text = text.to_string();
        let controls_clone = controls.clone();
        controls.read.connect_clicked(move |_| {
            start_reading(&state_clone, &text, controls_clone.clone());
        });

        let state_clone = state.clone();
        controls.stop.connect_clicked(move |_| {
            stop_reading(&state_clone);
        });
    }
}

/// Show a centered notice (errors, hints). Notices are never stored.
pub fn show_system(state: &Rc<RefCell<AppState>>, text: &str) {
    log::info!("Notice: {text}");
    append_row(state, &build_notice(text));
}

pub fn append_row(state: &Rc<RefCell<AppState>>, row: &gtk4::Box) {
    let s = state.borrow();
    if let Some(ref window) = s.window {
        window.chat_box.append(row);
    }
    drop(s);
    scroll_to_bottom(state);
}

/// Remove a row if it is still in the chat view.
pub fn remove_row(state: &Rc<RefCell<AppState>>, row: &gtk4::Box) {
    let s = state.borrow();
    if let Some(ref window) = s.window {
        if row.parent().as_ref() == Some(window.chat_box.upcast_ref::<gtk4::Widget>()) {
            window.chat_box.remove(row);
        }
    }
}

pub fn clear_chat(state: &Rc<RefCell<AppState>>) {
    let s = state.borrow();
    if let Some(ref window) = s.window {
        while let Some(child) = window.chat_box.first_child() {
            window.chat_box.remove(&child);
        }
    }
}

/// Scroll once the new row has been laid out.
pub fn scroll_to_bottom(state: &Rc<RefCell<AppState>>) {
    let Some(scroll) = state.borrow().window.as_ref().map(|w| w.chat_scroll.clone()) else {
        return;
    };
    glib::timeout_add_local_once(Duration::from_millis(60), move || {
        let adj = scroll.vadjustment();
        adj.set_value(adj.upper() - adj.page_size());
    });
}
