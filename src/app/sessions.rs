use std::cell::RefCell;
use std::rc::Rc;

use gtk4::prelude::*;

use super::render::{clear_chat, render_message};
use super::state::AppState;
use crate::session::Role;

const GREETING: &str = "Hello! How can I help you?";

/// Start an empty session at the top of the sidebar and switch to it.
/// The greeting bubble is display-only and never sent to the model.
pub fn start_new_chat(state: &Rc<RefCell<AppState>>, greet: bool) {
    let id = state.borrow_mut().sessions.new_session();
    log::info!("New chat session {id}");
    refresh_session_list(state);
    clear_chat(state);
    if greet {
        render_message(state, Role::Assistant, GREETING);
    }
}

/// The user clicked the sidebar row at `index`.
pub fn on_session_activated(state: &Rc<RefCell<AppState>>, index: i32) {
    let id = {
        let s = state.borrow();
        match usize::try_from(index).ok().and_then(|i| s.sessions.iter().nth(i)) {
            Some(session) => session.id,
            None => return,
        }
    };
    if !state.borrow_mut().sessions.select(id) {
        return;
    }

    clear_chat(state);
    let messages = state
        .borrow()
        .sessions
        .current()
        .map(|s| s.messages.clone())
        .unwrap_or_default();
    for message in messages {
        render_message(state, message.role, &message.content);
    }
}

/// Rebuild the sidebar rows from the session list, newest first.
pub fn refresh_session_list(state: &Rc<RefCell<AppState>>) {
    let s = state.borrow();
    let Some(ref window) = s.window else {
        return;
    };
    let list = &window.session_list;
    list.remove_all();

    for session in s.sessions.iter() {
        let label = gtk4::Label::new(Some(&session.title));
        label.set_xalign(0.0);
        label.set_ellipsize(gtk4::pango::EllipsizeMode::End);
        label.set_tooltip_text(Some(&session.created_at.format("%Y-%m-%d %H:%M").to_string()));
        let row = gtk4::ListBoxRow::new();
        row.set_child(Some(&label));
        list.append(&row);
        if Some(session.id) == s.sessions.current_id() {
            list.select_row(Some(&row));
        }
    }
}
