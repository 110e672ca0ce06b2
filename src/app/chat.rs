use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gtk4::prelude::*;
use uuid::Uuid;

use super::render::{append_row, remove_row, render_message, scroll_to_bottom, show_system};
use super::sessions::refresh_session_list;
use super::state::{update_status, ActiveChat, AppState, BackendEvent, Status};
use crate::session::{ChatMessage, Role};
use crate::ui::bubble::build_placeholder_bubble;

/// Send the input box contents to the current model and stream the reply.
pub fn send_message(state: &Rc<RefCell<AppState>>) {
    let Some(buffer) = state.borrow().window.as_ref().map(|w| w.input_view.buffer()) else {
        return;
    };
    let (start, end) = buffer.bounds();
    let user_text = buffer.text(&start, &end, false).trim().to_string();
    if user_text.is_empty() {
        return;
    }

    let Some(model) = state.borrow().current_model.clone() else {
        show_system(state, "Select a model first");
        return;
    };

    cancel_active_chat(state);

    let Some(session_id) = state.borrow().sessions.current_id() else {
        return;
    };
    let (title_changed, history) = {
        let mut s = state.borrow_mut();
        let Some(session) = s.sessions.get_mut(session_id) else {
            return;
        };
        let changed = session.push(ChatMessage::new(Role::User, user_text.clone()));
        (changed, session.messages.clone())
    };
    if title_changed {
        refresh_session_list(state);
    }
    render_message(state, Role::User, &user_text);
    buffer.set_text("");

    let placeholder = build_placeholder_bubble();
    append_row(state, &placeholder.row);

    let cancel = Arc::new(AtomicBool::new(false));
    let chat_id = {
        let mut s = state.borrow_mut();
        s.next_chat_id += 1;
        let chat_id = s.next_chat_id;
        s.active_chat = Some(ActiveChat {
            id: chat_id,
            session_id,
            cancel: cancel.clone(),
            row: placeholder.row,
            label: placeholder.label,
            text: String::new(),
        });
        chat_id
    };
    update_status(state, Status::Typing);

    dispatch_chat(state, chat_id, session_id, model, history, cancel);
}

/// Stream the reply on the tokio runtime, forwarding chunks as events.
fn dispatch_chat(
    state: &Rc<RefCell<AppState>>,
    chat_id: u64,
    session_id: Uuid,
    model: String,
    history: Vec<ChatMessage>,
    cancel: Arc<AtomicBool>,
) {
    let s = state.borrow();
    let client = s.ollama.clone();
    let sender = s.backend_sender.clone();

    s.tokio_rt.spawn(async move {
        let chunk_sender = sender.clone();
        let result = client
            .stream_chat(&model, &history, &cancel, |chunk| {
                let _ = chunk_sender.try_send(BackendEvent::ChatChunk {
                    chat_id,
                    text: chunk.to_string(),
                });
            })
            .await;

        let event = match result {
            Ok(text) => BackendEvent::ChatComplete {
                chat_id,
                session_id,
                text,
            },
            Err(e) => BackendEvent::ChatFailed {
                chat_id,
                offline: e.is_offline(),
                error: e.to_string(),
            },
        };
        let _ = sender.send(event).await;
    });
}

pub fn on_chat_chunk(state: &Rc<RefCell<AppState>>, chat_id: u64, text: &str) {
    {
        let mut s = state.borrow_mut();
        let Some(active) = s.active_chat.as_mut().filter(|a| claims(Some(a.id), chat_id)) else {
            return;
        };
        active.text.push_str(text);
        active.label.set_text(&active.text);
    }
    scroll_to_bottom(state);
}

pub fn on_chat_complete(
    state: &Rc<RefCell<AppState>>,
    chat_id: u64,
    session_id: Uuid,
    text: String,
) {
    let Some(active) = take_active(state, chat_id) else {
        log::debug!("Ignoring completion of stale chat {chat_id}");
        return;
    };
    remove_row(state, &active.row);
    commit_reply(state, session_id, text);
    update_status(state, Status::Online);
}

pub fn on_chat_failed(state: &Rc<RefCell<AppState>>, chat_id: u64, error: &str, offline: bool) {
    let Some(active) = take_active(state, chat_id) else {
        return;
    };
    log::error!("Chat {chat_id} failed: {error}");
    remove_row(state, &active.row);
    show_system(state, &format!("AI Error: {error}"));
    update_status(state, failure_status(offline, error));
}

/// Whether an event tagged `chat_id` belongs to the stream now on screen.
fn claims(active: Option<u64>, chat_id: u64) -> bool {
    active == Some(chat_id)
}

fn failure_status(offline: bool, error: &str) -> Status {
    if offline {
        Status::Offline(error.to_string())
    } else {
        Status::Online
    }
}

fn take_active(state: &Rc<RefCell<AppState>>, chat_id: u64) -> Option<ActiveChat> {
    let mut s = state.borrow_mut();
    if claims(s.active_chat.as_ref().map(|a| a.id), chat_id) {
        s.active_chat.take()
    } else {
        None
    }
}

/// Store an assistant reply and render it if its session is on screen.
fn commit_reply(state: &Rc<RefCell<AppState>>, session_id: Uuid, text: String) {
    let on_screen = {
        let mut s = state.borrow_mut();
        let Some(session) = s.sessions.get_mut(session_id) else {
            return;
        };
        session.push(ChatMessage::new(Role::Assistant, text.clone()));
        s.sessions.current_id() == Some(session_id)
    };
    if on_screen {
        render_message(state, Role::Assistant, &text);
    }
}

/// Stop the in-flight stream. Whatever already arrived is kept as the reply.
pub fn cancel_active_chat(state: &Rc<RefCell<AppState>>) {
    let active = state.borrow_mut().active_chat.take();
    let Some(active) = active else {
        return;
    };
    log::info!("Cancelling chat {}", active.id);
    active.cancel.store(true, Ordering::Relaxed);
    remove_row(state, &active.row);
    if !active.text.is_empty() {
        commit_reply(state, active.session_id, active.text);
    }
    update_status(state, Status::Online);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_current_stream_is_claimed() {
        assert!(claims(Some(3), 3));
        // superseded stream
        assert!(!claims(Some(4), 3));
        // cancelled, nothing active
        assert!(!claims(None, 3));
    }

    #[test]
    fn failure_status_follows_offline_flag() {
        let status = failure_status(true, "Ollama is not reachable at http://localhost:11434");
        assert_eq!(
            status,
            Status::Offline("Ollama is not reachable at http://localhost:11434".into())
        );
        assert_eq!(failure_status(false, "model not found"), Status::Online);
    }

    #[test]
    fn stale_failure_is_dropped_after_new_send() {
        // A failure from chat 1 arriving after chat 2 started must not touch status.
        let mut shown = Vec::new();
        for (chat_id, error) in [(1, "connection refused"), (2, "connection refused")] {
            if claims(Some(2), chat_id) {
                shown.push(failure_status(true, error));
            }
        }
        assert_eq!(shown, [Status::Offline("connection refused".into())]);
    }
}
