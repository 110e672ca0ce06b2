use std::cell::RefCell;
use std::rc::Rc;

use super::render::show_system;
use super::state::{AppState, BackendEvent, Speaking};
use crate::ui::bubble::ReadControls;

/// Read an assistant reply aloud, stopping whatever is currently playing.
pub fn start_reading(state: &Rc<RefCell<AppState>>, text: &str, controls: ReadControls) {
    stop_reading(state);

    let (id, rate, sender) = {
        let mut s = state.borrow_mut();
        s.next_speech_id += 1;
        (s.next_speech_id, s.config.tts.rate, s.backend_sender.clone())
    };

    let finished = move || {
        let _ = sender.try_send(BackendEvent::SpeechFinished(id));
    };

    match crate::tts::speak(text, rate, finished) {
        Ok(utterance) => {
            controls.show_stop();
            state.borrow_mut().speaking = Some(Speaking {
                id,
                utterance,
                controls,
            });
        }
        Err(e) => {
            log::error!("Read aloud failed: {e}");
            show_system(state, &format!("Speech error: {e}"));
        }
    }
}

/// Stop the current read-aloud, if any, and restore its Read button.
pub fn stop_reading(state: &Rc<RefCell<AppState>>) {
    let speaking = state.borrow_mut().speaking.take();
    if let Some(speaking) = speaking {
        speaking.utterance.stop();
        speaking.controls.show_read();
    }
}

/// The engine for utterance `id` exited on its own or after a stop.
pub fn on_speech_finished(state: &Rc<RefCell<AppState>>, id: u64) {
    let mut s = state.borrow_mut();
    if s.speaking.as_ref().is_some_and(|sp| sp.id == id) {
        if let Some(speaking) = s.speaking.take() {
            speaking.controls.show_read();
        }
    }
}
