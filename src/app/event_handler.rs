use std::cell::RefCell;
use std::rc::Rc;

use super::chat::{on_chat_chunk, on_chat_complete, on_chat_failed};
use super::files::{on_file_extracted, on_file_failed};
use super::models::{on_models_failed, on_models_loaded};
use super::speaker::on_speech_finished;
use super::state::{AppState, BackendEvent};
use super::voice::{on_transcript, on_voice_failed};

/// Handle a backend event on the GTK main thread.
pub fn handle_backend_event(state: &Rc<RefCell<AppState>>, event: BackendEvent) {
    match event {
        BackendEvent::ModelsLoaded(models) => on_models_loaded(state, models),
        BackendEvent::ModelsFailed(err) => on_models_failed(state, err),
        BackendEvent::ChatChunk { chat_id, text } => on_chat_chunk(state, chat_id, &text),
        BackendEvent::ChatComplete {
            chat_id,
            session_id,
            text,
        } => on_chat_complete(state, chat_id, session_id, text),
        BackendEvent::ChatFailed {
            chat_id,
            error,
            offline,
        } => on_chat_failed(state, chat_id, &error, offline),
        BackendEvent::TranscriptReady(text) => on_transcript(state, &text),
        BackendEvent::VoiceFailed(err) => on_voice_failed(state, &err),
        BackendEvent::FileExtracted(text) => on_file_extracted(state, &text),
        BackendEvent::FileFailed(err) => on_file_failed(state, &err),
        BackendEvent::SpeechFinished(id) => on_speech_finished(state, id),
    }
}
