use std::cell::RefCell;
use std::rc::Rc;

use gtk4::prelude::*;

use super::render::show_system;
use super::state::{update_status, AppState, BackendEvent, Status};
use crate::speech::{transcript_insertion, SpeechClient};

/// Start capturing from the microphone. Ignored while already listening.
pub fn start_voice(state: &Rc<RefCell<AppState>>) {
    if state.borrow().cpal_stream.is_some() {
        log::info!("Already listening");
        return;
    }
    log::info!("Starting voice capture");

    let buffer = state.borrow().audio_buffer.clone();
    match buffer.lock() {
        Ok(mut samples) => samples.clear(),
        Err(e) => log::warn!("Audio buffer poisoned: {e}"),
    }

    match crate::recorder::start_capture(buffer) {
        Ok((stream, sample_rate)) => {
            {
                let mut s = state.borrow_mut();
                s.cpal_stream = Some(stream);
                s.sample_rate = sample_rate;
            }
            update_status(state, Status::Listening);
        }
        Err(e) => {
            log::error!("Failed to start recording: {e}");
            show_system(state, &format!("Microphone error: {e}"));
        }
    }
}

/// Stop capturing and submit what was recorded for recognition.
pub fn stop_voice(state: &Rc<RefCell<AppState>>) {
    let Some(stream) = state.borrow_mut().cpal_stream.take() else {
        return;
    };
    drop(stream);
    log::info!("Stopped voice capture");

    let samples: Vec<f32> = {
        let s = state.borrow();
        let taken = match s.audio_buffer.lock() {
            Ok(mut buf) => std::mem::take(&mut *buf),
            Err(_) => Vec::new(),
        };
        taken
    };

    if samples.is_empty() {
        update_status(state, Status::Online);
        show_system(state, "No audio captured");
        return;
    }

    let sample_rate = state.borrow().sample_rate;
    log::info!(
        "Captured {} samples ({:.1}s at {}Hz)",
        samples.len(),
        samples.len() as f32 / sample_rate as f32,
        sample_rate
    );
    update_status(state, Status::Transcribing);
    dispatch_recognition(state, samples, sample_rate);
}

/// Encode and submit the utterance on the tokio runtime.
fn dispatch_recognition(state: &Rc<RefCell<AppState>>, samples: Vec<f32>, sample_rate: u32) {
    let s = state.borrow();
    let client = SpeechClient::new(s.config.speech.clone());
    let sender = s.backend_sender.clone();

    s.tokio_rt.spawn(async move {
        let encoded = tokio::task::spawn_blocking(move || {
            crate::recorder::encode_utterance(&samples, sample_rate)
        })
        .await;

        let event = match encoded {
            Ok(Ok(Some(wav))) => match client.recognize(&wav, sample_rate).await {
                Ok(text) => BackendEvent::TranscriptReady(text),
                Err(e) => BackendEvent::VoiceFailed(e.to_string()),
            },
            Ok(Ok(None)) => BackendEvent::VoiceFailed("No audio captured".into()),
            Ok(Err(e)) => BackendEvent::VoiceFailed(format!("Could not encode audio: {e}")),
            Err(e) => BackendEvent::VoiceFailed(format!("Encoding task panicked: {e}")),
        };
        let _ = sender.send(event).await;
    });
}

/// Insert a recognized transcript into the input box.
pub fn on_transcript(state: &Rc<RefCell<AppState>>, transcript: &str) {
    log::info!("Transcript: {transcript}");
    if let Some(buffer) = state.borrow().window.as_ref().map(|w| w.input_view.buffer()) {
        if let Some(text) = transcript_insertion(buffer.char_count() > 0, transcript) {
            buffer.insert_at_cursor(&text);
        }
    }
    update_status(state, Status::Online);
}

pub fn on_voice_failed(state: &Rc<RefCell<AppState>>, error: &str) {
    log::error!("Voice input failed: {error}");
    show_system(state, &format!("Voice error: {error}"));
    update_status(state, Status::Online);
}
