use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use gtk4::prelude::*;
use uuid::Uuid;

use crate::config::Config;
use crate::ollama::OllamaClient;
use crate::session::SessionList;
use crate::tts::Utterance;
use crate::ui::bubble::ReadControls;
use crate::ui::window::MainWidgets;

/// Events sent from background work to the GTK main thread.
#[derive(Debug, Clone)]
pub enum BackendEvent {
    ModelsLoaded(Vec<String>),
    ModelsFailed(String),
    ChatChunk {
        chat_id: u64,
        text: String,
    },
    ChatComplete {
        chat_id: u64,
        session_id: Uuid,
        text: String,
    },
    ChatFailed {
        chat_id: u64,
        error: String,
        offline: bool,
    },
    TranscriptReady(String),
    VoiceFailed(String),
    FileExtracted(String),
    FileFailed(String),
    SpeechFinished(u64),
}

/// What the status label shows.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Offline(String),
    FetchingModels,
    Online,
    ModelsLoaded,
    NoModels,
    Typing,
    Listening,
    Transcribing,
}

impl Status {
    pub fn label(&self) -> String {
        match self {
            Self::Offline(reason) => format!("\u{1F534} Offline: {reason}"),
            Self::FetchingModels => "\u{1F7E1} Fetching models...".into(),
            Self::Online => "\u{1F7E2} Online".into(),
            Self::ModelsLoaded => "\u{1F7E2} Online - models loaded".into(),
            Self::NoModels => "\u{1F7E1} No models found".into(),
            Self::Typing => "\u{1F7E1} AI typing...".into(),
            Self::Listening => "\u{1F3A4} Listening...".into(),
            Self::Transcribing => "\u{1F7E1} Transcribing...".into(),
        }
    }
}

/// The reply currently streaming into a placeholder bubble.
pub struct ActiveChat {
    pub id: u64,
    pub session_id: Uuid,
    pub cancel: Arc<AtomicBool>,
    pub row: gtk4::Box,
    pub label: gtk4::Label,
    pub text: String,
}

/// The assistant bubble currently being read aloud.
pub struct Speaking {
    pub id: u64,
    pub utterance: Utterance,
    pub controls: ReadControls,
}

/// Central application state. Lives on the GTK main thread inside Rc<RefCell<>>.
pub struct AppState {
    pub status: Status,
    pub config: Config,
    pub sessions: SessionList,
    pub models: Vec<String>,
    pub current_model: Option<String>,
    /// Set while the dropdown is repopulated so its notify handler stays quiet.
    pub populating_models: bool,
    pub ollama: OllamaClient,
    pub tokio_rt: tokio::runtime::Runtime,
    pub backend_sender: async_channel::Sender<BackendEvent>,

    // Chat streaming
    pub next_chat_id: u64,
    pub active_chat: Option<ActiveChat>,

    // Voice capture
    pub audio_buffer: Arc<Mutex<Vec<f32>>>,
    pub cpal_stream: Option<cpal::Stream>,
    pub sample_rate: u32,

    // Read-aloud
    pub next_speech_id: u64,
    pub speaking: Option<Speaking>,

    // UI handles
    pub window: Option<MainWidgets>,
}

impl AppState {
    pub fn new(sender: async_channel::Sender<BackendEvent>) -> Self {
        let config = Config::load();
        log::info!("Using Ollama at {}", config.server_url());
        let ollama = OllamaClient::new(config.server_url());
        let tokio_rt = tokio::runtime::Runtime::new()
            .expect("Failed to create tokio runtime");

        Self {
            status: Status::Offline("not connected".into()),
            config,
            sessions: SessionList::default(),
            models: Vec::new(),
            current_model: None,
            populating_models: false,
            ollama,
            tokio_rt,
            backend_sender: sender,
            next_chat_id: 0,
            active_chat: None,
            audio_buffer: Arc::new(Mutex::new(Vec::new())),
            cpal_stream: None,
            sample_rate: 16000,
            next_speech_id: 0,
            speaking: None,
            window: None,
        }
    }
}

/// Helper to update status label and state.
pub fn update_status(state: &Rc<RefCell<AppState>>, status: Status) {
    let mut s = state.borrow_mut();
    if let Some(ref window) = s.window {
        window.status_label.set_text(&status.label());
    }
    s.status = status;
}
