mod chat;
mod event_handler;
mod files;
mod models;
mod render;
mod sessions;
mod speaker;
mod state;
mod voice;

pub use chat::send_message;
pub use event_handler::handle_backend_event;
pub use files::upload_file;
pub use models::{on_model_selected, refresh_models};
pub use sessions::{on_session_activated, start_new_chat};
pub use speaker::stop_reading;
pub use state::{AppState, BackendEvent};
pub use voice::{start_voice, stop_voice};
