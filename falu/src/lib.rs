mod app;
mod background;
pub mod cli;
pub mod commands;
pub mod console;
pub mod logging;
pub mod realtime;
pub mod validators;

pub use app::{request_options, App};
pub use background::forwarder::{sign_payload, EventForwarder, SIGNATURE_HEADER};
pub use background::BackgroundTaskManager;

// Always expose testing module (integration tests need it)
pub mod testing;
