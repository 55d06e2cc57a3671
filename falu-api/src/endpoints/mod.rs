pub mod events;
pub mod realtime;
pub mod request_logs;
pub mod webhooks;
pub mod workspaces;
