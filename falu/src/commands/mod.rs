pub mod auth;
pub mod events;
pub mod logs;

pub use events::{EventListener, EventsListenCommand, ListenPlan};
pub use logs::{LogsTailCommand, RequestLogPrinter};

use crate::realtime::SessionEnd;

/// Final log line for a streaming command; every end state is a clean exit
pub(crate) fn report_session_end(end: &SessionEnd) {
    match end {
        SessionEnd::Cancelled => tracing::info!("Stopped streaming"),
        SessionEnd::ClosedByPeer { code, reason } => {
            tracing::info!(?code, %reason, "Realtime server ended the session")
        }
        SessionEnd::ProtocolViolation(detail) => {
            tracing::warn!("Realtime session ended on a protocol error: {}", detail)
        }
    }
}
