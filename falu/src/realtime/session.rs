use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancellation for one streaming session: fires when the caller cancels or
/// when the negotiated token expires, whichever comes first.
pub struct SessionDeadline {
    token: CancellationToken,
    expired: Arc<AtomicBool>,
    timer: Option<JoinHandle<()>>,
}

impl SessionDeadline {
    pub fn new(parent: &CancellationToken, expires: DateTime<Utc>) -> Self {
        Self::starting_at(parent, expires, Utc::now())
    }

    pub fn starting_at(parent: &CancellationToken, expires: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let token = parent.child_token();
        let expired = Arc::new(AtomicBool::new(false));

        let timer = match (expires - now).to_std() {
            Ok(remaining) if !remaining.is_zero() => {
                let token = token.clone();
                let expired = expired.clone();
                Some(tokio::spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => {}
                        _ = tokio::time::sleep(remaining) => {
                            expired.store(true, Ordering::SeqCst);
                            token.cancel();
                        }
                    }
                }))
            }
            // Already past
            _ => {
                expired.store(true, Ordering::SeqCst);
                token.cancel();
                None
            }
        };

        Self {
            token,
            expired,
            timer,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Whether cancellation came from the deadline rather than the caller
    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }
}

impl Drop for SessionDeadline {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
