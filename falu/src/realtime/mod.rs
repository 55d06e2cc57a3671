//! Realtime streaming: negotiation, the websocket transport, the
//! subscribe/receive protocol and the lifetime of one streaming session.

mod channel;
pub mod messages;
mod session;
pub mod transport;

pub use channel::{MessageHandler, RealtimeChannel, SessionEnd};
pub use messages::{ChannelMessage, EventFilters, OutgoingMessage, RequestLogFilters};
pub use session::SessionDeadline;
pub use transport::{CloseCode, Frame, Inbound, Transport, WebSocketTransport};

use falu_api::endpoints::realtime::RealtimeNegotiation;
use falu_api::{Client, FaluApiError, Request};
use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Failed to negotiate realtime connection: {0}")]
    Negotiation(#[from] FaluApiError),

    #[error("Failed to connect to realtime server: {0}")]
    Connect(String),

    #[error("Failed to send realtime message: {0}")]
    Send(String),

    #[error("Failed to receive realtime message: {0}")]
    Receive(String),

    #[error("Failed to encode realtime message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Negotiate a connection for the subscription's purpose and stream until the
/// session ends.
pub async fn stream<H>(
    client: &Client,
    subscription: &OutgoingMessage,
    handler: &mut H,
    cancel: &CancellationToken,
) -> Result<SessionEnd, ChannelError>
where
    H: MessageHandler,
{
    let purpose = subscription.purpose();
    tracing::debug!("Negotiating realtime connection for {}", purpose);

    let negotiation = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
        result = client.send(Request::realtime().negotiate(purpose)) => result?,
    };
    tracing::info!(
        workspace = %negotiation.workspace,
        live = negotiation.live,
        expires = %negotiation.expires,
        "Realtime connection negotiated"
    );

    run_session(
        negotiation,
        |negotiation| async move { WebSocketTransport::connect(&negotiation).await },
        subscription,
        handler,
        cancel,
    )
    .await
}

/// Open a transport with `connect`, subscribe, then run the receive loop
/// until the caller cancels, the negotiation expires or the peer closes.
pub async fn run_session<T, C, Fut, H>(
    negotiation: RealtimeNegotiation,
    connect: C,
    subscription: &OutgoingMessage,
    handler: &mut H,
    cancel: &CancellationToken,
) -> Result<SessionEnd, ChannelError>
where
    T: Transport,
    C: FnOnce(RealtimeNegotiation) -> Fut,
    Fut: Future<Output = Result<T, ChannelError>>,
    H: MessageHandler,
{
    let deadline = SessionDeadline::new(cancel, negotiation.expires);
    let token = deadline.token().clone();

    if token.is_cancelled() {
        log_cancellation(&deadline);
        return Ok(SessionEnd::Cancelled);
    }

    let transport = tokio::select! {
        biased;
        _ = token.cancelled() => {
            log_cancellation(&deadline);
            return Ok(SessionEnd::Cancelled);
        }
        transport = connect(negotiation) => transport?,
    };

    let mut channel = RealtimeChannel::new(transport);

    let sent = tokio::select! {
        biased;
        _ = token.cancelled() => None,
        result = channel.send(subscription) => Some(result),
    };
    match sent {
        Some(result) => result?,
        None => {
            channel.close(CloseCode::Normal, "client closing").await;
            log_cancellation(&deadline);
            return Ok(SessionEnd::Cancelled);
        }
    }
    tracing::info!("Subscribed to {}", subscription.purpose());

    let end = channel.run(handler, &token).await?;
    if end == SessionEnd::Cancelled {
        log_cancellation(&deadline);
    }
    Ok(end)
}

fn log_cancellation(deadline: &SessionDeadline) {
    if deadline.is_expired() {
        tracing::info!("Realtime session expired");
    } else {
        tracing::debug!("Realtime session cancelled");
    }
}
