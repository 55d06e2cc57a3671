use anyhow::Context;
use async_trait::async_trait;
use falu_api::endpoints::events::Event;
use falu_api::endpoints::webhooks::WebhookEndpoint;
use falu_api::{Client, Request};
use reqwest::Url;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::background::forwarder::EventForwarder;
use crate::cli::ListenArgs;
use crate::console::{Console, TIMESTAMP_FORMAT};
use crate::realtime::{self, ChannelMessage, EventFilters, MessageHandler, OutgoingMessage, SessionEnd};

/// How long in-flight forwards may run once the stream has stopped
pub const FORWARD_GRACE: Duration = Duration::from_secs(3);

/// What `events listen` subscribes to and where it forwards
#[derive(Debug, Clone, PartialEq)]
pub struct ListenPlan {
    pub filters: EventFilters,
    pub forward_to: Option<Url>,
    pub secret: Option<String>,
}

impl ListenPlan {
    /// Combine the command options with the webhook endpoint, if one was
    /// named. Explicit options win over the endpoint's settings.
    pub fn resolve(args: &ListenArgs, endpoint: Option<&WebhookEndpoint>) -> anyhow::Result<Self> {
        let types = if !args.event_types.is_empty() {
            args.event_types.clone()
        } else {
            match endpoint {
                Some(endpoint) if !endpoint.receives_all_events() => endpoint.events.clone(),
                _ => Vec::new(),
            }
        };

        let forward_to = match (&args.forward_to, endpoint) {
            (Some(url), _) => Some(url.clone()),
            (None, Some(endpoint)) => Some(
                Url::parse(&endpoint.url)
                    .with_context(|| format!("Webhook endpoint {} has an invalid URL", endpoint.id))?,
            ),
            (None, None) => None,
        };

        Ok(Self {
            filters: EventFilters::new(types),
            forward_to,
            secret: endpoint.and_then(|e| e.secret.clone()),
        })
    }
}

/// Prints each event and hands it to the forwarder when one is configured
pub struct EventListener {
    console: Console,
    forwarder: Option<EventForwarder>,
}

impl EventListener {
    pub fn new(console: Console, forwarder: Option<EventForwarder>) -> Self {
        Self { console, forwarder }
    }

    /// Let in-flight forwards finish within `grace`
    pub async fn shutdown(&mut self, grace: Duration) {
        if let Some(forwarder) = self.forwarder.as_mut() {
            forwarder.shutdown(grace).await;
        }
    }
}

#[async_trait]
impl MessageHandler for EventListener {
    async fn handle(
        &mut self,
        message: ChannelMessage,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let object = match message {
            ChannelMessage::Event(object) => object,
            other => {
                tracing::debug!("Ignoring {} message on the events channel", other.kind());
                return Ok(());
            }
        };

        let event: Event = serde_json::from_value(object.clone()).context("Malformed event")?;
        self.console.line(format!(
            "{} --> {} [{}]",
            event.created.format(TIMESTAMP_FORMAT),
            event.event_type,
            event.id
        ));

        if let Some(forwarder) = self.forwarder.as_mut() {
            // Forward the payload exactly as received
            let body = serde_json::to_vec(&object)?;
            forwarder.forward(event.id, body);
        }
        Ok(())
    }
}

pub struct EventsListenCommand {
    client: Client,
    console: Console,
}

impl EventsListenCommand {
    pub fn new(client: Client, console: Console) -> Self {
        Self { client, console }
    }

    pub async fn execute(
        &self,
        args: &ListenArgs,
        cancel: &CancellationToken,
    ) -> anyhow::Result<SessionEnd> {
        let endpoint = match &args.webhook_endpoint {
            Some(id) => {
                let request = self.client.send(Request::webhooks().get(id.as_str()));
                let endpoint = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
                    endpoint = request => endpoint.with_context(|| format!("Failed to fetch webhook endpoint {id}"))?,
                };
                Some(endpoint)
            }
            None => None,
        };

        let plan = ListenPlan::resolve(args, endpoint.as_ref())?;
        let forwarder = match plan.forward_to {
            Some(url) => {
                tracing::info!("Forwarding events to {}", url);
                Some(EventForwarder::new(
                    url,
                    plan.secret,
                    args.skip_validation,
                    self.console.clone(),
                )?)
            }
            None => None,
        };

        let subscription = OutgoingMessage::subscribe_events(plan.filters);
        let mut listener = EventListener::new(self.console.clone(), forwarder);

        tracing::info!("Listening for events (Ctrl-C to stop)");
        let result = realtime::stream(&self.client, &subscription, &mut listener, cancel).await;
        listener.shutdown(FORWARD_GRACE).await;

        let end = result?;
        super::report_session_end(&end);
        Ok(end)
    }
}
