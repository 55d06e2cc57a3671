use anyhow::Context;
use async_trait::async_trait;
use falu_api::endpoints::request_logs::RequestLog;
use falu_api::Client;
use tokio_util::sync::CancellationToken;

use crate::cli::TailArgs;
use crate::console::{Console, TIMESTAMP_FORMAT};
use crate::realtime::{self, ChannelMessage, MessageHandler, OutgoingMessage, RequestLogFilters, SessionEnd};

impl From<&TailArgs> for RequestLogFilters {
    fn from(args: &TailArgs) -> Self {
        Self {
            ip_addresses: Some(args.ip_addresses.clone()),
            methods: Some(args.http_methods.clone()),
            paths: Some(args.request_paths.clone()),
            status_codes: Some(args.status_codes.clone()),
            sources: Some(args.sources.clone()),
        }
    }
}

/// Prints one line per request log
pub struct RequestLogPrinter {
    console: Console,
}

impl RequestLogPrinter {
    pub fn new(console: Console) -> Self {
        Self { console }
    }
}

#[async_trait]
impl MessageHandler for RequestLogPrinter {
    async fn handle(
        &mut self,
        message: ChannelMessage,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let object = match message {
            ChannelMessage::RequestLog(object) => object,
            other => {
                tracing::debug!("Ignoring {} message on the request log channel", other.kind());
                return Ok(());
            }
        };

        let log: RequestLog = serde_json::from_value(object).context("Malformed request log")?;
        self.console.line(format!(
            "{} [{}] {} {} [{}]",
            log.created.format(TIMESTAMP_FORMAT),
            log.status_code,
            log.method,
            log.path,
            log.id
        ));
        Ok(())
    }
}

pub struct LogsTailCommand {
    client: Client,
    console: Console,
}

impl LogsTailCommand {
    pub fn new(client: Client, console: Console) -> Self {
        Self { client, console }
    }

    pub async fn execute(
        &self,
        args: &TailArgs,
        cancel: &CancellationToken,
    ) -> anyhow::Result<SessionEnd> {
        let subscription = OutgoingMessage::subscribe_request_logs(RequestLogFilters::from(args));
        let mut printer = RequestLogPrinter::new(self.console.clone());

        tracing::info!("Tailing request logs (Ctrl-C to stop)");
        let end = realtime::stream(&self.client, &subscription, &mut printer, cancel).await?;
        super::report_session_end(&end);
        Ok(end)
    }
}
