//! Command-line argument parsing with clap.

use clap::{Args, Parser, Subcommand};
use reqwest::Url;

use crate::validators::{
    parse_event_type, parse_http_method, parse_ip_address, parse_request_path, parse_source,
    parse_status_code, parse_url, parse_webhook_endpoint_id, parse_workspace_id,
};

/// Falu command-line client.
#[derive(Parser, Debug, Clone)]
#[command(name = "falu")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Workspace to act on (defaults to the one saved at login).
    #[arg(long, global = true, value_parser = parse_workspace_id)]
    pub workspace: Option<String>,

    /// Use live mode instead of test mode.
    #[arg(long, global = true, num_args = 0..=1, default_missing_value = "true")]
    pub live: Option<bool>,

    /// API key to use instead of the credentials saved at login.
    #[arg(long, global = true, env = "FALU_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Log in through the browser using a device code.
    Login(LoginArgs),

    /// Remove saved credentials.
    Logout,

    /// Work with events.
    Events {
        #[command(subcommand)]
        command: EventsCommands,
    },

    /// Work with request logs.
    Logs {
        #[command(subcommand)]
        command: LogsCommands,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct LoginArgs {
    /// Print the verification URL instead of opening a browser.
    #[arg(long)]
    pub no_browser: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum EventsCommands {
    /// Stream events as they happen, optionally forwarding them to a local URL.
    Listen(ListenArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListenArgs {
    /// Only receive events of this type (repeatable).
    #[arg(long = "event-type", value_name = "TYPE", value_parser = parse_event_type)]
    pub event_types: Vec<String>,

    /// Take event types, target URL and signing secret from this webhook endpoint.
    #[arg(long, value_name = "ID", value_parser = parse_webhook_endpoint_id)]
    pub webhook_endpoint: Option<String>,

    /// URL to POST received events to.
    #[arg(long, value_name = "URL", value_parser = parse_url)]
    pub forward_to: Option<Url>,

    /// Do not validate TLS certificates when forwarding.
    #[arg(long)]
    pub skip_validation: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum LogsCommands {
    /// Stream request logs as they happen.
    Tail(TailArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct TailArgs {
    /// Only show requests from this IP address or network (repeatable).
    #[arg(long = "ip-address", value_name = "IP", value_parser = parse_ip_address)]
    pub ip_addresses: Vec<String>,

    /// Only show requests with this HTTP method (repeatable).
    #[arg(long = "http-method", value_name = "METHOD", value_parser = parse_http_method)]
    pub http_methods: Vec<String>,

    /// Only show requests to this path (repeatable).
    #[arg(long = "request-path", value_name = "PATH", value_parser = parse_request_path)]
    pub request_paths: Vec<String>,

    /// Only show requests with this response status (repeatable).
    #[arg(long = "status-code", value_name = "CODE", value_parser = parse_status_code)]
    pub status_codes: Vec<u16>,

    /// Only show requests from this source (repeatable).
    #[arg(long = "source", value_name = "SOURCE", value_parser = parse_source)]
    pub sources: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_help_does_not_panic() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_login_defaults() {
        let cli = Cli::parse_from(["falu", "login"]);
        match cli.command {
            Commands::Login(args) => assert!(!args.no_browser),
            _ => panic!("expected login command"),
        }
        assert_eq!(cli.workspace, None);
        assert_eq!(cli.live, None);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parse_globals_after_subcommand() {
        let cli = Cli::parse_from([
            "falu",
            "logs",
            "tail",
            "--workspace",
            "wksp_123",
            "--live",
            "-vv",
        ]);
        assert_eq!(cli.workspace.as_deref(), Some("wksp_123"));
        assert_eq!(cli.live, Some(true));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn parse_live_false() {
        let cli = Cli::parse_from(["falu", "--live", "false", "logout"]);
        assert_eq!(cli.live, Some(false));
    }

    #[test]
    fn parse_events_listen() {
        let cli = Cli::parse_from([
            "falu",
            "events",
            "listen",
            "--event-type",
            "message.delivered",
            "--event-type",
            "message.failed",
            "--forward-to",
            "http://localhost:3000/webhooks",
            "--skip-validation",
        ]);
        match cli.command {
            Commands::Events {
                command: EventsCommands::Listen(args),
            } => {
                assert_eq!(args.event_types, vec!["message.delivered", "message.failed"]);
                assert_eq!(
                    args.forward_to.unwrap().as_str(),
                    "http://localhost:3000/webhooks"
                );
                assert!(args.skip_validation);
                assert!(args.webhook_endpoint.is_none());
            }
            _ => panic!("expected events listen command"),
        }
    }

    #[test]
    fn parse_logs_tail_filters() {
        let cli = Cli::parse_from([
            "falu",
            "logs",
            "tail",
            "--http-method",
            "post",
            "--status-code",
            "400",
            "--status-code",
            "500",
            "--request-path",
            "/v1/messages",
        ]);
        match cli.command {
            Commands::Logs {
                command: LogsCommands::Tail(args),
            } => {
                assert_eq!(args.http_methods, vec!["POST"]);
                assert_eq!(args.status_codes, vec![400, 500]);
                assert_eq!(args.request_paths, vec!["/v1/messages"]);
                assert!(args.ip_addresses.is_empty());
            }
            _ => panic!("expected logs tail command"),
        }
    }

    #[test]
    fn reject_invalid_values() {
        assert!(Cli::try_parse_from(["falu", "logs", "tail", "--status-code", "700"]).is_err());
        assert!(Cli::try_parse_from(["falu", "events", "listen", "--forward-to", "ftp://x"]).is_err());
        assert!(Cli::try_parse_from(["falu", "--workspace", "acme", "logout"]).is_err());
    }
}
