use anyhow::Result;
use falu_api::{Client, RequestOptions};
use falu_auth::{AuthError, CredentialStore, CredentialsFile, OidcClient, Settings};
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Commands, EventsCommands, LogsCommands};
use crate::commands::{self, EventsListenCommand, LogsTailCommand};
use crate::console::Console;

/// Dispatches a parsed command line
pub struct App {
    cli: Cli,
    settings: Settings,
    store: CredentialStore,
}

impl App {
    pub fn new(cli: Cli) -> Result<Self> {
        let settings = Settings::new()?;
        settings
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

        Ok(Self {
            cli,
            settings,
            store: CredentialStore::new()?,
        })
    }

    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        match &self.cli.command {
            Commands::Login(args) => {
                let provider = OidcClient::new(&self.settings)?;
                commands::auth::login(provider, &self.settings, &self.store, args, &cancel).await
            }
            Commands::Logout => commands::auth::logout(&self.store),
            Commands::Events {
                command: EventsCommands::Listen(args),
            } => {
                let Some(client) = self.api_client(&cancel).await? else {
                    return Ok(());
                };
                EventsListenCommand::new(client, Console::stdout())
                    .execute(args, &cancel)
                    .await?;
                Ok(())
            }
            Commands::Logs {
                command: LogsCommands::Tail(args),
            } => {
                let Some(client) = self.api_client(&cancel).await? else {
                    return Ok(());
                };
                LogsTailCommand::new(client, Console::stdout())
                    .execute(args, &cancel)
                    .await?;
                Ok(())
            }
        }
    }

    /// API client authorized by `--api-key` or the saved login, refreshing
    /// the saved tokens when they are about to expire. `None` when cancelled
    /// during the refresh.
    async fn api_client(&self, cancel: &CancellationToken) -> Result<Option<Client>> {
        let credential = match &self.cli.api_key {
            Some(key) => key.clone(),
            None => {
                let provider = OidcClient::new(&self.settings)?;
                match falu_auth::authenticate(provider, &self.store, cancel).await {
                    Ok(credentials) => credentials.access_token,
                    Err(AuthError::Cancelled) => {
                        tracing::info!("Cancelled while refreshing credentials");
                        return Ok(None);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let file = self.store.load()?;
        let options = request_options(self.cli.workspace.as_deref(), self.cli.live, &file);
        tracing::debug!(workspace = ?options.workspace, live = ?options.live, "Using request options");

        Ok(Some(
            Client::with_base_url(&self.settings.api_base_url, credential).with_options(options),
        ))
    }
}

/// Command-line values win; otherwise fall back to the saved defaults, or to
/// the only cached workspace when there is exactly one.
pub fn request_options(
    workspace: Option<&str>,
    live: Option<bool>,
    file: &CredentialsFile,
) -> RequestOptions {
    let workspace = workspace
        .map(str::to_string)
        .or_else(|| file.default_workspace.clone())
        .or_else(|| match file.workspaces.as_slice() {
            [only] => Some(only.id.clone()),
            _ => None,
        });

    RequestOptions {
        workspace,
        live: live.or(file.default_live_mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use falu_auth::WorkspaceSummary;

    fn workspace(id: &str) -> WorkspaceSummary {
        WorkspaceSummary {
            id: id.to_string(),
            name: id.to_string(),
        }
    }

    #[test]
    fn test_explicit_values_win() {
        let file = CredentialsFile {
            default_workspace: Some("wksp_saved".to_string()),
            default_live_mode: Some(false),
            ..Default::default()
        };
        let options = request_options(Some("wksp_cli"), Some(true), &file);
        assert_eq!(options.workspace.as_deref(), Some("wksp_cli"));
        assert_eq!(options.live, Some(true));
    }

    #[test]
    fn test_saved_defaults_apply() {
        let file = CredentialsFile {
            workspaces: vec![workspace("wksp_a"), workspace("wksp_b")],
            default_workspace: Some("wksp_b".to_string()),
            default_live_mode: Some(true),
            ..Default::default()
        };
        let options = request_options(None, None, &file);
        assert_eq!(options.workspace.as_deref(), Some("wksp_b"));
        assert_eq!(options.live, Some(true));
    }

    #[test]
    fn test_single_cached_workspace_is_used() {
        let file = CredentialsFile {
            workspaces: vec![workspace("wksp_only")],
            ..Default::default()
        };
        assert_eq!(
            request_options(None, None, &file).workspace.as_deref(),
            Some("wksp_only")
        );

        let file = CredentialsFile {
            workspaces: vec![workspace("wksp_a"), workspace("wksp_b")],
            ..Default::default()
        };
        assert_eq!(request_options(None, None, &file), RequestOptions::default());
    }
}
