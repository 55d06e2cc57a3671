use falu_api::endpoints::workspaces::Workspace;
use falu_api::{Client, Request};
use falu_auth::{
    AuthError, CredentialStore, LoginOptions, LoginPrompt, OidcProvider, Settings, WorkspaceSummary,
};
use tokio_util::sync::CancellationToken;

use crate::cli::LoginArgs;

const WORKSPACE_PAGE_SIZE: u32 = 100;

/// Log in with the device flow, then cache the workspaces the new
/// credentials can reach.
pub async fn login<P: OidcProvider>(
    provider: P,
    settings: &Settings,
    store: &CredentialStore,
    args: &LoginArgs,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let options = LoginOptions {
        no_browser: args.no_browser,
    };

    let login = falu_auth::login(
        provider,
        store,
        settings.browser_delay(),
        &options,
        cancel,
        |prompt| show_prompt(prompt, args.no_browser),
    );
    let credentials = match login.await {
        Ok(credentials) => credentials,
        Err(AuthError::Cancelled) => {
            tracing::info!("Login cancelled");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    println!("✓ Authentication successful!\n");

    let client = Client::with_base_url(&settings.api_base_url, credentials.access_token);
    let request = client.send(Request::workspaces().list().count(WORKSPACE_PAGE_SIZE));
    let workspaces = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(()),
        workspaces = request => workspaces,
    };

    // The login itself succeeded; a missing workspace list is not fatal
    match workspaces {
        Ok(workspaces) => {
            let count = workspaces.len();
            store.save_workspaces(workspaces.into_iter().map(summarize).collect())?;
            tracing::info!("Saved {} workspace(s) to {}", count, store.path().display());
        }
        Err(e) => tracing::warn!("Could not fetch workspaces: {}", e),
    }
    Ok(())
}

pub fn logout(store: &CredentialStore) -> anyhow::Result<()> {
    falu_auth::logout(store)?;
    println!("Logged out.");
    Ok(())
}

fn show_prompt(prompt: LoginPrompt<'_>, no_browser: bool) {
    match prompt {
        LoginPrompt::Authorization(authorization) => {
            println!("\nYour confirmation code is: {}\n", authorization.user_code);
            if no_browser {
                println!("Open this URL in your browser to continue:");
                println!("{}\n", authorization.browser_uri());
            }
        }
        LoginPrompt::BrowserOpened(uri) => {
            println!("Browser opened. You can also open this URL directly:");
            println!("{}\n", uri);
        }
        LoginPrompt::BrowserFailed { uri, error } => {
            eprintln!("Failed to open browser automatically: {}", error);
            eprintln!("\nPlease open this URL in your browser:");
            eprintln!("{}\n", uri);
        }
        LoginPrompt::Waiting => println!("Waiting for authorization..."),
    }
}

fn summarize(workspace: Workspace) -> WorkspaceSummary {
    WorkspaceSummary {
        id: workspace.id,
        name: workspace.name,
    }
}
