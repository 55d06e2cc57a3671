use crate::common::{CredentialsFile, StoredCredentials, WorkspaceSummary};
use crate::error::AuthError;
use chrono::{Duration, Utc};
use std::fs;
use std::path::{Path, PathBuf};

const EXPIRY_BUFFER: Duration = Duration::minutes(5);

pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store under `<config dir>/falu/credentials.json`
    pub fn new() -> Result<Self, AuthError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AuthError::Configuration("Could not find config directory".to_string()))?
            .join("falu");

        Ok(Self::at(config_dir.join("credentials.json")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<CredentialsFile, AuthError> {
        if !self.path.exists() {
            return Ok(CredentialsFile::default());
        }

        let json = fs::read_to_string(&self.path).map_err(|e| {
            AuthError::CredentialStorage(format!("Failed to read credentials: {}", e))
        })?;

        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, file: &CredentialsFile) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    AuthError::CredentialStorage(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(file)?;
        fs::write(&self.path, json)
            .map_err(|e| AuthError::CredentialStorage(format!("Failed to save credentials: {}", e)))?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)
                .map_err(|e| {
                    AuthError::CredentialStorage(format!("Failed to get file permissions: {}", e))
                })?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms).map_err(|e| {
                AuthError::CredentialStorage(format!("Failed to set file permissions: {}", e))
            })?;
        }

        Ok(())
    }

    pub fn save_credentials(&self, credentials: &StoredCredentials) -> Result<(), AuthError> {
        let mut file = self.load()?;
        file.credentials = Some(credentials.clone());
        self.save(&file)
    }

    pub fn save_workspaces(&self, workspaces: Vec<WorkspaceSummary>) -> Result<(), AuthError> {
        let mut file = self.load()?;

        // Forget a default workspace that no longer exists
        if let Some(ref default) = file.default_workspace {
            if !workspaces.iter().any(|w| &w.id == default) {
                file.default_workspace = None;
            }
        }
        file.workspaces = workspaces;
        self.save(&file)
    }

    /// Remove credentials and cached workspaces, keeping nothing tied to the old login
    pub fn clear(&self) -> Result<(), AuthError> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                AuthError::CredentialStorage(format!("Failed to delete credentials: {}", e))
            })?;
        }
        Ok(())
    }

    pub fn is_expired(&self, credentials: &StoredCredentials) -> bool {
        // Treat tokens as expired 5 minutes early
        credentials.expires_at <= (Utc::now() + EXPIRY_BUFFER)
    }
}
