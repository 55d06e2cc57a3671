mod models;

pub use models::{CredentialsFile, StoredCredentials, WorkspaceSummary};
