use crate::endpoints::{
    realtime::{NegotiateRealtime, RealtimePurpose},
    webhooks::GetWebhookEndpoint,
    workspaces::ListWorkspaces,
};

pub struct RealtimeRepository;

impl RealtimeRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn negotiate(&self, purpose: RealtimePurpose) -> NegotiateRealtime {
        NegotiateRealtime::new(purpose)
    }
}

pub struct WebhookRepository;

impl WebhookRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn get(&self, id: impl Into<String>) -> GetWebhookEndpoint {
        GetWebhookEndpoint::new(id)
    }
}

pub struct WorkspaceRepository;

impl WorkspaceRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn list(&self) -> ListWorkspaces {
        ListWorkspaces::default()
    }
}
