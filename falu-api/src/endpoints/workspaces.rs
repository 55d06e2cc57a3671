use crate::macros::setter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tower_api_client::{Request, RequestData};

// Common

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
}

// Requests

#[derive(Default, Debug, Clone, Serialize)]
pub struct ListWorkspaces {
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<u32>,
}

impl ListWorkspaces {
    pub fn new() -> Self {
        Self::default()
    }

    setter!(opt count: u32);
}

impl Request for ListWorkspaces {
    type Data = Self;
    type Response = Vec<Workspace>;

    fn endpoint(&self) -> Cow<'_, str> {
        "/v1/workspaces".into()
    }

    fn data(&self) -> RequestData<&Self> {
        RequestData::Query(self)
    }
}
