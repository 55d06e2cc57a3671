use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower_api_client::{Error as ApiError, StatusCode};

#[derive(Debug)]
pub enum FaluApiError {
    Falu(StatusCode, ProblemDetails),
    Internal(ApiError),
}

impl From<ApiError> for FaluApiError {
    fn from(value: ApiError) -> Self {
        match value {
            ApiError::ClientError(status, body) | ApiError::ServerError(status, body) => {
                // Not every failure carries a problem document (proxies, gateways)
                let problem = serde_json::from_str::<ProblemDetails>(&body).unwrap_or_else(|_| {
                    ProblemDetails {
                        title: status.canonical_reason().map(str::to_string),
                        status: Some(status.as_u16()),
                        detail: Some(body).filter(|d| !d.is_empty()),
                        ..Default::default()
                    }
                });
                FaluApiError::Falu(status, problem)
            }
            e => FaluApiError::Internal(e),
        }
    }
}

impl std::fmt::Display for FaluApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaluApiError::Internal(e) => write!(f, "Internal error: {}", e),
            FaluApiError::Falu(status, problem) => {
                write!(f, "({})", status)?;
                if let Some(ref title) = problem.title {
                    write!(f, " {}", title)?;
                }
                if let Some(ref detail) = problem.detail {
                    write!(f, ": {}", detail)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for FaluApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FaluApiError::Internal(e) => Some(e),
            FaluApiError::Falu(..) => None,
        }
    }
}

/// RFC 7807 problem document returned by the API on failure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub problem_type: Option<String>,
    pub title: Option<String>,
    pub status: Option<u16>,
    pub detail: Option<String>,
    #[serde(default)]
    pub errors: HashMap<String, Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_document_is_parsed() {
        let err = FaluApiError::from(ApiError::ClientError(
            StatusCode::NOT_FOUND,
            r#"{"title":"Not Found","status":404,"detail":"No such webhook endpoint"}"#.to_string(),
        ));
        assert_eq!(err.to_string(), "(404 Not Found) Not Found: No such webhook endpoint");
    }

    #[test]
    fn test_plain_body_falls_back_to_reason() {
        let err = FaluApiError::from(ApiError::ServerError(
            StatusCode::BAD_GATEWAY,
            "upstream unavailable".to_string(),
        ));
        let FaluApiError::Falu(status, problem) = err else {
            panic!("Expected API error");
        };
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(problem.title.as_deref(), Some("Bad Gateway"));
        assert_eq!(problem.detail.as_deref(), Some("upstream unavailable"));
    }

    #[test]
    fn test_other_failures_are_internal() {
        let err = FaluApiError::from(ApiError::Pagination {
            msg: "no cursor".to_string(),
        });
        assert!(matches!(err, FaluApiError::Internal(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
