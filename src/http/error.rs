//! Request-time failures of a dispatch.

use axum::http::StatusCode;
use thiserror::Error;

use crate::http::forward::ForwardError;

/// A matched request that could not be completed.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The outbound call failed; the cause is preserved.
    #[error("route '{route}': forward failed: {source}")]
    Forward {
        route: String,
        #[source]
        source: ForwardError,
    },

    /// A filter could not apply itself to this request.
    #[error("filter '{filter}' failed: {reason}")]
    Filter { filter: String, reason: String },
}

impl DispatchError {
    pub fn filter(filter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Filter {
            filter: filter.into(),
            reason: reason.into(),
        }
    }

    /// Status the client receives for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::Forward {
                source: ForwardError::Timeout(_),
                ..
            } => StatusCode::GATEWAY_TIMEOUT,
            DispatchError::Forward { .. } => StatusCode::BAD_GATEWAY,
            DispatchError::Filter { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn maps_failures_to_gateway_statuses() {
        let refused = DispatchError::Forward {
            route: "r".into(),
            source: ForwardError::ConnectRefused,
        };
        assert_eq!(refused.status(), StatusCode::BAD_GATEWAY);

        let timeout = DispatchError::Forward {
            route: "r".into(),
            source: ForwardError::Timeout(Duration::from_secs(1)),
        };
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

        let filter = DispatchError::filter("SetPath", "no value for template variable 'id'");
        assert_eq!(filter.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            filter.to_string(),
            "filter 'SetPath' failed: no value for template variable 'id'"
        );
    }
}
