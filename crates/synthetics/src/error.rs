//! Error types for the synthetics client.

use thiserror::Error;

/// Boxed error used at the executor and decoder seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for synthetics operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A network-level failure reported by an [`HttpExecutor`](crate::HttpExecutor).
#[derive(Debug, Error)]
#[error(transparent)]
pub struct TransportError(BoxError);

impl TransportError {
    /// Wrap any error produced while performing a request.
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self(err.into())
    }
}

/// Errors returned by the synthetics [`Client`](crate::Client).
///
/// Not-found variants are distinguished from [`Error::UnexpectedStatus`] so callers can
/// treat absence as a legitimate state.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad caller input, caught before any request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No API key was configured.
    #[error("synthetics api key not provided")]
    MissingCredential,

    /// The request could not be performed.
    #[error("could not perform {op} request")]
    Transport {
        /// Operation that failed
        op: &'static str,
        /// Underlying network failure
        #[source]
        source: TransportError,
    },

    /// The service answered with a status the operation does not expect.
    #[error("invalid response from {op} with code {status}: {body}")]
    UnexpectedStatus {
        /// Operation that failed
        op: &'static str,
        /// HTTP status code
        status: u16,
        /// Response body, lossily decoded
        body: String,
    },

    /// No monitor exists with the given id.
    #[error("could not find monitor {id}")]
    MonitorNotFound {
        /// Monitor id
        id: String,
    },

    /// The monitor has no script attached.
    #[error("could not find script for monitor {id}")]
    ScriptNotFound {
        /// Monitor id
        id: String,
    },

    /// No alert condition exists with the given id (within the policy, if known).
    #[error("could not find alert condition {id}{}", .policy_id.map(|p| format!(" in policy {p}")).unwrap_or_default())]
    AlertConditionNotFound {
        /// Owning policy, when the lookup was policy-scoped
        policy_id: Option<u64>,
        /// Alert condition id
        id: u64,
    },

    /// The response body could not be decoded.
    #[error("could not parse {op} response")]
    Decode {
        /// Operation that failed
        op: &'static str,
        /// Decoder failure
        #[source]
        source: BoxError,
    },

    /// The request body could not be encoded.
    #[error("could not JSON encode {op} request")]
    Encode {
        /// Operation that failed
        op: &'static str,
        /// Encoder failure
        #[source]
        source: serde_json::Error,
    },

    /// The `Location` header of a created monitor did not name a monitor.
    #[error("could not find an ID for monitor in location header: {location:?}")]
    IdExtraction {
        /// Header value as received (empty when missing)
        location: String,
    },

    /// A list record carried a timestamp in an unexpected format.
    #[error("could not parse timestamp {value:?} of monitor {id}")]
    TimestampParse {
        /// Id of the offending monitor
        id: String,
        /// Raw timestamp
        value: String,
        /// Parser failure, absent when only the offset layout was wrong
        #[source]
        source: Option<chrono::ParseError>,
    },
}

impl Error {
    /// Whether this error reports a missing remote entity.
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::MonitorNotFound { .. }
                | Self::ScriptNotFound { .. }
                | Self::AlertConditionNotFound { .. }
        )
    }

    pub(crate) fn decode(op: &'static str, err: impl Into<BoxError>) -> Self {
        Self::Decode { op, source: err.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_variants_are_flagged() {
        assert!(Error::MonitorNotFound { id: "a".into() }.is_not_found());
        assert!(Error::ScriptNotFound { id: "a".into() }.is_not_found());
        assert!(Error::AlertConditionNotFound { policy_id: None, id: 1 }.is_not_found());
        assert!(
            !Error::UnexpectedStatus { op: "GetMonitor", status: 500, body: String::new() }
                .is_not_found()
        );
    }

    #[test]
    fn alert_condition_not_found_names_policy() {
        let err = Error::AlertConditionNotFound { policy_id: Some(42), id: 7 };
        assert_eq!(err.to_string(), "could not find alert condition 7 in policy 42");
        let err = Error::AlertConditionNotFound { policy_id: None, id: 7 };
        assert_eq!(err.to_string(), "could not find alert condition 7");
    }

    #[test]
    fn unexpected_status_includes_body() {
        let err = Error::UnexpectedStatus {
            op: "DeleteMonitor",
            status: 500,
            body: "boom".to_owned(),
        };
        assert_eq!(err.to_string(), "invalid response from DeleteMonitor with code 500: boom");
    }
}
