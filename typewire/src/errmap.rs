//! Declarative mapping from handler errors to RPC status codes.
//!
//! Handlers return `anyhow::Error` for their failure path; each method may
//! declare an ordered list of [`ErrorMapping`]s. The first mapping whose
//! error type matches wins; an unmatched error becomes
//! [`Code::Internal`](crate::status::Code::Internal).

use std::fmt;
use std::sync::Arc;

use typewire_core::value::WireValue;

use crate::status::{Code, Status};

type Matcher = Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;
type Formatter = Arc<dyn Fn(&anyhow::Error, &WireValue) -> String + Send + Sync>;

/// One declared error-to-status rule.
#[derive(Clone)]
pub struct ErrorMapping {
    code: Code,
    matcher: Matcher,
    formatter: Option<Formatter>,
}

impl fmt::Debug for ErrorMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorMapping")
            .field("code", &self.code)
            .field("has_formatter", &self.formatter.is_some())
            .finish()
    }
}

impl ErrorMapping {
    /// Map a concrete error type to a status code, matched by downcast.
    pub fn for_error<E>(code: Code) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            code,
            matcher: Arc::new(|error| error.is::<E>()),
            formatter: None,
        }
    }

    /// Replace the default message (the error's `Display` text) with a
    /// custom one built from the error and the raw wire request.
    pub fn with_formatter(
        mut self,
        formatter: impl Fn(&anyhow::Error, &WireValue) -> String + Send + Sync + 'static,
    ) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    pub fn code(&self) -> Code {
        self.code
    }

    /// Whether this mapping applies to the given error.
    pub fn matches(&self, error: &anyhow::Error) -> bool {
        (self.matcher)(error)
    }

    /// Build the status for a matched error.
    pub fn status(&self, error: &anyhow::Error, raw_request: &WireValue) -> Status {
        let message = match &self.formatter {
            Some(formatter) => formatter(error, raw_request),
            None => error.to_string(),
        };
        Status::new(self.code, message)
    }
}

/// Resolve an error against declared mappings, first match wins.
pub fn map_error(
    error: &anyhow::Error,
    mappings: &[ErrorMapping],
    raw_request: &WireValue,
) -> Status {
    for mapping in mappings {
        if mapping.matches(error) {
            return mapping.status(error, raw_request);
        }
    }
    Status::internal(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("no such key: {0}")]
    struct KeyError(String);

    #[derive(Debug, Error)]
    #[error("quota exceeded")]
    struct QuotaError;

    #[test]
    fn first_matching_mapping_wins() {
        let mappings = [
            ErrorMapping::for_error::<KeyError>(Code::NotFound),
            ErrorMapping::for_error::<QuotaError>(Code::ResourceExhausted),
        ];

        let err = anyhow::Error::new(KeyError("42".into()));
        let status = map_error(&err, &mappings, &WireValue::Empty);
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), Some("no such key: 42"));

        let err = anyhow::Error::new(QuotaError);
        let status = map_error(&err, &mappings, &WireValue::Empty);
        assert_eq!(status.code(), Code::ResourceExhausted);
    }

    #[test]
    fn unmatched_errors_become_internal() {
        let mappings = [ErrorMapping::for_error::<KeyError>(Code::NotFound)];
        let err = anyhow::anyhow!("something else");
        let status = map_error(&err, &mappings, &WireValue::Empty);
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), Some("something else"));
    }

    #[test]
    fn formatter_sees_error_and_raw_request() {
        let mapping = ErrorMapping::for_error::<KeyError>(Code::NotFound).with_formatter(
            |error, raw| format!("{error} (request kind: {})", raw.kind()),
        );

        let err = anyhow::Error::new(KeyError("7".into()));
        let raw = WireValue::message([("id", WireValue::Str("7".into()))]);
        let status = map_error(&err, &[mapping], &raw);
        assert_eq!(
            status.message(),
            Some("no such key: 7 (request kind: message)")
        );
    }
}
