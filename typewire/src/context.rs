//! Per-call context handed to handlers that ask for it.

use std::collections::HashMap;

/// Transport-supplied call metadata.
///
/// Built by the transport binding for each call; handlers registered with
/// a two-parameter closure receive it alongside the decoded request.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    peer: Option<String>,
    metadata: HashMap<String, String>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = Some(peer.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Remote peer address, when the transport knows it.
    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn metadata_iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.metadata.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_carries_peer_and_metadata() {
        let ctx = CallContext::new()
            .with_peer("127.0.0.1:50051")
            .with_metadata("authorization", "bearer t0k3n");

        assert_eq!(ctx.peer(), Some("127.0.0.1:50051"));
        assert_eq!(ctx.metadata("authorization"), Some("bearer t0k3n"));
        assert_eq!(ctx.metadata("missing"), None);
    }
}
