//! TLS material carried through to the transport binding.
//!
//! Nothing here touches a TLS stack. The adapter stores the PEM blobs
//! uninterpreted; the transport binding that consumes the dispatch table
//! decides what to do with them.

/// Server credentials plus optional client verification settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsConfig {
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
    ca_pem: Option<Vec<u8>>,
    require_client_auth: bool,
}

impl TlsConfig {
    pub fn new(cert_pem: impl Into<Vec<u8>>, key_pem: impl Into<Vec<u8>>) -> Self {
        Self {
            cert_pem: cert_pem.into(),
            key_pem: key_pem.into(),
            ca_pem: None,
            require_client_auth: false,
        }
    }

    /// Trust anchor for verifying client certificates.
    pub fn with_ca(mut self, ca_pem: impl Into<Vec<u8>>) -> Self {
        self.ca_pem = Some(ca_pem.into());
        self
    }

    /// Reject connections without a verified client certificate.
    pub fn require_client_auth(mut self) -> Self {
        self.require_client_auth = true;
        self
    }

    pub fn cert_pem(&self) -> &[u8] {
        &self.cert_pem
    }

    pub fn key_pem(&self) -> &[u8] {
        &self.key_pem
    }

    pub fn ca_pem(&self) -> Option<&[u8]> {
        self.ca_pem.as_deref()
    }

    pub fn client_auth_required(&self) -> bool {
        self.require_client_auth
    }
}
