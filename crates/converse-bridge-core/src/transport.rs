//! Transport and credential abstractions
//!
//! The transport executes a Converse request and yields the decoded event
//! stream. Credentials travel with every call; nothing reads them from
//! process-wide state.

use crate::{
    Result,
    converse::{ConverseRequest, ConverseStreamEvent},
};
use futures::Stream;
use std::fmt;
use std::pin::Pin;

/// Decoded ConverseStream events
pub type ConverseEventStream = Pin<Box<dyn Stream<Item = Result<ConverseStreamEvent>> + Send>>;

#[async_trait::async_trait]
pub trait ConverseTransport: Send + Sync {
    /// Start a streaming Converse call
    async fn converse_stream(
        &self,
        request: ConverseRequest,
        credentials: &Credentials,
    ) -> Result<ConverseEventStream>;
}

/// Credentials for one call
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub region: String,
    pub secret: CredentialSecret,
}

#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSecret {
    /// API key sent as a bearer token
    BearerToken(String),
    /// Signed requests
    AccessKeys {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
}

impl Credentials {
    pub fn bearer(region: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            secret: CredentialSecret::BearerToken(token.into()),
        }
    }

    pub fn access_keys(
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            region: region.into(),
            secret: CredentialSecret::AccessKeys {
                access_key_id: access_key_id.into(),
                secret_access_key: secret_access_key.into(),
                session_token,
            },
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.secret {
            CredentialSecret::BearerToken(_) => "bearer_token",
            CredentialSecret::AccessKeys { .. } => "access_keys",
        };
        f.debug_struct("Credentials")
            .field("region", &self.region)
            .field("secret", &format_args!("<{} redacted>", kind))
            .finish()
    }
}
