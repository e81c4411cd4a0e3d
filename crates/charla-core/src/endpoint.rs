use tracing::warn;

use crate::client::ChatClient;
use crate::error::ConnectError;

/// Handshake message sent when probing a candidate endpoint.
const PROBE_MESSAGE: &str = "Ping";

/// A server URL that answered the handshake probe with an HTTP 200.
///
/// Only [`EndpointValidator::probe`] constructs one, so holding a
/// `ValidatedEndpoint` means the URL was reachable at least once. Nothing
/// from the probe response is retained besides that fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEndpoint {
    url: String,
}

impl ValidatedEndpoint {
    pub(crate) fn new(url: String) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Checks that a candidate URL is a reachable chat endpoint.
#[derive(Clone, Default)]
pub struct EndpointValidator {
    client: ChatClient,
}

impl EndpointValidator {
    pub fn new() -> Self {
        Self {
            client: ChatClient::new(),
        }
    }

    /// Probe `url` with one fixed handshake exchange.
    ///
    /// A malformed URL is not rejected up front; it simply fails the
    /// network step like any unreachable server. Exactly one request is
    /// sent, with no retries.
    pub async fn probe(&self, url: &str) -> Result<ValidatedEndpoint, ConnectError> {
        match self.client.handshake(url, PROBE_MESSAGE).await {
            Ok(()) => Ok(ValidatedEndpoint::new(url.to_string())),
            Err(err) => {
                warn!("probe of {} failed: {:#}", url, err);
                Err(ConnectError)
            }
        }
    }
}
