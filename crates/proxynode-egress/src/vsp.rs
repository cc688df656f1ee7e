//! Verify Service Provider connector
//!
//! The Verify Service Provider (VSP) generates the signed SAML authentication
//! request the user agent is sent on with. This connector asks it for one,
//! tied to a session and a level of assurance, and classifies every failure
//! by origin.

use crate::client::{HttpClientConfig, create_client};
use crate::{EgressError, RequestFailure, Result};
use proxynode_core::config::VspSettings;
use proxynode_core::{CorrelationContext, ErrorClassification, LevelOfAssurance};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

const GENERATE_REQUEST_PATH: &str = "generate-request";

/// VSP connector configuration
#[derive(Debug, Clone)]
pub struct VspConfig {
    /// Base URL of the service, e.g. `http://vsp:50400`
    pub base_url: String,

    /// HTTP client configuration
    pub client_config: HttpClientConfig,
}

impl VspConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client_config: HttpClientConfig::default(),
        }
    }

    /// Set the whole-request timeout
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.client_config.timeout_secs = timeout_secs;
        self
    }
}

impl From<&VspSettings> for VspConfig {
    fn from(settings: &VspSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            client_config: HttpClientConfig {
                timeout_secs: settings.timeout_secs,
                connect_timeout_secs: settings.connect_timeout_secs,
                ..HttpClientConfig::default()
            },
        }
    }
}

/// Body of `POST /generate-request`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthnRequestGenerationBody {
    pub session_id: String,
    pub level_of_assurance: LevelOfAssurance,
}

/// Successful answer from the VSP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthnRequestResponse {
    /// Signed, encoded SAML authentication request
    pub saml_request: String,

    /// Id used later to validate the matching response
    pub request_id: String,

    /// Where the user agent is redirected with the request
    pub sso_location: String,
}

/// VSP connector
pub struct VerifyServiceProviderProxy {
    client: Client,
    generate_request_uri: String,
}

impl VerifyServiceProviderProxy {
    pub fn new(config: VspConfig) -> Result<Self> {
        let client = create_client(&config.client_config)?;
        let generate_request_uri = generate_request_uri(&config.base_url)?;
        Ok(Self {
            client,
            generate_request_uri,
        })
    }

    /// Full URI the generation request is posted to
    pub fn generate_request_uri(&self) -> &str {
        &self.generate_request_uri
    }

    /// Ask the VSP for a signed authentication request for `session_id`.
    ///
    /// The session id is the correlation id for the whole call and is
    /// attached to any failure. An empty session id is rejected before
    /// anything is sent.
    #[instrument(skip(self), fields(uri = %self.generate_request_uri))]
    pub async fn generate_authn_request(
        &self,
        session_id: &str,
        level_of_assurance: LevelOfAssurance,
    ) -> Result<AuthnRequestResponse> {
        if session_id.is_empty() {
            return Err(EgressError::InvalidRequest(
                "Session id cannot be empty".to_string(),
            ));
        }

        CorrelationContext::scope(
            session_id,
            self.send_generate_request(session_id, level_of_assurance),
        )
        .await
    }

    /// [`generate_authn_request`](Self::generate_authn_request) at the
    /// default level of assurance
    pub async fn generate_authn_request_default(
        &self,
        session_id: &str,
    ) -> Result<AuthnRequestResponse> {
        self.generate_authn_request(session_id, LevelOfAssurance::default())
            .await
    }

    async fn send_generate_request(
        &self,
        session_id: &str,
        level_of_assurance: LevelOfAssurance,
    ) -> Result<AuthnRequestResponse> {
        let body = AuthnRequestGenerationBody {
            session_id: session_id.to_string(),
            level_of_assurance,
        };
        debug!(level_of_assurance = %level_of_assurance, "Requesting authn request generation");

        let response = self
            .client
            .post(&self.generate_request_uri)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.failure(ErrorClassification::NetworkError, e.into()))?;

        let status = response.status();
        debug!("VSP responded with status {}", status);

        if !status.is_success() {
            let status_code = status.as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());

            return Err(self.failure(
                ErrorClassification::from_status(status_code),
                RequestFailure::Status {
                    status: status_code,
                    body,
                },
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.failure(ErrorClassification::NetworkError, e.into()))?;

        // A success status with an unusable body is still the server's fault
        let parsed: AuthnRequestResponse = serde_json::from_slice(&bytes).map_err(|e| {
            self.failure(
                ErrorClassification::RemoteServerError,
                RequestFailure::Parse(e.to_string()),
            )
        })?;

        if let Err(e) = Url::parse(&parsed.sso_location) {
            return Err(self.failure(
                ErrorClassification::RemoteServerError,
                RequestFailure::Parse(format!(
                    "Invalid ssoLocation '{}': {}",
                    parsed.sso_location, e
                )),
            ));
        }

        debug!(request_id = %parsed.request_id, "Received generated authn request");
        Ok(parsed)
    }

    /// Build a classified failure, capturing the correlation id now
    fn failure(&self, classification: ErrorClassification, cause: RequestFailure) -> EgressError {
        let error = EgressError::Request {
            classification,
            uri: self.generate_request_uri.clone(),
            session_id: CorrelationContext::get(),
            cause,
        };
        warn!("{}", error);
        error
    }
}

fn generate_request_uri(base_url: &str) -> Result<String> {
    let base_url = base_url.trim().trim_end_matches('/');
    let uri = format!("{}/{}", base_url, GENERATE_REQUEST_PATH);
    Url::parse(&uri).map_err(|e| {
        EgressError::ConfigError(format!("Invalid VSP base URL '{}': {}", base_url, e))
    })?;
    Ok(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_uri() {
        assert_eq!(
            generate_request_uri("http://vsp:50400").unwrap(),
            "http://vsp:50400/generate-request"
        );
        assert_eq!(
            generate_request_uri("http://vsp:50400/").unwrap(),
            "http://vsp:50400/generate-request"
        );
        assert_eq!(
            generate_request_uri("https://vsp.example.org/api").unwrap(),
            "https://vsp.example.org/api/generate-request"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = VerifyServiceProviderProxy::new(VspConfig::new("not a url"));
        assert!(matches!(result, Err(EgressError::ConfigError(_))));
    }

    #[test]
    fn test_request_body_wire_format() {
        let body = AuthnRequestGenerationBody {
            session_id: "session-id".to_string(),
            level_of_assurance: LevelOfAssurance::Level2,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "sessionId": "session-id",
                "levelOfAssurance": "LEVEL_2"
            })
        );
    }

    #[test]
    fn test_response_wire_format() {
        let response: AuthnRequestResponse = serde_json::from_value(serde_json::json!({
            "samlRequest": "saml_request",
            "requestId": "request_id",
            "ssoLocation": "http://sso-location.com"
        }))
        .unwrap();

        assert_eq!(response.saml_request, "saml_request");
        assert_eq!(response.request_id, "request_id");
        assert_eq!(response.sso_location, "http://sso-location.com");
    }

    #[test]
    fn test_config_from_settings() {
        let settings = VspSettings {
            base_url: "http://vsp:50400".to_string(),
            timeout_secs: 3,
            connect_timeout_secs: 1,
        };
        let config = VspConfig::from(&settings);

        assert_eq!(config.base_url, "http://vsp:50400");
        assert_eq!(config.client_config.timeout_secs, 3);
        assert_eq!(config.client_config.connect_timeout_secs, 1);
    }

    #[tokio::test]
    async fn test_empty_session_id_rejected_locally() {
        let proxy = VerifyServiceProviderProxy::new(VspConfig::new("http://127.0.0.1:9")).unwrap();
        let err = proxy
            .generate_authn_request("", LevelOfAssurance::Level2)
            .await
            .unwrap_err();
        assert!(matches!(err, EgressError::InvalidRequest(_)));
    }
}
