use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Api, Error};

/// The OpenID Connect discovery document
///
/// Well-known fields are decoded; anything else the server publishes is kept
/// in `other`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenIdConfiguration {
    /// The issuer identifier
    pub issuer: Option<Url>,
    /// The authorization endpoint
    pub authorization_endpoint: Option<Url>,
    /// The token endpoint
    pub token_endpoint: Option<Url>,
    /// The user info endpoint
    pub userinfo_endpoint: Option<Url>,
    /// The token key set
    pub jwks_uri: Option<Url>,
    /// The logout endpoint
    pub end_session_endpoint: Option<Url>,
    /// Supported scopes
    #[serde(default)]
    pub scopes_supported: Vec<String>,
    /// Supported response types
    #[serde(default)]
    pub response_types_supported: Vec<String>,
    /// Supported ID token signing algorithms
    #[serde(default)]
    pub id_token_signing_alg_values_supported: Vec<String>,
    /// Supported claims
    #[serde(default)]
    pub claims_supported: Vec<String>,
    /// Everything else in the document
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl Api {
    /// Gets the OpenID Connect discovery document
    pub async fn openid_configuration(&self) -> Result<OpenIdConfiguration, Error> {
        self.unauthenticated()
            .get_json("/.well-known/openid-configuration", "")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_are_kept() {
        let config: OpenIdConfiguration = serde_json::from_str(
            r#"{
                "issuer": "https://uaa.example.com/oauth/token",
                "jwks_uri": "https://uaa.example.com/token_keys",
                "scopes_supported": ["openid", "profile"],
                "service_documentation": "http://docs.cloudfoundry.org/api/uaa/"
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.jwks_uri.as_ref().map(Url::as_str),
            Some("https://uaa.example.com/token_keys")
        );
        assert_eq!(config.scopes_supported, ["openid", "profile"]);
        assert!(config.token_endpoint.is_none());
        assert_eq!(
            config.other["service_documentation"],
            "http://docs.cloudfoundry.org/api/uaa/"
        );
    }
}
