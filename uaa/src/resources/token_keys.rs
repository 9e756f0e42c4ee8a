use serde::{Deserialize, Serialize};

use crate::{Api, Error};

/// A token signing key, as a JSON Web Key
///
/// UAA also includes the key in PEM form as `value`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// The key type, such as `RSA`
    #[serde(default)]
    pub kty: String,
    /// The RSA public exponent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    /// The intended use, such as `sig`
    #[serde(default, rename = "use")]
    pub key_use: String,
    /// The key ID
    #[serde(default)]
    pub kid: String,
    /// The signing algorithm, such as `RS256`
    #[serde(default)]
    pub alg: String,
    /// The key in PEM form
    #[serde(default)]
    pub value: String,
    /// The RSA modulus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
}

/// The set of keys served by `/token_keys`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    /// The keys
    #[serde(default)]
    pub keys: Vec<JsonWebKey>,
}

impl Api {
    /// Gets the active token signing key
    pub async fn token_key(&self) -> Result<JsonWebKey, Error> {
        self.unauthenticated().get_json("/token_key", "").await
    }

    /// Gets every token signing key
    ///
    /// Servers without `/token_keys` are asked for their single key instead,
    /// so older UAAs still produce a set.
    pub async fn token_keys(&self) -> Result<Vec<JsonWebKey>, Error> {
        let requester = self.unauthenticated();
        let response = match requester.get("/token_keys", "").await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(error = %err, "falling back to the single token key");
                return Ok(vec![self.token_key().await?]);
            }
        };

        let set: JsonWebKeySet = requester.decode(response.url, &response.body)?;
        Ok(set.keys)
    }
}
