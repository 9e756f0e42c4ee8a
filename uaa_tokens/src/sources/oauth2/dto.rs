//! Grant credentials and token endpoint payloads

use reqwest::Url;
use serde::{ser::SerializeStruct, Deserialize, Serialize, Serializer};

use super::{GrantCredentials, GrantType, TokenRequestError};
use crate::{
    AccessToken, AuthorizationCode, ClientId, ClientIdRef, ClientSecret, ClientSecretRef,
    IdToken, Password, RefreshToken, Token, Username,
};

/// Credentials for the client credentials grant
#[derive(Clone, Debug)]
pub struct ClientCredentials {
    /// The client ID
    pub client_id: ClientId,
    /// The client secret
    pub client_secret: ClientSecret,
}

impl Serialize for ClientCredentials {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ClientCredentials", 1)?;
        s.serialize_field("grant_type", Self::grant_type().as_str())?;
        s.end()
    }
}

impl GrantCredentials for ClientCredentials {
    #[inline]
    fn grant_type() -> GrantType {
        GrantType::ClientCredentials
    }

    #[inline]
    fn client_id(&self) -> &ClientIdRef {
        &self.client_id
    }

    #[inline]
    fn client_secret(&self) -> &ClientSecretRef {
        &self.client_secret
    }
}

/// Credentials for the resource owner password grant
#[derive(Clone, Debug)]
pub struct PasswordCredentials {
    /// The client ID
    pub client_id: ClientId,
    /// The client secret
    pub client_secret: ClientSecret,
    /// The user's name
    pub username: Username,
    /// The user's password
    pub password: Password,
}

impl Serialize for PasswordCredentials {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("PasswordCredentials", 3)?;
        s.serialize_field("grant_type", Self::grant_type().as_str())?;
        s.serialize_field("username", self.username.as_str())?;
        s.serialize_field("password", self.password.as_str())?;
        s.end()
    }
}

impl GrantCredentials for PasswordCredentials {
    #[inline]
    fn grant_type() -> GrantType {
        GrantType::Password
    }

    #[inline]
    fn client_id(&self) -> &ClientIdRef {
        &self.client_id
    }

    #[inline]
    fn client_secret(&self) -> &ClientSecretRef {
        &self.client_secret
    }
}

/// Credentials for the authorization code grant
#[derive(Clone, Debug)]
pub struct AuthorizationCodeCredentials {
    /// The client ID
    pub client_id: ClientId,
    /// The client secret
    pub client_secret: ClientSecret,
    /// The code issued by the authorization endpoint
    pub code: AuthorizationCode,
    /// The redirect URI used when the code was issued
    pub redirect_uri: Url,
}

impl Serialize for AuthorizationCodeCredentials {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("AuthorizationCodeCredentials", 4)?;
        s.serialize_field("grant_type", Self::grant_type().as_str())?;
        s.serialize_field("code", self.code.as_str())?;
        s.serialize_field("redirect_uri", self.redirect_uri.as_str())?;
        s.serialize_field("response_type", "token")?;
        s.end()
    }
}

impl GrantCredentials for AuthorizationCodeCredentials {
    #[inline]
    fn grant_type() -> GrantType {
        GrantType::AuthorizationCode
    }

    #[inline]
    fn client_id(&self) -> &ClientIdRef {
        &self.client_id
    }

    #[inline]
    fn client_secret(&self) -> &ClientSecretRef {
        &self.client_secret
    }
}

/// Credentials for the refresh token grant
///
/// Follows refresh token rotation: whenever the authority issues a new
/// refresh token, it replaces the one held here.
#[derive(Clone, Debug)]
pub struct RefreshTokenCredentials {
    /// The client ID
    pub client_id: ClientId,
    /// The client secret
    pub client_secret: ClientSecret,
    /// The refresh token to redeem
    pub refresh_token: Option<RefreshToken>,
}

impl Serialize for RefreshTokenCredentials {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("RefreshTokenCredentials", 2)?;
        s.serialize_field("grant_type", Self::grant_type().as_str())?;
        if let Some(refresh_token) = &self.refresh_token {
            s.serialize_field("refresh_token", refresh_token.as_str())?;
        } else {
            s.skip_field("refresh_token")?;
        }
        s.end()
    }
}

impl GrantCredentials for RefreshTokenCredentials {
    #[inline]
    fn grant_type() -> GrantType {
        GrantType::RefreshToken
    }

    fn token_format_in_query() -> bool {
        true
    }

    #[inline]
    fn client_id(&self) -> &ClientIdRef {
        &self.client_id
    }

    #[inline]
    fn client_secret(&self) -> &ClientSecretRef {
        &self.client_secret
    }

    fn check(&self) -> Result<(), TokenRequestError> {
        match &self.refresh_token {
            Some(refresh_token) if !refresh_token.as_str().is_empty() => Ok(()),
            _ => Err(TokenRequestError::MissingRefreshToken),
        }
    }

    fn on_token(&mut self, token: &Token) {
        if let Some(refresh_token) = token.refresh_token() {
            if !refresh_token.as_str().is_empty() {
                self.refresh_token = Some(refresh_token.to_owned());
            }
        }
    }
}

/// The body of a successful token endpoint response
///
/// Every field is optional here; a missing access token is reported as an
/// error once the response has been decoded.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// The access token
    #[serde(default)]
    pub access_token: Option<AccessToken>,
    /// The token type, usually `bearer`
    #[serde(default)]
    pub token_type: Option<String>,
    /// A refresh token, if issued
    #[serde(default)]
    pub refresh_token: Option<RefreshToken>,
    /// An OpenID Connect ID token, if issued
    #[serde(default)]
    pub id_token: Option<IdToken>,
    /// Seconds until the access token expires
    ///
    /// Zero or negative values are treated as "no expiry".
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// The granted scopes
    #[serde(default)]
    pub scope: Option<String>,
    /// The token's unique identifier
    #[serde(default)]
    pub jti: Option<String>,
}
