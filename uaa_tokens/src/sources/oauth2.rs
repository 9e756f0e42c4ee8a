//! A token source that uses a UAA server's token endpoint as an authority

use std::{fmt, time::Duration};

use async_trait::async_trait;
use base64::prelude::*;
use reqwest::{header, StatusCode, Url};
use reqwest_middleware::ClientWithMiddleware;
use thiserror::Error;

use super::AsyncTokenSource;
use crate::clock::{Clock, System};
use crate::{ClientIdRef, ClientSecretRef, Token, TokenFormat};

pub mod dto;

/// An OAuth2 grant type understood by the UAA token endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GrantType {
    /// The `client_credentials` grant
    ClientCredentials,
    /// The resource owner `password` grant
    Password,
    /// The `authorization_code` grant
    AuthorizationCode,
    /// The `refresh_token` grant
    RefreshToken,
}

impl GrantType {
    /// The value sent in the `grant_type` parameter
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClientCredentials => "client_credentials",
            Self::Password => "password",
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The credentials for one grant against the token endpoint
///
/// The serialized form holds the grant-specific body parameters, including
/// `grant_type`. The client ID and secret are never serialized; they are
/// sent in the `Authorization` header instead.
pub trait GrantCredentials: serde::Serialize + Send + Sync + fmt::Debug {
    /// The grant type or flow to be performed
    fn grant_type() -> GrantType;
    /// The client ID of the client making the request
    fn client_id(&self) -> &ClientIdRef;
    /// The client secret of the client making the request
    fn client_secret(&self) -> &ClientSecretRef;
    /// Whether `token_format` is sent in the token URL's query rather than
    /// in the body
    fn token_format_in_query() -> bool {
        false
    }
    /// Verifies that a request can be attempted at all
    fn check(&self) -> Result<(), TokenRequestError> {
        Ok(())
    }
    /// A handler to receive each newly issued token, e.g. to follow a
    /// rotating refresh token
    fn on_token(&mut self, _token: &Token) {}
}

/// A token source that performs one grant against the token endpoint per
/// request
pub struct OAuth2TokenSource<R, C = System> {
    client: ClientWithMiddleware,
    token_url: Url,
    credentials: R,
    token_format: TokenFormat,
    clock: C,
}

/// A token source for the client credentials grant
pub type ClientCredentialsTokenSource<C = System> = OAuth2TokenSource<dto::ClientCredentials, C>;

/// A token source for the resource owner password grant
pub type PasswordTokenSource<C = System> = OAuth2TokenSource<dto::PasswordCredentials, C>;

/// A token source for the authorization code grant
pub type AuthorizationCodeTokenSource<C = System> =
    OAuth2TokenSource<dto::AuthorizationCodeCredentials, C>;

/// A token source for the refresh token grant
pub type RefreshTokenSource<C = System> = OAuth2TokenSource<dto::RefreshTokenCredentials, C>;

impl<R> OAuth2TokenSource<R, System> {
    /// Constructs a new token source
    ///
    /// `client` should not itself attach access tokens: it is used to obtain
    /// them.
    pub fn new(
        client: ClientWithMiddleware,
        token_url: Url,
        credentials: R,
        token_format: TokenFormat,
    ) -> Self {
        Self {
            client,
            token_url,
            credentials,
            token_format,
            clock: System,
        }
    }
}

impl<R, C> OAuth2TokenSource<R, C> {
    /// Sets a custom clock to be used when computing token expiry
    ///
    /// Useful for testing purposes
    pub fn with_clock<D>(self, clock: D) -> OAuth2TokenSource<R, D> {
        OAuth2TokenSource {
            client: self.client,
            token_url: self.token_url,
            credentials: self.credentials,
            token_format: self.token_format,
            clock,
        }
    }

    /// The credentials used for each grant
    pub fn credentials(&self) -> &R {
        &self.credentials
    }

    /// The token endpoint
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }
}

impl<R, C> fmt::Debug for OAuth2TokenSource<R, C>
where
    R: fmt::Debug,
    C: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("OAuth2TokenSource")
            .field("token_url", &self.token_url.as_str())
            .field("credentials", &self.credentials)
            .field("token_format", &self.token_format)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<R, C> AsyncTokenSource for OAuth2TokenSource<R, C>
where
    R: GrantCredentials,
    C: Clock + Send + Sync,
{
    type Error = TokenRequestError;

    async fn request_token(&mut self) -> Result<Token, Self::Error> {
        self.credentials.check()?;

        let token = request_token(
            &self.client,
            &self.token_url,
            &self.credentials,
            self.token_format,
            &self.clock,
        )
        .await?;

        self.credentials.on_token(&token);
        Ok(token)
    }
}

/// An error while attempting to request a new token from the authority
#[derive(Debug, Error)]
pub enum TokenRequestError {
    /// The authority answered with a non-success status
    #[error("error requesting token from {url}: status {status}: {body}")]
    ErrorWithBody {
        /// The token endpoint
        url: Url,
        /// The response status
        status: StatusCode,
        /// The body of the error
        body: String,
    },
    /// Unable to deserialize the token body
    #[error("error deserializing token body from authority: {source}")]
    TokenBodyError {
        /// The underlying decode error
        #[source]
        source: serde_json::Error,
        /// The raw response body
        body: String,
    },
    /// The authority answered successfully but issued no access token
    #[error("token response from authority did not contain an access token")]
    MissingAccessToken,
    /// Unable to read the response
    #[error("error reading response body: {0}")]
    BodyReadError(#[source] reqwest::Error),
    /// Unable to send a token request to the authority
    #[error("error sending request to {url}: {source}")]
    RequestSend {
        /// The token endpoint
        url: Url,
        /// The underlying transport error
        #[source]
        source: reqwest_middleware::Error,
    },
    /// A refresh was needed but no refresh token is available
    #[error("token expired and refresh token is not set")]
    MissingRefreshToken,
}

impl TokenRequestError {
    /// Whether the authority responded successfully with a body that could
    /// not be used as a token
    pub fn is_malformed_response(&self) -> bool {
        matches!(
            self,
            Self::TokenBodyError { .. } | Self::MissingAccessToken
        )
    }

    /// Whether the failure was caused by a request timing out
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::RequestSend {
                source: reqwest_middleware::Error::Reqwest(err),
                ..
            } => err.is_timeout(),
            Self::BodyReadError(err) => err.is_timeout(),
            _ => false,
        }
    }
}

/// Builds the HTTP Basic credentials the UAA expects
///
/// The client ID and secret are form-URL-encoded before being joined and
/// base64-encoded. The UAA only decodes them this way when the request also
/// carries `X-CF-ENCODED-CREDENTIALS: true`.
pub fn basic_authorization(
    client_id: &ClientIdRef,
    client_secret: &ClientSecretRef,
) -> header::HeaderValue {
    use url::form_urlencoded::byte_serialize;

    let client_id: String = byte_serialize(client_id.as_str().as_bytes()).collect();
    let client_secret: String = byte_serialize(client_secret.as_str().as_bytes()).collect();
    let credentials = format!("{client_id}:{client_secret}");

    let mut value = header::HeaderValue::try_from(format!(
        "Basic {}",
        BASE64_STANDARD.encode(credentials.as_bytes())
    ))
    .expect("base64 output is always a valid header value");
    value.set_sensitive(true);
    value
}

#[derive(serde::Serialize)]
struct TokenRequestForm<'a, R> {
    #[serde(flatten)]
    credentials: &'a R,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_format: Option<TokenFormat>,
}

#[tracing::instrument(
    err,
    skip(client, token_url, credentials, clock),
    fields(
        token_url = %token_url,
        credentials.grant_type = R::grant_type().as_str(),
        credentials.client_id = %credentials.client_id(),
    ),
)]
async fn request_token<R: GrantCredentials, C: Clock>(
    client: &ClientWithMiddleware,
    token_url: &Url,
    credentials: &R,
    token_format: TokenFormat,
    clock: &C,
) -> Result<Token, TokenRequestError> {
    tracing::trace!("requesting token from authority");

    let mut url = token_url.clone();
    let form = if R::token_format_in_query() {
        url.query_pairs_mut()
            .append_pair("token_format", token_format.as_str());
        TokenRequestForm {
            credentials,
            token_format: None,
        }
    } else {
        TokenRequestForm {
            credentials,
            token_format: Some(token_format),
        }
    };

    let resp = client
        .post(url.clone())
        .header(header::ACCEPT, "application/json")
        .header(
            header::AUTHORIZATION,
            basic_authorization(credentials.client_id(), credentials.client_secret()),
        )
        .form(&form)
        .send()
        .await
        .map_err(|source| TokenRequestError::RequestSend {
            url: url.clone(),
            source,
        })?;

    let status = resp.status();
    tracing::debug!(
        response.status = status.as_u16(),
        "received token response from issuing authority"
    );

    if !status.is_success() {
        let body = resp
            .text()
            .await
            .map_err(TokenRequestError::BodyReadError)?;
        return Err(TokenRequestError::ErrorWithBody {
            url,
            status,
            body,
        });
    }

    let body = resp
        .bytes()
        .await
        .map_err(TokenRequestError::BodyReadError)?;
    let resp: dto::TokenResponse =
        serde_json::from_slice(&body).map_err(|source| TokenRequestError::TokenBodyError {
            source,
            body: String::from_utf8_lossy(&body).into_owned(),
        })?;

    let access_token = match resp.access_token {
        Some(access_token) if !access_token.as_str().is_empty() => access_token,
        _ => return Err(TokenRequestError::MissingAccessToken),
    };

    let lifetime = resp
        .expires_in
        .filter(|secs| *secs > 0)
        .map(|secs| Duration::from_secs(secs.unsigned_abs()))
        .unwrap_or_default();

    let has_refresh_token = resp.refresh_token.is_some();
    let has_id_token = resp.id_token.is_some();

    let mut token = Token::new(access_token, resp.token_type.unwrap_or_default())
        .with_lifetime(clock.now(), lifetime);
    if let Some(refresh_token) = resp.refresh_token {
        token = token.with_refresh_token(refresh_token);
    }
    if let Some(id_token) = resp.id_token {
        token = token.with_id_token(id_token);
    }
    if let Some(scope) = resp.scope {
        token = token.with_scope(scope);
    }

    tracing::info!(
        has_id_token,
        has_refresh_token,
        lifetime = lifetime.as_secs(),
        expiry = token.expiry().map(|e| e.0),
        jti = resp.jti.as_deref(),
        "received new tokens"
    );

    Ok(token)
}
