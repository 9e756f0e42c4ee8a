use std::fmt;

use uaa_tokens::{
    AuthorizationCode, ClientId, ClientSecret, Password, RefreshToken, Token, TokenFormat,
    Username,
};
use url::Url;

use crate::Error;

/// How an [`Api`][crate::Api] obtains its access tokens
///
/// Exactly one variant is chosen when the `Api` is built.
#[derive(Clone, Debug)]
pub enum Credentials {
    /// A token obtained elsewhere, used as-is until it expires
    Token(Token),
    /// The client credentials grant
    ClientCredentials {
        /// The client ID
        client_id: ClientId,
        /// The client secret
        client_secret: ClientSecret,
        /// The format of issued tokens
        token_format: TokenFormat,
    },
    /// The resource owner password grant
    Password {
        /// The client ID
        client_id: ClientId,
        /// The client secret
        client_secret: ClientSecret,
        /// The user's name
        username: Username,
        /// The user's password
        password: Password,
        /// The format of issued tokens
        token_format: TokenFormat,
    },
    /// The authorization code grant
    ///
    /// The code is redeemed once, when the `Api` is built.
    AuthorizationCode {
        /// The client ID
        client_id: ClientId,
        /// The client secret
        client_secret: ClientSecret,
        /// The code issued by the authorization endpoint
        code: AuthorizationCode,
        /// The redirect URL registered for the client
        redirect_url: Url,
        /// The format of issued tokens
        token_format: TokenFormat,
    },
    /// The refresh token grant
    ///
    /// The refresh token is redeemed once, when the `Api` is built.
    RefreshToken {
        /// The client ID
        client_id: ClientId,
        /// The client secret
        client_secret: ClientSecret,
        /// The refresh token
        refresh_token: RefreshToken,
        /// The format of issued tokens
        token_format: TokenFormat,
    },
    /// No authentication; only unauthenticated endpoints can be called
    None,
}

/// The kind of [`Credentials`] an [`Api`][crate::Api] was built with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthenticationMode {
    /// A caller-supplied token
    Token,
    /// The client credentials grant
    ClientCredentials,
    /// The resource owner password grant
    Password,
    /// The authorization code grant
    AuthorizationCode,
    /// The refresh token grant
    RefreshToken,
    /// No authentication
    None,
}

impl fmt::Display for AuthenticationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Token => "token",
            Self::ClientCredentials => "client_credentials",
            Self::Password => "password",
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
            Self::None => "none",
        })
    }
}

impl Credentials {
    /// Uses a token obtained elsewhere
    pub fn token(token: Token) -> Self {
        Self::Token(token)
    }

    /// Authenticates as a client
    pub fn client_credentials(
        client_id: impl Into<ClientId>,
        client_secret: impl Into<ClientSecret>,
        token_format: TokenFormat,
    ) -> Self {
        Self::ClientCredentials {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_format,
        }
    }

    /// Authenticates as a user with their password
    pub fn password(
        client_id: impl Into<ClientId>,
        client_secret: impl Into<ClientSecret>,
        username: impl Into<Username>,
        password: impl Into<Password>,
        token_format: TokenFormat,
    ) -> Self {
        Self::Password {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            username: username.into(),
            password: password.into(),
            token_format,
        }
    }

    /// Redeems an authorization code
    pub fn authorization_code(
        client_id: impl Into<ClientId>,
        client_secret: impl Into<ClientSecret>,
        code: impl Into<AuthorizationCode>,
        token_format: TokenFormat,
        redirect_url: Url,
    ) -> Self {
        Self::AuthorizationCode {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            code: code.into(),
            redirect_url,
            token_format,
        }
    }

    /// Redeems a refresh token
    pub fn refresh_token(
        client_id: impl Into<ClientId>,
        client_secret: impl Into<ClientSecret>,
        refresh_token: impl Into<RefreshToken>,
        token_format: TokenFormat,
    ) -> Self {
        Self::RefreshToken {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            token_format,
        }
    }

    /// Calls only unauthenticated endpoints
    pub fn none() -> Self {
        Self::None
    }

    /// The kind of these credentials
    pub fn mode(&self) -> AuthenticationMode {
        match self {
            Self::Token(_) => AuthenticationMode::Token,
            Self::ClientCredentials { .. } => AuthenticationMode::ClientCredentials,
            Self::Password { .. } => AuthenticationMode::Password,
            Self::AuthorizationCode { .. } => AuthenticationMode::AuthorizationCode,
            Self::RefreshToken { .. } => AuthenticationMode::RefreshToken,
            Self::None => AuthenticationMode::None,
        }
    }

    /// Checks the fields that must be present before any exchange
    ///
    /// An empty refresh token is not rejected here; it is reported by the
    /// exchange itself, before anything is sent.
    pub(crate) fn validate(&self) -> Result<(), Error> {
        match self {
            Self::Password { username, .. } if username.as_str().is_empty() => Err(
                Error::InvalidCredentialConfiguration("a username is required".to_owned()),
            ),
            Self::AuthorizationCode { code, .. } if code.as_str().is_empty() => Err(
                Error::InvalidCredentialConfiguration(
                    "an authorization code is required".to_owned(),
                ),
            ),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_constructor_selects_its_mode() {
        let redirect: Url = "https://app.example.com/callback".parse().unwrap();

        assert_eq!(
            Credentials::token(Token::bearer("t")).mode(),
            AuthenticationMode::Token
        );
        assert_eq!(
            Credentials::client_credentials("c", "s", TokenFormat::Opaque).mode(),
            AuthenticationMode::ClientCredentials
        );
        assert_eq!(
            Credentials::password("c", "s", "u", "p", TokenFormat::Jwt).mode(),
            AuthenticationMode::Password
        );
        assert_eq!(
            Credentials::authorization_code("c", "s", "code", TokenFormat::Jwt, redirect).mode(),
            AuthenticationMode::AuthorizationCode
        );
        assert_eq!(
            Credentials::refresh_token("c", "s", "r", TokenFormat::Opaque).mode(),
            AuthenticationMode::RefreshToken
        );
        assert_eq!(Credentials::none().mode(), AuthenticationMode::None);
    }

    #[test]
    fn incomplete_grants_are_rejected() {
        let redirect: Url = "https://app.example.com/callback".parse().unwrap();

        assert!(matches!(
            Credentials::password("c", "s", "", "p", TokenFormat::Opaque).validate(),
            Err(Error::InvalidCredentialConfiguration(_))
        ));
        assert!(matches!(
            Credentials::authorization_code("c", "s", "", TokenFormat::Opaque, redirect)
                .validate(),
            Err(Error::InvalidCredentialConfiguration(_))
        ));
        assert!(Credentials::refresh_token("c", "s", "", TokenFormat::Opaque)
            .validate()
            .is_ok());
    }

    #[test]
    fn secrets_stay_out_of_debug_output() {
        let credentials = Credentials::password("cf", "cf-secret", "marissa", "koala", TokenFormat::Opaque);
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("cf-secret"));
        assert!(!debug.contains("koala"));
    }
}
