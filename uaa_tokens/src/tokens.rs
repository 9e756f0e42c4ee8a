use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::clock::{Clock, System, UnixTime, UnixTimeExt};
use crate::{AccessToken, AccessTokenRef, IdToken, IdTokenRef, RefreshToken, RefreshTokenRef};

/// The format in which the UAA should issue access tokens
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenFormat {
    /// An opaque reference token, resolved by the UAA on use
    #[default]
    Opaque,
    /// A self-contained, signed JSON Web Token
    Jwt,
}

impl TokenFormat {
    /// The value sent in the `token_format` parameter
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Opaque => "opaque",
            Self::Jwt => "jwt",
        }
    }
}

impl fmt::Display for TokenFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value is neither `opaque` nor `jwt`
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown token format {0:?}, expected \"opaque\" or \"jwt\"")]
pub struct UnknownTokenFormat(String);

impl FromStr for TokenFormat {
    type Err = UnknownTokenFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("opaque") {
            Ok(Self::Opaque)
        } else if s.eq_ignore_ascii_case("jwt") {
            Ok(Self::Jwt)
        } else {
            Err(UnknownTokenFormat(s.to_owned()))
        }
    }
}

/// A token's lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStatus {
    /// The token carries an access token and has not expired
    Valid,
    /// The token's expiry has passed
    Expired,
    /// The token has no access token at all
    Empty,
}

/// An access token together with the metadata the authority issued with it
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Token {
    access_token: AccessToken,
    #[serde(default)]
    token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<RefreshToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id_token: Option<IdToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
}

impl Token {
    /// Constructs a token that never expires
    pub fn new(access_token: impl Into<AccessToken>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            refresh_token: None,
            id_token: None,
            expiry: None,
            scope: None,
        }
    }

    /// Constructs a bearer token that never expires
    pub fn bearer(access_token: impl Into<AccessToken>) -> Self {
        Self::new(access_token, "bearer")
    }

    /// Sets the time after which the token is no longer valid
    pub fn with_expiry(mut self, expiry: UnixTime) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Sets the token's expiry relative to `issued`
    ///
    /// A lifetime of zero means that the authority did not report an expiry.
    pub fn with_lifetime(mut self, issued: UnixTime, lifetime: Duration) -> Self {
        self.expiry = if lifetime.is_zero() {
            None
        } else {
            Some(issued.saturating_add(lifetime))
        };
        self
    }

    /// Attaches a refresh token
    pub fn with_refresh_token(mut self, refresh_token: impl Into<RefreshToken>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Attaches an OpenID Connect ID token
    pub fn with_id_token(mut self, id_token: impl Into<IdToken>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    /// Records the scopes granted to the token
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Gets the access token
    #[inline]
    pub fn access_token(&self) -> &AccessTokenRef {
        &self.access_token
    }

    /// Gets the token type as reported by the authority
    #[inline]
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Gets the refresh token, if one was issued
    #[inline]
    pub fn refresh_token(&self) -> Option<&RefreshTokenRef> {
        self.refresh_token.as_deref()
    }

    /// Gets the ID token, if one was issued
    #[inline]
    pub fn id_token(&self) -> Option<&IdTokenRef> {
        self.id_token.as_deref()
    }

    /// Gets the time at which the token expires, if it expires
    #[inline]
    pub fn expiry(&self) -> Option<UnixTime> {
        self.expiry
    }

    /// Gets the space-delimited scopes granted to the token
    #[inline]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// The scheme to use in an `Authorization` header for this token
    ///
    /// Well-known token types are normalized to their canonical casing. An
    /// unspecified type is treated as a bearer token.
    pub fn authorization_scheme(&self) -> &str {
        let token_type = self.token_type.as_str();
        if token_type.is_empty() || token_type.eq_ignore_ascii_case("bearer") {
            "Bearer"
        } else if token_type.eq_ignore_ascii_case("mac") {
            "MAC"
        } else if token_type.eq_ignore_ascii_case("basic") {
            "Basic"
        } else {
            token_type
        }
    }

    /// Gets the token's current lifecycle status
    #[inline]
    pub fn status(&self) -> TokenStatus {
        self.status_with_clock(&System)
    }

    /// Gets the token's lifecycle status as reported by the provided clock
    #[inline]
    pub fn status_with_clock<C: Clock>(&self, clock: &C) -> TokenStatus {
        self.status_at(clock.now())
    }

    /// Gets the token's lifecycle status as of the provided time
    pub fn status_at(&self, time: UnixTime) -> TokenStatus {
        if self.access_token.as_str().is_empty() {
            TokenStatus::Empty
        } else {
            match self.expiry {
                Some(expiry) if time >= expiry => TokenStatus::Expired,
                _ => TokenStatus::Valid,
            }
        }
    }

    /// Whether the token is currently usable
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.status() == TokenStatus::Valid
    }

    /// Whether the token will still be usable `leeway` after `time`
    pub fn is_valid_for(&self, time: UnixTime, leeway: Duration) -> bool {
        self.status_at(time.saturating_add(leeway)) == TokenStatus::Valid
    }

    /// Gets how much longer the token will be valid as of the provided time
    ///
    /// Returns `None` for tokens that never expire.
    pub fn until_expired_at(&self, time: UnixTime) -> Option<Duration> {
        self.expiry
            .map(|expiry| expiry.saturating_duration_since(time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: UnixTime = UnixTime(1_700_000_000);

    #[test]
    fn token_formats_parse_case_insensitively() {
        assert_eq!("JWT".parse(), Ok(TokenFormat::Jwt));
        assert_eq!("opaque".parse(), Ok(TokenFormat::Opaque));
        assert!("bearer".parse::<TokenFormat>().is_err());
    }

    mod status {
        use super::*;

        #[test]
        fn token_without_expiry_is_valid() {
            let token = Token::bearer("test-token");
            assert_eq!(token.status_at(NOW), TokenStatus::Valid);
            assert_eq!(token.until_expired_at(NOW), None);
        }

        #[test]
        fn token_with_future_expiry_is_valid() {
            let expiry = NOW.saturating_add(Duration::from_secs(20));
            let token = Token::bearer("test-token").with_expiry(expiry);
            assert_eq!(token.status_at(NOW), TokenStatus::Valid);
            assert_eq!(
                token.until_expired_at(NOW),
                Some(Duration::from_secs(20))
            );
        }

        #[test]
        fn token_at_or_past_expiry_is_expired() {
            let token = Token::bearer("test-token").with_expiry(NOW);
            assert_eq!(token.status_at(NOW), TokenStatus::Expired);
            assert_eq!(
                token.status_at(NOW.saturating_add(Duration::from_secs(1))),
                TokenStatus::Expired
            );
        }

        #[test]
        fn empty_access_token_is_empty_even_if_unexpired() {
            let token = Token::bearer("").with_expiry(NOW.saturating_add(Duration::from_secs(20)));
            assert_eq!(token.status_at(NOW), TokenStatus::Empty);
        }

        #[test]
        fn leeway_is_applied_before_expiry() {
            let token =
                Token::bearer("test-token").with_expiry(NOW.saturating_add(Duration::from_secs(5)));
            assert!(token.is_valid_for(NOW, Duration::from_secs(4)));
            assert!(!token.is_valid_for(NOW, Duration::from_secs(10)));
        }
    }

    #[test]
    fn zero_lifetime_means_no_expiry() {
        let token = Token::bearer("t").with_lifetime(NOW, Duration::ZERO);
        assert_eq!(token.expiry(), None);

        let token = Token::bearer("t").with_lifetime(NOW, Duration::from_secs(60));
        assert_eq!(token.expiry(), Some(UnixTime(NOW.0 + 60)));
    }

    #[test]
    fn authorization_scheme_is_normalized() {
        assert_eq!(Token::new("t", "bearer").authorization_scheme(), "Bearer");
        assert_eq!(Token::new("t", "BEARER").authorization_scheme(), "Bearer");
        assert_eq!(Token::new("t", "").authorization_scheme(), "Bearer");
        assert_eq!(Token::new("t", "mac").authorization_scheme(), "MAC");
        assert_eq!(Token::new("t", "basic").authorization_scheme(), "Basic");
        assert_eq!(Token::new("t", "DPoP").authorization_scheme(), "DPoP");
    }

    #[test]
    fn token_format_wire_values() {
        assert_eq!(TokenFormat::default(), TokenFormat::Opaque);
        assert_eq!(TokenFormat::Opaque.to_string(), "opaque");
        assert_eq!(TokenFormat::Jwt.to_string(), "jwt");
    }
}
