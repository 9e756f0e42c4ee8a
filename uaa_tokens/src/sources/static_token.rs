//! A token source for a caller-supplied token

use async_trait::async_trait;

use super::{TokenError, TokenProvider};
use crate::clock::{Clock, System};
use crate::{Token, TokenStatus};

/// Hands out a single, fixed token
///
/// There is no way to renew the token: once it expires, every request fails
/// and a new source must be built with a fresh token.
#[derive(Debug)]
pub struct StaticTokenSource<C = System> {
    token: Token,
    clock: C,
}

impl StaticTokenSource<System> {
    /// Constructs a new static token source
    pub fn new(token: Token) -> Self {
        Self {
            token,
            clock: System,
        }
    }
}

impl<C> StaticTokenSource<C> {
    /// Sets a custom clock to be used
    ///
    /// Useful for testing purposes
    pub fn with_clock<D>(self, clock: D) -> StaticTokenSource<D> {
        StaticTokenSource {
            token: self.token,
            clock,
        }
    }
}

impl<C: Clock> StaticTokenSource<C> {
    /// Checks that the held token is currently usable
    pub fn validate(&self) -> Result<&Token, TokenError> {
        match self.token.status_with_clock(&self.clock) {
            TokenStatus::Valid => Ok(&self.token),
            TokenStatus::Empty => Err(TokenError::Empty),
            TokenStatus::Expired => Err(TokenError::Expired(
                self.token.expiry().unwrap_or_default(),
            )),
        }
    }
}

#[async_trait]
impl<C> TokenProvider for StaticTokenSource<C>
where
    C: Clock + Send + Sync + std::fmt::Debug,
{
    async fn token(&self) -> Result<Token, TokenError> {
        self.validate().cloned()
    }
}
