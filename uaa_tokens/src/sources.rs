//! Token sources

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::clock::UnixTime;
use crate::Token;

pub mod oauth2;
pub mod reuse;
pub mod static_token;

pub use reuse::ReuseTokenSource;
pub use static_token::StaticTokenSource;

/// An asynchronous source for tokens that performs a fresh acquisition on
/// every request
///
/// Implementations do not cache. Wrap them in a [`ReuseTokenSource`] to hand
/// out the same token until it expires.
#[async_trait]
pub trait AsyncTokenSource: Send + Sync {
    /// The error type returned in the event that retrieving a token fails
    type Error: std::error::Error + Send + Sync + 'static;

    /// Requests a token from an asynchronous source
    async fn request_token(&mut self) -> Result<Token, Self::Error>;
}

/// A shared provider of currently valid tokens
///
/// This is the seam between the credential strategies and the HTTP layer:
/// anything that can produce a usable token on demand can back an
/// authenticated transport.
#[async_trait]
pub trait TokenProvider: Send + Sync + fmt::Debug {
    /// Returns a token that is valid at the time of the call
    async fn token(&self) -> Result<Token, TokenError>;
}

/// An error obtaining a usable token
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token holds no access token
    #[error("the supplied token is empty")]
    Empty,
    /// The token expired and cannot be renewed
    #[error("the supplied token expired at {}", .0.0)]
    Expired(UnixTime),
    /// A token exchange with the authority failed
    #[error(transparent)]
    Request(#[from] oauth2::TokenRequestError),
}
