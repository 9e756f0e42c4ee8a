//! Acquisition and renewal of access tokens issued by a Cloud Foundry UAA
//!
//! Tokens come from a [`TokenProvider`][sources::TokenProvider]. A provider
//! either holds a caller-supplied token ([`StaticTokenSource`][sources::StaticTokenSource])
//! or wraps an OAuth2 grant against the UAA token endpoint in a
//! [`ReuseTokenSource`][sources::ReuseTokenSource], which hands out the same
//! token until it nears expiry and then performs the grant again.
//!
//! ```
//! use uaa_tokens::{sources, ClientId, ClientSecret, TokenFormat};
//!
//! let client = reqwest_middleware::ClientBuilder::new(reqwest::Client::new()).build();
//! let token_url = reqwest::Url::parse("https://uaa.example.com/oauth/token").unwrap();
//!
//! let exchange = sources::oauth2::ClientCredentialsTokenSource::new(
//!     client,
//!     token_url,
//!     sources::oauth2::dto::ClientCredentials {
//!         client_id: ClientId::from_static("admin"),
//!         client_secret: ClientSecret::from_static("adminsecret"),
//!     },
//!     TokenFormat::Jwt,
//! );
//!
//! let provider = sources::ReuseTokenSource::new(exchange);
//! # let _ = provider;
//! ```
//!
//! Secrets and tokens are held in dedicated string types that do not reveal
//! their contents through `Debug` or `Display` unless the alternate flag
//! (`{:#?}`) is used.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod braids;
pub mod clock;
pub mod sources;
mod tokens;

pub use braids::*;
pub use sources::{TokenError, TokenProvider};
pub use tokens::{Token, TokenFormat, TokenStatus, UnknownTokenFormat};
