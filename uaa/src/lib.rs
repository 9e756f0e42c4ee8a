//! A client for the Cloud Foundry User Account and Authentication server
//!
//! An [`Api`] is built from a target, a set of [`Credentials`] and a
//! [`Config`]. Building it resolves the target, chooses how access tokens
//! are obtained and assembles the HTTP stacks used to call the server.
//! Nothing is returned unless all of that succeeds.
//!
//! ```no_run
//! use uaa::{Api, Config, Credentials, TokenFormat};
//!
//! # #[tokio::main(flavor = "current_thread")] async fn main() -> Result<(), uaa::Error> {
//! let api = Api::new(
//!     "uaa.example.com",
//!     Credentials::client_credentials("admin", "adminsecret", TokenFormat::Jwt),
//!     Config::new().with_zone_id("acme"),
//! )
//! .await?;
//!
//! let token = api.token().await?;
//! println!("expires at {:?}", token.expiry());
//!
//! let keys = api.token_keys().await?;
//! println!("{} signing keys", keys.len());
//! # Ok(())
//! # }
//! ```
//!
//! Endpoints without a typed wrapper can be called through a [`Requester`]:
//!
//! ```no_run
//! # async fn users(api: &uaa::Api) -> Result<(), uaa::Error> {
//! let response = api
//!     .authenticated()
//!     .get("/Users", "filter=userName+eq+%22marissa%22")
//!     .await?;
//! let users: serde_json::Value = api.authenticated().decode(response.url, &response.body)?;
//! # let _ = users;
//! # Ok(())
//! # }
//! ```

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

mod api;
mod config;
mod credentials;
mod error;
mod requester;
pub mod resources;
pub mod target;

pub use api::Api;
pub use config::{Config, Zone, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
pub use credentials::{AuthenticationMode, Credentials};
pub use error::Error;
pub use requester::{RawResponse, Requester};
pub use resources::{
    CurlResponse, HealthStatus, JsonWebKey, JsonWebKeySet, OpenIdConfiguration, UserInfo,
};
pub use target::{resolve, Endpoint};

pub use uaa_reqwest::{ClientTransport, TlsSettings, Transport};
pub use uaa_tokens::{Token, TokenError, TokenFormat, TokenStatus};
