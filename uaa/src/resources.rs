//! Endpoints served by every UAA

mod curl;
mod discovery;
mod health;
mod token_keys;
mod userinfo;

pub use curl::CurlResponse;
pub use discovery::OpenIdConfiguration;
pub use health::HealthStatus;
pub use token_keys::{JsonWebKey, JsonWebKeySet};
pub use userinfo::UserInfo;
