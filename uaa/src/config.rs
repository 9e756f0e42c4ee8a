use std::time::Duration;

use uaa_reqwest::ClientTransport;

pub use uaa_reqwest::DEFAULT_USER_AGENT;

/// The request timeout applied when the client does not set one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Selects the identity zone a request is made in
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Zone {
    /// Sent as `X-Identity-Zone-Id`
    Id(String),
    /// Sent as `X-Identity-Zone-Subdomain`
    Subdomain(String),
}

impl Zone {
    pub(crate) fn header(&self) -> (&'static str, &str) {
        match self {
            Self::Id(id) => ("x-identity-zone-id", id),
            Self::Subdomain(subdomain) => ("x-identity-zone-subdomain", subdomain),
        }
    }
}

/// Options for an [`Api`][crate::Api]
///
/// Each `with_*` method replaces the previous value of its field, so the
/// last call wins.
#[derive(Clone, Debug, Default)]
pub struct Config {
    client: Option<ClientTransport>,
    zone: Option<Zone>,
    verbose: bool,
    skip_ssl_validation: bool,
    user_agent: Option<String>,
}

impl Config {
    /// The default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `client` as the base of both the authenticated and
    /// unauthenticated transports
    pub fn with_client(mut self, client: ClientTransport) -> Self {
        self.client = Some(client);
        self
    }

    /// Sends every request to the given zone
    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.zone = Some(zone);
        self
    }

    /// Sends every request to the zone with the given ID
    pub fn with_zone_id(self, zone_id: impl Into<String>) -> Self {
        self.with_zone(Zone::Id(zone_id.into()))
    }

    /// Writes each request and response to stdout
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Disables TLS certificate verification
    pub fn with_skip_ssl_validation(mut self, skip: bool) -> Self {
        self.skip_ssl_validation = skip;
        self
    }

    /// Replaces the default `User-Agent`
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// The base client, if one was supplied
    pub fn client(&self) -> Option<&ClientTransport> {
        self.client.as_ref()
    }

    /// The zone requests are made in
    pub fn zone(&self) -> Option<&Zone> {
        self.zone.as_ref()
    }

    /// Whether requests and responses are dumped
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Whether TLS certificate verification is disabled
    pub fn skip_ssl_validation(&self) -> bool {
        self.skip_ssl_validation
    }

    /// The `User-Agent` sent with every request
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::new();
        assert!(config.client().is_none());
        assert!(config.zone().is_none());
        assert!(!config.verbose());
        assert!(!config.skip_ssl_validation());
        assert_eq!(config.user_agent(), DEFAULT_USER_AGENT);
    }

    #[test]
    fn the_last_call_wins() {
        let config = Config::new()
            .with_zone_id("first")
            .with_user_agent("agent/1")
            .with_skip_ssl_validation(true)
            .with_zone(Zone::Subdomain("second".to_owned()))
            .with_user_agent("agent/2")
            .with_skip_ssl_validation(false);

        assert_eq!(config.zone(), Some(&Zone::Subdomain("second".to_owned())));
        assert_eq!(config.user_agent(), "agent/2");
        assert!(!config.skip_ssl_validation());
    }

    #[test]
    fn zones_map_to_their_headers() {
        assert_eq!(
            Zone::Id("z1".to_owned()).header(),
            ("x-identity-zone-id", "z1")
        );
        assert_eq!(
            Zone::Subdomain("acme".to_owned()).header(),
            ("x-identity-zone-subdomain", "acme")
        );
    }
}
