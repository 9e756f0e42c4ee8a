//! Resolution of a UAA target into a base URL

use std::{fmt, str::FromStr};

use url::{Host, Url};

use crate::{Error, Zone};

/// A validated UAA base URL
///
/// Always an absolute `http` or `https` URL with a host, and without a
/// query, a fragment or a trailing `/`. Request paths are joined onto its
/// path. May also name the identity zone requests are made in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
    base_path: String,
    zone: Option<Zone>,
}

/// Resolves a target string into an [`Endpoint`]
///
/// Targets without a scheme are assumed to be `https`.
pub fn resolve(target: &str) -> Result<Endpoint, Error> {
    let trimmed = target.trim();
    if trimmed.is_empty() {
        return Err(Error::MissingTarget);
    }

    let invalid = |message: String| Error::InvalidTarget {
        target: target.to_owned(),
        message,
    };

    let candidate = if trimmed.contains("://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    };

    let mut url = Url::parse(&candidate).map_err(|err| invalid(err.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(invalid(format!("unsupported scheme {scheme:?}"))),
    }

    match url.host() {
        Some(Host::Domain(domain)) => {
            if let Some(c) = domain
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
            {
                return Err(invalid(format!("invalid character {c:?} in host")));
            }
        }
        Some(Host::Ipv4(_) | Host::Ipv6(_)) => {}
        None => return Err(invalid("missing host".to_owned())),
    }

    if url.query().is_some() {
        return Err(invalid("a target may not have a query".to_owned()));
    }
    if url.fragment().is_some() {
        return Err(invalid("a target may not have a fragment".to_owned()));
    }

    let base_path = url.path().trim_end_matches('/').to_owned();
    url.set_path(&base_path);

    Ok(Endpoint {
        url,
        base_path,
        zone: None,
    })
}

impl Endpoint {
    /// Scopes this endpoint to `zone`, or to the default zone with `None`
    pub fn with_zone(mut self, zone: Option<Zone>) -> Self {
        self.zone = zone;
        self
    }

    /// The identity zone requests are made in, if not the default one
    pub fn zone(&self) -> Option<&Zone> {
        self.zone.as_ref()
    }

    /// The base URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The URL scheme, `http` or `https`
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// The host name or address
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// The URL for `path` under this endpoint, with `query` as its raw query
    ///
    /// An empty `query` leaves the URL without one.
    pub fn url_for(&self, path: &str, query: &str) -> Url {
        let mut url = self.url.clone();
        url.set_path(&format!(
            "{}/{}",
            self.base_path,
            path.trim_start_matches('/')
        ));
        url.set_query(Some(query).filter(|q| !q.is_empty()));
        url
    }

    /// The token endpoint
    pub fn token_url(&self) -> Url {
        self.url_for("/oauth/token", "")
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        resolve(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.url, f)
    }
}
