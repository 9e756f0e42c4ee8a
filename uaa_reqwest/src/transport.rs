use std::{sync::Arc, time::Duration};

use reqwest::{tls, Certificate};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware};

use crate::{AccessTokenMiddleware, SameOrigin, UaaTransport};

/// TLS settings applied to the underlying client
#[derive(Clone, Debug, Default)]
pub struct TlsSettings {
    /// Accept any server certificate, including invalid or self-signed ones
    pub accept_invalid_certs: bool,
    /// Additional trusted root certificates
    pub root_certificates: Vec<Certificate>,
    /// The minimum TLS version to negotiate
    pub min_version: Option<tls::Version>,
}

/// The innermost layer of a transport stack: the HTTP client itself
#[derive(Clone, Debug, Default)]
pub struct ClientTransport {
    timeout: Option<Duration>,
    tls: Option<TlsSettings>,
}

impl ClientTransport {
    /// A client with no timeout and the default TLS configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the total timeout of each request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replaces the TLS configuration
    pub fn with_tls(mut self, tls: TlsSettings) -> Self {
        self.tls = Some(tls);
        self
    }

    /// The request timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The custom TLS configuration, if any
    pub fn tls(&self) -> Option<&TlsSettings> {
        self.tls.as_ref()
    }

    /// Builds the [`reqwest::Client`] this layer describes
    pub fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(tls) = &self.tls {
            if tls.accept_invalid_certs {
                tracing::warn!("TLS certificate verification is disabled");
                builder = builder.danger_accept_invalid_certs(true);
            }
            for cert in &tls.root_certificates {
                builder = builder.add_root_certificate(cert.clone());
            }
            if let Some(min_version) = tls.min_version {
                builder = builder.min_tls_version(min_version);
            }
        }

        builder.build()
    }
}

/// A stack of request layers over a [`ClientTransport`]
///
/// Each wrapping variant exposes the layer beneath it through
/// [`inner()`][Self::inner()], so settings that belong to the client can be
/// applied no matter how many layers sit on top of it.
#[derive(Clone, Debug)]
pub enum Transport {
    /// The HTTP client itself
    Client(ClientTransport),
    /// The UAA request layer
    Uaa {
        /// The layer's settings
        layer: UaaTransport,
        /// The wrapped transport
        inner: Box<Transport>,
    },
    /// Access token injection
    Bearer {
        /// The middleware attaching tokens
        layer: AccessTokenMiddleware<SameOrigin>,
        /// The wrapped transport
        inner: Box<Transport>,
    },
}

impl From<ClientTransport> for Transport {
    fn from(client: ClientTransport) -> Self {
        Self::Client(client)
    }
}

impl Transport {
    /// Wraps this stack in a UAA request layer
    pub fn with_uaa(self, layer: UaaTransport) -> Self {
        Self::Uaa {
            layer,
            inner: Box::new(self),
        }
    }

    /// Wraps this stack in an access token layer
    pub fn with_bearer(self, layer: AccessTokenMiddleware<SameOrigin>) -> Self {
        Self::Bearer {
            layer,
            inner: Box::new(self),
        }
    }

    /// The layer directly beneath this one
    pub fn inner(&self) -> Option<&Transport> {
        match self {
            Self::Client(_) => None,
            Self::Uaa { inner, .. } | Self::Bearer { inner, .. } => Some(inner.as_ref()),
        }
    }

    /// The layer directly beneath this one, mutably
    pub fn inner_mut(&mut self) -> Option<&mut Transport> {
        match self {
            Self::Client(_) => None,
            Self::Uaa { inner, .. } | Self::Bearer { inner, .. } => Some(inner.as_mut()),
        }
    }

    /// The client at the bottom of the stack
    pub fn innermost(&self) -> &ClientTransport {
        match self {
            Self::Client(client) => client,
            Self::Uaa { inner, .. } | Self::Bearer { inner, .. } => inner.innermost(),
        }
    }

    /// The client at the bottom of the stack, mutably
    pub fn innermost_mut(&mut self) -> &mut ClientTransport {
        match self {
            Self::Client(client) => client,
            Self::Uaa { inner, .. } | Self::Bearer { inner, .. } => inner.innermost_mut(),
        }
    }

    /// Disables certificate verification on the client when `skip` is set
    ///
    /// With `skip` unset the client's TLS configuration is left exactly as it
    /// is, whether default or custom.
    pub fn apply_tls_trust(&mut self, skip: bool) {
        if skip {
            self.innermost_mut()
                .tls
                .get_or_insert_with(TlsSettings::default)
                .accept_invalid_certs = true;
        }
    }

    /// Gives the client a timeout of `default` unless it already has one
    pub fn ensure_timeout(&mut self, default: Duration) {
        self.innermost_mut().timeout.get_or_insert(default);
    }

    /// Builds a client that runs each layer, outermost first
    pub fn build(&self) -> Result<ClientWithMiddleware, reqwest::Error> {
        let mut layers: Vec<Arc<dyn Middleware>> = Vec::new();
        let mut current = self;

        let client = loop {
            match current {
                Self::Client(client) => break client.build_client()?,
                Self::Uaa { layer, inner } => {
                    layers.push(Arc::new(layer.clone()));
                    current = inner.as_ref();
                }
                Self::Bearer { layer, inner } => {
                    layers.push(Arc::new(layer.clone()));
                    current = inner.as_ref();
                }
            }
        };

        let builder = layers
            .into_iter()
            .fold(ClientBuilder::new(client), ClientBuilder::with_arc);
        Ok(builder.build())
    }
}
