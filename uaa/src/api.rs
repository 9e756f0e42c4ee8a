use std::{fmt, sync::Arc};

use reqwest::header::HeaderValue;
use reqwest_middleware::ClientWithMiddleware;
use uaa_reqwest::{AccessTokenMiddleware, ClientTransport, SameOrigin, Transport, UaaTransport};
use uaa_tokens::{
    sources::{
        oauth2::{dto, OAuth2TokenSource},
        AsyncTokenSource, ReuseTokenSource, StaticTokenSource,
    },
    Token, TokenProvider,
};

use crate::{
    config::DEFAULT_TIMEOUT, requester::Requester, AuthenticationMode, Config, Credentials,
    Endpoint, Error,
};

/// A configured client for one UAA
///
/// Holds the resolved target, the token provider chosen by the
/// [`Credentials`], and two HTTP clients: one that sends requests as they
/// are, used for token exchanges and public endpoints, and one that also
/// attaches an access token.
pub struct Api {
    endpoint: Endpoint,
    config: Config,
    mode: AuthenticationMode,
    provider: Option<Arc<dyn TokenProvider>>,
    unauthenticated_transport: Transport,
    authenticated_transport: Transport,
    unauthenticated: ClientWithMiddleware,
    authenticated: ClientWithMiddleware,
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Api")
            .field("endpoint", &self.endpoint.url().as_str())
            .field("config", &self.config)
            .field("mode", &self.mode)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl Api {
    /// Builds a client for the UAA at `target`
    ///
    /// Authorization codes and refresh tokens are redeemed here, exactly
    /// once. Nothing is returned unless every step succeeds.
    #[tracing::instrument(
        err,
        skip(credentials, config),
        fields(mode = %credentials.mode()),
    )]
    pub async fn new(target: &str, credentials: Credentials, config: Config) -> Result<Self, Error> {
        let mode = credentials.mode();
        let endpoint = crate::resolve(target)?.with_zone(config.zone().cloned());
        credentials.validate()?;

        let uaa_layer = UaaTransport::new(header_value("user-agent", config.user_agent())?)
            .with_verbose(config.verbose());
        if let Some(zone) = config.zone() {
            let (name, value) = zone.header();
            header_value(name, value)?;
        }

        let base = config
            .client()
            .cloned()
            .unwrap_or_else(|| ClientTransport::new().with_timeout(DEFAULT_TIMEOUT));

        let mut unauthenticated_stack = Transport::from(base).with_uaa(uaa_layer);
        finish_stack(&mut unauthenticated_stack, &config);
        let unauthenticated = unauthenticated_stack.build().map_err(Error::HttpClient)?;

        let provider = token_provider(&endpoint, credentials, &unauthenticated).await?;

        let (authenticated_stack, authenticated) = match &provider {
            Some(provider) => {
                let layer = AccessTokenMiddleware::new(Arc::clone(provider))
                    .with_predicate(SameOrigin::new(endpoint.url()));
                let mut stack = unauthenticated_stack.clone().with_bearer(layer);
                finish_stack(&mut stack, &config);
                let client = stack.build().map_err(Error::HttpClient)?;
                (stack, client)
            }
            None => (unauthenticated_stack.clone(), unauthenticated.clone()),
        };

        tracing::debug!(target = %endpoint, "configured UAA client");

        Ok(Self {
            endpoint,
            config,
            mode,
            provider,
            unauthenticated_transport: unauthenticated_stack,
            authenticated_transport: authenticated_stack,
            unauthenticated,
            authenticated,
        })
    }

    /// Returns a currently valid token
    ///
    /// Tokens obtained through a grant are reused until they near expiry and
    /// are then renewed on demand.
    pub async fn token(&self) -> Result<Token, Error> {
        match &self.provider {
            Some(provider) => Ok(provider.token().await?),
            None => Err(Error::NoTokenMechanism),
        }
    }

    /// The resolved target
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// The kind of credentials this client was built with
    pub fn mode(&self) -> AuthenticationMode {
        self.mode
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The client that attaches access tokens to requests for the target
    ///
    /// Without credentials this is the unauthenticated client.
    pub fn authenticated_client(&self) -> &ClientWithMiddleware {
        &self.authenticated
    }

    /// The client that sends requests without an access token
    pub fn unauthenticated_client(&self) -> &ClientWithMiddleware {
        &self.unauthenticated
    }

    /// The layers behind [`authenticated_client()`][Self::authenticated_client()]
    pub fn authenticated_transport(&self) -> &Transport {
        &self.authenticated_transport
    }

    /// The layers behind [`unauthenticated_client()`][Self::unauthenticated_client()]
    pub fn unauthenticated_transport(&self) -> &Transport {
        &self.unauthenticated_transport
    }

    /// A requester for endpoints that require an access token
    pub fn authenticated(&self) -> Requester<'_> {
        Requester::new(self, true)
    }

    /// A requester for public endpoints
    pub fn unauthenticated(&self) -> Requester<'_> {
        Requester::new(self, false)
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader {
        name: name.to_owned(),
        value: value.to_owned(),
    })
}

fn finish_stack(stack: &mut Transport, config: &Config) {
    stack.ensure_timeout(DEFAULT_TIMEOUT);
    stack.apply_tls_trust(config.skip_ssl_validation());
}

async fn token_provider(
    endpoint: &Endpoint,
    credentials: Credentials,
    client: &ClientWithMiddleware,
) -> Result<Option<Arc<dyn TokenProvider>>, Error> {
    let token_url = endpoint.token_url();

    let provider: Arc<dyn TokenProvider> = match credentials {
        Credentials::None => return Ok(None),
        Credentials::Token(token) => {
            let source = StaticTokenSource::new(token);
            source.validate()?;
            Arc::new(source)
        }
        Credentials::ClientCredentials {
            client_id,
            client_secret,
            token_format,
        } => Arc::new(ReuseTokenSource::new(OAuth2TokenSource::new(
            client.clone(),
            token_url,
            dto::ClientCredentials {
                client_id,
                client_secret,
            },
            token_format,
        ))),
        Credentials::Password {
            client_id,
            client_secret,
            username,
            password,
            token_format,
        } => Arc::new(ReuseTokenSource::new(OAuth2TokenSource::new(
            client.clone(),
            token_url,
            dto::PasswordCredentials {
                client_id,
                client_secret,
                username,
                password,
            },
            token_format,
        ))),
        Credentials::AuthorizationCode {
            client_id,
            client_secret,
            code,
            redirect_url,
            token_format,
        } => {
            let mut exchange = OAuth2TokenSource::new(
                client.clone(),
                token_url.clone(),
                dto::AuthorizationCodeCredentials {
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    code,
                    redirect_uri: redirect_url,
                },
                token_format,
            );
            let token = exchange.request_token().await?;

            let renewal = OAuth2TokenSource::new(
                client.clone(),
                token_url,
                dto::RefreshTokenCredentials {
                    client_id,
                    client_secret,
                    refresh_token: token.refresh_token().map(ToOwned::to_owned),
                },
                token_format,
            );
            Arc::new(ReuseTokenSource::new(renewal).with_initial_token(token))
        }
        Credentials::RefreshToken {
            client_id,
            client_secret,
            refresh_token,
            token_format,
        } => {
            let mut exchange = OAuth2TokenSource::new(
                client.clone(),
                token_url,
                dto::RefreshTokenCredentials {
                    client_id,
                    client_secret,
                    refresh_token: Some(refresh_token),
                },
                token_format,
            );
            let token = exchange.request_token().await?;
            Arc::new(ReuseTokenSource::new(exchange).with_initial_token(token))
        }
    };

    Ok(Some(provider))
}
