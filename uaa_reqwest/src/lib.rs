//! Middleware and transport stacks for talking to a UAA server
//!
//! Requests to a UAA pass through a small, fixed stack of
//! [`reqwest_middleware`] layers, described by a [`Transport`]:
//!
//! * [`AccessTokenMiddleware`] attaches the current access token from a
//!   [`TokenProvider`] to each outbound request,
//! * [`UaaTransport`] sets the `User-Agent`, marks Basic credentials with the
//!   `X-CF-ENCODED-CREDENTIALS` header and optionally dumps each exchange, and
//! * a [`ClientTransport`] at the bottom carries the timeout and TLS settings
//!   of the underlying [`reqwest::Client`].
//!
//! If a request already has specified an `Authorization` header value by
//! the time that the access token middleware executes, the existing value
//! will be left in place, allowing overrides to be specified as required.
//!
//! ```
//! use std::sync::Arc;
//!
//! use uaa_reqwest::AccessTokenMiddleware;
//! use uaa_tokens::{sources::StaticTokenSource, Token};
//! use reqwest::Client;
//! use reqwest_middleware::ClientBuilder;
//!
//! # #[tokio::main(flavor = "current_thread")] async fn main() {
//! let provider = Arc::new(StaticTokenSource::new(Token::bearer("token")));
//!
//! let client = ClientBuilder::new(Client::default())
//!     .with(AccessTokenMiddleware::new(provider))
//!     .build();
//!
//! let req = client
//!     .get("https://example.com");
//! # async move { req
//!     .send()
//!     .await
//!     .unwrap();
//! # };
//! # }
//! ```
//!
//! The middleware can also be configured to add an authorization token
//! only conditionally. These predicates can be composed together to
//! evaluate more complex requirements prior to attaching a token to a
//! request.
//!
//! ```
//! use std::sync::Arc;
//!
//! use uaa_reqwest::{AccessTokenMiddleware, HttpsOnly, SameOrigin};
//! use uaa_tokens::{sources::StaticTokenSource, Token};
//! use predicates::prelude::PredicateBooleanExt;
//!
//! let provider = Arc::new(StaticTokenSource::new(Token::bearer("token")));
//! let uaa = url::Url::parse("https://uaa.example.com").unwrap();
//!
//! AccessTokenMiddleware::new(provider)
//!     .with_predicate(HttpsOnly.and(SameOrigin::new(&uaa)));
//! ```

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

use std::{fmt, sync::Arc};

use bytes::{BufMut, BytesMut};
use predicates::{prelude::*, reflection};
use reqwest::{header, Request, Response};
use reqwest_middleware::{Middleware, Next, Result};
use thiserror::Error;
use uaa_tokens::{TokenError, TokenProvider};

mod transport;
mod uaa_transport;

pub use transport::{ClientTransport, TlsSettings, Transport};
pub use uaa_transport::{
    format_request, format_response, UaaTransport, DEFAULT_USER_AGENT, ENCODED_CREDENTIALS,
};

/// A middleware that injects an access token into outgoing requests
#[derive(Clone, Debug)]
pub struct AccessTokenMiddleware<P> {
    provider: Arc<dyn TokenProvider>,
    predicate: P,
}

impl AccessTokenMiddleware<HttpsOnly> {
    /// Construct a new middleware from a token provider
    ///
    /// By default, this middleware will only send its token if the request
    /// is being sent via HTTPS. To change this behavior, provide a
    /// custom predicate with [`with_predicate()`][Self::with_predicate()].
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            predicate: HttpsOnly,
        }
    }
}

impl<P> AccessTokenMiddleware<P> {
    /// Replaces the current predicate with a custom predicate
    pub fn with_predicate<Q>(self, predicate: Q) -> AccessTokenMiddleware<Q> {
        AccessTokenMiddleware {
            provider: self.provider,
            predicate,
        }
    }

    /// The provider backing this middleware
    pub fn provider(&self) -> &Arc<dyn TokenProvider> {
        &self.provider
    }

    async fn get_token_from_source(
        &self,
    ) -> std::result::Result<header::HeaderValue, AuthorizationError> {
        let token = self.provider.token().await?;

        tracing::trace!(
            token.status = ?token.status(),
            token.expiry = token.expiry().map(|e| e.0),
            "obtained access token"
        );

        let scheme = token.authorization_scheme();
        let access_token = token.access_token().as_str();

        let mut header_value = BytesMut::with_capacity(scheme.len() + access_token.len() + 1);
        header_value.put_slice(scheme.as_bytes());
        header_value.put_u8(b' ');
        header_value.put_slice(access_token.as_bytes());
        let mut value = header::HeaderValue::from_maybe_shared(header_value.freeze())?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// An error attaching an access token to a request
#[derive(Debug, Error)]
pub enum AuthorizationError {
    /// No usable token could be obtained
    #[error("unable to obtain an access token: {0}")]
    Token(#[from] TokenError),
    /// The token cannot be represented in a header
    #[error("access token is not a valid header value")]
    InvalidHeader(#[from] header::InvalidHeaderValue),
}

#[async_trait::async_trait]
impl<P> Middleware for AccessTokenMiddleware<P>
where
    P: Predicate<Request> + Send + Sync + 'static,
{
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        if self.predicate.eval(&req) && !req.headers().contains_key(header::AUTHORIZATION) {
            let value = self
                .get_token_from_source()
                .await
                .map_err(reqwest_middleware::Error::middleware)?;
            req.headers_mut().insert(header::AUTHORIZATION, value);
        }

        next.run(req, extensions).await
    }
}

/// Only attach an access token if the request is being sent over HTTPS
#[derive(Clone, Copy, Debug)]
pub struct HttpsOnly;

impl Predicate<Request> for HttpsOnly {
    #[inline]
    fn eval(&self, req: &Request) -> bool {
        req.url().scheme() == "https"
    }

    fn find_case(&self, expected: bool, req: &Request) -> Option<reflection::Case> {
        let result = self.eval(req);
        if result != expected {
            Some(
                reflection::Case::new(Some(self), result).add_product(reflection::Product::new(
                    "scheme",
                    req.url().scheme().to_owned(),
                )),
            )
        } else {
            None
        }
    }
}

impl reflection::PredicateReflection for HttpsOnly {}
impl fmt::Display for HttpsOnly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scheme is https")
    }
}

/// Only attach an access token if the request is being sent to the same
/// origin (scheme, host and port) as the UAA target
#[derive(Clone, Debug)]
pub struct SameOrigin {
    origin: url::Origin,
}

impl SameOrigin {
    /// Construct a new predicate from the target's base URL
    pub fn new(target: &url::Url) -> Self {
        Self {
            origin: target.origin(),
        }
    }
}

impl Predicate<Request> for SameOrigin {
    #[inline]
    fn eval(&self, req: &Request) -> bool {
        req.url().origin() == self.origin
    }

    fn find_case(&self, expected: bool, req: &Request) -> Option<reflection::Case> {
        let result = self.eval(req);
        if result != expected {
            Some(
                reflection::Case::new(Some(self), result).add_product(reflection::Product::new(
                    "origin",
                    req.url().origin().ascii_serialization(),
                )),
            )
        } else {
            None
        }
    }
}

impl reflection::PredicateReflection for SameOrigin {}
impl fmt::Display for SameOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("origin == ")?;
        f.write_str(&self.origin.ascii_serialization())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use reqwest::Client;
    use reqwest_middleware::ClientBuilder;
    use uaa_tokens::{clock::UnixTime, sources::StaticTokenSource, Token};

    use super::*;

    const TEST_TOKEN: &str = "this-is-a-test-token";
    const BEARER_TEST_TOKEN: &str = "Bearer this-is-a-test-token";

    struct AuthChecker {
        expected_authorization: String,
        checked: AtomicBool,
    }

    impl AuthChecker {
        pub fn new(expected: impl Into<String>) -> Self {
            Self {
                expected_authorization: expected.into(),
                checked: AtomicBool::new(false),
            }
        }
    }

    #[async_trait::async_trait]
    impl Middleware for AuthChecker {
        async fn handle(
            &self,
            req: Request,
            _: &mut http::Extensions,
            _: Next<'_>,
        ) -> Result<Response> {
            let authorization_header = req
                .headers()
                .get(header::AUTHORIZATION)
                .expect("no authorization header")
                .to_str()
                .expect("authorization header was not valid UTF-8");

            assert_eq!(authorization_header, self.expected_authorization);
            self.checked.store(true, Ordering::Release);

            Ok(http::Response::<&[u8]>::default().into())
        }
    }

    #[derive(Default)]
    struct NoAuthChecker {
        checked: AtomicBool,
    }

    #[async_trait::async_trait]
    impl Middleware for NoAuthChecker {
        async fn handle(
            &self,
            req: Request,
            _: &mut http::Extensions,
            _: Next<'_>,
        ) -> Result<Response> {
            assert_eq!(req.headers().get(header::AUTHORIZATION), None);
            self.checked.store(true, Ordering::Release);

            Ok(http::Response::<&[u8]>::default().into())
        }
    }

    fn prepare_middleware() -> AccessTokenMiddleware<HttpsOnly> {
        AccessTokenMiddleware::new(Arc::new(StaticTokenSource::new(Token::bearer(TEST_TOKEN))))
    }

    mod when_request_does_not_have_an_authorization_header {
        use super::*;

        #[tokio::test]
        async fn middleware_with_defaults_attaches_token_on_https_request() {
            let middleware = prepare_middleware();
            let auth_checker = Arc::new(AuthChecker::new(BEARER_TEST_TOKEN));

            let client = ClientBuilder::new(Client::default())
                .with(middleware)
                .with_arc(auth_checker.clone())
                .build();

            let resp = client.get("https://example.com").send().await.unwrap();

            assert_eq!(resp.status(), http::StatusCode::OK);
            assert!(auth_checker.checked.load(Ordering::Acquire));
        }

        #[tokio::test]
        async fn middleware_uses_the_token_type_as_scheme() {
            let provider = StaticTokenSource::new(Token::new(TEST_TOKEN, "mac"));
            let middleware = AccessTokenMiddleware::new(Arc::new(provider));
            let auth_checker = Arc::new(AuthChecker::new("MAC this-is-a-test-token"));

            let client = ClientBuilder::new(Client::default())
                .with(middleware)
                .with_arc(auth_checker.clone())
                .build();

            client.get("https://example.com").send().await.unwrap();

            assert!(auth_checker.checked.load(Ordering::Acquire));
        }

        mod and_predicate_evaluates_to_attach {
            use super::*;

            #[tokio::test]
            async fn middleware_attaches_access_token() {
                let middleware = prepare_middleware().with_predicate(predicate::always());
                let auth_checker = Arc::new(AuthChecker::new(BEARER_TEST_TOKEN));

                let client = ClientBuilder::new(Client::default())
                    .with(middleware)
                    .with_arc(auth_checker.clone())
                    .build();

                let resp = client.get("http://example.com").send().await.unwrap();

                assert_eq!(resp.status(), http::StatusCode::OK);
                assert!(auth_checker.checked.load(Ordering::Acquire));
            }
        }

        mod and_predicate_evaluates_to_ignore {
            use super::*;

            #[tokio::test]
            async fn middleware_does_not_attach_access_token() {
                let middleware = prepare_middleware().with_predicate(predicate::never());
                let auth_checker = Arc::new(NoAuthChecker::default());

                let client = ClientBuilder::new(Client::default())
                    .with(middleware)
                    .with_arc(auth_checker.clone())
                    .build();

                let resp = client.get("https://example.com").send().await.unwrap();

                assert_eq!(resp.status(), http::StatusCode::OK);
                assert!(auth_checker.checked.load(Ordering::Acquire));
            }
        }

        mod and_the_token_has_expired {
            use super::*;

            #[tokio::test]
            async fn request_fails_before_reaching_the_network() {
                let token = Token::bearer(TEST_TOKEN).with_expiry(UnixTime(1));
                let middleware =
                    AccessTokenMiddleware::new(Arc::new(StaticTokenSource::new(token)));
                let auth_checker = Arc::new(NoAuthChecker::default());

                let client = ClientBuilder::new(Client::default())
                    .with(middleware)
                    .with_arc(auth_checker.clone())
                    .build();

                let err = client
                    .get("https://example.com")
                    .send()
                    .await
                    .unwrap_err();

                assert!(matches!(err, reqwest_middleware::Error::Middleware(_)));
                assert!(!auth_checker.checked.load(Ordering::Acquire));
            }
        }
    }

    mod when_request_already_contains_an_authorization_header {
        use super::*;

        #[tokio::test]
        async fn middleware_does_not_attach_access_token() {
            const OVERRIDE_TOKEN: &str = "overridden!";
            // Reqwest uses a capital `B` bearer
            const BEARER_OVERRIDE_TOKEN: &str = "Bearer overridden!";

            let middleware = prepare_middleware();
            let auth_checker = Arc::new(AuthChecker::new(BEARER_OVERRIDE_TOKEN));

            let client = ClientBuilder::new(Client::default())
                .with(middleware)
                .with_arc(auth_checker.clone())
                .build();

            let resp = client
                .get("https://example.com")
                .bearer_auth(OVERRIDE_TOKEN)
                .send()
                .await
                .unwrap();

            assert_eq!(resp.status(), http::StatusCode::OK);
            assert!(auth_checker.checked.load(Ordering::Acquire));
        }
    }

    mod https_only_predicate {
        use super::*;

        #[test]
        fn matches_when_request_has_https_scheme() {
            let request =
                Request::new(reqwest::Method::GET, "https://example.com".parse().unwrap());
            let predicate = HttpsOnly;
            let result = dbg!(predicate.find_case(true, &request));
            assert!(result.is_none())
        }

        #[test]
        fn does_not_match_when_request_has_http_scheme() {
            let request = Request::new(reqwest::Method::GET, "http://example.com".parse().unwrap());
            let predicate = HttpsOnly;
            let result = dbg!(predicate.find_case(false, &request));
            assert!(result.is_none())
        }
    }

    mod same_origin_predicate {
        use super::*;

        fn uaa() -> url::Url {
            "https://uaa.example.com/context".parse().unwrap()
        }

        #[test]
        fn matches_any_path_on_the_same_origin() {
            let request = Request::new(
                reqwest::Method::GET,
                "https://uaa.example.com/Users?count=1".parse().unwrap(),
            );
            let predicate = SameOrigin::new(&uaa());
            let result = dbg!(predicate.find_case(true, &request));
            assert!(result.is_none())
        }

        #[test]
        fn does_not_match_a_different_host() {
            let request = Request::new(
                reqwest::Method::GET,
                "https://does-not-match.com".parse().unwrap(),
            );
            let predicate = SameOrigin::new(&uaa());
            let result = dbg!(predicate.find_case(false, &request));
            assert!(result.is_none())
        }

        #[test]
        fn does_not_match_a_different_scheme_or_port() {
            let predicate = SameOrigin::new(&uaa());

            let http = Request::new(
                reqwest::Method::GET,
                "http://uaa.example.com/Users".parse().unwrap(),
            );
            assert!(!predicate.eval(&http));

            let port = Request::new(
                reqwest::Method::GET,
                "https://uaa.example.com:8443/Users".parse().unwrap(),
            );
            assert!(!predicate.eval(&port));
        }
    }
}
