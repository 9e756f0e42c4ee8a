//! Reuse of a token until it nears expiry

use std::{fmt, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{AsyncTokenSource, TokenError, TokenProvider};
use crate::clock::{Clock, System};
use crate::Token;

/// A token provider that hands out the same token until it is about to
/// expire, then acquires a new one from the underlying source
///
/// At most one acquisition is in flight at a time. Callers that arrive while
/// a renewal is underway wait for it and receive its result.
pub struct ReuseTokenSource<S, C = System> {
    state: Mutex<State<S>>,
    early_expiry: Duration,
    clock: C,
}

#[derive(Debug)]
struct State<S> {
    source: S,
    token: Option<Token>,
}

impl<S> ReuseTokenSource<S, System> {
    /// Constructs a new reusing token source
    pub fn new(source: S) -> Self {
        Self {
            state: Mutex::new(State {
                source,
                token: None,
            }),
            early_expiry: Duration::from_secs(10),
            clock: System,
        }
    }
}

impl<S, C> ReuseTokenSource<S, C> {
    /// Seeds the source with a token that was already obtained
    pub fn with_initial_token(mut self, token: Token) -> Self {
        self.state.get_mut().token = Some(token);
        self
    }

    /// Sets how long before its actual expiry a token stops being reused
    ///
    /// Defaults to 10 seconds.
    pub fn with_early_expiry(mut self, early_expiry: Duration) -> Self {
        self.early_expiry = early_expiry;
        self
    }

    /// Sets a custom clock to be used
    ///
    /// Useful for testing purposes
    pub fn with_clock<D>(self, clock: D) -> ReuseTokenSource<S, D> {
        ReuseTokenSource {
            state: self.state,
            early_expiry: self.early_expiry,
            clock,
        }
    }
}

impl<S, C> fmt::Debug for ReuseTokenSource<S, C>
where
    S: fmt::Debug,
    C: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ReuseTokenSource")
            .field("state", &self.state)
            .field("early_expiry", &self.early_expiry)
            .field("clock", &self.clock)
            .finish()
    }
}

#[async_trait]
impl<S, C> TokenProvider for ReuseTokenSource<S, C>
where
    S: AsyncTokenSource + fmt::Debug,
    S::Error: Into<TokenError>,
    C: Clock + Send + Sync + fmt::Debug,
{
    async fn token(&self) -> Result<Token, TokenError> {
        let mut state = self.state.lock().await;

        let now = self.clock.now();
        if let Some(token) = &state.token {
            if token.is_valid_for(now, self.early_expiry) {
                tracing::trace!("reusing current token");
                return Ok(token.clone());
            }
            tracing::debug!(
                expiry = token.expiry().map(|e| e.0),
                now = now.0,
                "current token is stale, requesting a new one"
            );
        } else {
            tracing::debug!("no current token, requesting a new one");
        }

        let token = state.source.request_token().await.map_err(Into::into)?;
        state.token = Some(token.clone());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::clock::{TestClock, UnixTime, UnixTimeExt};
    use crate::sources::oauth2::TokenRequestError;

    const NOW: UnixTime = UnixTime(10_000);

    #[derive(Debug, Clone)]
    struct CountingSource {
        calls: Arc<AtomicUsize>,
        lifetime: Duration,
        clock: TestClock,
        fail: bool,
    }

    impl CountingSource {
        fn new(clock: &TestClock, lifetime: Duration) -> Self {
            Self {
                calls: Arc::default(),
                lifetime,
                clock: clock.clone(),
                fail: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AsyncTokenSource for CountingSource {
        type Error = TokenRequestError;

        async fn request_token(&mut self) -> Result<Token, Self::Error> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::task::yield_now().await;
            if self.fail {
                return Err(TokenRequestError::MissingAccessToken);
            }
            Ok(Token::bearer(format!("token-{n}")).with_lifetime(self.clock.now(), self.lifetime))
        }
    }

    #[tokio::test]
    async fn reuses_a_valid_token() {
        let clock = TestClock::new(NOW);
        let inner = CountingSource::new(&clock, Duration::from_secs(300));
        let source = ReuseTokenSource::new(inner.clone()).with_clock(clock.clone());

        let first = source.token().await.unwrap();
        let second = source.token().await.unwrap();

        assert_eq!(first.access_token().as_str(), "token-1");
        assert_eq!(second.access_token().as_str(), "token-1");
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn renews_once_the_token_nears_expiry() {
        let clock = TestClock::new(NOW);
        let inner = CountingSource::new(&clock, Duration::from_secs(300));
        let source = ReuseTokenSource::new(inner.clone()).with_clock(clock.clone());

        source.token().await.unwrap();
        clock.advance(Duration::from_secs(295));
        let renewed = source.token().await.unwrap();

        assert_eq!(renewed.access_token().as_str(), "token-2");
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn initial_token_is_used_without_a_request() {
        let clock = TestClock::new(NOW);
        let inner = CountingSource::new(&clock, Duration::from_secs(300));
        let seed = Token::bearer("seed").with_expiry(NOW.saturating_add(Duration::from_secs(60)));
        let source = ReuseTokenSource::new(inner.clone())
            .with_initial_token(seed)
            .with_clock(clock.clone());

        let token = source.token().await.unwrap();

        assert_eq!(token.access_token().as_str(), "seed");
        assert_eq!(inner.calls(), 0);
    }

    #[tokio::test]
    async fn failures_are_reported_and_retried_on_next_call() {
        let clock = TestClock::new(NOW);
        let mut inner = CountingSource::new(&clock, Duration::from_secs(300));
        inner.fail = true;
        let source = ReuseTokenSource::new(inner.clone()).with_clock(clock.clone());

        assert!(matches!(
            source.token().await,
            Err(TokenError::Request(TokenRequestError::MissingAccessToken))
        ));
        assert!(source.token().await.is_err());
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_a_single_renewal() {
        let clock = TestClock::new(NOW);
        let inner = CountingSource::new(&clock, Duration::from_secs(300));
        let source = Arc::new(ReuseTokenSource::new(inner.clone()).with_clock(clock.clone()));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let source = Arc::clone(&source);
                tokio::spawn(async move { source.token().await })
            })
            .collect();

        for task in tasks {
            let token = task.await.unwrap().unwrap();
            assert_eq!(token.access_token().as_str(), "token-1");
        }
        assert_eq!(inner.calls(), 1);
    }
}
