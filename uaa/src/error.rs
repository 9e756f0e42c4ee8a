use reqwest::StatusCode;
use thiserror::Error;
use uaa_tokens::{sources::oauth2::TokenRequestError, TokenError};
use url::Url;

/// Errors that can occur while configuring or calling a UAA
#[derive(Debug, Error)]
pub enum Error {
    /// No target was supplied
    #[error("the target is missing")]
    MissingTarget,
    /// The target could not be used as a UAA base URL
    #[error("the target {target:?} is not a valid URL: {message}")]
    InvalidTarget {
        /// The target as supplied
        target: String,
        /// Why the target was rejected
        message: String,
    },
    /// The credentials cannot be used as supplied
    #[error("invalid credential configuration: {0}")]
    InvalidCredentialConfiguration(String),
    /// A configured value cannot be sent as a header
    #[error("the value {value:?} is not valid for the {name} header")]
    InvalidHeader {
        /// The header
        name: String,
        /// The rejected value
        value: String,
    },
    /// The token endpoint could not be reached or refused the exchange
    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(#[source] TokenRequestError),
    /// The token endpoint answered successfully but without a usable token
    #[error("token response was malformed: {0}")]
    TokenResponseMalformed(#[source] TokenRequestError),
    /// The supplied token is empty or has expired
    #[error("you have supplied an empty, invalid, or expired token: {0}")]
    TokenExpiredOrEmpty(#[source] TokenError),
    /// The configuration provides no way to obtain a token
    #[error("your configuration provides no way to get a token")]
    NoTokenMechanism,
    /// An authenticated call was attempted without an access token
    #[error("an access token is required to call {url}")]
    MissingAccessToken {
        /// The URL that would have been called
        url: Url,
    },
    /// A call failed in transit or returned a non-success status
    #[error(
        "an error occurred while calling {url}{}",
        describe_failure(.status, .body, .source)
    )]
    RequestFailed {
        /// The URL called
        url: Url,
        /// The response status, if a response was received
        status: Option<StatusCode>,
        /// The response body, if a response was received
        body: String,
        /// The transport error, if no response was received
        #[source]
        source: Option<reqwest_middleware::Error>,
    },
    /// A call succeeded but its body could not be decoded
    #[error(
        "an unknown error occurred while parsing response from {url}: {source}. Response was {raw_body}"
    )]
    ResponseUnparseable {
        /// The URL called
        url: Url,
        /// The body exactly as received
        raw_body: String,
        /// The decoding error
        #[source]
        source: serde_json::Error,
    },
    /// The HTTP client could not be constructed
    #[error("unable to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// A request body could not be encoded
    #[error("unable to encode request body: {0}")]
    RequestBody(#[source] serde_json::Error),
}

fn describe_failure(
    status: &Option<StatusCode>,
    body: &str,
    source: &Option<reqwest_middleware::Error>,
) -> String {
    match (status, source) {
        (Some(status), _) if body.is_empty() => format!(": status {status}"),
        (Some(status), _) => format!(": status {status}: {body}"),
        (None, Some(source)) => format!(": {source}"),
        (None, None) => String::new(),
    }
}

impl Error {
    /// Whether the failure was caused by a request timing out
    ///
    /// Timeouts are reported as [`TokenExchangeFailed`][Error::TokenExchangeFailed]
    /// or [`RequestFailed`][Error::RequestFailed] like any other transport
    /// failure.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::TokenExchangeFailed(err) => err.is_timeout(),
            Self::RequestFailed {
                source: Some(reqwest_middleware::Error::Reqwest(err)),
                ..
            } => err.is_timeout(),
            _ => false,
        }
    }

    /// The status of the response behind this error, if there was one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::RequestFailed { status, .. } => *status,
            Self::TokenExchangeFailed(TokenRequestError::ErrorWithBody { status, .. }) => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub(crate) fn request_failed(url: Url, source: reqwest_middleware::Error) -> Self {
        Self::RequestFailed {
            url,
            status: None,
            body: String::new(),
            source: Some(source),
        }
    }
}

impl From<TokenRequestError> for Error {
    fn from(err: TokenRequestError) -> Self {
        if err.is_malformed_response() {
            Self::TokenResponseMalformed(err)
        } else {
            Self::TokenExchangeFailed(err)
        }
    }
}

impl From<TokenError> for Error {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Request(err) => err.into(),
            err => Self::TokenExpiredOrEmpty(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use uaa_tokens::clock::UnixTime;

    use super::*;

    fn url() -> Url {
        "https://uaa.example.com/Users".parse().unwrap()
    }

    #[test]
    fn token_request_failures_are_classified() {
        let malformed: Error = TokenRequestError::MissingAccessToken.into();
        assert!(matches!(malformed, Error::TokenResponseMalformed(_)));

        let refused: Error = TokenRequestError::MissingRefreshToken.into();
        assert!(matches!(refused, Error::TokenExchangeFailed(_)));
        assert!(refused.to_string().contains("refresh token is not set"));
    }

    #[test]
    fn token_errors_unwrap_exchange_failures() {
        let err: Error = TokenError::Request(TokenRequestError::MissingAccessToken).into();
        assert!(matches!(err, Error::TokenResponseMalformed(_)));

        let err: Error = TokenError::Expired(UnixTime(5)).into();
        assert!(matches!(err, Error::TokenExpiredOrEmpty(_)));
    }

    #[test]
    fn request_failure_with_status_names_url_status_and_body() {
        let err = Error::RequestFailed {
            url: url(),
            status: Some(StatusCode::FORBIDDEN),
            body: r#"{"error":"access_denied"}"#.to_owned(),
            source: None,
        };

        assert_eq!(
            err.to_string(),
            r#"an error occurred while calling https://uaa.example.com/Users: status 403 Forbidden: {"error":"access_denied"}"#
        );
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert!(!err.is_timeout());
    }

    #[test]
    fn unparseable_response_keeps_the_raw_body() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::ResponseUnparseable {
            url: url(),
            raw_body: "{".to_owned(),
            source,
        };

        assert!(err.to_string().ends_with("Response was {"));
    }
}
