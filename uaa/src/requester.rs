use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use reqwest_middleware::RequestBuilder;
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::{Api, Error};

/// A successful response, fully read
#[derive(Clone, Debug)]
pub struct RawResponse {
    /// The URL that was called
    pub url: Url,
    /// The response status, always a success
    pub status: StatusCode,
    /// The response headers
    pub headers: HeaderMap,
    /// The response body
    pub body: Bytes,
}

/// Builds and sends requests against an [`Api`]'s target
///
/// Every request asks for JSON and carries the configured zone header.
/// Authenticated requesters also carry the current access token, and fail
/// without a request when there is none.
#[derive(Debug)]
pub struct Requester<'a> {
    api: &'a Api,
    authenticated: bool,
    headers: HeaderMap,
}

impl<'a> Requester<'a> {
    pub(crate) fn new(api: &'a Api, authenticated: bool) -> Self {
        Self {
            api,
            authenticated,
            headers: HeaderMap::new(),
        }
    }

    /// Sets a header on every request made by this requester
    ///
    /// Replaces any value set earlier for the same header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The URL for `path` with the raw `query`
    pub fn url_for(&self, path: &str, query: &str) -> Url {
        self.api.endpoint().url_for(path, query)
    }

    /// Sends a request with an optional body and reads the whole response
    ///
    /// Non-success statuses are reported as [`Error::RequestFailed`] along
    /// with the response body.
    #[tracing::instrument(
        level = "debug",
        err,
        skip(self, body),
        fields(authenticated = self.authenticated),
    )]
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &str,
        body: Option<(HeaderValue, Vec<u8>)>,
    ) -> Result<RawResponse, Error> {
        let url = self.url_for(path, query);
        let mut builder = self.builder(method, &url).await?;
        if let Some((content_type, body)) = body {
            builder = builder.header(header::CONTENT_TYPE, content_type).body(body);
        }
        self.send(url, builder).await
    }

    /// Sends a `GET`
    pub async fn get(&self, path: &str, query: &str) -> Result<RawResponse, Error> {
        self.execute(Method::GET, path, query, None).await
    }

    /// Sends a `DELETE`
    pub async fn delete(&self, path: &str, query: &str) -> Result<RawResponse, Error> {
        self.execute(Method::DELETE, path, query, None).await
    }

    /// Sends a `POST` with a form-encoded body
    pub async fn post_form<T>(&self, path: &str, query: &str, form: &T) -> Result<RawResponse, Error>
    where
        T: Serialize + ?Sized,
    {
        let url = self.url_for(path, query);
        let builder = self.builder(Method::POST, &url).await?.form(form);
        self.send(url, builder).await
    }

    /// Sends a `POST` with a JSON body
    pub async fn post_json<T>(&self, path: &str, query: &str, body: &T) -> Result<RawResponse, Error>
    where
        T: Serialize + ?Sized,
    {
        self.execute(Method::POST, path, query, Some(json_body(body)?))
            .await
    }

    /// Sends a `PUT` with a JSON body
    pub async fn put_json<T>(&self, path: &str, query: &str, body: &T) -> Result<RawResponse, Error>
    where
        T: Serialize + ?Sized,
    {
        self.execute(Method::PUT, path, query, Some(json_body(body)?))
            .await
    }

    /// Sends a `PATCH` with a JSON body
    pub async fn patch_json<T>(&self, path: &str, query: &str, body: &T) -> Result<RawResponse, Error>
    where
        T: Serialize + ?Sized,
    {
        self.execute(Method::PATCH, path, query, Some(json_body(body)?))
            .await
    }

    /// Sends a `GET` and decodes the JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &str) -> Result<T, Error> {
        let response = self.get(path, query).await?;
        decode(response.url, &response.body)
    }

    /// Decodes a JSON body received from `url`
    ///
    /// Bodies that do not decode are reported as
    /// [`Error::ResponseUnparseable`] with the raw text.
    pub fn decode<T: DeserializeOwned>(&self, url: Url, body: &[u8]) -> Result<T, Error> {
        decode(url, body)
    }

    pub(crate) async fn builder(&self, method: Method, url: &Url) -> Result<RequestBuilder, Error> {
        let client = if self.authenticated {
            self.api.authenticated_client()
        } else {
            self.api.unauthenticated_client()
        };

        let mut builder = client
            .request(method, url.clone())
            .header(header::ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(zone) = self.api.endpoint().zone() {
            let (name, value) = zone.header();
            builder = builder.header(name, value);
        }

        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }

        if self.authenticated {
            builder = builder.header(header::AUTHORIZATION, self.authorization(url).await?);
        }

        Ok(builder)
    }

    async fn authorization(&self, url: &Url) -> Result<HeaderValue, Error> {
        let missing = || Error::MissingAccessToken { url: url.clone() };

        let token = match self.api.token().await {
            Ok(token) => token,
            Err(Error::NoTokenMechanism) => return Err(missing()),
            Err(err) => return Err(err),
        };
        if token.access_token().as_str().is_empty() {
            return Err(missing());
        }

        let mut value = HeaderValue::try_from(format!("bearer {}", token.access_token().as_str()))
            .map_err(|_| Error::InvalidHeader {
                name: header::AUTHORIZATION.to_string(),
                value: "***".to_owned(),
            })?;
        value.set_sensitive(true);
        Ok(value)
    }

    async fn send(&self, url: Url, builder: RequestBuilder) -> Result<RawResponse, Error> {
        let response = builder
            .send()
            .await
            .map_err(|err| Error::request_failed(url.clone(), err))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| Error::request_failed(url.clone(), err.into()))?;

        if !status.is_success() {
            tracing::debug!(%url, %status, "request was not successful");
            return Err(Error::RequestFailed {
                url,
                status: Some(status),
                body: String::from_utf8_lossy(&body).into_owned(),
                source: None,
            });
        }

        Ok(RawResponse {
            url,
            status,
            headers,
            body,
        })
    }
}

fn json_body<T: Serialize + ?Sized>(body: &T) -> Result<(HeaderValue, Vec<u8>), Error> {
    let bytes = serde_json::to_vec(body).map_err(Error::RequestBody)?;
    Ok((HeaderValue::from_static("application/json"), bytes))
}

pub(crate) fn decode<T: DeserializeOwned>(url: Url, body: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(body).map_err(|source| Error::ResponseUnparseable {
        url,
        raw_body: String::from_utf8_lossy(body).into_owned(),
        source,
    })
}
