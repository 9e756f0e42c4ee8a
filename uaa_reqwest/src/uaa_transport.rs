use std::fmt;

use bytes::Bytes;
use console::style;
use reqwest::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Request, Response, ResponseBuilderExt, StatusCode, Url, Version,
};
use reqwest_middleware::{Middleware, Next, Result};

/// The `User-Agent` sent when none is configured
pub const DEFAULT_USER_AGENT: &str = concat!("uaa-rs/", env!("CARGO_PKG_VERSION"));

/// Tells the UAA that Basic credentials were form-URL-encoded before being
/// base64-encoded
pub const ENCODED_CREDENTIALS: HeaderName = HeaderName::from_static("x-cf-encoded-credentials");

/// The UAA-specific request layer
///
/// Sets the `User-Agent`, adds [`ENCODED_CREDENTIALS`] to requests carrying
/// Basic credentials, and when verbose writes each request and response to
/// stdout. Headers holding credentials are never written out.
#[derive(Clone, Debug)]
pub struct UaaTransport {
    user_agent: HeaderValue,
    verbose: bool,
}

impl Default for UaaTransport {
    fn default() -> Self {
        Self {
            user_agent: HeaderValue::from_static(DEFAULT_USER_AGENT),
            verbose: false,
        }
    }
}

impl UaaTransport {
    /// Constructs a layer sending the given `User-Agent`
    pub fn new(user_agent: HeaderValue) -> Self {
        Self {
            user_agent,
            verbose: false,
        }
    }

    /// Enables or disables dumping of requests and responses
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// The `User-Agent` this layer sends
    pub fn user_agent(&self) -> &HeaderValue {
        &self.user_agent
    }

    /// Whether requests and responses are dumped
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

fn uses_basic_auth(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.as_bytes().get(..5))
        .map_or(false, |scheme| scheme.eq_ignore_ascii_case(b"basic"))
}

#[async_trait::async_trait]
impl Middleware for UaaTransport {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        req.headers_mut()
            .insert(header::USER_AGENT, self.user_agent.clone());

        if self.verbose {
            println!("{}", RequestDump(&req));
        }

        if uses_basic_auth(req.headers()) {
            req.headers_mut()
                .insert(ENCODED_CREDENTIALS, HeaderValue::from_static("true"));
        }

        let resp = next.run(req, extensions).await?;

        if !self.verbose {
            return Ok(resp);
        }

        let status = resp.status();
        let version = resp.version();
        let url = resp.url().clone();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;

        let dump = ResponseDump {
            status,
            version,
            headers: &headers,
            body: &body,
        }
        .to_string();
        if status.is_success() {
            println!("{}", style(dump).green());
        } else {
            println!("{}", style(dump).red());
        }

        rebuild_response(status, version, url, headers, body)
    }
}

fn rebuild_response(
    status: StatusCode,
    version: Version,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let mut builder = http::Response::builder()
        .status(status)
        .version(version)
        .url(url);
    if let Some(h) = builder.headers_mut() {
        *h = headers;
    }

    let resp = builder
        .body(body)
        .map_err(reqwest_middleware::Error::middleware)?;
    Ok(Response::from(resp))
}

fn is_secret_header(name: &HeaderName, value: &HeaderValue) -> bool {
    value.is_sensitive()
        || *name == header::AUTHORIZATION
        || *name == header::PROXY_AUTHORIZATION
        || *name == header::COOKIE
        || *name == header::SET_COOKIE
}

fn write_headers(f: &mut fmt::Formatter<'_>, headers: &HeaderMap) -> fmt::Result {
    for (name, value) in headers {
        if is_secret_header(name, value) {
            writeln!(f, "{}: ***", name)?;
        } else {
            writeln!(f, "{}: {}", name, String::from_utf8_lossy(value.as_bytes()))?;
        }
    }
    Ok(())
}

struct RequestDump<'a>(&'a Request);

impl fmt::Display for RequestDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let req = self.0;
        let url = req.url();

        write!(f, "{} {}", req.method(), url.path())?;
        if let Some(query) = url.query() {
            write!(f, "?{}", query)?;
        }
        writeln!(f, " {:?}", req.version())?;

        if let Some(host) = url.host_str() {
            match url.port() {
                Some(port) => writeln!(f, "host: {}:{}", host, port)?,
                None => writeln!(f, "host: {}", host)?,
            }
        }
        write_headers(f, req.headers())
    }
}

struct ResponseDump<'a> {
    status: StatusCode,
    version: Version,
    headers: &'a HeaderMap,
    body: &'a [u8],
}

impl fmt::Display for ResponseDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:?} {}", self.version, self.status)?;
        write_headers(f, self.headers)?;
        writeln!(f)?;
        f.write_str(&String::from_utf8_lossy(self.body))
    }
}

/// Renders a request the way the verbose dump shows it
///
/// The body is omitted and credential-bearing headers are masked.
pub fn format_request(req: &Request) -> String {
    RequestDump(req).to_string()
}

/// Renders a response the way the verbose dump shows it, including the body
pub fn format_response(
    status: StatusCode,
    version: Version,
    headers: &HeaderMap,
    body: &[u8],
) -> String {
    ResponseDump {
        status,
        version,
        headers,
        body,
    }
    .to_string()
}
