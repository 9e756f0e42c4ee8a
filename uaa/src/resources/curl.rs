use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Version};

use crate::{Api, Error};

/// The response to an arbitrary request
///
/// Unlike the typed endpoints, any status is a response, not an error.
#[derive(Clone, Debug)]
pub struct CurlResponse {
    /// The response status
    pub status: StatusCode,
    /// The HTTP version of the response
    pub version: Version,
    /// The response headers
    pub headers: HeaderMap,
    /// The response body as text
    pub body: String,
}

impl CurlResponse {
    /// The status line and headers, one per line
    ///
    /// Cookies and credentials are masked.
    pub fn header_text(&self) -> String {
        uaa_reqwest::format_response(self.status, self.version, &self.headers, &[])
    }
}

impl Api {
    /// Sends an arbitrary authenticated request
    ///
    /// Each of `header_lines` has the form `Name: value`. Lines naming the
    /// same header are combined, and replace whatever value the request
    /// would otherwise carry for that header.
    #[tracing::instrument(level = "debug", err, skip(self, body, header_lines))]
    pub async fn curl(
        &self,
        path: &str,
        method: Method,
        body: Option<String>,
        header_lines: &[&str],
    ) -> Result<CurlResponse, Error> {
        let headers = parse_header_lines(header_lines)?;

        let (path, query) = path.split_once('?').unwrap_or((path, ""));
        let requester = self.authenticated();
        let url = requester.url_for(path, query);

        let mut builder = requester.builder(method, &url).await?.headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| Error::request_failed(url.clone(), err))?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|err| Error::request_failed(url, err.into()))?;

        Ok(CurlResponse {
            status,
            version,
            headers,
            body,
        })
    }
}

fn parse_header_lines(lines: &[&str]) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();
    for line in lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        let invalid = || Error::InvalidHeader {
            name: line.to_owned(),
            value: String::new(),
        };

        let (name, value) = line.split_once(':').ok_or_else(invalid)?;
        let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| invalid())?;
        let value = value.trim();
        let value = HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader {
            name: name.to_string(),
            value: value.to_owned(),
        })?;
        headers.append(name, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use http::header;

    use super::*;

    #[test]
    fn repeated_lines_are_combined() {
        let headers = parse_header_lines(&[
            "Accept: text/plain",
            "  ",
            "X-Custom: one",
            "x-custom:two",
        ])
        .unwrap();

        assert_eq!(headers[header::ACCEPT], "text/plain");
        let custom: Vec<_> = headers.get_all("x-custom").iter().collect();
        assert_eq!(custom, ["one", "two"]);
    }

    #[test]
    fn lines_without_a_colon_are_rejected() {
        assert!(matches!(
            parse_header_lines(&["Accept text/plain"]),
            Err(Error::InvalidHeader { name, .. }) if name == "Accept text/plain"
        ));
    }

    #[test]
    fn header_text_masks_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::SET_COOKIE, HeaderValue::from_static("JSESSIONID=abc"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = CurlResponse {
            status: StatusCode::OK,
            version: Version::HTTP_11,
            headers,
            body: "{}".to_owned(),
        };

        let text = response.header_text();
        assert!(text.starts_with("HTTP/1.1 200 OK"));
        assert!(text.contains("set-cookie: ***"));
        assert!(text.contains("content-type: application/json"));
        assert!(!text.contains("{}"));
    }
}
