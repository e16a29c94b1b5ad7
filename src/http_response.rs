use bytes::Bytes;
use http::HeaderMap;
use http::HeaderValue;
use http::StatusCode;
use http::header::AsHeaderName;

///
/// The server's reply to a submitted request, as returned by
/// [`HttpConnection::response()`](crate::HttpConnection).
///
/// Holds the status code, the response headers, and the raw body bytes.
/// Interpreting the body beyond raw bytes or lossy text is left to the
/// calling application.
///
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status_code: StatusCode,
    headers: HeaderMap<HeaderValue>,
    body: Bytes,
}

impl HttpResponse {
    pub(crate) fn new(status_code: StatusCode, headers: HeaderMap<HeaderValue>, body: Bytes) -> Self {
        Self {
            status_code,
            headers,
            body,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    pub fn headers(&self) -> &HeaderMap<HeaderValue> {
        &self.headers
    }

    /// Returns the first value for the given header name, if present.
    pub fn header<N>(&self, name: N) -> Option<&HeaderValue>
    where
        N: AsHeaderName,
    {
        self.headers.get(name)
    }

    /// Returns the body, extracted as a UTF-8 string. Invalid UTF-8 is
    /// replaced, not rejected.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn into_bytes(self) -> Bytes {
        self.body
    }
}

#[cfg(test)]
mod test_text {
    use super::*;

    #[test]
    fn it_should_extract_the_body_as_a_string() {
        let response = HttpResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from("all done"));

        assert_eq!(response.text(), "all done");
    }
}

#[cfg(test)]
mod test_header {
    use super::*;

    #[test]
    fn it_should_find_headers_by_name() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let response = HttpResponse::new(StatusCode::OK, headers, Bytes::new());

        assert_eq!(response.header("content-type").unwrap(), "text/plain");
        assert_eq!(response.header("x-missing"), None);
    }
}
