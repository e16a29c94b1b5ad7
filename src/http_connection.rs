use anyhow::Context;
use anyhow::Result;
use anyhow::ensure;
use bytes::Bytes;
use http::HeaderMap;
use http::HeaderName;
use http::HeaderValue;
use http::StatusCode;
use std::io;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::net::TcpStream;
use url::Url;

use crate::Connection;
use crate::HttpResponse;

///
/// A blocking [`Connection`] over plain TCP, for `http` URLs.
///
/// The body sink buffers in memory; closing the output sends the whole
/// request with a `Content-Length` header and `Connection: close`, which is
/// also what frames the response body when it is read back. A server that
/// replies with `Transfer-Encoding: chunked` anyway will leave the chunk
/// framing in the response bytes; the chunks are not decoded.
///
/// TLS, redirects, and connection reuse are out of scope. Anything beyond
/// plain single-shot http needs its own [`Connection`] implementation.
///
#[derive(Debug)]
pub struct HttpConnection {
    stream: TcpStream,
    host: String,
    request_target: String,
    headers: Vec<(HeaderName, HeaderValue)>,
    is_output_enabled: bool,
    body: Option<Vec<u8>>,
    is_body_sent: bool,
}

impl HttpConnection {
    /// Opens a TCP connection to the host and port of the given URL.
    ///
    /// Only the `http` scheme is supported.
    pub fn open(url: &Url) -> Result<Self> {
        ensure!(
            url.scheme() == "http",
            "Only plain http URLs are supported, received '{url}'"
        );

        let host = url
            .host_str()
            .with_context(|| format!("Expected a host in the URL '{url}'"))?
            .to_string();
        let port = url.port_or_known_default().unwrap_or(80);

        let stream = TcpStream::connect((host.as_str(), port))
            .with_context(|| format!("Failed to connect to {host}:{port}"))?;

        Ok(Self {
            stream,
            host: build_host_header(&host, url.port()),
            request_target: build_request_target(url),
            headers: vec![],
            is_output_enabled: false,
            body: None,
            is_body_sent: false,
        })
    }
}

impl Connection for HttpConnection {
    type Response = HttpResponse;

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<()> {
        match self.headers.iter_mut().find(|(existing, _)| *existing == name) {
            Some(header) => header.1 = value,
            None => self.headers.push((name, value)),
        }

        Ok(())
    }

    fn set_do_output(&mut self, enabled: bool) {
        self.is_output_enabled = enabled;
    }

    fn output(&mut self) -> io::Result<&mut dyn Write> {
        if !self.is_output_enabled {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "output mode is not enabled on this connection",
            ));
        }
        if self.is_body_sent {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "the request body has already been sent",
            ));
        }

        Ok(self.body.get_or_insert_with(Vec::new))
    }

    fn close_output(&mut self) -> io::Result<()> {
        if self.is_body_sent {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "the request body has already been sent",
            ));
        }

        let body = self.body.take().unwrap_or_default();
        let head = build_request_head(&self.request_target, &self.host, &self.headers, body.len());

        self.stream.write_all(head.as_bytes())?;
        self.stream.write_all(&body)?;
        self.stream.flush()?;
        self.is_body_sent = true;

        Ok(())
    }

    fn response(&mut self) -> Result<HttpResponse> {
        ensure!(
            self.is_body_sent,
            "The request body must be sent before reading the response"
        );

        let mut reader = BufReader::new(&self.stream);
        read_response(&mut reader)
    }
}

fn build_host_header(host: &str, explicit_port: Option<u16>) -> String {
    match explicit_port {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn build_request_target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

fn build_request_head(
    request_target: &str,
    host: &str,
    headers: &[(HeaderName, HeaderValue)],
    content_length: usize,
) -> String {
    let mut head = format!(
        "POST {request_target} HTTP/1.1\r\nHost: {host}\r\nContent-Length: {content_length}\r\nConnection: close\r\n"
    );

    for (name, value) in headers {
        head.push_str(name.as_str());
        head.push_str(": ");
        head.push_str(&String::from_utf8_lossy(value.as_bytes()));
        head.push_str("\r\n");
    }

    head.push_str("\r\n");
    head
}

fn read_response(reader: &mut impl BufRead) -> Result<HttpResponse> {
    let status_line = read_trimmed_line(reader)?;
    let status_code = parse_status_line(&status_line)?;

    let mut headers = HeaderMap::new();
    loop {
        let line = read_trimmed_line(reader)?;
        if line.is_empty() {
            break;
        }

        let (name, value) = line
            .split_once(':')
            .with_context(|| format!("Malformed response header line '{line}'"))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .with_context(|| format!("Invalid response header name '{name}'"))?;
        let value = HeaderValue::from_str(value.trim())
            .with_context(|| format!("Invalid response header value in line '{line}'"))?;

        headers.append(name, value);
    }

    let mut body = Vec::new();
    reader
        .read_to_end(&mut body)
        .context("Failed to read the response body")?;

    Ok(HttpResponse::new(status_code, headers, Bytes::from(body)))
}

fn read_trimmed_line(reader: &mut impl BufRead) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read a response line")?;

    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }

    Ok(line)
}

fn parse_status_line(line: &str) -> Result<StatusCode> {
    let mut pieces = line.splitn(3, ' ');

    let version = pieces.next().unwrap_or("");
    ensure!(
        version.starts_with("HTTP/"),
        "Malformed response status line '{line}'"
    );

    let raw_status = pieces
        .next()
        .with_context(|| format!("Missing status code in response status line '{line}'"))?;

    StatusCode::from_bytes(raw_status.as_bytes())
        .with_context(|| format!("Invalid status code '{raw_status}' in response status line"))
}

#[cfg(test)]
mod test_build_request_head {
    use super::*;
    use http::header;

    #[test]
    fn it_should_write_the_request_line_and_framing_headers() {
        let head = build_request_head("/upload", "example.com", &[], 42);

        assert!(head.starts_with("POST /upload HTTP/1.1\r\n"));
        assert!(head.contains("Host: example.com\r\n"));
        assert!(head.contains("Content-Length: 42\r\n"));
        assert!(head.contains("Connection: close\r\n"));
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[test]
    fn it_should_include_the_registered_headers() {
        let headers = vec![(
            header::CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=B"),
        )];

        let head = build_request_head("/upload", "example.com", &headers, 0);

        assert!(head.contains("content-type: multipart/form-data; boundary=B\r\n"));
    }
}
