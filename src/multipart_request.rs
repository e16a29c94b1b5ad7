use anyhow::Context;
use anyhow::Result;
use cookie::Cookie;
use http::HeaderValue;
use http::header;
use std::fmt::Display;
use std::fmt::Write as _;
use std::mem;
use url::Url;

use crate::Connection;
use crate::HttpConnection;
use crate::HttpResponse;
use crate::PartValue;
use crate::internals::MultipartWriter;
use crate::internals::generate_boundary;

///
/// A `multipart/form-data` POST request being assembled over an open
/// [`Connection`].
///
/// Construction generates a random boundary token and sets the outgoing
/// `Content-Type` header on the connection. Cookies and parameters can then
/// be registered in any order and any number of times, until the request is
/// submitted with [`MultipartRequest::submit()`] or
/// [`MultipartRequest::post()`]. Submitting consumes the request; a fresh
/// connection and request are needed to send again.
///
/// Parameters keep their insertion order in the body. Registering a name a
/// second time replaces its value but keeps its original position.
///
/// ```rust
/// # fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// use multipart_post::MultipartRequest;
/// use multipart_post::PartValue;
///
/// let mut request = MultipartRequest::open_str("http://example.com/upload")?;
/// request.set_cookie("sid", "abc123");
/// request.set_parameter("user", "alice");
/// request.set_parameter("doc", PartValue::file("report.pdf")?);
///
/// let response = request.post()?;
/// println!("{}", response.text());
/// #
/// # Ok(())
/// # }
/// ```
///
#[derive(Debug)]
pub struct MultipartRequest<C>
where
    C: Connection,
{
    connection: C,
    boundary: String,
    cookies: Vec<(String, String)>,
    parameters: Vec<(String, PartValue)>,
}

impl<C> MultipartRequest<C>
where
    C: Connection,
{
    /// Creates a new request on an already open connection.
    ///
    /// This enables output mode on the connection and sets its
    /// `Content-Type` header to `multipart/form-data` with the generated
    /// boundary.
    pub fn new(mut connection: C) -> Result<Self> {
        let boundary = generate_boundary();

        connection.set_do_output(true);

        let content_type = format!("multipart/form-data; boundary={boundary}");
        let header_value = HeaderValue::from_str(&content_type)
            .with_context(|| format!("Failed to store header content type '{content_type}'"))?;
        connection.set_header(header::CONTENT_TYPE, header_value)?;

        Ok(Self {
            connection,
            boundary,
            cookies: vec![],
            parameters: vec![],
        })
    }

    /// The boundary token delimiting the parts of this request's body.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Adds a cookie to the request, replacing any earlier value registered
    /// under the same name.
    pub fn set_cookie<N, V>(&mut self, name: N, value: V)
    where
        N: Display,
        V: Display,
    {
        upsert(&mut self.cookies, name.to_string(), value.to_string());
    }

    /// Adds many cookies at once. An empty iterator is a no-op.
    pub fn set_cookies<I, N, V>(&mut self, cookies: I)
    where
        I: IntoIterator<Item = (N, V)>,
        N: Display,
        V: Display,
    {
        for (name, value) in cookies {
            self.set_cookie(name, value);
        }
    }

    /// Adds cookies from a flat alternating slice, where `pairs[2 * i]` is a
    /// name and `pairs[2 * i + 1]` is its value.
    ///
    /// A trailing unpaired element in an odd length slice is silently
    /// dropped.
    pub fn set_cookie_pairs<S>(&mut self, pairs: &[S])
    where
        S: AsRef<str>,
    {
        for pair in pairs.chunks_exact(2) {
            self.set_cookie(pair[0].as_ref(), pair[1].as_ref());
        }
    }

    /// Adds a parameter to the request, replacing any earlier value
    /// registered under the same name while keeping its original position.
    ///
    /// Accepts anything convertible into a [`PartValue`], so plain strings
    /// register as text fields directly.
    pub fn set_parameter<N, V>(&mut self, name: N, value: V)
    where
        N: Display,
        V: Into<PartValue>,
    {
        upsert(&mut self.parameters, name.to_string(), value.into());
    }

    /// Adds many parameters at once. An empty iterator is a no-op.
    pub fn set_parameters<I, N, V>(&mut self, parameters: I)
    where
        I: IntoIterator<Item = (N, V)>,
        N: Display,
        V: Into<PartValue>,
    {
        for (name, value) in parameters {
            self.set_parameter(name, value);
        }
    }

    /// Adds text parameters from a flat alternating slice, where
    /// `pairs[2 * i]` is a name and `pairs[2 * i + 1]` is its value.
    ///
    /// A trailing unpaired element in an odd length slice is silently
    /// dropped.
    pub fn set_parameter_pairs<S>(&mut self, pairs: &[S])
    where
        S: AsRef<str>,
    {
        for pair in pairs.chunks_exact(2) {
            self.set_parameter(pair[0].as_ref(), pair[1].as_ref());
        }
    }

    /// Serializes the request onto the connection, with all the cookies and
    /// parameters registered so far, and returns the connection for response
    /// retrieval.
    ///
    /// The cookie header is set first, then every parameter is written as a
    /// boundary delimited part in registration order, then the closing
    /// boundary, and finally the body sink is closed. Any I/O failure along
    /// the way aborts immediately and leaves the connection unusable.
    pub fn submit(mut self) -> Result<C> {
        self.send_cookie_header()?;

        let boundary = mem::take(&mut self.boundary);
        let parameters = mem::take(&mut self.parameters);

        let out = self
            .connection
            .output()
            .context("Failed to open the request body sink")?;
        let mut writer = MultipartWriter::new(out, &boundary);

        for (name, value) in parameters {
            match value {
                PartValue::Text(text) => writer
                    .write_text_part(&name, &text)
                    .with_context(|| format!("Failed to write text parameter '{name}'"))?,
                PartValue::File {
                    file_name,
                    mut reader,
                } => writer
                    .write_file_part(&name, &file_name, reader.as_mut())
                    .with_context(|| format!("Failed to write file parameter '{name}'"))?,
            }
        }

        writer
            .finish()
            .context("Failed to write the closing boundary")?;

        self.connection
            .close_output()
            .context("Failed to close the request body sink")?;

        Ok(self.connection)
    }

    /// Submits the request and retrieves the server's response.
    pub fn post(self) -> Result<C::Response> {
        let mut connection = self.submit()?;
        connection.response()
    }

    /// Submits the request with the given parameters merged in on top of any
    /// registered earlier.
    pub fn post_with_parameters<I, N, V>(mut self, parameters: I) -> Result<C::Response>
    where
        I: IntoIterator<Item = (N, V)>,
        N: Display,
        V: Into<PartValue>,
    {
        self.set_parameters(parameters);
        self.post()
    }

    /// Submits the request with the given cookies and parameters merged in
    /// on top of any registered earlier.
    pub fn post_with<CI, CN, CV, PI, PN, PV>(
        mut self,
        cookies: CI,
        parameters: PI,
    ) -> Result<C::Response>
    where
        CI: IntoIterator<Item = (CN, CV)>,
        CN: Display,
        CV: Display,
        PI: IntoIterator<Item = (PN, PV)>,
        PN: Display,
        PV: Into<PartValue>,
    {
        self.set_cookies(cookies);
        self.set_parameters(parameters);
        self.post()
    }

    fn send_cookie_header(&mut self) -> Result<()> {
        if self.cookies.is_empty() {
            return Ok(());
        }

        let cookie_header_raw =
            self.cookies
                .iter()
                .fold(String::new(), |mut buffer, (name, value)| {
                    if !buffer.is_empty() {
                        write!(buffer, "; ").expect(
                            "Writing to internal string for cookie header should always work",
                        );
                    }

                    write!(buffer, "{}", Cookie::new(name.as_str(), value.as_str()))
                        .expect("Writing to internal string for cookie header should always work");

                    buffer
                });

        let header_value = HeaderValue::from_str(&cookie_header_raw)
            .with_context(|| format!("Failed to store cookie header '{cookie_header_raw}'"))?;
        self.connection.set_header(header::COOKIE, header_value)
    }
}

impl MultipartRequest<HttpConnection> {
    /// Opens a connection to the given URL and creates a request on it.
    pub fn open(url: &Url) -> Result<Self> {
        let connection = HttpConnection::open(url)?;
        Self::new(connection)
    }

    /// Opens a connection to the given URL string and creates a request on
    /// it.
    pub fn open_str(url: &str) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Failed to parse URL '{url}'"))?;
        Self::open(&url)
    }

    /// One-shot helper: opens a connection to the URL, registers the given
    /// parameters, and posts.
    pub fn post_url<I, N, V>(url: &Url, parameters: I) -> Result<HttpResponse>
    where
        I: IntoIterator<Item = (N, V)>,
        N: Display,
        V: Into<PartValue>,
    {
        Self::open(url)?.post_with_parameters(parameters)
    }

    /// One-shot helper: opens a connection to the URL, registers the given
    /// cookies and parameters, and posts.
    pub fn post_url_with<CI, CN, CV, PI, PN, PV>(
        url: &Url,
        cookies: CI,
        parameters: PI,
    ) -> Result<HttpResponse>
    where
        CI: IntoIterator<Item = (CN, CV)>,
        CN: Display,
        CV: Display,
        PI: IntoIterator<Item = (PN, PV)>,
        PN: Display,
        PV: Into<PartValue>,
    {
        Self::open(url)?.post_with(cookies, parameters)
    }
}

fn upsert<V>(entries: &mut Vec<(String, V)>, name: String, value: V) {
    match entries.iter_mut().find(|(existing, _)| *existing == name) {
        Some(entry) => entry.1 = value,
        None => entries.push((name, value)),
    }
}



#[cfg(test)]
mod test_set_cookie {
    use super::test_support::MockConnection;
    use super::*;

    #[test]
    fn it_should_join_cookies_into_one_header() {
        let mut request = MultipartRequest::new(MockConnection::default()).unwrap();
        request.set_cookie("sid", "abc");
        request.set_cookie("theme", "dark");

        let connection = request.submit().unwrap();

        assert_eq!(
            connection.header(&header::COOKIE).unwrap(),
            "sid=abc; theme=dark"
        );
    }

    #[test]
    fn it_should_overwrite_earlier_values_for_the_same_name() {
        let mut request = MultipartRequest::new(MockConnection::default()).unwrap();
        request.set_cookie("sid", "abc");
        request.set_cookie("sid", "xyz");

        let connection = request.submit().unwrap();

        assert_eq!(connection.header(&header::COOKIE).unwrap(), "sid=xyz");
    }

    #[test]
    fn it_should_not_send_a_cookie_header_when_no_cookies_are_registered() {
        let request = MultipartRequest::new(MockConnection::default()).unwrap();
        let connection = request.submit().unwrap();

        assert_eq!(connection.header(&header::COOKIE), None);
    }
}
