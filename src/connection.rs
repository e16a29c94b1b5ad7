use anyhow::Result;
use http::HeaderName;
use http::HeaderValue;
use std::io;
use std::io::Write;

///
/// An open connection a [`MultipartRequest`](crate::MultipartRequest) can be
/// submitted over.
///
/// Implementations provide a settable header map, a writable sink for the
/// outgoing body, and a response handle once the body has been sent. The
/// bundled [`HttpConnection`](crate::HttpConnection) covers plain http URLs;
/// anything else, including TLS, is a matter of implementing this trait.
///
pub trait Connection {
    /// The response handle handed back once the body has been sent.
    type Response;

    /// Sets an outgoing request header, replacing any earlier value set for
    /// the same name.
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<()>;

    /// Flags that this connection will carry a request body.
    fn set_do_output(&mut self, enabled: bool);

    /// Returns the writable sink for the request body, opening it on first
    /// use.
    fn output(&mut self) -> io::Result<&mut dyn Write>;

    /// Signals that the body is complete. After this the request may be
    /// flushed to the server and the sink must not be written again.
    fn close_output(&mut self) -> io::Result<()>;

    /// Retrieves the server's response. Only valid after the output has been
    /// closed.
    fn response(&mut self) -> Result<Self::Response>;
}
