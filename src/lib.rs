//!
//! Multipart Post is a small blocking client for sending
//! `multipart/form-data` HTTP POST requests, the kind a browser sends when
//! submitting a form with file attachments:
//!
//!  * You open a [`MultipartRequest`] against a URL or a [`Connection`],
//!  * register cookies and parameters on it, text or file valued,
//!  * then post it and receive back an [`HttpResponse`].
//!
//! The body is serialized field by field in registration order, with file
//! contents streamed in fixed size chunks rather than loaded whole.
//!
//! ## Getting Started
//!
//! ```rust
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use multipart_post::MultipartRequest;
//! use multipart_post::PartValue;
//!
//! let mut request = MultipartRequest::open_str("http://example.com/upload")?;
//! request.set_cookie("sid", "abc123");
//! request.set_parameter("user", "alice");
//! request.set_parameter("doc", PartValue::file("report.pdf")?);
//!
//! let response = request.post()?;
//! println!("{}", response.text());
//! #
//! # Ok(())
//! # }
//! ```
//!
//! Or in one shot:
//!
//! ```rust
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use multipart_post::MultipartRequest;
//! use url::Url;
//!
//! let url = Url::parse("http://example.com/upload")?;
//! let response = MultipartRequest::post_url(&url, [("user", "alice")])?;
//! #
//! # Ok(())
//! # }
//! ```
//!
//! ## Bringing your own transport
//!
//! The bundled [`HttpConnection`] speaks plain single-shot http over TCP.
//! Everything else, such as TLS or a connection pool, plugs in by
//! implementing the [`Connection`] trait and handing it to
//! [`MultipartRequest::new()`].
//!
//! Each request is single use and single threaded: register state, submit
//! once, read the response. Submitting consumes the request, so a second
//! send needs a fresh connection and request.
//!

#![forbid(unsafe_code)]

pub(crate) mod internals;

mod connection;
pub use self::connection::*;

mod http_connection;
pub use self::http_connection::*;

mod http_response;
pub use self::http_response::*;

mod multipart_request;
pub use self::multipart_request::*;

mod part_value;
pub use self::part_value::*;
