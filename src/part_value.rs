use bytes::Bytes;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fs::File;
use std::io;
use std::io::Cursor;
use std::io::Read;
use std::path::Path;

///
/// The value of a single form parameter.
///
/// A parameter is either plain text, or a file upload streamed from a reader.
/// Text values are stringified when they are registered; mutating the source
/// afterwards has no effect on the request.
///
/// ```rust
/// use multipart_post::PartValue;
///
/// let text = PartValue::text(12345);
/// let upload = PartValue::bytes("notes.txt", "remember the milk");
/// ```
///
pub enum PartValue {
    /// A plain text field, sent without a filename or content type.
    Text(String),

    /// A file upload. The reader is consumed at write time, streamed onto
    /// the connection in fixed size chunks.
    File {
        file_name: String,
        reader: Box<dyn Read>,
    },
}

impl PartValue {
    /// Creates a text value from anything that can be stringified.
    pub fn text<T>(text: T) -> Self
    where
        T: Display,
    {
        Self::Text(text.to_string())
    }

    /// Creates a file upload from bytes already held in memory.
    pub fn bytes<N, B>(file_name: N, bytes: B) -> Self
    where
        N: Display,
        B: Into<Bytes>,
    {
        Self::reader(file_name, Cursor::new(bytes.into()))
    }

    /// Creates a file upload that streams from the given reader.
    ///
    /// The filename is only used for the part framing, it does not need to
    /// exist on disk.
    pub fn reader<N, R>(file_name: N, reader: R) -> Self
    where
        N: Display,
        R: Read + 'static,
    {
        Self::File {
            file_name: file_name.to_string(),
            reader: Box::new(reader),
        }
    }

    /// Opens the file at the given path for upload, using the path as the
    /// filename sent to the server.
    pub fn file<P>(path: P) -> io::Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::open(path)?;

        Ok(Self::File {
            file_name: path.display().to_string(),
            reader: Box::new(file),
        })
    }
}

impl From<&str> for PartValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for PartValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl Debug for PartValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::File { file_name, .. } => {
                write!(f, "File {{ file_name: {file_name:?}, reader: {{unknown}} }}")
            }
        }
    }
}


#[cfg(test)]
mod test_bytes {
    use super::*;

    #[test]
    fn it_should_keep_the_file_name_given() {
        let value = PartValue::bytes("notes.txt", "remember the milk");

        match value {
            PartValue::File { file_name, .. } => assert_eq!(file_name, "notes.txt"),
            other => panic!("expected a file value, received {other:?}"),
        }
    }

    #[test]
    fn it_should_read_back_the_bytes_given() {
        let value = PartValue::bytes("notes.txt", "remember the milk");

        let PartValue::File { mut reader, .. } = value else {
            panic!("expected a file value");
        };

        let mut content = String::new();
        reader.read_to_string(&mut content).unwrap();
        assert_eq!(content, "remember the milk");
    }
}
