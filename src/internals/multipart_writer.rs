use rand::RngExt;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io;
use std::io::Read;
use std::io::Write;

pub(crate) const BOUNDARY_PREFIX: &str = "---------------------------";

/// File contents are streamed onto the sink in chunks of this size.
const STREAM_BUFFER_SIZE: usize = 50_000;

/// Builds the boundary token used to delimit parts within the body.
///
/// The token is the dash prefix followed by three independently generated
/// random numbers in base 36. It is never escaped or checked against the
/// content; three concatenated random numbers make a collision with real
/// content improbable enough.
pub(crate) fn generate_boundary() -> String {
    let mut rng = StdRng::from_rng(&mut rand::rng());

    format!(
        "{}{}{}{}",
        BOUNDARY_PREFIX,
        to_base36(rng.random()),
        to_base36(rng.random()),
        to_base36(rng.random()),
    )
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();

    String::from_utf8(digits).expect("Base 36 digits should always be valid UTF-8")
}

///
/// Frames boundary delimited parts onto a byte sink, in the exact
/// `multipart/form-data` wire format.
///
/// Every part opens with `--<boundary>` and a `Content-Disposition` header.
/// File parts additionally carry a `filename` and a `Content-Type` guessed
/// from the filename extension. All line terminators are CRLF. The body must
/// be terminated by calling [`MultipartWriter::finish()`] exactly once.
///
pub(crate) struct MultipartWriter<'a> {
    out: &'a mut dyn Write,
    boundary: &'a str,
}

impl<'a> MultipartWriter<'a> {
    pub(crate) fn new(out: &'a mut dyn Write, boundary: &'a str) -> Self {
        Self { out, boundary }
    }

    pub(crate) fn write_text_part(&mut self, name: &str, value: &str) -> io::Result<()> {
        self.write_part_header(name, None)?;
        self.out.write_all(value.as_bytes())?;
        self.out.write_all(b"\r\n")
    }

    pub(crate) fn write_file_part(
        &mut self,
        name: &str,
        file_name: &str,
        reader: &mut dyn Read,
    ) -> io::Result<()> {
        self.write_part_header(name, Some(file_name))?;
        pipe(reader, self.out)?;
        self.out.write_all(b"\r\n")
    }

    /// Writes the closing `--<boundary>--` marker and flushes the sink.
    pub(crate) fn finish(&mut self) -> io::Result<()> {
        write!(self.out, "--{}--\r\n", self.boundary)?;
        self.out.flush()
    }

    fn write_part_header(&mut self, name: &str, file_name: Option<&str>) -> io::Result<()> {
        write!(self.out, "--{}\r\n", self.boundary)?;
        write!(self.out, "Content-Disposition: form-data; name=\"{name}\"")?;

        if let Some(file_name) = file_name {
            let content_type = mime_guess::from_path(file_name).first_or(mime::APPLICATION_OCTET_STREAM);

            write!(self.out, "; filename=\"{file_name}\"\r\n")?;
            write!(self.out, "Content-Type: {content_type}")?;
        }

        self.out.write_all(b"\r\n\r\n")
    }
}

fn pipe(reader: &mut dyn Read, out: &mut dyn Write) -> io::Result<()> {
    let mut buffer = vec![0_u8; STREAM_BUFFER_SIZE];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            return Ok(());
        }

        out.write_all(&buffer[..read])?;
    }
}


#[cfg(test)]
mod test_write_text_part {
    use super::*;

    #[test]
    fn it_should_frame_the_value_between_boundary_and_line_break() {
        let mut out = Vec::new();
        let mut writer = MultipartWriter::new(&mut out, "B");

        writer.write_text_part("user", "alice").unwrap();
        writer.finish().unwrap();

        let expected = "--B\r\nContent-Disposition: form-data; name=\"user\"\r\n\r\nalice\r\n--B--\r\n";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn it_should_write_one_part_per_call_in_order() {
        let mut out = Vec::new();
        let mut writer = MultipartWriter::new(&mut out, "B");

        writer.write_text_part("first", "1").unwrap();
        writer.write_text_part("second", "2").unwrap();
        writer.finish().unwrap();

        let body = String::from_utf8(out).unwrap();
        let first_at = body.find("name=\"first\"").unwrap();
        let second_at = body.find("name=\"second\"").unwrap();

        assert!(first_at < second_at);
        assert_eq!(body.matches("--B\r\n").count(), 2);
    }

    #[test]
    fn it_should_produce_identical_output_for_identical_input() {
        let write_body = || {
            let mut out = Vec::new();
            let mut writer = MultipartWriter::new(&mut out, "B");
            writer.write_text_part("user", "alice").unwrap();
            writer.write_text_part("animal", "fox").unwrap();
            writer.finish().unwrap();
            out
        };

        assert_eq!(write_body(), write_body());
    }
}

#[cfg(test)]
mod test_write_file_part {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn it_should_guess_the_content_type_from_the_file_name() {
        let mut out = Vec::new();
        let mut writer = MultipartWriter::new(&mut out, "B");

        let mut content = Cursor::new(b"%PDF-1.4".to_vec());
        writer.write_file_part("doc", "report.pdf", &mut content).unwrap();
        writer.finish().unwrap();

        let body = String::from_utf8(out).unwrap();
        assert!(body.contains("Content-Disposition: form-data; name=\"doc\"; filename=\"report.pdf\"\r\n"));
        assert!(body.contains("Content-Type: application/pdf\r\n"));
        assert!(body.contains("\r\n\r\n%PDF-1.4\r\n"));
    }

    #[test]
    fn it_should_default_to_octet_stream_for_unknown_extensions() {
        let mut out = Vec::new();
        let mut writer = MultipartWriter::new(&mut out, "B");

        let mut content = Cursor::new(b"????".to_vec());
        writer.write_file_part("blob", "data.zzyyxx", &mut content).unwrap();
        writer.finish().unwrap();

        let body = String::from_utf8(out).unwrap();
        assert!(body.contains("Content-Type: application/octet-stream\r\n"));
    }

    #[test]
    fn it_should_stream_contents_larger_than_one_buffer() {
        let content = vec![b'x'; STREAM_BUFFER_SIZE * 2 + 123];

        let mut out = Vec::new();
        let mut writer = MultipartWriter::new(&mut out, "B");
        writer.write_file_part("big", "big.bin", &mut Cursor::new(content.clone())).unwrap();
        writer.finish().unwrap();

        let header_end = out.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        let payload = &out[header_end..header_end + content.len()];
        assert_eq!(payload, content.as_slice());
    }
}
