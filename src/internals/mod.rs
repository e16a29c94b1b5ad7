mod multipart_writer;
pub(crate) use self::multipart_writer::*;
