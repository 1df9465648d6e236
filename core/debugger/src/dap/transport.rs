//! `Content-Length` framing for stream transports.
//!
//! Each message is a header block terminated by an empty line, followed by
//! exactly `Content-Length` bytes of UTF-8 JSON:
//!
//! ```text
//! Content-Length: 57\r\n
//! \r\n
//! {"type":"request","seq":1,"command":"initialize"}
//! ```

use std::io::{self, BufRead, Read, Write};

const CONTENT_LENGTH: &str = "Content-Length";

/// The largest message body accepted.
pub const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// The longest header line accepted.
pub const MAX_HEADER_LINE_BYTES: usize = 8 * 1024;

/// Reads one framed message.
///
/// Returns `Ok(None)` on a clean end of stream before any header byte.
/// Header lines other than `Content-Length` are ignored, and header names
/// match case-insensitively. Bodies over [`MAX_MESSAGE_BYTES`] and header
/// lines over [`MAX_HEADER_LINE_BYTES`] fail with `InvalidData` before
/// anything is allocated for them.
pub fn read_message<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut content_length = None;
    let mut saw_header = false;

    loop {
        let mut line = String::new();
        let read = reader
            .by_ref()
            .take(MAX_HEADER_LINE_BYTES as u64 + 1)
            .read_line(&mut line)?;
        if read > MAX_HEADER_LINE_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Header line exceeds {MAX_HEADER_LINE_BYTES} bytes"),
            ));
        }
        if read == 0 {
            if saw_header {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "Stream ended inside a header block",
                ));
            }
            return Ok(None);
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            if saw_header {
                break;
            }
            continue;
        }

        saw_header = true;
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
            let length = value.trim().parse::<usize>().map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidData, "Invalid Content-Length")
            })?;
            content_length = Some(length);
        }
    }

    let content_length = content_length
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Missing Content-Length"))?;

    if content_length > MAX_MESSAGE_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Content-Length {content_length} exceeds the maximum of {MAX_MESSAGE_BYTES} bytes"),
        ));
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;
    String::from_utf8(body)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Writes one framed message and flushes.
pub fn write_message<W: Write>(writer: &mut W, message: &str) -> io::Result<()> {
    write!(writer, "{CONTENT_LENGTH}: {}\r\n\r\n{message}", message.len())?;
    writer.flush()
}
