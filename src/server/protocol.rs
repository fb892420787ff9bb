//! Wire format for the request and response pipes
//!
//! Both directions carry plain text:
//! - request: `album SEP artist [SEP song]`, optionally NUL or newline terminated
//! - response: the concatenated result blocks, or `NA` when nothing matched,
//!   followed by a single NUL byte

use crate::query::parser::{Query, QueryError, parse_query};
use std::io::{self, Read, Write};

/// Payload sent when no record matched
pub const NOT_FOUND: &str = "NA";

/// Byte closing every response
pub const TERMINATOR: u8 = 0;

/// Answer to one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    NotFound,
    /// Formatted result blocks
    Matches(String),
}

impl Response {
    /// Payload text without the terminator
    pub fn payload(&self) -> &str {
        match self {
            Response::NotFound => NOT_FOUND,
            Response::Matches(text) => text,
        }
    }
}

/// Request bytes as they came off the pipe: everything up to the first NUL,
/// minus one trailing line break. The bytes are not decoded.
pub fn request_bytes(bytes: &[u8]) -> &[u8] {
    let end = memchr::memchr(TERMINATOR, bytes).unwrap_or(bytes.len());
    let mut request = &bytes[..end];
    if let Some(rest) = request.strip_suffix(b"\n") {
        request = rest.strip_suffix(b"\r").unwrap_or(rest);
    }
    request
}

/// Decode a raw request into a query
pub fn decode_request(bytes: &[u8], separator: char) -> Result<Query, QueryError> {
    parse_query(request_bytes(bytes), separator)
}

/// Encode a query as request bytes, NUL terminated
pub fn encode_request(query: &Query, separator: char) -> Vec<u8> {
    let mut sep_buf = [0u8; 4];
    let sep = separator.encode_utf8(&mut sep_buf).as_bytes();

    let mut bytes = Vec::with_capacity(query.album.len() + query.artist.len() + query.song.len() + 8);
    bytes.extend_from_slice(&query.album);
    bytes.extend_from_slice(sep);
    bytes.extend_from_slice(&query.artist);
    if let Some(song) = query.song_filter() {
        bytes.extend_from_slice(sep);
        bytes.extend_from_slice(song);
    }
    bytes.push(TERMINATOR);
    bytes
}

/// Encode a response: payload plus terminator
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload();
    let mut bytes = Vec::with_capacity(payload.len() + 1);
    bytes.extend_from_slice(payload.as_bytes());
    bytes.push(TERMINATOR);
    bytes
}

/// Decode response bytes. Text after the first NUL is ignored.
pub fn decode_response(bytes: &[u8]) -> Response {
    let end = memchr::memchr(TERMINATOR, bytes).unwrap_or(bytes.len());
    let text = String::from_utf8_lossy(&bytes[..end]);
    if text == NOT_FOUND {
        Response::NotFound
    } else {
        Response::Matches(text.into_owned())
    }
}

/// Read one request with a single read call, at most `max_len - 1` bytes.
///
/// A FIFO read returns whatever the writer has put in so far; requests are
/// small enough to arrive in one piece. Zero bytes means the writer closed
/// without sending anything.
pub fn read_request<R: Read>(reader: &mut R, max_len: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; max_len.saturating_sub(1)];
    let n = loop {
        match reader.read(&mut buf) {
            Ok(n) => break n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    };
    buf.truncate(n);
    Ok(buf)
}

/// Write a full response and flush
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> io::Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()
}

/// Read a response up to its terminator or end of stream
pub fn read_response<R: Read>(reader: &mut R) -> io::Result<Response> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(decode_response(&buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_request_bytes_trims() {
        assert_eq!(request_bytes(b"a|b\n"), b"a|b");
        assert_eq!(request_bytes(b"a|b\r\n"), b"a|b");
        assert_eq!(request_bytes(b"a|b\0garbage"), b"a|b");
        assert_eq!(request_bytes(b"a|b|c"), b"a|b|c");
        // Only one line break is removed
        assert_eq!(request_bytes(b"a|b\n\n"), b"a|b\n");
        // A lone carriage return is kept
        assert_eq!(request_bytes(b"a|b\r"), b"a|b\r");
    }

    #[test]
    fn test_decode_request() {
        let q = decode_request(b"Abbey Road|The Beatles|Something\0", '|').unwrap();
        assert_eq!(q.album, b"Abbey Road");
        assert_eq!(q.song_filter(), Some(&b"Something"[..]));

        assert_eq!(decode_request(b"Abbey Road\n", '|'), Err(QueryError::MissingArtist));
        assert_eq!(decode_request(b"\0", '|'), Err(QueryError::Empty));
    }

    #[test]
    fn test_encode_request() {
        let q = Query::new("A", "B", "").unwrap();
        assert_eq!(encode_request(&q, '|'), b"A|B\0");
        let q = Query::new("A", "B", "c").unwrap();
        assert_eq!(encode_request(&q, ';'), b"A;B;c\0");
    }

    #[test]
    fn test_latin1_request_is_not_decoded() {
        let q = decode_request(b"Caf\xe9|Bar\0", '|').unwrap();
        assert_eq!(q.album, b"Caf\xe9");
        assert_eq!(q.artist, b"Bar");
        assert_eq!(encode_request(&q, '|'), b"Caf\xe9|Bar\0");
    }

    #[test]
    fn test_response_bytes() {
        assert_eq!(encode_response(&Response::NotFound), b"NA\0");
        assert_eq!(
            encode_response(&Response::Matches("x\n".into())),
            b"x\n\0"
        );
        assert_eq!(decode_response(b"NA\0"), Response::NotFound);
        assert_eq!(decode_response(b"NA"), Response::NotFound);
        assert_eq!(
            decode_response(b"block\0tail"),
            Response::Matches("block".into())
        );
    }

    #[test]
    fn test_read_request_is_bounded() {
        let mut input = Cursor::new(vec![b'x'; 4096]);
        let bytes = read_request(&mut input, 1024).unwrap();
        assert_eq!(bytes.len(), 1023);

        let mut empty = Cursor::new(Vec::new());
        assert!(read_request(&mut empty, 1024).unwrap().is_empty());
    }

    #[test]
    fn test_write_then_read_response() {
        let mut buf = Vec::new();
        write_response(&mut buf, &Response::Matches("Álbum: X\n".into())).unwrap();
        let decoded = read_response(&mut Cursor::new(buf)).unwrap();
        assert_eq!(decoded, Response::Matches("Álbum: X\n".into()));
    }
}
