use crate::http::request::{Method, Request};
use thiserror::Error;

/// Upper bound on the request header block; anything larger is rejected.
pub const MAX_HEADER_SIZE: usize = 8 * 1024;

/// Marker that ends the request target on the request line.
const VERSION_MARKER: &str = " HTTP";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("peer closed before the header terminator")]
    Incomplete,
    #[error("request line is not valid")]
    InvalidRequest,
    #[error("unknown method on request line")]
    InvalidMethod,
    #[error("HTTP version not provided in request line")]
    MissingVersion,
    #[error("no requested target")]
    EmptyTarget,
    #[error("request header exceeds {} bytes", MAX_HEADER_SIZE)]
    HeaderTooLarge,
}

/// Scans `buf` for a header terminator (`\r\n\r\n` or `\n\n`).
///
/// Scanning starts a few bytes before `from` so a terminator split across two
/// reads is still found. Returns the length of the header block including the
/// terminator.
pub fn find_header_end(buf: &[u8], from: usize) -> Option<usize> {
    let start = from.saturating_sub(3);

    for i in start..buf.len() {
        if buf[i] != b'\n' {
            continue;
        }
        if buf.get(i + 1) == Some(&b'\n') {
            return Some(i + 2);
        }
        if i > 0 && buf[i - 1] == b'\r' && buf.get(i + 1..i + 3) == Some(b"\r\n".as_slice()) {
            return Some(i + 3);
        }
    }

    None
}

/// Parses the request line at the start of a complete header block.
///
/// The line must open with a known method followed by a single space. For GET
/// the target runs up to the next `" HTTP"`; for other methods the target is
/// taken leniently since they are never served.
pub fn parse_request_line(header: &[u8]) -> Result<Request, ParseError> {
    let line_end = header
        .iter()
        .position(|&b| b == b'\n')
        .ok_or(ParseError::InvalidRequest)?;
    let line = &header[..line_end];
    let line = line.strip_suffix(b"\r").unwrap_or(line);

    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidRequest)?;

    let (method_str, rest) = line.split_once(' ').ok_or(ParseError::InvalidRequest)?;
    let method = Method::from_str(method_str).ok_or(ParseError::InvalidMethod)?;

    let target = match rest.find(VERSION_MARKER) {
        Some(end) => &rest[..end],
        None if method == Method::GET => return Err(ParseError::MissingVersion),
        None => rest,
    };

    if method == Method::GET && target.is_empty() {
        return Err(ParseError::EmptyTarget);
    }

    Ok(Request {
        method,
        target: target.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_crlf_terminator() {
        let buf = b"GET / HTTP/1.1\r\nHost: a\r\n\r\nrest";
        assert_eq!(find_header_end(buf, 0), Some(buf.len() - 4));
    }

    #[test]
    fn finds_bare_lf_terminator() {
        let buf = b"GET / HTTP/1.1\nHost: a\n\n";
        assert_eq!(find_header_end(buf, 0), Some(buf.len()));
    }

    #[test]
    fn finds_terminator_split_across_reads() {
        let buf = b"GET / HTTP/1.1\r\n\r\n";
        // Previous scan covered everything up to the first "\r\n".
        assert_eq!(find_header_end(buf, 16), Some(buf.len()));
    }

    #[test]
    fn no_terminator_yet() {
        assert_eq!(find_header_end(b"GET / HTTP/1.1\r\nHost: a\r\n", 0), None);
        assert_eq!(find_header_end(b"", 0), None);
    }

    #[test]
    fn parse_simple_get() {
        let req = parse_request_line(b"GET /a.png HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();

        assert_eq!(req.method, Method::GET);
        assert_eq!(req.target, "/a.png");
    }

    #[test]
    fn get_without_version_is_rejected() {
        assert_eq!(
            parse_request_line(b"GET /a.png\r\n\r\n"),
            Err(ParseError::MissingVersion)
        );
    }

    #[test]
    fn get_with_empty_target_is_rejected() {
        assert_eq!(
            parse_request_line(b"GET  HTTP/1.1\r\n\r\n"),
            Err(ParseError::EmptyTarget)
        );
    }

    #[test]
    fn unknown_method_is_rejected() {
        assert_eq!(
            parse_request_line(b"BREW /pot HTTP/1.1\r\n\r\n"),
            Err(ParseError::InvalidMethod)
        );
    }

    #[test]
    fn post_is_parsed_without_version() {
        let req = parse_request_line(b"POST /upload\n\n").unwrap();
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.target, "/upload");
    }
}
