use crate::http::mime;
use std::path::Path;

/// HTTP status codes the server can send.
///
/// The set is closed: a header can only be built for one of these, so an
/// unsupported code is rejected at compile time rather than on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 500 Internal Server Error
    InternalServerError,
    /// 501 Not Implemented
    NotImplemented,
    /// 503 Service Unavailable
    ServiceUnavailable,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use sentinel_files::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::Forbidden.as_u16(), 403);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
            StatusCode::NotImplemented => 501,
            StatusCode::ServiceUnavailable => 503,
        }
    }

    /// Maps a numeric code back to a supported status, if there is one.
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            200 => Some(StatusCode::Ok),
            400 => Some(StatusCode::BadRequest),
            403 => Some(StatusCode::Forbidden),
            404 => Some(StatusCode::NotFound),
            500 => Some(StatusCode::InternalServerError),
            501 => Some(StatusCode::NotImplemented),
            503 => Some(StatusCode::ServiceUnavailable),
            _ => None,
        }
    }

    /// Returns the reason phrase sent on the status line.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }
}

/// Describes the file body that follows a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileBody {
    pub content_type: &'static str,
    /// Exact number of body bytes.
    pub content_length: u64,
}

/// Response preamble. The server never sends a body other than a file, so
/// a header either carries a [`FileBody`] or stands alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub status: StatusCode,
    pub body: Option<FileBody>,
}

impl ResponseHeader {
    /// Header-only response, e.g. 403 or 404.
    pub fn new(status: StatusCode) -> Self {
        Self { status, body: None }
    }

    /// 200 OK for the file at `path` holding `len` bytes.
    pub fn for_file(path: &Path, len: u64) -> Self {
        Self {
            status: StatusCode::Ok,
            body: Some(FileBody {
                content_type: mime::content_type(path),
                content_length: len,
            }),
        }
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::Forbidden)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NotFound)
    }

    pub fn not_implemented() -> Self {
        Self::new(StatusCode::NotImplemented)
    }
}
