use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::response::ResponseHeader;

const HTTP_VERSION: &str = "HTTP/1.1";

/// File bodies are copied to the peer in blocks of at most this many bytes.
pub const CHUNK_SIZE: usize = 2048;

/// Exact bytes of the response preamble, blank line included.
pub fn serialize_header(header: &ResponseHeader) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128);

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        header.status.as_u16(),
        header.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    buf.extend_from_slice(b"Connection: close\r\n");
    if let Some(body) = &header.body {
        buf.extend_from_slice(format!("Content-Type: {}\r\n", body.content_type).as_bytes());
        buf.extend_from_slice(format!("Content-Length: {}\r\n", body.content_length).as_bytes());
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

/// Runs one I/O operation, failing with `TimedOut` if it makes no progress
/// within `limit`.
pub(crate) async fn io_deadline<T, F>(limit: Option<Duration>, fut: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
            io::Error::new(io::ErrorKind::TimedOut, format!("no progress within {:?}", limit))
        })?,
        None => fut.await,
    }
}

/// Writes a response header and then copies the file body in order.
pub struct ResponseWriter {
    idle_timeout: Option<Duration>,
}

impl ResponseWriter {
    pub fn new(idle_timeout: Option<Duration>) -> Self {
        Self { idle_timeout }
    }

    pub async fn write_header<W>(&self, stream: &mut W, header: &ResponseHeader) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let buf = serialize_header(header);
        self.write_chunk(stream, &buf).await?;
        io_deadline(self.idle_timeout, stream.flush()).await?;
        Ok(())
    }

    /// Copies `body` to `stream` until EOF and returns the number of bytes sent.
    pub async fn stream_body<R, W>(&self, body: &mut R, stream: &mut W) -> anyhow::Result<u64>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut chunk = [0u8; CHUNK_SIZE];
        let mut sent = 0u64;

        loop {
            let n = io_deadline(self.idle_timeout, body.read(&mut chunk)).await?;
            if n == 0 {
                break;
            }

            self.write_chunk(stream, &chunk[..n]).await?;
            sent += n as u64;
        }

        io_deadline(self.idle_timeout, stream.flush()).await?;
        Ok(sent)
    }

    async fn write_chunk<W>(&self, stream: &mut W, buf: &[u8]) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let mut written = 0;

        while written < buf.len() {
            let n = io_deadline(self.idle_timeout, stream.write(&buf[written..])).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            written += n;
        }

        Ok(())
    }
}
