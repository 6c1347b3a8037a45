use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::BytesMut;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::config::{ServerConfig, Timeouts};
use crate::files::{self, Resolution};
use crate::http::parser::{find_header_end, parse_request_line, ParseError, MAX_HEADER_SIZE};
use crate::http::request::{Method, Request};
use crate::http::response::{ResponseHeader, StatusCode};
use crate::http::writer::{io_deadline, ResponseWriter};

const READ_CHUNK: usize = 1024;

/// Read-only settings every connection shares.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    root: Arc<PathBuf>,
    timeouts: Timeouts,
}

impl ConnectionContext {
    /// `root` must be canonical.
    pub fn new(root: PathBuf, timeouts: Timeouts) -> Self {
        Self {
            root: Arc::new(root),
            timeouts,
        }
    }

    pub fn from_config(cfg: &ServerConfig) -> Self {
        Self::new(cfg.root.clone(), cfg.timeouts)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// One accepted connection, owned end to end by a single worker.
pub struct Connection<S> {
    stream: S,
    peer: SocketAddr,
    buffer: BytesMut,
    ctx: ConnectionContext,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseHeader, Option<File>),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, peer: SocketAddr, ctx: ConnectionContext) -> Self {
        Self {
            stream,
            peer,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            ctx,
            state: ConnectionState::Reading,
        }
    }

    /// Serves the single request on this connection, then closes it.
    ///
    /// Never fails: every error is logged here and ends in close.
    pub async fn run(mut self) {
        let result = match self.ctx.timeouts.max_duration {
            Some(limit) => tokio::time::timeout(limit, self.serve())
                .await
                .unwrap_or_else(|_| Err(anyhow::anyhow!("connection exceeded {:?}", limit))),
            None => self.serve().await,
        };

        if let Err(e) = result {
            warn!(peer = %self.peer, error = %e, "Connection error");
        }

        self.close().await;
    }

    async fn serve(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.state = match self.read_request().await {
                        Ok(req) => ConnectionState::Processing(req),
                        Err(e) => match e.downcast_ref::<ParseError>() {
                            Some(ParseError::HeaderTooLarge) => {
                                warn!(peer = %self.peer, "Request header too large");
                                ConnectionState::Writing(ResponseHeader::new(StatusCode::BadRequest), None)
                            }
                            Some(parse_error) => {
                                warn!(peer = %self.peer, error = %parse_error, "Discarding malformed request");
                                ConnectionState::Closed
                            }
                            None => return Err(e),
                        },
                    };
                }

                ConnectionState::Processing(req) => {
                    self.state = self.handle_request(&req).await;
                }

                ConnectionState::Writing(header, body) => {
                    self.write_response(header, body).await?;
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    async fn read_request(&mut self) -> anyhow::Result<Request> {
        match self.ctx.timeouts.header_read {
            Some(limit) => tokio::time::timeout(limit, self.read_header())
                .await
                .map_err(|_| anyhow::anyhow!("no complete request header within {:?}", limit))?,
            None => self.read_header().await,
        }
    }

    /// Accumulates chunks until the header terminator shows up.
    async fn read_header(&mut self) -> anyhow::Result<Request> {
        let mut scanned = 0;

        loop {
            if let Some(end) = find_header_end(&self.buffer, scanned) {
                return Ok(parse_request_line(&self.buffer[..end])?);
            }
            scanned = self.buffer.len();

            if self.buffer.len() >= MAX_HEADER_SIZE {
                return Err(ParseError::HeaderTooLarge.into());
            }

            self.buffer.reserve(READ_CHUNK);
            let n = self.stream.read_buf(&mut self.buffer).await?;

            if n == 0 {
                return Err(ParseError::Incomplete.into());
            }
        }
    }

    async fn handle_request(&mut self, req: &Request) -> ConnectionState {
        info!(peer = %self.peer, method = req.method.as_str(), path = %req.target, "Request");

        if req.method != Method::GET {
            warn!(peer = %self.peer, method = req.method.as_str(), "Method not implemented");
            return ConnectionState::Writing(ResponseHeader::not_implemented(), None);
        }

        match files::resolve(self.ctx.root(), req.path()).await {
            Resolution::Found(found) => ConnectionState::Writing(
                ResponseHeader::for_file(&found.path, found.len),
                Some(found.file),
            ),
            Resolution::Forbidden => ConnectionState::Writing(ResponseHeader::forbidden(), None),
            Resolution::NotFound => ConnectionState::Writing(ResponseHeader::not_found(), None),
        }
    }

    async fn write_response(&mut self, header: ResponseHeader, body: Option<File>) -> anyhow::Result<()> {
        let writer = ResponseWriter::new(self.ctx.timeouts.idle);
        writer.write_header(&mut self.stream, &header).await?;

        debug!(peer = %self.peer, status = header.status.as_u16(), "Sent response header");

        if let (Some(file), Some(info)) = (body, header.body) {
            // Never send more than Content-Length even if the file grows.
            let mut file = file.take(info.content_length);
            let sent = writer.stream_body(&mut file, &mut self.stream).await?;

            if sent != info.content_length {
                warn!(
                    peer = %self.peer,
                    expected = info.content_length,
                    sent = sent,
                    "File shrank while streaming"
                );
            }
        }

        Ok(())
    }

    /// Flushes and shuts down the write side; the socket itself closes on drop.
    async fn close(&mut self) {
        let idle = self.ctx.timeouts.idle;

        if let Err(e) = io_deadline(idle, self.stream.flush()).await {
            debug!(peer = %self.peer, error = %e, "Failed to flush connection");
        }
        if let Err(e) = io_deadline(idle, self.stream.shutdown()).await {
            debug!(peer = %self.peer, error = %e, "Failed to shut down connection");
        }
    }
}
