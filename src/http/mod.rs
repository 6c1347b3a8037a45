//! HTTP protocol implementation.
//!
//! This module implements the small slice of HTTP/1.1 the file server speaks:
//! one GET per connection, answered with a hand-built header and the raw file
//! bytes, then close.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection worker implementing the state machine below
//! - **`parser`**: Header terminator scanning and request-line parsing
//! - **`request`**: Request method and target
//! - **`response`**: Status codes and the response header model
//! - **`writer`**: Serializes the header and streams file bodies in fixed chunks
//! - **`mime`**: Content type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Accumulate bytes until "\r\n\r\n" or "\n\n"
//!        └──────┬──────┘
//!               │ Request line parsed          (malformed / EOF → Closed)
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Resolve the target under the file root
//!        └──────┬───────────┘
//!               │ 200 / 403 / 404 / 501 chosen
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Header, then file body in 2048-byte chunks
//!        └──────┬───────────┘
//!               ▼
//!            Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sentinel_files::http::connection::{Connection, ConnectionContext};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     let ctx = ConnectionContext::new("/srv/www".into(), Default::default());
//!
//!     loop {
//!         let (socket, peer) = listener.accept().await?;
//!         tokio::spawn(Connection::new(socket, peer, ctx.clone()).run());
//!     }
//! }
//! ```

pub mod connection;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
