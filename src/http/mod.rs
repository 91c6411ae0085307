//! HTTP transport layer for h2engine
//!
//! This module provides the transport boundary the HTTP/2 engine runs on.
//!
//! # Architecture
//!
//! The engine never establishes connections itself. It receives a byte
//! stream that has already been connected and negotiated (typically TLS with
//! ALPN "h2") wrapped in the session operations abstraction:
//!
//! - `SessionOps` trait defines operations (poll, read, write, flush, close)
//! - `HttpSession` wraps a `SessionOps` and adds timeouts and exact reads
//! - All HTTP/2 I/O code is transparent to the underlying transport
//!
//! # Examples
//!
//! ```no_run
//! use h2engine::http::session::FdSessionOps;
//! use h2engine::http::h2::H2ClientBuilder;
//! use std::net::TcpStream;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = TcpStream::connect("127.0.0.1:8080")?;
//! let mut client = H2ClientBuilder::new().build(FdSessionOps::new(stream))?;
//! client.send_connection_preface()?;
//!
//! let response = client.get("/")?;
//! assert_eq!(response.status(), 200);
//! # Ok(())
//! # }
//! ```

pub mod h2;
pub mod session;

pub use session::{HttpSession, PollEvents, SessionOps};

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, Error>;

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,
}

/// ALPN protocol identifier for HTTP/2 over TLS
pub const ALPN_PROTO_H2: &[u8] = b"h2";
