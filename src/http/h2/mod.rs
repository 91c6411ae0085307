//! HTTP/2 protocol implementation
//!
//! This module provides a client-side HTTP/2 protocol engine with low-level
//! control over the frames it sends and receives.
//!
//! # Architecture
//!
//! - **Frame codec** ([`codec`], [`frames`]): the 9-byte frame header and
//!   per-type payloads; unknown frame types decode to an opaque variant
//! - **Settings table** ([`settings`]): the peer's negotiated parameters,
//!   applied with a changelog and acknowledged by the engine
//! - **Streams** ([`stream`]): odd stream ID allocation and exchange state
//! - **Flow control** ([`flow_control`]): connection and stream windows
//! - **Header codec** ([`header_codec`]): adapter over HPACK
//! - **Connection engine** ([`client`]): preface handshake, request framing,
//!   response reassembly
//!
//! One [`H2Client`] drives one connection, one exchange at a time. Header
//! compression state lives for the whole connection, so every frame must go
//! through the same client in wire order.
//!
//! # Examples
//!
//! ```no_run
//! use h2engine::http::h2::{H2ClientBuilder, ReadPolicy};
//! use h2engine::http::session::FdSessionOps;
//! use std::net::TcpStream;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // The transport must already speak h2 (TLS+ALPN or prior knowledge)
//! let tcp_stream = TcpStream::connect("127.0.0.1:8080")?;
//! let session = FdSessionOps::new(tcp_stream).with_alpn(b"h2");
//!
//! let mut client = H2ClientBuilder::new()
//!     .enable_push(false)
//!     .read_policy(ReadPolicy::Strict)
//!     .build(session)?;
//! client.check_alpn()?;
//! client.send_connection_preface()?;
//!
//! let response = client.request("GET", "/", &[("accept", "*/*")], bytes::Bytes::new())?;
//! println!("Status: {}", response.status());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod error;
pub mod flow_control;
pub mod frames;
pub mod header_codec;
pub mod settings;
pub mod stream;

pub use client::{ConnectionState, H2Client, H2ClientBuilder, H2Response, ReadPolicy};
pub use codec::FrameCodec;
pub use error::{Error, ErrorCode, Result};
pub use frames::{Frame, FrameFlags, FramePayload, FrameType};
pub use header_codec::{HeaderCodec, HpackCodec};
pub use settings::{SettingChange, Settings, SettingsBuilder, SettingsParameter};
pub use stream::{StreamId, StreamIdAllocator, StreamState};

/// HTTP/2 connection preface that must be sent by clients
///
/// From RFC 7540 Section 3.5:
/// "PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n"
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Default initial window size (65535 bytes)
pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65535;

/// Default maximum frame size (16384 bytes)
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16384;

/// Default header table size (4096 bytes)
pub const DEFAULT_HEADER_TABLE_SIZE: u32 = 4096;

/// Maximum stream ID value (2^31 - 1)
pub const MAX_STREAM_ID: u32 = 0x7FFFFFFF;

/// Stream ID 0 (connection-level)
pub const CONNECTION_STREAM_ID: u32 = 0;
