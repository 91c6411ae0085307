//! HTTP/2 error types
//!
//! This module defines error types for HTTP/2 operations, and the error code
//! namespace defined in RFC 7540 Section 7 that RST_STREAM and GOAWAY carry.

use std::fmt;

/// HTTP/2 errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport error from the underlying session
    #[error("HTTP error: {0}")]
    Http(#[from] crate::http::Error),

    /// Fewer bytes than a frame header needs
    #[error("Truncated frame: needed {needed} bytes, got {available}")]
    TruncatedFrame { needed: usize, available: usize },

    /// Payload does not fit the 24-bit length field
    #[error("Frame payload too large: {0} bytes")]
    FrameTooLarge(usize),

    /// Frame size error (RFC 7540 Section 7 - Error code 0x6)
    #[error("Frame size error: {0}")]
    FrameSize(String),

    /// Protocol error detected (RFC 7540 Section 7 - Error code 0x1)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Frame arrived where the connection state does not allow it
    #[error("Unexpected {frame_type} frame on stream {stream_id}")]
    UnexpectedFrame { frame_type: String, stream_id: u32 },

    /// Compression error (RFC 7540 Section 7 - Error code 0x9)
    #[error("Compression error: {0}")]
    Compression(String),

    /// No client stream identifiers left on this connection
    #[error("Stream ID space exhausted")]
    StreamSpaceExhausted,

    /// Stream closed (RFC 7540 Section 7 - Error code 0x5)
    #[error("Stream closed: {0}")]
    StreamClosed(u32),

    /// Flow control error (RFC 7540 Section 7 - Error code 0x3)
    #[error("Flow control error: {0}")]
    FlowControl(String),

    /// Invalid settings value
    #[error("Invalid settings value: {0}")]
    InvalidSettings(String),

    /// Missing or malformed `:status`
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// Peer reset the stream
    #[error("Stream {stream_id} reset by peer: {code}")]
    StreamReset { stream_id: u32, code: RawErrorCode },

    /// Peer is shutting the connection down
    #[error("GOAWAY received (last stream {last_stream_id}): {code}")]
    GoAway {
        last_stream_id: u32,
        code: RawErrorCode,
        debug: bytes::Bytes,
    },

    /// ALPN negotiation failed
    #[error("ALPN negotiation failed: expected h2, got {0:?}")]
    AlpnFailed(Option<Vec<u8>>),

    /// Connection not ready
    #[error("Connection not ready")]
    NotReady,
}

/// HTTP/2 error codes as defined in RFC 7540 Section 7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    /// Graceful shutdown
    NoError = 0x0,
    /// Protocol error detected
    ProtocolError = 0x1,
    /// Implementation fault
    InternalError = 0x2,
    /// Flow-control limits exceeded
    FlowControlError = 0x3,
    /// Settings not acknowledged
    SettingsTimeout = 0x4,
    /// Frame received for closed stream
    StreamClosed = 0x5,
    /// Frame size incorrect
    FrameSizeError = 0x6,
    /// Stream not processed
    RefusedStream = 0x7,
    /// Stream cancelled
    Cancel = 0x8,
    /// Compression state not updated
    CompressionError = 0x9,
    /// TCP connection error for CONNECT method
    ConnectError = 0xa,
    /// Processing capacity exceeded
    EnhanceYourCalm = 0xb,
    /// Negotiated TLS parameters not acceptable
    InadequateSecurity = 0xc,
    /// Use HTTP/1.1 for the request
    Http11Required = 0xd,
}

impl ErrorCode {
    /// Every defined code, in numeric order
    pub const ALL: [ErrorCode; 14] = [
        ErrorCode::NoError,
        ErrorCode::ProtocolError,
        ErrorCode::InternalError,
        ErrorCode::FlowControlError,
        ErrorCode::SettingsTimeout,
        ErrorCode::StreamClosed,
        ErrorCode::FrameSizeError,
        ErrorCode::RefusedStream,
        ErrorCode::Cancel,
        ErrorCode::CompressionError,
        ErrorCode::ConnectError,
        ErrorCode::EnhanceYourCalm,
        ErrorCode::InadequateSecurity,
        ErrorCode::Http11Required,
    ];

    /// Convert error code to u32
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Create error code from u32
    pub fn from_u32(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied().filter(|c| c.as_u32() == code)
    }

    /// Get error name
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCode::NoError => "NO_ERROR",
            ErrorCode::ProtocolError => "PROTOCOL_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::FlowControlError => "FLOW_CONTROL_ERROR",
            ErrorCode::SettingsTimeout => "SETTINGS_TIMEOUT",
            ErrorCode::StreamClosed => "STREAM_CLOSED",
            ErrorCode::FrameSizeError => "FRAME_SIZE_ERROR",
            ErrorCode::RefusedStream => "REFUSED_STREAM",
            ErrorCode::Cancel => "CANCEL",
            ErrorCode::CompressionError => "COMPRESSION_ERROR",
            ErrorCode::ConnectError => "CONNECT_ERROR",
            ErrorCode::EnhanceYourCalm => "ENHANCE_YOUR_CALM",
            ErrorCode::InadequateSecurity => "INADEQUATE_SECURITY",
            ErrorCode::Http11Required => "HTTP_1_1_REQUIRED",
        }
    }

    /// Look an error code up by its protocol name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.name(), self.as_u32())
    }
}

/// Error code as received on the wire
///
/// Peers may send codes outside the defined range; those must be carried,
/// not rejected (RFC 7540 Section 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawErrorCode(pub u32);

impl RawErrorCode {
    /// The known code, if any
    pub fn known(&self) -> Option<ErrorCode> {
        ErrorCode::from_u32(self.0)
    }
}

impl From<ErrorCode> for RawErrorCode {
    fn from(code: ErrorCode) -> Self {
        RawErrorCode(code.as_u32())
    }
}

impl fmt::Display for RawErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.known() {
            Some(code) => code.fmt(f),
            None => write!(f, "UNKNOWN (0x{:x})", self.0),
        }
    }
}

/// Result type for HTTP/2 operations
pub type Result<T> = std::result::Result<T, Error>;
