//! HTTP/2 frame types and utilities
//!
//! This module defines the frame types specified in RFC 7540 Section 6.
//! A [`Frame`] is the raw unit read from or written to the wire; the typed
//! views ([`DataFrame`], [`HeadersFrame`], ...) are produced from it by the
//! codec and collected under [`FramePayload`].

use super::error::RawErrorCode;
use super::stream::StreamId;
use bytes::Bytes;
use std::fmt;

/// HTTP/2 frame types (RFC 7540 Section 6)
///
/// Types this engine does not know decode to `Unknown` and are never an
/// error (RFC 7540 Section 4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// DATA frame (0x0) - Conveys arbitrary, variable-length sequences of octets
    Data,
    /// HEADERS frame (0x1) - Opens a stream and carries header block fragment
    Headers,
    /// PRIORITY frame (0x2) - Specifies sender-advised priority of a stream
    Priority,
    /// RST_STREAM frame (0x3) - Allows immediate termination of a stream
    RstStream,
    /// SETTINGS frame (0x4) - Conveys configuration parameters
    Settings,
    /// PUSH_PROMISE frame (0x5) - Used to notify peer of intent to initiate stream
    PushPromise,
    /// PING frame (0x6) - Mechanism for measuring round-trip time
    Ping,
    /// GOAWAY frame (0x7) - Initiates shutdown of connection
    Goaway,
    /// WINDOW_UPDATE frame (0x8) - Implements flow control
    WindowUpdate,
    /// CONTINUATION frame (0x9) - Continues sequence of header block fragments
    Continuation,
    /// Any other type byte
    Unknown(u8),
}

impl FrameType {
    /// Convert frame type to u8
    pub fn as_u8(self) -> u8 {
        match self {
            FrameType::Data => 0x0,
            FrameType::Headers => 0x1,
            FrameType::Priority => 0x2,
            FrameType::RstStream => 0x3,
            FrameType::Settings => 0x4,
            FrameType::PushPromise => 0x5,
            FrameType::Ping => 0x6,
            FrameType::Goaway => 0x7,
            FrameType::WindowUpdate => 0x8,
            FrameType::Continuation => 0x9,
            FrameType::Unknown(byte) => byte,
        }
    }

    /// Create frame type from u8
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            0x0 => FrameType::Data,
            0x1 => FrameType::Headers,
            0x2 => FrameType::Priority,
            0x3 => FrameType::RstStream,
            0x4 => FrameType::Settings,
            0x5 => FrameType::PushPromise,
            0x6 => FrameType::Ping,
            0x7 => FrameType::Goaway,
            0x8 => FrameType::WindowUpdate,
            0x9 => FrameType::Continuation,
            other => FrameType::Unknown(other),
        }
    }

    /// Whether this is one of the RFC 7540 frame types
    pub fn is_known(&self) -> bool {
        !matches!(self, FrameType::Unknown(_))
    }

    /// Whether frames of this type must be sent on stream 0
    pub fn is_connection_level(&self) -> bool {
        matches!(self, FrameType::Settings | FrameType::Ping | FrameType::Goaway)
    }

    /// Get frame type name
    pub fn name(&self) -> &'static str {
        match self {
            FrameType::Data => "DATA",
            FrameType::Headers => "HEADERS",
            FrameType::Priority => "PRIORITY",
            FrameType::RstStream => "RST_STREAM",
            FrameType::Settings => "SETTINGS",
            FrameType::PushPromise => "PUSH_PROMISE",
            FrameType::Ping => "PING",
            FrameType::Goaway => "GOAWAY",
            FrameType::WindowUpdate => "WINDOW_UPDATE",
            FrameType::Continuation => "CONTINUATION",
            FrameType::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.name(), self.as_u8())
    }
}

/// HTTP/2 frame flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags(u8);

impl FrameFlags {
    /// Create empty flags
    pub fn empty() -> Self {
        FrameFlags(0)
    }

    /// Create from u8
    pub fn from_u8(flags: u8) -> Self {
        FrameFlags(flags)
    }

    /// Get raw u8 value
    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// Set a flag
    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    /// Set a flag when `cond` holds
    pub fn with(mut self, flag: u8, cond: bool) -> Self {
        if cond {
            self.set(flag);
        }
        self
    }

    /// Check if a flag is set
    pub fn is_set(&self, flag: u8) -> bool {
        (self.0 & flag) != 0
    }

    // Common flags

    /// END_STREAM flag (0x1)
    pub const END_STREAM: u8 = 0x1;

    /// ACK flag (0x1) - used for SETTINGS and PING
    pub const ACK: u8 = 0x1;

    /// END_HEADERS flag (0x4)
    pub const END_HEADERS: u8 = 0x4;

    /// PADDED flag (0x8)
    pub const PADDED: u8 = 0x8;

    /// PRIORITY flag (0x20)
    pub const PRIORITY: u8 = 0x20;

    /// Check if END_STREAM is set
    pub fn is_end_stream(&self) -> bool {
        self.is_set(Self::END_STREAM)
    }

    /// Check if ACK is set
    pub fn is_ack(&self) -> bool {
        self.is_set(Self::ACK)
    }

    /// Check if END_HEADERS is set
    pub fn is_end_headers(&self) -> bool {
        self.is_set(Self::END_HEADERS)
    }

    /// Check if PADDED is set
    pub fn is_padded(&self) -> bool {
        self.is_set(Self::PADDED)
    }

    /// Check if PRIORITY is set
    pub fn is_priority(&self) -> bool {
        self.is_set(Self::PRIORITY)
    }
}

/// Decoded 9-byte frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Payload length (24 bits)
    pub length: usize,
    /// Frame type
    pub frame_type: FrameType,
    /// Frame flags
    pub flags: FrameFlags,
    /// Stream ID (31 bits, reserved bit cleared)
    pub stream_id: StreamId,
}

/// Generic HTTP/2 frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame type
    pub frame_type: FrameType,
    /// Frame flags
    pub flags: FrameFlags,
    /// Stream ID
    pub stream_id: StreamId,
    /// Frame payload
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame
    pub fn new(
        frame_type: FrameType,
        flags: FrameFlags,
        stream_id: StreamId,
        payload: Bytes,
    ) -> Self {
        Frame {
            frame_type,
            flags,
            stream_id,
            payload,
        }
    }

    /// Get payload size
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Header describing this frame
    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            length: self.payload.len(),
            frame_type: self.frame_type,
            flags: self.flags,
            stream_id: self.stream_id,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stream={} flags=0x{:02x} length={}",
            self.frame_type,
            self.stream_id,
            self.flags.as_u8(),
            self.payload.len()
        )?;
        if !self.payload.is_empty() {
            let shown = &self.payload[..self.payload.len().min(16)];
            write!(f, " payload=")?;
            for b in shown {
                write!(f, "{:02x}", b)?;
            }
            if self.payload.len() > shown.len() {
                write!(f, "..")?;
            }
        }
        Ok(())
    }
}

/// DATA frame (RFC 7540 Section 6.1)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    /// Stream ID
    pub stream_id: StreamId,
    /// Data payload
    pub data: Bytes,
    /// END_STREAM flag
    pub end_stream: bool,
    /// Padding length (if PADDED flag is set)
    pub padding: Option<u8>,
}

impl DataFrame {
    /// Create a new DATA frame
    pub fn new(stream_id: StreamId, data: Bytes, end_stream: bool) -> Self {
        DataFrame {
            stream_id,
            data,
            end_stream,
            padding: None,
        }
    }

    /// Set padding
    pub fn with_padding(mut self, padding: u8) -> Self {
        self.padding = Some(padding);
        self
    }

    /// Bytes this frame counts against flow control, padding included
    pub fn flow_controlled_len(&self) -> usize {
        let mut size = self.data.len();
        if let Some(pad_len) = self.padding {
            size += 1 + pad_len as usize;
        }
        size
    }
}

/// HEADERS frame (RFC 7540 Section 6.2)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadersFrame {
    /// Stream ID
    pub stream_id: StreamId,
    /// Header block fragment
    pub header_block: Bytes,
    /// END_STREAM flag
    pub end_stream: bool,
    /// END_HEADERS flag
    pub end_headers: bool,
    /// Priority information (if PRIORITY flag is set)
    pub priority: Option<PrioritySpec>,
    /// Padding length (if PADDED flag is set)
    pub padding: Option<u8>,
}

impl HeadersFrame {
    /// Create a new HEADERS frame
    pub fn new(
        stream_id: StreamId,
        header_block: Bytes,
        end_stream: bool,
        end_headers: bool,
    ) -> Self {
        HeadersFrame {
            stream_id,
            header_block,
            end_stream,
            end_headers,
            priority: None,
            padding: None,
        }
    }

    /// Set priority
    pub fn with_priority(mut self, priority: PrioritySpec) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set padding
    pub fn with_padding(mut self, padding: u8) -> Self {
        self.padding = Some(padding);
        self
    }
}

/// Priority specification (RFC 7540 Section 6.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrioritySpec {
    /// Stream dependency
    pub stream_dependency: StreamId,
    /// Exclusive flag
    pub exclusive: bool,
    /// Weight (wire value, 0-255 meaning 1-256)
    pub weight: u8,
}

impl PrioritySpec {
    /// Create a new priority specification
    pub fn new(stream_dependency: StreamId, exclusive: bool, weight: u8) -> Self {
        PrioritySpec {
            stream_dependency,
            exclusive,
            weight,
        }
    }
}

/// PRIORITY frame (RFC 7540 Section 6.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityFrame {
    /// Stream ID
    pub stream_id: StreamId,
    /// Priority specification
    pub priority: PrioritySpec,
}

/// RST_STREAM frame (RFC 7540 Section 6.4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RstStreamFrame {
    /// Stream ID
    pub stream_id: StreamId,
    /// Error code
    pub error_code: RawErrorCode,
}

/// SETTINGS frame (RFC 7540 Section 6.5)
///
/// Parameters are kept as raw `(id, value)` pairs in wire order so that
/// unknown identifiers survive decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsFrame {
    /// ACK flag
    pub ack: bool,
    /// Settings parameters
    pub params: Vec<(u16, u32)>,
}

impl SettingsFrame {
    /// Create a new SETTINGS frame
    pub fn new(params: Vec<(u16, u32)>) -> Self {
        SettingsFrame { ack: false, params }
    }

    /// Create a SETTINGS ACK frame
    pub fn ack() -> Self {
        SettingsFrame {
            ack: true,
            params: Vec::new(),
        }
    }
}

/// PUSH_PROMISE frame (RFC 7540 Section 6.6)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushPromiseFrame {
    /// Stream ID
    pub stream_id: StreamId,
    /// Promised stream ID
    pub promised_stream_id: StreamId,
    /// Header block fragment
    pub header_block: Bytes,
    /// END_HEADERS flag
    pub end_headers: bool,
    /// Padding length (if PADDED flag is set)
    pub padding: Option<u8>,
}

/// PING frame (RFC 7540 Section 6.7)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingFrame {
    /// ACK flag
    pub ack: bool,
    /// Opaque data (8 bytes)
    pub data: [u8; 8],
}

impl PingFrame {
    /// Create a new PING frame
    pub fn new(data: [u8; 8]) -> Self {
        PingFrame { ack: false, data }
    }

    /// Create a PING ACK frame
    pub fn ack(data: [u8; 8]) -> Self {
        PingFrame { ack: true, data }
    }
}

/// GOAWAY frame (RFC 7540 Section 6.8)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoawayFrame {
    /// Last stream ID
    pub last_stream_id: StreamId,
    /// Error code
    pub error_code: RawErrorCode,
    /// Debug data
    pub debug_data: Bytes,
}

impl GoawayFrame {
    /// Create a new GOAWAY frame
    pub fn new(last_stream_id: StreamId, error_code: RawErrorCode, debug_data: Bytes) -> Self {
        GoawayFrame {
            last_stream_id,
            error_code,
            debug_data,
        }
    }
}

/// WINDOW_UPDATE frame (RFC 7540 Section 6.9)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowUpdateFrame {
    /// Stream ID (0 for connection-level)
    pub stream_id: StreamId,
    /// Window size increment
    pub size_increment: u32,
}

impl WindowUpdateFrame {
    /// Create a new WINDOW_UPDATE frame
    pub fn new(stream_id: StreamId, size_increment: u32) -> Self {
        WindowUpdateFrame {
            stream_id,
            size_increment,
        }
    }
}

/// CONTINUATION frame (RFC 7540 Section 6.10)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationFrame {
    /// Stream ID
    pub stream_id: StreamId,
    /// Header block fragment
    pub header_block: Bytes,
    /// END_HEADERS flag
    pub end_headers: bool,
}

/// Typed view of a frame, dispatched on the type byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePayload {
    Data(DataFrame),
    Headers(HeadersFrame),
    Priority(PriorityFrame),
    RstStream(RstStreamFrame),
    Settings(SettingsFrame),
    PushPromise(PushPromiseFrame),
    Ping(PingFrame),
    Goaway(GoawayFrame),
    WindowUpdate(WindowUpdateFrame),
    Continuation(ContinuationFrame),
    /// Frame of a type this engine does not interpret, payload untouched
    Unknown(Frame),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_type_conversion() {
        assert_eq!(FrameType::Data.as_u8(), 0x0);
        assert_eq!(FrameType::Headers.as_u8(), 0x1);
        assert_eq!(FrameType::Continuation.as_u8(), 0x9);

        assert_eq!(FrameType::from_u8(0x0), FrameType::Data);
        assert_eq!(FrameType::from_u8(0x9), FrameType::Continuation);
        assert_eq!(FrameType::from_u8(0xff), FrameType::Unknown(0xff));
        assert_eq!(FrameType::Unknown(0xff).as_u8(), 0xff);

        for byte in 0..=u8::MAX {
            assert_eq!(FrameType::from_u8(byte).as_u8(), byte);
        }
    }

    #[test]
    fn test_frame_type_name() {
        assert_eq!(FrameType::Data.name(), "DATA");
        assert_eq!(FrameType::Headers.name(), "HEADERS");
        assert_eq!(FrameType::Settings.name(), "SETTINGS");
        assert_eq!(FrameType::Unknown(0x42).to_string(), "UNKNOWN (0x42)");
    }

    #[test]
    fn test_frame_flags() {
        let mut flags = FrameFlags::empty();
        assert!(!flags.is_end_stream());

        flags.set(FrameFlags::END_STREAM);
        assert!(flags.is_end_stream());
        assert!(!flags.is_end_headers());

        flags.set(FrameFlags::END_HEADERS);
        assert!(flags.is_end_stream());
        assert!(flags.is_end_headers());

        let flags = FrameFlags::empty()
            .with(FrameFlags::END_HEADERS, true)
            .with(FrameFlags::END_STREAM, false);
        assert_eq!(flags.as_u8(), FrameFlags::END_HEADERS);
    }

    #[test]
    fn test_data_frame() {
        let data = Bytes::from("Hello");
        let frame = DataFrame::new(1, data.clone(), true);

        assert_eq!(frame.stream_id, 1);
        assert_eq!(frame.data, data);
        assert!(frame.end_stream);
        assert_eq!(frame.padding, None);
        assert_eq!(frame.flow_controlled_len(), 5);

        let frame_with_padding = frame.with_padding(10);
        assert_eq!(frame_with_padding.padding, Some(10));
        assert_eq!(frame_with_padding.flow_controlled_len(), 16); // 5 + 1 + 10
    }

    #[test]
    fn test_frame_display() {
        let frame = Frame::new(
            FrameType::Data,
            FrameFlags::from_u8(FrameFlags::END_STREAM),
            3,
            Bytes::from_static(b"ab"),
        );
        assert_eq!(
            frame.to_string(),
            "DATA (0x0) stream=3 flags=0x01 length=2 payload=6162"
        );
    }

    #[test]
    fn test_settings_frame() {
        let frame = SettingsFrame::new(vec![(0x2, 0)]);
        assert!(!frame.ack);

        let ack_frame = SettingsFrame::ack();
        assert!(ack_frame.ack);
        assert!(ack_frame.params.is_empty());
    }

    #[test]
    fn test_ping_frame() {
        let data = [1, 2, 3, 4, 5, 6, 7, 8];
        let ping = PingFrame::new(data);
        assert!(!ping.ack);
        assert_eq!(ping.data, data);

        let pong = PingFrame::ack(data);
        assert!(pong.ack);
        assert_eq!(pong.data, data);
    }
}
