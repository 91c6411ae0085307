//! HTTP/2 stream management
//!
//! This module implements client stream identifier allocation and the
//! per-exchange stream state defined in RFC 7540 Section 5.1.

use super::error::{Error, Result};
use super::flow_control::FlowControl;
use super::MAX_STREAM_ID;

/// Stream ID type
pub type StreamId = u32;

/// Allocator for client-initiated stream identifiers
///
/// Client streams are odd: the first call returns 1, each later call the
/// previous value plus 2. Identifiers are never reused.
#[derive(Debug, Clone, Default)]
pub struct StreamIdAllocator {
    current: Option<StreamId>,
}

impl StreamIdAllocator {
    /// Create an allocator for a fresh connection
    pub fn new() -> Self {
        StreamIdAllocator { current: None }
    }

    /// Allocate the next stream ID
    ///
    /// Fails with `StreamSpaceExhausted` once 2^31 - 1 has been handed out;
    /// the connection must then be replaced.
    pub fn next(&mut self) -> Result<StreamId> {
        let next = match self.current {
            None => 1,
            Some(id) => id
                .checked_add(2)
                .filter(|&next| next <= MAX_STREAM_ID)
                .ok_or(Error::StreamSpaceExhausted)?,
        };
        self.current = Some(next);
        Ok(next)
    }

    /// Most recently allocated ID
    pub fn current(&self) -> Option<StreamId> {
        self.current
    }
}

/// Stream state as defined in RFC 7540 Section 5.1
///
/// A client without server push only ever walks
/// Idle → Open → HalfClosed(Local|Remote) → Closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Idle: No frames have been sent/received
    Idle,
    /// Open: Both sides can send frames
    Open,
    /// Half-closed (local): We can't send, they can
    HalfClosedLocal,
    /// Half-closed (remote): They can't send, we can
    HalfClosedRemote,
    /// Closed: Stream is closed
    Closed,
}

impl StreamState {
    /// Check if stream can send data
    pub fn can_send(&self) -> bool {
        matches!(self, StreamState::Open | StreamState::HalfClosedRemote)
    }

    /// Check if stream can receive data
    pub fn can_receive(&self) -> bool {
        matches!(self, StreamState::Open | StreamState::HalfClosedLocal)
    }

    /// Check if stream is closed
    pub fn is_closed(&self) -> bool {
        matches!(self, StreamState::Closed)
    }
}

/// HTTP/2 stream carrying one request/response exchange
#[derive(Debug)]
pub struct H2Stream {
    /// Stream ID
    id: StreamId,
    /// Stream state
    state: StreamState,
    /// Flow control
    flow_control: FlowControl,
}

impl H2Stream {
    /// Create a new stream with specified window sizes
    pub fn new(id: StreamId, send_size: u32, recv_size: u32) -> Self {
        H2Stream {
            id,
            state: StreamState::Idle,
            flow_control: FlowControl::with_initial_sizes(id, send_size, recv_size),
        }
    }

    /// Get stream ID
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Get stream state
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Get flow control
    pub fn flow_control(&self) -> &FlowControl {
        &self.flow_control
    }

    /// Get mutable flow control
    pub fn flow_control_mut(&mut self) -> &mut FlowControl {
        &mut self.flow_control
    }

    /// Record that our HEADERS went out
    pub fn send_headers(&mut self, end_stream: bool) -> Result<()> {
        match self.state {
            StreamState::Idle => {
                self.state = if end_stream {
                    StreamState::HalfClosedLocal
                } else {
                    StreamState::Open
                };
                Ok(())
            }
            _ => Err(Error::Protocol(format!(
                "Cannot send HEADERS on stream {} in state {:?}",
                self.id, self.state
            ))),
        }
    }

    /// Record a DATA frame we are about to send
    ///
    /// Consumes the stream send window and returns how much of `data_len`
    /// it allows.
    pub fn send_data(&mut self, data_len: usize, end_stream: bool) -> Result<usize> {
        if !self.state.can_send() {
            return Err(Error::StreamClosed(self.id));
        }

        let sendable = self.flow_control.consume_send_window(data_len);

        if end_stream && sendable == data_len {
            self.close_local();
        }

        Ok(sendable)
    }

    /// Record END_STREAM sent without flow-control accounting
    pub fn close_local(&mut self) {
        self.state = match self.state {
            StreamState::Idle | StreamState::Open => StreamState::HalfClosedLocal,
            StreamState::HalfClosedRemote => StreamState::Closed,
            other => other,
        };
    }

    /// Record END_STREAM received from the peer
    pub fn close_remote(&mut self) {
        self.state = match self.state {
            StreamState::Open => StreamState::HalfClosedRemote,
            StreamState::HalfClosedLocal => StreamState::Closed,
            other => other,
        };
    }

    /// Close the stream
    pub fn close(&mut self) {
        self.state = StreamState::Closed;
    }
}
