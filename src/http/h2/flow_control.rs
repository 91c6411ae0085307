//! HTTP/2 flow control
//!
//! This module implements flow control as defined in RFC 7540 Section 5.2.
//!
//! Only DATA frames are flow controlled. Each side keeps a send window per
//! stream plus one for the whole connection; the peer replenishes them with
//! WINDOW_UPDATE frames.

use super::error::{Error, Result};
use super::settings::MAX_WINDOW_SIZE;
use super::stream::StreamId;
use super::DEFAULT_INITIAL_WINDOW_SIZE;

/// Flow control window
///
/// Tracks the available window size for sending or receiving data.
#[derive(Debug, Clone)]
pub struct FlowControlWindow {
    /// Initial window size
    initial_size: u32,
    /// Current window size (can be negative after a SETTINGS shrink)
    current_size: i64,
}

impl FlowControlWindow {
    /// Create a new flow control window with default size
    pub fn new() -> Self {
        Self::with_initial_size(DEFAULT_INITIAL_WINDOW_SIZE)
    }

    /// Create a new flow control window with specified initial size
    pub fn with_initial_size(initial_size: u32) -> Self {
        FlowControlWindow {
            initial_size,
            current_size: initial_size as i64,
        }
    }

    /// Get current window size
    pub fn size(&self) -> i64 {
        self.current_size
    }

    /// Get initial window size
    pub fn initial_size(&self) -> u32 {
        self.initial_size
    }

    /// Bytes that may be sent right now
    pub fn available(&self) -> usize {
        self.current_size.max(0) as usize
    }

    /// Check if window has available capacity
    pub fn has_capacity(&self) -> bool {
        self.current_size > 0
    }

    /// Check if window can send specified amount
    pub fn can_send(&self, amount: usize) -> bool {
        self.current_size >= amount as i64
    }

    /// Consume window capacity for sending data
    ///
    /// Returns the actual amount that can be sent (may be less than requested)
    pub fn consume(&mut self, amount: usize) -> usize {
        let to_send = amount.min(self.available());
        self.current_size -= to_send as i64;
        to_send
    }

    /// Increase window size (WINDOW_UPDATE)
    ///
    /// Returns the new window size
    pub fn increase(&mut self, increment: u32) -> Result<i64> {
        if increment == 0 {
            return Err(Error::FlowControl(
                "Window update increment must be non-zero".to_string(),
            ));
        }

        let new_size = self.current_size + increment as i64;

        // RFC 7540 Section 6.9.1
        if new_size > MAX_WINDOW_SIZE as i64 {
            return Err(Error::FlowControl(format!(
                "Window size {} exceeds maximum (2^31-1)",
                new_size
            )));
        }

        self.current_size = new_size;
        Ok(self.current_size)
    }

    /// Account for received data
    ///
    /// Fails if the peer sent more than the window allowed.
    pub fn decrease(&mut self, amount: usize) -> Result<()> {
        if amount as i64 > self.current_size {
            return Err(Error::FlowControl(format!(
                "Peer sent {} bytes with only {} left in the window",
                amount, self.current_size
            )));
        }
        self.current_size -= amount as i64;
        Ok(())
    }

    /// Update initial window size from SETTINGS
    ///
    /// The current size moves by the same delta as the initial size
    /// (RFC 7540 Section 6.9.2).
    pub fn update_initial_size(&mut self, new_initial_size: u32) -> Result<()> {
        let diff = new_initial_size as i64 - self.initial_size as i64;
        let new_current = self.current_size + diff;

        if new_current > MAX_WINDOW_SIZE as i64 {
            return Err(Error::FlowControl(format!(
                "New window size {} exceeds maximum (2^31-1)",
                new_current
            )));
        }

        self.initial_size = new_initial_size;
        self.current_size = new_current;

        Ok(())
    }
}

impl Default for FlowControlWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Send and receive windows of one flow-control scope
///
/// Stream 0 is the connection itself.
#[derive(Debug, Clone)]
pub struct FlowControl {
    /// Stream ID (0 for the connection)
    stream_id: StreamId,
    /// Send window (outbound data)
    send_window: FlowControlWindow,
    /// Receive window (inbound data)
    recv_window: FlowControlWindow,
}

impl FlowControl {
    /// Connection-level windows, both at the protocol default
    pub fn connection() -> Self {
        Self::with_initial_sizes(0, DEFAULT_INITIAL_WINDOW_SIZE, DEFAULT_INITIAL_WINDOW_SIZE)
    }

    /// Create with specified initial window sizes
    pub fn with_initial_sizes(stream_id: StreamId, send_size: u32, recv_size: u32) -> Self {
        FlowControl {
            stream_id,
            send_window: FlowControlWindow::with_initial_size(send_size),
            recv_window: FlowControlWindow::with_initial_size(recv_size),
        }
    }

    /// Get stream ID
    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// Get send window
    pub fn send_window(&self) -> &FlowControlWindow {
        &self.send_window
    }

    /// Get mutable send window
    pub fn send_window_mut(&mut self) -> &mut FlowControlWindow {
        &mut self.send_window
    }

    /// Get receive window
    pub fn recv_window(&self) -> &FlowControlWindow {
        &self.recv_window
    }

    /// Consume send window for outbound data
    pub fn consume_send_window(&mut self, amount: usize) -> usize {
        self.send_window.consume(amount)
    }

    /// Increase send window from WINDOW_UPDATE
    pub fn increase_send_window(&mut self, increment: u32) -> Result<i64> {
        self.send_window.increase(increment)
    }

    /// Decrease receive window for inbound data
    pub fn consume_recv_window(&mut self, amount: usize) -> Result<()> {
        self.recv_window.decrease(amount)
    }

    /// Check if we need to send WINDOW_UPDATE
    ///
    /// Returns the suggested increment once the receive window has dropped
    /// below half of its initial size.
    pub fn should_send_window_update(&self) -> Option<u32> {
        let recv_size = self.recv_window.size();
        let initial_size = self.recv_window.initial_size() as i64;

        if recv_size < initial_size / 2 {
            Some((initial_size - recv_size) as u32)
        } else {
            None
        }
    }

    /// Record a WINDOW_UPDATE we sent (increases receive window)
    pub fn send_window_update(&mut self, increment: u32) -> Result<i64> {
        self.recv_window.increase(increment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_control_window_basic() {
        let window = FlowControlWindow::new();
        assert_eq!(window.size(), DEFAULT_INITIAL_WINDOW_SIZE as i64);
        assert!(window.has_capacity());
        assert!(window.can_send(1000));
    }

    #[test]
    fn test_flow_control_window_consume() {
        let mut window = FlowControlWindow::with_initial_size(100);
        assert_eq!(window.consume(50), 50);
        assert_eq!(window.size(), 50);

        assert_eq!(window.consume(60), 50); // Only 50 available
        assert_eq!(window.size(), 0);

        assert_eq!(window.consume(10), 0);
        assert!(!window.has_capacity());
    }

    #[test]
    fn test_flow_control_window_increase() {
        let mut window = FlowControlWindow::with_initial_size(100);
        window.consume(50);
        assert_eq!(window.increase(100).unwrap(), 150);

        assert!(matches!(window.increase(0), Err(Error::FlowControl(_))));
    }

    #[test]
    fn test_flow_control_window_overflow() {
        let mut window = FlowControlWindow::with_initial_size(0x7FFFFFFF);
        assert!(window.increase(1).is_err());
    }

    #[test]
    fn test_flow_control_window_decrease_past_zero() {
        let mut window = FlowControlWindow::with_initial_size(10);
        window.decrease(10).unwrap();
        assert!(matches!(window.decrease(1), Err(Error::FlowControl(_))));
    }

    #[test]
    fn test_flow_control_window_update_initial_size() {
        let mut window = FlowControlWindow::with_initial_size(100);
        window.consume(50);

        window.update_initial_size(200).unwrap();
        assert_eq!(window.initial_size(), 200);
        assert_eq!(window.size(), 150); // 50 + 100

        window.update_initial_size(0).unwrap();
        assert_eq!(window.size(), -50);
        assert_eq!(window.available(), 0);
    }

    #[test]
    fn test_connection_flow_control() {
        let mut flow_control = FlowControl::connection();
        assert_eq!(flow_control.stream_id(), 0);

        assert_eq!(flow_control.consume_send_window(1000), 1000);

        flow_control.consume_recv_window(1000).unwrap();
        assert_eq!(
            flow_control.recv_window().size(),
            (DEFAULT_INITIAL_WINDOW_SIZE - 1000) as i64
        );

        flow_control.increase_send_window(500).unwrap();
        assert!(flow_control.send_window().can_send(500));
    }

    #[test]
    fn test_should_send_window_update() {
        let mut flow_control = FlowControl::with_initial_sizes(1, 100, 100);
        assert_eq!(flow_control.should_send_window_update(), None);

        flow_control.consume_recv_window(60).unwrap();
        assert_eq!(flow_control.should_send_window_update(), Some(60));

        flow_control.send_window_update(60).unwrap();
        assert_eq!(flow_control.should_send_window_update(), None);
    }
}
