//! HTTP/2 client implementation with low-level frame control
//!
//! This module drives one HTTP/2 connection: the connection preface and
//! SETTINGS exchange, request framing, and response reassembly. Exchanges
//! run one at a time; a response must be read before the next request.

use super::codec::FrameCodec;
use super::error::{Error, ErrorCode, Result};
use super::flow_control::FlowControl;
use super::frames::*;
use super::header_codec::{HeaderCodec, HeaderList, HpackCodec};
use super::settings::{Settings, SettingsBuilder};
use super::stream::{H2Stream, StreamId, StreamIdAllocator};
use super::{CONNECTION_PREFACE, CONNECTION_STREAM_ID, DEFAULT_HEADER_TABLE_SIZE};
use crate::http::{HttpSession, SessionOps, ALPN_PROTO_H2};
use bytes::{Bytes, BytesMut};
use log::{debug, info, warn};
use std::collections::VecDeque;

/// Connection lifecycle as seen by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Nothing sent yet
    Fresh,
    /// Preface and SETTINGS sent, handshake not finished
    AwaitingPeerSettings,
    /// Handshake complete; requests may be sent
    Established,
}

/// What to do with frames that arrive out of sequence while reading a
/// response (DATA before the response headers, frames for other streams,
/// stray CONTINUATION)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadPolicy {
    /// Log and skip them
    #[default]
    Lenient,
    /// Fail with `Error::UnexpectedFrame`
    Strict,
}

/// HTTP/2 client
///
/// Owns the transport, the peer's settings, the stream ID allocator and the
/// header compression context of one connection.
pub struct H2Client<S: SessionOps, C: HeaderCodec = HpackCodec> {
    /// HTTP session
    session: HttpSession<S>,
    /// Handshake progress
    state: ConnectionState,
    /// Client stream IDs
    stream_ids: StreamIdAllocator,
    /// Connection-level flow control
    flow_control: FlowControl,
    /// Exchange currently in flight
    exchange: Option<H2Stream>,
    /// Header compression context
    header_codec: C,
    /// Client settings
    local_settings: Settings,
    /// Remote (server) settings
    remote_settings: Settings,
    /// Peer acknowledged our SETTINGS
    settings_acked: bool,
    /// Frames read while waiting for flow-control credit
    pending: VecDeque<FramePayload>,
    read_policy: ReadPolicy,
    scheme: String,
    authority: Option<String>,
    enforce_flow_control: bool,
}

impl<S: SessionOps> H2Client<S> {
    /// Create a new HTTP/2 client with default configuration
    pub fn new(session: S) -> Result<Self> {
        H2ClientBuilder::new().build(session)
    }
}

impl<S: SessionOps, C: HeaderCodec> H2Client<S, C> {
    /// Current handshake state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Fail unless the transport negotiated "h2"
    ///
    /// A transport that cannot tell is trusted.
    pub fn check_alpn(&self) -> Result<()> {
        match self.session.get_ref().alpn_protocol() {
            Some(proto) if proto == ALPN_PROTO_H2 => {
                debug!("Negotiated 'h2' application layer protocol");
                Ok(())
            }
            Some(proto) => Err(Error::AlpnFailed(Some(proto))),
            None => {
                debug!("Transport does not report ALPN; assuming h2");
                Ok(())
            }
        }
    }

    /// Perform the HTTP/2 connection preface and settings exchange
    ///
    /// Sends the preface and our SETTINGS, requires the peer's first frame to
    /// be SETTINGS, acknowledges it, then waits for the peer's ACK of ours.
    /// Calling this on an established connection does nothing.
    pub fn send_connection_preface(&mut self) -> Result<()> {
        match self.state {
            ConnectionState::Established => return Ok(()),
            ConnectionState::AwaitingPeerSettings => {
                return Err(Error::Protocol("connection handshake already attempted".to_string()));
            }
            ConnectionState::Fresh => {}
        }

        // RFC 7540 Section 3.5
        self.session.write_all(CONNECTION_PREFACE)?;
        let settings = SettingsFrame::new(self.local_settings.to_params());
        self.write_frame(&settings.to_frame())?;
        self.session.flush()?;
        self.state = ConnectionState::AwaitingPeerSettings;

        let first = self.read_raw_frame()?;
        if first.frame_type != FrameType::Settings || first.flags.is_ack() {
            return Err(Error::Protocol(format!(
                "Expected SETTINGS as first frame, got {}",
                first
            )));
        }
        let payload = FrameCodec::parse(first)?;
        self.handle_control_frame(&payload)?;

        while !self.settings_acked {
            match self.read_wire_frame()? {
                FramePayload::Settings(_)
                | FramePayload::WindowUpdate(_)
                | FramePayload::Ping(_)
                | FramePayload::Priority(_)
                | FramePayload::Unknown(_) => {}
                FramePayload::Goaway(goaway) => self.check_goaway(goaway, None)?,
                other => self.pending.push_back(other),
            }
        }

        self.state = ConnectionState::Established;
        info!("Connection preface completed");
        Ok(())
    }

    /// Frame a request without sending it
    ///
    /// Allocates a stream ID and compresses the header list, so the frames
    /// must be written in order (see [`send_raw`](Self::send_raw)) before any
    /// other request is built. The header block is split into HEADERS and
    /// CONTINUATION frames and the body into DATA frames no larger than the
    /// peer's SETTINGS_MAX_FRAME_SIZE. Flow control is not applied here.
    pub fn build_request(
        &mut self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        body: Bytes,
    ) -> Result<Vec<Frame>> {
        let mut exchange = self.open_exchange()?;
        let stream_id = exchange.id();
        let end_stream = body.is_empty();

        let mut frames = self.header_frames(stream_id, method, path, headers, end_stream)?;
        exchange.send_headers(end_stream)?;

        let max = self.max_send_frame_size();
        let chunks = FrameCodec::split_payload(&body, max);
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.into_iter().enumerate() {
            frames.push(DataFrame::new(stream_id, chunk, i == last).to_frame());
        }
        if !end_stream {
            exchange.close_local();
        }

        self.exchange = Some(exchange);
        Ok(frames)
    }

    /// Frame a request and serialize each frame
    pub fn create_request(
        &mut self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        body: Bytes,
    ) -> Result<Vec<Bytes>> {
        self.build_request(method, path, headers, body)?
            .iter()
            .map(FrameCodec::encode)
            .collect()
    }

    /// Send a request, honouring the peer's flow-control windows
    ///
    /// Returns the stream ID the response will arrive on.
    pub fn send_request(
        &mut self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        body: Bytes,
    ) -> Result<StreamId> {
        let mut exchange = self.open_exchange()?;
        let stream_id = exchange.id();
        let end_stream = body.is_empty();

        let frames = self.header_frames(stream_id, method, path, headers, end_stream)?;
        exchange.send_headers(end_stream)?;
        self.exchange = Some(exchange);

        for frame in &frames {
            self.write_frame(frame)?;
        }
        self.session.flush()?;

        self.send_body(stream_id, body)?;
        Ok(stream_id)
    }

    /// Send a request and read its response
    ///
    /// Performs the connection handshake first if it has not happened yet.
    pub fn request(
        &mut self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        body: Bytes,
    ) -> Result<H2Response> {
        if self.state == ConnectionState::Fresh {
            self.send_connection_preface()?;
        }
        self.send_request(method, path, headers, body)?;
        self.read_response()
    }

    /// Send a simple GET request
    pub fn get(&mut self, path: &str) -> Result<H2Response> {
        self.request("GET", path, &[], Bytes::new())
    }

    /// Send a POST request
    pub fn post(
        &mut self,
        path: &str,
        headers: &[(&str, &str)],
        body: Bytes,
    ) -> Result<H2Response> {
        self.request("POST", path, headers, body)
    }

    /// Read the response to the exchange in flight
    ///
    /// Collects the response header block (skipping 1xx informational
    /// blocks), then DATA until END_STREAM, then decodes trailers if the
    /// peer sends any. When no exchange is in flight the first HEADERS
    /// frame seen selects the stream.
    pub fn read_response(&mut self) -> Result<H2Response> {
        self.ensure_established()?;

        let mut stream_id = self.exchange.as_ref().map(H2Stream::id);
        let mut head: Option<(u16, Vec<(String, String)>)> = None;
        let mut trailers = Vec::new();
        let mut body = BytesMut::new();

        loop {
            match self.read_frame()? {
                FramePayload::Headers(frame) => {
                    let block = self.collect_header_block(
                        frame.stream_id,
                        frame.header_block,
                        frame.end_headers,
                    )?;
                    let decoded = self.decode_header_block(&block)?;

                    let expected = *stream_id.get_or_insert(frame.stream_id);
                    if frame.stream_id != expected {
                        self.unexpected(FrameType::Headers, frame.stream_id)?;
                        continue;
                    }

                    if head.is_none() {
                        let status = parse_status(&decoded)?;
                        if (100..200).contains(&status) && !frame.end_stream {
                            debug!(
                                "Skipping informational response {} on stream {}",
                                status, expected
                            );
                            continue;
                        }
                        head = Some((status, decoded));
                    } else {
                        trailers = decoded;
                    }

                    if frame.end_stream {
                        break;
                    }
                }
                FramePayload::Data(frame) => {
                    self.release_inbound_data(&frame)?;
                    if Some(frame.stream_id) != stream_id || head.is_none() {
                        self.unexpected(FrameType::Data, frame.stream_id)?;
                        continue;
                    }
                    body.extend_from_slice(&frame.data);
                    if frame.end_stream {
                        break;
                    }
                }
                FramePayload::PushPromise(frame) => {
                    // Decode to keep the compression context in step, then refuse
                    let block = self.collect_header_block(
                        frame.stream_id,
                        frame.header_block,
                        frame.end_headers,
                    )?;
                    self.decode_header_block(&block)?;
                    debug!("Refusing pushed stream {}", frame.promised_stream_id);
                    self.send_rst_stream(frame.promised_stream_id, ErrorCode::RefusedStream)?;
                }
                FramePayload::Continuation(frame) => {
                    self.unexpected(FrameType::Continuation, frame.stream_id)?;
                }
                FramePayload::RstStream(frame) => {
                    if Some(frame.stream_id) == stream_id {
                        self.exchange = None;
                        return Err(Error::StreamReset {
                            stream_id: frame.stream_id,
                            code: frame.error_code,
                        });
                    }
                    debug!("Ignoring RST_STREAM for stream {}", frame.stream_id);
                }
                FramePayload::Goaway(frame) => self.check_goaway(frame, stream_id)?,
                FramePayload::Unknown(frame) => {
                    debug!("Ignoring frame of unknown type: {}", frame);
                }
                FramePayload::Settings(_)
                | FramePayload::Ping(_)
                | FramePayload::WindowUpdate(_)
                | FramePayload::Priority(_) => {}
            }
        }

        let (status, headers) = head.ok_or_else(|| {
            Error::InvalidStatus("response ended without headers".to_string())
        })?;
        let stream_id = stream_id.unwrap_or(CONNECTION_STREAM_ID);
        if let Some(mut exchange) = self.exchange.take() {
            exchange.close_remote();
            debug!("Stream {} finished in state {:?}", exchange.id(), exchange.state());
        }

        Ok(H2Response {
            stream_id,
            status,
            headers,
            trailers,
            body: body.freeze(),
        })
    }

    /// Send a PING frame
    pub fn send_ping(&mut self, data: [u8; 8]) -> Result<()> {
        self.send_frame(&PingFrame::new(data).to_frame())
    }

    /// Send a GOAWAY frame naming the last stream we opened
    pub fn send_goaway(&mut self, error_code: ErrorCode, debug_data: &str) -> Result<()> {
        let last_stream_id = self.stream_ids.current().unwrap_or(CONNECTION_STREAM_ID);
        let frame = GoawayFrame::new(
            last_stream_id,
            error_code.into(),
            Bytes::from(debug_data.to_string()),
        );
        self.send_frame(&frame.to_frame())
    }

    /// Send a RST_STREAM frame
    pub fn send_rst_stream(&mut self, stream_id: StreamId, error_code: ErrorCode) -> Result<()> {
        let frame = RstStreamFrame {
            stream_id,
            error_code: error_code.into(),
        };
        self.send_frame(&frame.to_frame())?;

        if let Some(exchange) = self.exchange.as_mut().filter(|e| e.id() == stream_id) {
            exchange.close();
        }
        Ok(())
    }

    /// Send a single frame and flush
    pub fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        self.write_frame(frame)?;
        self.session.flush()?;
        Ok(())
    }

    /// Write pre-encoded bytes, e.g. the output of [`create_request`](Self::create_request)
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.session.write_all(bytes)?;
        self.session.flush()?;
        Ok(())
    }

    /// Read the next frame
    ///
    /// Connection-level frames are acted on before being returned: SETTINGS
    /// is applied and acknowledged, WINDOW_UPDATE credits the windows and
    /// PING is answered.
    pub fn read_frame(&mut self) -> Result<FramePayload> {
        match self.pending.pop_front() {
            Some(payload) => Ok(payload),
            None => self.read_wire_frame(),
        }
    }

    /// Get local settings
    pub fn local_settings(&self) -> &Settings {
        &self.local_settings
    }

    /// Get remote settings
    pub fn remote_settings(&self) -> &Settings {
        &self.remote_settings
    }

    /// Connection-level flow-control windows
    pub fn flow_control(&self) -> &FlowControl {
        &self.flow_control
    }

    /// Get a reference to the underlying session
    pub fn session(&self) -> &HttpSession<S> {
        &self.session
    }

    /// Get a mutable reference to the underlying session
    pub fn session_mut(&mut self) -> &mut HttpSession<S> {
        &mut self.session
    }

    /// Close the underlying session
    pub fn close(&mut self) -> Result<()> {
        self.session.close()?;
        Ok(())
    }

    fn ensure_established(&self) -> Result<()> {
        if self.state != ConnectionState::Established {
            return Err(Error::NotReady);
        }
        Ok(())
    }

    fn open_exchange(&mut self) -> Result<H2Stream> {
        self.ensure_established()?;
        let stream_id = self.stream_ids.next()?;
        Ok(H2Stream::new(
            stream_id,
            self.remote_settings.get_initial_window_size(),
            self.local_settings.get_initial_window_size(),
        ))
    }

    fn max_send_frame_size(&self) -> usize {
        self.remote_settings.get_max_frame_size() as usize
    }

    /// Compress the request header list and split it into HEADERS +
    /// CONTINUATION frames
    fn header_frames(
        &mut self,
        stream_id: StreamId,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        end_stream: bool,
    ) -> Result<Vec<Frame>> {
        let mut list: Vec<(&[u8], &[u8])> = vec![
            (&b":method"[..], method.as_bytes()),
            (&b":path"[..], path.as_bytes()),
            (&b":scheme"[..], self.scheme.as_bytes()),
        ];
        if let Some(authority) = &self.authority {
            list.push((&b":authority"[..], authority.as_bytes()));
        }
        list.extend(headers.iter().map(|(name, value)| (name.as_bytes(), value.as_bytes())));

        let block = self.header_codec.compress(&list)?;

        let mut fragments =
            FrameCodec::split_payload(&block, self.max_send_frame_size()).into_iter();
        let first = fragments.next().unwrap_or_default();
        let rest: Vec<Bytes> = fragments.collect();

        let headers = HeadersFrame::new(stream_id, first, end_stream, rest.is_empty());
        let mut frames = vec![headers.to_frame()];
        let last = rest.len().saturating_sub(1);
        for (i, fragment) in rest.into_iter().enumerate() {
            let continuation = ContinuationFrame {
                stream_id,
                header_block: fragment,
                end_headers: i == last,
            };
            frames.push(continuation.to_frame());
        }
        Ok(frames)
    }

    fn send_body(&mut self, stream_id: StreamId, mut body: Bytes) -> Result<()> {
        while !body.is_empty() {
            let window = self.send_window();
            if window == 0 {
                if self.wait_for_window()? == WindowWait::PeerFinished {
                    return self.abandon_body(stream_id);
                }
                continue;
            }

            let n = body.len().min(self.max_send_frame_size()).min(window);
            let chunk = body.split_to(n);
            let end_stream = body.is_empty();

            if self.enforce_flow_control {
                self.flow_control.consume_send_window(n);
            }
            let exchange = self.exchange.as_mut().ok_or(Error::NotReady)?;
            if self.enforce_flow_control {
                exchange.send_data(n, end_stream)?;
            } else if end_stream {
                exchange.close_local();
            }

            self.write_frame(&DataFrame::new(stream_id, chunk, end_stream).to_frame())?;
        }
        self.session.flush()?;
        Ok(())
    }

    /// Bytes of DATA we may send right now
    fn send_window(&self) -> usize {
        if !self.enforce_flow_control {
            return usize::MAX;
        }
        let stream = self
            .exchange
            .as_ref()
            .map_or(0, |e| e.flow_control().send_window().available());
        self.flow_control.send_window().available().min(stream)
    }

    /// Read frames until the send windows reopen
    ///
    /// Frames that are not connection-level are queued for `read_response`.
    /// Stops early once a queued frame ends the exchange's stream: the
    /// response is complete and the rest of the body is no longer wanted.
    fn wait_for_window(&mut self) -> Result<WindowWait> {
        debug!(
            "Send window exhausted (connection {}), waiting for WINDOW_UPDATE",
            self.flow_control.send_window().size()
        );
        let exchange_id = self.exchange.as_ref().map(H2Stream::id);

        while self.send_window() == 0 {
            match self.read_wire_frame()? {
                FramePayload::Settings(_)
                | FramePayload::WindowUpdate(_)
                | FramePayload::Ping(_)
                | FramePayload::Priority(_)
                | FramePayload::Unknown(_) => {}
                FramePayload::Goaway(goaway) => self.check_goaway(goaway, exchange_id)?,
                FramePayload::RstStream(rst) if Some(rst.stream_id) == exchange_id => {
                    return Err(Error::StreamReset {
                        stream_id: rst.stream_id,
                        code: rst.error_code,
                    });
                }
                other => {
                    let finished = exchange_id.is_some() && ends_stream(&other) == exchange_id;
                    self.pending.push_back(other);
                    if finished {
                        return Ok(WindowWait::PeerFinished);
                    }
                }
            }
        }
        Ok(WindowWait::Open)
    }

    /// Stop sending a body the peer has already answered
    ///
    /// Closes our side with RST_STREAM(NO_ERROR) so the peer can release
    /// the stream; the queued response is still returned by `read_response`.
    fn abandon_body(&mut self, stream_id: StreamId) -> Result<()> {
        debug!("Stream {} answered before its body was sent; abandoning the rest", stream_id);
        self.send_rst_stream(stream_id, ErrorCode::NoError)
    }

    /// Fail on GOAWAY unless it is graceful and still covers `stream_id`
    fn check_goaway(&self, frame: GoawayFrame, stream_id: Option<StreamId>) -> Result<()> {
        let graceful = frame.error_code.known() == Some(ErrorCode::NoError)
            && stream_id.map_or(false, |id| id <= frame.last_stream_id);
        if !graceful {
            return Err(Self::goaway_error(frame));
        }
        info!("Peer is going away after stream {}", frame.last_stream_id);
        Ok(())
    }

    fn read_raw_frame(&mut self) -> Result<Frame> {
        let max_payload = self.local_settings.get_max_frame_size() as usize;
        FrameCodec::read_frame_from_session(&mut self.session, max_payload)
    }

    fn read_wire_frame(&mut self) -> Result<FramePayload> {
        let frame = self.read_raw_frame()?;
        let payload = FrameCodec::parse(frame)?;
        self.handle_control_frame(&payload)?;
        Ok(payload)
    }

    fn handle_control_frame(&mut self, payload: &FramePayload) -> Result<()> {
        match payload {
            FramePayload::Settings(settings) if settings.ack => {
                debug!("Peer acknowledged our settings");
                self.settings_acked = true;
            }
            FramePayload::Settings(settings) => {
                self.apply_settings(&settings.params)?;
            }
            FramePayload::WindowUpdate(update) => {
                if update.stream_id == CONNECTION_STREAM_ID {
                    self.flow_control.increase_send_window(update.size_increment)?;
                } else if let Some(exchange) =
                    self.exchange.as_mut().filter(|e| e.id() == update.stream_id)
                {
                    exchange
                        .flow_control_mut()
                        .increase_send_window(update.size_increment)?;
                }
            }
            FramePayload::Ping(ping) if !ping.ack => {
                self.send_frame(&PingFrame::ack(ping.data).to_frame())?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Apply the peer's SETTINGS and acknowledge them
    fn apply_settings(&mut self, params: &[(u16, u32)]) -> Result<()> {
        Settings::validate_params(params)?;

        let old_window = self.remote_settings.get_initial_window_size();
        for change in self.remote_settings.apply(params) {
            info!("Setting changed: {}", change);
        }

        let new_window = self.remote_settings.get_initial_window_size();
        if new_window != old_window {
            if let Some(exchange) = self.exchange.as_mut() {
                exchange
                    .flow_control_mut()
                    .send_window_mut()
                    .update_initial_size(new_window)?;
            }
        }
        if self.remote_settings.get_header_table_size() < DEFAULT_HEADER_TABLE_SIZE {
            warn!(
                "Peer limits the header table to {} bytes; the encoder keeps {}",
                self.remote_settings.get_header_table_size(),
                DEFAULT_HEADER_TABLE_SIZE
            );
        }

        self.send_frame(&SettingsFrame::ack().to_frame())?;
        debug!("New settings acknowledged");
        Ok(())
    }

    /// Account for received DATA and return credit to the peer
    fn release_inbound_data(&mut self, frame: &DataFrame) -> Result<()> {
        let len = frame.flow_controlled_len();
        if len == 0 || !self.enforce_flow_control {
            return Ok(());
        }

        self.flow_control.consume_recv_window(len)?;
        if let Some(increment) = self.flow_control.should_send_window_update() {
            self.flow_control.send_window_update(increment)?;
            debug!("Returning {} bytes of connection window", increment);
            self.send_frame(&WindowUpdateFrame::new(CONNECTION_STREAM_ID, increment).to_frame())?;
        }

        let stream_update = match self.exchange.as_mut().filter(|e| e.id() == frame.stream_id) {
            Some(exchange) => {
                exchange.flow_control_mut().consume_recv_window(len)?;
                match exchange.flow_control().should_send_window_update() {
                    Some(increment) if !frame.end_stream => {
                        exchange.flow_control_mut().send_window_update(increment)?;
                        Some(increment)
                    }
                    _ => None,
                }
            }
            None => None,
        };
        if let Some(increment) = stream_update {
            self.send_frame(&WindowUpdateFrame::new(frame.stream_id, increment).to_frame())?;
        }
        Ok(())
    }

    /// Gather CONTINUATION frames until END_HEADERS
    ///
    /// Nothing may interleave with a header block, whatever the read policy.
    fn collect_header_block(
        &mut self,
        stream_id: StreamId,
        first: Bytes,
        end_headers: bool,
    ) -> Result<Bytes> {
        if end_headers {
            return Ok(first);
        }

        let mut block = BytesMut::from(&first[..]);
        loop {
            match self.read_frame()? {
                FramePayload::Continuation(frame) if frame.stream_id == stream_id => {
                    block.extend_from_slice(&frame.header_block);
                    if frame.end_headers {
                        return Ok(block.freeze());
                    }
                }
                other => {
                    return Err(Error::Protocol(format!(
                        "header block on stream {} interrupted by {:?}",
                        stream_id, other
                    )));
                }
            }
        }
    }

    fn decode_header_block(&mut self, block: &[u8]) -> Result<Vec<(String, String)>> {
        let decoded: HeaderList = self.header_codec.decompress(block)?;
        Ok(decoded
            .into_iter()
            .map(|(name, value)| {
                (
                    String::from_utf8_lossy(&name).into_owned(),
                    String::from_utf8_lossy(&value).into_owned(),
                )
            })
            .collect())
    }

    fn unexpected(&self, frame_type: FrameType, stream_id: StreamId) -> Result<()> {
        match self.read_policy {
            ReadPolicy::Strict => Err(Error::UnexpectedFrame {
                frame_type: frame_type.name().to_string(),
                stream_id,
            }),
            ReadPolicy::Lenient => {
                warn!("Unexpected frame received: {} on stream {}", frame_type, stream_id);
                Ok(())
            }
        }
    }

    fn goaway_error(frame: GoawayFrame) -> Error {
        Error::GoAway {
            last_stream_id: frame.last_stream_id,
            code: frame.error_code,
            debug: frame.debug_data,
        }
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let encoded = FrameCodec::encode(frame)?;
        self.session.write_all(&encoded)?;
        Ok(())
    }
}

/// Outcome of waiting for flow-control credit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowWait {
    /// Credit is available again
    Open,
    /// The peer ended the stream while we were waiting
    PeerFinished,
}

/// Stream a HEADERS or DATA frame closes with END_STREAM
fn ends_stream(payload: &FramePayload) -> Option<StreamId> {
    match payload {
        FramePayload::Headers(frame) if frame.end_stream => Some(frame.stream_id),
        FramePayload::Data(frame) if frame.end_stream => Some(frame.stream_id),
        _ => None,
    }
}

fn parse_status(headers: &[(String, String)]) -> Result<u16> {
    let value = headers
        .iter()
        .find(|(name, _)| name == ":status")
        .map(|(_, value)| value)
        .ok_or_else(|| Error::InvalidStatus("missing :status".to_string()))?;
    value
        .parse()
        .map_err(|_| Error::InvalidStatus(format!("non-numeric :status {:?}", value)))
}

/// HTTP/2 response
#[derive(Debug, Clone)]
pub struct H2Response {
    /// Stream ID
    pub stream_id: StreamId,
    /// Status code
    pub status: u16,
    /// Headers in arrival order, `:status` included
    pub headers: Vec<(String, String)>,
    /// Trailing headers, if the peer sent any
    pub trailers: Vec<(String, String)>,
    /// Body
    pub body: Bytes,
}

impl H2Response {
    /// Get status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Get the first header value with this name (ASCII case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All headers in arrival order
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Get body as bytes
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Get body as string
    pub fn body_string(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| Error::Protocol(format!("Invalid UTF-8 in body: {}", e)))
    }
}

/// HTTP/2 client builder
pub struct H2ClientBuilder {
    settings: SettingsBuilder,
    read_policy: ReadPolicy,
    scheme: String,
    authority: Option<String>,
    flow_control: bool,
}

impl H2ClientBuilder {
    /// Create a new client builder
    ///
    /// Advertises no settings of its own (the initial SETTINGS frame is
    /// empty), reads leniently and enforces flow control.
    pub fn new() -> Self {
        H2ClientBuilder {
            settings: SettingsBuilder::new(),
            read_policy: ReadPolicy::default(),
            scheme: "https".to_string(),
            authority: None,
            flow_control: true,
        }
    }

    /// Set header table size
    pub fn header_table_size(mut self, size: u32) -> Self {
        self.settings = self.settings.header_table_size(size);
        self
    }

    /// Set enable push
    pub fn enable_push(mut self, enable: bool) -> Self {
        self.settings = self.settings.enable_push(enable);
        self
    }

    /// Set initial window size
    pub fn initial_window_size(mut self, size: u32) -> Self {
        self.settings = self.settings.initial_window_size(size);
        self
    }

    /// Set max frame size
    pub fn max_frame_size(mut self, size: u32) -> Self {
        self.settings = self.settings.max_frame_size(size);
        self
    }

    /// Set max concurrent streams
    pub fn max_concurrent_streams(mut self, max: u32) -> Self {
        self.settings = self.settings.max_concurrent_streams(max);
        self
    }

    /// Set max header list size
    pub fn max_header_list_size(mut self, size: u32) -> Self {
        self.settings = self.settings.max_header_list_size(size);
        self
    }

    /// Set how out-of-sequence frames are treated
    pub fn read_policy(mut self, policy: ReadPolicy) -> Self {
        self.read_policy = policy;
        self
    }

    /// Set the `:scheme` pseudo-header
    pub fn scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    /// Send `:authority` after `:scheme`
    pub fn authority(mut self, authority: &str) -> Self {
        self.authority = Some(authority.to_string());
        self
    }

    /// Enable or disable flow-control enforcement
    pub fn flow_control(mut self, enabled: bool) -> Self {
        self.flow_control = enabled;
        self
    }

    /// Build the client
    pub fn build<S: SessionOps>(self, session: S) -> Result<H2Client<S>> {
        self.build_with_codec(session, HpackCodec::new())
    }

    /// Build the client around a specific header codec
    pub fn build_with_codec<S: SessionOps, C: HeaderCodec>(
        self,
        session: S,
        header_codec: C,
    ) -> Result<H2Client<S, C>> {
        let local_settings = self.settings.build()?;

        Ok(H2Client {
            session: HttpSession::new(session),
            state: ConnectionState::Fresh,
            stream_ids: StreamIdAllocator::new(),
            // SETTINGS never changes the connection windows
            flow_control: FlowControl::connection(),
            exchange: None,
            header_codec,
            local_settings,
            remote_settings: Settings::default_settings(),
            settings_acked: false,
            pending: VecDeque::new(),
            read_policy: self.read_policy,
            scheme: self.scheme,
            authority: self.authority,
            enforce_flow_control: self.flow_control,
        })
    }
}

impl Default for H2ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
