//! HTTP/2 frame encoding and decoding
//!
//! This module provides low-level frame encoding/decoding: the 9-byte frame
//! header, raw frames, the per-type payload grammar, and splitting payloads
//! to fit a negotiated maximum frame size.

use super::error::{Error, RawErrorCode, Result};
use super::frames::*;
use super::stream::StreamId;
use crate::http::{HttpSession, SessionOps};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::{Read, Write};

/// HTTP/2 frame header size (9 bytes)
pub const FRAME_HEADER_SIZE: usize = 9;

/// Maximum frame payload size the length field can express (16MB - 1)
pub const MAX_FRAME_SIZE: usize = 0x00FF_FFFF;

const STREAM_ID_MASK: u32 = 0x7FFF_FFFF;

/// Frame codec for encoding/decoding HTTP/2 frames
pub struct FrameCodec;

impl FrameCodec {
    /// Encode a frame header
    pub fn encode_header(
        frame_type: FrameType,
        flags: FrameFlags,
        stream_id: StreamId,
        length: usize,
    ) -> Result<[u8; FRAME_HEADER_SIZE]> {
        if length > MAX_FRAME_SIZE {
            return Err(Error::FrameTooLarge(length));
        }

        let mut header = [0u8; FRAME_HEADER_SIZE];

        // Length (24 bits, big-endian)
        header[0] = ((length >> 16) & 0xFF) as u8;
        header[1] = ((length >> 8) & 0xFF) as u8;
        header[2] = (length & 0xFF) as u8;

        header[3] = frame_type.as_u8();
        header[4] = flags.as_u8();

        // Reserved bit is always sent as 0
        header[5..9].copy_from_slice(&(stream_id & STREAM_ID_MASK).to_be_bytes());

        Ok(header)
    }

    /// Decode a frame header from the first 9 bytes of `bytes`
    pub fn decode_header(bytes: &[u8]) -> Result<FrameHeader> {
        if bytes.len() < FRAME_HEADER_SIZE {
            return Err(Error::TruncatedFrame {
                needed: FRAME_HEADER_SIZE,
                available: bytes.len(),
            });
        }

        let length = ((bytes[0] as usize) << 16) | ((bytes[1] as usize) << 8) | (bytes[2] as usize);

        // Reserved bit is ignored on receipt
        let stream_id =
            u32::from_be_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]) & STREAM_ID_MASK;

        Ok(FrameHeader {
            length,
            frame_type: FrameType::from_u8(bytes[3]),
            flags: FrameFlags::from_u8(bytes[4]),
            stream_id,
        })
    }

    /// Serialize a frame: header followed by payload
    pub fn encode(frame: &Frame) -> Result<Bytes> {
        let header = Self::encode_header(
            frame.frame_type,
            frame.flags,
            frame.stream_id,
            frame.payload.len(),
        )?;

        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + frame.payload.len());
        buf.put_slice(&header);
        buf.put_slice(&frame.payload);
        Ok(buf.freeze())
    }

    /// Decode the frame at the start of `bytes`
    ///
    /// Bytes past the end of the first frame are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Frame> {
        let header = Self::decode_header(bytes)?;
        let end = FRAME_HEADER_SIZE + header.length;
        if bytes.len() < end {
            return Err(Error::TruncatedFrame {
                needed: end,
                available: bytes.len(),
            });
        }

        Ok(Frame::new(
            header.frame_type,
            header.flags,
            header.stream_id,
            Bytes::copy_from_slice(&bytes[FRAME_HEADER_SIZE..end]),
        ))
    }

    /// Decode a buffer holding any number of whole frames
    pub fn decode_all(mut bytes: &[u8]) -> Result<Vec<Frame>> {
        let mut frames = Vec::new();
        while !bytes.is_empty() {
            let frame = Self::decode(bytes)?;
            bytes = &bytes[FRAME_HEADER_SIZE + frame.payload.len()..];
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Interpret a raw frame according to its type
    ///
    /// Unknown types are returned untouched as `FramePayload::Unknown`.
    pub fn parse(frame: Frame) -> Result<FramePayload> {
        let Frame {
            frame_type,
            flags,
            stream_id,
            payload,
        } = frame;

        if frame_type.is_known() {
            let on_connection = stream_id == 0;
            let needs_connection = frame_type.is_connection_level();
            let any_stream = frame_type == FrameType::WindowUpdate;
            if !any_stream && on_connection != needs_connection {
                return Err(Error::Protocol(format!(
                    "{} frame not allowed on stream {}",
                    frame_type.name(),
                    stream_id
                )));
            }
        }

        let parsed = match frame_type {
            FrameType::Data => {
                let (data, padding) = Self::strip_padding(payload, flags)?;
                FramePayload::Data(DataFrame {
                    stream_id,
                    data,
                    end_stream: flags.is_end_stream(),
                    padding,
                })
            }
            FrameType::Headers => {
                let (mut block, padding) = Self::strip_padding(payload, flags)?;
                let priority = if flags.is_priority() {
                    Some(Self::read_priority(&mut block)?)
                } else {
                    None
                };
                FramePayload::Headers(HeadersFrame {
                    stream_id,
                    header_block: block,
                    end_stream: flags.is_end_stream(),
                    end_headers: flags.is_end_headers(),
                    priority,
                    padding,
                })
            }
            FrameType::Priority => {
                let mut payload = payload;
                Self::expect_len(FrameType::Priority, &payload, 5)?;
                FramePayload::Priority(PriorityFrame {
                    stream_id,
                    priority: Self::read_priority(&mut payload)?,
                })
            }
            FrameType::RstStream => {
                let mut payload = payload;
                Self::expect_len(FrameType::RstStream, &payload, 4)?;
                FramePayload::RstStream(RstStreamFrame {
                    stream_id,
                    error_code: RawErrorCode(payload.get_u32()),
                })
            }
            FrameType::Settings => FramePayload::Settings(Self::parse_settings(payload, flags)?),
            FrameType::PushPromise => {
                let (mut block, padding) = Self::strip_padding(payload, flags)?;
                if block.len() < 4 {
                    return Err(Error::FrameSize("PUSH_PROMISE shorter than 4 bytes".to_string()));
                }
                let promised_stream_id = block.get_u32() & STREAM_ID_MASK;
                FramePayload::PushPromise(PushPromiseFrame {
                    stream_id,
                    promised_stream_id,
                    header_block: block,
                    end_headers: flags.is_end_headers(),
                    padding,
                })
            }
            FrameType::Ping => {
                Self::expect_len(FrameType::Ping, &payload, 8)?;
                let mut data = [0u8; 8];
                data.copy_from_slice(&payload);
                FramePayload::Ping(PingFrame {
                    ack: flags.is_ack(),
                    data,
                })
            }
            FrameType::Goaway => {
                let mut payload = payload;
                if payload.len() < 8 {
                    return Err(Error::FrameSize("GOAWAY shorter than 8 bytes".to_string()));
                }
                let last_stream_id = payload.get_u32() & STREAM_ID_MASK;
                let error_code = RawErrorCode(payload.get_u32());
                FramePayload::Goaway(GoawayFrame {
                    last_stream_id,
                    error_code,
                    debug_data: payload,
                })
            }
            FrameType::WindowUpdate => {
                let mut payload = payload;
                Self::expect_len(FrameType::WindowUpdate, &payload, 4)?;
                FramePayload::WindowUpdate(WindowUpdateFrame {
                    stream_id,
                    size_increment: payload.get_u32() & STREAM_ID_MASK,
                })
            }
            FrameType::Continuation => FramePayload::Continuation(ContinuationFrame {
                stream_id,
                header_block: payload,
                end_headers: flags.is_end_headers(),
            }),
            FrameType::Unknown(_) => {
                FramePayload::Unknown(Frame::new(frame_type, flags, stream_id, payload))
            }
        };

        Ok(parsed)
    }

    fn expect_len(frame_type: FrameType, payload: &Bytes, len: usize) -> Result<()> {
        if payload.len() != len {
            return Err(Error::FrameSize(format!(
                "{} payload must be {} bytes, got {}",
                frame_type.name(),
                len,
                payload.len()
            )));
        }
        Ok(())
    }

    /// Remove the pad-length byte and trailing padding of a PADDED frame
    fn strip_padding(mut payload: Bytes, flags: FrameFlags) -> Result<(Bytes, Option<u8>)> {
        if !flags.is_padded() {
            return Ok((payload, None));
        }
        if payload.is_empty() {
            return Err(Error::FrameSize("PADDED frame without pad length".to_string()));
        }
        let pad_len = payload.get_u8();
        if pad_len as usize > payload.len() {
            return Err(Error::Protocol(format!(
                "padding of {} bytes exceeds remaining payload of {}",
                pad_len,
                payload.len()
            )));
        }
        payload.truncate(payload.len() - pad_len as usize);
        Ok((payload, Some(pad_len)))
    }

    fn read_priority(payload: &mut Bytes) -> Result<PrioritySpec> {
        if payload.len() < 5 {
            return Err(Error::FrameSize("priority block shorter than 5 bytes".to_string()));
        }
        let dep = payload.get_u32();
        let weight = payload.get_u8();
        Ok(PrioritySpec {
            stream_dependency: dep & STREAM_ID_MASK,
            exclusive: dep & !STREAM_ID_MASK != 0,
            weight,
        })
    }

    fn parse_settings(mut payload: Bytes, flags: FrameFlags) -> Result<SettingsFrame> {
        if flags.is_ack() {
            if !payload.is_empty() {
                return Err(Error::FrameSize("SETTINGS ACK with a payload".to_string()));
            }
            return Ok(SettingsFrame::ack());
        }
        if payload.len() % 6 != 0 {
            return Err(Error::FrameSize(format!(
                "SETTINGS payload of {} bytes is not a multiple of 6",
                payload.len()
            )));
        }

        let mut params = Vec::with_capacity(payload.len() / 6);
        while payload.has_remaining() {
            let id = payload.get_u16();
            let value = payload.get_u32();
            params.push((id, value));
        }
        Ok(SettingsFrame::new(params))
    }

    /// Split a payload into pieces of at most `max` bytes
    ///
    /// An empty payload yields no pieces.
    pub fn split_payload(payload: &Bytes, max: usize) -> Vec<Bytes> {
        let max = max.clamp(1, MAX_FRAME_SIZE);
        let mut pieces = Vec::with_capacity(payload.len().div_ceil(max));
        let mut start = 0;
        while start < payload.len() {
            let end = (start + max).min(payload.len());
            pieces.push(payload.slice(start..end));
            start = end;
        }
        pieces
    }

    /// Encode a DATA frame
    pub fn encode_data_frame(frame: &DataFrame) -> Result<Bytes> {
        Self::encode(&frame.to_frame())
    }

    /// Encode a HEADERS frame
    pub fn encode_headers_frame(frame: &HeadersFrame) -> Result<Bytes> {
        Self::encode(&frame.to_frame())
    }

    /// Encode a CONTINUATION frame
    pub fn encode_continuation_frame(frame: &ContinuationFrame) -> Result<Bytes> {
        Self::encode(&frame.to_frame())
    }

    /// Encode a SETTINGS frame
    pub fn encode_settings_frame(frame: &SettingsFrame) -> Result<Bytes> {
        Self::encode(&frame.to_frame())
    }

    /// Encode a PING frame
    pub fn encode_ping_frame(frame: &PingFrame) -> Result<Bytes> {
        Self::encode(&frame.to_frame())
    }

    /// Encode a GOAWAY frame
    pub fn encode_goaway_frame(frame: &GoawayFrame) -> Result<Bytes> {
        Self::encode(&frame.to_frame())
    }

    /// Encode a WINDOW_UPDATE frame
    pub fn encode_window_update_frame(frame: &WindowUpdateFrame) -> Result<Bytes> {
        Self::encode(&frame.to_frame())
    }

    /// Encode a RST_STREAM frame
    pub fn encode_rst_stream_frame(frame: &RstStreamFrame) -> Result<Bytes> {
        Self::encode(&frame.to_frame())
    }

    /// Encode a PRIORITY frame
    pub fn encode_priority_frame(frame: &PriorityFrame) -> Result<Bytes> {
        Self::encode(&frame.to_frame())
    }

    /// Encode a PUSH_PROMISE frame
    pub fn encode_push_promise_frame(frame: &PushPromiseFrame) -> Result<Bytes> {
        Self::encode(&frame.to_frame())
    }

    /// Write a frame to a writer (generic over any Write)
    pub fn write_frame<W: Write>(writer: &mut W, frame: &Frame) -> Result<()> {
        writer.write_all(&Self::encode(frame)?)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a frame from any reader
    ///
    /// Payloads longer than `max_payload` (the SETTINGS_MAX_FRAME_SIZE we
    /// advertised) are a frame size error.
    pub fn read_frame<R: Read>(reader: &mut R, max_payload: usize) -> Result<Frame> {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        reader.read_exact(&mut header)?;
        let header = Self::decode_header(&header)?;
        Self::check_length(&header, max_payload)?;

        let mut payload = vec![0u8; header.length];
        reader.read_exact(&mut payload)?;

        Ok(Frame::new(header.frame_type, header.flags, header.stream_id, Bytes::from(payload)))
    }

    /// Read a frame from an HttpSession
    pub fn read_frame_from_session<S: SessionOps>(
        session: &mut HttpSession<S>,
        max_payload: usize,
    ) -> Result<Frame> {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        session.read_exact(&mut header)?;
        let header = Self::decode_header(&header)?;
        Self::check_length(&header, max_payload)?;

        let mut payload = vec![0u8; header.length];
        if header.length > 0 {
            session.read_exact(&mut payload)?;
        }

        Ok(Frame::new(header.frame_type, header.flags, header.stream_id, Bytes::from(payload)))
    }

    fn check_length(header: &FrameHeader, max_payload: usize) -> Result<()> {
        if header.length > max_payload {
            return Err(Error::FrameSize(format!(
                "{} payload of {} bytes exceeds limit of {}",
                header.frame_type.name(),
                header.length,
                max_payload
            )));
        }
        Ok(())
    }
}

fn padded_payload(padding: Option<u8>, body: impl FnOnce(&mut BytesMut)) -> Bytes {
    let mut buf = BytesMut::new();
    if let Some(pad_len) = padding {
        buf.put_u8(pad_len);
    }
    body(&mut buf);
    if let Some(pad_len) = padding {
        buf.put_bytes(0, pad_len as usize);
    }
    buf.freeze()
}

fn put_priority(buf: &mut BytesMut, priority: &PrioritySpec) {
    let mut dep = priority.stream_dependency & STREAM_ID_MASK;
    if priority.exclusive {
        dep |= !STREAM_ID_MASK;
    }
    buf.put_u32(dep);
    buf.put_u8(priority.weight);
}

impl DataFrame {
    /// Raw frame carrying this DATA payload
    pub fn to_frame(&self) -> Frame {
        let flags = FrameFlags::empty()
            .with(FrameFlags::END_STREAM, self.end_stream)
            .with(FrameFlags::PADDED, self.padding.is_some());
        let payload = padded_payload(self.padding, |buf| buf.put_slice(&self.data));
        Frame::new(FrameType::Data, flags, self.stream_id, payload)
    }
}

impl HeadersFrame {
    /// Raw frame carrying this HEADERS payload
    pub fn to_frame(&self) -> Frame {
        let flags = FrameFlags::empty()
            .with(FrameFlags::END_STREAM, self.end_stream)
            .with(FrameFlags::END_HEADERS, self.end_headers)
            .with(FrameFlags::PRIORITY, self.priority.is_some())
            .with(FrameFlags::PADDED, self.padding.is_some());
        let payload = padded_payload(self.padding, |buf| {
            if let Some(priority) = &self.priority {
                put_priority(buf, priority);
            }
            buf.put_slice(&self.header_block);
        });
        Frame::new(FrameType::Headers, flags, self.stream_id, payload)
    }
}

impl ContinuationFrame {
    /// Raw frame carrying this CONTINUATION payload
    pub fn to_frame(&self) -> Frame {
        let flags = FrameFlags::empty().with(FrameFlags::END_HEADERS, self.end_headers);
        Frame::new(FrameType::Continuation, flags, self.stream_id, self.header_block.clone())
    }
}

impl PriorityFrame {
    /// Raw frame carrying this PRIORITY payload
    pub fn to_frame(&self) -> Frame {
        let mut buf = BytesMut::with_capacity(5);
        put_priority(&mut buf, &self.priority);
        Frame::new(FrameType::Priority, FrameFlags::empty(), self.stream_id, buf.freeze())
    }
}

impl RstStreamFrame {
    /// Raw frame carrying this RST_STREAM payload
    pub fn to_frame(&self) -> Frame {
        let payload = Bytes::copy_from_slice(&self.error_code.0.to_be_bytes());
        Frame::new(FrameType::RstStream, FrameFlags::empty(), self.stream_id, payload)
    }
}

impl SettingsFrame {
    /// Raw frame carrying these settings (stream 0)
    pub fn to_frame(&self) -> Frame {
        let flags = FrameFlags::empty().with(FrameFlags::ACK, self.ack);
        let mut buf = BytesMut::with_capacity(self.params.len() * 6);
        if !self.ack {
            for (id, value) in &self.params {
                buf.put_u16(*id);
                buf.put_u32(*value);
            }
        }
        Frame::new(FrameType::Settings, flags, 0, buf.freeze())
    }
}

impl PushPromiseFrame {
    /// Raw frame carrying this PUSH_PROMISE payload
    pub fn to_frame(&self) -> Frame {
        let flags = FrameFlags::empty()
            .with(FrameFlags::END_HEADERS, self.end_headers)
            .with(FrameFlags::PADDED, self.padding.is_some());
        let payload = padded_payload(self.padding, |buf| {
            buf.put_u32(self.promised_stream_id & STREAM_ID_MASK);
            buf.put_slice(&self.header_block);
        });
        Frame::new(FrameType::PushPromise, flags, self.stream_id, payload)
    }
}

impl PingFrame {
    /// Raw frame carrying this PING payload (stream 0)
    pub fn to_frame(&self) -> Frame {
        let flags = FrameFlags::empty().with(FrameFlags::ACK, self.ack);
        Frame::new(FrameType::Ping, flags, 0, Bytes::copy_from_slice(&self.data))
    }
}

impl GoawayFrame {
    /// Raw frame carrying this GOAWAY payload (stream 0)
    pub fn to_frame(&self) -> Frame {
        let mut buf = BytesMut::with_capacity(8 + self.debug_data.len());
        buf.put_u32(self.last_stream_id & STREAM_ID_MASK);
        buf.put_u32(self.error_code.0);
        buf.put_slice(&self.debug_data);
        Frame::new(FrameType::Goaway, FrameFlags::empty(), 0, buf.freeze())
    }
}

impl WindowUpdateFrame {
    /// Raw frame carrying this WINDOW_UPDATE payload
    pub fn to_frame(&self) -> Frame {
        let payload = Bytes::copy_from_slice(&(self.size_increment & STREAM_ID_MASK).to_be_bytes());
        Frame::new(FrameType::WindowUpdate, FrameFlags::empty(), self.stream_id, payload)
    }
}
