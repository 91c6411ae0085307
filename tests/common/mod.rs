//! Scripted peer for driving an `H2Client` without a network

#![allow(dead_code)]

use bytes::Bytes;
use h2engine::http::h2::frames::*;
use h2engine::http::h2::{FrameCodec, CONNECTION_PREFACE};
use h2engine::http::{PollEvents, Result, SessionOps};
use std::io::{Cursor, Read};
use std::time::Duration;

/// Session that replays canned server bytes and records client output
pub struct ScriptedSession {
    input: Cursor<Vec<u8>>,
    pub output: Vec<u8>,
    pub alpn: Option<Vec<u8>>,
}

impl SessionOps for ScriptedSession {
    fn poll(&self, _events: PollEvents, _timeout: Option<Duration>) -> Result<bool> {
        Ok(true)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.input.read(buf)?)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn alpn_protocol(&self) -> Option<Vec<u8>> {
        self.alpn.clone()
    }
}

/// Builds the server side of a conversation frame by frame
pub struct Peer {
    encoder: hpack::Encoder<'static>,
    raw: Vec<u8>,
}

impl Peer {
    pub fn new() -> Self {
        Peer {
            encoder: hpack::Encoder::new(),
            raw: Vec::new(),
        }
    }

    /// Default handshake: empty SETTINGS followed by an ACK of ours
    pub fn handshake() -> Self {
        Peer::new().settings(&[]).settings_ack()
    }

    pub fn frame(mut self, frame: Frame) -> Self {
        let encoded = FrameCodec::encode(&frame).unwrap();
        self.raw.extend_from_slice(&encoded);
        self
    }

    pub fn settings(self, params: &[(u16, u32)]) -> Self {
        self.frame(SettingsFrame::new(params.to_vec()).to_frame())
    }

    pub fn settings_ack(self) -> Self {
        self.frame(SettingsFrame::ack().to_frame())
    }

    pub fn header_block(&mut self, headers: &[(&str, &str)]) -> Bytes {
        let list: Vec<(&[u8], &[u8])> = headers.iter().map(|(n, v)| (n.as_bytes(), v.as_bytes())).collect();
        Bytes::from(self.encoder.encode(list))
    }

    pub fn headers(mut self, stream_id: u32, headers: &[(&str, &str)], end_stream: bool) -> Self {
        let block = self.header_block(headers);
        self.frame(HeadersFrame::new(stream_id, block, end_stream, true).to_frame())
    }

    pub fn data(self, stream_id: u32, data: &[u8], end_stream: bool) -> Self {
        self.frame(DataFrame::new(stream_id, Bytes::copy_from_slice(data), end_stream).to_frame())
    }

    pub fn window_update(self, stream_id: u32, increment: u32) -> Self {
        self.frame(WindowUpdateFrame::new(stream_id, increment).to_frame())
    }

    /// Bytes that bypass the frame codec
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.raw.extend_from_slice(bytes);
        self
    }

    pub fn into_session(self) -> ScriptedSession {
        ScriptedSession {
            input: Cursor::new(self.raw),
            output: Vec::new(),
            alpn: None,
        }
    }
}

/// Split what the client wrote into its preface and frames
pub fn written_frames(output: &[u8]) -> Vec<Frame> {
    assert!(output.starts_with(CONNECTION_PREFACE), "client output must start with the preface");
    FrameCodec::decode_all(&output[CONNECTION_PREFACE.len()..]).unwrap()
}

/// Frames of one type, in write order
pub fn frames_of(frames: &[Frame], frame_type: FrameType) -> Vec<Frame> {
    frames.iter().filter(|f| f.frame_type == frame_type).cloned().collect()
}
