//! HTTP/2 Performance Benchmarks
//!
//! This benchmark suite measures:
//! - Frame header and whole-frame encoding/decoding
//! - Payload parsing into typed frames
//! - Request framing (header compression, DATA splitting)
//! - Settings application
//! - Flow control window management
//!
//! Run with: cargo bench --bench h2_performance

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use h2engine::http::h2::{
    codec::FrameCodec,
    flow_control::FlowControlWindow,
    frames::{DataFrame, FrameFlags, FrameType, HeadersFrame, PrioritySpec, SettingsFrame},
    header_codec::{HeaderCodec, HpackCodec},
    settings::Settings,
    H2Client, DEFAULT_MAX_FRAME_SIZE,
};
use h2engine::http::{PollEvents, SessionOps};
use std::time::Duration;

// ========== Frame Encoding/Decoding Benchmarks ==========

fn bench_frame_header(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_header");

    group.bench_function("encode_data_header", |b| {
        b.iter(|| {
            let header = FrameCodec::encode_header(
                black_box(FrameType::Data),
                black_box(FrameFlags::from_u8(0x01)),
                black_box(1),
                black_box(1024),
            );
            black_box(header)
        });
    });

    let encoded = FrameCodec::encode_header(FrameType::Headers, FrameFlags::from_u8(0x05), 3, 4096).unwrap();
    group.bench_function("decode_headers_header", |b| {
        b.iter(|| black_box(FrameCodec::decode_header(black_box(&encoded))));
    });

    group.finish();
}

fn bench_frame_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("data_frame");

    for size in [16usize, 1024, 16384].iter() {
        let frame = DataFrame::new(1, Bytes::from(vec![0xAB; *size]), true).to_frame();
        let encoded = FrameCodec::encode(&frame).unwrap();
        group.throughput(Throughput::Bytes(*size as u64));

        group.bench_with_input(BenchmarkId::new("encode", size), &frame, |b, frame| {
            b.iter(|| black_box(FrameCodec::encode(black_box(frame))));
        });
        group.bench_with_input(BenchmarkId::new("decode_parse", size), &encoded, |b, encoded| {
            b.iter(|| {
                let frame = FrameCodec::decode(black_box(encoded)).unwrap();
                black_box(FrameCodec::parse(frame))
            });
        });
    }

    group.finish();
}

fn bench_parse_headers(c: &mut Criterion) {
    let frame = HeadersFrame::new(1, Bytes::from(vec![0x82; 64]), false, true)
        .with_priority(PrioritySpec::new(0, false, 16))
        .with_padding(8)
        .to_frame();

    c.bench_function("parse_padded_priority_headers", |b| {
        b.iter(|| black_box(FrameCodec::parse(black_box(frame.clone()))));
    });
}

// ========== Header Compression Benchmarks ==========

fn bench_header_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("header_codec");
    let headers: Vec<(&[u8], &[u8])> = vec![
        (&b":method"[..], &b"GET"[..]),
        (&b":path"[..], &b"/api/v1/resources?page=2"[..]),
        (&b":scheme"[..], &b"https"[..]),
        (&b":authority"[..], &b"example.com"[..]),
        (&b"accept"[..], &b"application/json"[..]),
        (&b"user-agent"[..], &b"h2engine-bench"[..]),
    ];

    group.bench_function("compress_request", |b| {
        let mut codec = HpackCodec::new();
        b.iter(|| black_box(codec.compress(black_box(&headers))));
    });

    group.bench_function("compress_decompress", |b| {
        b.iter(|| {
            let mut ours = HpackCodec::new();
            let mut theirs = HpackCodec::new();
            let block = ours.compress(&headers).unwrap();
            black_box(theirs.decompress(&block))
        });
    });

    group.finish();
}

// ========== Request Framing Benchmarks ==========

/// Session that replays a peer handshake and discards every write
struct Sink {
    input: std::io::Cursor<Vec<u8>>,
}

impl Sink {
    fn handshake() -> Self {
        let mut input = Vec::new();
        input.extend_from_slice(&FrameCodec::encode(&SettingsFrame::new(vec![]).to_frame()).unwrap());
        input.extend_from_slice(&FrameCodec::encode(&SettingsFrame::ack().to_frame()).unwrap());
        Sink {
            input: std::io::Cursor::new(input),
        }
    }
}

impl SessionOps for Sink {
    fn poll(&self, _events: PollEvents, _timeout: Option<Duration>) -> h2engine::http::Result<bool> {
        Ok(true)
    }

    fn read(&mut self, buf: &mut [u8]) -> h2engine::http::Result<usize> {
        Ok(std::io::Read::read(&mut self.input, buf)?)
    }

    fn write(&mut self, buf: &[u8]) -> h2engine::http::Result<usize> {
        Ok(buf.len())
    }

    fn close(&mut self) -> h2engine::http::Result<()> {
        Ok(())
    }
}

fn bench_split_payload(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_payload");

    for size in [16384usize, 1024 * 1024].iter() {
        let body = Bytes::from(vec![0u8; *size]);
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &body, |b, body| {
            b.iter(|| black_box(FrameCodec::split_payload(body, DEFAULT_MAX_FRAME_SIZE as usize)));
        });
    }

    group.finish();
}

fn bench_build_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_request");
    let mut client = H2Client::new(Sink::handshake()).unwrap();
    client.send_connection_preface().unwrap();

    group.bench_function("get", |b| {
        b.iter(|| black_box(client.build_request("GET", "/", &[("accept", "*/*")], Bytes::new())));
    });

    let body = Bytes::from(vec![0u8; 64 * 1024]);
    group.throughput(Throughput::Bytes(body.len() as u64));
    group.bench_function("post_64k", |b| {
        b.iter(|| black_box(client.build_request("POST", "/upload", &[], body.clone())));
    });

    group.finish();
}

// ========== Settings / Flow Control Benchmarks ==========

fn bench_settings(c: &mut Criterion) {
    let params = vec![(0x1, 8192), (0x3, 100), (0x4, 1 << 20), (0x5, 32768), (0xf0, 1)];
    let frame = SettingsFrame::new(params.clone()).to_frame();

    c.bench_function("settings_validate_apply", |b| {
        b.iter(|| {
            let mut settings = Settings::default_settings();
            Settings::validate_params(black_box(&params)).unwrap();
            black_box(settings.apply(&params))
        });
    });

    c.bench_function("settings_encode", |b| {
        b.iter(|| black_box(FrameCodec::encode(black_box(&frame))));
    });
}

fn bench_flow_control(c: &mut Criterion) {
    c.bench_function("window_consume_increase", |b| {
        let mut window = FlowControlWindow::new();
        b.iter(|| {
            let sent = window.consume(black_box(1024));
            window.increase(sent as u32).unwrap();
            black_box(window.size())
        });
    });
}

criterion_group!(
    benches,
    bench_frame_header,
    bench_frame_roundtrip,
    bench_parse_headers,
    bench_header_codec,
    bench_split_payload,
    bench_build_request,
    bench_settings,
    bench_flow_control
);
criterion_main!(benches);
