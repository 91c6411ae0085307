//! Header compression adapter
//!
//! The engine never compresses headers itself; it hands complete header
//! lists to a [`HeaderCodec`] and gets header blocks back. Compression
//! context is shared with the peer and cumulative, so a codec must see
//! blocks in exactly the order they cross the wire.

use super::error::{Error, Result};
use bytes::Bytes;

/// Ordered header list as raw `(name, value)` byte pairs
pub type HeaderList = Vec<(Vec<u8>, Vec<u8>)>;

/// Stateful header block codec for one connection
pub trait HeaderCodec {
    /// Compress an ordered header list into a header block
    fn compress(&mut self, headers: &[(&[u8], &[u8])]) -> Result<Bytes>;

    /// Decompress a complete header block
    fn decompress(&mut self, block: &[u8]) -> Result<HeaderList>;
}

/// HPACK codec backed by the `hpack` crate
pub struct HpackCodec {
    encoder: hpack::Encoder<'static>,
    decoder: hpack::Decoder<'static>,
}

impl HpackCodec {
    /// Fresh encoder and decoder with the default 4096-byte tables
    pub fn new() -> Self {
        HpackCodec {
            encoder: hpack::Encoder::new(),
            decoder: hpack::Decoder::new(),
        }
    }
}

impl Default for HpackCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderCodec for HpackCodec {
    fn compress(&mut self, headers: &[(&[u8], &[u8])]) -> Result<Bytes> {
        let mut block = Vec::new();
        self.encoder
            .encode_into(headers.iter().copied(), &mut block)
            .map_err(|e| Error::Compression(format!("HPACK encode error: {}", e)))?;
        Ok(Bytes::from(block))
    }

    fn decompress(&mut self, block: &[u8]) -> Result<HeaderList> {
        self.decoder
            .decode(block)
            .map_err(|e| Error::Compression(format!("HPACK decode error: {:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_decompress_preserves_order() {
        let mut ours = HpackCodec::new();
        let mut peer = hpack::Decoder::new();

        let headers: Vec<(&[u8], &[u8])> = vec![
            (&b":method"[..], &b"GET"[..]),
            (&b":path"[..], &b"/"[..]),
            (&b":scheme"[..], &b"https"[..]),
            (&b"x-b"[..], &b"2"[..]),
            (&b"x-a"[..], &b"1"[..]),
        ];
        let block = ours.compress(&headers).unwrap();
        let decoded = peer.decode(&block).unwrap();

        let expected: HeaderList = headers
            .iter()
            .map(|(n, v)| (n.to_vec(), v.to_vec()))
            .collect();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_context_persists_across_blocks() {
        let mut peer = hpack::Encoder::new();
        let mut ours = HpackCodec::new();

        let headers: Vec<(&[u8], &[u8])> = vec![
            (&b":status"[..], &b"200"[..]),
            (&b"x-trace"[..], &b"abcdef"[..]),
        ];
        let first = peer.encode(headers.iter().copied());
        let second = peer.encode(headers.iter().copied());

        assert_eq!(ours.decompress(&first).unwrap().len(), 2);
        assert_eq!(ours.decompress(&second).unwrap().len(), 2);
    }

    #[test]
    fn test_decompress_garbage_is_compression_error() {
        let mut ours = HpackCodec::new();
        // indexed header field with an index far past both tables
        let result = ours.decompress(&[0xff, 0xff, 0xff, 0x0f]);
        assert!(matches!(result, Err(Error::Compression(_))));
    }
}
