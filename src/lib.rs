//! h2engine - client-side HTTP/2 protocol engine
//!
//! This crate drives a single HTTP/2 connection over an already-established,
//! already-negotiated byte stream: connection preface, SETTINGS exchange,
//! request framing and response reassembly.

pub mod http;
