//! Sentinel-framed wire protocol to the remote execution host.
//!
//! The stream carries raw payload bytes punctuated by two reserved control
//! bytes with no escaping:
//! - `0x00` terminates one complete response message.
//! - `0x01` flushes accumulated text as inline console output.
//!
//! Submodules:
//! - `codec`: [`Decoder`](tokio_util::codec::Decoder)/[`Encoder`](tokio_util::codec::Encoder)
//!   pair splitting the inbound stream into [`WireEvent`](codec::WireEvent)s
//!   and framing outbound scripts.

pub mod codec;
