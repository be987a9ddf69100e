//! Remote-host session handling.
//!
//! One session owns a duplex byte stream to the remote execution host and a
//! single background reader task. The foreground evaluator and the reader
//! meet in a single-slot handoff cell, keeping the protocol strictly
//! request/response.
//!
//! Submodules:
//! - `slot`: write-once response cell bridging reader and evaluator.
//! - `reader`: the background task decoding wire events.
//! - `connection`: the owning handle — connect, evaluate, close.

pub mod connection;
pub mod reader;
pub mod slot;

pub use connection::Connection;
