#![warn(rust_2018_idioms)]
#![allow(dead_code)]

// re-export the protocol crates the worker is built on, mirroring the
// teacher's convention of re-exporting its wire-format dependencies.
pub use dtls;
pub use rtcp;
pub use rtp;
pub use sctp;
pub use srtp;
pub use stun;

pub mod error;
pub mod utils;

pub mod control;
pub mod settings;
pub mod logger;
pub mod port_manager;

pub mod ice;
pub mod dtls_transport;
pub mod srtp_session;
pub mod rtp_ext;
pub mod rtp_stream;

pub mod data_channel;
pub mod producer;
pub mod consumer;
pub mod observer;
pub mod transport;
pub mod webrtc_server;
pub mod router;
pub mod worker;

pub use error::{FatalError, RequestError, Result};
