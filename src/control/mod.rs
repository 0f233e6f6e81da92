//! Control channel: length-prefixed, framed request/response/notification
//! protocol used by the controller . Wire
//! framing follows `original_source/worker/src/Channel/ChannelSocket.cpp`
//! (a raw `u32` length prefix ahead of a schema-tagged body); the body
//! itself is `serde`+`serde_json` rather than FlatBuffers, recorded as an
//! Open Question decision in DESIGN.md.

pub mod channel;
pub mod dispatch;
pub mod protocol;

pub use channel::{ChannelReader, ChannelWriter};
pub use dispatch::Dispatcher;
pub use protocol::{Notification, Request, Response, ResponseBody};
