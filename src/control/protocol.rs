//! Message shapes carried over the control channel . Requests
//! and notifications both carry a `target` (the id of the Router,
//! Transport, Producer, ... the method is addressed to, or the empty
//! string for worker-level methods); responses echo the request id.

use serde::{Deserialize, Serialize};

use crate::error::RequestError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: u32,
    pub method: String,
    /// Id of the target entity (Router/Transport/Producer/...), empty for
    /// worker-level requests like `worker.dump`.
    pub target: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: u32,
    pub body: ResponseBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResponseBody {
    Ok(serde_json::Value),
    TypeError(String),
    Error(String),
}

impl Response {
    pub fn ok(id: u32, data: serde_json::Value) -> Self {
        Self { id, body: ResponseBody::Ok(data) }
    }

    pub fn from_result(id: u32, result: Result<serde_json::Value, RequestError>) -> Self {
        let body = match result {
            Ok(data) => ResponseBody::Ok(data),
            Err(RequestError::TypeError(msg)) => ResponseBody::TypeError(msg),
            Err(RequestError::Error(msg)) => ResponseBody::Error(msg),
        };
        Self { id, body }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub target: String,
    pub event: String,
    pub data: serde_json::Value,
}

/// Any frame the channel can carry in either direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Frame {
    Request(Request),
    Response(Response),
    Notification(Notification),
}
