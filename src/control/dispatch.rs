//! Request handler registry .  Handlers are
//! registered by method name; the dispatcher guarantees exactly one
//! `Response` per accepted `Request`  and that
//! responses are emitted in arrival order //! request id order" for concurrent handling, but this worker resolves
//! each handler to completion before moving to the next one, which keeps
//! both orderings identical for a single-threaded event loop).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::control::protocol::{Request, Response};
use crate::error::RequestError;

type HandlerResult = Pin<Box<dyn Future<Output = Result<serde_json::Value, RequestError>> + Send>>;
type Handler = Box<dyn Fn(Request) -> HandlerResult + Send + Sync>;

#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<String, Handler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self { handlers: HashMap::new() }
    }

    pub fn register<F, Fut>(&mut self, method: &str, handler: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, RequestError>> + Send + 'static,
    {
        self.handlers.insert(method.to_string(), Box::new(move |req| Box::pin(handler(req))));
    }

    /// Dispatches one request and always returns a matching `Response`,
    /// even for an unregistered method.
    pub async fn dispatch(&self, request: Request) -> Response {
        let id = request.id;
        let Some(handler) = self.handlers.get(&request.method) else {
            return Response::from_result(id, Err(RequestError::Error(format!("unknown method '{}'", request.method))));
        };
        let result = handler(request).await;
        Response::from_result(id, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: &str) -> Request {
        Request { id: 1, method: method.to_string(), target: "".to_string(), data: serde_json::Value::Null }
    }

    #[tokio::test]
    async fn unregistered_method_still_produces_a_response() {
        let dispatcher = Dispatcher::new();
        let response = dispatcher.dispatch(request("worker.bogus")).await;
        assert_eq!(response.id, 1);
        assert!(matches!(response.body, crate::control::protocol::ResponseBody::Error(_)));
    }

    #[tokio::test]
    async fn registered_handler_is_invoked_and_its_id_preserved() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("worker.dump", |_req| async { Ok(serde_json::json!({ "pid": 1 })) });
        let response = dispatcher.dispatch(request("worker.dump")).await;
        assert_eq!(response.id, 1);
        assert!(matches!(response.body, crate::control::protocol::ResponseBody::Ok(_)));
    }

    #[tokio::test]
    async fn type_error_from_handler_is_surfaced_distinctly_from_error() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("router.create", |_req| async { Err(RequestError::TypeError("bad ip".to_string())) });
        let response = dispatcher.dispatch(request("router.create")).await;
        assert!(matches!(response.body, crate::control::protocol::ResponseBody::TypeError(_)));
    }
}
