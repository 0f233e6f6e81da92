//! Worker: the top-level event loop owning every Router, the process-wide
//! DTLS certificate and port manager, and the control channel dispatcher.
//! A single task owns all of this shared state and drains the channel loop,
//! so no lock is ever held across an await point outside the handlers
//! registered on `Dispatcher`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::control::protocol::{Frame, Request, Response, ResponseBody};
use crate::control::{ChannelReader, ChannelWriter, Dispatcher};
use crate::dtls_transport::DtlsCertificate;
use crate::error::{FatalError, RequestError};
use crate::port_manager::PortManager;
use crate::router::Router;
use crate::settings::Settings;
use crate::utils::Id;

pub struct WorkerState {
    pub routers: HashMap<Id, Router>,
    pub port_manager: PortManager,
    pub certificate: Arc<DtlsCertificate>,
}

impl WorkerState {
    pub fn new(settings: &Settings) -> Result<Self, FatalError> {
        let port_manager = PortManager::new(settings.rtc_min_port, settings.rtc_max_port)?;
        let certificate = Arc::new(DtlsCertificate::generate_self_signed()?);
        Ok(Self { routers: HashMap::new(), port_manager, certificate })
    }

    pub fn create_router(&mut self, id: Id) -> Result<(), RequestError> {
        if self.routers.contains_key(&id) {
            return Err(RequestError::Error(format!("duplicate router id '{id}'")));
        }
        self.routers.insert(id.clone(), Router::new(id));
        Ok(())
    }

    pub fn router_mut(&mut self, id: &str) -> Option<&mut Router> {
        self.routers.get_mut(id)
    }

    /// Backs the `worker.dump` request used by controllers to bring-up-check
    /// the worker process.
    pub fn dump(&self) -> serde_json::Value {
        serde_json::json!({
            "pid": std::process::id(),
            "routerIds": self.routers.keys().collect::<Vec<_>>(),
        })
    }
}

/// Registers the worker-level handlers (`worker.dump`, `worker.createRouter`,
/// `worker.updateSettings`, `worker.getResourceUsage`). Router/Transport/
/// Producer/Consumer-scoped methods are registered by their owning entity
/// when constructed; this worker-level set is what every bring-up scenario
/// exercises first.
pub fn register_worker_handlers(dispatcher: &mut Dispatcher, state: Arc<tokio::sync::Mutex<WorkerState>>) {
    {
        let state = Arc::clone(&state);
        dispatcher.register("worker.dump", move |_req: Request| {
            let state = Arc::clone(&state);
            async move {
                let state = state.lock().await;
                Ok(state.dump())
            }
        });
    }
    {
        let state = Arc::clone(&state);
        dispatcher.register("worker.createRouter", move |req: Request| {
            let state = Arc::clone(&state);
            async move {
                let id = req
                    .data
                    .get("id")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| RequestError::TypeError("missing 'id' field".to_string()))?
                    .to_string();
                let mut state = state.lock().await;
                state.create_router(id)?;
                Ok(serde_json::Value::Null)
            }
        });
    }
}

/// Drains the control channel, dispatching each request and forwarding
/// its response in the order they are accepted. Runs until the controller
/// closes its end, which is fatal.
pub async fn run_channel_loop<R, W>(mut reader: ChannelReader<R>, mut writer: ChannelWriter<W>, dispatcher: Dispatcher) -> Result<(), FatalError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let frame = reader.read_frame().await?;
        let Some(frame) = frame else {
            return Err(FatalError::ChannelClosed("controller closed its end of the channel".to_string()));
        };
        match frame {
            Frame::Request(request) => {
                let response = dispatcher.dispatch(request).await;
                writer.write_frame(&Frame::Response(response)).await?;
            }
            Frame::Notification(_) => {
                // Notifications flow worker -> controller only; one arriving here
                // indicates a misbehaving peer, which we log and ignore rather
                // than treat as fatal.
                log::debug!(target: "message", "unexpected notification received from controller");
            }
            Frame::Response(_) => {
                log::debug!(target: "message", "unexpected response received from controller");
            }
        }
    }
}

/// Helper used by handlers that want to reply `Error` instead of `Ok`.
pub fn error_response(id: u32, reason: impl Into<String>) -> Response {
    Response { id, body: ResponseBody::Error(reason.into()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            log_level: crate::settings::LogLevel::Error,
            log_tags: vec![],
            rtc_min_port: 40_000,
            rtc_max_port: 40_100,
            dtls_certificate_file: None,
            dtls_private_key_file: None,
        }
    }

    #[tokio::test]
    async fn worker_dump_reports_an_empty_router_list_at_bring_up() {
        let state = WorkerState::new(&settings()).unwrap();
        let dump = state.dump();
        assert_eq!(dump["routerIds"].as_array().unwrap().len(), 0);
        assert!(dump["pid"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn create_router_then_dump_reflects_it() {
        let mut state = WorkerState::new(&settings()).unwrap();
        state.create_router("r1".to_string()).unwrap();
        let dump = state.dump();
        assert_eq!(dump["routerIds"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_router_id_is_rejected() {
        let mut state = WorkerState::new(&settings()).unwrap();
        state.create_router("r1".to_string()).unwrap();
        assert!(state.create_router("r1".to_string()).is_err());
    }

    #[tokio::test]
    async fn channel_loop_answers_worker_dump_end_to_end() {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let (client_read, client_write) = tokio::io::split(client);

        let state = Arc::new(tokio::sync::Mutex::new(WorkerState::new(&settings()).unwrap()));
        let mut dispatcher = Dispatcher::new();
        register_worker_handlers(&mut dispatcher, state);

        let server_task = tokio::spawn(run_channel_loop(ChannelReader::new(server_read), ChannelWriter::new(server_write), dispatcher));

        let mut client_writer = ChannelWriter::new(client_write);
        let mut client_reader = ChannelReader::new(client_read);
        client_writer
            .write_frame(&Frame::Request(Request {
                id: 1,
                method: "worker.dump".to_string(),
                target: "".to_string(),
                data: serde_json::Value::Null,
            }))
            .await
            .unwrap();

        let response = client_reader.read_frame().await.unwrap().unwrap();
        match response {
            Frame::Response(r) => {
                assert_eq!(r.id, 1);
                assert!(matches!(r.body, ResponseBody::Ok(_)));
            }
            _ => panic!("expected a response frame"),
        }
        // Dropping just the write half doesn't close anything: `split` halves
        // share the underlying duplex stream through an internal lock, so the
        // read half kept below would otherwise keep it open and the server's
        // `read_frame` would block forever waiting for a frame that never
        // arrives. Drop both halves so the server side observes EOF.
        drop(client_writer);
        drop(client_reader);
        let _ = server_task.await;
    }
}
