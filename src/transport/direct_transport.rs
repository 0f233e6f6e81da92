//! DirectTransport: in-process transport with no socket at all.
//! Used by controllers that want to inject/consume RTP or datagrams
//! directly from the same process instead of over the network; packets
//! still flow through the same Producer/Consumer/Router machinery.

use crate::transport::{Transport, TransportCore};
use crate::utils::Id;

pub struct DirectTransport {
    core: TransportCore,
}

impl DirectTransport {
    pub fn new(id: Id) -> Self {
        Self { core: TransportCore::new(id) }
    }
}

impl Transport for DirectTransport {
    fn core(&self) -> &TransportCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TransportCore {
        &mut self.core
    }
}
