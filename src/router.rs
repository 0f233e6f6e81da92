//! Router: the shared media bus linking producers to consumers. Owns
//! Transports; keeps a weak producer-id -> consumer-ids index rather than
//! back-pointers, so a producer can be dropped without every bound
//! consumer holding a strong reference back to it.

use std::collections::{HashMap, HashSet};

use crate::consumer::Consumer;
use crate::error::RequestError;
use crate::observer::{ActiveSpeakerObserver, AudioLevelObserver};
use crate::producer::Producer;
use crate::transport::AnyTransport;
use crate::utils::Id;

/// Notifications the Router raises for a Consumer when its bound
/// Producer changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerLifecycleEvent {
    Paused,
    Resumed,
    Closed,
}

pub struct Router {
    pub id: Id,
    transports: HashMap<Id, AnyTransport>,
    producers: HashMap<Id, Producer>,
    consumers: HashMap<Id, Consumer>,
    /// producer id -> bound consumer ids (weak index).
    producer_consumers: HashMap<Id, HashSet<Id>>,
    /// Which transport owns each producer/consumer, for close cascades.
    producer_transport: HashMap<Id, Id>,
    consumer_transport: HashMap<Id, Id>,
    pub audio_level_observer: Option<AudioLevelObserver>,
    pub active_speaker_observer: Option<ActiveSpeakerObserver>,
    closed: bool,
}

impl Router {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            transports: HashMap::new(),
            producers: HashMap::new(),
            consumers: HashMap::new(),
            producer_consumers: HashMap::new(),
            producer_transport: HashMap::new(),
            consumer_transport: HashMap::new(),
            audio_level_observer: None,
            active_speaker_observer: None,
            closed: false,
        }
    }

    pub fn add_transport(&mut self, id: Id, transport: AnyTransport) {
        self.transports.insert(id, transport);
    }

    pub fn transport_mut(&mut self, id: &str) -> Option<&mut AnyTransport> {
        self.transports.get_mut(id)
    }

    /// Registers a new producer under `transport_id`, adding it to the
    /// id table and to the producer->consumer multimap.
    pub fn add_producer(&mut self, transport_id: Id, producer: Producer) -> Result<(), RequestError> {
        if !self.transports.contains_key(&transport_id) {
            return Err(RequestError::Error(format!("unknown transport id '{transport_id}'")));
        }
        if self.producers.contains_key(&producer.id) {
            return Err(RequestError::Error(format!("duplicate producer id '{}'", producer.id)));
        }
        self.producer_consumers.insert(producer.id.clone(), HashSet::new());
        self.producer_transport.insert(producer.id.clone(), transport_id);
        self.producers.insert(producer.id.clone(), producer);
        Ok(())
    }

    /// Binds a new consumer to its producer and returns the producer so
    /// the caller can replay its current state (streams and scores) onto
    /// the new consumer.
    pub fn add_consumer(&mut self, transport_id: Id, producer_id: &str, consumer: Consumer) -> Result<&Producer, RequestError> {
        if !self.transports.contains_key(&transport_id) {
            return Err(RequestError::Error(format!("unknown transport id '{transport_id}'")));
        }
        let bound = self
            .producer_consumers
            .get_mut(producer_id)
            .ok_or_else(|| RequestError::Error(format!("unknown producer id '{producer_id}'")))?;
        if self.consumers.contains_key(&consumer.id) {
            return Err(RequestError::Error(format!("duplicate consumer id '{}'", consumer.id)));
        }
        bound.insert(consumer.id.clone());
        self.consumer_transport.insert(consumer.id.clone(), transport_id);
        self.consumers.insert(consumer.id.clone(), consumer);
        Ok(&self.producers[producer_id])
    }

    pub fn producer(&self, id: &str) -> Option<&Producer> {
        self.producers.get(id)
    }

    pub fn producer_mut(&mut self, id: &str) -> Option<&mut Producer> {
        self.producers.get_mut(id)
    }

    pub fn consumer_mut(&mut self, id: &str) -> Option<&mut Consumer> {
        self.consumers.get_mut(id)
    }

    pub fn bound_consumers(&self, producer_id: &str) -> impl Iterator<Item = &str> {
        self.producer_consumers.get(producer_id).into_iter().flatten().map(|s| s.as_str())
    }

    /// Forwards one packet from a producer's stream to every bound
    /// consumer, synchronously. Returns the ids of consumers it forwarded
    /// to, for test observability.
    pub fn fan_out(&mut self, producer_id: &str, in_seq: u16, in_ts: u32, len: usize, now_ms: u64) -> Vec<(Id, u16, u32)> {
        let Some(consumer_ids) = self.producer_consumers.get(producer_id).cloned() else {
            return Vec::new();
        };
        let mut forwarded = Vec::new();
        for consumer_id in consumer_ids {
            if let Some(consumer) = self.consumers.get_mut(&consumer_id) {
                if consumer.closed_to_media() {
                    continue;
                }
                let (out_seq, out_ts) = consumer.forward(in_seq, in_ts, len, now_ms);
                forwarded.push((consumer_id, out_seq, out_ts));
            }
        }
        forwarded
    }

    /// Applies a producer lifecycle transition and notifies every bound
    /// consumer.
    pub fn propagate_producer_event(&mut self, producer_id: &str, event: ProducerLifecycleEvent) -> Vec<Id> {
        let bound: Vec<Id> = self.producer_consumers.get(producer_id).into_iter().flatten().cloned().collect();
        for consumer_id in &bound {
            if let Some(consumer) = self.consumers.get_mut(consumer_id) {
                match event {
                    ProducerLifecycleEvent::Paused => consumer.producer_pause(),
                    ProducerLifecycleEvent::Resumed => consumer.producer_resume(),
                    ProducerLifecycleEvent::Closed => consumer.producer_pause(),
                }
            }
        }
        bound
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::ConsumerKind;
    use crate::producer::{Encoding, MediaKind};
    use crate::transport::direct_transport::DirectTransport;

    fn router_with_direct_transport() -> Router {
        let mut router = Router::new("r1".to_string());
        router.add_transport("t1".to_string(), AnyTransport::Direct(DirectTransport::new("t1".to_string())));
        router
    }

    #[test]
    fn producer_must_reference_a_known_transport() {
        let mut router = Router::new("r1".to_string());
        let producer = Producer::new("p1".to_string(), MediaKind::Audio, "audio/opus".to_string(), 48_000, vec![]);
        assert!(router.add_producer("missing".to_string(), producer).is_err());
    }

    #[test]
    fn consumer_binds_to_its_producer_and_fan_out_reaches_it() {
        let mut router = router_with_direct_transport();
        let producer = Producer::new(
            "p1".to_string(),
            MediaKind::Audio,
            "audio/opus".to_string(),
            48_000,
            vec![Encoding { ssrc: 11_111_111, rtx_ssrc: None, rid: None }],
        );
        router.add_producer("t1".to_string(), producer).unwrap();
        let consumer = Consumer::new("c1".to_string(), ConsumerKind::Simple, "p1".to_string(), 22_222_222, 48_000, "audio/opus".to_string());
        router.add_consumer("t1".to_string(), "p1", consumer).unwrap();

        let forwarded = router.fan_out("p1", 1, 48_000, 160, 0);
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].0, "c1");
    }

    #[test]
    fn producer_pause_is_mirrored_onto_bound_consumers() {
        let mut router = router_with_direct_transport();
        let producer = Producer::new("p1".to_string(), MediaKind::Audio, "audio/opus".to_string(), 48_000, vec![]);
        router.add_producer("t1".to_string(), producer).unwrap();
        let consumer = Consumer::new("c1".to_string(), ConsumerKind::Simple, "p1".to_string(), 1, 48_000, "audio/opus".to_string());
        router.add_consumer("t1".to_string(), "p1", consumer).unwrap();

        router.propagate_producer_event("p1", ProducerLifecycleEvent::Paused);
        assert!(router.consumer_mut("c1").unwrap().closed_to_media());
    }
}
