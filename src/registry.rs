//! Explicit gauge factory and host-message forwarding.
//!
//! The browser version registers a global custom-element tag; here the host
//! creates instances through an explicit registry instead. The registry
//! announces constructions to an optional event sink and routes topic-keyed
//! host messages to every live instance.

use std::sync::mpsc::Sender;

use crate::config::GaugeConfig;
use crate::Gauge;

/// Topic keyword that routes a host message to the gauges.
pub const FORWARD_KEYWORD: &str = "gauge";

/// Handle to a gauge owned by a [`GaugeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GaugeId(u64);

/// Notification emitted by the registry, no payload beyond the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeEvent {
    /// A gauge instance was constructed.
    Created(GaugeId),
}

/// Whether a message topic should be forwarded to the gauges.
pub fn topic_matches(topic: &str) -> bool {
    topic.contains(FORWARD_KEYWORD)
}

#[derive(Default)]
pub struct GaugeRegistry {
    gauges: Vec<(GaugeId, Gauge)>,
    next_id: u64,
    events: Option<Sender<GaugeEvent>>,
}

impl GaugeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route construction notifications to `sink`.
    pub fn set_event_sink(&mut self, sink: Sender<GaugeEvent>) {
        self.events = Some(sink);
    }

    /// Construct a gauge and announce it once.
    pub fn create(&mut self, config: GaugeConfig) -> GaugeId {
        let id = GaugeId(self.next_id);
        self.next_id += 1;
        self.gauges.push((id, Gauge::new(config)));
        if let Some(events) = &self.events {
            // A closed sink only means nobody is listening anymore.
            let _ = events.send(GaugeEvent::Created(id));
        }
        id
    }

    pub fn get(&self, id: GaugeId) -> Option<&Gauge> {
        self.gauges.iter().find(|(gid, _)| *gid == id).map(|(_, g)| g)
    }

    pub fn get_mut(&mut self, id: GaugeId) -> Option<&mut Gauge> {
        self.gauges
            .iter_mut()
            .find(|(gid, _)| *gid == id)
            .map(|(_, g)| g)
    }

    /// Detach and drop a gauge.
    pub fn remove(&mut self, id: GaugeId) -> Option<Gauge> {
        let pos = self.gauges.iter().position(|(gid, _)| *gid == id)?;
        let (_, mut gauge) = self.gauges.remove(pos);
        gauge.detach();
        Some(gauge)
    }

    pub fn len(&self) -> usize {
        self.gauges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
    }

    /// Forward a host message: when the topic carries the keyword, push the
    /// value to every live instance. Returns how many gauges were updated.
    pub fn forward(&mut self, topic: &str, value: f64) -> usize {
        if !topic_matches(topic) {
            log::debug!("topic {topic:?} carries no gauge keyword, not forwarded");
            return 0;
        }
        for (_, gauge) in &mut self.gauges {
            gauge.update(value);
        }
        self.gauges.len()
    }
}
