//! Outbound marketplace events published over ZeroMQ.

use std::sync::Mutex;

use thiserror::Error;

use crate::models::zmq::DentalEvent;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("zmq error: {0}")]
    Zmq(#[from] zmq::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("publisher socket poisoned")]
    Poisoned,
}

/// Sink for [`DentalEvent`]s.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &DentalEvent) -> Result<(), EventError>;
}

/// PUB socket bound at startup; subscribers connect to it.
pub struct ZmqEventPublisher {
    socket: Mutex<zmq::Socket>,
    // Keeps the context alive for as long as the socket.
    _context: zmq::Context,
}

impl ZmqEventPublisher {
    pub fn bind(endpoint: &str) -> Result<Self, EventError> {
        let context = zmq::Context::new();
        let socket = context.socket(zmq::PUB)?;
        socket.bind(endpoint)?;
        log::info!("Publishing marketplace events on {endpoint}");
        Ok(Self {
            socket: Mutex::new(socket),
            _context: context,
        })
    }
}

impl EventPublisher for ZmqEventPublisher {
    fn publish(&self, event: &DentalEvent) -> Result<(), EventError> {
        let payload = serde_json::to_vec(event)?;
        let socket = self.socket.lock().map_err(|_| EventError::Poisoned)?;
        socket.send(payload, 0)?;
        Ok(())
    }
}

/// Publisher used when no endpoint is configured.
#[derive(Default)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, event: &DentalEvent) -> Result<(), EventError> {
        log::debug!("Dropping event {event:?}: no publisher configured");
        Ok(())
    }
}

/// Publishes `event`, logging failures instead of propagating them.
pub fn publish_quietly<P>(publisher: &P, event: DentalEvent)
where
    P: EventPublisher + ?Sized,
{
    if let Err(err) = publisher.publish(&event) {
        log::error!("Failed to publish {event:?}: {err}");
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    /// Collects published events for assertions.
    #[derive(Default)]
    pub struct RecordingPublisher {
        pub events: Mutex<Vec<DentalEvent>>,
    }

    impl RecordingPublisher {
        pub fn published(&self) -> Vec<DentalEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl EventPublisher for RecordingPublisher {
        fn publish(&self, event: &DentalEvent) -> Result<(), EventError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }
}
