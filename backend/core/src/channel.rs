use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::event::EventEnvelope;
use crate::traits::EventSink;

/// Default channel buffer size for event delivery.
const DEFAULT_BUFFER_SIZE: usize = 256;

/// Event sink that forwards envelopes into a bounded Tokio mpsc channel.
///
/// Delivery is best effort: when the buffer is full or the receiver is gone
/// the envelope is dropped with a warning rather than stalling the run.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<EventEnvelope>,
}

impl ChannelSink {
    /// Create a sink and the stream a persistence/telemetry consumer reads from.
    pub fn new() -> (Self, ReceiverStream<EventEnvelope>) {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer: usize) -> (Self, ReceiverStream<EventEnvelope>) {
        let (tx, rx) = mpsc::channel(buffer);
        debug!(buffer_size = buffer, "Event channel initialized");
        (Self { tx }, ReceiverStream::new(rx))
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, envelope: &EventEnvelope) {
        match self.tx.try_send(envelope.clone()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(env)) => {
                warn!(event = %env.event, run_id = %env.run_id, "Event channel full; dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(env)) => {
                debug!(event = %env.event, "Event channel closed; dropping event");
            }
        }
    }
}
