//! Append-only event log for one book.
//!
//! Events are sequenced when an operation commits. Subscribers registered
//! as [`EventSink`]s see each batch in order; `drain` hands the pending
//! backlog to a poller.

use hookmatch_types::{BookEvent, MarketPair, SequencedEvent};

/// Receives committed events in sequence order.
pub trait EventSink: Send {
    fn on_event(&mut self, event: &SequencedEvent);
}

/// Collects every event it sees. Useful for read models and tests.
#[derive(Debug, Default)]
pub struct VecSink {
    pub events: Vec<SequencedEvent>,
}

impl EventSink for VecSink {
    fn on_event(&mut self, event: &SequencedEvent) {
        self.events.push(event.clone());
    }
}

/// Sequenced event log with pull (`drain`) and push (`EventSink`) delivery.
pub struct EventLog {
    market: MarketPair,
    next_sequence: u64,
    pending: Vec<SequencedEvent>,
    sinks: Vec<Box<dyn EventSink>>,
}

impl EventLog {
    #[must_use]
    pub fn new(market: MarketPair) -> Self {
        Self {
            market,
            next_sequence: 0,
            pending: Vec::new(),
            sinks: Vec::new(),
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Sequence and publish a committed batch.
    pub fn append_all(&mut self, events: Vec<BookEvent>) {
        for event in events {
            let sequenced = SequencedEvent {
                sequence: self.next_sequence,
                market: self.market.clone(),
                event,
            };
            self.next_sequence += 1;
            for sink in &mut self.sinks {
                sink.on_event(&sequenced);
            }
            self.pending.push(sequenced);
        }
    }

    /// Events not yet drained.
    #[must_use]
    pub fn pending(&self) -> &[SequencedEvent] {
        &self.pending
    }

    /// Take the pending backlog.
    pub fn drain(&mut self) -> Vec<SequencedEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Sequence number the next event will get.
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    #[must_use]
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("market", &self.market)
            .field("next_sequence", &self.next_sequence)
            .field("pending", &self.pending.len())
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use hookmatch_types::{OrderId, RemovalReason};

    use super::*;

    struct SharedSink(Arc<Mutex<Vec<u64>>>);

    impl EventSink for SharedSink {
        fn on_event(&mut self, event: &SequencedEvent) {
            self.0.lock().unwrap().push(event.sequence);
        }
    }

    fn removed(id: u64) -> BookEvent {
        BookEvent::OrderRemovedFromBook {
            order_id: OrderId(id),
            reason: RemovalReason::Cancelled,
        }
    }

    #[test]
    fn sequences_are_contiguous_across_batches() {
        let mut log = EventLog::new(MarketPair::new("BTC", "USDT"));
        log.append_all(vec![removed(1), removed(2)]);
        log.append_all(vec![removed(3)]);

        let seqs: Vec<u64> = log.pending().iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(log.next_sequence(), 3);
    }

    #[test]
    fn drain_empties_backlog_but_keeps_sequence() {
        let mut log = EventLog::new(MarketPair::new("BTC", "USDT"));
        log.append_all(vec![removed(1)]);
        let drained = log.drain();
        assert_eq!(drained.len(), 1);
        assert!(log.pending().is_empty());

        log.append_all(vec![removed(2)]);
        assert_eq!(log.pending()[0].sequence, 1);
    }

    #[test]
    fn sinks_see_every_event() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut log = EventLog::new(MarketPair::new("BTC", "USDT"));
        log.add_sink(Box::new(SharedSink(Arc::clone(&seen))));
        log.append_all(vec![removed(1), removed(2)]);
        log.drain();

        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
        assert_eq!(log.sink_count(), 1);
    }

    #[test]
    fn empty_batch_is_noop() {
        let mut log = EventLog::new(MarketPair::new("BTC", "USDT"));
        log.append_all(Vec::new());
        assert_eq!(log.next_sequence(), 0);
    }
}
