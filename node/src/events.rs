// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use blocks::Tipset;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Observable lifecycle events, mirroring the `ready`/`tipset` events a
/// subscriber would attach to on the façade.
#[derive(Clone, Debug)]
pub enum Event {
    Ready,
    Tipset(Tipset),
}

/// Broadcasts [`Event`]s to any number of subscribers. A subscriber that
/// isn't listening when an event fires simply misses it, same as any
/// other fire-and-forget event emitter; callers needing the current
/// tipset on demand should call the engine directly rather than wait on
/// this channel.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: Event) {
        // No subscribers is a normal state (nobody has called
        // `subscribe` yet); the send error carries no information
        // worth acting on.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_emitted_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(Event::Ready);
        assert!(matches!(rx.recv().await.unwrap(), Event::Ready));
    }

    #[tokio::test]
    async fn emit_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.emit(Event::Ready);
    }
}
