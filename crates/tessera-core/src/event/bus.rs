// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Manages a generic, thread-safe outbound event channel.
///
/// The bus is generic over the event type `T` so the core stays decoupled from
/// whatever a consumer wants to listen to. The channel is unbounded: a slow
/// consumer only grows the queue, it never blocks the drain that publishes.
#[derive(Debug)]
pub struct EventBus<T: Clone + Send + Sync + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> EventBus<T> {
    /// Creates a new EventBus with an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        log::debug!("EventBus initialized.");
        Self { sender, receiver }
    }

    /// Sends an event. The bus owns a receiver, so sending cannot fail while
    /// the bus is alive; a failure is logged rather than propagated.
    pub fn publish(&self, event: T) {
        if let Err(e) = self.sender.send(event) {
            log::error!("Failed to send event: {e}. Receiver likely disconnected.");
        }
    }

    /// Sends a batch of events in order.
    pub fn publish_all(&self, events: impl IntoIterator<Item = T>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Returns a clone of the sender end of the channel.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a new receiver handle. Receivers compete for events: each
    /// event is delivered to exactly one of them.
    pub fn subscribe(&self) -> flume::Receiver<T> {
        self.receiver.clone()
    }

    /// Removes and returns every event currently queued.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flume::TryRecvError;
    use std::{thread, time::Duration};

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Built(u32),
        Retired(u32),
    }

    #[test]
    fn publish_then_drain_preserves_order() {
        let bus = EventBus::<TestEvent>::new();
        bus.publish_all([TestEvent::Built(1), TestEvent::Retired(1), TestEvent::Built(2)]);

        assert_eq!(
            bus.drain(),
            vec![TestEvent::Built(1), TestEvent::Retired(1), TestEvent::Built(2)]
        );
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn subscriber_receives_published_events() {
        let bus = EventBus::<TestEvent>::new();
        let rx = bus.subscribe();
        bus.publish(TestEvent::Built(7));

        assert_eq!(rx.try_recv(), Ok(TestEvent::Built(7)));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn send_from_thread() {
        let bus = EventBus::<TestEvent>::new();
        let sender = bus.sender();
        let rx = bus.subscribe();

        let handle = thread::spawn(move || {
            sender.send(TestEvent::Retired(3)).expect("Send from thread failed");
        });

        match rx.recv_timeout(Duration::from_secs(1)) {
            Ok(event) => assert_eq!(event, TestEvent::Retired(3)),
            Err(e) => panic!("Failed to receive event from thread: {e:?}"),
        }
        handle.join().expect("Thread join failed");
    }
}
