//! Event-source adapter: listener registration as an async stream.
//!
//! Anything that can register and remove listeners, like a widget
//! toolkit's element or the [`App`](crate::App) itself, implements
//! [`EventSource`].
//! [`listen`] bridges that callback interface into a cancellable
//! [`Stream`] of payloads: each callback invocation is forwarded through
//! an unbounded channel, and dropping the stream removes the listener
//! from the source.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifies one registered listener for targeted removal.
pub type ListenerId = Uuid;

/// A shared listener callback.
pub type EventCallback<P> = Arc<dyn Fn(P) + Send + Sync>;

/// Anything that can register and remove typed event listeners.
pub trait EventSource {
    /// Selects which events to observe (an event-kind enum, a name, ...).
    type Kind: Clone + Send + 'static;

    /// What listeners receive on each event.
    type Payload: Clone + Send + 'static;

    fn add_event_listener(
        &self,
        kind: Self::Kind,
        callback: EventCallback<Self::Payload>,
    ) -> ListenerId;

    fn remove_event_listener(&self, kind: Self::Kind, id: ListenerId);
}

/// Observe `kind` events from `source` as an asynchronous stream.
///
/// The subscription lives as long as the returned stream; dropping it
/// removes the underlying listener.
pub fn listen<S>(source: &S, kind: S::Kind) -> EventStream<S>
where
    S: EventSource + Clone,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let id = source.add_event_listener(
        kind.clone(),
        Arc::new(move |payload| {
            // The receiver may already be gone; the listener is removed
            // when the stream's guard drops.
            let _ = tx.send(payload);
        }),
    );
    EventStream {
        receiver: rx,
        _guard: ListenGuard {
            source: source.clone(),
            kind,
            id,
        },
    }
}

/// Stream of event payloads produced by [`listen`].
pub struct EventStream<S>
where
    S: EventSource + Clone,
{
    receiver: mpsc::UnboundedReceiver<S::Payload>,
    _guard: ListenGuard<S>,
}

struct ListenGuard<S>
where
    S: EventSource + Clone,
{
    source: S,
    kind: S::Kind,
    id: ListenerId,
}

impl<S> Drop for ListenGuard<S>
where
    S: EventSource + Clone,
{
    fn drop(&mut self) {
        self.source.remove_event_listener(self.kind.clone(), self.id);
    }
}

impl<S> Stream for EventStream<S>
where
    S: EventSource + Clone + Unpin,
    S::Kind: Unpin,
{
    type Item = S::Payload;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}
