//! Non-blocking change fan-out
//!
//! Each subscriber owns a bounded queue keyed by instrument. A second change
//! for an instrument that is already queued merges into the queued entry; a
//! change for a new instrument on a full queue evicts the oldest entry. The
//! publishing side only ever takes short uncontended locks, so a slow or
//! abandoned subscriber can never stall ingestion.

use crate::events::BookChange;
use depth_types::InstrumentKey;
use futures::task::AtomicWaker;
use futures::Stream;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::debug;

#[derive(Debug, Default)]
struct Queue {
    order: VecDeque<InstrumentKey>,
    pending: HashMap<InstrumentKey, BookChange>,
}

#[derive(Debug)]
struct Slot {
    queue: Mutex<Queue>,
    capacity: usize,
    waker: AtomicWaker,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl Slot {
    fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(Queue::default()),
            capacity,
            waker: AtomicWaker::new(),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Queue a change, returning the evicted instrument if the queue was full
    fn push(&self, change: BookChange) -> Option<InstrumentKey> {
        let evicted = {
            let mut guard = self.queue.lock();
            let queue = &mut *guard;

            if let Some(queued) = queue.pending.get_mut(&change.key) {
                queued.merge(change);
                None
            } else {
                let evicted = if queue.order.len() >= self.capacity {
                    let oldest = queue.order.pop_front();
                    if let Some(oldest) = &oldest {
                        queue.pending.remove(oldest);
                    }
                    oldest
                } else {
                    None
                };
                queue.order.push_back(change.key.clone());
                queue.pending.insert(change.key.clone(), change);
                evicted
            }
        };

        if evicted.is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.waker.wake();
        evicted
    }

    fn pop(&self) -> Option<BookChange> {
        let mut queue = self.queue.lock();
        let key = queue.order.pop_front()?;
        queue.pending.remove(&key)
    }

    fn len(&self) -> usize {
        self.queue.lock().order.len()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.waker.wake();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Fans book changes out to any number of subscribers
///
/// Closing (or dropping) the notifier ends every subscription once its
/// queued changes are consumed.
#[derive(Debug)]
pub struct ChangeNotifier {
    slots: Mutex<Vec<Arc<Slot>>>,
    capacity: usize,
    closed: AtomicBool,
}

impl ChangeNotifier {
    /// Create a notifier holding up to `capacity` changes per subscriber
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Register a new subscriber
    ///
    /// The subscription sees changes published after this call.
    pub fn subscribe(&self) -> Subscription {
        let slot = Arc::new(Slot::new(self.capacity));
        if self.is_closed() {
            slot.close();
        } else {
            self.slots.lock().push(Arc::clone(&slot));
        }
        Subscription { slot }
    }

    /// Deliver a change to every live subscriber
    ///
    /// Returns the number of subscribers reached. Never blocks on consumers.
    pub fn notify(&self, change: BookChange) -> usize {
        if self.is_closed() {
            return 0;
        }

        let mut slots = self.slots.lock();
        slots.retain(|slot| !slot.is_closed());

        for slot in slots.iter() {
            if let Some(evicted) = slot.push(change.clone()) {
                debug!(
                    evicted = %evicted,
                    "Subscriber lagging, dropped oldest pending notification"
                );
            }
        }

        slots.len()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.slots.lock().iter().filter(|s| !s.is_closed()).count()
    }

    /// End all subscriptions
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for slot in self.slots.lock().drain(..) {
            slot.close();
        }
    }

    /// Check if the notifier has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for ChangeNotifier {
    fn drop(&mut self) {
        self.close();
    }
}

/// Stream of coalesced [`BookChange`]s for one subscriber
///
/// Dropping the subscription unregisters it.
#[derive(Debug)]
pub struct Subscription {
    slot: Arc<Slot>,
}

impl Subscription {
    /// Wait for the next change, `None` once the notifier is closed and drained
    pub async fn recv(&mut self) -> Option<BookChange> {
        futures::StreamExt::next(self).await
    }

    /// Take the next queued change without waiting
    pub fn try_recv(&mut self) -> Option<BookChange> {
        self.slot.pop()
    }

    /// Changes evicted because this subscriber fell behind
    pub fn dropped(&self) -> u64 {
        self.slot.dropped.load(Ordering::Relaxed)
    }

    /// Changes currently queued
    pub fn pending(&self) -> usize {
        self.slot.len()
    }

    /// Check if no further changes will arrive
    pub fn is_closed(&self) -> bool {
        self.slot.is_closed()
    }
}

impl Stream for Subscription {
    type Item = BookChange;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(change) = self.slot.pop() {
            return Poll::Ready(Some(change));
        }
        if self.slot.is_closed() {
            return Poll::Ready(None);
        }

        self.slot.waker.register(cx.waker());

        // A push may have landed between the first check and registration
        match self.slot.pop() {
            Some(change) => Poll::Ready(Some(change)),
            None if self.slot.is_closed() => Poll::Ready(None),
            None => Poll::Pending,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.slot.close();
    }
}
