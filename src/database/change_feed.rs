//! Per-table change notification for the bookmark store.
//!
//! Every committed mutation is published to the subscribers registered for
//! the owning user. A [`Subscription`] is a scoped registration: dropping it
//! (or calling [`Subscription::close`]) removes it from the channel, so no
//! listener outlives the session or view that created it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

use crate::types::bookmark::Bookmark;
use crate::types::change::ChangeEvent;
use crate::types::folder::Folder;
use crate::types::tag::{BookmarkTag, Tag};

struct Registration<T> {
    user_id: String,
    sender: UnboundedSender<ChangeEvent<T>>,
}

struct ChannelInner<T> {
    table: &'static str,
    next_id: AtomicU64,
    registrations: Mutex<HashMap<u64, Registration<T>>>,
}

impl<T> ChannelInner<T> {
    fn unregister(&self, id: u64) {
        let mut regs = self.registrations.lock().unwrap_or_else(PoisonError::into_inner);
        if regs.remove(&id).is_some() {
            debug!(table = self.table, subscription = id, "change subscription released");
        }
    }
}

/// Typed change channel for one table.
pub struct Channel<T> {
    inner: Arc<ChannelInner<T>>,
}

impl<T: Clone> Channel<T> {
    pub fn new(table: &'static str) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                table,
                next_id: AtomicU64::new(1),
                registrations: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Registers a listener for `user_id`'s rows in this table.
    pub fn subscribe(&self, user_id: &str) -> Subscription<T> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Registration {
                    user_id: user_id.to_string(),
                    sender,
                },
            );
        debug!(table = self.inner.table, subscription = id, user_id, "change subscription opened");
        Subscription {
            id,
            channel: Arc::clone(&self.inner),
            receiver,
        }
    }

    /// Delivers `event` to every subscriber of `user_id`. Returns the number of deliveries.
    pub fn publish(&self, user_id: &str, event: ChangeEvent<T>) -> usize {
        let mut regs = self
            .inner
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;
        regs.retain(|_, reg| {
            if reg.user_id != user_id {
                return true;
            }
            match reg.sender.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                // receiver gone without a drop hook running; prune it
                Err(_) => false,
            }
        });
        trace!(table = self.inner.table, kind = event.kind(), delivered, "change published");
        delivered
    }

    /// Number of live registrations on this channel.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A scoped, cancelable registration yielding change events in publish order.
pub struct Subscription<T> {
    id: u64,
    channel: Arc<ChannelInner<T>>,
    receiver: UnboundedReceiver<ChangeEvent<T>>,
}

impl<T> Subscription<T> {
    /// Returns the next pending event without waiting.
    pub fn try_next(&mut self) -> Option<ChangeEvent<T>> {
        self.receiver.try_recv().ok()
    }

    /// Waits for the next event. Returns `None` once the channel is closed.
    pub async fn next(&mut self) -> Option<ChangeEvent<T>> {
        self.receiver.recv().await
    }

    /// Takes every event currently queued.
    pub fn drain(&mut self) -> Vec<ChangeEvent<T>> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Releases the registration immediately.
    pub fn close(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.channel.unregister(self.id);
    }
}

/// The store's change feed: one typed channel per table.
pub struct ChangeFeed {
    pub bookmarks: Channel<Bookmark>,
    pub folders: Channel<Folder>,
    pub tags: Channel<Tag>,
    pub bookmark_tags: Channel<BookmarkTag>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self {
            bookmarks: Channel::new("bookmarks"),
            folders: Channel::new("folders"),
            tags: Channel::new("tags"),
            bookmark_tags: Channel::new("bookmark_tags"),
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
