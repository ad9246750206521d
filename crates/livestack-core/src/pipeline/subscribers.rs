use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use parking_lot::Mutex;
use uuid::Uuid;

/// Opaque handle of one registered output channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Registry of channels that receive the path of every new light preview.
///
/// Delivery is best effort: a channel removed while a notification is in
/// flight may or may not receive it, and channels whose receiver has been
/// dropped are pruned on the next delivery.
#[derive(Debug, Default)]
pub struct Subscribers {
    channels: Mutex<HashMap<SubscriptionId, mpsc::Sender<PathBuf>>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> (SubscriptionId, mpsc::Receiver<PathBuf>) {
        let (tx, rx) = mpsc::channel();
        let id = SubscriptionId(Uuid::new_v4());
        self.channels.lock().insert(id, tx);
        (id, rx)
    }

    /// Remove a channel. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.channels.lock().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.channels.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.lock().is_empty()
    }

    /// Send `preview` to every registered channel. Returns how many
    /// channels accepted it.
    pub fn notify(&self, preview: &Path) -> usize {
        let mut channels = self.channels.lock();
        channels.retain(|_, tx| tx.send(preview.to_path_buf()).is_ok());
        channels.len()
    }
}
