use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::messages::Message;

/// Browser tab hosting a page context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The tab has no page context listening (still loading, or torn down).
    #[error("no page context attached to {0}")]
    NotAttached(TabId),

    #[error("{tab} rejected '{action}': {reason}")]
    Rejected {
        tab: TabId,
        action: &'static str,
        reason: String,
    },
}

/// Background -> page context transport. Sends are single attempts; retry
/// policy lives in `delivery`.
pub trait PageChannel: Send + Sync {
    fn send(&self, tab: TabId, message: &Message) -> Result<(), DeliveryError>;
}

// ============================================================================
// In-process channel
// ============================================================================

#[derive(Debug, Default)]
struct TabSlot {
    attached: bool,
    inbox: Vec<Message>,
}

/// Channel whose page contexts live in the same process.
///
/// A tab accepts messages only while attached; detaching models page
/// teardown and drops anything left unread.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChannel {
    tabs: Arc<Mutex<HashMap<TabId, TabSlot>>>,
}

impl InMemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, tab: TabId) {
        if let Ok(mut tabs) = self.tabs.lock() {
            tabs.entry(tab).or_default().attached = true;
        }
    }

    pub fn detach(&self, tab: TabId) {
        if let Ok(mut tabs) = self.tabs.lock() {
            let slot = tabs.entry(tab).or_default();
            slot.attached = false;
            slot.inbox.clear();
        }
    }

    pub fn is_attached(&self, tab: TabId) -> bool {
        self.tabs
            .lock()
            .map(|tabs| tabs.get(&tab).is_some_and(|s| s.attached))
            .unwrap_or(false)
    }

    /// Take every message delivered to `tab` so far.
    pub fn drain(&self, tab: TabId) -> Vec<Message> {
        self.tabs
            .lock()
            .map(|mut tabs| {
                tabs.get_mut(&tab)
                    .map(|s| std::mem::take(&mut s.inbox))
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }
}

impl PageChannel for InMemoryChannel {
    fn send(&self, tab: TabId, message: &Message) -> Result<(), DeliveryError> {
        let mut tabs = self.tabs.lock().map_err(|_| DeliveryError::Rejected {
            tab,
            action: message.action(),
            reason: "channel lock poisoned".into(),
        })?;

        match tabs.get_mut(&tab) {
            Some(slot) if slot.attached => {
                slot.inbox.push(message.clone());
                Ok(())
            }
            _ => Err(DeliveryError::NotAttached(tab)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_tab_refuses_messages() {
        let channel = InMemoryChannel::new();
        let tab = TabId(1);
        assert_eq!(
            channel.send(tab, &Message::EnableCapture),
            Err(DeliveryError::NotAttached(tab))
        );

        channel.attach(tab);
        channel.send(tab, &Message::EnableCapture).unwrap();
        assert_eq!(channel.drain(tab), vec![Message::EnableCapture]);
        assert!(channel.drain(tab).is_empty());

        channel.send(tab, &Message::DisableCapture).unwrap();
        channel.detach(tab);
        assert!(channel.drain(tab).is_empty(), "teardown drops unread messages");
    }
}
