use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::navigation::channel::TabId;
use crate::navigation::messages::Message;

/// One line of the capture journal.
#[derive(Debug, Serialize)]
pub struct JournalEntry<'a> {
    pub timestamp: DateTime<Utc>,
    pub platform: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab: Option<TabId>,

    pub message: &'a Message,
}

impl<'a> JournalEntry<'a> {
    pub fn now(platform: &'a str, message: &'a Message) -> Self {
        Self {
            timestamp: Utc::now(),
            platform,
            tab: None,
            message,
        }
    }

    pub fn with_tab(mut self, tab: Option<TabId>) -> Self {
        self.tab = tab;
        self
    }
}
