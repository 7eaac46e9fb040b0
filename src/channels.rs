//! Read-only view of the payment channel registry.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(rename = "type")]
    pub channel_type: String,
    pub label: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelRegistry {
    channels: Vec<Channel>,
}

impl ChannelRegistry {
    pub fn new(channels: Vec<Channel>) -> Self {
        Self { channels }
    }

    pub fn active(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter().filter(|c| c.is_active)
    }

    /// Active channel whose label matches, ignoring case and surrounding space.
    pub fn find_active(&self, label: &str) -> Option<&Channel> {
        let wanted = label.trim();
        if wanted.is_empty() {
            return None;
        }
        self.active().find(|c| c.label.trim().eq_ignore_ascii_case(wanted))
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
