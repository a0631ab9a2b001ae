//! Channel records and their presentation snapshots.
//!
//! [`ChannelRecord`] is the raw channel as the transport reports it for the
//! current user. [`ChannelViewModel`] is the flattened, immutable snapshot the
//! presentation layer consumes. Projection is a pure function applied to the
//! full channel set on every synchronization event.

use serde::Serialize;

use crate::{identity::Role, query::ChannelType};

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

/// A message as carried in a channel's preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    /// Message text
    pub text: String,
    /// Creation time
    pub created_at: Timestamp,
}

/// Raw channel as reported by the transport for the current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    /// Channel ID (`type:id`)
    pub id: String,
    /// Channel type namespace
    pub channel_type: ChannelType,
    /// Display name. `None` if never set.
    pub name: Option<String>,
    /// Free-form description
    pub summary: Option<String>,
    /// Channel image
    pub image_url: Option<String>,
    /// IDs of all members
    pub member_ids: Vec<String>,
    /// Current user's membership role. `None` if not a member.
    pub membership_role: Option<Role>,
    /// Recommended flag from channel extra data. `None` if absent.
    pub is_recommended: Option<bool>,
    /// Unread messages for the current user
    pub unread_count: u32,
    /// Total members
    pub member_count: u32,
    /// Time of the most recent message
    pub last_message_at: Option<Timestamp>,
    /// Most recent messages, newest first
    pub latest_messages: Vec<MessageRecord>,
    /// Distinct one-to-one channel
    pub is_direct_message: bool,
    /// Muted by the current user
    pub is_muted: bool,
}

impl ChannelRecord {
    /// Create an empty record with the given type and ID.
    pub fn new(channel_type: ChannelType, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            channel_type,
            name: None,
            summary: None,
            image_url: None,
            member_ids: Vec::new(),
            membership_role: None,
            is_recommended: None,
            unread_count: 0,
            member_count: 0,
            last_message_at: None,
            latest_messages: Vec::new(),
            is_direct_message: false,
            is_muted: false,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the member IDs and the member count to match.
    #[must_use]
    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.member_ids = members.into_iter().map(Into::into).collect();
        self.member_count = u32::try_from(self.member_ids.len()).unwrap_or(u32::MAX);
        self
    }

    /// Set the recommended flag.
    #[must_use]
    pub fn with_recommended(mut self, recommended: bool) -> Self {
        self.is_recommended = Some(recommended);
        self
    }

    /// Prepend a message and bump the last message time.
    #[must_use]
    pub fn with_message(mut self, text: impl Into<String>, created_at: Timestamp) -> Self {
        self.latest_messages.insert(0, MessageRecord { text: text.into(), created_at });
        self.last_message_at = Some(self.last_message_at.map_or(created_at, |t| t.max(created_at)));
        self
    }
}

/// Presentation snapshot of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChannelViewModel {
    /// Channel ID
    pub id: String,
    /// Display name, falling back to the ID
    pub name: String,
    /// Description
    pub summary: Option<String>,
    /// Channel image
    pub image_url: Option<String>,
    /// Current user is a member
    pub is_member: bool,
    /// Channel is recommended to the current user
    pub is_recommended: bool,
    /// Unread messages
    pub unread_count: u32,
    /// Total members
    pub member_count: u32,
    /// Time of the most recent message
    pub last_message_at: Option<Timestamp>,
    /// Text of the most recent message
    pub last_message_text: Option<String>,
    /// Distinct one-to-one channel
    pub is_direct_message: bool,
    /// Muted by the current user
    pub is_muted: bool,
    /// Current user may edit the channel
    pub can_edit: bool,
}

impl From<&ChannelRecord> for ChannelViewModel {
    fn from(record: &ChannelRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone().unwrap_or_else(|| record.id.clone()),
            summary: record.summary.clone(),
            image_url: record.image_url.clone(),
            is_member: record.membership_role.is_some(),
            is_recommended: record.is_recommended.unwrap_or(false),
            unread_count: record.unread_count,
            member_count: record.member_count,
            last_message_at: record.last_message_at,
            last_message_text: record.latest_messages.first().map(|m| m.text.clone()),
            is_direct_message: record.is_direct_message,
            is_muted: record.is_muted,
            can_edit: record.membership_role.is_some_and(Role::can_edit),
        }
    }
}

/// Project a full channel set, preserving order.
pub fn project(records: &[ChannelRecord]) -> Vec<ChannelViewModel> {
    records.iter().map(ChannelViewModel::from).collect()
}

/// One positional change in a channel list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListChange {
    /// Channel entered the list
    Insert {
        /// Channel ID
        id: String,
        /// Position in the new list
        index: usize,
    },
    /// Channel data changed in place
    Update {
        /// Channel ID
        id: String,
        /// Position in the list
        index: usize,
    },
    /// Channel moved
    Move {
        /// Channel ID
        id: String,
        /// Previous position
        from: usize,
        /// New position
        to: usize,
    },
    /// Channel left the list
    Remove {
        /// Channel ID
        id: String,
        /// Position in the old list
        index: usize,
    },
}

/// Batch of changes delivered by a channel list subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Changes in the order the transport applied them
    pub changes: Vec<ListChange>,
}

impl ChangeSet {
    /// Create a change set.
    pub fn new(changes: Vec<ListChange>) -> Self {
        Self { changes }
    }

    /// Number of changes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// True if no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// One delivery from a channel list subscription: the changes and the
/// channel set they produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelListUpdate {
    /// Changes as the transport applied them
    pub changes: ChangeSet,
    /// Full channel set right after `changes`
    pub channels: Vec<ChannelRecord>,
}
