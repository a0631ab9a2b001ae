//! Channel list queries.
//!
//! A [`ChannelQuery`] is the server-side filter a channel list subscription is
//! opened with. The default query for a user is
//!
//! ```text
//! type == T AND (members CONTAINS user_id OR recommended == true)
//! ```
//!
//! Queries are immutable once built. Evaluation ([`ChannelQuery::apply`]) is
//! provided so an in-memory transport can serve them with the same semantics
//! the backend uses.

use std::{cmp::Ordering, fmt};

use crate::{channel::ChannelRecord, identity::Identity};

/// Default channel type namespace.
pub const DEFAULT_CHANNEL_TYPE: &str = "messaging";

/// Default number of channels per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Channel type namespace (for example `messaging` or `livestream`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelType(String);

impl ChannelType {
    /// Create a channel type.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Type name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ChannelType {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_TYPE)
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Filter expression over channel fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `type == T`
    TypeEquals(ChannelType),
    /// `members CONTAINS user_id`
    MembersContain(String),
    /// `recommended == flag`, where an absent flag reads as `false`
    RecommendedEquals(bool),
    /// All sub-filters match. Empty matches everything.
    And(Vec<Filter>),
    /// Any sub-filter matches. Empty matches nothing.
    Or(Vec<Filter>),
}

impl Filter {
    /// Evaluate the filter against a channel.
    pub fn matches(&self, record: &ChannelRecord) -> bool {
        match self {
            Self::TypeEquals(channel_type) => record.channel_type == *channel_type,
            Self::MembersContain(user_id) => record.member_ids.iter().any(|m| m == user_id),
            Self::RecommendedEquals(flag) => record.is_recommended.unwrap_or(false) == *flag,
            Self::And(filters) => filters.iter().all(|f| f.matches(record)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(record)),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, filters: &[Filter], op: &str) -> fmt::Result {
            f.write_str("(")?;
            for (i, filter) in filters.iter().enumerate() {
                if i > 0 {
                    write!(f, " {op} ")?;
                }
                write!(f, "{filter}")?;
            }
            f.write_str(")")
        }

        match self {
            Self::TypeEquals(channel_type) => write!(f, "type == {channel_type}"),
            Self::MembersContain(user_id) => write!(f, "members CONTAINS {user_id}"),
            Self::RecommendedEquals(flag) => write!(f, "recommended == {flag}"),
            Self::And(filters) => join(f, filters, "AND"),
            Self::Or(filters) => join(f, filters, "OR"),
        }
    }
}

/// Field a channel list is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Most recent message time; channels without messages sort as oldest
    LastMessageAt,
    /// Unread count
    UnreadCount,
    /// Display name, falling back to ID
    Name,
}

/// One sort criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    /// Field to sort by
    pub key: SortKey,
    /// Largest first
    pub descending: bool,
}

impl Sort {
    /// Descending sort on `key`.
    pub fn descending(key: SortKey) -> Self {
        Self { key, descending: true }
    }

    /// Ascending sort on `key`.
    pub fn ascending(key: SortKey) -> Self {
        Self { key, descending: false }
    }

    /// Compare two channels under this criterion.
    pub fn compare(&self, a: &ChannelRecord, b: &ChannelRecord) -> Ordering {
        let ordering = match self.key {
            SortKey::LastMessageAt => a.last_message_at.cmp(&b.last_message_at),
            SortKey::UnreadCount => a.unread_count.cmp(&b.unread_count),
            SortKey::Name => {
                let name = |r: &ChannelRecord| r.name.clone().unwrap_or_else(|| r.id.clone());
                name(a).cmp(&name(b))
            },
        };
        if self.descending { ordering.reverse() } else { ordering }
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self::descending(SortKey::LastMessageAt)
    }
}

/// Immutable channel list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelQuery {
    /// Type namespace the query is scoped to
    pub channel_type: ChannelType,
    /// Filter expression
    pub filter: Filter,
    /// Sort criteria, applied in order
    pub sort: Vec<Sort>,
    /// Maximum channels returned
    pub page_size: usize,
}

impl ChannelQuery {
    /// Build the membership-or-recommended query for `identity`.
    ///
    /// Pure: the same identity and type always produce the same query.
    pub fn for_identity(identity: &Identity, channel_type: &ChannelType) -> Self {
        let filter = Filter::And(vec![
            Filter::TypeEquals(channel_type.clone()),
            Filter::Or(vec![
                Filter::MembersContain(identity.id.clone()),
                Filter::RecommendedEquals(true),
            ]),
        ]);

        Self {
            channel_type: channel_type.clone(),
            filter,
            sort: vec![Sort::default()],
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Replace the sort criteria.
    #[must_use]
    pub fn with_sort(mut self, sort: Vec<Sort>) -> Self {
        self.sort = sort;
        self
    }

    /// Replace the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Whether `record` belongs to the result set.
    pub fn matches(&self, record: &ChannelRecord) -> bool {
        self.filter.matches(record)
    }

    /// Filter, sort (stable), and truncate to one page.
    pub fn apply<'a, I>(&self, records: I) -> Vec<ChannelRecord>
    where
        I: IntoIterator<Item = &'a ChannelRecord>,
    {
        let mut result: Vec<ChannelRecord> =
            records.into_iter().filter(|r| self.matches(r)).cloned().collect();

        result.sort_by(|a, b| {
            self.sort.iter().map(|s| s.compare(a, b)).find(|o| o.is_ne()).unwrap_or(Ordering::Equal)
        });
        result.truncate(self.page_size);
        result
    }
}

impl fmt::Display for ChannelQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (limit {})", self.filter, self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{channel::Timestamp, identity::Role};

    fn query() -> ChannelQuery {
        ChannelQuery::for_identity(&Identity::new("u1", Role::Member), &ChannelType::default())
    }

    #[test]
    fn query_shape() {
        assert_eq!(
            query().filter.to_string(),
            "(type == messaging AND (members CONTAINS u1 OR recommended == true))"
        );
    }

    #[test]
    fn builder_is_deterministic() {
        assert_eq!(query(), query());
    }

    #[test]
    fn matches_membership_or_recommended() {
        let messaging = ChannelType::default();
        let member = ChannelRecord::new(messaging.clone(), "a").with_members(["u1", "u2"]);
        let recommended = ChannelRecord::new(messaging.clone(), "b").with_recommended(true);
        let neither = ChannelRecord::new(messaging, "c").with_members(["u2"]);
        let other_type = ChannelRecord::new(ChannelType::new("team"), "d").with_members(["u1"]);

        let q = query();
        assert!(q.matches(&member));
        assert!(q.matches(&recommended));
        assert!(!q.matches(&neither));
        assert!(!q.matches(&other_type));
    }

    #[test]
    fn empty_combinators() {
        let record = ChannelRecord::new(ChannelType::default(), "a");
        assert!(Filter::And(vec![]).matches(&record));
        assert!(!Filter::Or(vec![]).matches(&record));
    }

    #[test]
    fn apply_sorts_newest_first_and_keeps_ties_stable() {
        let messaging = ChannelType::default();
        let records = vec![
            ChannelRecord::new(messaging.clone(), "quiet-1").with_members(["u1"]),
            ChannelRecord::new(messaging.clone(), "old")
                .with_members(["u1"])
                .with_message("hi", Timestamp(10)),
            ChannelRecord::new(messaging.clone(), "quiet-2").with_recommended(true),
            ChannelRecord::new(messaging, "new")
                .with_members(["u1"])
                .with_message("yo", Timestamp(20)),
        ];

        let ids: Vec<String> = query().apply(&records).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["new", "old", "quiet-1", "quiet-2"]);
    }

    #[test]
    fn apply_truncates_to_page_size() {
        let messaging = ChannelType::default();
        let records: Vec<ChannelRecord> = (0..5)
            .map(|i| ChannelRecord::new(messaging.clone(), format!("c{i}")).with_recommended(true))
            .collect();

        assert_eq!(query().with_page_size(2).apply(&records).len(), 2);
    }

    #[test]
    fn name_sort_falls_back_to_id() {
        let messaging = ChannelType::default();
        let records = vec![
            ChannelRecord::new(messaging.clone(), "zed").with_recommended(true),
            ChannelRecord::new(messaging, "b").with_name("alpha").with_recommended(true),
        ];

        let q = query().with_sort(vec![Sort::ascending(SortKey::Name)]);
        let ids: Vec<String> = q.apply(&records).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["b", "zed"]);
    }
}
