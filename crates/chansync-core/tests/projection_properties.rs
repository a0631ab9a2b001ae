//! Property-based tests for query evaluation and view model projection.
//!
//! These verify laws that must hold for every channel record:
//! - Projection is total and order-preserving
//! - Unset names fall back to the channel ID
//! - `can_edit` is true iff the membership role is admin or owner
//! - Query results are always a subset of the input that matches the filter

use chansync_core::{
    ChannelQuery, ChannelRecord, ChannelType, ChannelViewModel, Identity, Role, Timestamp, project,
};
use proptest::prelude::*;

fn role_strategy() -> impl Strategy<Value = Option<Role>> {
    prop_oneof![
        Just(None),
        Just(Some(Role::Anonymous)),
        Just(Some(Role::Member)),
        Just(Some(Role::Moderator)),
        Just(Some(Role::Admin)),
        Just(Some(Role::Owner)),
    ]
}

fn record_strategy() -> impl Strategy<Value = ChannelRecord> {
    (
        "[a-z]{1,8}",
        proptest::option::of("[A-Za-z ]{0,12}"),
        role_strategy(),
        proptest::option::of(any::<bool>()),
        proptest::collection::vec("u[0-3]", 0..4),
        proptest::option::of(0u64..1_000),
        any::<bool>(),
    )
        .prop_map(|(id, name, role, recommended, members, last, direct)| {
            let channel_type = if direct { ChannelType::new("direct") } else { ChannelType::default() };
            let mut record = ChannelRecord::new(channel_type, id).with_members(members);
            record.name = name;
            record.membership_role = role;
            record.is_recommended = recommended;
            record.is_direct_message = direct;
            if let Some(at) = last {
                record = record.with_message("msg", Timestamp(at));
            }
            record
        })
}

proptest! {
    #[test]
    fn prop_projection_is_total_and_ordered(records in proptest::collection::vec(record_strategy(), 0..20)) {
        let projected = project(&records);
        prop_assert_eq!(projected.len(), records.len());
        for (record, vm) in records.iter().zip(&projected) {
            prop_assert_eq!(&record.id, &vm.id);
        }
    }

    #[test]
    fn prop_name_falls_back_to_id(record in record_strategy()) {
        let vm = ChannelViewModel::from(&record);
        match &record.name {
            Some(name) => prop_assert_eq!(&vm.name, name),
            None => prop_assert_eq!(&vm.name, &record.id),
        }
    }

    #[test]
    fn prop_can_edit_iff_admin_or_owner(record in record_strategy()) {
        let vm = ChannelViewModel::from(&record);
        let expected = matches!(record.membership_role, Some(Role::Admin | Role::Owner));
        prop_assert_eq!(vm.can_edit, expected);
        prop_assert_eq!(vm.is_member, record.membership_role.is_some());
    }

    #[test]
    fn prop_query_results_match_filter(
        records in proptest::collection::vec(record_strategy(), 0..30),
        user in "u[0-3]",
    ) {
        let query = ChannelQuery::for_identity(&Identity::new(user, Role::Member), &ChannelType::default());
        let result = query.apply(&records);

        prop_assert!(result.len() <= query.page_size);
        prop_assert!(result.iter().all(|r| query.matches(r)));
        for window in result.windows(2) {
            prop_assert!(window[0].last_message_at >= window[1].last_message_at);
        }
    }
}
