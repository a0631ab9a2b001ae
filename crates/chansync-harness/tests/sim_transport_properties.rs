//! Property-based tests for the simulated backend.
//!
//! Random channel mutations are applied while one subscription is open.
//! After each mutation:
//! - The subscription's channel set equals evaluating its query directly
//! - Every delivered update carries the channel set it produced
//! - Every delivered change set is consistent with the before and after sets
//! - Exactly one subscription is accounted for

use chansync_client::{ChannelListSubscription, Transport};
use chansync_core::{
    ChangeSet, ChannelQuery, ChannelRecord, ChannelType, Identity, ListChange, Role, Timestamp,
};
use chansync_harness::{InvariantRegistry, SimTransport, sim_token};
use futures::{FutureExt, StreamExt};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Mutation {
    Add { id: u8, member: bool },
    Remove { id: u8 },
    Join { id: u8 },
    Post { id: u8, at: u64 },
    Recommend { id: u8, flag: bool },
}

fn mutation_strategy() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        3 => (0u8..6, any::<bool>()).prop_map(|(id, member)| Mutation::Add { id, member }),
        1 => (0u8..6).prop_map(|id| Mutation::Remove { id }),
        1 => (0u8..6).prop_map(|id| Mutation::Join { id }),
        3 => (0u8..6, 0u64..100).prop_map(|(id, at)| Mutation::Post { id, at }),
        1 => (0u8..6, any::<bool>()).prop_map(|(id, flag)| Mutation::Recommend { id, flag }),
    ]
}

fn apply(sim: &SimTransport, mutation: &Mutation) {
    match *mutation {
        Mutation::Add { id, member } => {
            let members: &[(&str, Role)] =
                if member { &[("u1", Role::Member)] } else { &[("u2", Role::Member)] };
            sim.add_channel(ChannelRecord::new(ChannelType::default(), format!("c{id}")), members);
        },
        Mutation::Remove { id } => sim.remove_channel(&format!("c{id}")),
        Mutation::Join { id } => sim.add_member(&format!("c{id}"), "u1", Role::Admin),
        Mutation::Post { id, at } => sim.post_message(&format!("c{id}"), "msg", Timestamp(at)),
        Mutation::Recommend { id, flag } => sim.set_recommended(&format!("c{id}"), flag),
    }
}

fn ids(records: &[ChannelRecord]) -> Vec<String> {
    records.iter().map(|r| r.id.clone()).collect()
}

fn check_change_set(
    changes: &ChangeSet,
    before: &[String],
    after: &[String],
) -> Result<(), TestCaseError> {
    for change in &changes.changes {
        match change {
            ListChange::Insert { id, index } => {
                prop_assert_eq!(after.get(*index), Some(id));
                prop_assert!(!before.contains(id));
            },
            ListChange::Remove { id, index } => {
                prop_assert_eq!(before.get(*index), Some(id));
                prop_assert!(!after.contains(id));
            },
            ListChange::Move { id, from, to } => {
                prop_assert_eq!(before.get(*from), Some(id));
                prop_assert_eq!(after.get(*to), Some(id));
            },
            ListChange::Update { id, index } => {
                prop_assert_eq!(after.get(*index), Some(id));
                prop_assert_eq!(before.get(*index), Some(id));
            },
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_subscription_tracks_query(mutations in proptest::collection::vec(mutation_strategy(), 1..40)) {
        let sim = SimTransport::new();
        sim.set_credential(chansync_core::Credential::signed(&sim_token("u1")).unwrap_or_default());
        prop_assert!(sim.reload_identity().now_or_never() == Some(Ok(())));

        let query = ChannelQuery::for_identity(&Identity::new("u1", Role::Member), &ChannelType::default());
        let mut subscription = sim.open_channel_list(&query);
        let mut changes = subscription.changes();
        let registry = InvariantRegistry::standard();

        let mut delivered = subscription.channels();
        for mutation in &mutations {
            let before = ids(&delivered);
            apply(&sim, mutation);
            let after_records = subscription.channels();
            let after = ids(&after_records);

            let expected: Vec<ChannelRecord> = query.apply(&after_records);
            prop_assert_eq!(&after, &ids(&expected));

            match changes.next().now_or_never() {
                Some(Some(update)) => {
                    prop_assert!(!update.changes.is_empty());
                    prop_assert_eq!(&ids(&update.channels), &after);
                    check_change_set(&update.changes, &before, &after)?;
                    delivered = update.channels;
                },
                Some(None) => prop_assert!(false, "change stream ended"),
                None => prop_assert_eq!(&before, &after),
            }

            registry.assert_all(&sim.snapshot(), "after mutation");
        }

        drop(subscription);
        prop_assert_eq!(sim.open_subscriptions(), 0);
    }
}
