mod common;

use common::*;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

use rusty_governance::config::GOVERNANCE_UPDATE_MIN;
use rusty_governance::{GovernanceError, VoteFile};
use rusty_shared_types::{GovernanceObjectType, VoteOutcome, VoteSignal};

const SIGNALS: [VoteSignal; 2] = [VoteSignal::Funding, VoteSignal::Delete];
const OUTCOMES: [VoteOutcome; 4] = [VoteOutcome::None, VoteOutcome::Yes, VoteOutcome::No, VoteOutcome::Abstain];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The current vote of a (masternode, signal) pair only moves forward in
    /// time, and on equal timestamps only to a higher outcome.
    #[test]
    fn current_vote_is_monotonic(
        ops in prop::collection::vec((1u8..=3, 0usize..2, 0usize..4, 0i64..5), 1..30)
    ) {
        let list = mn_list(1..=3);
        let parent = dummy_hash(77);
        let mut file = VoteFile::new();
        let mut current: HashMap<(u8, VoteSignal), (i64, VoteOutcome)> = HashMap::new();
        let mut seen = HashSet::new();

        for (seed, signal, outcome, offset) in ops {
            let signal = SIGNALS[signal];
            let outcome = OUTCOMES[outcome];
            let time = NOW + offset;
            let v = vote(seed, parent, signal, outcome, time);
            let result = file.add_or_update(&v, &list, GovernanceObjectType::Trigger, NOW, false);

            let key = (seed, signal);
            if !seen.insert(v.hash()) {
                prop_assert_eq!(result, Err(GovernanceError::DuplicateVote(v.hash())));
                continue;
            }
            match current.get(&key).copied() {
                Some((prev_time, _)) if time < prev_time => {
                    prop_assert_eq!(
                        result,
                        Err(GovernanceError::ObsoleteVote { vote_time: time, current_time: prev_time })
                    );
                    seen.remove(&v.hash());
                }
                Some((prev_time, prev_outcome)) if time == prev_time && outcome < prev_outcome => {
                    prop_assert_eq!(result, Err(GovernanceError::OutcomeNotHigher));
                    seen.remove(&v.hash());
                }
                _ => {
                    prop_assert_eq!(result, Ok(()));
                    current.insert(key, (time, outcome));
                }
            }

            let record = file.current_record(&collateral(seed));
            let instance = record.and_then(|r| r.instances.get(&signal)).copied();
            let (expected_time, expected_outcome) = current[&key];
            prop_assert_eq!(instance.map(|i| (i.creation_time, i.outcome)), Some((expected_time, expected_outcome)));
        }

        prop_assert_eq!(file.vote_count(), seen.len());
        let live = file.current_votes(None);
        prop_assert_eq!(live.len(), current.len());
    }
}

/// With update spacing enforced, a newer vote arriving within
/// `GOVERNANCE_UPDATE_MIN` of the last accepted one is refused until the
/// window has passed, whatever its timestamp.
#[test]
fn update_spacing_overrides_newer_timestamp() {
    let list = mn_list(1..=1);
    let parent = dummy_hash(77);
    let mut file = VoteFile::new();

    let first = vote(1, parent, VoteSignal::Funding, VoteOutcome::Yes, NOW);
    file.add_or_update(&first, &list, GovernanceObjectType::Proposal, NOW, true).unwrap();

    let second = vote(1, parent, VoteSignal::Funding, VoteOutcome::No, NOW + 10);
    assert_eq!(
        file.add_or_update(&second, &list, GovernanceObjectType::Proposal, NOW + 10, true),
        Err(GovernanceError::VotingTooOften(collateral(1)))
    );
    assert_eq!(file.current_votes(None), vec![first]);

    let later = NOW + GOVERNANCE_UPDATE_MIN;
    file.add_or_update(&second, &list, GovernanceObjectType::Proposal, later, true).unwrap();
    assert_eq!(file.current_votes(None), vec![second]);
}
