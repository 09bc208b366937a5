mod common;

use common::*;
use rusty_governance::{
    BloomFilter, CollateralStatus, GovernanceError, GovernanceMessage, Inventory, PeerInfo, SeenObjectStatus, SyncItem,
};
use rusty_shared_types::{CoinbaseTransaction, GovernanceVote, TxOutput, VoteOutcome, VoteSignal, COIN, ZERO_HASH};

#[test]
fn test_unsolicited_object_is_dropped() {
    init_logger();
    let h = Harness::new(mn_list(1..=3));
    let object = proposal("alpha", NOW + 100_000);
    let hash = object.hash();

    assert_eq!(
        h.manager.process_message(1, GovernanceMessage::Object(object.clone())),
        Err(GovernanceError::Unsolicited(hash))
    );
    assert!(!h.manager.have_object_for_hash(&hash));

    h.deliver_object(1, object).unwrap();
    assert!(h.manager.have_object_for_hash(&hash));
    assert_eq!(h.relayed(), vec![Inventory::object(hash)]);
    assert!(h.sync.bumps.lock().unwrap().contains(&"govobj".to_string()));
}

#[test]
fn test_object_insertion_is_idempotent() {
    let h = Harness::new(mn_list(1..=3));
    let object = proposal("alpha", NOW + 100_000);
    let hash = object.hash();
    h.deliver_object(1, object.clone()).unwrap();

    assert!(!h.manager.confirm_inventory_request(&Inventory::object(hash)));
    assert_eq!(
        h.manager.process_message(2, GovernanceMessage::Object(object.clone())),
        Err(GovernanceError::Unsolicited(hash))
    );
    assert_eq!(h.manager.submit_object(object), Err(GovernanceError::AlreadyKnown(hash)));
    assert_eq!(h.manager.stats().objects_total, 1);
}

#[test]
fn test_erased_object_is_never_resurrected() {
    let h = Harness::new(mn_list(1..=3));
    let object = proposal("short", NOW + 100);
    let hash = object.hash();
    h.deliver_object(1, object.clone()).unwrap();

    h.clock.advance(100);
    h.manager.do_maintenance();
    assert!(h.manager.have_object_for_hash(&hash));

    h.clock.advance(599);
    h.manager.do_maintenance();
    assert!(h.manager.have_object_for_hash(&hash));

    h.clock.advance(1);
    h.manager.do_maintenance();
    assert!(!h.manager.have_object_for_hash(&hash));
    assert_eq!(h.manager.stats().erased, 1);

    assert!(!h.manager.confirm_inventory_request(&Inventory::object(hash)));
    assert_eq!(
        h.manager.process_message(1, GovernanceMessage::Object(object.clone())),
        Err(GovernanceError::Unsolicited(hash))
    );
    assert_eq!(h.manager.submit_object(object), Err(GovernanceError::AlreadyKnown(hash)));
}

#[test]
fn test_invalid_object_penalty_only_when_synced() {
    let h = Harness::new(mn_list(1..=3));
    let bad = proposal("bad name!", NOW + 100_000);

    let err = h.deliver_object(1, bad.clone()).unwrap_err();
    assert!(matches!(err, GovernanceError::InvalidObject(_)));
    assert_eq!(err.penalty(), 20);

    h.set_synced(false);
    assert_eq!(h.deliver_object(1, bad.clone()), Ok(()));
    assert!(!h.manager.have_object_for_hash(&bad.hash()));
}

#[test]
fn test_objects_ignored_until_blockchain_synced() {
    let h = Harness::new(mn_list(1..=3));
    h.sync.blockchain_synced.store(false, std::sync::atomic::Ordering::SeqCst);
    let object = proposal("alpha", NOW + 100_000);
    assert!(!h.manager.confirm_inventory_request(&Inventory::object(object.hash())));
    assert_eq!(
        h.manager.process_message(1, GovernanceMessage::Object(object)),
        Err(GovernanceError::NotSynced)
    );
}

#[test]
fn test_postponed_object_is_promoted_on_new_tip() {
    let h = Harness::new(mn_list(1..=3));
    let object = proposal("waiting", NOW + 100_000);
    let hash = object.hash();
    h.chain
        .collateral
        .lock()
        .unwrap()
        .insert(hash, CollateralStatus::MissingConfirmations);

    h.deliver_object(1, object).unwrap();
    assert!(h.manager.have_object_for_hash(&hash));
    assert!(h.manager.find_object(&hash).is_none());
    assert!(h.relayed().is_empty());

    h.manager.updated_block_tip(1_501, false);
    assert!(h.manager.find_object(&hash).is_none());

    h.chain.collateral.lock().unwrap().insert(hash, CollateralStatus::Valid);
    h.manager.updated_block_tip(1_502, false);
    assert!(h.manager.find_object(&hash).is_some());
    assert_eq!(h.relayed(), vec![Inventory::object(hash)]);
}

#[test]
fn test_postponed_object_with_invalid_collateral_is_dropped() {
    let h = Harness::new(mn_list(1..=3));
    let object = proposal("doomed", NOW + 100_000);
    let hash = object.hash();
    h.chain
        .collateral
        .lock()
        .unwrap()
        .insert(hash, CollateralStatus::MissingConfirmations);
    h.deliver_object(1, object).unwrap();

    h.chain
        .collateral
        .lock()
        .unwrap()
        .insert(hash, CollateralStatus::Invalid("collateral spent".to_string()));
    h.manager.updated_block_tip(1_501, false);
    assert!(!h.manager.have_object_for_hash(&hash));
}

#[test]
fn test_orphan_vote_is_replayed_when_parent_arrives() {
    let h = Harness::new(mn_list(1..=3));
    let object = proposal("alpha", NOW + 100_000);
    let hash = object.hash();
    let yes = vote(1, hash, VoteSignal::Funding, VoteOutcome::Yes, NOW);

    assert_eq!(h.deliver_vote(7, yes.clone()), Err(GovernanceError::OrphanVote(hash)));
    assert_eq!(h.peers.sync_requests(), vec![(7, hash)]);
    assert!(!h.manager.have_vote_for_hash(&yes.hash()));

    h.deliver_object(7, object).unwrap();
    assert!(h.manager.have_vote_for_hash(&yes.hash()));
    assert_eq!(h.manager.current_votes(&hash, None), vec![yes.clone()]);
    let relayed = h.relayed();
    assert!(relayed.contains(&Inventory::object(hash)));
    assert!(relayed.contains(&Inventory::vote(yes.hash())));
}

#[test]
fn test_orphan_votes_expire() {
    let h = Harness::new(mn_list(1..=3));
    h.peers.peers.lock().unwrap().push(PeerInfo { id: 3, can_relay: true, inbound: false });
    h.peers.peers.lock().unwrap().push(PeerInfo { id: 4, can_relay: false, inbound: false });
    let parent = dummy_hash(99);
    let orphan = vote(2, parent, VoteSignal::Funding, VoteOutcome::Yes, NOW);
    let _ = h.deliver_vote(9, orphan);

    h.manager.do_maintenance();
    let requests = h.peers.sync_requests();
    assert!(requests.contains(&(3, parent)));
    assert!(!requests.contains(&(4, parent)));

    h.clock.advance(601);
    h.manager.do_maintenance();
    assert_eq!(h.peers.sync_requests().len(), requests.len());
}

#[test]
fn test_vote_rejections_carry_penalties() {
    let h = Harness::new(mn_list(1..=3));
    let object = proposal("alpha", NOW + 100_000);
    let hash = object.hash();
    h.deliver_object(1, object).unwrap();

    let good = vote(1, hash, VoteSignal::Funding, VoteOutcome::Yes, NOW);
    h.deliver_vote(1, good.clone()).unwrap();
    assert_eq!(h.manager.vote_count(), 1);
    assert_eq!(
        h.manager.process_vote_and_relay(&good),
        Err(GovernanceError::DuplicateVote(good.hash()))
    );

    let mut forged = GovernanceVote::new(collateral(2), hash, VoteSignal::Funding, VoteOutcome::Yes, NOW);
    forged.sign(&signing_key(50));
    let err = h.deliver_vote(1, forged.clone()).unwrap_err();
    assert_eq!(err, GovernanceError::InvalidVoteSignature(collateral(2)));
    assert_eq!(err.penalty(), 20);
    let err = h.deliver_vote(1, forged).unwrap_err();
    assert!(matches!(err, GovernanceError::KnownInvalidVote(_)));
    assert_eq!(err.penalty(), 20);

    let stranger = vote(42, hash, VoteSignal::Funding, VoteOutcome::Yes, NOW);
    let err = h.deliver_vote(1, stranger.clone()).unwrap_err();
    assert_eq!(err, GovernanceError::UnknownMasternode(collateral(42)));

    h.set_synced(false);
    assert_eq!(h.deliver_vote(1, stranger), Ok(()));

    let none = vote(3, hash, VoteSignal::None, VoteOutcome::Yes, NOW);
    let err = h.deliver_vote(1, none).unwrap_err();
    assert_eq!(err, GovernanceError::NoneSignal);
    assert_eq!(err.penalty(), 0);
}

#[test]
fn test_vote_update_too_soon_is_temporary() {
    let h = Harness::new(mn_list(1..=3));
    let object = proposal("alpha", NOW + 100_000);
    let hash = object.hash();
    h.deliver_object(1, object).unwrap();

    h.deliver_vote(1, vote(1, hash, VoteSignal::Funding, VoteOutcome::Yes, NOW)).unwrap();
    let err = h
        .deliver_vote(1, vote(1, hash, VoteSignal::Funding, VoteOutcome::No, NOW + 10))
        .unwrap_err();
    assert!(!err.is_permanent());
    assert_eq!(err.penalty(), 0);

    h.clock.advance(3_600);
    h.deliver_vote(1, vote(1, hash, VoteSignal::Funding, VoteOutcome::No, NOW + 20)).unwrap();
    let current = h.manager.current_votes(&hash, Some(&collateral(1)));
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].outcome, VoteOutcome::No);
}

#[test]
fn test_vote_update_spacing_waits_for_sync() {
    let h = Harness::new(mn_list(1..=3));
    let object = proposal("alpha", NOW + 100_000);
    let hash = object.hash();
    h.deliver_object(1, object).unwrap();

    h.set_synced(false);
    h.deliver_vote(1, vote(1, hash, VoteSignal::Funding, VoteOutcome::Yes, NOW)).unwrap();
    h.deliver_vote(1, vote(1, hash, VoteSignal::Funding, VoteOutcome::No, NOW + 10)).unwrap();
    let current = h.manager.current_votes(&hash, Some(&collateral(1)));
    assert_eq!(current[0].outcome, VoteOutcome::No);

    // the first update once synced starts the spacing window
    h.set_synced(true);
    h.deliver_vote(1, vote(1, hash, VoteSignal::Funding, VoteOutcome::Abstain, NOW + 20)).unwrap();
    assert_eq!(
        h.deliver_vote(1, vote(1, hash, VoteSignal::Funding, VoteOutcome::Yes, NOW + 30)),
        Err(GovernanceError::VotingTooOften(collateral(1)))
    );
}

#[test]
fn test_full_sync_request() {
    let h = Harness::new(mn_list(1..=3));
    let object = proposal("alpha", NOW + 100_000);
    let hash = object.hash();
    h.deliver_object(1, object).unwrap();

    let request = GovernanceMessage::SyncRequest { object_hash: ZERO_HASH, filter: BloomFilter::empty() };
    h.manager.process_message(5, request.clone()).unwrap();
    assert_eq!(*h.peers.inventory.lock().unwrap(), vec![(5, Inventory::object(hash))]);
    assert_eq!(*h.peers.counts.lock().unwrap(), vec![(5, SyncItem::Objects, 1)]);

    let err = h.manager.process_message(5, request.clone()).unwrap_err();
    assert_eq!(err, GovernanceError::SyncRequestRepeated);
    assert_eq!(err.penalty(), 20);

    h.set_synced(false);
    assert_eq!(h.manager.process_message(6, request), Err(GovernanceError::NotSynced));
}

#[test]
fn test_vote_sync_respects_filter() {
    let h = Harness::new(mn_list(1..=3));
    let object = proposal("alpha", NOW + 100_000);
    let hash = object.hash();
    h.deliver_object(1, object).unwrap();
    let votes: Vec<GovernanceVote> = (1..=3)
        .map(|seed| vote(seed, hash, VoteSignal::Funding, VoteOutcome::Yes, NOW))
        .collect();
    for v in &votes {
        h.deliver_vote(1, v.clone()).unwrap();
    }

    let mut filter = BloomFilter::new(100, 0.001, 0);
    filter.insert(&votes[0].hash());
    h.manager
        .process_message(6, GovernanceMessage::SyncRequest { object_hash: hash, filter })
        .unwrap();

    let offered: Vec<Inventory> = h.peers.inventory.lock().unwrap().iter().map(|(_, inv)| *inv).collect();
    assert_eq!(offered.len(), 2);
    assert!(offered.contains(&Inventory::vote(votes[1].hash())));
    assert!(offered.contains(&Inventory::vote(votes[2].hash())));
    assert_eq!(*h.peers.counts.lock().unwrap(), vec![(6, SyncItem::Votes, 2)]);
}

#[test]
fn test_request_votes_asks_triggers_first() {
    let h = Harness::new(mn_list(1..=3));
    h.manager.updated_block_tip(1_505, false);
    let object = proposal("alpha", NOW + 100_000);
    let trig = trigger(1, 1_510, &[(20, "5")], NOW);
    h.deliver_object(1, object.clone()).unwrap();
    h.deliver_object(1, trig.clone()).unwrap();

    let peers = vec![
        PeerInfo { id: 1, can_relay: true, inbound: false },
        PeerInfo { id: 2, can_relay: false, inbound: false },
        PeerInfo { id: 3, can_relay: true, inbound: true },
    ];
    h.peers.messages.lock().unwrap().clear();
    // 2000 projected votes over 3 masternodes allows every object
    let remaining = h.manager.request_governance_object_votes(&peers);
    assert_eq!(remaining, 0);
    let requests = h.peers.sync_requests();
    assert_eq!(requests[0], (1, trig.hash()));
    assert_eq!(requests[1], (3, trig.hash()));
    assert!(requests.contains(&(1, object.hash())));
    assert!(!requests.iter().any(|(peer, _)| *peer == 2));

    // asked recently
    h.peers.messages.lock().unwrap().clear();
    h.manager.request_governance_object_votes(&peers);
    assert!(h.peers.sync_requests().is_empty());
}

#[test]
fn test_request_votes_skips_deleted_objects() {
    let h = Harness::new(mn_list(1..=3));
    h.manager.updated_block_tip(1_505, false);
    let mut broken = rusty_shared_types::GovernanceObject::new(
        ZERO_HASH,
        1,
        NOW,
        ZERO_HASH,
        br#"{"type":2,"event_block_height":1510}"#.to_vec(),
        rusty_shared_types::GovernanceObjectType::Trigger,
    );
    broken.sign(collateral(1), &signing_key(1));
    let object = proposal("alpha", NOW + 100_000);
    h.deliver_object(1, broken.clone()).unwrap();
    h.deliver_object(1, object.clone()).unwrap();

    h.peers.messages.lock().unwrap().clear();
    let peers = vec![PeerInfo { id: 1, can_relay: true, inbound: false }];
    assert_eq!(h.manager.request_governance_object_votes(&peers), 0);
    assert_eq!(h.peers.sync_requests(), vec![(1, object.hash())]);
}

#[test]
fn test_oversized_filter_is_rejected() {
    let h = Harness::new(mn_list(1..=3));
    let object = proposal("alpha", NOW + 100_000);
    h.deliver_object(1, object.clone()).unwrap();

    let raw = bincode::serialize(&(vec![0u8; 36_001], 1u32, 0u32)).unwrap();
    let filter: BloomFilter = bincode::deserialize(&raw).unwrap();
    assert!(!filter.is_within_size_constraints());
    let err = h
        .manager
        .process_message(4, GovernanceMessage::SyncRequest { object_hash: object.hash(), filter })
        .unwrap_err();
    assert_eq!(err, GovernanceError::OversizedFilter);
    assert_eq!(err.penalty(), 100);
    assert!(h.peers.inventory.lock().unwrap().is_empty());
}

#[test]
fn test_superblock_lifecycle() {
    let h = Harness::new(mn_list(1..=10));
    h.manager.updated_block_tip(1_505, false);
    let trig = trigger(1, 1_510, &[(20, "5"), (21, "2.5")], NOW);
    let hash = trig.hash();
    h.deliver_object(1, trig).unwrap();
    assert!(!h.manager.is_superblock_triggered(1_510));

    for seed in 1..=3 {
        h.deliver_vote(1, vote(seed, hash, VoteSignal::Funding, VoteOutcome::Yes, NOW)).unwrap();
    }
    assert!(h.manager.is_superblock_triggered(1_510));
    assert!(!h.manager.is_superblock_triggered(1_505));

    let payments = h.manager.get_superblock_payments(1_510).unwrap();
    assert_eq!(
        payments,
        vec![TxOutput::p2pkh(5 * COIN, &[20u8; 20]), TxOutput::p2pkh(5 * COIN / 2, &[21u8; 20])]
    );

    let mut outputs = vec![TxOutput::p2pkh(10 * COIN, &[9u8; 20])];
    outputs.extend(payments.clone());
    let coinbase = CoinbaseTransaction { version: 1, inputs: Vec::new(), outputs, lock_time: 0 };
    assert!(h.manager.validate_superblock(&coinbase, 1_510, 10 * COIN));
    assert!(!h.manager.validate_superblock(&coinbase, 1_520, 10 * COIN));

    let short = CoinbaseTransaction {
        version: 1,
        inputs: Vec::new(),
        outputs: vec![TxOutput::p2pkh(10 * COIN, &[9u8; 20]), payments[0].clone()],
        lock_time: 0,
    };
    assert!(!h.manager.validate_superblock(&short, 1_510, 10 * COIN));

    h.chain.budget.store(7 * COIN, std::sync::atomic::Ordering::SeqCst);
    assert!(!h.manager.validate_superblock(&coinbase, 1_510, 10 * COIN));

    h.sporks.superblocks.store(false, std::sync::atomic::Ordering::SeqCst);
    assert!(!h.manager.is_superblock_triggered(1_510));
    assert!(h.manager.get_superblock_payments(1_510).is_none());
    h.sporks.superblocks.store(true, std::sync::atomic::Ordering::SeqCst);

    h.manager.updated_block_tip(1_510, false);
    let triggers = h.manager.active_triggers();
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].status, SeenObjectStatus::Executed);
}

#[test]
fn test_unparseable_trigger_is_kept_and_flagged() {
    let h = Harness::new(mn_list(1..=3));
    h.manager.updated_block_tip(1_505, false);
    let mut broken = rusty_shared_types::GovernanceObject::new(
        ZERO_HASH,
        1,
        NOW,
        ZERO_HASH,
        br#"{"type":2,"event_block_height":1510}"#.to_vec(),
        rusty_shared_types::GovernanceObjectType::Trigger,
    );
    broken.sign(collateral(1), &signing_key(1));
    let hash = broken.hash();

    h.deliver_object(1, broken).unwrap();
    assert!(h.manager.find_object(&hash).is_some());
    assert!(h.manager.active_triggers().is_empty());
    assert!(h.relayed().is_empty());
    let flagged = h
        .manager
        .with_locked_store(|store| store.find(&hash).map(|stored| stored.flags.cached_delete));
    assert_eq!(flagged, Some(true));
}

#[test]
fn test_trigger_burst_is_rate_limited() {
    let h = Harness::new(mn_list(1..=3));
    h.manager.updated_block_tip(1_505, false);

    for i in 0..4 {
        h.deliver_object(1, trigger(1, 1_510, &[(20, "1")], NOW + i)).unwrap();
    }
    let fifth = trigger(1, 1_510, &[(20, "1")], NOW + 4);
    assert_eq!(
        h.deliver_object(1, fifth.clone()),
        Err(GovernanceError::RateLimited(collateral(1)))
    );
    assert!(!h.manager.have_object_for_hash(&fifth.hash()));

    let later = trigger(1, 1_510, &[(20, "1")], NOW + 1_000);
    assert_eq!(
        h.deliver_object(1, later),
        Err(GovernanceError::RateLimited(collateral(1)))
    );

    h.deliver_object(1, trigger(2, 1_510, &[(20, "1")], NOW)).unwrap();
    assert_eq!(h.manager.active_triggers().len(), 5);
}

#[test]
fn test_submitted_triggers_skip_rate_check_until_synced() {
    let h = Harness::new(mn_list(1..=3));
    h.manager.updated_block_tip(1_505, false);

    h.set_synced(false);
    for i in 0..6 {
        h.manager.submit_object(trigger(1, 1_510, &[(20, "1")], NOW + i)).unwrap();
    }
    assert_eq!(h.manager.active_triggers().len(), 6);

    h.set_synced(true);
    assert_eq!(
        h.manager.submit_object(trigger(1, 1_510, &[(20, "1")], NOW + 6)),
        Err(GovernanceError::RateLimited(collateral(1)))
    );
}

#[test]
fn test_trigger_from_unknown_masternode_is_invalid() {
    let h = Harness::new(mn_list(1..=3));
    h.manager.updated_block_tip(1_505, false);
    let err = h.deliver_object(1, trigger(30, 1_510, &[(20, "1")], NOW)).unwrap_err();
    assert!(matches!(err, GovernanceError::InvalidObject(_)));
    assert_eq!(err.penalty(), 20);
}

#[test]
fn test_votes_of_departed_masternode_are_purged() {
    let h = Harness::new(mn_list(1..=3));
    h.manager.updated_block_tip(1_501, false);
    let object = proposal("alpha", NOW + 100_000);
    let hash = object.hash();
    h.deliver_object(1, object).unwrap();
    for seed in 1..=3 {
        h.deliver_vote(1, vote(seed, hash, VoteSignal::Funding, VoteOutcome::Yes, NOW)).unwrap();
    }
    assert_eq!(h.manager.vote_count(), 3);

    h.set_list(mn_list(1..=2));
    h.manager.updated_block_tip(1_502, false);
    assert_eq!(h.manager.vote_count(), 2);
    assert_eq!(h.manager.current_votes(&hash, None).len(), 2);
}

#[test]
fn test_approved_proposals_sorted_by_support() {
    let h = Harness::new(mn_list(1..=5));
    let a = proposal("a", NOW + 100_000);
    let b = proposal("b", NOW + 100_000);
    h.deliver_object(1, a.clone()).unwrap();
    h.deliver_object(1, b.clone()).unwrap();
    for seed in 1..=3 {
        h.deliver_vote(1, vote(seed, b.hash(), VoteSignal::Funding, VoteOutcome::Yes, NOW)).unwrap();
    }
    h.deliver_vote(1, vote(4, a.hash(), VoteSignal::Funding, VoteOutcome::Yes, NOW)).unwrap();

    let approved = h.manager.get_approved_proposals(None);
    assert_eq!(approved, vec![b.clone(), a]);
    assert_eq!(h.manager.get_approved_proposals(Some(3)), vec![b]);
}

#[test]
fn test_queries() {
    let h = Harness::new(mn_list(1..=3));
    let object = proposal("alpha", NOW + 100_000);
    let hash = object.hash();
    h.deliver_object(1, object.clone()).unwrap();
    let v = vote(1, hash, VoteSignal::Funding, VoteOutcome::Yes, NOW);
    h.deliver_vote(1, v.clone()).unwrap();

    let bytes = h.manager.serialize_object_for_hash(&hash).unwrap();
    assert_eq!(bincode::deserialize::<rusty_shared_types::GovernanceObject>(&bytes).unwrap(), object);
    let bytes = h.manager.serialize_vote_for_hash(&v.hash()).unwrap();
    assert_eq!(bincode::deserialize::<GovernanceVote>(&bytes).unwrap(), v);
    assert!(h.manager.serialize_vote_for_hash(&dummy_hash(1)).is_none());

    assert_eq!(h.manager.find_object_by_data_hash(&object.data_hash()), Some(object.clone()));
    assert_eq!(h.manager.all_newer_than(NOW), vec![object.clone()]);
    assert!(h.manager.all_newer_than(NOW + 1).is_empty());

    let stats = h.manager.stats();
    assert_eq!(stats.proposals, 1);
    assert_eq!(stats.votes, 1);
    assert_eq!(stats.to_json()["votes"], 1);
}
