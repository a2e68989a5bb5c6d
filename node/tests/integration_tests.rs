//! Integration tests exercising the full poll pipeline:
//! request → post → LMDB persistence → votes → sweep → announcement → leaderboard.
//!
//! These tests wire together components that are normally only connected
//! inside `runtime.rs`, verifying the system works end-to-end against a real
//! LMDB environment, not just the in-memory store.

use std::sync::Arc;

use foul_engine::{EngineConfig, PollEngine, PollRequest};
use foul_node::{
    open_storage, reset_storage, BotConfig, BotRuntime, RecordingNotifier, TickReport, VoteIntent,
    LAST_RESET_KEY,
};
use foul_nullables::NullClock;
use foul_store::{MetaStore, PollStore};
use foul_store_lmdb::LmdbEnvironment;
use foul_types::{ChannelId, LeaderboardEntry, MemberId, MessageId, PollOutcome, Timestamp};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config(dir: &tempfile::TempDir) -> BotConfig {
    BotConfig {
        data_dir: dir.path().join("db"),
        map_size_mb: 16,
        poll_duration_secs: 0,
        show_votes_probability: 1.0,
        ..BotConfig::default()
    }
}

fn request(creator: &str, gainers: &[&str], points: i64) -> PollRequest {
    PollRequest {
        channel_id: ChannelId::new("general"),
        creator_id: MemberId::new(creator),
        gainer_ids: gainers.iter().map(|g| MemberId::new(*g)).collect(),
        points,
        reason: "demo".into(),
    }
}

fn member(id: &str) -> MemberId {
    MemberId::new(id)
}

// ---------------------------------------------------------------------------
// 1. Runtime round-trip
// ---------------------------------------------------------------------------

#[tokio::test]
async fn runtime_resolves_and_ranks_polls() {
    let dir = tempfile::tempdir().expect("temp dir");
    let notifier = Arc::new(RecordingNotifier::new());
    let runtime = BotRuntime::open(config(&dir), Arc::clone(&notifier)).expect("open runtime");
    let bot = runtime.bot();

    let poll = bot
        .on_create_request(request("creator", &["u1", "u1", "u2"], 5))
        .await
        .unwrap();
    for (voter, in_favor) in [("u3", true), ("u4", false), ("u5", true)] {
        bot.on_vote_intent(VoteIntent {
            poll: poll.key.clone(),
            voter_id: member(voter),
            in_favor,
        })
        .await
        .unwrap();
    }

    assert_eq!(
        runtime.scheduler().tick().await,
        TickReport::Swept { resolved: 1 }
    );
    assert_eq!(runtime.scheduler().tick().await, TickReport::Swept { resolved: 0 });

    let resolved = notifier.resolved();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].message.title, "Passed");
    assert_eq!(notifier.controls_removed(), vec![poll.key.clone()]);

    let year = Timestamp::now().year();
    let view = bot
        .on_leaderboard_request(&ChannelId::new("general"), &member("u9"), Some(year))
        .await
        .unwrap();
    assert_eq!(
        view.rows,
        vec![
            LeaderboardEntry::new(member("u1"), 5),
            LeaderboardEntry::new(member("u2"), 5),
        ]
    );
}

#[tokio::test]
async fn polls_survive_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut cfg = config(&dir);
    cfg.poll_duration_secs = 3600;

    let key = {
        let runtime =
            BotRuntime::open(cfg.clone(), Arc::new(RecordingNotifier::new())).expect("open");
        let poll = runtime
            .bot()
            .on_create_request(request("creator", &["u1"], -2))
            .await
            .unwrap();
        poll.key
    };

    let runtime = BotRuntime::open(cfg, Arc::new(RecordingNotifier::new())).expect("reopen");
    let store = runtime.environment().poll_store();
    let poll = store.get_poll(&key).unwrap().expect("poll persisted");
    assert_eq!(poll.points, -2);
    assert_eq!(poll.outcome, PollOutcome::Pending);
    assert_eq!(runtime.scheduler().tick().await, TickReport::Swept { resolved: 0 });
}

#[tokio::test]
async fn runtime_start_and_stop() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut runtime =
        BotRuntime::open(config(&dir), Arc::new(RecordingNotifier::new())).expect("open");
    runtime.start();
    runtime.stop().await.expect("clean stop");
}

// ---------------------------------------------------------------------------
// 2. Storage lifecycle
// ---------------------------------------------------------------------------

#[test]
fn existing_dir_without_data_file_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let cfg = BotConfig {
        data_dir: dir.path().to_path_buf(),
        ..config(&dir)
    };
    assert!(open_storage(&cfg).is_err());
}

#[test]
fn reset_drops_polls_and_records_time() {
    let dir = tempfile::tempdir().expect("temp dir");
    let env = open_storage(&config(&dir)).expect("open storage");
    let engine = PollEngine::new(
        Arc::new(env.poll_store()),
        NullClock::new(1_700_000_000),
        EngineConfig::default(),
    );
    engine
        .create_poll_now(request("creator", &["u1"], 1), MessageId::new("m1"))
        .unwrap();

    let dropped = reset_storage(&env, Timestamp::new(42)).unwrap();
    assert_eq!(dropped, 1);
    assert_eq!(env.poll_store().poll_count().unwrap(), 0);
    assert_eq!(
        env.meta_store().get_meta(LAST_RESET_KEY).unwrap(),
        42u64.to_be_bytes().to_vec()
    );
}

// ---------------------------------------------------------------------------
// 3. Engine scenarios against LMDB
// ---------------------------------------------------------------------------

fn lmdb_engine(
    dir: &tempfile::TempDir,
) -> (PollEngine<foul_store_lmdb::LmdbPollStore, NullClock>, NullClock) {
    let env = LmdbEnvironment::open(&dir.path().join("db"), 8, 16 << 20).expect("open env");
    let clock = NullClock::new(1_700_000_000);
    let engine = PollEngine::new(
        Arc::new(env.poll_store()),
        clock.clone(),
        EngineConfig {
            poll_duration_secs: 60,
        },
    );
    (engine, clock)
}

#[test]
fn tie_fails_then_extra_vote_would_have_passed() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (engine, clock) = lmdb_engine(&dir);

    let tied = engine
        .create_poll_now(request("creator", &["u1"], 5), MessageId::new("m1"))
        .unwrap();
    engine.record_vote(&tied.key, &member("u2"), true).unwrap();
    engine.record_vote(&tied.key, &member("u3"), false).unwrap();

    let passing = engine
        .create_poll_now(request("creator", &["u1"], 5), MessageId::new("m2"))
        .unwrap();
    engine.record_vote(&passing.key, &member("u2"), true).unwrap();
    engine.record_vote(&passing.key, &member("u3"), false).unwrap();
    engine.record_vote(&passing.key, &member("u4"), true).unwrap();

    clock.advance(60);
    let resolved = engine.evaluate_expired_polls().unwrap();
    assert_eq!(resolved.len(), 2);
    let outcome_of = |msg: &str| {
        resolved
            .iter()
            .find(|e| e.poll.key.message_id.as_str() == msg)
            .map(|e| e.poll.outcome)
    };
    assert_eq!(outcome_of("m1"), Some(PollOutcome::Failed));
    assert_eq!(outcome_of("m2"), Some(PollOutcome::Passed));

    let board = engine.leaderboard(engine.current_year()).unwrap();
    assert_eq!(board, vec![LeaderboardEntry::new(member("u1"), 5)]);
}

#[test]
fn changed_vote_counts_only_last_side() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (engine, clock) = lmdb_engine(&dir);
    let poll = engine
        .create_poll_now(request("creator", &["u1"], 5), MessageId::new("m1"))
        .unwrap();
    engine.record_vote(&poll.key, &member("u2"), true).unwrap();
    engine.record_vote(&poll.key, &member("u2"), false).unwrap();

    clock.advance(60);
    let resolved = engine.evaluate_expired_polls().unwrap();
    assert!(resolved[0].votes_for.is_empty());
    assert_eq!(resolved[0].votes_against, vec![member("u2")]);
}

#[test]
fn zero_points_leaves_lmdb_untouched() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (engine, _) = lmdb_engine(&dir);
    assert!(engine
        .create_poll_now(request("creator", &["u1"], 0), MessageId::new("m1"))
        .is_err());
    assert_eq!(engine.store().poll_count().unwrap(), 0);
}

// ---------------------------------------------------------------------------
// 4. Concurrent sweeps against LMDB
// ---------------------------------------------------------------------------

#[test]
fn parallel_sweeps_resolve_each_poll_once() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (engine, clock) = lmdb_engine(&dir);
    let engine = Arc::new(engine);
    for i in 0..12 {
        let poll = engine
            .create_poll_now(request("creator", &["u1"], 1), MessageId::new(format!("m{i}")))
            .unwrap();
        if i % 2 == 0 {
            engine.record_vote(&poll.key, &member("v"), true).unwrap();
        }
    }
    clock.advance(60);

    let sweepers: Vec<_> = (0..6)
        .map(|_| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || engine.evaluate_expired_polls().unwrap())
        })
        .collect();
    let mut resolved: Vec<String> = sweepers
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .map(|e| e.poll.key.message_id.as_str().to_string())
        .collect();
    assert_eq!(resolved.len(), 12);
    resolved.sort();
    resolved.dedup();
    assert_eq!(resolved.len(), 12);
    assert!(engine.evaluate_expired_polls().unwrap().is_empty());
    let board = engine.leaderboard(engine.current_year()).unwrap();
    assert_eq!(board, vec![LeaderboardEntry::new(member("u1"), 6)]);
}

#[test]
fn votes_racing_a_sweep_leave_one_consistent_outcome() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (engine, clock) = lmdb_engine(&dir);
    let engine = Arc::new(engine);
    let poll = engine
        .create_poll_now(request("creator", &["u1"], 4), MessageId::new("m1"))
        .unwrap();
    clock.advance(60);

    let voter = {
        let engine = Arc::clone(&engine);
        let key = poll.key.clone();
        std::thread::spawn(move || {
            for i in 0..100 {
                engine
                    .record_vote(&key, &MemberId::new(format!("v{i}")), true)
                    .unwrap();
            }
        })
    };
    let sweeper = {
        let engine = Arc::clone(&engine);
        std::thread::spawn(move || {
            (0..10)
                .flat_map(|_| engine.evaluate_expired_polls().unwrap())
                .collect::<Vec<_>>()
        })
    };
    voter.join().unwrap();
    let evaluated = sweeper.join().unwrap();
    let evaluated = if evaluated.is_empty() {
        engine.evaluate_expired_polls().unwrap()
    } else {
        evaluated
    };

    assert_eq!(evaluated.len(), 1);
    let outcome = evaluated[0].poll.outcome;
    assert_eq!(
        engine.store().get_poll(&poll.key).unwrap().unwrap().outcome,
        outcome
    );
    let expected = if evaluated[0].votes_for.is_empty() {
        PollOutcome::Failed
    } else {
        PollOutcome::Passed
    };
    assert_eq!(outcome, expected);
}
