use durocache_actor::{
    ActorCommand, ActorError, ActorHandle, ProfileActor, ServerMessage, Session, TokioClock, spawn_actor,
};
use durocache_storage::{DurableStore, MemoryStore, PendingLog};
use durocache_sync::{DrainOutcome, MemoryTarget, SYNC_INTERVAL, SchedulerConfig, SchedulerState};
use durocache_types::{Clock, Profile};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

const START: i64 = 1_700_000_000_000;
const INTERVAL_MS: i64 = SYNC_INTERVAL.as_millis() as i64;

struct Running {
    store: Arc<MemoryStore>,
    clock: TokioClock,
    target: Arc<MemoryTarget>,
    handle: ActorHandle,
    task: JoinHandle<()>,
}

fn start(store: Arc<MemoryStore>, target: Arc<MemoryTarget>) -> Running {
    let clock = TokioClock::anchored_at(START);
    let actor = ProfileActor::new(
        "u1",
        store.clone(),
        Arc::new(clock),
        target.clone(),
        SchedulerConfig::default(),
    )
    .unwrap();
    let (handle, task) = spawn_actor(actor, Arc::new(clock), 16);
    Running {
        store,
        clock,
        target,
        handle,
        task,
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("durocache_actor=debug,durocache_sync=debug"))
        .with_test_writer()
        .try_init();
}

fn fresh() -> Running {
    start(Arc::new(MemoryStore::new()), Arc::new(MemoryTarget::new()))
}

fn update(name: &str, ts: i64) -> String {
    json!({
        "type": "update_profile",
        "profile": Profile::new("u1", json!({ "name": name }), ts),
    })
    .to_string()
}

#[tokio::test(start_paused = true)]
async fn connected_session_receives_profile_then_broadcasts() {
    let r = fresh();
    let (session, mut rx) = Session::channel("u1");
    let id = session.id;
    r.handle.connect(session).await.unwrap();

    let frame: ServerMessage = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert!(matches!(frame, ServerMessage::Profile { .. }));

    r.handle.message(id, update("Ada", START)).await.unwrap();
    let frame: ServerMessage = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    match frame {
        ServerMessage::ProfileUpdated { profile } => assert_eq!(profile.data["name"], "Ada"),
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn alarm_fires_one_interval_after_first_write() {
    init_tracing();
    let r = fresh();
    let (session, _rx) = Session::channel("u1");
    let id = session.id;
    r.handle.connect(session).await.unwrap();
    r.handle.message(id, update("Ada", START)).await.unwrap();
    r.handle.message(id, update("Grace", START)).await.unwrap();

    let stats = r.handle.stats().await.unwrap();
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.alarm, Some(START + INTERVAL_MS));

    tokio::time::sleep(SYNC_INTERVAL - Duration::from_millis(1)).await;
    assert!(r.target.batches().is_empty());

    tokio::time::sleep(Duration::from_millis(2)).await;
    let stats = r.handle.stats().await.unwrap();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.alarm, None);
    assert_eq!(stats.state, SchedulerState::Idle);

    let batches = r.target.batches();
    assert_eq!(batches.len(), 1);
    let names: Vec<_> = batches[0].iter().map(|p| p.data["name"].clone()).collect();
    assert_eq!(names, vec![json!("Ada"), json!("Grace")]);
}

#[tokio::test(start_paused = true)]
async fn failed_sync_is_retried_on_the_next_alarm() {
    init_tracing();
    let r = fresh();
    r.target.fail_next(1);
    let (session, _rx) = Session::channel("u1");
    let id = session.id;
    r.handle.connect(session).await.unwrap();
    r.handle.message(id, update("Ada", START)).await.unwrap();

    tokio::time::sleep(SYNC_INTERVAL + Duration::from_millis(1)).await;
    let stats = r.handle.stats().await.unwrap();
    assert_eq!(stats.pending, 1);
    let retry_at = stats.alarm.unwrap();
    assert!(retry_at >= START + 2 * INTERVAL_MS);
    assert!(r.target.batches().is_empty());

    tokio::time::sleep(SYNC_INTERVAL + Duration::from_millis(10)).await;
    let stats = r.handle.stats().await.unwrap();
    assert_eq!(stats.pending, 0);
    assert_eq!(r.target.synced_profiles().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn force_sync_drains_without_waiting() {
    let r = fresh();
    let (session, _rx) = Session::channel("u1");
    let id = session.id;
    r.handle.connect(session).await.unwrap();
    r.handle.message(id, update("Ada", START)).await.unwrap();

    let outcome = r.handle.force_sync().await.unwrap();
    assert_eq!(
        outcome,
        DrainOutcome::Synced {
            count: 1,
            remaining: 0
        }
    );
    assert_eq!(r.handle.force_sync().await.unwrap(), DrainOutcome::Empty);
    assert_eq!(r.clock.now_millis(), START);
}

#[tokio::test(start_paused = true)]
async fn restart_recovers_stranded_intents_before_serving() {
    let store = Arc::new(MemoryStore::new());
    let clock = TokioClock::anchored_at(START);
    let mut log = PendingLog::open(store.clone(), Arc::new(clock)).unwrap();
    log.append(&Profile::new("u1", json!({ "name": "Left" }), START))
        .unwrap();
    store.set_alarm(START + INTERVAL_MS).unwrap();

    let r = start(store, Arc::new(MemoryTarget::new()));
    let stats = r.handle.stats().await.unwrap();

    assert_eq!(stats.pending, 0);
    assert_eq!(stats.alarm, None);
    assert_eq!(r.target.synced_profiles()[0].data["name"], "Left");
}

#[tokio::test(start_paused = true)]
async fn shutdown_flushes_pending_writes() {
    let r = fresh();
    let (session, mut rx) = Session::channel("u1");
    let id = session.id;
    r.handle.connect(session).await.unwrap();
    r.handle.message(id, update("Ada", START)).await.unwrap();

    r.handle.shutdown().await.unwrap();
    r.task.await.unwrap();

    assert_eq!(r.target.synced_profiles().len(), 1);
    assert_eq!(r.store.get_alarm().unwrap(), None);
    assert!(r.handle.is_closed());
    assert!(matches!(
        r.handle.stats().await.unwrap_err(),
        ActorError::MailboxClosed
    ));

    // Profile, then the broadcast, then the channel closes with the actor.
    assert!(rx.recv().await.is_some());
    assert!(rx.recv().await.is_some());
    assert!(rx.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn failed_shutdown_flush_keeps_the_alarm_for_the_next_start() {
    let store = Arc::new(MemoryStore::new());
    let target = Arc::new(MemoryTarget::new());
    let r = start(store.clone(), target.clone());
    target.fail_next(1);
    let (session, _rx) = Session::channel("u1");
    let id = session.id;
    r.handle.connect(session).await.unwrap();
    r.handle.message(id, update("Ada", START)).await.unwrap();

    r.handle.shutdown().await.unwrap();
    r.task.await.unwrap();
    assert!(store.get_alarm().unwrap().is_some());

    let r = start(store, target);
    let stats = r.handle.stats().await.unwrap();
    assert_eq!(stats.pending, 0);
    assert_eq!(r.target.synced_profiles().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn abandoned_replies_do_not_stop_the_runtime() {
    let r = fresh();

    let (reply, rx) = tokio::sync::oneshot::channel();
    drop(rx);
    r.handle.send(ActorCommand::Stats { reply }).await.unwrap();
    let (reply, rx) = tokio::sync::oneshot::channel();
    drop(rx);
    r.handle.send(ActorCommand::ForceSync { reply }).await.unwrap();

    let stats = r.handle.stats().await.unwrap();
    assert_eq!(stats.entity_id, "u1");
    assert!(!r.handle.is_closed());
}

#[tokio::test(start_paused = true)]
async fn runtime_stops_when_every_handle_is_dropped() {
    let r = fresh();
    drop(r.handle);
    r.task.await.unwrap();
}
