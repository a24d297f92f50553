//! End-to-end scenario tests covering the runtime's core behaviors.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slog::Logger;

use actorrt::{Actor, Context, Core, RouterBuilder, RuntimeError, TimerConfiguration};

fn discard_log() -> Logger {
    Logger::root(slog::Discard, slog::o!())
}

fn root_context() -> Context {
    let core = Core::new(discard_log());
    Context::root(core, discard_log())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct DataMessage {
    data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UnhandledMessage;

struct EchoActor;

#[async_trait]
impl Actor for EchoActor {
    fn register_handlers(builder: &mut RouterBuilder<Self>) {
        builder
            .add::<DataMessage, _, _, _>("DataMessage", |_actor, _ctx, msg: DataMessage| async move { Ok(msg.data) })
            .unwrap();
    }
}

/// Scenario 1: create & tell.
#[tokio::test]
async fn create_and_tell_returns_payload() {
    let ctx = root_context();
    let proxy = ctx.create_actor("dummy", EchoActor, vec![]).await.unwrap();
    let reply: String = proxy.ask(&ctx, DataMessage { data: "test".into() }).await.unwrap();
    assert_eq!(reply, "test");
}

/// Scenario 2: unhandled ask.
#[tokio::test]
async fn ask_with_unregistered_type_is_unhandled() {
    let ctx = root_context();
    let proxy = ctx.create_actor("dummy", EchoActor, vec![]).await.unwrap();
    let err = proxy.ask::<_, String>(&ctx, UnhandledMessage).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Unhandled(_)));
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Tick;

struct TimerActor {
    ticks: Arc<AtomicUsize>,
}

#[async_trait]
impl Actor for TimerActor {
    fn register_handlers(builder: &mut RouterBuilder<Self>) {
        builder
            .add::<Tick, _, _, _>("Tick", |actor, _ctx, _msg: Tick| async move {
                actor.ticks.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
    }

    async fn initialize(&mut self, ctx: &Context) -> actorrt::Result<()> {
        let config = TimerConfiguration::new(Tick, Duration::from_millis(100))
            .with_now(true)
            .with_repetitions(5);
        ctx.create_timer("tick", config).await
    }
}

/// Scenario 3: timer now + repetitions.
#[tokio::test]
async fn timer_now_and_repetitions_deliver_exact_count() {
    let ctx = root_context();
    let ticks = Arc::new(AtomicUsize::new(0));
    let actor = TimerActor { ticks: ticks.clone() };
    let proxy = ctx.create_actor("timed", actor, vec![]).await.unwrap();
    proxy.wait_until_initialized().await.unwrap();

    tokio::time::sleep(Duration::from_millis(550)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 5);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResultMessage {
    result: String,
}

struct ActletActor {
    last_result: Arc<std::sync::Mutex<Option<String>>>,
}

#[async_trait]
impl Actor for ActletActor {
    fn register_handlers(builder: &mut RouterBuilder<Self>) {
        builder
            .add::<ResultMessage, _, _, _>("ResultMessage", |actor, _ctx, msg: ResultMessage| async move {
                *actor.last_result.lock().unwrap() = Some(msg.result);
                Ok(())
            })
            .unwrap();
    }

    async fn initialize(&mut self, ctx: &Context) -> actorrt::Result<()> {
        ctx.create_actlet("work", (), |_ctx, _owner, _cfg: ()| async move {
            Ok(ResultMessage { result: "work".into() })
        })
        .await
    }
}

/// Scenario 4: actlet-done chains the result back to the owning actor.
#[tokio::test]
async fn actlet_completion_chains_result_back_to_owner() {
    let ctx = root_context();
    let last_result = Arc::new(std::sync::Mutex::new(None));
    let actor = ActletActor {
        last_result: last_result.clone(),
    };
    let proxy = ctx.create_actor("worker", actor, vec![]).await.unwrap();
    proxy.wait_until_initialized().await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(last_result.lock().unwrap().as_deref(), Some("work"));
}

/// Scenario 5: hierarchical ids, relative and absolute.
#[tokio::test]
async fn hierarchical_ids_compose_and_absolute_overrides() {
    let ctx = root_context();
    let parent = ctx.create_actor("actor", EchoActor, vec![]).await.unwrap();
    let parent_ctx = ctx.with_identity(parent.identity().clone());

    let child = parent_ctx.create_actor("actor", EchoActor, vec![]).await.unwrap();
    assert_eq!(child.identity().as_str(), "/actor/actor");

    let abs = parent_ctx.create_actor("/abs/actor", EchoActor, vec![]).await.unwrap();
    assert_eq!(abs.identity().as_str(), "/abs/actor");
}

/// Scenario 6: duplicate id rejected, registry size stays 1.
#[tokio::test]
async fn duplicate_id_is_rejected() {
    let ctx = root_context();
    ctx.create_actor("/dup", EchoActor, vec![]).await.unwrap();
    let err = ctx.create_actor("/dup", EchoActor, vec![]).await.unwrap_err();
    assert!(matches!(err, RuntimeError::DuplicateId(_)));
    assert!(ctx.get_proxy("/dup").is_ok());
}

/// After shutdown, create_actor raises NotRunning.
#[tokio::test]
async fn shutdown_then_create_actor_is_not_running() {
    let core = Core::new(discard_log());
    let ctx = Context::root(core.clone(), discard_log());
    ctx.create_actor("dummy", EchoActor, vec![]).await.unwrap();
    core.shutdown().await;
    let err = ctx.create_actor("other", EchoActor, vec![]).await.unwrap_err();
    assert!(matches!(err, RuntimeError::NotRunning));
}
