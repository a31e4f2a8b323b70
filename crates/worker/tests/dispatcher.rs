//! Dispatcher cycles against a real schema with unconfigured providers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use myteacher_core::comment::EVENT_TYPES;
use myteacher_core::generation::AvatarGenerationStatus;
use myteacher_db::models::avatar::CreateTeacherAvatar;
use myteacher_db::repositories::{AvatarCommentRepo, AvatarRepo, TokenRepo};
use myteacher_events::bus::EVENT_AVATAR_GENERATION_COMPLETED;
use myteacher_events::EventBus;
use myteacher_pipeline::orchestrator::CellOutcome;
use myteacher_worker::config::WorkerConfig;
use myteacher_worker::dispatcher::GenerationDispatcher;
use myteacher_worker::services;
use sqlx::PgPool;

const LEASE: Duration = Duration::from_secs(600);

/// Move the avatar's claim past the lease.
async fn expire_claim(pool: &PgPool, avatar_id: i64) {
    sqlx::query(
        "UPDATE teacher_avatars \
         SET generation_claimed_at = NOW() - INTERVAL '1 hour' \
         WHERE id = $1",
    )
    .bind(avatar_id)
    .execute(pool)
    .await
    .unwrap();
}

/// No model versions and no chat key: every provider call fails fast.
fn offline_config() -> WorkerConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "postgres://unused"),
        ("STORAGE_BACKEND", "local"),
        ("LOCAL_STORAGE_PATH", "/tmp/myteacher-worker-test"),
        ("GENERATION_MAX_RETRIES", "1"),
        ("GENERATION_RETRY_DELAY_SECS", "0"),
    ]);
    WorkerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap()
}

async fn dispatcher(pool: &PgPool, bus: Arc<EventBus>) -> GenerationDispatcher {
    let orchestrator = services::orchestrator(&offline_config(), pool.clone(), bus)
        .await
        .unwrap();
    GenerationDispatcher::new(pool.clone(), Arc::new(orchestrator)).with_claim_lease(LEASE)
}

async fn create_pending_avatar(pool: &PgPool) -> (i64, i64) {
    let user_id: i64 =
        sqlx::query_scalar("INSERT INTO users (name, theme) VALUES ('tester', 'adult') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();
    let avatar = AvatarRepo::create(
        pool,
        &CreateTeacherAvatar {
            user_id,
            sex: "female".into(),
            hair_style: "long".into(),
            hair_color: "black".into(),
            eye_color: "brown".into(),
            clothing: "suit".into(),
            accessory: Some("glasses".into()),
            body_type: "slim".into(),
            tone: "gentle".into(),
            enthusiasm: "high".into(),
            formality: "polite".into(),
            humor: "medium".into(),
            is_chibi: false,
            is_transparent: false,
            draw_model_version: None,
            seed: 1234,
        },
    )
    .await
    .unwrap();
    (user_id, avatar.id)
}

#[sqlx::test(migrations = "../db/migrations")]
async fn nothing_pending_claims_nothing(pool: PgPool) {
    let dispatcher = dispatcher(&pool, Arc::new(EventBus::default())).await;
    assert!(dispatcher.dispatch_next().await.unwrap().is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn pending_avatar_runs_to_a_terminal_status(pool: PgPool) {
    let (user_id, avatar_id) = create_pending_avatar(&pool).await;
    let bus = Arc::new(EventBus::default());
    let mut events = bus.subscribe();
    let dispatcher = dispatcher(&pool, Arc::clone(&bus)).await;

    let report = dispatcher.dispatch_next().await.unwrap().unwrap();

    // Every cell was skipped and every comment fell back to its default.
    assert_eq!(report.status, AvatarGenerationStatus::Completed);
    assert_eq!(report.count(CellOutcome::Generated), 0);
    assert_eq!(report.total_tokens, 0);
    assert_eq!(report.comments.defaulted, EVENT_TYPES.len());

    let avatar = AvatarRepo::find_by_id(&pool, avatar_id).await.unwrap().unwrap();
    assert_eq!(avatar.status(), AvatarGenerationStatus::Completed);
    assert!(avatar.last_generated_at.is_some());

    let comments = AvatarCommentRepo::list_for_avatar(&pool, avatar_id).await.unwrap();
    assert_eq!(comments.len(), EVENT_TYPES.len());
    assert!(TokenRepo::list_transactions(&pool, user_id).await.unwrap().is_empty());

    let event = events.recv().await.unwrap();
    assert_eq!(event.event_type, EVENT_AVATAR_GENERATION_COMPLETED);

    // Claimed avatars are not picked up twice.
    assert!(dispatcher.dispatch_next().await.unwrap().is_none());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn regeneration_request_makes_the_avatar_claimable_again(pool: PgPool) {
    let (_, avatar_id) = create_pending_avatar(&pool).await;
    let dispatcher = dispatcher(&pool, Arc::new(EventBus::default())).await;

    dispatcher.dispatch_next().await.unwrap().unwrap();
    assert!(AvatarRepo::request_regeneration(&pool, avatar_id, LEASE).await.unwrap());

    let report = dispatcher.dispatch_next().await.unwrap().unwrap();
    assert_eq!(report.status, AvatarGenerationStatus::Completed);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn claim_left_by_an_aborted_dispatch_is_picked_up_after_the_lease(pool: PgPool) {
    let (_, avatar_id) = create_pending_avatar(&pool).await;
    let dispatcher = dispatcher(&pool, Arc::new(EventBus::default())).await;

    // Another worker claimed the avatar and went away before starting.
    AvatarRepo::claim_next_pending(&pool, LEASE).await.unwrap().unwrap();
    assert!(dispatcher.dispatch_next().await.unwrap().is_none());

    expire_claim(&pool, avatar_id).await;
    let report = dispatcher.dispatch_next().await.unwrap().unwrap();
    assert_eq!(report.status, AvatarGenerationStatus::Completed);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn orphaned_run_is_failed_and_can_be_queued_again(pool: PgPool) {
    let (_, avatar_id) = create_pending_avatar(&pool).await;
    let dispatcher = dispatcher(&pool, Arc::new(EventBus::default())).await;

    // A worker started the run and died.
    AvatarRepo::claim_next_pending(&pool, LEASE).await.unwrap().unwrap();
    AvatarRepo::set_status(&pool, avatar_id, AvatarGenerationStatus::Generating)
        .await
        .unwrap();
    assert!(dispatcher.recover_stale_runs().await.unwrap().is_empty());

    expire_claim(&pool, avatar_id).await;
    assert_eq!(dispatcher.recover_stale_runs().await.unwrap(), vec![avatar_id]);
    let avatar = AvatarRepo::find_by_id(&pool, avatar_id).await.unwrap().unwrap();
    assert_eq!(avatar.status(), AvatarGenerationStatus::Failed);

    assert!(AvatarRepo::request_regeneration(&pool, avatar_id, LEASE).await.unwrap());
    let report = dispatcher.dispatch_next().await.unwrap().unwrap();
    assert_eq!(report.status, AvatarGenerationStatus::Completed);
}
