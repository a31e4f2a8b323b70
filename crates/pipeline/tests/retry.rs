//! GenerationRetrier: attempt bound, mitigation levels and delays.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{mitigation_engine, FakeGenerator, Step, RETRY_DELAY, SEED};
use myteacher_core::catalog::Expression;
use myteacher_pipeline::retry::GenerationRetrier;

const PROMPT: &str = "(surprised expression:1.3), wide open eyes, nsfw, 1girl, solo, teacher";

fn retrier(generator: &Arc<FakeGenerator>, max_retries: u32) -> GenerationRetrier {
    GenerationRetrier::new(
        generator.clone(),
        Arc::new(mitigation_engine()),
        max_retries,
        RETRY_DELAY,
    )
}

// ---------------------------------------------------------------------------
// Success paths
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn first_attempt_success_returns_immediately() {
    let generator = Arc::new(FakeGenerator::always(Step::Image));
    let start = tokio::time::Instant::now();

    let success = retrier(&generator, 3)
        .generate_with_retry(PROMPT, SEED, Expression::Surprised, "bust", "anything-v4.0")
        .await
        .unwrap();

    assert_eq!(success.attempt, 0);
    assert!(!success.mitigated);
    assert_eq!(success.prompt, PROMPT);
    assert_eq!(generator.calls().len(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);

    let call = &generator.calls()[0];
    assert_eq!(call.options.model, "anything-v4.0");
    assert_eq!(call.options.expression, Expression::Surprised);
}

#[tokio::test(start_paused = true)]
async fn rejection_retries_with_level_one_after_delay() {
    let generator = Arc::new(FakeGenerator::scripted(vec![Step::Reject, Step::Image]));
    let engine = mitigation_engine();
    let start = tokio::time::Instant::now();

    let success = retrier(&generator, 3)
        .generate_with_retry(PROMPT, SEED, Expression::Surprised, "bust", "anything-v4.0")
        .await
        .unwrap();

    let calls = generator.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].prompt, engine.mitigate(PROMPT, Expression::Surprised, 1));
    assert!(!calls[1].prompt.contains("nsfw"));
    assert_eq!(calls[1].at - calls[0].at, RETRY_DELAY);
    assert_eq!(success.attempt, 1);
    assert!(success.mitigated);
    assert_eq!(success.prompt, calls[1].prompt);
    assert_eq!(start.elapsed(), RETRY_DELAY);
}

// ---------------------------------------------------------------------------
// Exhaustion
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn exhaustion_stops_at_bound_without_final_sleep() {
    let generator = Arc::new(FakeGenerator::always(Step::Reject));
    let engine = mitigation_engine();
    let start = tokio::time::Instant::now();

    let result = retrier(&generator, 3)
        .generate_with_retry(PROMPT, SEED, Expression::Surprised, "bust", "anything-v4.0")
        .await;

    assert!(result.is_none());
    let prompts: Vec<_> = generator.calls().into_iter().map(|c| c.prompt).collect();
    assert_eq!(
        prompts,
        vec![
            PROMPT.to_string(),
            engine.mitigate(PROMPT, Expression::Surprised, 1),
            engine.mitigate(PROMPT, Expression::Surprised, 2),
        ]
    );
    // Two delays between three attempts, none after the last.
    assert_eq!(start.elapsed(), RETRY_DELAY * 2);
}

#[tokio::test(start_paused = true)]
async fn levels_are_capped_beyond_three() {
    let generator = Arc::new(FakeGenerator::always(Step::Reject));
    let engine = mitigation_engine();

    retrier(&generator, 5)
        .generate_with_retry(PROMPT, SEED, Expression::Happy, "bust", "anything-v4.0")
        .await;

    let calls = generator.calls();
    assert_eq!(calls.len(), 5);
    let level_three = engine.mitigate(PROMPT, Expression::Happy, 3);
    assert_eq!(calls[3].prompt, level_three);
    assert_eq!(calls[4].prompt, level_three);
}

#[tokio::test(start_paused = true)]
async fn zero_retries_never_calls_the_generator() {
    let generator = Arc::new(FakeGenerator::always(Step::Image));
    let result = retrier(&generator, 0)
        .generate_with_retry(PROMPT, SEED, Expression::Normal, "bust", "anything-v4.0")
        .await;
    assert!(result.is_none());
    assert!(generator.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Collaborator errors
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn errors_consume_attempts_without_mitigation_or_delay() {
    let generator = Arc::new(FakeGenerator::always(Step::Fail));
    let start = tokio::time::Instant::now();

    let result = retrier(&generator, 3)
        .generate_with_retry(PROMPT, SEED, Expression::Sad, "bust", "anything-v4.0")
        .await;

    assert!(result.is_none());
    let calls = generator.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|c| c.prompt == PROMPT));
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn error_then_success_keeps_the_original_prompt() {
    let generator = Arc::new(FakeGenerator::scripted(vec![Step::Fail, Step::Image]));

    let success = retrier(&generator, 3)
        .generate_with_retry(PROMPT, SEED, Expression::Sad, "bust", "anything-v4.0")
        .await
        .unwrap();

    assert_eq!(success.attempt, 1);
    assert!(!success.mitigated);
    assert_eq!(success.prompt, PROMPT);
}
