//! End-to-end runs of the orchestrator against in-memory fakes.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::*;
use myteacher_core::catalog::{Expression, POSE_BUST, POSE_FULL_BODY};
use myteacher_core::comment::{
    build_comment_prompt, default_comment, scene_description, EVENT_TYPES,
};
use myteacher_core::generation::{AvatarGenerationStatus, TOKEN_CONSUME_REASON};
use myteacher_core::types::TokenAmount;
use myteacher_pipeline::orchestrator::CellOutcome;

const IMAGE_COST: TokenAmount = 5000;
const REMBG_COST: TokenAmount = 50;

fn comments_total(count: usize) -> TokenAmount {
    CHAT_COST * count as TokenAmount
}

fn is_bust(prompt: &str) -> bool {
    prompt.contains(BUST_MARKER)
}

// ---------------------------------------------------------------------------
// Pose matrix
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn non_chibi_renders_full_body_normal_and_five_bust_cells() {
    let h = Harness::new(FakeGenerator::always(Step::Image));
    let report = h.orchestrator().run(&job(profile(false, false))).await;

    let cells: Vec<_> = report.cells.iter().map(|(p, e, _)| (p.as_str(), *e)).collect();
    let mut expected = vec![(POSE_FULL_BODY, Expression::Normal)];
    expected.extend(Expression::ALL.iter().map(|e| (POSE_BUST, *e)));
    assert_eq!(cells, expected);
}

#[tokio::test(start_paused = true)]
async fn chibi_renders_all_expressions_on_full_body_only() {
    let h = Harness::new(FakeGenerator::always(Step::Image));
    let report = h.orchestrator().run(&job(profile(true, false))).await;

    let cells: Vec<_> = report.cells.iter().map(|(p, e, _)| (p.as_str(), *e)).collect();
    let expected: Vec<_> = Expression::ALL.iter().map(|e| (POSE_FULL_BODY, *e)).collect();
    assert_eq!(cells, expected);
    assert!(h.generator.calls().iter().all(|c| !is_bust(&c.prompt)));
    assert_eq!(h.artifacts.len(), 5);
}

// ---------------------------------------------------------------------------
// Scenario A: everything succeeds
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn successful_run_stores_every_cell_and_comment() {
    let h = Harness::new(FakeGenerator::always(Step::Image));
    let report = h.orchestrator().run(&job(profile(false, false))).await;

    assert_eq!(report.status, AvatarGenerationStatus::Completed);
    assert!(report.error.is_none());
    assert_eq!(report.count(CellOutcome::Generated), 6);
    assert_eq!(h.artifacts.len(), 6);

    let expected_total = 6 * IMAGE_COST + comments_total(EVENT_TYPES.len());
    assert_eq!(report.total_tokens, expected_total);
    assert_eq!(report.usage.len(), 6 + EVENT_TYPES.len());
    assert_eq!(
        report.usage.iter().map(|i| i.token_cost).sum::<TokenAmount>(),
        report.total_tokens
    );

    for event in EVENT_TYPES {
        let text = h.comments.get(event).unwrap();
        assert!(text.ends_with("番目のコメント"), "{event}: {text}");
        assert_eq!(text, text.trim());
    }

    let artifact = h.artifacts.get(POSE_BUST, Expression::Happy).unwrap();
    assert!(artifact.path.starts_with("avatars/7/bust_happy_"));
    assert!(artifact.path.ends_with(".png"));
    assert_eq!(artifact.url, format!("https://cdn.test/{}", artifact.path));

    assert_eq!(
        h.status.history(),
        vec![AvatarGenerationStatus::Generating, AvatarGenerationStatus::Completed]
    );
    assert_eq!(h.audit.records.lock().unwrap().len(), 6 + EVENT_TYPES.len());

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].succeeded);
    assert_eq!(sent[0].user_id, USER_ID);
    assert!(sent[0].body.contains(&expected_total.to_string()));
    assert!(sent[0].body.contains("default model"));
}

#[tokio::test(start_paused = true)]
async fn run_total_is_debited_once_with_itemized_usage() {
    let h = Harness::new(FakeGenerator::always(Step::Image));
    let report = h.orchestrator().run(&job(profile(false, false))).await;

    let charges = h.tokens.charges();
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0].amount, report.total_tokens);
    assert_eq!(charges[0].reason, TOKEN_CONSUME_REASON);
    assert_eq!(charges[0].usage, report.usage);
    assert_eq!(
        charges[0].idempotency_key,
        format!("avatar-generation:{AVATAR_ID}:{}", report.run_id)
    );
    assert_eq!(*h.tokens.balance.lock().unwrap(), 1_000_000 - report.total_tokens);
}

#[tokio::test(start_paused = true)]
async fn configured_model_drives_generation_and_pricing() {
    let h = Harness::new(FakeGenerator::always(Step::Image));
    let mut profile = profile(false, false);
    profile.draw_model_version = Some("animagine-xl-3.1".into());

    let report = h.orchestrator().run(&job(profile)).await;

    assert!(h
        .generator
        .calls()
        .iter()
        .all(|c| c.options.model == "animagine-xl-3.1"));
    assert_eq!(report.total_tokens, 6 * 2000 + comments_total(EVENT_TYPES.len()));
    assert!(h.notifier.sent()[0].body.contains("animagine-xl-3.1"));
}

#[tokio::test(start_paused = true)]
async fn image_line_items_name_pose_expression_and_model() {
    let h = Harness::new(FakeGenerator::always(Step::Image));
    let report = h.orchestrator().run(&job(profile(false, false))).await;

    let labels: Vec<_> = report
        .usage
        .iter()
        .filter(|i| i.pose_type.is_some())
        .map(|i| i.label.as_str())
        .collect();
    assert_eq!(labels[0], "全身画像（normal）（anything-v4.0）");
    assert_eq!(labels[1], "バストアップ画像（normal）（anything-v4.0）");
    assert_eq!(labels.len(), 6);

    let audit = h.audit.records.lock().unwrap();
    let details: Vec<_> = audit
        .iter()
        .filter(|r| r.image_size.is_some())
        .filter_map(|r| r.detail.as_deref())
        .collect();
    assert!(details.contains(&"full_body_normal"));
    assert!(details.contains(&"bust_happy"));
}

// ---------------------------------------------------------------------------
// Fallback substitution
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn exhausted_cell_reuses_normal_image_at_zero_cost() {
    let h = Harness::new(FakeGenerator::new(|prompt, options, _| {
        if is_bust(prompt) && options.expression == Expression::Happy {
            Step::Reject
        } else {
            Step::Image
        }
    }));
    let report = h.orchestrator().run(&job(profile(false, false))).await;

    assert_eq!(report.status, AvatarGenerationStatus::Completed);
    assert_eq!(report.count(CellOutcome::Substituted), 1);
    assert_eq!(
        h.artifacts.get(POSE_BUST, Expression::Happy),
        h.artifacts.get(POSE_BUST, Expression::Normal)
    );
    assert!(report
        .usage
        .iter()
        .all(|i| i.expression_type.as_deref() != Some("happy")));
    assert_eq!(
        report.total_tokens,
        5 * IMAGE_COST + comments_total(EVENT_TYPES.len())
    );
}

// ---------------------------------------------------------------------------
// Scenario B: exhausted cell without fallback
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn exhausted_cell_without_normal_image_is_skipped() {
    let h = Harness::new(FakeGenerator::new(|prompt, options, _| {
        let rejected = matches!(options.expression, Expression::Normal | Expression::Sad);
        if is_bust(prompt) && rejected {
            Step::Reject
        } else {
            Step::Image
        }
    }));
    let report = h.orchestrator().run(&job(profile(false, false))).await;

    assert_eq!(report.status, AvatarGenerationStatus::Completed);
    assert_eq!(report.count(CellOutcome::Skipped), 2);
    assert_eq!(report.count(CellOutcome::Generated), 4);
    assert!(h.artifacts.get(POSE_BUST, Expression::Normal).is_none());
    assert!(h.artifacts.get(POSE_BUST, Expression::Sad).is_none());
    assert_eq!(
        report.total_tokens,
        4 * IMAGE_COST + comments_total(EVENT_TYPES.len())
    );

    let bust_sad_calls = h
        .generator
        .calls()
        .iter()
        .filter(|c| is_bust(&c.prompt) && c.options.expression == Expression::Sad)
        .count();
    assert_eq!(bust_sad_calls, 3);
}

// ---------------------------------------------------------------------------
// Scenario C: background removal
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn transparent_cells_pay_for_removal_and_store_the_cutout() {
    let h = Harness::new(FakeGenerator::always(Step::Image));
    let report = h.orchestrator().run(&job(profile(false, true))).await;

    assert_eq!(h.remover.calls.lock().unwrap().len(), 6);
    let item = report
        .usage
        .iter()
        .find(|i| i.expression_type.as_deref() == Some("sad"))
        .unwrap();
    let breakdown = item.breakdown.unwrap();
    assert_eq!(breakdown.generation, IMAGE_COST);
    assert_eq!(breakdown.background_removal, REMBG_COST);
    assert_eq!(item.token_cost, IMAGE_COST + REMBG_COST);

    let objects = h.store.objects.lock().unwrap();
    assert!(objects
        .values()
        .all(|bytes| String::from_utf8_lossy(bytes).contains("-nobg")));
}

#[tokio::test(start_paused = true)]
async fn transparent_cells_are_labelled_and_audited_with_removal() {
    let h = Harness::new(FakeGenerator::always(Step::Image));
    let report = h.orchestrator().run(&job(profile(false, true))).await;

    let item = report
        .usage
        .iter()
        .find(|i| {
            i.pose_type.as_deref() == Some(POSE_BUST)
                && i.expression_type.as_deref() == Some("happy")
        })
        .unwrap();
    assert_eq!(item.label, "バストアップ画像（happy）（anything-v4.0 + rembg）");

    let audit = h.audit.records.lock().unwrap();
    let happy: Vec<_> = audit
        .iter()
        .filter(|r| r.detail.as_deref().is_some_and(|d| d.starts_with("bust_happy")))
        .map(|r| (r.model.as_str(), r.detail.as_deref().unwrap()))
        .collect();
    assert_eq!(
        happy,
        vec![("anything-v4.0", "bust_happy"), ("rembg", "bust_happy_transparent")]
    );
}

#[tokio::test(start_paused = true)]
async fn background_removal_failure_discards_the_cell() {
    let mut h = Harness::new(FakeGenerator::always(Step::Image));
    h.remover = Arc::new(FakeRemover::new(Some("bust-angry")));
    let report = h.orchestrator().run(&job(profile(false, true))).await;

    assert_eq!(report.status, AvatarGenerationStatus::Completed);
    assert_eq!(report.count(CellOutcome::Skipped), 1);
    assert!(h.artifacts.get(POSE_BUST, Expression::Angry).is_none());
    assert!(report
        .usage
        .iter()
        .all(|i| i.expression_type.as_deref() != Some("angry")));
    assert_eq!(
        report.total_tokens,
        5 * (IMAGE_COST + REMBG_COST) + comments_total(EVENT_TYPES.len())
    );

    let audit = h.audit.records.lock().unwrap();
    assert_eq!(audit.len(), 5 * 2 + EVENT_TYPES.len());
    assert_eq!(audit.iter().filter(|r| r.model == "rembg").count(), 5);
}

// ---------------------------------------------------------------------------
// Scenario D: comment fallback
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn failed_comment_uses_default_and_costs_nothing() {
    let mut h = Harness::new(FakeGenerator::always(Step::Image));
    h.chat = Arc::new(FakeChat::new(Some(scene_description("token_purchased"))));
    let report = h.orchestrator().run(&job(profile(false, false))).await;

    assert_eq!(report.status, AvatarGenerationStatus::Completed);
    assert_eq!(report.comments.defaulted, 1);
    assert_eq!(report.comments.generated, EVENT_TYPES.len() - 1);
    assert_eq!(
        h.comments.get("token_purchased").as_deref(),
        Some(default_comment("token_purchased"))
    );
    assert!(h.comments.get("login").unwrap().ends_with("番目のコメント"));
    assert!(report
        .usage
        .iter()
        .all(|i| i.event_type.as_deref() != Some("token_purchased")));
    assert_eq!(
        report.total_tokens,
        6 * IMAGE_COST + comments_total(EVENT_TYPES.len() - 1)
    );
}

#[tokio::test(start_paused = true)]
async fn comment_usage_records_the_prompt_sent() {
    let h = Harness::new(FakeGenerator::always(Step::Image));
    let profile = profile(false, false);
    h.orchestrator().run(&job(profile.clone())).await;

    let audit = h.audit.records.lock().unwrap();
    let comments: Vec<_> = audit.iter().filter(|r| r.image_size.is_none()).collect();
    assert_eq!(comments.len(), EVENT_TYPES.len());
    for record in comments {
        let event_type = record.detail.as_deref().unwrap();
        assert_eq!(record.request["event_type"], event_type);
        assert_eq!(
            record.request["prompt"],
            build_comment_prompt(&profile, event_type)
        );
    }
    assert!(h
        .chat
        .prompts
        .lock()
        .unwrap()
        .contains(&build_comment_prompt(&profile, "login")));
}

// ---------------------------------------------------------------------------
// Run-level failures
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn insufficient_balance_fails_the_run_but_keeps_artifacts() {
    let mut h = Harness::new(FakeGenerator::always(Step::Image));
    h.tokens = Arc::new(FakeTokens::with_balance(100));
    let report = h.orchestrator().run(&job(profile(false, false))).await;

    assert_eq!(report.status, AvatarGenerationStatus::Failed);
    assert_matches!(report.error.as_deref(), Some(e) if e.contains("Insufficient token balance"));
    assert_eq!(h.artifacts.len(), 6);
    assert!(h.tokens.charges().is_empty());
    assert_eq!(
        h.status.history(),
        vec![AvatarGenerationStatus::Generating, AvatarGenerationStatus::Failed]
    );

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].succeeded);
    assert!(sent[0].body.contains(&report.total_tokens.to_string()));
}

#[tokio::test(start_paused = true)]
async fn panic_inside_the_run_is_recorded_as_failure() {
    let h = Harness::new(FakeGenerator::always(Step::Panic));
    let report = h.orchestrator().run(&job(profile(false, false))).await;

    assert_eq!(report.status, AvatarGenerationStatus::Failed);
    assert_matches!(report.error.as_deref(), Some(e) if e.contains("generator exploded"));
    assert_eq!(
        h.status.history(),
        vec![AvatarGenerationStatus::Generating, AvatarGenerationStatus::Failed]
    );
    assert_eq!(h.notifier.sent().len(), 1);
    assert!(!h.notifier.sent()[0].succeeded);
}

#[tokio::test(start_paused = true)]
async fn audit_failures_never_fail_the_run() {
    let mut h = Harness::new(FakeGenerator::always(Step::Image));
    h.audit = Arc::new(FakeAudit {
        fail: true,
        ..Default::default()
    });
    let report = h.orchestrator().run(&job(profile(false, false))).await;

    assert_eq!(report.status, AvatarGenerationStatus::Completed);
    assert_eq!(h.tokens.charges().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausting_every_cell_still_completes_with_comments_only() {
    let h = Harness::new(FakeGenerator::always(Step::Reject));
    let start = tokio::time::Instant::now();
    let report = h.orchestrator().run(&job(profile(true, false))).await;

    assert_eq!(report.status, AvatarGenerationStatus::Completed);
    assert_eq!(report.count(CellOutcome::Skipped), 5);
    assert_eq!(report.total_tokens, comments_total(EVENT_TYPES.len()));
    assert_eq!(h.generator.calls().len(), 5 * 3);
    assert_eq!(start.elapsed(), RETRY_DELAY * 2 * 5);
}
