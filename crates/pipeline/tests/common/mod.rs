//! In-memory fakes of every pipeline port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use myteacher_core::catalog::{Expression, GenerationCatalog};
use myteacher_core::generation::AvatarGenerationStatus;
use myteacher_core::mitigation::{MitigationEngine, MitigationRules};
use myteacher_core::pricing;
use myteacher_core::profile::{CharacterProfile, Personality, Theme};
use myteacher_core::types::{DbId, TokenAmount};
use myteacher_pipeline::ports::*;
use myteacher_pipeline::{
    AvatarGenerationOrchestrator, Collaborators, GenerationJob, PipelineConfig, PortError,
};

pub const AVATAR_ID: DbId = 42;
pub const USER_ID: DbId = 7;
pub const SEED: i64 = 123_456;

/// Pose description fragment identifying bust prompts.
pub const BUST_MARKER: &str = "upper body portrait";

// ---------------------------------------------------------------------------
// Image generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Image,
    Reject,
    Fail,
    Panic,
}

#[derive(Debug, Clone)]
pub struct GenCall {
    pub prompt: String,
    pub options: GenerationOptions,
    pub at: tokio::time::Instant,
}

type GenRule = Box<dyn Fn(&str, &GenerationOptions, usize) -> Step + Send + Sync>;

/// Decides each call with `rule(prompt, options, call_index)`.
pub struct FakeGenerator {
    rule: GenRule,
    pub calls: Mutex<Vec<GenCall>>,
}

impl FakeGenerator {
    pub fn new(rule: impl Fn(&str, &GenerationOptions, usize) -> Step + Send + Sync + 'static) -> Self {
        Self {
            rule: Box::new(rule),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always(step: Step) -> Self {
        Self::new(move |_, _, _| step)
    }

    /// Steps in order; calls past the end produce images.
    pub fn scripted(steps: Vec<Step>) -> Self {
        Self::new(move |_, _, i| steps.get(i).copied().unwrap_or(Step::Image))
    }

    pub fn calls(&self) -> Vec<GenCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for FakeGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _seed: i64,
        options: &GenerationOptions,
    ) -> Result<Option<GenerationOutput>, PortError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(GenCall {
                prompt: prompt.to_string(),
                options: options.clone(),
                at: tokio::time::Instant::now(),
            });
            calls.len() - 1
        };
        match (self.rule)(prompt, options, index) {
            Step::Image => {
                let pose = if prompt.contains(BUST_MARKER) { "bust" } else { "full_body" };
                Ok(Some(GenerationOutput {
                    url: format!("https://replicate.test/{pose}-{}-{index}.png", options.expression),
                    prediction_id: format!("pred-{index}"),
                }))
            }
            Step::Reject => Ok(None),
            Step::Fail => Err(PortError::Unavailable("connection reset".into())),
            Step::Panic => panic!("generator exploded"),
        }
    }
}

/// Removes backgrounds by appending `-nobg`; URLs matching `fail_on` fail.
pub struct FakeRemover {
    pub fail_on: Option<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeRemover {
    pub fn new(fail_on: Option<&str>) -> Self {
        Self {
            fail_on: fail_on.map(str::to_string),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BackgroundRemover for FakeRemover {
    async fn remove_background(&self, image_url: &str) -> Result<Option<GenerationOutput>, PortError> {
        self.calls.lock().unwrap().push(image_url.to_string());
        if self.fail_on.as_deref().is_some_and(|f| image_url.contains(f)) {
            return Err(PortError::Unavailable("rembg failed".into()));
        }
        Ok(Some(GenerationOutput {
            url: image_url.replace(".png", "-nobg.png"),
            prediction_id: "rembg-1".into(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Pricing and audit
// ---------------------------------------------------------------------------

/// Fixed-table prices with the default chat rates.
pub struct FakePricing;

#[async_trait]
impl Pricing for FakePricing {
    async fn image_cost(&self, model: &str, size: &str, count: u32) -> TokenAmount {
        pricing::fallback_image_cost(model, size) * TokenAmount::from(count)
    }

    async fn chat_cost(&self, prompt_tokens: u32, completion_tokens: u32, _model: &str) -> TokenAmount {
        pricing::chat_cost_from_rates(
            prompt_tokens,
            completion_tokens,
            pricing::DEFAULT_CHAT_INPUT_RATE,
            pricing::DEFAULT_CHAT_OUTPUT_RATE,
        )
    }
}

#[derive(Default)]
pub struct FakeAudit {
    pub fail: bool,
    pub records: Mutex<Vec<UsageRecord>>,
}

#[async_trait]
impl UsageAudit for FakeAudit {
    async fn log_usage(&self, record: &UsageRecord) -> Result<(), PortError> {
        if self.fail {
            return Err(PortError::Unavailable("audit table locked".into()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Token usage reported for every fake reply: 3 + 2 tokens of cost.
pub const CHAT_USAGE: ChatUsage = ChatUsage {
    prompt_tokens: 100,
    completion_tokens: 20,
};
pub const CHAT_COST: TokenAmount = 5;

/// Replies `"  {n}番目のコメント  "`; prompts containing `fail_on` fail.
pub struct FakeChat {
    pub fail_on: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeChat {
    pub fn new(fail_on: Option<&str>) -> Self {
        Self {
            fail_on: fail_on.map(str::to_string),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatCompleter for FakeChat {
    async fn complete(&self, prompt: &str) -> Result<ChatReply, PortError> {
        let n = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };
        if self.fail_on.as_deref().is_some_and(|f| prompt.contains(f)) {
            return Err(PortError::Unavailable("chat API 503".into()));
        }
        Ok(ChatReply {
            text: format!("  {n}番目のコメント  "),
            usage: CHAT_USAGE,
        })
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeStore {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl ImageStore for FakeStore {
    async fn upload(&self, bytes: Vec<u8>, path: &str) -> Result<String, PortError> {
        self.objects.lock().unwrap().insert(path.to_string(), bytes);
        Ok(path.to_string())
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://cdn.test/{path}")
    }
}

/// Returns the URL's bytes as the image body.
pub struct FakeFetcher;

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PortError> {
        Ok(url.as_bytes().to_vec())
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Artifacts indexed by `(avatar, pose, expression)`.
#[derive(Default)]
pub struct FakeArtifacts {
    pub rows: Mutex<HashMap<(DbId, String, String), StoredArtifact>>,
}

impl FakeArtifacts {
    pub fn get(&self, pose: &str, expression: Expression) -> Option<StoredArtifact> {
        self.rows
            .lock()
            .unwrap()
            .get(&(AVATAR_ID, pose.to_string(), expression.as_str().to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl ArtifactRepository for FakeArtifacts {
    async fn find(
        &self,
        avatar_id: DbId,
        pose_type: &str,
        expression_type: &str,
    ) -> Result<Option<StoredArtifact>, PortError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(&(avatar_id, pose_type.to_string(), expression_type.to_string()))
            .cloned())
    }

    async fn upsert(
        &self,
        avatar_id: DbId,
        pose_type: &str,
        expression_type: &str,
        artifact: &StoredArtifact,
    ) -> Result<(), PortError> {
        self.rows.lock().unwrap().insert(
            (avatar_id, pose_type.to_string(), expression_type.to_string()),
            artifact.clone(),
        );
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeComments {
    pub rows: Mutex<HashMap<(DbId, String), String>>,
}

impl FakeComments {
    pub fn get(&self, event_type: &str) -> Option<String> {
        self.rows
            .lock()
            .unwrap()
            .get(&(AVATAR_ID, event_type.to_string()))
            .cloned()
    }
}

#[async_trait]
impl CommentRepository for FakeComments {
    async fn upsert(&self, avatar_id: DbId, event_type: &str, text: &str) -> Result<(), PortError> {
        self.rows
            .lock()
            .unwrap()
            .insert((avatar_id, event_type.to_string()), text.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStatus {
    pub history: Mutex<Vec<AvatarGenerationStatus>>,
}

impl FakeStatus {
    pub fn history(&self) -> Vec<AvatarGenerationStatus> {
        self.history.lock().unwrap().clone()
    }
}

#[async_trait]
impl AvatarStatusStore for FakeStatus {
    async fn set_status(&self, _avatar_id: DbId, status: AvatarGenerationStatus) -> Result<(), PortError> {
        self.history.lock().unwrap().push(status);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tokens and notifications
// ---------------------------------------------------------------------------

pub struct FakeTokens {
    pub balance: Mutex<TokenAmount>,
    pub charges: Mutex<Vec<TokenCharge>>,
}

impl FakeTokens {
    pub fn with_balance(balance: TokenAmount) -> Self {
        Self {
            balance: Mutex::new(balance),
            charges: Mutex::new(Vec::new()),
        }
    }

    pub fn charges(&self) -> Vec<TokenCharge> {
        self.charges.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenLedger for FakeTokens {
    async fn consume(&self, charge: &TokenCharge) -> Result<ChargeOutcome, PortError> {
        let mut charges = self.charges.lock().unwrap();
        if charges.iter().any(|c| c.idempotency_key == charge.idempotency_key) {
            return Ok(ChargeOutcome::AlreadyApplied);
        }
        let mut balance = self.balance.lock().unwrap();
        if *balance < charge.amount {
            return Ok(ChargeOutcome::InsufficientBalance { balance: *balance });
        }
        *balance -= charge.amount;
        charges.push(charge.clone());
        Ok(ChargeOutcome::Consumed {
            balance_after: *balance,
        })
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl FakeNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub generator: Arc<FakeGenerator>,
    pub remover: Arc<FakeRemover>,
    pub chat: Arc<FakeChat>,
    pub store: Arc<FakeStore>,
    pub artifacts: Arc<FakeArtifacts>,
    pub comments: Arc<FakeComments>,
    pub status: Arc<FakeStatus>,
    pub audit: Arc<FakeAudit>,
    pub tokens: Arc<FakeTokens>,
    pub notifier: Arc<FakeNotifier>,
}

impl Harness {
    pub fn new(generator: FakeGenerator) -> Self {
        Self {
            generator: Arc::new(generator),
            remover: Arc::new(FakeRemover::new(None)),
            chat: Arc::new(FakeChat::new(None)),
            store: Arc::new(FakeStore::default()),
            artifacts: Arc::new(FakeArtifacts::default()),
            comments: Arc::new(FakeComments::default()),
            status: Arc::new(FakeStatus::default()),
            audit: Arc::new(FakeAudit::default()),
            tokens: Arc::new(FakeTokens::with_balance(1_000_000)),
            notifier: Arc::new(FakeNotifier::default()),
        }
    }

    pub fn orchestrator(&self) -> AvatarGenerationOrchestrator {
        let collaborators = Collaborators {
            generator: self.generator.clone(),
            background_remover: self.remover.clone(),
            pricing: Arc::new(FakePricing),
            chat: self.chat.clone(),
            store: self.store.clone(),
            fetcher: Arc::new(FakeFetcher),
            artifacts: self.artifacts.clone(),
            comments: self.comments.clone(),
            status: self.status.clone(),
            audit: self.audit.clone(),
            tokens: self.tokens.clone(),
            notifier: self.notifier.clone(),
        };
        AvatarGenerationOrchestrator::new(
            collaborators,
            GenerationCatalog::default(),
            mitigation_engine(),
            PipelineConfig::default(),
        )
    }
}

pub fn mitigation_engine() -> MitigationEngine {
    MitigationEngine::new(MitigationRules::default()).unwrap()
}

pub const RETRY_DELAY: Duration = Duration::from_secs(3);

pub fn profile(is_chibi: bool, is_transparent: bool) -> CharacterProfile {
    CharacterProfile {
        sex: "female".into(),
        hair_style: "long".into(),
        hair_color: "black".into(),
        eye_color: "brown".into(),
        clothing: "suit".into(),
        accessory: Some("glasses".into()),
        body_type: "average".into(),
        personality: Personality {
            tone: "gentle".into(),
            enthusiasm: "high".into(),
            formality: "polite".into(),
            humor: "normal".into(),
        },
        is_chibi,
        is_transparent,
        draw_model_version: None,
        seed: SEED,
        theme: Theme::Adult,
    }
}

pub fn job(profile: CharacterProfile) -> GenerationJob {
    GenerationJob {
        avatar_id: AVATAR_ID,
        user_id: USER_ID,
        profile,
    }
}
