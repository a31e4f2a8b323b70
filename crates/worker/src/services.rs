//! Construction of the concrete pipeline collaborators.

use std::sync::Arc;

use myteacher_cloud::{HttpImageFetcher, LocalImageStore, S3ImageStore};
use myteacher_core::catalog::GenerationCatalog;
use myteacher_core::mitigation::{MitigationEngine, MitigationRules};
use myteacher_db::DbPool;
use myteacher_events::EventBus;
use myteacher_openai::ChatClient;
use myteacher_pipeline::adapters::db::{
    DbArtifacts, DbAvatarStatus, DbComments, DbPricing, DbTokenLedger, DbUsageAudit,
};
use myteacher_pipeline::adapters::events::EventNotifier;
use myteacher_pipeline::ports::ImageStore;
use myteacher_pipeline::{AvatarGenerationOrchestrator, Collaborators};
use myteacher_replicate::api::ReplicateApi;
use myteacher_replicate::client::ReplicateClient;

use crate::config::{StorageSettings, WorkerConfig};

/// Build the configured image store.
pub async fn image_store(settings: &StorageSettings) -> Arc<dyn ImageStore> {
    match settings {
        StorageSettings::S3 { bucket, public_url } => {
            let store = S3ImageStore::from_env(bucket.clone(), public_url.clone()).await;
            tracing::info!(bucket = %store.bucket(), "Using S3 image storage");
            Arc::new(store)
        }
        StorageSettings::Local { path, public_url } => {
            tracing::info!(path = %path, "Using local image storage");
            Arc::new(LocalImageStore::new(path, public_url.clone()))
        }
    }
}

/// Wire every collaborator a run needs.
pub async fn collaborators(
    config: &WorkerConfig,
    pool: DbPool,
    event_bus: Arc<EventBus>,
) -> anyhow::Result<Collaborators> {
    let replicate = Arc::new(ReplicateClient::new(
        ReplicateApi::new(
            config.replicate_api_url.clone(),
            config.replicate_api_token.clone(),
        ),
        config.replicate_config(),
    ));
    if config.replicate_api_token.is_empty() {
        tracing::warn!("REPLICATE_API_TOKEN is not set, every generation will fail");
    }

    let chat = ChatClient::new(config.chat_config())?;
    tracing::info!(model = %chat.model(), "Chat client ready");

    Ok(Collaborators {
        generator: replicate.clone(),
        background_remover: replicate,
        pricing: Arc::new(DbPricing::new(pool.clone())),
        chat: Arc::new(chat),
        store: image_store(&config.storage).await,
        fetcher: Arc::new(HttpImageFetcher::new()?),
        artifacts: Arc::new(DbArtifacts::new(pool.clone())),
        comments: Arc::new(DbComments::new(pool.clone())),
        status: Arc::new(DbAvatarStatus::new(pool.clone())),
        audit: Arc::new(DbUsageAudit::new(pool.clone())),
        tokens: Arc::new(DbTokenLedger::new(pool)),
        notifier: Arc::new(EventNotifier::new(event_bus)),
    })
}

/// Build the orchestrator with the default catalog and mitigation rules.
pub async fn orchestrator(
    config: &WorkerConfig,
    pool: DbPool,
    event_bus: Arc<EventBus>,
) -> anyhow::Result<AvatarGenerationOrchestrator> {
    let collaborators = collaborators(config, pool, event_bus).await?;
    let mitigation = MitigationEngine::new(MitigationRules::default())?;
    Ok(AvatarGenerationOrchestrator::new(
        collaborators,
        GenerationCatalog::default(),
        mitigation,
        config.pipeline_config(),
    ))
}
