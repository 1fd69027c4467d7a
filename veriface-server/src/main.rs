//! Veriface Server - REST API for selfie/document identity verification
//!
//! Endpoints:
//! - POST /upload - Run a verification attempt (multipart: photo, document)
//! - GET  /dossier/{id} - Dossier status lookup
//! - POST /dossier/decision - Human review decision
//! - GET  /view/photo/{id}, /view/document/{id} - Stored artifacts
//! - GET  /health - Health check
//! - GET  /docs - Swagger UI

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use veriface_core::{
    DisabledEvaluator, EmbeddingExtractor, FingerprintExtractor, GeminiEvaluator, MatchEvaluator,
};
use veriface_server::notify::HttpNotifier;
use veriface_server::pipeline::{Pipeline, PipelineSettings};
use veriface_server::storage::ArtifactStore;
use veriface_server::store::{MemoryStore, NewRequester, PostgresStore, VerificationStore};
use veriface_server::{create_router, AppState, Config};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::from_env());

    let store: Arc<dyn VerificationStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            match PostgresStore::new(&url, config.database_max_connections).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to connect to database");
                    std::process::exit(1);
                }
            }
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using in-memory store (state lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    seed_default_requester(store.as_ref()).await;

    let extractor: Arc<dyn FingerprintExtractor> =
        Arc::new(EmbeddingExtractor::new(config.model_dir.clone()));

    let (evaluator, evaluator_configured): (Arc<dyn MatchEvaluator>, bool) = match &config
        .gemini_api_key
    {
        Some(key) => {
            match GeminiEvaluator::with_model(
                key.clone(),
                config.gemini_model.clone(),
                config.evaluator_timeout_secs,
            ) {
                Ok(evaluator) => (Arc::new(evaluator) as Arc<dyn MatchEvaluator>, true),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to build evaluator");
                    std::process::exit(1);
                }
            }
        }
        None => {
            tracing::warn!(
                "GEMINI_API_KEY not set, every dossier will escalate to human review"
            );
            (Arc::new(DisabledEvaluator), false)
        }
    };

    let artifacts = ArtifactStore::new(config.upload_dir.clone());
    let pipeline = Arc::new(Pipeline::new(
        store.clone(),
        artifacts.clone(),
        extractor,
        evaluator,
        Arc::new(HttpNotifier::new(config.notify_timeout_secs)),
        PipelineSettings {
            review_webhook_url: config.review_webhook_url.clone(),
            public_base_url: config.public_base_url.clone(),
            allow_redecision: config.allow_redecision,
        },
    ));

    let state = AppState {
        config: config.clone(),
        store,
        pipeline,
        artifacts,
        evaluator_configured,
    };

    let app = create_router(state);
    let addr = config.socket_addr();

    tracing::info!("Veriface server listening on http://{addr}");
    tracing::info!("Swagger UI available at http://{addr}/docs");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Failed to bind {addr}");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Register a requester from `API_KEY`/`CALLBACK_URL` when configured,
/// so a fresh in-memory deployment has a usable credential.
async fn seed_default_requester(store: &dyn VerificationStore) {
    let Ok(api_key) = std::env::var("API_KEY") else {
        return;
    };
    if api_key.is_empty() {
        return;
    }

    match store.requester_by_api_key(&api_key).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            let callback_url = std::env::var("CALLBACK_URL").ok().filter(|u| !u.is_empty());
            match store
                .create_requester(NewRequester {
                    name: "default".to_string(),
                    api_key,
                    callback_url,
                })
                .await
            {
                Ok(requester) => {
                    tracing::info!(requester_id = %requester.id, "Seeded default requester")
                }
                Err(e) => tracing::error!(error = %e, "Failed to seed default requester"),
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to look up default requester"),
    }
}
