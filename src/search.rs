//! Catalog listing and hybrid recommendation.
//!
//! [`recommend`] is the read path shared by `ardf recommend` and
//! `POST /api/recommend`: it reads a candidate pool from the store and
//! hands it to the [`HybridRanker`]. Store failures propagate; embedding
//! failures never do (the ranker falls back to lexical scores).

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use ardf_core::{
    EmbeddingProvider, HybridRanker, ListQuery, RankOptions, Resource, ResourceStore, StoreError,
};

use crate::config::{Config, RankingConfig};
use crate::embedding::create_provider;
use crate::sqlite_store::SqliteStore;

/// A recommendation query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
    /// Restrict candidates to one `resource_type`.
    #[serde(default, rename = "type")]
    pub resource_type: Option<String>,
    /// Per-request semantic weight, overriding `[ranking].alpha`.
    #[serde(default)]
    pub alpha: Option<f64>,
}

impl RecommendRequest {
    /// Reject requests the ranker cannot serve meaningfully.
    pub fn validate(&self) -> Result<(), String> {
        if self.query.trim().is_empty() {
            return Err("query must not be empty".to_string());
        }
        if self.limit == Some(0) {
            return Err("limit must be >= 1".to_string());
        }
        if let Some(alpha) = self.alpha {
            if !(0.0..=1.0).contains(&alpha) {
                return Err("alpha must be in [0.0, 1.0]".to_string());
            }
        }
        Ok(())
    }

    fn rank_options(&self, ranking: &RankingConfig) -> RankOptions {
        RankOptions {
            limit: self.limit.unwrap_or(ranking.limit),
            alpha: self.alpha.unwrap_or(ranking.alpha),
        }
    }
}

/// One ranked resource with its score breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub resource: Resource,
    pub score: f64,
    pub lexical: f64,
    pub semantic: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendResponse {
    /// Resources matching the filter, before the candidate pool cut.
    pub total_candidates: usize,
    pub recommended: Vec<Recommendation>,
}

/// Rank the store's candidates for `request`.
pub async fn recommend(
    store: &dyn ResourceStore,
    ranker: &HybridRanker,
    ranking: &RankingConfig,
    request: &RecommendRequest,
) -> Result<RecommendResponse, StoreError> {
    let page = store
        .list_resources(&ListQuery {
            resource_type: request.resource_type.clone(),
            query: None,
            limit: Some(ranking.candidate_pool),
        })
        .await?;

    let ranked = ranker
        .rank(&request.query, page.resources, request.rank_options(ranking))
        .await;

    Ok(RecommendResponse {
        total_candidates: page.total,
        recommended: ranked
            .into_iter()
            .map(|r| Recommendation {
                resource: r.item,
                score: r.score,
                lexical: r.lexical,
                semantic: r.semantic,
            })
            .collect(),
    })
}

/// Build the ranker for the configured embedding provider.
pub fn build_ranker(config: &Config) -> Result<HybridRanker> {
    let embedder = create_provider(&config.embedding)?;
    info!(provider = embedder.name(), "using embedding provider for ranking");
    Ok(HybridRanker::new(Arc::new(embedder)))
}

/// CLI entry point for `ardf recommend`.
pub async fn run_recommend(config: &Config, request: RecommendRequest) -> Result<()> {
    if let Err(msg) = request.validate() {
        bail!(msg);
    }

    let ranker = build_ranker(config)?;
    let store = SqliteStore::open(config).await?;
    let response = recommend(&store, &ranker, &config.ranking, &request).await?;
    store.close().await;

    if response.recommended.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!(
        "{} recommendation(s) from {} candidate(s):",
        response.recommended.len(),
        response.total_candidates
    );
    println!();
    for (i, rec) in response.recommended.iter().enumerate() {
        println!(
            "{}. [{:.2}] {} ({})",
            i + 1,
            rec.score,
            rec.resource.resource_id,
            rec.resource.resource_type
        );
        println!(
            "    lexical: {:.0}  semantic: {:.3}",
            rec.lexical, rec.semantic
        );
        println!("    {}", rec.resource.description);
        println!();
    }

    Ok(())
}

/// CLI entry point for `ardf list`.
pub async fn run_list(config: &Config, query: ListQuery) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let page = store.list_resources(&query).await?;
    store.close().await;

    if page.resources.is_empty() {
        println!("No resources.");
        return Ok(());
    }

    println!(
        "{:<32} {:<10} {:<10} {:<20} DESCRIPTION",
        "RESOURCE_ID", "TYPE", "STATUS", "UPDATED"
    );
    for r in &page.resources {
        println!(
            "{:<32} {:<10} {:<10} {:<20} {}",
            r.resource_id,
            r.resource_type,
            r.status,
            r.updated_at.format("%Y-%m-%dT%H:%M:%SZ"),
            truncate(&r.description, 60)
        );
    }
    println!();
    println!("showing {} of {}", page.resources.len(), page.total);

    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ardf_core::store::memory::InMemoryStore;
    use ardf_core::{IdentityProvider, ProviderError, ResourceInput};
    use async_trait::async_trait;

    struct FailingProvider;

    #[async_trait]
    impl EmbeddingProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            Err(ProviderError::request("connection refused"))
        }
    }

    async fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        for (id, ty, desc) in [
            ("tool_pizza", "tool", "Order pizza from local restaurants"),
            ("tool_flight", "tool", "Book a flight with flexible fares"),
            ("prompt_flight", "prompt", "Summarize flight options"),
        ] {
            store
                .upsert_resource(ResourceInput::new(id, ty, desc))
                .await
                .unwrap();
        }
        store
    }

    fn request(query: &str) -> RecommendRequest {
        RecommendRequest {
            query: query.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_recommend_ranks_flight_first() {
        let store = seeded_store().await;
        let ranker = HybridRanker::new(Arc::new(IdentityProvider));
        let response = recommend(
            &store,
            &ranker,
            &RankingConfig::default(),
            &request("Help me book a flight"),
        )
        .await
        .unwrap();

        assert_eq!(response.total_candidates, 3);
        assert_eq!(response.recommended.len(), 3);
        assert_eq!(response.recommended[0].resource.resource_id, "tool_flight");
    }

    #[tokio::test]
    async fn test_recommend_filters_type_and_limits() {
        let store = seeded_store().await;
        let ranker = HybridRanker::new(Arc::new(FailingProvider));
        let mut req = request("flight");
        req.resource_type = Some("tool".to_string());
        req.limit = Some(1);

        let response = recommend(&store, &ranker, &RankingConfig::default(), &req)
            .await
            .unwrap();
        assert_eq!(response.total_candidates, 2);
        assert_eq!(response.recommended.len(), 1);
        assert_eq!(response.recommended[0].resource.resource_id, "tool_flight");
        assert_eq!(response.recommended[0].semantic, 0.0);
    }

    #[tokio::test]
    async fn test_recommend_alpha_override() {
        let store = seeded_store().await;
        let ranker = HybridRanker::new(Arc::new(FailingProvider));
        let mut req = request("flight");
        req.alpha = Some(0.0);

        let response = recommend(&store, &ranker, &RankingConfig::default(), &req)
            .await
            .unwrap();
        assert_eq!(response.recommended[0].score, 1.0);
    }

    #[test]
    fn test_validate() {
        assert!(request("  ").validate().is_err());
        assert!(request("flight").validate().is_ok());
        let mut req = request("flight");
        req.alpha = Some(1.5);
        assert!(req.validate().is_err());
        let mut req = request("flight");
        req.limit = Some(0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_request_deserializes_type_field() {
        let req: RecommendRequest =
            serde_json::from_str(r#"{"query": "flight", "type": "tool", "limit": 3}"#).unwrap();
        assert_eq!(req.resource_type.as_deref(), Some("tool"));
        assert_eq!(req.limit, Some(3));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }
}
