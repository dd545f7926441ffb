//! Hybrid ranking engine: lexical containment plus embedding similarity.
//!
//! The ranker operates on any candidate type exposing a description
//! ([`Describe`]) and a shared [`EmbeddingProvider`]. It never fails: when
//! the embedding call errors or returns the wrong number of vectors, it
//! logs the problem and ranks on the lexical signal alone.
//!
//! # Scoring Algorithm
//!
//! 1. Lexical: count query tokens (lowercased, whitespace-split, duplicates
//!    included) that occur as substrings of the lowercased description.
//! 2. Semantic: one batched `embed([query, desc_1, …, desc_n])` call;
//!    cosine similarity of each description vector against the query
//!    vector. Skipped (all zero) for a blank query or no candidates.
//! 3. Merge: `score = α × semantic + (1 - α) × lexical`.
//! 4. Sort by score (desc), original candidate position (asc).
//! 5. Truncate to `limit`.

use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::models::Resource;

/// Default number of ranked results.
pub const DEFAULT_LIMIT: usize = 10;

/// Default weight of the semantic score.
pub const DEFAULT_ALPHA: f64 = 0.6;

/// Anything the ranker can score.
pub trait Describe {
    /// Text used for both lexical and semantic scoring.
    fn description(&self) -> &str;
}

impl Describe for Resource {
    fn description(&self) -> &str {
        &self.description
    }
}

impl<T: Describe + ?Sized> Describe for &T {
    fn description(&self) -> &str {
        (**self).description()
    }
}

/// Per-call ranking parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankOptions {
    /// Maximum results to return.
    pub limit: usize,
    /// Weight for semantic vs lexical: `score = α*semantic + (1-α)*lexical`.
    pub alpha: f64,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            alpha: DEFAULT_ALPHA,
        }
    }
}

/// A scored candidate. Lives for one ranking call.
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate<T> {
    pub item: T,
    pub score: f64,
    pub lexical: f64,
    pub semantic: f64,
}

/// Ranks candidates for a free-text query.
///
/// Holds only a shared reference to the embedding provider; every
/// [`rank`](HybridRanker::rank) call issues at most one embedding request
/// regardless of how many candidates it scores.
#[derive(Clone)]
pub struct HybridRanker {
    embedder: Arc<dyn EmbeddingProvider>,
}

impl HybridRanker {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder }
    }

    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }

    /// Score, order and truncate `candidates` for `query`.
    pub async fn rank<T: Describe>(
        &self,
        query: &str,
        candidates: Vec<T>,
        options: RankOptions,
    ) -> Vec<RankedCandidate<T>> {
        let alpha = options.alpha;
        let semantic = self.semantic_scores(query, &candidates).await;

        let mut ranked: Vec<(usize, RankedCandidate<T>)> = candidates
            .into_iter()
            .zip(semantic)
            .enumerate()
            .map(|(index, (item, semantic))| {
                let lexical = lexical_score(query, item.description());
                let score = alpha * semantic + (1.0 - alpha) * lexical;
                (
                    index,
                    RankedCandidate {
                        item,
                        score,
                        lexical,
                        semantic,
                    },
                )
            })
            .collect();

        ranked.sort_by(|(ia, a), (ib, b)| compare_ranked(a.score, *ia, b.score, *ib));
        ranked.truncate(options.limit);
        ranked.into_iter().map(|(_, c)| c).collect()
    }

    /// One semantic score per candidate; all zero when the embedding
    /// signal is unavailable.
    async fn semantic_scores<T: Describe>(&self, query: &str, candidates: &[T]) -> Vec<f64> {
        let zeros = vec![0.0; candidates.len()];
        if query.trim().is_empty() || candidates.is_empty() {
            return zeros;
        }

        let mut texts = Vec::with_capacity(candidates.len() + 1);
        texts.push(query.to_string());
        texts.extend(candidates.iter().map(|c| c.description().to_string()));

        let vectors = match self.embedder.embed(&texts).await {
            Ok(vectors) => vectors,
            Err(e) => {
                warn!(
                    provider = self.embedder.name(),
                    error = %e,
                    "embedding failed; ranking on lexical scores only"
                );
                return zeros;
            }
        };

        if vectors.len() != texts.len() {
            warn!(
                provider = self.embedder.name(),
                expected = texts.len(),
                actual = vectors.len(),
                "embedding count mismatch; ranking on lexical scores only"
            );
            return zeros;
        }

        debug!(
            provider = self.embedder.name(),
            candidates = candidates.len(),
            "computed semantic scores"
        );

        let (query_vec, candidate_vecs) = vectors.split_at(1);
        candidate_vecs
            .iter()
            .map(|v| cosine_similarity(&query_vec[0], v) as f64)
            .collect()
    }
}

/// Number of query tokens contained in `text`, case-insensitively.
///
/// Every token position counts, so a repeated query token can contribute
/// more than once. An empty query or text scores `0.0`.
pub fn lexical_score(query: &str, text: &str) -> f64 {
    if query.is_empty() || text.is_empty() {
        return 0.0;
    }
    let query = query.to_lowercase();
    let haystack = text.to_lowercase();
    query
        .split_whitespace()
        .filter(|token| haystack.contains(token))
        .count() as f64
}

/// Higher score first; equal scores keep original candidate order.
fn compare_ranked(score_a: f64, index_a: usize, score_b: f64, index_b: usize) -> Ordering {
    score_b.total_cmp(&score_a).then(index_a.cmp(&index_b))
}
