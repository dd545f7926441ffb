//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement, the offline [`IdentityProvider`], and [`cosine_similarity`].
//!
//! The OpenAI-compatible HTTP provider and the provider factory live in
//! the `ardf-manager` app crate.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ProviderError;

/// Converts text into embedding vectors.
///
/// Implementations hold no per-request mutable state, so one instance can
/// serve concurrent ranking calls.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short provider identifier for logs (e.g. `"identity"`).
    fn name(&self) -> &str;

    /// Embed a batch of texts.
    ///
    /// Returns exactly one vector per input text, in input order, or a
    /// [`ProviderError`].
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}

#[async_trait]
impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        (**self).embed(texts).await
    }
}

/// Offline, deterministic provider used as the default and as a test double.
///
/// Each text is embedded independently: it is lowercased and split on
/// whitespace, and every distinct token contributes one `1.0` component.
/// This is a presence vector, not a semantic signal. Vectors of texts with
/// a different number of distinct tokens have different lengths and
/// therefore a cosine similarity of `0.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityProvider;

impl IdentityProvider {
    fn embed_one(text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let distinct: HashSet<&str> = lowered.split_whitespace().collect();
        vec![1.0; distinct.len()]
    }
}

#[async_trait]
impl EmbeddingProvider for IdentityProvider {
    fn name(&self) -> &str {
        "identity"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts.iter().map(|t| Self::embed_one(t)).collect())
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` when either vector has zero norm, for empty vectors or
/// vectors of different lengths, and when a component is not finite.
///
/// ```rust
/// use ardf_core::embedding::cosine_similarity;
///
/// assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
/// assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !sim.is_finite() {
        return 0.0;
    }
    sim.clamp(-1.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_tiny_vectors() {
        assert!((cosine_similarity(&[1e-4], &[1e-4]) - 1.0).abs() < 1e-6);
        let v = [1e-4, 1e-4];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
        let w = [1e-30, -2e-30, 3e-30];
        assert!((cosine_similarity(&w, &w) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_huge_and_non_finite_vectors() {
        let huge = [1e20, 0.0];
        assert!((cosine_similarity(&huge, &huge) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&huge, &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[f32::MAX, f32::MAX], &[f32::MAX, f32::MAX]).is_finite());

        assert_eq!(cosine_similarity(&[f32::INFINITY, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let v = vec![1.0, 2.0, 3.0];
        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&v, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_different_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[tokio::test]
    async fn test_identity_presence_vectors() {
        let texts = vec![
            "Book a flight".to_string(),
            "book BOOK book".to_string(),
            "".to_string(),
        ];
        let vectors = IdentityProvider.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0], vec![1.0, 1.0, 1.0]);
        assert_eq!(vectors[1], vec![1.0]);
        assert!(vectors[2].is_empty());
    }

    #[tokio::test]
    async fn test_identity_is_deterministic() {
        let texts = vec!["order pizza tonight".to_string()];
        let a = IdentityProvider.embed(&texts).await.unwrap();
        let b = IdentityProvider.embed(&texts).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_arc_provider_delegates() {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(IdentityProvider);
        assert_eq!(provider.name(), "identity");
        let out = provider.embed(&["a b".to_string()]).await.unwrap();
        assert_eq!(out, vec![vec![1.0, 1.0]]);
    }
}
