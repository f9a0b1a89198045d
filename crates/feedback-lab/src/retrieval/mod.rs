//! Retrieval seam: the similarity search is provided by a [`Retriever`];
//! this module only decides what to keep from its results.

pub mod query;

use std::fmt;
use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::Record;
use crate::config::RetrievalConfig;
use crate::error::{Error, Result};

pub use query::{build_index_text, build_search_query};

/// Score used to compare a query embedding with indexed embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimilarityMetric {
    Cosine,
    DotProduct,
}

impl SimilarityMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMetric::Cosine => "cosine",
            SimilarityMetric::DotProduct => "dot-product",
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarityMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cosine" => Ok(SimilarityMetric::Cosine),
            "dot-product" => Ok(SimilarityMetric::DotProduct),
            other => Err(Error::configuration(format!(
                "invalid similarity score '{other}'; must be one of: cosine, dot-product"
            ))),
        }
    }
}

/// One search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch {
    pub record: Record,
    pub score: f64,
}

impl ScoredMatch {
    pub fn new(record: Record, score: f64) -> Self {
        Self { record, score }
    }
}

/// Similarity search over an index of embedded records.
pub trait Retriever: Send + Sync {
    /// Up to `top_k` records scoring at least `threshold` against
    /// `query_embedding`. Order is not significant; callers rank.
    fn search(
        &self,
        query_embedding: &[f32],
        metric: SimilarityMetric,
        threshold: f64,
        top_k: usize,
    ) -> Result<Vec<ScoredMatch>>;
}

/// Sort by score, highest first. Ties keep their input order.
pub fn rank_matches(mut matches: Vec<ScoredMatch>) -> Vec<ScoredMatch> {
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches
}

/// Rank, keep the best `top_k`, then drop those below `threshold`.
pub fn select_matches(matches: Vec<ScoredMatch>, top_k: usize, threshold: f64) -> Vec<ScoredMatch> {
    rank_matches(matches)
        .into_iter()
        .take(top_k)
        .filter(|m| m.score >= threshold)
        .collect()
}

/// Run one retrieval stage.
///
/// Returns `None` when the stage is disabled, so the corresponding prompt
/// section can be switched off. An enabled stage that finds nothing returns
/// an empty list.
pub fn retrieve(
    retriever: &dyn Retriever,
    query_embedding: &[f32],
    config: &RetrievalConfig,
) -> Result<Option<Vec<Record>>> {
    if !config.enabled {
        info!("[retrieval] disabled");
        return Ok(None);
    }
    let metric: SimilarityMetric = config.similarity_score.parse()?;
    let found = retriever.search(query_embedding, metric, config.threshold, config.top_k)?;
    let total = found.len();
    let kept = select_matches(found, config.top_k, config.threshold);
    if kept.is_empty() {
        warn!("[retrieval] no examples retrieved");
    } else {
        debug!(
            "[retrieval] kept {} of {} matches (top_k={}, threshold={})",
            kept.len(),
            total,
            config.top_k,
            config.threshold
        );
    }
    Ok(Some(kept.into_iter().map(|m| m.record).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    /// Returns fixed hits regardless of the query.
    struct FixedRetriever(Vec<ScoredMatch>);

    impl Retriever for FixedRetriever {
        fn search(
            &self,
            _query_embedding: &[f32],
            _metric: SimilarityMetric,
            _threshold: f64,
            _top_k: usize,
        ) -> Result<Vec<ScoredMatch>> {
            Ok(self.0.clone())
        }
    }

    fn hit(id: &str, score: f64) -> ScoredMatch {
        ScoredMatch::new(record(&[("id", id)]), score)
    }

    fn ids(matches: &[ScoredMatch]) -> Vec<&str> {
        matches.iter().map(|m| m.record["id"].as_str()).collect()
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let ranked = rank_matches(vec![hit("a", 0.5), hit("b", 0.9), hit("c", 0.5), hit("d", 0.7)]);
        assert_eq!(ids(&ranked), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn top_k_applies_before_threshold() {
        let kept = select_matches(vec![hit("a", 0.9), hit("b", 0.3), hit("c", 0.8)], 2, 0.85);
        assert_eq!(ids(&kept), vec!["a"]);
    }

    #[test]
    fn disabled_stage_returns_none() {
        let retriever = FixedRetriever(vec![hit("a", 0.9)]);
        let out = retrieve(&retriever, &[0.1], &RetrievalConfig::disabled()).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn enabled_stage_returns_ranked_records() {
        let retriever = FixedRetriever(vec![hit("low", 0.61), hit("high", 0.95), hit("miss", 0.1)]);
        let out = retrieve(&retriever, &[0.1], &RetrievalConfig::default())
            .unwrap()
            .unwrap();
        let ids: Vec<&str> = out.iter().map(|r| r["id"].as_str()).collect();
        assert_eq!(ids, vec!["high", "low"]);
    }

    #[test]
    fn unknown_metric_is_configuration_error() {
        let config = RetrievalConfig {
            similarity_score: "euclidean".into(),
            ..RetrievalConfig::default()
        };
        let err = retrieve(&FixedRetriever(Vec::new()), &[0.1], &config).unwrap_err();
        assert!(matches!(err, Error::Configuration(ref m) if m.contains("euclidean")));
    }
}
