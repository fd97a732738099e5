//! Blending text relevance with link authority at query time
//!
//! Authority scores come from the external graph job as a JSON object
//! mapping URL to score. A URL without a score has authority 0. Hits come
//! from the text index as a JSON array of `{"url", "relevance"}` objects.

use crate::config::RankingConfig;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// URL to authority score mapping
#[derive(Debug, Clone, Default)]
pub struct AuthorityScores {
    scores: HashMap<String, f64>,
}

impl AuthorityScores {
    /// Loads a `{"<url>": <score>, ...}` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let scores: HashMap<String, f64> = serde_json::from_str(&content)?;
        tracing::debug!("Loaded {} authority scores from {}", scores.len(), path.display());
        Ok(Self { scores })
    }

    pub fn from_map(scores: HashMap<String, f64>) -> Self {
        Self { scores }
    }

    /// Authority of a URL, 0 when unknown
    pub fn get(&self, url: &str) -> f64 {
        self.scores.get(url).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// A search result before blending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub relevance: f64,
}

/// Loads the hits produced by the text index
pub fn load_hits(path: &Path) -> Result<Vec<SearchHit>> {
    let content = std::fs::read_to_string(path)?;
    let hits: Vec<SearchHit> = serde_json::from_str(&content)?;
    tracing::debug!("Loaded {} search hits from {}", hits.len(), path.display());
    Ok(hits)
}

/// A search result with its blended score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedHit {
    pub url: String,
    pub relevance: f64,
    pub authority: f64,
    pub score: f64,
}

/// Computes `relevance_weight * relevance + authority_weight * authority`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBlender {
    pub relevance_weight: f64,
    pub authority_weight: f64,
}

impl Default for ScoreBlender {
    fn default() -> Self {
        Self::from_config(&RankingConfig::default())
    }
}

impl ScoreBlender {
    pub fn from_config(config: &RankingConfig) -> Self {
        Self {
            relevance_weight: config.relevance_weight,
            authority_weight: config.authority_weight,
        }
    }

    pub fn blend(&self, relevance: f64, authority: f64) -> f64 {
        self.relevance_weight * relevance + self.authority_weight * authority
    }

    /// Scores and sorts hits, best first; equal scores are ordered by URL
    pub fn rank(&self, hits: Vec<SearchHit>, authority: &AuthorityScores) -> Vec<RankedHit> {
        let mut ranked: Vec<RankedHit> = hits
            .into_iter()
            .map(|hit| {
                let authority = authority.get(&hit.url);
                RankedHit {
                    score: self.blend(hit.relevance, authority),
                    url: hit.url,
                    relevance: hit.relevance,
                    authority,
                }
            })
            .collect();

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.url.cmp(&b.url)));
        ranked
    }
}
