//! Learning Engine: tiered solution lookup, pattern extraction, confidence
//! scoring, and failure-pattern avoidance.
//!
//! The pattern cache is a read-mostly `RwLock<HashMap<...>>` with TTL-based
//! invalidation layered on top.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::constants::learning as learning_consts;
use crate::models::Pattern;
use crate::traits::PatternStore;

#[derive(Debug, Clone)]
pub enum LookupTier {
    /// Direct cache/store hit: confidence and success count clear the bar.
    Tier0 { commands: Vec<String> },
    /// No direct hit, but a similar pattern exists for this alertname.
    Tier1 { hint_commands: Vec<String>, similarity: f64 },
    /// No usable candidate; full reasoning required.
    Tier2,
}

struct CacheEntry {
    pattern: Option<Pattern>,
    cached_at: Instant,
}

pub struct LearningEngine {
    store: Arc<dyn PatternStore>,
    cache: RwLock<HashMap<(String, String), CacheEntry>>,
}

impl LearningEngine {
    pub fn new(store: Arc<dyn PatternStore>) -> Self {
        LearningEngine {
            store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn symptom_fingerprint(alertname: &str, labels: &HashMap<String, String>, signature_labels: &[String]) -> String {
        let mut tokens: Vec<String> = signature_labels
            .iter()
            .filter_map(|label| labels.get(label).map(|v| format!("{}={}", label, v)))
            .collect();
        tokens.sort();
        format!("{}|{}", alertname, tokens.join("|"))
    }

    async fn cached_pattern(&self, alertname: &str, symptom_fingerprint: &str) -> crate::traits::Result<Option<Pattern>> {
        let key = (alertname.to_string(), symptom_fingerprint.to_string());

        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&key) {
                if entry.cached_at.elapsed() < learning_consts::PATTERN_CACHE_TTL {
                    return Ok(entry.pattern.clone());
                }
            }
        }

        let pattern = self.store.find_pattern(alertname, symptom_fingerprint).await?;
        self.cache.write().await.insert(
            key,
            CacheEntry {
                pattern: pattern.clone(),
                cached_at: Instant::now(),
            },
        );
        Ok(pattern)
    }

    async fn invalidate(&self, alertname: &str, symptom_fingerprint: &str) {
        self.cache
            .write()
            .await
            .remove(&(alertname.to_string(), symptom_fingerprint.to_string()));
    }

    /// Tier 0 → Tier 1 → Tier 2 lookup per §4.9.
    pub async fn lookup(&self, alertname: &str, symptom_fingerprint: &str) -> crate::traits::Result<LookupTier> {
        if let Some(pattern) = self.cached_pattern(alertname, symptom_fingerprint).await? {
            let failure = self
                .store
                .find_failure_pattern(alertname, symptom_fingerprint)
                .await?;
            if pattern.confidence_score >= learning_consts::TIER0_MIN_CONFIDENCE
                && pattern.success_count >= learning_consts::TIER0_MIN_SUCCESS_COUNT
                && failure.is_none()
            {
                return Ok(LookupTier::Tier0 { commands: pattern.commands });
            }
        }

        let candidates = self.store.recent_patterns_for_alertname(alertname, 50).await?;
        let best = candidates
            .into_iter()
            .map(|p| {
                let sim = weighted_jaccard(symptom_fingerprint, &p.symptom_fingerprint);
                (sim, p)
            })
            .filter(|(sim, _)| *sim >= learning_consts::TIER1_MIN_SIMILARITY)
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        if let Some((similarity, pattern)) = best {
            return Ok(LookupTier::Tier1 {
                hint_commands: pattern.commands,
                similarity,
            });
        }

        Ok(LookupTier::Tier2)
    }

    pub async fn record_success(&self, alertname: &str, symptom_fingerprint: &str, commands: &[String]) -> crate::traits::Result<Pattern> {
        let pattern = self
            .store
            .upsert_pattern_success(alertname, symptom_fingerprint, commands, Utc::now())
            .await?;
        self.invalidate(alertname, symptom_fingerprint).await;
        Ok(pattern)
    }

    pub async fn record_failure(
        &self,
        alertname: &str,
        symptom_fingerprint: &str,
        commands: &[String],
        reason: &str,
    ) -> crate::traits::Result<()> {
        self.store
            .record_failure(alertname, symptom_fingerprint, commands, reason, Utc::now())
            .await?;
        self.invalidate(alertname, symptom_fingerprint).await;
        Ok(())
    }
}

/// Weighted Jaccard: alertname contributes 0.5 if equal, the remaining
/// label-value tokens contribute the other 0.5 via `|A ∩ B| / |A ∪ B|`.
pub fn weighted_jaccard(fingerprint_a: &str, fingerprint_b: &str) -> f64 {
    let mut parts_a = fingerprint_a.splitn(2, '|');
    let mut parts_b = fingerprint_b.splitn(2, '|');

    let alertname_a = parts_a.next().unwrap_or("");
    let alertname_b = parts_b.next().unwrap_or("");
    let alertname_score = if alertname_a == alertname_b { 0.5 } else { 0.0 };

    let tokens_a: std::collections::HashSet<&str> = parts_a.next().unwrap_or("").split('|').filter(|s| !s.is_empty()).collect();
    let tokens_b: std::collections::HashSet<&str> = parts_b.next().unwrap_or("").split('|').filter(|s| !s.is_empty()).collect();

    let token_score = if tokens_a.is_empty() && tokens_b.is_empty() {
        1.0
    } else {
        let intersection = tokens_a.intersection(&tokens_b).count() as f64;
        let union = tokens_a.union(&tokens_b).count() as f64;
        if union == 0.0 {
            0.0
        } else {
            intersection / union
        }
    };

    alertname_score + 0.5 * token_score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alertname_mismatch_caps_similarity_at_half() {
        let sim = weighted_jaccard("ContainerDown|host=nexus", "DiskFull|host=nexus");
        assert!(sim <= 0.5);
    }

    #[test]
    fn identical_fingerprints_score_one() {
        let sim = weighted_jaccard("ContainerDown|host=nexus|container=nginx", "ContainerDown|host=nexus|container=nginx");
        assert_eq!(sim, 1.0);
    }

    #[test]
    fn symptom_fingerprint_sorts_signature_labels() {
        let mut labels = HashMap::new();
        labels.insert("container".to_string(), "nginx".to_string());
        labels.insert("host".to_string(), "nexus".to_string());
        let sig_labels = vec!["host".to_string(), "container".to_string()];
        let fp = LearningEngine::symptom_fingerprint("ContainerDown", &labels, &sig_labels);
        assert_eq!(fp, "ContainerDown|container=nginx|host=nexus");
    }
}
