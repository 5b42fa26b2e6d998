//! User preference signals.
//!
//! Explicit signals (like/dislike) and implicit ones (completions, skips,
//! queueing) accumulate per category and turn into [`IntentWeights`].

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::category::{Category, IntentWeights};

/// Weight of an explicit like/dislike relative to one implicit signal.
const EXPLICIT_WEIGHT: u32 = 3;

/// Completion rate at or above which a completion counts as positive.
const POSITIVE_COMPLETION: f64 = 70.0;

/// Completion rate below which a completion counts as negative.
const NEGATIVE_COMPLETION: f64 = 30.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySignals {
    pub positive: u32,
    pub negative: u32,
}

impl CategorySignals {
    /// Laplace-smoothed preference in (0, 1); no signals gives 0.5.
    pub fn weight(&self) -> f64 {
        (self.positive as f64 + 1.0) / (self.positive as f64 + self.negative as f64 + 2.0)
    }
}

/// Preference layer state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    liked: HashSet<String>,
    disliked: HashSet<String>,
    categories: BTreeMap<Category, CategorySignals>,
}

impl Preferences {
    pub fn like(&mut self, track_id: &str, category: Category) {
        self.disliked.remove(track_id);
        if self.liked.insert(track_id.to_string()) {
            self.signals(category).positive += EXPLICIT_WEIGHT;
        }
    }

    pub fn dislike(&mut self, track_id: &str, category: Category) {
        self.liked.remove(track_id);
        if self.disliked.insert(track_id.to_string()) {
            self.signals(category).negative += EXPLICIT_WEIGHT;
        }
    }

    pub fn is_liked(&self, track_id: &str) -> bool {
        self.liked.contains(track_id)
    }

    pub fn is_disliked(&self, track_id: &str) -> bool {
        self.disliked.contains(track_id)
    }

    pub fn record_completion(&mut self, category: Category, rate: f64) {
        if rate >= POSITIVE_COMPLETION {
            self.signals(category).positive += 1;
        } else if rate < NEGATIVE_COMPLETION {
            self.signals(category).negative += 1;
        }
    }

    pub fn record_positive(&mut self, category: Category) {
        self.signals(category).positive += 1;
    }

    pub fn record_skip(&mut self, category: Category) {
        self.signals(category).negative += 1;
    }

    pub fn category_signals(&self, category: Category) -> CategorySignals {
        self.categories.get(&category).copied().unwrap_or_default()
    }

    /// Intent weights for scoring.
    pub fn intent_weights(&self) -> IntentWeights {
        self.categories
            .iter()
            .fold(IntentWeights::default(), |w, (category, signals)| {
                w.with(*category, signals.weight())
            })
    }

    fn signals(&mut self, category: Category) -> &mut CategorySignals {
        self.categories.entry(category).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_signals_is_neutral() {
        let prefs = Preferences::default();
        assert_eq!(prefs.intent_weights().weight(Category::Amapiano), 0.5);
    }

    #[test]
    fn test_likes_raise_and_skips_lower_weight() {
        let mut prefs = Preferences::default();
        prefs.like("t1", Category::Amapiano);
        prefs.record_completion(Category::Amapiano, 95.0);
        assert!(prefs.intent_weights().weight(Category::Amapiano) > 0.5);

        prefs.record_skip(Category::Drill);
        prefs.record_skip(Category::Drill);
        assert!(prefs.intent_weights().weight(Category::Drill) < 0.5);
    }

    #[test]
    fn test_like_and_dislike_are_exclusive() {
        let mut prefs = Preferences::default();
        prefs.like("t1", Category::Other);
        prefs.dislike("t1", Category::Other);
        assert!(prefs.is_disliked("t1"));
        assert!(!prefs.is_liked("t1"));
    }

    #[test]
    fn test_repeated_like_counts_once() {
        let mut prefs = Preferences::default();
        prefs.like("t1", Category::Rnb);
        prefs.like("t1", Category::Rnb);
        assert_eq!(prefs.category_signals(Category::Rnb).positive, EXPLICIT_WEIGHT);
    }

    #[test]
    fn test_middling_completion_is_ignored() {
        let mut prefs = Preferences::default();
        prefs.record_completion(Category::Chill, 50.0);
        assert_eq!(prefs.category_signals(Category::Chill), CategorySignals::default());
    }

    #[test]
    fn test_serde_roundtrip_keeps_dislikes() {
        let mut prefs = Preferences::default();
        prefs.dislike("t9", Category::Party);
        let json = serde_json::to_string(&prefs).unwrap();
        let back: Preferences = serde_json::from_str(&json).unwrap();
        assert_eq!(back, prefs);
    }
}
