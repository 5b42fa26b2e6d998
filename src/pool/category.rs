//! Keyword-based category detection.
//!
//! Categories are a mix of genre and mood labels. Detection matches whole
//! words and phrases against the title and artist, so "rap" does not fire on
//! "trap" or "rapper" unless listed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Detected mood/genre label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Afrobeats,
    Amapiano,
    AfroHouse,
    Highlife,
    Dancehall,
    Reggae,
    HipHop,
    Rnb,
    Gospel,
    Drill,
    Party,
    Chill,
    Heartbreak,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 14] = [
        Self::Afrobeats,
        Self::Amapiano,
        Self::AfroHouse,
        Self::Highlife,
        Self::Dancehall,
        Self::Reggae,
        Self::HipHop,
        Self::Rnb,
        Self::Gospel,
        Self::Drill,
        Self::Party,
        Self::Chill,
        Self::Heartbreak,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Afrobeats => "afrobeats",
            Self::Amapiano => "amapiano",
            Self::AfroHouse => "afro-house",
            Self::Highlife => "highlife",
            Self::Dancehall => "dancehall",
            Self::Reggae => "reggae",
            Self::HipHop => "hip-hop",
            Self::Rnb => "rnb",
            Self::Gospel => "gospel",
            Self::Drill => "drill",
            Self::Party => "party",
            Self::Chill => "chill",
            Self::Heartbreak => "heartbreak",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase().replace(['_', ' '], "-");
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Afrobeats => &["afrobeat", "afrobeats", "naija", "lagos", "wizkid", "davido", "burna", "rema"],
            Self::Amapiano => &["amapiano", "piano", "yanos", "maphorisa", "kabza", "log drum"],
            Self::AfroHouse => &["afro house", "afro-house", "black coffee", "deep house"],
            Self::Highlife => &["highlife", "high life", "ghana", "ghanaian"],
            Self::Dancehall => &["dancehall", "dance hall", "vybz kartel", "popcaan"],
            Self::Reggae => &["reggae", "rasta", "bob marley", "roots"],
            Self::HipHop => &["hip hop", "hiphop", "rap", "rapper", "freestyle", "cypher"],
            Self::Rnb => &["r&b", "rnb", "r n b", "slow jam", "soul"],
            Self::Gospel => &["gospel", "worship", "praise", "hallelujah", "church"],
            Self::Drill => &["drill", "uk drill", "brooklyn drill"],
            Self::Party => &["party", "club", "owambe", "detty", "turn up", "festival", "carnival"],
            Self::Chill => &["chill", "lofi", "lo fi", "acoustic", "slowed", "relax", "vibes"],
            Self::Heartbreak => &["heartbreak", "broken heart", "tears", "goodbye", "lonely", "sad"],
            Self::Other => &[],
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detection result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub category: Category,
    /// 0.0 - 1.0
    pub confidence: f64,
}

/// Hits at which confidence saturates.
const SATURATING_HITS: f64 = 3.0;

/// Detect a category from a title and artist.
pub fn detect(title: &str, artist: &str) -> Detection {
    let text = format!(" {} ", tokenize(&format!("{} {}", title, artist)));

    let mut best = (Category::Other, 0usize);
    for category in Category::ALL {
        let hits = category
            .keywords()
            .iter()
            .filter(|kw| text.contains(&format!(" {} ", tokenize(kw))))
            .count();
        if hits > best.1 {
            best = (category, hits);
        }
    }

    Detection {
        category: best.0,
        confidence: (best.1 as f64 / SATURATING_HITS).min(1.0),
    }
}

/// Lowercase, punctuation to spaces, collapse whitespace. Keeps `&` so
/// "r&b" survives.
fn tokenize(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '&' { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Per-category preference weights in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentWeights {
    weights: HashMap<Category, f64>,
    default_weight: f64,
}

impl Default for IntentWeights {
    fn default() -> Self {
        Self {
            weights: HashMap::new(),
            default_weight: 0.5,
        }
    }
}

impl IntentWeights {
    pub fn weight(&self, category: Category) -> f64 {
        self.weights
            .get(&category)
            .copied()
            .unwrap_or(self.default_weight)
    }

    pub fn set(&mut self, category: Category, weight: f64) {
        self.weights.insert(category, weight.clamp(0.0, 1.0));
    }

    pub fn with(mut self, category: Category, weight: f64) -> Self {
        self.set(category, weight);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_genre_from_title() {
        let d = detect("Amapiano Log Drum Mix", "Kabza De Small");
        assert_eq!(d.category, Category::Amapiano);
        assert_eq!(d.confidence, 1.0);
    }

    #[test]
    fn test_word_boundaries() {
        // "trap" must not count as "rap"
        let d = detect("Trap Queen", "Fetty Wap");
        assert_eq!(d.category, Category::Other);
        assert_eq!(d.confidence, 0.0);
    }

    #[test]
    fn test_ampersand_keyword() {
        let d = detect("Late Night R&B", "Various");
        assert_eq!(d.category, Category::Rnb);
        assert!(d.confidence > 0.0 && d.confidence < 1.0);
    }

    #[test]
    fn test_category_parse_roundtrip() {
        for c in Category::ALL {
            assert_eq!(Category::parse(c.as_str()), Some(c));
        }
        assert_eq!(Category::parse("Hip Hop"), Some(Category::HipHop));
        assert_eq!(Category::parse("polka"), None);
    }

    #[test]
    fn test_intent_weights_default_and_clamp() {
        let w = IntentWeights::default().with(Category::Gospel, 1.7);
        assert_eq!(w.weight(Category::Gospel), 1.0);
        assert_eq!(w.weight(Category::Drill), 0.5);
    }
}
