//! String normalization and content matching.
//!
//! Matching is a heuristic: the oracle's display title "plausibly contains"
//! the artist or the track title after normalization, or is close enough by
//! edit distance. Thresholds are tunable through config.

/// Noise commonly appended to uploaded titles.
const TITLE_NOISE: &[&str] = &[
    "official music video",
    "official video",
    "official audio",
    "official lyric video",
    "lyric video",
    "lyrics",
    "visualizer",
    "audio",
    "video",
    "hd",
    "hq",
    "4k",
];

/// Cache key for an artist/title pair.
pub fn record_key(artist: &str, title: &str) -> String {
    format!("{}|{}", collapse(artist), collapse(title))
}

/// Search query for repairing an artist/title pair.
///
/// Drops bracketed noise like "(Official Video)" and stray punctuation.
pub fn clean_query(artist: &str, title: &str) -> String {
    let title = strip_bracketed(title);
    let title = strip_noise(&title);
    let query = format!("{} {}", artist.trim(), title.trim());
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Retry-counter key for a query.
pub fn query_key(query: &str) -> String {
    collapse(query)
}

/// Does the oracle's display title plausibly belong to this artist/title?
pub fn content_matches(display_title: &str, artist: &str, title: &str, min_similarity: f32) -> bool {
    let display = normalize_for_comparison(display_title);
    if display.is_empty() {
        return false;
    }

    let artist_n = normalize_for_comparison(artist);
    let title_n = normalize_for_comparison(&strip_bracketed(title));

    if (!artist_n.is_empty() && display.contains(&artist_n))
        || (!title_n.is_empty() && display.contains(&title_n))
    {
        return true;
    }

    string_similarity(display_title, title) >= min_similarity
        || string_similarity(display_title, &format!("{} {}", artist, title)) >= min_similarity
}

/// Lowercase, alphanumerics only, single spaces.
fn collapse(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_bracketed(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    for c in s.chars() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn strip_noise(s: &str) -> String {
    let mut words: Vec<&str> = s.split_whitespace().collect();
    // Remove trailing noise phrases like "- Official Video"
    loop {
        let tail = words.join(" ").to_lowercase();
        let Some(noise) = TITLE_NOISE
            .iter()
            .find(|n| tail.strip_suffix(**n).is_some_and(|rest| rest.ends_with(' ')))
        else {
            break;
        };
        let n_words = noise.split_whitespace().count();
        if n_words >= words.len() {
            break;
        }
        words.truncate(words.len() - n_words);
        while words.last().is_some_and(|w| w.chars().all(|c| !c.is_alphanumeric())) {
            words.pop();
        }
    }
    words.join(" ")
}

/// Calculate similarity between two strings (0.0 to 1.0).
pub fn string_similarity(a: &str, b: &str) -> f32 {
    let a = normalize_for_comparison(a);
    let b = normalize_for_comparison(b);

    if a == b {
        return 1.0;
    }

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // Simple Levenshtein-based similarity
    let distance = levenshtein_distance(&a, &b);
    let max_len = a.chars().count().max(b.chars().count());
    1.0 - (distance as f32 / max_len as f32)
}

/// Normalize a string for comparison.
pub fn normalize_for_comparison(s: &str) -> String {
    let mut result = s.to_lowercase();

    // Remove common prefixes
    for prefix in &["the ", "a ", "an "] {
        if let Some(rest) = result.strip_prefix(prefix) {
            result = rest.to_string();
        }
    }

    // Remove featuring suffixes
    for pattern in &[" (feat.", " (ft.", " feat.", " ft.", " featuring "] {
        if let Some(pos) = result.find(pattern) {
            result.truncate(pos);
        }
    }

    // Remove extra whitespace and punctuation
    result
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Simple Levenshtein distance.
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two-row DP
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_key_normalizes() {
        assert_eq!(record_key("  Burna Boy ", "Last  Last!"), "burna boy|last last");
        assert_eq!(record_key("BURNA BOY", "last last"), record_key("Burna Boy", "Last Last"));
    }

    #[test]
    fn test_clean_query_strips_noise() {
        assert_eq!(
            clean_query("Rema", "Calm Down (Official Music Video)"),
            "Rema Calm Down"
        );
        assert_eq!(clean_query("Tems", "Free Mind - Official Audio"), "Tems Free Mind");
        assert_eq!(clean_query("Asake", "Lonely At The Top"), "Asake Lonely At The Top");
    }

    #[test]
    fn test_clean_query_keeps_title_that_is_only_noise() {
        assert_eq!(clean_query("Someone", "Video"), "Someone Video");
        assert_eq!(clean_query("Someone", "Bahd"), "Someone Bahd");
    }

    #[test]
    fn test_content_matches_substring() {
        assert!(content_matches("Wizkid - Essence (Official Video) ft. Tems", "Wizkid", "Essence", 0.8));
        assert!(content_matches("ESSENCE", "Someone Else", "Essence", 0.8));
        assert!(!content_matches("Totally Different Song", "Wizkid", "Essence", 0.8));
        assert!(!content_matches("", "Wizkid", "Essence", 0.8));
    }

    #[test]
    fn test_content_matches_fuzzy() {
        // One typo, no substring hit
        assert!(content_matches("Essense", "Nobody", "Essence", 0.8));
    }

    #[test]
    fn test_string_similarity() {
        assert_eq!(string_similarity("Hello", "hello"), 1.0);
        assert_eq!(string_similarity("The Beatles", "Beatles"), 1.0);
        assert!(string_similarity("Song (feat. Someone)", "Song") > 0.9);
        assert!(string_similarity("abc", "xyz") < 0.5);
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("same", "same"), 0);
    }
}
