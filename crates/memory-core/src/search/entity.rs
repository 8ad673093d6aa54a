//! Query-time heuristics: entity-word extraction and time-deixis window
//! inference, both used ahead of strategy selection in
//! [`super::hybrid::HybridRetriever`].
//!
//! Entity extraction here is a closed-class stopword filter over Unicode
//! word boundaries, not real part-of-speech tagging — it is a coarse
//! approximation of "content word vs. function word", documented as such
//! rather than presented as linguistic analysis.

use crate::config::RetrievalConfig;
use crate::storage::TimeWindow;
use chrono::{Duration, Utc};
use unicode_segmentation::UnicodeSegmentation;

/// Words that look like they carry query-specific meaning: not in the
/// stopword list, and at least `min_entity_word_len` graphemes long.
pub fn extract_entity_words(query: &str, config: &RetrievalConfig) -> Vec<String> {
    query
        .unicode_words()
        .map(|w| w.to_lowercase())
        .filter(|w| w.graphemes(true).count() >= config.min_entity_word_len)
        .filter(|w| !config.entity_stopwords.contains(&w.as_str()))
        .collect()
}

/// Scan the query for a time-deixis phrase and map it to a window ending
/// now. Longer phrases are checked before shorter ones so "last time"
/// isn't shadowed by a hypothetical standalone "time" entry.
pub fn infer_time_window(query: &str, config: &RetrievalConfig) -> Option<TimeWindow> {
    let lower = query.to_lowercase();
    let mut phrases: Vec<(&&str, &i64)> = config.time_deixis_days.iter().collect();
    phrases.sort_by_key(|(phrase, _)| std::cmp::Reverse(phrase.len()));

    for (phrase, days_back) in phrases {
        if lower.contains(*phrase) {
            let now = Utc::now();
            let start = now - Duration::days(*days_back);
            return Some(TimeWindow::new(start, now));
        }
    }
    None
}
