//! Attitude-triple extraction for conflict detection: a small regex
//! pipeline, not a real dependency parser, matching patterns like
//! "I like pizza", "Haitang dislikes mornings", or the unsegmented
//! Han text the companion actually converses in, e.g. "海棠喜欢苹果".

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StanceTriple {
    pub entity: String,
    pub stance: String,
    pub object: String,
}

/// Han ideograph ranges wide enough to cover everyday Chinese text
/// (CJK Unified Ideographs plus its two common extension blocks).
pub(crate) fn is_han(c: char) -> bool {
    matches!(c as u32, 0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF)
}

pub(crate) fn contains_han(s: &str) -> bool {
    s.chars().any(is_han)
}

/// Built fresh per call from the configured antonym-pair list: the list
/// is runtime config, not a fixed constant, so it can't be cached behind
/// a process-wide `OnceLock` without going stale across configs.
fn pattern_for(antonym_pairs: &[(&'static str, &'static str)]) -> Regex {
    let words: Vec<&str> = antonym_pairs.iter().flat_map(|(a, b)| [*a, *b]).collect();
    let alternation = words.join("|");
    Regex::new(&format!(r"(?i)\b(\w+)\s+(?:really\s+)?({alternation})s?\s+(.+?)[.!?]?$")).expect("static pattern is valid")
}

/// Han text carries no whitespace between words and no `\b` boundaries,
/// so entity/object are captured as the surrounding ideograph runs
/// rather than `\w+` tokens separated by `\s+`.
fn pattern_for_cjk(antonym_pairs: &[(&'static str, &'static str)]) -> Regex {
    let words: Vec<&str> = antonym_pairs.iter().flat_map(|(a, b)| [*a, *b]).collect();
    let alternation = words.join("|");
    Regex::new(&format!(r"(\p{{Han}}+?)({alternation})(\p{{Han}}+)")).expect("static pattern is valid")
}

/// Extract every `(entity, stance, object)` triple the sentence contains.
/// Multiple sentences in `content` are scanned independently; a sentence
/// is routed to the Han-aware pattern whenever it contains any ideograph,
/// since the two writing systems can't share one tokenization scheme.
pub fn extract_stance_triples(content: &str, antonym_pairs: &[(&'static str, &'static str)]) -> Vec<StanceTriple> {
    let ascii_regex = pattern_for(antonym_pairs);
    let cjk_regex = pattern_for_cjk(antonym_pairs);
    content
        .split(['.', '!', '?', '。', '！', '？', '\n'])
        .filter_map(|sentence| {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                return None;
            }
            if contains_han(sentence) {
                cjk_regex.captures(sentence).map(|caps| StanceTriple {
                    entity: caps[1].to_string(),
                    stance: caps[2].to_string(),
                    object: caps[3].trim().to_string(),
                })
            } else {
                ascii_regex.captures(sentence).map(|caps| StanceTriple {
                    entity: caps[1].to_lowercase(),
                    stance: caps[2].to_lowercase(),
                    object: caps[3].trim().to_lowercase(),
                })
            }
        })
        .collect()
}

fn opposite_of<'a>(stance: &str, antonym_pairs: &'a [(&'static str, &'static str)]) -> Option<&'a str> {
    for (a, b) in antonym_pairs {
        if stance.eq_ignore_ascii_case(a) {
            return Some(b);
        }
        if stance.eq_ignore_ascii_case(b) {
            return Some(a);
        }
    }
    None
}

/// Two triples contradict when they share `(entity, object)` but one's
/// stance is the antonym-pair opposite of the other's.
pub fn is_contradiction(a: &StanceTriple, b: &StanceTriple, antonym_pairs: &[(&'static str, &'static str)]) -> bool {
    if a.entity != b.entity || a.object != b.object {
        return false;
    }
    match opposite_of(&a.stance, antonym_pairs) {
        Some(opposite) => opposite.eq_ignore_ascii_case(&b.stance),
        None => false,
    }
}
