//! Extractive summarization and keyword extraction.
//!
//! Sentences are scored on four signals and the best ones are returned in
//! their original order:
//!
//! - overlap with the title words
//! - frequency of the document's keywords inside the sentence
//! - closeness to an ideal sentence length
//! - position in the document (lead sentences weigh more)
//!
//! Everything here is pure and deterministic: ties are broken by position.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Sentences kept in a summary.
pub const SUMMARY_SENTENCES: usize = 5;

/// Keywords kept per article.
pub const KEYWORD_COUNT: usize = 10;

const IDEAL_SENTENCE_WORDS: f64 = 20.0;

static SENTENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)[^.!?\n]+(?:[.!?]+["'”’)\]]*|$)"#).expect("valid sentence regex")
});

static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+(?:['’][\p{L}]+)?").expect("valid word regex"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and",
        "any", "are", "as", "at", "be", "because", "been", "before", "being", "below", "between",
        "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during",
        "each", "few", "for", "from", "further", "had", "has", "have", "having", "he", "her",
        "here", "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is",
        "it", "its", "itself", "just", "may", "me", "might", "more", "most", "must", "my",
        "myself", "no", "nor", "not", "now", "of", "off", "on", "once", "one", "only", "or",
        "other", "our", "ours", "ourselves", "out", "over", "own", "said", "same", "says", "she",
        "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
        "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
        "two", "under", "until", "up", "us", "very", "was", "we", "were", "what", "when",
        "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you", "your",
        "yours", "yourself", "yourselves", "new", "like", "get", "got", "told", "year", "years",
    ]
    .into_iter()
    .collect()
});

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}

/// Lowercased words of `text`, in order.
pub fn words(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase().replace('’', "'"))
        .collect()
}

/// Split `text` into trimmed, non-empty sentences.
///
/// A line break always ends a sentence, so paragraphs without closing
/// punctuation are not merged into the next one.
pub fn sentences(text: &str) -> Vec<String> {
    SENTENCE_RE
        .find_iter(text)
        .map(|m| m.as_str().split_whitespace().join(" "))
        .filter(|s| !s.is_empty())
        .collect()
}

fn content_words(text: &str) -> Vec<String> {
    words(text)
        .into_iter()
        .filter(|w| w.chars().count() > 2 && !is_stop_word(w))
        .filter(|w| !w.chars().all(|c| c.is_numeric()))
        .collect()
}

/// Frequency of each content word, with the index of its first appearance.
fn frequencies(text: &str) -> HashMap<String, (usize, usize)> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, word) in content_words(text).into_iter().enumerate() {
        counts.entry(word).or_insert((0, position)).0 += 1;
    }
    counts
}

/// The most frequent content words of `text`, most frequent first.
///
/// Ties keep the order in which the words first appear.
pub fn keywords(text: &str, count: usize) -> Vec<String> {
    frequencies(text)
        .into_iter()
        .sorted_by(|(_, (ca, pa)), (_, (cb, pb))| cb.cmp(ca).then(pa.cmp(pb)))
        .take(count)
        .map(|(word, _)| word)
        .collect()
}

fn position_score(index: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let normalized = (index + 1) as f64 / total as f64;
    match normalized {
        n if n <= 0.1 => 0.17,
        n if n <= 0.2 => 0.23,
        n if n <= 0.3 => 0.14,
        n if n <= 0.4 => 0.08,
        n if n <= 0.5 => 0.05,
        n if n <= 0.6 => 0.04,
        n if n <= 0.7 => 0.06,
        n if n <= 0.8 => 0.04,
        n if n <= 0.9 => 0.04,
        _ => 0.15,
    }
}

fn length_score(word_count: usize) -> f64 {
    let distance = (IDEAL_SENTENCE_WORDS - word_count as f64).abs();
    (1.0 - distance / IDEAL_SENTENCE_WORDS).max(0.0)
}

/// Pick the `count` best sentences of `body` and join them in document order.
///
/// Returns an empty string when the body has no sentences.
pub fn summarize(title: &str, body: &str, count: usize) -> String {
    let all_sentences = sentences(body);
    if all_sentences.is_empty() || count == 0 {
        return String::new();
    }

    let title_words: HashSet<String> = content_words(title).into_iter().collect();
    let top_keywords: HashMap<String, usize> = frequencies(body)
        .into_iter()
        .sorted_by(|(_, (ca, pa)), (_, (cb, pb))| cb.cmp(ca).then(pa.cmp(pb)))
        .take(KEYWORD_COUNT)
        .map(|(word, (n, _))| (word, n))
        .collect();
    let keyword_total: usize = top_keywords.values().sum::<usize>().max(1);

    let total = all_sentences.len();
    let scored = all_sentences.iter().enumerate().map(|(index, sentence)| {
        let sentence_words = content_words(sentence);
        let title_score = if title_words.is_empty() {
            0.0
        } else {
            let hits = sentence_words.iter().filter(|w| title_words.contains(*w)).unique().count();
            hits as f64 / title_words.len() as f64
        };
        let keyword_score = sentence_words
            .iter()
            .filter_map(|w| top_keywords.get(w))
            .sum::<usize>() as f64
            / keyword_total as f64;
        let score = (title_score * 1.5
            + keyword_score * 2.0
            + length_score(words(sentence).len())
            + position_score(index, total))
            / 4.0;
        (index, score)
    });

    scored
        .sorted_by(|(ia, sa), (ib, sb)| sb.total_cmp(sa).then(ia.cmp(ib)))
        .take(count)
        .map(|(index, _)| index)
        .sorted()
        .map(|index| all_sentences[index].as_str())
        .join(" ")
}
