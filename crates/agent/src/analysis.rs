//! Built-in lexicon analyzer.
//!
//! Word-list sentiment normalized per word, question detection by `?` or a
//! leading interrogative, and up to three topic words that are not stop-words.

use sentia_core::analysis::{InputAnalyzer, TextAnalysis};

const MAX_TOPICS: usize = 3;

const LEXICON: &[(&str, f64)] = &[
    ("amazing", 4.0),
    ("awesome", 4.0),
    ("beautiful", 3.0),
    ("best", 3.0),
    ("calm", 2.0),
    ("cool", 1.0),
    ("enjoy", 2.0),
    ("excellent", 3.0),
    ("excited", 3.0),
    ("fantastic", 4.0),
    ("fun", 4.0),
    ("glad", 3.0),
    ("good", 3.0),
    ("great", 3.0),
    ("happy", 3.0),
    ("helpful", 2.0),
    ("hope", 2.0),
    ("interesting", 2.0),
    ("kind", 2.0),
    ("like", 2.0),
    ("love", 3.0),
    ("nice", 3.0),
    ("perfect", 3.0),
    ("thank", 2.0),
    ("thanks", 2.0),
    ("wonderful", 4.0),
    ("yes", 1.0),
    ("angry", -3.0),
    ("annoyed", -2.0),
    ("awful", -3.0),
    ("bad", -3.0),
    ("boring", -3.0),
    ("broken", -1.0),
    ("confused", -2.0),
    ("fail", -2.0),
    ("hate", -3.0),
    ("horrible", -3.0),
    ("hurt", -2.0),
    ("lonely", -2.0),
    ("no", -1.0),
    ("problem", -2.0),
    ("sad", -2.0),
    ("sorry", -1.0),
    ("stupid", -2.0),
    ("terrible", -3.0),
    ("tired", -2.0),
    ("upset", -2.0),
    ("worried", -3.0),
    ("worst", -3.0),
    ("wrong", -2.0),
];

const INTERROGATIVES: &[&str] = &[
    "what", "why", "how", "when", "where", "who", "whom", "whose", "which", "is", "are", "am",
    "can", "could", "would", "should", "do", "does", "did", "will", "shall", "may", "have", "has",
];

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "again", "all", "also", "an", "and", "any", "as", "at", "be", "been",
    "being", "but", "by", "for", "from", "get", "got", "had", "he", "her", "here", "him", "his",
    "i", "if", "in", "into", "it", "its", "just", "me", "more", "my", "not", "now", "of", "on",
    "or", "our", "out", "please", "really", "she", "so", "some", "than", "that", "the", "their",
    "them", "then", "there", "these", "they", "this", "those", "to", "too", "up", "us", "very",
    "was", "we", "were", "with", "you", "your", "hello", "hi", "hey", "today", "tell", "know",
    "think", "want", "feel", "feeling", "going", "doing", "thing", "things",
];

/// Lower-cased alphanumeric words, apostrophes dropped.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.replace('\'', "").to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Lexicon-based [`InputAnalyzer`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconAnalyzer;

impl LexiconAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl InputAnalyzer for LexiconAnalyzer {
    fn analyze(&self, text: &str) -> TextAnalysis {
        let words = words(text);

        let is_question = text.trim_end().ends_with('?')
            || words
                .first()
                .is_some_and(|w| INTERROGATIVES.contains(&w.as_str()));

        let mut topics: Vec<String> = Vec::new();
        for word in &words {
            if topics.len() == MAX_TOPICS {
                break;
            }
            let candidate = word.len() >= 3
                && !word.chars().all(|c| c.is_ascii_digit())
                && !STOP_WORDS.contains(&word.as_str())
                && !INTERROGATIVES.contains(&word.as_str())
                && !LEXICON.iter().any(|(w, _)| w == word);
            if candidate && !topics.contains(word) {
                topics.push(word.clone());
            }
        }

        TextAnalysis {
            is_question,
            topics,
        }
    }

    fn sentiment(&self, text: &str) -> f64 {
        let words = words(text);
        if words.is_empty() {
            return 0.0;
        }

        let total: f64 = words
            .iter()
            .filter_map(|w| LEXICON.iter().find(|(lw, _)| lw == w).map(|(_, s)| *s))
            .sum();

        total / words.len() as f64
    }
}
