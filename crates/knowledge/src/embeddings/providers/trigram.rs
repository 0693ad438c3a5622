//! Offline embedding provider built from word and character trigram hashes.

use crate::embeddings::provider::EmbeddingProvider;
use reglens_core::AppResult;
use std::collections::HashMap;

/// Words too common in regulatory prose to tell passages apart.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "with", "from", "this", "that", "have", "has",
    "had", "its", "their", "they", "them", "which", "such", "shall", "should", "may", "any",
    "all", "not", "but", "into", "also", "other", "these", "those",
];

/// Deterministic, content-dependent embeddings with no external service.
///
/// Each distinct word adds weight to one dimension for the whole word and
/// one per character trigram, so texts that share vocabulary (or word
/// stems) land close together. Good enough to exercise filtering and
/// ranking offline; not a semantic model.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for (word, freq) in word_frequencies(text) {
            let freq = freq as f32;

            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let idx = bucket(window.iter().copied(), 37, self.dimensions);
                vector[idx] += freq.sqrt();
            }

            let idx = bucket(word.chars(), 31, self.dimensions);
            vector[idx] += freq;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

/// Lowercased content words with their counts.
fn word_frequencies(text: &str) -> HashMap<String, u32> {
    let mut freq = HashMap::new();

    for word in text
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .map(|w| w.trim_matches('-').to_lowercase())
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(&w.as_str()))
    {
        *freq.entry(word).or_insert(0) += 1;
    }

    freq
}

/// Polynomial hash of `chars` folded into `dimensions` buckets.
fn bucket(chars: impl Iterator<Item = char>, multiplier: u64, dimensions: usize) -> usize {
    let hash = chars.fold(0u64, |acc, c| {
        acc.wrapping_mul(multiplier).wrapping_add(c as u64)
    });
    (hash % dimensions as u64) as usize
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
