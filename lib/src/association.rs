use crate::embedding::EmbeddingModel;
use crate::Error;
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use std::ops::Deref;

/// Number of nearest neighbors considered for each lookup.
pub const NEIGHBORS: usize = 20;
/// Longer candidates are never submitted.
pub const MAX_WORD_LEN: usize = 10;
/// Candidates starting with the same this many characters as the key are
/// treated as variants of the key.
pub const PREFIX_LEN: usize = 4;

/// The words already submitted for each lookup key.
#[derive(Debug, Clone, Default)]
pub struct History(HashMap<String, Vec<String>>);

impl Deref for History {
    type Target = HashMap<String, Vec<String>>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl History {
    /// Words offered for `key` so far, oldest first.
    pub fn offered(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, key: &str, word: &str) -> bool {
        self.offered(key).iter().any(|w| w == word)
    }

    fn record(&mut self, key: &str, word: String) {
        self.0.entry(key.to_string()).or_default().push(word);
    }
}

fn prefix(word: &str) -> &str {
    match word.char_indices().nth(PREFIX_LEN) {
        Some((i, _)) => &word[..i],
        None => word,
    }
}

/// The lowercase lookup key for a recognized word.
///
/// For a phrase one of its words is picked at random. Returns `None` for
/// blank input.
pub fn lookup_key<R: Rng + ?Sized>(word: &str, rng: &mut R) -> Option<String> {
    let word = word.to_lowercase();
    let tokens: Vec<&str> = word.split_whitespace().collect();
    tokens.choose(rng).map(|t| t.to_string())
}

/// Picks related words from an embedding, never repeating itself for the same key.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    history: History,
}

impl Selector {
    pub fn new() -> Selector {
        Selector::default()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Whether `candidate` (lowercase, as it comes from the model) may be
    /// submitted for `key`.
    pub fn accepts(&self, key: &str, candidate: &str) -> bool {
        prefix(candidate) != prefix(key)
            && candidate.chars().count() <= MAX_WORD_LEN
            && !self.history.contains(key, candidate)
    }

    /// Find a word related to `word` that was not offered for it before.
    ///
    /// The neighbors of the lookup key are tried most similar first; the first
    /// acceptable one is remembered and returned with underscores replaced by
    /// spaces.
    ///
    /// # Errors
    /// * [Error::OutOfVocabulary] if the model does not know the key
    /// * [Error::NoAssociation] if every neighbor was rejected, or `word` is blank
    ///
    /// In both cases the caller submits the original word; nothing is recorded.
    pub fn associate<M, R>(&mut self, word: &str, model: &M, rng: &mut R) -> Result<String, Error>
    where
        M: EmbeddingModel + ?Sized,
        R: Rng + ?Sized,
    {
        let key = lookup_key(word, rng).ok_or_else(|| Error::NoAssociation(word.to_string()))?;
        debug!("searching association for {:?} using {:?}", word, key);
        let neighbors = model.nearest(&key, NEIGHBORS)?;
        for (candidate, score) in neighbors {
            let candidate = candidate.to_lowercase();
            if !self.accepts(&key, &candidate) {
                debug!("rejected {:?} ({:.3})", candidate, score);
                continue;
            }
            let answer = candidate.replace('_', " ");
            self.history.record(&key, candidate);
            return Ok(answer);
        }
        Err(Error::NoAssociation(key))
    }
}
