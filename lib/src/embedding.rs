use crate::Error;
use log::info;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Nearest neighbor lookup in a word embedding.
pub trait EmbeddingModel {
    /// The `k` words most similar to `word`, most similar first.
    ///
    /// # Errors
    /// [Error::OutOfVocabulary] if `word` has no vector.
    fn nearest(&self, word: &str, k: usize) -> Result<Vec<(String, f32)>, Error>;
}

/// Word vectors in the word2vec format, unit normalized at load time.
pub struct Word2Vec {
    words: Vec<String>,
    index: HashMap<String, usize>,
    dim: usize,
    /// `words.len() * dim` values, one row per word
    vectors: Vec<f32>,
}

fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

fn malformed<S: Into<String>>(msg: S) -> Error {
    Error::MalformedModel(msg.into())
}

impl Word2Vec {
    /// Build a model from `(word, vector)` pairs. All vectors must have the same length.
    pub fn from_entries<I, S>(entries: I) -> Result<Word2Vec, Error>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        let mut entries = entries.into_iter().peekable();
        let dim = entries.peek().map(|(_, v)| v.len()).unwrap_or(0);
        let mut model = Word2Vec::with_dim(dim);
        for (word, vector) in entries {
            model.push(word.into(), vector)?;
        }
        Ok(model)
    }

    fn with_dim(dim: usize) -> Word2Vec {
        Word2Vec {
            words: Vec::new(),
            index: HashMap::new(),
            dim,
            vectors: Vec::new(),
        }
    }

    fn push(&mut self, word: String, mut vector: Vec<f32>) -> Result<(), Error> {
        if vector.len() != self.dim {
            return Err(malformed(format!(
                "vector for {:?} has {} values, expected {}",
                word,
                vector.len(),
                self.dim
            )));
        }
        normalize(&mut vector);
        // a repeated word is looked up by its last vector
        self.index.insert(word.clone(), self.words.len());
        self.words.push(word);
        self.vectors.extend(vector);
        Ok(())
    }

    /// Load a model file. `binary` selects the binary word2vec layout,
    /// otherwise the text layout is expected.
    pub fn load<P: AsRef<Path>>(path: P, binary: bool) -> Result<Word2Vec, Error> {
        let path = path.as_ref();
        info!("loading word vectors from {}", path.display());
        let reader = BufReader::new(File::open(path)?);
        let model = if binary {
            Word2Vec::read_binary(reader)?
        } else {
            Word2Vec::read_text(reader)?
        };
        info!("loaded {} words of dimension {}", model.len(), model.dim);
        Ok(model)
    }

    fn read_header<R: BufRead>(reader: &mut R) -> Result<(usize, usize), Error> {
        let mut header = String::new();
        reader.read_line(&mut header)?;
        let mut fields = header.split_whitespace().map(|f| f.parse::<usize>());
        match (fields.next(), fields.next()) {
            (Some(Ok(count)), Some(Ok(dim))) if dim > 0 => Ok((count, dim)),
            _ => Err(malformed(format!("bad header {:?}", header.trim_end()))),
        }
    }

    /// Read the binary layout: a text header `"<count> <dim>\n"`, then for each
    /// word its bytes, a space and `dim` little endian `f32` values.
    pub fn read_binary<R: BufRead>(mut reader: R) -> Result<Word2Vec, Error> {
        let (count, dim) = Word2Vec::read_header(&mut reader)?;
        let mut model = Word2Vec::with_dim(dim);
        let mut raw = vec![0u8; dim * 4];
        for i in 0..count {
            let mut word = Vec::new();
            reader.read_until(b' ', &mut word)?;
            if word.pop() != Some(b' ') {
                return Err(malformed(format!("entry {} is truncated", i)));
            }
            // entries may be separated by a newline
            while word.first() == Some(&b'\n') {
                word.remove(0);
            }
            reader.read_exact(&mut raw).map_err(|_| {
                malformed(format!("vector {} is truncated", i))
            })?;
            let vector = raw
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            model.push(String::from_utf8_lossy(&word).into_owned(), vector)?;
        }
        Ok(model)
    }

    /// Read the text layout: the same header, then one word and its values per line.
    pub fn read_text<R: BufRead>(mut reader: R) -> Result<Word2Vec, Error> {
        let (count, dim) = Word2Vec::read_header(&mut reader)?;
        let mut model = Word2Vec::with_dim(dim);
        for line in reader.lines().take(count) {
            let line = line?;
            let mut fields = line.split_whitespace();
            let word = match fields.next() {
                Some(word) => word.to_string(),
                None => continue,
            };
            let vector = fields
                .map(|f| f.parse::<f32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| malformed(format!("vector for {:?}: {}", word, e)))?;
            model.push(word, vector)?;
        }
        Ok(model)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    fn vector(&self, i: usize) -> &[f32] {
        &self.vectors[i * self.dim..(i + 1) * self.dim]
    }
}

impl EmbeddingModel for Word2Vec {
    /// Ranks all other words by cosine similarity; the query word itself is skipped.
    fn nearest(&self, word: &str, k: usize) -> Result<Vec<(String, f32)>, Error> {
        let &i = self
            .index
            .get(word)
            .ok_or_else(|| Error::OutOfVocabulary(word.to_string()))?;
        let query = self.vector(i);
        let mut scores: Vec<(usize, f32)> = (0..self.words.len())
            .filter(|&j| j != i)
            .map(|j| {
                let dot = self
                    .vector(j)
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| a * b)
                    .sum::<f32>();
                (j, dot)
            })
            .collect();
        let by_score = |a: &(usize, f32), b: &(usize, f32)| b.1.total_cmp(&a.1);
        if k == 0 {
            return Ok(Vec::new());
        }
        if k < scores.len() {
            scores.select_nth_unstable_by(k - 1, by_score);
            scores.truncate(k);
        }
        scores.sort_by(by_score);
        Ok(scores
            .into_iter()
            .map(|(j, score)| (self.words[j].clone(), score))
            .collect())
    }
}
