use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::reader::open_corpus;
use crate::Error;

#[derive(thiserror::Error, Debug)]
pub enum WeightsError {
    #[error("line {line}: expected `name value`, got {content:?}")]
    Malformed { line: usize, content: String },
}

/// Named feature weights of the decoder's linear model
///
/// Features that are not listed have weight 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Weights {
    weights: HashMap<String, f64>,
}

impl Weights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `name value` lines, `#` starts a comment.
    pub fn read_weights_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::parse(open_corpus(path)?)
    }

    pub fn parse(reader: impl BufRead) -> Result<Self, Error> {
        let mut weights = Self::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let content = line.split('#').next().unwrap_or_default().trim();
            if content.is_empty() {
                continue;
            }
            let malformed = || WeightsError::Malformed {
                line: idx + 1,
                content: line.clone(),
            };
            let mut pieces = content.split_whitespace();
            let (name, value) = match (pieces.next(), pieces.next(), pieces.next()) {
                (Some(name), Some(value), None) => (name, value),
                _ => return Err(malformed().into()),
            };
            let value = value.parse::<f64>().map_err(|_| malformed())?;
            weights.set(name, value);
        }
        Ok(weights)
    }

    pub fn get(&self, name: &str) -> f64 {
        self.weights.get(name).copied().unwrap_or(0.0)
    }

    pub fn get_or(&self, name: &str, default: f64) -> f64 {
        self.weights.get(name).copied().unwrap_or(default)
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.weights.insert(name.to_string(), value);
    }

    /// Dot product with sparse named features, unknown names contribute nothing.
    pub fn score<'a>(&self, features: impl IntoIterator<Item = (&'a str, f64)>) -> f64 {
        features
            .into_iter()
            .map(|(name, value)| self.get(name) * value)
            .sum()
    }
}
