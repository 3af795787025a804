use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::mapping::StringIndexer;
use crate::reader::open_corpus;
use crate::Error;

use super::weights::Weights;

const FIELD_SEPARATOR: &str = "|||";

#[derive(thiserror::Error, Debug)]
pub enum PhraseTableError {
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: &'static str },
}

/// An English translation of a source phrase with its weighted model score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPhrase {
    pub english: Vec<String>,
    pub english_ids: Vec<u32>,
    pub score: f64,
}

/// Source phrase to scored English phrases
///
/// Rows are `french words ||| english words ||| name=value name=value ...`, the feature field
/// is optional. A phrase's score is the dot product of its features with the decoder
/// [Weights]. Source phrases longer than `max_phrase_size` are skipped, each source phrase
/// keeps its `max_translations` best targets.
#[derive(Debug)]
pub struct PhraseTable {
    max_phrase_size: usize,
    max_translations: usize,
    table: HashMap<Vec<String>, Vec<ScoredPhrase>>,
}

impl PhraseTable {
    pub fn new(max_phrase_size: usize, max_translations: usize) -> Self {
        Self {
            max_phrase_size,
            max_translations,
            table: HashMap::new(),
        }
    }

    pub fn max_phrase_size(&self) -> usize {
        self.max_phrase_size
    }

    /// Number of distinct source phrases
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn translations(&self, french: &[String]) -> &[ScoredPhrase] {
        self.table.get(french).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn read_from_file(
        &mut self,
        path: impl AsRef<Path>,
        weights: &Weights,
        indexer: &mut StringIndexer,
    ) -> Result<(), Error> {
        let path = path.as_ref();
        self.read(open_corpus(path)?, weights, indexer)?;
        tracing::info!(
            "read {} source phrases from {}",
            self.table.len(),
            path.display()
        );
        Ok(())
    }

    pub fn read(
        &mut self,
        reader: impl BufRead,
        weights: &Weights,
        indexer: &mut StringIndexer,
    ) -> Result<(), Error> {
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let malformed = |reason| PhraseTableError::Malformed {
                line: idx + 1,
                reason,
            };
            let mut fields = line.split(FIELD_SEPARATOR);
            let (french, english) = match (fields.next(), fields.next()) {
                (Some(french), Some(english)) => (french, english),
                _ => return Err(malformed("expected `french ||| english ||| features`").into()),
            };
            let french = french
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>();
            if french.is_empty() {
                return Err(malformed("empty source phrase").into());
            }
            if french.len() > self.max_phrase_size {
                continue;
            }

            let mut features = vec![];
            for feature in fields.next().unwrap_or_default().split_whitespace() {
                let (name, value) = feature
                    .split_once('=')
                    .ok_or_else(|| malformed("features must be `name=value`"))?;
                let value = value
                    .parse::<f64>()
                    .map_err(|_| malformed("feature value is not a number"))?;
                features.push((name, value));
            }
            let score = weights.score(features);

            let english = english
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>();
            let english_ids = indexer.index_all(&english);
            self.table.entry(french).or_default().push(ScoredPhrase {
                english,
                english_ids,
                score,
            });
        }
        self.prune();
        Ok(())
    }

    fn prune(&mut self) {
        let keep = self.max_translations;
        for translations in self.table.values_mut() {
            translations.sort_by(|a, b| b.score.total_cmp(&a.score));
            translations.truncate(keep);
        }
    }
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;

    use super::{PhraseTable, PhraseTableError};
    use crate::mapping::StringIndexer;
    use crate::mt::weights::Weights;
    use crate::Error;

    fn phrase(words: &str) -> Vec<String> {
        words.split_whitespace().map(str::to_string).collect()
    }

    fn weights() -> Weights {
        let mut weights = Weights::new();
        weights.set("p", 1.0);
        weights.set("q", 0.5);
        weights
    }

    #[test]
    fn keeps_best_translations() {
        let input = "\
das ||| the ||| p=-0.1 q=-0.2
das ||| that ||| p=-1.0
das ||| this ||| p=-0.5
das haus ||| the house ||| p=-0.3
a b c ||| too long |||
";
        let mut table = PhraseTable::new(2, 2);
        let mut indexer = StringIndexer::new();
        table.read(input.as_bytes(), &weights(), &mut indexer).unwrap();

        assert_eq!(table.len(), 2);
        let das = table.translations(&phrase("das"));
        assert_eq!(das.len(), 2);
        assert_eq!(das[0].english, phrase("the"));
        assert_abs_diff_eq!(das[0].score, -0.2, epsilon = 1e-12);
        assert_eq!(das[1].english, phrase("this"));
        assert_eq!(table.translations(&phrase("das haus"))[0].english_ids.len(), 2);
        assert!(table.translations(&phrase("a b c")).is_empty());
        // english words are interned even for pruned translations
        assert!(indexer.index_of("that").is_some());
        assert!(indexer.index_of("too").is_none());
    }

    #[test]
    fn rejects_malformed_rows() {
        let mut table = PhraseTable::new(5, 30);
        let mut indexer = StringIndexer::new();
        let err = table
            .read("das the\n".as_bytes(), &weights(), &mut indexer)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PhraseTable(PhraseTableError::Malformed { line: 1, .. })
        ));
        let err = table
            .read("das ||| the ||| p:1\n".as_bytes(), &weights(), &mut indexer)
            .unwrap_err();
        assert!(matches!(err, Error::PhraseTable(_)));
    }

    #[test]
    fn reads_fixture() {
        let mut table = PhraseTable::new(5, 30);
        let mut indexer = StringIndexer::new();
        let weights = Weights::read_weights_file("test_data/lm/weights.txt").unwrap();
        table
            .read_from_file("test_data/lm/sanity_phrasetable.txt", &weights, &mut indexer)
            .unwrap();
        assert_eq!(table.translations(&phrase("haus"))[0].english, phrase("house"));
    }
}
