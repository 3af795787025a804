use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::Error;

pub mod arpa;
pub mod treebank;

/// Opens `path` for buffered line reading
///
/// Files ending in `.gz` are decompressed on the fly, everything else is read as is.
pub fn open_corpus(path: impl AsRef<Path>) -> Result<Box<dyn BufRead>, Error> {
    let path = path.as_ref();
    let fd = File::open(path).map_err(|_| Error::FileNotFound(path.display().to_string()))?;
    if path.extension().map_or(false, |ext| ext == "gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(fd))))
    } else {
        Ok(Box::new(BufReader::new(fd)))
    }
}

/// Reads a sentence-per-line corpus
///
/// Every line is split on whitespace. Blank lines yield empty sentences so that two parallel
/// files keep their line alignment.
pub fn read_sentence_collection(path: impl AsRef<Path>) -> Result<Vec<Vec<String>>, Error> {
    let reader = open_corpus(path)?;
    reader
        .lines()
        .map(|line| {
            Ok(line?
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>())
        })
        .collect()
}

/// Locates `name` under `base`
///
/// Returns `base/name` if that exists. A missing `.gz` file falls back to its uncompressed
/// sibling when there is one. If neither exists the original path is returned and opening it
/// reports the error.
pub fn resolve_corpus_file(base: &Path, name: &str) -> PathBuf {
    let path = base.join(name);
    if path.exists() {
        return path;
    }
    if let Some(plain) = name.strip_suffix(".gz") {
        let plain = base.join(plain);
        if plain.exists() {
            return plain;
        }
    }
    path
}

#[cfg(test)]
mod test {
    use std::io::Write;
    use std::path::Path;

    use flate2::{write::GzEncoder, Compression};

    use super::{read_sentence_collection, resolve_corpus_file};
    use crate::Error;

    #[test]
    fn reads_plain_sentences() {
        let sentences = read_sentence_collection("test_data/lm/sanity_test.en").unwrap();
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0], vec!["the", "house", "is", "small"]);
    }

    #[test]
    fn reads_gzipped_sentences() {
        let dir = std::env::temp_dir().join(format!("nlp-harness-gz-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("corpus.en.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"a b c\n\nd e\n").unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let sentences = read_sentence_collection(&path).unwrap();
        assert_eq!(
            sentences,
            vec![
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
                vec![],
                vec!["d".to_string(), "e".to_string()],
            ]
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_reported() {
        match read_sentence_collection("no-file-to-be-found") {
            Ok(_) => panic!("There should be no file called 'no-file-to-be-found' around here."),
            Err(err) => assert!(matches!(err, Error::FileNotFound(_))),
        }
    }

    #[test]
    fn falls_back_to_uncompressed_file() {
        let base = Path::new("test_data/lm");
        let resolved = resolve_corpus_file(base, "sanity_training.en.gz");
        assert_eq!(resolved, base.join("sanity_training.en"));
        let missing = resolve_corpus_file(base, "nothing.gz");
        assert_eq!(missing, base.join("nothing.gz"));
    }
}
