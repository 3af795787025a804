use std::io::{BufRead, Lines};
use std::num::NonZeroUsize;

use crate::mapping::BidirectionalMapping;

mod counts;
#[cfg(test)]
mod test;

pub use counts::{Counts, InvalidCounts, NGramCardinality};

#[derive(thiserror::Error, Debug)]
pub enum ArpaReadError {
    #[error("The /data/ header is missing")]
    DataHeaderMissing,
    #[error("NGram Count Section could not be parsed.")]
    NgramCountsBroken,
    #[error("NGram counts are missing in the \\data\\ section")]
    NgramCountsMissing,
    #[error("A NGram section with backoff is malformed: {0}")]
    BackOffSectionError(String),
    #[error("A NGram section is missing its header.")]
    NGramSectionHeaderMissing,
    #[error("A NGram section mismatch. Got: {0}; Expected: {1}")]
    NGramSectionHeaderMismatch(String, String),
    #[error("actual NGram count does not match the header description.")]
    NgramCountsMismatch,
    #[error("Decoding the count header failed")]
    CountHeaderError(#[from] InvalidCounts),
    #[error("A boundary between sections is missing. An empty line is expected")]
    SectionBoundaryMissing,
    #[error("The no-backoff section is malformed: {0}")]
    NoBackoffSectionError(String),
    #[error("An IO error occurred while reading the arpa file: {0}")]
    IoError(#[from] std::io::Error),
}

/// log10 probability and log10 backoff weight of an ngram
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbBackoff {
    pub log_prob: f32,
    pub backoff: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbBackoffNgram<T> {
    pub ngram: T,
    pub prob_backoff: ProbBackoff,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbNgram<T> {
    pub ngram: T,
    pub log_prob: f32,
}

pub struct ArpaFileSections<T>
where
    T: NGramProcessor,
{
    pub counts: Counts,
    pub backoffs: Vec<Vec<ProbBackoffNgram<T::Output>>>,
    pub no_backoff: Vec<ProbNgram<T::Output>>,
}

/// Turns the whitespace separated words of an ngram into its in-memory representation
pub trait NGramProcessor {
    type Output;

    fn process_ngram<'a>(&mut self, pieces: impl Iterator<Item = &'a str>) -> Self::Output;
}

/// Maps every word through a [BidirectionalMapping], adding unseen words
pub struct IntVocabProcessor<'m, M>(pub &'m mut M);

impl<'m, M> NGramProcessor for IntVocabProcessor<'m, M>
where
    M: BidirectionalMapping<u32, String>,
{
    type Output = Vec<u32>;

    fn process_ngram<'a>(&mut self, pieces: impl Iterator<Item = &'a str>) -> Self::Output {
        pieces
            .map(|pc| self.0.insert_or_get_index(pc.to_string()))
            .collect()
    }
}

/// Arpa reader
///
/// This struct consumes a [BufRead] and tries to parse its contents into a
/// structured representation of the arpa format.
///
/// An arpa file contains multiple sections, each section ends with an empty
/// line and has a heading which has `\` as the first.
///
/// The header of the first section is `\data\` and is expected on the first
/// non-empty line. The `\data\` heading is followed by n lines of the format
/// `ngram <order>=count` where `<order>` is within `1..=n` and n is the order
/// of the ngram model described by the arpa file.
///
/// The data section is followed by `n` ngram sections. Each n-gram section has
/// a heading of the format `\<order>-grams:`. The n-gram sections are expected
/// to be sorted in ascending order. Each n-gram section has exactly as many
/// rows as described in the count header line describing the current section.
///
/// Rows of the first `n-1` sections are `log_prob w_1 .. w_k [backoff]`, a
/// missing backoff column means a backoff of 0. The last section has no
/// backoff column at all. Whatever follows the last section (usually `\end\`)
/// is ignored.
pub struct ArpaReader<B, T> {
    reader: Lines<B>,
    counts: Counts,
    cur_section: NonZeroUsize,
    ngram_processor: T,
}

impl<B, T> ArpaReader<B, T>
where
    B: BufRead,
    T: NGramProcessor,
{
    const ARPA_DATA_HEADER: &'static str = "\\data\\";
    const ARPA_NGRAM_KEY: &'static str = "ngram ";

    /// Constructs the ArpaReader, parses the header
    ///
    /// Constructs the ArpaReader and validates it by parsing the count header
    /// describing the file.
    pub fn new(reader: B, ngram_processor: T) -> Result<Self, ArpaReadError> {
        let mut reader = reader.lines();
        let counts = Self::read_count_header(&mut reader)?;

        Ok(Self {
            counts,
            reader,
            cur_section: NonZeroUsize::MIN,
            ngram_processor,
        })
    }

    /// Returns the order of the model described by the arpa file.
    pub fn order(&self) -> NonZeroUsize {
        self.counts.order()
    }

    /// Returns the count header of the arpa file.
    pub fn counts(&self) -> &Counts {
        &self.counts
    }

    /// Parse the n-gram sections
    ///
    /// Consumes the remainder of the reader and parses it according to the count-header of
    /// the file. The backoff sections come in ascending ngram order, the highest order section
    /// has no backoff values.
    pub fn into_arpa_sections(mut self) -> Result<ArpaFileSections<T>, ArpaReadError> {
        let mut backoffs = vec![];
        while let Some(backoff) = self.next_backoff_section()? {
            backoffs.push(backoff)
        }
        let no_backoff = self.read_no_backoff_section()?;
        let Self { counts, .. } = self;
        Ok(ArpaFileSections {
            counts,
            backoffs,
            no_backoff,
        })
    }

    fn read_count_header(reader: &mut Lines<B>) -> Result<Counts, ArpaReadError> {
        let mut header = None;
        for line in reader.by_ref() {
            let line = line?;
            if !line.trim().is_empty() {
                header = Some(line);
                break;
            }
        }
        if header.as_deref().map(str::trim) != Some(Self::ARPA_DATA_HEADER) {
            return Err(ArpaReadError::DataHeaderMissing);
        }

        let mut counts = vec![];
        while let Some(line) = reader.next().transpose()? {
            if line.trim().is_empty() {
                break;
            }

            if let Some(suffix) = line.strip_prefix(Self::ARPA_NGRAM_KEY) {
                counts.push(NGramCardinality::try_from_ngram_line_suffix(suffix)?);
            }
        }
        if counts.is_empty() {
            return Err(ArpaReadError::NgramCountsMissing);
        }
        Ok(Counts::from_count_vec(counts)?)
    }

    fn next_backoff_section(
        &mut self,
    ) -> Result<Option<Vec<ProbBackoffNgram<T::Output>>>, ArpaReadError> {
        if self.cur_section >= self.order() {
            return Ok(None);
        }
        let count = match self.counts.get(self.cur_section) {
            Some(cnt) => *cnt,
            None => return Ok(None),
        };

        self.expect_section_header(count.order)?;

        let mut prob_backoff_ngrams = Vec::with_capacity(count.cardinality);
        for _ in 0..count.cardinality {
            match self.next_row()? {
                Some(line) => prob_backoff_ngrams
                    .push(self.try_back_off_from_arpa_line(&line, count.order.get())?),
                None => break,
            }
        }

        if prob_backoff_ngrams.len() != count.cardinality {
            return Err(ArpaReadError::NgramCountsMismatch);
        }
        self.expect_section_boundary()?;
        self.cur_section = self.cur_section.saturating_add(1);
        Ok(Some(prob_backoff_ngrams))
    }

    fn read_no_backoff_section(&mut self) -> Result<Vec<ProbNgram<T::Output>>, ArpaReadError> {
        let count = *self.counts.highest_order_count();

        self.expect_section_header(count.order)?;
        let mut prob_ngrams = Vec::with_capacity(count.cardinality);
        for _ in 0..count.cardinality {
            match self.next_row()? {
                Some(line) => prob_ngrams.push(self.try_no_backoff_from_arpa_line(&line)?),
                None => break,
            }
        }

        if prob_ngrams.len() != count.cardinality {
            return Err(ArpaReadError::NgramCountsMismatch);
        }
        self.expect_section_boundary()?;
        self.cur_section = self.cur_section.saturating_add(1);
        Ok(prob_ngrams)
    }

    /// Next ngram row of the current section, None at a blank line or the end of input.
    fn next_row(&mut self) -> Result<Option<String>, ArpaReadError> {
        match self.reader.next().transpose()? {
            Some(line) if !line.trim().is_empty() => Ok(Some(line)),
            _ => Ok(None),
        }
    }

    fn expect_section_header(&mut self, order: NonZeroUsize) -> Result<(), ArpaReadError> {
        match self.reader.next().transpose()? {
            Some(line) => matches_ngram_section_header(line.trim(), order),
            None => Err(ArpaReadError::NGramSectionHeaderMissing),
        }
    }

    fn expect_section_boundary(&mut self) -> Result<(), ArpaReadError> {
        if let Some(line) = self.reader.next().transpose()? {
            if !line.trim().is_empty() {
                return Err(ArpaReadError::SectionBoundaryMissing);
            }
        }
        Ok(())
    }

    fn try_back_off_from_arpa_line(
        &mut self,
        line: &str,
        order: usize,
    ) -> Result<ProbBackoffNgram<T::Output>, ArpaReadError> {
        let malformed = || ArpaReadError::BackOffSectionError(line.to_string());
        let pieces = line.split_ascii_whitespace().collect::<Vec<_>>();
        let backoff = match pieces.len() {
            n if n == order + 1 => 0f32,
            n if n == order + 2 => parse_float(pieces[order + 1]).ok_or_else(malformed)?,
            _ => return Err(malformed()),
        };
        let log_prob = parse_float(pieces[0]).ok_or_else(malformed)?;
        let ngram = self
            .ngram_processor
            .process_ngram(pieces[1..=order].iter().copied());

        Ok(ProbBackoffNgram {
            ngram,
            prob_backoff: ProbBackoff { log_prob, backoff },
        })
    }

    fn try_no_backoff_from_arpa_line(
        &mut self,
        line: &str,
    ) -> Result<ProbNgram<T::Output>, ArpaReadError> {
        let mut pieces = line.split_ascii_whitespace();
        let log_prob = pieces
            .next()
            .and_then(parse_float)
            .ok_or_else(|| ArpaReadError::NoBackoffSectionError(line.to_string()))?;

        let ngram = self.ngram_processor.process_ngram(pieces);

        Ok(ProbNgram { ngram, log_prob })
    }
}

fn parse_float(piece: &str) -> Option<f32> {
    piece.parse::<f32>().ok()
}

fn matches_ngram_section_header(line: &str, order: NonZeroUsize) -> Result<(), ArpaReadError> {
    let expected_header = format!("\\{}-grams:", order.get());
    if expected_header != line {
        return Err(ArpaReadError::NGramSectionHeaderMismatch(
            line.to_string(),
            expected_header,
        ));
    }
    Ok(())
}

pub fn read_arpa<B, T>(
    buf_read: B,
    ngram_processor: T,
) -> Result<ArpaFileSections<T>, ArpaReadError>
where
    B: BufRead,
    T: NGramProcessor,
{
    ArpaReader::new(buf_read, ngram_processor)?.into_arpa_sections()
}

impl NGramCardinality {
    fn try_from_ngram_line_suffix(suffix: &str) -> Result<Self, ArpaReadError> {
        let mut suffix_pieces = suffix.split('=');
        let mut parse_next_usize = || {
            if let Some(Ok(cardinality)) = suffix_pieces.next().map(|c| c.trim().parse::<usize>())
            {
                Ok(cardinality)
            } else {
                Err(ArpaReadError::NgramCountsBroken)
            }
        };
        let order = parse_next_usize()?;
        let cardinality = parse_next_usize()?;
        NGramCardinality::try_from_order_and_cardinality(order, cardinality)
            .map_err(|_| ArpaReadError::NgramCountsBroken)
    }
}
