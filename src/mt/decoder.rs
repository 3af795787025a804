use std::collections::HashMap;

use crate::lm::{NgramLanguageModel, START, STOP};
use crate::mapping::StringIndexer;

use super::phrase_table::PhraseTable;
use super::weights::Weights;

/// Id for words the shared indexer has never seen, every model scores it as unknown
const UNKNOWN_WORD: u32 = u32::MAX;
/// Phrase score of copying an untranslatable source word to the output
const PASSTHROUGH_SCORE: f64 = -10.0;

pub const LM_WEIGHT: &str = "lm";
pub const DISTORTION_WEIGHT: &str = "distortion";
pub const WORD_PENALTY_WEIGHT: &str = "wordPenalty";

/// One phrase of a translation: the source span `start..end` and its English side
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPhrasePairForSentence {
    pub start: usize,
    pub end: usize,
    pub english: Vec<String>,
    /// Weighted phrase table score
    pub score: f64,
}

pub trait Decoder {
    /// Phrases of the best translation of `french` in English order
    fn decode(&self, french: &[String]) -> Vec<ScoredPhrasePairForSentence>;
}

pub fn extract_english(phrases: &[ScoredPhrasePairForSentence]) -> Vec<String> {
    phrases
        .iter()
        .flat_map(|phrase| phrase.english.iter().cloned())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Hypotheses kept per stack
    pub beam_size: usize,
    /// Largest jump between the end of the last phrase and the start of the next one
    pub distortion_limit: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            beam_size: 100,
            distortion_limit: 5,
        }
    }
}

/// Bitset over source positions
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Coverage {
    bits: Vec<u64>,
}

impl Coverage {
    fn new(len: usize) -> Self {
        Self {
            bits: vec![0; (len + 63) / 64],
        }
    }

    fn is_covered(&self, idx: usize) -> bool {
        self.bits[idx / 64] & (1 << (idx % 64)) != 0
    }

    fn is_free(&self, start: usize, end: usize) -> bool {
        (start..end).all(|idx| !self.is_covered(idx))
    }

    fn cover(&self, start: usize, end: usize) -> Self {
        let mut covered = self.clone();
        for idx in start..end {
            covered.bits[idx / 64] |= 1 << (idx % 64);
        }
        covered
    }

    /// First uncovered position, `len` if there is none
    fn first_gap(&self, len: usize) -> usize {
        (0..len).find(|idx| !self.is_covered(*idx)).unwrap_or(len)
    }

    /// Maximal uncovered runs as `start..end` pairs
    fn gaps(&self, len: usize) -> Vec<(usize, usize)> {
        let mut gaps = vec![];
        let mut start = None;
        for idx in 0..len {
            match (self.is_covered(idx), start) {
                (false, None) => start = Some(idx),
                (true, Some(s)) => {
                    gaps.push((s, idx));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            gaps.push((s, len));
        }
        gaps
    }
}

#[derive(Debug, Clone)]
struct TranslationOption {
    start: usize,
    end: usize,
    english: Vec<String>,
    english_ids: Vec<u32>,
    score: f64,
}

#[derive(Debug)]
struct Hypothesis {
    coverage: Coverage,
    covered: usize,
    last_end: usize,
    lm_state: Vec<u32>,
    score: f64,
    future: f64,
    /// Predecessor in the arena and the (start, index) of the option that extended it
    back: Option<(usize, usize, usize)>,
}

impl Hypothesis {
    fn estimate(&self) -> f64 {
        self.score + self.future
    }
}

type RecombinationKey = (Coverage, usize, Vec<u32>);

/// Phrase-based stack decoder
///
/// Stack `k` holds hypotheses covering `k` source words. A hypothesis is extended by every
/// translation option over a free span that keeps the jump from the previous phrase, and the
/// jump back to the first gap, within the distortion limit. Hypotheses that agree on coverage,
/// the end of the last phrase and the LM context are recombined, keeping the better one. Stacks
/// are pruned to the beam size by model score plus a future cost estimate of the uncovered
/// spans.
pub struct BeamDecoder<'a> {
    lm: &'a dyn NgramLanguageModel,
    table: &'a PhraseTable,
    indexer: &'a StringIndexer,
    lm_weight: f64,
    distortion_weight: f64,
    word_penalty_weight: f64,
    config: DecoderConfig,
}

impl<'a> BeamDecoder<'a> {
    pub fn new(
        table: &'a PhraseTable,
        lm: &'a dyn NgramLanguageModel,
        indexer: &'a StringIndexer,
        weights: &Weights,
        config: DecoderConfig,
    ) -> Self {
        Self {
            lm,
            table,
            indexer,
            lm_weight: weights.get_or(LM_WEIGHT, 1.0),
            distortion_weight: weights.get(DISTORTION_WEIGHT),
            word_penalty_weight: weights.get(WORD_PENALTY_WEIGHT),
            config,
        }
    }

    fn word_id(&self, word: &str) -> u32 {
        self.indexer.index_of(word).unwrap_or(UNKNOWN_WORD)
    }

    /// Options grouped by start position, every position gets at least a passthrough option
    fn translation_options(&self, french: &[String]) -> Vec<Vec<TranslationOption>> {
        let len = french.len();
        let max_phrase = self.table.max_phrase_size().max(1);
        (0..len)
            .map(|start| {
                let mut options = vec![];
                for end in start + 1..=(start + max_phrase).min(len) {
                    for phrase in self.table.translations(&french[start..end]) {
                        options.push(TranslationOption {
                            start,
                            end,
                            english: phrase.english.clone(),
                            english_ids: phrase.english_ids.clone(),
                            score: phrase.score,
                        });
                    }
                }
                if !options.iter().any(|option| option.end == start + 1) {
                    options.push(TranslationOption {
                        start,
                        end: start + 1,
                        english: vec![french[start].clone()],
                        english_ids: vec![self.word_id(&french[start])],
                        score: PASSTHROUGH_SCORE,
                    });
                }
                options
            })
            .collect()
    }

    /// Weighted LM score of appending `words` after `state`, and the resulting state
    fn lm_score(&self, state: &[u32], words: &[u32]) -> (f64, Vec<u32>) {
        let order = self.lm.order().max(1);
        let mut buffer = state.to_vec();
        buffer.extend_from_slice(words);
        let mut score = 0.0;
        for end in state.len() + 1..=buffer.len() {
            score += self
                .lm
                .ngram_log_probability(&buffer, end.saturating_sub(order), end);
        }
        let next = buffer[buffer.len().saturating_sub(order - 1)..].to_vec();
        (self.lm_weight * score, next)
    }

    fn local_score(&self, option: &TranslationOption) -> f64 {
        option.score + self.word_penalty_weight * option.english.len() as f64
    }

    /// Best context free score for every source span, indexed `[start][end]`
    fn future_costs(&self, options: &[Vec<TranslationOption>], len: usize) -> Vec<Vec<f64>> {
        let mut future = vec![vec![f64::NEG_INFINITY; len + 1]; len + 1];
        for option in options.iter().flatten() {
            let (lm, _) = self.lm_score(&[], &option.english_ids);
            let estimate = self.local_score(option) + lm;
            let best = &mut future[option.start][option.end];
            *best = best.max(estimate);
        }
        for span in 2..=len {
            for start in 0..=len - span {
                let end = start + span;
                for split in start + 1..end {
                    let combined = future[start][split] + future[split][end];
                    if combined > future[start][end] {
                        future[start][end] = combined;
                    }
                }
            }
        }
        future
    }

    fn initial_state(&self) -> Vec<u32> {
        vec![self.word_id(START); self.lm.order().saturating_sub(1)]
    }

    fn backtrack(
        &self,
        arena: &[Hypothesis],
        options: &[Vec<TranslationOption>],
        mut idx: usize,
    ) -> Vec<ScoredPhrasePairForSentence> {
        let mut phrases = vec![];
        while let Some((prev, start, option_idx)) = arena[idx].back {
            let option = &options[start][option_idx];
            phrases.push(ScoredPhrasePairForSentence {
                start: option.start,
                end: option.end,
                english: option.english.clone(),
                score: option.score,
            });
            idx = prev;
        }
        phrases.reverse();
        phrases
    }
}

impl Decoder for BeamDecoder<'_> {
    fn decode(&self, french: &[String]) -> Vec<ScoredPhrasePairForSentence> {
        let len = french.len();
        if len == 0 {
            return vec![];
        }
        let options = self.translation_options(french);
        let future = self.future_costs(&options, len);
        let future_of = |coverage: &Coverage| -> f64 {
            coverage
                .gaps(len)
                .into_iter()
                .map(|(start, end)| future[start][end])
                .sum()
        };
        let stop = self.word_id(STOP);
        let limit = self.config.distortion_limit;

        let empty = Coverage::new(len);
        let mut arena = vec![Hypothesis {
            future: future_of(&empty),
            coverage: empty,
            covered: 0,
            last_end: 0,
            lm_state: self.initial_state(),
            score: 0.0,
            back: None,
        }];
        let mut stacks: Vec<HashMap<RecombinationKey, usize>> = vec![HashMap::new(); len + 1];
        stacks[0].insert((arena[0].coverage.clone(), 0, arena[0].lm_state.clone()), 0);

        for covered in 0..len {
            let mut beam = stacks[covered].values().copied().collect::<Vec<_>>();
            beam.sort_by(|a, b| arena[*b].estimate().total_cmp(&arena[*a].estimate()));
            beam.truncate(self.config.beam_size);

            for hyp_idx in beam {
                for (start, start_options) in options.iter().enumerate() {
                    if start.abs_diff(arena[hyp_idx].last_end) > limit {
                        continue;
                    }
                    for (option_idx, option) in start_options.iter().enumerate() {
                        let hyp = &arena[hyp_idx];
                        if !hyp.coverage.is_free(option.start, option.end) {
                            continue;
                        }
                        let coverage = hyp.coverage.cover(option.start, option.end);
                        let gap = coverage.first_gap(len);
                        if gap < len && gap.abs_diff(option.end) > limit {
                            continue;
                        }

                        let (lm, lm_state) = self.lm_score(&hyp.lm_state, &option.english_ids);
                        let distortion = start.abs_diff(hyp.last_end) as f64;
                        let mut score = hyp.score
                            + self.local_score(option)
                            + lm
                            + self.distortion_weight * distortion;
                        let next_covered = covered + option.end - option.start;
                        if next_covered == len {
                            score += self.lm_score(&lm_state, &[stop]).0;
                        }

                        let key = (coverage, option.end, lm_state);
                        if let Some(existing) = stacks[next_covered].get(&key) {
                            if arena[*existing].score >= score {
                                continue;
                            }
                        }
                        let (coverage, last_end, lm_state) = key.clone();
                        arena.push(Hypothesis {
                            future: future_of(&coverage),
                            coverage,
                            covered: next_covered,
                            last_end,
                            lm_state,
                            score,
                            back: Some((hyp_idx, start, option_idx)),
                        });
                        stacks[next_covered].insert(key, arena.len() - 1);
                    }
                }
            }
        }

        let best = stacks
            .iter()
            .rev()
            .find_map(|stack| {
                stack
                    .values()
                    .copied()
                    .max_by(|a, b| arena[*a].estimate().total_cmp(&arena[*b].estimate()))
            })
            .unwrap_or(0);
        if arena[best].covered < len {
            tracing::warn!(
                covered = arena[best].covered,
                len,
                "no hypothesis covers the whole sentence"
            );
        }
        self.backtrack(&arena, &options, best)
    }
}

#[cfg(test)]
mod test {
    use super::{
        extract_english, BeamDecoder, Coverage, Decoder, DecoderConfig,
        ScoredPhrasePairForSentence,
    };
    use crate::lm::{
        KneserNeyTrigramLanguageModel, NgramLanguageModel, StubLanguageModel, START, STOP,
    };
    use crate::mapping::StringIndexer;
    use crate::mt::phrase_table::PhraseTable;
    use crate::mt::weights::Weights;
    use crate::reader::read_sentence_collection;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    fn load(indexer: &mut StringIndexer) -> (PhraseTable, Weights) {
        let weights = Weights::read_weights_file("test_data/lm/weights.txt").unwrap();
        let mut table = PhraseTable::new(5, 30);
        table
            .read_from_file("test_data/lm/sanity_phrasetable.txt", &weights, indexer)
            .unwrap();
        (table, weights)
    }

    #[test]
    fn coverage_tracks_gaps() {
        let coverage = Coverage::new(70).cover(0, 2).cover(5, 66);
        assert!(coverage.is_covered(65));
        assert!(!coverage.is_covered(66));
        assert!(coverage.is_free(2, 5));
        assert!(!coverage.is_free(4, 6));
        assert_eq!(coverage.first_gap(70), 2);
        assert_eq!(coverage.gaps(70), vec![(2, 5), (66, 70)]);
        assert_eq!(Coverage::new(3).cover(0, 3).first_gap(3), 3);
    }

    #[test]
    fn english_is_concatenated() {
        let phrases = vec![
            ScoredPhrasePairForSentence {
                start: 0,
                end: 2,
                english: words("the house"),
                score: -0.1,
            },
            ScoredPhrasePairForSentence {
                start: 2,
                end: 3,
                english: words("is"),
                score: -0.2,
            },
        ];
        assert_eq!(extract_english(&phrases), words("the house is"));
    }

    #[test]
    fn decodes_with_phrase_scores_only() {
        let mut indexer = StringIndexer::new();
        let (table, weights) = load(&mut indexer);
        let lm = StubLanguageModel;
        let decoder =
            BeamDecoder::new(&table, &lm, &indexer, &weights, DecoderConfig::default());

        let phrases = decoder.decode(&words("das haus ist klein"));
        assert_eq!(extract_english(&phrases), words("the house is small"));
        assert_eq!((phrases[0].start, phrases[0].end), (0, 2));
        assert!(decoder.decode(&[]).is_empty());
    }

    #[test]
    fn unknown_words_pass_through() {
        let mut indexer = StringIndexer::new();
        let (table, weights) = load(&mut indexer);
        let lm = StubLanguageModel;
        let decoder =
            BeamDecoder::new(&table, &lm, &indexer, &weights, DecoderConfig::default());
        let english = extract_english(&decoder.decode(&words("das haus ist alt")));
        assert_eq!(english, words("the house is alt"));
    }

    #[test]
    fn language_model_picks_fluent_translation() {
        let mut indexer = StringIndexer::new();
        let training = read_sentence_collection("test_data/lm/sanity_training.en").unwrap();
        let lm = KneserNeyTrigramLanguageModel::train(&training, &mut indexer, 0.75).unwrap();
        let (table, weights) = load(&mut indexer);
        let decoder =
            BeamDecoder::new(&table, &lm, &indexer, &weights, DecoderConfig::default());

        let english = extract_english(&decoder.decode(&words("das buch ist sehr klein")));
        assert_eq!(english, words("the book is very small"));
    }

    #[test]
    fn zero_distortion_limit_is_monotone() {
        let mut indexer = StringIndexer::new();
        let (table, weights) = load(&mut indexer);
        let lm = StubLanguageModel;
        let config = DecoderConfig {
            beam_size: 10,
            distortion_limit: 0,
        };
        let decoder = BeamDecoder::new(&table, &lm, &indexer, &weights, config);
        let phrases = decoder.decode(&words("klein ist das haus"));
        let mut expected_start = 0;
        for phrase in &phrases {
            assert_eq!(phrase.start, expected_start);
            expected_start = phrase.end;
        }
        assert_eq!(expected_start, 4);
    }

    /// Bigram model that likes a fixed set of bigrams and dislikes everything else
    struct PreferredBigrams {
        preferred: Vec<(u32, u32)>,
    }

    impl NgramLanguageModel for PreferredBigrams {
        fn order(&self) -> usize {
            2
        }

        fn ngram_log_probability(&self, ngram: &[u32], from: usize, to: usize) -> f64 {
            match ngram[from..to] {
                [v, w] if self.preferred.contains(&(v, w)) => 0.0,
                _ => -5.0,
            }
        }

        fn count(&self, _ngram: &[u32]) -> u64 {
            0
        }
    }

    /// `a b c` translates word by word to `A B C`, the language model wants `C A B`
    fn reordering_setup(indexer: &mut StringIndexer) -> (PhraseTable, Weights, PreferredBigrams) {
        let mut weights = Weights::new();
        weights.set("p", 1.0);
        weights.set("distortion", -0.1);
        let mut table = PhraseTable::new(5, 30);
        let rows = "a ||| A ||| p=0\nb ||| B ||| p=0\nc ||| C ||| p=0\n";
        table.read(rows.as_bytes(), &weights, indexer).unwrap();
        let start = indexer.add_and_get_index(START);
        let stop = indexer.add_and_get_index(STOP);
        let id = |w: &str| indexer.index_of(w).unwrap();
        let lm = PreferredBigrams {
            preferred: vec![
                (start, id("C")),
                (id("C"), id("A")),
                (id("A"), id("B")),
                (id("B"), stop),
            ],
        };
        (table, weights, lm)
    }

    #[test]
    fn reorders_within_the_distortion_limit() {
        let mut indexer = StringIndexer::new();
        let (table, weights, lm) = reordering_setup(&mut indexer);
        let config = DecoderConfig {
            beam_size: 100,
            distortion_limit: 3,
        };
        let decoder = BeamDecoder::new(&table, &lm, &indexer, &weights, config);
        let phrases = decoder.decode(&words("a b c"));
        assert_eq!(extract_english(&phrases), words("C A B"));
        let starts = phrases.iter().map(|phrase| phrase.start).collect::<Vec<_>>();
        assert_eq!(starts, vec![2, 0, 1]);
    }

    #[test]
    fn return_to_first_gap_respects_the_distortion_limit() {
        let mut indexer = StringIndexer::new();
        let (table, weights, lm) = reordering_setup(&mut indexer);
        // jumping to `c` is 2 words, but coming back to `a` afterwards would be 3
        let config = DecoderConfig {
            beam_size: 100,
            distortion_limit: 2,
        };
        let decoder = BeamDecoder::new(&table, &lm, &indexer, &weights, config);
        let english = extract_english(&decoder.decode(&words("a b c")));
        assert_eq!(english, words("A B C"));
    }

    fn recombination_decoder_output(table: &str) -> Vec<ScoredPhrasePairForSentence> {
        let mut indexer = StringIndexer::new();
        let mut weights = Weights::new();
        weights.set("p", 1.0);
        weights.set("distortion", -0.1);
        let mut phrase_table = PhraseTable::new(5, 30);
        phrase_table.read(table.as_bytes(), &weights, &mut indexer).unwrap();
        let lm = StubLanguageModel;
        let decoder =
            BeamDecoder::new(&phrase_table, &lm, &indexer, &weights, DecoderConfig::default());
        decoder.decode(&words("a b"))
    }

    #[test]
    fn recombination_keeps_the_better_hypothesis() {
        // both segmentations end in the same state, the two phrase path arrives last
        let phrases = recombination_decoder_output(
            "a b ||| X Y ||| p=-0.5\na ||| X ||| p=-1\nb ||| Y ||| p=-1\n",
        );
        assert_eq!(extract_english(&phrases), words("X Y"));
        assert_eq!(phrases.len(), 1);

        let phrases = recombination_decoder_output(
            "a b ||| X Y ||| p=-1\na ||| X ||| p=-0.1\nb ||| Y ||| p=-0.1\n",
        );
        assert_eq!(extract_english(&phrases), words("X Y"));
        assert_eq!(
            phrases.iter().map(|phrase| (phrase.start, phrase.end)).collect::<Vec<_>>(),
            vec![(0, 1), (1, 2)]
        );
    }
}
