pub mod bleu;
pub mod decoder;
pub mod phrase_table;
pub mod weights;

pub use bleu::BleuScore;
pub use decoder::{BeamDecoder, Decoder, DecoderConfig, ScoredPhrasePairForSentence};
pub use phrase_table::PhraseTable;
pub use weights::Weights;
