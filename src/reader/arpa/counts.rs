use std::num::NonZeroUsize;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum InvalidCounts {
    #[error("No ngram counts were given")]
    Empty,
    #[error("Ngram order 0 is not a thing")]
    ZeroOrder,
    #[error("Expected the count of order {expected} but got order {got}")]
    OrderGap { expected: usize, got: usize },
}

/// Number of distinct ngrams of one order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NGramCardinality {
    pub order: NonZeroUsize,
    pub cardinality: usize,
}

impl NGramCardinality {
    pub fn try_from_order_and_cardinality(
        order: usize,
        cardinality: usize,
    ) -> Result<Self, InvalidCounts> {
        Ok(Self {
            order: NonZeroUsize::new(order).ok_or(InvalidCounts::ZeroOrder)?,
            cardinality,
        })
    }
}

/// ARPA count header
///
/// Stores how many unique ngrams exist per order of the model, i.e. for a trigram model, how
/// many tri, bi and unigrams. Orders are consecutive and start at 1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Counts {
    counts: Vec<NGramCardinality>,
}

impl Counts {
    pub fn from_count_vec(mut counts: Vec<NGramCardinality>) -> Result<Self, InvalidCounts> {
        if counts.is_empty() {
            return Err(InvalidCounts::Empty);
        }
        counts.sort_by_key(|c| c.order);
        for (idx, count) in counts.iter().enumerate() {
            if count.order.get() != idx + 1 {
                return Err(InvalidCounts::OrderGap {
                    expected: idx + 1,
                    got: count.order.get(),
                });
            }
        }
        Ok(Self { counts })
    }

    /// Order of the model, the highest ngram length
    pub fn order(&self) -> NonZeroUsize {
        // from_count_vec guarantees a non-empty, 1-based sequence
        self.highest_order_count().order
    }

    pub fn get(&self, order: NonZeroUsize) -> Option<&NGramCardinality> {
        self.counts.get(order.get() - 1)
    }

    pub fn highest_order_count(&self) -> &NGramCardinality {
        &self.counts[self.counts.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = &NGramCardinality> {
        self.counts.iter()
    }
}

#[cfg(test)]
mod test {
    use super::{Counts, InvalidCounts, NGramCardinality};

    #[test]
    fn rejects_gaps() {
        let counts = Counts::from_count_vec(vec![
            NGramCardinality::try_from_order_and_cardinality(1, 10).unwrap(),
            NGramCardinality::try_from_order_and_cardinality(3, 10).unwrap(),
        ]);
        assert_eq!(
            counts,
            Err(InvalidCounts::OrderGap {
                expected: 2,
                got: 3
            })
        );
    }

    #[test]
    fn sorts_by_order() {
        let counts = Counts::from_count_vec(vec![
            NGramCardinality::try_from_order_and_cardinality(2, 7).unwrap(),
            NGramCardinality::try_from_order_and_cardinality(1, 4).unwrap(),
        ])
        .unwrap();
        assert_eq!(counts.order().get(), 2);
        assert_eq!(counts.highest_order_count().cardinality, 7);
    }

    #[test]
    fn zero_order_is_invalid() {
        assert_eq!(
            NGramCardinality::try_from_order_and_cardinality(0, 1),
            Err(InvalidCounts::ZeroOrder)
        );
    }
}
