use std::collections::HashMap;

pub trait BidirectionalMapping<INDEX, VALUE> {
    fn insert_or_get_index(&mut self, value: VALUE) -> INDEX;
    fn get_index(&self, value: &VALUE) -> Option<&INDEX>;
    fn get_value(&self, index: INDEX) -> Option<&VALUE>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dense, insertion ordered string ids
///
/// The [StringIndexer] hands out `u32` ids starting at 0 in the order strings are first seen.
/// The LM tester shares one instance between the language model, the phrase table and the
/// decoder so that all of them agree on word ids; the PCFG grammar uses another one for its
/// labels.
#[derive(Debug, Default, Clone)]
pub struct StringIndexer {
    reverse: Vec<String>,
    s2val: HashMap<String, u32>,
}

impl StringIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `key`, None if it was never inserted.
    pub fn index_of(&self, key: &str) -> Option<u32> {
        self.s2val.get(key).copied()
    }

    /// Like [BidirectionalMapping::insert_or_get_index] without forcing an owned key on hits.
    pub fn add_and_get_index(&mut self, key: &str) -> u32 {
        match self.s2val.get(key) {
            Some(idx) => *idx,
            None => self.insert_or_get_index(key.to_string()),
        }
    }

    pub fn index_all<S: AsRef<str>>(&mut self, words: &[S]) -> Vec<u32> {
        words
            .iter()
            .map(|w| self.add_and_get_index(w.as_ref()))
            .collect()
    }

    pub fn word(&self, index: u32) -> Option<&str> {
        self.reverse.get(index as usize).map(String::as_str)
    }
}

impl BidirectionalMapping<u32, String> for StringIndexer {
    fn insert_or_get_index(&mut self, value: String) -> u32 {
        *self.s2val.entry(value).or_insert_with_key(|value| {
            let idx = self.reverse.len() as u32;
            self.reverse.push(value.clone());
            idx
        })
    }
    fn get_index(&self, key: &String) -> Option<&u32> {
        self.s2val.get(key)
    }
    fn get_value(&self, index: u32) -> Option<&String> {
        self.reverse.get(index as usize)
    }
    fn len(&self) -> usize {
        self.reverse.len()
    }
}
