use anyhow::{Result, ensure};
use serde::Serialize;

use super::types::ResultItem;

/// Fixed-length collection indexed by work item index
///
/// Every slot starts unfilled at `U::default()` and is written at most once.
/// `filled` is serialized alongside `slots` so an unfilled slot can be told
/// apart from a result equal to the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderedResults<U> {
    slots: Vec<U>,
    filled: Vec<bool>,
    cancelled: bool,
}

impl<U> OrderedResults<U> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&U> {
        self.slots.get(index)
    }

    pub fn is_filled(&self, index: usize) -> bool {
        self.filled.get(index).copied().unwrap_or(false)
    }

    pub fn filled_count(&self) -> usize {
        self.filled.iter().filter(|filled| **filled).count()
    }

    /// Indices in `range` that never received a result
    pub fn missing(&self, range: std::ops::Range<usize>) -> Vec<usize> {
        range.filter(|index| !self.is_filled(*index)).collect()
    }

    /// Whether the run that produced this collection was cut short
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn as_slice(&self) -> &[U] {
        &self.slots
    }

    pub fn iter(&self) -> std::slice::Iter<'_, U> {
        self.slots.iter()
    }

    pub fn into_vec(self) -> Vec<U> {
        self.slots
    }
}

impl<U> std::ops::Index<usize> for OrderedResults<U> {
    type Output = U;

    fn index(&self, index: usize) -> &U {
        &self.slots[index]
    }
}

impl<'a, U> IntoIterator for &'a OrderedResults<U> {
    type Item = &'a U;
    type IntoIter = std::slice::Iter<'a, U>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

/// Rebuilds input order from an unordered stream of results
#[derive(Debug)]
pub struct Sequencer<U> {
    slots: Vec<U>,
    filled: Vec<bool>,
}

impl<U: Default> Sequencer<U> {
    pub fn new(len: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(U::default).take(len).collect(),
            filled: vec![false; len],
        }
    }

    /// Write one result into its slot. Out-of-range and repeated indices are rejected.
    pub fn accept(&mut self, item: ResultItem<U>) -> Result<()> {
        let len = self.slots.len();
        ensure!(
            item.index < len,
            "Result index {} is outside the collection (length {})",
            item.index,
            len
        );
        ensure!(
            !self.filled[item.index],
            "Result index {} was delivered more than once",
            item.index
        );

        self.slots[item.index] = item.value;
        self.filled[item.index] = true;
        Ok(())
    }

    /// Consume `stream` until it closes
    pub fn drain<I>(mut self, stream: I) -> Result<Self>
    where
        I: IntoIterator<Item = ResultItem<U>>,
    {
        for item in stream {
            self.accept(item)?;
        }
        Ok(self)
    }

    pub fn finish(self, cancelled: bool) -> OrderedResults<U> {
        OrderedResults {
            slots: self.slots,
            filled: self.filled,
            cancelled,
        }
    }
}
