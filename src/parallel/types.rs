use serde::Serialize;

/// An indexed unit of input. The index is the only link between input and output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem<T> {
    pub index: usize,
    pub value: T,
}

/// Transformed counterpart of a [`WorkItem`], carrying the same index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultItem<U> {
    pub index: usize,
    pub value: U,
}

impl<T> WorkItem<T> {
    pub fn new(index: usize, value: T) -> Self {
        Self { index, value }
    }

    /// Apply `transform` to the value, keeping the index
    pub fn map<U, F>(self, transform: F) -> ResultItem<U>
    where
        F: FnOnce(T) -> U,
    {
        ResultItem {
            index: self.index,
            value: transform(self.value),
        }
    }
}
