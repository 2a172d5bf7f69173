//! Symbol directory
//!
//! The directory is the one-time message that maps a symbol index to its
//! ticker and display name. The index is the only join key used by later
//! update messages, so an index never changes meaning within a session.

use serde::{Deserialize, Serialize};

/// Index of a symbol inside the session directory.
pub type SymbolIndex = u32;

/// A single directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub ticker: String,
    pub name: String,
}

/// Ordered symbol directory, fixed for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    entries: Vec<DirectoryEntry>,
}

impl Directory {
    /// Build a directory from entries in index order.
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        Self { entries }
    }

    /// Build from the two parallel columns carried on the wire.
    ///
    /// Extra tickers without a name get an empty display name; extra names
    /// without a ticker are ignored.
    pub fn from_columns(symbols: Vec<String>, names: Vec<String>) -> Self {
        let mut names = names.into_iter();
        let entries = symbols
            .into_iter()
            .map(|ticker| DirectoryEntry {
                ticker,
                name: names.next().unwrap_or_default(),
            })
            .collect();
        Self { entries }
    }

    /// Split back into the `(symbols, names)` columns.
    pub fn to_columns(&self) -> (Vec<String>, Vec<String>) {
        self.entries
            .iter()
            .map(|e| (e.ticker.clone(), e.name.clone()))
            .unzip()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: SymbolIndex) -> Option<&DirectoryEntry> {
        self.entries.get(index as usize)
    }

    pub fn ticker(&self, index: SymbolIndex) -> Option<&str> {
        self.get(index).map(|e| e.ticker.as_str())
    }

    /// Look up the index of a ticker.
    pub fn index_of(&self, ticker: &str) -> Option<SymbolIndex> {
        self.entries
            .iter()
            .position(|e| e.ticker == ticker)
            .map(|i| i as SymbolIndex)
    }

    pub fn contains(&self, index: SymbolIndex) -> bool {
        (index as usize) < self.entries.len()
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Iterate `(index, entry)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolIndex, &DirectoryEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i as SymbolIndex, e))
    }
}
