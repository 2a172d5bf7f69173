//! Static reference table
//!
//! Loaded once at process start and never mutated by the pipeline. It seeds
//! the oscillator state on the server and is the source for generated
//! positions on the client. Table order defines the session directory.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::directory::{Directory, DirectoryEntry};
use crate::errors::ReferenceError;

/// One row of the reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRow {
    pub symbol: String,
    pub name: String,
    pub last: f64,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
}

/// Validated reference table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceTable {
    rows: Vec<ReferenceRow>,
}

impl ReferenceTable {
    /// Validate and wrap a set of rows.
    pub fn new(rows: Vec<ReferenceRow>) -> Result<Self, ReferenceError> {
        if rows.is_empty() {
            return Err(ReferenceError::Empty);
        }

        let mut seen = BTreeSet::new();
        for (row_no, row) in rows.iter().enumerate() {
            if row.symbol.trim().is_empty() {
                return Err(ReferenceError::EmptySymbol { row: row_no });
            }
            if !seen.insert(row.symbol.as_str()) {
                return Err(ReferenceError::DuplicateSymbol {
                    symbol: row.symbol.clone(),
                });
            }
            if !(row.last.is_finite() && row.last > 0.0) {
                return Err(ReferenceError::InvalidPrice {
                    symbol: row.symbol.clone(),
                    reason: format!("last {} must be positive", row.last),
                });
            }
            if !(row.high >= row.low && row.low > 0.0) {
                return Err(ReferenceError::InvalidPrice {
                    symbol: row.symbol.clone(),
                    reason: format!("high {} / low {} out of range", row.high, row.low),
                });
            }
        }

        Ok(Self { rows })
    }

    /// Parse a JSON array of rows.
    pub fn from_json(json: &str) -> Result<Self, ReferenceError> {
        let rows: Vec<ReferenceRow> =
            serde_json::from_str(json).map_err(|e| ReferenceError::Parse(e.to_string()))?;
        Self::new(rows)
    }

    /// The built-in table used when no file is supplied.
    pub fn builtin() -> Self {
        let rows = BUILTIN
            .iter()
            .map(|&(symbol, name, last, high, low, volume)| ReferenceRow {
                symbol: symbol.to_string(),
                name: name.to_string(),
                last,
                high,
                low,
                volume,
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[ReferenceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<&ReferenceRow> {
        self.rows.iter().find(|r| r.symbol == symbol)
    }

    /// Largest reference volume in the table.
    pub fn max_volume(&self) -> u64 {
        self.rows.iter().map(|r| r.volume).max().unwrap_or(0)
    }

    /// Session directory in table order.
    pub fn directory(&self) -> Directory {
        Directory::new(
            self.rows
                .iter()
                .map(|r| DirectoryEntry {
                    ticker: r.symbol.clone(),
                    name: r.name.clone(),
                })
                .collect(),
        )
    }
}

#[rustfmt::skip]
const BUILTIN: &[(&str, &str, f64, f64, f64, u64)] = &[
    ("AAPL",  "Apple Inc.",                      189.84, 192.10, 187.25, 54_210_300),
    ("MSFT",  "Microsoft Corporation",           415.32, 419.77, 411.05, 21_894_100),
    ("GOOGL", "Alphabet Inc. Class A",           152.61, 154.20, 150.88, 27_315_900),
    ("AMZN",  "Amazon.com Inc.",                 178.22, 180.45, 176.10, 41_007_600),
    ("NVDA",  "NVIDIA Corporation",              875.28, 889.90, 861.12, 48_752_400),
    ("META",  "Meta Platforms Inc.",             484.03, 490.55, 478.20, 15_622_800),
    ("TSLA",  "Tesla Inc.",                      175.79, 180.12, 171.34, 96_311_500),
    ("BRK.B", "Berkshire Hathaway Inc. Class B", 408.15, 410.02, 405.60,  3_504_200),
    ("JPM",   "JPMorgan Chase & Co.",            196.44, 198.30, 194.80,  9_871_300),
    ("V",     "Visa Inc.",                       279.61, 281.40, 277.95,  6_118_700),
    ("JNJ",   "Johnson & Johnson",               157.82, 158.90, 156.40,  7_240_100),
    ("WMT",   "Walmart Inc.",                     60.41,  60.95,  59.88, 18_903_600),
    ("XOM",   "Exxon Mobil Corporation",         118.06, 119.50, 116.72, 17_455_200),
    ("PG",    "Procter & Gamble Company",        161.27, 162.10, 160.05,  6_032_800),
    ("MA",    "Mastercard Incorporated",         472.90, 476.30, 469.15,  2_911_400),
    ("HD",    "Home Depot Inc.",                 362.55, 365.80, 359.40,  3_774_900),
    ("CVX",   "Chevron Corporation",             155.63, 157.20, 154.01,  8_126_500),
    ("KO",    "Coca-Cola Company",                60.18,  60.55,  59.74, 12_480_300),
    ("PEP",   "PepsiCo Inc.",                    168.94, 170.10, 167.55,  5_305_700),
    ("COST",  "Costco Wholesale Corporation",    724.37, 730.15, 718.90,  1_987_600),
    ("ADBE",  "Adobe Inc.",                      492.16, 498.40, 486.25,  3_611_200),
    ("NFLX",  "Netflix Inc.",                    617.52, 624.80, 609.33,  4_102_900),
    ("AMD",   "Advanced Micro Devices Inc.",     164.69, 168.20, 161.05, 58_640_100),
    ("INTC",  "Intel Corporation",                42.87,  43.55,  42.10, 39_772_400),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn row(symbol: &str, last: f64) -> ReferenceRow {
        ReferenceRow {
            symbol: symbol.to_string(),
            name: format!("{symbol} Corp."),
            last,
            high: last * 1.01,
            low: last * 0.99,
            volume: 1_000,
        }
    }

    #[test]
    fn test_builtin_table_is_valid() {
        let table = ReferenceTable::builtin();
        assert!(ReferenceTable::new(table.rows().to_vec()).is_ok());
        assert_eq!(table.directory().len(), table.len());
    }

    #[test]
    fn test_directory_in_table_order() {
        let table = ReferenceTable::new(vec![row("ZZZ", 10.0), row("AAA", 20.0)]).unwrap();
        let dir = table.directory();
        assert_eq!(dir.ticker(0), Some("ZZZ"));
        assert_eq!(dir.ticker(1), Some("AAA"));
    }

    #[test]
    fn test_rejects_duplicates() {
        let err = ReferenceTable::new(vec![row("AAA", 1.0), row("AAA", 2.0)]).unwrap_err();
        assert_eq!(
            err,
            ReferenceError::DuplicateSymbol {
                symbol: "AAA".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_non_positive_price() {
        let err = ReferenceTable::new(vec![row("AAA", 0.0)]).unwrap_err();
        assert!(matches!(err, ReferenceError::InvalidPrice { .. }));
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(ReferenceTable::new(vec![]), Err(ReferenceError::Empty));
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"symbol":"AAA","name":"Alpha","last":10.5,"high":11.0,"low":10.0,"volume":500},
            {"symbol":"BBB","name":"Beta","last":20.0,"high":21.0,"low":19.0,"volume":900}
        ]"#;
        let table = ReferenceTable::from_json(json).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.max_volume(), 900);
        assert_eq!(table.get("BBB").unwrap().name, "Beta");
    }

    #[test]
    fn test_from_json_parse_error() {
        assert!(matches!(
            ReferenceTable::from_json("{not json"),
            Err(ReferenceError::Parse(_))
        ));
    }
}
