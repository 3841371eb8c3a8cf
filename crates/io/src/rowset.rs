use crate::csv::TextEncoding;

/// A decoded feed: one header row and the data rows in input order.
///
/// Every row has exactly `headers.len()` fields; the decoder rejects
/// anything ragged, so callers can index rows by header position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub encoding: TextEncoding,
}

impl RowSet {
    /// Position of a column by exact header name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Distinct values of one column in first-seen order, compared verbatim.
    /// Empty cells are skipped.
    pub fn distinct(&self, idx: usize) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for row in &self.rows {
            if let Some(v) = row.get(idx) {
                if !v.is_empty() && seen.insert(v.as_str()) {
                    out.push(v.clone());
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> RowSet {
        RowSet {
            headers: vec!["vin".into(), "dealer_id".into()],
            rows: vec![
                vec!["1A".into(), "D2".into()],
                vec!["1B".into(), "D1".into()],
                vec!["1C".into(), "D2".into()],
                vec!["1E".into(), " D2".into()],
                vec!["1D".into(), "".into()],
            ],
            encoding: TextEncoding::Utf8,
        }
    }

    #[test]
    fn column_lookup_is_exact() {
        let rs = set();
        assert_eq!(rs.column("vin"), Some(0));
        assert_eq!(rs.column("VIN"), None);
        assert_eq!(rs.column("dealer_id"), Some(1));
    }

    #[test]
    fn distinct_keeps_first_seen_order() {
        let rs = set();
        assert_eq!(
            rs.distinct(1),
            vec!["D2".to_string(), "D1".to_string(), " D2".to_string()]
        );
    }
}
