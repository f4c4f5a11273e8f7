//! Canonical output schema and row projection.
//!
//! The first header line seen in a job fixes the [`CanonicalHeader`]: that
//! entry's columns, in order, minus the configured drop-set. Every row from
//! every later entry is projected onto it with [`project`], regardless of
//! how the entry orders or extends its own columns.

use std::collections::HashSet;

use log::debug;

use crate::rows::RawRow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalHeader {
    columns: Vec<String>,
}

impl CanonicalHeader {
    /// Builds the header from `headers` minus `drop`, keeping first occurrences.
    pub fn derive(headers: &[String], drop: &[String]) -> Self {
        let dropped = drop.iter().map(String::as_str).collect::<HashSet<_>>();
        let mut seen = HashSet::new();
        let columns = headers
            .iter()
            .filter(|name| !dropped.contains(name.as_str()))
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Values aligned position-for-position with a [`CanonicalHeader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedRow(Vec<String>);

impl ProjectedRow {
    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn get(&self, header: &CanonicalHeader, column: &str) -> Option<&str> {
        header
            .columns
            .iter()
            .position(|name| name == column)
            .and_then(|idx| self.0.get(idx))
            .map(String::as_str)
    }
}

impl From<Vec<String>> for ProjectedRow {
    fn from(values: Vec<String>) -> Self {
        ProjectedRow(values)
    }
}

pub fn project(raw: &RawRow, header: &CanonicalHeader) -> ProjectedRow {
    ProjectedRow(
        header
            .columns
            .iter()
            .map(|column| raw.get(column).cloned().unwrap_or_default())
            .collect(),
    )
}

/// Freezes the canonical header on the first header event of a job.
#[derive(Debug, Clone)]
pub struct SchemaReconciler {
    drop: Vec<String>,
    canonical: Option<CanonicalHeader>,
}

impl SchemaReconciler {
    pub fn new(drop: &[String]) -> Self {
        Self {
            drop: drop.to_vec(),
            canonical: None,
        }
    }

    /// Feeds one entry's header line and returns the canonical header.
    ///
    /// The flag is true only for the call that fixed the header.
    pub fn observe(&mut self, headers: &[String]) -> (&CanonicalHeader, bool) {
        let frozen_now = self.canonical.is_none();
        let drop = &self.drop;
        let header = self
            .canonical
            .get_or_insert_with(|| CanonicalHeader::derive(headers, drop));
        if frozen_now {
            debug!(
                "Canonical header fixed with {} of {} column(s)",
                header.len(),
                headers.len()
            );
        } else {
            debug!("Canonical header already fixed; ignoring {} column(s)", headers.len());
        }
        (header, frozen_now)
    }

    pub fn canonical(&self) -> Option<&CanonicalHeader> {
        self.canonical.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn raw(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn derive_removes_drop_set_and_keeps_order() {
        let header = CanonicalHeader::derive(
            &strings(&["A", "Status", "B", "C", "Carrier"]),
            &strings(&["Status", "Carrier", "NotPresent"]),
        );
        assert_eq!(header.columns(), ["A", "B", "C"]);
    }

    #[test]
    fn derive_keeps_first_of_duplicate_columns() {
        let header = CanonicalHeader::derive(&strings(&["A", "B", "A"]), &[]);
        assert_eq!(header.columns(), ["A", "B"]);
    }

    #[test]
    fn reconciler_freezes_on_first_observation() {
        let mut reconciler = SchemaReconciler::new(&strings(&["Status"]));
        let (first, frozen_now) = reconciler.observe(&strings(&["A", "B", "C", "Status"]));
        let first = first.clone();
        assert!(frozen_now);
        assert_eq!(first.columns(), ["A", "B", "C"]);
        let (later, frozen_now) = reconciler.observe(&strings(&["A", "C", "B", "D"]));
        assert!(!frozen_now);
        assert_eq!(later, &first);
        assert_eq!(reconciler.canonical(), Some(&first));
    }

    #[test]
    fn project_reorders_and_fills_missing_values() {
        let header = CanonicalHeader::derive(&strings(&["A", "B", "C"]), &[]);
        let row = raw(&[("C", "3"), ("A", "1"), ("D", "extra")]);
        let projected = project(&row, &header);
        assert_eq!(projected.values(), ["1", "", "3"]);
        assert_eq!(projected.get(&header, "B"), Some(""));
        assert_eq!(projected.get(&header, "D"), None);
    }

    proptest! {
        #[test]
        fn projection_always_matches_canonical_width(
            columns in proptest::collection::vec("[a-e]{1,2}", 0..8),
            present in proptest::collection::hash_map("[a-e]{1,2}", "[ -~]{0,6}", 0..8),
        ) {
            let header = CanonicalHeader::derive(&columns, &[]);
            let projected = project(&present, &header);
            prop_assert_eq!(projected.values().len(), header.len());
            for (idx, column) in header.columns().iter().enumerate() {
                let expected = present.get(column).cloned().unwrap_or_default();
                prop_assert_eq!(&projected.values()[idx], &expected);
            }
        }
    }
}
