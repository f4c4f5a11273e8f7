//! Distinct-value aggregation for the four semantic fields.
//!
//! Each field is resolved from a raw row through an ordered alias list: the
//! first alias present with a non-empty value wins and is kept verbatim. Values accumulate without
//! a bound and are truncated only when read out with
//! [`DistinctAggregator::finish`].

use std::collections::HashSet;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::rows::RawRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticField {
    CurrentStation,
    ReceiverType,
    JourneyType,
    ReceiveStatus,
}

impl SemanticField {
    pub const ALL: [SemanticField; 4] = [
        SemanticField::CurrentStation,
        SemanticField::ReceiverType,
        SemanticField::JourneyType,
        SemanticField::ReceiveStatus,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

/// Ordered header spellings accepted for each semantic field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasTable {
    pub current_station: Vec<String>,
    pub receiver_type: Vec<String>,
    pub journey_type: Vec<String>,
    pub receive_status: Vec<String>,
}

impl Default for AliasTable {
    fn default() -> Self {
        fn spellings(values: &[&str]) -> Vec<String> {
            values.iter().map(|v| v.to_string()).collect()
        }
        Self {
            current_station: spellings(&[
                "Current Station",
                "current station",
                "CURRENT STATION",
                "CurrentStation",
                "currentStation",
                "current_station",
            ]),
            receiver_type: spellings(&[
                "Receiver Type",
                "receiver type",
                "RECEIVER TYPE",
                "ReceiverType",
                "receiverType",
                "receiver_type",
            ]),
            journey_type: spellings(&[
                "Journey Type",
                "journey type",
                "JOURNEY TYPE",
                "JourneyType",
                "journeyType",
                "journey_type",
            ]),
            receive_status: spellings(&[
                "Receive Status",
                "receive status",
                "RECEIVE STATUS",
                "ReceiveStatus",
                "receiveStatus",
                "receive_status",
            ]),
        }
    }
}

impl AliasTable {
    pub fn aliases(&self, field: SemanticField) -> &[String] {
        match field {
            SemanticField::CurrentStation => &self.current_station,
            SemanticField::ReceiverType => &self.receiver_type,
            SemanticField::JourneyType => &self.journey_type,
            SemanticField::ReceiveStatus => &self.receive_status,
        }
    }

    /// First alias present in `row` with a non-empty value, verbatim.
    pub fn resolve<'r>(&self, field: SemanticField, row: &'r RawRow) -> Option<&'r str> {
        self.aliases(field)
            .iter()
            .filter_map(|alias| row.get(alias))
            .map(String::as_str)
            .find(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DistinctAggregator {
    sets: [HashSet<String>; 4],
}

impl DistinctAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, row: &RawRow, aliases: &AliasTable) {
        for field in SemanticField::ALL {
            if let Some(value) = aliases.resolve(field, row)
                && !self.sets[field.slot()].contains(value)
            {
                self.sets[field.slot()].insert(value.to_string());
            }
        }
    }

    /// Folds the values collected by `other` into this aggregator.
    pub fn merge(&mut self, other: DistinctAggregator) {
        for (mine, theirs) in self.sets.iter_mut().zip(other.sets) {
            mine.extend(theirs);
        }
    }

    pub fn len(&self, field: SemanticField) -> usize {
        self.sets[field.slot()].len()
    }

    pub fn contains(&self, field: SemanticField, value: &str) -> bool {
        self.sets[field.slot()].contains(value)
    }

    /// Materializes every set, sorted and truncated to `cap` values.
    pub fn finish(&self, cap: usize) -> DistinctValues {
        let read_out = |field: SemanticField| {
            self.sets[field.slot()]
                .iter()
                .sorted()
                .take(cap)
                .cloned()
                .collect::<Vec<_>>()
        };
        DistinctValues {
            current_station: read_out(SemanticField::CurrentStation),
            receiver_type: read_out(SemanticField::ReceiverType),
            journey_type: read_out(SemanticField::JourneyType),
            receive_status: read_out(SemanticField::ReceiveStatus),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistinctValues {
    pub current_station: Vec<String>,
    pub receiver_type: Vec<String>,
    pub journey_type: Vec<String>,
    pub receive_status: Vec<String>,
}

impl DistinctValues {
    pub fn get(&self, field: SemanticField) -> &[String] {
        match field {
            SemanticField::CurrentStation => &self.current_station,
            SemanticField::ReceiverType => &self.receiver_type,
            SemanticField::JourneyType => &self.journey_type,
            SemanticField::ReceiveStatus => &self.receive_status,
        }
    }
}
