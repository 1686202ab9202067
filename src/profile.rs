//! Computes the per-column block widths of already shared tables.
//!
//! The widths are independent of the party whose table is scanned: every party holds shares of
//! the same byte length and the same passthrough values.
use std::collections::{BTreeMap, btree_map};

use serde::{Deserialize, Serialize};
use tracing::{Level, debug, instrument};

use crate::{
    block::Block,
    classify::{Classifier, ColumnClass},
    codec::bytes_of,
    error::{Error, FieldError},
    party::PartyShare,
    table::{PartyRecord, PartyValue},
};

/// The number of 16-byte blocks reserved for every column of a schema.
///
/// Columns of nested records are listed under their sub-column names. The widths are fixed once
/// computed and carry the fingerprint of the configuration they were computed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnWidths {
    fingerprint: String,
    columns: BTreeMap<String, usize>,
}

impl ColumnWidths {
    /// The block count of `column`, if the column was observed.
    pub fn blocks(&self, column: &str) -> Option<usize> {
        self.columns.get(column).copied()
    }

    /// All columns and their block counts, ordered by column name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.columns.iter().map(|(column, blocks)| (column.as_str(), *blocks))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether no column was observed.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Fingerprint of the configuration the widths were computed with.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Fails unless the widths were computed with the configuration of `classifier`.
    pub fn check_schema(&self, classifier: &Classifier) -> Result<(), Error> {
        if self.fingerprint != classifier.fingerprint() {
            return Err(Error::SchemaFingerprintMismatch {
                expected: self.fingerprint.clone(),
                actual: classifier.fingerprint().to_string(),
            });
        }
        Ok(())
    }
}

/// Tracks the maximum byte length of every column over any number of per-party tables.
///
/// Tables observed by the same profiler are merged into a single set of widths, so all of them
/// must follow the configuration of the profiler's [`Classifier`].
#[derive(Debug, Clone)]
pub struct LengthProfiler<'a> {
    classifier: &'a Classifier,
    max_bytes: BTreeMap<String, usize>,
    records: usize,
}

impl<'a> LengthProfiler<'a> {
    /// A profiler without any observations.
    pub fn new(classifier: &'a Classifier) -> Self {
        Self {
            classifier,
            max_bytes: BTreeMap::new(),
            records: 0,
        }
    }

    /// Number of records observed so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Observes the record at position `index` of its table.
    pub fn observe(&mut self, index: usize, record: &PartyRecord) -> Result<(), Error> {
        self.observe_columns(record, "")
            .map_err(|(column, e)| Error::field(index, column, e))?;
        self.records += 1;
        Ok(())
    }

    /// Observes every record of a per-party table.
    #[instrument(level = Level::DEBUG, skip_all, fields(records = table.len()), err)]
    pub fn observe_table(&mut self, table: &[PartyRecord]) -> Result<(), Error> {
        for (index, record) in table.iter().enumerate() {
            self.observe(index, record)?;
        }
        Ok(())
    }

    fn observe_columns(
        &mut self,
        record: &PartyRecord,
        prefix: &str,
    ) -> Result<(), (String, FieldError)> {
        for (column, value) in record {
            let path = if prefix.is_empty() {
                column.clone()
            } else {
                format!("{prefix}.{column}")
            };
            let class = column_class(self.classifier, column, prefix);
            match value {
                PartyValue::Nested(sub_record) => {
                    if class != ColumnClass::Default {
                        return Err((path, FieldError::SchemaMismatch {
                            reason: "nested record in a numeric or passthrough column".into(),
                        }));
                    }
                    self.observe_columns(sub_record, &path)?;
                }
                PartyValue::Text(text) => {
                    let bytes = encoded_len(class, text).map_err(|e| (path, e))?;
                    match self.max_bytes.entry(column.clone()) {
                        btree_map::Entry::Vacant(entry) => {
                            entry.insert(bytes);
                        }
                        btree_map::Entry::Occupied(mut entry) => {
                            let max = entry.get_mut();
                            *max = (*max).max(bytes);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Rounds the maximum byte length of every column up to whole blocks.
    ///
    /// Fails with [`Error::EmptyTable`] if no record was observed.
    pub fn finish(self) -> Result<ColumnWidths, Error> {
        if self.records == 0 {
            return Err(Error::EmptyTable);
        }
        let columns: BTreeMap<String, usize> = self
            .max_bytes
            .into_iter()
            .map(|(column, bytes)| (column, block_count(bytes)))
            .collect();
        debug!(records = self.records, columns = columns.len(), "profiled column widths");
        Ok(ColumnWidths {
            fingerprint: self.classifier.fingerprint().to_string(),
            columns,
        })
    }
}

fn block_count(bytes: usize) -> usize {
    bytes.div_ceil(Block::BYTES)
}

/// The class of `column` within the record at `prefix`; sub-columns of nested records are
/// always shared.
pub(crate) fn column_class(
    classifier: &Classifier,
    column: &str,
    prefix: &str,
) -> ColumnClass {
    if prefix.is_empty() {
        classifier.classify(column)
    } else {
        ColumnClass::Default
    }
}

/// The byte length a per-party text value occupies once padded.
///
/// Shares occupy the bytes of both of their halves, passthrough values their single-byte
/// encoding.
pub(crate) fn encoded_len(class: ColumnClass, text: &str) -> Result<usize, FieldError> {
    match class {
        ColumnClass::Passthrough => Ok(bytes_of(text)?.len()),
        class => Ok(party_share(class, text)?.byte_len()),
    }
}

/// Parses the share held in a column of the given class.
pub(crate) fn party_share(class: ColumnClass, text: &str) -> Result<PartyShare, FieldError> {
    let share: PartyShare = text.parse()?;
    if class == ColumnClass::Numeric && share.t.len() != NUMERIC_HEX_DIGITS {
        return Err(FieldError::InvalidShare {
            reason: format!(
                "numeric share halves need {NUMERIC_HEX_DIGITS} hex digits, found {}",
                share.t.len()
            ),
        });
    }
    Ok(share)
}

const NUMERIC_HEX_DIGITS: usize = 2 * size_of::<u64>();

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use serde_json::json;

    use super::*;
    use crate::{classify::Record, config::SharingConfig, party::Party, table::share_table};

    fn classifier() -> Classifier {
        Classifier::new(SharingConfig::default()).unwrap()
    }

    fn share(bytes: usize) -> PartyValue {
        PartyValue::Text(format!("{} {}", "ab".repeat(bytes / 2), "cd".repeat(bytes / 2)))
    }

    fn party_record(column: &str, value: PartyValue) -> PartyRecord {
        PartyRecord::from([(column.to_string(), value)])
    }

    #[test]
    fn rounds_the_maximum_up_to_blocks() {
        assert_eq!([5, 33, 16].map(block_count).into_iter().max(), Some(3));
        assert_eq!(block_count(0), 0);
        assert_eq!(block_count(32), 2);

        let c = classifier();
        let mut profiler = LengthProfiler::new(&c);
        let table = [
            party_record("comment", share(6)),
            party_record("comment", share(34)),
            party_record("comment", share(16)),
        ];
        profiler.observe_table(&table).unwrap();
        let widths = profiler.finish().unwrap();
        assert_eq!(widths.blocks("comment"), Some(3));
        assert_eq!(widths.blocks("missing"), None);
        assert_eq!(widths.fingerprint(), c.fingerprint());
    }

    #[test]
    fn passthrough_and_nested_columns() {
        let c = classifier();
        let mut profiler = LengthProfiler::new(&c);
        let nested = PartyRecord::from([
            ("created_at".to_string(), share(20)),
            ("email".to_string(), share(40)),
        ]);
        profiler
            .observe(0, &party_record("holder", PartyValue::Nested(nested)))
            .unwrap();
        profiler
            .observe(1, &party_record("Order Date", PartyValue::Text("2005-08-01".into())))
            .unwrap();
        let widths = profiler.finish().unwrap();
        let columns: Vec<_> = widths.iter().collect();
        assert_eq!(columns, vec![("Order Date", 1), ("created_at", 2), ("email", 3)]);
    }

    #[test]
    fn nested_plaintext_is_rejected() {
        let c = classifier();
        let mut profiler = LengthProfiler::new(&c);
        let nested = PartyRecord::from([(
            "created_at".to_string(),
            PartyValue::Text("2024-01-01".into()),
        )]);
        let err = profiler
            .observe(2, &party_record("holder", PartyValue::Nested(nested)))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Field { record: 2, ref column, source: FieldError::InvalidShare { .. } }
                if column == "holder.created_at"
        ));
    }

    #[test]
    fn empty_tables_are_rejected() {
        let c = classifier();
        let mut profiler = LengthProfiler::new(&c);
        profiler.observe_table(&[]).unwrap();
        assert!(matches!(profiler.finish(), Err(Error::EmptyTable)));
    }

    #[test]
    fn plaintext_in_share_columns_is_rejected() {
        let c = classifier();
        let mut profiler = LengthProfiler::new(&c);
        let err = profiler
            .observe(4, &party_record("Gift Message", PartyValue::Text("hello".into())))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Field { record: 4, source: FieldError::InvalidShare { .. }, .. }
        ));
        let err = profiler.observe(5, &party_record("debit", share(8))).unwrap_err();
        assert!(matches!(err, Error::Field { source: FieldError::InvalidShare { .. }, .. }));
        assert_eq!(profiler.records(), 0);
    }

    #[test]
    fn widths_agree_across_parties_and_tables() {
        let c = classifier();
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let orders: Vec<Record> = [("Standard", "3.99"), ("Expedited shipping", "104.5")]
            .iter()
            .map(|(option, owed)| {
                let mut record = Record::new();
                record.insert("Shipping Option".into(), json!(option));
                record.insert("Total Owed".into(), json!(owed));
                record
            })
            .collect();
        let tables = share_table(&orders, &c, &mut rng).unwrap();
        let widths: Vec<ColumnWidths> = Party::ALL
            .iter()
            .map(|party| {
                let mut profiler = LengthProfiler::new(&c);
                profiler.observe_table(tables.table(*party)).unwrap();
                profiler.finish().unwrap()
            })
            .collect();
        assert_eq!(widths[0], widths[1]);
        assert_eq!(widths[1], widths[2]);
        // 18 bytes of text, 36 bytes per party
        assert_eq!(widths[0].blocks("Shipping Option"), Some(3));
        assert_eq!(widths[0].blocks("Total Owed"), Some(1));
    }

    proptest! {
        #[test]
        fn widths_never_shrink(
            lengths in prop::collection::vec((0..3usize, 1..120usize), 1..40),
        ) {
            let c = classifier();
            let columns = ["comment", "note", "Order Date"];
            let mut profiler = LengthProfiler::new(&c);
            let mut max: BTreeMap<&str, usize> = BTreeMap::new();
            let mut previous: BTreeMap<String, usize> = BTreeMap::new();
            for (index, (column, len)) in lengths.into_iter().enumerate() {
                let column = columns[column];
                let (value, bytes) = if column == "Order Date" {
                    (PartyValue::Text("x".repeat(len)), len)
                } else {
                    let len = len + len % 2;
                    (share(len), len)
                };
                profiler.observe(index, &party_record(column, value)).unwrap();
                let column_max = max.entry(column).or_insert(0);
                *column_max = bytes.max(*column_max);

                let widths = profiler.clone().finish().unwrap();
                for (column, blocks) in widths.iter() {
                    prop_assert!(blocks >= previous.get(column).copied().unwrap_or(0));
                    previous.insert(column.to_string(), blocks);
                }
                prop_assert_eq!(widths.blocks(column), Some(max[column].div_ceil(Block::BYTES)));
            }
        }
    }
}
