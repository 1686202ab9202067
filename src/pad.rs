//! Pads per-party values to the block widths of their columns.
//!
//! A padded row is the concatenation of the padded values of all columns of a record, in column
//! name order, with nested records expanded in place. Sub-columns of nested records always hold
//! shares.
use tracing::{Level, instrument};

use crate::{
    block::Block,
    classify::{Classifier, ColumnClass},
    codec::bytes_of,
    error::{Error, FieldError},
    profile::{ColumnWidths, column_class, party_share},
    table::{PartyRecord, PartyValue},
};

/// Pads the per-party text of a column of class `class` to exactly `blocks` blocks.
///
/// Shares contribute the bytes of `t` followed by `s`, passthrough values their single-byte
/// encoding.
pub fn pad_value(class: ColumnClass, text: &str, blocks: usize) -> Result<Vec<Block>, FieldError> {
    let bytes = match class {
        ColumnClass::Passthrough => bytes_of(text)?,
        class => party_share(class, text)?.to_bytes()?,
    };
    Block::padded(&bytes, blocks).ok_or(FieldError::WidthExceeded {
        bytes: bytes.len(),
        blocks,
    })
}

/// Pads the record at position `index` of a per-party table to a row of fixed-width blocks.
pub fn pad_record(
    index: usize,
    record: &PartyRecord,
    widths: &ColumnWidths,
    classifier: &Classifier,
) -> Result<Vec<Block>, Error> {
    widths.check_schema(classifier)?;
    let mut row = vec![];
    pad_columns(index, record, "", widths, classifier, &mut row)?;
    Ok(row)
}

fn pad_columns(
    index: usize,
    record: &PartyRecord,
    prefix: &str,
    widths: &ColumnWidths,
    classifier: &Classifier,
    row: &mut Vec<Block>,
) -> Result<(), Error> {
    for (column, value) in record {
        let path = if prefix.is_empty() {
            column.clone()
        } else {
            format!("{prefix}.{column}")
        };
        match value {
            PartyValue::Nested(sub_record) => {
                pad_columns(index, sub_record, &path, widths, classifier, row)?;
            }
            PartyValue::Text(text) => {
                let Some(blocks) = widths.blocks(column) else {
                    return Err(Error::MissingWidth { column: path });
                };
                let padded = pad_value(column_class(classifier, column, prefix), text, blocks)
                    .map_err(|e| Error::field(index, path, e))?;
                row.extend(padded);
            }
        }
    }
    Ok(())
}

/// Pads every record of a per-party table.
#[instrument(level = Level::DEBUG, skip_all, fields(records = table.len()), err)]
pub fn pad_table(
    table: &[PartyRecord],
    widths: &ColumnWidths,
    classifier: &Classifier,
) -> Result<Vec<Vec<Block>>, Error> {
    widths.check_schema(classifier)?;
    table
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let mut row = vec![];
            pad_columns(index, record, "", widths, classifier, &mut row)?;
            Ok(row)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use serde_json::json;

    use super::*;
    use crate::{
        classify::Record,
        codec::bytes_from_hex,
        config::SharingConfig,
        party::Party,
        profile::LengthProfiler,
        table::share_table,
    };

    fn classifier() -> Classifier {
        Classifier::new(SharingConfig::default()).unwrap()
    }

    #[test]
    fn shares_are_padded_as_t_then_s() {
        let padded = pad_value(ColumnClass::Default, "4246 0102", 1).unwrap();
        let mut expected = [0; 16];
        expected[..4].copy_from_slice(&[0x42, 0x46, 0x01, 0x02]);
        assert_eq!(padded, vec![Block::new(expected)]);

        let padded = pad_value(ColumnClass::Passthrough, "2005-08-01", 2).unwrap();
        assert_eq!(&padded[0].as_bytes()[..10], b"2005-08-01");
        assert_eq!(padded[1], Block::ZERO);
    }

    #[test]
    fn values_wider_than_their_column_are_rejected() {
        assert_eq!(
            pad_value(ColumnClass::Passthrough, "a very long identifier", 1),
            Err(FieldError::WidthExceeded {
                bytes: 22,
                blocks: 1
            })
        );
        assert!(matches!(
            pad_value(ColumnClass::Numeric, "0102 0304", 1),
            Err(FieldError::InvalidShare { .. })
        ));
    }

    #[test]
    fn rows_have_the_same_width_for_every_record() {
        let c = classifier();
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let table: Vec<Record> = ["", "AB", "a somewhat longer text value"]
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let mut record = Record::new();
                record.insert("Order Date".into(), json!(format!("2005-08-0{i}")));
                record.insert("Total Owed".into(), json!(i));
                record.insert("Gift Message".into(), json!(text));
                record
            })
            .collect();
        let tables = share_table(&table, &c, &mut rng).unwrap();
        let mut profiler = LengthProfiler::new(&c);
        profiler.observe_table(tables.table(Party::P2)).unwrap();
        let widths = profiler.finish().unwrap();

        for party in Party::ALL {
            let rows = pad_table(tables.table(party), &widths, &c).unwrap();
            // "Gift Message" 56 bytes, "Order Date" 10 bytes, "Total Owed" 16 bytes
            assert!(rows.iter().all(|row| row.len() == 4 + 1 + 1));
        }

        let p1 = pad_record(1, &tables.table(Party::P1)[1], &widths, &c).unwrap();
        let share = match &tables.table(Party::P1)[1]["Gift Message"] {
            PartyValue::Text(text) => text.replace(' ', ""),
            PartyValue::Nested(_) => unreachable!(),
        };
        assert_eq!(&p1[0].as_bytes()[..4], bytes_from_hex(&share).unwrap().as_slice());
    }

    #[test]
    fn widths_of_another_schema_are_rejected() {
        let c = classifier();
        let mut profiler = LengthProfiler::new(&c);
        let record = PartyRecord::from([("date".to_string(), PartyValue::Text("2020".into()))]);
        profiler.observe(0, &record).unwrap();
        let widths = profiler.finish().unwrap();

        let other = Classifier::new(SharingConfig {
            precision_bits: 16,
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(
            pad_record(0, &record, &widths, &other),
            Err(Error::SchemaFingerprintMismatch { .. })
        ));

        let unknown =
            PartyRecord::from([("comment".to_string(), PartyValue::Text("00 00".into()))]);
        assert!(matches!(
            pad_record(0, &unknown, &widths, &c),
            Err(Error::MissingWidth { column }) if column == "comment"
        ));
    }

    #[test]
    fn nested_sub_columns_are_padded_as_shares() {
        let c = classifier();
        let mut rng = ChaCha20Rng::seed_from_u64(13);
        let source: Vec<Record> = serde_json::from_value(json!([
            {"holder": {"created_at": "2024-01-01", "name": "Ann"}, "date": "2024-02-02"},
        ]))
        .unwrap();
        let tables = share_table(&source, &c, &mut rng).unwrap();
        let mut profiler = LengthProfiler::new(&c);
        profiler.observe_table(tables.table(Party::P1)).unwrap();
        let widths = profiler.finish().unwrap();
        // 20 bytes of the shared date, 10 bytes of the top-level one
        assert_eq!(widths.blocks("created_at"), Some(2));
        assert_eq!(widths.blocks("date"), Some(1));

        let row = pad_record(0, &tables.table(Party::P3)[0], &widths, &c).unwrap();
        assert_eq!(row.len(), 1 + 2 + 1);
        assert_eq!(&row[0].as_bytes()[..10], b"2024-02-02");
        assert_ne!(&row[1].as_bytes()[..10], b"2024-01-01");
    }
}
