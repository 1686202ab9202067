//! Shares whole tables, producing three index-aligned per-party tables.
//!
//! Every record is shared independently of all others, so records can be distributed across
//! workers freely as long as the output order matches the input order.
use std::{collections::BTreeMap, sync::Arc};

use futures::future::join_all;
use rand::{CryptoRng, SeedableRng, random};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use tokio::task;
use tracing::{Level, debug, instrument};

use crate::{
    arith::{ArithShares, encode_fixed_point},
    classify::{Classifier, Field, Record, sub_field},
    codec::bytes_of,
    error::{Error, FieldError},
    party::{Party, ShareTuple},
    utils::chunk_ranges,
    xor::ByteShares,
};

/// The value of a column as seen by a single party.
///
/// Shared columns hold the `"<t_i-hex> <s_i-hex>"` text of [`crate::party::PartyShare`],
/// passthrough columns the plaintext. Which of the two a text is follows from the column
/// classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartyValue {
    /// A share or a passthrough value.
    Text(String),
    /// The per-party view of a nested record.
    Nested(PartyRecord),
}

/// A record as seen by a single party.
pub type PartyRecord = BTreeMap<String, PartyValue>;

/// A table as seen by a single party, index-aligned with the source table.
pub type PartyTable = Vec<PartyRecord>;

/// The three per-party tables produced from one source table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartyTables([PartyTable; 3]);

impl PartyTables {
    /// The table of the given party.
    pub fn table(&self, party: Party) -> &PartyTable {
        &self.0[party.index()]
    }

    /// Number of records in each of the tables.
    pub fn len(&self) -> usize {
        self.0[0].len()
    }

    /// Whether the tables contain no records.
    pub fn is_empty(&self) -> bool {
        self.0[0].is_empty()
    }

    /// The tables of all parties, ordered as [`Party::ALL`].
    pub fn into_tables(self) -> [PartyTable; 3] {
        self.0
    }

    fn with_capacity(records: usize) -> Self {
        Self(std::array::from_fn(|_| Vec::with_capacity(records)))
    }

    fn push(&mut self, records: [PartyRecord; 3]) {
        for (table, record) in self.0.iter_mut().zip(records) {
            table.push(record);
        }
    }

    fn concat(parts: Vec<PartyTables>) -> Self {
        let records = parts.iter().map(PartyTables::len).sum();
        let mut tables = Self::with_capacity(records);
        for PartyTables(part) in parts {
            for (table, part) in tables.0.iter_mut().zip(part) {
                table.extend(part);
            }
        }
        tables
    }
}

/// Shares a single record, returning the view of every party in the order of [`Party::ALL`].
///
/// `index` is only used to give errors their context.
pub fn share_record<R: CryptoRng + ?Sized>(
    index: usize,
    record: &Record,
    classifier: &Classifier,
    rng: &mut R,
) -> Result<[PartyRecord; 3], Error> {
    let mut shared = [BTreeMap::new(), BTreeMap::new(), BTreeMap::new()];
    share_columns(record, "", classifier, rng, &mut shared)
        .map_err(|(column, e)| Error::field(index, column, e))?;
    Ok(shared)
}

fn share_columns<R: CryptoRng + ?Sized>(
    record: &Record,
    prefix: &str,
    classifier: &Classifier,
    rng: &mut R,
    out: &mut [PartyRecord; 3],
) -> Result<(), (String, FieldError)> {
    for (column, value) in record {
        let path = if prefix.is_empty() {
            column.clone()
        } else {
            format!("{prefix}.{column}")
        };
        let in_column = |e| (path.clone(), e);
        let field = if prefix.is_empty() {
            classifier.field(column, value)
        } else {
            sub_field(value)
        };
        let values = match field.map_err(in_column)? {
            Field::Numeric(text) => {
                let num =
                    encode_fixed_point(&text, classifier.precision_bits()).map_err(in_column)?;
                party_values(&ArithShares::new(num, rng))
            }
            Field::Passthrough(text) => Party::ALL.map(|_| PartyValue::Text(text.to_string())),
            Field::Bytes(text) => {
                let bytes = bytes_of(text).map_err(in_column)?;
                party_values(&ByteShares::new(&bytes, rng))
            }
            Field::Nested(sub_record) => {
                let mut nested = [BTreeMap::new(), BTreeMap::new(), BTreeMap::new()];
                share_columns(sub_record, &path, classifier, rng, &mut nested)?;
                nested.map(PartyValue::Nested)
            }
        };
        for (record, value) in out.iter_mut().zip(values) {
            record.insert(column.clone(), value);
        }
    }
    Ok(())
}

fn party_values(shares: &impl ShareTuple) -> [PartyValue; 3] {
    Party::ALL.map(|party| PartyValue::Text(shares.party_share(party).to_string()))
}

/// Shares every record of `table` with randomness drawn from `rng`.
///
/// Fails on the first record that cannot be shared; no partial tables are returned.
#[instrument(level = Level::DEBUG, skip_all, fields(records = table.len()), err)]
pub fn share_table<R: CryptoRng + ?Sized>(
    table: &[Record],
    classifier: &Classifier,
    rng: &mut R,
) -> Result<PartyTables, Error> {
    share_records(table, 0, classifier, rng)
}

fn share_records<R: CryptoRng + ?Sized>(
    records: &[Record],
    offset: usize,
    classifier: &Classifier,
    rng: &mut R,
) -> Result<PartyTables, Error> {
    let mut tables = PartyTables::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        tables.push(share_record(offset + i, record, classifier, rng)?);
    }
    Ok(tables)
}

/// Shares `table` on up to `workers` blocking tasks of the tokio runtime.
///
/// The table is split into contiguous chunks, each shared with its own [`ChaCha20Rng`] seeded
/// from the thread-local generator, and the results are concatenated in input order. All
/// workers run to completion; if records fail, the error of the lowest failing record is
/// returned, as in [`share_table`].
#[instrument(level = Level::DEBUG, skip_all, fields(records = table.len(), workers = workers), err)]
pub async fn share_table_parallel(
    table: Vec<Record>,
    classifier: Arc<Classifier>,
    workers: usize,
) -> Result<PartyTables, Error> {
    let table = Arc::new(table);
    let chunks = chunk_ranges(table.len(), workers);
    debug!(chunks = chunks.len(), "sharing table");
    let parts = join_all(chunks.into_iter().map(|range| {
        let table = Arc::clone(&table);
        let classifier = Arc::clone(&classifier);
        let seed = random::<[u8; 32]>();
        async move {
            task::spawn_blocking(move || {
                let mut rng = ChaCha20Rng::from_seed(seed);
                let part = share_records(&table[range.clone()], range.start, &classifier, &mut rng);
                debug!(start = range.start, end = range.end, "shared chunk");
                part
            })
            .await
            .unwrap_or_else(|e| Err(Error::Worker(e.to_string())))
        }
    }))
    .await;
    // chunks are ordered, so the first error belongs to the lowest failing record
    let parts = parts.into_iter().collect::<Result<Vec<_>, _>>()?;
    Ok(PartyTables::concat(parts))
}
