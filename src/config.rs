//! Static configuration of a sharing run.
use std::{collections::BTreeSet, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Fractional bits of the fixed-point encoding used unless configured otherwise.
pub const DEFAULT_PRECISION_BITS: u32 = 10;
/// Bit width of the arithmetic share field. Only 64 is supported.
pub const FIELD_BITS: u32 = 64;

const NUMERIC_COLUMNS: [&str; 12] = [
    "debit",
    "credit",
    "balance",
    "Unit Price",
    "Unit Price Tax",
    "Shipping Charge",
    "Total Discounts",
    "Total Owed",
    "Shipment Item Subtotal",
    "Shipment Item Subtotal Tax",
    "quantity",
    "ReturnAmount",
];

const PASSTHROUGH_COLUMNS: [&str; 8] = [
    "user_name",
    "DateOfReturn",
    "RMA Creation Date",
    "Order Date",
    "Ship Date",
    "created_at",
    "date",
    "date_of_transaction_completion",
];

/// The configuration shared by all three parties for one schema.
///
/// Every party (and every table of the same schema) must be prepared with an identical
/// configuration, otherwise the column widths computed from their tables disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharingConfig {
    /// Number of fractional bits of the fixed-point encoding of numeric columns.
    pub precision_bits: u32,
    /// Bit width of the arithmetic share field.
    pub field_bits: u32,
    /// Columns whose decimal values are additively shared.
    pub numeric_columns: BTreeSet<String>,
    /// Columns (dates, identifiers) that are copied in the clear to every party.
    pub passthrough_columns: BTreeSet<String>,
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            precision_bits: DEFAULT_PRECISION_BITS,
            field_bits: FIELD_BITS,
            numeric_columns: NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
            passthrough_columns: PASSTHROUGH_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl SharingConfig {
    /// Parses and validates a JSON configuration. Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: SharingConfig =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration from a file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Checks that the configuration describes a supported, unambiguous schema.
    pub fn validate(&self) -> Result<(), Error> {
        if self.field_bits != FIELD_BITS {
            return Err(Error::InvalidConfig(format!(
                "field width must be {FIELD_BITS} bits, found {}",
                self.field_bits
            )));
        }
        if self.precision_bits >= self.field_bits {
            return Err(Error::InvalidConfig(format!(
                "{} fractional bits leave no integer bits in a {}-bit field",
                self.precision_bits, self.field_bits
            )));
        }
        if let Some(column) = self
            .numeric_columns
            .intersection(&self.passthrough_columns)
            .next()
        {
            return Err(Error::InvalidConfig(format!(
                "column '{column}' is both numeric and passthrough"
            )));
        }
        Ok(())
    }

    /// A BLAKE3 hash identifying this configuration (the schema version of a sharing run).
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.precision_bits.to_le_bytes());
        hasher.update(&self.field_bits.to_le_bytes());
        for (tag, columns) in [(b'n', &self.numeric_columns), (b'p', &self.passthrough_columns)] {
            for column in columns {
                hasher.update(&[tag]);
                hasher.update(&(column.len() as u64).to_le_bytes());
                hasher.update(column.as_bytes());
            }
        }
        hasher.finalize().to_string()
    }
}
