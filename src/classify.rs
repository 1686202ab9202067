//! Maps columns and their values to an encoding strategy.
use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::{config::SharingConfig, error::Error, error::FieldError};

/// A plaintext record, mapping column names to values.
pub type Record = Map<String, Value>;

/// The classification of a column name, independent of any value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnClass {
    /// Decimal values, shared additively as fixed-point numbers.
    Numeric,
    /// Dates and identifiers, copied to every party in the clear.
    Passthrough,
    /// Any other column: text is XOR shared, nested records are classified per sub-column.
    Default,
}

/// A field value together with the strategy used to encode it.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<'a> {
    /// A decimal number to be shared additively.
    Numeric(Cow<'a, str>),
    /// A value copied to every party unchanged.
    Passthrough(Cow<'a, str>),
    /// Text to be XOR shared byte by byte.
    Bytes(&'a str),
    /// A nested record whose sub-columns are encoded individually.
    Nested(&'a Record),
}

/// Classifies columns according to a fixed [`SharingConfig`].
///
/// The classifier is immutable and can be shared between threads; every party must use a
/// classifier built from the same configuration.
#[derive(Debug, Clone)]
pub struct Classifier {
    config: SharingConfig,
    fingerprint: String,
}

impl Classifier {
    /// Validates the configuration and builds a classifier for it.
    pub fn new(config: SharingConfig) -> Result<Self, Error> {
        config.validate()?;
        let fingerprint = config.fingerprint();
        Ok(Self {
            config,
            fingerprint,
        })
    }

    /// The configuration of this classifier.
    pub fn config(&self) -> &SharingConfig {
        &self.config
    }

    /// Fractional bits of the fixed-point encoding.
    pub fn precision_bits(&self) -> u32 {
        self.config.precision_bits
    }

    /// The fingerprint of the configuration, see [`SharingConfig::fingerprint`].
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Classifies a column by its name alone.
    pub fn classify(&self, column: &str) -> ColumnClass {
        if self.config.numeric_columns.contains(column) {
            ColumnClass::Numeric
        } else if self.config.passthrough_columns.contains(column) {
            ColumnClass::Passthrough
        } else {
            ColumnClass::Default
        }
    }

    /// Decides how the value of the top-level `column` is encoded.
    ///
    /// Numeric columns accept JSON strings and numbers, passthrough columns accept any scalar
    /// (booleans render as `True`/`False`). Other columns must hold text or a nested record,
    /// whose sub-columns are classified by [`sub_field`].
    pub fn field<'a>(&self, column: &str, value: &'a Value) -> Result<Field<'a>, FieldError> {
        match (self.classify(column), value) {
            (ColumnClass::Numeric, Value::String(s)) => Ok(Field::Numeric(Cow::Borrowed(s))),
            (ColumnClass::Numeric, Value::Number(n)) => {
                Ok(Field::Numeric(Cow::Owned(n.to_string())))
            }
            (ColumnClass::Numeric, other) => Err(FieldError::SchemaMismatch {
                reason: format!("numeric column holds a {}", value_kind(other)),
            }),
            (ColumnClass::Passthrough, Value::String(s)) => {
                Ok(Field::Passthrough(Cow::Borrowed(s)))
            }
            (ColumnClass::Passthrough, Value::Number(n)) => {
                Ok(Field::Passthrough(Cow::Owned(n.to_string())))
            }
            (ColumnClass::Passthrough, Value::Bool(b)) => {
                Ok(Field::Passthrough(Cow::Borrowed(if *b { "True" } else { "False" })))
            }
            (ColumnClass::Passthrough, other) => Err(FieldError::SchemaMismatch {
                reason: format!("passthrough column holds a {}", value_kind(other)),
            }),
            (ColumnClass::Default, Value::String(s)) => Ok(Field::Bytes(s)),
            (ColumnClass::Default, Value::Object(record)) => Ok(Field::Nested(record)),
            (ColumnClass::Default, other) => Err(FieldError::UnsupportedValue {
                kind: value_kind(other),
            }),
        }
    }
}

/// Decides how a sub-column of a nested record is encoded.
///
/// Sub-columns are never numeric or passthrough, whatever their name: text is XOR shared and
/// deeper records are nested again.
pub fn sub_field(value: &Value) -> Result<Field<'_>, FieldError> {
    match value {
        Value::String(s) => Ok(Field::Bytes(s)),
        Value::Object(record) => Ok(Field::Nested(record)),
        other => Err(FieldError::UnsupportedValue {
            kind: value_kind(other),
        }),
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "record",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(SharingConfig::default()).unwrap()
    }

    #[test]
    fn classifies_by_name() {
        let c = classifier();
        assert_eq!(c.classify("Total Owed"), ColumnClass::Numeric);
        assert_eq!(c.classify("Order Date"), ColumnClass::Passthrough);
        assert_eq!(c.classify("Gift Message"), ColumnClass::Default);
        // names are matched exactly
        assert_eq!(c.classify("total owed"), ColumnClass::Default);
    }

    #[test]
    fn unknown_text_columns_are_byte_shared() {
        let c = classifier();
        let value = json!("Standard");
        assert_eq!(c.field("Shipping Option", &value), Ok(Field::Bytes("Standard")));
    }

    #[test]
    fn numbers_and_scalars() {
        let c = classifier();
        assert_eq!(
            c.field("debit", &json!(12.5)),
            Ok(Field::Numeric(Cow::Owned("12.5".into())))
        );
        assert_eq!(
            c.field("debit", &json!("12.50")),
            Ok(Field::Numeric(Cow::Borrowed("12.50")))
        );
        assert_eq!(
            c.field("date", &json!(20050801)),
            Ok(Field::Passthrough(Cow::Owned("20050801".into())))
        );
        assert_eq!(
            c.field("Order Date", &json!(false)),
            Ok(Field::Passthrough(Cow::Borrowed("False")))
        );
        assert!(matches!(
            c.field("debit", &json!(null)),
            Err(FieldError::SchemaMismatch { .. })
        ));
        assert!(matches!(
            c.field("date", &json!({"y": "2005"})),
            Err(FieldError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn records_are_nested_and_other_values_rejected() {
        let c = classifier();
        let value = json!({"name": "Ann", "email": "ann@example.com"});
        assert!(matches!(
            c.field("user_account_holder_information", &value),
            Ok(Field::Nested(r)) if r.len() == 2
        ));
        assert_eq!(
            c.field("tags", &json!(["a", "b"])),
            Err(FieldError::UnsupportedValue { kind: "array" })
        );
        assert_eq!(
            c.field("flag", &json!(true)),
            Err(FieldError::UnsupportedValue { kind: "boolean" })
        );
    }

    #[test]
    fn sub_columns_ignore_the_name_sets() {
        assert_eq!(sub_field(&json!("2024-01-01")), Ok(Field::Bytes("2024-01-01")));
        assert!(matches!(sub_field(&json!({"a": "b"})), Ok(Field::Nested(_))));
        assert_eq!(
            sub_field(&json!(10)),
            Err(FieldError::UnsupportedValue { kind: "number" })
        );
        assert_eq!(
            sub_field(&json!(null)),
            Err(FieldError::UnsupportedValue { kind: "null" })
        );
    }
}
