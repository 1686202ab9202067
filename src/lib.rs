//! Prepares tabular data for three-party secure computation by turning every record into three
//! per-party records of replicated secret shares.
//!
//! Each value is processed according to the classification of its column:
//!
//! - numeric columns are fixed-point encoded and shared additively modulo 2^64 ([`arith`]),
//! - passthrough columns (dates, identifiers) are copied to every party in the clear,
//! - all other text is shared byte-wise with XOR ([`xor`]), nested records column by column.
//!
//! Every share tuple consists of three components `s1, s2, s3` and their pairwise combinations
//! `t1, t2, t3`; party `i` receives `(t_i, s_i)` rendered as `"<t_i-hex> <s_i-hex>"`. Any two
//! parties hold all three components, no single party learns anything about the value.
//!
//! ## Main Components
//!
//! * [`classify`]: The [`classify::Classifier`], mapping columns to encoding strategies.
//! * [`table`]: [`table::share_table`] and [`table::share_table_parallel`], producing the three
//!   index-aligned per-party tables.
//! * [`profile`]: The [`profile::LengthProfiler`], computing how many 16-byte blocks every column
//!   needs.
//! * [`pad`]: Pads per-party records to fixed-width rows of [`block::Block`]s.
//!
//! ## Example
//!
//! ```
//! use shareprep::{
//!     classify::{Classifier, Record},
//!     config::SharingConfig,
//!     party::Party,
//!     profile::LengthProfiler,
//!     table::share_table,
//! };
//!
//! # fn main() -> Result<(), shareprep::Error> {
//! let classifier = Classifier::new(SharingConfig::default())?;
//! let record: Record = serde_json::from_str(
//!     r#"{"Order Date": "2005-08-01", "Total Owed": "12.5", "Shipping Option": "Standard"}"#,
//! )
//! .expect("valid JSON");
//!
//! let mut rng = rand::rng();
//! let tables = share_table(&[record], &classifier, &mut rng)?;
//!
//! let mut profiler = LengthProfiler::new(&classifier);
//! profiler.observe_table(tables.table(Party::P1))?;
//! let widths = profiler.finish()?;
//! assert_eq!(widths.blocks("Total Owed"), Some(1));
//! # Ok(())
//! # }
//! ```
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod arith;
pub mod block;
pub mod classify;
pub mod codec;
pub mod config;
pub mod pad;
pub mod party;
pub mod profile;
pub mod table;
pub mod xor;

mod error;
mod utils;

pub use error::{Error, FieldError};
