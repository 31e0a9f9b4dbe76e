//! # ODCAF Core
//!
//! Dataset logic for the Open Database of Cultural and Art Facilities
//! server: the facility data model, the CSV record parser, the immutable
//! in-memory index, the query engine, and the result formatter.
//!
//! This crate performs no I/O and pulls in no async runtime. Callers read
//! the source file themselves and hand its text to
//! [`index::DatasetIndex::from_csv_str`]; every query after that is a
//! synchronous, read-only scan of the index.
//!
//! ```text
//!   CSV text ──▶ parse ──▶ DatasetIndex ──▶ query ──▶ format
//!                           (immutable)     (read-only) (markdown)
//! ```

pub mod error;
pub mod format;
pub mod index;
pub mod models;
pub mod parse;
pub mod query;

pub use error::{LoadError, QueryError};
pub use index::DatasetIndex;
pub use models::{
    CityCount, FacilityPreview, FacilityRecord, FetchResult, ProvinceCount, QueryResult,
    StatsResult,
};
pub use query::FilterCriteria;
