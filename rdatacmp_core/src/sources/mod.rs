//! Built-in data source adapters.
//!
//! These are thin readers; everything interesting happens after rows are
//! handed to the engine.

#[cfg(feature = "csv-source")]
mod csv_file;
#[cfg(feature = "json-source")]
mod json_file;
mod memory;

#[cfg(feature = "csv-source")]
pub use self::csv_file::CsvSource;
#[cfg(feature = "json-source")]
pub use self::json_file::JsonSource;
pub use self::memory::MemorySource;

#[cfg(any(feature = "csv-source", feature = "json-source"))]
pub(crate) fn ensure_exists(path: &std::path::Path) -> Result<(), rdatacmp_common::SourceError> {
    if path.exists() {
        Ok(())
    } else {
        Err(rdatacmp_common::SourceError::NotFound(path.display().to_string()))
    }
}
