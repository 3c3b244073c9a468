//! Source readers: where the fetched table comes from

use crate::config::DatasetConfig;
use crate::error::Result;
use crate::table::RemoteTable;

/// Fetches the configured range of a dataset's sheet.
///
/// The first returned row is the header. Implementations fail with
/// `SourceUnavailable` when the sheet cannot be opened and `RangeEmpty`
/// when the range holds no rows. Fetching has no side effects.
pub trait SourceReader {
    fn fetch(&self, dataset: &DatasetConfig) -> Result<RemoteTable>;

    /// Short description for logs
    fn describe(&self) -> String;
}

impl<T: SourceReader + ?Sized> SourceReader for Box<T> {
    fn fetch(&self, dataset: &DatasetConfig) -> Result<RemoteTable> {
        (**self).fetch(dataset)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
