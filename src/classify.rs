//! File classification: which catalog operations apply to a given file.
//!
//! Classification is a pure function of `(declared type, filename)` — no
//! side effects, no I/O, and total: any input yields a (possibly empty)
//! result, never an error. An empty result is the "unsupported type"
//! condition and is the caller's to surface.

use crate::catalog::{ConversionCatalog, OperationDescriptor};
use crate::file::InputFile;
use tracing::debug;

/// Return the descriptors whose source predicate matches `file`, in catalog
/// registration order.
///
/// Matching policy: declared media type first; case-insensitive filename
/// extension as fallback when the declared type is empty or unrecognised
/// (browsers frequently leave HEIC files untyped).
pub fn classify<'a>(
    catalog: &'a ConversionCatalog,
    file: &InputFile,
) -> Vec<&'a OperationDescriptor> {
    // Declared type first. Only when it matches no registered MIME entry at
    // all does the extension get a say, so a file declared application/pdf
    // but named scan.png classifies as a PDF, nothing else.
    let by_type: Vec<&OperationDescriptor> = catalog
        .entries()
        .iter()
        .filter(|d| d.source.media_types.contains(&file.media_type()))
        .collect();

    let matched: Vec<&OperationDescriptor> = if !by_type.is_empty() {
        by_type
    } else {
        match file.extension() {
            Some(ext) => catalog
                .entries()
                .iter()
                .filter(|d| d.source.extensions.contains(&ext.as_str()))
                .collect(),
            None => Vec::new(),
        }
    };

    debug!(
        filename = file.filename(),
        media_type = file.media_type(),
        operations = matched.len(),
        "classified input file"
    );

    matched
}
