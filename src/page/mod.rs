//! Read-only view of the host page: text extraction and anchor lookup.

pub mod anchor;
pub mod extractor;
pub mod snapshot;
