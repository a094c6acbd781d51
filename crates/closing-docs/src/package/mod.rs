//! Closing package assembly: rule selection, template lookup and merge
//! dispatch for one loan.

pub mod adapter;
pub mod router;
pub mod service;
pub mod source;

#[cfg(test)]
mod tests;

pub use adapter::{AdapterError, DocumentAdapter, JsonDocumentAdapter};
pub use router::package_router;
pub use service::{ClosingPackageService, DispatchReceipt, PackageError};
pub use source::{SourceError, TemplateSource};
