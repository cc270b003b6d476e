//! Core pipeline and domain logic for sitecorpus.
//!
//! This crate ties together registry indexing, capture routing, decoding and
//! corpus writing into the end-to-end `build_corpus` workflow.

pub mod canonical;
pub mod decode;
pub mod pipeline;
pub mod registry;
pub mod router;
pub mod routing;
pub mod writer;

pub use canonical::canonicalize;
pub use pipeline::{
    BuildConfig, ProgressReporter, RunSummary, SilentProgress, build_corpus, index_registry,
};
pub use routing::{CollectionMapping, NavigationPath, RoutingTables};
