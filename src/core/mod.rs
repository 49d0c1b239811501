//! The folder tree model, selection propagation, filtering and export.
//!
//! Nothing in here knows about the application session; `app` drives these types.

pub mod context_config;
pub mod error;
pub mod export;
pub mod filter;
pub mod matcher;
pub mod selection;
pub mod tree;

pub use context_config::{ConfigurationError, ContextConfiguration};
pub use error::CoreError;
pub use export::{ContextExporter, ExportFormat, ExportReport};
pub use filter::{
    CancellationFlag, FilterAction, FilterCriteria, FilterEngine, FilterOutcome, FilterSummary,
    FilterTarget,
};
pub use matcher::TextMatcher;
pub use tree::{
    FolderSummary, FolderTree, MatchType, Node, NodeChange, NodeId, NodeKind, TreeObserver,
};
