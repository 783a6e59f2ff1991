//! Core business logic abstractions

pub mod cache;
pub mod clock;
pub mod config;
pub mod convert;
pub mod derive;
pub mod error;
pub mod gold;
pub mod indicator;
pub mod log;
pub mod quota;
pub mod refresh;
pub mod source;

// Re-export main types for cleaner imports
pub use cache::{IndicatorCache, KeyValueStore};
pub use error::IndicatorError;
pub use indicator::{GoldQuote, IndicatorCode, IndicatorSnapshot, Reading};
pub use refresh::{Presenter, RefreshOrchestrator, RefreshOutcome, SnapshotOrigin};
pub use source::IndicatorSource;
