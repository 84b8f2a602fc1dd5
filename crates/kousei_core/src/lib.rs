//! # kousei_core
//!
//! Proofreading pipeline for kousei.
//!
//! This crate provides:
//! - The [`OffsetMap`] translating filtered-text offsets back to the original document
//! - The filtering and checker collaborator traits with their implementations
//! - The [`Pipeline`] running one analysis over a [`Snapshot`]
//! - Configuration loading
//!
//! ## Example
//!
//! ```rust,ignore
//! use kousei_core::{Pipeline, ServerConfig, Snapshot};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = ServerConfig::from_file(".kousei.jsonc")?;
//! let pipeline = config.pipeline()?;
//!
//! let snapshot = Snapshot::new(uri, 1, "Hello wrold.");
//! let outcome = pipeline.run(&snapshot, &CancellationToken::new()).await?;
//! ```

mod checker;
mod config;
mod diagnostic;
mod error;
mod filter;
pub mod offset_map;
mod pipeline;
mod span;

pub use checker::{Checker, LanguageToolChecker};
pub use config::{CheckerConfig, FilterConfig, ServerConfig, TriggerMode};
pub use diagnostic::{CheckResult, Diagnostic, MAX_REPLACEMENTS, Replacement, Severity};
pub use error::{CheckerError, ConfigError, FilterError, MapError, PipelineError};
pub use filter::{CommandFilter, Filter, Filtered, PlainFilter};
pub use offset_map::{Correspondence, Mapped, MappedSpan, OffsetMap};
pub use pipeline::{FILTER_ERROR_RULE, Pipeline, RunOutcome, Snapshot};
pub use span::Span;

pub use tokio_util::sync::CancellationToken;
pub use url::Url;
