// src/lib.rs

//! Repomux
//!
//! Parses the package metadata of many distribution ecosystems (ports
//! indexes, ebuild trees, pacman databases, Debian `Sources`, recipe
//! trees) into one normalized [`Package`] record.
//!
//! # Architecture
//!
//! - Definitions: each repository names a family and its source paths
//! - Extraction: format-agnostic tokenizers produce raw field maps
//! - Family parsers: one per ecosystem, enumerating and parsing units
//! - Variants: qualifier-suffixed fields resolved per architecture
//! - Normalization: version splitting, defaults, list clean-up
//! - Dispatch: repositories and units parsed in parallel, failures kept
//!   as diagnostics

pub mod config;
mod error;
pub mod extract;
pub mod normalize;
pub mod package;
pub mod repository;
pub mod variant;

pub use config::{RepoSelection, RepositoryDefinition, RepositoryRegistry, SourceDefinition};
pub use error::{Error, Result};
pub use normalize::{NameMapper, Normalizer};
pub use package::{Family, Package};
pub use repository::{Diagnostic, ParseReport, RepositoryManager};
