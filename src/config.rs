// src/config.rs

//! Repository definitions
//!
//! A definition ties a repository name to a family, the source files or
//! trees holding its data, and per-repository knobs:
//!
//! ```toml
//! [[repository]]
//! name = "debian_unstable"
//! family = "debuntu"
//! tags = ["debian"]
//!
//! [[repository.source]]
//! path = "main/Sources"
//! subrepo = "main"
//! ```
//!
//! Source paths are relative to `<base>/<repository name>/`.

use crate::error::{Error, Result};
use crate::package::Family;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// One source file or tree of a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDefinition {
    /// Path relative to the repository directory
    pub path: String,
    /// Component/section label recorded on every package from this source
    #[serde(default)]
    pub subrepo: Option<String>,
}

impl SourceDefinition {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            subrepo: None,
        }
    }

    pub fn with_subrepo(path: impl Into<String>, subrepo: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            subrepo: Some(subrepo.into()),
        }
    }
}

/// Definition of one repository instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDefinition {
    pub name: String,
    pub family: Family,
    #[serde(rename = "source", default)]
    pub sources: Vec<SourceDefinition>,
    /// Maintainer substituted when a package declares none
    #[serde(default)]
    pub default_maintainer: Option<String>,
    /// Only sources with one of these subrepos are parsed
    #[serde(default)]
    pub subrepos: Option<Vec<String>>,
    /// Qualifiers variant fields are resolved for; defaults to the ones
    /// each field declares
    #[serde(default)]
    pub arches: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RepositoryDefinition {
    /// Create a definition with a single source
    pub fn new(name: impl Into<String>, family: Family, source: SourceDefinition) -> Self {
        Self {
            name: name.into(),
            family,
            sources: vec![source],
            default_maintainer: None,
            subrepos: None,
            arches: None,
            tags: Vec::new(),
        }
    }

    /// Add another source
    pub fn with_source(mut self, source: SourceDefinition) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_default_maintainer(mut self, maintainer: impl Into<String>) -> Self {
        self.default_maintainer = Some(maintainer.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Sources that pass the subrepo filter
    pub fn active_sources(&self) -> impl Iterator<Item = &SourceDefinition> {
        self.sources.iter().filter(|source| match &self.subrepos {
            None => true,
            Some(allowed) => source
                .subrepo
                .as_ref()
                .is_some_and(|subrepo| allowed.contains(subrepo)),
        })
    }

    fn matches(&self, selector: &str) -> bool {
        self.name == selector || self.tags.iter().any(|tag| tag == selector)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidDefinition(
                "repository name must not be empty".to_string(),
            ));
        }
        if self.sources.is_empty() {
            return Err(Error::InvalidDefinition(format!(
                "repository '{}' has no sources",
                self.name
            )));
        }
        if let Some(source) = self.sources.iter().find(|s| s.path.trim().is_empty()) {
            return Err(Error::InvalidDefinition(format!(
                "repository '{}' has a source with an empty path (subrepo {:?})",
                self.name, source.subrepo
            )));
        }
        if self
            .default_maintainer
            .as_ref()
            .is_some_and(|maintainer| maintainer.trim().is_empty())
        {
            return Err(Error::InvalidDefinition(format!(
                "repository '{}' has an empty default maintainer",
                self.name
            )));
        }
        Ok(())
    }
}

/// Which repositories a dispatch call covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSelection {
    /// Every defined repository
    All,
    /// Repository names or tags
    Names(Vec<String>),
}

impl RepoSelection {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RepoSelection::Names(names.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(rename = "repository", default)]
    repositories: Vec<RepositoryDefinition>,
}

/// Validated, immutable set of repository definitions
#[derive(Debug, Clone, Default)]
pub struct RepositoryRegistry {
    definitions: Vec<RepositoryDefinition>,
}

impl RepositoryRegistry {
    /// Build a registry, rejecting invalid or duplicate definitions
    pub fn from_definitions(definitions: Vec<RepositoryDefinition>) -> Result<Self> {
        let mut seen = HashSet::new();
        for definition in &definitions {
            definition.validate()?;
            if !seen.insert(definition.name.as_str()) {
                return Err(Error::InvalidDefinition(format!(
                    "repository '{}' is defined more than once",
                    definition.name
                )));
            }
        }
        Ok(Self { definitions })
    }

    /// Parse definitions from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: RegistryFile = toml::from_str(text)?;
        Self::from_definitions(file.repositories)
    }

    /// Load definitions from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading repository definitions from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Definitions of the repositories shipped with the test data
    pub fn builtin() -> Self {
        let definitions = vec![
            RepositoryDefinition::new("freebsd", Family::Freebsd, SourceDefinition::new("INDEX")),
            RepositoryDefinition::new("gentoo", Family::Gentoo, SourceDefinition::new("."))
                .with_default_maintainer("maintainer-needed@gentoo.org"),
            RepositoryDefinition::new("arch", Family::Arch, SourceDefinition::with_subrepo("core", "core"))
                .with_source(SourceDefinition::with_subrepo("extra", "extra")),
            RepositoryDefinition::new(
                "cpan",
                Family::Cpan,
                SourceDefinition::new("02packages.details.txt"),
            ),
            RepositoryDefinition::new(
                "debian_unstable",
                Family::Debuntu,
                SourceDefinition::with_subrepo("main/Sources", "main"),
            )
            .with_source(SourceDefinition::with_subrepo("contrib/Sources", "contrib"))
            .with_tag("debian"),
            RepositoryDefinition::new("gobolinux", Family::Gobolinux, SourceDefinition::new("."))
                .with_default_maintainer("fallback-mnt-gobolinux@repology"),
            RepositoryDefinition::new("slackbuilds", Family::Slackbuilds, SourceDefinition::new(".")),
            RepositoryDefinition::new("pkgsrc", Family::Pkgsrc, SourceDefinition::new(".")),
        ]
        .into_iter()
        .map(|definition| definition.with_tag("have_testdata"))
        .collect();

        Self { definitions }
    }

    pub fn get(&self, name: &str) -> Option<&RepositoryDefinition> {
        self.definitions.iter().find(|definition| definition.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|definition| definition.name.as_str())
    }

    pub fn definitions(&self) -> &[RepositoryDefinition] {
        &self.definitions
    }

    /// Resolve a selection to definitions, in definition order
    ///
    /// Every selector must match at least one repository name or tag;
    /// the first one that does not is reported as an error.
    pub fn select(&self, selection: &RepoSelection) -> Result<Vec<&RepositoryDefinition>> {
        let selectors = match selection {
            RepoSelection::All => return Ok(self.definitions.iter().collect()),
            RepoSelection::Names(selectors) => selectors,
        };

        if let Some(unknown) = selectors
            .iter()
            .find(|selector| !self.definitions.iter().any(|d| d.matches(selector)))
        {
            return Err(Error::UnknownRepository(unknown.clone()));
        }

        Ok(self
            .definitions
            .iter()
            .filter(|definition| selectors.iter().any(|selector| definition.matches(selector)))
            .collect())
    }
}
