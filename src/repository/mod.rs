// src/repository/mod.rs

//! Repository dispatch
//!
//! This module provides functionality for:
//! - Resolving a repository selection against the definitions
//! - Dispatching each repository to its family's parser
//! - Normalizing parsed units into [`Package`] records
//! - Collecting per-unit and per-source failures as diagnostics
//!
//! Repositories and the units inside each source are parsed in parallel.
//! A failing unit or source never aborts its siblings.

pub mod parsers;

use crate::config::{RepoSelection, RepositoryDefinition, RepositoryRegistry};
use crate::error::Result;
use crate::normalize::{Normalizer, Origin};
use crate::package::Package;
use parsers::{FamilyParser, ParserRegistry, SourceContext};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A non-fatal failure met while parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub repo: String,
    /// Failing unit; `None` when a whole source failed
    pub unit: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{}: {}: {}", self.repo, unit, self.message),
            None => write!(f, "{}: {}", self.repo, self.message),
        }
    }
}

/// Records and diagnostics of one dispatch call
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub packages: Vec<Package>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseReport {
    fn merge(&mut self, other: ParseReport) {
        self.packages.extend(other.packages);
        self.diagnostics.extend(other.diagnostics);
    }

    fn diagnose(&mut self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    /// First record of `name` in `repo`
    pub fn find(&self, repo: &str, name: &str) -> Option<&Package> {
        self.packages
            .iter()
            .find(|pkg| pkg.repo == repo && pkg.name == name)
    }

    /// Records of one repository, in source order
    pub fn packages_of<'a>(&'a self, repo: &'a str) -> impl Iterator<Item = &'a Package> {
        self.packages.iter().filter(move |pkg| pkg.repo == repo)
    }
}

/// Entry point: parses selected repositories into normalized records
pub struct RepositoryManager {
    repos_dir: PathBuf,
    registry: RepositoryRegistry,
    parsers: ParserRegistry,
    normalizer: Normalizer,
}

impl RepositoryManager {
    /// Create a manager reading `<repos_dir>/<repository name>/...`
    pub fn new(repos_dir: impl Into<PathBuf>, registry: RepositoryRegistry) -> Self {
        Self {
            repos_dir: repos_dir.into(),
            registry,
            parsers: ParserRegistry::builtin(),
            normalizer: Normalizer::new(),
        }
    }

    pub fn with_parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = parsers;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn registry(&self) -> &RepositoryRegistry {
        &self.registry
    }

    pub fn repos_dir(&self) -> &Path {
        &self.repos_dir
    }

    /// Parse every selected repository
    ///
    /// The selection and the parser of every selected family are resolved
    /// before anything is read; an unknown name fails the whole call.
    pub fn parse(&self, selection: &RepoSelection) -> Result<ParseReport> {
        let jobs = self
            .registry
            .select(selection)?
            .into_iter()
            .map(|definition| Ok((definition, self.parsers.get(definition.family)?)))
            .collect::<Result<Vec<_>>>()?;

        info!("Parsing {} repositories from {}", jobs.len(), self.repos_dir.display());

        let reports: Vec<ParseReport> = jobs
            .par_iter()
            .map(|(definition, parser)| self.parse_repository(definition, *parser))
            .collect();

        let mut report = ParseReport::default();
        for repo_report in reports {
            report.merge(repo_report);
        }

        info!(
            "Parsed {} packages ({} diagnostics)",
            report.packages.len(),
            report.diagnostics.len()
        );
        Ok(report)
    }

    /// Parse the named repositories (names or tags)
    pub fn parse_multi(&self, names: &[&str]) -> Result<ParseReport> {
        self.parse(&RepoSelection::names(names.iter().copied()))
    }

    fn parse_repository(
        &self,
        definition: &RepositoryDefinition,
        parser: &dyn FamilyParser,
    ) -> ParseReport {
        info!("Parsing repository: {} ({})", definition.name, definition.family);
        let mut report = ParseReport::default();

        for source in definition.active_sources() {
            let path = self.repos_dir.join(&definition.name).join(&source.path);
            let ctx = SourceContext::new(definition, source, path);

            if !ctx.path.exists() {
                report.diagnose(Diagnostic {
                    repo: definition.name.clone(),
                    unit: None,
                    message: format!("source {} does not exist", ctx.path.display()),
                });
                continue;
            }

            let units = match parser.units(&ctx) {
                Ok(units) => units,
                Err(e) => {
                    report.diagnose(Diagnostic {
                        repo: definition.name.clone(),
                        unit: None,
                        message: format!("source {}: {}", ctx.path.display(), e),
                    });
                    continue;
                }
            };
            debug!("{}: {} units in {}", definition.name, units.len(), source.path);

            let origin = Origin {
                repo: &definition.name,
                family: definition.family,
                subrepo: ctx.subrepo(),
                fallback_maintainer: definition.default_maintainer.as_deref(),
                scheme: parser.version_scheme(),
            };

            let outcomes: Vec<Result<Option<Package>>> = units
                .par_iter()
                .map(|unit| {
                    parser
                        .parse_unit(unit, &ctx)?
                        .map(|raw| self.normalizer.normalize(raw, &origin))
                        .transpose()
                })
                .collect();

            for (unit, outcome) in units.iter().zip(outcomes) {
                match outcome {
                    Ok(Some(pkg)) => report.packages.push(pkg),
                    Ok(None) => debug!("{}: skipped {}", definition.name, unit.id),
                    Err(e) => report.diagnose(Diagnostic {
                        repo: definition.name.clone(),
                        unit: Some(unit.id.clone()),
                        message: e.to_string(),
                    }),
                }
            }
        }

        info!(
            "Parsed {} packages from repository {}",
            report.packages.len(),
            definition.name
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceDefinition;
    use crate::error::Error;
    use crate::package::Family;
    use tempfile::TempDir;

    const INDEX: &str = "\
foo-1.0|/usr/ports/misc/foo|/usr/local|Foo|/d|a@example.org|misc|||http://foo/|||
broken line
bar-2.0_1|/usr/ports/misc/bar|/usr/local|Bar|/d|b@example.org|misc|||http://bar/|||
";

    fn manager(dir: &TempDir) -> RepositoryManager {
        let registry = RepositoryRegistry::from_definitions(vec![
            RepositoryDefinition::new("ports", Family::Freebsd, SourceDefinition::new("INDEX")),
            RepositoryDefinition::new("missing", Family::Freebsd, SourceDefinition::new("INDEX")),
        ])
        .unwrap();
        RepositoryManager::new(dir.path(), registry)
    }

    #[test]
    fn test_malformed_unit_is_a_diagnostic() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("ports")).unwrap();
        std::fs::write(dir.path().join("ports/INDEX"), INDEX).unwrap();

        let report = manager(&dir).parse_multi(&["ports"]).unwrap();

        let names: Vec<&str> = report.packages.iter().map(|pkg| pkg.name.as_str()).collect();
        assert_eq!(names, vec!["foo", "bar"]);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].unit.as_deref(), Some("line 2"));
        assert_eq!(report.find("ports", "bar").unwrap().version, "2.0");
    }

    #[test]
    fn test_missing_source_is_a_diagnostic() {
        let dir = TempDir::new().unwrap();
        let report = manager(&dir).parse(&RepoSelection::All).unwrap();

        assert!(report.packages.is_empty());
        assert_eq!(report.diagnostics.len(), 2);
        assert!(report.diagnostics.iter().all(|d| d.unit.is_none()));
    }

    #[test]
    fn test_unknown_repository_fails_before_parsing() {
        let dir = TempDir::new().unwrap();
        let err = manager(&dir).parse_multi(&["ports", "nope"]).unwrap_err();

        assert!(matches!(err, Error::UnknownRepository(name) if name == "nope"));
    }

    #[test]
    fn test_missing_parser_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir).with_parsers(ParserRegistry::empty());

        assert!(matches!(
            manager.parse_multi(&["ports"]),
            Err(Error::UnknownFamily(_))
        ));
    }
}
