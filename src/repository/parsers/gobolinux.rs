// src/repository/parsers/gobolinux.rs

//! GoboLinux recipe tree parser
//!
//! Recipes live in `<Name>/<Version>/`: a shell-style `Recipe` holding the
//! source URL(s), and `Resources/Description` with `[Key] value` blocks.
//! Recipe URLs may refer to the version as `$v`, `${v}` or `$version`.

use super::{
    FamilyParser, PackageUnit, SourceContext, file_name, read_source_text, sorted_subdirs,
};
use crate::error::{Error, Result};
use crate::extract::blocks::{BlockMarkers, parse_blocks};
use crate::extract::{Convention, expand_variables, parse_assignments};
use crate::normalize::{RawPackage, VersionScheme, keys};
use crate::package::Family;
use tracing::debug;

const RECIPE_FILE: &str = "Recipe";
const DESCRIPTION_FILE: &str = "Resources/Description";

const DESCRIPTION_ALIASES: &[(&str, &str)] = &[
    ("Summary", keys::COMMENT),
    ("License", keys::LICENSES),
    ("Homepage", keys::HOMEPAGE),
];

/// GoboLinux recipe tree parser
pub struct GobolinuxParser;

impl FamilyParser for GobolinuxParser {
    fn family(&self) -> Family {
        Family::Gobolinux
    }

    fn version_scheme(&self) -> VersionScheme {
        VersionScheme::RevisionSuffix
    }

    fn units(&self, ctx: &SourceContext<'_>) -> Result<Vec<PackageUnit>> {
        let mut units = Vec::new();
        for package in sorted_subdirs(&ctx.path)? {
            let name = file_name(&package);
            for version in sorted_subdirs(&package)? {
                units.push(PackageUnit::dir(format!("{}/{}", name, file_name(&version)), version));
            }
        }

        debug!("Found {} recipes in {}", units.len(), ctx.path.display());
        Ok(units)
    }

    fn parse_unit(
        &self,
        unit: &PackageUnit,
        _ctx: &SourceContext<'_>,
    ) -> Result<Option<RawPackage>> {
        let dir = unit.dir_path()?;
        let name = dir.parent().map(file_name).unwrap_or_default();
        let version = file_name(dir);

        let recipe_path = dir.join(RECIPE_FILE);
        if !recipe_path.is_file() {
            return Err(Error::ParseError(format!("{} has no Recipe", unit.id)));
        }
        let recipe = parse_assignments(&read_source_text(&recipe_path)?, &Convention::SHELL)?;

        let description_path = dir.join(DESCRIPTION_FILE);
        let mut raw = if description_path.is_file() {
            let description =
                parse_blocks(&read_source_text(&description_path)?, &BlockMarkers::BRACKET);
            RawPackage::alias(&description, DESCRIPTION_ALIASES)
        } else {
            RawPackage::new()
        };
        raw.set(keys::NAME, name).set(keys::VERSION, version.as_str());

        let (upstream_version, _) = self.version_scheme().split(&version);
        let lookup = |variable: &str| match variable {
            "v" | "version" => Some(upstream_version.clone()),
            other => recipe.get(other).map(|value| value.joined()),
        };

        let urls = ["url", "urls"]
            .iter()
            .filter_map(|key| recipe.get(*key))
            .flat_map(|value| value.words())
            .map(|url| expand_variables(url, &lookup))
            .collect::<Vec<_>>();
        raw.extend(keys::DOWNLOADS, urls);

        Ok(Some(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RepositoryDefinition, SourceDefinition};
    use tempfile::TempDir;

    #[test]
    fn test_parse_recipe_dir() {
        let dir = TempDir::new().unwrap();
        let recipe_dir = dir.path().join("Foo/1.2-r1");
        std::fs::create_dir_all(recipe_dir.join("Resources")).unwrap();
        std::fs::write(
            recipe_dir.join("Recipe"),
            "compile_version=1.8.3\nurls=(\n  \"http://a/foo-$v.tar.gz\"\n  \"http://b/foo-${version}-extra.tar.gz\"\n)\n",
        )
        .unwrap();
        std::fs::write(
            recipe_dir.join("Resources/Description"),
            "[Name] Foo\n[Summary] Does foo\n[License] MIT\n[Description] A long\ntext.\n[Homepage] http://a/\n",
        )
        .unwrap();

        let definition = RepositoryDefinition::new("gobolinux", Family::Gobolinux, SourceDefinition::new("."));
        let ctx = SourceContext::new(&definition, &definition.sources[0], dir.path().to_path_buf());

        let units = GobolinuxParser.units(&ctx).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].id, "Foo/1.2-r1");

        let raw = GobolinuxParser.parse_unit(&units[0], &ctx).unwrap().unwrap();
        assert_eq!(raw.first(keys::NAME), Some("Foo"));
        assert_eq!(raw.first(keys::VERSION), Some("1.2-r1"));
        assert_eq!(raw.first(keys::COMMENT), Some("Does foo"));
        assert_eq!(
            raw.get(keys::DOWNLOADS).unwrap().items(),
            vec!["http://a/foo-1.2.tar.gz", "http://b/foo-1.2-extra.tar.gz"]
        );
    }

    #[test]
    fn test_missing_recipe() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("Bar/1.0")).unwrap();

        let definition = RepositoryDefinition::new("gobolinux", Family::Gobolinux, SourceDefinition::new("."));
        let ctx = SourceContext::new(&definition, &definition.sources[0], dir.path().to_path_buf());
        let units = GobolinuxParser.units(&ctx).unwrap();

        assert!(matches!(
            GobolinuxParser.parse_unit(&units[0], &ctx),
            Err(Error::ParseError(_))
        ));
    }
}
