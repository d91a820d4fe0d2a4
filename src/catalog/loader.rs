// src/catalog/loader.rs

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::catalog::model::Catalog;

/// Parse a catalog from its TOML text.
///
/// This only performs deserialization; graph-structural validation (missing
/// dependencies, cycles, duplicate ids) happens when the applier builds the
/// dependency graph.
pub fn parse(contents: &str) -> Result<Catalog> {
    let catalog: Catalog = toml::from_str(contents).context("parsing TOML catalog")?;
    Ok(catalog)
}

/// Load a catalog file from a given path.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Catalog> {
    let path = path.as_ref();
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading catalog file at {:?}", path))?;
    let catalog: Catalog = toml::from_str(&contents)
        .with_context(|| format!("parsing TOML catalog from {:?}", path))?;
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::{CommandKind, Condition, FileState, Payload};

    #[test]
    fn parse_full_catalog() {
        let text = r#"
            [[resource]]
            id = 1
            comment = "web root"
            file = { path = "/srv/www", state = "directory", mode = 0o755 }

            [[resource]]
            id = 2
            comment = "index page"
            dependencies = [1]

            [resource.file]
            path = "/srv/www/index.html"
            state = { plain = { content = "hello\n" } }

            [[resource]]
            id = 3
            dependencies = [2]

            [resource.exec]
            condition = { file_absent = "/srv/www/.seeded" }

            [resource.exec.command]
            argv = ["/usr/bin/touch", "/srv/www/.seeded"]
            environment = [{ name = "LC_ALL", value = "C" }]
            working_directory = "/srv/www"
        "#;

        let catalog = parse(text).expect("catalog should parse");
        assert_eq!(catalog.resources.len(), 3);

        let root = &catalog.resources[0];
        match &root.payload {
            Payload::File(f) => {
                assert_eq!(f.path.to_str(), Some("/srv/www"));
                assert_eq!(f.mode, Some(0o755));
                assert!(matches!(f.state, FileState::Directory));
            }
            other => panic!("expected file payload, got {other:?}"),
        }

        let index = &catalog.resources[1];
        assert_eq!(index.dependencies, vec![1]);
        match &index.payload {
            Payload::File(f) => match &f.state {
                FileState::Plain { content } => {
                    assert_eq!(content.as_deref(), Some("hello\n"));
                }
                other => panic!("expected plain state, got {other:?}"),
            },
            other => panic!("expected file payload, got {other:?}"),
        }

        let seed = &catalog.resources[2];
        match &seed.payload {
            Payload::Exec(e) => {
                assert!(matches!(e.condition, Condition::FileAbsent(_)));
                let CommandKind::Argv(argv) = &e.command.kind;
                assert_eq!(argv[0], "/usr/bin/touch");
                assert_eq!(e.command.environment.len(), 1);
                assert_eq!(e.command.environment[0].name, "LC_ALL");
                assert_eq!(
                    e.command.working_directory.as_deref().and_then(|p| p.to_str()),
                    Some("/srv/www")
                );
            }
            other => panic!("expected exec payload, got {other:?}"),
        }
    }

    #[test]
    fn parse_noop_and_defaults() {
        let text = r#"
            [[resource]]
            id = 10
            noop = {}

            [[resource]]
            id = 11

            [resource.exec.command]
            argv = ["/bin/true"]
        "#;

        let catalog = parse(text).expect("catalog should parse");
        assert!(matches!(catalog.resources[0].payload, Payload::Noop {}));
        assert!(catalog.resources[0].dependencies.is_empty());
        assert_eq!(catalog.resources[0].comment, "");

        match &catalog.resources[1].payload {
            Payload::Exec(e) => {
                assert!(matches!(e.condition, Condition::Always));
                assert!(e.command.environment.is_empty());
                assert!(e.command.working_directory.is_none());
            }
            other => panic!("expected exec payload, got {other:?}"),
        }
    }

    #[test]
    fn parse_empty_catalog() {
        let catalog = parse("").expect("empty catalog should parse");
        assert!(catalog.resources.is_empty());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse("[[resource]]\nid = \"not a number\"").is_err());
    }
}
