//! Matrfile parsing
//!
//! A Matrfile is ordinary Rust source whose first line is the build marker.
//! Every top-level function becomes a [`Command`]; functions whose name
//! starts with an upper-case letter are exported as runnable tasks.

use std::path::Path;

use syn::ext::IdentExt;
use tracing::debug;

use crate::error::{MatrError, Result};

/// Comment that must open every Matrfile
pub const BUILD_MARKER: &str = "// matr:build";

/// One function discovered in a Matrfile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    /// Function identifier
    pub name: String,
    /// First line of the doc comment
    pub summary: String,
    /// Full doc comment
    pub doc: String,
    /// Whether the function is registered as a task
    pub is_exported: bool,
}

/// Parse a Matrfile from disk
pub fn parse(path: &Path) -> Result<Vec<Command>> {
    debug!(path = %path.display(), "parsing Matrfile");
    let source = std::fs::read_to_string(path)?;
    parse_source(path, &source)
}

/// Parse Matrfile source; `path` is only used in error messages
pub fn parse_source(path: &Path, source: &str) -> Result<Vec<Command>> {
    if source.lines().next() != Some(BUILD_MARKER) {
        return Err(MatrError::InvalidDefinitionFile(path.to_path_buf()));
    }

    let file = syn::parse_file(source).map_err(|e| {
        let start = e.span().start();
        MatrError::ParseFailure {
            path: path.to_path_buf(),
            line: start.line,
            column: start.column + 1,
            message: e.to_string(),
        }
    })?;

    let commands: Vec<Command> = file
        .items
        .iter()
        .filter_map(|item| match item {
            syn::Item::Fn(func) => Some(parse_command(func)),
            _ => None,
        })
        .collect();

    debug!(
        path = %path.display(),
        commands = commands.len(),
        exported = commands.iter().filter(|c| c.is_exported).count(),
        "parsed Matrfile"
    );
    Ok(commands)
}

fn parse_command(func: &syn::ItemFn) -> Command {
    let name = func.sig.ident.unraw().to_string();
    let is_exported = name.chars().next().is_some_and(char::is_uppercase);

    let lines = doc_lines(&func.attrs);
    let (summary, doc) = match lines.first() {
        Some(first) => (
            first.trim_start().to_string(),
            lines.join("\n").trim_start().to_string(),
        ),
        None => (String::new(), String::new()),
    };

    Command {
        name,
        summary,
        doc,
        is_exported,
    }
}

/// Doc comment text, one entry per source line, markers removed
fn doc_lines(attrs: &[syn::Attribute]) -> Vec<String> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(nv) => match &nv.value {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(text),
                    ..
                }) => Some(text.value()),
                _ => None,
            },
            _ => None,
        })
        .flat_map(|text| {
            text.split('\n')
                .map(|line| line.trim_end_matches('\r').to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn path() -> PathBuf {
        PathBuf::from("Matrfile.rs")
    }

    #[test]
    fn test_parse_valid_matrfile() {
        let source = r#"// matr:build

use matr::Context;

/// Summary for TestFunc1
fn TestFunc1(ctx: &Context) -> matr::Result {
    Ok(())
}

/// Summary for TestFunc2
fn TestFunc2(ctx: &Context) -> matr::Result {
    Ok(())
}
"#;
        let commands = parse_source(&path(), source).unwrap();

        assert_eq!(
            commands,
            vec![
                Command {
                    name: "TestFunc1".to_string(),
                    summary: "Summary for TestFunc1".to_string(),
                    doc: "Summary for TestFunc1".to_string(),
                    is_exported: true,
                },
                Command {
                    name: "TestFunc2".to_string(),
                    summary: "Summary for TestFunc2".to_string(),
                    doc: "Summary for TestFunc2".to_string(),
                    is_exported: true,
                },
            ]
        );
    }

    #[test]
    fn test_missing_marker_is_invalid() {
        let source = "/// Runs tests\nfn Test(ctx: &matr::Context) -> matr::Result { Ok(()) }\n";
        let err = parse_source(&path(), source).unwrap_err();
        assert!(matches!(err, MatrError::InvalidDefinitionFile(_)));
        assert_eq!(
            err.to_string(),
            "invalid Matrfile Matrfile.rs: matr build marker missing or incorrect"
        );
    }

    #[test]
    fn test_marker_must_open_the_file() {
        for source in [
            "\n// matr:build\nfn Test() {}\n",
            "// matr:build extra\nfn Test() {}\n",
            "//matr:build\nfn Test() {}\n",
            "/* matr */\n// matr:build\nfn Test() {}\n",
            "",
        ] {
            assert!(
                matches!(
                    parse_source(&path(), source),
                    Err(MatrError::InvalidDefinitionFile(_))
                ),
                "accepted {:?}",
                source
            );
        }
    }

    #[test]
    fn test_crlf_marker_is_accepted() {
        let commands = parse_source(&path(), "// matr:build\r\nfn Test() {}\r\n").unwrap();
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn test_export_follows_capitalization() {
        let source = r#"// matr:build

/// runs tests
fn Test(ctx: &matr::Context) -> matr::Result {
    Ok(())
}

fn build(ctx: &matr::Context) -> matr::Result {
    Ok(())
}

pub fn helper() {}
"#;
        let commands = parse_source(&path(), source).unwrap();

        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].name, "Test");
        assert!(commands[0].is_exported);
        assert_eq!(commands[0].summary, "runs tests");
        assert_eq!(commands[1].name, "build");
        assert!(!commands[1].is_exported);
        assert!(commands[1].summary.is_empty());
        assert!(commands[1].doc.is_empty());
        assert!(!commands[2].is_exported);
    }

    #[test]
    fn test_multiline_doc() {
        let source = r#"// matr:build

///   Build the docker image
///
/// Tags it with the current commit.
fn BuildDocker(ctx: &matr::Context) -> matr::Result {
    Ok(())
}
"#;
        let commands = parse_source(&path(), source).unwrap();

        assert_eq!(commands[0].summary, "Build the docker image");
        assert_eq!(
            commands[0].doc,
            "Build the docker image\n\n Tags it with the current commit."
        );
    }

    #[test]
    fn test_block_doc_comment() {
        let source = "// matr:build\n\n/** Deploy\n to prod */\nfn Deploy() {}\n";
        let commands = parse_source(&path(), source).unwrap();

        assert_eq!(commands[0].summary, "Deploy");
        assert_eq!(commands[0].doc, "Deploy\n to prod ");
    }

    #[test]
    fn test_non_functions_are_ignored() {
        let source = r#"// matr:build

use std::process::Command;

const IMAGE: &str = "app";

struct Settings;

impl Settings {
    fn Nested() {}
}

mod helpers {
    pub fn Inner() {}
}

/// Lint everything
fn Lint() {}
"#;
        let commands = parse_source(&path(), source).unwrap();

        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].name, "Lint");
    }

    #[test]
    fn test_plain_comments_are_not_docs() {
        let source = "// matr:build\n\n// not a doc comment\nfn Test() {}\n";
        let commands = parse_source(&path(), source).unwrap();
        assert!(commands[0].summary.is_empty());
    }

    #[test]
    fn test_raw_identifier() {
        let source = "// matr:build\nfn r#type() {}\n";
        let commands = parse_source(&path(), source).unwrap();
        assert_eq!(commands[0].name, "type");
        assert!(!commands[0].is_exported);
    }

    #[test]
    fn test_syntax_error_is_fatal() {
        let source = "// matr:build\n\nfn Test() {}\n\nfn Broken(x) {}\n";
        let err = parse_source(&path(), source).unwrap_err();
        match err {
            MatrError::ParseFailure { path, message, .. } => {
                assert_eq!(path, PathBuf::from("Matrfile.rs"));
                assert!(!message.is_empty());
            }
            other => panic!("expected parse failure, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_from_disk() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("Matrfile.rs");
        std::fs::write(&file, "// matr:build\n\n/// runs tests\nfn Test() {}\n").unwrap();

        let commands = parse(&file).unwrap();
        assert_eq!(commands[0].summary, "runs tests");
    }

    #[test]
    fn test_parse_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = parse(&temp.path().join("Matrfile.rs")).unwrap_err();
        assert!(matches!(err, MatrError::Io(_)));
    }
}
