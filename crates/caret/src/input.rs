//! Reading input documents.

use std::path::Path;

use caret_ast::{Tree, parse_markdown};
use clap::ValueEnum;

use crate::error::CliError;

/// Format of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum InputFormat {
    /// CommonMark with the usual extensions.
    Markdown,
    /// Nested JSON tree as printed by `caret tree`.
    Json,
}

impl InputFormat {
    /// Guess the format from the file extension; anything but `.json` is Markdown.
    pub(crate) fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Markdown,
        }
    }
}

/// Read `path` and build its tree.
pub(crate) fn load_tree(path: &Path, format: Option<InputFormat>) -> Result<Tree, CliError> {
    let format = format.unwrap_or_else(|| InputFormat::from_path(path));
    let source = std::fs::read_to_string(path)?;
    tracing::info!(path = %path.display(), ?format, bytes = source.len(), "Read input");
    match format {
        InputFormat::Markdown => Ok(parse_markdown(&source)),
        InputFormat::Json => Ok(Tree::from_json(&source)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caret_ast::NodeKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_from_path() {
        assert_eq!(InputFormat::from_path(Path::new("a/tree.JSON")), InputFormat::Json);
        assert_eq!(InputFormat::from_path(Path::new("note.md")), InputFormat::Markdown);
        assert_eq!(InputFormat::from_path(Path::new("README")), InputFormat::Markdown);
    }

    #[test]
    fn test_load_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.md");
        std::fs::write(&path, "# Title").unwrap();
        let tree = load_tree(&path, None).unwrap();
        let first = tree.first_child(tree.root()).unwrap();
        assert_eq!(tree.kind(first), NodeKind::Heading);
    }

    #[test]
    fn test_explicit_format_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, r#"{"type": "NodeDocument", "children": []}"#).unwrap();
        let tree = load_tree(&path, Some(InputFormat::Json)).unwrap();
        assert!(tree.first_child(tree.root()).is_none());
    }

    #[test]
    fn test_bad_json_is_tree_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        std::fs::write(&path, "{").unwrap();
        assert!(matches!(load_tree(&path, None), Err(CliError::Tree(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_tree(&dir.path().join("absent.md"), None);
        assert!(matches!(result, Err(CliError::Io(_))));
    }
}
