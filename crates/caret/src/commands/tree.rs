//! `caret tree` command implementation.

use std::path::PathBuf;

use caret_ast::parse_markdown;
use clap::Args;

use crate::commands::write_output;
use crate::error::CliError;

/// Arguments for the tree command.
#[derive(Args)]
pub(crate) struct TreeArgs {
    /// Markdown file to parse.
    input: PathBuf,

    /// Write JSON to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl TreeArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let source = std::fs::read_to_string(&self.input)?;
        let json = parse_markdown(&source).to_json()?;
        write_output(self.output.as_deref(), &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caret_ast::{NodeKind, Tree};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tree_output_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("note.md");
        let output = dir.path().join("note.json");
        std::fs::write(&input, "*a*").unwrap();
        let args = TreeArgs {
            input,
            output: Some(output.clone()),
        };
        args.execute().unwrap();

        let tree = Tree::from_json(&std::fs::read_to_string(&output).unwrap()).unwrap();
        let paragraph = tree.first_child(tree.root()).unwrap();
        assert_eq!(tree.kind(paragraph), NodeKind::Paragraph);
        let em = tree.first_child(paragraph).unwrap();
        assert_eq!(tree.kind(em), NodeKind::Emphasis);
    }
}
