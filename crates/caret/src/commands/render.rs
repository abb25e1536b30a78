//! `caret render` command implementation.

use std::path::PathBuf;

use caret_ast::Tree;
use caret_config::{CliSettings, Config};
use caret_renderer::RenderMode;
use clap::Args;

use crate::commands::write_output;
use crate::error::CliError;
use crate::input::{InputFormat, load_tree};
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown or JSON tree file to render.
    input: PathBuf,

    /// Output representation (overrides config).
    #[arg(short, long)]
    mode: Option<RenderMode>,

    /// Input format (default: from the file extension).
    #[arg(short, long, value_enum)]
    format: Option<InputFormat>,

    /// Path to configuration file (default: auto-discover caret.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write HTML to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Sanitize raw HTML, images and embeds.
    #[arg(long)]
    sanitize: bool,

    /// Base path for relative links (overrides config).
    #[arg(long, env = "CARET_LINK_BASE")]
    link_base: Option<String>,

    /// Prefix for every resolved link (overrides config).
    #[arg(long)]
    link_prefix: Option<String>,

    /// Insert spaces between CJK and Latin text.
    #[arg(long)]
    auto_space: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl RenderArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            mode: self.mode,
            sanitize: self.sanitize.then_some(true),
            link_base: self.link_base,
            link_prefix: self.link_prefix,
            auto_space: self.auto_space.then_some(true),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            output.detail(&format!("Config: {}", path.display()));
        }

        let mut tree = load_tree(&self.input, self.format)?;
        let html = render_tree(&mut tree, &config)?;
        write_output(self.output.as_deref(), &html)?;

        if let Some(path) = &self.output {
            output.success(&format!(
                "Rendered {} ({}) to {}",
                self.input.display(),
                config.mode,
                path.display()
            ));
        }
        Ok(())
    }
}

/// Render `tree` with the mode and options of `config`.
pub(crate) fn render_tree(tree: &mut Tree, config: &Config) -> Result<String, CliError> {
    let html = config.mode.render(tree, config.render.clone())?;
    tracing::info!(mode = %config.mode, bytes = html.len(), "Rendered document");
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use caret_ast::parse_markdown;
    use caret_renderer::RenderOptions;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: RenderArgs,
    }

    #[test]
    fn test_parse_args() {
        let cli = TestCli::try_parse_from([
            "caret", "note.md", "--mode", "ir", "--format", "json", "--sanitize",
        ])
        .unwrap();
        assert_eq!(cli.args.mode, Some(RenderMode::Ir));
        assert_eq!(cli.args.format, Some(InputFormat::Json));
        assert!(cli.args.sanitize);
        assert!(!cli.args.auto_space);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(TestCli::try_parse_from(["caret", "note.md", "--mode", "sv"]).is_err());
    }

    #[test]
    fn test_render_tree_uses_config_mode() {
        let config = Config {
            mode: RenderMode::Block,
            ..Config::default()
        };
        let mut tree = parse_markdown("text");
        let html = render_tree(&mut tree, &config).unwrap();
        assert!(html.contains(r#"data-node-index="1""#));
    }

    #[test]
    fn test_render_tree_rejects_invalid_options() {
        let config = Config {
            render: RenderOptions {
                node_index_start: -1,
                ..RenderOptions::default()
            },
            ..Config::default()
        };
        let mut tree = parse_markdown("text");
        assert!(matches!(
            render_tree(&mut tree, &config),
            Err(CliError::Options(_))
        ));
    }

    #[test]
    fn test_execute_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("note.md");
        let config = dir.path().join("caret.toml");
        let output = dir.path().join("note.html");
        std::fs::write(&input, "<script>x()</script>\n\nhi").unwrap();
        std::fs::write(&config, "mode = \"wysiwyg\"\n").unwrap();
        let cli = TestCli::try_parse_from([
            "caret",
            input.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--sanitize",
        ])
        .unwrap();
        cli.args.execute().unwrap();
        let html = std::fs::read_to_string(&output).unwrap();
        assert!(html.contains(r#"<p data-block="0">hi</p>"#));
        assert!(!html.contains("<script>"));
    }
}
