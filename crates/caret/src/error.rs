//! CLI error types.

use caret_ast::TreeError;
use caret_config::ConfigError;
use caret_renderer::OptionsError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Tree(#[from] TreeError),

    #[error("{0}")]
    Options(#[from] OptionsError),

    #[error("{0}")]
    Validation(String),
}
