//! CLI command implementations.

pub(crate) mod render;
pub(crate) mod tree;

pub(crate) use render::RenderArgs;
pub(crate) use tree::TreeArgs;

use std::io::Write;
use std::path::Path;

use crate::error::CliError;

/// Write `content` to `path`, or to stdout when no path is given.
pub(crate) fn write_output(path: Option<&Path>, content: &str) -> Result<(), CliError> {
    match path {
        Some(path) => std::fs::write(path, content)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}
