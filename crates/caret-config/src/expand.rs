//! `${VAR}` and `${VAR:-default}` references in path-like settings.

use crate::ConfigError;

/// Name of the variable that failed to resolve.
struct Unset(String);

/// Expand variable references in the value of `field`.
///
/// Only the braced forms are expanded; a bare `$` is kept as written.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }
    let lookup = |name: &str| -> Result<Option<String>, Unset> {
        std::env::var(name)
            .map(Some)
            .map_err(|_| Unset(name.to_owned()))
    };
    shellexpand::env_with_context(value, lookup)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} is not set", e.cause.0),
        })
}
