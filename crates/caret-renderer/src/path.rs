//! Link destination rewriting.

/// Composes the configured link base and link prefix onto destinations.
#[derive(Debug, Clone, Default)]
pub struct LinkResolver {
    base: String,
    prefix: String,
}

impl LinkResolver {
    /// Create a resolver. Empty strings disable the corresponding step.
    #[must_use]
    pub fn new(base: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            prefix: prefix.into(),
        }
    }

    /// Apply the base path then the prefix.
    ///
    /// # Examples
    ///
    /// ```
    /// use caret_renderer::LinkResolver;
    ///
    /// let resolver = LinkResolver::new("/base", "");
    /// assert_eq!(resolver.resolve("a/b.png"), "/base/a/b.png");
    /// assert_eq!(resolver.resolve("http://x/y"), "http://x/y");
    /// assert_eq!(resolver.resolve(""), "");
    /// ```
    #[must_use]
    pub fn resolve(&self, dest: &str) -> String {
        self.prefix(&self.relative(dest))
    }

    /// Join a relative destination onto the base path.
    ///
    /// Absolute paths, URLs with a scheme and Windows drive paths are returned unchanged. An
    /// empty destination resolves to an empty string.
    #[must_use]
    pub fn relative(&self, dest: &str) -> String {
        if self.base.is_empty() {
            return dest.to_owned();
        }
        let dest = dest.replace("%5C", "\\");
        if !is_relative(&dest) {
            return dest;
        }
        let mut joined = self.base.clone();
        if !joined.ends_with('/') {
            joined.push('/');
        }
        joined.push_str(&dest);
        if joined == self.base || joined.trim_end_matches('/') == self.base.trim_end_matches('/') {
            return String::new();
        }
        joined
    }

    /// Prepend the link prefix verbatim.
    #[must_use]
    pub fn prefix(&self, dest: &str) -> String {
        if self.prefix.is_empty() {
            return dest.to_owned();
        }
        format!("{}{dest}", self.prefix)
    }
}

fn is_relative(dest: &str) -> bool {
    !(dest.starts_with('/') || dest.contains("://") || dest.contains(":\\") || dest.contains(":%5C"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_base_is_identity() {
        let r = LinkResolver::default();
        assert_eq!(r.resolve("a/b.png"), "a/b.png");
        assert_eq!(r.resolve(""), "");
    }

    #[test]
    fn test_base_with_trailing_slash() {
        let r = LinkResolver::new("/base/", "");
        assert_eq!(r.resolve("a.png"), "/base/a.png");
    }

    #[test]
    fn test_absolute_and_windows_paths_unchanged() {
        let r = LinkResolver::new("/base", "");
        assert_eq!(r.resolve("/abs/a.png"), "/abs/a.png");
        assert_eq!(r.resolve("C:\\a.png"), "C:\\a.png");
        assert_eq!(r.resolve("C:%5Ca.png"), "C:\\a.png");
    }

    #[test]
    fn test_empty_dest_with_base() {
        let r = LinkResolver::new("/base", "");
        assert_eq!(r.resolve(""), "");
    }

    #[test]
    fn test_prefix_applies_after_base() {
        let r = LinkResolver::new("assets", "https://cdn/");
        assert_eq!(r.resolve("a.png"), "https://cdn/assets/a.png");
        assert_eq!(r.resolve("https://x/y"), "https://cdn/https://x/y");
    }
}
