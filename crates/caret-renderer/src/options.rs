//! Render options.

/// Error returned by [`RenderOptions::validate`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OptionsError {
    /// The block backend's node index would start below zero.
    #[error("node_index_start must not be negative, got {0}")]
    NegativeNodeIndex(i64),
    /// The link prefix cannot be written into an attribute value.
    #[error("link_prefix must not contain a newline or a quote: {0:?}")]
    InvalidLinkPrefix(String),
}

/// Options shared by every backend.
///
/// All fields have defaults, so a partial configuration table deserializes into a complete
/// record (with the `serde` feature).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderOptions {
    /// Run image, HTML and embed fragments through the sanitizer.
    pub sanitize: bool,
    /// Base path joined onto relative link and image destinations.
    pub link_base: String,
    /// Prefix prepended to every resolved destination.
    pub link_prefix: String,
    /// Insert spaces between CJK and Latin runs.
    pub auto_space: bool,
    /// Emit anchor links inside headings.
    pub heading_anchor: bool,
    /// Emit a preview sibling for code blocks.
    pub code_block_preview: bool,
    /// Emit a preview sibling for math blocks.
    pub math_block_preview: bool,
    /// Class of task list items.
    pub task_list_item_class: String,
    /// `contenteditable` value used when a block's IAL does not set one.
    pub contenteditable_default: bool,
    /// Mark images that do not live under `assets/` as network images.
    pub protyle_mark_network_images: bool,
    /// First value of the block backend's `data-node-index`.
    pub node_index_start: i64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            sanitize: false,
            link_base: String::new(),
            link_prefix: String::new(),
            auto_space: false,
            heading_anchor: false,
            code_block_preview: true,
            math_block_preview: true,
            task_list_item_class: "vditor-task".to_owned(),
            contenteditable_default: true,
            protyle_mark_network_images: true,
            node_index_start: 1,
        }
    }
}

impl RenderOptions {
    /// Check the options once before rendering.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.node_index_start < 0 {
            return Err(OptionsError::NegativeNodeIndex(self.node_index_start));
        }
        if self.link_prefix.contains(['\n', '"']) {
            return Err(OptionsError::InvalidLinkPrefix(self.link_prefix.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let options = RenderOptions::default();
        assert!(options.validate().is_ok());
        assert!(options.code_block_preview);
        assert_eq!(options.task_list_item_class, "vditor-task");
        assert_eq!(options.node_index_start, 1);
    }

    #[test]
    fn test_negative_node_index_rejected() {
        let options = RenderOptions {
            node_index_start: -1,
            ..RenderOptions::default()
        };
        assert_eq!(options.validate(), Err(OptionsError::NegativeNodeIndex(-1)));
    }

    #[test]
    fn test_link_prefix_with_quote_rejected() {
        let options = RenderOptions {
            link_prefix: "a\"b".to_owned(),
            ..RenderOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(OptionsError::InvalidLinkPrefix(_))
        ));
    }
}
