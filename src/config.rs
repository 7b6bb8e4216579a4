//! Configuration for the review service.
//!
//! All behaviour is controlled through [`ReviewConfig`], built via its
//! [`ReviewConfigBuilder`]. Callers set only what they care about and rely on
//! the documented defaults for the rest.

use crate::error::ReviewError;
use crate::model::PageSize;
use crate::pipeline::anchor::is_anchor_line;
use crate::pipeline::RenderOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where review records are persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    /// Process-local maps. Lost on exit; used by tests and embedding callers
    /// that persist elsewhere. (default)
    #[default]
    Memory,
    /// One JSON file per job and record kind under this directory.
    Files(PathBuf),
}

/// Configuration for a [`crate::ReviewService`].
///
/// # Example
/// ```rust
/// use layout_review::{ReviewConfig, StorageBackend};
///
/// let config = ReviewConfig::builder()
///     .storage(StorageBackend::Files("./review-data".into()))
///     .figure_placeholder("[image]")
///     .build()
///     .unwrap();
/// assert_eq!(config.figure_placeholder, "[image]");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Persistence backend. Default: [`StorageBackend::Memory`].
    pub storage: StorageBackend,

    /// Page size reported when a layout carries none. Default: 1240×1754
    /// (A4 at 150 DPI).
    pub fallback_page: PageSize,

    /// Markdown returned for a job without blocks.
    pub empty_layout_message: String,

    /// Body of an empty figure block. Default: `[figure]`.
    pub figure_placeholder: String,

    /// Body of an empty equation block. Default: `[equation]`.
    pub equation_placeholder: String,

    /// Body of a table block whose HTML has no rows. Default: `[table]`.
    pub table_placeholder: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        let render = RenderOptions::default();
        Self {
            storage: StorageBackend::default(),
            fallback_page: PageSize::default(),
            empty_layout_message: render.empty_message,
            figure_placeholder: render.figure_placeholder,
            equation_placeholder: render.equation_placeholder,
            table_placeholder: render.table_placeholder,
        }
    }
}

impl ReviewConfig {
    /// Create a new builder for `ReviewConfig`.
    pub fn builder() -> ReviewConfigBuilder {
        ReviewConfigBuilder {
            config: Self::default(),
        }
    }

    /// Renderer settings derived from this config.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            empty_message: self.empty_layout_message.clone(),
            figure_placeholder: self.figure_placeholder.clone(),
            equation_placeholder: self.equation_placeholder.clone(),
            table_placeholder: self.table_placeholder.clone(),
        }
    }
}

/// Builder for [`ReviewConfig`].
#[derive(Debug)]
pub struct ReviewConfigBuilder {
    config: ReviewConfig,
}

impl ReviewConfigBuilder {
    pub fn storage(mut self, backend: StorageBackend) -> Self {
        self.config.storage = backend;
        self
    }

    /// Shorthand for `storage(StorageBackend::Files(dir))`.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage = StorageBackend::Files(dir.into());
        self
    }

    pub fn fallback_page(mut self, width: u32, height: u32) -> Self {
        self.config.fallback_page = PageSize { width, height };
        self
    }

    pub fn empty_layout_message(mut self, msg: impl Into<String>) -> Self {
        self.config.empty_layout_message = msg.into();
        self
    }

    pub fn figure_placeholder(mut self, text: impl Into<String>) -> Self {
        self.config.figure_placeholder = text.into();
        self
    }

    pub fn equation_placeholder(mut self, text: impl Into<String>) -> Self {
        self.config.equation_placeholder = text.into();
        self
    }

    pub fn table_placeholder(mut self, text: impl Into<String>) -> Self {
        self.config.table_placeholder = text.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReviewConfig, ReviewError> {
        let c = &self.config;
        if c.fallback_page.width == 0 || c.fallback_page.height == 0 {
            return Err(ReviewError::InvalidConfig(format!(
                "Fallback page size must be positive, got {}×{}",
                c.fallback_page.width, c.fallback_page.height
            )));
        }
        if let StorageBackend::Files(dir) = &c.storage {
            if dir.as_os_str().is_empty() {
                return Err(ReviewError::InvalidConfig(
                    "Data directory must not be empty".into(),
                ));
            }
        }
        for (name, text) in [
            ("empty_layout_message", &c.empty_layout_message),
            ("figure_placeholder", &c.figure_placeholder),
            ("equation_placeholder", &c.equation_placeholder),
            ("table_placeholder", &c.table_placeholder),
        ] {
            if text.trim().is_empty() {
                return Err(ReviewError::InvalidConfig(format!(
                    "{name} must not be empty"
                )));
            }
            // Placeholders end up in rendered documents; a blank line or a
            // fake anchor would break block separation or the anchor count.
            if text.lines().any(|l| l.trim().is_empty() || is_anchor_line(l)) {
                return Err(ReviewError::InvalidConfig(format!(
                    "{name} must be free of blank lines and block anchors"
                )));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let config = ReviewConfig::builder().build().unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.fallback_page, PageSize { width: 1240, height: 1754 });
        assert_eq!(config.render_options(), RenderOptions::default());
    }

    #[test]
    fn zero_page_is_rejected() {
        let err = ReviewConfig::builder()
            .fallback_page(0, 100)
            .build()
            .unwrap_err();
        assert!(matches!(err, ReviewError::InvalidConfig(_)));
    }

    #[test]
    fn anchor_lookalike_placeholder_is_rejected() {
        let err = ReviewConfig::builder()
            .figure_placeholder("<!-- @block:block_001 0,0,1,1 -->")
            .build()
            .unwrap_err();
        assert!(matches!(err, ReviewError::InvalidConfig(_)));

        assert!(ReviewConfig::builder()
            .table_placeholder("a\n\nb")
            .build()
            .is_err());
    }

    #[test]
    fn data_dir_selects_file_backend() {
        let config = ReviewConfig::builder().data_dir("/tmp/x").build().unwrap();
        assert_eq!(config.storage, StorageBackend::Files("/tmp/x".into()));
        assert!(ReviewConfig::builder().data_dir("").build().is_err());
    }
}
