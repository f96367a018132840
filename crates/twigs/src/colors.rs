//! Semantic color theme for terminal output
//!
//! - `ACTIVE` => blue - headers, lineage groups
//! - `SUCCESS` => green - deletable categories, completed items
//! - `WARNING` => yellow - blocked items, review categories
//! - `FAIL` => red - failed items
//! - `MUTED` => dimmed - kept branches and detail lines

use std::sync::LazyLock;

use owo_colors::Style;
use twigs_core::Category;

/// Semantic color definitions for terminal output
pub struct SemanticColors {
    pub active: Style,
    pub success: Style,
    pub warning: Style,
    pub fail: Style,
    pub muted: Style,
}

impl Default for SemanticColors {
    fn default() -> Self {
        Self {
            active: Style::new().blue().bold(),
            success: Style::new().green(),
            warning: Style::new().yellow(),
            fail: Style::new().red(),
            muted: Style::new().dimmed(),
        }
    }
}

impl SemanticColors {
    /// Style for a category label
    pub fn category(&self, category: Category) -> Style {
        if category.is_plannable() {
            self.success
        } else if category.needs_review() {
            self.warning
        } else {
            self.muted
        }
    }
}

/// Global default theme
pub static COLORS: LazyLock<SemanticColors> = LazyLock::new(SemanticColors::default);
