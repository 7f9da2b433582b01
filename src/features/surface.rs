//! Surface features computed directly from text

use super::tokenize::tokenize;
use serde::{Deserialize, Serialize};

/// Line-comment marker for the target grammar
const COMMENT_MARKER: char = '#';

/// Line, character, comment and token statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceFeatures {
    pub line_count: u32,
    /// Unicode scalar values, not bytes
    pub char_count: u32,
    pub comment_line_count: u32,
    pub blank_line_count: u32,
    pub token_count: u32,
    /// `comment_line_count / max(1, line_count)`
    pub comment_ratio: f64,
}

impl SurfaceFeatures {
    pub fn named_values(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("line_count", self.line_count as f64),
            ("char_count", self.char_count as f64),
            ("comment_line_count", self.comment_line_count as f64),
            ("blank_line_count", self.blank_line_count as f64),
            ("token_count", self.token_count as f64),
            ("comment_ratio", self.comment_ratio),
        ]
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Compute surface features for `text`
pub fn extract(text: &str) -> SurfaceFeatures {
    let mut line_count = 0usize;
    let mut comment_line_count = 0usize;
    let mut blank_line_count = 0usize;

    for line in text.lines() {
        line_count += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            blank_line_count += 1;
        } else if trimmed.starts_with(COMMENT_MARKER) {
            comment_line_count += 1;
        }
    }

    SurfaceFeatures {
        line_count: saturating_u32(line_count),
        char_count: saturating_u32(text.chars().count()),
        comment_line_count: saturating_u32(comment_line_count),
        blank_line_count: saturating_u32(blank_line_count),
        token_count: saturating_u32(tokenize(text).len()),
        comment_ratio: comment_line_count as f64 / line_count.max(1) as f64,
    }
}
