//! Render settings, loadable from TOML.

use serde::Deserialize;
use std::path::Path;

use super::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Only emit mainline moves tagged MissedWin, Mistake, Inaccuracy or Blunder.
    pub wrong_moves_only: bool,
    /// Moves that always get a diagram, e.g. `"2w 3b 10w"`.
    pub diagram_moves: String,
    /// Font-size increase applied to the game header.
    pub header_font_delta: i8,
    /// Extension used for suggested diagram image names.
    pub diagram_extension: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            wrong_moves_only: true,
            diagram_moves: String::new(),
            header_font_delta: 2,
            diagram_extension: "svg".to_string(),
        }
    }
}

impl RenderConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.diagram_halfmoves()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&raw)
    }

    /// 0-based halfmove indices named by [`RenderConfig::diagram_moves`].
    pub fn diagram_halfmoves(&self) -> Result<Vec<usize>> {
        self.diagram_moves
            .split_whitespace()
            .map(parse_anchor)
            .collect()
    }
}

/// `"3w"` → halfmove 4, `"3b"` → halfmove 5.
pub fn parse_anchor(token: &str) -> Result<usize> {
    let invalid = || Error::InvalidAnchor(token.to_string());

    let (number, side) = token
        .split_at_checked(token.len().saturating_sub(1))
        .ok_or_else(invalid)?;
    let number: usize = number.parse().map_err(|_| invalid())?;
    let white_halfmove = number
        .checked_sub(1)
        .and_then(|n| n.checked_mul(2))
        .ok_or_else(invalid)?;

    match side {
        "w" | "W" => Ok(white_halfmove),
        "b" | "B" => Ok(white_halfmove + 1),
        _ => Err(invalid()),
    }
}
