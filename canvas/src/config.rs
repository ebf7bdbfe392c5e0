//! Editor layout configuration.
//!
//! `EditorConfig::default()` carries the stock layout. `from_env` overrides
//! individual values from `GRAPHBOARD_*` variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use crate::doc::VertexMetrics;
use crate::error::ConfigError;
use crate::geom::Size;
use crate::visibility::ViewMode;

pub const DEFAULT_VERTEX_WIDTH: f64 = 160.0;
pub const DEFAULT_HEADER_HEIGHT: f64 = 20.0;
pub const DEFAULT_ROW_HEIGHT: f64 = 18.0;
pub const DEFAULT_BOUNDARY_MIN_WIDTH: f64 = 200.0;
pub const DEFAULT_CANVAS_MIN_WIDTH: f64 = 1900.0;
pub const DEFAULT_CANVAS_MIN_HEIGHT: f64 = 959.0;
pub const DEFAULT_CANVAS_PADDING: f64 = 200.0;
pub const DEFAULT_COPY_OFFSET: f64 = 5.0;
pub const DEFAULT_MIN_OFFSET: f64 = 0.0;
pub const DEFAULT_REPEAT_MAX: u32 = 9999;

#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    pub vertex_width: f64,
    pub header_height: f64,
    pub row_height: f64,
    /// Narrowest a boundary may be; also the width of a new boundary.
    pub boundary_min_width: f64,
    pub canvas_min_width: f64,
    pub canvas_min_height: f64,
    /// Slack added past the furthest top-level object.
    pub canvas_padding: f64,
    /// Offset of a copied vertex from its original.
    pub copy_offset: f64,
    /// Smallest x/y a dragged object may reach.
    pub min_offset: f64,
    pub repeat_max: u32,
    pub initial_view: ViewMode,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            vertex_width: DEFAULT_VERTEX_WIDTH,
            header_height: DEFAULT_HEADER_HEIGHT,
            row_height: DEFAULT_ROW_HEIGHT,
            boundary_min_width: DEFAULT_BOUNDARY_MIN_WIDTH,
            canvas_min_width: DEFAULT_CANVAS_MIN_WIDTH,
            canvas_min_height: DEFAULT_CANVAS_MIN_HEIGHT,
            canvas_padding: DEFAULT_CANVAS_PADDING,
            copy_offset: DEFAULT_COPY_OFFSET,
            min_offset: DEFAULT_MIN_OFFSET,
            repeat_max: DEFAULT_REPEAT_MAX,
            initial_view: ViewMode::Full,
        }
    }
}

impl EditorConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `GRAPHBOARD_VERTEX_WIDTH`, `GRAPHBOARD_HEADER_HEIGHT`, `GRAPHBOARD_ROW_HEIGHT`
    /// - `GRAPHBOARD_BOUNDARY_MIN_WIDTH`
    /// - `GRAPHBOARD_CANVAS_MIN_WIDTH`, `GRAPHBOARD_CANVAS_MIN_HEIGHT`, `GRAPHBOARD_CANVAS_PADDING`
    /// - `GRAPHBOARD_COPY_OFFSET`, `GRAPHBOARD_MIN_OFFSET`
    /// - `GRAPHBOARD_REPEAT_MAX`: default 9999, must be at least 1
    /// - `GRAPHBOARD_VIEW`: `full` (default) or `reduced`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unknown view name or a zero repeat bound.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(value) => Some(value),
            Err(_) => None,
        })
    }

    /// Same as `from_env`, reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unknown view name or a zero repeat bound.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let float = |key: &str, default: f64| parse_f64(lookup(key).as_deref(), default);
        let repeat_max = parse_u32(lookup("GRAPHBOARD_REPEAT_MAX").as_deref(), DEFAULT_REPEAT_MAX);
        if repeat_max == 0 {
            return Err(ConfigError::RepeatRange(repeat_max));
        }
        let initial_view = parse_view(lookup("GRAPHBOARD_VIEW").as_deref())?;

        Ok(Self {
            vertex_width: float("GRAPHBOARD_VERTEX_WIDTH", DEFAULT_VERTEX_WIDTH),
            header_height: float("GRAPHBOARD_HEADER_HEIGHT", DEFAULT_HEADER_HEIGHT),
            row_height: float("GRAPHBOARD_ROW_HEIGHT", DEFAULT_ROW_HEIGHT),
            boundary_min_width: float("GRAPHBOARD_BOUNDARY_MIN_WIDTH", DEFAULT_BOUNDARY_MIN_WIDTH),
            canvas_min_width: float("GRAPHBOARD_CANVAS_MIN_WIDTH", DEFAULT_CANVAS_MIN_WIDTH),
            canvas_min_height: float("GRAPHBOARD_CANVAS_MIN_HEIGHT", DEFAULT_CANVAS_MIN_HEIGHT),
            canvas_padding: float("GRAPHBOARD_CANVAS_PADDING", DEFAULT_CANVAS_PADDING),
            copy_offset: float("GRAPHBOARD_COPY_OFFSET", DEFAULT_COPY_OFFSET),
            min_offset: float("GRAPHBOARD_MIN_OFFSET", DEFAULT_MIN_OFFSET),
            repeat_max,
            initial_view,
        })
    }

    #[must_use]
    pub fn metrics(&self) -> VertexMetrics {
        VertexMetrics { width: self.vertex_width, header_height: self.header_height, row_height: self.row_height }
    }

    /// Fixed floor of the canvas size, before padding.
    #[must_use]
    pub fn canvas_floor(&self) -> Size {
        Size::new(self.canvas_min_width, self.canvas_min_height)
    }

    /// Clamp a repeat count into `1..=repeat_max`.
    #[must_use]
    pub fn clamp_repeat(&self, repeat: u32) -> u32 {
        repeat.clamp(1, self.repeat_max)
    }
}

fn parse_f64(raw: Option<&str>, default: f64) -> f64 {
    match raw.map(|v| v.trim().parse::<f64>()) {
        Some(Ok(value)) if value.is_finite() && value >= 0.0 => value,
        _ => default,
    }
}

fn parse_u32(raw: Option<&str>, default: u32) -> u32 {
    match raw.map(|v| v.trim().parse::<u32>()) {
        Some(Ok(value)) => value,
        _ => default,
    }
}

fn parse_view(raw: Option<&str>) -> Result<ViewMode, ConfigError> {
    match raw.unwrap_or("full") {
        "full" => Ok(ViewMode::Full),
        "reduced" => Ok(ViewMode::Reduced),
        other => Err(ConfigError::UnknownView(other.to_string())),
    }
}
