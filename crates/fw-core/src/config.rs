//! Editor configuration: gesture thresholds, hit-test sizes and line colors.

use kurbo::Size;
use serde::{Deserialize, Serialize};

// ─── Line colors ─────────────────────────────────────────────────────────

/// Colors a line can resolve to. See [`crate::lines::LinesManager::line_color`]
/// for the precedence between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineColors {
    pub default: String,
    pub drawing: String,
    pub hovered: String,
    pub selected: String,
    pub error: String,
    pub flowing: String,
    pub hidden: String,
}

impl Default for LineColors {
    fn default() -> Self {
        Self {
            default: "#4d53e8".into(),
            drawing: "#5dd6e3".into(),
            hovered: "#37d0ff".into(),
            selected: "#37d0ff".into(),
            error: "#ff0000".into(),
            flowing: "#ff9f1a".into(),
            hidden: "transparent".into(),
        }
    }
}

// ─── Config ───────────────────────────────────────────────────────────────

/// Configuration shared by the document, the lines manager and the drag
/// service. Every field has a default, so a partial JSON object is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// A gesture counts as a drag once it lasts longer than this. Default: **100 ms**.
    pub drag_timeout_ms: f64,
    /// A gesture counts as a drag once either axis moves further than this. Default: **5 px**.
    pub drag_min_delta: f64,
    /// Side of the square hit box centred on a port point. Default: **24**.
    pub port_hit_size: f64,
    /// Screen-space padding around node bounds for node hit-testing. Default: **4 px**.
    pub node_hover_padding: f64,
    /// Max distance from a line path that still counts as hovering it. Default: **8 px**.
    pub line_hover_distance: f64,
    /// Two positions closer than this on both axes overlap. Default: **5**.
    pub overlap_tolerance: f64,
    /// Diagonal shift applied to a new node that overlaps a sibling. Default: **30**.
    pub overlap_step: f64,
    /// Size of nodes whose registry declares none. Default: **360×80**.
    pub default_node_size: Size,
    /// Size of the rectangle collision-tested during a palette card drag.
    pub card_drag_size: Size,
    /// Minimum local `y` of a node dropped into a container. Default: **40**.
    pub container_padding_top: f64,
    pub line_colors: LineColors,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            drag_timeout_ms: 100.0,
            drag_min_delta: 5.0,
            port_hit_size: 24.0,
            node_hover_padding: 4.0,
            line_hover_distance: 8.0,
            overlap_tolerance: 5.0,
            overlap_step: 30.0,
            default_node_size: Size::new(360.0, 80.0),
            card_drag_size: Size::new(200.0, 60.0),
            container_padding_top: 40.0,
            line_colors: LineColors::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            EditorConfig::from_json(r#"{ "drag_min_delta": 8, "line_colors": { "error": "red" } }"#)
                .unwrap();
        assert_eq!(config.drag_min_delta, 8.0);
        assert_eq!(config.drag_timeout_ms, 100.0);
        assert_eq!(config.line_colors.error, "red");
        assert_eq!(config.line_colors.default, LineColors::default().default);
    }
}
