use serde::{Deserialize, Serialize};

use crate::figure::Drawing;

/// Fixed pixel metrics of the chrome around the viewport.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutOptions {
    pub border: i32,
    pub tick_tooth: i32,
    pub grid_dash: i32,
    pub grid_space: i32,
    pub drawing_dash: i32,
    pub drawing_space: i32,
    pub fence_dash: i32,
    pub fence_space: i32,
    pub fence_point: i32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            border: 5,
            tick_tooth: 5,
            grid_dash: 2,
            grid_space: 8,
            drawing_dash: 8,
            drawing_space: 12,
            fence_dash: 10,
            fence_space: 10,
            fence_point: 10,
        }
    }
}

/// Style applied to newly added figures.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefaultOptions {
    pub drawing: Drawing,
    pub width: i32,
}

impl Default for DefaultOptions {
    fn default() -> Self {
        Self {
            drawing: Drawing::Line,
            width: 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlotOptions {
    pub layout: LayoutOptions,
    pub defaults: DefaultOptions,
    /// Draw legend and data box without an opaque backing rectangle.
    pub transparency_mode: bool,
    /// Significant digits in data-box cells.
    pub precision: usize,
    /// Keep cold chunks LZ4-compressed, decompressing through a small
    /// floating cache.
    pub compress: bool,
    /// Soft deadline of one progressive draw frame.
    pub frame_ms: u64,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            layout: LayoutOptions::default(),
            defaults: DefaultOptions::default(),
            transparency_mode: true,
            precision: 9,
            compress: false,
            frame_ms: 20,
        }
    }
}
