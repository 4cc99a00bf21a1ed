//! scopechart crate: plotting engine for streaming numerical data

pub mod axis;
pub mod backend;
pub mod config;
pub mod dataset;
pub mod draw;
pub mod figure;
pub mod plot;

pub use axis::{Axis, AxisRole, SlaveAction};
pub use backend::{palette, Clock, LeastSquares, Rasterizer, TextLayout, TextMetrics, Viewport};
pub use config::{DefaultOptions, LayoutOptions, PlotOptions};
pub use dataset::{BinaryOp, Cursor, Dataset, Subtract};
pub use figure::{Drawing, Figure, FilterKind};
pub use plot::{DataBoxKind, Group, Plot};
