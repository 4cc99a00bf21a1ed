//! The plot engine: fixed-capacity pools of datasets, axes, figures
//! and groups, plus the overlay state they share.

use tracing::error;

use crate::axis::Axis;
use crate::backend::Viewport;
use crate::config::PlotOptions;
use crate::dataset::store::Cursor;
use crate::dataset::{Dataset, RangeCache};
use crate::draw::sketch::SketchPool;
use crate::draw::DrawState;
use crate::figure::Figure;

pub const DATASET_MAX: usize = 10;
pub const AXIS_MAX: usize = 9;
pub const FIGURE_MAX: usize = 8;
pub const GROUP_MAX: usize = 40;
pub const DATA_BOX_MAX: usize = 10;

/// User-defined column group: a label plus default-transform hints
/// consumed by the scripting frontend.
#[derive(Clone, Debug, Default)]
pub struct Group {
    pub(crate) label: String,
    pub(crate) op_time_unwrap: bool,
    pub(crate) op_scale: bool,
    pub(crate) scale: f64,
    pub(crate) offset: f64,
}

impl Group {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn time_unwrap_hint(&self) -> bool {
        self.op_time_unwrap
    }

    pub fn scale_hint(&self) -> Option<(f64, f64)> {
        self.op_scale.then_some((self.scale, self.offset))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DataBoxKind {
    #[default]
    Free,
    Slice,
    Polyfit,
}

/// Floating text box showing slice values or fit results.
pub struct DataBox {
    pub(crate) kind: DataBoxKind,
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) size_x: i32,
    pub(crate) size_n: usize,
    pub(crate) text: Vec<String>,
}

impl Default for DataBox {
    fn default() -> Self {
        Self {
            kind: DataBoxKind::Free,
            x: 0,
            y: 0,
            size_x: 0,
            size_n: 0,
            text: vec![String::new(); DATA_BOX_MAX],
        }
    }
}

/// Pixel metrics derived from the current font.
#[derive(Clone, Copy, Debug)]
pub struct FontLayout {
    pub(crate) long: i32,
    pub(crate) height: i32,
    pub(crate) axis_box: i32,
    pub(crate) label_box: i32,
    pub(crate) mark: i32,
}

impl Default for FontLayout {
    fn default() -> Self {
        Self {
            long: 11,
            height: 14,
            axis_box: 19,
            label_box: 14,
            mark: 3,
        }
    }
}

/// The engine. All cross-references between its parts are small
/// integer indices into the fixed pools below.
pub struct Plot {
    pub(crate) opt: PlotOptions,

    pub(crate) data: Vec<Dataset>,
    pub(crate) rcache: RangeCache,
    pub(crate) axis: Vec<Axis>,
    pub(crate) figure: Vec<Figure>,
    pub(crate) group: Vec<Group>,

    pub(crate) draw: Vec<DrawState>,
    pub(crate) sketch: SketchPool,
    pub(crate) draw_in_progress: bool,

    pub(crate) on_x: Option<usize>,
    pub(crate) on_y: Option<usize>,

    pub(crate) hover_figure: Option<usize>,
    pub(crate) hover_axis: Option<usize>,
    pub(crate) hover_legend: bool,
    pub(crate) hover_data_box: bool,
    pub(crate) shift_on: bool,

    pub(crate) screen: Viewport,
    pub(crate) viewport: Viewport,
    pub(crate) font: FontLayout,

    pub(crate) legend_x: i32,
    pub(crate) legend_y: i32,
    pub(crate) legend_size_x: i32,
    pub(crate) legend_n: usize,

    pub(crate) data_box: DataBox,

    pub(crate) slice_on: bool,
    pub(crate) slice_range_on: u8,
    pub(crate) slice_axis: Option<usize>,

    pub(crate) mark_on: bool,
    pub(crate) mark_n: usize,
}

impl Default for Plot {
    fn default() -> Self {
        Self::new(PlotOptions::default())
    }
}

impl Plot {
    pub fn new(opt: PlotOptions) -> Self {
        Self {
            opt,
            data: (0..DATASET_MAX).map(|_| Dataset::default()).collect(),
            rcache: RangeCache::default(),
            axis: (0..AXIS_MAX).map(|_| Axis::default()).collect(),
            figure: (0..FIGURE_MAX).map(|_| Figure::default()).collect(),
            group: (0..GROUP_MAX).map(|_| Group::default()).collect(),
            draw: (0..FIGURE_MAX).map(|_| DrawState::default()).collect(),
            sketch: SketchPool::default(),
            draw_in_progress: false,
            on_x: None,
            on_y: None,
            hover_figure: None,
            hover_axis: None,
            hover_legend: false,
            hover_data_box: false,
            shift_on: false,
            screen: Viewport::default(),
            viewport: Viewport::default(),
            font: FontLayout::default(),
            legend_x: 0,
            legend_y: 0,
            legend_size_x: 0,
            legend_n: 0,
            data_box: DataBox::default(),
            slice_on: false,
            slice_range_on: 0,
            slice_axis: None,
            mark_on: false,
            mark_n: 0,
        }
    }

    pub fn options(&self) -> &PlotOptions {
        &self.opt
    }

    pub fn options_mut(&mut self) -> &mut PlotOptions {
        &mut self.opt
    }

    /// Screen rectangle the engine may use; the layout pass carves
    /// the drawing viewport out of it.
    pub fn set_screen(&mut self, screen: Viewport) {
        self.screen = screen;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn dataset(&self, d: usize) -> Option<&Dataset> {
        self.data.get(d).filter(|data| data.is_allocated())
    }

    pub fn axis_ref(&self, a: usize) -> Option<&Axis> {
        self.axis.get(a)
    }

    pub fn figure_ref(&self, f_n: usize) -> Option<&Figure> {
        self.figure.get(f_n)
    }

    pub fn focused_axes(&self) -> (Option<usize>, Option<usize>) {
        (self.on_x, self.on_y)
    }

    /// A progressive frame is still being accumulated; the input
    /// layer keeps requesting frames until this clears.
    pub fn draw_pending(&self) -> bool {
        self.draw_in_progress
    }

    pub fn data_box_kind(&self) -> DataBoxKind {
        self.data_box.kind
    }

    pub fn data_box_text(&self, n: usize) -> &str {
        self.data_box.text.get(n).map(String::as_str).unwrap_or("")
    }

    pub fn slice_enable(&mut self, on: bool) {
        self.slice_on = on;
    }

    /// Shift modifier state, used to widen hover highlighting.
    pub fn set_shift(&mut self, on: bool) {
        self.shift_on = on;
    }

    /// Drag target for the legend box; clamped during layout.
    pub fn legend_move(&mut self, x: i32, y: i32) {
        self.legend_x = x;
        self.legend_y = y;
    }

    /// Drag target for the data box; clamped during layout.
    pub fn data_box_move(&mut self, x: i32, y: i32) {
        self.data_box.x = x;
        self.data_box.y = y;
    }

    pub fn mark_enable(&mut self, on: bool) {
        self.mark_on = on;
        if !on {
            self.mark_n = 0;
        }
    }

    /// Create a dataset of `column_n` stored columns and a ring of
    /// `length_n` rows, or reset an existing one with the same width.
    pub fn data_alloc(&mut self, d: usize, column_n: usize, length_n: usize) {
        if d >= DATASET_MAX {
            error!("dataset number {d} is out of range");
            return;
        }

        if column_n < 1 {
            error!("number of columns is too few");
            return;
        }

        if length_n < 1 {
            error!("length of dataset is too short");
            return;
        }

        if self.data[d].is_allocated() {
            self.rcache.clean(d);
        }

        let compress = self.opt.compress;
        if self.data[d].alloc(column_n, length_n, compress) {
            self.draw_in_progress = false;
        }
    }

    /// Change the ring capacity. Shrinking discards the content.
    pub fn data_resize(&mut self, d: usize, length_n: usize) {
        if d >= DATASET_MAX {
            error!("dataset number {d} is out of range");
            return;
        }

        if length_n < 1 {
            error!("length of dataset is too short");
            return;
        }

        if self.data[d].is_allocated() {
            self.data[d].resize(length_n);
            self.rcache.clean(d);
            self.draw_in_progress = false;
        }
    }

    /// Grow the ring by one chunk worth of rows.
    pub fn data_grow_up(&mut self, d: usize) {
        if d >= DATASET_MAX {
            error!("dataset number {d} is out of range");
            return;
        }

        if self.data[d].is_allocated() {
            self.data[d].grow_up();
            self.rcache.clean(d);
            self.draw_in_progress = false;
        }
    }

    pub fn data_space_left(&self, d: usize) -> usize {
        if d >= DATASET_MAX {
            error!("dataset number {d} is out of range");
            return 0;
        }

        self.data[d].space_left()
    }

    pub fn data_memory_usage(&self, d: usize) -> u64 {
        if d >= DATASET_MAX {
            error!("dataset number {d} is out of range");
            return 0;
        }

        self.data[d].memory_usage()
    }

    pub fn data_memory_uncompressed(&self, d: usize) -> u64 {
        if d >= DATASET_MAX {
            error!("dataset number {d} is out of range");
            return 0;
        }

        self.data[d].memory_uncompressed()
    }

    /// Release a dataset entirely.
    pub fn data_clean(&mut self, d: usize) {
        if d >= DATASET_MAX {
            error!("dataset number {d} is out of range");
            return;
        }

        self.data[d].clean();
        self.rcache.clean(d);
        self.draw_in_progress = false;
    }

    /// Append one row of `column_n` values. Derived columns are
    /// extended by the next `data_subtract(d, -1)` call.
    pub fn data_insert(&mut self, d: usize, row: &[f64]) {
        if d >= DATASET_MAX {
            error!("dataset number {d} is out of range");
            return;
        }

        if !self.data[d].is_allocated() {
            return;
        }

        let tail = self.data[d].tail_n();
        let k = self.data[d].chunk_of(tail);
        self.rcache.wipe_once(d, k);

        if self.data[d].insert_row(row) && self.draw_in_progress {
            self.draw_in_progress = false;
        }
    }

    /// Write access to the row under the cursor; invalidates the
    /// range cache for the chunk once per streak.
    pub(crate) fn write_row(&mut self, d: usize, cur: &mut Cursor) -> Option<&mut [f64]> {
        if !self.data[d].at_tail(cur) {
            let k = self.data[d].chunk_of(cur.r);
            self.rcache.wipe_once(d, k);
        }

        self.data[d].write(cur)
    }

    pub fn group_ref(&self, g: usize) -> Option<&Group> {
        self.group.get(g)
    }

    /// Assign column `c` of dataset `d` to group `g`.
    pub fn group_add(&mut self, d: usize, g: usize, c: i32) {
        if d >= DATASET_MAX {
            error!("dataset number {d} is out of range");
            return;
        }

        if g >= GROUP_MAX {
            error!("group number {g} is out of range");
            return;
        }

        let column_top = (self.data[d].column_n() + crate::dataset::SUBTRACT_MAX) as i32;

        if !(-1..column_top).contains(&c) {
            error!("column number {c} is out of range");
            return;
        }

        self.data[d].map_set(c, g as i32);
    }

    pub fn group_label(&mut self, g: usize, label: &str) {
        if g >= GROUP_MAX {
            error!("group number {g} is out of range");
            return;
        }

        if !label.is_empty() {
            self.group[g].label = label.to_owned();
        }
    }

    pub fn group_time_unwrap(&mut self, g: usize, unwrap: bool) {
        if g >= GROUP_MAX {
            error!("group number {g} is out of range");
            return;
        }

        self.group[g].op_time_unwrap = unwrap;
    }

    pub fn group_scale(&mut self, g: usize, scale: f64, offset: f64) {
        if g >= GROUP_MAX {
            error!("group number {g} is out of range");
            return;
        }

        self.group[g].op_scale = true;
        self.group[g].scale = scale;
        self.group[g].offset = offset;
    }

    /// One data-box cell: fixed point while the exponent stays within
    /// the configured precision, scientific otherwise.
    pub(crate) fn format_cell(&self, val: f64) -> String {
        let mut fexp = 1;

        if val != 0.0 && val.is_finite() {
            fexp += val.abs().log10().floor() as i32;
        }

        if fexp >= -2 && fexp < self.opt.precision as i32 {
            let fexp = fexp.max(1);
            let prec = (self.opt.precision as i32 - fexp) as usize;

            if val < 0.0 {
                format!("{val:.prec$} ")
            } else {
                format!(" {val:.prec$} ")
            }
        } else {
            let prec = self.opt.precision.saturating_sub(1);

            if val < 0.0 {
                format!("{val:.prec$E} ")
            } else {
                format!(" {val:.prec$E} ")
            }
        }
    }
}
