//! Figure slots and the operations that create derived-column
//! figures, retire abandoned axes, and sweep unreferenced slots.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::axis::AxisRole;
use crate::backend::LeastSquares;
use crate::dataset::{BinaryOp, Subtract, POLYFIT_MAX, SUBTRACT_MAX};
use crate::draw::sketch::SketchPhase;
use crate::plot::{DataBoxKind, Plot, AXIS_MAX, DATASET_MAX, DATA_BOX_MAX, FIGURE_MAX};

/// Sample markers kept per figure.
pub const MARK_MAX: usize = 64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Drawing {
    #[default]
    Line,
    Dash,
    Dot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    Diff,
    Cum,
    Bitmask,
    LowPass,
}

/// One figure: an `(X, Y)` column pair of a dataset bound to an X and
/// a Y axis with a drawing style.
#[derive(Clone, Debug)]
pub struct Figure {
    pub(crate) busy: bool,
    pub(crate) hidden: bool,
    pub(crate) drawing: Drawing,
    pub(crate) width: i32,
    pub(crate) data_n: usize,
    pub(crate) column_x: i32,
    pub(crate) column_y: i32,
    pub(crate) axis_x: usize,
    pub(crate) axis_y: usize,
    pub(crate) label: String,
    pub(crate) slice_busy: bool,
    pub(crate) slice_x: f64,
    pub(crate) slice_y: f64,
    pub(crate) slice_base_x: f64,
    pub(crate) slice_base_y: f64,
    pub(crate) mark_x: [f64; MARK_MAX],
    pub(crate) mark_y: [f64; MARK_MAX],
}

impl Default for Figure {
    fn default() -> Self {
        Self {
            busy: false,
            hidden: false,
            drawing: Drawing::Line,
            width: 1,
            data_n: 0,
            column_x: -1,
            column_y: -1,
            axis_x: 0,
            axis_y: 0,
            label: String::new(),
            slice_busy: false,
            slice_x: 0.0,
            slice_y: 0.0,
            slice_base_x: 0.0,
            slice_base_y: 0.0,
            mark_x: [0.0; MARK_MAX],
            mark_y: [0.0; MARK_MAX],
        }
    }
}

impl Figure {
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn binding(&self) -> (usize, i32, i32, usize, usize) {
        (self.data_n, self.column_x, self.column_y, self.axis_x, self.axis_y)
    }

    /// Sample the slice tracker last landed on, if any.
    pub fn slice_point(&self) -> Option<(f64, f64)> {
        self.slice_busy.then_some((self.slice_x, self.slice_y))
    }
}

impl Plot {
    pub fn get_free_figure(&self) -> Option<usize> {
        self.figure.iter().position(|f| !f.busy)
    }

    pub(crate) fn get_free_axis(&self) -> Option<usize> {
        self.axis.iter().position(|a| a.role == AxisRole::Free)
    }

    /// Bind a figure slot to `(d, c_x, c_y)` on axes `(a_x, a_y)`.
    /// Free axes take the role they are bound with.
    pub fn figure_add(
        &mut self,
        f_n: usize,
        d: usize,
        c_x: i32,
        c_y: i32,
        a_x: usize,
        a_y: usize,
        label: &str,
    ) {
        if f_n >= FIGURE_MAX {
            error!("figure number {f_n} is out of range");
            return;
        }

        if d >= DATASET_MAX {
            error!("dataset number {d} is out of range");
            return;
        }

        if !self.data[d].is_allocated() {
            error!("dataset {d} has no data");
            return;
        }

        let column_top = (self.data[d].column_n() + SUBTRACT_MAX) as i32;

        if !(-1..column_top).contains(&c_x) {
            error!("X column number {c_x} is out of range");
            return;
        }

        if !(-1..column_top).contains(&c_y) {
            error!("Y column number {c_y} is out of range");
            return;
        }

        if a_x >= AXIS_MAX {
            error!("X axis number {a_x} is out of range");
            return;
        }

        if a_y >= AXIS_MAX {
            error!("Y axis number {a_y} is out of range");
            return;
        }

        if a_x == a_y
            || self.axis[a_x].role == AxisRole::Y
            || self.axis[a_y].role == AxisRole::X
        {
            error!("invalid axes mapping {a_x} {a_y}");
            return;
        }

        self.draw[f_n].sketch = SketchPhase::Finished;

        let fig = &mut self.figure[f_n];
        fig.busy = true;
        fig.hidden = false;
        fig.drawing = self.opt.defaults.drawing;
        fig.width = self.opt.defaults.width;
        fig.data_n = d;
        fig.column_x = c_x;
        fig.column_y = c_y;
        fig.axis_x = a_x;
        fig.axis_y = a_y;
        fig.label = label.to_owned();

        if self.axis[a_x].role == AxisRole::Free {
            self.axis[a_x].role = AxisRole::X;
            self.axis[a_x].lock_scale = true;
        }

        if self.axis[a_y].role == AxisRole::Free {
            self.axis[a_y].role = AxisRole::Y;
            self.axis[a_y].lock_scale = true;
        }

        let g_n = self.data[d].map_get(c_x);
        if g_n != -1 {
            let label = self.group[g_n as usize].label.clone();
            self.axis_label(a_x, &label);
        }

        let g_n = self.data[d].map_get(c_y);
        if g_n != -1 {
            let label = self.group[g_n as usize].label.clone();
            self.axis_label(a_y, &label);
        }

        if self.on_x.is_none() {
            self.on_x = Some(a_x);
        }

        if self.on_y.is_none() {
            self.on_y = Some(a_y);
        }
    }

    /// Is column `c` of dataset `d` read by any live derived slot or
    /// plotted by any figure?
    fn check_column_linked(&self, d: usize, c: i32) -> bool {
        if self.data[d].sub.iter().any(|s| s.reads(c)) {
            return true;
        }

        self.figure
            .iter()
            .any(|f| f.busy && f.data_n == d && (f.column_x == c || f.column_y == c))
    }

    /// Fixpoint sweep freeing derived slots whose owned column nothing
    /// references; releases range-cache entries when anything was
    /// freed.
    pub(crate) fn subtract_garbage(&mut self, d: usize) {
        let mut freed_total = 0;

        loop {
            let mut freed = 0;

            for s_n in 0..SUBTRACT_MAX {
                if self.data[d].sub[s_n].is_free() {
                    continue;
                }

                let c_n = (s_n + self.data[d].column_n()) as i32;

                if !self.check_column_linked(d, c_n) {
                    self.data[d].sub[s_n] = Subtract::Free;
                    freed += 1;
                }
            }

            freed_total += freed;

            if freed == 0 {
                break;
            }
        }

        if freed_total != 0 {
            self.rcache_subtract_clean();
        }
    }

    /// Unbind a figure, retiring axes no other figure references and
    /// sweeping derived slots.
    pub fn figure_remove(&mut self, f_n: usize) {
        if f_n >= FIGURE_MAX {
            error!("figure number {f_n} is out of range");
            return;
        }

        let mut retire_x = true;
        let mut retire_y = true;

        for n in 0..FIGURE_MAX {
            if self.figure[n].busy && n != f_n {
                if self.figure[n].axis_x == self.figure[f_n].axis_x {
                    retire_x = false;
                }

                if self.figure[n].axis_y == self.figure[f_n].axis_y {
                    retire_y = false;
                }
            }
        }

        self.figure[f_n].busy = false;

        if retire_x {
            let a_n = self.figure[f_n].axis_x;

            if self.on_x == Some(a_n) {
                self.on_x = (0..AXIS_MAX).find(|&n| {
                    n != a_n && self.axis[n].role == AxisRole::X && self.axis[n].slave.is_none()
                });
            }

            if self.on_x != Some(a_n) {
                self.axis_remove(a_n);
            }
        }

        if retire_y {
            let a_n = self.figure[f_n].axis_y;

            if self.on_y == Some(a_n) {
                self.on_y = (0..AXIS_MAX).find(|&n| {
                    n != a_n && self.axis[n].role == AxisRole::Y && self.axis[n].slave.is_none()
                });
            }

            if self.on_y != Some(a_n) {
                self.axis_remove(a_n);
            }
        }

        self.subtract_garbage(self.figure[f_n].data_n);
    }

    /// Remove every figure plotting dataset `d`.
    pub fn figure_garbage(&mut self, d: usize) {
        for f_n in 0..FIGURE_MAX {
            if self.figure[f_n].busy && self.figure[f_n].data_n == d {
                self.figure_remove(f_n);
            }
        }
    }

    /// Rebind a figure to the focused axes, retiring the abandoned
    /// ones.
    pub fn figure_move_axes(&mut self, f_n: usize) {
        if f_n >= FIGURE_MAX {
            error!("figure number {f_n} is out of range");
            return;
        }

        let (Some(on_x), Some(on_y)) = (self.on_x, self.on_y) else {
            return;
        };

        let mut retire_x = true;
        let mut retire_y = true;

        for n in 0..FIGURE_MAX {
            if self.figure[n].busy && n != f_n {
                if self.figure[n].axis_x == self.figure[f_n].axis_x {
                    retire_x = false;
                }

                if self.figure[n].axis_y == self.figure[f_n].axis_y {
                    retire_y = false;
                }
            }
        }

        if self.figure[f_n].axis_x != on_x {
            let a_n = self.figure[f_n].axis_x;
            self.figure[f_n].axis_x = on_x;

            if retire_x {
                self.axis_remove(a_n);
            }
        }

        if self.figure[f_n].axis_y != on_y {
            let a_n = self.figure[f_n].axis_y;
            self.figure[f_n].axis_y = on_y;

            if retire_y {
                self.axis_remove(a_n);
            }
        }
    }

    /// Give a figure private axes when it currently shares them.
    pub fn figure_make_individual_axes(&mut self, f_n: usize) {
        if f_n >= FIGURE_MAX {
            error!("figure number {f_n} is out of range");
            return;
        }

        let mut shared_x = false;
        let mut shared_y = false;

        for n in 0..FIGURE_MAX {
            if self.figure[n].busy && n != f_n {
                if self.figure[n].axis_x == self.figure[f_n].axis_x {
                    shared_x = true;
                }

                if self.figure[n].axis_y == self.figure[f_n].axis_y {
                    shared_y = true;
                }
            }
        }

        if shared_x {
            let Some(a_n) = self.get_free_axis() else {
                error!("unable to get free axis on X");
                return;
            };

            let old = self.figure[f_n].axis_x;

            self.axis[a_n].role = AxisRole::X;
            self.figure[f_n].axis_x = a_n;

            self.axis_scale_auto(a_n);

            let label = self.axis[old].label.clone();
            self.axis_label(a_n, &label);
        }

        if shared_y {
            let Some(a_n) = self.get_free_axis() else {
                error!("unable to get free axis on Y");
                return;
            };

            let old = self.figure[f_n].axis_y;

            self.axis[a_n].role = AxisRole::Y;
            self.figure[f_n].axis_y = a_n;

            self.axis_scale_auto(a_n);

            let label = self.axis[old].label.clone();
            self.axis_label(a_n, &label);
        }
    }

    /// Swap two figure slots in paint order.
    pub fn figure_exchange(&mut self, f_n: usize, f_1: usize) {
        if f_n >= FIGURE_MAX {
            error!("figure number {f_n} is out of range");
            return;
        }

        if f_1 >= FIGURE_MAX {
            error!("figure number {f_1} (exchange) is out of range");
            return;
        }

        self.figure.swap(f_n, f_1);
    }

    pub fn figure_set_hidden(&mut self, f_n: usize, hidden: bool) {
        if f_n >= FIGURE_MAX {
            error!("figure number {f_n} is out of range");
            return;
        }

        self.figure[f_n].hidden = hidden;
    }

    pub fn figure_set_drawing(&mut self, f_n: usize, drawing: Drawing) {
        if f_n >= FIGURE_MAX {
            error!("figure number {f_n} is out of range");
            return;
        }

        self.figure[f_n].drawing = drawing;
    }

    pub fn figure_set_width(&mut self, f_n: usize, width: i32) {
        if f_n >= FIGURE_MAX {
            error!("figure number {f_n} is out of range");
            return;
        }

        self.figure[f_n].width = width;
    }

    /// Replace the figure's X column with its time-unwrap derivation.
    pub fn figure_subtract_time_unwrap(&mut self, f_1: usize) {
        if f_1 >= FIGURE_MAX {
            error!("figure number {f_1} is out of range");
            return;
        }

        let d = self.figure[f_1].data_n;
        let c = self.figure[f_1].column_x;

        if let Some(c_n) = self.get_subtract_time_unwrap(d, c) {
            self.figure[f_1].column_x = c_n;
        }
    }

    /// Replace one side of the figure with an affine derivation.
    pub fn figure_subtract_scale(&mut self, f_1: usize, role: AxisRole, scale: f64, offset: f64) {
        if f_1 >= FIGURE_MAX {
            error!("figure number {f_1} is out of range");
            return;
        }

        let d = self.figure[f_1].data_n;

        match role {
            AxisRole::X => {
                let c = self.figure[f_1].column_x;

                if let Some(c_n) = self.get_subtract_scale(d, c, scale, offset) {
                    self.figure[f_1].column_x = c_n;
                }
            }
            AxisRole::Y => {
                let c = self.figure[f_1].column_y;

                if let Some(c_n) = self.get_subtract_scale(d, c, scale, offset) {
                    self.figure[f_1].column_y = c_n;
                }
            }
            AxisRole::Free => {}
        }
    }

    /// New figure plotting a filtered derivation of `f_1`'s Y column.
    pub fn figure_subtract_filter(&mut self, f_1: usize, kind: FilterKind, arg_1: f64, arg_2: f64) {
        if f_1 >= FIGURE_MAX {
            error!("figure number {f_1} is out of range");
            return;
        }

        let Some(f_n) = self.get_free_figure() else {
            error!("unable to get free figure to subtract");
            return;
        };

        let d = self.figure[f_1].data_n;

        let Some(s_n) = self.get_free_subtract(d) else {
            error!("unable to get free subtract");
            return;
        };

        let column_1 = self.figure[f_1].column_y;

        self.data[d].sub[s_n] = match kind {
            FilterKind::Diff => Subtract::FilterDiff {
                column_1,
                state: f64::NAN,
            },
            FilterKind::Cum => Subtract::FilterCum {
                column_1,
                state: 0.0,
            },
            FilterKind::Bitmask => Subtract::FilterBitmask {
                column_1,
                lo: arg_1 as i32,
                hi: arg_2 as i32,
            },
            FilterKind::LowPass => Subtract::FilterLowPass {
                column_1,
                gain: arg_1,
                state: f64::NAN,
            },
        };

        self.data_subtract(d, s_n as i32);

        let c_n = (s_n + self.data[d].column_n()) as i32;

        let a_n = if kind == FilterKind::LowPass {
            self.figure[f_1].axis_y
        } else {
            match self.get_free_axis() {
                Some(a_n) => {
                    self.axis[a_n].role = AxisRole::Y;

                    let label = self.axis[self.figure[f_1].axis_y].label.clone();
                    self.axis_label(a_n, &label);
                    a_n
                }
                None => self.figure[f_1].axis_y,
            }
        };

        let c_x = self.figure[f_1].column_x;
        let a_x = self.figure[f_1].axis_x;

        self.figure_add(f_n, d, c_x, c_n, a_x, a_n, "");

        let source = self.figure[f_1].label.clone();

        self.figure[f_n].label = match kind {
            FilterKind::Diff => format!("D: {source:.75}"),
            FilterKind::Cum => format!("C: {source:.75}"),
            FilterKind::Bitmask => {
                if arg_1 == arg_2 {
                    format!("B({}): {source:.75}", arg_1 as i32)
                } else {
                    format!("B({}-{}): {source:.75}", arg_1 as i32, arg_2 as i32)
                }
            }
            FilterKind::LowPass => format!("L({arg_1:.2E}): {source:.75}"),
        };

        self.figure[f_n].drawing = self.figure[f_1].drawing;
        self.figure[f_n].width = self.figure[f_1].width;

        if kind != FilterKind::LowPass {
            let a_y = self.figure[f_n].axis_y;
            let a_x = self.figure[f_n].axis_x;

            self.axis_scale_auto_cond(a_y, Some(a_x));

            self.on_x = Some(a_x);
            self.on_y = Some(a_y);

            self.deslave_focus();
        }
    }

    /// New figure plotting `f_1 op f_2` on the Y side, resampling
    /// `f_2` onto `f_1`'s time base when their streams differ.
    fn figure_subtract_add(&mut self, f_n: usize, f_1: usize, f_2: usize, op: BinaryOp) -> bool {
        let d = self.figure[f_1].data_n;
        let c_x = self.figure[f_1].column_x;
        let a_x = self.figure[f_1].axis_x;

        if a_x != self.figure[f_2].axis_x {
            error!("both figures must be on the same axis on X");
            return false;
        }

        let c_y_2 = if d != self.figure[f_2].data_n || c_x != self.figure[f_2].column_x {
            let in_d = self.figure[f_2].data_n;
            let in_c_x = self.figure[f_2].column_x;
            let in_c_y = self.figure[f_2].column_y;

            match self.get_subtract_resample(d, c_x, in_d, in_c_x, in_c_y) {
                Some(c_n) => c_n,
                None => {
                    error!("unable to get resample subtract");
                    return false;
                }
            }
        } else {
            self.figure[f_2].column_y
        };

        let c_y_1 = self.figure[f_1].column_y;

        let Some(c_y) = self.get_subtract_binary(d, op, c_y_1, c_y_2) else {
            return false;
        };

        let a_y = match self.get_free_axis() {
            Some(a_y) => {
                self.axis[a_y].role = AxisRole::Y;

                let label = self.axis[self.figure[f_1].axis_y].label.clone();
                self.axis_label(a_y, &label);
                a_y
            }
            None => self.figure[f_1].axis_y,
        };

        self.figure_add(f_n, d, c_x, c_y, a_x, a_y, "");

        let label_1 = self.figure[f_1].label.clone();
        let label_2 = self.figure[f_2].label.clone();

        self.figure[f_n].label = match op {
            BinaryOp::Sub => format!("R: ({label_1:.35}) - ({label_2:.35})"),
            BinaryOp::Add => format!("A: ({label_1:.35}) + ({label_2:.35})"),
            BinaryOp::Mul => format!("M: ({label_1:.35}) * ({label_2:.35})"),
            BinaryOp::Hyp => format!("H: ({label_1:.35}) ({label_2:.35})"),
        };

        self.figure[f_n].drawing = self.figure[f_1].drawing;
        self.figure[f_n].width = self.figure[f_1].width;

        true
    }

    /// Figures whose Y columns feed the binary result plotted by
    /// `f_n`, resolving through resample slots.
    fn figure_subtract_binary_linked(&self, f_n: usize, op: BinaryOp) -> (Option<usize>, Option<usize>) {
        let d = self.figure[f_n].data_n;
        let s_n = self.figure[f_n].column_y - self.data[d].column_n() as i32;

        if !(0..SUBTRACT_MAX as i32).contains(&s_n) {
            return (None, None);
        }

        let Subtract::Binary {
            op: slot_op,
            column_1,
            column_2,
        } = self.data[d].sub[s_n as usize]
        else {
            return (None, None);
        };

        if slot_op != op {
            return (None, None);
        }

        let mut c_n = column_1;
        let s_e = c_n - self.data[d].column_n() as i32;

        if (0..SUBTRACT_MAX as i32).contains(&s_e) {
            if let Subtract::Resample { in_column_y, .. } = self.data[d].sub[s_e as usize] {
                c_n = in_column_y;
            }
        }

        let f_1 = (0..FIGURE_MAX).find(|&n| {
            self.figure[n].busy && self.figure[n].data_n == d && self.figure[n].column_y == c_n
        });

        let mut d_2 = d;
        let mut c_n = column_2;
        let s_e = c_n - self.data[d].column_n() as i32;

        if (0..SUBTRACT_MAX as i32).contains(&s_e) {
            if let Subtract::Resample {
                in_data_n,
                in_column_y,
                ..
            } = self.data[d].sub[s_e as usize]
            {
                c_n = in_column_y;
                d_2 = in_data_n;
            }
        }

        let f_2 = (0..FIGURE_MAX).find(|&n| {
            self.figure[n].busy && self.figure[n].data_n == d_2 && self.figure[n].column_y == c_n
        });

        (f_1, f_2)
    }

    /// Toggle between "two source figures visible" and "their binary
    /// result visible" without rebuilding derived state.
    pub fn figure_subtract_switch(&mut self, op: BinaryOp) {
        let visible: Vec<usize> = (0..FIGURE_MAX)
            .filter(|&n| self.figure[n].busy && !self.figure[n].hidden)
            .collect();

        match visible.len() {
            1 => {
                let f_n = visible[0];
                let (f_1, f_2) = self.figure_subtract_binary_linked(f_n, op);

                if let (Some(f_1), Some(f_2)) = (f_1, f_2) {
                    self.figure[f_n].hidden = true;
                    self.figure[f_1].hidden = false;
                    self.figure[f_2].hidden = false;

                    self.on_x = Some(self.figure[f_1].axis_x);
                    self.on_y = Some(self.figure[f_1].axis_y);
                }
            }
            2 => {
                let (f_1, f_2) = (visible[0], visible[1]);

                let linked = (0..FIGURE_MAX).find(|&n| {
                    if !self.figure[n].busy {
                        return false;
                    }

                    let pair = self.figure_subtract_binary_linked(n, op);
                    pair == (Some(f_1), Some(f_2)) || pair == (Some(f_2), Some(f_1))
                });

                match linked {
                    Some(f_n) => {
                        self.figure[f_1].hidden = true;
                        self.figure[f_2].hidden = true;
                        self.figure[f_n].hidden = false;

                        if self.figure[f_n].axis_x == self.figure[f_1].axis_x
                            && self.figure[f_n].axis_x == self.figure[f_2].axis_x
                        {
                            let (a_y, a_x) =
                                (self.figure[f_n].axis_y, self.figure[f_n].axis_x);
                            self.axis_scale_auto_cond(a_y, Some(a_x));
                        } else if self.figure[f_n].axis_y == self.figure[f_1].axis_y
                            && self.figure[f_n].axis_y == self.figure[f_2].axis_y
                        {
                            let (a_x, a_y) =
                                (self.figure[f_n].axis_x, self.figure[f_n].axis_y);
                            self.axis_scale_auto_cond(a_x, Some(a_y));
                        }

                        self.on_x = Some(self.figure[f_n].axis_x);
                        self.on_y = Some(self.figure[f_n].axis_y);
                    }
                    None => {
                        let Some(f_n) = self.get_free_figure() else {
                            error!("unable to get free figure to subtract");
                            return;
                        };

                        if self.figure_subtract_add(f_n, f_1, f_2, op) {
                            self.figure[f_1].hidden = true;
                            self.figure[f_2].hidden = true;

                            let (a_y, a_x) =
                                (self.figure[f_n].axis_y, self.figure[f_n].axis_x);
                            self.axis_scale_auto_cond(a_y, Some(a_x));

                            self.on_x = Some(a_x);
                            self.on_y = Some(a_y);
                        }
                    }
                }
            }
            _ => {}
        }

        self.deslave_focus();
    }

    fn deslave_focus(&mut self) {
        if let Some(on_x) = self.on_x {
            if let Some(b) = self.axis[on_x].slave {
                self.on_x = Some(b);
            }
        }

        if let Some(on_y) = self.on_y {
            if let Some(b) = self.axis[on_y].slave {
                self.on_y = Some(b);
            }
        }
    }

    /// New figure plotting a polynomial fitted to `f_1` over the
    /// currently visible rectangle; coefficients and the deviation go
    /// into the data box.
    pub fn figure_subtract_polyfit(
        &mut self,
        f_1: usize,
        poly_n: usize,
        lsq: &mut dyn LeastSquares,
    ) {
        if f_1 >= FIGURE_MAX {
            error!("figure number {f_1} is out of range");
            return;
        }

        if poly_n > POLYFIT_MAX {
            error!("polynomial degree {poly_n} is out of range");
            return;
        }

        let Some(f_n) = self.get_free_figure() else {
            error!("unable to get free figure to subtract");
            return;
        };

        let d = self.figure[f_1].data_n;

        let Some(s_n) = self.get_free_subtract(d) else {
            error!("unable to get free subtract");
            return;
        };

        let (scale_x, offset_x) = self.axis_transform(self.figure[f_1].axis_x);
        let (scale_y, offset_y) = self.axis_transform(self.figure[f_1].axis_y);

        let c_x = self.figure[f_1].column_x;
        let c_y = self.figure[f_1].column_y;

        self.data_polyfit(d, c_x, c_y, scale_x, offset_x, scale_y, offset_y, poly_n, lsq);

        let solution = lsq.solution();

        if solution.len() < poly_n + 1 {
            error!("fit solution is shorter than the requested degree");
            return;
        }

        let mut coefs = [0.0; POLYFIT_MAX + 1];
        coefs[..poly_n + 1].copy_from_slice(&solution[..poly_n + 1]);

        self.data[d].sub[s_n] = Subtract::Polyfit {
            column_x: c_x,
            column_y: c_y,
            poly_n,
            coefs,
        };

        self.data_subtract(d, s_n as i32);

        let c_n = (s_n + self.data[d].column_n()) as i32;
        let a_x = self.figure[f_1].axis_x;
        let a_y = self.figure[f_1].axis_y;

        self.figure_add(f_n, d, c_x, c_n, a_x, a_y, "");

        let source = self.figure[f_1].label.clone();
        self.figure[f_n].label = format!("P: {source:.75}");

        self.figure[f_n].drawing = self.figure[f_1].drawing;
        self.figure[f_n].width = self.figure[f_1].width;

        let deviation = lsq.deviation().first().copied().unwrap_or(f64::NAN);
        let prec = self.opt.precision.saturating_sub(1);

        for n in 0..DATA_BOX_MAX {
            self.data_box.text[n].clear();

            if n == 0 && poly_n == 0 {
                self.data_box.text[n] = format!(" [{n}] = {}", self.format_cell(coefs[0]));
            } else if n < poly_n + 1 {
                let coef = coefs[n];
                self.data_box.text[n] = if coef < 0.0 {
                    format!(" [{n}] = {coef:.prec$E} ")
                } else {
                    format!(" [{n}] =  {coef:.prec$E} ")
                };
            } else if n == poly_n + 1 {
                self.data_box.text[n] = format!(" STD = {}", self.format_cell(deviation));
            }
        }

        if self.data_box.kind != DataBoxKind::Polyfit {
            self.data_box.kind = DataBoxKind::Polyfit;
            self.data_box.x = self.viewport.max_x;
            self.data_box.y = 0;
        }
    }

    /// Clear all figures, axes, overlays and sketch state.
    pub fn figure_clean(&mut self) {
        for fig in self.figure.iter_mut() {
            fig.busy = false;
            fig.hidden = false;
            fig.label.clear();
        }

        for axis in self.axis.iter_mut() {
            axis.role = AxisRole::Free;
            axis.slave = None;
            axis.label.clear();
            axis.exponent = false;
            axis.compact = false;
        }

        self.legend_x = 0;
        self.legend_y = 0;

        self.data_box.kind = DataBoxKind::Free;
        self.data_box.x = self.viewport.max_x;
        self.data_box.y = 0;

        self.slice_on = false;
        self.slice_range_on = 0;

        self.on_x = None;
        self.on_y = None;

        self.hover_figure = None;
        self.hover_legend = false;
        self.hover_data_box = false;
        self.hover_axis = None;

        self.mark_on = false;

        self.sketch_clean();
    }
}
