//! Axis model: value-to-viewport mapping, auto/manual scaling,
//! zoom/pan, stacking, and slave axis composition.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::dataset::range::RangeAcc;
use crate::plot::{Plot, AXIS_MAX};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisRole {
    #[default]
    Free,
    X,
    Y,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlaveAction {
    /// Bind with a fresh `(scale, offset)` relation.
    Enable,
    /// Bind, converting the current independent transform into the
    /// equivalent relation so the visual state is preserved.
    HoldAsIs,
    /// Dissolve the relation, baking the base transform in.
    Disable,
}

/// One axis. `scale` and `offset` map a value onto the normalized
/// `[0, 1]` viewport span as `v * scale + offset`; a slave axis
/// composes its own pair on top of the base axis transform.
#[derive(Clone, Debug)]
pub struct Axis {
    pub(crate) role: AxisRole,
    pub(crate) scale: f64,
    pub(crate) offset: f64,
    pub(crate) slave: Option<usize>,
    pub(crate) label: String,
    pub(crate) compact: bool,
    pub(crate) exponent: bool,
    pub(crate) lock_scale: bool,
    /// Offset inside the layout margin, assigned by the layout pass.
    pub(crate) pos: i32,
    /// Normalized tick step and origin of the last tick pass.
    pub(crate) tick_step: f64,
    pub(crate) tick_start: f64,
}

impl Default for Axis {
    fn default() -> Self {
        Self {
            role: AxisRole::Free,
            scale: 1.0,
            offset: 0.0,
            slave: None,
            label: String::new(),
            compact: false,
            exponent: false,
            lock_scale: false,
            pos: 0,
            tick_step: 0.0,
            tick_start: 0.0,
        }
    }
}

impl Axis {
    pub fn role(&self) -> AxisRole {
        self.role
    }

    pub fn scale_offset(&self) -> (f64, f64) {
        (self.scale, self.offset)
    }

    pub fn is_slave(&self) -> bool {
        self.slave.is_some()
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Plot {
    /// Composed `(scale, offset)` of `a` in normalized coordinates,
    /// with any slave relation folded in.
    pub(crate) fn axis_transform(&self, a: usize) -> (f64, f64) {
        let mut scale = self.axis[a].scale;
        let mut offset = self.axis[a].offset;

        if let Some(b) = self.axis[a].slave {
            scale *= self.axis[b].scale;
            offset = offset * self.axis[b].scale + self.axis[b].offset;
        }

        (scale, offset)
    }

    /// Composed transform taken to pixel space for the current
    /// viewport; X grows rightwards, Y upwards.
    pub(crate) fn axis_pixel_transform(&self, a: usize) -> (f64, f64) {
        let (mut scale, mut offset) = self.axis_transform(a);

        match self.axis[a].role {
            AxisRole::X => {
                let span = (self.viewport.max_x - self.viewport.min_x) as f64;
                scale *= span;
                offset = offset * span + self.viewport.min_x as f64;
            }
            AxisRole::Y => {
                let span = (self.viewport.min_y - self.viewport.max_y) as f64;
                scale *= span;
                offset = offset * span + self.viewport.max_y as f64;
            }
            AxisRole::Free => {}
        }

        (scale, offset)
    }

    /// Axis value to pixel position.
    pub fn axis_conv(&self, a: usize, fval: f64) -> f64 {
        let (scale, offset) = self.axis_pixel_transform(a);
        fval * scale + offset
    }

    /// Pixel position back to axis value.
    pub fn axis_conv_inv(&self, a: usize, px: f64) -> f64 {
        let (scale, offset) = self.axis_pixel_transform(a);
        (px - offset) / scale
    }

    pub fn axis_label(&mut self, a: usize, label: &str) {
        if a >= AXIS_MAX {
            error!("axis number {a} is out of range");
            return;
        }

        if !label.is_empty() {
            self.axis[a].label = label.to_owned();
        }
    }

    pub fn axis_set_compact(&mut self, a: usize, compact: bool) {
        if a >= AXIS_MAX {
            error!("axis number {a} is out of range");
            return;
        }

        self.axis[a].compact = compact;
    }

    pub fn axis_set_exponent(&mut self, a: usize, exponent: bool) {
        if a >= AXIS_MAX {
            error!("axis number {a} is out of range");
            return;
        }

        self.axis[a].exponent = exponent;
    }

    /// Map `[min, max]` onto the full viewport span.
    pub fn axis_scale_manual(&mut self, a: usize, min: f64, max: f64) {
        if a >= AXIS_MAX {
            error!("axis number {a} is out of range");
            return;
        }

        if self.axis[a].role == AxisRole::Free {
            return;
        }

        if self.axis[a].slave.is_some() {
            return;
        }

        self.axis[a].scale = 1.0 / (max - min);
        self.axis[a].offset = -min / (max - min);
    }

    /// Auto-scale `a` over every figure bound to it, restricted to
    /// rows visible on axis `b` when given. After the data pass the
    /// result is inset by the mark width so points clear the border.
    pub fn axis_scale_auto_cond(&mut self, a: usize, b: Option<usize>) {
        if a >= AXIS_MAX {
            error!("axis number {a} is out of range");
            return;
        }

        if let Some(b) = b {
            if b >= AXIS_MAX {
                error!("conditional axis number {b} is out of range");
                return;
            }
        }

        if self.axis[a].role == AxisRole::Free {
            return;
        }

        if self.axis[a].slave.is_some() {
            return;
        }

        let mut acc = RangeAcc::default();

        for f_n in 0..self.figure.len() {
            if !self.figure[f_n].busy || self.figure[f_n].hidden {
                continue;
            }

            let d_n = self.figure[f_n].data_n;

            let direct = if self.figure[f_n].axis_x == a {
                Some(self.figure[f_n].column_x)
            } else if self.figure[f_n].axis_y == a {
                Some(self.figure[f_n].column_y)
            } else {
                None
            };

            if let Some(c_n) = direct {
                let (min, max) = match b {
                    None => self.data_range(d_n, c_n),
                    Some(b) => self.range_axis(d_n, c_n, b),
                };

                acc.fold(min, max);
            }

            let x_n = self.figure[f_n].axis_x;
            let y_n = self.figure[f_n].axis_y;

            let slaved = if self.axis[x_n].slave == Some(a) {
                Some((self.figure[f_n].column_x, x_n))
            } else if self.axis[y_n].slave == Some(a) {
                Some((self.figure[f_n].column_y, y_n))
            } else {
                None
            };

            if let Some((c_n, s_n)) = slaved {
                let (min, max) = match b {
                    None => self.data_range(d_n, c_n),
                    Some(b) => self.range_axis(d_n, c_n, b),
                };

                let scale = self.axis[s_n].scale;
                let offset = self.axis[s_n].offset;

                acc.fold(min * scale + offset, max * scale + offset);
            }
        }

        if !acc.started {
            return;
        }

        let (mut fmin, mut fmax) = (acc.fmin, acc.fmax);

        if fmin == fmax {
            fmin -= 1.0;
            fmax += 1.0;
        }

        self.axis_scale_manual(a, fmin, fmax);

        let mark = self.font.mark;

        match self.axis[a].role {
            AxisRole::X => {
                let min = self.axis_conv_inv(a, (self.viewport.min_x - mark) as f64);
                let max = self.axis_conv_inv(a, (self.viewport.max_x + mark) as f64);
                self.axis_scale_manual(a, min, max);
            }
            AxisRole::Y => {
                let min = self.axis_conv_inv(a, (self.viewport.max_y + mark) as f64);
                let max = self.axis_conv_inv(a, (self.viewport.min_y - mark) as f64);
                self.axis_scale_manual(a, min, max);
            }
            AxisRole::Free => {}
        }
    }

    pub fn axis_scale_auto(&mut self, a: usize) {
        self.axis_scale_auto_cond(a, None);

        if a < AXIS_MAX {
            self.axis[a].lock_scale = true;
        }
    }

    pub fn axis_scale_lock(&mut self, lock: bool) {
        for axis in self.axis.iter_mut() {
            axis.lock_scale = lock;
        }
    }

    /// Re-run auto-scaling on every axis that tracks its data.
    pub fn axis_scale_default(&mut self) {
        for a in 0..AXIS_MAX {
            if self.axis[a].role != AxisRole::Free && self.axis[a].lock_scale {
                self.axis_scale_auto(a);
            }
        }
    }

    /// Zoom by `z` keeping the pixel position `origin` fixed.
    pub fn axis_scale_zoom(&mut self, a: usize, origin: i32, zoom: f64) {
        if a >= AXIS_MAX {
            error!("axis number {a} is out of range");
            return;
        }

        if self.axis[a].slave.is_some() {
            return;
        }

        match self.axis[a].role {
            AxisRole::X => {
                self.axis[a].offset = self.axis[a].offset * zoom
                    + (self.viewport.min_x - origin) as f64
                        / (self.viewport.max_x - self.viewport.min_x) as f64
                        * (zoom - 1.0);
                self.axis[a].scale *= zoom;
            }
            AxisRole::Y => {
                self.axis[a].offset = self.axis[a].offset * zoom
                    + (self.viewport.max_y - origin) as f64
                        / (self.viewport.min_y - self.viewport.max_y) as f64
                        * (zoom - 1.0);
                self.axis[a].scale *= zoom;
            }
            AxisRole::Free => {}
        }

        self.axis[a].lock_scale = false;
    }

    /// Pan by a pixel delta.
    pub fn axis_scale_move(&mut self, a: usize, moved: i32) {
        if a >= AXIS_MAX {
            error!("axis number {a} is out of range");
            return;
        }

        if self.axis[a].slave.is_some() {
            return;
        }

        match self.axis[a].role {
            AxisRole::X => {
                self.axis[a].offset +=
                    moved as f64 / (self.viewport.max_x - self.viewport.min_x) as f64;
            }
            AxisRole::Y => {
                self.axis[a].offset +=
                    moved as f64 / (self.viewport.min_y - self.viewport.max_y) as f64;
            }
            AxisRole::Free => {}
        }

        self.axis[a].lock_scale = false;
    }

    /// Make one data unit cover the same pixel count on the focused X
    /// and Y axes, zooming out the denser one.
    pub fn axis_scale_equal(&mut self) {
        let (Some(on_x), Some(on_y)) = (self.on_x, self.on_y) else {
            return;
        };

        let aspect_x = (self.viewport.max_x - self.viewport.min_x) as f64;
        let aspect_y = (self.viewport.max_y - self.viewport.min_y) as f64;

        if self.axis[on_y].scale < self.axis[on_x].scale {
            let zoom = self.axis[on_y].scale / self.axis[on_x].scale * (aspect_y / aspect_x);

            self.axis[on_x].offset *= zoom;
            self.axis[on_x].offset += (1.0 - zoom) / 2.0;
            self.axis[on_x].scale *= zoom;
        } else {
            let zoom = self.axis[on_x].scale / self.axis[on_y].scale * (aspect_x / aspect_y);

            self.axis[on_y].offset *= zoom;
            self.axis[on_y].offset += (1.0 - zoom) / 2.0;
            self.axis[on_y].scale *= zoom;
        }

        self.axis[on_x].lock_scale = false;
        self.axis[on_y].lock_scale = false;
    }

    fn axis_scale_grid_inner(&mut self, a: usize, b: usize) {
        if self.axis[a].slave.is_some() {
            return;
        }

        if a != b {
            self.axis[a].offset += self.axis[b].tick_start - self.axis[a].tick_start;
            self.axis[a].scale *= self.axis[b].tick_step / self.axis[a].tick_step;

            self.axis[a].lock_scale = false;
        }
    }

    /// Snap every axis of the same orientation to the tick grid of
    /// the focused axis.
    pub fn axis_scale_grid_align(&mut self) {
        let (Some(on_x), Some(on_y)) = (self.on_x, self.on_y) else {
            return;
        };

        for a in 0..AXIS_MAX {
            match self.axis[a].role {
                AxisRole::X => self.axis_scale_grid_inner(a, on_x),
                AxisRole::Y => self.axis_scale_grid_inner(a, on_y),
                AxisRole::Free => {}
            }
        }

        self.axis[on_x].lock_scale = false;
        self.axis[on_y].lock_scale = false;
    }

    /// Partition the vertical viewport into equal bands, one per
    /// referenced Y axis, and auto-scale each into its band.
    pub fn axis_scale_staked(&mut self) {
        let mut list = Vec::new();

        for a in 0..AXIS_MAX {
            if self.axis[a].role != AxisRole::Y || self.axis[a].slave.is_some() {
                continue;
            }

            let referenced = self
                .figure
                .iter()
                .any(|f| f.busy && !f.hidden && f.axis_y == a);

            if referenced {
                list.push(a);
            }
        }

        if list.len() < 2 {
            return;
        }

        let n = list.len() as f64;
        let mut shift =
            self.font.mark as f64 / (self.viewport.max_y - self.viewport.min_y) as f64;

        let step = 1.0 / n;
        let zoom = step - 2.0 * shift;

        shift += (n - 1.0) / n;

        for a in list {
            self.axis_scale_auto_cond(a, self.on_x);

            self.axis[a].offset = self.axis[a].offset * zoom + shift;
            self.axis[a].scale *= zoom;

            self.axis[a].lock_scale = false;

            shift -= step;
        }
    }

    /// Bind, rebind or dissolve a slave relation between `a` and `b`.
    pub fn axis_slave(&mut self, a: usize, b: usize, scale: f64, offset: f64, action: SlaveAction) {
        if a >= AXIS_MAX {
            error!("slave axis number {a} is out of range");
            return;
        }

        let b = if action == SlaveAction::Disable {
            match self.axis[a].slave {
                Some(b) => b,
                None => return,
            }
        } else {
            b
        };

        if b >= AXIS_MAX {
            error!("base axis number {b} is out of range");
            return;
        }

        if b == a {
            error!("axes must not be the same");
            return;
        }

        if self.axis[b].slave.is_some() {
            error!("base axis must not be slave");
            return;
        }

        let is_base = (0..AXIS_MAX)
            .any(|n| self.axis[n].role != AxisRole::Free && self.axis[n].slave == Some(a));

        if is_base {
            error!("the axis is base for another slave");
            return;
        }

        match action {
            SlaveAction::Enable => {
                if self.axis[a].slave.is_none() {
                    self.axis[a].slave = Some(b);
                    self.axis[a].scale = scale;
                    self.axis[a].offset = offset;

                    self.retarget_focus(a, b);
                }
            }
            SlaveAction::HoldAsIs => {
                if self.axis[a].slave.is_none() {
                    self.axis[a].slave = Some(b);

                    self.axis[a].scale = self.axis[a].scale / self.axis[b].scale;
                    self.axis[a].offset =
                        (self.axis[a].offset - self.axis[b].offset) / self.axis[b].scale;

                    self.retarget_focus(a, b);
                }
            }
            SlaveAction::Disable => {
                if self.axis[a].slave.is_some() {
                    self.axis[a].slave = None;

                    self.axis[a].scale = self.axis[a].scale * self.axis[b].scale;
                    self.axis[a].offset =
                        self.axis[a].offset * self.axis[b].scale + self.axis[b].offset;
                }
            }
        }
    }

    fn retarget_focus(&mut self, a: usize, b: usize) {
        if self.on_x == Some(a) {
            self.on_x = Some(b);
        }

        if self.on_y == Some(a) {
            self.on_y = Some(b);
        }
    }

    /// Retire an axis: figures still bound to it fall back to the
    /// focused axis, or to the base with an equivalent affine derived
    /// column when the removed axis was a slave.
    pub fn axis_remove(&mut self, a: usize) {
        if a >= AXIS_MAX {
            error!("axis number {a} is out of range");
            return;
        }

        if self.on_x == Some(a) || self.on_y == Some(a) {
            error!("unable to remove active axis");
            return;
        }

        for f_n in 0..self.figure.len() {
            if !self.figure[f_n].busy {
                continue;
            }

            if self.figure[f_n].axis_x == a {
                if let Some(b) = self.axis[a].slave {
                    let d_n = self.figure[f_n].data_n;
                    let c_n = self.figure[f_n].column_x;
                    let (scale, offset) = (self.axis[a].scale, self.axis[a].offset);

                    if let Some(c_n) = self.get_subtract_scale(d_n, c_n, scale, offset) {
                        self.figure[f_n].column_x = c_n;
                    }

                    self.figure[f_n].axis_x = b;
                } else if let Some(on_x) = self.on_x {
                    self.figure[f_n].axis_x = on_x;
                }
            }

            if self.figure[f_n].axis_y == a {
                if let Some(b) = self.axis[a].slave {
                    let d_n = self.figure[f_n].data_n;
                    let c_n = self.figure[f_n].column_y;
                    let (scale, offset) = (self.axis[a].scale, self.axis[a].offset);

                    if let Some(c_n) = self.get_subtract_scale(d_n, c_n, scale, offset) {
                        self.figure[f_n].column_y = c_n;
                    }

                    self.figure[f_n].axis_y = b;
                } else if let Some(on_y) = self.on_y {
                    self.figure[f_n].axis_y = on_y;
                }
            }
        }

        for n in 0..AXIS_MAX {
            if self.axis[n].role != AxisRole::Free && self.axis[n].slave == Some(a) {
                self.axis_slave(n, 0, 0.0, 0.0, SlaveAction::Disable);
            }
        }

        self.axis[a].role = AxisRole::Free;
        self.axis[a].slave = None;
        self.axis[a].label.clear();
        self.axis[a].exponent = false;
        self.axis[a].compact = false;
    }

    /// Axis under a border click, remembered as the hovered axis.
    pub fn axis_get_by_click(&mut self, cur_x: i32, cur_y: i32) -> Option<usize> {
        let cur_x = self.viewport.min_x - self.opt.layout.border - cur_x;
        let cur_y = cur_y - self.viewport.max_y - self.opt.layout.border;

        let mut hit = None;

        for a in 0..AXIS_MAX {
            let box_sz = self.font.axis_box
                + if self.axis[a].compact {
                    0
                } else {
                    self.font.label_box
                };

            match self.axis[a].role {
                AxisRole::X => {
                    if cur_y > self.axis[a].pos && cur_y < self.axis[a].pos + box_sz {
                        hit = Some(a);
                        break;
                    }
                }
                AxisRole::Y => {
                    if cur_x > self.axis[a].pos && cur_x < self.axis[a].pos + box_sz {
                        hit = Some(a);
                        break;
                    }
                }
                AxisRole::Free => {}
            }
        }

        self.hover_axis = hit;
        hit
    }
}

/// Tick step selection: a power of ten refined by /5 and /2 until at
/// least four steps span the window. Returns `(start, step, fexp)` in
/// axis value space.
pub(crate) fn tick_step(fmin: f64, fmax: f64, scale: f64, offset: f64) -> (f64, f64, i32) {
    let mut fexp = ((fmax - fmin) / 10.0).log10().ceil() as i32;
    let mut tih = 10f64.powi(fexp);

    if (fmax - fmin) / tih < 2.0 {
        tih /= 5.0;
        fexp -= 1;
    }

    if (fmax - fmin) / tih < 4.0 {
        tih /= 2.0;
        fexp -= 1;
    }

    let mut tis = (fmin / tih).ceil() * tih;

    if tis * scale + offset < 0.0 {
        tis += tih;
    }

    if tis + tih == tis {
        tih = fmax - tis;
    }

    (tis, tih, fexp)
}
