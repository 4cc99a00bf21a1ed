//! Nearest-in-value row lookup, driven by cursor motion.

use tracing::error;

use crate::axis::AxisRole;
use crate::plot::{DataBoxKind, Plot};

/// Upper bound of containing chunks scanned per query.
pub const SLICE_SPAN: usize = 4;

impl Plot {
    /// Value of column `c` at logical row `id`, or the id itself for
    /// the synthetic row-index column.
    pub fn data_cell(&mut self, d: usize, id: i64, c: i32) -> Option<f64> {
        if self.data.get(d).map_or(true, |data| !data.is_allocated()) {
            return None;
        }

        let cur = self.data[d].cursor_at_id(id);

        if cur.id != id {
            return None;
        }

        let row = self.data[d].peek(&cur)?;

        Some(if c < 0 { id as f64 } else { row[c as usize] })
    }

    /// Logical id of the row whose value at column `c` is closest to
    /// `fsamp`. Chunks whose cached range contains the sample are
    /// scanned, at most [`SLICE_SPAN`] of them; with no containing
    /// chunk the single nearest chunk is scanned instead.
    pub(crate) fn data_slice_get(&mut self, d: usize, c: i32, fsamp: f64) -> Option<i64> {
        let xn = self.range_cache_fetch(d, c);

        let mut cur = self.data[d].cursor_head();

        let mut best: Option<(f64, i64)> = None;
        let mut nearest: Option<(f64, usize)> = None;
        let mut span = 0;

        loop {
            let k = self.data[d].chunk_of(cur.r);
            let chunk = self.rcache.entries[xn].chunks[k];
            let mut job = true;

            if chunk.computed {
                if chunk.finite {
                    if fsamp < chunk.fmin || fsamp > chunk.fmax {
                        job = false;

                        let dmin = (chunk.fmin - fsamp).abs();
                        let dmax = (chunk.fmax - fsamp).abs();
                        let dist = dmin.min(dmax);

                        nearest = match nearest {
                            Some((d0, _)) if d0 <= dist => nearest,
                            _ => Some((dist, k)),
                        };
                    }
                } else {
                    job = false;
                }
            }

            if job {
                span += 1;
                self.slice_scan_chunk(d, c, fsamp, k, &mut cur, &mut best);

                if span >= SLICE_SPAN {
                    break;
                }
            } else {
                self.data[d].chunk_skip(&mut cur);
            }

            if self.data[d].at_tail(&cur) {
                break;
            }
        }

        if best.is_none() {
            if let Some((_, k_rep)) = nearest {
                let mut cur = self.data[d].cursor_head();

                loop {
                    let k = self.data[d].chunk_of(cur.r);

                    if k == k_rep {
                        self.slice_scan_chunk(d, c, fsamp, k, &mut cur, &mut best);
                    } else {
                        self.data[d].chunk_skip(&mut cur);
                    }

                    if self.data[d].at_tail(&cur) {
                        break;
                    }
                }
            }
        }

        best.map(|(_, id)| id)
    }

    fn slice_scan_chunk(
        &mut self,
        d: usize,
        c: i32,
        fsamp: f64,
        k: usize,
        cur: &mut crate::dataset::Cursor,
        best: &mut Option<(f64, i64)>,
    ) {
        loop {
            if self.data[d].chunk_of(cur.r) != k {
                break;
            }

            let Some(row) = self.data[d].read(cur) else {
                break;
            };

            let id = cur.id - 1;
            let fval = if c < 0 { id as f64 } else { row[c as usize] };

            if fval.is_finite() {
                let dist = (fsamp - fval).abs();

                match best {
                    Some((d0, _)) if *d0 <= dist => {}
                    _ => *best = Some((dist, id)),
                }
            }
        }
    }

    /// Cycle the slice range mode: arm the base point, freeze, off.
    pub fn slice_switch(&mut self) {
        match self.slice_range_on {
            0 => {
                self.slice_range_on = 1;

                for f_n in 0..self.figure.len() {
                    if self.figure[f_n].slice_busy {
                        self.figure[f_n].slice_base_x = self.figure[f_n].slice_x;
                        self.figure[f_n].slice_base_y = self.figure[f_n].slice_y;
                    }
                }
            }
            1 => self.slice_range_on = 2,
            _ => self.slice_range_on = 0,
        }
    }

    /// Track the cursor: find the nearest sample on every figure bound
    /// to the slice axis and refresh the data-box text.
    pub fn slice_track(&mut self, cur_x: i32, cur_y: i32) {
        if self.slice_range_on == 2 {
            return;
        }

        if self.slice_axis.is_none() {
            self.slice_axis = self.on_x;
        }

        let Some(slice_axis) = self.slice_axis else {
            error!("no valid axis number to slice");
            return;
        };

        let mut memo: Option<(usize, usize, i32, Option<i64>)> = None;

        for f_n in 0..self.figure.len() {
            self.figure[f_n].slice_busy = false;

            let fig = &self.figure[f_n];

            if !fig.busy || fig.hidden {
                continue;
            }

            let mut job = false;
            let a_n;
            let c_x;
            let fval;

            match self.axis[slice_axis].role {
                AxisRole::X => {
                    if fig.axis_x == slice_axis {
                        job = true;
                    } else {
                        let b_n = fig.axis_x;

                        if self.axis[b_n].slave == Some(slice_axis)
                            || self.axis[slice_axis].slave == Some(b_n)
                        {
                            job = true;
                        }
                    }

                    a_n = fig.axis_x;
                    c_x = fig.column_x;
                    fval = self.axis_conv_inv(a_n, cur_x as f64);
                }
                AxisRole::Y => {
                    if fig.axis_y == slice_axis {
                        job = true;
                    } else {
                        let b_n = fig.axis_y;

                        if self.axis[b_n].slave == Some(slice_axis)
                            || self.axis[slice_axis].slave == Some(b_n)
                        {
                            job = true;
                        }
                    }

                    a_n = fig.axis_y;
                    c_x = fig.column_y;
                    fval = self.axis_conv_inv(a_n, cur_y as f64);
                }
                AxisRole::Free => continue,
            }

            if !job {
                continue;
            }

            let d_n = self.figure[f_n].data_n;

            let found = match memo {
                Some((d_m, a_m, c_m, found)) if d_m == d_n && a_m == a_n && c_m == c_x => found,
                _ => {
                    let found = self.data_slice_get(d_n, c_x, fval);
                    memo = Some((d_n, a_n, c_x, found));
                    found
                }
            };

            if let Some(id) = found {
                let c_x = self.figure[f_n].column_x;
                let c_y = self.figure[f_n].column_y;

                let fval_x = self.data_cell(d_n, id, c_x);
                let fval_y = self.data_cell(d_n, id, c_y);

                if let (Some(fval_x), Some(fval_y)) = (fval_x, fval_y) {
                    self.figure[f_n].slice_busy = true;
                    self.figure[f_n].slice_x = fval_x;
                    self.figure[f_n].slice_y = fval_y;
                }
            }
        }

        for f_n in 0..self.figure.len() {
            self.data_box.text[f_n].clear();

            if !self.figure[f_n].slice_busy {
                continue;
            }

            let (slice_x, slice_y) = (self.figure[f_n].slice_x, self.figure[f_n].slice_y);
            let (base_x, base_y) = (self.figure[f_n].slice_base_x, self.figure[f_n].slice_base_y);

            let text = if self.slice_range_on != 0 {
                format!(
                    " \u{0394}{}\u{0394}{}",
                    self.format_cell(slice_x - base_x),
                    self.format_cell(slice_y - base_y)
                )
            } else {
                format!("{}{}", self.format_cell(slice_x), self.format_cell(slice_y))
            };

            self.data_box.text[f_n] = text;
        }

        if self.data_box.kind != DataBoxKind::Slice {
            self.data_box.kind = DataBoxKind::Slice;
            self.data_box.x = self.viewport.max_x;
            self.data_box.y = 0;
        }
    }
}
