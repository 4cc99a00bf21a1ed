//! Derived-column pipeline: virtual columns appended to each row,
//! computed from other columns by a tagged operator.

use tracing::error;

use crate::backend::LeastSquares;
use crate::dataset::store::SUBTRACT_MAX;
use crate::plot::{Plot, DATASET_MAX};

/// Highest polynomial degree accepted by the fit operator.
pub const POLYFIT_MAX: usize = 8;

/// Cascades requested from the least-squares solver.
pub const LSE_CASCADES: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Sub,
    Add,
    Mul,
    Hyp,
}

/// One derived-column slot. Stateful operators carry their running
/// state inline so an unbounded pass can resume where it left off.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Subtract {
    Free,
    TimeUnwrap {
        column_1: i32,
        unwrap: f64,
        prev: f64,
        prev2: f64,
    },
    Scale {
        column_1: i32,
        scale: f64,
        offset: f64,
    },
    Binary {
        op: BinaryOp,
        column_1: i32,
        column_2: i32,
    },
    FilterDiff {
        column_1: i32,
        state: f64,
    },
    FilterCum {
        column_1: i32,
        state: f64,
    },
    FilterBitmask {
        column_1: i32,
        lo: i32,
        hi: i32,
    },
    FilterLowPass {
        column_1: i32,
        gain: f64,
        state: f64,
    },
    Resample {
        column_x: i32,
        in_data_n: usize,
        in_column_x: i32,
        in_column_y: i32,
    },
    Polyfit {
        column_x: i32,
        column_y: i32,
        poly_n: usize,
        coefs: [f64; POLYFIT_MAX + 1],
    },
}

impl Subtract {
    pub fn is_free(&self) -> bool {
        matches!(self, Subtract::Free)
    }

    /// Does this operator read column `c` of its own dataset?
    pub(crate) fn reads(&self, c: i32) -> bool {
        match *self {
            Subtract::Free => false,
            Subtract::TimeUnwrap { column_1, .. } => column_1 == c,
            Subtract::Scale { column_1, .. } => column_1 == c,
            Subtract::Binary {
                column_1, column_2, ..
            } => column_1 == c || column_2 == c,
            Subtract::FilterDiff { column_1, .. } => column_1 == c,
            Subtract::FilterCum { column_1, .. } => column_1 == c,
            Subtract::FilterBitmask { column_1, .. } => column_1 == c,
            Subtract::FilterLowPass { column_1, .. } => column_1 == c,
            Subtract::Resample { column_x, .. } => column_x == c,
            Subtract::Polyfit { column_x, .. } => column_x == c,
        }
    }
}

fn cell(row: &[f64], c: i32, id: i64) -> f64 {
    if c < 0 {
        id as f64
    } else {
        row[c as usize]
    }
}

impl Plot {
    /// Apply derived slots over `d`. With `s >= 0` one slot is
    /// recomputed over the full live span (resetting its state); with
    /// `s == -1` every slot is extended from the watermark to the tail
    /// and running state is preserved across calls.
    pub fn data_subtract(&mut self, d: usize, s: i32) {
        if d >= DATASET_MAX {
            error!("dataset number {d} is out of range");
            return;
        }

        if !(-1..SUBTRACT_MAX as i32).contains(&s) {
            error!("subtract number {s} is out of range");
            return;
        }

        if !self.data[d].is_allocated() {
            return;
        }

        let head_id = self.data[d].id_n;
        let tail_id = head_id + self.data[d].rows as i64;

        let (s_from, s_to, start_id) = if s < 0 {
            let start = self.data[d].sub_id.clamp(head_id, tail_id);
            self.data[d].sub_id = tail_id;
            (0, SUBTRACT_MAX, start)
        } else {
            (s as usize, s as usize + 1, head_id)
        };

        for s_n in s_from..s_to {
            self.subtract_run(d, s_n, start_id);
        }
    }

    /// Free every derived slot of every dataset.
    pub fn data_subtract_clean(&mut self) {
        for data in self.data.iter_mut() {
            if data.is_allocated() {
                for slot in data.sub.iter_mut() {
                    *slot = Subtract::Free;
                }
            }
        }
    }

    fn subtract_run(&mut self, d: usize, s_n: usize, start_id: i64) {
        let c_n = self.data[d].column_n + s_n;
        let full = start_id <= self.data[d].id_n;
        let mut cur = self.data[d].cursor_at_id(start_id);

        match self.data[d].sub[s_n] {
            Subtract::Free => {}

            Subtract::TimeUnwrap {
                column_1,
                unwrap,
                prev,
                prev2,
            } => {
                let (mut offset, mut x2, mut x3) = if full {
                    (0.0, f64::NAN, f64::NAN)
                } else {
                    (unwrap, prev, prev2)
                };

                while let Some(row) = self.write_row(d, &mut cur) {
                    let id = cur.id - 1;
                    let x1 = cell(row, column_1, id);

                    if x1 < x2 {
                        offset += x2 - x1;

                        if x3 < x2 {
                            offset += x2 - x3;
                        }
                    }

                    row[c_n] = x1 + offset;

                    if x1.is_finite() {
                        x3 = x2;
                        x2 = x1;
                    }
                }

                if let Subtract::TimeUnwrap {
                    unwrap,
                    prev,
                    prev2,
                    ..
                } = &mut self.data[d].sub[s_n]
                {
                    *unwrap = offset;
                    *prev = x2;
                    *prev2 = x3;
                }
            }

            Subtract::Scale {
                column_1,
                scale,
                offset,
            } => {
                while let Some(row) = self.write_row(d, &mut cur) {
                    let id = cur.id - 1;
                    let x1 = cell(row, column_1, id);

                    row[c_n] = x1 * scale + offset;
                }
            }

            Subtract::Binary {
                op,
                column_1,
                column_2,
            } => {
                while let Some(row) = self.write_row(d, &mut cur) {
                    let id = cur.id - 1;
                    let x1 = cell(row, column_1, id);
                    let x2 = cell(row, column_2, id);

                    row[c_n] = match op {
                        BinaryOp::Sub => x1 - x2,
                        BinaryOp::Add => x1 + x2,
                        BinaryOp::Mul => x1 * x2,
                        BinaryOp::Hyp => (x1 * x1 + x2 * x2).sqrt(),
                    };
                }
            }

            Subtract::FilterDiff { column_1, state } => {
                let mut x2 = if full { f64::NAN } else { state };

                while let Some(row) = self.write_row(d, &mut cur) {
                    let id = cur.id - 1;
                    let x1 = cell(row, column_1, id);

                    row[c_n] = x1 - x2;
                    x2 = x1;
                }

                if let Subtract::FilterDiff { state, .. } = &mut self.data[d].sub[s_n] {
                    *state = x2;
                }
            }

            Subtract::FilterCum { column_1, state } => {
                let mut x2 = if full { 0.0 } else { state };

                while let Some(row) = self.write_row(d, &mut cur) {
                    let id = cur.id - 1;
                    let x1 = cell(row, column_1, id);

                    if x1.is_finite() {
                        x2 += x1;
                    }

                    row[c_n] = x2;
                }

                if let Subtract::FilterCum { state, .. } = &mut self.data[d].sub[s_n] {
                    *state = x2;
                }
            }

            Subtract::FilterBitmask { column_1, lo, hi } => {
                let mut mask = 0u64;
                for bit in lo..=hi {
                    if (0..64).contains(&bit) {
                        mask |= 1u64 << bit;
                    }
                }

                while let Some(row) = self.write_row(d, &mut cur) {
                    let id = cur.id - 1;
                    let x1 = cell(row, column_1, id);

                    row[c_n] = (((x1 as u64) & mask) >> lo.max(0)) as f64;
                }
            }

            Subtract::FilterLowPass {
                column_1,
                gain,
                state,
            } => {
                let mut x2 = if full { f64::NAN } else { state };

                while let Some(row) = self.write_row(d, &mut cur) {
                    let id = cur.id - 1;
                    let x1 = cell(row, column_1, id);

                    if x1.is_finite() {
                        if x2.is_finite() {
                            x2 += (x1 - x2) * gain;
                        } else {
                            x2 = x1;
                        }
                    }

                    row[c_n] = x2;
                }

                if let Subtract::FilterLowPass { state, .. } = &mut self.data[d].sub[s_n] {
                    *state = x2;
                }
            }

            Subtract::Resample {
                column_x,
                in_data_n,
                in_column_x,
                in_column_y,
            } => {
                // The lookup stream is external, so this cannot be
                // extended incrementally; recomputed on full spans only.
                if full {
                    self.data_resample(d, column_x, c_n, in_data_n, in_column_x, in_column_y);
                }
            }

            Subtract::Polyfit {
                column_x,
                poly_n,
                coefs,
                ..
            } => {
                while let Some(row) = self.write_row(d, &mut cur) {
                    let id = cur.id - 1;
                    let x1 = cell(row, column_x, id);

                    let mut x2 = coefs[poly_n];
                    for n in (0..poly_n).rev() {
                        x2 = x2 * x1 + coefs[n];
                    }

                    row[c_n] = x2;
                }
            }
        }
    }

    /// Piecewise-linear resampling of `(in_column_x, in_column_y)` of
    /// the source dataset onto the time column `c_x` of `d`, holding
    /// the last valid sample beyond the source boundaries.
    fn data_resample(&mut self, d: usize, c_x: i32, c_dst: usize, r_d: usize, r_c_x: i32, r_c_y: i32) {
        let mut cur = self.data[d].cursor_head();
        let mut r_cur = self.data[r_d].cursor_head();

        let mut r_x = f64::NAN;
        let mut r_y = f64::NAN;

        loop {
            let Some(row) = self.data[r_d].read(&mut r_cur) else {
                break;
            };

            let id = r_cur.id - 1;
            r_x = cell(row, r_c_x, id);
            r_y = cell(row, r_c_y, id);

            if !r_x.is_nan() {
                break;
            }
        }

        if r_cur.id == self.data[r_d].head_id() {
            error!("no data to resample in dataset {r_d} column {r_c_x}");
            return;
        }

        let mut r_x_prev = r_x;
        let mut r_y_prev = r_y;

        loop {
            if self.data[d].at_tail(&cur) {
                break;
            }

            let x = match self.data[d].peek(&cur) {
                Some(row) => cell(row, c_x, cur.id),
                None => break,
            };

            let y = if x.is_finite() {
                while r_x < x {
                    let Some(row) = self.data[r_d].read(&mut r_cur) else {
                        break;
                    };

                    if r_x.is_finite() {
                        r_x_prev = r_x;
                        r_y_prev = r_y;
                    }

                    let id = r_cur.id - 1;
                    r_x = cell(row, r_c_x, id);
                    r_y = cell(row, r_c_y, id);
                }

                if r_x >= x {
                    if r_x_prev <= x {
                        let q = (x - r_x_prev) / (r_x - r_x_prev);
                        r_y_prev + (r_y - r_y_prev) * q
                    } else {
                        r_y_prev
                    }
                } else {
                    r_y
                }
            } else {
                f64::NAN
            };

            let Some(row) = self.write_row(d, &mut cur) else {
                break;
            };

            row[c_dst] = y;
        }
    }

    /// Feed the solver with `(x, y)` rows of `d` restricted to the
    /// currently visible normalized rectangle, skipping whole chunks
    /// via the range cache. Basis powers are of the raw `x` value.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn data_polyfit(
        &mut self,
        d: usize,
        c_x: i32,
        c_y: i32,
        scale_x: f64,
        offset_x: f64,
        scale_y: f64,
        offset_y: f64,
        poly_n: usize,
        lsq: &mut dyn LeastSquares,
    ) {
        lsq.initiate(LSE_CASCADES, poly_n + 1, 1);

        let xn = self.range_cache_fetch(d, c_x);
        let yn = self.range_cache_fetch(d, c_y);

        let mut cur = self.data[d].cursor_head();
        let mut fvec = [0.0f64; POLYFIT_MAX + 2];

        loop {
            let k = self.data[d].chunk_of(cur.r);
            let mut job = true;

            for (entry, scale, offset) in
                [(xn, scale_x, offset_x), (yn, scale_y, offset_y)]
            {
                let e = &self.rcache.entries[entry];

                if e.chunks[k].computed {
                    if e.chunks[k].finite {
                        let vmin = e.chunks[k].fmin * scale + offset;
                        let vmax = e.chunks[k].fmax * scale + offset;

                        if vmin > 1.0 || vmax < 0.0 {
                            job = false;
                        }
                    } else {
                        job = false;
                    }
                }
            }

            if job {
                loop {
                    if self.data[d].chunk_of(cur.r) != k {
                        break;
                    }

                    let Some(row) = self.data[d].read(&mut cur) else {
                        break;
                    };

                    let id = cur.id - 1;
                    let fval_x = cell(row, c_x, id);
                    let fval_y = cell(row, c_y, id);

                    if fval_x.is_finite() && fval_y.is_finite() {
                        let im_x = fval_x * scale_x + offset_x;
                        let im_y = fval_y * scale_y + offset_y;

                        if (0.0..=1.0).contains(&im_x) && (0.0..=1.0).contains(&im_y) {
                            fvec[0] = 1.0;

                            for n in 0..poly_n {
                                fvec[n + 1] = fvec[n] * fval_x;
                            }

                            fvec[poly_n + 1] = fval_y;

                            lsq.insert(&fvec[..poly_n + 2]);
                        }
                    }
                }
            } else {
                self.data[d].chunk_skip(&mut cur);
            }

            if self.data[d].at_tail(&cur) {
                break;
            }
        }

        lsq.finalise();
    }

    pub(crate) fn get_free_subtract(&self, d: usize) -> Option<usize> {
        self.data[d].sub.iter().position(|s| s.is_free())
    }

    /// Derived time-unwrap column over `c`, reusing an existing slot
    /// with the same source. Returns the owned column index.
    pub fn get_subtract_time_unwrap(&mut self, d: usize, c: i32) -> Option<i32> {
        if d >= DATASET_MAX {
            error!("dataset number {d} is out of range");
            return None;
        }

        let matched = self.data[d].sub.iter().position(
            |s| matches!(*s, Subtract::TimeUnwrap { column_1, .. } if column_1 == c),
        );

        let s_n = match matched {
            Some(s_n) => s_n,
            None => {
                let Some(s_n) = self.get_free_subtract(d) else {
                    error!("unable to get free subtract");
                    return None;
                };

                self.data[d].sub[s_n] = Subtract::TimeUnwrap {
                    column_1: c,
                    unwrap: 0.0,
                    prev: f64::NAN,
                    prev2: f64::NAN,
                };

                self.data_subtract(d, s_n as i32);
                s_n
            }
        };

        Some((s_n + self.data[d].column_n) as i32)
    }

    /// Derived affine column over `c`, deduplicated on parameters.
    pub fn get_subtract_scale(&mut self, d: usize, c: i32, scale: f64, offset: f64) -> Option<i32> {
        if d >= DATASET_MAX {
            error!("dataset number {d} is out of range");
            return None;
        }

        let matched = self.data[d].sub.iter().position(|s| {
            matches!(*s, Subtract::Scale { column_1, scale: sc, offset: of }
                if column_1 == c && sc == scale && of == offset)
        });

        let s_n = match matched {
            Some(s_n) => s_n,
            None => {
                let Some(s_n) = self.get_free_subtract(d) else {
                    error!("unable to get free subtract");
                    return None;
                };

                self.data[d].sub[s_n] = Subtract::Scale {
                    column_1: c,
                    scale,
                    offset,
                };

                self.data_subtract(d, s_n as i32);
                s_n
            }
        };

        Some((s_n + self.data[d].column_n) as i32)
    }

    /// Derived resample column; never deduplicated.
    pub fn get_subtract_resample(
        &mut self,
        d: usize,
        c_x: i32,
        in_d: usize,
        in_c_x: i32,
        in_c_y: i32,
    ) -> Option<i32> {
        if d >= DATASET_MAX || in_d >= DATASET_MAX {
            error!("dataset number is out of range");
            return None;
        }

        let Some(s_n) = self.get_free_subtract(d) else {
            error!("unable to get free subtract");
            return None;
        };

        self.data[d].sub[s_n] = Subtract::Resample {
            column_x: c_x,
            in_data_n: in_d,
            in_column_x: in_c_x,
            in_column_y: in_c_y,
        };

        self.data_subtract(d, s_n as i32);

        Some((s_n + self.data[d].column_n) as i32)
    }

    /// Derived binary column `c_1 op c_2`.
    pub fn get_subtract_binary(&mut self, d: usize, op: BinaryOp, c_1: i32, c_2: i32) -> Option<i32> {
        if d >= DATASET_MAX {
            error!("dataset number {d} is out of range");
            return None;
        }

        let column_top = (self.data[d].column_n + SUBTRACT_MAX) as i32;

        if !(-1..column_top).contains(&c_1) {
            error!("column number {c_1} is out of range");
            return None;
        }

        if !(-1..column_top).contains(&c_2) {
            error!("column number {c_2} is out of range");
            return None;
        }

        let Some(s_n) = self.get_free_subtract(d) else {
            error!("unable to get free subtract");
            return None;
        };

        self.data[d].sub[s_n] = Subtract::Binary {
            op,
            column_1: c_1,
            column_2: c_2,
        };

        self.data_subtract(d, s_n as i32);

        Some((s_n + self.data[d].column_n) as i32)
    }
}
