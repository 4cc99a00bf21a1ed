//! Per-column chunk range cache and the range queries built on it.

use crate::dataset::store::CHUNK_MAX;
use crate::plot::Plot;

pub const RCACHE_SIZE: usize = 40;

#[derive(Clone, Copy, Default)]
pub(crate) struct ChunkRange {
    pub computed: bool,
    /// Unset when the chunk holds no finite value; min/max are then
    /// meaningless and queries must fall back to a scan.
    pub finite: bool,
    pub fmin: f64,
    pub fmax: f64,
}

pub(crate) struct RangeEntry {
    pub busy: bool,
    pub data_n: usize,
    pub column_n: i32,
    /// Aggregate over the whole column is up to date.
    pub cached: bool,
    pub fmin: f64,
    pub fmax: f64,
    pub chunks: Box<[ChunkRange]>,
}

impl Default for RangeEntry {
    fn default() -> Self {
        Self {
            busy: false,
            data_n: 0,
            column_n: 0,
            cached: false,
            fmin: 0.0,
            fmax: 0.0,
            chunks: vec![ChunkRange::default(); CHUNK_MAX].into_boxed_slice(),
        }
    }
}

/// Fixed set of `(dataset, column)` entries with rotating allocation.
pub struct RangeCache {
    pub(crate) entries: Vec<RangeEntry>,
    rotor: usize,
    wipe_data_n: i32,
    wipe_chunk_n: i32,
}

impl Default for RangeCache {
    fn default() -> Self {
        Self {
            entries: (0..RCACHE_SIZE).map(|_| RangeEntry::default()).collect(),
            rotor: 0,
            wipe_data_n: -1,
            wipe_chunk_n: -1,
        }
    }
}

impl RangeCache {
    fn lookup(&self, d: usize, c: i32) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.busy && e.data_n == d && e.column_n == c)
    }

    /// Invalidate chunk `k` of every entry of dataset `d`. The memo
    /// keeps a streak of writes into one chunk down to a single pass.
    pub(crate) fn wipe_once(&mut self, d: usize, k: usize) {
        if self.wipe_data_n == d as i32 && self.wipe_chunk_n == k as i32 {
            return;
        }

        for e in self.entries.iter_mut() {
            if e.busy && e.data_n == d {
                e.chunks[k].computed = false;
                e.cached = false;
            }
        }

        self.wipe_data_n = d as i32;
        self.wipe_chunk_n = k as i32;
    }

    /// Release every entry of dataset `d`.
    pub(crate) fn clean(&mut self, d: usize) {
        for e in self.entries.iter_mut() {
            if e.data_n == d {
                e.busy = false;
            }
        }
    }

}

/// Min/max accumulator over finite samples.
#[derive(Clone, Copy, Default)]
pub(crate) struct RangeAcc {
    pub started: bool,
    pub fmin: f64,
    pub fmax: f64,
}

impl RangeAcc {
    pub fn fold(&mut self, fmin: f64, fmax: f64) {
        if self.started {
            self.fmin = self.fmin.min(fmin);
            self.fmax = self.fmax.max(fmax);
        } else {
            self.started = true;
            self.fmin = fmin;
            self.fmax = fmax;
        }
    }

    pub fn put(&mut self, fval: f64) {
        self.fold(fval, fval);
    }
}

impl Plot {
    /// Release range-cache entries pointing into the derived-column
    /// region; run after the garbage sweep frees slots.
    pub(crate) fn rcache_subtract_clean(&mut self) {
        for e in self.rcache.entries.iter_mut() {
            if !e.busy {
                continue;
            }

            if let Some(data) = self.data.get(e.data_n) {
                if data.is_allocated() && e.column_n >= data.column_n() as i32 {
                    e.busy = false;
                }
            }
        }
    }

    /// Ensure a range-cache entry for `(d, c)` exists and every chunk
    /// of it is computed; the chunk under the tail is always rescanned.
    /// Returns the entry index.
    pub(crate) fn range_cache_fetch(&mut self, d: usize, c: i32) -> usize {
        let x = match self.rcache.lookup(d, c) {
            Some(x) => {
                if self.rcache.entries[x].cached {
                    return x;
                }
                x
            }
            None => {
                let x = self.rcache.rotor;
                self.rcache.rotor = if self.rcache.rotor < RCACHE_SIZE - 1 {
                    self.rcache.rotor + 1
                } else {
                    0
                };

                for chunk in self.rcache.entries[x].chunks.iter_mut() {
                    chunk.computed = false;
                }
                x
            }
        };

        let tail_chunk = self.data[d].chunk_of(self.data[d].tail_n());
        let mut cur = self.data[d].cursor_head();
        let mut agg = RangeAcc::default();

        loop {
            let k = self.data[d].chunk_of(cur.r);
            let known = self.rcache.entries[x].chunks[k];

            let job = !known.computed || k == tail_chunk;

            if job {
                let mut scan = RangeAcc {
                    started: known.computed && known.finite,
                    fmin: known.fmin,
                    fmax: known.fmax,
                };

                loop {
                    if self.data[d].chunk_of(cur.r) != k {
                        break;
                    }

                    let Some(row) = self.data[d].read(&mut cur) else {
                        break;
                    };

                    let id = cur.id - 1;
                    let fval = if c < 0 { id as f64 } else { row[c as usize] };

                    if fval.is_finite() {
                        scan.put(fval);
                    }
                }

                self.rcache.entries[x].chunks[k] = ChunkRange {
                    computed: true,
                    finite: scan.started,
                    fmin: scan.fmin,
                    fmax: scan.fmax,
                };
            } else {
                self.data[d].chunk_skip(&mut cur);
            }

            let chunk = self.rcache.entries[x].chunks[k];
            if chunk.finite {
                agg.fold(chunk.fmin, chunk.fmax);
            }

            if self.data[d].at_tail(&cur) {
                break;
            }
        }

        let e = &mut self.rcache.entries[x];
        e.busy = true;
        e.data_n = d;
        e.column_n = c;
        e.cached = true;
        e.fmin = agg.fmin;
        e.fmax = agg.fmax;

        self.rcache.wipe_data_n = -1;
        self.rcache.wipe_chunk_n = -1;

        x
    }

    /// Unconditional `[min, max]` over the finite values of a column.
    pub fn data_range(&mut self, d: usize, c: i32) -> (f64, f64) {
        if self.data.get(d).map_or(true, |data| !data.is_allocated()) {
            return (0.0, 0.0);
        }

        let x = self.range_cache_fetch(d, c);
        (self.rcache.entries[x].fmin, self.rcache.entries[x].fmax)
    }

    /// Extent of column `c` restricted to rows whose `c_cond` value
    /// maps into the normalized `[0, 1]` window under
    /// `v * scale + offset`. Whole chunks are skipped when fully
    /// outside and absorbed from the cache when fully inside.
    pub(crate) fn range_cond(
        &mut self,
        d: usize,
        c: i32,
        c_cond: i32,
        scale: f64,
        offset: f64,
        acc: &mut RangeAcc,
    ) {
        let xn = self.range_cache_fetch(d, c_cond);
        let yn = self.range_cache_fetch(d, c);

        let mut cur = self.data[d].cursor_head();

        loop {
            let k = self.data[d].chunk_of(cur.r);
            let mut job = true;

            let cond_entry = &self.rcache.entries[xn];
            if cond_entry.busy
                && cond_entry.data_n == d
                && cond_entry.column_n == c_cond
                && cond_entry.chunks[k].computed
            {
                if cond_entry.chunks[k].finite {
                    let vmin = cond_entry.chunks[k].fmin * scale + offset;
                    let vmax = cond_entry.chunks[k].fmax * scale + offset;

                    let val_entry = &self.rcache.entries[yn];
                    let val_known = val_entry.busy
                        && val_entry.data_n == d
                        && val_entry.column_n == c
                        && val_entry.chunks[k].computed;

                    if val_known
                        && (0.0..=1.0).contains(&vmin)
                        && (0.0..=1.0).contains(&vmax)
                    {
                        job = false;

                        let chunk = self.rcache.entries[yn].chunks[k];
                        if chunk.finite {
                            acc.fold(chunk.fmin, chunk.fmax);
                        }
                    } else if vmin > 1.0 || vmax < 0.0 {
                        job = false;
                    }
                } else {
                    job = false;
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
                    let fval = if c < 0 { id as f64 } else { row[c as usize] };
                    let fcond = if c_cond < 0 {
                        id as f64
                    } else {
                        row[c_cond as usize]
                    };

                    let fcond = fcond * scale + offset;

                    if (0.0..=1.0).contains(&fcond) && fval.is_finite() {
                        acc.put(fval);
                    }
                }
            } else {
                self.data[d].chunk_skip(&mut cur);
            }

            if self.data[d].at_tail(&cur) {
                break;
            }
        }
    }

    /// Extent of column `c` of dataset `d` conditional on axis `a`
    /// being in view, collected over every figure that binds them
    /// (directly or through a slave of `a`). Falls back to the
    /// unconditional range when no figure conditions apply.
    pub(crate) fn range_axis(&mut self, d: usize, c: i32, a: usize) -> (f64, f64) {
        let mut acc = RangeAcc::default();

        for f_n in 0..self.figure.len() {
            let fig = &self.figure[f_n];

            if !fig.busy || fig.hidden || fig.data_n != d {
                continue;
            }

            let mut job = false;
            let mut scale = 1.0;
            let mut offset = 0.0;
            let mut c_cond = -1;

            if fig.axis_x == a && fig.column_y == c {
                c_cond = fig.column_x;
                job = true;
            } else if fig.axis_y == a && fig.column_x == c {
                c_cond = fig.column_y;
                job = true;
            }

            let xn = fig.axis_x;
            let yn = fig.axis_y;

            if self.axis[xn].slave == Some(a) && fig.column_y == c {
                scale = self.axis[xn].scale;
                offset = self.axis[xn].offset;
                c_cond = fig.column_x;
                job = true;
            } else if self.axis[yn].slave == Some(a) && fig.column_x == c {
                scale = self.axis[yn].scale;
                offset = self.axis[yn].offset;
                c_cond = fig.column_y;
                job = true;
            }

            if job {
                let offset = offset * self.axis[a].scale + self.axis[a].offset;
                let scale = scale * self.axis[a].scale;

                self.range_cond(d, c, c_cond, scale, offset, &mut acc);
            }
        }

        if acc.started {
            (acc.fmin, acc.fmax)
        } else {
            self.data_range(d, c)
        }
    }
}
