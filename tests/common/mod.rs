//! Shared test doubles: a recording rasterizer, a fixed-metrics font,
//! a steppable clock and a naive least-squares solver.

#![allow(dead_code)]

use std::cell::Cell;

use scopechart::{Clock, LeastSquares, Plot, Rasterizer, TextLayout, TextMetrics, Viewport};

/// Rasterizer that records every canvas call and accepts every trial.
#[derive(Default)]
pub struct RecordRaster {
    pub lines: Vec<(f64, f64, f64, f64, usize)>,
    pub dashes: Vec<(f64, f64, f64, f64, usize)>,
    pub dots: Vec<(f64, f64, usize)>,
    pub marks: Vec<(f64, f64, usize)>,
    pub texts: Vec<(i32, i32, String, usize)>,
    pub rects: usize,
    pub trial_calls: usize,
}

impl RecordRaster {
    pub fn clear(&mut self) {
        self.lines.clear();
        self.dashes.clear();
        self.dots.clear();
        self.marks.clear();
        self.texts.clear();
        self.rects = 0;
        self.trial_calls = 0;
    }
}

impl Rasterizer for RecordRaster {
    fn clear_trial(&mut self) {}

    fn line_trial(
        &mut self,
        _vp: &Viewport,
        _x0: f64,
        _y0: f64,
        _x1: f64,
        _y1: f64,
        _color: usize,
        _width: i32,
    ) -> bool {
        self.trial_calls += 1;
        true
    }

    fn dot_trial(&mut self, _vp: &Viewport, _x: f64, _y: f64, _size: i32, _color: usize) -> bool {
        self.trial_calls += 1;
        true
    }

    fn canvas_line(
        &mut self,
        _vp: &Viewport,
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        color: usize,
        _width: i32,
    ) {
        self.lines.push((x0, y0, x1, y1, color));
    }

    fn canvas_dash(
        &mut self,
        _vp: &Viewport,
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        color: usize,
        _width: i32,
        _dash: i32,
        _space: i32,
    ) {
        self.dashes.push((x0, y0, x1, y1, color));
    }

    fn canvas_dot(&mut self, _vp: &Viewport, x: f64, y: f64, _size: i32, color: usize) {
        self.dots.push((x, y, color));
    }

    fn canvas_mark(
        &mut self,
        _vp: &Viewport,
        x: f64,
        y: f64,
        _size: i32,
        _shape: usize,
        color: usize,
        _width: i32,
    ) {
        self.marks.push((x, y, color));
    }

    fn dash_reset(&mut self) {}

    fn line(&mut self, _clip: &Viewport, _x0: i32, _y0: i32, _x1: i32, _y1: i32, _color: usize) {}

    fn line_dashed(
        &mut self,
        _clip: &Viewport,
        _x0: i32,
        _y0: i32,
        _x1: i32,
        _y1: i32,
        _color: usize,
        _dash: i32,
        _space: i32,
    ) {
    }

    fn fill_rect(&mut self, _x0: i32, _y0: i32, _x1: i32, _y1: i32, _color: usize) {
        self.rects += 1;
    }

    fn clip_rect(&mut self, _vp: &Viewport, _x0: f64, _y0: f64, _x1: f64, _y1: f64, _color: usize) {
        self.rects += 1;
    }

    fn clear_canvas(&mut self) {}

    fn flush_canvas(&mut self, _vp: &Viewport) {}

    fn text(&mut self, x: i32, y: i32, text: &str, _layout: TextLayout, color: usize) {
        self.texts.push((x, y, text.to_owned(), color));
    }
}

/// Monospaced 8x14 font without touching any real font backend.
pub struct FixedFont;

impl TextMetrics for FixedFont {
    fn size(&self, text: &str) -> (i32, i32) {
        (8 * text.chars().count() as i32, 14)
    }

    fn height(&self) -> i32 {
        14
    }

    fn glyph_width(&self) -> i32 {
        8
    }
}

/// Clock advancing by a fixed step per reading. A zero step freezes
/// time, which makes the frame deadline unreachable.
pub struct StepClock {
    t: Cell<u64>,
    step: u64,
}

impl StepClock {
    pub fn frozen() -> Self {
        Self {
            t: Cell::new(0),
            step: 0,
        }
    }

    pub fn stepping(step: u64) -> Self {
        Self {
            t: Cell::new(0),
            step,
        }
    }
}

impl Clock for StepClock {
    fn now_ms(&self) -> u64 {
        let t = self.t.get();
        self.t.set(t + self.step);
        t
    }
}

/// Straightforward normal-equations solver, good enough for the small
/// and well-conditioned fits the tests run.
#[derive(Default)]
pub struct NaiveLse {
    nx: usize,
    nz: usize,
    rows: Vec<Vec<f64>>,
    b: Vec<f64>,
    e: Vec<f64>,
}

impl LeastSquares for NaiveLse {
    fn initiate(&mut self, _cascades: usize, nx: usize, nz: usize) {
        self.nx = nx;
        self.nz = nz;
        self.rows.clear();
        self.b.clear();
        self.e.clear();
    }

    fn insert(&mut self, row: &[f64]) {
        self.rows.push(row.to_vec());
    }

    fn finalise(&mut self) {
        let nx = self.nx;

        if nx == 0 || self.rows.len() < nx {
            return;
        }

        // M = AᵀA, v = Aᵀz for the first observed column.
        let mut m = vec![vec![0.0; nx + 1]; nx];

        for row in &self.rows {
            for i in 0..nx {
                for j in 0..nx {
                    m[i][j] += row[i] * row[j];
                }
                m[i][nx] += row[i] * row[nx];
            }
        }

        // Gaussian elimination with partial pivoting.
        for col in 0..nx {
            let mut pivot = col;
            for r in col + 1..nx {
                if m[r][col].abs() > m[pivot][col].abs() {
                    pivot = r;
                }
            }
            m.swap(col, pivot);

            let lead = m[col][col];
            if lead.abs() < 1e-300 {
                return;
            }

            for r in 0..nx {
                if r != col {
                    let factor = m[r][col] / lead;
                    for c in col..=nx {
                        m[r][c] -= factor * m[col][c];
                    }
                }
            }
        }

        self.b = (0..nx).map(|i| m[i][nx] / m[i][i]).collect();

        let mut sq = 0.0;
        for row in &self.rows {
            let fit: f64 = (0..nx).map(|i| self.b[i] * row[i]).sum();
            sq += (row[nx] - fit) * (row[nx] - fit);
        }

        let denom = (self.rows.len() as f64 - 1.0).max(1.0);
        self.e = vec![(sq / denom).sqrt()];
    }

    fn solution(&self) -> &[f64] {
        &self.b
    }

    fn deviation(&self) -> &[f64] {
        &self.e
    }
}

/// Engine with an 800x600 screen already laid out.
pub fn plot_on_screen() -> Plot {
    let mut pl = Plot::default();
    pl.set_screen(Viewport::new(0, 0, 800, 600));
    pl.layout(&FixedFont);
    pl
}
