//! Progressive draw: a time-budgeted trial pass that clips rows into
//! sketches, and the replay that rasterizes the last complete frame.

use crate::backend::{palette, Clock, Rasterizer, TextMetrics};
use crate::figure::Drawing;
use crate::plot::{DataBoxKind, Plot, FIGURE_MAX};

use super::sketch::SketchPhase;

fn cell(row: &[f64], c: i32, id: i64) -> f64 {
    if c < 0 {
        id as f64
    } else {
        row[c as usize]
    }
}

impl Plot {
    /// Should the trial pass scan chunk `k`, judged by the cached
    /// range mapped through the pixel transform with a 16 px margin?
    fn trial_chunk_job(
        &self,
        entry: usize,
        k: usize,
        scale: f64,
        offset: f64,
        horizontal: bool,
    ) -> bool {
        let chunk = self.rcache.entries[entry].chunks[k];

        if !chunk.computed {
            return true;
        }

        if !chunk.finite {
            return false;
        }

        let im_min = chunk.fmin * scale + offset;
        let im_max = chunk.fmax * scale + offset;

        if horizontal {
            !(im_max < (self.viewport.min_x - 16) as f64
                || im_min > (self.viewport.max_x + 16) as f64)
        } else {
            !(im_min < (self.viewport.min_y - 16) as f64
                || im_max > (self.viewport.max_y + 16) as f64)
        }
    }

    /// One chunk's worth of trial output for a figure; yields at the
    /// chunk boundary with the cursor state saved for resumption.
    fn draw_figure_trial(&mut self, f_n: usize, rast: &mut dyn Rasterizer) {
        let ncolor = if self.figure[f_n].hidden {
            palette::HIDDEN
        } else {
            palette::FIGURE + f_n
        };

        let fdrawing = self.figure[f_n].drawing;
        let fwidth = self.figure[f_n].width;

        let d = self.figure[f_n].data_n;
        let c_x = self.figure[f_n].column_x;
        let c_y = self.figure[f_n].column_y;

        let xnr = self.range_cache_fetch(d, c_x);
        let ynr = self.range_cache_fetch(d, c_y);

        let (scale_x, offset_x) = self.axis_pixel_transform(self.figure[f_n].axis_x);
        let (scale_y, offset_y) = self.axis_pixel_transform(self.figure[f_n].axis_y);

        let vp = self.viewport;

        let mut cur = self.draw[f_n].cur;
        let top_id = cur.id + self.data[d].rows_per_chunk() as i64;
        let mut k_cached: i32 = -1;

        self.sketch_chunk_setup(f_n);

        match fdrawing {
            Drawing::Line | Drawing::Dash => {
                let mut skipped = self.draw[f_n].skipped;
                let mut line = self.draw[f_n].line;
                let mut last_x = self.draw[f_n].last_x;
                let mut last_y = self.draw[f_n].last_y;
                let mut last_im_x = last_x * scale_x + offset_x;
                let mut last_im_y = last_y * scale_y + offset_y;

                loop {
                    let k = self.data[d].chunk_of(cur.r);
                    let mut job = true;

                    if k as i32 != k_cached {
                        job = self.trial_chunk_job(xnr, k, scale_x, offset_x, true)
                            && self.trial_chunk_job(ynr, k, scale_y, offset_y, false);

                        k_cached = k as i32;
                    }

                    if job || line {
                        if skipped {
                            self.data[d].skip(&mut cur, -1);
                            skipped = false;
                        }

                        let Some(row) = self.data[d].read(&mut cur) else {
                            self.draw[f_n].sketch = SketchPhase::Finished;
                            break;
                        };

                        let id = cur.id - 1;
                        let x = cell(row, c_x, id);
                        let y = cell(row, c_y, id);

                        let im_x = x * scale_x + offset_x;
                        let im_y = y * scale_y + offset_y;

                        if im_x.is_finite() && im_y.is_finite() {
                            if line {
                                let visible = rast.line_trial(
                                    &vp, last_im_x, last_im_y, im_x, im_y, ncolor, fwidth,
                                );

                                if visible {
                                    self.sketch_add(f_n, last_x, last_y);
                                    self.sketch_add(f_n, x, y);
                                }
                            } else {
                                line = true;
                            }

                            last_x = x;
                            last_y = y;
                            last_im_x = im_x;
                            last_im_y = im_y;
                        } else {
                            line = false;
                        }
                    }

                    if !job {
                        self.data[d].chunk_skip(&mut cur);

                        skipped = true;
                        line = false;
                    }

                    if cur.id > top_id {
                        self.draw[f_n].sketch = SketchPhase::Interrupted;
                        self.draw[f_n].cur = cur;
                        self.draw[f_n].skipped = skipped;
                        self.draw[f_n].line = line;
                        self.draw[f_n].last_x = last_x;
                        self.draw[f_n].last_y = last_y;
                        break;
                    }
                }
            }

            Drawing::Dot => loop {
                let k = self.data[d].chunk_of(cur.r);
                let mut job = true;

                if k as i32 != k_cached {
                    job = self.trial_chunk_job(xnr, k, scale_x, offset_x, true)
                        && self.trial_chunk_job(ynr, k, scale_y, offset_y, false);

                    k_cached = k as i32;
                }

                if job {
                    let Some(row) = self.data[d].read(&mut cur) else {
                        self.draw[f_n].sketch = SketchPhase::Finished;
                        break;
                    };

                    let id = cur.id - 1;
                    let x = cell(row, c_x, id);
                    let y = cell(row, c_y, id);

                    let im_x = x * scale_x + offset_x;
                    let im_y = y * scale_y + offset_y;

                    if im_x.is_finite()
                        && im_y.is_finite()
                        && rast.dot_trial(&vp, im_x, im_y, fwidth, ncolor)
                    {
                        self.sketch_add(f_n, x, y);
                    }
                } else {
                    self.data[d].chunk_skip(&mut cur);
                }

                if cur.id > top_id {
                    self.draw[f_n].sketch = SketchPhase::Interrupted;
                    self.draw[f_n].cur = cur;
                    break;
                }
            },
        }
    }

    /// Run the trial pass until every figure is finished or the frame
    /// deadline fires. Hidden figures go first in paint order; within
    /// a frame the figure lagging furthest behind is always picked.
    fn draw_figure_trial_all(&mut self, rast: &mut dyn Rasterizer, clock: &dyn Clock) {
        let mut figs = Vec::with_capacity(FIGURE_MAX);

        for f_n in 0..FIGURE_MAX {
            if self.figure[f_n].busy && self.figure[f_n].hidden {
                figs.push(f_n);
            }
        }

        for f_n in 0..FIGURE_MAX {
            if self.figure[f_n].busy && !self.figure[f_n].hidden {
                figs.push(f_n);
            }
        }

        if !self.draw_in_progress {
            for &f_n in &figs {
                let d = self.figure[f_n].data_n;

                self.draw[f_n].sketch = SketchPhase::Started;
                self.draw[f_n].cur = self.data[d].cursor_head();
                self.draw[f_n].skipped = false;
                self.draw[f_n].line = false;
            }

            self.draw_in_progress = true;
        }

        let deadline = clock.now_ms() + self.opt.frame_ms;

        rast.clear_trial();

        loop {
            let mut pick: Option<usize> = None;

            for &f_q in &figs {
                if self.draw[f_q].sketch != SketchPhase::Finished {
                    pick = match pick {
                        Some(p) if self.draw[p].cur.id <= self.draw[f_q].cur.id => Some(p),
                        _ => Some(f_q),
                    };
                }
            }

            match pick {
                Some(f_n) => self.draw_figure_trial(f_n, rast),
                None => {
                    self.sketch_garbage();
                    self.draw_in_progress = false;
                    break;
                }
            }

            if clock.now_ms() >= deadline {
                break;
            }
        }
    }

    /// Replay the promoted sketch list with the current axis
    /// transforms; a pure zoom or pan can reuse the previous frame.
    fn draw_sketch(&mut self, rast: &mut dyn Rasterizer) {
        let vp = self.viewport;
        let mut h = self.sketch.todraw;

        rast.dash_reset();

        while h >= 0 {
            let f_n = self.sketch.chunks[h as usize].figure_n;

            let ncolor = if self.figure[f_n].hidden {
                palette::HIDDEN
            } else {
                palette::FIGURE + f_n
            };

            let fdrawing = self.sketch.chunks[h as usize].drawing;
            let fwidth = self.sketch.chunks[h as usize].width;

            let (scale_x, offset_x) = self.axis_pixel_transform(self.figure[f_n].axis_x);
            let (scale_y, offset_y) = self.axis_pixel_transform(self.figure[f_n].axis_y);

            let length = self.sketch.chunks[h as usize].length;

            let Some(buf) = self.sketch.chunks[h as usize].chunk.as_deref() else {
                h = self.sketch.chunks[h as usize].linked;
                continue;
            };

            match fdrawing {
                Drawing::Line => {
                    let mut n = 0;
                    while n + 3 < length {
                        let x0 = buf[n] * scale_x + offset_x;
                        let y0 = buf[n + 1] * scale_y + offset_y;
                        let x1 = buf[n + 2] * scale_x + offset_x;
                        let y1 = buf[n + 3] * scale_y + offset_y;

                        rast.canvas_line(&vp, x0, y0, x1, y1, ncolor, fwidth);
                        n += 4;
                    }
                }
                Drawing::Dash => {
                    let dash = self.opt.layout.drawing_dash;
                    let space = self.opt.layout.drawing_space;

                    let mut n = 0;
                    while n + 3 < length {
                        let x0 = buf[n] * scale_x + offset_x;
                        let y0 = buf[n + 1] * scale_y + offset_y;
                        let x1 = buf[n + 2] * scale_x + offset_x;
                        let y1 = buf[n + 3] * scale_y + offset_y;

                        rast.canvas_dash(&vp, x0, y0, x1, y1, ncolor, fwidth, dash, space);
                        n += 4;
                    }
                }
                Drawing::Dot => {
                    let mut n = 0;
                    while n + 1 < length {
                        let x = buf[n] * scale_x + offset_x;
                        let y = buf[n + 1] * scale_y + offset_y;

                        rast.canvas_dot(&vp, x, y, fwidth, ncolor);
                        n += 2;
                    }
                }
            }

            h = self.sketch.chunks[h as usize].linked;
        }
    }

    /// Compose one frame: trial progress, sketch replay, overlays.
    pub fn draw(
        &mut self,
        rast: &mut dyn Rasterizer,
        font: &dyn TextMetrics,
        clock: &dyn Clock,
    ) {
        if self.slice_range_on != 0 {
            self.slice_light_draw(rast);
        }

        self.draw_figure_trial_all(rast, clock);

        rast.clear_canvas();
        self.draw_sketch(rast);

        if self.mark_on {
            self.mark_draw(rast);
        }

        let vp = self.viewport;
        rast.flush_canvas(&vp);
        rast.clear_canvas();

        rast.dash_reset();

        self.draw_axis_all(rast, font);

        if self.slice_on {
            self.slice_draw(rast);
        }

        self.legend_draw(rast);

        rast.flush_canvas(&vp);

        if self.data_box.kind != DataBoxKind::Free {
            self.data_box_draw(rast);
        }
    }
}
