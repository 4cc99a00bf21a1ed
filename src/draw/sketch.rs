//! Sketch chunks: viewport-clipped data-space segments produced by
//! the trial pass and replayed by the rasterizer. Chunks live in a
//! fixed pool threaded into three index-linked lists.

use tracing::error;

use crate::figure::Drawing;
use crate::plot::Plot;

pub const SKETCH_MAX: usize = 1000;

/// Doubles per sketch chunk (pairs of `(X, Y)` in data coordinates).
pub const SKETCH_CHUNK_SIZE: usize = 4096;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SketchPhase {
    Started,
    Interrupted,
    #[default]
    Finished,
}

pub(crate) struct SketchChunk {
    pub figure_n: usize,
    pub drawing: Drawing,
    pub width: i32,
    pub chunk: Option<Box<[f64]>>,
    pub length: usize,
    pub linked: i32,
}

/// The pool. `garbage` is the free list; `current` collects this
/// frame's output; `todraw` holds the last completed frame.
pub(crate) struct SketchPool {
    pub chunks: Vec<SketchChunk>,
    pub garbage: i32,
    pub current: i32,
    pub current_end: i32,
    pub todraw: i32,
}

impl Default for SketchPool {
    fn default() -> Self {
        let chunks = (0..SKETCH_MAX)
            .map(|n| SketchChunk {
                figure_n: 0,
                drawing: Drawing::Line,
                width: 0,
                chunk: None,
                length: 0,
                linked: if n + 1 < SKETCH_MAX { n as i32 + 1 } else { -1 },
            })
            .collect();

        Self {
            chunks,
            garbage: 0,
            current: -1,
            current_end: -1,
            todraw: -1,
        }
    }
}

impl Plot {
    /// Make sure the figure has an open sketch chunk matching its
    /// current style, pulling a fresh one from the free list when the
    /// open one is full or stale.
    pub(crate) fn sketch_chunk_setup(&mut self, f_n: usize) {
        let h = self.draw[f_n].list_self;

        if h >= 0 {
            let c = &self.sketch.chunks[h as usize];

            if c.figure_n == f_n
                && c.drawing == self.figure[f_n].drawing
                && c.width == self.figure[f_n].width
                && c.length < SKETCH_CHUNK_SIZE
            {
                return;
            }
        }

        if self.sketch.garbage < 0 {
            error!("unable to get free sketch chunk");
            self.draw[f_n].list_self = -1;
            return;
        }

        let h_new = self.sketch.garbage;
        self.sketch.garbage = self.sketch.chunks[h_new as usize].linked;

        {
            let c = &mut self.sketch.chunks[h_new as usize];
            c.figure_n = f_n;
            c.drawing = self.figure[f_n].drawing;
            c.width = self.figure[f_n].width;

            if c.chunk.is_none() {
                c.chunk = Some(vec![0.0; SKETCH_CHUNK_SIZE].into_boxed_slice());
            }

            c.length = 0;
        }

        if h >= 0 {
            self.sketch.chunks[h_new as usize].linked = self.sketch.chunks[h as usize].linked;
            self.sketch.chunks[h as usize].linked = h_new;

            if h == self.sketch.current_end {
                self.sketch.current_end = h_new;
            }
        } else {
            self.sketch.chunks[h_new as usize].linked = -1;

            if self.sketch.current >= 0 {
                self.sketch.chunks[self.sketch.current_end as usize].linked = h_new;
                self.sketch.current_end = h_new;
            } else {
                self.sketch.current = h_new;
                self.sketch.current_end = h_new;
            }
        }

        self.draw[f_n].list_self = h_new;
    }

    /// Append one data-space point to the figure's open chunk.
    pub(crate) fn sketch_add(&mut self, f_n: usize, x: f64, y: f64) {
        let h = self.draw[f_n].list_self;

        if h < 0 {
            return;
        }

        {
            let c = &mut self.sketch.chunks[h as usize];
            let Some(buf) = c.chunk.as_mut() else {
                return;
            };

            buf[c.length] = x;
            buf[c.length + 1] = y;
            c.length += 2;

            if c.length < SKETCH_CHUNK_SIZE {
                return;
            }
        }

        self.sketch_chunk_setup(f_n);
    }

    fn recycle(&mut self, mut h: i32) {
        while h >= 0 {
            let linked = self.sketch.chunks[h as usize].linked;

            self.sketch.chunks[h as usize].linked = self.sketch.garbage;
            self.sketch.garbage = h;

            h = linked;
        }
    }

    /// End of frame: discard the drawn list and promote the one just
    /// built.
    pub(crate) fn sketch_garbage(&mut self) {
        let todraw = self.sketch.todraw;
        self.recycle(todraw);

        self.sketch.todraw = self.sketch.current;
        self.sketch.current = -1;
        self.sketch.current_end = -1;

        for state in self.draw.iter_mut() {
            state.list_self = -1;
        }
    }

    /// Return every sketch chunk to the free pool and stop the frame
    /// in progress.
    pub fn sketch_clean(&mut self) {
        let todraw = self.sketch.todraw;
        self.recycle(todraw);

        let current = self.sketch.current;
        self.recycle(current);

        self.sketch.todraw = -1;
        self.sketch.current = -1;
        self.sketch.current_end = -1;

        for state in self.draw.iter_mut() {
            state.list_self = -1;
        }

        self.draw_in_progress = false;
    }
}
