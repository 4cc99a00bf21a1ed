use tracing::error;

use crate::dataset::subtract::Subtract;

/// Number of derived-column slots appended to every dataset row.
pub const SUBTRACT_MAX: usize = 10;

/// Upper bound of chunk slots per dataset.
pub const CHUNK_MAX: usize = 2000;

/// Decompressed chunk buffers floating over the chunk array when the
/// dataset is compressed.
pub const CHUNK_CACHE: usize = 8;

/// Target byte size of one chunk; the row count per chunk is the
/// smallest power of two reaching it.
pub const CHUNK_BYTES: usize = 65536;

/// Ring position paired with the logical id of the row it points at.
/// Iteration stops on the id, which keeps a completely full ring
/// (`tail == head`) unambiguous.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor {
    pub r: usize,
    pub id: i64,
}

struct CacheSlot {
    chunk_n: usize,
    dirty: bool,
    buf: Option<Box<[f64]>>,
}

/// One dataset: a ring of rows spread over fixed-size chunks, with
/// `column_n` stored fields and `SUBTRACT_MAX` derived slots per row.
pub struct Dataset {
    pub(crate) column_n: usize,
    pub(crate) length_n: usize,
    pub(crate) head_n: usize,
    pub(crate) rows: usize,
    /// Logical id of the row at `head_n`; grows through evictions.
    pub(crate) id_n: i64,
    /// First logical id the unbounded derived pass has not covered.
    pub(crate) sub_id: i64,
    pub(crate) chunk_shift: u32,
    pub(crate) chunk_mask: usize,
    compress: bool,
    chunks: Vec<Option<Box<[f64]>>>,
    packed: Vec<Option<Vec<u8>>>,
    cache: Vec<CacheSlot>,
    cache_id: usize,
    /// Group assignment per column; index 0 is the row-index column.
    map: Vec<i32>,
    pub(crate) sub: Vec<Subtract>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            column_n: 0,
            length_n: 0,
            head_n: 0,
            rows: 0,
            id_n: 0,
            sub_id: 0,
            chunk_shift: 0,
            chunk_mask: 0,
            compress: false,
            chunks: Vec::new(),
            packed: Vec::new(),
            cache: Vec::new(),
            cache_id: 0,
            map: Vec::new(),
            sub: Vec::new(),
        }
    }
}

impl Dataset {
    pub fn is_allocated(&self) -> bool {
        self.column_n != 0
    }

    pub fn column_n(&self) -> usize {
        self.column_n
    }

    pub fn length(&self) -> usize {
        self.length_n
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn head_id(&self) -> i64 {
        self.id_n
    }

    /// Derived slots of this dataset, in evaluation order.
    pub fn subtracts(&self) -> &[Subtract] {
        &self.sub
    }

    pub(crate) fn row_width(&self) -> usize {
        self.column_n + SUBTRACT_MAX
    }

    pub(crate) fn rows_per_chunk(&self) -> usize {
        1usize << self.chunk_shift
    }

    /// Ring index one past the newest row.
    pub(crate) fn tail_n(&self) -> usize {
        if self.length_n == 0 {
            return 0;
        }
        let t = self.head_n + self.rows;
        if t >= self.length_n {
            t - self.length_n
        } else {
            t
        }
    }

    pub(crate) fn chunk_of(&self, r: usize) -> usize {
        r >> self.chunk_shift
    }

    pub fn space_left(&self) -> usize {
        self.length_n - self.rows
    }

    pub fn cursor_head(&self) -> Cursor {
        Cursor {
            r: self.head_n,
            id: self.id_n,
        }
    }

    pub fn cursor_tail(&self) -> Cursor {
        Cursor {
            r: self.tail_n(),
            id: self.id_n + self.rows as i64,
        }
    }

    /// Cursor at a logical id, clamped into the live span.
    pub fn cursor_at_id(&self, id: i64) -> Cursor {
        let off = (id - self.id_n).clamp(0, self.rows as i64) as usize;
        let mut r = self.head_n + off;
        if self.length_n != 0 && r >= self.length_n {
            r -= self.length_n;
        }
        Cursor {
            r,
            id: self.id_n + off as i64,
        }
    }

    pub(crate) fn at_tail(&self, cur: &Cursor) -> bool {
        cur.id >= self.id_n + self.rows as i64
    }

    /// Configure a fresh dataset or reset an existing one. The column
    /// count of an existing dataset is immutable.
    pub(crate) fn alloc(&mut self, column_n: usize, length_n: usize, compress: bool) -> bool {
        if self.column_n != 0 {
            if self.column_n != column_n {
                error!("number of columns cannot be changed");
                return false;
            }

            self.chunk_alloc(length_n);
            self.head_n = 0;
            self.rows = 0;
            self.id_n = 0;
            self.sub_id = 0;
            return true;
        }

        self.column_n = column_n;
        self.compress = compress;

        let width = self.row_width();
        for n in 0..30 {
            if (1usize << n) * width * std::mem::size_of::<f64>() >= CHUNK_BYTES {
                self.chunk_shift = n;
                self.chunk_mask = (1usize << n) - 1;
                break;
            }
        }

        self.chunks = (0..CHUNK_MAX).map(|_| None).collect();
        self.packed = (0..CHUNK_MAX).map(|_| None).collect();
        self.cache = (0..CHUNK_CACHE)
            .map(|_| CacheSlot {
                chunk_n: 0,
                dirty: false,
                buf: None,
            })
            .collect();
        self.cache_id = 0;

        self.chunk_alloc(length_n);

        self.head_n = 0;
        self.rows = 0;
        self.id_n = 0;
        self.sub_id = 0;

        self.map = vec![-1; column_n + SUBTRACT_MAX + 1];
        self.sub = (0..SUBTRACT_MAX).map(|_| Subtract::Free).collect();
        true
    }

    /// Shrinking resets all cursors instead of compacting the kept
    /// span; the remaining data is discarded.
    pub(crate) fn resize(&mut self, length_n: usize) {
        if length_n < self.length_n {
            self.head_n = 0;
            self.rows = 0;
            self.id_n = 0;
            self.sub_id = 0;
        }

        self.chunk_alloc(length_n);
    }

    /// Grow the ring by one whole chunk.
    pub(crate) fn grow_up(&mut self) {
        let shift = self.chunk_shift;
        let l_n = ((self.length_n >> shift) + 1) << shift;
        self.resize(l_n);
    }

    fn chunk_alloc(&mut self, mut length_n: usize) {
        let mut k_n = (length_n >> self.chunk_shift)
            + usize::from(length_n & self.chunk_mask != 0);

        if k_n > CHUNK_MAX {
            k_n = CHUNK_MAX;
            length_n = k_n << self.chunk_shift;
            error!("dataset length clamped to {} rows", length_n);
        }

        if self.compress {
            for p in self.packed.iter_mut().skip(k_n) {
                *p = None;
            }
        } else {
            let words = self.rows_per_chunk() * self.row_width();

            for k in 0..k_n {
                if self.chunks[k].is_none() {
                    self.chunks[k] = Some(vec![0.0; words].into_boxed_slice());
                }
            }

            for c in self.chunks.iter_mut().skip(k_n) {
                *c = None;
            }
        }

        self.length_n = length_n;
    }

    /// Release all storage; the dataset returns to the unallocated
    /// state and may be re-allocated with a different column count.
    pub(crate) fn clean(&mut self) {
        if self.column_n == 0 {
            return;
        }

        self.column_n = 0;
        self.length_n = 0;
        self.chunks = Vec::new();
        self.packed = Vec::new();
        self.cache = Vec::new();
        self.map = Vec::new();
        self.sub = Vec::new();
    }

    /// Bytes currently held by resident buffers and compressed copies.
    pub fn memory_usage(&self) -> u64 {
        let chunk_bytes = (self.rows_per_chunk() * self.row_width()) as u64 * 8;
        let mut usage = 0;

        for c in &self.chunks {
            if c.is_some() {
                usage += chunk_bytes;
            }
        }

        for s in &self.cache {
            if s.buf.is_some() {
                usage += chunk_bytes;
            }
        }

        for p in self.packed.iter().flatten() {
            usage += p.len() as u64;
        }

        usage
    }

    /// Bytes the dataset would occupy fully decompressed.
    pub fn memory_uncompressed(&self) -> u64 {
        let chunk_bytes = (self.rows_per_chunk() * self.row_width()) as u64 * 8;
        let mut usage = 0;

        for k in 0..self.chunks.len() {
            let resident = self.chunks[k].is_some()
                || self.packed[k].is_some()
                || self
                    .cache
                    .iter()
                    .any(|s| s.buf.is_some() && s.chunk_n == k);

            if resident {
                usage += chunk_bytes;
            }
        }

        usage
    }

    fn cache_node(&mut self) -> usize {
        for (n, slot) in self.cache.iter().enumerate() {
            if slot.buf.is_none() {
                return n;
            }
        }

        // Rotate, but never evict the chunk the tail is writing into.
        let tail_chunk = self.chunk_of(self.tail_n());

        let mut n = if self.cache_id < CHUNK_CACHE - 1 {
            self.cache_id + 1
        } else {
            0
        };

        if self.cache[n].chunk_n == tail_chunk {
            n = if n < CHUNK_CACHE - 1 { n + 1 } else { 0 };
        }

        self.cache_id = n;
        n
    }

    fn cache_fetch(&mut self, k: usize) {
        let words = self.rows_per_chunk() * self.row_width();
        let x = self.cache_node();

        let mut buf = match self.cache[x].buf.take() {
            Some(buf) => {
                let kz = self.cache[x].chunk_n;

                if self.cache[x].dirty {
                    let bytes: &[u8] = bytemuck::cast_slice(&buf);
                    self.packed[kz] = Some(lz4_flex::block::compress(bytes));
                }

                buf
            }
            None => vec![0.0; words].into_boxed_slice(),
        };

        if let Some(packed) = self.packed[k].as_ref() {
            let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut buf);

            match lz4_flex::block::decompress_into(packed, bytes) {
                Ok(n) if n == bytes.len() => {}
                _ => error!("unable to decompress chunk {k}"),
            }
        }

        self.cache[x].chunk_n = k;
        self.cache[x].dirty = false;
        self.cache[x].buf = Some(buf);
    }

    fn resident_slot(&self, k: usize) -> Option<usize> {
        self.cache
            .iter()
            .position(|s| s.buf.is_some() && s.chunk_n == k)
    }

    fn chunk_slice(&mut self, k: usize) -> Option<&[f64]> {
        if !self.compress {
            return self.chunks.get(k)?.as_deref();
        }

        if self.length_n == 0 {
            return None;
        }

        let pos = match self.resident_slot(k) {
            Some(pos) => pos,
            None => {
                self.cache_fetch(k);
                self.resident_slot(k)?
            }
        };

        self.cache[pos].buf.as_deref()
    }

    fn chunk_slice_mut(&mut self, k: usize) -> Option<&mut [f64]> {
        if !self.compress {
            return self.chunks.get_mut(k)?.as_deref_mut();
        }

        if self.length_n == 0 {
            return None;
        }

        let pos = match self.resident_slot(k) {
            Some(pos) => pos,
            None => {
                self.cache_fetch(k);
                self.resident_slot(k)?
            }
        };

        self.cache[pos].dirty = true;
        self.cache[pos].buf.as_deref_mut()
    }

    /// Read the row under the cursor and step forward. `None` at the
    /// tail, or when the backing chunk is gone (cursor not advanced).
    pub fn read(&mut self, cur: &mut Cursor) -> Option<&[f64]> {
        if self.at_tail(cur) {
            return None;
        }

        let k = self.chunk_of(cur.r);
        let j = cur.r & self.chunk_mask;
        let w = self.row_width();
        let last = self.length_n - 1;

        let chunk = self.chunk_slice(k)?;
        let row = &chunk[j * w..j * w + w];

        cur.r = if cur.r < last { cur.r + 1 } else { 0 };
        cur.id += 1;

        Some(row)
    }

    /// Read the row under the cursor without advancing.
    pub fn peek(&mut self, cur: &Cursor) -> Option<&[f64]> {
        if self.at_tail(cur) {
            return None;
        }

        let k = self.chunk_of(cur.r);
        let j = cur.r & self.chunk_mask;
        let w = self.row_width();

        let chunk = self.chunk_slice(k)?;
        Some(&chunk[j * w..j * w + w])
    }

    /// Writable variant of [`Dataset::read`]; marks the chunk dirty.
    /// Range-cache invalidation is the caller's duty.
    pub(crate) fn write(&mut self, cur: &mut Cursor) -> Option<&mut [f64]> {
        if self.at_tail(cur) {
            return None;
        }

        let k = self.chunk_of(cur.r);
        let j = cur.r & self.chunk_mask;
        let w = self.row_width();
        let last = self.length_n - 1;

        let chunk = self.chunk_slice_mut(k)?;
        let row = &mut chunk[j * w..j * w + w];

        cur.r = if cur.r < last { cur.r + 1 } else { 0 };
        cur.id += 1;

        Some(row)
    }

    /// Advance the cursor by `n` rows, clamped to the live span.
    pub fn skip(&self, cur: &mut Cursor, n: i64) {
        let rows = self.rows as i64;
        let off = (cur.id - self.id_n).clamp(0, rows);
        let target = (off + n).clamp(0, rows) as usize;

        let mut r = self.head_n + target;
        if self.length_n != 0 && r >= self.length_n {
            r -= self.length_n;
        }

        cur.r = r;
        cur.id = self.id_n + target as i64;
    }

    /// Advance to the first row of the next chunk (or the tail).
    pub fn chunk_skip(&self, cur: &mut Cursor) {
        let mut n = self.rows_per_chunk() - (cur.r & self.chunk_mask);
        let wrap = self.length_n.saturating_sub(cur.r);
        if wrap < n {
            n = wrap;
        }

        self.skip(cur, n as i64);
    }

    /// Append one row, evicting the oldest when full. Returns whether
    /// an eviction moved the head. The row is dropped when the target
    /// chunk is not available.
    pub(crate) fn insert_row(&mut self, row: &[f64]) -> bool {
        if row.len() < self.column_n {
            error!("insert row has {} of {} columns", row.len(), self.column_n);
            return false;
        }

        let tail = self.tail_n();
        let k = self.chunk_of(tail);
        let j = tail & self.chunk_mask;
        let w = self.row_width();
        let c_n = self.column_n;

        let Some(chunk) = self.chunk_slice_mut(k) else {
            return false;
        };

        chunk[j * w..j * w + c_n].copy_from_slice(&row[..c_n]);

        if self.rows == self.length_n {
            self.id_n += 1;
            self.head_n = if self.head_n < self.length_n - 1 {
                self.head_n + 1
            } else {
                0
            };
            self.sub_id = self.sub_id.max(self.id_n);
            true
        } else {
            self.rows += 1;
            false
        }
    }

    pub(crate) fn map_get(&self, c: i32) -> i32 {
        let n = (c + 1) as usize;
        self.map.get(n).copied().unwrap_or(-1)
    }

    pub(crate) fn map_set(&mut self, c: i32, g: i32) {
        let n = (c + 1) as usize;
        if let Some(slot) = self.map.get_mut(n) {
            *slot = g;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_geometry_reaches_target() {
        let mut d = Dataset::default();
        assert!(d.alloc(1, 16, false));

        let bytes = d.rows_per_chunk() * d.row_width() * 8;
        assert!(bytes >= CHUNK_BYTES);
        assert!(bytes / 2 < CHUNK_BYTES, "chunk should be minimal power of two");
    }

    #[test]
    fn column_count_is_immutable() {
        let mut d = Dataset::default();
        assert!(d.alloc(3, 100, false));
        assert!(!d.alloc(4, 100, false));
        assert_eq!(d.column_n(), 3);
    }
}
