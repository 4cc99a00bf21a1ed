pub mod range;
pub mod slice;
pub mod store;
pub mod subtract;

pub use self::range::RangeCache;
pub use self::store::{Cursor, Dataset, CHUNK_BYTES, CHUNK_CACHE, CHUNK_MAX, SUBTRACT_MAX};
pub use self::subtract::{BinaryOp, Subtract, POLYFIT_MAX};
