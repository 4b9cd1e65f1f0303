pub mod bi_fm;
pub mod bwt;
pub mod cursor;
pub mod fm;
pub mod sa;

pub use bi_fm::{BiFmIndex, IndexConfig, IndexMeta, SeqInfo};
pub use cursor::BiFmCursor;
