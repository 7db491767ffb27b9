//! String similarity used for title resolution.

mod sequence;

pub use sequence::{matching_blocks, sequence_ratio, MatchingBlock};
