pub mod shared;
pub mod sinkhole;
