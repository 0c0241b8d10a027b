pub mod manifest;
pub mod qff;
pub mod qgf;
pub mod rle;
