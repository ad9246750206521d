pub mod fits;
pub mod preview;
