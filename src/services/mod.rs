//! Services separating storage concerns from segmentation logic

pub mod io;

pub use io::ImageIOService;
