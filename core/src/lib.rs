pub mod core;
pub mod device;
pub mod video;
