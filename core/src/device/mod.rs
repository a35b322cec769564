pub mod starfire_video;
pub mod wiping_sound;

pub use starfire_video::{AluOp, StarfireVideo};
pub use wiping_sound::{MixerTable, WipingSound};
