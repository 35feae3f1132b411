mod animation;
mod builder;

pub use animation::{Animator, Track, frame_time};
pub use builder::Pose;
