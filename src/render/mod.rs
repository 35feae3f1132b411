mod backend;
mod context;
mod frame_loop;
mod software;

pub use backend::{Frame, FrameSetup, Projection, RenderBackend};
pub use context::RenderContext;
pub use frame_loop::{NO_ANIMATION_LABEL, NO_SKIN_LABEL, RenderJob, plan_jobs, render_all};
pub use software::SoftwareBackend;
