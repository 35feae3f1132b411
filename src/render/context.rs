use anyhow::Result;

use super::backend::{Frame, FrameSetup, Projection, RenderBackend};
use crate::config::RenderOptions;

/// Resolved options paired with the backend that renders them.
pub struct RenderContext<'a, B: RenderBackend> {
    options: &'a RenderOptions,
    backend: B,
}

impl<'a, B: RenderBackend> RenderContext<'a, B> {
    pub fn new(options: &'a RenderOptions, backend: B) -> Self {
        Self { options, backend }
    }

    pub fn options(&self) -> &'a RenderOptions {
        self.options
    }

    /// Target size, clear color and world-to-pixel mapping for every frame.
    pub fn frame_setup(&self) -> FrameSetup {
        FrameSetup {
            size: self.options.size,
            clear: self.options.clear_color,
            projection: self.projection(),
        }
    }

    pub fn projection(&self) -> Projection {
        Projection::for_canvas(self.options.size, self.options.scale)
    }

    /// Bind a freshly cleared target.
    pub fn begin_frame(&mut self) -> Result<Frame<'_, B>> {
        let setup = self.frame_setup();
        Frame::begin(&mut self.backend, &setup)
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}
