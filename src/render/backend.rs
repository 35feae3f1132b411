use anyhow::Result;
use image::RgbaImage;

use crate::config::{Color, Size};
use crate::runtime::{DrawBatch, TextureLoader};

/// Maps runtime world coordinates (Y up) onto output pixels (top-left origin, Y down).
///
/// `screen = (origin.x + scale * x, origin.y - scale * y)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub origin: [f32; 2],
    pub scale: f32,
}

impl Projection {
    /// World origin at the bottom-left corner of the canvas.
    pub fn for_canvas(size: Size, scale: f32) -> Self {
        Self {
            origin: [0.0, size.height as f32],
            scale,
        }
    }

    pub fn apply(&self, point: [f32; 2]) -> [f32; 2] {
        [
            self.origin[0] + self.scale * point[0],
            self.origin[1] - self.scale * point[1],
        ]
    }

    /// World coordinates that project onto the given pixel.
    pub fn unproject(&self, pixel: [f32; 2]) -> [f32; 2] {
        [
            (pixel[0] - self.origin[0]) / self.scale,
            (self.origin[1] - pixel[1]) / self.scale,
        ]
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            origin: [0.0, 0.0],
            scale: 1.0,
        }
    }
}

/// Everything a backend needs to start a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSetup {
    pub size: Size,
    pub clear: Color,
    pub projection: Projection,
}

/// An off-screen render target the frame loop draws into.
///
/// Backends are stateful; [`Frame`] pairs every `begin_frame` with a `reset`
/// so nothing leaks from one frame into the next.
pub trait RenderBackend: TextureLoader {
    /// Bind a fresh target of `setup.size` cleared to `setup.clear`.
    fn begin_frame(&mut self, setup: &FrameSetup) -> Result<()>;
    fn draw(&mut self, batches: &[DrawBatch]) -> Result<()>;
    /// Read back the target as straight RGBA.
    fn end_frame(&mut self) -> Result<RgbaImage>;
    /// Drop the bound target and return to the default state.
    fn reset(&mut self);
}

/// A bound render target; the backend is reset when this is dropped.
pub struct Frame<'a, B: RenderBackend + ?Sized> {
    backend: &'a mut B,
}

impl<'a, B: RenderBackend + ?Sized> Frame<'a, B> {
    pub fn begin(backend: &'a mut B, setup: &FrameSetup) -> Result<Self> {
        backend.reset();
        backend.begin_frame(setup)?;
        Ok(Self { backend })
    }

    pub fn draw(&mut self, batches: &[DrawBatch]) -> Result<()> {
        self.backend.draw(batches)
    }

    pub fn finish(self) -> Result<RgbaImage> {
        self.backend.end_frame()
    }
}

impl<B: RenderBackend + ?Sized> Drop for Frame<'_, B> {
    fn drop(&mut self) {
        self.backend.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::TextureId;
    use std::path::Path;

    #[derive(Default)]
    struct CountingBackend {
        begun: usize,
        resets: usize,
        bound: bool,
    }

    impl TextureLoader for CountingBackend {
        fn load_texture(&mut self, _path: &Path) -> Result<TextureId> {
            Ok(TextureId(0))
        }

        fn release_texture(&mut self, _id: TextureId) {}
    }

    impl RenderBackend for CountingBackend {
        fn begin_frame(&mut self, _setup: &FrameSetup) -> Result<()> {
            self.begun += 1;
            self.bound = true;
            Ok(())
        }

        fn draw(&mut self, _batches: &[DrawBatch]) -> Result<()> {
            anyhow::ensure!(self.bound, "draw without a bound target");
            Ok(())
        }

        fn end_frame(&mut self) -> Result<RgbaImage> {
            Ok(RgbaImage::new(1, 1))
        }

        fn reset(&mut self) {
            self.resets += 1;
            self.bound = false;
        }
    }

    fn setup() -> FrameSetup {
        let size = Size {
            width: 4,
            height: 4,
        };
        FrameSetup {
            size,
            clear: Color::TRANSPARENT,
            projection: Projection::for_canvas(size, 1.0),
        }
    }

    #[test]
    fn test_projection_flips_y() {
        let projection = Projection::for_canvas(
            Size {
                width: 100,
                height: 50,
            },
            2.0,
        );
        assert_eq!(projection.apply([0.0, 0.0]), [0.0, 50.0]);
        assert_eq!(projection.apply([10.0, 5.0]), [20.0, 40.0]);
        assert_eq!(projection.unproject([20.0, 40.0]), [10.0, 5.0]);
    }

    #[test]
    fn test_frame_resets_on_finish() {
        let mut backend = CountingBackend::default();
        let mut frame = Frame::begin(&mut backend, &setup()).unwrap();
        frame.draw(&[]).unwrap();
        frame.finish().unwrap();
        assert_eq!(backend.begun, 1);
        // once before binding, once on release
        assert_eq!(backend.resets, 2);
        assert!(!backend.bound);
    }

    #[test]
    fn test_frame_resets_on_early_drop() {
        let mut backend = CountingBackend::default();
        {
            let _frame = Frame::begin(&mut backend, &setup()).unwrap();
        }
        assert!(!backend.bound);
        assert_eq!(backend.resets, 2);
    }
}
