//! CPU render backend on top of `tiny-skia`.
//!
//! Each triangle is filled as a path with the page texture as a bilinear,
//! repeating pattern. The pattern transform is the affine map taking texel
//! coordinates onto the projected triangle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use image::{ImageReader, RgbaImage};
use log::debug;
use tiny_skia::{
    BlendMode, FillRule, FilterQuality, IntSize, Paint, PathBuilder, Pattern, Pixmap, SpreadMode,
    Transform,
};

use super::backend::{FrameSetup, Projection, RenderBackend};
use crate::error::SpineshotError;
use crate::runtime::{DrawBatch, SpineBlend, TextureId, TextureLoader, Vertex};

/// Uploaded page image, stored premultiplied
struct Texture {
    path: PathBuf,
    pixmap: Pixmap,
}

/// Software rasterizer implementing [`RenderBackend`].
pub struct SoftwareBackend {
    /// Page images are already premultiplied on disk
    premultiplied_textures: bool,
    textures: Vec<Option<Texture>>,
    /// Pages multiplied by a vertex tint, keyed by texture and RGB
    tinted: HashMap<(TextureId, [u8; 3]), Pixmap>,
    target: Option<Pixmap>,
    projection: Projection,
}

impl SoftwareBackend {
    pub fn new(premultiplied_textures: bool) -> Self {
        Self {
            premultiplied_textures,
            textures: Vec::new(),
            tinted: HashMap::new(),
            target: None,
            projection: Projection::default(),
        }
    }

    /// Number of textures currently held
    pub fn texture_count(&self) -> usize {
        self.textures.iter().flatten().count()
    }

    fn rendering_error(message: impl Into<String>) -> anyhow::Error {
        SpineshotError::Rendering(message.into()).into()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn mul_div_255(a: u8, b: u8) -> u8 {
    ((u16::from(a) * u16::from(b) + 127) / 255) as u8
}

/// Straight RGBA8 to premultiplied, or clamp already premultiplied data so
/// no channel exceeds its alpha.
fn premultiply(data: &mut [u8], already_premultiplied: bool) {
    for px in data.chunks_exact_mut(4) {
        let a = px[3];
        for c in &mut px[..3] {
            *c = if already_premultiplied {
                (*c).min(a)
            } else {
                mul_div_255(*c, a)
            };
        }
    }
}

fn tint_pixmap(source: &Pixmap, tint: [u8; 3]) -> Pixmap {
    let mut tinted = source.clone();
    for px in tinted.data_mut().chunks_exact_mut(4) {
        for (c, t) in px[..3].iter_mut().zip(tint) {
            *c = mul_div_255(*c, t);
        }
    }
    tinted
}

fn blend_mode(blend: SpineBlend) -> BlendMode {
    match blend {
        SpineBlend::Normal => BlendMode::SourceOver,
        SpineBlend::Additive => BlendMode::Plus,
        SpineBlend::Multiply => BlendMode::Multiply,
        SpineBlend::Screen => BlendMode::Screen,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unit_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Average straight color of a triangle's vertices.
fn triangle_color(vertices: [&Vertex; 3]) -> [f32; 4] {
    let mut color = [0.0; 4];
    for v in vertices {
        for (sum, c) in color.iter_mut().zip(v.color) {
            *sum += c / 3.0;
        }
    }
    color
}

/// Affine transform mapping the texel triangle `src` onto `dst`,
/// or `None` when either triangle is degenerate.
fn triangle_transform(src: [[f32; 2]; 3], dst: [[f32; 2]; 3]) -> Option<Transform> {
    let (s1, s2) = (sub(src[1], src[0]), sub(src[2], src[0]));
    let (d1, d2) = (sub(dst[1], dst[0]), sub(dst[2], dst[0]));

    let det = s1[0] * s2[1] - s2[0] * s1[1];
    let area = d1[0] * d2[1] - d2[0] * d1[1];
    if det.abs() < f32::EPSILON || area.abs() < f32::EPSILON {
        return None;
    }

    let sx = (d1[0] * s2[1] - d2[0] * s1[1]) / det;
    let kx = (d2[0] * s1[0] - d1[0] * s2[0]) / det;
    let ky = (d1[1] * s2[1] - d2[1] * s1[1]) / det;
    let sy = (d2[1] * s1[0] - d1[1] * s2[0]) / det;
    let tx = dst[0][0] - sx * src[0][0] - kx * src[0][1];
    let ty = dst[0][1] - ky * src[0][0] - sy * src[0][1];

    Some(Transform::from_row(sx, ky, kx, sy, tx, ty))
}

fn sub(a: [f32; 2], b: [f32; 2]) -> [f32; 2] {
    [a[0] - b[0], a[1] - b[1]]
}

impl TextureLoader for SoftwareBackend {
    fn load_texture(&mut self, path: &Path) -> Result<TextureId> {
        let image = ImageReader::open(path)
            .map_err(|e| SpineshotError::TextureLoad {
                path: path.to_path_buf(),
                source: e.into(),
            })?
            .decode()
            .map_err(|e| SpineshotError::TextureLoad {
                path: path.to_path_buf(),
                source: e,
            })?
            .into_rgba8();

        let (width, height) = image.dimensions();
        let size_error = || SpineshotError::TextureSize {
            path: path.to_path_buf(),
            width,
            height,
        };
        let size = IntSize::from_wh(width, height).ok_or_else(size_error)?;

        let mut data = image.into_raw();
        premultiply(&mut data, self.premultiplied_textures);
        let pixmap = Pixmap::from_vec(data, size).ok_or_else(size_error)?;

        let id = TextureId(self.textures.len());
        self.textures.push(Some(Texture {
            path: path.to_path_buf(),
            pixmap,
        }));
        debug!("Uploaded texture {} ({}x{})", path.display(), width, height);
        Ok(id)
    }

    fn release_texture(&mut self, id: TextureId) {
        if let Some(texture) = self.textures.get_mut(id.0).and_then(Option::take) {
            debug!("Released texture {}", texture.path.display());
        }
        self.tinted.retain(|(texture, _), _| *texture != id);
    }
}

impl RenderBackend for SoftwareBackend {
    fn begin_frame(&mut self, setup: &FrameSetup) -> Result<()> {
        let mut target = Pixmap::new(setup.size.width, setup.size.height).ok_or_else(|| {
            Self::rendering_error(format!(
                "cannot allocate a {}x{} render target",
                setup.size.width, setup.size.height
            ))
        })?;
        let clear = setup.clear;
        target.fill(tiny_skia::Color::from_rgba8(clear.r, clear.g, clear.b, clear.a));

        self.target = Some(target);
        self.projection = setup.projection;
        Ok(())
    }

    fn draw(&mut self, batches: &[DrawBatch]) -> Result<()> {
        let target = self
            .target
            .as_mut()
            .ok_or_else(|| Self::rendering_error("draw called without a bound target"))?;

        for batch in batches {
            let texture = self
                .textures
                .get(batch.texture.0)
                .and_then(Option::as_ref)
                .ok_or_else(|| {
                    Self::rendering_error(format!("texture {} is not loaded", batch.texture.0))
                })?;
            let (tw, th) = (texture.pixmap.width() as f32, texture.pixmap.height() as f32);

            for triangle in batch.indices.chunks_exact(3) {
                let [Some(a), Some(b), Some(c)] =
                    [triangle[0], triangle[1], triangle[2]].map(|i| batch.vertices.get(i as usize))
                else {
                    return Err(Self::rendering_error("vertex index out of bounds"));
                };
                let corners = [a, b, c];

                let color = triangle_color(corners);
                if color[3] <= 0.0 {
                    continue;
                }

                let texels = corners.map(|v| [v.uv[0] * tw, v.uv[1] * th]);
                let screen = corners.map(|v| self.projection.apply(v.position));
                let Some(transform) = triangle_transform(texels, screen) else {
                    continue;
                };

                let tint = [
                    unit_to_u8(color[0]),
                    unit_to_u8(color[1]),
                    unit_to_u8(color[2]),
                ];
                let source = if tint == [255; 3] {
                    &texture.pixmap
                } else {
                    self.tinted
                        .entry((batch.texture, tint))
                        .or_insert_with(|| tint_pixmap(&texture.pixmap, tint))
                };

                let paint = Paint {
                    shader: Pattern::new(
                        source.as_ref(),
                        SpreadMode::Repeat,
                        FilterQuality::Bilinear,
                        color[3].min(1.0),
                        transform,
                    ),
                    blend_mode: blend_mode(batch.blend),
                    anti_alias: false,
                    ..Paint::default()
                };

                let mut path = PathBuilder::new();
                path.move_to(screen[0][0], screen[0][1]);
                path.line_to(screen[1][0], screen[1][1]);
                path.line_to(screen[2][0], screen[2][1]);
                path.close();
                if let Some(path) = path.finish() {
                    target.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
                }
            }
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<RgbaImage> {
        let target = self
            .target
            .take()
            .ok_or_else(|| Self::rendering_error("no bound target to read back"))?;

        let mut data = Vec::with_capacity(target.data().len());
        for px in target.pixels() {
            let c = px.demultiply();
            data.extend([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        RgbaImage::from_raw(target.width(), target.height(), data)
            .ok_or_else(|| Self::rendering_error("render target has an unexpected size"))
    }

    fn reset(&mut self) {
        self.target = None;
        self.projection = Projection::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Color, Size};
    use crate::error::ErrorKind;
    use crate::testing::TempDir;
    use image::Rgba;

    fn setup(width: u32, height: u32, clear: Color) -> FrameSetup {
        let size = Size { width, height };
        FrameSetup {
            size,
            clear,
            projection: Projection::for_canvas(size, 1.0),
        }
    }

    /// Axis-aligned quad covering world rect `[x0, x1] x [y0, y1]` with the whole texture.
    fn quad(texture: TextureId, x0: f32, y0: f32, x1: f32, y1: f32, color: [f32; 4]) -> DrawBatch {
        let v = |x, y, u, w| Vertex {
            position: [x, y],
            uv: [u, w],
            color,
        };
        DrawBatch {
            texture,
            blend: SpineBlend::Normal,
            // uv v grows downwards, world y upwards
            vertices: vec![
                v(x0, y1, 0.0, 0.0),
                v(x1, y1, 1.0, 0.0),
                v(x1, y0, 1.0, 1.0),
                v(x0, y0, 0.0, 1.0),
            ],
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }

    fn solid_texture(dir: &TempDir, name: &str, rgba: [u8; 4]) -> PathBuf {
        let path = dir.path().join(name);
        RgbaImage::from_pixel(8, 8, Rgba(rgba)).save(&path).unwrap();
        path
    }

    #[test]
    fn test_clear_color_fills_target() {
        let mut backend = SoftwareBackend::new(false);
        backend
            .begin_frame(&setup(5, 3, Color::rgba(255, 0, 0, 255)))
            .unwrap();
        let image = backend.end_frame().unwrap();
        assert_eq!(image.dimensions(), (5, 3));
        assert!(image.pixels().all(|p| *p == Rgba([255, 0, 0, 255])));
    }

    #[test]
    fn test_draw_textured_quad_with_y_flip() {
        let dir = TempDir::new("software_quad");
        let texture_path = solid_texture(&dir, "page.png", [0, 255, 0, 255]);
        let mut backend = SoftwareBackend::new(false);
        let texture = backend.load_texture(&texture_path).unwrap();

        backend
            .begin_frame(&setup(10, 10, Color::TRANSPARENT))
            .unwrap();
        // bottom half of the world (y 0..5) is the bottom half of the image
        backend
            .draw(&[quad(texture, 0.0, 0.0, 10.0, 5.0, [1.0; 4])])
            .unwrap();
        let image = backend.end_frame().unwrap();

        assert_eq!(*image.get_pixel(5, 8), Rgba([0, 255, 0, 255]));
        assert_eq!(image.get_pixel(5, 1)[3], 0);
    }

    #[test]
    fn test_vertex_tint_and_alpha() {
        let dir = TempDir::new("software_tint");
        let texture_path = solid_texture(&dir, "white.png", [255, 255, 255, 255]);
        let mut backend = SoftwareBackend::new(false);
        let texture = backend.load_texture(&texture_path).unwrap();

        backend.begin_frame(&setup(4, 4, Color::BLACK)).unwrap();
        backend
            .draw(&[quad(texture, 0.0, 0.0, 4.0, 4.0, [0.0, 0.0, 1.0, 1.0])])
            .unwrap();
        let image = backend.end_frame().unwrap();
        assert_eq!(*image.get_pixel(2, 2), Rgba([0, 0, 255, 255]));

        backend.begin_frame(&setup(4, 4, Color::BLACK)).unwrap();
        backend
            .draw(&[quad(texture, 0.0, 0.0, 4.0, 4.0, [1.0, 1.0, 1.0, 0.5])])
            .unwrap();
        let image = backend.end_frame().unwrap();
        let gray = image.get_pixel(2, 2)[0];
        assert!((126..=129).contains(&gray), "got {gray}");
    }

    #[test]
    fn test_texture_load_errors() {
        let dir = TempDir::new("software_missing");
        let mut backend = SoftwareBackend::new(false);
        let err = backend
            .load_texture(&dir.path().join("missing.png"))
            .unwrap_err();
        let kind = err.downcast_ref::<SpineshotError>().map(SpineshotError::kind);
        assert_eq!(kind, Some(ErrorKind::TextureLoad));

        let garbage = dir.write("garbage.png", b"not a png");
        assert!(backend.load_texture(&garbage).is_err());
        assert_eq!(backend.texture_count(), 0);
    }

    #[test]
    fn test_release_texture() {
        let dir = TempDir::new("software_release");
        let texture_path = solid_texture(&dir, "page.png", [1, 2, 3, 255]);
        let mut backend = SoftwareBackend::new(false);
        let texture = backend.load_texture(&texture_path).unwrap();
        assert_eq!(backend.texture_count(), 1);

        backend.release_texture(texture);
        assert_eq!(backend.texture_count(), 0);

        backend.begin_frame(&setup(2, 2, Color::BLACK)).unwrap();
        assert!(backend.draw(&[quad(texture, 0.0, 0.0, 2.0, 2.0, [1.0; 4])]).is_err());
    }

    #[test]
    fn test_draw_requires_bound_target() {
        let mut backend = SoftwareBackend::new(false);
        assert!(backend.draw(&[]).is_err());
        assert!(backend.end_frame().is_err());
    }

    #[test]
    fn test_premultiply() {
        let mut data = vec![255, 128, 0, 128];
        premultiply(&mut data, false);
        assert_eq!(data, vec![128, 64, 0, 128]);

        let mut data = vec![200, 10, 0, 100];
        premultiply(&mut data, true);
        assert_eq!(data, vec![100, 10, 0, 100]);
    }

    #[test]
    fn test_triangle_transform_maps_corners() {
        let src = [[0.0, 0.0], [8.0, 0.0], [0.0, 8.0]];
        let dst = [[10.0, 20.0], [14.0, 20.0], [10.0, 12.0]];
        let t = triangle_transform(src, dst).unwrap();
        for (s, d) in src.iter().zip(dst) {
            let x = t.sx * s[0] + t.kx * s[1] + t.tx;
            let y = t.ky * s[0] + t.sy * s[1] + t.ty;
            assert!((x - d[0]).abs() < 1e-4 && (y - d[1]).abs() < 1e-4);
        }
        assert!(triangle_transform(src, [[0.0, 0.0]; 3]).is_none());
    }
}
