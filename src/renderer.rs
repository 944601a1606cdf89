//= IMPORTS ==================================================================

use crate::display::{DisplayImage, Gpu};
use crate::framebuffer::FrameBuffer;
use crate::scene::{Scene, Shade};

use glam::{Vec2, Vec4};
use wgpu::Queue;

//= RENDERER =================================================================

/// Casts one ray per pixel of the current framebuffer and packs the shaded
/// colors in place. The shading strategy is injected so the flat and the
/// lit variants share the same loop.
pub(crate) struct Renderer {
    framebuffer: FrameBuffer,
    shader: Box<dyn Shade>,
}

impl Renderer {
    pub(crate) fn new(shader: Box<dyn Shade>) -> Self {
        Self {
            framebuffer: FrameBuffer::new(),
            shader,
        }
    }

    /// Idempotent for unchanged dimensions, see [`FrameBuffer::resize`].
    pub(crate) fn on_resize(&mut self, gpu: &Gpu, width: u32, height: u32) {
        self.framebuffer.resize(gpu, width, height);
    }

    /// One full frame. Every pixel is recomputed from scratch; a zero-sized
    /// viewport renders nothing.
    pub(crate) fn render(&mut self, scene: &Scene) {
        profiling::scope!("render");
        let started = std::time::Instant::now();

        let width = self.framebuffer.width();
        let height = self.framebuffer.height();
        if width == 0 || height == 0 {
            return;
        }
        let aspect = width as f32 / height as f32;

        for y in 0..height {
            for x in 0..width {
                // Pixel center to [-1, 1], x scaled so the sphere stays
                // circular on non-square viewports.
                let mut coord = Vec2::new(
                    (x as f32 + 0.5) / width as f32,
                    (y as f32 + 0.5) / height as f32,
                );
                coord = coord * 2.0 - 1.0;
                coord.x *= aspect;

                let ray = scene.camera.ray(coord);
                let hit = scene.sphere.hit(&ray);
                let color = self
                    .shader
                    .shade(scene, hit.as_ref())
                    .clamp(Vec4::ZERO, Vec4::ONE);
                self.framebuffer.write(x, y, pack_rgba(color));
            }
        }

        log::debug!(
            "rendered {}x{} in {:.2} ms",
            width,
            height,
            started.elapsed().as_secs_f32() * 1000.0
        );
    }

    /// Push the finished frame to the display image, once per frame.
    pub(crate) fn upload(&self, queue: &Queue) {
        self.framebuffer.upload(queue);
    }

    /// The displayable image handle, None before the first resize.
    pub(crate) fn final_image(&self) -> Option<&DisplayImage> {
        self.framebuffer.image()
    }

    #[cfg(test)]
    fn with_framebuffer(framebuffer: FrameBuffer, shader: Box<dyn Shade>) -> Self {
        Self {
            framebuffer,
            shader,
        }
    }
}

//= COLOR PACKING ============================================================

/// Pack a [0,1] RGBA color as (A<<24)|(B<<16)|(G<<8)|R, one byte per
/// channel, truncating. Callers clamp first; out-of-range input is garbage
/// by contract.
pub(crate) fn pack_rgba(color: Vec4) -> u32 {
    let r = (color.x * 255.0) as u32;
    let g = (color.y * 255.0) as u32;
    let b = (color.z * 255.0) as u32;
    let a = (color.w * 255.0) as u32;
    (a << 24) | (b << 16) | (g << 8) | r
}

//= TESTS ====================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::scene::{FlatShader, LambertShader};

    use glam::vec4;

    #[test]
    fn pack_black_is_opaque_black() {
        assert_eq!(pack_rgba(vec4(0.0, 0.0, 0.0, 1.0)), 0xFF000000);
    }

    #[test]
    fn pack_red_lands_in_the_low_byte() {
        assert_eq!(pack_rgba(vec4(1.0, 0.0, 0.0, 1.0)), 0xFF0000FF);
    }

    #[test]
    fn pack_channel_order_is_abgr() {
        assert_eq!(pack_rgba(vec4(0.0, 1.0, 0.0, 1.0)), 0xFF00FF00);
        assert_eq!(pack_rgba(vec4(0.0, 0.0, 1.0, 1.0)), 0xFFFF0000);
        assert_eq!(pack_rgba(vec4(1.0, 1.0, 1.0, 1.0)), 0xFFFFFFFF);
    }

    #[test]
    fn pack_truncates_instead_of_rounding() {
        // 0.999 * 255 = 254.745, which must become 254.
        assert_eq!(pack_rgba(vec4(0.999, 0.0, 0.0, 0.0)) & 0xFF, 254);
    }

    fn render_flat(width: u32, height: u32) -> (FrameBuffer, u32, u32) {
        let scene = Scene::new();
        let mut renderer = Renderer::with_framebuffer(
            FrameBuffer::with_size(width, height),
            Box::new(FlatShader),
        );
        renderer.render(&scene);

        let hit = pack_rgba(scene.sphere.albedo.extend(1.0).clamp(Vec4::ZERO, Vec4::ONE));
        let miss = pack_rgba(scene.background.extend(1.0).clamp(Vec4::ZERO, Vec4::ONE));
        (renderer.framebuffer, hit, miss)
    }

    #[test]
    fn four_by_four_center_hits_corners_miss() {
        let (fb, hit, miss) = render_flat(4, 4);

        for (x, y) in [(1, 1), (2, 1), (1, 2), (2, 2)] {
            assert_eq!(fb.pixel(x, y), hit, "pixel ({x},{y}) should hit");
        }
        for (x, y) in [(0, 0), (3, 0), (0, 3), (3, 3)] {
            assert_eq!(fb.pixel(x, y), miss, "pixel ({x},{y}) should miss");
        }
    }

    #[test]
    fn hit_disk_is_symmetric_under_quarter_turns() {
        let n = 16;
        let (fb, hit, _) = render_flat(n, n);

        for y in 0..n {
            for x in 0..n {
                let rotated = fb.pixel(n - 1 - y, x);
                assert_eq!(
                    fb.pixel(x, y) == hit,
                    rotated == hit,
                    "hit mask differs at ({x},{y}) after rotation"
                );
            }
        }
    }

    #[test]
    fn lit_render_shades_center_brighter_than_background() {
        let scene = Scene::new();
        let mut renderer = Renderer::with_framebuffer(
            FrameBuffer::with_size(9, 9),
            Box::new(LambertShader),
        );
        renderer.render(&scene);

        let background = pack_rgba(scene.background.extend(1.0));
        assert_ne!(renderer.framebuffer.pixel(4, 4), background);
        assert_eq!(renderer.framebuffer.pixel(0, 0), background);
    }

    #[test]
    fn zero_sized_viewport_renders_nothing() {
        let scene = Scene::new();
        let mut renderer =
            Renderer::with_framebuffer(FrameBuffer::with_size(0, 8), Box::new(FlatShader));
        // Must not divide by zero or touch any storage.
        renderer.render(&scene);
    }
}
