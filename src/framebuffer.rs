//= IMPORTS ==================================================================

use crate::display::{DisplayImage, Gpu};

use wgpu::Queue;

//= FRAMEBUFFER ==============================================================

/// Owns the CPU-side packed-pixel array and the displayable image it gets
/// uploaded to. Nothing else writes either of them.
pub(crate) struct FrameBuffer {
    width: u32,
    height: u32,
    data: Vec<u32>,
    image: Option<DisplayImage>,
}

impl FrameBuffer {
    pub(crate) fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            data: Vec::new(),
            image: None,
        }
    }

    /// No-op when the dimensions are unchanged. Otherwise the display image
    /// keeps its handle but gets fresh backing storage, and the pixel array
    /// is reallocated. A zero-sized viewport is accepted; it only empties
    /// the buffer, and the next render pass skips iteration.
    pub(crate) fn resize(&mut self, gpu: &Gpu, width: u32, height: u32) {
        if !self.resize_storage(width, height) {
            return;
        }

        if width > 0 && height > 0 {
            match &mut self.image {
                Some(image) => image.resize(gpu, width, height),
                None => self.image = Some(DisplayImage::new(gpu, width, height)),
            }
        }

        log::debug!("framebuffer resized to {}x{}", width, height);
    }

    /// Returns false when the dimensions are unchanged, leaving the
    /// allocation untouched.
    fn resize_storage(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        self.width = width;
        self.height = height;
        self.data = vec![0_u32; width as usize * height as usize];
        true
    }

    pub(crate) fn write(&mut self, x: u32, y: u32, packed: u32) {
        self.data[(y * self.width + x) as usize] = packed;
    }

    /// Push the whole CPU array to the display image. Once per frame.
    pub(crate) fn upload(&self, queue: &Queue) {
        let Some(image) = &self.image else {
            return;
        };
        if self.data.is_empty() {
            return;
        }
        image.set_data(queue, bytemuck::cast_slice(&self.data));
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    /// None until the first successful resize.
    pub(crate) fn image(&self) -> Option<&DisplayImage> {
        self.image.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn with_size(width: u32, height: u32) -> Self {
        let mut fb = Self::new();
        fb.resize_storage(width, height);
        fb
    }

    #[cfg(test)]
    pub(crate) fn pixel(&self, x: u32, y: u32) -> u32 {
        self.data[(y * self.width + x) as usize]
    }
}

//= TESTS ====================================================================
