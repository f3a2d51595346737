//! Image primitives.
//!
//! The pipeline uses a lightweight owned RGB image type (`OwnedImage`) that is
//! optimized for repeated cropping of dashboard screenshots. For most
//! operations we borrow a view (`ImageView<'a>`) instead of copying pixels;
//! a view is only materialized into an owned image right before OCR
//! preprocessing needs to mutate it.

use anyhow::{Context, Result};

/// Owned RGB image (no alpha).
#[derive(Clone, Debug)]
pub struct OwnedImage {
    width: u32,
    height: u32,
    data: Vec<Color>,
}

impl OwnedImage {
    /// Build an `OwnedImage` from RGBA bytes (alpha is discarded).
    ///
    /// The buffer is expected to be tightly packed: `width * height * 4` bytes.
    pub fn from_rgba(width: usize, bytes: &[u8]) -> Self {
        let height = bytes.len() / width / 4;
        let data = bytes
            .chunks_exact(4)
            .map(|v| Color::new(v[0], v[1], v[2]))
            .collect::<Vec<_>>();

        Self {
            width: width as u32,
            height: height as u32,
            data,
        }
    }

    /// Decode an encoded image (PNG/JPEG/GIF) into an `OwnedImage`.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)
            .context("decode screenshot")?
            .to_rgba8();
        let (width, _) = img.dimensions();
        Ok(Self::from_rgba(width as usize, img.as_raw()))
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resize this image to the given height (preserving aspect ratio).
    ///
    /// Uses `fast_image_resize` (SIMD-optimized) and keeps output in `Vec<Color>`.
    pub fn resize_h(&mut self, height: u32) {
        if self.height == height {
            return;
        }

        let height = height.max(1);
        let width = (self.width as u64 * height as u64 / self.height.max(1) as u64) as u32;

        // SAFETY: `Color` is `#[repr(C)]` with 3 x `u8`, so it is layout-compatible
        // with `fast_image_resize::pixels::U8x3` (alignment 1).
        let src_pixels = unsafe {
            std::slice::from_raw_parts(
                self.data.as_ptr() as *const fast_image_resize::pixels::U8x3,
                self.data.len(),
            )
        };

        let src = fast_image_resize::images::ImageRef::from_pixels(self.width, self.height, src_pixels)
            .expect("fast_image_resize: ImageRef::from_pixels failed");

        let mut dst = fast_image_resize::images::Image::new(width, height, fast_image_resize::PixelType::U8x3);

        let mut resizer = fast_image_resize::Resizer::new();
        let options = fast_image_resize::ResizeOptions::new().resize_alg(
            fast_image_resize::ResizeAlg::Interpolation(fast_image_resize::FilterType::CatmullRom),
        );

        resizer
            .resize(&src, &mut dst, &Some(options))
            .expect("fast_image_resize: resize failed");

        let bytes: Vec<u8> = dst.into_vec();
        let mut data = Vec::with_capacity((width * height) as usize);
        for px in bytes.chunks_exact(3) {
            data.push(Color::new(px[0], px[1], px[2]));
        }

        self.width = width;
        self.height = height;
        self.data = data;
    }

    #[inline]
    pub fn resized_h(mut self, height: u32) -> Self {
        self.resize_h(height);
        self
    }

    /// Create a borrowed view of this entire image.
    pub fn as_view(&self) -> ImageView<'_> {
        ImageView {
            x1: 0,
            y1: 0,
            x2: self.width,
            y2: self.height,
            true_width: self.width,
            data: &self.data,
        }
    }

    /// Convert to a grayscale `GrayImage` (luma).
    pub fn to_gray_image(&self) -> image::GrayImage {
        use image::{GrayImage, Luma};
        let mut out = GrayImage::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.data[(x + y * self.width) as usize];
                out.put_pixel(x, y, Luma([c.luma()]));
            }
        }
        out
    }

    /// Create an RGB `OwnedImage` from a grayscale image (each pixel repeated into RGB).
    pub fn from_gray_as_rgb(gray: &image::GrayImage) -> Self {
        let (w, h) = gray.dimensions();
        let mut data = Vec::with_capacity((w * h) as usize);
        for p in gray.pixels() {
            let v = p.0[0];
            data.push(Color::new(v, v, v));
        }
        Self {
            width: w,
            height: h,
            data,
        }
    }
}

// ----------

/// Borrowed image view into an `OwnedImage`.
#[derive(Clone, Copy)]
pub struct ImageView<'a> {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
    true_width: u32,
    data: &'a [Color],
}

impl<'a> ImageView<'a> {
    #[inline(always)]
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    #[inline(always)]
    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    #[inline(always)]
    fn pixel(&self, x: u32, y: u32) -> &Color {
        &self.data[(x + y * self.true_width) as usize]
    }

    pub fn to_owned_image(self) -> OwnedImage {
        let mut data = Vec::with_capacity((self.width() * self.height()) as usize);
        for y in self.y1..self.y2 {
            for x in self.x1..self.x2 {
                data.push(*self.pixel(x, y));
            }
        }

        OwnedImage {
            width: self.width(),
            height: self.height(),
            data,
        }
    }

    pub fn get_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0; (self.width() * self.height() * 3) as usize];
        let mut i = 0;
        for y in self.y1..self.y2 {
            for x in self.x1..self.x2 {
                let clr = self.pixel(x, y);
                bytes[i] = clr.r;
                bytes[i + 1] = clr.g;
                bytes[i + 2] = clr.b;
                i += 3;
            }
        }
        bytes
    }

    /// Create an arbitrary subimage (relative coordinates, clamped to bounds).
    pub fn sub_image(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let x = x.min(self.width());
        let y = y.min(self.height());
        let width = width.min(self.width() - x);
        let height = height.min(self.height() - y);

        Self {
            x1: self.x1 + x,
            y1: self.y1 + y,
            x2: self.x1 + x + width,
            y2: self.y1 + y + height,
            true_width: self.true_width,
            data: self.data,
        }
    }
}

// ----------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Compute luma (grayscale intensity).
    pub fn luma(&self) -> u8 {
        let r = self.r as u32;
        let g = self.g as u32;
        let b = self.b as u32;
        ((299 * r + 587 * g + 114 * b) / 1000) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_image_is_clamped_to_bounds() {
        let img = OwnedImage::from_rgba(4, &[0u8; 4 * 4 * 4]);
        let view = img.as_view();

        let sub = view.sub_image(2, 2, 100, 100);
        assert_eq!(sub.width(), 2);
        assert_eq!(sub.height(), 2);

        let empty = view.sub_image(4, 4, 1, 1);
        assert_eq!(empty.width(), 0);
        assert_eq!(empty.height(), 0);
    }

    #[test]
    fn gray_roundtrip_preserves_dimensions() {
        let img = OwnedImage::from_rgba(3, &[128u8; 3 * 2 * 4]);
        let gray = img.to_gray_image();
        let back = OwnedImage::from_gray_as_rgb(&gray);
        assert_eq!(back.width(), 3);
        assert_eq!(back.height(), 2);
    }
}
