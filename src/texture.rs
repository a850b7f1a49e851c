//! Decoded pixel data and the CPU-side preparation shared by every backend.
//!
//! [`TextureData`] is the hand-off format between the image decoder and the
//! [`Registry`](crate::Registry): tightly packed rows, 3 or 4 channels, origin at the
//! bottom-left corner. Backends convert it to RGBA8 with [`TextureData::to_rgba8`] and
//! the GPU backend uploads the full chain produced by [`mip_chain`].

use std::path::Path;

/// Channel layout of uploaded pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb,
    Rgba,
}

impl PixelFormat {
    /// Maps a decoder channel count to a layout.
    ///
    /// Anything other than 4 is treated as RGB. This mirrors the upload path of the
    /// GL renderer this crate's pipeline is modeled on; it is a known quirk, not an
    /// error.
    pub fn from_channels(channels: u32) -> Self {
        match channels {
            4 => PixelFormat::Rgba,
            3 => PixelFormat::Rgb,
            other => {
                log::warn!("unsupported channel count {other}, uploading as RGB");
                PixelFormat::Rgb
            }
        }
    }

    /// Bytes per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// Decoded image ready for upload.
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    /// Channel count reported by the decoder (3 or 4 for supported images).
    pub channels: u32,
    /// Row-major pixels without row padding, first row at the bottom.
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Wraps already decoded pixels.
    pub fn new(width: u32, height: u32, channels: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels,
            pixels,
        }
    }

    /// Creates an image filled with one RGB color.
    pub fn solid_rgb(width: u32, height: u32, color: [u8; 3]) -> Self {
        let pixels = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self::new(width, height, 3, pixels)
    }

    /// Decodes an image file, keeping RGB images as 3 channels and anything with
    /// alpha as 4, and flips it so the first row is the bottom one.
    pub fn decode(path: impl AsRef<Path>) -> Result<Self, image::ImageError> {
        let path = path.as_ref();
        let img = image::open(path)?.flipv();
        let (width, height) = (img.width(), img.height());

        let data = if img.color().has_alpha() {
            Self::new(width, height, 4, img.to_rgba8().into_raw())
        } else {
            Self::new(width, height, 3, img.to_rgb8().into_raw())
        };

        log::info!(
            "image {}: {}x{}x{}",
            path.display(),
            data.width,
            data.height,
            data.channels
        );
        Ok(data)
    }

    /// Channel layout used for upload.
    pub fn format(&self) -> PixelFormat {
        PixelFormat::from_channels(self.channels)
    }

    /// Expands the pixels to tightly packed RGBA8.
    ///
    /// A pixel buffer shorter than the declared size is padded with zeros rather
    /// than read out of bounds.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let count = self.width as usize * self.height as usize;
        let stride = self.format().bytes_per_pixel();
        let expected = count * stride;
        if self.pixels.len() < expected {
            log::warn!(
                "pixel buffer holds {} bytes, expected {}; padding with zeros",
                self.pixels.len(),
                expected
            );
        }

        let mut rgba = Vec::with_capacity(count * 4);
        for i in 0..count {
            let texel = |c: usize| self.pixels.get(i * stride + c).copied().unwrap_or(0);
            let alpha = match self.format() {
                PixelFormat::Rgba => texel(3),
                PixelFormat::Rgb => 255,
            };
            rgba.extend_from_slice(&[texel(0), texel(1), texel(2), alpha]);
        }
        rgba
    }
}

/// One level of a mip chain.
#[derive(Debug, Clone)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Number of levels in a full chain down to 1×1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Builds the full mip chain of an RGBA8 image with a 2×2 box filter.
///
/// Odd dimensions clamp the filter footprint at the last row/column.
pub fn mip_chain(width: u32, height: u32, rgba: Vec<u8>) -> Vec<MipLevel> {
    let mut levels = vec![MipLevel {
        width,
        height,
        rgba,
    }];

    while let Some(prev) = levels.last() {
        if prev.width <= 1 && prev.height <= 1 {
            break;
        }
        let next = downsample(prev);
        levels.push(next);
    }
    levels
}

fn downsample(src: &MipLevel) -> MipLevel {
    let width = (src.width / 2).max(1);
    let height = (src.height / 2).max(1);
    let at = |x: u32, y: u32, c: usize| -> u32 {
        let x = x.min(src.width - 1) as usize;
        let y = y.min(src.height - 1) as usize;
        u32::from(src.rgba[(y * src.width as usize + x) * 4 + c])
    };

    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            for c in 0..4 {
                let sum = at(2 * x, 2 * y, c)
                    + at(2 * x + 1, 2 * y, c)
                    + at(2 * x, 2 * y + 1, c)
                    + at(2 * x + 1, 2 * y + 1, c);
                rgba.push(((sum + 2) / 4) as u8);
            }
        }
    }

    MipLevel {
        width,
        height,
        rgba,
    }
}

/// Saves tightly packed RGBA8 pixels with a bottom-left origin to an image file.
pub fn save_rgba8(
    path: impl AsRef<Path>,
    width: u32,
    height: u32,
    rgba: Vec<u8>,
) -> Result<(), image::ImageError> {
    let buffer = image::RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
        image::ImageError::Parameter(image::error::ParameterError::from_kind(
            image::error::ParameterErrorKind::DimensionMismatch,
        ))
    })?;
    image::imageops::flip_vertical(&buffer).save(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_expands_with_opaque_alpha() {
        let data = TextureData::new(2, 1, 3, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(data.to_rgba8(), vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn unknown_channel_count_is_read_as_rgb() {
        let data = TextureData::new(1, 1, 2, vec![9, 8, 7]);
        assert_eq!(data.format(), PixelFormat::Rgb);
        assert_eq!(data.to_rgba8(), vec![9, 8, 7, 255]);
    }

    #[test]
    fn short_buffers_are_zero_padded() {
        let data = TextureData::new(2, 1, 4, vec![10, 20, 30, 40, 50]);
        assert_eq!(data.to_rgba8(), vec![10, 20, 30, 40, 50, 0, 0, 0]);
    }

    #[test]
    fn solid_fill_covers_every_pixel() {
        let data = TextureData::solid_rgb(3, 2, [7, 8, 9]);
        assert_eq!(data.pixels.len(), 18);
        assert!(data.pixels.chunks(3).all(|p| p == [7, 8, 9]));
    }

    #[test]
    fn level_count_reaches_one_pixel() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(4, 4), 3);
        assert_eq!(mip_level_count(640, 480), 10);
    }

    #[test]
    fn chain_halves_and_averages() {
        let rgba = [0u8, 0, 0, 255, 200, 200, 200, 255]
            .iter()
            .copied()
            .cycle()
            .take(4 * 2 * 4)
            .collect();
        let chain = mip_chain(4, 2, rgba);

        let sizes: Vec<_> = chain.iter().map(|l| (l.width, l.height)).collect();
        assert_eq!(sizes, vec![(4, 2), (2, 1), (1, 1)]);
        assert_eq!(chain.len() as u32, mip_level_count(4, 2));
        assert_eq!(&chain[1].rgba[..4], &[100, 100, 100, 255]);
    }
}
