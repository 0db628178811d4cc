// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::Path;

use image::{DynamicImage, ImageBuffer, Luma, Rgb, open as open_dynamic};

use crate::constant;
use crate::error::SheathError;
use crate::im::{SheathBuffer, SheathMask};

/// A row-major 8-bit image with 1 (grayscale) or 3 (RGB) channels
///
/// Microscopy acquisitions at higher bit depths are scaled down to 8 bits on
/// load, which is all that display and overlay need.
///
/// # Examples
///
/// ```
/// use sheath_core::im::SheathImage;
///
/// let image = SheathImage::new(4, 4, 1, vec![0u8; 16]);
/// assert!(image.is_ok());
/// ```
pub type SheathImage = SheathBuffer<u8>;

// >>> I/O METHODS

impl SheathImage {
    /// Open a new image from a provided path
    ///
    /// # Arguments
    ///
    /// * `path` - A path to an image with a valid extension
    ///
    /// ```no_run
    /// use sheath_core::im::SheathImage;
    /// let image = SheathImage::open("image.png");
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SheathImage, SheathError> {
        if !path.as_ref().is_file() {
            return Err(SheathError::NoFileError(
                path.as_ref().display().to_string(),
            ));
        }

        let extension = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        if let Some(ext) = extension {
            if constant::IMAGE_DYNAMIC_FORMATS.iter().any(|e| e == &ext) {
                let image = open_dynamic(&path).map_err(|_| SheathError::ImageReadError)?;
                return Self::new_from_dynamic(image);
            }
        }

        Err(SheathError::ImageExtensionError)
    }

    /// Initialize a new image from a DynamicImage
    ///
    /// Grayscale inputs stay single channel, anything with color becomes RGB.
    pub fn new_from_dynamic(image: DynamicImage) -> Result<SheathImage, SheathError> {
        let width = image.width();
        let height = image.height();

        match image {
            DynamicImage::ImageLuma8(buffer) => SheathImage::new(width, height, 1, buffer.into_raw()),
            DynamicImage::ImageRgb8(buffer) => SheathImage::new(width, height, 3, buffer.into_raw()),
            other => {
                if other.color().has_color() {
                    SheathImage::new(width, height, 3, other.into_rgb8().into_raw())
                } else {
                    SheathImage::new(width, height, 1, other.into_luma8().into_raw())
                }
            }
        }
    }

    /// Save image as an 8-bit grayscale or RGB file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SheathError> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        let valid = extension
            .as_ref()
            .is_some_and(|ext| constant::IMAGE_DYNAMIC_FORMATS.iter().any(|e| e == ext));

        if !valid {
            return Err(SheathError::ImageExtensionError);
        }

        match self.channels() {
            1 => ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(
                self.width(),
                self.height(),
                self.as_raw().to_vec(),
            )
            .ok_or(SheathError::ImageWriteError)?
            .save(path)
            .map_err(|_| SheathError::ImageWriteError),
            3 => ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(
                self.width(),
                self.height(),
                self.as_raw().to_vec(),
            )
            .ok_or(SheathError::ImageWriteError)?
            .save(path)
            .map_err(|_| SheathError::ImageWriteError),
            _ => Err(SheathError::ImageError(
                "Only 1 and 3-channel images can be saved.",
            )),
        }
    }
}

// <<< I/O METHODS

/// Blend mask colors over an image
///
/// Every non-zero pixel of a mask is mixed with its color at `opacity`.
/// Later masks are drawn over earlier ones. The output is always RGB.
///
/// # Arguments
///
/// * `image` - A grayscale or RGB image
/// * `masks` - Masks paired with their display color
/// * `opacity` - Blend weight of the mask color in [0, 1]
///
/// # Examples
///
/// ```
/// use sheath_core::im::{SheathImage, SheathMask, colorize};
///
/// let image = SheathImage::new(2, 1, 1, vec![0, 100]).unwrap();
/// let mask = SheathMask::new(2, 1, 1, vec![1, 0]).unwrap();
///
/// let overlay = colorize(&image, &[(&mask, [255, 0, 0])], 1.0).unwrap();
/// assert_eq!(overlay.as_raw(), &[255, 0, 0, 100, 100, 100]);
/// ```
pub fn colorize(
    image: &SheathImage,
    masks: &[(&SheathMask, [u8; 3])],
    opacity: f32,
) -> Result<SheathImage, SheathError> {
    let opacity = opacity.clamp(0.0, 1.0);

    for (mask, _) in masks {
        mask.ensure_single_channel()?;

        if !image.same_extent(*mask) {
            return Err(SheathError::ShapeMismatchError);
        }
    }

    let mut rgb: Vec<u8> = match image.channels() {
        1 => image.iter().flat_map(|&p| [p, p, p]).collect(),
        3 => image.as_raw().to_vec(),
        _ => {
            return Err(SheathError::ImageError(
                "Only 1 and 3-channel images can be colorized.",
            ));
        }
    };

    for (mask, color) in masks {
        for (idx, _) in mask.iter().enumerate().filter(|(_, p)| **p != 0) {
            for (c, &value) in color.iter().enumerate() {
                let base = rgb[idx * 3 + c] as f32;
                let blended = base * (1.0 - opacity) + value as f32 * opacity;
                rgb[idx * 3 + c] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    SheathImage::new(image.width(), image.height(), 3, rgb)
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_image_save_open() {
        let path = std::env::temp_dir().join(format!("sheath_image_{}.png", std::process::id()));

        let image = SheathImage::new(2, 2, 3, (0..12).collect()).unwrap();
        image.save(&path).unwrap();

        let reopened = SheathImage::open(&path).unwrap();
        assert_eq!(reopened.channels(), 3);
        assert_eq!(reopened.as_raw(), image.as_raw());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_image_open_bad_extension() {
        let path = std::env::temp_dir().join(format!("sheath_image_{}.xyz", std::process::id()));
        std::fs::write(&path, b"not an image").unwrap();

        assert!(matches!(
            SheathImage::open(&path),
            Err(SheathError::ImageExtensionError)
        ));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_colorize_blend() {
        let image = SheathImage::new(1, 1, 1, vec![100]).unwrap();
        let mask = SheathMask::new(1, 1, 1, vec![1]).unwrap();

        let overlay = colorize(&image, &[(&mask, [200, 0, 100])], 0.5).unwrap();
        assert_eq!(overlay.as_raw(), &[150, 50, 100]);
    }

    #[test]
    fn test_colorize_later_mask_on_top() {
        let image = SheathImage::new(1, 1, 1, vec![0]).unwrap();
        let axon = SheathMask::new(1, 1, 1, vec![1]).unwrap();
        let myelin = SheathMask::new(1, 1, 1, vec![1]).unwrap();

        let overlay = colorize(&image, &[(&myelin, [255, 0, 0]), (&axon, [0, 0, 255])], 1.0).unwrap();
        assert_eq!(overlay.as_raw(), &[0, 0, 255]);
    }

    #[test]
    fn test_colorize_shape_mismatch() {
        let image = SheathImage::zeros(2, 2, 1);
        let mask = SheathMask::zeros(3, 3, 1);

        assert!(colorize(&image, &[(&mask, [255, 0, 0])], 0.7).is_err());
    }

    #[test]
    fn test_colorize_rejects_multichannel_mask() {
        let image = SheathImage::zeros(2, 2, 1);
        let mask = SheathMask::new(2, 2, 2, vec![1; 8]).unwrap();

        assert!(matches!(
            colorize(&image, &[(&mask, [255, 0, 0])], 1.0),
            Err(SheathError::MaskFormatError)
        ));
    }
}
