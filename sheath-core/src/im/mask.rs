// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::Path;

use image::{DynamicImage, ImageBuffer, Luma, open as open_dynamic};
use npyz::{self, DType, NpyFile, TypeChar, WriterBuilder};

use crate::constant;
use crate::cv::{connected_components, enclosed_holes, fill_holes};
use crate::error::SheathError;
use crate::im::SheathBuffer;

/// A row-major container storing mask pixels
///
/// Masks are single-channel and stored as u32 so that binary masks, the
/// 0/127/255 axonmyelin encoding and integer-labeled index rasters share a
/// type. The length of the container must be equal to the product of
/// `w` * `h`.
///
/// # Examples
///
/// ```
/// use sheath_core::im::SheathMask;
///
/// let width = 10;
/// let height = 10;
/// let buffer = vec![0u32; (width * height) as usize];
/// let buffer = SheathMask::new(width, height, 1, buffer);
///
/// assert_eq!(buffer.unwrap().len(), (width * height) as usize);
/// ```
pub type SheathMask = SheathBuffer<u32>;

// >>> I/O METHODS

impl SheathMask {
    /// Open a new mask from a provided path
    ///
    /// # Arguments
    ///
    /// * `path` - A path to a mask with a valid extension
    ///
    /// ```no_run
    /// use sheath_core::im::SheathMask;
    /// let mask = SheathMask::open("image_seg-myelin.png");
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SheathMask, SheathError> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        if !path.as_ref().is_file() {
            return Err(SheathError::NoFileError(
                path.as_ref().display().to_string(),
            ));
        }

        if let Some(ext) = extension {
            if ext == "npy" {
                let bytes = std::fs::read(&path).map_err(|_| SheathError::ImageReadError)?;
                let npy = NpyFile::new(&bytes[..]).map_err(|_| SheathError::ImageReadError)?;
                return Self::new_from_numpy(npy);
            }

            if constant::IMAGE_DYNAMIC_FORMATS.iter().any(|e| e == &ext) {
                let image = open_dynamic(&path).map_err(|_| SheathError::ImageReadError)?;
                return Self::new_from_dynamic(image);
            }
        }

        Err(SheathError::ImageExtensionError)
    }

    /// Initialize a new mask from a DynamicImage
    ///
    /// # Arguments
    ///
    /// * `mask` - An 8 or 16-bit grayscale DynamicImage
    ///
    /// # Examples
    ///
    /// ```
    /// use image::{GrayImage, DynamicImage};
    /// use sheath_core::im::SheathMask;
    ///
    /// let gray = GrayImage::new(10, 10);
    /// let dynamic = DynamicImage::ImageLuma8(gray);
    /// let mask = SheathMask::new_from_dynamic(dynamic);
    /// assert!(mask.is_ok());
    /// ```
    pub fn new_from_dynamic(mask: DynamicImage) -> Result<SheathMask, SheathError> {
        let width = mask.width();
        let height = mask.height();

        match mask {
            DynamicImage::ImageLuma8(buffer) => SheathMask::new(
                width,
                height,
                1,
                buffer.into_raw().into_iter().map(|p| p as u32).collect(),
            ),
            DynamicImage::ImageLumaA8(buffer) => SheathMask::new(
                width,
                height,
                1,
                buffer
                    .into_raw()
                    .chunks_exact(2)
                    .map(|p| p[0] as u32)
                    .collect(),
            ),
            DynamicImage::ImageLuma16(buffer) => SheathMask::new(
                width,
                height,
                1,
                buffer.into_raw().into_iter().map(|p| p as u32).collect(),
            ),
            DynamicImage::ImageLumaA16(buffer) => SheathMask::new(
                width,
                height,
                1,
                buffer
                    .into_raw()
                    .chunks_exact(2)
                    .map(|p| p[0] as u32)
                    .collect(),
            ),
            // Segmentation outputs are sometimes written as RGB(A) with
            // equal channels, so the first channel is taken as the label
            DynamicImage::ImageRgb8(buffer) => SheathMask::new(
                width,
                height,
                1,
                buffer
                    .into_raw()
                    .chunks_exact(3)
                    .map(|p| p[0] as u32)
                    .collect(),
            ),
            DynamicImage::ImageRgba8(buffer) => SheathMask::new(
                width,
                height,
                1,
                buffer
                    .into_raw()
                    .chunks_exact(4)
                    .map(|p| p[0] as u32)
                    .collect(),
            ),
            _ => Err(SheathError::MaskError(
                "A dynamic image mask with a valid data type was not detected.",
            )),
        }
    }

    /// Initialize a new mask from a numpy array buffer
    ///
    /// # Arguments
    ///
    /// * `npy` - A (height, width) or (height, width, 1) shaped numpy array
    pub fn new_from_numpy(npy: NpyFile<&[u8]>) -> Result<SheathMask, SheathError> {
        let shape = npy.shape().to_vec();

        let (h, w, c) = match shape.len() {
            2 => (shape[0] as u32, shape[1] as u32, 1u32),
            3 => (shape[0] as u32, shape[1] as u32, shape[2] as u32),
            _ => {
                return Err(SheathError::MaskError(
                    "Numpy array masks must have an (H, W) shape.",
                ));
            }
        };

        if c != 1 {
            return Err(SheathError::MaskFormatError);
        }

        let read_error = |_| SheathError::ImageReadError;

        match npy.dtype() {
            DType::Plain(x) => match (x.type_char(), x.size_field()) {
                (TypeChar::Bool, 1) => SheathMask::new(
                    w,
                    h,
                    1,
                    npy.into_vec::<bool>()
                        .map_err(read_error)?
                        .into_iter()
                        .map(|p| p as u32)
                        .collect(),
                ),
                (TypeChar::Uint, 1) => SheathMask::new(
                    w,
                    h,
                    1,
                    npy.into_vec::<u8>()
                        .map_err(read_error)?
                        .into_iter()
                        .map(|p| p as u32)
                        .collect(),
                ),
                (TypeChar::Uint, 2) => SheathMask::new(
                    w,
                    h,
                    1,
                    npy.into_vec::<u16>()
                        .map_err(read_error)?
                        .into_iter()
                        .map(|p| p as u32)
                        .collect(),
                ),
                (TypeChar::Uint, 4) => {
                    SheathMask::new(w, h, 1, npy.into_vec::<u32>().map_err(read_error)?)
                }
                _ => Err(SheathError::MaskFormatError),
            },
            _ => Err(SheathError::MaskError(
                "Only plain numpy mask arrays are currently supported.",
            )),
        }
    }

    /// Save mask values as-is
    ///
    /// Masks are written as 8-bit when every value fits and as 16-bit
    /// otherwise. Values above 65535 only fit in .npy output, which keeps
    /// the full u32 labels.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SheathError> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        if let Some(ext) = extension {
            if ext == "npy" {
                return self.save_as_numpy(path);
            }

            if constant::IMAGE_DYNAMIC_FORMATS.iter().any(|e| e == &ext) {
                let max = self.iter().copied().max().unwrap_or(0);

                if max > u16::MAX as u32 {
                    return Err(SheathError::MaskOverflowError(max));
                }

                if max <= u8::MAX as u32 {
                    ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(
                        self.width(),
                        self.height(),
                        self.to_u8(),
                    )
                    .ok_or(SheathError::ImageWriteError)?
                    .save(path)
                    .map_err(|_| SheathError::ImageWriteError)?;
                } else {
                    ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(
                        self.width(),
                        self.height(),
                        self.to_u16(),
                    )
                    .ok_or(SheathError::ImageWriteError)?
                    .save(path)
                    .map_err(|_| SheathError::ImageWriteError)?;
                }

                return Ok(());
            }
        }

        Err(SheathError::ImageExtensionError)
    }

    /// Save a binary view of the mask where foreground is written as 255
    pub fn save_binary<P: AsRef<Path>>(&self, path: P) -> Result<(), SheathError> {
        self.binary_scaled(255).save(path)
    }

    fn save_as_numpy<P: AsRef<Path>>(&self, path: P) -> Result<(), SheathError> {
        let mut buffer = vec![];
        let mut writer = npyz::WriteOptions::<u32>::new()
            .default_dtype()
            .shape(&[self.height() as u64, self.width() as u64])
            .writer(&mut buffer)
            .begin_nd()
            .map_err(|_| SheathError::ImageWriteError)?;

        for value in self.iter() {
            writer
                .push(value)
                .map_err(|_| SheathError::ImageWriteError)?;
        }

        writer.finish().map_err(|_| SheathError::ImageWriteError)?;
        std::fs::write(&path, buffer).map_err(|_| SheathError::ImageWriteError)
    }
}

// <<< I/O METHODS

// >>> TRANSFORM METHODS

impl SheathMask {
    /// Fail with [`SheathError::MaskFormatError`] unless the mask has one channel
    pub fn ensure_single_channel(&self) -> Result<(), SheathError> {
        if self.channels() != 1 {
            return Err(SheathError::MaskFormatError);
        }

        Ok(())
    }

    /// Set every non-zero pixel to 1
    pub fn binarize(&self) -> SheathMask {
        self.binary_scaled(1)
    }

    fn binary_scaled(&self, value: u32) -> SheathMask {
        self.map(|p| if p != 0 { value } else { 0 })
    }

    /// Number of non-zero pixels
    pub fn count_foreground(&self) -> usize {
        self.iter().filter(|&&p| p != 0).count()
    }

    /// Label 8-connected objects with incremental ids in raster order
    ///
    /// Returns the labeled mask and the number of objects. Labels start at 1
    /// and follow the order in which each object is first met scanning rows
    /// top to bottom.
    ///
    /// # Examples
    ///
    /// ```
    /// use sheath_core::im::SheathMask;
    ///
    /// let mask = SheathMask::new(3, 3, 1, vec![1, 0, 1, 0, 0, 0, 1, 1, 0]).unwrap();
    /// let (labels, n) = mask.label().unwrap();
    ///
    /// assert_eq!(n, 3);
    /// assert_eq!(labels.as_raw(), &[1, 0, 2, 0, 0, 0, 3, 3, 0]);
    /// ```
    pub fn label(&self) -> Result<(SheathMask, u32), SheathError> {
        self.ensure_single_channel()?;

        let roots = connected_components(self.width(), self.height(), self.as_raw());

        let mut remap = std::collections::HashMap::new();
        let mut next = 0u32;

        let buffer: Vec<u32> = roots
            .into_iter()
            .map(|root| {
                if root == 0 {
                    return 0;
                }
                *remap.entry(root).or_insert_with(|| {
                    next += 1;
                    next
                })
            })
            .collect();

        let labeled = SheathMask::new(self.width(), self.height(), 1, buffer)?;

        Ok((labeled, next))
    }

    /// Fill background regions enclosed by foreground
    ///
    /// Output keeps the foreground and adds every hole, both set to 1.
    pub fn fill_holes(&self) -> Result<SheathMask, SheathError> {
        self.ensure_single_channel()?;
        let buffer = fill_holes(self.width(), self.height(), self.as_raw());
        SheathMask::new(self.width(), self.height(), 1, buffer)
    }

    /// Only the holes enclosed by foreground, set to 1
    ///
    /// Applied to a myelin mask this yields the axon interior.
    pub fn enclosed_holes(&self) -> Result<SheathMask, SheathError> {
        self.ensure_single_channel()?;
        let buffer = enclosed_holes(self.width(), self.height(), self.as_raw());
        SheathMask::new(self.width(), self.height(), 1, buffer)
    }
}

// <<< TRANSFORM METHODS

// >>> AXONMYELIN METHODS

/// Merge axon and myelin masks into a single axonmyelin mask
///
/// Axon pixels are written as 255 and myelin pixels as 127. Axon wins where
/// both masks are set.
///
/// # Examples
///
/// ```
/// use sheath_core::im::{SheathMask, merge_axonmyelin};
///
/// let axon = SheathMask::new(3, 1, 1, vec![1, 0, 0]).unwrap();
/// let myelin = SheathMask::new(3, 1, 1, vec![1, 1, 0]).unwrap();
///
/// let merged = merge_axonmyelin(&axon, &myelin).unwrap();
/// assert_eq!(merged.as_raw(), &[255, 127, 0]);
/// ```
pub fn merge_axonmyelin(axon: &SheathMask, myelin: &SheathMask) -> Result<SheathMask, SheathError> {
    if !axon.same_extent(myelin) {
        return Err(SheathError::ShapeMismatchError);
    }

    let buffer = axon
        .iter()
        .zip(myelin.iter())
        .map(|(&a, &m)| {
            if a != 0 {
                constant::AXONMYELIN_AXON_VALUE
            } else if m != 0 {
                constant::AXONMYELIN_MYELIN_VALUE
            } else {
                0
            }
        })
        .collect();

    SheathMask::new(axon.width(), axon.height(), 1, buffer)
}

/// Split an axonmyelin mask into binary axon and myelin masks
///
/// Values above 200 are axon, values in (100, 200] are myelin and anything
/// else is background.
pub fn split_axonmyelin(axonmyelin: &SheathMask) -> (SheathMask, SheathMask) {
    let axon = axonmyelin.map(|p| (p > constant::AXONMYELIN_AXON_THRESHOLD) as u32);

    let myelin = axonmyelin.map(|p| {
        (p > constant::AXONMYELIN_MYELIN_THRESHOLD && p <= constant::AXONMYELIN_AXON_THRESHOLD)
            as u32
    });

    (axon, myelin)
}

// <<< AXONMYELIN METHODS

#[cfg(test)]
mod test {

    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("sheath_mask_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_mask_save_open_png() {
        let path = temp_path("TEST_SAVE_MASK.png");

        let mask = SheathMask::new(2, 2, 1, vec![0, 255, 127, 0]).unwrap();
        mask.save(&path).unwrap();

        let reopened = SheathMask::open(&path).unwrap();
        assert_eq!(mask.as_raw(), reopened.as_raw());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_mask_save_open_numpy() {
        let path = temp_path("TEST_SAVE_MASK.npy");

        let mask = SheathMask::new(3, 1, 1, vec![0, 70_000, 3]).unwrap();
        mask.save(&path).unwrap();

        let reopened = SheathMask::open(&path).unwrap();
        assert_eq!(mask.as_raw(), reopened.as_raw());
        assert_eq!(reopened.shape(), (1, 3, 1));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_mask_save_large_labels_png() {
        let path = temp_path("TEST_SAVE_LABELS.png");

        let mask = SheathMask::new(2, 1, 1, vec![1, 1000]).unwrap();
        mask.save(&path).unwrap();

        let reopened = SheathMask::open(&path).unwrap();
        assert_eq!(reopened.as_raw(), &[1, 1000]);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_mask_save_rejects_labels_above_u16() {
        let path = temp_path("TEST_SAVE_OVERFLOW.png");

        let mask = SheathMask::new(2, 1, 1, vec![1, 70_000]).unwrap();
        let result = mask.save(&path);

        assert!(matches!(result, Err(SheathError::MaskOverflowError(70_000))));
        assert!(!path.exists());
    }

    #[test]
    fn test_mask_save_binary() {
        let path = temp_path("TEST_SAVE_BINARY.png");

        let mask = SheathMask::new(3, 1, 1, vec![0, 1, 7]).unwrap();
        mask.save_binary(&path).unwrap();

        let reopened = SheathMask::open(&path).unwrap();
        assert_eq!(reopened.as_raw(), &[0, 255, 255]);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_mask_open_missing() {
        let result = SheathMask::open(temp_path("does_not_exist.png"));
        assert!(matches!(result, Err(SheathError::NoFileError(_))));
    }

    #[test]
    fn test_mask_label_incremental() {
        let mut data = vec![0u32; 100];

        data[5] = 1;
        data[25] = 1;
        data[45] = 1;
        data[65] = 1;
        data[85] = 1;

        let mask = SheathMask::new(10, 10, 1, data).unwrap();
        let (labels, n) = mask.label().unwrap();

        assert_eq!(n, 5);
        assert_eq!(labels.as_raw()[5], 1);
        assert_eq!(labels.as_raw()[25], 2);
        assert_eq!(labels.as_raw()[85], 5);
    }

    #[test]
    fn test_split_axonmyelin() {
        let merged = SheathMask::new(4, 1, 1, vec![255, 127, 0, 50]).unwrap();
        let (axon, myelin) = split_axonmyelin(&merged);

        assert_eq!(axon.as_raw(), &[1, 0, 0, 0]);
        assert_eq!(myelin.as_raw(), &[0, 1, 0, 0]);
    }

    #[test]
    fn test_binarize_keeps_channels() {
        let mask = SheathMask::new(2, 2, 3, vec![1; 12]).unwrap();
        let binary = mask.binarize();

        assert_eq!(binary.shape(), (2, 2, 3));
        assert_eq!(binary.count_foreground(), 12);
    }

    #[test]
    fn test_multichannel_transforms_fail() {
        let mask = SheathMask::new(2, 2, 2, vec![1; 8]).unwrap();

        assert!(matches!(mask.label(), Err(SheathError::MaskFormatError)));
        assert!(matches!(mask.fill_holes(), Err(SheathError::MaskFormatError)));
        assert!(matches!(mask.enclosed_holes(), Err(SheathError::MaskFormatError)));
        assert!(mask.ensure_single_channel().is_err());
        assert!(SheathMask::zeros(2, 2, 1).ensure_single_channel().is_ok());
    }

    #[test]
    fn test_merge_shape_mismatch() {
        let axon = SheathMask::zeros(2, 2, 1);
        let myelin = SheathMask::zeros(3, 2, 1);

        assert!(merge_axonmyelin(&axon, &myelin).is_err());
    }
}
