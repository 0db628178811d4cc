// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::fmt;

#[derive(Debug, Clone)]
pub enum SheathError {
    BufferSizeError,
    ShapeMismatchError,
    ImageError(&'static str),
    ImageReadError,
    ImageWriteError,
    ImageExtensionError,
    MaskError(&'static str),
    MaskFormatError,
    MaskOverflowError(u32),
    LayerError(String),
    SelectionError,
    MissingAssociation(String),
    MetadataError(String),
    PixelSizeMissing(String),
    PixelSizeFormat(String),
    UndersizedImage,
    SegmentationError(String),
    SettingsError(String),
    TableWriteError(String),
    NoFileError(String),
    DirError(String),
    OtherError(String),
}

impl fmt::Display for SheathError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SheathError::BufferSizeError => {
                write!(
                    f,
                    "[sheath::BufferSizeError] The buffer does not match provided size."
                )
            }
            SheathError::ShapeMismatchError => {
                write!(
                    f,
                    "[sheath::ShapeMismatchError] Rasters must share the same width and height."
                )
            }
            SheathError::ImageError(message) => {
                write!(f, "[sheath::ImageError] Failed to create image. {}", message)
            }
            SheathError::ImageReadError => {
                write!(f, "[sheath::ImageReadError] Failed to read image.")
            }
            SheathError::ImageWriteError => {
                write!(f, "[sheath::ImageWriteError] Failed to write image.")
            }
            SheathError::ImageExtensionError => {
                write!(
                    f,
                    "[sheath::ImageExtensionError] Could not detect a valid image extension for input."
                )
            }
            SheathError::MaskError(message) => {
                write!(f, "[sheath::MaskError] Failed to create mask. {}", message)
            }
            SheathError::MaskFormatError => {
                write!(
                    f,
                    "[sheath::MaskFormatError] Only 1-channel u8, u16 and u32 masks are currently supported."
                )
            }
            SheathError::MaskOverflowError(value) => {
                write!(
                    f,
                    "[sheath::MaskOverflowError] Mask value {} does not fit in a 16-bit image. Save as .npy to keep every label.",
                    value
                )
            }
            SheathError::LayerError(message) => {
                write!(f, "[sheath::LayerError] {}.", message)
            }
            SheathError::SelectionError => {
                write!(
                    f,
                    "[sheath::SelectionError] Exactly one layer must be selected."
                )
            }
            SheathError::MissingAssociation(message) => {
                write!(
                    f,
                    "[sheath::MissingAssociation] No associated layer could be found. {}.",
                    message
                )
            }
            SheathError::MetadataError(key) => {
                write!(
                    f,
                    "[sheath::MetadataError] Layer metadata is missing the '{}' field.",
                    key
                )
            }
            SheathError::PixelSizeMissing(message) => {
                write!(
                    f,
                    "[sheath::PixelSizeMissing] Couldn't find pixel size information. {}.",
                    message
                )
            }
            SheathError::PixelSizeFormat(message) => {
                write!(
                    f,
                    "[sheath::PixelSizeFormat] Pixel size file must hold a single positive number. {}.",
                    message
                )
            }
            SheathError::UndersizedImage => {
                write!(
                    f,
                    "[sheath::UndersizedImage] Resampled image smaller than model's patch size. Please take a look at your terminal for the minimum zoom factor value to use (see the segmentation settings)."
                )
            }
            SheathError::SegmentationError(message) => {
                write!(
                    f,
                    "[sheath::SegmentationError] Segmentation failed. {}.",
                    message
                )
            }
            SheathError::SettingsError(message) => {
                write!(
                    f,
                    "[sheath::SettingsError] Settings could not be read. {}.",
                    message
                )
            }
            SheathError::TableWriteError(message) => {
                write!(
                    f,
                    "[sheath::TableWriteError] Failed to write table. {}.",
                    message
                )
            }
            SheathError::NoFileError(message) => {
                write!(
                    f,
                    "[sheath::NoFileError] File could not be found. {}.",
                    message
                )
            }
            SheathError::DirError(message) => {
                write!(
                    f,
                    "[sheath::DirError] Directory could not be read. {}.",
                    message
                )
            }
            SheathError::OtherError(message) => {
                write!(f, "[sheath::OtherError] Error: {}.", message)
            }
        }
    }
}

impl std::error::Error for SheathError {}
