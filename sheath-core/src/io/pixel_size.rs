// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::path::{Path, PathBuf};

use crate::constant;
use crate::error::SheathError;

/// Location of the pixel size file that belongs to an image
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use sheath_core::io::pixel_size_path;
///
/// let path = pixel_size_path("data/sample.png");
/// assert_eq!(path, Path::new("data/pixel_size_in_micrometer.txt"));
/// ```
pub fn pixel_size_path<P: AsRef<Path>>(image_path: P) -> PathBuf {
    image_path
        .as_ref()
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(constant::PIXEL_SIZE_FILE)
}

/// Parse a pixel size in micrometers from file contents
///
/// The file holds a single floating point number with no unit marker.
/// Surrounding whitespace is ignored.
pub fn parse_pixel_size(contents: &str) -> Result<f64, SheathError> {
    let trimmed = contents.trim();

    let value: f64 = trimmed
        .parse()
        .map_err(|_| SheathError::PixelSizeFormat(format!("Found '{}'", trimmed)))?;

    if !value.is_finite() || value <= 0.0 {
        return Err(SheathError::PixelSizeFormat(format!("Found '{}'", trimmed)));
    }

    Ok(value)
}

/// Read the pixel size stored next to an image
///
/// A missing file is an error; no default value is substituted.
pub fn read_pixel_size<P: AsRef<Path>>(image_path: P) -> Result<f64, SheathError> {
    let path = pixel_size_path(&image_path);

    if !path.is_file() {
        return Err(SheathError::PixelSizeMissing(format!(
            "Expected {}",
            path.display()
        )));
    }

    let contents = std::fs::read_to_string(&path)
        .map_err(|err| SheathError::PixelSizeMissing(format!("{} ({})", path.display(), err)))?;

    parse_pixel_size(&contents)
}

/// Persist a pixel size next to an image so later runs do not ask again
pub fn write_pixel_size<P: AsRef<Path>>(image_path: P, pixel_size: f64) -> Result<PathBuf, SheathError> {
    if !pixel_size.is_finite() || pixel_size <= 0.0 {
        return Err(SheathError::PixelSizeFormat(format!("Found '{}'", pixel_size)));
    }

    let path = pixel_size_path(&image_path);

    std::fs::write(&path, pixel_size.to_string())
        .map_err(|err| SheathError::OtherError(format!("{} ({})", path.display(), err)))?;

    Ok(path)
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_parse_pixel_size() {
        assert_eq!(parse_pixel_size("0.13\n").unwrap(), 0.13);
        assert_eq!(parse_pixel_size("  2 ").unwrap(), 2.0);
    }

    #[test]
    fn test_parse_pixel_size_invalid() {
        assert!(matches!(
            parse_pixel_size("0.1 um"),
            Err(SheathError::PixelSizeFormat(_))
        ));
        assert!(parse_pixel_size("").is_err());
        assert!(parse_pixel_size("-1.0").is_err());
        assert!(parse_pixel_size("0").is_err());
        assert!(parse_pixel_size("NaN").is_err());
    }

    #[test]
    fn test_read_write_pixel_size() {
        let dir = std::env::temp_dir().join(format!("sheath_pixel_size_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let image = dir.join("sample.png");

        assert!(matches!(
            read_pixel_size(&image),
            Err(SheathError::PixelSizeMissing(_))
        ));

        write_pixel_size(&image, 0.25).unwrap();
        assert_eq!(read_pixel_size(&image).unwrap(), 0.25);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
