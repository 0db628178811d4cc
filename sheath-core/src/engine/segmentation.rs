// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::constant;
use crate::error::SheathError;

/// Immutable settings for a single segmentation run
///
/// Missing fields in a settings file fall back to their defaults.
///
/// # Examples
///
/// ```
/// use sheath_core::engine::SegmentationSettings;
///
/// let settings: SegmentationSettings = serde_json::from_str(r#"{"zoom_factor": 1.5}"#).unwrap();
///
/// assert_eq!(settings.zoom_factor, 1.5);
/// assert_eq!(settings.overlap, 48);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationSettings {
    /// Overlap in pixels between neighboring inference patches
    pub overlap: u32,
    /// Resampling factor applied to the image before inference
    pub zoom_factor: f64,
    /// Index of the GPU used by the engine
    pub gpu_id: i32,
    /// Segment the whole image at once instead of in patches
    pub no_patch: bool,
}

impl Default for SegmentationSettings {
    fn default() -> Self {
        SegmentationSettings {
            overlap: constant::DEFAULT_OVERLAP,
            zoom_factor: constant::DEFAULT_ZOOM_FACTOR,
            gpu_id: constant::DEFAULT_GPU_ID,
            no_patch: false,
        }
    }
}

impl SegmentationSettings {
    /// Read settings from a JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self, SheathError> {
        let contents = std::fs::read_to_string(&path).map_err(|err| {
            SheathError::SettingsError(format!("{} ({})", path.as_ref().display(), err))
        })?;

        let settings: SegmentationSettings = serde_json::from_str(&contents)
            .map_err(|err| SheathError::SettingsError(err.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SheathError> {
        if !self.zoom_factor.is_finite() || self.zoom_factor <= 0.0 {
            return Err(SheathError::SettingsError(
                "Zoom factor must be a positive number".to_string(),
            ));
        }

        Ok(())
    }
}

/// File suffixes the segmentation engine appends to an image's stem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskSuffixes {
    pub axon: String,
    pub myelin: String,
    pub axonmyelin: String,
}

impl Default for MaskSuffixes {
    fn default() -> Self {
        MaskSuffixes {
            axon: constant::AXON_SUFFIX.to_string(),
            myelin: constant::MYELIN_SUFFIX.to_string(),
            axonmyelin: constant::AXONMYELIN_SUFFIX.to_string(),
        }
    }
}

impl MaskSuffixes {
    /// Output paths for an image, placed in `directory`
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use sheath_core::engine::MaskSuffixes;
    ///
    /// let paths = MaskSuffixes::default().paths("data/sample.png", Path::new("data"));
    ///
    /// assert_eq!(paths.axon, Path::new("data/sample_seg-axon.png"));
    /// assert_eq!(paths.myelin, Path::new("data/sample_seg-myelin.png"));
    /// assert_eq!(paths.axonmyelin, Path::new("data/sample_seg-axonmyelin.png"));
    /// ```
    pub fn paths<P: AsRef<Path>>(&self, image_path: P, directory: &Path) -> MaskPaths {
        let stem = image_stem(&image_path);

        MaskPaths {
            axon: directory.join(format!("{}{}", stem, self.axon)),
            myelin: directory.join(format!("{}{}", stem, self.myelin)),
            axonmyelin: directory.join(format!("{}{}", stem, self.axonmyelin)),
        }
    }

    /// Output paths next to the image itself
    pub fn beside<P: AsRef<Path>>(&self, image_path: P) -> MaskPaths {
        let directory = image_path
            .as_ref()
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .to_path_buf();

        self.paths(image_path, &directory)
    }
}

/// File name of an image without its extension
pub fn image_stem<P: AsRef<Path>>(image_path: P) -> String {
    image_path
        .as_ref()
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Locations of the axon, myelin and merged masks for one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskPaths {
    pub axon: PathBuf,
    pub myelin: PathBuf,
    pub axonmyelin: PathBuf,
}

/// Everything the segmentation engine needs for one image
#[derive(Debug, Clone)]
pub struct SegmentationRequest {
    pub image_path: PathBuf,
    pub model_path: PathBuf,
    pub pixel_size: f64,
    pub settings: SegmentationSettings,
    pub suffixes: MaskSuffixes,
}

/// An external segmentation engine
///
/// Implementations write axon and myelin masks next to the input image,
/// named with the request's suffixes, and return their paths. An input that
/// is too small for the model once resampled must be reported as
/// [`SheathError::UndersizedImage`].
pub trait SegmentationEngine {
    fn segment(&self, request: &SegmentationRequest) -> Result<MaskPaths, SheathError>;
}

/// Runs a segmentation command line program as a subprocess
///
/// # Examples
///
/// ```
/// use sheath_core::engine::CommandSegmenter;
///
/// let engine = CommandSegmenter::default();
/// assert_eq!(engine.program(), "axondeepseg");
/// ```
#[derive(Debug, Clone)]
pub struct CommandSegmenter {
    program: OsString,
    leading_args: Vec<OsString>,
}

impl Default for CommandSegmenter {
    fn default() -> Self {
        CommandSegmenter::new(constant::SEGMENTATION_PROGRAM)
    }
}

impl CommandSegmenter {
    pub fn new<S: Into<OsString>>(program: S) -> Self {
        CommandSegmenter {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Arguments placed before the generated ones (e.g. a wrapper script)
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Command line arguments for a request
    pub fn arguments(&self, request: &SegmentationRequest) -> Vec<OsString> {
        let settings = &request.settings;

        let mut args = self.leading_args.clone();

        args.extend([
            OsString::from("-i"),
            request.image_path.clone().into_os_string(),
            OsString::from("-m"),
            request.model_path.clone().into_os_string(),
            OsString::from("-s"),
            OsString::from(request.pixel_size.to_string()),
            OsString::from("--overlap"),
            OsString::from(settings.overlap.to_string()),
            OsString::from("-z"),
            OsString::from(settings.zoom_factor.to_string()),
            OsString::from("--gpu-id"),
            OsString::from(settings.gpu_id.to_string()),
        ]);

        if settings.no_patch {
            args.push(OsString::from("--no-patch"));
        }

        args
    }
}

impl SegmentationEngine for CommandSegmenter {
    fn segment(&self, request: &SegmentationRequest) -> Result<MaskPaths, SheathError> {
        let status = Command::new(&self.program)
            .args(self.arguments(request))
            .status()
            .map_err(|err| {
                SheathError::SegmentationError(format!(
                    "Could not launch '{}' ({})",
                    self.program(),
                    err
                ))
            })?;

        match status.code() {
            Some(0) => {}
            Some(constant::UNDERSIZED_IMAGE_EXIT_CODE) => return Err(SheathError::UndersizedImage),
            Some(code) => {
                return Err(SheathError::SegmentationError(format!(
                    "'{}' exited with code {}",
                    self.program(),
                    code
                )));
            }
            None => {
                return Err(SheathError::SegmentationError(format!(
                    "'{}' was terminated by a signal",
                    self.program()
                )));
            }
        }

        let paths = request.suffixes.beside(&request.image_path);

        for path in [&paths.axon, &paths.myelin] {
            if !path.is_file() {
                return Err(SheathError::SegmentationError(format!(
                    "Expected output {} was not written",
                    path.display()
                )));
            }
        }

        Ok(paths)
    }
}

#[cfg(test)]
mod test {

    use super::*;

    fn request(image_path: PathBuf) -> SegmentationRequest {
        SegmentationRequest {
            image_path,
            model_path: PathBuf::from("models/model_seg_generalist"),
            pixel_size: 0.1,
            settings: SegmentationSettings::default(),
            suffixes: MaskSuffixes::default(),
        }
    }

    #[test]
    fn test_arguments() {
        let engine = CommandSegmenter::default();
        let mut request = request(PathBuf::from("data/sample.png"));
        request.settings.no_patch = true;

        let args: Vec<String> = engine
            .arguments(&request)
            .into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();

        assert_eq!(
            args,
            [
                "-i",
                "data/sample.png",
                "-m",
                "models/model_seg_generalist",
                "-s",
                "0.1",
                "--overlap",
                "48",
                "-z",
                "1",
                "--gpu-id",
                "0",
                "--no-patch"
            ]
        );
    }

    #[test]
    fn test_settings_validation() {
        let settings = SegmentationSettings {
            zoom_factor: 0.0,
            ..SegmentationSettings::default()
        };

        assert!(settings.validate().is_err());
        assert!(SegmentationSettings::default().validate().is_ok());
    }

    #[test]
    fn test_missing_program() {
        let engine = CommandSegmenter::new("sheath-test-program-that-does-not-exist");
        let result = engine.segment(&request(PathBuf::from("sample.png")));

        assert!(matches!(result, Err(SheathError::SegmentationError(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_four_is_undersized() {
        let engine = CommandSegmenter::new("sh").with_args(["-c", "exit 4", "sh"]);
        let result = engine.segment(&request(PathBuf::from("sample.png")));

        assert!(matches!(result, Err(SheathError::UndersizedImage)));
    }

    #[cfg(unix)]
    #[test]
    fn test_other_exit_codes_fail() {
        let engine = CommandSegmenter::new("sh").with_args(["-c", "exit 2", "sh"]);
        let result = engine.segment(&request(PathBuf::from("sample.png")));

        assert!(matches!(result, Err(SheathError::SegmentationError(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_success_without_outputs_fails() {
        let engine = CommandSegmenter::new("true");
        let image = std::env::temp_dir().join("sheath_no_outputs.png");
        let result = engine.segment(&request(image));

        assert!(matches!(result, Err(SheathError::SegmentationError(_))));
    }
}
