// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::path::{Path, PathBuf};

use crate::error::SheathError;

/// Collect file paths from a directory with an optional substring filter
///
/// Results are sorted so batch runs are reproducible.
///
/// # Arguments
///
/// * `directory` - Path to directory containing files
/// * `valid_ext` - Lowercase extensions to keep
/// * `substring` - Only include files whose name contains this substring
///
/// # Examples
///
/// ```no_run
/// use sheath_core::constant::SUPPORTED_IMAGE_FORMATS;
/// use sheath_core::ut::path::collect_file_paths;
///
/// let files = collect_file_paths("directory/", SUPPORTED_IMAGE_FORMATS.as_slice(), None);
/// ```
pub fn collect_file_paths<P: AsRef<Path>>(
    directory: P,
    valid_ext: &[&str],
    substring: Option<String>,
) -> Result<Vec<PathBuf>, SheathError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(&directory)
        .map_err(|err| SheathError::DirError(format!("{} ({})", directory.as_ref().display(), err)))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| valid_ext.contains(&ext.to_lowercase().as_str()))
        })
        .collect();

    if let Some(substring) = substring {
        files.retain(|f| {
            f.file_name()
                .map(|name| name.to_string_lossy().contains(&substring))
                .unwrap_or(false)
        });
    }

    files.sort();

    Ok(files)
}

/// Names of the models available in a models directory
///
/// Every sub-directory is a model, named after the directory.
pub fn list_models<P: AsRef<Path>>(models_dir: P) -> Result<Vec<String>, SheathError> {
    let mut models: Vec<String> = std::fs::read_dir(&models_dir)
        .map_err(|err| SheathError::DirError(format!("{} ({})", models_dir.as_ref().display(), err)))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter_map(|path| path.file_name().map(|name| name.to_string_lossy().to_string()))
        .collect();

    models.sort();

    Ok(models)
}

/// Path to a named model, failing if it is not available
pub fn resolve_model<P: AsRef<Path>>(models_dir: P, model: &str) -> Result<PathBuf, SheathError> {
    let available = list_models(&models_dir)?;

    if !available.iter().any(|name| name == model) {
        return Err(SheathError::OtherError(format!(
            "Model '{}' is not available. Choose one of: {:?}",
            model, available
        )));
    }

    Ok(models_dir.as_ref().join(model))
}
