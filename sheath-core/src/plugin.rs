// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

//! User actions over a [`Session`]
//!
//! Each action either completes or fails before touching the session.
//! `fill_axons` is recorded and can be undone.

use std::path::{Path, PathBuf};

use crate::constant;
use crate::engine::{
    MaskPaths, MaskSuffixes, MorphometricsEngine, SegmentationEngine, SegmentationRequest,
    SegmentationSettings, image_stem,
};
use crate::error::SheathError;
use crate::im::{SheathImage, SheathMask, colorize, merge_axonmyelin, split_axonmyelin};
use crate::io;
use crate::layer::{LayerStore, MaskKind, Session};

/// Names of the mask layers produced for one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationLayers {
    pub image: String,
    pub axon: String,
    pub myelin: String,
}

// >>> RESOLUTION HELPERS

/// Name of the image behind the current selection
pub fn selected_image_name(session: &Session) -> Result<String, SheathError> {
    let selected = session.selected().ok_or(SheathError::SelectionError)?;

    session
        .resolve_source_image(selected)
        .map(|layer| layer.name().to_string())
        .ok_or_else(|| {
            SheathError::MissingAssociation(format!(
                "Layer '{}' has no source image",
                selected.name()
            ))
        })
}

fn mask_name(session: &Session, image: &str, kind: MaskKind) -> Result<String, SheathError> {
    session
        .find_item_by_name(image)
        .and_then(|layer| session.resolve_mask(layer, kind))
        .map(|layer| layer.name().to_string())
        .ok_or_else(|| {
            SheathError::MissingAssociation(format!(
                "Image '{}' has no {} mask",
                image,
                kind.label()
            ))
        })
}

fn mask_of<'a>(session: &'a Session, name: &str) -> Result<&'a SheathMask, SheathError> {
    session
        .find_item_by_name(name)
        .and_then(|layer| layer.mask())
        .ok_or_else(|| SheathError::LayerError(format!("Layer '{}' is not a mask", name)))
}

fn image_path_of(session: &Session, image: &str) -> Result<PathBuf, SheathError> {
    session
        .find_item_by_name(image)
        .and_then(|layer| layer.metadata_str(constant::KEY_IMAGE_PATH))
        .map(PathBuf::from)
        .ok_or_else(|| SheathError::MetadataError(constant::KEY_IMAGE_PATH.to_string()))
}

/// Pixel size of an image from its metadata or, failing that, its side-channel file
///
/// Nothing is written to the session.
pub fn lookup_pixel_size(session: &Session, image: &str) -> Result<f64, SheathError> {
    if let Some(size) = session
        .find_item_by_name(image)
        .and_then(|layer| layer.metadata_f64(constant::KEY_PIXEL_SIZE))
    {
        return Ok(size);
    }

    io::read_pixel_size(image_path_of(session, image)?)
}

fn cache_pixel_size(session: &mut Session, image: &str, size: f64) {
    if let Some(layer) = session.layer_mut(image) {
        layer.set_metadata(constant::KEY_PIXEL_SIZE, size);
    }
}

// <<< RESOLUTION HELPERS

// >>> ACTIONS

/// Open an image file as a new, selected image layer
///
/// The layer is named after the file stem and remembers its path.
pub fn load_image<P: AsRef<Path>>(session: &mut Session, path: P) -> Result<String, SheathError> {
    let image = SheathImage::open(&path)?;
    let name = session.add_image(&image_stem(&path), image);

    if let Some(layer) = session.layer_mut(&name) {
        layer.set_metadata(
            constant::KEY_IMAGE_PATH,
            path.as_ref().display().to_string(),
        );
    }

    Ok(name)
}

/// Add axon and myelin masks for an image and associate them
///
/// Masks are binarized. Any earlier association of the image is replaced.
pub fn add_segmentation(
    session: &mut Session,
    image: &str,
    axon: SheathMask,
    myelin: SheathMask,
) -> Result<SegmentationLayers, SheathError> {
    let source = session
        .find_item_by_name(image)
        .and_then(|layer| layer.image())
        .ok_or_else(|| SheathError::LayerError(format!("Layer '{}' is not an image", image)))?;

    axon.ensure_single_channel()?;
    myelin.ensure_single_channel()?;

    if !source.same_extent(&axon) || !source.same_extent(&myelin) {
        return Err(SheathError::ShapeMismatchError);
    }

    let axon = session.add_mask(
        &format!("{}_{}", image, MaskKind::Axon.label()),
        axon.binarize(),
        MaskKind::Axon.color(),
    )?;

    let myelin = session.add_mask(
        &format!("{}_{}", image, MaskKind::Myelin.label()),
        myelin.binarize(),
        MaskKind::Myelin.color(),
    )?;

    session.register_masks(image, &axon, &myelin)?;

    Ok(SegmentationLayers {
        image: image.to_string(),
        axon,
        myelin,
    })
}

/// Segment the selected image with an external engine
///
/// The selection may be the image itself or any of its masks. The pixel
/// size file must exist next to the image and is cached on the image once
/// the masks have been added. The session is left untouched if the engine
/// fails.
pub fn apply_model(
    session: &mut Session,
    engine: &dyn SegmentationEngine,
    model_path: &Path,
    settings: &SegmentationSettings,
    suffixes: &MaskSuffixes,
) -> Result<SegmentationLayers, SheathError> {
    settings.validate()?;

    let image = selected_image_name(session)?;
    let image_path = image_path_of(session, &image)?;
    let pixel_size = lookup_pixel_size(session, &image)?;

    let request = SegmentationRequest {
        image_path,
        model_path: model_path.to_path_buf(),
        pixel_size,
        settings: settings.clone(),
        suffixes: suffixes.clone(),
    };

    let paths = engine.segment(&request)?;

    let axon = SheathMask::open(&paths.axon)?;
    let myelin = SheathMask::open(&paths.myelin)?;

    let layers = add_segmentation(session, &image, axon, myelin)?;
    cache_pixel_size(session, &image, pixel_size);

    Ok(layers)
}

/// Load separate axon and myelin mask files for the selected image
pub fn load_masks<P: AsRef<Path>>(
    session: &mut Session,
    axon_path: P,
    myelin_path: P,
) -> Result<SegmentationLayers, SheathError> {
    let image = selected_image_name(session)?;

    let axon = SheathMask::open(axon_path)?;
    let myelin = SheathMask::open(myelin_path)?;

    add_segmentation(session, &image, axon, myelin)
}

/// Load a combined axonmyelin mask for the selected image
///
/// Axon pixels are encoded as 255 and myelin pixels as 127.
pub fn load_mask<P: AsRef<Path>>(session: &mut Session, path: P) -> Result<SegmentationLayers, SheathError> {
    let image = selected_image_name(session)?;

    let merged = SheathMask::open(path)?;
    let (axon, myelin) = split_axonmyelin(&merged);

    add_segmentation(session, &image, axon, myelin)
}

/// Fill axon interiors enclosed by myelin into the axon mask
///
/// Only pixels inside closed myelin rings are written, so manual edits to
/// the axon mask elsewhere survive. The write is recorded and can be undone
/// with [`Session::undo`]. Returns the number of pixels that changed.
pub fn fill_axons(session: &mut Session) -> Result<usize, SheathError> {
    let image = selected_image_name(session)?;
    let axon_name = mask_name(session, &image, MaskKind::Axon)?;
    let myelin_name = mask_name(session, &image, MaskKind::Myelin)?;

    let changes: Vec<(usize, u32)> = {
        let axon = mask_of(session, &axon_name)?;
        let myelin = mask_of(session, &myelin_name)?;

        if !axon.same_extent(myelin) {
            return Err(SheathError::ShapeMismatchError);
        }

        myelin
            .enclosed_holes()?
            .iter()
            .enumerate()
            .filter(|(_, hole)| **hole != 0)
            .map(|(idx, _)| (idx, 1))
            .collect()
    };

    session.edit_mask(&axon_name, &changes)
}

/// Compute morphometrics for the selected image and save the table
///
/// The index raster is added as a layer only after the table has been
/// written, so a failed save leaves the session untouched.
pub fn compute_morphometrics(
    session: &mut Session,
    engine: &dyn MorphometricsEngine,
    output: &Path,
) -> Result<String, SheathError> {
    let image = selected_image_name(session)?;
    let axon_name = mask_name(session, &image, MaskKind::Axon)?;
    let myelin_name = mask_name(session, &image, MaskKind::Myelin)?;
    let pixel_size = lookup_pixel_size(session, &image)?;

    let mut result = engine.compute(
        mask_of(session, &axon_name)?,
        mask_of(session, &myelin_name)?,
        pixel_size,
    )?;

    io::write_table(&mut result.table, output)?;

    let index = session.add_mask(
        &format!("{}_index", image),
        result.index,
        constant::INDEX_COLOR,
    )?;

    if let Some(layer) = session.layer_mut(&index) {
        layer.set_metadata(constant::KEY_SOURCE_IMAGE, image.as_str());
    }

    cache_pixel_size(session, &image, pixel_size);

    Ok(index)
}

/// Write the selected image's axon, myelin and merged masks to a directory
pub fn save_segmentation(
    session: &Session,
    directory: &Path,
    suffixes: &MaskSuffixes,
) -> Result<MaskPaths, SheathError> {
    let image = selected_image_name(session)?;
    let axon = mask_of(session, &mask_name(session, &image, MaskKind::Axon)?)?;
    let myelin = mask_of(session, &mask_name(session, &image, MaskKind::Myelin)?)?;

    let merged = merge_axonmyelin(axon, myelin)?;

    let base = image_path_of(session, &image).unwrap_or_else(|_| PathBuf::from(&image));
    let paths = suffixes.paths(base, directory);

    axon.save_binary(&paths.axon)?;
    myelin.save_binary(&paths.myelin)?;
    merged.save(&paths.axonmyelin)?;

    Ok(paths)
}

/// Overlay the selected image's masks in their display colors
///
/// Masks that have not been created yet are skipped. The usual opacity is
/// [`constant::OVERLAY_OPACITY`].
pub fn colorize_selection(session: &Session, opacity: f32) -> Result<SheathImage, SheathError> {
    let image = selected_image_name(session)?;

    let source = session
        .find_item_by_name(&image)
        .and_then(|layer| layer.image())
        .ok_or_else(|| SheathError::LayerError(format!("Layer '{}' is not an image", image)))?;

    let masks: Vec<(&SheathMask, [u8; 3])> = [MaskKind::Myelin, MaskKind::Axon]
        .into_iter()
        .filter_map(|kind| {
            let name = mask_name(session, &image, kind).ok()?;
            let layer = session.find_item_by_name(&name)?;
            Some((layer.mask()?, layer.color().unwrap_or(kind.color())))
        })
        .collect();

    colorize(source, &masks, opacity.clamp(0.0, 1.0))
}

// <<< ACTIONS

#[cfg(test)]
mod test {

    use super::*;
    use crate::engine::{FiberCounts, MaskPaths};
    use std::cell::RefCell;

    /// A directory under the system temp dir removed on drop
    struct Scratch(PathBuf);

    impl Scratch {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!("sheath_plugin_{}_{}", std::process::id(), name));
            let _ = std::fs::remove_dir_all(&dir);
            std::fs::create_dir_all(&dir).unwrap();
            Scratch(dir)
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    /// 12x12 image with one closed myelin ring around a 4x4 interior
    fn ring() -> SheathMask {
        let mut mask = SheathMask::zeros(12, 12, 1);
        for i in 2..8 {
            mask.buffer[2 * 12 + i] = 1;
            mask.buffer[7 * 12 + i] = 1;
            mask.buffer[i * 12 + 2] = 1;
            mask.buffer[i * 12 + 7] = 1;
        }
        mask
    }

    fn write_sample(dir: &Path, pixel_size: Option<f64>) -> PathBuf {
        let path = dir.join("sample.png");
        SheathImage::zeros(12, 12, 1).save(&path).unwrap();

        if let Some(size) = pixel_size {
            io::write_pixel_size(&path, size).unwrap();
        }

        path
    }

    /// Writes fixed masks where the real engine would, and records requests
    struct FakeEngine {
        requests: RefCell<Vec<SegmentationRequest>>,
        undersized: bool,
    }

    impl FakeEngine {
        fn new(undersized: bool) -> Self {
            FakeEngine {
                requests: RefCell::new(Vec::new()),
                undersized,
            }
        }
    }

    impl SegmentationEngine for FakeEngine {
        fn segment(&self, request: &SegmentationRequest) -> Result<MaskPaths, SheathError> {
            self.requests.borrow_mut().push(request.clone());

            if self.undersized {
                return Err(SheathError::UndersizedImage);
            }

            let paths = request.suffixes.beside(&request.image_path);
            SheathMask::zeros(12, 12, 1).save(&paths.axon)?;
            ring().save_binary(&paths.myelin)?;
            Ok(paths)
        }
    }

    #[test]
    fn test_load_image() {
        let scratch = Scratch::new("load_image");
        let path = write_sample(&scratch.0, None);

        let mut session = Session::new();
        let name = load_image(&mut session, &path).unwrap();

        assert_eq!(name, "sample");
        let layer = session.selected().unwrap();
        assert!(layer.is_image());
        assert_eq!(
            layer.metadata_str(constant::KEY_IMAGE_PATH),
            Some(path.display().to_string().as_str())
        );
        assert_eq!(
            layer.metadata_str("file_path"),
            Some(path.display().to_string().as_str())
        );

        assert_eq!(load_image(&mut session, &path).unwrap(), "sample [1]");
    }

    #[test]
    fn test_apply_model_registers_masks() {
        let scratch = Scratch::new("apply_model");
        let path = write_sample(&scratch.0, Some(0.1));

        let mut session = Session::new();
        load_image(&mut session, &path).unwrap();

        let engine = FakeEngine::new(false);
        let layers = apply_model(
            &mut session,
            &engine,
            Path::new("models/generalist"),
            &SegmentationSettings::default(),
            &MaskSuffixes::default(),
        )
        .unwrap();

        assert_eq!(layers.axon, "sample_axon");
        assert_eq!(layers.myelin, "sample_myelin");

        let requests = engine.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].pixel_size, 0.1);
        assert_eq!(requests[0].image_path, path);

        let image = session.find_item_by_name("sample").unwrap();
        assert_eq!(
            session.resolve_mask(image, MaskKind::Myelin).unwrap().name(),
            "sample_myelin"
        );
        assert_eq!(image.metadata_f64(constant::KEY_PIXEL_SIZE), Some(0.1));
    }

    #[test]
    fn test_apply_model_without_pixel_size() {
        let scratch = Scratch::new("no_pixel_size");
        let path = write_sample(&scratch.0, None);

        let mut session = Session::new();
        load_image(&mut session, &path).unwrap();

        let engine = FakeEngine::new(false);
        let result = apply_model(
            &mut session,
            &engine,
            Path::new("models/generalist"),
            &SegmentationSettings::default(),
            &MaskSuffixes::default(),
        );

        assert!(matches!(result, Err(SheathError::PixelSizeMissing(_))));
        assert!(engine.requests.borrow().is_empty());
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_apply_model_undersized() {
        let scratch = Scratch::new("undersized");
        let path = write_sample(&scratch.0, Some(0.1));

        let mut session = Session::new();
        load_image(&mut session, &path).unwrap();

        let result = apply_model(
            &mut session,
            &FakeEngine::new(true),
            Path::new("models/generalist"),
            &SegmentationSettings::default(),
            &MaskSuffixes::default(),
        );

        assert!(matches!(result, Err(SheathError::UndersizedImage)));
        assert_eq!(session.len(), 1);

        let image = session.find_item_by_name("sample").unwrap();
        assert_eq!(image.metadata_f64(constant::KEY_PIXEL_SIZE), None);
    }

    #[test]
    fn test_second_segmentation_overwrites() {
        let scratch = Scratch::new("overwrite");
        let path = write_sample(&scratch.0, Some(0.1));

        let mut session = Session::new();
        load_image(&mut session, &path).unwrap();

        let engine = FakeEngine::new(false);
        let model = Path::new("models/generalist");
        let settings = SegmentationSettings::default();
        let suffixes = MaskSuffixes::default();

        apply_model(&mut session, &engine, model, &settings, &suffixes).unwrap();
        let second = apply_model(&mut session, &engine, model, &settings, &suffixes).unwrap();

        assert_eq!(second.axon, "sample_axon [1]");

        let image = session.find_item_by_name("sample").unwrap();
        assert_eq!(
            session.resolve_mask(image, MaskKind::Axon).unwrap().name(),
            "sample_axon [1]"
        );
    }

    #[test]
    fn test_fill_axons_sparse_and_undoable() {
        let mut session = Session::new();
        session.add_image("img", SheathImage::zeros(12, 12, 1));

        // A manual axon pixel outside the ring must survive the fill
        let mut axon = SheathMask::zeros(12, 12, 1);
        axon.buffer[11 * 12 + 11] = 1;
        axon.buffer[4 * 12 + 4] = 1;

        add_segmentation(&mut session, "img", axon.clone(), ring()).unwrap();

        let changed = fill_axons(&mut session).unwrap();
        assert_eq!(changed, 15);

        let filled = mask_of(&session, "img_axon").unwrap();
        assert_eq!(filled.count_foreground(), 17);
        assert_eq!(filled.as_raw()[11 * 12 + 11], 1);
        assert_eq!(filled.as_raw()[3 * 12 + 3], 1);
        assert_eq!(filled.as_raw()[2 * 12 + 2], 0);

        assert!(session.undo());
        assert_eq!(mask_of(&session, "img_axon").unwrap(), &axon);
    }

    #[test]
    fn test_fill_axons_without_masks() {
        let mut session = Session::new();
        session.add_image("img", SheathImage::zeros(4, 4, 1));

        assert!(matches!(
            fill_axons(&mut session),
            Err(SheathError::MissingAssociation(_))
        ));

        let mut empty = Session::new();
        assert!(matches!(
            fill_axons(&mut empty),
            Err(SheathError::SelectionError)
        ));
    }

    #[test]
    fn test_load_mask_splits_axonmyelin() {
        let scratch = Scratch::new("load_mask");
        let path = scratch.0.join("sample_seg-axonmyelin.png");

        let merged = SheathMask::new(2, 2, 1, vec![255, 127, 0, 127]).unwrap();
        merged.save(&path).unwrap();

        let mut session = Session::new();
        session.add_image("img", SheathImage::zeros(2, 2, 1));

        let layers = load_mask(&mut session, &path).unwrap();

        assert_eq!(mask_of(&session, &layers.axon).unwrap().as_raw(), &[1, 0, 0, 0]);
        assert_eq!(mask_of(&session, &layers.myelin).unwrap().as_raw(), &[0, 1, 0, 1]);
    }

    #[test]
    fn test_add_segmentation_shape_mismatch() {
        let mut session = Session::new();
        session.add_image("img", SheathImage::zeros(4, 4, 1));

        let result = add_segmentation(
            &mut session,
            "img",
            SheathMask::zeros(3, 4, 1),
            SheathMask::zeros(4, 4, 1),
        );

        assert!(matches!(result, Err(SheathError::ShapeMismatchError)));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_add_segmentation_rejects_multichannel() {
        let mut session = Session::new();
        session.add_image("img", SheathImage::zeros(4, 4, 1));

        let mut myelin = SheathMask::zeros(4, 4, 3);
        myelin.buffer[1] = 1;

        let result = add_segmentation(&mut session, "img", SheathMask::zeros(4, 4, 1), myelin);

        assert!(matches!(result, Err(SheathError::MaskFormatError)));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_compute_morphometrics() {
        let scratch = Scratch::new("morphometrics");

        let mut session = Session::new();
        let image = session.add_image("img", SheathImage::zeros(12, 12, 1));
        session
            .layer_mut(&image)
            .unwrap()
            .set_metadata(constant::KEY_PIXEL_SIZE, 0.5);

        add_segmentation(&mut session, "img", ring().enclosed_holes().unwrap(), ring()).unwrap();

        let output = scratch.0.join("morphometrics.csv");
        let index = compute_morphometrics(&mut session, &FiberCounts, &output).unwrap();

        assert_eq!(index, "img_index");
        assert!(output.is_file());

        let contents = std::fs::read_to_string(&output).unwrap();
        assert_eq!(contents.lines().count(), 2);

        let index = session.find_item_by_name("img_index").unwrap();
        assert_eq!(index.mask().unwrap().count_foreground(), 16);
        assert_eq!(
            session.resolve_source_image(index).unwrap().name(),
            "img"
        );
    }

    #[test]
    fn test_compute_morphometrics_save_failure_adds_nothing() {
        let mut session = Session::new();
        let image = session.add_image("img", SheathImage::zeros(12, 12, 1));
        session
            .layer_mut(&image)
            .unwrap()
            .set_metadata(constant::KEY_PIXEL_SIZE, 0.5);

        add_segmentation(&mut session, "img", ring().enclosed_holes().unwrap(), ring()).unwrap();
        let before = session.len();

        let result = compute_morphometrics(
            &mut session,
            &FiberCounts,
            Path::new("/nonexistent_sheath_dir/morphometrics.csv"),
        );

        assert!(matches!(result, Err(SheathError::TableWriteError(_))));
        assert_eq!(session.len(), before);
    }

    #[test]
    fn test_save_segmentation() {
        let scratch = Scratch::new("save");

        let mut session = Session::new();
        session.add_image("img", SheathImage::zeros(12, 12, 1));
        add_segmentation(&mut session, "img", ring().enclosed_holes().unwrap(), ring()).unwrap();

        let paths = save_segmentation(&session, &scratch.0, &MaskSuffixes::default()).unwrap();

        assert_eq!(paths.axon, scratch.0.join("img_seg-axon.png"));

        let merged = SheathMask::open(&paths.axonmyelin).unwrap();
        assert_eq!(merged.as_raw()[4 * 12 + 4], 255);
        assert_eq!(merged.as_raw()[2 * 12 + 2], 127);
        assert_eq!(merged.as_raw()[0], 0);

        let axon = SheathMask::open(&paths.axon).unwrap();
        assert_eq!(axon.as_raw()[4 * 12 + 4], 255);
    }

    #[test]
    fn test_colorize_selection() {
        let mut session = Session::new();
        session.add_image("img", SheathImage::zeros(12, 12, 1));
        add_segmentation(&mut session, "img", ring().enclosed_holes().unwrap(), ring()).unwrap();

        let overlay = colorize_selection(&session, 1.0).unwrap();

        assert_eq!(overlay.channels(), 3);
        let idx = (2 * 12 + 2) * 3;
        assert_eq!(&overlay.as_raw()[idx..idx + 3], &constant::MYELIN_COLOR);
        let idx = (4 * 12 + 4) * 3;
        assert_eq!(&overlay.as_raw()[idx..idx + 3], &constant::AXON_COLOR);
    }
}
