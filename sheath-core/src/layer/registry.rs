// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use crate::constant;
use crate::error::SheathError;
use crate::layer::{Layer, LayerTag, MaskKind};

/// Name-keyed association between images and their axon and myelin masks
///
/// Associations live in layer metadata: an image names its masks, a mask
/// names its source image. Resolution is total and returns `None` whenever
/// any step of the chain is missing, which is the normal state before a
/// segmentation has run. Only `register_masks` mutates associations.
pub trait LayerStore {
    /// All currently loaded layers
    fn layers(&self) -> &[Layer];

    /// Mutable access to a loaded layer by exact name
    fn layer_mut(&mut self, name: &str) -> Option<&mut Layer>;

    /// Linear lookup by exact name
    fn find_item_by_name(&self, name: &str) -> Option<&Layer> {
        self.layers().iter().find(|layer| layer.name() == name)
    }

    /// The image a selection belongs to
    ///
    /// An image resolves to itself. A mask follows its source image name,
    /// which must still name a loaded image.
    fn resolve_source_image<'a>(&'a self, selected: &'a Layer) -> Option<&'a Layer> {
        match selected.tag() {
            LayerTag::Image => Some(selected),
            LayerTag::Mask => {
                let name = selected.metadata_str(constant::KEY_SOURCE_IMAGE)?;
                self.find_item_by_name(name).filter(|layer| layer.is_image())
            }
        }
    }

    /// The axon or myelin mask derived from the selection's source image
    fn resolve_mask<'a>(&'a self, selected: &'a Layer, kind: MaskKind) -> Option<&'a Layer> {
        let image = self.resolve_source_image(selected)?;
        let name = image.metadata_str(kind.metadata_key())?;
        self.find_item_by_name(name).filter(|layer| layer.is_mask())
    }

    /// Associate an image with its axon and myelin masks
    ///
    /// Any earlier association of the image is overwritten. Masks that were
    /// registered before keep pointing at the image, but the image no longer
    /// points back at them.
    fn register_masks(&mut self, image: &str, axon: &str, myelin: &str) -> Result<(), SheathError> {
        let expect = |name: &str, tag: LayerTag| match self.find_item_by_name(name) {
            Some(layer) if layer.tag() == tag => Ok(()),
            Some(_) => Err(SheathError::LayerError(format!(
                "Layer '{}' is not {}",
                name,
                match tag {
                    LayerTag::Image => "an image",
                    LayerTag::Mask => "a mask",
                }
            ))),
            None => Err(SheathError::LayerError(format!(
                "No layer named '{}'",
                name
            ))),
        };

        expect(image, LayerTag::Image)?;
        expect(axon, LayerTag::Mask)?;
        expect(myelin, LayerTag::Mask)?;

        for (mask, kind) in [(axon, MaskKind::Axon), (myelin, MaskKind::Myelin)] {
            if let Some(layer) = self.layer_mut(image) {
                layer.set_metadata(kind.metadata_key(), mask);
            }

            if let Some(layer) = self.layer_mut(mask) {
                layer.set_metadata(constant::KEY_SOURCE_IMAGE, image);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::im::{SheathImage, SheathMask};

    /// A bare layer list standing in for any host that owns layers
    struct Layers(Vec<Layer>);

    impl LayerStore for Layers {
        fn layers(&self) -> &[Layer] {
            &self.0
        }

        fn layer_mut(&mut self, name: &str) -> Option<&mut Layer> {
            self.0.iter_mut().find(|layer| layer.name() == name)
        }
    }

    fn image(name: &str) -> Layer {
        Layer::new_image(name, SheathImage::zeros(4, 4, 1))
    }

    fn mask(name: &str) -> Layer {
        Layer::new_mask(name, SheathMask::zeros(4, 4, 1), [255, 0, 0])
    }

    fn store() -> Layers {
        Layers(vec![image("I"), mask("A"), mask("M"), mask("A2"), mask("M2")])
    }

    fn name_of(layer: Option<&Layer>) -> Option<&str> {
        layer.map(|l| l.name())
    }

    #[test]
    fn test_unregistered_image_has_no_masks() {
        let store = store();
        let i = store.find_item_by_name("I").unwrap();

        assert!(store.resolve_mask(i, MaskKind::Axon).is_none());
        assert!(store.resolve_mask(i, MaskKind::Myelin).is_none());
        assert_eq!(name_of(store.resolve_source_image(i)), Some("I"));
    }

    #[test]
    fn test_register_round_trip() {
        let mut store = store();
        store.register_masks("I", "A", "M").unwrap();

        let i = store.find_item_by_name("I").unwrap();
        let a = store.find_item_by_name("A").unwrap();
        let m = store.find_item_by_name("M").unwrap();

        assert_eq!(name_of(store.resolve_mask(i, MaskKind::Axon)), Some("A"));
        assert_eq!(name_of(store.resolve_mask(i, MaskKind::Myelin)), Some("M"));
        assert_eq!(name_of(store.resolve_source_image(a)), Some("I"));
        assert_eq!(name_of(store.resolve_source_image(m)), Some("I"));

        // Resolving from a mask reaches its sibling
        assert_eq!(name_of(store.resolve_mask(a, MaskKind::Myelin)), Some("M"));
    }

    #[test]
    fn test_register_overwrites() {
        let mut store = store();
        store.register_masks("I", "A", "M").unwrap();
        store.register_masks("I", "A2", "M2").unwrap();

        let i = store.find_item_by_name("I").unwrap();
        let a = store.find_item_by_name("A").unwrap();

        assert_eq!(name_of(store.resolve_mask(i, MaskKind::Axon)), Some("A2"));
        assert_eq!(name_of(store.resolve_mask(i, MaskKind::Myelin)), Some("M2"));

        // Stale mask still names the image, but the image moved on
        assert_eq!(name_of(store.resolve_source_image(a)), Some("I"));
        assert_eq!(name_of(store.resolve_mask(a, MaskKind::Axon)), Some("A2"));
    }

    #[test]
    fn test_unknown_names_resolve_to_none() {
        let mut store = store();

        let mut orphan = mask("orphan");
        orphan.set_metadata(constant::KEY_SOURCE_IMAGE, "missing");
        assert!(store.resolve_source_image(&orphan).is_none());
        assert!(store.resolve_mask(&orphan, MaskKind::Axon).is_none());

        store.register_masks("I", "A", "M").unwrap();
        store.0.retain(|layer| layer.name() != "A");

        let i = store.find_item_by_name("I").unwrap();
        assert!(store.resolve_mask(i, MaskKind::Axon).is_none());
        assert!(store.find_item_by_name("A").is_none());
    }

    #[test]
    fn test_wrong_tags_resolve_to_none() {
        let mut store = store();
        store.0.push(image("I2"));

        let mut bad_mask = mask("bad");
        bad_mask.set_metadata(constant::KEY_SOURCE_IMAGE, "A");
        assert!(store.resolve_source_image(&bad_mask).is_none());

        store
            .layer_mut("I")
            .unwrap()
            .set_metadata(constant::KEY_AXON_MASK, "I2");

        let i = store.find_item_by_name("I").unwrap();
        assert!(store.resolve_mask(i, MaskKind::Axon).is_none());
    }

    #[test]
    fn test_register_rejects_bad_layers() {
        let mut store = store();

        assert!(store.register_masks("A", "A2", "M2").is_err());
        assert!(store.register_masks("I", "I", "M").is_err());
        assert!(store.register_masks("I", "A", "nope").is_err());

        let i = store.find_item_by_name("I").unwrap();
        assert!(i.metadata.is_empty());
    }
}
