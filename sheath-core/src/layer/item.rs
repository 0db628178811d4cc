// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::collections::BTreeMap;

use serde_json::Value;

use crate::constant;
use crate::im::{SheathImage, SheathMask};

/// String-keyed metadata attached to a layer
pub type Metadata = BTreeMap<String, Value>;

/// Raster payload of a layer
#[derive(Debug, Clone)]
pub enum LayerData {
    Image(SheathImage),
    Mask(SheathMask),
}

/// Capability tag of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerTag {
    Image,
    Mask,
}

/// Derived mask kinds tracked for every image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskKind {
    Axon,
    Myelin,
}

impl MaskKind {
    /// Metadata key on the image layer naming this mask
    pub fn metadata_key(&self) -> &'static str {
        match self {
            MaskKind::Axon => constant::KEY_AXON_MASK,
            MaskKind::Myelin => constant::KEY_MYELIN_MASK,
        }
    }

    /// Display color for this mask kind
    pub fn color(&self) -> [u8; 3] {
        match self {
            MaskKind::Axon => constant::AXON_COLOR,
            MaskKind::Myelin => constant::MYELIN_COLOR,
        }
    }

    /// Short lowercase name used when deriving layer names
    pub fn label(&self) -> &'static str {
        match self {
            MaskKind::Axon => "axon",
            MaskKind::Myelin => "myelin",
        }
    }
}

/// A named raster held by a session
///
/// # Examples
///
/// ```
/// use sheath_core::im::SheathMask;
/// use sheath_core::layer::{Layer, LayerTag};
///
/// let layer = Layer::new_mask("sample_axon", SheathMask::zeros(4, 4, 1), [0, 0, 255]);
///
/// assert_eq!(layer.name(), "sample_axon");
/// assert_eq!(layer.tag(), LayerTag::Mask);
/// assert!(layer.metadata.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    data: LayerData,
    color: Option<[u8; 3]>,
    pub metadata: Metadata,
}

impl Layer {
    /// Create an image layer
    pub fn new_image<S: Into<String>>(name: S, image: SheathImage) -> Self {
        Layer {
            name: name.into(),
            data: LayerData::Image(image),
            color: None,
            metadata: Metadata::new(),
        }
    }

    /// Create a mask layer drawn with `color`
    pub fn new_mask<S: Into<String>>(name: S, mask: SheathMask, color: [u8; 3]) -> Self {
        Layer {
            name: name.into(),
            data: LayerData::Mask(mask),
            color: Some(color),
            metadata: Metadata::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn tag(&self) -> LayerTag {
        match self.data {
            LayerData::Image(_) => LayerTag::Image,
            LayerData::Mask(_) => LayerTag::Mask,
        }
    }

    pub fn is_image(&self) -> bool {
        self.tag() == LayerTag::Image
    }

    pub fn is_mask(&self) -> bool {
        self.tag() == LayerTag::Mask
    }

    pub fn data(&self) -> &LayerData {
        &self.data
    }

    pub fn image(&self) -> Option<&SheathImage> {
        match &self.data {
            LayerData::Image(image) => Some(image),
            LayerData::Mask(_) => None,
        }
    }

    pub fn mask(&self) -> Option<&SheathMask> {
        match &self.data {
            LayerData::Mask(mask) => Some(mask),
            LayerData::Image(_) => None,
        }
    }

    pub(crate) fn mask_mut(&mut self) -> Option<&mut SheathMask> {
        match &mut self.data {
            LayerData::Mask(mask) => Some(mask),
            LayerData::Image(_) => None,
        }
    }

    pub fn color(&self) -> Option<[u8; 3]> {
        self.color
    }

    /// String metadata value, if present and a string
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Numeric metadata value, if present and a number
    pub fn metadata_f64(&self, key: &str) -> Option<f64> {
        self.metadata.get(key).and_then(Value::as_f64)
    }

    pub fn set_metadata<V: Into<Value>>(&mut self, key: &str, value: V) {
        self.metadata.insert(key.to_string(), value.into());
    }
}
