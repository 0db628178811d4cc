// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::collections::BTreeMap;

use serde_json::Value;

use crate::constant;
use crate::error::SheathError;
use crate::im::{SheathImage, SheathMask};
use crate::layer::{Layer, LayerStore};

/// Previous mask values captured before an edit
///
/// An edit is recorded in two steps: the affected pixels are captured from
/// the untouched mask, then the mask is mutated. Undoing writes the captured
/// values back.
#[derive(Debug, Clone)]
pub struct ScopedEdit {
    layer: String,
    previous: Vec<(usize, u32)>,
}

impl ScopedEdit {
    /// Capture current values at the pixels `changes` would modify
    ///
    /// Repeated indices resolve to their last value. Pixels that end up
    /// holding the value they started with are left out.
    pub fn capture(layer: &str, mask: &SheathMask, changes: &[(usize, u32)]) -> Self {
        let raw = mask.as_raw();
        let last: BTreeMap<usize, u32> = changes.iter().copied().collect();

        ScopedEdit {
            layer: layer.to_string(),
            previous: last
                .into_iter()
                .filter(|(idx, value)| raw[*idx] != *value)
                .map(|(idx, _)| (idx, raw[idx]))
                .collect(),
        }
    }

    /// Name of the edited layer
    pub fn layer(&self) -> &str {
        &self.layer
    }

    /// Number of pixels the edit changed
    pub fn len(&self) -> usize {
        self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }

    fn restore(&self, mask: &mut SheathMask) {
        for &(idx, value) in self.previous.iter() {
            mask.buffer[idx] = value;
        }
    }
}

/// An ordered set of uniquely named layers with a single active selection
///
/// The session stands in for the host viewer: it owns the rasters, keeps
/// names unique, and records undoable mask edits. Associations between
/// layers are managed through [`LayerStore`].
///
/// # Examples
///
/// ```
/// use sheath_core::im::{SheathImage, SheathMask};
/// use sheath_core::layer::{LayerStore, MaskKind, Session};
///
/// let mut session = Session::new();
///
/// let image = session.add_image("sample", SheathImage::zeros(8, 8, 1));
/// let axon = session.add_mask("sample_axon", SheathMask::zeros(8, 8, 1), [0, 0, 255]).unwrap();
/// let myelin = session.add_mask("sample_myelin", SheathMask::zeros(8, 8, 1), [255, 0, 0]).unwrap();
///
/// session.register_masks(&image, &axon, &myelin).unwrap();
///
/// let selected = session.selected().unwrap();
/// let resolved = session.resolve_source_image(selected).unwrap();
/// assert_eq!(resolved.name(), "sample");
/// ```
#[derive(Debug, Default)]
pub struct Session {
    layers: Vec<Layer>,
    selected: Option<String>,
    history: Vec<ScopedEdit>,
}

impl LayerStore for Session {
    fn layers(&self) -> &[Layer] {
        &self.layers
    }

    fn layer_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| layer.name() == name)
    }
}

// >>> LAYER METHODS

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    /// First free name of the form `name`, `name [1]`, `name [2]`, ...
    pub fn unique_name(&self, name: &str) -> String {
        if self.find_item_by_name(name).is_none() {
            return name.to_string();
        }

        (1..)
            .map(|n| format!("{} [{}]", name, n))
            .find(|candidate| self.find_item_by_name(candidate).is_none())
            .unwrap_or_else(|| name.to_string())
    }

    /// Add a layer, renaming it if needed, and make it the selection
    ///
    /// Returns the name the layer was stored under. Masks must have a single
    /// channel.
    pub fn add_layer(&mut self, layer: Layer) -> Result<String, SheathError> {
        if let Some(mask) = layer.mask() {
            mask.ensure_single_channel()?;
        }

        Ok(self.insert(layer))
    }

    fn insert(&mut self, mut layer: Layer) -> String {
        let name = self.unique_name(layer.name());
        layer.set_name(name.clone());

        self.layers.push(layer);
        self.selected = Some(name.clone());

        name
    }

    pub fn add_image(&mut self, name: &str, image: SheathImage) -> String {
        self.insert(Layer::new_image(name, image))
    }

    pub fn add_mask(
        &mut self,
        name: &str,
        mask: SheathMask,
        color: [u8; 3],
    ) -> Result<String, SheathError> {
        self.add_layer(Layer::new_mask(name, mask, color))
    }

    /// Remove a layer
    ///
    /// Associations naming it are left in place and resolve to nothing.
    pub fn remove_layer(&mut self, name: &str) -> Option<Layer> {
        let position = self.layers.iter().position(|layer| layer.name() == name)?;

        if self.selected.as_deref() == Some(name) {
            self.selected = None;
        }

        self.history.retain(|edit| edit.layer() != name);

        Some(self.layers.remove(position))
    }

    pub fn select(&mut self, name: &str) -> Result<(), SheathError> {
        if self.find_item_by_name(name).is_none() {
            return Err(SheathError::LayerError(format!("No layer named '{}'", name)));
        }

        self.selected = Some(name.to_string());
        Ok(())
    }

    /// The single active layer, if any
    pub fn selected(&self) -> Option<&Layer> {
        self.selected
            .as_deref()
            .and_then(|name| self.find_item_by_name(name))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Rename a layer and rewrite every association that referenced it
    ///
    /// # Arguments
    ///
    /// * `old` - Current layer name
    /// * `new` - Replacement name, which must not already be taken
    pub fn rename_layer(&mut self, old: &str, new: &str) -> Result<(), SheathError> {
        if old == new {
            return Ok(());
        }

        if self.find_item_by_name(new).is_some() {
            return Err(SheathError::LayerError(format!(
                "A layer named '{}' already exists",
                new
            )));
        }

        let layer = self
            .layer_mut(old)
            .ok_or_else(|| SheathError::LayerError(format!("No layer named '{}'", old)))?;

        layer.set_name(new.to_string());

        let keys = [
            constant::KEY_AXON_MASK,
            constant::KEY_MYELIN_MASK,
            constant::KEY_SOURCE_IMAGE,
        ];

        for layer in self.layers.iter_mut() {
            for key in keys {
                if layer.metadata_str(key) == Some(old) {
                    layer.metadata.insert(key.to_string(), Value::from(new));
                }
            }
        }

        if self.selected.as_deref() == Some(old) {
            self.selected = Some(new.to_string());
        }

        for edit in self.history.iter_mut().filter(|edit| edit.layer == old) {
            edit.layer = new.to_string();
        }

        Ok(())
    }
}

// <<< LAYER METHODS

// >>> EDIT METHODS

impl Session {
    /// Write values into a mask layer and record the edit for undo
    ///
    /// # Arguments
    ///
    /// * `name` - Mask layer name
    /// * `changes` - Row-major pixel index and new value pairs
    ///
    /// Returns the number of pixels whose value changed. An edit that changes
    /// nothing is not recorded.
    pub fn edit_mask(&mut self, name: &str, changes: &[(usize, u32)]) -> Result<usize, SheathError> {
        let layer = self
            .layer_mut(name)
            .ok_or_else(|| SheathError::LayerError(format!("No layer named '{}'", name)))?;

        let mask = layer
            .mask_mut()
            .ok_or_else(|| SheathError::LayerError(format!("Layer '{}' is not a mask", name)))?;

        if changes.iter().any(|(idx, _)| *idx >= mask.len()) {
            return Err(SheathError::MaskError("Edit coordinates out of bounds"));
        }

        let edit = ScopedEdit::capture(name, mask, changes);

        for &(idx, value) in changes {
            mask.buffer[idx] = value;
        }

        let changed = edit.len();

        if !edit.is_empty() {
            self.history.push(edit);
        }

        Ok(changed)
    }

    /// Revert the most recent mask edit
    ///
    /// Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(edit) = self.history.pop() else {
            return false;
        };

        match self.layer_mut(&edit.layer).and_then(Layer::mask_mut) {
            Some(mask) => {
                edit.restore(mask);
                true
            }
            None => false,
        }
    }

    /// Number of edits that can be undone
    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

// <<< EDIT METHODS
