// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::collections::HashSet;

use crate::cv::connected::{Connectivity, label_components};

/// Flag background pixels that cannot reach the border
///
/// Background is grouped with 4-connectivity, so a foreground ring closed only
/// through diagonal steps still seals its interior. Any background component
/// with a pixel on the border is outside; every other one is a hole.
fn hole_pixels(width: u32, height: u32, buffer: &[u32]) -> Vec<bool> {
    let (w, h) = (width as usize, height as usize);

    let background: Vec<u32> = buffer.iter().map(|&p| (p == 0) as u32).collect();
    let labels = label_components(width, height, &background, Connectivity::Four);

    let mut outside: HashSet<u32> = HashSet::new();

    for x in 0..w {
        outside.insert(labels[x]);
        outside.insert(labels[(h - 1) * w + x]);
    }

    for y in 0..h {
        outside.insert(labels[y * w]);
        outside.insert(labels[y * w + w - 1]);
    }

    labels
        .iter()
        .map(|label| *label != 0 && !outside.contains(label))
        .collect()
}

/// Fill holes in a binary mask
///
/// Foreground pixels and every enclosed background pixel are set to 1; the
/// background connected to the border stays 0. Applying the fill twice gives
/// the same mask as applying it once.
///
/// # Arguments
///
/// * `width` - Width of mask
/// * `height` - Height of mask
/// * `buffer` - A row-major mask buffer where non-zero is foreground
///
/// # Examples
///
/// ```
/// use sheath_core::cv::fill_holes;
///
/// let ring: Vec<u32> = vec![
///     1, 1, 1,
///     1, 0, 1,
///     1, 1, 1,
/// ];
///
/// assert_eq!(fill_holes(3, 3, &ring), vec![1; 9]);
/// ```
pub fn fill_holes(width: u32, height: u32, buffer: &[u32]) -> Vec<u32> {
    if buffer.is_empty() {
        return Vec::new();
    }

    hole_pixels(width, height, buffer)
        .into_iter()
        .zip(buffer.iter())
        .map(|(hole, &p)| (hole || p != 0) as u32)
        .collect()
}

/// Only the enclosed background of a binary mask
///
/// Applied to a myelin mask this recovers the axon interior without the
/// myelin ring itself.
///
/// # Examples
///
/// ```
/// use sheath_core::cv::enclosed_holes;
///
/// let ring: Vec<u32> = vec![
///     1, 1, 1,
///     1, 0, 1,
///     1, 1, 1,
/// ];
///
/// assert_eq!(enclosed_holes(3, 3, &ring), vec![0, 0, 0, 0, 1, 0, 0, 0, 0]);
/// ```
pub fn enclosed_holes(width: u32, height: u32, buffer: &[u32]) -> Vec<u32> {
    if buffer.is_empty() {
        return Vec::new();
    }

    hole_pixels(width, height, buffer)
        .into_iter()
        .map(|hole| hole as u32)
        .collect()
}
