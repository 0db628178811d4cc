// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use polars::prelude::*;

use crate::error::SheathError;
use crate::im::SheathMask;

/// Per-axon statistics and the raster that ties table rows to pixels
pub struct Morphometrics {
    /// One row per axon
    pub table: DataFrame,
    /// Same shape as the masks, each axon labeled with its 1-based row index
    pub index: SheathMask,
}

/// An external morphometrics engine
pub trait MorphometricsEngine {
    /// Compute statistics from binary axon and myelin masks
    ///
    /// # Arguments
    ///
    /// * `axon` - Binary axon mask
    /// * `myelin` - Binary myelin mask with the same shape
    /// * `pixel_size` - Micrometers per pixel
    fn compute(
        &self,
        axon: &SheathMask,
        myelin: &SheathMask,
        pixel_size: f64,
    ) -> Result<Morphometrics, SheathError>;
}

/// Column names produced by [`FiberCounts`]
pub const FIBER_COUNT_COLUMNS: [&str; 7] = [
    "axon_id",
    "x0",
    "y0",
    "axon_area",
    "myelin_area",
    "axonmyelin_area",
    "touches_border",
];

/// Area bookkeeping for every axon and the fiber it sits in
///
/// Axons are 8-connected components of the axon mask, numbered in raster
/// order. A fiber is the 8-connected component of axon and myelin pixels
/// containing the axon. Areas are pixel counts scaled to square micrometers;
/// `myelin_area` counts the myelin pixels of the whole fiber.
#[derive(Debug, Clone, Copy, Default)]
pub struct FiberCounts;

impl MorphometricsEngine for FiberCounts {
    fn compute(
        &self,
        axon: &SheathMask,
        myelin: &SheathMask,
        pixel_size: f64,
    ) -> Result<Morphometrics, SheathError> {
        axon.ensure_single_channel()?;
        myelin.ensure_single_channel()?;

        if !axon.same_extent(myelin) {
            return Err(SheathError::ShapeMismatchError);
        }

        if !pixel_size.is_finite() || pixel_size <= 0.0 {
            return Err(SheathError::PixelSizeFormat(format!("Found '{}'", pixel_size)));
        }

        let width = axon.width() as usize;
        let height = axon.height() as usize;

        let (index, n_axons) = axon.label()?;

        let fiber_mask: Vec<u32> = axon
            .iter()
            .zip(myelin.iter())
            .map(|(&a, &m)| (a != 0 || m != 0) as u32)
            .collect();

        let (fibers, n_fibers) = SheathMask::new(axon.width(), axon.height(), 1, fiber_mask)?.label()?;

        let n = n_axons as usize;

        let mut axon_pixels = vec![0u64; n];
        let mut sum_x = vec![0u64; n];
        let mut sum_y = vec![0u64; n];
        let mut touches_border = vec![false; n];
        let mut fiber_of = vec![0u32; n];

        let mut fiber_myelin = vec![0u64; n_fibers as usize + 1];
        let mut fiber_total = vec![0u64; n_fibers as usize + 1];

        for (idx, (&label, &fiber)) in index.iter().zip(fibers.iter()).enumerate() {
            let (x, y) = (idx % width, idx / width);

            if fiber != 0 {
                fiber_total[fiber as usize] += 1;
                if label == 0 && myelin.as_raw()[idx] != 0 {
                    fiber_myelin[fiber as usize] += 1;
                }
            }

            if label == 0 {
                continue;
            }

            let row = label as usize - 1;
            axon_pixels[row] += 1;
            sum_x[row] += x as u64;
            sum_y[row] += y as u64;
            fiber_of[row] = fiber;

            if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
                touches_border[row] = true;
            }
        }

        let area = pixel_size * pixel_size;

        let ids: Vec<u32> = (1..=n_axons).collect();
        let x0: Vec<f64> = (0..n)
            .map(|i| sum_x[i] as f64 / axon_pixels[i] as f64)
            .collect();
        let y0: Vec<f64> = (0..n)
            .map(|i| sum_y[i] as f64 / axon_pixels[i] as f64)
            .collect();
        let axon_area: Vec<f64> = axon_pixels.iter().map(|&p| p as f64 * area).collect();
        let myelin_area: Vec<f64> = fiber_of
            .iter()
            .map(|&f| fiber_myelin[f as usize] as f64 * area)
            .collect();
        let axonmyelin_area: Vec<f64> = fiber_of
            .iter()
            .map(|&f| fiber_total[f as usize] as f64 * area)
            .collect();

        let table = DataFrame::new(vec![
            Column::new(FIBER_COUNT_COLUMNS[0].into(), ids),
            Column::new(FIBER_COUNT_COLUMNS[1].into(), x0),
            Column::new(FIBER_COUNT_COLUMNS[2].into(), y0),
            Column::new(FIBER_COUNT_COLUMNS[3].into(), axon_area),
            Column::new(FIBER_COUNT_COLUMNS[4].into(), myelin_area),
            Column::new(FIBER_COUNT_COLUMNS[5].into(), axonmyelin_area),
            Column::new(FIBER_COUNT_COLUMNS[6].into(), touches_border),
        ])
        .map_err(|err| SheathError::OtherError(err.to_string()))?;

        Ok(Morphometrics { table, index })
    }
}
