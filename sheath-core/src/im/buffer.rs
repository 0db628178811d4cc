// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::iter::Iterator;
use std::slice::ChunksExact;

use num::{FromPrimitive, ToPrimitive, Zero};

use crate::error::SheathError;

/// A row-major container storing an image buffer or grid of pixels.
///
/// The length of the container must be equal to the product of `w` * `h` * `c`.
///
/// # Examples
///
/// ```
/// use sheath_core::im::SheathBuffer;
///
/// let width = 10;
/// let height = 10;
/// let channels = 3; // RGB
/// let data = vec![0u8; (width * height * channels) as usize];
///
/// let buffer = SheathBuffer::new(width, height, channels, data);
///
/// assert_eq!(buffer.unwrap().len(), (width * height * channels) as usize);
/// ```
///
/// ```
/// use sheath_core::im::SheathBuffer;
///
/// let data = vec![0u8; 7];
/// let buffer = SheathBuffer::new(2, 2, 1, data);
///
/// assert!(buffer.is_err()); // Buffer size does not match dimensions
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SheathBuffer<T> {
    w: u32,             // Width
    h: u32,             // Height
    c: u32,             // Channels
    pub buffer: Vec<T>, // Pixels
}

impl<T> SheathBuffer<T>
where
    T: Copy + ToPrimitive + FromPrimitive,
{
    /// Initializes a buffer from a row-major vector
    ///
    /// # Arguments
    ///
    /// * `width` - Image width
    /// * `height` - Image height
    /// * `channels` - Number of image channels (e.g. 1 for grayscale)
    /// * `buffer` - Row-major pixel data
    pub fn new(
        width: u32,
        height: u32,
        channels: u32,
        buffer: Vec<T>,
    ) -> Result<SheathBuffer<T>, SheathError> {
        if (width as usize) * (height as usize) * (channels as usize) == buffer.len() {
            Ok(SheathBuffer {
                w: width,
                h: height,
                c: channels,
                buffer,
            })
        } else {
            Err(SheathError::BufferSizeError)
        }
    }
}

impl<T> SheathBuffer<T>
where
    T: Copy + Zero,
{
    /// Initializes a zero-filled buffer
    pub fn zeros(width: u32, height: u32, channels: u32) -> SheathBuffer<T> {
        SheathBuffer {
            w: width,
            h: height,
            c: channels,
            buffer: vec![T::zero(); (width as usize) * (height as usize) * (channels as usize)],
        }
    }
}

// >>> PROPERTY METHODS

impl<T> SheathBuffer<T>
where
    T: Copy + ToPrimitive + FromPrimitive,
{
    /// Width of the image
    pub fn width(&self) -> u32 {
        self.w
    }

    /// Height of the image
    pub fn height(&self) -> u32 {
        self.h
    }

    /// Number of channels in the image
    pub fn channels(&self) -> u32 {
        self.c
    }

    /// Shape/dimensions of the image
    pub fn shape(&self) -> (u32, u32, u32) {
        (self.h, self.w, self.c)
    }

    /// Length of the raw image
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if two buffers share width and height
    pub fn same_extent<U>(&self, other: &SheathBuffer<U>) -> bool
    where
        U: Copy + ToPrimitive + FromPrimitive,
    {
        self.w == other.width() && self.h == other.height()
    }
}

// <<< PROPERTY METHODS

// >>> CONVERSION METHODS

impl<T> SheathBuffer<T>
where
    T: Copy + ToPrimitive + FromPrimitive,
{
    /// Returns the raw image
    pub fn into_raw(self) -> Vec<T> {
        self.buffer
    }

    /// Returns a reference to the raw image
    pub fn as_raw(&self) -> &[T] {
        &self.buffer
    }

    /// Cast subpixels to u8 and return the buffer
    pub fn to_u8(&self) -> Vec<u8> {
        self.buffer
            .iter()
            .map(|x| x.to_u8().unwrap_or(u8::MAX))
            .collect()
    }

    /// Cast subpixels to u16 and return the buffer
    pub fn to_u16(&self) -> Vec<u16> {
        self.buffer
            .iter()
            .map(|x| x.to_u16().unwrap_or(u16::MAX))
            .collect()
    }

    /// Cast subpixels to u32 and return the buffer
    pub fn to_u32(&self) -> Vec<u32> {
        self.buffer
            .iter()
            .map(|x| x.to_u32().unwrap_or(0u32))
            .collect()
    }

    // An iterator over the raw buffer
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    // An iterator over pixel-level chunks of the raw buffer
    pub fn iter_pixels(&self) -> ChunksExact<'_, T> {
        self.buffer.chunks_exact(self.c.max(1) as usize)
    }

    /// Apply a function to every subpixel, keeping width, height and channels
    ///
    /// # Examples
    ///
    /// ```
    /// use sheath_core::im::SheathBuffer;
    ///
    /// let buffer = SheathBuffer::new(1, 1, 3, vec![0u8, 1, 2]).unwrap();
    /// let doubled = buffer.map(|x| x as u32 * 2);
    ///
    /// assert_eq!(doubled.shape(), (1, 1, 3));
    /// assert_eq!(doubled.as_raw(), &[0, 2, 4]);
    /// ```
    pub fn map<U, F>(&self, f: F) -> SheathBuffer<U>
    where
        F: Fn(T) -> U,
    {
        SheathBuffer {
            w: self.w,
            h: self.h,
            c: self.c,
            buffer: self.buffer.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Row-major index of the first subpixel at (x, y)
    pub fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.w && y < self.h {
            Some(((y as usize) * (self.w as usize) + (x as usize)) * (self.c as usize))
        } else {
            None
        }
    }
}

// <<< CONVERSION METHODS
