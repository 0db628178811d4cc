// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::cmp::Ordering;

/// Pixel adjacency used when grouping pixels into components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Edge neighbors only
    Four,
    /// Edge and diagonal neighbors
    Eight,
}

/// A union-find structure for finding and merging connected components
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    /// Initialize a new union-find object with `n` elements in `n` sets
    pub fn new(n: usize) -> Self {
        UnionFind {
            parent: (0..n).collect(),
            rank: vec![1; n],
        }
    }

    /// Find the root of the set containing `x`
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        // Path compression without recursion so large masks cannot overflow
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }

        root
    }

    /// Merge sets containing `x` and `y`
    pub fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);

        if root_x != root_y {
            match self.rank[root_x].cmp(&self.rank[root_y]) {
                Ordering::Greater => self.parent[root_y] = root_x,
                Ordering::Less => self.parent[root_x] = root_y,
                Ordering::Equal => {
                    self.parent[root_y] = root_x;
                    self.rank[root_x] += 1;
                }
            }
        }
    }

    /// Check if `x` and `y` belong to the same set
    pub fn connected(&mut self, x: usize, y: usize) -> bool {
        self.find(x) == self.find(y)
    }
}

/// Two-pass 8-connected component labeling on mask buffers
///
/// Every non-zero pixel is foreground regardless of its value. Labels are
/// union-find roots, so they are unique per component but not incremental.
///
/// # Arguments
///
/// * `width` - Width of mask
/// * `height` - Height of mask
/// * `buffer` - A row-major mask buffer
///
/// # Examples
///
/// ```
/// use sheath_core::cv::connected_components;
///
/// let buffer: Vec<u32> = vec![10, 10, 10, 0, 0, 0, 20, 20, 20];
/// let labels = connected_components(3, 3, &buffer);
/// assert_eq!(labels, [1, 1, 1, 0, 0, 0, 2, 2, 2]);
/// ```
pub fn connected_components(width: u32, height: u32, buffer: &[u32]) -> Vec<u32> {
    label_components(width, height, buffer, Connectivity::Eight)
}

/// Two-pass component labeling with a chosen connectivity
///
/// # Arguments
///
/// * `width` - Width of mask
/// * `height` - Height of mask
/// * `buffer` - A row-major mask buffer
/// * `connectivity` - Four or eight neighbor adjacency
pub fn label_components(
    width: u32,
    height: u32,
    buffer: &[u32],
    connectivity: Connectivity,
) -> Vec<u32> {
    let width = width as usize;
    let height = height as usize;
    let size = width * height;

    let mut labels = vec![0u32; size];
    let mut next_label = 1u32;

    // Label 0 is reserved for background so sets are indexed from 1
    let mut uf = UnionFind::new(size + 1);

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if buffer[idx] == 0 {
                continue;
            }

            let mut neighbors = [0u32; 4];
            let mut n = 0;

            let mut visit = |other: usize| {
                if buffer[other] != 0 {
                    neighbors[n] = labels[other];
                    n += 1;
                }
            };

            if x > 0 {
                visit(idx - 1);
            }

            if y > 0 {
                visit(idx - width);
            }

            if connectivity == Connectivity::Eight && y > 0 {
                if x > 0 {
                    visit(idx - width - 1);
                }
                if x + 1 < width {
                    visit(idx - width + 1);
                }
            }

            let neighbors = &neighbors[..n];

            match neighbors.iter().min() {
                None => {
                    labels[idx] = next_label;
                    next_label += 1;
                }
                Some(&min_label) => {
                    labels[idx] = min_label;
                    for &label in neighbors {
                        uf.union(min_label as usize, label as usize);
                    }
                }
            }
        }
    }

    for label in labels.iter_mut().filter(|label| **label != 0) {
        *label = uf.find(*label as usize) as u32;
    }

    labels
}
