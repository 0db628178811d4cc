// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

pub mod constant;
pub mod cv;
pub mod engine;
pub mod error;
pub mod im;
pub mod io;
pub mod layer;
pub mod plugin;
pub mod ut;
