// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

// All currently supported image formats
pub const SUPPORTED_IMAGE_FORMATS: [&str; 9] = [
    "bmp", "jpeg", "jpg", "png", "pgm", "tif", "tiff", "webp", "npy",
];

// The currently supported common image formats
pub const IMAGE_DYNAMIC_FORMATS: [&str; 8] =
    ["bmp", "jpeg", "jpg", "png", "pgm", "tif", "tiff", "webp"];

// Valid table extensions for morphometrics output
pub const SUPPORTED_TABLE_FORMATS: [&str; 5] = ["csv", "tsv", "txt", "parquet", "pq"];

// Side-channel file holding micrometers per pixel, stored next to an image
pub const PIXEL_SIZE_FILE: &str = "pixel_size_in_micrometer.txt";

// Default output suffixes written by the segmentation engine
pub const AXON_SUFFIX: &str = "_seg-axon.png";
pub const MYELIN_SUFFIX: &str = "_seg-myelin.png";
pub const AXONMYELIN_SUFFIX: &str = "_seg-axonmyelin.png";

// Metadata keys used to associate images and masks
pub const KEY_AXON_MASK: &str = "associated_axon_mask_name";
pub const KEY_MYELIN_MASK: &str = "associated_myelin_mask_name";
pub const KEY_SOURCE_IMAGE: &str = "associated_image_name";
pub const KEY_IMAGE_PATH: &str = "file_path";
pub const KEY_PIXEL_SIZE: &str = "pixel_size";

// Axonmyelin mask encoding
pub const AXONMYELIN_AXON_VALUE: u32 = 255;
pub const AXONMYELIN_MYELIN_VALUE: u32 = 127;
pub const AXONMYELIN_AXON_THRESHOLD: u32 = 200;
pub const AXONMYELIN_MYELIN_THRESHOLD: u32 = 100;

// Display colors for derived layers
pub const AXON_COLOR: [u8; 3] = [0, 0, 255];
pub const MYELIN_COLOR: [u8; 3] = [255, 0, 0];
pub const INDEX_COLOR: [u8; 3] = [255, 255, 0];

// Opacity used when overlaying masks on an image
pub const OVERLAY_OPACITY: f32 = 0.7;

// Default segmentation settings
pub const DEFAULT_OVERLAP: u32 = 48;
pub const DEFAULT_ZOOM_FACTOR: f64 = 1.0;
pub const DEFAULT_GPU_ID: i32 = 0;

// Exit code the segmentation command uses for undersized inputs
pub const UNDERSIZED_IMAGE_EXIT_CODE: i32 = 4;

// Default external segmentation program
pub const SEGMENTATION_PROGRAM: &str = "axondeepseg";
