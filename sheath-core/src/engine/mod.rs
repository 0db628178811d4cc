mod morphometrics;
mod segmentation;

pub use morphometrics::FIBER_COUNT_COLUMNS;
pub use morphometrics::FiberCounts;
pub use morphometrics::Morphometrics;
pub use morphometrics::MorphometricsEngine;

pub use segmentation::CommandSegmenter;
pub use segmentation::MaskPaths;
pub use segmentation::MaskSuffixes;
pub use segmentation::SegmentationEngine;
pub use segmentation::SegmentationRequest;
pub use segmentation::SegmentationSettings;
pub use segmentation::image_stem;
