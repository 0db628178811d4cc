mod buffer;
mod image;
mod mask;

pub use buffer::SheathBuffer;
pub use self::image::SheathImage;
pub use self::image::colorize;

pub use mask::SheathMask;
pub use mask::merge_axonmyelin;
pub use mask::split_axonmyelin;
