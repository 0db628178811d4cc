mod item;
mod registry;
mod session;

pub use item::Layer;
pub use item::LayerData;
pub use item::LayerTag;
pub use item::MaskKind;
pub use item::Metadata;

pub use registry::LayerStore;

pub use session::ScopedEdit;
pub use session::Session;
