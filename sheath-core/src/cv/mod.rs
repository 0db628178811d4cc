pub mod connected;
pub mod fill;

pub use connected::{Connectivity, connected_components, label_components};
pub use fill::{enclosed_holes, fill_holes};
