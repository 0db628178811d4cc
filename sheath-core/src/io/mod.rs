mod pixel_size;
mod table;

pub use pixel_size::parse_pixel_size;
pub use pixel_size::pixel_size_path;
pub use pixel_size::read_pixel_size;
pub use pixel_size::write_pixel_size;

pub use table::TableFormat;
pub use table::write_table;
pub use table::write_table_delimited;
pub use table::write_table_pq;
