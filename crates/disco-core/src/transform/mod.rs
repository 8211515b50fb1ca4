pub mod method_index;
pub mod schema_converter;

pub use method_index::{find_method, flatten_methods};
pub use schema_converter::{MAX_DEPTH, SchemaConverter};
