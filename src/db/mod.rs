pub mod pool;
pub mod queries;
pub mod reader;

pub use pool::create_pool;
pub use reader::ChunkedReader;
