pub mod reader;
pub mod store;

pub use reader::LogReader;
pub use store::LogStore;
