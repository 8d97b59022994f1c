pub mod logs;
pub mod root;
