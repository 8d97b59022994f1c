pub mod access_log;
pub mod recorder;

pub use access_log::RequestInfo;
pub use recorder::{RecorderTask, RequestRecorder};
