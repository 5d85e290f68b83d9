mod files;
mod probe;
mod services;

pub use files::{run_download, run_upload};
pub use probe::run_probe;
pub use services::{run_action, run_list, run_status};
