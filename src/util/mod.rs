//! Utility modules

pub mod paths;
pub mod text;

pub use paths::{data_dir, init_data_dir, log_file_path, logs_dir};
pub use text::{sanitize_component, truncate_chars, truncate_with_ellipsis};
