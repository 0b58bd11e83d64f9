pub mod helpers;

pub use helpers::{data_dir, ensure_dir, expand_tilde, truncate_string, workspace_path};
