pub mod init;
pub mod render;
pub mod serve;

pub use init::{init, InitArgs};
pub use render::{render, RenderArgs};
pub use serve::{serve, ServeArgs};

use std::path::{Path, PathBuf};

/// Resolve a command line path against the working directory
fn resolve(cwd: &str, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        Path::new(cwd).join(path)
    }
}
