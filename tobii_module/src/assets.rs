use std::fs;
use std::io;
use std::path::Path;

pub const MODULE_ICON: &str = "tobii-logo.png";

/// Looks up a named resource in `assets_dir`. `Ok(None)` when it does not exist.
pub fn find_static_image(assets_dir: &Path, name: &str) -> io::Result<Option<Vec<u8>>> {
    match fs::read(assets_dir.join(name)) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
