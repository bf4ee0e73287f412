//! Movement-in-progress marker file

use std::fs;
use std::path::PathBuf;

use crate::watcher::MovementSignal;

/// Reflects the movement-in-progress signal as the existence of a
/// filesystem marker, for external tooling that watches the path.
pub struct FileMarker {
    path: PathBuf,
}

impl FileMarker {
    /// Marker at `path`. The file is created empty and removed again as
    /// the actuator starts and settles.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MovementSignal for FileMarker {
    fn set_moving(&self, moving: bool) {
        let result = if moving {
            fs::write(&self.path, b"").map_err(|e| (e, "create"))
        } else {
            match fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err((e, "remove")),
                _ => Ok(()),
            }
        };
        if let Err((e, action)) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to {action} movement marker");
        }
    }
}
