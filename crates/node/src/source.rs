//! Frame and configuration sources backed by the filesystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use downsampler_adaptive::{FilterConfig, FrameHeader, Result};

/// One input cloud on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameFile {
    pub path: PathBuf,
    pub header: FrameHeader,
}

/// Lists `*.pcd` files in `dir`, sorted by file name.
///
/// `seq` is the position in that order, `frame_id` the file stem and
/// `stamp` the modification time in seconds.
pub fn list_frames(dir: &Path) -> io::Result<Vec<FrameFile>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pcd"))
        })
        .collect();
    paths.sort();

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(seq, path)| {
            let frame_id = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let stamp = modified(&path)
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map_or(0.0, |d| d.as_secs_f64());
            FrameFile {
                header: FrameHeader::new(seq as u64, stamp, frame_id),
                path,
            }
        })
        .collect())
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Re-reads a config file whenever its modification time changes.
pub struct ConfigWatcher {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl ConfigWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_modified = modified(&path);
        Self {
            path,
            last_modified,
        }
    }

    /// Returns a fresh snapshot if the file changed since the last poll.
    ///
    /// A file that fails to parse is reported and the previous config stays
    /// in effect.
    pub fn poll(&mut self) -> Option<FilterConfig> {
        let current = modified(&self.path);
        if current.is_none() || current == self.last_modified {
            return None;
        }
        self.last_modified = current;

        match FilterConfig::load(&self.path) {
            Ok(config) => {
                log::info!("reloaded config from {}", self.path.display());
                Some(config)
            }
            Err(e) => {
                log::error!("ignoring config update from {}: {}", self.path.display(), e);
                None
            }
        }
    }
}

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "voxel_grid_filter.toml";

/// Loads the config at `path`, or the default file if present, or defaults.
pub fn load_config(path: Option<&Path>) -> Result<FilterConfig> {
    match path {
        Some(path) => {
            let config = FilterConfig::load(path)?;
            log::info!("loaded config from {}", path.display());
            Ok(config)
        }
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_FILE);
            if fallback.is_file() {
                let config = FilterConfig::load(fallback)?;
                log::info!("loaded config from {}", fallback.display());
                Ok(config)
            } else {
                log::info!("no config file, using defaults");
                Ok(FilterConfig::default())
            }
        }
    }
}
