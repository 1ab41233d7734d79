use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::APP_DIR_NAME;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// A downloadable model artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelSource {
    pub name: &'static str,
    pub url: &'static str,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Locates `source` on disk, downloading it into the user cache if needed.
///
/// Resolution order: user cache, then `bundled_dir`, then download.
pub fn resolve(
    source: ModelSource,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    resolve_in(&model_cache_dir()?, source, bundled_dir, progress)
}

/// Same as [`resolve`] with an explicit cache directory.
pub fn resolve_in(
    cache_dir: &Path,
    source: ModelSource,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached = cache_dir.join(source.name);
    if cached.exists() {
        log::debug!("Model {} found in cache", source.name);
        return Ok(cached);
    }

    if let Some(bundled) = bundled_dir.map(|d| d.join(source.name)) {
        if bundled.exists() {
            log::debug!("Model {} found at {}", source.name, bundled.display());
            return Ok(bundled);
        }
    }

    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {} from {}", source.name, source.url);
    download(source.url, &cached, progress)?;
    Ok(cached)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/EyeCrop/models/`
/// - Linux: `$XDG_CACHE_HOME/EyeCrop/models/` or `~/.cache/EyeCrop/models/`
/// - Windows: `%LOCALAPPDATA%/EyeCrop/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join(APP_DIR_NAME).join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

/// Streams `url` into `dest` through a `.part` file that is renamed on success
/// and removed on failure, so an interrupted download never looks cached.
fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let part = dest.with_extension("part");
    let result = fetch(url, &part, progress).and_then(|()| {
        fs::rename(&part, dest).map_err(|source| ModelResolveError::Write {
            path: dest.to_path_buf(),
            source,
        })
    });
    if result.is_err() {
        let _ = fs::remove_file(&part);
    }
    result
}

fn fetch(url: &str, part: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| ModelResolveError::Download {
            url: url.to_string(),
            source,
        })?;

    let write_err = |source: io::Error| ModelResolveError::Write {
        path: part.to_path_buf(),
        source,
    };
    let file = fs::File::create(part).map_err(write_err)?;
    let mut sink = ProgressWriter {
        inner: io::BufWriter::new(file),
        written: 0,
        total: response.content_length().unwrap_or(0),
        progress,
    };
    io::copy(&mut response, &mut sink).map_err(write_err)?;
    sink.flush().map_err(write_err)?;
    Ok(())
}

/// Writer adapter that reports cumulative bytes after every chunk.
struct ProgressWriter<W: Write> {
    inner: W,
    written: u64,
    total: u64,
    progress: Option<ProgressFn>,
}

impl<W: Write> Write for ProgressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        if let Some(cb) = &self.progress {
            cb(self.written, self.total);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
