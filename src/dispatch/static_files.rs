//! Static directory resolution.
//!
//! A lookup is split in two so the file read never runs on the reactor
//! thread: [`StaticFetch`] describes what to read, [`StaticFetch::load`]
//! performs the read on tokio's blocking pool, and [`apply`] turns the
//! [`FileLoad`] result into a response or a fall-through.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::http::mime::content_type_for;
use crate::http::response::{Response, StatusCode};

pub const LOAD_FAILED_MESSAGE: &str = "File found, but buffer failed to load";

/// A pending static lookup for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFetch {
    /// Filesystem path the request resolved to.
    pub path: PathBuf,
    /// HEAD requests never read the file contents.
    pub head_only: bool,
    /// Chain position to continue from on a miss.
    pub next_entry: usize,
}

/// Result of a static lookup.
#[derive(Debug)]
pub enum FileLoad {
    /// Nothing servable at the path; the chain falls through.
    Missing,
    /// The file exists and only its metadata was needed.
    HeadersOnly { len: u64 },
    Loaded(Vec<u8>),
    /// Fewer (or more) bytes came back than the file's reported size.
    ShortRead { expected: u64, actual: usize },
    /// The file opened but could not be stat'ed or read.
    Failed(io::Error),
}

/// Maps a request path onto `root`. `/` serves `root/index.html`.
///
/// Returns `None` for paths that could escape the root or are not UTF-8;
/// those are treated as a miss.
pub fn resolve(root: &Path, request_path: &[u8]) -> Option<PathBuf> {
    let path = std::str::from_utf8(request_path).ok()?;
    if path.split('/').any(|segment| segment == "..") {
        debug!(path, "refusing parent directory segment");
        return None;
    }

    let mut full: OsString = root.as_os_str().to_owned();
    if path == "/" {
        full.push("/index.html");
    } else {
        full.push(path);
    }
    Some(PathBuf::from(full))
}

impl StaticFetch {
    pub fn new(path: PathBuf, head_only: bool, next_entry: usize) -> Self {
        Self {
            path,
            head_only,
            next_entry,
        }
    }

    /// Reads the file asynchronously.
    pub async fn load(&self) -> FileLoad {
        let file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "could not open file");
                return FileLoad::Missing;
            }
        };

        let metadata = match file.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => return FileLoad::Failed(e),
        };
        if metadata.is_dir() {
            return FileLoad::Missing;
        }
        if self.head_only {
            return FileLoad::HeadersOnly { len: metadata.len() };
        }

        let mut buf = match file_buffer(metadata.len()) {
            Ok(buf) => buf,
            Err(e) => return FileLoad::Failed(e),
        };
        match file.take(metadata.len() + 1).read_to_end(&mut buf).await {
            Ok(actual) => check_size(metadata.len(), actual, buf),
            Err(e) => FileLoad::Failed(e),
        }
    }

    /// Same as [`StaticFetch::load`] but on the calling thread.
    pub fn load_blocking(&self) -> FileLoad {
        use std::io::Read;

        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "could not open file");
                return FileLoad::Missing;
            }
        };

        let metadata = match file.metadata() {
            Ok(metadata) => metadata,
            Err(e) => return FileLoad::Failed(e),
        };
        if metadata.is_dir() {
            return FileLoad::Missing;
        }
        if self.head_only {
            return FileLoad::HeadersOnly { len: metadata.len() };
        }

        let mut buf = match file_buffer(metadata.len()) {
            Ok(buf) => buf,
            Err(e) => return FileLoad::Failed(e),
        };
        match file.take(metadata.len() + 1).read_to_end(&mut buf) {
            Ok(actual) => check_size(metadata.len(), actual, buf),
            Err(e) => FileLoad::Failed(e),
        }
    }
}

/// Allocates room for a whole file, failing the lookup rather than the
/// process when the size cannot be buffered.
fn file_buffer(len: u64) -> io::Result<Vec<u8>> {
    let len = usize::try_from(len).map_err(|_| io::Error::other("file too large to buffer"))?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(io::Error::other)?;
    Ok(buf)
}

fn check_size(expected: u64, actual: usize, buf: Vec<u8>) -> FileLoad {
    if actual as u64 == expected {
        FileLoad::Loaded(buf)
    } else {
        FileLoad::ShortRead { expected, actual }
    }
}

/// Writes the outcome of a lookup into the response.
///
/// A miss sets `should_continue` so the chain moves on; anything else
/// claims the request.
pub fn apply(
    fetch: &StaticFetch,
    load: FileLoad,
    response: &mut Response<'_>,
    should_continue: &mut bool,
) {
    let content_type = content_type_for(&fetch.path);

    let result = match load {
        FileLoad::Missing => {
            *should_continue = true;
            return;
        }
        FileLoad::HeadersOnly { len } => response
            .set_status(StatusCode::OK, None)
            .and_then(|_| response.add_header("Content-Length", &len.to_string()))
            .and_then(|_| response.add_to_body(&[], Some(content_type)))
            .and_then(|_| response.send())
            .map(|_| ()),
        FileLoad::Loaded(bytes) => {
            info!(
                path = %fetch.path.display(),
                bytes = bytes.len(),
                content_type,
                "serving static file"
            );
            response
                .set_status(StatusCode::OK, None)
                .and_then(|_| response.set_body(&bytes, Some(content_type)))
                .and_then(|_| response.end())
                .map(|_| ())
        }
        FileLoad::ShortRead { expected, actual } => {
            warn!(
                path = %fetch.path.display(),
                expected,
                actual,
                "read a different number of bytes than the file size"
            );
            fail(response)
        }
        FileLoad::Failed(e) => {
            warn!(path = %fetch.path.display(), error = %e, "failed to load static file");
            fail(response)
        }
    };

    if let Err(e) = result {
        warn!(path = %fetch.path.display(), error = %e, "could not respond with static file");
    }
}

fn fail(response: &mut Response<'_>) -> Result<(), crate::http::response::ResponseError> {
    response.set_status(StatusCode::SERVICE_UNAVAILABLE, Some(LOAD_FAILED_MESSAGE))?;
    response.clear_body()?;
    response.send()?;
    Ok(())
}
