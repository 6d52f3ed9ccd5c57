use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

/// One attempt at reading the generation log.
#[derive(Debug)]
pub enum ArtifactRead {
    /// The solver has not created the file yet.
    Missing,
    /// The file exists but could not be read, usually because the solver holds it for writing.
    Unreadable(io::Error),
    Contents(String),
}

/// Read-only access to the generation log the solver appends to.
pub trait LineSource {
    fn read(&mut self) -> impl Future<Output = ArtifactRead> + Send;
}

/// The generation log on disk.
#[derive(Clone, Debug)]
pub struct FileArtifact {
    path: PathBuf,
}

impl FileArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileArtifact { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LineSource for FileArtifact {
    fn read(&mut self) -> impl Future<Output = ArtifactRead> + Send {
        let path = self.path.clone();
        async move {
            match tokio::fs::read_to_string(&path).await {
                Ok(contents) => ArtifactRead::Contents(contents),
                Err(err) if err.kind() == io::ErrorKind::NotFound => ArtifactRead::Missing,
                Err(err) => ArtifactRead::Unreadable(err),
            }
        }
    }
}

/// Splits log contents into the lines the solver has finished writing.
///
/// A trailing fragment without a newline is still being written and is dropped, unless it is the
/// sentinel, which the solver writes without a newline. Trailing `\r` is stripped.
pub fn complete_lines(contents: &str, sentinel: &str) -> Vec<String> {
    let mut parts: Vec<&str> = contents.split('\n').collect();
    let fragment = parts.pop().unwrap_or_default();

    let mut lines: Vec<String> = parts
        .into_iter()
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect();
    if fragment == sentinel {
        lines.push(fragment.to_string());
    }
    lines
}
