//! Splitting blob paths into a directory chain and a file name.

use crate::error::{SyncError, SyncResult};

/// A slash-delimited path resolved into its directories and file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePath {
    directories: Vec<String>,
    file_name: String,
}

impl FilePath {
    /// Resolves `d1/d2/f` into directories `[d1, d2]` and file name `f`.
    pub fn resolve(path: &str) -> SyncResult<Self> {
        if path.is_empty() {
            return Err(SyncError::parse("unable to resolve file path: path is empty"));
        }
        if path.ends_with('/') {
            return Err(SyncError::parse(format!(
                "unable to resolve file path '{}': no file name after the last '/'",
                path
            )));
        }

        let mut segments: Vec<String> = path.split('/').map(String::from).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(SyncError::parse(format!(
                "unable to resolve file path '{}': empty directory segment",
                path
            )));
        }

        // Non-empty after the checks above.
        let file_name = segments.pop().unwrap_or_default();

        Ok(Self {
            directories: segments,
            file_name,
        })
    }

    /// Directory segments, outermost first.
    pub fn directories(&self) -> &[String] {
        &self.directories
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Cumulative directory paths, parents before children: `d1`, `d1/d2`.
    pub fn directory_paths(&self) -> Vec<String> {
        let mut paths = Vec::with_capacity(self.directories.len());
        let mut current = String::new();
        for segment in &self.directories {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            paths.push(current.clone());
        }
        paths
    }

    /// The containing directory, `None` for files at the share root.
    pub fn directory(&self) -> Option<String> {
        if self.directories.is_empty() {
            None
        } else {
            Some(self.directories.join("/"))
        }
    }

    /// Full path of the file relative to the share root.
    pub fn full_path(&self) -> String {
        match self.directory() {
            Some(directory) => format!("{}/{}", directory, self.file_name),
            None => self.file_name.clone(),
        }
    }
}
