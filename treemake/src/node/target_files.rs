//! Target file lifecycle: temp files, publishing and cleanup.
//!
//! Outputs are written to a `_tmp_` file next to the target and renamed
//! onto the target path only once complete, so a target path never holds a
//! partially written file.

use super::Node;
use crate::cancel::CancelToken;
use crate::error::TechError;
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Prefix of every temp file created for a target.
pub const TMP_FILE_PREFIX: &str = "_tmp_";

const RANDOM_SUFFIX_LEN: usize = 6;
const CREATE_ATTEMPTS: usize = 8;

/// `_tmp_<millis><random>_<target>`
fn tmp_file_name(target_name: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!(
        "{TMP_FILE_PREFIX}{}{suffix}_{target_name}",
        chrono::Utc::now().timestamp_millis()
    )
}

impl Node {
    /// Create an empty, uniquely named temp file for `target_name` in the
    /// node directory (created if missing) and return its path. The file
    /// exists once this returns; concurrent calls never share a file.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be created.
    pub async fn create_tmp_file_for_target(&self, target_name: &str) -> std::io::Result<PathBuf> {
        fs::create_dir_all(self.dir()).await?;

        let mut last_error = None;
        for _ in 0..CREATE_ATTEMPTS {
            let path = self.resolve_path(&tmp_file_name(target_name));
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => return Ok(path),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last_error.unwrap_or_else(|| ErrorKind::AlreadyExists.into()))
    }

    /// Move a completed temp file onto the path of `target_name`.
    ///
    /// If the run has been cancelled the temp file is removed instead and
    /// the target path is left untouched.
    ///
    /// # Errors
    ///
    /// `TechError::Cancelled` after cancellation, `TechError::Io` if the
    /// rename fails.
    pub async fn publish_tmp_file(
        &self,
        tmp_path: &Path,
        target_name: &str,
        cancel: &CancelToken,
    ) -> Result<PathBuf, TechError> {
        if cancel.is_cancelled() {
            discard(tmp_path).await;
            return Err(TechError::Cancelled);
        }

        let target_path = self.resolve_path(target_name);
        if let Err(e) = fs::rename(tmp_path, &target_path).await {
            discard(tmp_path).await;
            return Err(TechError::io(&target_path, e));
        }
        Ok(target_path)
    }

    /// Write `contents` as the new content of `target_name` through a temp
    /// file.
    ///
    /// # Errors
    ///
    /// See [`Node::publish_tmp_file`]; write failures are `TechError::Io`.
    pub async fn write_target_file(
        &self,
        target_name: &str,
        contents: &[u8],
        cancel: &CancelToken,
    ) -> Result<PathBuf, TechError> {
        let tmp_path = self
            .create_tmp_file_for_target(target_name)
            .await
            .map_err(|e| TechError::io(self.dir(), e))?;

        if let Err(e) = fs::write(&tmp_path, contents).await {
            discard(&tmp_path).await;
            return Err(TechError::io(&tmp_path, e));
        }

        self.publish_tmp_file(&tmp_path, target_name, cancel).await
    }

    /// Remove the file `filename` from the node directory if present and
    /// log it. Returns whether a file was removed; a file that is already
    /// gone is not an error.
    ///
    /// # Errors
    ///
    /// Any I/O error other than "not found".
    pub fn clean_target_file(&self, filename: &str) -> std::io::Result<bool> {
        let path = self.resolve_path(filename);
        if !path.exists() {
            return Ok(false);
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                self.logger.log_clean(filename);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remove temp files left behind by interrupted runs.
    ///
    /// # Errors
    ///
    /// Any I/O error other than "not found".
    pub fn clean_tmp_files(&self) -> std::io::Result<usize> {
        if !self.dir().is_dir() {
            return Ok(0);
        }

        let stale: Vec<String> = walkdir::WalkDir::new(self.dir())
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| name.starts_with(TMP_FILE_PREFIX))
            .collect();

        let mut removed = 0;
        for name in stale {
            if self.clean_target_file(&name)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

async fn discard(tmp_path: &Path) {
    if let Err(e) = fs::remove_file(tmp_path).await {
        debug!("Could not remove temp file {}: {}", tmp_path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tmp_file_name_format() {
        let re = regex::Regex::new(r"^_tmp_\d{13,14}\w{6,7}_test_target\.js$").unwrap();
        let name = tmp_file_name("test_target.js");
        assert!(re.is_match(&name), "{name}");
    }

    #[test]
    fn test_tmp_file_names_differ() {
        assert_ne!(tmp_file_name("a.js"), tmp_file_name("a.js"));
    }
}
