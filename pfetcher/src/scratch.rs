use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of the random part of a scratch file name.
pub const SCRATCH_NAME_LEN: usize = 64;

/// `len` random ASCII letters and digits followed by `.txt`.
pub fn random_file_name(len: usize) -> String {
    let stem: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect();
    format!("{stem}.txt")
}

/// A downloaded body materialised on disk for the duration of one ingestion.
///
/// The file is removed when the guard is dropped, whatever the outcome of the
/// processing that used it.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Writes `contents` to a fresh, uniquely named file inside `dir`.
    ///
    /// The file is created with create-new semantics, so an unlikely name
    /// collision fails instead of overwriting another run's download.
    pub fn create(dir: &Path, contents: &[u8]) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(random_file_name(SCRATCH_NAME_LEN));

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&path)?;

        // From here on the guard owns the path and cleans up on error.
        let scratch = Self { path };
        file.write_all(contents)?;
        file.flush()?;
        log::debug!(
            "Wrote {} bytes to scratch file {}",
            contents.len(),
            scratch.path.display()
        );
        Ok(scratch)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed scratch file {}", self.path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => log::warn!(
                "Failed to remove scratch file {}: {}",
                self.path.display(),
                err
            ),
        }
    }
}
