//! File naming and housekeeping shared by the file sinks.

use crate::error::SinkError;
use datagen_core::{ModelOptions, OptionKey};
use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Default buffer size for file writing.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// File sink behaviour taken from the model options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSettings {
    pub one_file_per_iteration: bool,
    pub header: bool,
    pub delete_previous: bool,
}

impl FileSettings {
    pub fn from_options(options: &ModelOptions) -> Self {
        Self {
            one_file_per_iteration: options.get_bool(OptionKey::OneFilePerIteration),
            header: options.get_bool(OptionKey::CsvHeader),
            delete_previous: options.get_bool(OptionKey::DeletePrevious),
        }
    }
}

impl Default for FileSettings {
    fn default() -> Self {
        Self::from_options(&ModelOptions::default())
    }
}

/// Where a file sink writes: `{dir}/{name}.{ext}` for a single file, or
/// `{dir}/{name}-{seq:010}.{ext}` when every batch gets its own file.
///
/// The sequence is one atomic shared by every worker writing through the
/// sink, so file numbers never collide.
#[derive(Debug)]
pub struct FileTarget {
    dir: PathBuf,
    name: String,
    extension: &'static str,
    sequence: AtomicU64,
}

impl FileTarget {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>, extension: &'static str) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
            extension,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn single_path(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", self.name, self.extension))
    }

    /// Path of the next per-batch file.
    pub fn next_path(&self) -> PathBuf {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.dir
            .join(format!("{}-{:010}.{}", self.name, seq, self.extension))
    }

    /// Continue numbering after the highest per-batch file already on disk,
    /// so a later run of the same command does not overwrite earlier files.
    pub fn resume_sequence(&self) -> Result<u64, SinkError> {
        let prefix = format!("{}-", self.name);
        let suffix = format!(".{}", self.extension);
        let next = self
            .existing_files()?
            .iter()
            .filter_map(|path| path.file_name().and_then(|f| f.to_str()))
            .filter_map(|f| f.strip_prefix(&prefix)?.strip_suffix(&suffix)?.parse::<u64>().ok())
            .max()
            .map_or(0, |last| last + 1);
        self.sequence.store(next, Ordering::SeqCst);
        Ok(next)
    }

    pub fn create_dir(&self) -> Result<(), SinkError> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    pub fn create_file(&self, path: &Path) -> Result<BufWriter<File>, SinkError> {
        debug!("Creating file '{}'", path.display());
        let file = File::create(path)?;
        Ok(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file))
    }

    /// Open `path` for appending, creating it when missing. Also returns
    /// whether the file was empty, i.e. still needs a header.
    pub fn append_file(&self, path: &Path) -> Result<(BufWriter<File>, bool), SinkError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let empty = file.metadata()?.len() == 0;
        debug!(
            "Appending to {} file '{}'",
            if empty { "new" } else { "existing" },
            path.display()
        );
        Ok((BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file), empty))
    }

    /// Existing output of this target: the single file and every per-batch
    /// file, sorted by name.
    pub fn existing_files(&self) -> Result<Vec<PathBuf>, SinkError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let single = format!("{}.{}", self.name, self.extension);
        let prefix = format!("{}-", self.name);
        let suffix = format!(".{}", self.extension);

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let Some(file_name) = path.file_name().and_then(|f| f.to_str()) else {
                continue;
            };
            let numbered = file_name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(&suffix))
                .is_some_and(|seq| !seq.is_empty() && seq.bytes().all(|b| b.is_ascii_digit()));
            if path.is_file() && (file_name == single || numbered) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Delete existing output of this target.
    pub fn purge(&self) -> Result<usize, SinkError> {
        let files = self.existing_files()?;
        for file in &files {
            fs::remove_file(file)?;
        }
        if !files.is_empty() {
            info!(
                "Deleted {} previous file(s) of '{}' in '{}'",
                files.len(),
                self.name,
                self.dir.display()
            );
        }
        Ok(files.len())
    }
}
