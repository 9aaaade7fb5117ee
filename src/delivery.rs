use std::{
    io::Write as _,
    path::{Path, PathBuf},
};

use crate::error::ContextError;

/// Where a finished report goes. The generator calls `deliver` once, with the complete file.
pub trait FileDelivery {
    /// Stores the file and returns where it ended up.
    fn deliver(&mut self, filename: &str, bytes: &[u8]) -> Result<PathBuf, ContextError>;
}

/// Saves reports into a directory, creating it when needed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryDelivery {
    directory: PathBuf,
}

impl DirectoryDelivery {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        DirectoryDelivery {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl FileDelivery for DirectoryDelivery {
    fn deliver(&mut self, filename: &str, bytes: &[u8]) -> Result<PathBuf, ContextError> {
        // The name must stay inside the directory
        if Path::new(filename).file_name() != Some(std::ffi::OsStr::new(filename)) {
            return Err(ContextError::with_context(format!(
                "Refusing to deliver a report with the file name {:?}",
                filename
            )));
        }

        std::fs::create_dir_all(&self.directory).map_err(|error| {
            ContextError::with_error(
                format!("Failed to create the output directory {:?}", self.directory),
                &error,
            )
        })?;

        let file_path = self.directory.join(filename);
        let mut file = std::fs::File::create(&file_path).map_err(|error| {
            ContextError::with_error(
                format!("Failed to create the output file {:?}", file_path),
                &error,
            )
        })?;
        file.write_all(bytes).map_err(|error| {
            ContextError::with_error(
                format!("Failed to save the output file {:?}", file_path),
                &error,
            )
        })?;

        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_directory(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "{}-{}-{}",
            env!("CARGO_PKG_NAME"),
            name,
            std::process::id()
        ))
    }

    #[test]
    fn files_are_written_into_a_new_directory() {
        let directory = scratch_directory("delivery").join("nested");
        let mut delivery = DirectoryDelivery::new(&directory);

        let path = delivery.deliver("report.pdf", b"%PDF-1.5").unwrap();

        assert_eq!(path, directory.join("report.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.5");
        std::fs::remove_dir_all(directory.parent().unwrap()).unwrap();
    }

    #[test]
    fn names_with_directories_are_refused() {
        let mut delivery = DirectoryDelivery::new(scratch_directory("refused"));

        assert!(delivery.deliver("../report.pdf", b"").is_err());
        assert!(delivery.deliver("", b"").is_err());
        assert!(!delivery.directory().exists());
    }
}
