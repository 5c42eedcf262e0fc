use std::path::{Path, PathBuf};

/// Where `include <name>` looks for files: the working root first, then each
/// library directory in order.
#[derive(Debug, Clone, Default)]
pub struct IncludeResolver {
    search_path: Vec<PathBuf>,
}

impl IncludeResolver {
    pub fn new(working_root: impl Into<PathBuf>) -> Self {
        IncludeResolver {
            search_path: vec![working_root.into()],
        }
    }

    pub fn with_library_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_path.extend(dirs.into_iter().map(Into::into));
        self
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Find the file `name` refers to. On failure, returns every location
    /// that was tried.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, Vec<PathBuf>> {
        let name = Path::new(name);
        if name.is_absolute() {
            return if name.is_file() {
                Ok(name.to_path_buf())
            } else {
                Err(vec![name.to_path_buf()])
            };
        }

        let mut searched = Vec::with_capacity(self.search_path.len());
        for dir in &self.search_path {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
            searched.push(candidate);
        }
        Err(searched)
    }
}
