use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::common::io::read_file;
use crate::coordinator::Fragment;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("cannot read descriptor {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("descriptor does not name an original file")]
    MissingOriginal,
    #[error("descriptor lists no fragment files")]
    NoFragments,
    #[error("cannot open fragment {}: {source}", path.display())]
    Fragment {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Descriptor file contents: the original file on the first line, then one
/// fragment path per non-empty line. Relative paths are resolved against
/// the descriptor's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub original: PathBuf,
    pub fragments: Vec<PathBuf>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Manifest, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Manifest::parse(&text, base)
    }

    pub fn parse(text: &str, base: &Path) -> Result<Manifest, ManifestError> {
        let mut lines = text.lines().map(|l| l.trim_end_matches('\r'));

        let original = match lines.next() {
            Some(first) if !first.trim().is_empty() => resolve(base, first),
            _ => return Err(ManifestError::MissingOriginal),
        };

        let fragments: Vec<PathBuf> = lines
            .filter(|l| !l.trim().is_empty())
            .map(|l| resolve(base, l))
            .collect();
        if fragments.is_empty() {
            return Err(ManifestError::NoFragments);
        }

        Ok(Manifest {
            original,
            fragments,
        })
    }

    /// Read every fragment into memory (mmap for large files), in
    /// descriptor order.
    pub fn open_fragments(&self) -> Result<Vec<Fragment>, ManifestError> {
        self.fragments
            .iter()
            .map(|path| {
                let data = read_file(path).map_err(|source| ManifestError::Fragment {
                    path: path.clone(),
                    source,
                })?;
                Ok(Fragment::new(path.display().to_string(), data))
            })
            .collect()
    }
}

fn resolve(base: &Path, line: &str) -> PathBuf {
    let p = Path::new(line);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
