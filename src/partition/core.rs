/// Split an original file into indexed fragment files plus a descriptor.
///
/// Every line becomes `"<zero-based line number> <line>\n"`. A last line
/// without terminator gets one, so the reconstruction of such a file ends
/// in a newline.
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::common::io::{read_file, write_full};
use crate::protocol::{Record, TERMINATOR};

/// Fragment write buffer.
const FRAGMENT_BUF_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Each fragment takes a consecutive run of lines.
    #[default]
    Contiguous,
    /// Lines are dealt to fragments in turn.
    RoundRobin,
}

#[derive(Debug, Clone)]
pub struct PartitionConfig {
    pub fragments: usize,
    pub strategy: Strategy,
    /// File name prefix; fragments are `<prefix>00`, `<prefix>01`, ...
    /// and the descriptor is `<prefix>.desc`.
    pub prefix: String,
    pub out_dir: PathBuf,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        PartitionConfig {
            fragments: 2,
            strategy: Strategy::Contiguous,
            prefix: "frag".to_string(),
            out_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PartitionSummary {
    pub descriptor: PathBuf,
    pub fragments: Vec<PathBuf>,
    pub lines: u64,
}

/// Iterate the lines of `data` without their terminators. A trailing
/// unterminated line is yielded like any other; an empty tail is not.
fn lines(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut start = 0;
    let mut ends = memchr::memchr_iter(TERMINATOR, data);
    std::iter::from_fn(move || {
        if let Some(end) = ends.next() {
            let line = &data[start..end];
            start = end + 1;
            Some(line)
        } else if start < data.len() {
            let line = &data[start..];
            start = data.len();
            Some(line)
        } else {
            None
        }
    })
}

/// Count lines the way [`lines`] yields them.
pub fn count_lines(data: &[u8]) -> usize {
    let terminated = memchr::memchr_iter(TERMINATOR, data).count();
    if data.last().is_some_and(|&b| b != TERMINATOR) {
        terminated + 1
    } else {
        terminated
    }
}

/// Build the fragment bodies in memory.
pub fn partition_bytes(data: &[u8], fragments: usize, strategy: Strategy) -> Vec<Vec<u8>> {
    let n = fragments.max(1);
    let mut out: Vec<Vec<u8>> = (0..n).map(|_| Vec::new()).collect();
    let total = count_lines(data);
    // Lines per fragment for the contiguous strategy, rounded up
    let per = total.div_ceil(n).max(1);

    for (i, line) in lines(data).enumerate() {
        let target = match strategy {
            Strategy::Contiguous => (i / per).min(n - 1),
            Strategy::RoundRobin => i % n,
        };
        Record::encode(i as u64, line, &mut out[target]);
    }
    out
}

/// Partition `original` into `config.fragments` files under `config.out_dir`
/// and write the descriptor that lists them.
pub fn partition_file(original: &Path, config: &PartitionConfig) -> io::Result<PartitionSummary> {
    if config.fragments == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "fragment count must be at least 1",
        ));
    }

    let data = read_file(original)?;
    let bodies = partition_bytes(&data, config.fragments, config.strategy);
    fs::create_dir_all(&config.out_dir)?;

    let mut paths = Vec::with_capacity(bodies.len());
    for (i, body) in bodies.iter().enumerate() {
        let path = config.out_dir.join(format!("{}{:02}", config.prefix, i));
        let mut w = BufWriter::with_capacity(FRAGMENT_BUF_SIZE, File::create(&path)?);
        write_full(&mut w, body)?;
        w.flush()?;
        debug!(path = %path.display(), bytes = body.len(), "fragment written");
        paths.push(path);
    }

    // Absolute original path so the descriptor works from any directory
    let original_abs = fs::canonicalize(original)?;
    let descriptor = config.out_dir.join(format!("{}.desc", config.prefix));
    let mut desc = String::new();
    desc.push_str(&original_abs.to_string_lossy());
    desc.push('\n');
    for path in &paths {
        if let Some(name) = path.file_name() {
            desc.push_str(&name.to_string_lossy());
            desc.push('\n');
        }
    }
    fs::write(&descriptor, desc)?;

    let lines = count_lines(&data) as u64;
    info!(
        original = %original.display(),
        lines,
        fragments = paths.len(),
        descriptor = %descriptor.display(),
        "partitioned"
    );
    Ok(PartitionSummary {
        descriptor,
        fragments: paths,
        lines,
    })
}
