use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::ops::Deref;
use std::path::Path;

#[cfg(target_os = "linux")]
use std::sync::atomic::{AtomicBool, Ordering};

use memmap2::{Mmap, MmapOptions};

/// Holds file data, either a zero-copy mmap or an owned Vec.
/// Dereferences to `&[u8]` for transparent use.
pub enum FileData {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Deref for FileData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            FileData::Mmap(m) => m,
            FileData::Owned(v) => v,
        }
    }
}

impl From<Vec<u8>> for FileData {
    fn from(v: Vec<u8>) -> Self {
        FileData::Owned(v)
    }
}

impl std::fmt::Debug for FileData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            FileData::Mmap(_) => "Mmap",
            FileData::Owned(_) => "Owned",
        };
        write!(f, "FileData::{}({} bytes)", kind, self.len())
    }
}

/// Threshold below which we use read() instead of mmap.
/// Fragment files under 1MB are cheaper to copy than to map.
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// 4MB buffer for output; large reconstructions flush rarely.
pub const OUTPUT_BUF_SIZE: usize = 4 * 1024 * 1024;

/// Track whether O_NOATIME is supported to avoid repeated failed open() attempts.
#[cfg(target_os = "linux")]
static NOATIME_SUPPORTED: AtomicBool = AtomicBool::new(true);

/// Open a file with O_NOATIME on Linux to avoid atime inode writes.
#[cfg(target_os = "linux")]
fn open_noatime(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    if NOATIME_SUPPORTED.load(Ordering::Relaxed) {
        match fs::OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NOATIME)
            .open(path)
        {
            Ok(f) => return Ok(f),
            Err(ref e) if e.raw_os_error() == Some(libc::EPERM) => {
                // O_NOATIME requires file ownership or CAP_FOWNER
                NOATIME_SUPPORTED.store(false, Ordering::Relaxed);
            }
            Err(e) => return Err(e),
        }
    }
    File::open(path)
}

#[cfg(not(target_os = "linux"))]
fn open_noatime(path: &Path) -> io::Result<File> {
    File::open(path)
}

/// Read a file with mmap for large files or read() for small files.
/// The whole fragment stays resident until its last byte is dispatched.
pub fn read_file(path: &Path) -> io::Result<FileData> {
    let file = open_noatime(path)?;
    let metadata = file.metadata()?;
    let len = metadata.len();

    if !metadata.file_type().is_file() {
        // Pipes and other special files have no meaningful size
        let mut buf = Vec::new();
        let mut reader = file;
        reader.read_to_end(&mut buf)?;
        return Ok(FileData::Owned(buf));
    }

    if len == 0 {
        return Ok(FileData::Owned(Vec::new()));
    }

    if len < MMAP_THRESHOLD {
        let mut buf = vec![0u8; len as usize];
        let n = read_full(&mut &file, &mut buf)?;
        buf.truncate(n);
        return Ok(FileData::Owned(buf));
    }

    // SAFETY: read-only private mapping of a file we keep open for the
    // lifetime of the map. Concurrent truncation by another process is
    // outside what the tool supports.
    match unsafe { MmapOptions::new().map(&file) } {
        Ok(mmap) => {
            #[cfg(target_os = "linux")]
            {
                let _ = mmap.advise(memmap2::Advice::Sequential);
            }
            Ok(FileData::Mmap(mmap))
        }
        Err(_) => {
            let mut buf = Vec::with_capacity(len as usize);
            let mut reader = file;
            reader.read_to_end(&mut buf)?;
            Ok(FileData::Owned(buf))
        }
    }
}

/// Read as many bytes as possible into buf, retrying on partial reads.
/// Returns fewer than `buf.len()` bytes only at EOF.
#[inline]
pub fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// Write all of buf, retrying short writes and EINTR.
/// A writer that accepts zero bytes is reported as `WriteZero`.
#[inline]
pub fn write_full(writer: &mut impl Write, buf: &[u8]) -> io::Result<()> {
    let mut written = 0;
    while written < buf.len() {
        match writer.write(&buf[written..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write any data",
                ));
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Compare two files byte for byte.
pub fn files_identical(a: &Path, b: &Path) -> io::Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }
    let da = read_file(a)?;
    let db = read_file(b)?;
    Ok(*da == *db)
}

/// Output writer enum to avoid Box<dyn Write> vtable dispatch overhead.
pub enum OutputSink<'a> {
    Stdout(BufWriter<io::StdoutLock<'a>>),
    File(BufWriter<File>),
}

impl OutputSink<'_> {
    /// Truncate-or-create `path`, or lock stdout when no path is given.
    pub fn open(path: Option<&Path>) -> io::Result<Self> {
        match path {
            Some(p) => {
                let file = File::create(p)?;
                Ok(OutputSink::File(BufWriter::with_capacity(OUTPUT_BUF_SIZE, file)))
            }
            None => Ok(OutputSink::Stdout(BufWriter::with_capacity(
                OUTPUT_BUF_SIZE,
                io::stdout().lock(),
            ))),
        }
    }
}

impl Write for OutputSink<'_> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputSink::Stdout(w) => w.write(buf),
            OutputSink::File(w) => w.write(buf),
        }
    }
    #[inline]
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            OutputSink::Stdout(w) => w.write_all(buf),
            OutputSink::File(w) => w.write_all(buf),
        }
    }
    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputSink::Stdout(w) => w.flush(),
            OutputSink::File(w) => w.flush(),
        }
    }
}
