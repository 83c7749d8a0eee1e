//! Transparent line access to plain or gzip-compressed input files
//!
//! All NCBI Gene bulk-download files are shipped either gzip-compressed
//! (`.gz`) or plain. Compression is detected from the gzip magic bytes, not
//! the file name, so renamed downloads still open correctly.

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// Gzip magic bytes
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open a file as a buffered line reader, decompressing on the fly if the
/// content is gzip.
pub fn open_lines(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open input file: {}", path.display()))?;

    let mut magic = [0u8; 2];
    let n = file
        .read(&mut magic)
        .with_context(|| format!("Failed to read file header: {}", path.display()))?;
    file.seek(SeekFrom::Start(0))
        .with_context(|| format!("Failed to rewind input file: {}", path.display()))?;

    if n == 2 && magic == GZIP_MAGIC {
        debug!(path = %path.display(), "Opening gzip-compressed input");
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        debug!(path = %path.display(), "Opening plain input");
        Ok(Box::new(BufReader::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn write_gzip(path: &Path, content: &[u8]) {
        let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap();
    }

    #[test]
    fn test_open_plain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.txt");
        std::fs::write(&path, "a\tb\nc\td\n").unwrap();

        let reader = open_lines(&path).unwrap();
        let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["a\tb", "c\td"]);
    }

    #[test]
    fn test_open_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.gz");
        write_gzip(&path, b"9606\t1\tA1BG\n9606\t2\tA2M\n");

        let reader = open_lines(&path).unwrap();
        let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("9606\t1"));
    }

    #[test]
    fn test_open_missing_file() {
        let result = open_lines(Path::new("/nonexistent/gene_info.gz"));
        assert!(result.is_err());
    }

    #[test]
    fn test_open_short_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.txt");
        std::fs::write(&path, "x").unwrap();

        let reader = open_lines(&path).unwrap();
        let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["x"]);
    }
}
