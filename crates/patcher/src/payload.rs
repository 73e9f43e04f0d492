//! Payload archive access: the bundled 7z resource and its metadata.

use crate::error::PatchError;
use crate::types::{PayloadEntry, PayloadInfo};
use sevenz_rust2::{Password, SevenZReader};
use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;

/// A named 7z payload held in memory.
///
/// The patcher consumes the payload as bytes. The shipped binary embeds the
/// runtime archive with `include_bytes!`, and callers may substitute one
/// read from disk; both forms share this type.
#[derive(Debug, Clone)]
pub struct Payload {
    name: String,
    bytes: Cow<'static, [u8]>,
}

impl Payload {
    /// Wraps an archive compiled into the binary. Zero-copy.
    pub fn embedded(name: &str, bytes: &'static [u8]) -> Self {
        Self {
            name: name.to_string(),
            bytes: Cow::Borrowed(bytes),
        }
    }

    /// Reads an archive from disk, whole. Extraction seeks within the
    /// archive, so it is held in memory the same way the embedded form is.
    pub fn from_file(path: &Path) -> Result<Self, PatchError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            bytes: Cow::Owned(bytes),
        })
    }

    /// Resource name, for logs and status output.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw archive bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Lists the payload's entries and aggregate counts without extracting.
///
/// Only the archive header is decoded; compressed streams are not touched.
pub fn probe_payload(bytes: &[u8]) -> Result<PayloadInfo, PatchError> {
    let reader = SevenZReader::new(Cursor::new(bytes), Password::empty())?;

    let entries: Vec<PayloadEntry> = reader
        .archive()
        .files
        .iter()
        .map(|entry| PayloadEntry {
            path: entry.name.clone(),
            is_directory: entry.is_directory,
            size: entry.size,
        })
        .collect();

    let file_count = entries.iter().filter(|e| !e.is_directory).count() as u64;
    let total_bytes = entries.iter().filter(|e| !e.is_directory).map(|e| e.size).sum();

    Ok(PayloadInfo {
        entry_count: entries.len() as u64,
        file_count,
        directory_count: entries.len() as u64 - file_count,
        total_bytes,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_payload_exposes_name_and_bytes() {
        static BYTES: &[u8] = b"placeholder";
        let payload = Payload::embedded("runtime.7z", BYTES);
        assert_eq!(payload.name(), "runtime.7z");
        assert_eq!(payload.bytes(), BYTES);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = Payload::from_file(Path::new("/nonexistent/payload.7z"));
        match result {
            Err(PatchError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("Expected Io error, got: {:?}", other),
        }
    }

    #[test]
    fn garbage_bytes_are_an_archive_error() {
        let result = probe_payload(b"definitely not a 7z archive");
        match result {
            Err(PatchError::Archive(_)) => {}
            other => panic!("Expected Archive error, got: {:?}", other),
        }
    }
}
