//! Input validation: make sure a path names a readable PDF before pdfium
//! ever sees it.
//!
//! pdfium reports a missing file, a permission problem and a JPEG renamed to
//! `.pdf` all as the same opaque load failure. Checking existence, readability
//! and the `%PDF` magic bytes first gives callers an error they can act on.

use crate::error::NotesError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate a local PDF path.
pub fn resolve_local(path: &Path) -> Result<PathBuf, NotesError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(NotesError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(NotesError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(NotesError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(NotesError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Check in-memory bytes carry the PDF magic.
pub fn check_bytes(bytes: &[u8], source_name: &str) -> Result<(), NotesError> {
    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(NotesError::NotAPdf {
            path: PathBuf::from(source_name),
            magic,
        });
    }
    Ok(())
}

/// The stem used to name every output of a conversion (`deck.pdf` → `deck`).
pub fn source_stem(source_name: &str) -> String {
    Path::new(source_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "slides".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_reported() {
        let err = resolve_local(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, NotesError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_is_rejected() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"\x89PNG rest of file").unwrap();
        let err = resolve_local(tmp.path()).unwrap_err();
        assert!(matches!(err, NotesError::NotAPdf { .. }), "got {err:?}");
    }

    #[test]
    fn pdf_magic_is_accepted() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.7\n").unwrap();
        assert_eq!(resolve_local(tmp.path()).unwrap(), tmp.path());
    }

    #[test]
    fn byte_magic() {
        assert!(check_bytes(b"%PDF-1.4", "a.pdf").is_ok());
        assert!(check_bytes(b"PK\x03\x04", "a.pdf").is_err());
    }

    #[test]
    fn stems() {
        assert_eq!(source_stem("lecture-03.pdf"), "lecture-03");
        assert_eq!(source_stem("/tmp/decks/Week 1.PDF"), "Week 1");
        assert_eq!(source_stem(""), "slides");
    }
}
