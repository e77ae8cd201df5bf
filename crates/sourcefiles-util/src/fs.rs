use std::fs;
use std::io;
use std::path::Path;

/// Read a file that must be valid UTF-8.
///
/// Unlike a lossy read, invalid UTF-8 is reported as an
/// [`io::ErrorKind::InvalidData`] error so callers never see replacement
/// characters in module text.
///
/// # Errors
/// Returns an error if the file cannot be read or is not UTF-8.
pub fn read_utf8(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Render a path with `/` separators regardless of platform.
#[must_use]
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Path of `path` relative to `base`, with `/` separators.
///
/// Returns `None` if `path` is not inside `base`.
#[must_use]
pub fn relative_slash(base: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(base).ok().map(to_slash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_utf8_valid() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"export const x = 1;").unwrap();
        file.flush().unwrap();

        assert_eq!(read_utf8(file.path()).unwrap(), "export const x = 1;");
    }

    #[test]
    fn test_read_utf8_invalid_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x48, 0x65, 0x6c, 0x6c, 0x6f, 0x80, 0x81])
            .unwrap();
        file.flush().unwrap();

        let err = read_utf8(file.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_read_utf8_missing() {
        assert!(read_utf8(Path::new("/nonexistent/file.js")).is_err());
    }

    #[test]
    fn test_relative_slash() {
        let base = PathBuf::from("/pkg");
        let file = base.join("dist").join("index.d.ts");
        assert_eq!(relative_slash(&base, &file).as_deref(), Some("dist/index.d.ts"));
        assert_eq!(relative_slash(&base, Path::new("/other/x.d.ts")), None);
    }
}
