//! Building bundles from disk and reading stored bundle text.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::bundle::{SourceLayout, SourceMap};

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("target not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported file type: {}", .0.display())]
    Unsupported(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CollectError + '_ {
    move |source| CollectError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Collect a package directory or a single source file into a map.
///
/// A directory `pkg` contributes every source file below it under
/// `pkg/<relative posix path>`; a single file contributes itself under its
/// file name.
pub fn collect_package(path: &Path, layout: &SourceLayout) -> Result<SourceMap, CollectError> {
    if !path.exists() {
        return Err(CollectError::NotFound(path.to_path_buf()));
    }

    let mut files = SourceMap::new();

    if path.is_file() {
        let is_source = path
            .extension()
            .is_some_and(|ext| ext == layout.extension.as_str());
        let file_name = path.file_name().and_then(|n| n.to_str());
        return match (is_source, file_name) {
            (true, Some(name)) => {
                let text = std::fs::read_to_string(path).map_err(io_error(path))?;
                files.insert(name.to_string(), text);
                Ok(files)
            }
            _ => Err(CollectError::Unsupported(path.to_path_buf())),
        };
    }

    let Some(root_name) = path.file_name().and_then(|n| n.to_str()) else {
        return Err(CollectError::Unsupported(path.to_path_buf()));
    };
    collect_dir(path, root_name, layout, &mut files)?;
    Ok(files)
}

fn collect_dir(
    dir: &Path,
    prefix: &str,
    layout: &SourceLayout,
    files: &mut SourceMap,
) -> Result<(), CollectError> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error(dir))? {
        entries.push(entry.map_err(io_error(dir))?);
    }
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let key = format!("{}/{}", prefix, name);
        // Symlinks are not followed.
        let file_type = entry.file_type().map_err(io_error(&path))?;

        if file_type.is_dir() {
            collect_dir(&path, &key, layout, files)?;
        } else if file_type.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext == layout.extension.as_str())
        {
            let text = std::fs::read_to_string(&path).map_err(io_error(&path))?;
            files.insert(key, text);
        }
    }
    Ok(())
}

const BOMS: &[&[u8]] = &[b"\xef\xbb\xbf", b"\xff\xfe", b"\xfe\xff"];

/// Read a stored bundle file into bare bundle text.
///
/// Byte order marks are stripped, invalid UTF-8 is dropped, and line breaks
/// and surrounding whitespace are removed.
pub fn read_bundle_file(path: &Path) -> Result<String, CollectError> {
    let raw = std::fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            CollectError::NotFound(path.to_path_buf())
        } else {
            CollectError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let mut bytes = raw.as_slice();
    for bom in BOMS {
        if let Some(rest) = bytes.strip_prefix(*bom) {
            bytes = rest;
        }
    }

    let text: String = String::from_utf8_lossy(bytes)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect();
    Ok(text.trim().replace(['\r', '\n'], ""))
}

/// Pack bundle strings into the JSON array accepted as the extra-bundle list.
pub fn extra_list_json(bundles: &[String]) -> String {
    serde_json::Value::from(bundles.to_vec()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_collect_directory() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("tool");
        fs::create_dir_all(pkg.join("sub")).unwrap();
        fs::write(pkg.join("__init__.py"), "A = 1\n").unwrap();
        fs::write(pkg.join("sub/leaf.py"), "B = 2\n").unwrap();
        fs::write(pkg.join("README.md"), "docs").unwrap();

        let map = collect_package(&pkg, &SourceLayout::default()).unwrap();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["tool/__init__.py", "tool/sub/leaf.py"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_collect_skips_symlinked_directories() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("looped");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("__init__.py"), "").unwrap();
        std::os::unix::fs::symlink(&pkg, pkg.join("again")).unwrap();

        let map = collect_package(&pkg, &SourceLayout::default()).unwrap();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["looped/__init__.py"]);
    }

    #[test]
    fn test_collect_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("helpers.py");
        fs::write(&file, "H = 1\n").unwrap();

        let map = collect_package(&file, &SourceLayout::default()).unwrap();
        assert_eq!(map.get("helpers.py").map(String::as_str), Some("H = 1\n"));
    }

    #[test]
    fn test_collect_errors() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SourceLayout::default();

        let missing = collect_package(&dir.path().join("nope"), &layout);
        assert!(matches!(missing, Err(CollectError::NotFound(_))));

        let other = dir.path().join("notes.txt");
        fs::write(&other, "x").unwrap();
        assert!(matches!(
            collect_package(&other, &layout),
            Err(CollectError::Unsupported(_))
        ));
    }

    #[test]
    fn test_read_bundle_file_cleans_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.txt");
        fs::write(&path, b"\xef\xbb\xbf  H4sIAAAA\r\nBBBB\n").unwrap();

        assert_eq!(read_bundle_file(&path).unwrap(), "H4sIAAAABBBB");
    }

    #[test]
    fn test_extra_list_json_escapes() {
        let json = extra_list_json(&["a\"b".to_string(), "c".to_string()]);
        assert_eq!(json, r#"["a\"b","c"]"#);
    }
}
