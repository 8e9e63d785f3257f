//! Locating the test tree of the library under test.
use std::path::{Path, PathBuf};

use refgen_core::internal::*;

pub const TEST_DIR_ENV: &str = "REFGEN_TEST_DIR";

/// The nearest ancestor of `start` holding a `test/gen` directory, as the
/// path of its `test` directory.
pub fn find_test_dir_from(start: &Path) -> Option<PathBuf> {
    start.ancestors().map(|dir| dir.join("test")).find(|test| test.join("gen").is_dir())
}

/// Explicit path first, then `REFGEN_TEST_DIR`, then a lookup from the
/// working directory.
pub fn discover_test_dir(explicit: Option<&Path>) -> RefResult<PathBuf> {
    if let Some(dir) = explicit {
        ensure!(dir.is_dir(), "Test directory {} does not exist", dir.display());
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = std::env::var_os(TEST_DIR_ENV) {
        let dir = PathBuf::from(dir);
        ensure!(dir.is_dir(), "{} points to {}, not a directory", TEST_DIR_ENV, dir.display());
        return Ok(dir);
    }
    let cwd = std::env::current_dir()?;
    let found = find_test_dir_from(&cwd).with_context(|| {
        format!(
            "No test/gen directory above {}, use --test-dir or {}",
            cwd.display(),
            TEST_DIR_ENV
        )
    })?;
    debug!("Found test directory {}", found.display());
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_enclosing_tree() {
        let root = tempfile::tempdir().unwrap();
        fs_err::create_dir_all(root.path().join("test/gen")).unwrap();
        fs_err::create_dir_all(root.path().join("src/pooling")).unwrap();
        let expected = root.path().join("test");
        assert_eq!(find_test_dir_from(&root.path().join("src/pooling")), Some(expected.clone()));
        assert_eq!(find_test_dir_from(&root.path().join("test/gen")), Some(expected.clone()));
        assert_eq!(find_test_dir_from(root.path()), Some(expected));
    }

    #[test]
    fn nothing_to_find() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(find_test_dir_from(root.path()), None);
    }

    #[test]
    fn explicit_dir_wins() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(discover_test_dir(Some(root.path())).unwrap(), root.path());
        assert!(discover_test_dir(Some(&root.path().join("missing"))).is_err());
    }
}
