//! Create-or-overwrite of a managed file: truncate, set mode, write content.
//!
//! The steps run in a fixed order and stop at the first failure. There is no
//! rollback: a failed content write leaves the target truncated.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::core::errors::{IoOp, Result, StickyError};
use crate::model::file::ManagedFile;
use crate::plan::validator::validate_octal;

/// Write `file` to disk, replacing whatever is at `file.path`.
pub fn write_file(file: &ManagedFile) -> Result<()> {
    let path = Path::new(&file.path);

    let mut handle = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| StickyError::io(IoOp::Create, path, e))?;

    let mode = validate_octal(&file.permissions).map_err(|e| {
        StickyError::io(
            IoOp::ParsePermissions,
            path,
            io::Error::new(io::ErrorKind::InvalidInput, e.to_string()),
        )
    })?;

    // The open above honours the umask; setting the mode explicitly makes the
    // final bits exact.
    set_mode(&handle, mode).map_err(|e| StickyError::io(IoOp::Chmod, path, e))?;

    handle
        .write_all(file.content.as_bytes())
        .and_then(|()| handle.flush())
        .map_err(|e| StickyError::io(IoOp::WriteContent, path, e))?;

    Ok(())
}

#[cfg(unix)]
fn set_mode(handle: &File, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt as _;
    handle.set_permissions(std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(handle: &File, mode: u32) -> io::Result<()> {
    // Only the owner-write bit maps onto a non-unix permission model.
    let mut perms = handle.metadata()?.permissions();
    perms.set_readonly(mode & 0o200 == 0);
    handle.set_permissions(perms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn record(path: &Path, content: &str, perms: &str) -> ManagedFile {
        ManagedFile::new(path.to_string_lossy(), content, perms)
    }

    #[test]
    fn creates_file_with_exact_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_file(&record(&path, "line one\nline two\n", "0644")).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "line one\nline two\n");
    }

    #[test]
    fn overwrite_truncates_longer_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "a much longer previous body").unwrap();
        write_file(&record(&path, "short", "0644")).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "short");
    }

    #[test]
    fn empty_content_yields_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        write_file(&record(&path, "", "0600")).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn missing_parent_directory_is_create_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("out.txt");
        let err = write_file(&record(&path, "x", "0644")).unwrap_err();
        assert!(matches!(err, StickyError::Io { op: IoOp::Create, .. }), "{err}");
    }

    #[test]
    fn bad_permissions_fail_after_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "previous").unwrap();

        let err = write_file(&record(&path, "new", "99")).unwrap_err();
        assert!(
            matches!(err, StickyError::Io { op: IoOp::ParsePermissions, .. }),
            "{err}"
        );
        // No rollback: the file was already truncated.
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    #[cfg(unix)]
    fn mode_bits_are_exact_regardless_of_umask() {
        use std::os::unix::fs::PermissionsExt as _;

        let dir = tempfile::tempdir().unwrap();
        for (perms, expected) in [("0640", 0o640), ("0666", 0o666), ("755", 0o755)] {
            let path = dir.path().join(format!("mode-{perms}.txt"));
            write_file(&record(&path, "x", perms)).unwrap();
            let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, expected, "perms {perms}");
        }
    }

    #[test]
    #[cfg(unix)]
    fn rewrite_changes_mode_of_existing_file() {
        use std::os::unix::fs::PermissionsExt as _;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_file(&record(&path, "x", "0644")).unwrap();
        write_file(&record(&path, "x", "0600")).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    #[cfg(unix)]
    fn chmod_on_a_file_owned_by_someone_else_is_chmod_error() {
        use std::os::unix::fs::MetadataExt as _;

        // Root may chmod anything; the failure only shows up for other users.
        let dir = tempfile::tempdir().unwrap();
        let own_uid = fs::metadata(dir.path()).unwrap().uid();
        let target = Path::new("/dev/null");
        let Ok(meta) = fs::metadata(target) else {
            return;
        };
        if own_uid == 0 || meta.uid() == own_uid {
            return;
        }

        let err = write_file(&record(target, "", "0666")).unwrap_err();
        assert!(matches!(err, StickyError::Io { op: IoOp::Chmod, .. }), "{err}");
    }
}
