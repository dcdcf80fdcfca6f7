use std::ffi::CStr;
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use compact_str::CompactString;
use filemeta_core::{AclRecord, PosixAcl, ScanError};

use super::{AclPlatform, AclProvider};

/// Upper bound for the passwd lookup buffer.
const MAX_PASSWD_BUFFER: usize = 1 << 20;

/// Ownership and mode bits from stat, with the owner name resolved from
/// the user database.
#[derive(Debug, Default)]
pub struct PosixAclProvider;

impl PosixAclProvider {
    pub fn new() -> Self {
        Self
    }
}

impl AclProvider for PosixAclProvider {
    fn platform(&self) -> AclPlatform {
        AclPlatform::Posix
    }

    fn read_acl(&self, _path: &Path, metadata: &Metadata) -> Result<AclRecord, ScanError> {
        let uid = metadata.uid();
        Ok(AclRecord::Posix(PosixAcl::new(
            uid,
            lookup_user_name(uid),
            metadata.gid(),
            metadata.mode(),
        )))
    }
}

/// Resolve a uid to a login name. `None` when the database has no entry.
fn lookup_user_name(uid: u32) -> Option<CompactString> {
    let mut buf: Vec<libc::c_char> = vec![0; 1024];

    loop {
        // SAFETY: `passwd` is plain data and is only read after a successful
        // lookup has filled it; its string fields point into `buf`.
        let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
        let mut result: *mut libc::passwd = std::ptr::null_mut();
        let rc = unsafe {
            libc::getpwuid_r(uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result)
        };

        if rc == libc::ERANGE && buf.len() < MAX_PASSWD_BUFFER {
            let len = buf.len() * 2;
            buf.resize(len, 0);
            continue;
        }
        if rc != 0 || result.is_null() || pwd.pw_name.is_null() {
            return None;
        }

        let name = unsafe { CStr::from_ptr(pwd.pw_name) };
        return Some(CompactString::new(name.to_string_lossy()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn test_reads_mode_and_owner() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        fs::write(&path, "data").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        let metadata = fs::metadata(&path).unwrap();
        let record = PosixAclProvider::new().read_acl(&path, &metadata).unwrap();

        let AclRecord::Posix(acl) = record else {
            panic!("expected POSIX ACL data");
        };
        assert_eq!(acl.permission_octal(), "0640");
        assert_eq!(acl.owner_uid, metadata.uid());
        assert_eq!(acl.group_gid, metadata.gid());
    }

    #[test]
    fn test_root_user_resolves() {
        assert_eq!(lookup_user_name(0).as_deref(), Some("root"));
    }

    #[test]
    fn test_unknown_uid_has_no_name() {
        assert!(lookup_user_name(u32::MAX - 7).is_none());
    }
}
