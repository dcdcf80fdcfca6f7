use std::ffi::c_void;
use std::fs::Metadata;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;

use compact_str::{CompactString, format_compact};
use ::windows::Win32::Foundation::{HLOCAL, LocalFree};
use ::windows::Win32::Security::Authorization::{
    ConvertSidToStringSidW, GetNamedSecurityInfoW, SE_FILE_OBJECT,
};
use ::windows::Win32::Security::{
    ACCESS_ALLOWED_ACE, ACE_HEADER, ACL, DACL_SECURITY_INFORMATION, GROUP_SECURITY_INFORMATION,
    GetAce, LookupAccountSidW, OWNER_SECURITY_INFORMATION, PSECURITY_DESCRIPTOR, PSID,
    SID_NAME_USE,
};
use ::windows::core::{PCWSTR, PWSTR};

use filemeta_core::{AceRecord, AceTarget, AclRecord, ScanError, WindowsAcl};

use super::{AclPlatform, AclProvider};

/// Owner, primary group and DACL entries from the file's security
/// descriptor.
#[derive(Debug, Default)]
pub struct WindowsAclProvider;

impl WindowsAclProvider {
    pub fn new() -> Self {
        Self
    }
}

impl AclProvider for WindowsAclProvider {
    fn platform(&self) -> AclPlatform {
        AclPlatform::Windows
    }

    fn read_acl(&self, path: &Path, metadata: &Metadata) -> Result<AclRecord, ScanError> {
        let target = if metadata.is_dir() {
            AceTarget::Directory
        } else {
            AceTarget::File
        };
        read_security_descriptor(path, target).map(AclRecord::Windows)
    }
}

/// Frees a buffer returned by the security APIs.
struct LocalGuard(*mut c_void);

impl Drop for LocalGuard {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe {
                let _ = LocalFree(Some(HLOCAL(self.0)));
            }
        }
    }
}

fn read_security_descriptor(path: &Path, target: AceTarget) -> Result<WindowsAcl, ScanError> {
    let wide: Vec<u16> = path.as_os_str().encode_wide().chain(Some(0u16)).collect();
    let acl_err = |message: String| ScanError::Acl {
        path: path.to_path_buf(),
        message,
    };

    let mut owner_sid = PSID::default();
    let mut group_sid = PSID::default();
    let mut dacl: *mut ACL = std::ptr::null_mut();
    let mut descriptor = PSECURITY_DESCRIPTOR::default();

    let status = unsafe {
        GetNamedSecurityInfoW(
            PCWSTR(wide.as_ptr()),
            SE_FILE_OBJECT,
            OWNER_SECURITY_INFORMATION | GROUP_SECURITY_INFORMATION | DACL_SECURITY_INFORMATION,
            Some(&mut owner_sid),
            Some(&mut group_sid),
            Some(&mut dacl),
            None,
            &mut descriptor,
        )
    };
    if status.0 != 0 {
        return Err(acl_err(format!(
            "GetNamedSecurityInfoW failed with error {}",
            status.0
        )));
    }
    // The SIDs and the DACL point into the descriptor.
    let _descriptor = LocalGuard(descriptor.0);

    let owner_sid_string = sid_to_string(owner_sid).map_err(&acl_err)?;
    let group_sid_string = sid_to_string(group_sid).map_err(&acl_err)?;

    let mut entries = Vec::new();
    if !dacl.is_null() {
        let count = unsafe { (*dacl).AceCount };
        for index in 0..u32::from(count) {
            let mut ace: *mut c_void = std::ptr::null_mut();
            unsafe { GetAce(dacl, index, &mut ace) }
                .map_err(|e| acl_err(format!("GetAce({index}) failed: {e}")))?;

            // Every basic ACE shares the ACCESS_ALLOWED_ACE layout.
            let header = unsafe { &*(ace as *const ACE_HEADER) };
            let allowed = unsafe { &*(ace as *const ACCESS_ALLOWED_ACE) };
            let sid = PSID(std::ptr::addr_of!(allowed.SidStart) as *mut c_void);

            let sid_string = sid_to_string(sid).map_err(&acl_err)?;
            entries.push(AceRecord::decode(
                header.AceType,
                header.AceFlags,
                allowed.Mask,
                target,
                sid_string,
                lookup_account(sid),
            ));
        }
    }

    Ok(WindowsAcl {
        owner: lookup_account(owner_sid),
        owner_sid: owner_sid_string,
        group: lookup_account(group_sid),
        group_sid: group_sid_string,
        entries,
    })
}

fn sid_to_string(sid: PSID) -> Result<String, String> {
    let mut raw = PWSTR::null();
    unsafe { ConvertSidToStringSidW(sid, &mut raw) }
        .map_err(|e| format!("ConvertSidToStringSidW failed: {e}"))?;
    let _guard = LocalGuard(raw.0 as *mut c_void);
    unsafe { raw.to_string() }.map_err(|e| format!("SID is not valid UTF-16: {e}"))
}

/// Resolve a SID to `DOMAIN\name`. `None` for orphaned SIDs.
fn lookup_account(sid: PSID) -> Option<CompactString> {
    let mut name_len = 0u32;
    let mut domain_len = 0u32;
    let mut use_kind = SID_NAME_USE::default();

    // First call only reports the buffer sizes.
    let _ = unsafe {
        LookupAccountSidW(
            PCWSTR::null(),
            sid,
            None,
            &mut name_len,
            None,
            &mut domain_len,
            &mut use_kind,
        )
    };
    if name_len == 0 {
        return None;
    }

    let mut name = vec![0u16; name_len as usize];
    let mut domain = vec![0u16; domain_len.max(1) as usize];
    unsafe {
        LookupAccountSidW(
            PCWSTR::null(),
            sid,
            Some(PWSTR(name.as_mut_ptr())),
            &mut name_len,
            Some(PWSTR(domain.as_mut_ptr())),
            &mut domain_len,
            &mut use_kind,
        )
    }
    .ok()?;

    let name = String::from_utf16_lossy(&name[..name_len as usize]);
    let domain = String::from_utf16_lossy(&domain[..domain_len as usize]);
    if domain.is_empty() {
        Some(CompactString::from(name))
    } else {
        Some(format_compact!("{domain}\\{name}"))
    }
}
