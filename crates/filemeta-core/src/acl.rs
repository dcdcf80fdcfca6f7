//! Ownership and access-control records.
//!
//! Two operating-system models share one output shape: POSIX ownership with
//! permission bits, and Windows security descriptors with a discretionary
//! ACL. The ACE decoding tables live here rather than behind `cfg(windows)`
//! so that classification is the same code on every platform.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};

/// How multi-valued ACE fields are rendered in events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AceRendering {
    /// One array element per name.
    #[default]
    Multi,
    /// A single space-joined string.
    Joined,
}

/// Ownership and permission data for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "snake_case")]
pub enum AclRecord {
    /// POSIX owner, group and mode bits.
    Posix(PosixAcl),
    /// Windows owner, primary group and DACL entries.
    Windows(WindowsAcl),
}

/// POSIX ownership data.
///
/// Only the numeric group id is reported; group names are not resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosixAcl {
    /// Owner login name, when the user database has an entry.
    pub owner_name: Option<CompactString>,
    /// Owner user id.
    pub owner_uid: u32,
    /// Group id.
    pub group_gid: u32,
    /// Owner/group/other rwx bits.
    pub permission_mask: u32,
}

impl PosixAcl {
    /// Create POSIX ownership data from raw stat values.
    pub fn new(
        owner_uid: u32,
        owner_name: Option<CompactString>,
        group_gid: u32,
        mode: u32,
    ) -> Self {
        Self {
            owner_name,
            owner_uid,
            group_gid,
            permission_mask: mode & 0o777,
        }
    }

    /// Permission bits in octal, e.g. `"0644"`.
    pub fn permission_octal(&self) -> String {
        format!("{:04o}", self.permission_mask)
    }
}

/// Windows security descriptor data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowsAcl {
    /// Owner as `DOMAIN\name`.
    pub owner: Option<CompactString>,
    /// Owner SID in string form.
    pub owner_sid: String,
    /// Primary group as `DOMAIN\name`.
    pub group: Option<CompactString>,
    /// Primary group SID in string form.
    pub group_sid: String,
    /// DACL entries in descriptor order.
    pub entries: Vec<AceRecord>,
}

/// One access-control entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AceRecord {
    /// Entry type, `None` for types outside the four basic ones.
    pub ace_type: Option<AceType>,
    /// Inheritance and audit flags.
    pub flags: Vec<AceFlag>,
    /// Permissions granted, denied or audited.
    pub permissions: Vec<Permission>,
    /// Trustee SID in string form.
    pub sid: String,
    /// Trustee as `DOMAIN\name`.
    pub account: Option<CompactString>,
}

impl AceRecord {
    /// Decode an entry from its raw header and access mask.
    pub fn decode(
        raw_type: u8,
        raw_flags: u8,
        access_mask: u32,
        target: AceTarget,
        sid: String,
        account: Option<CompactString>,
    ) -> Self {
        let table = permission_table(target, raw_flags);
        Self {
            ace_type: AceType::from_raw(raw_type),
            flags: AceFlag::from_bits(raw_flags),
            permissions: decode_permissions(access_mask, table),
            sid,
            account,
        }
    }

    /// Type name, empty for unknown types.
    pub fn type_names(&self) -> Vec<&'static str> {
        self.ace_type.iter().map(|t| <&'static str>::from(*t)).collect()
    }

    /// Flag names in table order.
    pub fn flag_names(&self) -> Vec<&'static str> {
        self.flags.iter().map(|f| <&'static str>::from(*f)).collect()
    }

    /// Permission names in table order.
    pub fn permission_names(&self) -> Vec<&'static str> {
        self.permissions.iter().map(|p| <&'static str>::from(*p)).collect()
    }
}

/// Basic ACE types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AceType {
    AccessAllowed,
    AccessDenied,
    SystemAudit,
    SystemAlarm,
}

impl AceType {
    /// The `AceType` header value.
    pub fn raw(self) -> u8 {
        match self {
            AceType::AccessAllowed => 0x0,
            AceType::AccessDenied => 0x1,
            AceType::SystemAudit => 0x2,
            AceType::SystemAlarm => 0x3,
        }
    }

    /// Match a header value against the known types.
    pub fn from_raw(raw: u8) -> Option<Self> {
        AceType::iter().find(|t| t.raw() == raw)
    }
}

/// ACE inheritance and audit flags.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AceFlag {
    ObjectInherit,
    ContainerInherit,
    NoPropagateInherit,
    InheritOnly,
    SuccessfulAccess,
    FailedAccess,
}

impl AceFlag {
    /// The flag bit in the `AceFlags` header byte.
    pub fn bit(self) -> u8 {
        match self {
            AceFlag::ObjectInherit => 0x01,
            AceFlag::ContainerInherit => 0x02,
            AceFlag::NoPropagateInherit => 0x04,
            AceFlag::InheritOnly => 0x08,
            AceFlag::SuccessfulAccess => 0x40,
            AceFlag::FailedAccess => 0x80,
        }
    }

    /// All flags set in a header byte.
    pub fn from_bits(bits: u8) -> Vec<Self> {
        AceFlag::iter().filter(|f| bits & f.bit() == f.bit()).collect()
    }
}

/// Named access rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    Delete,
    ReadControl,
    WriteDac,
    WriteOwner,
    Synchronize,
    FileGenericRead,
    FileGenericWrite,
    FileGenericExecute,
    FileDeleteChild,
    FileAddSubdirectory,
    FileAddFile,
    FileListDirectory,
    FileTraverse,
    FileReadAttributes,
    FileWriteAttributes,
    FileReadEa,
    FileWriteEa,
    GenericRead,
    GenericWrite,
    GenericExecute,
    GenericAll,
}

impl Permission {
    /// Access mask bits; composite rights have several bits set.
    pub fn mask(self) -> u32 {
        match self {
            Permission::Delete => 0x0001_0000,
            Permission::ReadControl => 0x0002_0000,
            Permission::WriteDac => 0x0004_0000,
            Permission::WriteOwner => 0x0008_0000,
            Permission::Synchronize => 0x0010_0000,
            Permission::FileGenericRead => 0x0012_0089,
            Permission::FileGenericWrite => 0x0012_0116,
            Permission::FileGenericExecute => 0x0012_00A0,
            Permission::FileDeleteChild => 0x0000_0040,
            Permission::FileAddSubdirectory => 0x0000_0004,
            Permission::FileAddFile => 0x0000_0002,
            Permission::FileListDirectory => 0x0000_0001,
            Permission::FileTraverse => 0x0000_0020,
            Permission::FileReadAttributes => 0x0000_0080,
            Permission::FileWriteAttributes => 0x0000_0100,
            Permission::FileReadEa => 0x0000_0008,
            Permission::FileWriteEa => 0x0000_0010,
            Permission::GenericRead => 0x8000_0000,
            Permission::GenericWrite => 0x4000_0000,
            Permission::GenericExecute => 0x2000_0000,
            Permission::GenericAll => 0x1000_0000,
        }
    }
}

/// Rights reported for entries on files.
pub const FILE_PERMISSIONS: &[Permission] = &[
    Permission::Delete,
    Permission::ReadControl,
    Permission::WriteDac,
    Permission::WriteOwner,
    Permission::Synchronize,
    Permission::FileGenericRead,
    Permission::FileGenericWrite,
    Permission::FileGenericExecute,
    Permission::FileDeleteChild,
];

/// Rights reported for entries that apply to a directory itself.
pub const DIRECTORY_PERMISSIONS: &[Permission] = &[
    Permission::Delete,
    Permission::ReadControl,
    Permission::WriteDac,
    Permission::WriteOwner,
    Permission::Synchronize,
    Permission::FileAddSubdirectory,
    Permission::FileAddFile,
    Permission::FileDeleteChild,
    Permission::FileListDirectory,
    Permission::FileTraverse,
    Permission::FileReadAttributes,
    Permission::FileWriteAttributes,
    Permission::FileReadEa,
    Permission::FileWriteEa,
];

/// Rights reported for directory entries inherited only by child files.
pub const INHERITED_PERMISSIONS: &[Permission] = &[
    Permission::Delete,
    Permission::ReadControl,
    Permission::WriteDac,
    Permission::WriteOwner,
    Permission::Synchronize,
    Permission::GenericRead,
    Permission::GenericWrite,
    Permission::GenericExecute,
    Permission::GenericAll,
];

/// What an ACE is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AceTarget {
    File,
    Directory,
}

/// Select the permission table for an entry.
///
/// A directory entry flagged object-inherit and inherit-only describes
/// rights of the files created inside it, so it uses the generic table.
pub fn permission_table(target: AceTarget, raw_flags: u8) -> &'static [Permission] {
    match target {
        AceTarget::File => FILE_PERMISSIONS,
        AceTarget::Directory => {
            let inherited = AceFlag::ObjectInherit.bit() | AceFlag::InheritOnly.bit();
            if raw_flags & inherited == inherited {
                INHERITED_PERMISSIONS
            } else {
                DIRECTORY_PERMISSIONS
            }
        }
    }
}

/// Permissions from `table` whose bits are all present in `access_mask`.
pub fn decode_permissions(access_mask: u32, table: &[Permission]) -> Vec<Permission> {
    table
        .iter()
        .copied()
        .filter(|p| access_mask & p.mask() == p.mask())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // FILE_ALL_ACCESS as found on a typical owner entry.
    const FILE_ALL_ACCESS: u32 = 0x001F_01FF;

    #[test]
    fn test_posix_permission_octal() {
        let acl = PosixAcl::new(1000, Some("alice".into()), 100, 0o100644);
        assert_eq!(acl.permission_mask, 0o644);
        assert_eq!(acl.permission_octal(), "0644");

        let acl = PosixAcl::new(0, None, 0, 0o40755);
        assert_eq!(acl.permission_octal(), "0755");
    }

    #[test]
    fn test_ace_type_from_raw() {
        assert_eq!(AceType::from_raw(0), Some(AceType::AccessAllowed));
        assert_eq!(AceType::from_raw(1), Some(AceType::AccessDenied));
        assert_eq!(AceType::from_raw(2), Some(AceType::SystemAudit));
        assert_eq!(AceType::from_raw(3), Some(AceType::SystemAlarm));
        assert_eq!(AceType::from_raw(5), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(AceType::AccessAllowed.to_string(), "ACCESS_ALLOWED");
        assert_eq!(AceFlag::NoPropagateInherit.to_string(), "NO_PROPAGATE_INHERIT");
        assert_eq!(Permission::FileGenericRead.to_string(), "FILE_GENERIC_READ");
        assert_eq!(Permission::FileReadEa.to_string(), "FILE_READ_EA");
        assert_eq!(Permission::WriteDac.to_string(), "WRITE_DAC");
    }

    #[test]
    fn test_flags_from_bits() {
        assert!(AceFlag::from_bits(0).is_empty());
        assert_eq!(
            AceFlag::from_bits(0x0B),
            vec![AceFlag::ObjectInherit, AceFlag::ContainerInherit, AceFlag::InheritOnly]
        );
        assert_eq!(
            AceFlag::from_bits(0xC0),
            vec![AceFlag::SuccessfulAccess, AceFlag::FailedAccess]
        );
    }

    #[test]
    fn test_permission_table_selection() {
        assert_eq!(permission_table(AceTarget::File, 0x09), FILE_PERMISSIONS);
        assert_eq!(permission_table(AceTarget::Directory, 0x00), DIRECTORY_PERMISSIONS);
        assert_eq!(permission_table(AceTarget::Directory, 0x01), DIRECTORY_PERMISSIONS);
        assert_eq!(permission_table(AceTarget::Directory, 0x08), DIRECTORY_PERMISSIONS);
        assert_eq!(permission_table(AceTarget::Directory, 0x09), INHERITED_PERMISSIONS);
        assert_eq!(permission_table(AceTarget::Directory, 0x0B), INHERITED_PERMISSIONS);
    }

    #[test]
    fn test_composite_rights_need_all_bits() {
        // FILE_GENERIC_READ minus SYNCHRONIZE is not FILE_GENERIC_READ.
        let perms = decode_permissions(0x0002_0089, FILE_PERMISSIONS);
        assert_eq!(perms, vec![Permission::ReadControl]);

        let perms = decode_permissions(0x0012_0089, FILE_PERMISSIONS);
        assert!(perms.contains(&Permission::FileGenericRead));
        assert!(!perms.contains(&Permission::FileGenericWrite));
    }

    #[test]
    fn test_decode_full_control_file_entry() {
        let ace = AceRecord::decode(
            0,
            0,
            FILE_ALL_ACCESS,
            AceTarget::File,
            "S-1-5-18".into(),
            Some("NT AUTHORITY\\SYSTEM".into()),
        );
        assert_eq!(ace.type_names(), vec!["ACCESS_ALLOWED"]);
        assert!(ace.flag_names().is_empty());
        let expected: Vec<&str> = FILE_PERMISSIONS.iter().map(|p| <&str>::from(*p)).collect();
        assert_eq!(ace.permission_names(), expected);
    }

    #[test]
    fn test_decode_inherit_only_directory_entry() {
        let ace = AceRecord::decode(
            1,
            0x09,
            Permission::GenericRead.mask() | Permission::Delete.mask(),
            AceTarget::Directory,
            "S-1-5-32-545".into(),
            None,
        );
        assert_eq!(ace.ace_type, Some(AceType::AccessDenied));
        assert_eq!(ace.flags, vec![AceFlag::ObjectInherit, AceFlag::InheritOnly]);
        assert_eq!(ace.permissions, vec![Permission::Delete, Permission::GenericRead]);
    }

    #[test]
    fn test_unknown_type_keeps_entry() {
        let ace = AceRecord::decode(0x11, 0, 0, AceTarget::File, "S-1-1-0".into(), None);
        assert!(ace.ace_type.is_none());
        assert!(ace.type_names().is_empty());
        assert!(ace.permissions.is_empty());
    }
}
