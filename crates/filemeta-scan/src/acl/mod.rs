//! Platform ownership and ACL providers.
//!
//! The provider is chosen once per scanner from the platform the binary
//! was built for. Platforms with no provider simply produce records
//! without ACL data.

use std::fs::Metadata;
use std::path::Path;

use filemeta_core::{AclRecord, ScanError};

#[cfg(unix)]
mod posix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use self::posix::PosixAclProvider;
#[cfg(windows)]
pub use self::windows::WindowsAclProvider;

/// ACL capability of the running platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AclPlatform {
    /// Owner, group and mode bits from stat.
    Posix,
    /// Security descriptors with a discretionary ACL.
    Windows,
    /// No ACL support.
    Unsupported,
}

impl AclPlatform {
    /// Detect the platform capability.
    pub fn detect() -> Self {
        if cfg!(windows) {
            AclPlatform::Windows
        } else if cfg!(unix) {
            AclPlatform::Posix
        } else {
            AclPlatform::Unsupported
        }
    }

    /// Build the provider for this platform, if there is one.
    pub fn provider(self) -> Option<Box<dyn AclProvider>> {
        match self {
            #[cfg(unix)]
            AclPlatform::Posix => Some(Box::new(PosixAclProvider::new())),
            #[cfg(windows)]
            AclPlatform::Windows => Some(Box::new(WindowsAclProvider::new())),
            _ => None,
        }
    }
}

/// Reads ownership and access-control data for one path.
pub trait AclProvider: Send + Sync {
    /// The platform this provider reads.
    fn platform(&self) -> AclPlatform;

    /// Read ACL data. `metadata` has already been read with links followed.
    fn read_acl(&self, path: &Path, metadata: &Metadata) -> Result<AclRecord, ScanError>;
}

/// Provider for the running platform.
pub fn detect_provider() -> Option<Box<dyn AclProvider>> {
    AclPlatform::detect().provider()
}
