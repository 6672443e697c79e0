//! Identity of a process image.
//!
//! A [`ProcessCacheEntry`] describes one exec epoch of a process: the
//! executable that was loaded, the container the process belongs to and
//! when the image was installed. Entries are immutable: a new exec always
//! produces a new entry under a new [`Cookie`], never an in-place update,
//! so shared entries need no synchronization of their own.

use std::fmt;

use monitor_common::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Opaque random handle addressing one slot of the process cache store.
///
/// Cookies are how many processes share one cache entry without holding
/// references to each other: a fork copies the parent's cookie, nothing
/// else. They are random rather than sequential; the 32-bit space makes a
/// collision possible but negligibly likely, and none is ever checked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cookie(u32);

impl Cookie {
    pub fn random() -> Self {
        Cookie(rand::random())
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for Cookie {
    fn from(raw: u32) -> Self {
        Cookie(raw)
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Where an executable lives relative to an overlay filesystem.
///
/// A binary materialized only in the writable upper layer of an overlay is
/// a common filesystem-evasion pattern, so the layer is recorded with the
/// rest of the identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayLayer {
    /// The file is not on an overlay filesystem.
    #[default]
    None,
    Lower,
    Upper,
}

/// Filesystem identity of an executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIdentity {
    pub inode: u64,
    pub mount_id: u32,
    pub overlay: OverlayLayer,
}

/// Key under which the dentry resolver caches a file's full path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathKey {
    pub inode: u64,
    pub mount_id: u32,
}

/// Container identifier as extracted from cgroup metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ContainerId {
    fn from(id: String) -> Self {
        ContainerId(id)
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        ContainerId(id.to_string())
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One process image: what a tgid was running between an exec and the next.
///
/// `container_id` is `None` for host processes and for processes whose
/// container membership could not be determined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessCacheEntry {
    pub executable: FileIdentity,
    pub container_id: Option<ContainerId>,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_display_is_hex() {
        assert_eq!(Cookie::from(0xdead).to_string(), "0x0000dead");
    }

    #[test]
    fn overlay_layer_defaults_to_none() {
        assert_eq!(OverlayLayer::default(), OverlayLayer::None);
    }
}
