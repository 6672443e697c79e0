//! Lifecycle events shipped to the user-space collector, which replays
//! them to rebuild process trees and attribute activity to containers.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::EnumIter;

use crate::process::ProcessCacheEntry;

/// Every kind of event the monitor can generate.
///
/// This set is closed on purpose: cleanup paths iterate over all kinds
/// with a statically bounded loop, so the kinds must be known at compile
/// time. Extend the enum, never replace it with a runtime collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Exec,
    Exit,
    Open,
    Chmod,
    Chown,
    Mkdir,
    Rmdir,
    Rename,
    Unlink,
    Link,
    Utimes,
    SetXattr,
    Mount,
    Umount,
}

/// A process-lifecycle record.
///
/// `Exec` carries the full cache entry so the collector can maintain its
/// own copy of the process cache without ever reading the kernel-side
/// tables back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum LifecycleEvent {
    Exec {
        pid: i32,
        entry: ProcessCacheEntry,
    },
    Exit {
        pid: i32,
    },
}

impl LifecycleEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LifecycleEvent::Exec { .. } => EventKind::Exec,
            LifecycleEvent::Exit { .. } => EventKind::Exit,
        }
    }

    pub fn pid(&self) -> i32 {
        match self {
            LifecycleEvent::Exec { pid, .. } | LifecycleEvent::Exit { pid } => *pid,
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Exec { pid, entry } => {
                write!(
                    f,
                    "EXEC pid={pid} inode={} mount={} container={}",
                    entry.executable.inode,
                    entry.executable.mount_id,
                    entry
                        .container_id
                        .as_ref()
                        .map(|id| id.as_str())
                        .unwrap_or("-"),
                )
            }
            LifecycleEvent::Exit { pid } => write!(f, "EXIT pid={pid}"),
        }
    }
}
