use std::num::NonZeroUsize;

use monitor_common::{BoundedLruMap, Pid};
use strix_core::{EventKind, PathKey};
use strum::IntoEnumIterator;

/// Default capacity of each discarder table.
pub const DEFAULT_DISCARDER_CAPACITY: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PidDiscarder {
    kind: EventKind,
    pid: Pid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct InodeDiscarder {
    kind: EventKind,
    key: PathKey,
}

/// Bounded tables of active discarders.
///
/// Both tables are LRU-bounded: a burst of discarders beyond capacity
/// evicts the least-recently-matched ones, which only costs some extra
/// events until the rule layer re-installs them.
pub struct DiscarderTable {
    pids: BoundedLruMap<PidDiscarder, ()>,
    inodes: BoundedLruMap<InodeDiscarder, ()>,
}

impl DiscarderTable {
    pub fn new() -> Self {
        let capacity = NonZeroUsize::new(DEFAULT_DISCARDER_CAPACITY)
            .expect("default discarder capacity is non-zero");
        Self::with_capacity(capacity)
    }

    /// `capacity` bounds each subject space (pid and inode) separately.
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            pids: BoundedLruMap::with_capacity(capacity),
            inodes: BoundedLruMap::with_capacity(capacity),
        }
    }

    pub fn discard_pid(&self, kind: EventKind, pid: Pid) {
        self.pids.insert(PidDiscarder { kind, pid }, ());
    }

    pub fn discard_inode(&self, kind: EventKind, key: PathKey) {
        self.inodes.insert(InodeDiscarder { kind, key }, ());
    }

    /// Whether events of `kind` for `pid` are currently suppressed.
    /// A hit refreshes the discarder's recency.
    pub fn is_pid_discarded(&self, kind: EventKind, pid: Pid) -> bool {
        self.pids.get(&PidDiscarder { kind, pid }).is_some()
    }

    pub fn is_inode_discarded(&self, kind: EventKind, key: PathKey) -> bool {
        self.inodes.get(&InodeDiscarder { kind, key }).is_some()
    }

    pub fn remove_pid_discarder(&self, kind: EventKind, pid: Pid) {
        self.pids.remove(&PidDiscarder { kind, pid });
    }

    pub fn remove_inode_discarder(&self, kind: EventKind, key: PathKey) {
        self.inodes.remove(&InodeDiscarder { kind, key });
    }

    /// Drop every discarder keyed by `pid`, across all event kinds.
    /// Invoked from the process exit path.
    pub fn remove_pid_discarders(&self, pid: Pid) {
        for kind in EventKind::iter() {
            self.remove_pid_discarder(kind, pid);
        }
    }

    /// Drop every discarder keyed by `key`, across all event kinds.
    /// Invoked when the filesystem object is deleted.
    pub fn remove_inode_discarders(&self, key: PathKey) {
        for kind in EventKind::iter() {
            self.remove_inode_discarder(kind, key);
        }
    }
}

impl Default for DiscarderTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PID_1: Pid = Pid::from_raw(100);
    const PID_2: Pid = Pid::from_raw(101);
    const KEY_1: PathKey = PathKey {
        inode: 55,
        mount_id: 3,
    };

    #[test]
    fn discard_and_remove_pid() {
        let table = DiscarderTable::new();
        table.discard_pid(EventKind::Open, PID_1);
        assert!(table.is_pid_discarded(EventKind::Open, PID_1));
        assert!(!table.is_pid_discarded(EventKind::Chmod, PID_1));
        table.remove_pid_discarder(EventKind::Open, PID_1);
        assert!(!table.is_pid_discarded(EventKind::Open, PID_1));
    }

    #[test]
    fn exit_cleanup_clears_every_kind() {
        let table = DiscarderTable::new();
        for kind in EventKind::iter() {
            table.discard_pid(kind, PID_1);
        }
        table.discard_pid(EventKind::Open, PID_2);

        table.remove_pid_discarders(PID_1);

        for kind in EventKind::iter() {
            assert!(!table.is_pid_discarded(kind, PID_1));
        }
        // Other processes keep their discarders.
        assert!(table.is_pid_discarded(EventKind::Open, PID_2));
    }

    #[test]
    fn unlink_cleanup_clears_every_kind() {
        let table = DiscarderTable::new();
        for kind in EventKind::iter() {
            table.discard_inode(kind, KEY_1);
        }
        table.remove_inode_discarders(KEY_1);
        for kind in EventKind::iter() {
            assert!(!table.is_inode_discarded(kind, KEY_1));
        }
    }

    #[test]
    fn bounded_under_pressure() {
        let table = DiscarderTable::with_capacity(NonZeroUsize::new(8).unwrap());
        for pid in 0..1000 {
            table.discard_pid(EventKind::Open, Pid::from_raw(pid));
        }
        // No insert ever failed; old entries were evicted instead.
        assert!(table.is_pid_discarded(EventKind::Open, Pid::from_raw(999)));
    }
}
