//! # Process-lifecycle attribution
//!
//! This module tracks every process from creation (exec) through
//! replication (fork) to termination (exit) and emits lifecycle events so
//! the collector can reconstruct process trees and attribute activity to
//! containers.
//!
//! # General design
//!
//! Process identity is held in two bounded tables:
//!
//! **`proc_cache: Cookie -> ProcessCacheEntry`**
//! - One entry per process image (one exec epoch of a tgid).
//! - Entries are immutable after creation and shared by key: a new exec
//!   inserts a new entry under a new cookie instead of mutating anything.
//! - Never explicitly deleted. A full table evicts its least-recently-used
//!   entry, which is the only reclamation path.
//!
//! **`pid_cookie: tgid -> Cookie`**
//! - The indirection that makes fork cheap: duplicating a process copies
//!   one cookie into the child's slot, so parent and child resolve to the
//!   exact same cache entry without copies or reference counts.
//! - Overwritten on every exec; at most one live cookie per tgid.
//!
//! Handlers run concurrently from every event source. Single-key table
//! operations are atomic; multi-key sequences are deliberately not
//! transactional. An exec interleaved with a fork on the same tgid can
//! observe a stale cookie, and every consumer treats the resulting miss
//! as "no cached information available" rather than an error.

pub mod config;
mod syscalls;

use std::sync::Arc;

use event_filtering::DiscarderTable;
use monitor_common::{time::Timestamp, BoundedLruMap, EventSender, Pid};
use strix_core::{ContainerId, Cookie, FileIdentity, LifecycleEvent, PathKey, ProcessCacheEntry};

pub use crate::config::{Config, ConfigError};
use crate::{
    config::capacity,
    syscalls::{PendingSyscall, SyscallSlots},
};

/// Access to the dentry layer for a file observed at exec time.
///
/// `File` is whatever handle the embedding probe layer passes around;
/// the engine only ever asks the resolver questions about it.
pub trait DentryResolver: Send + Sync {
    type File;

    /// Filesystem identity of the file: inode, mount and overlay layer.
    fn identity(&self, file: &Self::File) -> FileIdentity;

    /// Key under which the file's full path can be cached and looked up.
    fn path_key(&self, file: &Self::File) -> PathKey;

    /// Ask the resolver to cache the file's full path under `key` for
    /// later consumers. Fire and forget.
    fn cache_path(&self, file: &Self::File, key: PathKey);
}

/// Source of the container identifier for a process, backed by cgroup
/// metadata. Returns `None` for processes that are not in a container or
/// whose membership cannot be determined.
pub trait ContainerIdSource: Send + Sync {
    fn container_id(&self, pid: Pid) -> Option<ContainerId>;
}

/// [`ContainerIdSource`] for hosts without a container runtime.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoContainers;

impl ContainerIdSource for NoContainers {
    fn container_id(&self, _pid: Pid) -> Option<ContainerId> {
        None
    }
}

/// The attribution engine. Shared via [`Arc`] across event sources; every
/// handler takes `&self` and completes in a bounded number of steps.
pub struct ProcessMonitor<R, C, S> {
    proc_cache: BoundedLruMap<Cookie, ProcessCacheEntry>,
    pid_cookie: BoundedLruMap<Pid, Cookie>,
    syscalls: SyscallSlots,
    resolver: R,
    containers: C,
    discarders: Arc<DiscarderTable>,
    sender: S,
}

impl<R, C, S> ProcessMonitor<R, C, S>
where
    R: DentryResolver,
    C: ContainerIdSource,
    S: EventSender<LifecycleEvent>,
{
    pub fn new(
        config: &Config,
        resolver: R,
        containers: C,
        discarders: Arc<DiscarderTable>,
        sender: S,
    ) -> Result<Self, ConfigError> {
        let shards = capacity(config.lock_shards, "lock_shards")?;
        Ok(Self {
            proc_cache: BoundedLruMap::with_capacity_and_shards(
                capacity(config.proc_cache_capacity, "proc_cache_capacity")?,
                shards,
            ),
            pid_cookie: BoundedLruMap::with_capacity_and_shards(
                capacity(config.pid_cookie_capacity, "pid_cookie_capacity")?,
                shards,
            ),
            syscalls: SyscallSlots::new(capacity(config.syscall_slots, "syscall_slots")?),
            resolver,
            containers,
            discarders,
            sender,
        })
    }

    /// Record that an exec-family syscall is in flight on thread `tid`.
    ///
    /// Nothing else is knowable yet: the replacing executable's identity
    /// only becomes observable when the kernel path opens the file, so the
    /// rest of the work is deferred to [`Self::on_exec_file_open`].
    pub fn on_exec_enter(&self, tid: Pid) {
        self.syscalls.cache(tid, PendingSyscall::Exec);
    }

    /// Complete a pending exec at the point the replacing executable is
    /// opened. Opens on threads with no exec in flight are ignored.
    pub fn on_exec_file_open(&self, tid: Pid, tgid: Pid, file: &R::File) {
        if !self.syscalls.pending(tid, PendingSyscall::Exec) {
            return;
        }

        let executable = self.resolver.identity(file);
        let path_key = self.resolver.path_key(file);

        // The same tgid's previous image, if still cached. Exec replaces
        // the image in place, so container membership carries over; for a
        // process we have never tracked, fall back to the cgroup-backed
        // source. Neither being available is a normal miss and the entry
        // is simply left unattributed.
        let container_id = match self.process_entry(tgid) {
            Some(previous) => previous.container_id,
            None => self.containers.container_id(tgid),
        };

        let entry = ProcessCacheEntry {
            executable,
            container_id,
            created_at: Timestamp::now(),
        };

        // Insert the new image under a fresh cookie, then point the tgid
        // at it. The previous entry is left in place: fork children may
        // still resolve to it, and unreferenced entries are reclaimed by
        // eviction alone.
        let cookie = Cookie::random();
        self.proc_cache.insert(cookie, entry.clone());
        self.pid_cookie.insert(tgid, cookie);

        // Prime the path cache so the collector can resolve the image path.
        self.resolver.cache_path(file, path_key);

        self.sender.send(LifecycleEvent::Exec {
            pid: tgid.as_raw(),
            entry,
        });

        // Fully handled here; a later completion point must not see it.
        self.syscalls.pop(tid, PendingSyscall::Exec);
    }

    /// Alias a fork child to its parent's cache entry.
    ///
    /// Only the index is touched: the child's slot receives a copy of the
    /// parent's cookie and both now resolve to the same entry. An
    /// untracked parent (never exec-tracked, or evicted) leaves the child
    /// unindexed, and later lookups for it are a defined miss.
    pub fn on_fork(&self, ppid: Pid, pid: Pid) {
        match self.pid_cookie.get(&ppid) {
            Some(cookie) => self.pid_cookie.insert(pid, cookie),
            None => log::trace!("fork {ppid} -> {pid}: parent has no cookie"),
        }
    }

    /// Handle the termination of one task.
    ///
    /// Only the thread-group leader (`tid == tgid`) yields an EXIT record,
    /// collapsing per-thread termination noise into a single process-exit
    /// signal, and exactly one such record is emitted per process. The
    /// exiting process's discarders are removed across every event kind.
    ///
    /// Neither table is cleaned here: still-running children may share the
    /// cookie, and entries expire by eviction.
    pub fn on_exit(&self, tid: Pid, tgid: Pid) {
        if tid != tgid {
            return;
        }
        self.sender.send(LifecycleEvent::Exit {
            pid: tgid.as_raw(),
        });
        self.discarders.remove_pid_discarders(tgid);
    }

    /// A filesystem object was deleted; drop the discarders keyed by it.
    pub fn on_file_unlinked(&self, key: PathKey) {
        self.discarders.remove_inode_discarders(key);
    }

    /// Cookie currently representing `tgid`, if any.
    pub fn cookie(&self, tgid: Pid) -> Option<Cookie> {
        self.pid_cookie.get(&tgid)
    }

    /// Entry stored under `cookie`, unless it has been evicted.
    pub fn entry(&self, cookie: Cookie) -> Option<ProcessCacheEntry> {
        self.proc_cache.get(&cookie)
    }

    /// Entry currently describing `tgid`'s image. Used by sibling probes
    /// to attribute their own events to a container.
    pub fn process_entry(&self, tgid: Pid) -> Option<ProcessCacheEntry> {
        self.pid_cookie
            .get(&tgid)
            .and_then(|cookie| self.proc_cache.get(&cookie))
    }
}
