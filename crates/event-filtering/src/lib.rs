//! # Event discarders
//!
//! A discarder suppresses further event generation for a given
//! (event kind, subject) pair, where the subject is either a process or a
//! filesystem object (inode + mount). Discarders are installed by the rule
//! evaluation layer when it concludes that a subject can never match any
//! rule; they are a pure kernel-side-style noise filter and carry no
//! security decision of their own.
//!
//! This crate owns the discarder tables and their cleanup:
//!
//! - when a process exits, every pid-keyed discarder it accumulated must
//!   go away, otherwise a recycled pid would inherit the suppression;
//! - when a filesystem object is deleted, the same applies to its
//!   inode-keyed discarders.
//!
//! Cleanup iterates over [`EventKind`], a closed enum, so the loop bound
//! is known at compile time.

mod discarders;

pub use discarders::{DiscarderTable, DEFAULT_DISCARDER_CAPACITY};
