mod sender;
pub mod table;
pub mod time;

pub use sender::{EventSender, EventSenderWrapper};
pub use table::BoundedLruMap;

pub use nix::unistd::Pid;
