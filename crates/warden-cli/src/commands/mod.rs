//! Command implementations.

pub mod flush;
pub mod watch;

pub use self::flush::execute_flush;
pub use self::watch::execute_watch;
