pub mod init;
pub mod watch;

/// Exit code for configuration and usage errors.
pub const USAGE_ERROR: u8 = 3;
