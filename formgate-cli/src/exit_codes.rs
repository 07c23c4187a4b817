//! Process exit codes

/// The submission is valid, or the command succeeded
pub const EXIT_SUCCESS: i32 = 0;
/// The submission was rejected
pub const EXIT_INVALID: i32 = 1;
/// The command could not run: bad input files, configuration or store failure
pub const EXIT_ERROR: i32 = 2;
