//! Process exit codes.

pub const SUCCESS: u8 = 0;
pub const GENERAL_ERROR: u8 = 1;
pub const INVALID_ARGUMENT: u8 = 2;
pub const NOT_FOUND: u8 = 3;
pub const PERMISSION_DENIED: u8 = 4;
pub const ALREADY_EXISTS: u8 = 5;
pub const NOT_EMPTY: u8 = 6;
pub const UNSUPPORTED: u8 = 7;
