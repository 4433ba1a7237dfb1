//! CLI exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                   |
//! |------|-------------------------------------------|
//! | 0    | Success                                   |
//! | 1    | General error                             |
//! | 2    | Usage error (bad arguments)               |
//! | 3    | Input is not a 6-digit hex color          |
//! | 4    | No signed-in session or no selected sheet |
//! | 5    | Remote sheet API call failed              |
//! | 6    | Local storage could not be written        |

pub const EXIT_SUCCESS: u8 = 0;

pub const EXIT_ERROR: u8 = 1;

pub const EXIT_USAGE: u8 = 2;

pub const EXIT_INVALID_COLOR: u8 = 3;

/// `pick --sync` found no user or no selected sheet in the stored state.
pub const EXIT_NO_SESSION: u8 = 4;

pub const EXIT_API: u8 = 5;

pub const EXIT_STORAGE: u8 = 6;
