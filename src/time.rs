//! Process-relative clock.
//!
//! [`now_seconds`] is seconds elapsed since the first call into this module
//! (not since the Unix epoch); [`now_mjd`] is the Modified Julian Date of
//! "now", computed by anchoring a wall-clock reading to that same
//! first-call instant so the two stay consistent with one another. Both
//! are monotonic for the lifetime of the process because they ride on
//! [`Instant`], whereas a raw `SystemTime::now()` could jump backward under
//! NTP correction.
use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Julian Date of the Unix epoch (1970-01-01T00:00:00Z) minus the MJD
/// epoch offset (`2440587.5 - 2400000.5`).
const UNIX_EPOCH_AS_MJD: f64 = 40587.0;

struct Epoch {
    instant: Instant,
    mjd: f64,
}

static EPOCH: OnceLock<Epoch> = OnceLock::new();

fn epoch() -> &'static Epoch {
    EPOCH.get_or_init(|| {
        let instant = Instant::now();
        let unix_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let mjd = unix_now.as_secs_f64() / 86_400.0 + UNIX_EPOCH_AS_MJD;
        Epoch { instant, mjd }
    })
}

/// Seconds elapsed since the first call to [`now_seconds`] or [`now_mjd`]
/// anywhere in this process. Monotonic; unaffected by system clock changes.
pub fn now_seconds() -> f64 {
    epoch().instant.elapsed().as_secs_f64()
}

/// Current date and time as a Modified Julian Date, derived from the wall
/// clock reading taken at first call plus elapsed monotonic time since
/// then. Absolute accuracy depends on the system clock at that first call;
/// subsequent drift in the system clock does not affect this value.
pub fn now_mjd() -> f64 {
    let e = epoch();
    e.instant.elapsed().as_secs_f64() / 86_400.0 + e.mjd
}
