// Daily operating-hours gate

use crate::config::ConversionSettings;
use chrono::{Local, NaiveTime};

/// Whether processing is permitted at `now` for the configured daily
/// window. Windows where `start > end` cross midnight: 22:00–06:00
/// allows late evening and early morning. Local wall clock only.
pub fn allowed(now: NaiveTime, start: NaiveTime, end: NaiveTime, no_restriction: bool) -> bool {
    if no_restriction {
        return true;
    }
    if start <= end {
        start <= now && now <= end
    } else {
        now >= start || now <= end
    }
}

/// Gate check against the current wall clock for a settings snapshot.
pub fn allowed_now(settings: &ConversionSettings) -> bool {
    allowed(
        Local::now().time(),
        settings.window_start,
        settings.window_end,
        settings.no_time_restrictions,
    )
}

