//! Shared human-readable formatting helpers.

/// Groups a number with thousands separators (`1234567` → `"1,234,567"`).
pub(crate) fn group_thousands(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let mut count = 0;

    for c in s.chars().rev() {
        if count == 3 {
            result.push(',');
            count = 0;
        }
        result.push(c);
        count += 1;
    }

    result.chars().rev().collect()
}

/// Formats a byte rate or count with binary-scaled units.
pub(crate) fn format_bytes(mut bytes: f64) -> String {
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if bytes < 1024.0 {
            return format!("{bytes:.1}{unit}");
        }
        bytes /= 1024.0;
    }
    format!("{bytes:.1}PB")
}

/// Formats a duration in seconds as `12.3s`, `4m 05s`, or `2h 17m`.
pub(crate) fn format_secs(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{seconds:.1}s")
    } else if seconds < 3600.0 {
        let minutes = (seconds / 60.0) as u64;
        let secs = seconds % 60.0;
        format!("{minutes}m {secs:.0}s")
    } else {
        let hours = (seconds / 3600.0) as u64;
        let minutes = ((seconds % 3600.0) / 60.0) as u64;
        format!("{hours}h {minutes}m")
    }
}
