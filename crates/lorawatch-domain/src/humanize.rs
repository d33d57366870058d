const UNITS: [(i64, &str); 5] = [
    (604_800, "week"),
    (86_400, "day"),
    (3_600, "hour"),
    (60, "minute"),
    (1, "second"),
];

const MAX_PARTS: usize = 4;

/// Human-relative phrase for an elapsed duration, e.g.
/// "2 hours 46 minutes 40 seconds ago". At most four units are used.
pub fn ago(diff_secs: i64) -> String {
    if diff_secs <= 0 {
        return "just now".to_string();
    }

    let mut remaining = diff_secs;
    let mut parts = Vec::new();
    for (unit_secs, unit_name) in UNITS {
        if parts.len() == MAX_PARTS {
            break;
        }
        let count = remaining / unit_secs;
        if count > 0 {
            remaining -= count * unit_secs;
            let plural = if count == 1 { "" } else { "s" };
            parts.push(format!("{count} {unit_name}{plural}"));
        }
    }

    format!("{} ago", parts.join(" "))
}
