//! Parsers for `/proc` and `/etc` text files

use std::sync::LazyLock;

use regex::Regex;

use crate::MemoryReading;

static DISTRIB_DESCRIPTION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?m)^DISTRIB_DESCRIPTION=['"]?([^'"\n]*)['"]?\s*$"#).ok()
});

/// Parse `/proc/meminfo`; missing fields stay 0
pub fn parse_meminfo(content: &str) -> MemoryReading {
    let mut reading = MemoryReading::default();

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(value) = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
        else {
            continue;
        };

        match key.trim() {
            "MemTotal" => reading.total_kb = value,
            "MemFree" => reading.free_kb = value,
            "MemAvailable" => reading.available_kb = value,
            "Buffers" => reading.buffers_kb = value,
            "Cached" => reading.cached_kb = value,
            _ => {}
        }
    }

    reading
}

/// First field of `/proc/uptime`
pub fn parse_uptime(content: &str) -> Option<f64> {
    content.split_whitespace().next()?.parse().ok()
}

/// Human readable form of an uptime in seconds, e.g. `3d 4h 12m`
pub fn format_uptime(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// `DISTRIB_DESCRIPTION` from `/etc/openwrt_release`
pub fn parse_release_description(content: &str) -> Option<String> {
    let regex = DISTRIB_DESCRIPTION.as_ref()?;
    regex
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|description| !description.is_empty())
}
