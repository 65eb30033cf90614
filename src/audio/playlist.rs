//! HLS playlist helpers.

use std::time::Duration;

pub const EXTM3U_HEADER: &str = "#EXTM3U";
pub const START_DIRECTIVE: &str = "#EXT-X-START:0";

/// Format a duration as `HH:MM:SS` for ffmpeg's `-t` option.
///
/// Sub-second precision is dropped; hours are not wrapped.
pub fn format_hms(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Insert `#EXT-X-START:0` right after the `#EXTM3U` header line.
///
/// Players then start at the beginning of a playlist that is still growing
/// instead of at its live edge. Playlists without the header, or already
/// carrying a start directive, are returned unchanged.
pub fn insert_start_directive(playlist: &str) -> String {
    let Some(rest) = playlist.strip_prefix(EXTM3U_HEADER) else {
        return playlist.to_string();
    };
    if playlist.lines().any(|l| l.trim_start().starts_with("#EXT-X-START")) {
        return playlist.to_string();
    }

    let (newline, body) = if let Some(body) = rest.strip_prefix("\r\n") {
        ("\r\n", body)
    } else if let Some(body) = rest.strip_prefix('\n') {
        ("\n", body)
    } else if rest.is_empty() {
        ("\n", rest)
    } else {
        // Header is a prefix of some other tag.
        return playlist.to_string();
    };

    let mut out = String::with_capacity(playlist.len() + START_DIRECTIVE.len() + 2);
    out.push_str(EXTM3U_HEADER);
    out.push_str(newline);
    out.push_str(START_DIRECTIVE);
    out.push_str(newline);
    out.push_str(body);
    out
}
