//! Stream selection policy.
//!
//! Only the audio track is kept, so the cheapest stream wins: an audio-only
//! stream in the preferred container, otherwise the lowest resolution one.

use super::SourceStream;
use std::cmp::Ordering;

/// Container format the transcoder copies from without re-encoding.
pub const PREFERRED_FORMAT: &str = "mp4";

/// Pick a stream out of `streams`, scanning once in the given order.
///
/// Container format dominates every other criterion. Among preferred
/// containers the first audio-only stream ends the scan; otherwise the
/// smallest parseable resolution wins and ties keep the earlier stream.
pub fn choose_stream(streams: &[SourceStream]) -> Option<&SourceStream> {
    let mut candidate = streams.first()?;

    for stream in streams {
        if candidate.format != PREFERRED_FORMAT {
            candidate = stream;
        }

        if stream.format != PREFERRED_FORMAT {
            continue;
        }

        if stream.is_audio_only() {
            candidate = stream;
            break;
        }

        if compare_resolution(stream, candidate) == Some(Ordering::Less) {
            candidate = stream;
        }
    }

    Some(candidate)
}

/// Parse a resolution label such as `480p` into its leading integer.
pub fn parse_resolution(label: &str) -> Option<u32> {
    label
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_alphabetic())
        .parse()
        .ok()
}

fn compare_resolution(a: &SourceStream, b: &SourceStream) -> Option<Ordering> {
    let ra = parse_resolution(&a.resolution)?;
    let rb = parse_resolution(&b.resolution)?;
    Some(ra.cmp(&rb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MediaType;
    use std::time::Duration;

    fn stream(format: &str, media_type: MediaType, resolution: &str) -> SourceStream {
        SourceStream {
            format: format.to_string(),
            media_type,
            resolution: resolution.to_string(),
            duration: Duration::from_secs(212),
            url: format!("https://media.example/{}-{}-{}", format, media_type, resolution),
        }
    }

    #[test]
    fn test_parse_resolution() {
        assert_eq!(parse_resolution("480p"), Some(480));
        assert_eq!(parse_resolution("1080p"), Some(1080));
        assert_eq!(parse_resolution("720"), Some(720));
        assert_eq!(parse_resolution(""), None);
        assert_eq!(parse_resolution("audio only"), None);
        assert_eq!(parse_resolution("720p60"), None);
    }

    #[test]
    fn test_empty_list() {
        assert!(choose_stream(&[]).is_none());
    }

    #[test]
    fn test_prefers_container_over_everything() {
        let streams = vec![
            stream("webm", MediaType::Audio, ""),
            stream("3gp", MediaType::AudioVideo, "144p"),
            stream("mp4", MediaType::AudioVideo, "1080p"),
            stream("webm", MediaType::AudioVideo, "240p"),
        ];
        let chosen = choose_stream(&streams).unwrap();
        assert_eq!(chosen.format, "mp4");
        assert_eq!(chosen.resolution, "1080p");
    }

    #[test]
    fn test_never_returns_other_container_when_preferred_exists() {
        let layouts: Vec<Vec<SourceStream>> = vec![
            vec![
                stream("mp4", MediaType::AudioVideo, "720p"),
                stream("webm", MediaType::Audio, ""),
            ],
            vec![
                stream("webm", MediaType::Audio, ""),
                stream("webm", MediaType::Video, "144p"),
                stream("mp4", MediaType::Video, "360p"),
            ],
            vec![
                stream("webm", MediaType::Audio, ""),
                stream("mp4", MediaType::AudioVideo, "360p"),
                stream("webm", MediaType::AudioVideo, "144p"),
                stream("flv", MediaType::AudioVideo, "240p"),
            ],
        ];

        for streams in &layouts {
            let chosen = choose_stream(streams).unwrap();
            assert_eq!(chosen.format, PREFERRED_FORMAT, "layout {:?}", streams);
        }
    }

    #[test]
    fn test_falls_back_to_last_stream_without_preferred_container() {
        let streams = vec![
            stream("webm", MediaType::Audio, ""),
            stream("flv", MediaType::AudioVideo, "240p"),
        ];
        let chosen = choose_stream(&streams).unwrap();
        assert_eq!(chosen.format, "flv");
    }

    #[test]
    fn test_smallest_resolution_among_preferred() {
        let streams = vec![
            stream("mp4", MediaType::AudioVideo, "720p"),
            stream("mp4", MediaType::AudioVideo, "360p"),
            stream("webm", MediaType::AudioVideo, "144p"),
            stream("mp4", MediaType::Video, "1080p"),
            stream("mp4", MediaType::AudioVideo, "480p"),
        ];
        let chosen = choose_stream(&streams).unwrap();
        assert_eq!(chosen.resolution, "360p");

        let smallest = streams
            .iter()
            .filter(|s| s.format == PREFERRED_FORMAT)
            .filter_map(|s| parse_resolution(&s.resolution))
            .min()
            .unwrap();
        assert_eq!(parse_resolution(&chosen.resolution), Some(smallest));
    }

    #[test]
    fn test_equal_resolution_keeps_first() {
        let first = stream("mp4", MediaType::AudioVideo, "360p");
        let mut second = stream("mp4", MediaType::Video, "360p");
        second.url = "https://media.example/second".to_string();

        let streams = vec![first.clone(), second];
        assert_eq!(choose_stream(&streams), Some(&first));
    }

    #[test]
    fn test_first_audio_only_wins_regardless_of_resolution() {
        let streams = vec![
            stream("mp4", MediaType::AudioVideo, "144p"),
            stream("mp4", MediaType::Audio, "1080p"),
            stream("mp4", MediaType::Audio, "96p"),
        ];
        let chosen = choose_stream(&streams).unwrap();
        assert_eq!(chosen.media_type, MediaType::Audio);
        assert_eq!(chosen.resolution, "1080p");
    }

    #[test]
    fn test_audio_only_in_other_container_is_ignored() {
        let streams = vec![
            stream("mp4", MediaType::AudioVideo, "360p"),
            stream("webm", MediaType::Audio, ""),
            stream("mp4", MediaType::AudioVideo, "240p"),
        ];
        let chosen = choose_stream(&streams).unwrap();
        assert_eq!(chosen.format, "mp4");
        assert_eq!(chosen.resolution, "240p");
    }

    #[test]
    fn test_unparseable_resolution_keeps_candidate() {
        let streams = vec![
            stream("mp4", MediaType::AudioVideo, "360p"),
            stream("mp4", MediaType::AudioVideo, "hd"),
            stream("mp4", MediaType::AudioVideo, "720p"),
        ];
        let chosen = choose_stream(&streams).unwrap();
        assert_eq!(chosen.resolution, "360p");
    }
}
