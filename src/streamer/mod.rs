use axum_extra::headers::Range;

const WEB_NATIVE_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov"];

pub fn extension_of(path: &str) -> &str {
    path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
}

/// Whether a raw file can be range-served as-is, per spec.md §4.6. Judged by
/// extension rather than a fresh probe on every request.
pub fn is_web_native(path: &str) -> bool {
    let ext = extension_of(path).to_ascii_lowercase();
    WEB_NATIVE_EXTENSIONS.contains(&ext.as_str())
}

pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeDecision {
    /// No `Range` header: serve the whole file with `200`.
    Full,
    /// Satisfiable byte range (inclusive bounds), served with `206`.
    Partial { start: u64, end: u64 },
    /// `Range` header present but not satisfiable against `file_size`; `416`.
    Unsatisfiable,
}

/// Resolves the first satisfiable range in the header against `file_size`,
/// matching axum_extra's `Range::satisfiable_ranges` idiom (the modern
/// replacement for the teacher's manual bound-matching in `serve_content.rs`).
pub fn decide_range(range: Option<&Range>, file_size: u64) -> RangeDecision {
    let Some(range) = range else {
        return RangeDecision::Full;
    };
    if file_size == 0 {
        return RangeDecision::Unsatisfiable;
    }

    match range.satisfiable_ranges(file_size).next() {
        Some((start_bound, end_bound)) => {
            use std::ops::Bound;
            let start = match start_bound {
                Bound::Included(v) => v,
                Bound::Excluded(v) => v + 1,
                Bound::Unbounded => 0,
            };
            let end = match end_bound {
                Bound::Included(v) => v,
                Bound::Excluded(v) => v.saturating_sub(1),
                Bound::Unbounded => file_size - 1,
            };
            if start > end || start >= file_size {
                RangeDecision::Unsatisfiable
            } else {
                RangeDecision::Partial {
                    start,
                    end: end.min(file_size - 1),
                }
            }
        }
        None => RangeDecision::Unsatisfiable,
    }
}

/// Picks the single rendition used by the non-adaptive HLS manifest
/// endpoint (spec.md §6 `GET .../hls/manifest.m3u8` carries no quality
/// parameter, so the label must be a deterministic function of the
/// source's probed height).
pub fn default_hls_profile(source_height: u32) -> crate::transcoder::command::Profile {
    let capped = source_height.min(1080);
    crate::probe::ladder_for_height(capped.max(360))
        .into_iter()
        .max_by_key(|rung| rung.height)
        .and_then(|rung| crate::transcoder::command::profile_by_label(rung.label))
        .unwrap_or_else(|| crate::transcoder::command::profile_by_label("360p").unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_web_native_checks_extension_case_insensitively() {
        assert!(is_web_native("Movie.MP4"));
        assert!(!is_web_native("Movie.mkv"));
    }

    #[test]
    fn decide_range_no_header_is_full() {
        assert_eq!(decide_range(None, 1000), RangeDecision::Full);
    }

    #[test]
    fn decide_range_single_byte() {
        let range: Range = "bytes=0-0".parse().unwrap();
        assert_eq!(
            decide_range(Some(&range), 1000),
            RangeDecision::Partial { start: 0, end: 0 }
        );
    }

    #[test]
    fn decide_range_out_of_bounds_is_unsatisfiable() {
        let range: Range = "bytes=1000-".parse().unwrap();
        assert_eq!(decide_range(Some(&range), 1000), RangeDecision::Unsatisfiable);
    }

    #[test]
    fn default_hls_profile_caps_at_1080p() {
        let profile = default_hls_profile(2160);
        assert_eq!(profile.label, "1080p");
    }

    #[test]
    fn default_hls_profile_falls_back_to_source_height() {
        let profile = default_hls_profile(480);
        assert_eq!(profile.label, "480p");
    }
}
