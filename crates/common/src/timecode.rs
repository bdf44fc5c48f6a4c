//! Frame number to SMPTE timecode conversion.
//!
//! Supports both non-drop and drop-frame counting. Drop-frame timecode
//! (29.97 / 59.94 fps) skips the first two (or four) frame *labels* of
//! every minute except minutes divisible by ten, keeping the displayed
//! clock in step with wall time. No frames are ever dropped from the
//! media itself, only from the numbering.

/// Render a frame number as an SMPTE timecode string.
///
/// `fps` is the nominal rate (24.0, 25.0, 29.97, ...). With
/// `drop_frame` set, the frame separator becomes `;` and the drop-frame
/// label adjustment is applied; the caller is responsible for only
/// requesting drop-frame at rates where it is defined (29.97 / 59.94).
pub fn frames_to_timecode(frame: i64, fps: f64, drop_frame: bool) -> String {
    let fps_int = fps.round().max(1.0) as i64;
    let frame = frame.max(0);

    let (adjusted, separator) = if drop_frame {
        (apply_drop_frame(frame, fps), ';')
    } else {
        (frame, ':')
    };

    let ff = adjusted % fps_int;
    let ss = (adjusted / fps_int) % 60;
    let mm = (adjusted / (fps_int * 60)) % 60;
    let hh = (adjusted / (fps_int * 3600)) % 24;

    format!("{hh:02}:{mm:02}:{ss:02}{separator}{ff:02}")
}

/// Parse a timecode string back to a frame number.
///
/// Accepts both `:` and `;` frame separators; `drop_frame` controls
/// whether the drop-frame adjustment is reversed. Returns `None` for
/// malformed input. This is the reference oracle for the forward
/// conversion and is also used when reading timecodes out of remote
/// records.
pub fn parse_timecode(tc: &str, fps: f64, drop_frame: bool) -> Option<i64> {
    let fps_int = fps.round().max(1.0) as i64;

    let parts: Vec<i64> = tc
        .split([':', ';'])
        .map(|p| p.parse::<i64>().ok())
        .collect::<Option<Vec<_>>>()?;
    let [hh, mm, ss, ff] = parts.as_slice() else {
        return None;
    };

    let labeled = fps_int * 3600 * hh + fps_int * 60 * mm + fps_int * ss + ff;

    if drop_frame {
        let dropped_per_min = drop_count(fps);
        let total_minutes = 60 * hh + mm;
        Some(labeled - dropped_per_min * (total_minutes - total_minutes / 10))
    } else {
        Some(labeled)
    }
}

/// Frame labels dropped per minute at the given rate (2 at 29.97, 4 at 59.94).
fn drop_count(fps: f64) -> i64 {
    (fps * 0.066_666).round().max(1.0) as i64
}

/// Map a real frame count to its drop-frame label index.
fn apply_drop_frame(frame: i64, fps: f64) -> i64 {
    let dropped_per_min = drop_count(fps);
    // One drop-free minute in every ten.
    let frames_per_10min = (fps * 600.0).round() as i64;
    let frames_per_min = fps.round() as i64 * 60 - dropped_per_min;

    let tens = frame / frames_per_10min;
    let rem = frame % frames_per_10min;

    if rem > dropped_per_min {
        frame
            + dropped_per_min * 9 * tens
            + dropped_per_min * ((rem - dropped_per_min) / frames_per_min)
    } else {
        frame + dropped_per_min * 9 * tens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_frame() {
        assert_eq!(frames_to_timecode(0, 24.0, false), "00:00:00:00");
        assert_eq!(frames_to_timecode(0, 29.97, true), "00:00:00;00");
    }

    #[test]
    fn test_non_drop_simple() {
        assert_eq!(frames_to_timecode(24, 24.0, false), "00:00:01:00");
        assert_eq!(frames_to_timecode(25, 25.0, false), "00:00:01:00");
        assert_eq!(frames_to_timecode(30 * 60, 30.0, false), "00:01:00:00");
        assert_eq!(frames_to_timecode(86400, 24.0, false), "01:00:00:00");
    }

    #[test]
    fn test_drop_frame_minute_boundary() {
        // First minute drops two labels: 00:00:59;29 -> 00:01:00;02.
        assert_eq!(frames_to_timecode(1800, 29.97, true), "00:01:00;02");
    }

    #[test]
    fn test_drop_frame_ten_minute_boundary() {
        // Every tenth minute keeps its first labels.
        assert_eq!(frames_to_timecode(17982, 29.97, true), "00:10:00;00");
    }

    #[test]
    fn test_drop_frame_round_trip_at_boundaries() {
        for frame in [0, 1, 1799, 1800, 1801, 17981, 17982, 17983, 107_892] {
            let tc = frames_to_timecode(frame, 29.97, true);
            assert_eq!(
                parse_timecode(&tc, 29.97, true),
                Some(frame),
                "frame {frame} rendered as {tc}"
            );
        }
    }

    proptest! {
        #[test]
        fn prop_non_drop_round_trip(frame in 0i64..100_000, fps_idx in 0usize..3) {
            let fps = [24.0, 25.0, 30.0][fps_idx];
            let tc = frames_to_timecode(frame, fps, false);
            prop_assert_eq!(parse_timecode(&tc, fps, false), Some(frame));
        }

        #[test]
        fn prop_drop_frame_round_trip(frame in 0i64..100_000) {
            let tc = frames_to_timecode(frame, 29.97, true);
            prop_assert_eq!(parse_timecode(&tc, 29.97, true), Some(frame));
        }

        #[test]
        fn prop_timecode_is_monotonic(frame in 0i64..99_999) {
            // Lexicographic order matches frame order within a day.
            let a = frames_to_timecode(frame, 29.97, true);
            let b = frames_to_timecode(frame + 1, 29.97, true);
            prop_assert!(a < b);
        }
    }
}
