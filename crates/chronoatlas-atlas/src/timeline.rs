//! Piecewise-linear mapping between years and the timeline slider.
//!
//! Prehistory is long and sparsely populated, so the slider spends one
//! sixth of its width on `[-10000, -3200]`, one sixth on `[-3200, 0]` and
//! the remaining four sixths on the common era up to [`TIMELINE_MAX`].

/// Earliest selectable year.
pub const TIMELINE_MIN: i32 = -10_000;
/// Latest selectable year.
pub const TIMELINE_MAX: i32 = 2026;
/// End of the first segment (approximate invention of writing).
pub const PIVOT_WRITING: i32 = -3200;
/// End of the second segment.
pub const PIVOT_COMMON_ERA: i32 = 0;

/// Slider width of the first segment, in percent.
const WIDTH_PREHISTORY: f64 = 100.0 / 6.0;
/// Slider width of the second segment, in percent.
const WIDTH_ANTIQUITY: f64 = 100.0 / 6.0;
/// Slider width of the third segment, in percent.
const WIDTH_COMMON_ERA: f64 = 100.0 * 4.0 / 6.0;

/// One linear piece of the scale.
struct Segment {
    years: (i32, i32),
    percent: (f64, f64),
}

const COMMON_ERA_SEGMENT: Segment = Segment {
    years: (PIVOT_COMMON_ERA, TIMELINE_MAX),
    percent: (WIDTH_PREHISTORY + WIDTH_ANTIQUITY, 100.0),
};

const SEGMENTS: [Segment; 3] = [
    Segment {
        years: (TIMELINE_MIN, PIVOT_WRITING),
        percent: (0.0, WIDTH_PREHISTORY),
    },
    Segment {
        years: (PIVOT_WRITING, PIVOT_COMMON_ERA),
        percent: (WIDTH_PREHISTORY, WIDTH_PREHISTORY + WIDTH_ANTIQUITY),
    },
    COMMON_ERA_SEGMENT,
];

/// Convert a year to a slider position in `[0, 100]`.
///
/// Years outside the timeline are clamped.
pub fn year_to_percent(year: i32) -> f64 {
    let year = year.clamp(TIMELINE_MIN, TIMELINE_MAX);
    let segment = SEGMENTS
        .iter()
        .find(|s| year <= s.years.1)
        .unwrap_or(&COMMON_ERA_SEGMENT);

    let (y0, y1) = (f64::from(segment.years.0), f64::from(segment.years.1));
    let (p0, p1) = segment.percent;
    p0 + (f64::from(year) - y0) / (y1 - y0) * (p1 - p0)
}

/// Convert a slider position to the nearest year.
///
/// Positions outside `[0, 100]` are clamped; non-finite input maps to the
/// start of the timeline.
pub fn percent_to_year(percent: f64) -> i32 {
    let percent = if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let segment = SEGMENTS
        .iter()
        .find(|s| percent <= s.percent.1)
        .unwrap_or(&COMMON_ERA_SEGMENT);

    let (y0, y1) = (f64::from(segment.years.0), f64::from(segment.years.1));
    let (p0, p1) = segment.percent;
    let year = ((percent - p0) / (p1 - p0)).mul_add(y1 - y0, y0).round();

    // The interpolated value stays inside the segment's year bounds, which
    // both fit in i32.
    #[allow(clippy::cast_possible_truncation)]
    let year = year as i32;
    year.clamp(TIMELINE_MIN, TIMELINE_MAX)
}
