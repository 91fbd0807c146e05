//! Calculation-details strings: `"VER (subbed by BEA): 8 ×2 = 16, NOR: 12"`.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::dao::models::DriverId;

const SEGMENT_SEPARATOR: &str = ", ";
const MULTIPLIER_SIGN: char = '×';

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("numeric token pattern"));
static MULTIPLIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[×xX]\s*(\d+(?:\.\d+)?)").expect("multiplier pattern"));

/// One `driver: value` entry of a details string.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Driver owned by the player.
    pub driver: DriverId,
    /// Driver who actually scored, when a substitution applied.
    pub substitute: Option<DriverId>,
    /// Multiplier annotation, when present.
    pub multiplier: Option<f64>,
    /// Value credited to the player, if one could be read.
    pub points: Option<f64>,
}

impl Segment {
    /// Driver whose result the value came from.
    pub fn scoring_driver(&self) -> &DriverId {
        self.substitute.as_ref().unwrap_or(&self.driver)
    }
}

/// Parse every `driver: value` segment; segments without a driver are skipped.
pub fn parse_details(text: &str) -> Vec<Segment> {
    text.split(',').filter_map(parse_segment).collect()
}

/// Parse one `driver: value` segment; `None` when there is no `:`.
pub fn parse_segment(segment: &str) -> Option<Segment> {
    let (label, value) = segment.trim().split_once(':')?;
    let driver = label.split_whitespace().next()?;

    let substitute = label
        .split_once("subbed by")
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .map(|token| token.trim_end_matches(')'))
        .filter(|token| !token.is_empty())
        .map(DriverId::from);

    let multiplier = MULTIPLIER
        .captures(value)
        .and_then(|captures| captures.get(1))
        .and_then(|factor| factor.as_str().parse::<f64>().ok());

    Some(Segment {
        driver: driver.into(),
        substitute,
        multiplier,
        points: parse_points(value),
    })
}

/// Read the credited value of a segment: the figure after the last `=`, or
/// the whole value when there is none.
///
/// Falls back to the first numeric token (logged), and to `None` when there is
/// no number at all.
pub fn parse_points(value: &str) -> Option<f64> {
    let credited = value
        .rsplit_once('=')
        .map(|(_, credited)| credited)
        .unwrap_or(value)
        .trim();
    if let Ok(points) = credited.parse::<f64>() {
        return Some(points);
    }

    let fallback = NUMBER
        .find(credited)
        .and_then(|token| token.as_str().parse::<f64>().ok());
    match fallback {
        Some(points) => warn!(segment = %value.trim(), points, "parse fallback: using first numeric token"),
        None => warn!(segment = %value.trim(), "parse fallback: no numeric token, using 0"),
    }
    fallback
}

/// Render one segment, e.g. `VER (subbed by BEA): 8 ×2 = 16` or `NOR: 12`.
pub fn format_segment(
    driver: &str,
    substitute: Option<&str>,
    raw: f64,
    multiplier: f64,
) -> String {
    let label = match substitute {
        Some(substitute) => format!("{driver} (subbed by {substitute})"),
        None => driver.to_string(),
    };
    if multiplier == 1.0 {
        format!("{label}: {}", format_points(raw))
    } else {
        format!(
            "{label}: {} {MULTIPLIER_SIGN}{} = {}",
            format_points(raw),
            format_points(multiplier),
            format_points(raw * multiplier)
        )
    }
}

/// Join rendered segments into a details string.
pub fn join_segments(segments: impl IntoIterator<Item = String>) -> String {
    segments
        .into_iter()
        .collect::<Vec<_>>()
        .join(SEGMENT_SEPARATOR)
}

/// Points rounded to two decimals, integral values without a fraction.
pub fn format_points(points: f64) -> String {
    let rounded = (points * 100.0).round() / 100.0;
    if rounded == 0.0 {
        return "0".into();
    }
    if rounded.fract() == 0.0 {
        return format!("{rounded:.0}");
    }
    let text = format!("{rounded:.2}");
    text.trim_end_matches('0').to_string()
}
