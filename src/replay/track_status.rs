use crate::session::{Rgb, TrackStatusInterval};

/// Status code used when no interval covers the current time
pub const DEFAULT_STATUS: &str = "GREEN";

/// Flag condition on track, decoded from the server's status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackStatus {
    Green,
    Yellow,
    SafetyCar,
    Red,
    VirtualSafetyCar,
}

impl TrackStatus {
    /// Unknown codes are treated as green.
    pub fn from_code(code: &str) -> Self {
        match code {
            "2" => TrackStatus::Yellow,
            "4" => TrackStatus::SafetyCar,
            "5" => TrackStatus::Red,
            "6" | "7" => TrackStatus::VirtualSafetyCar,
            _ => TrackStatus::Green,
        }
    }

    /// Stroke colour for the track boundaries.
    pub fn track_color(&self) -> Rgb {
        match self {
            TrackStatus::Green => [150, 150, 150],
            TrackStatus::Yellow => [220, 180, 0],
            TrackStatus::SafetyCar => [180, 100, 30],
            TrackStatus::Red => [200, 30, 30],
            TrackStatus::VirtualSafetyCar => [200, 130, 50],
        }
    }

    /// HUD banner text; green has none.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            TrackStatus::Green => None,
            TrackStatus::Yellow => Some("YELLOW FLAG"),
            TrackStatus::SafetyCar => Some("SAFETY CAR"),
            TrackStatus::Red => Some("RED FLAG"),
            TrackStatus::VirtualSafetyCar => Some("VIRTUAL SAFETY CAR"),
        }
    }
}

/// Code of the first interval containing `t`, scanning in order.
pub fn resolve_status(intervals: &[TrackStatusInterval], t: f64) -> &str {
    intervals
        .iter()
        .find(|interval| interval.contains(t))
        .map(|interval| interval.status.as_str())
        .unwrap_or(DEFAULT_STATUS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(status: &str, start_time: f64, end_time: Option<f64>) -> TrackStatusInterval {
        TrackStatusInterval {
            status: status.to_string(),
            start_time,
            end_time,
        }
    }

    #[test]
    fn test_resolve_status() {
        let intervals = vec![
            interval("GREEN", 0., Some(10.)),
            interval("2", 10., Some(20.)),
            interval("GREEN", 20., None),
        ];
        assert_eq!(resolve_status(&intervals, 9.9), "GREEN");
        assert_eq!(resolve_status(&intervals, 10.), "2");
        assert_eq!(resolve_status(&intervals, 25.), "GREEN");
        assert_eq!(resolve_status(&intervals, -1.), DEFAULT_STATUS);
        assert_eq!(resolve_status(&[], 5.), DEFAULT_STATUS);
    }

    #[test]
    fn test_first_matching_interval_wins() {
        let intervals = vec![interval("4", 0., None), interval("5", 5., Some(8.))];
        assert_eq!(resolve_status(&intervals, 6.), "4");
    }

    #[test]
    fn test_codes_map_to_palette_and_labels() {
        assert_eq!(TrackStatus::from_code("6"), TrackStatus::VirtualSafetyCar);
        assert_eq!(TrackStatus::from_code("7"), TrackStatus::VirtualSafetyCar);
        assert_eq!(TrackStatus::from_code("1"), TrackStatus::Green);
        assert_eq!(TrackStatus::from_code("banana"), TrackStatus::Green);
        assert_eq!(
            TrackStatus::from_code("banana").track_color(),
            TrackStatus::Green.track_color()
        );
        assert_eq!(TrackStatus::Green.label(), None);
        assert_eq!(TrackStatus::Red.label(), Some("RED FLAG"));
    }
}
