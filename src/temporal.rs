// Temporal Model - membership time handling
// Current/former classification and time-window overlap checks

use serde::{Deserialize, Serialize};

use crate::statement::MembershipFact;

// ============================================================================
// YEAR PARSING
// ============================================================================

/// Extract the year from a knowledge-base timestamp.
///
/// Wikidata timestamps look like "2010-07-01T00:00:00Z", sometimes with a
/// leading '+' ("+2010-07-01T00:00:00Z"). Only the leading four digits are
/// trusted; anything shorter or non-numeric yields None.
pub fn parse_year(date: &str) -> Option<i32> {
    let trimmed = date.strip_prefix('+').unwrap_or(date);
    if trimmed.len() < 4 {
        return None;
    }
    trimmed[..4].parse::<i32>().ok()
}

// ============================================================================
// CURRENT / FORMER CLASSIFICATION
// ============================================================================

/// Classify a membership as current or former.
///
/// Total function: true iff the fact carries no end date. Placeholder end
/// markers (blank nodes) were already collapsed to None by the extractor,
/// so absence is the single sentinel for "ongoing".
pub fn is_current(fact: &MembershipFact) -> bool {
    fact.end_date.is_none()
}

// ============================================================================
// TIME WINDOW
// ============================================================================

/// A membership period in years. None means the boundary is unknown and is
/// treated as unbounded in overlap checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

impl TimeWindow {
    pub fn new(start_year: Option<i32>, end_year: Option<i32>) -> Self {
        TimeWindow {
            start_year,
            end_year,
        }
    }

    /// Build a window from raw date strings.
    pub fn from_dates(start_date: Option<&str>, end_date: Option<&str>) -> Self {
        TimeWindow {
            start_year: start_date.and_then(parse_year),
            end_year: end_date.and_then(parse_year),
        }
    }

    /// Check whether two membership periods overlap.
    ///
    /// An unknown boundary is open: a missing start extends infinitely into
    /// the past, a missing end into the future, so possible overlap is
    /// assumed rather than excluded.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        let a_before_b = match (self.end_year, other.start_year) {
            (Some(end), Some(start)) => end < start,
            _ => false,
        };
        let b_before_a = match (other.end_year, self.start_year) {
            (Some(end), Some(start)) => end < start,
            _ => false,
        };
        !a_before_b && !b_before_a
    }

    /// Intersection of two overlapping windows (max of starts, min of ends).
    pub fn intersect(&self, other: &TimeWindow) -> TimeWindow {
        let start_year = match (self.start_year, other.start_year) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let end_year = match (self.end_year, other.end_year) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        TimeWindow {
            start_year,
            end_year,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(start: Option<&str>, end: Option<&str>) -> MembershipFact {
        MembershipFact {
            person_id: "Q1".to_string(),
            organization_id: "Q100".to_string(),
            start_date: start.map(String::from),
            end_date: end.map(String::from),
        }
    }

    #[test]
    fn test_parse_year_plain() {
        assert_eq!(parse_year("2010-07-01T00:00:00Z"), Some(2010));
    }

    #[test]
    fn test_parse_year_leading_plus() {
        assert_eq!(parse_year("+1998-01-01T00:00:00Z"), Some(1998));
    }

    #[test]
    fn test_parse_year_garbage() {
        assert_eq!(parse_year("abc"), None);
        assert_eq!(parse_year("20"), None);
        assert_eq!(parse_year(""), None);
    }

    #[test]
    fn test_is_current_with_end_date() {
        assert!(!is_current(&fact(
            Some("2010-01-01T00:00:00Z"),
            Some("2012-01-01T00:00:00Z")
        )));
    }

    #[test]
    fn test_is_current_without_end_date() {
        assert!(is_current(&fact(Some("2010-01-01T00:00:00Z"), None)));
        assert!(is_current(&fact(None, None)));
    }

    #[test]
    fn test_overlap_clear() {
        let a = TimeWindow::new(Some(2010), Some(2012));
        let b = TimeWindow::new(Some(2011), Some(2013));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_overlap_disjoint() {
        let a = TimeWindow::new(Some(2010), Some(2011));
        let b = TimeWindow::new(Some(2013), Some(2015));
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_overlap_open_end() {
        // Current membership overlaps anything that starts after it
        let a = TimeWindow::new(Some(2010), None);
        let b = TimeWindow::new(Some(2019), Some(2020));
        assert!(a.overlaps(&b));
    }

    #[test]
    fn test_overlap_unknown_start_assumed() {
        // Unknown boundaries are open, so overlap is assumed
        let a = TimeWindow::new(None, Some(2012));
        let b = TimeWindow::new(Some(2011), None);
        assert!(a.overlaps(&b));

        let c = TimeWindow::new(None, None);
        assert!(c.overlaps(&b));
    }

    #[test]
    fn test_intersect() {
        let a = TimeWindow::new(Some(2010), Some(2012));
        let b = TimeWindow::new(Some(2011), Some(2013));
        assert_eq!(a.intersect(&b), TimeWindow::new(Some(2011), Some(2012)));
    }

    #[test]
    fn test_intersect_open_boundaries() {
        let a = TimeWindow::new(Some(2010), None);
        let b = TimeWindow::new(None, Some(2013));
        assert_eq!(a.intersect(&b), TimeWindow::new(Some(2010), Some(2013)));
    }
}
