use super::geometry::Point;

/// Pointer radius, in screen pixels, within which a car counts as clicked
pub const HIT_RADIUS: f64 = 12.;

/// The driver highlighted on the map and in the side panels. Shared by
/// pointer clicks and leaderboard clicks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: Option<String>,
}

impl Selection {
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_selected(&self, code: &str) -> bool {
        self.selected.as_deref() == Some(code)
    }

    /// Selecting the current driver again clears the selection.
    pub fn toggle(&mut self, code: &str) {
        if self.is_selected(code) {
            self.selected = None;
        } else {
            self.selected = Some(code.to_string());
        }
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }
}

/// Returns the first candidate within `radius` of `pointer`, in iteration
/// order. Overlapping markers resolve to whichever comes first, not the
/// nearest.
pub fn hit_test<'a, I>(pointer: Point, candidates: I, radius: f64) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a str, Point)>,
{
    candidates
        .into_iter()
        .find(|(_, position)| position.distance(pointer) <= radius)
        .map(|(code, _)| code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_toggle_replaces_and_clears() {
        let mut selection = Selection::default();
        selection.toggle("VER");
        assert_eq!(selection.selected(), Some("VER"));
        selection.toggle("NOR");
        assert_eq!(selection.selected(), Some("NOR"));
        selection.toggle("NOR");
        assert_eq!(selection.selected(), None);
    }

    #[test]
    fn test_hit_test_uses_first_match() {
        let candidates = vec![
            ("HAM", Point::new(100., 100.)),
            ("LEC", Point::new(105., 100.)),
        ];
        // closer to LEC, but HAM comes first and is within the radius
        assert_eq!(
            hit_test(Point::new(104., 100.), candidates.clone(), HIT_RADIUS),
            Some("HAM")
        );
        assert_eq!(
            hit_test(Point::new(116., 100.), candidates.clone(), HIT_RADIUS),
            Some("LEC")
        );
        assert_eq!(hit_test(Point::new(300., 300.), candidates, HIT_RADIUS), None);
    }

    #[test]
    fn test_hit_test_radius_is_inclusive() {
        let candidates = vec![("ALO", Point::new(0., 0.))];
        assert_eq!(
            hit_test(Point::new(12., 0.), candidates.clone(), HIT_RADIUS),
            Some("ALO")
        );
        assert_eq!(hit_test(Point::new(12.01, 0.), candidates, HIT_RADIUS), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_toggle_twice_restores_selection(
            initial in proptest::option::of("[A-Z]{3}"),
            code in "[A-Z]{3}",
        ) {
            let mut selection = Selection::default();
            if let Some(initial) = &initial {
                selection.toggle(initial);
            }
            let before = selection.clone();
            selection.toggle(&code);
            selection.toggle(&code);
            // from nothing or from the same code the pair is an involution;
            // a different code is replaced and then cleared
            if initial.is_none() || initial.as_deref() == Some(code.as_str()) {
                prop_assert_eq!(selection, before);
            } else {
                prop_assert_eq!(selection.selected(), None);
            }
        }
    }
}
