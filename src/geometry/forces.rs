//! Force representation and decomposition into translation and torque.

use glam::DVec2;

/// Distances below this are treated as coincident points.
const COINCIDENT_EPSILON: f64 = 1e-12;

/// A force together with the point it acts on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Force {
    /// Force vector.
    pub vector: DVec2,
    /// Point of application in world coordinates.
    pub anchor: DVec2,
}

impl Force {
    /// A force with the given vector acting at `anchor`.
    #[inline]
    pub fn new(vector: DVec2, anchor: DVec2) -> Self {
        Self { vector, anchor }
    }

    /// A zero force acting at `anchor`.
    #[inline]
    pub fn zero(anchor: DVec2) -> Self {
        Self {
            vector: DVec2::ZERO,
            anchor,
        }
    }
}

/// Translational component and torque of a force acting off-center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitForce {
    /// Component along the lever arm; moves the center of mass.
    pub radial: DVec2,
    /// Signed torque, positive counter-clockwise.
    pub torque: f64,
}

/// Split `force` acting at `anchor` into a radial component and a torque
/// around `center`.
///
/// With `r = anchor - center`, the radial part is the projection of the
/// force onto `r`. The remainder is tangential; its torque has magnitude
/// `|r| * |tangential|` and the sign of `r x tangential`. A force acting
/// exactly at the center is purely radial.
pub fn split_force(force: DVec2, anchor: DVec2, center: DVec2) -> SplitForce {
    let lever = anchor - center;
    let lever_length = lever.length();
    if lever_length == 0.0 {
        return SplitForce {
            radial: force,
            torque: 0.0,
        };
    }

    let direction = lever / lever_length;
    let radial = direction * force.dot(direction);
    let tangential = force - radial;
    let magnitude = lever_length * tangential.length();
    let turn = lever.perp_dot(tangential);
    let torque = if turn > 0.0 {
        magnitude
    } else if turn < 0.0 {
        -magnitude
    } else {
        0.0
    };

    SplitForce { radial, torque }
}

/// Unit vector and distance from `from` to `to`, or `None` if the points
/// coincide.
pub fn unit_towards(from: DVec2, to: DVec2) -> Option<(DVec2, f64)> {
    let delta = to - from;
    let distance = delta.length();
    if distance < COINCIDENT_EPSILON {
        return None;
    }
    Some((delta / distance, distance))
}

/// Chain attraction magnitude. Grows with distance so that far-apart
/// chain members keep pulling hard enough to straighten long chains.
#[inline]
pub fn attraction_from_distance(distance: f64) -> f64 {
    distance * distance / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_at_center_is_radial() {
        let split = split_force(DVec2::new(3.0, -4.0), DVec2::ZERO, DVec2::ZERO);
        assert_eq!(split.radial, DVec2::new(3.0, -4.0));
        assert_eq!(split.torque, 0.0);
    }

    #[test]
    fn test_force_along_lever_has_no_torque() {
        let split = split_force(DVec2::new(2.0, 0.0), DVec2::new(1.0, 0.0), DVec2::ZERO);
        assert_eq!(split.radial, DVec2::new(2.0, 0.0));
        assert_eq!(split.torque, 0.0);
    }

    #[test]
    fn test_perpendicular_force_counter_clockwise() {
        // Lever along +x, push along +y turns counter-clockwise.
        let split = split_force(DVec2::new(0.0, 3.0), DVec2::new(2.0, 0.0), DVec2::ZERO);
        assert!(split.radial.length() < 1e-12);
        assert!((split.torque - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_perpendicular_force_clockwise() {
        let split = split_force(DVec2::new(0.0, -3.0), DVec2::new(2.0, 0.0), DVec2::ZERO);
        assert!((split.torque + 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_oblique_force_splits_both_ways() {
        let center = DVec2::new(1.0, 1.0);
        let split = split_force(DVec2::new(1.0, 1.0), DVec2::new(2.0, 1.0), center);
        assert!((split.radial - DVec2::new(1.0, 0.0)).length() < 1e-12);
        assert!((split.torque - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_unit_towards() {
        let (direction, distance) = unit_towards(DVec2::ZERO, DVec2::new(0.0, 5.0)).unwrap();
        assert_eq!(direction, DVec2::new(0.0, 1.0));
        assert_eq!(distance, 5.0);
        assert!(unit_towards(DVec2::ONE, DVec2::ONE).is_none());
    }

    #[test]
    fn test_attraction_grows_with_distance() {
        assert_eq!(attraction_from_distance(0.0), 0.0);
        assert_eq!(attraction_from_distance(2.0), 2.0);
        assert!(attraction_from_distance(4.0) > attraction_from_distance(3.0));
    }
}
