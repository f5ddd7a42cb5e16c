//! Placement helpers for new nodes.
//!
//! New nodes without an explicit position land in the viewport centre. If
//! that spot is already taken by a sibling, the candidate walks diagonally
//! until it is free.

use kurbo::{Point, Vec2};

/// Viewport-centre placement, shifted up by half the declared height so the
/// node is vertically centred (its position is the top edge).
pub fn centred_position(viewport_center: Point, declared_height: Option<f64>) -> Point {
    match declared_height {
        Some(h) => Point::new(viewport_center.x, viewport_center.y - h / 2.0),
        None => viewport_center,
    }
}

/// Single forward sweep over siblings sorted by ascending `y`.
///
/// A sibling within `tolerance` of the current candidate on both axes pushes
/// the candidate by `step` diagonally. The sweep stops at the first sibling
/// lying more than `tolerance` below the candidate.
pub fn avoid_overlap(candidate: Point, siblings: &[Point], tolerance: f64, step: f64) -> Point {
    let mut sorted: Vec<Point> = siblings.to_vec();
    sorted.sort_by(|a, b| a.y.total_cmp(&b.y));

    let mut pos = candidate;
    for sibling in sorted {
        if sibling.y - pos.y > tolerance {
            break;
        }
        if (sibling.x - pos.x).abs() <= tolerance && (sibling.y - pos.y).abs() <= tolerance {
            pos += Vec2::new(step, step);
        }
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centred_position_shifts_up() {
        assert_eq!(
            centred_position(Point::new(100.0, 100.0), Some(80.0)),
            Point::new(100.0, 60.0)
        );
        assert_eq!(
            centred_position(Point::new(100.0, 100.0), None),
            Point::new(100.0, 100.0)
        );
    }

    #[test]
    fn free_spot_is_kept() {
        let siblings = [Point::new(500.0, 500.0)];
        assert_eq!(
            avoid_overlap(Point::new(0.0, 0.0), &siblings, 5.0, 30.0),
            Point::new(0.0, 0.0)
        );
    }

    #[test]
    fn chained_collisions_shift_repeatedly() {
        let siblings = [
            Point::new(60.0, 60.0),
            Point::new(2.0, 1.0),
            Point::new(30.0, 30.0),
        ];
        assert_eq!(
            avoid_overlap(Point::new(0.0, 0.0), &siblings, 5.0, 30.0),
            Point::new(90.0, 90.0)
        );
    }

    #[test]
    fn siblings_above_do_not_stop_the_sweep() {
        let siblings = [Point::new(900.0, -400.0), Point::new(0.0, 0.0)];
        assert_eq!(
            avoid_overlap(Point::new(0.0, 0.0), &siblings, 5.0, 30.0),
            Point::new(30.0, 30.0)
        );
    }
}
