//! Pixel ↔ percent conversion for overlay placement

use crate::constants::bounds;
use crate::types::{Point, Position, Rect};

/// Normalize a pixel point to percent of the container, clamped to the
/// allowed overlay range. A degenerate container maps everything to the origin.
pub fn to_percent(point: Point, container: Rect) -> Position {
    if !(container.width > 0.0 && container.height > 0.0) {
        return Position::new(bounds::POSITION_MIN, bounds::POSITION_MIN);
    }

    let x = (point.x - container.left) / container.width * 100.0;
    let y = (point.y - container.top) / container.height * 100.0;
    Position::new(x, y).clamped()
}

/// Inverse of [`to_percent`], without clamping
pub fn from_percent(position: Position, container: Rect) -> Point {
    Point::new(
        container.left + position.x / 100.0 * container.width,
        container.top + position.y / 100.0 * container.height,
    )
}
