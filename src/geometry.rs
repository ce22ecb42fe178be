//! Canvas geometry: points, rects, edge anchors, viewport and minimap math.

use serde::{Deserialize, Serialize};

/// A point on the infinite canvas, in canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle in canvas units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_parts(position: Point, size: Size) -> Self {
        Self::new(position.x, position.y, size.width, size.height)
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom()
    }

    /// The rect grown by `margin` on every side.
    pub fn expand(&self, margin: f64) -> Rect {
        Rect::new(
            self.x - margin,
            self.y - margin,
            self.width + margin * 2.0,
            self.height + margin * 2.0,
        )
    }
}

/// One of the four edges of a table card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

/// Absolute position of an edge-relative anchor: `offset` is the 0..1 fraction
/// along the given side, clamped.
pub fn anchor_point(rect: &Rect, side: Side, offset: f64) -> Point {
    let t = offset.clamp(0.0, 1.0);
    match side {
        Side::Top => Point::new(rect.x + rect.width * t, rect.top()),
        Side::Right => Point::new(rect.right(), rect.y + rect.height * t),
        Side::Bottom => Point::new(rect.x + rect.width * t, rect.bottom()),
        Side::Left => Point::new(rect.left(), rect.y + rect.height * t),
    }
}

/// Snap a cursor position to the nearest edge of `rect`: minimum of the four
/// absolute distances, ties resolved top, right, bottom, left. Returns the
/// winning side and the clamped 0..1 fraction along it.
pub fn snap_to_edge(rect: &Rect, cursor: Point) -> (Side, f64) {
    let d_top = (cursor.y - rect.top()).abs();
    let d_right = (cursor.x - rect.right()).abs();
    let d_bottom = (cursor.y - rect.bottom()).abs();
    let d_left = (cursor.x - rect.left()).abs();

    let min = d_top.min(d_right).min(d_bottom).min(d_left);

    let along_x = || ((cursor.x - rect.x) / rect.width).clamp(0.0, 1.0);
    let along_y = || ((cursor.y - rect.y) / rect.height).clamp(0.0, 1.0);

    if min == d_top {
        (Side::Top, along_x())
    } else if min == d_right {
        (Side::Right, along_y())
    } else if min == d_bottom {
        (Side::Bottom, along_x())
    } else {
        (Side::Left, along_y())
    }
}

/// Smallest rect covering all of `rects`, or `None` when empty.
pub fn bounding(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
    let mut iter = rects.into_iter();
    let first = iter.next()?;
    let (mut x1, mut y1, mut x2, mut y2) = (first.left(), first.top(), first.right(), first.bottom());
    for r in iter {
        x1 = x1.min(r.left());
        y1 = y1.min(r.top());
        x2 = x2.max(r.right());
        y2 = y2.max(r.bottom());
    }
    Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
}

/// Drag bookkeeping: remembers where inside the card the grab happened so the
/// card keeps its offset under the cursor instead of jumping to it.
#[derive(Debug, Clone, Copy)]
pub struct Drag {
    grab: Point,
}

impl Drag {
    pub fn start(origin: Point, cursor: Point) -> Self {
        Self {
            grab: Point::new(cursor.x - origin.x, cursor.y - origin.y),
        }
    }

    /// New card position for the current cursor, clamped to the canvas origin.
    pub fn position(&self, cursor: Point) -> Point {
        Point::new(
            (cursor.x - self.grab.x).max(0.0),
            (cursor.y - self.grab.y).max(0.0),
        )
    }
}

const ZOOM_STEP: f64 = 1.2;
const ZOOM_MIN: f64 = 0.25;
const ZOOM_MAX: f64 = 4.0;

/// Pan/zoom state of the visible canvas region. `offset` is the canvas point
/// shown at the view origin (the scroll position).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub offset: Point,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Point::default(),
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn to_view(&self, canvas: Point) -> Point {
        Point::new(
            (canvas.x - self.offset.x) * self.zoom,
            (canvas.y - self.offset.y) * self.zoom,
        )
    }

    pub fn to_canvas(&self, view: Point) -> Point {
        Point::new(
            view.x / self.zoom + self.offset.x,
            view.y / self.zoom + self.offset.y,
        )
    }

    /// Pan by a view-space delta (e.g. a mouse drag on empty canvas).
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset.x += dx / self.zoom;
        self.offset.y += dy / self.zoom;
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * ZOOM_STEP).clamp(ZOOM_MIN, ZOOM_MAX);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / ZOOM_STEP).clamp(ZOOM_MIN, ZOOM_MAX);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Scaled-down overview transform: maps canvas content bounds onto a fixed
/// minimap area with a uniform scale.
#[derive(Debug, Clone, Copy)]
pub struct Minimap {
    bounds: Rect,
    scale: f64,
}

impl Minimap {
    pub fn new(content_bounds: Rect, size: Size) -> Self {
        let sx = if content_bounds.width > 0.0 {
            size.width / content_bounds.width
        } else {
            1.0
        };
        let sy = if content_bounds.height > 0.0 {
            size.height / content_bounds.height
        } else {
            1.0
        };
        Self {
            bounds: content_bounds,
            scale: sx.min(sy),
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn to_minimap(&self, canvas: Point) -> Point {
        Point::new(
            (canvas.x - self.bounds.x) * self.scale,
            (canvas.y - self.bounds.y) * self.scale,
        )
    }

    /// Canvas point for a click on the minimap, used to center the viewport.
    pub fn to_canvas(&self, minimap: Point) -> Point {
        Point::new(
            minimap.x / self.scale + self.bounds.x,
            minimap.y / self.scale + self.bounds.y,
        )
    }
}

/// Scroll delta that keeps a dragged card in view: once the card comes within
/// `margin` of a viewport edge, scroll by `step` on that axis.
pub fn autoscroll(view: &Rect, item: &Rect, margin: f64, step: f64) -> (f64, f64) {
    let mut dx = 0.0;
    let mut dy = 0.0;
    if item.right() > view.right() - margin {
        dx += step;
    }
    if item.left() < view.left() + margin {
        dx -= step;
    }
    if item.bottom() > view.bottom() - margin {
        dy += step;
    }
    if item.top() < view.top() + margin {
        dy -= step;
    }
    (dx, dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_point_sides() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(anchor_point(&r, Side::Top, 0.5), Point::new(60.0, 20.0));
        assert_eq!(anchor_point(&r, Side::Right, 0.5), Point::new(110.0, 45.0));
        assert_eq!(anchor_point(&r, Side::Bottom, 0.0), Point::new(10.0, 70.0));
        assert_eq!(anchor_point(&r, Side::Left, 1.0), Point::new(10.0, 70.0));
    }

    #[test]
    fn test_anchor_offset_clamped() {
        let r = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(anchor_point(&r, Side::Top, 2.0), Point::new(100.0, 0.0));
        assert_eq!(anchor_point(&r, Side::Top, -1.0), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_snap_to_nearest_edge() {
        let r = Rect::new(0.0, 0.0, 100.0, 50.0);

        let (side, offset) = snap_to_edge(&r, Point::new(50.0, -10.0));
        assert_eq!(side, Side::Top);
        assert!((offset - 0.5).abs() < 1e-9);

        let (side, offset) = snap_to_edge(&r, Point::new(120.0, 25.0));
        assert_eq!(side, Side::Right);
        assert!((offset - 0.5).abs() < 1e-9);

        let (side, _) = snap_to_edge(&r, Point::new(50.0, 49.0));
        assert_eq!(side, Side::Bottom);

        let (side, offset) = snap_to_edge(&r, Point::new(2.0, 40.0));
        assert_eq!(side, Side::Left);
        assert!((offset - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_snap_offset_clamped() {
        let r = Rect::new(0.0, 0.0, 100.0, 50.0);
        // Below the bottom-right corner: right edge wins, fraction clamps to 1
        let (side, offset) = snap_to_edge(&r, Point::new(120.0, 80.0));
        assert_eq!(side, Side::Right);
        assert_eq!(offset, 1.0);
    }

    #[test]
    fn test_drag_keeps_grab_offset() {
        let drag = Drag::start(Point::new(100.0, 100.0), Point::new(130.0, 110.0));
        let pos = drag.position(Point::new(230.0, 210.0));
        assert_eq!(pos, Point::new(200.0, 200.0));
    }

    #[test]
    fn test_drag_clamps_to_origin() {
        let drag = Drag::start(Point::new(10.0, 10.0), Point::new(15.0, 15.0));
        let pos = drag.position(Point::new(0.0, 0.0));
        assert_eq!(pos, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_viewport_round_trip() {
        let mut vp = Viewport::default();
        vp.pan(100.0, 50.0);
        vp.zoom_in();
        let p = Point::new(314.0, 159.0);
        let back = vp.to_canvas(vp.to_view(p));
        assert!((back.x - p.x).abs() < 1e-9);
        assert!((back.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn test_viewport_zoom_clamped() {
        let mut vp = Viewport::default();
        for _ in 0..30 {
            vp.zoom_in();
        }
        assert_eq!(vp.zoom, 4.0);
        for _ in 0..60 {
            vp.zoom_out();
        }
        assert_eq!(vp.zoom, 0.25);
        vp.reset();
        assert_eq!(vp.zoom, 1.0);
    }

    #[test]
    fn test_minimap_uniform_scale() {
        let bounds = Rect::new(0.0, 0.0, 2000.0, 1000.0);
        let mm = Minimap::new(bounds, Size::new(200.0, 200.0));
        // Width is the limiting axis
        assert!((mm.scale() - 0.1).abs() < 1e-9);

        let p = mm.to_minimap(Point::new(1000.0, 500.0));
        assert_eq!(p, Point::new(100.0, 50.0));
        let back = mm.to_canvas(p);
        assert_eq!(back, Point::new(1000.0, 500.0));
    }

    #[test]
    fn test_bounding() {
        let rects = vec![
            Rect::new(10.0, 10.0, 20.0, 20.0),
            Rect::new(100.0, 50.0, 30.0, 10.0),
        ];
        let b = bounding(rects).unwrap();
        assert_eq!(b, Rect::new(10.0, 10.0, 120.0, 50.0));
        assert!(bounding(Vec::new()).is_none());
    }

    #[test]
    fn test_autoscroll_near_edges() {
        let view = Rect::new(0.0, 0.0, 800.0, 600.0);
        // Card close to the right edge scrolls right
        let item = Rect::new(720.0, 200.0, 60.0, 80.0);
        assert_eq!(autoscroll(&view, &item, 50.0, 10.0), (10.0, 0.0));
        // Card in the middle does not scroll
        let item = Rect::new(300.0, 200.0, 60.0, 80.0);
        assert_eq!(autoscroll(&view, &item, 50.0, 10.0), (0.0, 0.0));
        // Top-left corner scrolls both axes
        let item = Rect::new(10.0, 10.0, 60.0, 80.0);
        assert_eq!(autoscroll(&view, &item, 50.0, 10.0), (-10.0, -10.0));
    }
}
