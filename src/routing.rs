//! Orthogonal connector routing. Endpoints resolve against the measured table
//! card rects, overlapping default anchors fan out along their shared edge,
//! and paths bend at right angles through the user's waypoints.

use std::collections::HashMap;

use serde::Serialize;

use crate::geometry::{Point, Rect, Side, anchor_point};
use crate::measure::{TextMetrics, card_rect};
use crate::model::{Endpoint, Project, Relationship};

/// How close the cursor must be to a table card for a dragged endpoint to
/// clip onto its edge instead of floating free.
pub const SNAP_RADIUS: f64 = 40.0;

const EPS: f64 = 0.5;

/// A resolved connector: orthogonal waypoints from the source anchor to the
/// target anchor, first and last point included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedConnector {
    pub relationship_id: String,
    pub points: Vec<Point>,
}

/// Route every relationship in the project. Connectors whose attached table no
/// longer exists are skipped, as the original renderer did.
pub fn route_connectors(project: &Project, metrics: &TextMetrics) -> Vec<RoutedConnector> {
    let rects: HashMap<&str, Rect> = project
        .tables
        .iter()
        .map(|t| (t.id.as_str(), card_rect(t, metrics)))
        .collect();

    let spread = fan_out(project);

    project
        .relationships
        .iter()
        .filter_map(|rel| {
            let from = resolve(rel, true, &rects, &spread)?;
            let to = resolve(rel, false, &rects, &spread)?;

            let mut path = Vec::with_capacity(rel.corners.len() + 2);
            path.push(from);
            path.extend(rel.corners.iter().copied());
            path.push(to);

            Some(RoutedConnector {
                relationship_id: rel.id.clone(),
                points: orthogonalize(&path),
            })
        })
        .collect()
}

/// Evenly spread the endpoints that still sit at the default 0.5 offset on a
/// shared (table, side): the i-th of n gets (i+1)/(n+1), ordered by
/// relationship id. A lone endpoint stays in the middle; user-dragged offsets
/// are never touched.
fn fan_out(project: &Project) -> HashMap<(String, bool), f64> {
    let mut groups: HashMap<(&str, Side), Vec<(&str, bool)>> = HashMap::new();

    for rel in &project.relationships {
        for (is_from, table_id, endpoint) in [
            (true, rel.from_table_id.as_str(), rel.from_point),
            (false, rel.to_table_id.as_str(), rel.to_point),
        ] {
            if let Endpoint::Attached { side, offset } = endpoint {
                if (offset - 0.5).abs() < 1e-9 {
                    groups
                        .entry((table_id, side))
                        .or_default()
                        .push((rel.id.as_str(), is_from));
                }
            }
        }
    }

    let mut offsets = HashMap::new();
    for ends in groups.values_mut() {
        ends.sort();
        let n = ends.len();
        for (i, (rel_id, is_from)) in ends.iter().enumerate() {
            let offset = (i + 1) as f64 / (n + 1) as f64;
            offsets.insert((rel_id.to_string(), *is_from), offset);
        }
    }
    offsets
}

fn resolve(
    rel: &Relationship,
    is_from: bool,
    rects: &HashMap<&str, Rect>,
    spread: &HashMap<(String, bool), f64>,
) -> Option<Point> {
    let (table_id, endpoint) = if is_from {
        (rel.from_table_id.as_str(), rel.from_point)
    } else {
        (rel.to_table_id.as_str(), rel.to_point)
    };

    match endpoint {
        Endpoint::Attached { side, offset } => {
            let rect = rects.get(table_id)?;
            let offset = spread
                .get(&(rel.id.clone(), is_from))
                .copied()
                .unwrap_or(offset);
            Some(anchor_point(rect, side, offset))
        }
        Endpoint::Free { x, y } => Some(Point::new(x, y)),
    }
}

/// Make every segment axis-aligned: consecutive points sharing an axis pass
/// through unchanged, all others bend twice at the vertical midline between
/// them. Consecutive duplicates collapse.
pub fn orthogonalize(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if let Some(&prev) = out.last() {
            let dx = (prev.x - p.x).abs();
            let dy = (prev.y - p.y).abs();
            if dx < EPS && dy < EPS {
                continue;
            }
            if dx >= EPS && dy >= EPS {
                let mx = (prev.x + p.x) / 2.0;
                out.push(Point::new(mx, prev.y));
                out.push(Point::new(mx, p.y));
            }
        }
        out.push(p);
    }
    out
}

/// Point halfway along the polyline, by arc length. Badge anchor.
pub fn path_midpoint(points: &[Point]) -> Option<Point> {
    let first = *points.first()?;
    if points.len() == 1 {
        return Some(first);
    }

    let total: f64 = points.windows(2).map(|w| length(w[0], w[1])).sum();
    if total == 0.0 {
        return Some(first);
    }

    let mut remaining = total / 2.0;
    for w in points.windows(2) {
        let seg = length(w[0], w[1]);
        if seg >= remaining {
            let t = remaining / seg;
            return Some(Point::new(
                w[0].x + (w[1].x - w[0].x) * t,
                w[0].y + (w[1].y - w[0].y) * t,
            ));
        }
        remaining -= seg;
    }
    Some(*points.last()?)
}

/// Index and distance of the path segment closest to `p`, for inserting a
/// corner where the user clicked.
pub fn nearest_segment(points: &[Point], p: Point) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, w) in points.windows(2).enumerate() {
        let d = segment_distance(w[0], w[1], p);
        if best.is_none_or(|(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best
}

/// Whether `p` lies within `tolerance` of the path. Line hit-testing.
pub fn point_near_path(points: &[Point], p: Point, tolerance: f64) -> bool {
    nearest_segment(points, p).is_some_and(|(_, d)| d <= tolerance)
}

fn length(a: Point, b: Point) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

fn segment_distance(a: Point, b: Point, p: Point) -> f64 {
    let len_sq = (b.x - a.x).powi(2) + (b.y - a.y).powi(2);
    if len_sq == 0.0 {
        return length(a, p);
    }
    let t = (((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t);
    length(proj, p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{self, Column, ColumnType, RelationKind, Table};

    fn table(id: &str, name: &str, x: f64, y: f64) -> Table {
        Table {
            id: id.to_string(),
            name: name.to_string(),
            color: model::DEFAULT_COLOR.to_string(),
            position: Point::new(x, y),
            columns: vec![Column::new("id", ColumnType::Int)],
        }
    }

    fn relationship(id: &str, from: &str, to: &str) -> Relationship {
        Relationship {
            id: id.to_string(),
            from_table_id: from.to_string(),
            to_table_id: to.to_string(),
            kind: RelationKind::OneToMany,
            color: model::DEFAULT_COLOR.to_string(),
            fk_column_name: "x_id".to_string(),
            target_table_id: to.to_string(),
            referenced_table_id: from.to_string(),
            from_point: model::default_from_point(),
            to_point: model::default_to_point(),
            corners: Vec::new(),
        }
    }

    fn project(tables: Vec<Table>, relationships: Vec<Relationship>) -> Project {
        Project {
            key: "p".to_string(),
            name: "P".to_string(),
            description: String::new(),
            created_at: model::now(),
            updated_at: model::now(),
            tables,
            relationships,
            memos: Vec::new(),
        }
    }

    #[test]
    fn test_default_route_is_orthogonal() {
        let metrics = TextMetrics::default();
        let p = project(
            vec![table("a", "A", 0.0, 0.0), table("b", "B", 600.0, 300.0)],
            vec![relationship("1", "a", "b")],
        );
        let routes = route_connectors(&p, &metrics);
        assert_eq!(routes.len(), 1);

        let points = &routes[0].points;
        let rect_a = card_rect(&p.tables[0], &metrics);
        let rect_b = card_rect(&p.tables[1], &metrics);
        assert_eq!(points[0], anchor_point(&rect_a, Side::Right, 0.5));
        assert_eq!(
            *points.last().unwrap(),
            anchor_point(&rect_b, Side::Left, 0.5)
        );
        // Every segment is axis-aligned
        for w in points.windows(2) {
            assert!(
                (w[0].x - w[1].x).abs() < EPS || (w[0].y - w[1].y).abs() < EPS,
                "diagonal segment {w:?}"
            );
        }
    }

    #[test]
    fn test_corners_appear_on_path() {
        let metrics = TextMetrics::default();
        let mut rel = relationship("1", "a", "b");
        rel.corners = vec![Point::new(400.0, 50.0)];
        let p = project(
            vec![table("a", "A", 0.0, 0.0), table("b", "B", 600.0, 300.0)],
            vec![rel],
        );
        let routes = route_connectors(&p, &metrics);
        assert!(routes[0].points.contains(&Point::new(400.0, 50.0)));
    }

    #[test]
    fn test_free_endpoint_used_verbatim() {
        let metrics = TextMetrics::default();
        let mut rel = relationship("1", "a", "b");
        rel.to_point = Endpoint::Free { x: 900.0, y: 42.0 };
        let p = project(
            vec![table("a", "A", 0.0, 0.0), table("b", "B", 600.0, 300.0)],
            vec![rel],
        );
        let routes = route_connectors(&p, &metrics);
        assert_eq!(*routes[0].points.last().unwrap(), Point::new(900.0, 42.0));
    }

    #[test]
    fn test_missing_table_skips_connector() {
        let metrics = TextMetrics::default();
        let p = project(
            vec![table("a", "A", 0.0, 0.0)],
            vec![relationship("1", "a", "ghost")],
        );
        assert!(route_connectors(&p, &metrics).is_empty());
    }

    #[test]
    fn test_overlapping_anchors_fan_out() {
        let metrics = TextMetrics::default();
        // Two connectors leaving A's right edge at the default offset
        let p = project(
            vec![
                table("a", "A", 0.0, 0.0),
                table("b", "B", 600.0, 0.0),
                table("c", "C", 600.0, 400.0),
            ],
            vec![relationship("1", "a", "b"), relationship("2", "a", "c")],
        );
        let routes = route_connectors(&p, &metrics);
        let rect_a = card_rect(&p.tables[0], &metrics);

        let y1 = routes[0].points[0].y;
        let y2 = routes[1].points[0].y;
        assert!((y1 - (rect_a.y + rect_a.height / 3.0)).abs() < 1e-6);
        assert!((y2 - (rect_a.y + rect_a.height * 2.0 / 3.0)).abs() < 1e-6);
    }

    #[test]
    fn test_user_offset_not_spread() {
        let metrics = TextMetrics::default();
        let mut custom = relationship("1", "a", "b");
        custom.from_point = Endpoint::attached(Side::Right, 0.9);
        let p = project(
            vec![
                table("a", "A", 0.0, 0.0),
                table("b", "B", 600.0, 0.0),
                table("c", "C", 600.0, 400.0),
            ],
            vec![custom, relationship("2", "a", "c")],
        );
        let routes = route_connectors(&p, &metrics);
        let rect_a = card_rect(&p.tables[0], &metrics);

        // The dragged endpoint keeps 0.9, the remaining default one stays centered
        assert!((routes[0].points[0].y - (rect_a.y + rect_a.height * 0.9)).abs() < 1e-6);
        assert!((routes[1].points[0].y - (rect_a.y + rect_a.height * 0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonalize_inserts_midline_bend() {
        let path = orthogonalize(&[Point::new(0.0, 0.0), Point::new(100.0, 50.0)]);
        assert_eq!(
            path,
            vec![
                Point::new(0.0, 0.0),
                Point::new(50.0, 0.0),
                Point::new(50.0, 50.0),
                Point::new(100.0, 50.0),
            ]
        );
    }

    #[test]
    fn test_orthogonalize_keeps_aligned_points() {
        let input = vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 80.0),
        ];
        assert_eq!(orthogonalize(&input), input);
    }

    #[test]
    fn test_orthogonalize_collapses_duplicates() {
        let path = orthogonalize(&[
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 50.0),
        ]);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_path_midpoint_by_arc_length() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
        ];
        assert_eq!(path_midpoint(&points), Some(Point::new(100.0, 0.0)));
        assert_eq!(path_midpoint(&[]), None);
        assert_eq!(
            path_midpoint(&[Point::new(5.0, 5.0)]),
            Some(Point::new(5.0, 5.0))
        );
    }

    #[test]
    fn test_nearest_segment_and_hit_test() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
        ];
        let (idx, dist) = nearest_segment(&points, Point::new(50.0, 8.0)).unwrap();
        assert_eq!(idx, 0);
        assert!((dist - 8.0).abs() < 1e-9);

        let (idx, _) = nearest_segment(&points, Point::new(95.0, 60.0)).unwrap();
        assert_eq!(idx, 1);

        assert!(point_near_path(&points, Point::new(50.0, 4.0), 5.0));
        assert!(!point_near_path(&points, Point::new(50.0, 40.0), 5.0));
    }
}
