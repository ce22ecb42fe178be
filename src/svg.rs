//! Full-redraw SVG renderer: the whole scene is regenerated from the model on
//! every call, no diffing. Output is a standalone SVG document.

use std::fmt::Write;

use crate::geometry::{Rect, bounding};
use crate::measure::{TextMetrics, card_rect};
use crate::model::{Memo, Project, Relationship, Table};
use crate::routing::{RoutedConnector, path_midpoint, route_connectors};

const CANVAS_MARGIN: f64 = 40.0;

pub struct SvgRenderer {
    metrics: TextMetrics,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            metrics: TextMetrics::default(),
        }
    }
}

impl SvgRenderer {
    pub fn render(&self, project: &Project) -> String {
        let routes = route_connectors(project, &self.metrics);
        let bounds = self.content_bounds(project, &routes);

        let mut svg = String::new();
        writeln!(
            &mut svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="{} {} {} {}">"#,
            bounds.width, bounds.height, bounds.x, bounds.y, bounds.width, bounds.height
        )
        .unwrap();

        writeln!(
            &mut svg,
            r#"<style>
  .card-bg {{ fill: #fff; stroke: #d5d5d5; stroke-width: 1; }}
  .card-name {{ font-family: monospace; font-size: 14px; font-weight: bold; fill: #fff; }}
  .column-text {{ font-family: monospace; font-size: 12px; fill: #333; }}
  .pk {{ font-weight: bold; }}
  .fk {{ font-style: italic; }}
  .memo-bg {{ stroke: rgba(0,0,0,0.15); stroke-width: 1; }}
  .memo-text {{ font-family: sans-serif; font-size: 12px; fill: #444; }}
  .badge-text {{ font-family: monospace; font-size: 11px; font-weight: bold; }}
</style>"#
        )
        .unwrap();

        // Memos sit behind everything, connectors above the cards, as the
        // original overlay stacking did.
        for memo in &project.memos {
            self.render_memo(&mut svg, memo);
        }
        for table in &project.tables {
            self.render_table(&mut svg, table);
        }
        for route in &routes {
            if let Some(rel) = project
                .relationships
                .iter()
                .find(|r| r.id == route.relationship_id)
            {
                render_connector(&mut svg, rel, route);
            }
        }

        writeln!(&mut svg, "</svg>").unwrap();
        svg
    }

    fn content_bounds(&self, project: &Project, routes: &[RoutedConnector]) -> Rect {
        let card_rects = project.tables.iter().map(|t| card_rect(t, &self.metrics));
        let memo_rects = project
            .memos
            .iter()
            .map(|m| Rect::from_parts(m.position, m.size));
        let route_rects = routes
            .iter()
            .flat_map(|r| r.points.iter())
            .map(|p| Rect::new(p.x, p.y, 0.0, 0.0));

        bounding(card_rects.chain(memo_rects).chain(route_rects))
            .map(|b| b.expand(CANVAS_MARGIN))
            .unwrap_or(Rect::new(0.0, 0.0, 800.0, 600.0))
    }

    fn render_table(&self, svg: &mut String, table: &Table) {
        let rect = card_rect(table, &self.metrics);
        let m = &self.metrics;
        let color = escape_xml(&table.color);

        writeln!(
            svg,
            r#"<rect class="card-bg" x="{}" y="{}" width="{}" height="{}" rx="8" />"#,
            rect.x, rect.y, rect.width, rect.height
        )
        .unwrap();

        // Header with square bottom corners
        writeln!(
            svg,
            r#"<rect x="{}" y="{}" width="{}" height="{}" rx="8" fill="{}" />"#,
            rect.x, rect.y, rect.width, m.header_height, color
        )
        .unwrap();
        writeln!(
            svg,
            r#"<rect x="{}" y="{}" width="{}" height="8" fill="{}" />"#,
            rect.x,
            rect.y + m.header_height - 8.0,
            rect.width,
            color
        )
        .unwrap();

        writeln!(
            svg,
            r#"<text class="card-name" x="{}" y="{}" text-anchor="middle">{}</text>"#,
            rect.x + rect.width / 2.0,
            rect.y + m.header_height / 2.0 + 5.0,
            escape_xml(&table.name)
        )
        .unwrap();

        let mut row_y = rect.y + m.header_height + m.padding_y + m.row_height * 0.6;
        for col in &table.columns {
            let mut class = "column-text".to_string();
            if col.primary_key {
                class.push_str(" pk");
            }
            if col.is_foreign_key {
                class.push_str(" fk");
            }

            let marker = if col.primary_key {
                "◆ "
            } else if col.is_foreign_key {
                "⚷ "
            } else {
                "  "
            };
            let mut label = format!("{marker}{} {}", col.name, col.ty);
            if !col.length.is_empty() {
                label.push('(');
                label.push_str(&col.length);
                label.push(')');
            }

            let tint = col
                .is_foreign_key
                .then(|| col.foreign_key_color.as_deref())
                .flatten()
                .map(|c| format!(r#" fill="{}""#, escape_xml(c)))
                .unwrap_or_default();

            writeln!(
                svg,
                r#"<text class="{}" x="{}" y="{}"{}>{}</text>"#,
                class,
                rect.x + m.padding_x,
                row_y,
                tint,
                escape_xml(&label)
            )
            .unwrap();
            row_y += m.row_height;
        }
    }

    fn render_memo(&self, svg: &mut String, memo: &Memo) {
        let rect = Rect::from_parts(memo.position, memo.size);
        let m = &self.metrics;

        writeln!(
            svg,
            r#"<rect class="memo-bg" x="{}" y="{}" width="{}" height="{}" rx="6" fill="{}" />"#,
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            escape_xml(&memo.color)
        )
        .unwrap();

        let max_chars = ((rect.width - m.padding_x * 2.0) / m.char_width).max(1.0) as usize;
        let max_lines = ((rect.height - m.padding_y * 2.0) / m.line_height).max(1.0) as usize;
        let text = strip_tags(&memo.content);

        let mut line_y = rect.y + m.padding_y + m.line_height * 0.7;
        for line in wrap_text(&text, max_chars).into_iter().take(max_lines) {
            writeln!(
                svg,
                r#"<text class="memo-text" x="{}" y="{}">{}</text>"#,
                rect.x + m.padding_x,
                line_y,
                escape_xml(&line)
            )
            .unwrap();
            line_y += m.line_height;
        }
    }
}

fn render_connector(svg: &mut String, rel: &Relationship, route: &RoutedConnector) {
    let color = escape_xml(&rel.color);

    let points: String = route
        .points
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(
        svg,
        r#"<polyline points="{points}" fill="none" stroke="{color}" stroke-width="3" stroke-dasharray="8,5" />"#,
    )
    .unwrap();

    // Endpoint handles
    for p in [route.points.first(), route.points.last()]
        .into_iter()
        .flatten()
    {
        writeln!(
            svg,
            r##"<circle cx="{}" cy="{}" r="6" fill="{color}" stroke="#fff" stroke-width="2" />"##,
            p.x, p.y
        )
        .unwrap();
    }

    // Kind badge at the path midpoint
    if let Some(mid) = path_midpoint(&route.points) {
        writeln!(
            svg,
            r##"<circle cx="{}" cy="{}" r="18" fill="#fff" stroke="{color}" stroke-width="2" />"##,
            mid.x, mid.y
        )
        .unwrap();
        writeln!(
            svg,
            r#"<text class="badge-text" x="{}" y="{}" text-anchor="middle" dominant-baseline="middle" fill="{color}">{}</text>"#,
            mid.x, mid.y, rel.kind
        )
        .unwrap();
    }
}

/// Drop markup from rich-text memo content; `<br>`, `</p>` and `</div>`
/// become line breaks.
fn strip_tags(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut tag = None::<String>;
    for c in content.chars() {
        match (&mut tag, c) {
            (None, '<') => tag = Some(String::new()),
            (None, _) => out.push(c),
            (Some(t), '>') => {
                let name = t.trim_end_matches('/').trim().to_ascii_lowercase();
                if matches!(name.as_str(), "br" | "/p" | "/div") && !out.ends_with('\n') {
                    out.push('\n');
                }
                tag = None;
            }
            (Some(t), _) => t.push(c),
        }
    }
    out.trim_end_matches('\n').to_string()
}

/// Greedy word wrap by display width, preserving explicit line breaks.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    use unicode_width::UnicodeWidthStr;

    let mut lines = Vec::new();
    for raw in text.lines() {
        let mut line = String::new();
        for word in raw.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if UnicodeWidthStr::width(candidate.as_str()) <= max_chars || line.is_empty() {
                line = candidate;
            } else {
                lines.push(line);
                line = word.to_string();
            }
        }
        lines.push(line);
    }
    lines
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::model::{Column, ColumnType, RelationKind};
    use crate::store::MemoryStore;
    use crate::workspace::Workspace;

    fn sample_workspace() -> Workspace<MemoryStore> {
        let mut cat = Catalog::new(MemoryStore::new());
        let key = cat.create("Shop", "").unwrap().key;
        let mut ws = cat.open(&key).unwrap();

        let users = ws
            .add_table("Users", vec![Column::new("id", ColumnType::Int)])
            .unwrap();
        let orders = ws
            .add_table("Orders", vec![Column::new("id", ColumnType::Int)])
            .unwrap();
        ws.create_relationship(&users, &orders, RelationKind::OneToMany, "#FF5722")
            .unwrap();
        ws.add_memo("remember the <b>indexes</b>").unwrap();
        ws
    }

    #[test]
    fn test_render_full_scene() {
        let ws = sample_workspace();
        let svg = SvgRenderer::default().render(ws.project());

        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("Users"));
        assert!(svg.contains("Orders"));
        assert!(svg.contains("<polyline"));
        assert!(svg.contains("1:N"));
        assert!(svg.contains("#FF5722"));
        // Memo markup is stripped, content kept
        assert!(svg.contains("remember the indexes"));
        assert!(!svg.contains("<b>"));
    }

    #[test]
    fn test_render_empty_project_default_canvas() {
        let mut cat = Catalog::new(MemoryStore::new());
        let key = cat.create("Empty", "").unwrap().key;
        let ws = cat.open(&key).unwrap();
        let svg = SvgRenderer::default().render(ws.project());
        assert!(svg.contains(r#"viewBox="0 0 800 600""#));
    }

    #[test]
    fn test_render_escapes_names() {
        let mut cat = Catalog::new(MemoryStore::new());
        let key = cat.create("X", "").unwrap().key;
        let mut ws = cat.open(&key).unwrap();
        ws.add_table("a<b>&c", vec![Column::new("id", ColumnType::Int)])
            .unwrap();

        let svg = SvgRenderer::default().render(ws.project());
        assert!(svg.contains("a&lt;b&gt;&amp;c"));
    }

    #[test]
    fn test_deterministic_output() {
        let ws = sample_workspace();
        let renderer = SvgRenderer::default();
        assert_eq!(renderer.render(ws.project()), renderer.render(ws.project()));
    }

    #[test]
    fn test_strip_tags_breaks_lines() {
        assert_eq!(strip_tags("a<br>b"), "a\nb");
        assert_eq!(strip_tags("<p>one</p><p>two</p>"), "one\ntwo");
        assert_eq!(strip_tags("plain"), "plain");
    }

    #[test]
    fn test_wrap_text_by_width() {
        let lines = wrap_text("alpha beta gamma", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma"]);
        // A single overlong word is kept on its own line
        let lines = wrap_text("supercalifragilistic", 5);
        assert_eq!(lines, vec!["supercalifragilistic"]);
    }
}
