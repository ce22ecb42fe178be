//! Text metrics and card geometry. The host draws cards with a known font, so
//! a monospace approximation over unicode display widths is enough to put
//! anchors and connectors on the same rects the browser shows.

use unicode_width::UnicodeWidthStr;

use crate::geometry::{Rect, Size};
use crate::model::{Column, Table};

pub struct TextMetrics {
    pub char_width: f64,
    pub line_height: f64,
    pub padding_x: f64,
    pub padding_y: f64,
    pub header_height: f64,
    pub row_height: f64,
    pub min_card_width: f64,
    pub min_card_height: f64,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            line_height: 20.0,
            padding_x: 12.0,
            padding_y: 8.0,
            header_height: 44.0,
            row_height: 34.0,
            min_card_width: 220.0,
            min_card_height: 80.0,
        }
    }
}

impl TextMetrics {
    pub fn text_width(&self, text: &str) -> f64 {
        UnicodeWidthStr::width(text) as f64 * self.char_width
    }

    /// Size of a table card: header with the table name, one row per column.
    pub fn card_size(&self, table: &Table) -> Size {
        let header_width = self.text_width(&table.name);
        let max_row_width = table
            .columns
            .iter()
            .map(|c| self.text_width(&column_label(c)))
            .fold(0.0, f64::max);

        let content_width = header_width.max(max_row_width) + self.padding_x * 2.0;
        let width = content_width.max(self.min_card_width);

        let body_height = table.columns.len() as f64 * self.row_height + self.padding_y * 2.0;
        let height = (self.header_height + body_height).max(self.min_card_height);

        Size::new(width, height)
    }
}

/// Display label for a column row: name, type, optional length.
/// The marker column (PK/FK icon) is accounted for with a two-char prefix.
pub fn column_label(col: &Column) -> String {
    let mut label = format!("  {} {}", col.name, col.ty);
    if !col.length.is_empty() {
        label.push('(');
        label.push_str(&col.length);
        label.push(')');
    }
    label
}

/// Card rect for a table at its stored position.
pub fn card_rect(table: &Table, metrics: &TextMetrics) -> Rect {
    Rect::from_parts(table.position, metrics.card_size(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::model::ColumnType;

    fn table_with(columns: Vec<Column>) -> Table {
        Table {
            id: "1".to_string(),
            name: "users".to_string(),
            color: "#3B9797".to_string(),
            position: Point::new(100.0, 100.0),
            columns,
        }
    }

    #[test]
    fn test_card_grows_with_columns() {
        let m = TextMetrics::default();
        let one = table_with(vec![Column::new("id", ColumnType::Int)]);
        let three = table_with(vec![
            Column::new("id", ColumnType::Int),
            Column::new("name", ColumnType::Varchar),
            Column::new("email", ColumnType::Varchar),
        ]);
        let s1 = m.card_size(&one);
        let s3 = m.card_size(&three);
        assert!(s3.height > s1.height);
        assert_eq!(s3.height - s1.height, 2.0 * m.row_height);
    }

    #[test]
    fn test_card_width_tracks_longest_row() {
        let m = TextMetrics::default();
        let mut long = Column::new("a_very_long_column_name_indeed", ColumnType::Varchar);
        long.length = "255".to_string();
        let t = table_with(vec![long]);
        let s = m.card_size(&t);
        assert!(s.width > m.min_card_width);
    }

    #[test]
    fn test_unicode_names_measured_wide() {
        let m = TextMetrics::default();
        // Full-width characters count double
        assert_eq!(m.text_width("ユーザー"), 8.0 * m.char_width);
    }

    #[test]
    fn test_column_label_includes_length() {
        let mut col = Column::new("name", ColumnType::Varchar);
        col.length = "120".to_string();
        assert_eq!(column_label(&col), "  name VARCHAR(120)");
    }

    #[test]
    fn test_card_rect_at_position() {
        let m = TextMetrics::default();
        let t = table_with(vec![Column::new("id", ColumnType::Int)]);
        let r = card_rect(&t, &m);
        assert_eq!(r.x, 100.0);
        assert_eq!(r.y, 100.0);
        assert!(r.width >= m.min_card_width);
    }
}
