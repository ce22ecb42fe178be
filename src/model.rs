//! Data model for schema projects: tables, typed columns, relationships and
//! memos. Field names and defaults match the JSON blob the browser tool keeps
//! in local storage, so existing projects load unchanged.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Side, Size};

/// Default accent color for new tables and relationships.
pub const DEFAULT_COLOR: &str = "#3B9797";
/// Default sticky-note color for new memos.
pub const MEMO_COLOR: &str = "#FFF9C4";

pub const MEMO_DEFAULT_SIZE: Size = Size {
    width: 200.0,
    height: 150.0,
};
pub const MEMO_MIN_SIZE: Size = Size {
    width: 120.0,
    height: 80.0,
};

/// A saved schema project. Projects are keyed by a slug derived from the name;
/// the whole object is (de)serialized as one blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub memos: Vec<Memo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: String,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    pub position: Point,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
    #[serde(default)]
    pub length: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(rename = "defaultType", default)]
    pub default_kind: DefaultKind,
    #[serde(default)]
    pub default_value: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub is_foreign_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_table_id: Option<String>,
}

impl Column {
    /// A plain column with the tool's defaults: nullable, no length, no
    /// default value, no comment.
    pub fn new(name: &str, ty: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            length: String::new(),
            nullable: true,
            auto_increment: false,
            primary_key: false,
            default_kind: DefaultKind::None,
            default_value: String::new(),
            comment: String::new(),
            is_foreign_key: false,
            foreign_key_color: None,
            referenced_table_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Int,
    Varchar,
    Text,
    Date,
    DateTime,
    Boolean,
    Float,
    Decimal,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Int => "INT",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Text => "TEXT",
            ColumnType::Date => "DATE",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Float => "FLOAT",
            ColumnType::Decimal => "DECIMAL",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DefaultKind {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "defined")]
    Defined,
    #[serde(rename = "NULL")]
    Null,
    #[serde(rename = "CURRENT_TIMESTAMP")]
    CurrentTimestamp,
}

/// A typed association between two tables, drawn as a connector line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub from_table_id: String,
    pub to_table_id: String,
    #[serde(rename = "type")]
    pub kind: RelationKind,
    #[serde(default = "default_color")]
    pub color: String,
    /// Name of the synthesized foreign-key column.
    pub fk_column_name: String,
    /// Table the foreign-key column lives on (the many side).
    pub target_table_id: String,
    /// Table the foreign key points at.
    pub referenced_table_id: String,
    #[serde(default = "default_from_point")]
    pub from_point: Endpoint,
    #[serde(default = "default_to_point")]
    pub to_point: Endpoint,
    /// User-added orthogonal waypoints between the endpoints.
    #[serde(default)]
    pub corners: Vec<Point>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationKind {
    #[serde(rename = "1:1")]
    OneToOne,
    #[serde(rename = "1:N")]
    OneToMany,
    #[serde(rename = "N:1")]
    ManyToOne,
    #[serde(rename = "M:N")]
    ManyToMany,
}

impl RelationKind {
    /// Whether the foreign-key column lands on the source table. Only N:1 puts
    /// the many side at the source; every other kind targets the destination.
    pub fn fk_on_source(&self) -> bool {
        matches!(self, RelationKind::ManyToOne)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelationKind::OneToOne => "1:1",
            RelationKind::OneToMany => "1:N",
            RelationKind::ManyToOne => "N:1",
            RelationKind::ManyToMany => "M:N",
        };
        f.write_str(s)
    }
}

/// Where a connector end is: clipped to a table edge (side plus 0..1 offset
/// along it), or detached at a free canvas point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Endpoint {
    Attached { side: Side, offset: f64 },
    Free { x: f64, y: f64 },
}

impl Endpoint {
    pub fn attached(side: Side, offset: f64) -> Self {
        Endpoint::Attached { side, offset }
    }
}

/// Which end of a relationship an endpoint operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelEnd {
    From,
    To,
}

/// A free-floating rich-text sticky note.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memo {
    pub id: String,
    pub content: String,
    pub position: Point,
    pub size: Size,
    #[serde(default = "default_memo_color")]
    pub color: String,
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_memo_color() -> String {
    MEMO_COLOR.to_string()
}

fn default_true() -> bool {
    true
}

pub(crate) fn default_from_point() -> Endpoint {
    Endpoint::attached(Side::Right, 0.5)
}

pub(crate) fn default_to_point() -> Endpoint {
    Endpoint::attached(Side::Left, 0.5)
}

#[cfg(target_arch = "wasm32")]
fn now_millis() -> i64 {
    js_sys::Date::now() as i64
}

#[cfg(not(target_arch = "wasm32"))]
fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current time, from the JS clock under wasm.
pub fn now() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(now_millis()).unwrap_or_default()
}

static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// Millisecond-timestamp id, nudged forward when two ids land in the same
/// millisecond. Practically unique within a project, not globally.
pub fn timestamp_id() -> String {
    let now = now_millis();
    let mut last = LAST_ID.load(Ordering::Relaxed);
    loop {
        let next = if now > last { now } else { last + 1 };
        match LAST_ID.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next.to_string(),
            Err(actual) => last = actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let a = timestamp_id();
        let b = timestamp_id();
        let c = timestamp_id();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert!(a.parse::<i64>().unwrap() < c.parse::<i64>().unwrap());
    }

    #[test]
    fn test_column_wire_names() {
        let col = Column::new("id", ColumnType::Int);
        let json = serde_json::to_value(&col).unwrap();
        assert_eq!(json["type"], "INT");
        assert_eq!(json["defaultType"], "none");
        assert_eq!(json["autoIncrement"], false);
        assert_eq!(json["isForeignKey"], false);
        // Absent FK metadata is omitted entirely
        assert!(json.get("foreignKeyColor").is_none());
    }

    #[test]
    fn test_relation_kind_wire_labels() {
        assert_eq!(
            serde_json::to_string(&RelationKind::OneToMany).unwrap(),
            "\"1:N\""
        );
        let kind: RelationKind = serde_json::from_str("\"M:N\"").unwrap();
        assert_eq!(kind, RelationKind::ManyToMany);
    }

    #[test]
    fn test_endpoint_untagged() {
        let attached: Endpoint = serde_json::from_str(r#"{"side":"right","offset":0.5}"#).unwrap();
        assert_eq!(attached, Endpoint::attached(Side::Right, 0.5));

        let free: Endpoint = serde_json::from_str(r#"{"x":10.0,"y":20.0}"#).unwrap();
        assert_eq!(free, Endpoint::Free { x: 10.0, y: 20.0 });
    }

    #[test]
    fn test_legacy_relationship_blob_loads() {
        // A relationship written before endpoints and corners existed
        let json = r##"{
            "id": "1700000000000",
            "fromTableId": "a",
            "toTableId": "b",
            "type": "1:N",
            "color": "#3B9797",
            "fkColumnName": "a_id",
            "targetTableId": "b",
            "referencedTableId": "a"
        }"##;
        let rel: Relationship = serde_json::from_str(json).unwrap();
        assert_eq!(rel.from_point, Endpoint::attached(Side::Right, 0.5));
        assert_eq!(rel.to_point, Endpoint::attached(Side::Left, 0.5));
        assert!(rel.corners.is_empty());
    }
}
