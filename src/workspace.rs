//! In-memory working state of one opened project. Every mutation writes the
//! whole project back through the catalog blob. No partial writes, last
//! write wins.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::Error;
use crate::geometry::{Point, Size, snap_to_edge};
use crate::measure::{TextMetrics, card_rect};
use crate::model::{
    self, Column, ColumnType, DefaultKind, Endpoint, Memo, Project, RelEnd, RelationKind,
    Relationship, Table,
};
use crate::routing::SNAP_RADIUS;
use crate::store::KeyValueStore;

/// An opened project plus the catalog it persists through.
pub struct Workspace<S: KeyValueStore> {
    catalog: Catalog<S>,
    project: Project,
    metrics: TextMetrics,
}

/// Partial column update; unset fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnPatch {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: Option<ColumnType>,
    pub length: Option<String>,
    pub nullable: Option<bool>,
    pub auto_increment: Option<bool>,
    pub primary_key: Option<bool>,
    #[serde(rename = "defaultType")]
    pub default_kind: Option<DefaultKind>,
    pub default_value: Option<String>,
    pub comment: Option<String>,
}

/// One canvas mutation, as dispatched by the host's event handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WorkspaceOp {
    AddTable { name: String, columns: Vec<Column> },
    RenameTable { table_id: String, name: String },
    MoveTable { table_id: String, position: Point },
    SetTableColor { table_id: String, color: String },
    DeleteTable { table_id: String },

    AddColumn { table_id: String },
    UpdateColumn { table_id: String, index: usize, patch: ColumnPatch },
    DeleteColumn { table_id: String, index: usize },
    MoveColumnUp { table_id: String, index: usize },
    MoveColumnDown { table_id: String, index: usize },

    CreateRelationship { from_table_id: String, to_table_id: String, kind: RelationKind, color: String },
    UpdateRelationship { relationship_id: String, to_table_id: String, kind: RelationKind, color: String },
    DeleteRelationship { relationship_id: String },
    MoveEndpoint { relationship_id: String, end: RelEnd, cursor: Point },
    ResetEndpoint { relationship_id: String, end: RelEnd },
    InsertCorner { relationship_id: String, index: usize, point: Point },
    MoveCorner { relationship_id: String, index: usize, point: Point },
    RemoveCorner { relationship_id: String, index: usize },

    AddMemo { content: String },
    UpdateMemoContent { memo_id: String, content: String },
    SetMemoColor { memo_id: String, color: String },
    MoveMemo { memo_id: String, position: Point },
    ResizeMemo { memo_id: String, size: Size },
    DeleteMemo { memo_id: String },
}

impl<S: KeyValueStore> Workspace<S> {
    pub(crate) fn new(catalog: Catalog<S>, project: Project) -> Self {
        Self {
            catalog,
            project,
            metrics: TextMetrics::default(),
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn metrics(&self) -> &TextMetrics {
        &self.metrics
    }

    pub fn into_catalog(self) -> Catalog<S> {
        self.catalog
    }

    pub fn table(&self, id: &str) -> Result<&Table, Error> {
        self.project
            .tables
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::TableNotFound(id.to_string()))
    }

    fn table_mut(&mut self, id: &str) -> Result<&mut Table, Error> {
        self.project
            .tables
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::TableNotFound(id.to_string()))
    }

    fn relationship_mut(&mut self, id: &str) -> Result<&mut Relationship, Error> {
        self.project
            .relationships
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::RelationshipNotFound(id.to_string()))
    }

    fn memo_mut(&mut self, id: &str) -> Result<&mut Memo, Error> {
        self.project
            .memos
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| Error::MemoNotFound(id.to_string()))
    }

    /// Serialize the whole project back into the catalog blob.
    fn flush(&mut self) -> Result<(), Error> {
        self.project.updated_at = model::now();
        let mut projects = self.catalog.load_all()?;
        projects.insert(self.project.key.clone(), self.project.clone());
        self.catalog.save_all(&projects)
    }

    /// Dispatch a host event to the matching mutation.
    pub fn apply(&mut self, op: WorkspaceOp) -> Result<(), Error> {
        match op {
            WorkspaceOp::AddTable { name, columns } => self.add_table(&name, columns).map(drop),
            WorkspaceOp::RenameTable { table_id, name } => self.rename_table(&table_id, &name),
            WorkspaceOp::MoveTable { table_id, position } => self.move_table(&table_id, position),
            WorkspaceOp::SetTableColor { table_id, color } => {
                self.set_table_color(&table_id, &color)
            }
            WorkspaceOp::DeleteTable { table_id } => self.delete_table(&table_id),
            WorkspaceOp::AddColumn { table_id } => self.add_column(&table_id),
            WorkspaceOp::UpdateColumn { table_id, index, patch } => {
                self.update_column(&table_id, index, patch)
            }
            WorkspaceOp::DeleteColumn { table_id, index } => self.delete_column(&table_id, index),
            WorkspaceOp::MoveColumnUp { table_id, index } => {
                self.move_column_up(&table_id, index)
            }
            WorkspaceOp::MoveColumnDown { table_id, index } => {
                self.move_column_down(&table_id, index)
            }
            WorkspaceOp::CreateRelationship { from_table_id, to_table_id, kind, color } => self
                .create_relationship(&from_table_id, &to_table_id, kind, &color)
                .map(drop),
            WorkspaceOp::UpdateRelationship { relationship_id, to_table_id, kind, color } => {
                self.update_relationship(&relationship_id, &to_table_id, kind, &color)
            }
            WorkspaceOp::DeleteRelationship { relationship_id } => {
                self.delete_relationship(&relationship_id)
            }
            WorkspaceOp::MoveEndpoint { relationship_id, end, cursor } => {
                self.move_endpoint(&relationship_id, end, cursor)
            }
            WorkspaceOp::ResetEndpoint { relationship_id, end } => {
                self.reset_endpoint(&relationship_id, end)
            }
            WorkspaceOp::InsertCorner { relationship_id, index, point } => {
                self.insert_corner(&relationship_id, index, point)
            }
            WorkspaceOp::MoveCorner { relationship_id, index, point } => {
                self.move_corner(&relationship_id, index, point)
            }
            WorkspaceOp::RemoveCorner { relationship_id, index } => {
                self.remove_corner(&relationship_id, index)
            }
            WorkspaceOp::AddMemo { content } => self.add_memo(&content).map(drop),
            WorkspaceOp::UpdateMemoContent { memo_id, content } => {
                self.update_memo_content(&memo_id, &content)
            }
            WorkspaceOp::SetMemoColor { memo_id, color } => self.set_memo_color(&memo_id, &color),
            WorkspaceOp::MoveMemo { memo_id, position } => self.move_memo(&memo_id, position),
            WorkspaceOp::ResizeMemo { memo_id, size } => self.resize_memo(&memo_id, size),
            WorkspaceOp::DeleteMemo { memo_id } => self.delete_memo(&memo_id),
        }
    }

    // ----- tables -----

    /// Add a table with the given columns. New cards are staggered down-right
    /// so they don't stack exactly on top of each other.
    pub fn add_table(&mut self, name: &str, columns: Vec<Column>) -> Result<String, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        if columns.is_empty() {
            return Err(Error::NoColumns);
        }

        let n = self.project.tables.len() as f64;
        let table = Table {
            id: model::timestamp_id(),
            name: name.to_string(),
            color: model::DEFAULT_COLOR.to_string(),
            position: Point::new(100.0 + n * 50.0, 100.0 + n * 50.0),
            columns,
        };
        let id = table.id.clone();
        tracing::debug!(table = name, id = %id, "table added");
        self.project.tables.push(table);
        self.flush()?;
        Ok(id)
    }

    pub fn rename_table(&mut self, id: &str, name: &str) -> Result<(), Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        self.table_mut(id)?.name = name.to_string();
        self.flush()
    }

    /// Position is clamped to the canvas origin, as when dragging.
    pub fn move_table(&mut self, id: &str, position: Point) -> Result<(), Error> {
        let table = self.table_mut(id)?;
        table.position = Point::new(position.x.max(0.0), position.y.max(0.0));
        self.flush()
    }

    /// Recolor a table and retint every foreign-key column referencing it.
    pub fn set_table_color(&mut self, id: &str, color: &str) -> Result<(), Error> {
        self.table_mut(id)?.color = color.to_string();
        for table in &mut self.project.tables {
            for col in &mut table.columns {
                if col.is_foreign_key && col.referenced_table_id.as_deref() == Some(id) {
                    col.foreign_key_color = Some(color.to_string());
                }
            }
        }
        self.flush()
    }

    /// Delete a table and everything that refers to it: relationships touching
    /// it, and foreign-key columns in other tables that point at it.
    pub fn delete_table(&mut self, id: &str) -> Result<(), Error> {
        if !self.project.tables.iter().any(|t| t.id == id) {
            return Err(Error::TableNotFound(id.to_string()));
        }
        self.project.tables.retain(|t| t.id != id);
        self.project
            .relationships
            .retain(|r| r.from_table_id != id && r.to_table_id != id);
        for table in &mut self.project.tables {
            table
                .columns
                .retain(|c| !(c.is_foreign_key && c.referenced_table_id.as_deref() == Some(id)));
        }
        tracing::debug!(id, "table deleted");
        self.flush()
    }

    // ----- columns -----

    pub fn add_column(&mut self, table_id: &str) -> Result<(), Error> {
        self.table_mut(table_id)?
            .columns
            .push(Column::new("new_column", ColumnType::Varchar));
        self.flush()
    }

    pub fn update_column(
        &mut self,
        table_id: &str,
        index: usize,
        patch: ColumnPatch,
    ) -> Result<(), Error> {
        let table = self.table_mut(table_id)?;
        let col = table
            .columns
            .get_mut(index)
            .ok_or_else(|| Error::ColumnOutOfRange {
                table: table_id.to_string(),
                index,
            })?;

        if let Some(name) = patch.name {
            col.name = name;
        }
        if let Some(ty) = patch.ty {
            col.ty = ty;
        }
        if let Some(length) = patch.length {
            col.length = length;
        }
        if let Some(nullable) = patch.nullable {
            col.nullable = nullable;
        }
        if let Some(auto_increment) = patch.auto_increment {
            col.auto_increment = auto_increment;
        }
        if let Some(primary_key) = patch.primary_key {
            col.primary_key = primary_key;
        }
        if let Some(default_kind) = patch.default_kind {
            col.default_kind = default_kind;
        }
        if let Some(default_value) = patch.default_value {
            col.default_value = default_value;
        }
        if let Some(comment) = patch.comment {
            col.comment = comment;
        }
        self.flush()
    }

    /// Remove a column. A table keeps at least one column; removing a
    /// synthesized foreign-key column also removes its relationship.
    pub fn delete_column(&mut self, table_id: &str, index: usize) -> Result<(), Error> {
        let table = self.table_mut(table_id)?;
        if index >= table.columns.len() {
            return Err(Error::ColumnOutOfRange {
                table: table_id.to_string(),
                index,
            });
        }
        if table.columns.len() == 1 {
            return Err(Error::LastColumn);
        }

        let col = table.columns.remove(index);
        if col.is_foreign_key {
            self.project
                .relationships
                .retain(|r| !(r.target_table_id == table_id && r.fk_column_name == col.name));
        }
        self.flush()
    }

    pub fn move_column_up(&mut self, table_id: &str, index: usize) -> Result<(), Error> {
        let table = self.table_mut(table_id)?;
        if index == 0 || index >= table.columns.len() {
            return Ok(());
        }
        table.columns.swap(index - 1, index);
        self.flush()
    }

    pub fn move_column_down(&mut self, table_id: &str, index: usize) -> Result<(), Error> {
        let table = self.table_mut(table_id)?;
        if table.columns.len() < 2 || index >= table.columns.len() - 1 {
            return Ok(());
        }
        table.columns.swap(index, index + 1);
        self.flush()
    }

    // ----- relationships -----

    /// Create a relationship and synthesize its foreign-key column on the
    /// many side. At most one relationship per unordered table pair.
    pub fn create_relationship(
        &mut self,
        from_id: &str,
        to_id: &str,
        kind: RelationKind,
        color: &str,
    ) -> Result<String, Error> {
        if from_id == to_id {
            return Err(Error::SelfReference);
        }
        self.table(from_id)?;
        self.table(to_id)?;
        if self.project.relationships.iter().any(|r| {
            (r.from_table_id == from_id && r.to_table_id == to_id)
                || (r.from_table_id == to_id && r.to_table_id == from_id)
        }) {
            return Err(Error::DuplicateRelationship);
        }

        let (target_id, referenced_id) = if kind.fk_on_source() {
            (from_id.to_string(), to_id.to_string())
        } else {
            (to_id.to_string(), from_id.to_string())
        };
        let fk_name = self.synthesize_fk(&target_id, &referenced_id)?;

        let rel = Relationship {
            id: model::timestamp_id(),
            from_table_id: from_id.to_string(),
            to_table_id: to_id.to_string(),
            kind,
            color: color.to_string(),
            fk_column_name: fk_name,
            target_table_id: target_id,
            referenced_table_id: referenced_id,
            from_point: model::default_from_point(),
            to_point: model::default_to_point(),
            corners: Vec::new(),
        };
        let id = rel.id.clone();
        tracing::debug!(from = from_id, to = to_id, %kind, "relationship created");
        self.project.relationships.push(rel);
        self.flush()?;
        Ok(id)
    }

    /// Re-target a relationship. The old synthesized column is removed and a
    /// fresh one is synthesized against the new target and kind.
    pub fn update_relationship(
        &mut self,
        id: &str,
        to_id: &str,
        kind: RelationKind,
        color: &str,
    ) -> Result<(), Error> {
        let (from_id, old_fk, old_target, old_referenced) = {
            let rel = self.relationship_mut(id)?;
            (
                rel.from_table_id.clone(),
                rel.fk_column_name.clone(),
                rel.target_table_id.clone(),
                rel.referenced_table_id.clone(),
            )
        };
        if to_id == from_id {
            return Err(Error::SelfReference);
        }
        self.table(to_id)?;
        if self.project.relationships.iter().any(|r| {
            r.id != id
                && ((r.from_table_id == from_id && r.to_table_id == to_id)
                    || (r.from_table_id == to_id && r.to_table_id == from_id))
        }) {
            return Err(Error::DuplicateRelationship);
        }

        self.remove_fk_column(&old_target, &old_fk, &old_referenced);

        let (target_id, referenced_id) = if kind.fk_on_source() {
            (from_id.clone(), to_id.to_string())
        } else {
            (to_id.to_string(), from_id.clone())
        };
        let fk_name = self.synthesize_fk(&target_id, &referenced_id)?;

        let rel = self.relationship_mut(id)?;
        rel.to_table_id = to_id.to_string();
        rel.kind = kind;
        rel.color = color.to_string();
        rel.fk_column_name = fk_name;
        rel.target_table_id = target_id;
        rel.referenced_table_id = referenced_id;
        self.flush()
    }

    /// Delete a relationship along with its synthesized foreign-key column.
    pub fn delete_relationship(&mut self, id: &str) -> Result<(), Error> {
        let (fk, target, referenced) = {
            let rel = self.relationship_mut(id)?;
            (
                rel.fk_column_name.clone(),
                rel.target_table_id.clone(),
                rel.referenced_table_id.clone(),
            )
        };
        self.remove_fk_column(&target, &fk, &referenced);
        self.project.relationships.retain(|r| r.id != id);
        tracing::debug!(id, "relationship deleted");
        self.flush()
    }

    /// Drag one connector end. While the cursor is within the snap radius of
    /// the endpoint's table card it clips to the nearest edge; further away
    /// the endpoint detaches and floats at the cursor.
    pub fn move_endpoint(&mut self, id: &str, end: RelEnd, cursor: Point) -> Result<(), Error> {
        let table_id = {
            let rel = self.relationship_mut(id)?;
            match end {
                RelEnd::From => rel.from_table_id.clone(),
                RelEnd::To => rel.to_table_id.clone(),
            }
        };
        let rect = card_rect(self.table(&table_id)?, &self.metrics);

        let endpoint = if rect.expand(SNAP_RADIUS).contains(cursor) {
            let (side, offset) = snap_to_edge(&rect, cursor);
            Endpoint::Attached { side, offset }
        } else {
            Endpoint::Free {
                x: cursor.x,
                y: cursor.y,
            }
        };

        let rel = self.relationship_mut(id)?;
        match end {
            RelEnd::From => rel.from_point = endpoint,
            RelEnd::To => rel.to_point = endpoint,
        }
        self.flush()
    }

    pub fn reset_endpoint(&mut self, id: &str, end: RelEnd) -> Result<(), Error> {
        let rel = self.relationship_mut(id)?;
        match end {
            RelEnd::From => rel.from_point = model::default_from_point(),
            RelEnd::To => rel.to_point = model::default_to_point(),
        }
        self.flush()
    }

    pub fn insert_corner(&mut self, id: &str, index: usize, point: Point) -> Result<(), Error> {
        let rel = self.relationship_mut(id)?;
        if index > rel.corners.len() {
            return Err(Error::CornerOutOfRange(index));
        }
        rel.corners.insert(index, point);
        self.flush()
    }

    pub fn move_corner(&mut self, id: &str, index: usize, point: Point) -> Result<(), Error> {
        let rel = self.relationship_mut(id)?;
        let corner = rel
            .corners
            .get_mut(index)
            .ok_or(Error::CornerOutOfRange(index))?;
        *corner = point;
        self.flush()
    }

    pub fn remove_corner(&mut self, id: &str, index: usize) -> Result<(), Error> {
        let rel = self.relationship_mut(id)?;
        if index >= rel.corners.len() {
            return Err(Error::CornerOutOfRange(index));
        }
        rel.corners.remove(index);
        self.flush()
    }

    // ----- memos -----

    pub fn add_memo(&mut self, content: &str) -> Result<String, Error> {
        let n = self.project.memos.len() as f64;
        let memo = Memo {
            id: model::timestamp_id(),
            content: content.to_string(),
            position: Point::new(120.0 + n * 30.0, 120.0 + n * 30.0),
            size: model::MEMO_DEFAULT_SIZE,
            color: model::MEMO_COLOR.to_string(),
        };
        let id = memo.id.clone();
        self.project.memos.push(memo);
        self.flush()?;
        Ok(id)
    }

    pub fn update_memo_content(&mut self, id: &str, content: &str) -> Result<(), Error> {
        self.memo_mut(id)?.content = content.to_string();
        self.flush()
    }

    pub fn set_memo_color(&mut self, id: &str, color: &str) -> Result<(), Error> {
        self.memo_mut(id)?.color = color.to_string();
        self.flush()
    }

    pub fn move_memo(&mut self, id: &str, position: Point) -> Result<(), Error> {
        let memo = self.memo_mut(id)?;
        memo.position = Point::new(position.x.max(0.0), position.y.max(0.0));
        self.flush()
    }

    /// Resize, clamped to the minimum memo size.
    pub fn resize_memo(&mut self, id: &str, size: Size) -> Result<(), Error> {
        let memo = self.memo_mut(id)?;
        memo.size = Size::new(
            size.width.max(model::MEMO_MIN_SIZE.width),
            size.height.max(model::MEMO_MIN_SIZE.height),
        );
        self.flush()
    }

    pub fn delete_memo(&mut self, id: &str) -> Result<(), Error> {
        if !self.project.memos.iter().any(|m| m.id == id) {
            return Err(Error::MemoNotFound(id.to_string()));
        }
        self.project.memos.retain(|m| m.id != id);
        self.flush()
    }

    // ----- foreign-key synthesis -----

    /// Add the foreign-key column for `referenced` onto `target`, unless a
    /// column with that name already exists. Returns the column name either way.
    fn synthesize_fk(&mut self, target_id: &str, referenced_id: &str) -> Result<String, Error> {
        let referenced = self.table(referenced_id)?;
        let fk_name = format!("{}_id", referenced.name.to_lowercase());
        let comment = format!("Foreign key to {}", referenced.name);
        let fk_color = referenced.color.clone();
        let referenced_id = referenced.id.clone();

        let target = self.table_mut(target_id)?;
        if !target.columns.iter().any(|c| c.name == fk_name) {
            target.columns.push(Column {
                name: fk_name.clone(),
                ty: ColumnType::Int,
                length: String::new(),
                nullable: false,
                auto_increment: false,
                primary_key: false,
                default_kind: DefaultKind::None,
                default_value: String::new(),
                comment,
                is_foreign_key: true,
                foreign_key_color: Some(fk_color),
                referenced_table_id: Some(referenced_id),
            });
        }
        Ok(fk_name)
    }

    /// Remove the synthesized column matching name, FK flag and reference.
    fn remove_fk_column(&mut self, target_id: &str, fk_name: &str, referenced_id: &str) {
        if let Some(target) = self.project.tables.iter_mut().find(|t| t.id == target_id) {
            target.columns.retain(|c| {
                !(c.name == fk_name
                    && c.is_foreign_key
                    && c.referenced_table_id.as_deref() == Some(referenced_id))
            });
        }
    }
}
