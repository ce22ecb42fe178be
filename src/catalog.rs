//! Project catalog: every saved schema project lives in one JSON object under
//! a single store key, mapped by a slug derived from the project name.

use std::collections::BTreeMap;

use crate::error::Error;
use crate::model::{self, Project};
use crate::store::KeyValueStore;
use crate::workspace::Workspace;

/// Store key holding the map of all projects.
pub const CATALOG_KEY: &str = "databases";
/// Store key holding the key of the most recently opened project.
pub const CURRENT_KEY: &str = "currentDatabase";

pub struct Catalog<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Catalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub(crate) fn load_all(&self) -> Result<BTreeMap<String, Project>, Error> {
        match self.store.get(CATALOG_KEY)? {
            Some(blob) => Ok(serde_json::from_str(&blob)?),
            None => Ok(BTreeMap::new()),
        }
    }

    pub(crate) fn save_all(&mut self, projects: &BTreeMap<String, Project>) -> Result<(), Error> {
        let blob = serde_json::to_string(projects)?;
        self.store.set(CATALOG_KEY, &blob)
    }

    /// All projects, ordered by key.
    pub fn list(&self) -> Result<Vec<Project>, Error> {
        Ok(self.load_all()?.into_values().collect())
    }

    pub fn get(&self, key: &str) -> Result<Project, Error> {
        self.load_all()?
            .remove(key)
            .ok_or_else(|| Error::ProjectNotFound(key.to_string()))
    }

    /// Create a project. The key is the lowercased name with every
    /// non-alphanumeric byte replaced by `_`; collisions get `_1`, `_2`, …
    pub fn create(&mut self, name: &str, description: &str) -> Result<Project, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }

        let mut projects = self.load_all()?;
        let key = unique_key(&base_slug(name), &projects);
        let now = model::now();
        let project = Project {
            key: key.clone(),
            name: name.to_string(),
            description: description.trim().to_string(),
            created_at: now,
            updated_at: now,
            tables: Vec::new(),
            relationships: Vec::new(),
            memos: Vec::new(),
        };
        projects.insert(key.clone(), project.clone());
        self.save_all(&projects)?;

        tracing::info!(key = %key, name, "project created");
        Ok(project)
    }

    /// Rename/redescribe a project in place. The key never changes.
    pub fn update(&mut self, key: &str, name: &str, description: &str) -> Result<(), Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }

        let mut projects = self.load_all()?;
        let project = projects
            .get_mut(key)
            .ok_or_else(|| Error::ProjectNotFound(key.to_string()))?;
        project.name = name.to_string();
        project.description = description.trim().to_string();
        project.updated_at = model::now();
        self.save_all(&projects)
    }

    pub fn delete(&mut self, key: &str) -> Result<(), Error> {
        let mut projects = self.load_all()?;
        if projects.remove(key).is_none() {
            return Err(Error::ProjectNotFound(key.to_string()));
        }
        self.save_all(&projects)?;

        if self.current()?.as_deref() == Some(key) {
            self.clear_current()?;
        }
        tracing::info!(key, "project deleted");
        Ok(())
    }

    /// Open a project for editing and remember it as the current one.
    pub fn open(mut self, key: &str) -> Result<Workspace<S>, Error> {
        let project = self.get(key)?;
        self.set_current(key)?;
        Ok(Workspace::new(self, project))
    }

    pub fn set_current(&mut self, key: &str) -> Result<(), Error> {
        self.store.set(CURRENT_KEY, key)
    }

    pub fn current(&self) -> Result<Option<String>, Error> {
        self.store.get(CURRENT_KEY)
    }

    pub fn clear_current(&mut self) -> Result<(), Error> {
        self.store.remove(CURRENT_KEY)
    }
}

fn base_slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn unique_key(base: &str, existing: &BTreeMap<String, Project>) -> String {
    if !existing.contains_key(base) {
        return base.to_string();
    }
    let mut counter = 1;
    loop {
        let key = format!("{base}_{counter}");
        if !existing.contains_key(&key) {
            return key;
        }
        counter += 1;
    }
}
