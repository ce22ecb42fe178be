pub mod catalog;
pub mod error;
pub mod geometry;
pub mod measure;
pub mod model;
pub mod routing;
pub mod store;
pub mod svg;
pub mod workspace;

use wasm_bindgen::prelude::*;

use catalog::{CATALOG_KEY, Catalog};
use measure::TextMetrics;
use store::{KeyValueStore, MemoryStore};
use svg::SvgRenderer;
use workspace::WorkspaceOp;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

// The JS host owns real local storage and the DOM; every export takes the
// whole catalog blob and hands back the updated blob (or a rendering of it).

fn seeded(catalog_blob: &str) -> Result<Catalog<MemoryStore>, String> {
    let mut store = MemoryStore::new();
    if !catalog_blob.trim().is_empty() {
        store
            .set(CATALOG_KEY, catalog_blob)
            .map_err(|e| e.to_string())?;
    }
    Ok(Catalog::new(store))
}

fn export(catalog: Catalog<MemoryStore>) -> Result<String, String> {
    let blob = catalog
        .into_store()
        .get(CATALOG_KEY)
        .map_err(|e| e.to_string())?;
    Ok(blob.unwrap_or_else(|| "{}".to_string()))
}

/// Create a project in the catalog blob, returning the updated blob.
#[wasm_bindgen(js_name = "catalogCreate")]
pub fn catalog_create(
    catalog_blob: &str,
    name: &str,
    description: &str,
) -> Result<String, String> {
    let mut catalog = seeded(catalog_blob)?;
    catalog.create(name, description).map_err(|e| e.to_string())?;
    export(catalog)
}

/// Rename/redescribe a project, returning the updated blob.
#[wasm_bindgen(js_name = "catalogUpdate")]
pub fn catalog_update(
    catalog_blob: &str,
    key: &str,
    name: &str,
    description: &str,
) -> Result<String, String> {
    let mut catalog = seeded(catalog_blob)?;
    catalog
        .update(key, name, description)
        .map_err(|e| e.to_string())?;
    export(catalog)
}

/// Delete a project, returning the updated blob.
#[wasm_bindgen(js_name = "catalogDelete")]
pub fn catalog_delete(catalog_blob: &str, key: &str) -> Result<String, String> {
    let mut catalog = seeded(catalog_blob)?;
    catalog.delete(key).map_err(|e| e.to_string())?;
    export(catalog)
}

/// Apply one canvas mutation (a serialized [`WorkspaceOp`]) to a project and
/// return the updated catalog blob.
#[wasm_bindgen(js_name = "applyOperation")]
pub fn apply_operation(catalog_blob: &str, key: &str, op_json: &str) -> Result<String, String> {
    let op: WorkspaceOp = serde_json::from_str(op_json).map_err(|e| e.to_string())?;

    let catalog = seeded(catalog_blob)?;
    let mut workspace = catalog.open(key).map_err(|e| e.to_string())?;
    workspace.apply(op).map_err(|e| e.to_string())?;
    export(workspace.into_catalog())
}

/// Render a project from the catalog blob to a standalone SVG document.
#[wasm_bindgen(js_name = "projectToSvg")]
pub fn project_to_svg(catalog_blob: &str, key: &str) -> Result<String, String> {
    let catalog = seeded(catalog_blob)?;
    let project = catalog.get(key).map_err(|e| e.to_string())?;
    Ok(SvgRenderer::default().render(&project))
}

/// Routed connector polylines for a project, as JSON. The host draws these
/// itself when it wants interactive lines instead of a static SVG.
#[wasm_bindgen(js_name = "connectorPaths")]
pub fn connector_paths(catalog_blob: &str, key: &str) -> Result<String, String> {
    let catalog = seeded(catalog_blob)?;
    let project = catalog.get(key).map_err(|e| e.to_string())?;
    let routes = routing::route_connectors(&project, &TextMetrics::default());
    serde_json::to_string(&routes).map_err(|e| e.to_string())
}
