//! JSON files: node descriptions and value mappings

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::domain::{Document, DocumentBuilder, NodeSpec};
use crate::infrastructure::{InfraError, InfraResult};

/// Parse a `NodeSpec` JSON text and build the document.
pub fn parse_document(content: &str, origin: &str) -> InfraResult<Document> {
    let spec: NodeSpec =
        serde_json::from_str(content).map_err(|e| InfraError::json(origin.to_string(), e))?;
    Ok(DocumentBuilder::new().build(&spec)?)
}

pub fn load_document(path: &Path) -> InfraResult<Document> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| InfraError::io(format!("read document {}", path.display()), e))?;
    let doc = parse_document(&content, &path.display().to_string())?;
    debug!("load_document: {} nodes from {}", doc.len(), path.display());
    Ok(doc)
}

/// Serialize the document back to `NodeSpec` JSON.
pub fn document_to_json(doc: &Document, pretty: bool) -> InfraResult<String> {
    let spec = doc.to_root_spec()?;
    to_json(&spec, pretty)
}

pub fn save_document(doc: &Document, path: &Path, pretty: bool) -> InfraResult<()> {
    let content = document_to_json(doc, pretty)?;
    std::fs::write(path, content + "\n")
        .map_err(|e| InfraError::io(format!("write document {}", path.display()), e))?;
    debug!("save_document: {}", path.display());
    Ok(())
}

/// Read a values file: any JSON value, usually a mapping.
pub fn load_values(path: &Path) -> InfraResult<Value> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| InfraError::io(format!("read values {}", path.display()), e))?;
    serde_json::from_str(&content).map_err(|e| InfraError::json(path.display().to_string(), e))
}

pub fn to_json<T: serde::Serialize + ?Sized>(value: &T, pretty: bool) -> InfraResult<String> {
    let result = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    result.map_err(|e| InfraError::json("serialize", e))
}
