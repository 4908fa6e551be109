//! Session persistence: document text, view transform and layout across
//! page loads.
//!
//! Records are read leniently. A record that is not a JSON object is
//! corrupt and gets purged; inside a valid object every field is optional
//! and a missing or mistyped field falls back to its default on its own.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::camera::ViewTransform;
use crate::split::PaneSplit;
use crate::storage::{KeyValueStore, StorageError};

/// Document shown when no session exists.
pub const DEFAULT_DOCUMENT: &str = r#"// A small workflow
digraph Workflow {
    graph [fontsize=12, label="A simple workflow", labelloc="t", rankdir="LR"];
    node [fontsize=10, shape=box, style=filled, fillcolor="lightblue", margin="0.1,0.1"];
    edge [fontsize=9, color="darkslategray"];

    Start [label="Start", shape=ellipse, fillcolor="palegreen"];
    Prepare [label="Step 1:\nPrepare data"];
    Process [label="Step 2:\nProcess"];
    Decision [label="Succeeded?", shape=diamond, fillcolor="lightyellow"];
    Done [label="Done", shape=ellipse, fillcolor="palegreen"];
    Failed [label="Failed", shape=ellipse, fillcolor="lightcoral"];

    Start -> Prepare -> Process -> Decision;
    Decision -> Done [label="yes"];
    Decision -> Failed [label="no", style=dashed, color=red];

    subgraph cluster_processing {
        label = "Processing"; bgcolor = "lightgrey"; style = "filled";
        Prepare; Process; Decision;
    }
}
"#;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Corrupt session record: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The stored session record. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor_flex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_flex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_render_enabled: Option<bool>,
}

fn number_field(object: &Map<String, Value>, key: &str) -> Option<f64> {
    object
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl PersistedSession {
    /// Build a record from the live viewer state.
    pub fn capture(
        document: &str,
        view: ViewTransform,
        split: PaneSplit,
        auto_render: bool,
    ) -> Self {
        Self {
            dot: Some(document.to_string()),
            scale: Some(view.scale),
            offset_x: Some(view.offset.x),
            offset_y: Some(view.offset.y),
            editor_flex: Some(split.editor_flex()),
            preview_flex: Some(split.preview_flex()),
            auto_render_enabled: Some(auto_render),
        }
    }

    /// Parse a stored record, keeping whatever fields are well-typed.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| SessionError::Corrupt(e.to_string()))?;
        let Value::Object(object) = value else {
            return Err(SessionError::Corrupt("record is not an object".to_string()));
        };

        Ok(Self {
            dot: object.get("dot").and_then(Value::as_str).map(str::to_string),
            scale: number_field(&object, "scale").filter(|s| *s > 0.0),
            offset_x: number_field(&object, "offsetX"),
            offset_y: number_field(&object, "offsetY"),
            editor_flex: string_field(&object, "editorFlex"),
            preview_flex: string_field(&object, "previewFlex"),
            auto_render_enabled: object.get("autoRenderEnabled").and_then(Value::as_bool),
        })
    }

    pub fn to_json(&self) -> Result<String, SessionError> {
        serde_json::to_string(self).map_err(|e| SessionError::Storage(StorageError::Serialization(e.to_string())))
    }

    /// Saved document, or `default_document`.
    pub fn document_or<'a>(&'a self, default_document: &'a str) -> &'a str {
        self.dot.as_deref().unwrap_or(default_document)
    }

    /// Saved transform with each missing component taken from identity.
    pub fn transform(&self) -> ViewTransform {
        let identity = ViewTransform::IDENTITY;
        ViewTransform::new(
            self.scale.unwrap_or(identity.scale),
            self.offset_x.unwrap_or(identity.offset.x),
            self.offset_y.unwrap_or(identity.offset.y),
        )
    }

    /// Saved pane split, or the default split.
    pub fn split(&self) -> PaneSplit {
        self.editor_flex
            .as_deref()
            .and_then(PaneSplit::from_editor_flex)
            .unwrap_or_default()
    }

    /// Saved auto-render flag, off by default.
    pub fn auto_render(&self) -> bool {
        self.auto_render_enabled.unwrap_or(false)
    }
}

/// Outcome of reading the stored session.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedSession {
    /// Nothing stored.
    Missing,
    /// A record was found and parsed.
    Restored(PersistedSession),
    /// The stored record was unreadable and has been purged.
    Purged,
}

impl LoadedSession {
    pub fn into_session(self) -> Option<PersistedSession> {
        match self {
            LoadedSession::Restored(session) => Some(session),
            LoadedSession::Missing | LoadedSession::Purged => None,
        }
    }
}

/// Reads and writes the session record under a versioned key.
pub struct SessionStore<S: KeyValueStore> {
    storage: Arc<S>,
    key: String,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(storage: Arc<S>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// The key the record is stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get a reference to the storage backend.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Write a record.
    pub fn save(&self, session: &PersistedSession) -> Result<(), SessionError> {
        let json = session.to_json()?;
        self.storage.set(&self.key, &json)?;
        Ok(())
    }

    /// Read the record. Never fails: unreadable records are purged and
    /// reported as [`LoadedSession::Purged`].
    pub fn load(&self) -> LoadedSession {
        let json = match self.storage.get(&self.key) {
            Ok(Some(json)) => json,
            Ok(None) => return LoadedSession::Missing,
            Err(e) => {
                log::warn!("Failed to read session: {}", e);
                return LoadedSession::Missing;
            }
        };

        match PersistedSession::from_json(&json) {
            Ok(session) => LoadedSession::Restored(session),
            Err(e) => {
                log::warn!("Discarding session: {}", e);
                if let Err(e) = self.storage.remove(&self.key) {
                    log::warn!("Failed to purge corrupt session: {}", e);
                }
                LoadedSession::Purged
            }
        }
    }

    /// Delete the record.
    pub fn clear(&self) -> Result<(), SessionError> {
        self.storage.remove(&self.key)?;
        Ok(())
    }
}
