//! Versioned session documents.
//!
//! A session document is plain JSON:
//!
//! ```json
//! {
//!   "format": "vom-session",
//!   "version": 1,
//!   "session_id": "0190...",
//!   "exported_at": "2026-01-01T00:00:00Z",
//!   "checksum": "<blake3 hex of the canonical payload>",
//!   "payload": { "variables": [...], "buffers": [...], ... }
//! }
//! ```
//!
//! Decoding only builds data. Functions, commands, autocommand callbacks
//! and callback mappings are code and never appear in a document.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;
use vom_layout::{check_id, Buffer, Tab, Window};
use vom_registry::names::{is_reserved, validate_lhs, validate_variable_name, validate_word};
use vom_types::{Attributes, BufferId, MapMode, Scope, Value};

use crate::error::{SdkError, SdkResult};

pub const SESSION_FORMAT: &str = "vom-session";
pub const SESSION_VERSION: u32 = 1;

/// Histories are trimmed to this many entries, oldest first out.
pub const HISTORY_LIMIT: usize = 100;

/// A location in a buffer, 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub buffer: BufferId,
    pub line: u32,
    pub col: u32,
}

/// Editor bookkeeping that is not owned by any store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionInfo {
    pub command_history: Vec<String>,
    pub search_history: Vec<String>,
    pub registers: BTreeMap<String, String>,
    pub marks: BTreeMap<String, Position>,
    pub jump_list: Vec<Position>,
}

impl SessionInfo {
    pub fn record_command(&mut self, line: impl Into<String>) {
        push_bounded(&mut self.command_history, line.into());
    }

    pub fn record_search(&mut self, pattern: impl Into<String>) {
        push_bounded(&mut self.search_history, pattern.into());
    }

    pub fn set_register(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.registers.insert(name.into(), content.into());
    }

    pub fn set_mark(&mut self, name: impl Into<String>, at: Position) {
        self.marks.insert(name.into(), at);
    }

    /// Append a jump, skipping an exact repeat of the latest one.
    pub fn record_jump(&mut self, at: Position) {
        if self.jump_list.last() != Some(&at) {
            self.jump_list.push(at);
        }
        if self.jump_list.len() > HISTORY_LIMIT {
            self.jump_list.remove(0);
        }
    }
}

fn push_bounded(list: &mut Vec<String>, item: String) {
    list.retain(|existing| *existing != item);
    list.push(item);
    if list.len() > HISTORY_LIMIT {
        list.remove(0);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableEntry {
    pub scope: Scope,
    pub name: String,
    pub value: Value,
}

/// A key-sequence mapping. Callback mappings are not exported.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub mode: MapMode,
    pub lhs: String,
    pub rhs: String,
    pub options: Attributes,
    pub enabled: bool,
}

/// Everything a session document carries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSnapshot {
    pub variables: Vec<VariableEntry>,
    pub buffers: Vec<Buffer>,
    pub windows: Vec<Window>,
    pub tabs: Vec<Tab>,
    pub highlights: BTreeMap<String, Attributes>,
    pub mappings: Vec<MappingEntry>,
    pub info: SessionInfo,
}

impl SessionSnapshot {
    /// Check that the snapshot can be restored as a whole.
    ///
    /// Ids must be in range and unique per store, windows must view listed
    /// buffers, tabs must list listed windows, names must be acceptable to
    /// their registries, and every float must be finite.
    pub fn validate(&self) -> SdkResult<()> {
        let buffers = unique_ids("buffer", self.buffers.iter().map(|b| b.id.get()))?;
        let windows = unique_ids("window", self.windows.iter().map(|w| w.id.get()))?;
        unique_ids("tab", self.tabs.iter().map(|t| t.id.get()))?;

        for window in &self.windows {
            if !buffers.contains(&window.buffer.get()) {
                return Err(invalid(format!("window {} views missing buffer {}", window.id, window.buffer)));
            }
            if !window.options.values().all(Value::is_finite) {
                return Err(invalid(format!("window {} has a non-finite option", window.id)));
            }
        }
        for tab in &self.tabs {
            if let Some(missing) = tab.windows.iter().find(|w| !windows.contains(&w.get())) {
                return Err(invalid(format!("tab {} lists missing window {missing}", tab.id)));
            }
        }
        for var in &self.variables {
            let key = var.scope.qualify(&var.name);
            validate_variable_name(&var.name).map_err(|e| invalid(e.to_string()))?;
            if is_reserved(var.scope, &var.name) {
                return Err(invalid(format!("variable {key} uses a reserved name")));
            }
            if !var.value.is_finite() {
                return Err(invalid(format!("variable {key} holds a non-finite float")));
            }
        }
        for (name, attrs) in &self.highlights {
            validate_word(name).map_err(|e| invalid(e.to_string()))?;
            if !attrs.values().all(Value::is_finite) {
                return Err(invalid(format!("highlight {name} has a non-finite attribute")));
            }
        }
        for m in &self.mappings {
            validate_lhs(&m.lhs).map_err(|e| invalid(e.to_string()))?;
            if !m.options.values().all(Value::is_finite) {
                return Err(invalid(format!("mapping {} has a non-finite option", m.lhs)));
            }
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> SdkError {
    SdkError::InvalidSnapshot(reason.into())
}

fn unique_ids(kind: &str, ids: impl Iterator<Item = u32>) -> SdkResult<BTreeSet<u32>> {
    let mut seen = BTreeSet::new();
    for id in ids {
        check_id(id).map_err(|e| invalid(format!("{kind}: {e}")))?;
        if !seen.insert(id) {
            return Err(invalid(format!("duplicate {kind} id {id}")));
        }
    }
    Ok(seen)
}

/// A decoded, verified session document.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionDocument {
    pub session_id: Uuid,
    pub exported_at: DateTime<Utc>,
    pub snapshot: SessionSnapshot,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    format: String,
    version: u32,
    session_id: Uuid,
    exported_at: DateTime<Utc>,
    checksum: String,
    payload: serde_json::Value,
}

// Hash the payload as a `serde_json::Value` so object keys are sorted the
// same way on both ends.
pub(crate) fn checksum(payload: &serde_json::Value) -> SdkResult<String> {
    let bytes = serde_json::to_vec(payload).map_err(|e| SdkError::Decode(e.to_string()))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Encode `snapshot` as a pretty-printed session document.
///
/// Fails with [`SdkError::InvalidSnapshot`] for a snapshot [`decode`] would
/// refuse.
pub fn encode(snapshot: &SessionSnapshot, session_id: Uuid) -> SdkResult<String> {
    snapshot.validate()?;
    let payload = serde_json::to_value(snapshot).map_err(|e| SdkError::Decode(e.to_string()))?;
    let envelope = Envelope {
        format: SESSION_FORMAT.into(),
        version: SESSION_VERSION,
        session_id,
        exported_at: Utc::now(),
        checksum: checksum(&payload)?,
        payload,
    };
    serde_json::to_string_pretty(&envelope).map_err(|e| SdkError::Decode(e.to_string()))
}

/// Decode and verify a session document.
///
/// Format and version are checked before the checksum, and the checksum
/// before the payload is interpreted. The decoded snapshot is validated
/// with [`SessionSnapshot::validate`].
pub fn decode(text: &str) -> SdkResult<SessionDocument> {
    let envelope: Envelope =
        serde_json::from_str(text).map_err(|e| SdkError::Decode(e.to_string()))?;
    if envelope.format != SESSION_FORMAT {
        return Err(SdkError::UnsupportedFormat(envelope.format));
    }
    if envelope.version != SESSION_VERSION {
        return Err(SdkError::UnsupportedVersion {
            found: envelope.version,
            supported: SESSION_VERSION,
        });
    }
    if !is_checksum(&envelope.checksum) {
        return Err(SdkError::Decode(format!(
            "malformed checksum {:?}",
            envelope.checksum
        )));
    }
    let computed = checksum(&envelope.payload)?;
    if !computed.eq_ignore_ascii_case(&envelope.checksum) {
        warn!(session = %envelope.session_id, "rejected session with bad checksum");
        return Err(SdkError::ChecksumMismatch {
            recorded: envelope.checksum,
            computed,
        });
    }
    let snapshot: SessionSnapshot = serde_json::from_value(envelope.payload)
        .map_err(|e| SdkError::Decode(e.to_string()))?;
    snapshot.validate()?;
    Ok(SessionDocument {
        session_id: envelope.session_id,
        exported_at: envelope.exported_at,
        snapshot,
    })
}

/// Whether `text` has the shape of a checksum: 64 hex digits.
pub fn is_checksum(text: &str) -> bool {
    text.len() == 64 && hex::decode(text).is_ok()
}
