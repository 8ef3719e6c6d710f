#![forbid(unsafe_code)]

//! The wire vocabulary.
//!
//! Three record tags, one per identity namespace:
//!
//! - `{"@": id, "value": v}` / `{"@": id, "path": [...]}` — a live data
//!   reference (literal snapshot or view into known data), optionally with
//!   a `"modifiers"` list.
//! - `{"@p": name, "path": [...]}` — a template-scope placeholder.
//! - `{"@fn": id, "args": [...]}` — a scoped-function call with
//!   placeholder-bound arguments.
//!
//! # Invariants
//!
//! 1. Round trip: `encode(decode(record))` is identical for any valid
//!    record, and `decode(encode(r)) == r`.
//! 2. Batch payloads preserve mutation order exactly.
//! 3. Template references address the renderer's live-data table by the
//!    same id/path a data record would carry, so static surrounding
//!    content stays in sync without re-sending literals.

use thiserror::Error;

use rxbridge_core::path::{self, Path, PathSeg};
use rxbridge_core::{Computed, Model, Mutation, PropVar, Value};

/// A decoded wire record.
#[derive(Debug, Clone, PartialEq)]
pub enum WireRecord {
    /// Literal snapshot of a cell that owns its value.
    Value {
        id: u64,
        value: Value,
        modifiers: Vec<String>,
    },
    /// Reference into already-known data for a cell id.
    View {
        id: u64,
        path: Path,
        modifiers: Vec<String>,
    },
    /// Template-scope placeholder reference.
    Placeholder { name: String, path: Path },
    /// Scoped-function call.
    ScopedCall { id: u64, args: Vec<WireRecord> },
}

/// A wire record failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("not a wire record: missing '@', '@p', or '@fn' tag")]
    NotARecord,

    #[error("missing field '{field}'")]
    MissingField { field: &'static str },

    #[error("malformed field '{field}'")]
    BadField { field: &'static str },
}

fn decode_modifiers(record: &serde_json::Map<String, Value>) -> Result<Vec<String>, DecodeError> {
    match record.get("modifiers") {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|m| {
                m.as_str()
                    .map(str::to_string)
                    .ok_or(DecodeError::BadField { field: "modifiers" })
            })
            .collect(),
        Some(_) => Err(DecodeError::BadField { field: "modifiers" }),
    }
}

/// Parse one wire record.
pub fn decode_record(value: &Value) -> Result<WireRecord, DecodeError> {
    let record = value.as_object().ok_or(DecodeError::NotARecord)?;

    if let Some(tag) = record.get("@") {
        let id = tag.as_u64().ok_or(DecodeError::BadField { field: "@" })?;
        let modifiers = decode_modifiers(record)?;
        return if let Some(v) = record.get("value") {
            Ok(WireRecord::Value {
                id,
                value: v.clone(),
                modifiers,
            })
        } else if let Some(p) = record.get("path") {
            let path = path::from_wire(p).ok_or(DecodeError::BadField { field: "path" })?;
            Ok(WireRecord::View {
                id,
                path,
                modifiers,
            })
        } else {
            Err(DecodeError::MissingField { field: "value" })
        };
    }

    if let Some(tag) = record.get("@p") {
        let name = tag
            .as_str()
            .ok_or(DecodeError::BadField { field: "@p" })?
            .to_string();
        let p = record
            .get("path")
            .ok_or(DecodeError::MissingField { field: "path" })?;
        let path = path::from_wire(p).ok_or(DecodeError::BadField { field: "path" })?;
        return Ok(WireRecord::Placeholder { name, path });
    }

    if let Some(tag) = record.get("@fn") {
        let id = tag.as_u64().ok_or(DecodeError::BadField { field: "@fn" })?;
        let args = record
            .get("args")
            .and_then(Value::as_array)
            .ok_or(DecodeError::MissingField { field: "args" })?
            .iter()
            .map(decode_record)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(WireRecord::ScopedCall { id, args });
    }

    Err(DecodeError::NotARecord)
}

/// Serialize one wire record. Inverse of [`decode_record`].
pub fn encode_record(record: &WireRecord) -> Value {
    let mut out = serde_json::Map::new();
    match record {
        WireRecord::Value {
            id,
            value,
            modifiers,
        } => {
            out.insert("@".into(), Value::from(*id));
            out.insert("value".into(), value.clone());
            if !modifiers.is_empty() {
                out.insert(
                    "modifiers".into(),
                    Value::Array(modifiers.iter().map(|m| Value::String(m.clone())).collect()),
                );
            }
        }
        WireRecord::View {
            id,
            path,
            modifiers,
        } => {
            out.insert("@".into(), Value::from(*id));
            out.insert("path".into(), path::to_wire(path));
            if !modifiers.is_empty() {
                out.insert(
                    "modifiers".into(),
                    Value::Array(modifiers.iter().map(|m| Value::String(m.clone())).collect()),
                );
            }
        }
        WireRecord::Placeholder { name, path } => {
            out.insert("@p".into(), Value::String(name.clone()));
            out.insert("path".into(), path::to_wire(path));
        }
        WireRecord::ScopedCall { id, args } => {
            out.insert("@fn".into(), Value::from(*id));
            out.insert(
                "args".into(),
                Value::Array(args.iter().map(encode_record).collect()),
            );
        }
    }
    Value::Object(out)
}

/// Serialize a flushed mutation queue as one ordered payload.
pub fn encode_batch(batch: &[Mutation]) -> Value {
    Value::Array(
        batch
            .iter()
            .map(|m| {
                let mut record = serde_json::Map::new();
                record.insert("@".into(), Value::from(m.id.raw()));
                if !m.path.is_empty() {
                    record.insert("path".into(), path::to_wire(&m.path));
                }
                record.insert("value".into(), m.value.clone());
                Value::Object(record)
            })
            .collect(),
    )
}

fn path_suffix(path: &Path) -> String {
    path.iter()
        .map(|seg| match seg {
            PathSeg::Key(k) => format!("['{}']", k.replace('\\', "\\\\").replace('\'', "\\'")),
            PathSeg::Index(i) => format!("[{i}]"),
        })
        .collect()
}

/// Render a cell as a textual reference for non-reactive embedding
/// (string interpolation in static content). The expression addresses the
/// renderer's live-data table, so re-renders stay in sync without
/// re-sending the value.
pub fn template_ref(model: &Model) -> String {
    format!(
        "{{{{ $root.data[{}]{} }}}}",
        model.id().raw(),
        path_suffix(model.path())
    )
}

/// Template reference for a computed value (its storage id, no path).
pub fn template_ref_computed(computed: &Computed) -> String {
    format!("{{{{ $root.data[{}] }}}}", computed.id().raw())
}

/// Template reference for a placeholder variable inside its scope.
pub fn template_ref_prop(prop: &PropVar) -> String {
    format!("{{{{ {}{} }}}}", prop.name(), path_suffix(prop.path()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rxbridge_core::{Reactive, Registry};
    use serde_json::json;

    #[test]
    fn decode_literal_record() {
        let record = decode_record(&json!({"@": 3, "value": {"a": 1}})).unwrap();
        assert_eq!(
            record,
            WireRecord::Value {
                id: 3,
                value: json!({"a": 1}),
                modifiers: vec![],
            }
        );
    }

    #[test]
    fn decode_view_record_with_modifiers() {
        let record =
            decode_record(&json!({"@": 7, "path": ["list", 0], "modifiers": ["number"]})).unwrap();
        let WireRecord::View {
            id,
            path,
            modifiers,
        } = record
        else {
            panic!("expected view record");
        };
        assert_eq!(id, 7);
        assert_eq!(path.len(), 2);
        assert_eq!(modifiers, vec!["number"]);
    }

    #[test]
    fn decode_placeholder_and_scoped_call() {
        let record =
            decode_record(&json!({"@fn": 2, "args": [{"@p": "prop_1", "path": ["x"]}]})).unwrap();
        let WireRecord::ScopedCall { id, args } = record else {
            panic!("expected scoped call");
        };
        assert_eq!(id, 2);
        assert_eq!(
            args[0],
            WireRecord::Placeholder {
                name: "prop_1".into(),
                path: std::iter::once(PathSeg::Key("x".into())).collect(),
            }
        );
    }

    #[test]
    fn decode_rejects_junk() {
        assert_eq!(decode_record(&json!(42)).unwrap_err(), DecodeError::NotARecord);
        assert_eq!(
            decode_record(&json!({"x": 1})).unwrap_err(),
            DecodeError::NotARecord
        );
        assert_eq!(
            decode_record(&json!({"@": "three", "value": 1})).unwrap_err(),
            DecodeError::BadField { field: "@" }
        );
        assert_eq!(
            decode_record(&json!({"@": 1})).unwrap_err(),
            DecodeError::MissingField { field: "value" }
        );
        assert_eq!(
            decode_record(&json!({"@p": "p", "path": [true]})).unwrap_err(),
            DecodeError::BadField { field: "path" }
        );
    }

    #[test]
    fn encode_decode_round_trip() {
        let records = vec![
            WireRecord::Value {
                id: 1,
                value: json!([1, "two", null]),
                modifiers: vec!["number".into()],
            },
            WireRecord::View {
                id: 2,
                path: [PathSeg::Key("a".into()), PathSeg::Index(3)]
                    .into_iter()
                    .collect(),
                modifiers: vec![],
            },
            WireRecord::Placeholder {
                name: "prop_9".into(),
                path: Path::new(),
            },
            WireRecord::ScopedCall {
                id: 4,
                args: vec![WireRecord::Placeholder {
                    name: "prop_2".into(),
                    path: std::iter::once(PathSeg::Index(0)).collect(),
                }],
            },
        ];
        for record in records {
            let encoded = encode_record(&record);
            assert_eq!(decode_record(&encoded).unwrap(), record);
            // Decoding and re-encoding a canonical record is identity.
            assert_eq!(encode_record(&decode_record(&encoded).unwrap()), encoded);
        }
    }

    #[test]
    fn render_as_data_decodes_cleanly() {
        let registry = Registry::new();
        let model = Model::new(&registry, json!({"k": [true]}));
        let decoded = decode_record(&model.render_as_data()).unwrap();
        assert_eq!(
            decoded,
            WireRecord::Value {
                id: model.id().raw(),
                value: json!({"k": [true]}),
                modifiers: vec![],
            }
        );

        let view = model.view("k").view(0usize);
        let decoded = decode_record(&view.render_as_data()).unwrap();
        let WireRecord::View { id, path, .. } = decoded else {
            panic!("expected view record");
        };
        assert_eq!(id, model.id().raw());
        assert_eq!(&path, view.path());
    }

    #[test]
    fn batch_preserves_order() {
        let batch = vec![
            Mutation {
                id: rxbridge_core::CellId::from_raw(1),
                path: Path::new(),
                value: json!(10),
            },
            Mutation {
                id: rxbridge_core::CellId::from_raw(2),
                path: std::iter::once(PathSeg::Key("a".into())).collect(),
                value: json!(20),
            },
        ];
        let payload = encode_batch(&batch);
        assert_eq!(
            payload,
            json!([
                {"@": 1, "value": 10},
                {"@": 2, "path": ["a"], "value": 20},
            ])
        );
    }

    #[test]
    fn template_refs_address_the_data_table() {
        let registry = Registry::new();
        let model = Model::new(&registry, json!({"user": {"name": "ada"}}));
        let name = model.view("user").view("name");
        assert_eq!(
            template_ref(&name),
            format!("{{{{ $root.data[{}]['user']['name'] }}}}", model.id().raw())
        );

        let prop = PropVar::new(&registry).view(0usize);
        assert_eq!(
            template_ref_prop(&prop),
            format!("{{{{ {}[0] }}}}", prop.name())
        );
    }

    #[test]
    fn template_ref_quotes_awkward_keys() {
        let registry = Registry::new();
        let model = Model::new(&registry, json!({"it's": 1}));
        let view = model.view("it's");
        assert_eq!(
            template_ref(&view),
            format!("{{{{ $root.data[{}]['it\\'s'] }}}}", model.id().raw())
        );
    }
}
