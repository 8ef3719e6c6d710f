#![forbid(unsafe_code)]

//! Structural paths into JSON values.
//!
//! A path identifies a sub-location inside a cell's stored value: a sequence
//! of mapping keys and sequence indexes. The empty path addresses the value
//! itself. Paths are short in practice (a key or two), so segments are kept
//! inline via `SmallVec`.
//!
//! # Invariants
//!
//! 1. `lookup` walks segments in order and fails on the first segment that
//!    does not resolve, reporting its position.
//! 2. `assign` replaces the value at the addressed location; it may insert a
//!    new mapping key, but never grows a sequence.
//! 3. Wire form is a JSON array of strings and numbers, in segment order.

use serde_json::Value;
use smallvec::SmallVec;
use std::fmt;

use crate::error::PathError;

/// One structural access step: a mapping key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSeg {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSeg::Key(k) => write!(f, "'{k}'"),
            PathSeg::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for PathSeg {
    fn from(key: &str) -> Self {
        PathSeg::Key(key.to_string())
    }
}

impl From<String> for PathSeg {
    fn from(key: String) -> Self {
        PathSeg::Key(key)
    }
}

impl From<usize> for PathSeg {
    fn from(index: usize) -> Self {
        PathSeg::Index(index)
    }
}

/// A sequence of access segments. Empty means "the value itself".
pub type Path = SmallVec<[PathSeg; 4]>;

/// Human-readable JSON type name, for error messages.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Resolve `path` against `root`, returning the addressed sub-value.
pub fn lookup<'a>(root: &'a Value, path: &Path) -> Result<&'a Value, PathError> {
    let mut current = root;
    for (pos, seg) in path.iter().enumerate() {
        current = match (current, seg) {
            (Value::Object(map), PathSeg::Key(key)) => {
                map.get(key).ok_or_else(|| PathError::MissingKey {
                    key: key.clone(),
                    pos,
                })?
            }
            (Value::Array(items), PathSeg::Index(index)) => {
                items.get(*index).ok_or(PathError::IndexOutOfRange {
                    index: *index,
                    len: items.len(),
                    pos,
                })?
            }
            (other, seg) => {
                return Err(PathError::NotAContainer {
                    segment: seg.to_string(),
                    found: type_name(other),
                    pos,
                });
            }
        };
    }
    Ok(current)
}

/// Replace the value addressed by `path` inside `root`.
///
/// An empty path replaces `root` wholesale. A trailing `Key` segment may
/// insert a key that does not exist yet; a trailing `Index` segment must
/// address an existing element.
pub fn assign(root: &mut Value, path: &Path, new_value: Value) -> Result<(), PathError> {
    let Some((last, parents)) = path.split_last() else {
        *root = new_value;
        return Ok(());
    };

    let mut current = root;
    for (pos, seg) in parents.iter().enumerate() {
        current = match (current, seg) {
            (Value::Object(map), PathSeg::Key(key)) => {
                map.get_mut(key).ok_or_else(|| PathError::MissingKey {
                    key: key.clone(),
                    pos,
                })?
            }
            (Value::Array(items), PathSeg::Index(index)) => {
                let len = items.len();
                items.get_mut(*index).ok_or(PathError::IndexOutOfRange {
                    index: *index,
                    len,
                    pos,
                })?
            }
            (other, seg) => {
                return Err(PathError::NotAContainer {
                    segment: seg.to_string(),
                    found: type_name(other),
                    pos,
                });
            }
        };
    }

    let pos = path.len() - 1;
    match (current, last) {
        (Value::Object(map), PathSeg::Key(key)) => {
            map.insert(key.clone(), new_value);
            Ok(())
        }
        (Value::Array(items), PathSeg::Index(index)) => {
            let len = items.len();
            let slot = items.get_mut(*index).ok_or(PathError::IndexOutOfRange {
                index: *index,
                len,
                pos,
            })?;
            *slot = new_value;
            Ok(())
        }
        (other, seg) => Err(PathError::NotAContainer {
            segment: seg.to_string(),
            found: type_name(other),
            pos,
        }),
    }
}

/// Wire form: a JSON array of key strings and index numbers.
pub fn to_wire(path: &Path) -> Value {
    Value::Array(
        path.iter()
            .map(|seg| match seg {
                PathSeg::Key(k) => Value::String(k.clone()),
                PathSeg::Index(i) => Value::from(*i),
            })
            .collect(),
    )
}

/// Parse the wire form back into a path. Non-array input or segments that
/// are neither strings nor unsigned integers yield `None`.
pub fn from_wire(value: &Value) -> Option<Path> {
    let items = value.as_array()?;
    let mut path = Path::new();
    for item in items {
        match item {
            Value::String(key) => path.push(PathSeg::Key(key.clone())),
            Value::Number(n) => path.push(PathSeg::Index(usize::try_from(n.as_u64()?).ok()?)),
            _ => return None,
        }
    }
    Some(path)
}
