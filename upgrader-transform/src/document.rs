//! In-process transforms over JSON documents.
//!
//! A transform receives the parsed file and a [`DocumentApi`] over a deep
//! copy of it, and must return the resulting document. Returning `None` is a
//! bug in the transform, not a no-op.

use camino::Utf8PathBuf;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct DocumentFile {
    pub path: Utf8PathBuf,
    pub json: Value,
}

pub trait DocumentTransform {
    fn transform(&self, file: &DocumentFile, api: &mut DocumentApi)
    -> anyhow::Result<Option<Value>>;
}

impl<F> DocumentTransform for F
where
    F: Fn(&DocumentFile, &mut DocumentApi) -> anyhow::Result<Option<Value>>,
{
    fn transform(
        &self,
        file: &DocumentFile,
        api: &mut DocumentApi,
    ) -> anyhow::Result<Option<Value>> {
        self(file, api)
    }
}

/// Path-based access to a working copy of a document.
///
/// Paths are dot-separated (`dependencies.@acme/core`); numeric segments
/// index into arrays. The empty path is the root. Keys that contain a dot,
/// such as `exports["./package.json"]`, are out of reach of dotted paths;
/// use the `*_at` forms, which take the segments as a slice.
#[derive(Debug, Clone)]
pub struct DocumentApi {
    value: Value,
}

/// A path that indexes into an array it cannot address.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot set {path}: {reason}")]
pub struct PathError {
    pub path: String,
    pub reason: String,
}

impl DocumentApi {
    pub fn new(original: &Value) -> Self {
        Self {
            value: original.clone(),
        }
    }

    pub fn root(&self) -> &Value {
        &self.value
    }

    pub fn root_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.get_at(&segments(path))
    }

    pub fn get_at(&self, segs: &[&str]) -> Option<&Value> {
        segs.iter().try_fold(&self.value, |cur, seg| match cur {
            Value::Object(map) => map.get(*seg),
            Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Set a value, creating intermediate objects. Scalars on the way are
    /// replaced by objects; arrays are only indexed, and an index past the
    /// end (or a non-numeric segment) leaves the document untouched.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<&mut Self, PathError> {
        self.set_at(&segments(path), value)
    }

    pub fn set_at(&mut self, segs: &[&str], value: impl Into<Value>) -> Result<&mut Self, PathError> {
        let Some((last, parents)) = segs.split_last() else {
            self.value = value.into();
            return Ok(self);
        };
        let fail = |reason: String| PathError {
            path: segs.join("."),
            reason,
        };

        // Validate before touching anything so a bad path changes nothing.
        let mut seen = Some(&self.value);
        for (depth, seg) in segs.iter().enumerate() {
            let Some(Value::Array(items)) = seen else {
                seen = seen.and_then(Value::as_object).and_then(|map| map.get(*seg));
                continue;
            };
            let len = items.len();
            let appends = depth == parents.len();
            match seg.parse::<usize>() {
                Ok(i) if i < len || (appends && i == len) => seen = items.get(i),
                Ok(i) => return Err(fail(format!("index {i} is past the end of an array of {len}"))),
                Err(_) => return Err(fail(format!("`{seg}` is not an array index"))),
            }
        }

        let mut cur = &mut self.value;
        for seg in parents {
            cur = child_mut(cur, seg);
        }
        match cur {
            Value::Array(items) => {
                let i = last.parse::<usize>().unwrap_or(items.len());
                if i < items.len() {
                    items[i] = value.into();
                } else {
                    items.push(value.into());
                }
            }
            Value::Object(map) => {
                map.insert(last.to_string(), value.into());
            }
            other => {
                let mut map = Map::new();
                map.insert(last.to_string(), value.into());
                *other = Value::Object(map);
            }
        }
        Ok(self)
    }

    /// Remove a value, returning it if it existed.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let segs = segments(path);
        let (last, parents) = segs.split_last()?;

        let mut cur = &mut self.value;
        for seg in parents {
            cur = match cur {
                Value::Object(map) => map.get_mut(*seg)?,
                Value::Array(items) => items.get_mut(seg.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        match cur {
            Value::Object(map) => map.shift_remove(*last),
            Value::Array(items) => {
                let i = last.parse::<usize>().ok()?;
                (i < items.len()).then(|| items.remove(i))
            }
            _ => None,
        }
    }

    /// Deep-merge `other` into the root. Objects merge key by key, arrays
    /// merge index by index, anything else is overwritten.
    pub fn merge(&mut self, other: Value) -> &mut Self {
        merge_into(&mut self.value, other);
        self
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

/// Step into `seg`, which `set_at` has already checked against arrays.
fn child_mut<'a>(cur: &'a mut Value, seg: &str) -> &'a mut Value {
    if !cur.is_object() && !cur.is_array() {
        *cur = Value::Object(Map::new());
    }
    match cur {
        Value::Array(items) => &mut items[seg.parse::<usize>().unwrap_or_default()],
        Value::Object(map) => map
            .entry(seg.to_string())
            .or_insert_with(|| Value::Object(Map::new())),
        other => other,
    }
}

fn merge_into(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(dst), Value::Object(src)) => {
            for (k, v) in src {
                match dst.get_mut(&k) {
                    Some(existing) => merge_into(existing, v),
                    None => {
                        dst.insert(k, v);
                    }
                }
            }
        }
        (Value::Array(dst), Value::Array(src)) => {
            for (i, v) in src.into_iter().enumerate() {
                if i < dst.len() {
                    merge_into(&mut dst[i], v);
                } else {
                    dst.push(v);
                }
            }
        }
        (dst, src) => *dst = src,
    }
}
