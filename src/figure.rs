use serde::Serialize;
use serde_json::{Map, Value};

/// One renderable series in the external charting library's vocabulary.
///
/// The trace vocabulary is open (overlays may set any key the renderer
/// understands), so this is a thin wrapper over a JSON object with the
/// handful of operations the normalizer needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Trace(Map<String, Value>);

impl Trace {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn set_if_absent(&mut self, key: &str, value: impl Into<Value>) {
        if !self.0.contains_key(key) {
            self.set(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The trace `type` field as a string, when set.
    pub fn kind(&self) -> Option<&str> {
        self.get("type").and_then(Value::as_str)
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// The non-data rendering configuration passed alongside traces (axes,
/// title, margins, legend, bar mode). Like [`Trace`], an open JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Layout(Map<String, Value>);

impl Layout {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Start from a caller-supplied layout object, or empty when none given.
    /// The caller's value must be a JSON object.
    pub fn from_caller(value: Option<&Value>) -> anyhow::Result<Self> {
        match value {
            None => Ok(Self::new()),
            Some(Value::Object(map)) => Ok(Self(map.clone())),
            Some(other) => anyhow::bail!("layout must be a JSON object, got {other}"),
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// True when `key` exists but is not an object (the caller supplied a
    /// malformed sub-entry that [`Layout::object_mut`] would replace).
    pub fn has_non_object(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(|v| !v.is_object())
    }

    /// Borrow the object under `key`, inserting an empty one when missing.
    /// A non-object value under `key` is replaced.
    pub fn object_mut(&mut self, key: &str) -> &mut Map<String, Value> {
        let entry = self
            .0
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// The normalized output: an ordered trace array plus a layout, ready to be
/// handed to the external renderer. Validation warnings accumulated while
/// normalizing ride along but are not serialized.
#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
    #[serde(skip)]
    pub warnings: Vec<String>,
}
