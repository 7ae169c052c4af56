use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::BatchError;

/// Estado de checkpoint/reinicio: mapa clave -> valor JSON.
///
/// Pertenece colectivamente a los colaboradores con capacidad de stream; se
/// vuelca al store externo tras cada commit. `dirty` indica que hubo cambios
/// desde la última persistencia.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    map: IndexMap<String, Value>,
    #[serde(default)]
    dirty: bool,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruye un contexto leído del store (no queda marcado como sucio).
    pub fn from_map(map: IndexMap<String, Value>) -> Self {
        Self { map, dirty: false }
    }

    /// Inserta un valor serializable. Sólo marca `dirty` si el valor cambia.
    pub fn put<V: Serialize>(&mut self, key: impl Into<String>, value: V) -> Result<(), BatchError> {
        let value = serde_json::to_value(value).map_err(|e| BatchError::Stream(format!("serialize context value: {e}")))?;
        self.put_value(key, value);
        Ok(())
    }

    pub fn put_value(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if self.map.get(&key) != Some(&value) {
            self.map.insert(key, value);
            self.dirty = true;
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    /// Lee y deserializa un valor; `Ok(None)` si la clave no existe.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, BatchError> {
        match self.map.get(key) {
            None => Ok(None),
            Some(v) => serde_json::from_value(v.clone()).map(Some)
                                                        .map_err(|e| BatchError::Stream(format!("decode context key '{key}': {e}"))),
        }
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.map.get(key).and_then(Value::as_u64)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.map.shift_remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.map.iter()
    }

    pub fn map(&self) -> &IndexMap<String, Value> {
        &self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_marks_dirty_only_on_change() {
        let mut ctx = ExecutionContext::new();
        ctx.put("reader.read.count", 2u64).unwrap();
        assert!(ctx.is_dirty());
        ctx.clear_dirty();
        ctx.put("reader.read.count", 2u64).unwrap();
        assert!(!ctx.is_dirty());
        ctx.put("reader.read.count", 4u64).unwrap();
        assert!(ctx.is_dirty());
        assert_eq!(ctx.get_u64("reader.read.count"), Some(4));
    }

    #[test]
    fn typed_access_reports_decode_errors() {
        let mut ctx = ExecutionContext::new();
        ctx.put_value("name", json!("people"));
        assert_eq!(ctx.get_as::<String>("name").unwrap().as_deref(), Some("people"));
        assert_eq!(ctx.get_as::<String>("missing").unwrap(), None);
        assert!(ctx.get_as::<u64>("name").is_err());
    }

    #[test]
    fn from_map_preserves_insertion_order() {
        let mut map = IndexMap::new();
        map.insert("b".to_string(), json!(1));
        map.insert("a".to_string(), json!(2));
        let ctx = ExecutionContext::from_map(map);
        let keys: Vec<&str> = ctx.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert!(!ctx.is_dirty());
    }
}
