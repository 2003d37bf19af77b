//! Type-erased option storage

use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::fmt;

use super::errors::QueryError;
use super::key::Key;

/// Values that can live in an [`OptionBag`]
pub trait OptionValue: Any + Clone + PartialEq + fmt::Debug + Send + Sync {}

impl<T: Any + Clone + PartialEq + fmt::Debug + Send + Sync> OptionValue for T {}

/// Object-safe view of a stored value
trait Erased: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn clone_box(&self) -> Box<dyn Erased>;
    fn eq_erased(&self, other: &dyn Erased) -> bool;
    fn type_name(&self) -> &'static str;
    fn render(&self) -> String;
}

impl<T: OptionValue> Erased for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_box(&self) -> Box<dyn Erased> {
        Box::new(self.clone())
    }

    fn eq_erased(&self, other: &dyn Erased) -> bool {
        other.as_any().downcast_ref::<T>() == Some(self)
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn render(&self) -> String {
        format!("{:?}", self)
    }
}

struct Entry(Box<dyn Erased>);

impl Entry {
    fn value(&self) -> &dyn Erased {
        self.0.as_ref()
    }
}

impl Clone for Entry {
    fn clone(&self) -> Self {
        Entry(self.value().clone_box())
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.value().eq_erased(other.value())
    }
}

/// Open set of named options, keyed by [`Key`] name.
///
/// Setting a key replaces any earlier value under the same name. Reading with
/// a type other than the stored one is a caller error: the `try_*` methods
/// report it as [`QueryError::OptionType`], the plain ones panic.
#[derive(Clone, Default, PartialEq)]
pub struct OptionBag {
    entries: BTreeMap<String, Entry>,
}

impl OptionBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: OptionValue>(&mut self, key: &Key<T>, value: T) {
        self.entries.insert(key.name().to_string(), Entry(Box::new(value)));
    }

    pub fn try_get<T: OptionValue>(&self, key: &Key<T>) -> Result<Option<&T>, QueryError> {
        match self.entries.get(key.name()) {
            None => Ok(None),
            Some(entry) => match entry.value().as_any().downcast_ref::<T>() {
                Some(value) => Ok(Some(value)),
                None => Err(mismatch::<T>(key, entry)),
            },
        }
    }

    /// Reads an option without removing it.
    ///
    /// # Panics
    ///
    /// Panics if the stored value is not a `T`.
    pub fn get<T: OptionValue>(&self, key: &Key<T>) -> Option<&T> {
        self.try_get(key).unwrap_or_else(|e| panic!("{}", e))
    }

    /// Removes and returns an option. A type mismatch leaves the entry in
    /// place.
    pub fn try_take<T: OptionValue>(&mut self, key: &Key<T>) -> Result<Option<T>, QueryError> {
        let stored = match self.entries.get(key.name()) {
            None => return Ok(None),
            Some(entry) => entry.value().as_any().is::<T>(),
        };
        if !stored {
            let entry = &self.entries[key.name()];
            return Err(mismatch::<T>(key, entry));
        }
        Ok(self
            .entries
            .remove(key.name())
            .and_then(|entry| entry.0.into_any().downcast::<T>().ok())
            .map(|boxed| *boxed))
    }

    /// Removes and returns an option, or `default` when absent.
    pub fn try_consume<T: OptionValue>(&mut self, key: &Key<T>, default: T) -> Result<T, QueryError> {
        Ok(self.try_take(key)?.unwrap_or(default))
    }

    /// # Panics
    ///
    /// Panics if the stored value is not a `T`.
    pub fn take<T: OptionValue>(&mut self, key: &Key<T>) -> Option<T> {
        self.try_take(key).unwrap_or_else(|e| panic!("{}", e))
    }

    /// # Panics
    ///
    /// Panics if the stored value is not a `T`.
    pub fn consume<T: OptionValue>(&mut self, key: &Key<T>, default: T) -> T {
        self.try_consume(key, default).unwrap_or_else(|e| panic!("{}", e))
    }

    /// Whether an option of any type is stored under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Drops an option by name, whatever its type
    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Name and debug rendering of each stored value, sorted by name
    pub fn describe(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.value().render()))
            .collect()
    }
}

impl fmt::Debug for OptionBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, DebugEntry(v))))
            .finish()
    }
}

struct DebugEntry<'a>(&'a Entry);

impl fmt::Debug for DebugEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.value().render())
    }
}

fn mismatch<T>(key: &Key<T>, entry: &Entry) -> QueryError {
    QueryError::OptionType {
        key: key.name().to_string(),
        expected: type_name::<T>(),
        actual: entry.value().type_name(),
    }
}
