//! Typed option keys

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A named, typed handle for an entry in an [`OptionBag`](super::OptionBag).
///
/// Equality and hashing look at the name only. The type parameter is a
/// call-site contract: reading a key's value back as a different type is a
/// caller error that the bag reports as such.
pub struct Key<T> {
    name: Cow<'static, str>,
    _type: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    /// Key with a static name, usable in `const` items
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            _type: PhantomData,
        }
    }

    /// Key with a runtime name, for backend-specific options
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            _type: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            _type: PhantomData,
        }
    }
}

impl<T> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T> Eq for Key<T> {}

impl<T> Hash for Key<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Key").field(&self.name.as_ref()).finish()
    }
}

impl<T> fmt::Display for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equal_by_name() {
        const A: Key<usize> = Key::new("LIMIT");
        let b: Key<usize> = Key::named("LIMIT");
        assert_eq!(A, b);
        assert_ne!(A, Key::named("OFFSET"));

        let set: HashSet<Key<usize>> = [A, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_display() {
        let key: Key<String> = Key::named("vendor.hint");
        assert_eq!(key.to_string(), "vendor.hint");
        assert_eq!(format!("{:?}", key), "Key(\"vendor.hint\")");
    }
}
