//! Typed, branchable configuration store.
//!
//! [`Configs`] maps [`ConfigKey`] identities to values of any type. The set of
//! keys is open: framework settings (encoder, decoder, log level, auth policy)
//! and user-defined settings live side by side.
//!
//! Keys are declared as `static` items and compared by identity, never by
//! label:
//!
//! ```
//! use mantle_core::{ConfigKey, Configs};
//!
//! static RETRY_BUDGET: ConfigKey<u32> = ConfigKey::new("retry_budget");
//!
//! let root = Configs::new();
//! let child = root.with(&RETRY_BUDGET, 3);
//!
//! assert_eq!(child.get(&RETRY_BUDGET), Some(&3));
//! assert_eq!(root.get(&RETRY_BUDGET), None);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`ConfigKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct KeyId(u64);

/// Typed identifier for a configuration slot.
///
/// Declare keys as `static` items: the identity is assigned on first use and
/// stays attached to that item. A `const` would produce a fresh key at every
/// use site.
pub struct ConfigKey<V> {
    name: &'static str,
    id: OnceLock<KeyId>,
    _value: PhantomData<fn() -> V>,
}

impl<V> ConfigKey<V> {
    /// Create a new key with a label used for debugging only.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            id: OnceLock::new(),
            _value: PhantomData,
        }
    }

    /// Key label.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    fn id(&self) -> KeyId {
        *self
            .id
            .get_or_init(|| KeyId(NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed)))
    }
}

impl<V> fmt::Debug for ConfigKey<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigKey")
            .field("name", &self.name)
            .field("id", &self.id.get())
            .finish()
    }
}

#[derive(Clone)]
struct Entry {
    name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

/// Immutable, heterogeneous configuration store.
///
/// Cloning is cheap (a reference count bump). Deriving a store with
/// [`Configs::with`] copies the key table once and shares every value with
/// the parent; the parent never observes the override.
#[derive(Clone, Default)]
pub struct Configs {
    values: Arc<HashMap<KeyId, Entry>>,
}

impl Configs {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored for `key`, or `None` when the key was never set.
    #[must_use]
    pub fn get<V>(&self, key: &ConfigKey<V>) -> Option<&V>
    where
        V: Any + Send + Sync,
    {
        self.values
            .get(&key.id())
            .and_then(|entry| entry.value.downcast_ref::<V>())
    }

    /// Value stored for `key`, or `default` when the key was never set.
    #[must_use]
    pub fn get_or<V>(&self, key: &ConfigKey<V>, default: V) -> V
    where
        V: Any + Send + Sync + Clone,
    {
        self.get(key).cloned().unwrap_or(default)
    }

    /// Returns `true` if `key` has a value in this store.
    #[must_use]
    pub fn contains<V>(&self, key: &ConfigKey<V>) -> bool {
        self.values.contains_key(&key.id())
    }

    /// Derive a new store where `key` maps to `value`.
    #[must_use]
    pub fn with<V>(&self, key: &ConfigKey<V>, value: V) -> Self
    where
        V: Any + Send + Sync,
    {
        let mut derived = self.clone();
        derived.insert(key, value);
        derived
    }

    /// Set `key` on this store in place.
    ///
    /// Other clones of the store keep their values.
    pub fn insert<V>(&mut self, key: &ConfigKey<V>, value: V)
    where
        V: Any + Send + Sync,
    {
        Arc::make_mut(&mut self.values).insert(
            key.id(),
            Entry {
                name: key.name,
                value: Arc::new(value),
            },
        );
    }

    /// Number of keys set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no key is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Configs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self
            .values
            .values()
            .map(|entry| entry.name)
            .collect::<Vec<_>>();
        names.sort_unstable();
        f.debug_struct("Configs").field("keys", &names).finish()
    }
}
