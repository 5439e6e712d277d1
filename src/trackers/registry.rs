use crate::utils::color::Rgb;
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Registry shared between sessions and threads
pub type SharedIdentityRegistry = Arc<RwLock<IdentityRegistry>>;

static GLOBAL_REGISTRY: Lazy<SharedIdentityRegistry> =
    Lazy::new(|| Arc::new(RwLock::new(IdentityRegistry::new())));

/// Process-wide registry. It is created on first use and lives until the process exits.
///
pub fn global_registry() -> SharedIdentityRegistry {
    GLOBAL_REGISTRY.clone()
}

/// Stable display color per identity key.
///
/// A color is drawn once, when the key is seen for the first time, and never changes
/// afterwards. Entries are never evicted, the registry grows with the number of distinct keys.
/// Colors are drawn from the registry's own generator, so the sequence depends only on the
/// registry state and the order in which new keys arrive.
///
#[derive(Debug)]
pub struct IdentityRegistry {
    colors: HashMap<String, Rgb>,
    rng: StdRng,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self {
            colors: HashMap::default(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Registry with a reproducible color sequence
    ///
    pub fn with_seed(seed: u64) -> Self {
        Self {
            colors: HashMap::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn shared(self) -> SharedIdentityRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Color of the key, registering a new random one for unseen keys
    ///
    pub fn color_for(&mut self, key: &str) -> Rgb {
        if let Some(c) = self.colors.get(key) {
            return *c;
        }
        let c: Rgb = self.rng.gen();
        self.colors.insert(key.to_string(), c);
        c
    }

    /// Color of the key without registering it
    ///
    pub fn get(&self, key: &str) -> Option<Rgb> {
        self.colors.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.colors.keys().map(|k| k.as_str())
    }
}
