use std::collections::HashMap;
use std::hash::Hash;

/// Write-side object numbering.
///
/// Keys are identities, not contents: two structurally equal dictionaries
/// registered under different keys get different numbers, while the same
/// key always maps back to its first number. Numbering starts at 1 and
/// follows registration order, so `entries_in_order()[n - 1]` is object `n`.
#[derive(Debug, Clone)]
pub struct XRefRegistry<K> {
    numbers: HashMap<K, u32>,
    order: Vec<K>,
}

impl<K: Copy + Eq + Hash> Default for XRefRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + Eq + Hash> XRefRegistry<K> {
    pub fn new() -> Self {
        Self {
            numbers: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Number assigned to `key`, assigning the next one on first sight.
    pub fn register(&mut self, key: K) -> u32 {
        if let Some(&n) = self.numbers.get(&key) {
            return n;
        }
        self.order.push(key);
        let n = self.order.len() as u32;
        self.numbers.insert(key, n);
        n
    }

    pub fn number_of(&self, key: K) -> Option<u32> {
        self.numbers.get(&key).copied()
    }

    pub fn is_registered(&self, key: K) -> bool {
        self.numbers.contains_key(&key)
    }

    /// `"n 0 R"` for `key`, registering it if needed.
    pub fn reference_string(&mut self, key: K) -> String {
        format!("{} 0 R", self.register(key))
    }

    pub fn entry_count(&self) -> usize {
        self.order.len()
    }

    pub fn entries_in_order(&self) -> &[K] {
        &self.order
    }

    /// Key registered as object `number`.
    pub fn key_of(&self, number: u32) -> Option<K> {
        number
            .checked_sub(1)
            .and_then(|i| self.order.get(i as usize))
            .copied()
    }
}
