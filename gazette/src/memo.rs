use std::cell::RefCell;

/// Single-slot cache for a derived value, recomputed only when its input changes.
///
/// How "changed" is decided is up to the caller; selectors over persistent maps
/// compare by pointer so a lookup stays O(1).
///
/// Not `Sync`: keep one per thread in a `thread_local!`.
pub struct Memo<K, V> {
    last: RefCell<Option<(K, V)>>,
}

impl<K, V> Memo<K, V> {
    pub const fn new() -> Self {
        Self {
            last: RefCell::new(None),
        }
    }
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone> Memo<K, V> {
    pub fn get<E, F>(&self, input: &K, same_input: E, compute: F) -> V
    where
        E: Fn(&K, &K) -> bool,
        F: FnOnce(&K) -> V,
    {
        if let Some((cached_input, cached_value)) = self.last.borrow().as_ref() {
            if same_input(cached_input, input) {
                return cached_value.clone();
            }
        }
        let value = compute(input);
        *self.last.borrow_mut() = Some((input.clone(), value.clone()));
        value
    }
}
