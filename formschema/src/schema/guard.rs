use std::rc::Rc;

use serde_json::Value;

use super::equal::deep_equal;

/// Schemas already expanded along one resolution chain.
///
/// The guard is a persistent list: [`RecursionGuard::with`] returns a new
/// guard sharing its tail with the old one, so a branch can never observe the
/// entries a sibling branch added.
#[derive(Debug, Clone, Default)]
pub struct RecursionGuard {
    head: Option<Rc<Entry>>,
    len: usize,
}

#[derive(Debug)]
struct Entry {
    schema: Value,
    next: Option<Rc<Entry>>,
}

impl RecursionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A guard that also remembers `schema`.
    #[must_use]
    pub fn with(&self, schema: Value) -> Self {
        Self {
            head: Some(Rc::new(Entry {
                schema,
                next: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// Whether a structurally equal schema was seen before.
    pub fn contains(&self, schema: &Value) -> bool {
        self.iter().any(|seen| deep_equal(seen, schema))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entries, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        std::iter::successors(self.head.as_deref(), |entry| entry.next.as_deref())
            .map(|entry| &entry.schema)
    }
}
