//! Type-erased state values and the shared root state tree
//!
//! Each facade owns a typed slice, but the shared root tree must hold
//! slices of many types at once. [`StateValue`] erases the slice type
//! behind `Arc<dyn Any + Send + Sync>`; [`StateTree`] arranges values in a
//! persistent path-addressed tree.
//!
//! The tree is conceptually append-only between commits: every write
//! produces a new tree by structural replacement along the written path,
//! sharing every untouched branch with the previous tree.

use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::path::SlicePath;

/// A type-erased, reference-counted slice value.
///
/// Clone is cheap (an atomic increment). Identity comparison via
/// [`StateValue::ptr_eq`] is how the store layer detects whether a commit
/// actually replaced a slice.
#[derive(Clone)]
pub struct StateValue {
    inner: Arc<dyn Any + Send + Sync>,
}

impl StateValue {
    /// Wrap any `Send + Sync` value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Borrow the value as `T`, if the stored type matches.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Clone the value out as `T`, if the stored type matches.
    #[must_use]
    pub fn downcast<T: Any + Clone>(&self) -> Option<T> {
        self.inner.downcast_ref::<T>().cloned()
    }

    /// Check whether the stored value is of type `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// The `TypeId` of the stored value.
    #[must_use]
    pub fn stored_type_id(&self) -> TypeId {
        (*self.inner).type_id()
    }

    /// Identity comparison: true iff both wrap the same allocation.
    #[must_use]
    pub fn ptr_eq(a: &StateValue, b: &StateValue) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl fmt::Debug for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateValue")
            .field("type_id", &(*self.inner).type_id())
            .finish()
    }
}

/// One node of the root tree: an optional slice value plus named children.
#[derive(Debug, Default)]
struct Node {
    value: Option<StateValue>,
    children: BTreeMap<String, Arc<Node>>,
}

impl Node {
    fn shallow_clone(&self) -> Node {
        Node {
            value: self.value.clone(),
            children: self.children.clone(),
        }
    }

    fn descend(&self, segments: &[String]) -> Option<&Node> {
        let mut node = self;
        for segment in segments {
            node = node.children.get(segment)?;
        }
        Some(node)
    }
}

/// Persistent path-addressed tree of slice values.
///
/// All operations are pure: they leave `self` untouched and return a new
/// tree that shares every branch the written path did not cross.
#[derive(Clone, Debug, Default)]
pub struct StateTree {
    root: Arc<Node>,
}

impl StateTree {
    /// An empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The slice value at `path`, if present.
    #[must_use]
    pub fn get(&self, path: &SlicePath) -> Option<&StateValue> {
        self.root.descend(path.segments())?.value.as_ref()
    }

    /// True iff a slice value is present at `path`.
    #[must_use]
    pub fn contains(&self, path: &SlicePath) -> bool {
        self.get(path).is_some()
    }

    /// Return a new tree with the slice at `path` replaced by `value`.
    ///
    /// Children below `path` are preserved; untouched branches are shared
    /// with `self`.
    #[must_use]
    pub fn with_value(&self, path: &SlicePath, value: StateValue) -> StateTree {
        fn set(node: &Node, segments: &[String], value: StateValue) -> Node {
            let mut next = node.shallow_clone();
            match segments.split_first() {
                None => next.value = Some(value),
                Some((head, rest)) => {
                    let rebuilt = match node.children.get(head) {
                        Some(child) => set(child, rest, value),
                        None => set(&Node::default(), rest, value),
                    };
                    next.children.insert(head.clone(), Arc::new(rebuilt));
                }
            }
            next
        }
        StateTree {
            root: Arc::new(set(&self.root, path.segments(), value)),
        }
    }

    /// Return a new tree with the entire sub-tree at `path` removed.
    ///
    /// Removing an absent path returns an unchanged clone.
    #[must_use]
    pub fn without_subtree(&self, path: &SlicePath) -> StateTree {
        fn remove(node: &Node, segments: &[String]) -> Option<Node> {
            let (head, rest) = segments.split_first()?;
            let child = node.children.get(head)?;
            let mut next = node.shallow_clone();
            if rest.is_empty() {
                next.children.remove(head);
            } else {
                let rebuilt = remove(child, rest)?;
                next.children.insert(head.clone(), Arc::new(rebuilt));
            }
            Some(next)
        }
        match remove(&self.root, path.segments()) {
            Some(root) => StateTree {
                root: Arc::new(root),
            },
            None => self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> SlicePath {
        SlicePath::parse(s).expect("valid path")
    }

    #[test]
    fn test_state_value_downcast() {
        let v = StateValue::new(7_u32);
        assert!(v.is::<u32>());
        assert_eq!(v.downcast_ref::<u32>(), Some(&7));
        assert_eq!(v.downcast::<u32>(), Some(7));
        assert!(v.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_state_value_identity() {
        let a = StateValue::new(1_u32);
        let b = a.clone();
        let c = StateValue::new(1_u32);
        assert!(StateValue::ptr_eq(&a, &b));
        assert!(!StateValue::ptr_eq(&a, &c));
    }

    #[test]
    fn test_tree_set_and_get() {
        let tree = StateTree::new();
        let tree = tree.with_value(&path("a.b"), StateValue::new(5_u32));
        assert_eq!(
            tree.get(&path("a.b")).and_then(StateValue::downcast::<u32>),
            Some(5)
        );
        assert!(tree.get(&path("a")).is_none());
        assert!(tree.get(&path("a.b.c")).is_none());
    }

    #[test]
    fn test_tree_write_preserves_children() {
        let tree = StateTree::new()
            .with_value(&path("app"), StateValue::new(0_u32))
            .with_value(&path("app.child"), StateValue::new(1_u32));
        let tree = tree.with_value(&path("app"), StateValue::new(9_u32));
        assert_eq!(
            tree.get(&path("app")).and_then(StateValue::downcast::<u32>),
            Some(9)
        );
        assert_eq!(
            tree.get(&path("app.child"))
                .and_then(StateValue::downcast::<u32>),
            Some(1)
        );
    }

    #[test]
    fn test_tree_structural_sharing() {
        let tree = StateTree::new()
            .with_value(&path("left"), StateValue::new(1_u32))
            .with_value(&path("right"), StateValue::new(2_u32));
        let next = tree.with_value(&path("left"), StateValue::new(3_u32));
        // The untouched sibling slice is shared between both trees.
        let before = tree.get(&path("right")).expect("present");
        let after = next.get(&path("right")).expect("present");
        assert!(StateValue::ptr_eq(before, after));
    }

    #[test]
    fn test_tree_original_untouched() {
        let tree = StateTree::new().with_value(&path("a"), StateValue::new(1_u32));
        let _next = tree.with_value(&path("a"), StateValue::new(2_u32));
        assert_eq!(
            tree.get(&path("a")).and_then(StateValue::downcast::<u32>),
            Some(1)
        );
    }

    #[test]
    fn test_tree_without_subtree() {
        let tree = StateTree::new()
            .with_value(&path("a"), StateValue::new(1_u32))
            .with_value(&path("a.b"), StateValue::new(2_u32));
        let pruned = tree.without_subtree(&path("a"));
        assert!(!pruned.contains(&path("a")));
        assert!(!pruned.contains(&path("a.b")));
        // Removing an absent path is a no-op.
        let same = pruned.without_subtree(&path("missing"));
        assert!(!same.contains(&path("missing")));
    }
}
