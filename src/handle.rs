//! Typed handles and the arena storage behind them.
//!
//! Every GPU resource owned by the [`Registry`](crate::Registry) is referred to by a
//! [`Handle<K>`], where `K` is one of the uninhabited kind markers in this module
//! ([`Program`], [`Frame`], [`Mesh`], [`Texture`]). The kind parameter keeps a mesh
//! handle from being passed where a texture handle is expected, while all four kinds
//! share a single implementation.
//!
//! Handles are plain indices. They carry no ownership: holding one never keeps the
//! resource alive, and the registry never recycles an index.
//!
//! # Example
//!
//! ```
//! use blurpass::handle::{Arena, Handle, Mesh};
//!
//! let mut meshes: Arena<Mesh, &str> = Arena::new();
//! let quad: Handle<Mesh> = meshes.insert("quad");
//! let tri = meshes.insert("triangle");
//!
//! assert!(quad < tri);
//! assert_eq!(meshes[quad], "quad");
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Kind marker for compiled shader programs.
#[derive(Debug)]
pub enum Program {}

/// Kind marker for off-screen render targets.
#[derive(Debug)]
pub enum Frame {}

/// Kind marker for vertex attribute buffers.
#[derive(Debug)]
pub enum Mesh {}

/// Kind marker for sampled 2D textures.
#[derive(Debug)]
pub enum Texture {}

/// Opaque, registry-scoped index referencing a resource of kind `K`.
pub struct Handle<K> {
    index: u32,
    _kind: PhantomData<fn() -> K>,
}

/// Handle to a compiled shader program.
pub type ProgramHandle = Handle<Program>;
/// Handle to an off-screen frame.
pub type FrameHandle = Handle<Frame>;
/// Handle to a vertex attribute buffer.
pub type MeshHandle = Handle<Mesh>;
/// Handle to a texture (uploaded pixels or a frame's color attachment).
pub type TextureHandle = Handle<Texture>;

impl<K> Handle<K> {
    fn new(index: usize) -> Self {
        let index = u32::try_from(index).expect("resource arena exceeded u32::MAX entries");
        Self {
            index,
            _kind: PhantomData,
        }
    }

    /// Returns the raw storage index.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

// Manual impls: deriving would put bounds on `K`, which is uninhabited.
impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<K> Eq for Handle<K> {}

impl<K> PartialOrd for Handle<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Handle<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<K> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = std::any::type_name::<K>();
        let kind = kind.rsplit("::").next().unwrap_or(kind);
        write!(f, "{}#{}", kind, self.index)
    }
}

/// Dense, append-only storage addressed by [`Handle<K>`].
///
/// Indices are handed out in insertion order and never reused, so a handle is
/// valid exactly when its index is below [`len`](Self::len).
pub struct Arena<K, T> {
    items: Vec<T>,
    _kind: PhantomData<fn() -> K>,
}

impl<K, T> Arena<K, T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _kind: PhantomData,
        }
    }

    /// Stores `item` and returns its handle.
    pub fn insert(&mut self, item: T) -> Handle<K> {
        let handle = Handle::new(self.items.len());
        self.items.push(item);
        handle
    }

    /// Handle the next [`insert`](Self::insert) will return.
    pub fn next_handle(&self) -> Handle<K> {
        Handle::new(self.items.len())
    }

    /// Returns the item behind `handle`, or `None` if the handle was never issued
    /// by this arena.
    pub fn get(&self, handle: Handle<K>) -> Option<&T> {
        self.items.get(handle.index())
    }

    /// Whether `handle` addresses an entry of this arena.
    pub fn contains(&self, handle: Handle<K>) -> bool {
        handle.index() < self.items.len()
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over `(handle, item)` pairs in insertion order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Handle<K>, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (Handle::new(i), item))
    }

    /// Consumes the arena, yielding items in insertion order.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<K, T> Default for Arena<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> std::ops::Index<Handle<K>> for Arena<K, T> {
    type Output = T;

    /// # Panics
    ///
    /// Panics if the handle was not issued by this arena.
    fn index(&self, handle: Handle<K>) -> &T {
        &self.items[handle.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_dense_and_increasing() {
        let mut arena: Arena<Mesh, u32> = Arena::new();
        let handles: Vec<_> = (0..5).map(|i| arena.insert(i * 10)).collect();

        for (i, handle) in handles.iter().enumerate() {
            assert_eq!(handle.index(), i);
            assert_eq!(arena[*handle], i as u32 * 10);
        }
        assert!(handles.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn next_handle_predicts_insert() {
        let mut arena: Arena<Frame, ()> = Arena::new();
        let predicted = arena.next_handle();
        assert_eq!(arena.insert(()), predicted);
        assert!(arena.next_handle() > predicted);
    }

    #[test]
    fn foreign_handle_is_not_contained() {
        let mut big: Arena<Texture, ()> = Arena::new();
        let small: Arena<Texture, ()> = Arena::new();
        let handle = big.insert(());

        assert!(big.contains(handle));
        assert!(!small.contains(handle));
        assert!(small.get(handle).is_none());
    }

    #[test]
    fn debug_names_the_kind() {
        let mut arena: Arena<Frame, ()> = Arena::new();
        arena.insert(());
        let handle = arena.insert(());
        assert_eq!(format!("{handle:?}"), "Frame#1");
    }
}
