//! Object arena and container lists
//!
//! [`ObjectStore`] is the single owner of every [`GameObject`] of a scene.
//! Objects sit in a slot map; the store hands out process-wide [`ObjectId`]s
//! and maps them to slot keys, so ids stay valid when the objects of one
//! scene move into another's arena. Containers ([`ObjectLists`]) hold
//! [`ObjectId`]s; each membership counts as one reference in the store's
//! ledger, as does every explicit retain. An object is reclaimed, and handed
//! back to the caller for teardown, when its count drops to zero. Ids are
//! never reused, so a stale id simply resolves to `None`.

use std::collections::HashMap;

use slotmap::{DefaultKey, SlotMap};

use super::object::GameObject;
use crate::foundation::handles::ObjectId;

/// Outcome of dropping one reference
#[derive(Debug)]
pub enum Release {
    /// The object is still referenced this many times
    Remaining(u32),
    /// The last reference is gone; the object left the store
    Reclaimed(Box<GameObject>),
    /// No such object
    Unknown,
}

struct Entry {
    object: GameObject,
    refs: u32,
}

/// Arena owning the game objects of one scene
#[derive(Default)]
pub struct ObjectStore {
    slots: SlotMap<DefaultKey, Entry>,
    handles: HashMap<ObjectId, DefaultKey>,
    reclaimed: usize,
}

impl ObjectStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: ObjectId) -> Option<&Entry> {
        self.handles.get(&id).and_then(|key| self.slots.get(*key))
    }

    fn entry_mut(&mut self, id: ObjectId) -> Option<&mut Entry> {
        let key = *self.handles.get(&id)?;
        self.slots.get_mut(key)
    }

    fn adopt(&mut self, id: ObjectId, entry: Entry) {
        let key = self.slots.insert(entry);
        self.handles.insert(id, key);
    }

    /// Move an object into the arena with no references yet.
    ///
    /// The caller is expected to place it in at least one container right
    /// away.
    pub fn insert(&mut self, object: GameObject) -> ObjectId {
        let id = ObjectId::next();
        self.adopt(id, Entry { object, refs: 0 });
        id
    }

    /// Look up an object
    pub fn get(&self, id: ObjectId) -> Option<&GameObject> {
        self.entry(id).map(|e| &e.object)
    }

    /// Look up an object for modification
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        self.entry_mut(id).map(|e| &mut e.object)
    }

    /// Whether the object is alive
    pub fn contains(&self, id: ObjectId) -> bool {
        self.entry(id).is_some()
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no object is alive
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Ids of every live object, in no particular order
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.handles.keys().copied()
    }

    /// Add a reference; returns the new count or `None` for unknown objects
    pub fn retain(&mut self, id: ObjectId) -> Option<u32> {
        let entry = self.entry_mut(id)?;
        entry.refs += 1;
        Some(entry.refs)
    }

    /// Drop a reference, reclaiming the object when none remain
    pub fn release(&mut self, id: ObjectId) -> Release {
        let Some(entry) = self.entry_mut(id) else {
            return Release::Unknown;
        };
        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs > 0 {
            return Release::Remaining(entry.refs);
        }
        match self.handles.remove(&id).and_then(|key| self.slots.remove(key)) {
            Some(entry) => {
                self.reclaimed += 1;
                log::trace!("Reclaimed object {} '{}'", id, entry.object.name());
                Release::Reclaimed(Box::new(entry.object))
            }
            None => Release::Unknown,
        }
    }

    /// Current reference count; `None` once reclaimed
    pub fn ref_count(&self, id: ObjectId) -> Option<u32> {
        self.entry(id).map(|e| e.refs)
    }

    /// Number of objects reclaimed over the store's lifetime
    pub fn reclaimed_count(&self) -> usize {
        self.reclaimed
    }

    /// Take over every object of `other` with its reference count.
    ///
    /// Objects get fresh slots here but keep their ids.
    pub fn merge(&mut self, mut other: ObjectStore) {
        for (id, key) in other.handles.drain() {
            if let Some(entry) = other.slots.remove(key) {
                self.adopt(id, entry);
            }
        }
    }

    /// Mutable access to every live object
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut GameObject> {
        self.slots.values_mut().map(|e| &mut e.object)
    }
}

/// Containers a scene keeps objects in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListKind {
    /// Objects sent to the graphics pipeline and logic
    Active,
    /// Templates on hidden layers, replicated by add-object actuators
    Inactive,
    /// Objects with a lifespan
    Temp,
    /// Roots of hierarchies
    RootParents,
    /// Lamps
    Lights,
    /// Cameras
    Cameras,
    /// Text objects
    Fonts,
    /// Objects updated in the animation phase
    Animated,
    /// Objects waiting for end-of-frame removal
    Euthanasia,
}

impl ListKind {
    /// Every container, in removal order
    pub const ALL: [ListKind; 9] = [
        ListKind::Lights,
        ListKind::Active,
        ListKind::Temp,
        ListKind::RootParents,
        ListKind::Inactive,
        ListKind::Euthanasia,
        ListKind::Animated,
        ListKind::Fonts,
        ListKind::Cameras,
    ];

    /// Containers concatenated when scenes merge
    pub const MERGED: [ListKind; 7] = [
        ListKind::Temp,
        ListKind::Active,
        ListKind::Inactive,
        ListKind::RootParents,
        ListKind::Lights,
        ListKind::Cameras,
        ListKind::Fonts,
    ];
}

/// Ordered container of object handles; an object appears at most once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectList {
    items: Vec<ObjectId>,
}

impl ObjectList {
    /// Number of members
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether `id` is a member
    pub fn contains(&self, id: ObjectId) -> bool {
        self.items.contains(&id)
    }

    /// Members in insertion order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = ObjectId> + '_ {
        self.items.iter().copied()
    }

    /// Member at `index`
    pub fn get(&self, index: usize) -> Option<ObjectId> {
        self.items.get(index).copied()
    }

    /// Members as a slice
    pub fn as_slice(&self) -> &[ObjectId] {
        &self.items
    }
}

/// Every container of a scene, with reference bookkeeping against the store
#[derive(Debug, Default)]
pub struct ObjectLists {
    lists: HashMap<ListKind, ObjectList>,
}

impl ObjectLists {
    /// Create empty containers
    pub fn new() -> Self {
        Self::default()
    }

    /// Container of `kind`
    pub fn list(&self, kind: ListKind) -> &ObjectList {
        static EMPTY: ObjectList = ObjectList { items: Vec::new() };
        self.lists.get(&kind).unwrap_or(&EMPTY)
    }

    /// Whether `id` is in `kind`
    pub fn contains(&self, kind: ListKind, id: ObjectId) -> bool {
        self.lists.get(&kind).is_some_and(|l| l.contains(id))
    }

    /// Append `id` to `kind`, taking a reference.
    ///
    /// Returns `false` (no reference taken) if it already is a member or the
    /// object is unknown.
    pub fn add(&mut self, kind: ListKind, id: ObjectId, store: &mut ObjectStore) -> bool {
        let list = self.lists.entry(kind).or_default();
        if list.contains(id) || store.retain(id).is_none() {
            return false;
        }
        list.items.push(id);
        true
    }

    /// Remove `id` from `kind`, dropping the reference the membership held.
    ///
    /// Returns `None` if it was not a member.
    pub fn remove(&mut self, kind: ListKind, id: ObjectId, store: &mut ObjectStore) -> Option<Release> {
        let list = self.lists.get_mut(&kind)?;
        let position = list.items.iter().position(|i| *i == id)?;
        list.items.remove(position);
        Some(store.release(id))
    }

    /// Pop the last member of `kind` without releasing its reference
    pub(crate) fn pop_unreleased(&mut self, kind: ListKind) -> Option<ObjectId> {
        self.lists.get_mut(&kind).and_then(|l| l.items.pop())
    }

    /// Move a member to the back of `kind` without touching its reference
    pub(crate) fn move_to_back(&mut self, kind: ListKind, id: ObjectId) -> bool {
        let Some(list) = self.lists.get_mut(&kind) else {
            return false;
        };
        let Some(position) = list.items.iter().position(|i| *i == id) else {
            return false;
        };
        list.items.remove(position);
        list.items.push(id);
        true
    }

    /// Containers holding `id`
    pub fn memberships(&self, id: ObjectId) -> Vec<ListKind> {
        ListKind::ALL.iter().copied().filter(|k| self.contains(*k, id)).collect()
    }

    /// Append the members of `other`'s `kind` list, keeping their references
    pub(crate) fn concat(&mut self, kind: ListKind, other: &mut ObjectLists) {
        let Some(donor) = other.lists.remove(&kind) else {
            return;
        };
        let list = self.lists.entry(kind).or_default();
        for id in donor.items {
            if !list.contains(id) {
                list.items.push(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::object::ObjectKind;

    #[test]
    fn test_memberships_count_as_references() {
        let mut store = ObjectStore::new();
        let mut lists = ObjectLists::new();
        let id = store.insert(GameObject::new("a", ObjectKind::Empty));

        assert!(lists.add(ListKind::Active, id, &mut store));
        assert!(lists.add(ListKind::Temp, id, &mut store));
        assert!(!lists.add(ListKind::Temp, id, &mut store));
        assert_eq!(store.ref_count(id), Some(2));

        assert!(matches!(lists.remove(ListKind::Temp, id, &mut store), Some(Release::Remaining(1))));
        assert!(lists.remove(ListKind::Temp, id, &mut store).is_none());
        assert!(matches!(lists.remove(ListKind::Active, id, &mut store), Some(Release::Reclaimed(_))));
        assert!(!store.contains(id));
        assert_eq!(store.reclaimed_count(), 1);
    }

    #[test]
    fn test_release_of_unknown_object() {
        let mut store = ObjectStore::new();
        assert!(matches!(store.release(ObjectId::next()), Release::Unknown));
        assert!(store.retain(ObjectId::next()).is_none());
    }

    #[test]
    fn test_move_to_back_keeps_reference() {
        let mut store = ObjectStore::new();
        let mut lists = ObjectLists::new();
        let a = store.insert(GameObject::new("a", ObjectKind::Empty));
        let b = store.insert(GameObject::new("b", ObjectKind::Empty));
        lists.add(ListKind::Cameras, a, &mut store);
        lists.add(ListKind::Cameras, b, &mut store);

        assert!(lists.move_to_back(ListKind::Cameras, a));
        assert_eq!(lists.list(ListKind::Cameras).as_slice(), &[b, a]);
        assert_eq!(store.ref_count(a), Some(1));
    }

    #[test]
    fn test_merge_keeps_ids_and_counts() {
        let mut recipient = ObjectStore::new();
        let mut donor = ObjectStore::new();
        let own = recipient.insert(GameObject::new("own", ObjectKind::Empty));
        let moved = donor.insert(GameObject::new("moved", ObjectKind::Empty));
        let stale = donor.insert(GameObject::new("stale", ObjectKind::Empty));
        donor.retain(moved);
        donor.retain(moved);
        donor.retain(stale);
        assert!(matches!(donor.release(stale), Release::Reclaimed(_)));

        recipient.merge(donor);
        assert_eq!(recipient.len(), 2);
        assert_eq!(recipient.ref_count(moved), Some(2));
        assert_eq!(recipient.get(moved).map(GameObject::name), Some("moved"));
        assert!(recipient.contains(own));
        assert!(recipient.get(stale).is_none());

        assert!(matches!(recipient.release(moved), Release::Remaining(1)));
        assert!(matches!(recipient.release(moved), Release::Reclaimed(_)));
        assert!(recipient.get(moved).is_none());
    }
}
