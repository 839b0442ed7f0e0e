//! Object arena for one document.
//!
//! The context owns every indirect object flatly, keyed by object number. It is
//! the only place identities are allocated, so references elsewhere in the
//! graph are plain keys and cycles cost nothing.

use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use std::collections::{BTreeMap, BTreeSet, HashSet};

#[derive(Debug, Clone)]
struct Slot {
    gen: u16,
    object: Object,
}

/// Owner of all indirect objects of a document.
#[derive(Debug, Clone, Default)]
pub struct PdfContext {
    objects: BTreeMap<u32, Slot>,
    largest_id: u32,
    /// Identities registered or overwritten since load
    modified: BTreeSet<u32>,
    /// Removed identities and the generation their free entry carries
    freed: BTreeMap<u32, u16>,
}

impl PdfContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh identity for `object` and take ownership of it.
    pub fn register(&mut self, object: Object) -> ObjectRef {
        self.largest_id += 1;
        let id = self.largest_id;
        self.objects.insert(id, Slot { gen: 0, object });
        self.modified.insert(id);
        ObjectRef::new(id, 0)
    }

    /// Reserve an identity whose object is supplied later with [`assign`](Self::assign).
    pub fn reserve(&mut self) -> ObjectRef {
        self.register(Object::Null)
    }

    /// Place a parsed object at its file identity without marking it modified.
    pub(crate) fn insert(&mut self, r: ObjectRef, object: Object) {
        self.largest_id = self.largest_id.max(r.id);
        self.objects.insert(r.id, Slot { gen: r.gen, object });
    }

    /// Resolve a reference; `None` if it dangles or the generation differs.
    pub fn lookup(&self, r: ObjectRef) -> Option<&Object> {
        self.objects
            .get(&r.id)
            .filter(|slot| slot.gen == r.gen)
            .map(|slot| &slot.object)
    }

    /// Mutable lookup. Marks the slot modified.
    pub fn lookup_mut(&mut self, r: ObjectRef) -> Option<&mut Object> {
        let slot = self.objects.get_mut(&r.id).filter(|slot| slot.gen == r.gen)?;
        self.modified.insert(r.id);
        Some(&mut slot.object)
    }

    /// Overwrite an existing slot.
    pub fn assign(&mut self, r: ObjectRef, object: Object) -> Result<()> {
        match self.objects.get_mut(&r.id) {
            Some(slot) if slot.gen == r.gen => {
                slot.object = object;
                self.modified.insert(r.id);
                Ok(())
            },
            _ => Err(Error::ObjectNotFound(r.id, r.gen)),
        }
    }

    /// Remove an object, returning it if it was live.
    pub fn remove(&mut self, r: ObjectRef) -> Option<Object> {
        if self.lookup(r).is_none() {
            return None;
        }
        self.modified.remove(&r.id);
        self.freed.insert(r.id, r.gen.saturating_add(1));
        self.objects.remove(&r.id).map(|slot| slot.object)
    }

    /// Identities removed since load, with the next generation for each.
    pub fn freed(&self) -> impl Iterator<Item = (u32, u16)> + '_ {
        self.freed.iter().map(|(id, gen)| (*id, *gen))
    }

    /// Whether the reference resolves to a live object.
    pub fn contains(&self, r: ObjectRef) -> bool {
        self.lookup(r).is_some()
    }

    /// Follow references from `object` until a direct object is reached.
    ///
    /// Chains that loop back on themselves resolve to `None`.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        let mut current = object;
        let mut seen = HashSet::new();
        while let Object::Reference(r) = current {
            if !seen.insert(*r) {
                log::warn!("Reference cycle while resolving {}", r);
                return None;
            }
            current = self.lookup(*r)?;
        }
        Some(current)
    }

    /// Resolve `dict[key]`, following references.
    pub fn resolve_key<'a>(&'a self, object: &'a Object, key: &str) -> Option<&'a Object> {
        let dict = self.resolve(object)?.as_dict()?;
        self.resolve(dict.get(key)?)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the context holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Largest object number ever allocated or inserted.
    pub fn largest_id(&self) -> u32 {
        self.largest_id
    }

    /// Live objects in identity order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectRef, &Object)> {
        self.objects
            .iter()
            .map(|(id, slot)| (ObjectRef::new(*id, slot.gen), &slot.object))
    }

    /// Identities registered or overwritten since load, in identity order.
    pub fn modified(&self) -> Vec<ObjectRef> {
        self.modified
            .iter()
            .filter_map(|id| self.objects.get(id).map(|slot| ObjectRef::new(*id, slot.gen)))
            .collect()
    }

    /// Forget modification tracking, e.g. after a save.
    pub fn clear_modified(&mut self) {
        self.modified.clear();
        self.freed.clear();
    }

    /// Whether `id` was registered or overwritten since load.
    pub fn is_modified(&self, id: u32) -> bool {
        self.modified.contains(&id)
    }

    /// All references reachable from `roots`, following references through
    /// dictionaries, arrays and stream dictionaries.
    ///
    /// `visited` carries identities already seen and is extended in place, so
    /// repeated calls can share it. Dangling references are skipped.
    pub fn reachable(&self, roots: &[ObjectRef], visited: &mut BTreeSet<ObjectRef>) {
        let mut pending: Vec<ObjectRef> = roots.to_vec();
        let mut refs = Vec::new();
        while let Some(r) = pending.pop() {
            if visited.contains(&r) {
                continue;
            }
            let Some(object) = self.lookup(r) else {
                log::debug!("Skipping dangling reference {}", r);
                continue;
            };
            visited.insert(r);
            refs.clear();
            collect_references(object, &mut refs);
            pending.extend(refs.iter().copied().filter(|child| !visited.contains(child)));
        }
    }
}

/// Append every reference directly contained in `object` (not following them).
pub fn collect_references(object: &Object, out: &mut Vec<ObjectRef>) {
    let mut stack = vec![object];
    while let Some(obj) = stack.pop() {
        match obj {
            Object::Reference(r) => out.push(*r),
            Object::Array(items) => stack.extend(items.iter()),
            Object::Dictionary(dict) | Object::Stream { dict, .. } => stack.extend(dict.values()),
            _ => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Dict;

    fn dict_with(key: &str, value: Object) -> Object {
        let mut dict = Dict::new();
        dict.insert(key.to_string(), value);
        Object::Dictionary(dict)
    }

    #[test]
    fn test_register_allocates_increasing_ids() {
        let mut ctx = PdfContext::new();
        let a = ctx.register(Object::Integer(1));
        let b = ctx.register(Object::Integer(2));
        assert_eq!(a, ObjectRef::new(1, 0));
        assert_eq!(b, ObjectRef::new(2, 0));
        assert_eq!(ctx.lookup(b), Some(&Object::Integer(2)));
    }

    #[test]
    fn test_register_after_insert_skips_loaded_ids() {
        let mut ctx = PdfContext::new();
        ctx.insert(ObjectRef::new(7, 0), Object::Null);
        assert_eq!(ctx.register(Object::Null).id, 8);
        assert!(ctx.modified().iter().all(|r| r.id == 8));
    }

    #[test]
    fn test_lookup_dangling_is_none() {
        let ctx = PdfContext::new();
        assert!(ctx.lookup(ObjectRef::new(99, 0)).is_none());
    }

    #[test]
    fn test_lookup_wrong_generation_is_none() {
        let mut ctx = PdfContext::new();
        ctx.insert(ObjectRef::new(3, 2), Object::Boolean(true));
        assert!(ctx.lookup(ObjectRef::new(3, 0)).is_none());
        assert!(ctx.lookup(ObjectRef::new(3, 2)).is_some());
    }

    #[test]
    fn test_assign_overwrites_existing_slot() {
        let mut ctx = PdfContext::new();
        let r = ctx.register(Object::name("Old"));
        ctx.assign(r, Object::Integer(5)).unwrap();
        assert_eq!(ctx.lookup(r), Some(&Object::Integer(5)));
    }

    #[test]
    fn test_assign_missing_slot_fails() {
        let mut ctx = PdfContext::new();
        let err = ctx.assign(ObjectRef::new(4, 0), Object::Null).unwrap_err();
        assert!(matches!(err, Error::ObjectNotFound(4, 0)));
    }

    #[test]
    fn test_resolve_follows_chain_and_stops_on_cycle() {
        let mut ctx = PdfContext::new();
        let target = ctx.register(Object::Integer(9));
        let middle = ctx.register(Object::Reference(target));
        let start = Object::Reference(middle);
        assert_eq!(ctx.resolve(&start), Some(&Object::Integer(9)));

        let a = ctx.reserve();
        let b = ctx.register(Object::Reference(a));
        ctx.assign(a, Object::Reference(b)).unwrap();
        assert!(ctx.resolve(&Object::Reference(a)).is_none());
    }

    #[test]
    fn test_remove_records_freed_generation() {
        let mut ctx = PdfContext::new();
        let r = ctx.register(Object::Integer(1));
        assert_eq!(ctx.remove(r), Some(Object::Integer(1)));
        assert!(!ctx.contains(r));
        assert!(ctx.modified().is_empty());
        assert_eq!(ctx.freed().collect::<Vec<_>>(), vec![(r.id, 1)]);
        assert!(ctx.remove(r).is_none());
    }

    #[test]
    fn test_reachable_terminates_on_cycles() {
        let mut ctx = PdfContext::new();
        let parent = ctx.reserve();
        let page = ctx.register(dict_with("Parent", Object::Reference(parent)));
        ctx.assign(
            parent,
            dict_with("Kids", Object::Array(vec![Object::Reference(page)])),
        )
        .unwrap();
        let orphan = ctx.register(Object::Integer(0));

        let mut visited = BTreeSet::new();
        ctx.reachable(&[page], &mut visited);
        assert_eq!(visited.len(), 2);
        assert!(visited.contains(&parent));
        assert!(!visited.contains(&orphan));
    }

    #[test]
    fn test_reachable_skips_dangling() {
        let mut ctx = PdfContext::new();
        let root = ctx.register(dict_with("Gone", Object::Reference(ObjectRef::new(50, 0))));
        let mut visited = BTreeSet::new();
        ctx.reachable(&[root], &mut visited);
        assert_eq!(visited.into_iter().collect::<Vec<_>>(), vec![root]);
    }

    #[test]
    fn test_collect_references_in_nested_values() {
        let inner = Object::Array(vec![
            Object::Reference(ObjectRef::new(1, 0)),
            dict_with("K", Object::Reference(ObjectRef::new(2, 0))),
        ]);
        let mut out = Vec::new();
        collect_references(&dict_with("A", inner), &mut out);
        out.sort();
        assert_eq!(out, vec![ObjectRef::new(1, 0), ObjectRef::new(2, 0)]);
    }
}
