//! ID-addressed resource storage
//!
//! Resources live in insertion order, which is also the order they are
//! written back out. IDs handed out by [`ResourceGraph::create`] grow
//! monotonically and an ID is never handed out twice, even after removal.

use super::object::{Component, ComponentsObject, MeshObject, ObjectInfo};
use super::volumetric::{Image3D, Image3DChannelSelector};
use super::{ExpectedKind, Reference, Resource, ResourceId, ResourceKind};
use crate::error::{Error, Result};
use crate::mesh::{Mesh, Transform};
use std::collections::{HashMap, HashSet};

/// Typed, ID-addressed collection of resources
#[derive(Debug, Clone)]
pub struct ResourceGraph {
    entries: Vec<(ResourceId, Resource)>,
    index: HashMap<ResourceId, usize>,
    next_id: ResourceId,
    retired: HashSet<ResourceId>,
}

impl Default for ResourceGraph {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            next_id: 1,
            retired: HashSet::new(),
        }
    }
}

impl ResourceGraph {
    /// Empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored resources
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no resources are stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The ID the next [`ResourceGraph::create`] will assign
    pub fn next_id(&self) -> ResourceId {
        self.next_id
    }

    /// Whether `id` is stored
    pub fn contains(&self, id: ResourceId) -> bool {
        self.index.contains_key(&id)
    }

    /// Resources in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &Resource)> {
        self.entries.iter().map(|(id, r)| (*id, r))
    }

    /// Plain lookup
    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.index.get(&id).map(|&i| &self.entries[i].1)
    }

    fn get_mut(&mut self, id: ResourceId) -> Option<&mut Resource> {
        self.index.get(&id).map(|&i| &mut self.entries[i].1)
    }

    /// Store a new resource under the next free ID
    ///
    /// Every ID the resource refers to must already be stored with a
    /// compatible variant.
    pub fn create(&mut self, resource: Resource) -> Result<ResourceId> {
        let id = self.next_id;
        let next = id.checked_add(1).ok_or_else(|| {
            Error::InvalidParameter("resource ID space exhausted".to_string())
        })?;
        self.check_references(id, &resource)?;
        self.entries.push((id, resource));
        self.index.insert(id, self.entries.len() - 1);
        self.next_id = next;
        Ok(id)
    }

    /// Store a resource under a fixed ID without checking its references
    ///
    /// Readers use this so forward references inside one model part work;
    /// validation reports whatever does not resolve.
    pub(crate) fn insert(&mut self, id: ResourceId, resource: Resource) -> Result<()> {
        if self.index.contains_key(&id) || self.retired.contains(&id) {
            return Err(Error::schema(format!("duplicate resource id {}", id)));
        }
        self.entries.push((id, resource));
        self.index.insert(id, self.entries.len() - 1);
        self.next_id = self.next_id.max(id.saturating_add(1));
        Ok(())
    }

    /// Look up `id` and require a compatible variant
    pub fn resolve(&self, id: ResourceId, expected: ExpectedKind) -> Result<&Resource> {
        let resource = self.get(id).ok_or_else(|| Error::UnresolvedReference {
            id,
            context: format!("expected {}", expected),
        })?;
        if !expected.accepts(resource.kind()) {
            return Err(Error::TypeMismatch {
                id,
                expected: expected.to_string(),
                found: resource.kind().to_string(),
            });
        }
        Ok(resource)
    }

    fn check_reference(&self, holder: ResourceId, reference: &Reference) -> Result<()> {
        match self.get(reference.target) {
            None => Err(Error::UnresolvedReference {
                id: reference.target,
                context: format!("{} of resource {}", reference.role, holder),
            }),
            Some(target) if !reference.expected.accepts(target.kind()) => {
                Err(Error::TypeMismatch {
                    id: reference.target,
                    expected: reference.expected.to_string(),
                    found: target.kind().to_string(),
                })
            }
            Some(_) => Ok(()),
        }
    }

    fn check_references(&self, holder: ResourceId, resource: &Resource) -> Result<()> {
        resource
            .references()
            .iter()
            .try_for_each(|r| self.check_reference(holder, r))
    }

    /// IDs of resources holding a reference to `id`, in insertion order
    pub fn referrers(&self, id: ResourceId) -> Vec<ResourceId> {
        self.entries
            .iter()
            .filter(|(holder, r)| {
                *holder != id && r.references().iter().any(|reference| reference.target == id)
            })
            .map(|(holder, _)| *holder)
            .collect()
    }

    /// Remove a resource nothing else refers to
    ///
    /// Build items are not visible here; use
    /// [`Document::remove_resource`](super::Document::remove_resource).
    pub(crate) fn remove(&mut self, id: ResourceId) -> Result<Resource> {
        let position = *self.index.get(&id).ok_or_else(|| Error::UnresolvedReference {
            id,
            context: "resource to remove".to_string(),
        })?;
        if let Some(referrer) = self.referrers(id).first() {
            return Err(Error::ResourceInUse {
                id,
                referrer: format!("resource {}", referrer),
            });
        }
        let (_, resource) = self.entries.remove(position);
        self.index.remove(&id);
        for (i, (entry_id, _)) in self.entries.iter().enumerate().skip(position) {
            self.index.insert(*entry_id, i);
        }
        self.retired.insert(id);
        Ok(resource)
    }

    /// Replace a resource with an edited copy
    ///
    /// `edit` runs on a clone. The copy must keep the same variant, its
    /// references must resolve and it must not close a containment cycle;
    /// otherwise the stored resource is left untouched.
    pub fn update<F>(&mut self, id: ResourceId, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Resource) -> Result<()>,
    {
        let current = self.get(id).ok_or_else(|| Error::UnresolvedReference {
            id,
            context: "resource to update".to_string(),
        })?;
        let mut edited = current.clone();
        edit(&mut edited)?;
        if edited.kind() != current.kind() {
            return Err(Error::TypeMismatch {
                id,
                expected: current.kind().to_string(),
                found: edited.kind().to_string(),
            });
        }
        self.check_references(id, &edited)?;
        if let Resource::ComponentsObject(object) = &edited {
            for component in object.components().iter().filter(|c| c.path.is_none()) {
                self.check_no_cycle(id, component.object_id)?;
            }
        }
        if let Some(slot) = self.get_mut(id) {
            *slot = edited;
        }
        Ok(())
    }

    /// A mesh object
    pub fn mesh_object(&self, id: ResourceId) -> Result<&MeshObject> {
        match self.resolve(id, ExpectedKind::Exact(ResourceKind::MeshObject))? {
            Resource::MeshObject(object) => Ok(object),
            other => Err(mismatch(id, ResourceKind::MeshObject, other)),
        }
    }

    /// A mesh object, for geometry edits
    ///
    /// Triangle property IDs set through this handle are checked by
    /// validation, not here.
    pub fn mesh_object_mut(&mut self, id: ResourceId) -> Result<&mut MeshObject> {
        self.resolve(id, ExpectedKind::Exact(ResourceKind::MeshObject))?;
        match self.get_mut(id) {
            Some(Resource::MeshObject(object)) => Ok(object),
            _ => Err(Error::UnresolvedReference {
                id,
                context: "mesh object".to_string(),
            }),
        }
    }

    /// A components object
    pub fn components_object(&self, id: ResourceId) -> Result<&ComponentsObject> {
        match self.resolve(id, ExpectedKind::Exact(ResourceKind::ComponentsObject))? {
            Resource::ComponentsObject(object) => Ok(object),
            other => Err(mismatch(id, ResourceKind::ComponentsObject, other)),
        }
    }

    /// Shared attributes of either object variant
    pub fn object_info(&self, id: ResourceId) -> Result<&ObjectInfo> {
        self.resolve(id, ExpectedKind::Object)?
            .object_info()
            .ok_or_else(|| Error::UnresolvedReference {
                id,
                context: "object".to_string(),
            })
    }

    /// A 3D image
    pub fn image3d(&self, id: ResourceId) -> Result<&Image3D> {
        match self.resolve(id, ExpectedKind::Exact(ResourceKind::Image3D))? {
            Resource::Image3D(image) => Ok(image),
            other => Err(mismatch(id, ResourceKind::Image3D, other)),
        }
    }

    /// A channel selector
    pub fn channel_selector(&self, id: ResourceId) -> Result<&Image3DChannelSelector> {
        match self.resolve(id, ExpectedKind::Exact(ResourceKind::Image3DChannelSelector))? {
            Resource::Image3DChannelSelector(selector) => Ok(selector),
            other => Err(mismatch(id, ResourceKind::Image3DChannelSelector, other)),
        }
    }

    /// A channel selector, for its attribute setters
    pub fn channel_selector_mut(&mut self, id: ResourceId) -> Result<&mut Image3DChannelSelector> {
        self.resolve(id, ExpectedKind::Exact(ResourceKind::Image3DChannelSelector))?;
        match self.get_mut(id) {
            Some(Resource::Image3DChannelSelector(selector)) => Ok(selector),
            _ => Err(Error::UnresolvedReference {
                id,
                context: "channel selector".to_string(),
            }),
        }
    }

    /// Point a channel selector at another image
    pub fn set_channel_selector_image(
        &mut self,
        selector: ResourceId,
        image: ResourceId,
    ) -> Result<()> {
        self.resolve(image, ExpectedKind::Exact(ResourceKind::Image3D))?;
        self.channel_selector_mut(selector)?.set_image_id(image);
        Ok(())
    }

    /// Append a component to a stored components object
    pub fn add_component(&mut self, container: ResourceId, component: Component) -> Result<()> {
        self.components_object(container)?;
        if component.path.is_none() {
            self.resolve(component.object_id, ExpectedKind::Object)?;
            self.check_no_cycle(container, component.object_id)?;
        }
        if let Some(Resource::ComponentsObject(object)) = self.get_mut(container) {
            object.push_component(component);
        }
        Ok(())
    }

    fn local_children(&self, id: ResourceId) -> Vec<ResourceId> {
        match self.get(id) {
            Some(Resource::ComponentsObject(object)) => object
                .components()
                .iter()
                .filter(|c| c.path.is_none())
                .map(|c| c.object_id)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Fail if `container` is reachable from `target`, since a component
    /// `container → target` would then close a cycle
    fn check_no_cycle(&self, container: ResourceId, target: ResourceId) -> Result<()> {
        let mut parents: HashMap<ResourceId, ResourceId> = HashMap::new();
        let mut seen = HashSet::from([target]);
        let mut queue = vec![target];
        while let Some(current) = queue.pop() {
            if current == container {
                let mut path = vec![container];
                let mut back = vec![current];
                let mut cursor = current;
                while let Some(&parent) = parents.get(&cursor) {
                    back.push(parent);
                    cursor = parent;
                }
                back.reverse();
                path.extend(back);
                return Err(Error::CircularReference { path });
            }
            for child in self.local_children(current) {
                if seen.insert(child) {
                    parents.insert(child, current);
                    queue.push(child);
                }
            }
        }
        Ok(())
    }

    /// First containment cycle reachable from `start`
    ///
    /// The returned path begins at the first object on the cycle and ends
    /// with that same ID again. `finished` memoizes objects already proven
    /// cycle-free so repeated calls stay linear.
    pub(crate) fn find_cycle(
        &self,
        start: ResourceId,
        finished: &mut HashSet<ResourceId>,
    ) -> Option<Vec<ResourceId>> {
        if finished.contains(&start) {
            return None;
        }
        let mut path: Vec<ResourceId> = vec![start];
        let mut first = self.local_children(start);
        first.reverse();
        let mut pending: Vec<Vec<ResourceId>> = vec![first];
        while let Some(children) = pending.last_mut() {
            match children.pop() {
                Some(child) => {
                    if let Some(position) = path.iter().position(|&p| p == child) {
                        let mut cycle = path[position..].to_vec();
                        cycle.push(child);
                        return Some(cycle);
                    }
                    if finished.contains(&child) {
                        continue;
                    }
                    path.push(child);
                    let mut next = self.local_children(child);
                    next.reverse();
                    pending.push(next);
                }
                None => {
                    pending.pop();
                    if let Some(done) = path.pop() {
                        finished.insert(done);
                    }
                }
            }
        }
        None
    }

    /// Merge an object's geometry into one mesh, components resolved
    ///
    /// Each component's transform is applied before its ancestors'. The
    /// whole containment tree is checked for cycles before anything is
    /// merged, and the result is assembled in a scratch mesh so a failure
    /// returns nothing partial.
    pub fn flatten(&self, id: ResourceId) -> Result<Mesh> {
        self.resolve(id, ExpectedKind::Object)?;
        if let Some(path) = self.find_cycle(id, &mut HashSet::new()) {
            return Err(Error::CircularReference { path });
        }

        let mut flat = Mesh::new();
        let mut stack = vec![(id, Transform::identity())];
        while let Some((current, placement)) = stack.pop() {
            match self.resolve(current, ExpectedKind::Object)? {
                Resource::MeshObject(object) => {
                    let placed = if placement.is_identity() {
                        object.mesh.clone()
                    } else {
                        object.mesh.transformed(&placement)?
                    };
                    flat.merge_mesh(Some(&placed))?;
                }
                Resource::ComponentsObject(object) => {
                    for component in object.components().iter().rev() {
                        if let Some(path) = &component.path {
                            return Err(Error::UnresolvedReference {
                                id: component.object_id,
                                context: format!("component stored in external part {}", path),
                            });
                        }
                        let local = component.transform.unwrap_or_default();
                        stack.push((component.object_id, local.then(&placement)));
                    }
                }
                other => return Err(mismatch(current, ResourceKind::MeshObject, other)),
            }
        }
        Ok(flat)
    }
}

fn mismatch(id: ResourceId, expected: ResourceKind, found: &Resource) -> Error {
    Error::TypeMismatch {
        id,
        expected: expected.to_string(),
        found: found.kind().to_string(),
    }
}
