//! Lookup tables of a scene
//!
//! Every lookup returns `Option`; `None` means "not registered (yet)", for
//! example while a library is still being converted in the background.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::animation::Action;
use crate::foundation::handles::{AssetId, MaterialId, MeshId, ObjectId, SceneId};
use crate::render::{Material, Mesh};

/// Name and asset lookup tables of one scene
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    names: HashMap<String, ObjectId>,
    assets: HashMap<AssetId, ObjectId>,
    meshes: HashMap<String, Arc<Mesh>>,
    mesh_owners: HashMap<String, AssetId>,
    actions: HashMap<String, Arc<Action>>,
}

impl ObjectRegistry {
    /// Create empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Map an object name to `object`; later registrations win
    pub fn register_object_name(&mut self, name: &str, object: ObjectId) {
        self.names.insert(name.to_string(), object);
    }

    /// Object registered under `name`
    pub fn find_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.names.get(name).copied()
    }

    /// Map authored data to the object converted from it
    pub fn register_object(&mut self, asset: AssetId, object: ObjectId) {
        self.assets.insert(asset, object);
    }

    /// Object converted from `asset`
    pub fn find_object(&self, asset: AssetId) -> Option<ObjectId> {
        self.assets.get(&asset).copied()
    }

    /// Forget `object`.
    ///
    /// Replicas share their template's asset and name, so an entry is only
    /// dropped when it points at this very object.
    pub fn unregister_object(&mut self, asset: Option<AssetId>, name: &str, object: ObjectId) {
        if let Some(asset) = asset {
            if self.assets.get(&asset) == Some(&object) {
                self.assets.remove(&asset);
            }
        }
        if self.names.get(name) == Some(&object) {
            self.names.remove(name);
        }
    }

    /// Register a mesh by name, with the asset of the object that owns it
    pub fn register_mesh(&mut self, mesh: Arc<Mesh>, owner: Option<AssetId>) {
        if let Some(owner) = owner {
            self.mesh_owners.insert(mesh.name.clone(), owner);
        }
        self.meshes.insert(mesh.name.clone(), mesh);
    }

    /// Mesh registered under `name`
    pub fn find_mesh(&self, name: &str) -> Option<Arc<Mesh>> {
        self.meshes.get(name).cloned()
    }

    /// Asset of the object owning the mesh called `name`
    pub fn find_mesh_owner(&self, name: &str) -> Option<AssetId> {
        self.mesh_owners.get(name).copied()
    }

    /// Forget a mesh
    pub fn remove_mesh(&mut self, name: &str) -> Option<Arc<Mesh>> {
        self.mesh_owners.remove(name);
        self.meshes.remove(name)
    }

    /// Register an action by name
    pub fn register_action(&mut self, action: Arc<Action>) {
        self.actions.insert(action.name.clone(), action);
    }

    /// Action registered under `name`
    pub fn find_action(&self, name: &str) -> Option<Arc<Action>> {
        self.actions.get(name).cloned()
    }

    /// Forget an action
    pub fn remove_action(&mut self, name: &str) -> Option<Arc<Action>> {
        self.actions.remove(name)
    }

    /// Names of actions converted from `asset`
    pub fn actions_from(&self, asset: AssetId) -> Vec<String> {
        self.actions
            .values()
            .filter(|a| a.asset == Some(asset))
            .map(|a| a.name.clone())
            .collect()
    }

    /// Take over every entry of a donor scene's tables; donor entries win
    pub fn merge(&mut self, other: ObjectRegistry) {
        self.names.extend(other.names);
        self.assets.extend(other.assets);
        self.meshes.extend(other.meshes);
        self.mesh_owners.extend(other.mesh_owners);
        self.actions.extend(other.actions);
    }

    /// Registered meshes
    pub fn meshes(&self) -> impl Iterator<Item = &Arc<Mesh>> {
        self.meshes.values()
    }

    /// Registered actions
    pub fn actions(&self) -> impl Iterator<Item = &Arc<Action>> {
        self.actions.values()
    }

    /// Number of registered meshes
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Number of registered actions
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }
}

/// Materials and meshes converted for one scene.
///
/// Ownership is exclusive: meshes are never shared between scenes.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    materials: BTreeMap<MaterialId, Material>,
    meshes: BTreeMap<MeshId, Arc<Mesh>>,
}

impl AssetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a material
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = material.id;
        self.materials.insert(id, material);
        id
    }

    /// Take ownership of a mesh
    pub fn add_mesh(&mut self, mesh: Arc<Mesh>) {
        self.meshes.insert(mesh.id, mesh);
    }

    /// Look up a material
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(&id)
    }

    /// Look up a mesh
    pub fn mesh(&self, id: MeshId) -> Option<&Arc<Mesh>> {
        self.meshes.get(&id)
    }

    /// Materials owned by the scene
    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.materials.values()
    }

    /// Number of materials
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Number of meshes
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Remove every material and mesh converted from one of `assets`;
    /// returns the removed materials and meshes
    pub fn remove_assets(&mut self, assets: &[AssetId]) -> (Vec<MaterialId>, Vec<Arc<Mesh>>) {
        let from = |asset: Option<AssetId>| asset.is_some_and(|a| assets.contains(&a));
        let materials: Vec<MaterialId> = self
            .materials
            .values()
            .filter(|m| from(m.asset))
            .map(|m| m.id)
            .collect();
        for id in &materials {
            self.materials.remove(id);
        }
        let meshes: Vec<Arc<Mesh>> = self.meshes.values().filter(|m| from(m.asset)).cloned().collect();
        for mesh in &meshes {
            self.meshes.remove(&mesh.id);
        }
        (materials, meshes)
    }

    /// Move every asset of `other` here, retargeting materials to `scene`
    pub fn merge(&mut self, other: AssetRegistry, scene: SceneId) {
        for (id, mut material) in other.materials {
            material.scene = Some(scene);
            self.materials.insert(id, material);
        }
        self.meshes.extend(other.meshes);
    }
}
