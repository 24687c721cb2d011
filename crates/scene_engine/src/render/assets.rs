//! Converted render assets

use crate::foundation::handles::{AssetId, MaterialId, MeshId, SceneId};

/// Converted material
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Runtime identity
    pub id: MaterialId,
    /// Authored name
    pub name: String,
    /// Authored data this material was converted from
    pub asset: Option<AssetId>,
    /// Drawn in the transparent pass
    pub transparent: bool,
    /// Scene that owns the material
    pub scene: Option<SceneId>,
}

impl Material {
    /// Create an opaque material with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: MaterialId::next(),
            name: name.into(),
            asset: None,
            transparent: false,
            scene: None,
        }
    }

    /// Mark as transparent
    pub fn with_transparency(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    /// Tag with the authored asset it came from
    pub fn with_asset(mut self, asset: AssetId) -> Self {
        self.asset = Some(asset);
        self
    }
}

/// Converted mesh; one slot per material is created for every user
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Runtime identity
    pub id: MeshId,
    /// Authored name, registered in the scene's mesh table
    pub name: String,
    /// Materials used by the mesh's polygons
    pub materials: Vec<MaterialId>,
    /// Authored data this mesh was converted from
    pub asset: Option<AssetId>,
}

impl Mesh {
    /// Create a mesh with a fresh id
    pub fn new(name: impl Into<String>, materials: Vec<MaterialId>) -> Self {
        Self {
            id: MeshId::next(),
            name: name.into(),
            materials,
            asset: None,
        }
    }

    /// Tag with the authored asset it came from
    pub fn with_asset(mut self, asset: AssetId) -> Self {
        self.asset = Some(asset);
        self
    }
}
