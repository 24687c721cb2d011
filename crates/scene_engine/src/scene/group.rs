//! Dupli-group definitions

use serde::{Deserialize, Serialize};

use crate::foundation::handles::AssetId;
use crate::foundation::math::Vec3;

/// One authored member of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    /// Authored object
    pub asset: AssetId,
    /// Layer bits of the member; members outside the group's layers are skipped
    pub layer: u32,
}

/// A group of authored objects instantiated as a unit by dupli-group objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDef {
    /// Group name
    pub name: String,
    /// Members in authored order
    pub members: Vec<GroupMember>,
    /// Layers the group instantiates
    pub layer_mask: u32,
    /// Group origin; member placement is relative to it
    pub offset: Vec3,
}

impl GroupDef {
    /// Group on all layers with its origin at zero
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            layer_mask: u32::MAX,
            offset: Vec3::zeros(),
        }
    }

    /// Add a member on layer 1
    pub fn with_member(mut self, asset: AssetId) -> Self {
        self.members.push(GroupMember { asset, layer: 1 });
        self
    }

    /// Add a member on specific layers
    pub fn with_layered_member(mut self, asset: AssetId, layer: u32) -> Self {
        self.members.push(GroupMember { asset, layer });
        self
    }

    /// Move the group origin
    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    /// Restrict the instantiated layers
    pub fn with_layer_mask(mut self, mask: u32) -> Self {
        self.layer_mask = mask;
        self
    }
}
