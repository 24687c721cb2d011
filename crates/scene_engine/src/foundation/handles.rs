//! Typed handles
//!
//! Every live runtime entity is addressed by a small copyable handle. Handles
//! are allocated from one process-wide counter and never reused, so a handle to
//! a reclaimed object simply stops resolving instead of aliasing a newer one.
//! This is also what lets two scenes merge their arenas without remapping.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

fn next_raw() -> u64 {
    NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)
}

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Allocate a fresh, process-unique handle
            pub fn next() -> Self {
                Self(next_raw())
            }

            /// Raw handle value
            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

handle_type!(
    /// Live game object in a scene's object store
    ObjectId
);
handle_type!(
    /// Scene-graph node owned by exactly one game object
    NodeId
);
handle_type!(
    /// Scene instance
    SceneId
);
handle_type!(
    /// Converted mesh
    MeshId
);
handle_type!(
    /// Converted material
    MaterialId
);
handle_type!(
    /// Shared asset-conversion context
    ConverterId
);
handle_type!(
    /// Physics environment instance
    EnvironmentId
);

/// Identity of authored data in the content source.
///
/// Assigned by the asset source rather than allocated here: two objects
/// replicated from the same template share the template's asset id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub u32);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self.0)
    }
}
