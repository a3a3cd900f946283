// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Identity types for host-side scene entities and renderer-side handles.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The GUID of a host geometric object.
///
/// A single host object can be triangulated into several sub-meshes; all of
/// them share this GUID and are told apart by [`MeshId::sub_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshGuid(pub Uuid);

impl MeshGuid {
    /// Creates a new, random (version 4) `MeshGuid`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MeshGuid {
    fn default() -> Self {
        Self::new()
    }
}

/// One triangulated sub-mesh of a host geometric object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshId {
    /// The host object this sub-mesh was produced from.
    pub guid: MeshGuid,
    /// Index of the sub-mesh within the host object.
    pub sub_index: u32,
}

impl MeshId {
    /// Creates a `MeshId` from its parts.
    pub const fn new(guid: MeshGuid, sub_index: u32) -> Self {
        Self { guid, sub_index }
    }
}

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.guid.0, self.sub_index)
    }
}

/// One placed instance of a mesh (a transform plus a material assignment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

/// Host-side identity of a material, resolved through a
/// [`MaterialResolver`](crate::renderer::MaterialResolver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub Uuid);

impl MaterialId {
    /// Creates a new, random (version 4) `MaterialId`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MaterialId {
    fn default() -> Self {
        Self::new()
    }
}

/// A stable light identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LightId(pub Uuid);

impl LightId {
    /// The id reserved for the synthetic background light.
    pub const BACKGROUND: LightId = LightId(Uuid::nil());

    /// Creates a new, random (version 4) `LightId`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns `true` for the reserved background light id.
    pub fn is_background(&self) -> bool {
        *self == Self::BACKGROUND
    }
}

impl Default for LightId {
    fn default() -> Self {
        Self::new()
    }
}

/// A stable clipping plane identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClippingPlaneId(pub Uuid);

impl ClippingPlaneId {
    /// Creates a new, random (version 4) `ClippingPlaneId`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClippingPlaneId {
    fn default() -> Self {
        Self::new()
    }
}

/// Content-derived identity of a resolved material.
///
/// Two materials that render identically hash equal and therefore share one
/// renderer shader. Collisions between distinct materials are tolerated and
/// resolve to "same shader reused".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialHash(pub u32);

impl MaterialHash {
    /// Reserved value meaning "this object had no prior shader assignment".
    pub const NO_PREVIOUS: MaterialHash = MaterialHash(u32::MAX);

    /// Wraps a raw content hash, moving it off the sentinel if needed.
    pub const fn from_raw(raw: u32) -> Self {
        if raw == u32::MAX {
            MaterialHash(u32::MAX - 1)
        } else {
            MaterialHash(raw)
        }
    }

    /// Returns `true` if this is the [`NO_PREVIOUS`](Self::NO_PREVIOUS) sentinel.
    pub const fn is_no_previous(&self) -> bool {
        self.0 == u32::MAX
    }
}

impl fmt::Display for MaterialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_no_previous() {
            write!(f, "<none>")
        } else {
            write!(f, "{:#010x}", self.0)
        }
    }
}

macro_rules! renderer_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

renderer_handle!(
    /// Opaque renderer handle for a compiled shader.
    ShaderHandle
);
renderer_handle!(
    /// Opaque renderer handle for uploaded mesh buffers.
    MeshHandle
);
renderer_handle!(
    /// Opaque renderer handle for a placed object.
    ObjectHandle
);
renderer_handle!(
    /// Opaque renderer handle for a light.
    LightHandle
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_never_produced_by_from_raw() {
        assert!(!MaterialHash::from_raw(u32::MAX).is_no_previous());
        assert_eq!(MaterialHash::from_raw(u32::MAX), MaterialHash(u32::MAX - 1));
        assert_eq!(MaterialHash::from_raw(7), MaterialHash(7));
    }

    #[test]
    fn background_light_id_is_reserved() {
        assert!(LightId::BACKGROUND.is_background());
        assert!(!LightId::new().is_background());
    }

    #[test]
    fn mesh_ids_of_same_guid_differ_by_sub_index() {
        let guid = MeshGuid::new();
        assert_ne!(MeshId::new(guid, 0), MeshId::new(guid, 1));
        assert_eq!(MeshId::new(guid, 2).guid, guid);
    }
}
