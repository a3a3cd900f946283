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

//! Host-side scene descriptors and identity types.
//!
//! These are plain values: the host builds them in its notification handlers
//! and hands them over by value to the `ChangeDatabase`.

pub mod environment;
pub mod ids;
pub mod light;
pub mod material;
pub mod mesh;
pub mod object;
pub mod view;

pub use environment::{
    BackgroundStyle, ClippingPlane, EnvironmentDescriptor, EnvironmentTexture, GroundPlane,
    LinearWorkflow,
};
pub use ids::{
    ClippingPlaneId, LightHandle, LightId, MaterialHash, MaterialId, MeshGuid, MeshHandle, MeshId,
    ObjectHandle, ObjectId, ShaderHandle,
};
pub use light::{LightDescriptor, LightKind};
pub use material::{
    BlendMaterial, CustomMaterial, Decal, DecalMapping, MaterialDescriptor, MaterialKind,
    NativeMaterial, ParamValue, PbrMaterial, TextureSlot,
};
pub use mesh::{Face, MeshBuffers, MeshDescriptor};
pub use object::ObjectInstanceDescriptor;
pub use view::{Projection, ViewDescriptor};
