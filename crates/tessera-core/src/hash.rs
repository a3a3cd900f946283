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

//! Deterministic content hashing for render-affecting parameters.
//!
//! The render hash is the deduplication key of the shader cache: it must be a
//! pure function of the visual parameters, stable for the lifetime of the
//! process, and independent of where the material came from. A fixed-seed
//! `ahash` state gives us exactly that.

use crate::scene::ids::MaterialHash;
use ahash::RandomState;
use glam::{Mat4, Vec2, Vec3};
use std::hash::{BuildHasher, Hasher};

fn seeded_state() -> RandomState {
    RandomState::with_seeds(
        0x5445_5353_4552_4131,
        0x9e37_79b9_7f4a_7c15,
        0xc2b2_ae3d_27d4_eb4f,
        0x1656_67b1_9e37_79f9,
    )
}

/// Types whose visual parameters can be fed into a [`ContentHasher`].
pub trait ContentHash {
    /// Feeds every render-affecting field into `hasher`.
    fn feed(&self, hasher: &mut ContentHasher);
}

/// An incremental hasher over render parameters.
///
/// Floats are hashed by bit pattern after folding `-0.0` onto `0.0`, so values
/// that compare equal also hash equal.
pub struct ContentHasher {
    inner: ahash::AHasher,
}

impl ContentHasher {
    /// Creates a hasher with the process-wide fixed seeds.
    pub fn new() -> Self {
        Self {
            inner: seeded_state().build_hasher(),
        }
    }

    /// Feeds a tag separating one section of the input from the next.
    pub fn write_tag(&mut self, tag: u8) -> &mut Self {
        self.inner.write_u8(tag);
        self
    }

    /// Feeds a boolean.
    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.inner.write_u8(value as u8);
        self
    }

    /// Feeds an unsigned integer.
    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.inner.write_u32(value);
        self
    }

    /// Feeds a float.
    pub fn write_f32(&mut self, value: f32) -> &mut Self {
        let canonical = if value == 0.0 { 0.0f32 } else { value };
        self.inner.write_u32(canonical.to_bits());
        self
    }

    /// Feeds a slice of floats, length-prefixed.
    pub fn write_f32s(&mut self, values: &[f32]) -> &mut Self {
        self.inner.write_usize(values.len());
        for v in values {
            self.write_f32(*v);
        }
        self
    }

    /// Feeds a 2D vector.
    pub fn write_vec2(&mut self, value: Vec2) -> &mut Self {
        self.write_f32s(&value.to_array())
    }

    /// Feeds a 3D vector.
    pub fn write_vec3(&mut self, value: Vec3) -> &mut Self {
        self.write_f32s(&value.to_array())
    }

    /// Feeds a 4x4 matrix in column-major order.
    pub fn write_mat4(&mut self, value: &Mat4) -> &mut Self {
        self.write_f32s(&value.to_cols_array())
    }

    /// Feeds a string, length-prefixed.
    pub fn write_str(&mut self, value: &str) -> &mut Self {
        self.inner.write_usize(value.len());
        self.inner.write(value.as_bytes());
        self
    }

    /// Feeds raw bytes, length-prefixed.
    pub fn write_bytes(&mut self, value: &[u8]) -> &mut Self {
        self.inner.write_usize(value.len());
        self.inner.write(value);
        self
    }

    /// Feeds a nested value.
    pub fn write<T: ContentHash + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.feed(self);
        self
    }

    /// Folds the 64-bit state into a [`MaterialHash`].
    pub fn finish(&self) -> MaterialHash {
        let h = self.inner.finish();
        MaterialHash::from_raw((h ^ (h >> 32)) as u32)
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs_hash_equal() {
        let mut a = ContentHasher::new();
        a.write_str("plastic").write_f32(0.5).write_vec3(Vec3::ONE);
        let mut b = ContentHasher::new();
        b.write_str("plastic").write_f32(0.5).write_vec3(Vec3::ONE);
        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn negative_zero_folds_onto_zero() {
        let mut a = ContentHasher::new();
        a.write_f32(0.0);
        let mut b = ContentHasher::new();
        b.write_f32(-0.0);
        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn different_inputs_hash_differently() {
        let mut a = ContentHasher::new();
        a.write_f32(0.5);
        let mut b = ContentHasher::new();
        b.write_f32(0.25);
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn finish_never_yields_the_sentinel() {
        for i in 0..256u32 {
            let mut h = ContentHasher::new();
            h.write_u32(i);
            assert!(!h.finish().is_no_previous());
        }
    }
}
