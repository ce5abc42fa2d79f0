//! Arena identifiers for the Scene Store.
//!
//! Back-references between shapes, materials, lights, and transforms are expressed
//! as these keys rather than owning references, breaking the cycles a
//! transform-hierarchy/shape graph would otherwise require (mirrors the teacher's
//! `SceneHandle` in `scene::manager`).

use slotmap::new_key_type;

new_key_type! {
    pub struct ShapeId;
    pub struct MaterialId;
    pub struct LightId;
    pub struct TransformId;
}
