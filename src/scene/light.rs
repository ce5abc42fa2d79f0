//! Light table data (C6 data side — sampling lives in [`crate::lights`]).
//!
//! One tagged [`LightKind`] replaces the per-kind light-component hierarchy in the
//! original engine; flags record which delta/area/infinite properties a variant has
//! without requiring a downcast.

use super::ids::ShapeId;
use bitflags::bitflags;
use glam::Vec3;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct LightFlags: u32 {
        /// Position is a delta (point lights): `pdfPos` has no density, the light
        /// occupies a single point.
        const DELTA_POSITION = 1 << 0;
        /// Direction is a delta (directional lights): `pdfDir` has no density.
        const DELTA_DIRECTION = 1 << 1;
        /// The light occupies a finite area (disk/mesh area lights).
        const AREA = 1 << 2;
        /// The light is at infinity relative to the scene (directional lights).
        const INFINITE = 1 << 3;
    }
}

/// Per-variant geometric data. Intensity `I` is shared by every variant; everything
/// else is variant-specific.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Delta-direction, "infinite" light. `direction` points from the scene toward
    /// the light (i.e. light travels along `-direction`).
    Directional { direction: Vec3 },
    /// Delta-position light.
    Point { position: Vec3 },
    /// Finite disk area light with an oriented frame.
    DiskArea {
        center: Vec3,
        normal: Vec3,
        radius: f32,
        shape_id: ShapeId,
    },
    /// Area light covering an entire triangle mesh shape; per-triangle areas are
    /// precomputed into a CDF by [`crate::lights::TriangleMeshAreaSampler`].
    TriangleMeshArea { shape_id: ShapeId },
}

impl LightKind {
    #[must_use]
    pub fn flags(&self) -> LightFlags {
        match self {
            LightKind::Directional { .. } => LightFlags::DELTA_DIRECTION | LightFlags::INFINITE,
            LightKind::Point { .. } => LightFlags::DELTA_POSITION,
            LightKind::DiskArea { .. } | LightKind::TriangleMeshArea { .. } => LightFlags::AREA,
        }
    }

    #[must_use]
    pub fn shape_id(&self) -> Option<ShapeId> {
        match self {
            LightKind::DiskArea { shape_id, .. } | LightKind::TriangleMeshArea { shape_id } => {
                Some(*shape_id)
            }
            _ => None,
        }
    }
}

/// One entry in the light table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub intensity: Vec3,
    /// Uniform choice PDF, `1/N` for `N` active lights (§4.5) — design leaves room
    /// for power-proportional choice without changing this field's meaning.
    pub choice_pdf: f32,
}

impl Light {
    #[must_use]
    pub fn flags(&self) -> LightFlags {
        self.kind.flags()
    }
}

/// The full light table plus the derived uniform choice PDF, rebuilt wholesale
/// whenever any light-owning entity changes (§4.3 "dirty lights" policy — light
/// counts are always small, so incremental updates are not worth the bookkeeping).
#[derive(Debug, Clone, Default)]
pub struct LightTable {
    pub lights: Vec<Light>,
}

impl LightTable {
    /// Rebuilds `choice_pdf` on every light to `1/N`. Call after inserting/removing
    /// lights, before the table is consumed by a frame.
    pub fn rebuild_choice_pdf(&mut self) {
        let n = self.lights.len();
        let pdf = if n == 0 { 0.0 } else { 1.0 / n as f32 };
        for light in &mut self.lights {
            light.choice_pdf = pdf;
        }
    }
}
