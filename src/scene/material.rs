//! The Uber material (C5 data side — evaluation lives in [`crate::bsdf`]).
//!
//! A single tagged material replaces the deep material-class hierarchy the original
//! engine used: every surface carries the same field set, and which lobes actually
//! contribute is decided at shading time from the reflectance magnitudes (§4.4), not
//! from a v-table.

use bitflags::bitflags;

bitflags! {
    /// Which BSDF lobes a sampled/evaluated interaction touched. Mirrors the
    /// teacher's `MaterialFeatures` shader-variant bits, but selects lobes during
    /// evaluation rather than shader permutations.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct LobeMask: u32 {
        const DIFFUSE               = 1 << 0;
        const GLOSSY_REFLECTION     = 1 << 1;
        const SPECULAR_REFLECTION   = 1 << 2;
        const GLOSSY_TRANSMISSION   = 1 << 3;
        const SPECULAR_TRANSMISSION = 1 << 4;
        /// Union of the two delta lobes — neither can be hit by NEE or serve as a
        /// BDPT connection endpoint.
        const DELTA = Self::SPECULAR_REFLECTION.bits() | Self::SPECULAR_TRANSMISSION.bits();
    }
}

/// Texture slot index; `None` means the field uses its scalar value directly.
pub type TextureSlot = Option<u32>;

/// The Uber material: Lambertian diffuse + anisotropic GGX glossy reflection +
/// perfect specular reflection + glossy-or-specular transmission, all
/// Fresnel(η)-weighted and sharing one opacity multiplier (§4.4).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UberMaterial {
    /// Diffuse reflectance, each component in `[0,1]`.
    pub kd: [f32; 3],
    /// Glossy reflectance, each component in `[0,1]`.
    pub ks: [f32; 3],
    /// Perfect-specular reflectance, each component in `[0,1]`.
    pub kr: [f32; 3],
    /// Transmission color (`.xyz`) and lobe tag (`.w`): `>= 0.5` selects glossy
    /// transmission, otherwise perfect specular (Snell) transmission.
    pub kt: [f32; 4],
    pub opacity: f32,
    /// Anisotropic GGX roughness, each axis clamped to `>= 1e-5`.
    pub alpha: [f32; 2],
    /// Index of refraction, clamped to `[1, 6]`.
    pub eta: f32,
    pub tex_diffuse: TextureSlot,
    pub tex_gloss: TextureSlot,
    pub tex_specular: TextureSlot,
    pub tex_transmission: TextureSlot,
    pub tex_opacity: TextureSlot,
    pub tex_roughness: TextureSlot,
    pub tex_ior: TextureSlot,
    pub tex_normal: TextureSlot,
}

impl Default for UberMaterial {
    fn default() -> Self {
        Self {
            kd: [0.8, 0.8, 0.8],
            ks: [0.0; 3],
            kr: [0.0; 3],
            kt: [0.0; 4],
            opacity: 1.0,
            alpha: [0.5, 0.5],
            eta: 1.5,
            tex_diffuse: None,
            tex_gloss: None,
            tex_specular: None,
            tex_transmission: None,
            tex_opacity: None,
            tex_roughness: None,
            tex_ior: None,
            tex_normal: None,
        }
    }
}

impl UberMaterial {
    /// Clamps every field to its documented range. Configuration problems are never
    /// fatal (§7) — out-of-range values are silently clamped.
    pub fn clamp(&mut self) {
        for c in &mut self.kd {
            *c = c.clamp(0.0, 1.0);
        }
        for c in &mut self.ks {
            *c = c.clamp(0.0, 1.0);
        }
        for c in &mut self.kr {
            *c = c.clamp(0.0, 1.0);
        }
        for c in &mut self.kt[..3] {
            *c = c.clamp(0.0, 1.0);
        }
        self.opacity = self.opacity.clamp(0.0, 1.0);
        self.alpha[0] = self.alpha[0].max(1e-5);
        self.alpha[1] = self.alpha[1].max(1e-5);
        self.eta = self.eta.clamp(1.0, 6.0);
    }

    /// `true` when the transmission lobe is microfacet glossy rather than perfect
    /// specular (`Kt.w >= 0.5`).
    #[must_use]
    pub fn transmission_is_glossy(&self) -> bool {
        self.kt[3] >= 0.5
    }

    #[must_use]
    fn magnitude(c: [f32; 3]) -> f32 {
        (c[0] + c[1] + c[2]) / 3.0
    }

    /// Per-lobe selection probabilities, normalized to sum to 1. A zero-sum surface
    /// (purely absorbing) returns `None`, signalling the caller to kill the path.
    #[must_use]
    pub fn lobe_probabilities(&self) -> Option<LobeProbabilities> {
        let p_d = Self::magnitude(self.kd);
        let p_g = Self::magnitude(self.ks);
        let p_sr = Self::magnitude(self.kr);
        let p_t = Self::magnitude([self.kt[0], self.kt[1], self.kt[2]]);
        let sum = p_d + p_g + p_sr + p_t;
        if sum <= 0.0 {
            return None;
        }
        Some(LobeProbabilities {
            diffuse: p_d / sum,
            glossy_reflection: p_g / sum,
            specular_reflection: p_sr / sum,
            transmission: p_t / sum,
        })
    }
}

/// Normalized per-lobe selection probabilities used both to draw a lobe and to
/// weight each lobe's contribution to the combined PDF (needed for MIS).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LobeProbabilities {
    pub diffuse: f32,
    pub glossy_reflection: f32,
    pub specular_reflection: f32,
    pub transmission: f32,
}

impl LobeProbabilities {
    /// Picks one lobe given a single uniform `u ∈ [0,1)`, consuming it as a
    /// CDF walk in the fixed order diffuse → glossy → specular → transmission.
    #[must_use]
    pub fn select(&self, u: f32) -> SampledLobe {
        let mut acc = self.diffuse;
        if u < acc {
            return SampledLobe::Diffuse;
        }
        acc += self.glossy_reflection;
        if u < acc {
            return SampledLobe::GlossyReflection;
        }
        acc += self.specular_reflection;
        if u < acc {
            return SampledLobe::SpecularReflection;
        }
        SampledLobe::Transmission
    }
}

/// Which lobe was drawn by [`LobeProbabilities::select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampledLobe {
    Diffuse,
    GlossyReflection,
    SpecularReflection,
    Transmission,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purely_absorbing_material_has_no_lobe_probabilities() {
        let m = UberMaterial {
            kd: [0.0; 3],
            ks: [0.0; 3],
            kr: [0.0; 3],
            kt: [0.0; 4],
            ..UberMaterial::default()
        };
        assert!(m.lobe_probabilities().is_none());
    }

    #[test]
    fn lobe_probabilities_sum_to_one() {
        let m = UberMaterial {
            kd: [0.5, 0.5, 0.5],
            ks: [0.2, 0.2, 0.2],
            kr: [0.1, 0.1, 0.1],
            kt: [0.0, 0.0, 0.0, 0.0],
            ..UberMaterial::default()
        };
        let p = m.lobe_probabilities().unwrap();
        let sum = p.diffuse + p.glossy_reflection + p.specular_reflection + p.transmission;
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn clamp_enforces_documented_ranges() {
        let mut m = UberMaterial {
            eta: 50.0,
            alpha: [0.0, -1.0],
            opacity: 5.0,
            ..UberMaterial::default()
        };
        m.clamp();
        assert_eq!(m.eta, 6.0);
        assert!(m.alpha[0] >= 1e-5);
        assert!(m.alpha[1] >= 1e-5);
        assert_eq!(m.opacity, 1.0);
    }
}
