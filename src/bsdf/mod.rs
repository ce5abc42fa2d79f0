//! The Uber BSDF (C5): evaluate/sample/pdf over the four shared lobes.
//!
//! All directions are in the local shading frame (`sn` is `+z`); callers transform
//! `wo`/`wi` in and out of world space. Shading-frame invariants from §4.4: only
//! `sn` is ever perturbed by normal mapping, `gn` stays the geometric triangle
//! normal, and every evaluation clamps `cosθ` to zero below `1e-6`.

pub mod fresnel;
pub mod microfacet;

use crate::sampler::PathSampler;
use crate::scene::material::{LobeMask, SampledLobe, UberMaterial};
use fresnel::fresnel_dielectric;
use glam::{Vec2, Vec3};

const COS_EPS: f32 = 1e-6;

#[inline]
fn clamped_cos(w: Vec3) -> f32 {
    if w.z.abs() < COS_EPS {
        0.0
    } else {
        w.z
    }
}

/// Result of drawing one BSDF sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BsdfSample {
    pub wi: Vec3,
    pub f: Vec3,
    pub pdf: f32,
    pub flags: LobeMask,
}

fn reflect(wo: Vec3) -> Vec3 {
    Vec3::new(-wo.x, -wo.y, wo.z)
}

fn reflect_about(wo: Vec3, wh: Vec3) -> Vec3 {
    2.0 * wo.dot(wh) * wh - wo
}

/// Refracts `wo` (pointing away from the surface) through a half-vector `wh`,
/// given the relative IOR `eta` (incident-side / transmitted-side). Returns `None`
/// under total internal reflection.
fn refract(wo: Vec3, mut wh: Vec3, eta: f32) -> Option<Vec3> {
    let mut cos_i = wo.dot(wh);
    let mut eta = eta;
    if cos_i < 0.0 {
        eta = 1.0 / eta;
        cos_i = -cos_i;
        wh = -wh;
    }
    let sin2_i = (1.0 - cos_i * cos_i).max(0.0);
    let sin2_t = sin2_i / (eta * eta);
    if sin2_t >= 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    Some(-wo / eta + (cos_i / eta - cos_t) * wh)
}

fn eval_diffuse(mat: &UberMaterial) -> Vec3 {
    Vec3::from(mat.kd) * std::f32::consts::FRAC_1_PI
}

fn eval_glossy_reflection(mat: &UberMaterial, wo: Vec3, wi: Vec3) -> Vec3 {
    let cos_o = clamped_cos(wo);
    let cos_i = clamped_cos(wi);
    if cos_o == 0.0 || cos_i == 0.0 {
        return Vec3::ZERO;
    }
    let wh = (wo + wi).normalize_or_zero();
    if wh == Vec3::ZERO {
        return Vec3::ZERO;
    }
    let d = microfacet::ggx_d(wh, mat.alpha[0], mat.alpha[1]);
    let g = microfacet::smith_g(wo, wi, mat.alpha[0], mat.alpha[1]);
    let f = fresnel_dielectric(wo.dot(wh), mat.eta);
    Vec3::from(mat.ks) * (d * g * f / (4.0 * cos_o.abs() * cos_i.abs()))
}

fn eval_glossy_transmission(mat: &UberMaterial, wo: Vec3, wi: Vec3) -> Vec3 {
    let cos_o = clamped_cos(wo);
    let cos_i = clamped_cos(wi);
    if cos_o == 0.0 || cos_i == 0.0 {
        return Vec3::ZERO;
    }
    let eta = if cos_o > 0.0 { mat.eta } else { 1.0 / mat.eta };
    let mut wh = (wo + wi * eta).normalize_or_zero();
    if wh == Vec3::ZERO {
        return Vec3::ZERO;
    }
    if wh.z < 0.0 {
        wh = -wh;
    }
    if wo.dot(wh) * wi.dot(wh) > 0.0 {
        return Vec3::ZERO; // not a valid transmission configuration
    }
    let d = microfacet::ggx_d(wh, mat.alpha[0], mat.alpha[1]);
    let g = microfacet::smith_g(wo, wi, mat.alpha[0], mat.alpha[1]);
    let f = fresnel_dielectric(wo.dot(wh), mat.eta);
    let denom = (wi.dot(wh) + wo.dot(wh) / eta).powi(2);
    if denom < 1e-12 {
        return Vec3::ZERO;
    }
    let kt = Vec3::new(mat.kt[0], mat.kt[1], mat.kt[2]);
    kt * ((1.0 - f) * d.abs() * g.abs() * wi.dot(wh).abs() * wo.dot(wh).abs()
        / (cos_o.abs() * cos_i.abs() * denom)
        / (eta * eta))
}

/// Evaluates every non-delta lobe's contribution, summed (§4.4 "evaluation sums
/// only non-delta lobes").
#[must_use]
pub fn evaluate(mat: &UberMaterial, wo: Vec3, wi: Vec3) -> Vec3 {
    let same_hemisphere = clamped_cos(wo) * clamped_cos(wi) > 0.0;
    let mut f = Vec3::ZERO;
    if same_hemisphere {
        f += eval_diffuse(mat) * mat.opacity;
        f += eval_glossy_reflection(mat, wo, wi) * mat.opacity;
    }
    if mat.transmission_is_glossy() {
        f += eval_glossy_transmission(mat, wo, wi) * mat.opacity;
    }
    f
}

fn pdf_diffuse(wi: Vec3) -> f32 {
    clamped_cos(wi).abs() * std::f32::consts::FRAC_1_PI
}

fn pdf_glossy_reflection(mat: &UberMaterial, wo: Vec3, wi: Vec3) -> f32 {
    if clamped_cos(wo) * clamped_cos(wi) <= 0.0 {
        return 0.0;
    }
    let wh = (wo + wi).normalize_or_zero();
    if wh == Vec3::ZERO {
        return 0.0;
    }
    microfacet::pdf_wh(wh, mat.alpha[0], mat.alpha[1]) / (4.0 * wo.dot(wh).abs())
}

fn pdf_glossy_transmission(mat: &UberMaterial, wo: Vec3, wi: Vec3) -> f32 {
    if clamped_cos(wo) * clamped_cos(wi) >= 0.0 {
        return 0.0;
    }
    let eta = if clamped_cos(wo) > 0.0 {
        mat.eta
    } else {
        1.0 / mat.eta
    };
    let mut wh = (wo + wi * eta).normalize_or_zero();
    if wh == Vec3::ZERO {
        return 0.0;
    }
    if wh.z < 0.0 {
        wh = -wh;
    }
    let denom = (wi.dot(wh) + wo.dot(wh) / eta).powi(2);
    if denom < 1e-12 {
        return 0.0;
    }
    let dwh_dwi = wi.dot(wh).abs() / denom;
    microfacet::pdf_wh(wh, mat.alpha[0], mat.alpha[1]) * dwh_dwi
}

/// Combined PDF over every sampled-lobe probability consistent with the sampling
/// procedure in [`sample`] (needed for MIS, §4.4).
#[must_use]
pub fn pdf(mat: &UberMaterial, wo: Vec3, wi: Vec3) -> f32 {
    let Some(probs) = mat.lobe_probabilities() else {
        return 0.0;
    };
    let mut total = 0.0;
    total += probs.diffuse * pdf_diffuse(wi);
    total += probs.glossy_reflection * pdf_glossy_reflection(mat, wo, wi);
    if mat.transmission_is_glossy() {
        total += probs.transmission * pdf_glossy_transmission(mat, wo, wi);
    }
    total
}

/// Draws one lobe and samples it, returning `None` on a zero-sum (purely
/// absorbing) surface — the caller should kill the path.
#[must_use]
pub fn sample(mat: &UberMaterial, wo: Vec3, sampler: &mut PathSampler) -> Option<BsdfSample> {
    let probs = mat.lobe_probabilities()?;
    let lobe_u = sampler.next_1d();
    let u2 = sampler.next_2d();

    match probs.select(lobe_u) {
        SampledLobe::Diffuse => sample_diffuse(mat, wo, u2, &probs),
        SampledLobe::GlossyReflection => sample_glossy_reflection(mat, wo, u2, &probs),
        SampledLobe::SpecularReflection => sample_specular_reflection(mat, wo, &probs),
        SampledLobe::Transmission => {
            if mat.transmission_is_glossy() {
                sample_glossy_transmission(mat, wo, u2, &probs)
            } else {
                sample_specular_transmission(mat, wo, &probs)
            }
        }
    }
}

fn cosine_sample_hemisphere(u: Vec2) -> Vec3 {
    let d = crate::sampler::concentric_sample_disc(u);
    let z = (1.0 - d.x * d.x - d.y * d.y).max(0.0).sqrt();
    Vec3::new(d.x, d.y, z)
}

fn sample_diffuse(
    mat: &UberMaterial,
    wo: Vec3,
    u: Vec2,
    probs: &crate::scene::material::LobeProbabilities,
) -> Option<BsdfSample> {
    let mut wi = cosine_sample_hemisphere(u);
    if wo.z < 0.0 {
        wi.z = -wi.z;
    }
    let f = evaluate(mat, wo, wi);
    let pdf_total = pdf(mat, wo, wi);
    if pdf_total <= 0.0 || probs.diffuse <= 0.0 {
        return None;
    }
    Some(BsdfSample {
        wi,
        f,
        pdf: pdf_total,
        flags: LobeMask::DIFFUSE,
    })
}

fn sample_glossy_reflection(
    mat: &UberMaterial,
    wo: Vec3,
    u: Vec2,
    _probs: &crate::scene::material::LobeProbabilities,
) -> Option<BsdfSample> {
    let wh = microfacet::sample_wh(wo, mat.alpha[0], mat.alpha[1], u);
    let wi = reflect_about(wo, wh);
    if clamped_cos(wo) * clamped_cos(wi) <= 0.0 {
        return None;
    }
    let f = evaluate(mat, wo, wi);
    let pdf_total = pdf(mat, wo, wi);
    if pdf_total <= 0.0 {
        return None;
    }
    Some(BsdfSample {
        wi,
        f,
        pdf: pdf_total,
        flags: LobeMask::GLOSSY_REFLECTION,
    })
}

fn sample_specular_reflection(
    mat: &UberMaterial,
    wo: Vec3,
    probs: &crate::scene::material::LobeProbabilities,
) -> Option<BsdfSample> {
    let wi = reflect(wo);
    let cos_i = clamped_cos(wi);
    if cos_i == 0.0 {
        return None;
    }
    let fr = fresnel_dielectric(wo.z, mat.eta);
    let f = Vec3::from(mat.kr) * (mat.opacity * fr / cos_i.abs());
    Some(BsdfSample {
        wi,
        f,
        pdf: probs.specular_reflection,
        flags: LobeMask::SPECULAR_REFLECTION,
    })
}

fn sample_specular_transmission(
    mat: &UberMaterial,
    wo: Vec3,
    probs: &crate::scene::material::LobeProbabilities,
) -> Option<BsdfSample> {
    let entering = wo.z > 0.0;
    let eta = if entering { mat.eta } else { 1.0 / mat.eta };
    let n = if entering { Vec3::Z } else { -Vec3::Z };
    let wi = refract(wo, n, eta)?;
    let cos_i = clamped_cos(wi);
    if cos_i == 0.0 {
        return None;
    }
    let fr = fresnel_dielectric(wo.z, mat.eta);
    let kt = Vec3::new(mat.kt[0], mat.kt[1], mat.kt[2]);
    // Radiance scaling by 1/eta^2 for the non-symmetric transport of specular
    // transmission between media of different IOR.
    let f = kt * (mat.opacity * (1.0 - fr) / (cos_i.abs() * eta * eta));
    Some(BsdfSample {
        wi,
        f,
        pdf: probs.transmission,
        flags: LobeMask::SPECULAR_TRANSMISSION,
    })
}

fn sample_glossy_transmission(
    mat: &UberMaterial,
    wo: Vec3,
    u: Vec2,
    _probs: &crate::scene::material::LobeProbabilities,
) -> Option<BsdfSample> {
    let wh = microfacet::sample_wh(wo, mat.alpha[0], mat.alpha[1], u);
    let eta = if wo.z > 0.0 { mat.eta } else { 1.0 / mat.eta };
    let wi = refract(wo, wh, eta)?;
    if clamped_cos(wo) * clamped_cos(wi) >= 0.0 {
        return None;
    }
    let f = eval_glossy_transmission(mat, wo, wi) * mat.opacity;
    let pdf_total = pdf(mat, wo, wi);
    if pdf_total <= 0.0 {
        return None;
    }
    Some(BsdfSample {
        wi,
        f,
        pdf: pdf_total,
        flags: LobeMask::GLOSSY_TRANSMISSION,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::hash::pixel_scramble;

    fn lambertian() -> UberMaterial {
        UberMaterial {
            kd: [0.5, 0.5, 0.5],
            ks: [0.0; 3],
            kr: [0.0; 3],
            kt: [0.0; 4],
            ..UberMaterial::default()
        }
    }

    #[test]
    fn diffuse_reciprocity_holds() {
        let mat = lambertian();
        let wo = Vec3::new(0.3, 0.2, 0.9).normalize();
        let wi = Vec3::new(-0.1, 0.4, 0.85).normalize();
        let f1 = evaluate(&mat, wo, wi);
        let f2 = evaluate(&mat, wi, wo);
        assert!((f1 - f2).length() < 1e-5);
    }

    #[test]
    fn glossy_reflection_reciprocity_holds() {
        let mat = UberMaterial {
            kd: [0.0; 3],
            ks: [0.6, 0.6, 0.6],
            kr: [0.0; 3],
            kt: [0.0; 4],
            alpha: [0.25, 0.25],
            ..UberMaterial::default()
        };
        let wo = Vec3::new(0.2, 0.1, 0.95).normalize();
        let wi = Vec3::new(-0.25, 0.05, 0.95).normalize();
        let f1 = evaluate(&mat, wo, wi);
        let f2 = evaluate(&mat, wi, wo);
        assert!((f1 - f2).length() < 1e-4);
    }

    #[test]
    fn energy_conservation_holds_for_a_bounded_surface() {
        let mat = UberMaterial {
            kd: [0.3, 0.3, 0.3],
            ks: [0.2, 0.2, 0.2],
            kr: [0.1, 0.1, 0.1],
            kt: [0.0, 0.0, 0.0, 0.0],
            alpha: [0.3, 0.3],
            ..UberMaterial::default()
        };
        let wo = Vec3::new(0.1, 0.05, 0.99).normalize();
        let scramble = pixel_scramble(1, 1, 0);
        let mut sum = Vec3::ZERO;
        let n = 4096u32;
        for i in 0..n {
            let mut sampler = crate::sampler::PathSampler::new(i, scramble);
            if let Some(s) = sample(&mat, wo, &mut sampler) {
                if s.pdf > 0.0 {
                    sum += s.f * s.wi.z.abs() / s.pdf;
                }
            }
        }
        let mean = sum / n as f32;
        assert!(mean.x <= 1.0 + 1e-3 && mean.y <= 1.0 + 1e-3 && mean.z <= 1.0 + 1e-3);
    }

    #[test]
    fn sampled_directions_are_finite() {
        let mat = lambertian();
        let wo = Vec3::new(0.0, 0.0, 1.0);
        let scramble = pixel_scramble(4, 4, 0);
        for i in 0..64u32 {
            let mut sampler = crate::sampler::PathSampler::new(i, scramble);
            if let Some(s) = sample(&mat, wo, &mut sampler) {
                assert!(s.wi.is_finite());
                assert!(s.f.is_finite());
            }
        }
    }
}
