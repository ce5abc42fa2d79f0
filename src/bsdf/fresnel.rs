//! Dielectric Fresnel reflectance.

/// Fresnel reflectance for an unpolarized dielectric interface, `cos_theta_i`
/// measured from the surface normal on the incident side (may be negative when the
/// ray is leaving the denser medium — handled by swapping `eta`).
#[must_use]
pub fn fresnel_dielectric(cos_theta_i: f32, eta: f32) -> f32 {
    let mut cos_i = cos_theta_i.clamp(-1.0, 1.0);
    let (eta_i, eta_t) = if cos_i > 0.0 {
        (1.0, eta)
    } else {
        cos_i = -cos_i;
        (eta, 1.0)
    };

    let sin_t2 = (eta_i / eta_t).powi(2) * (1.0 - cos_i * cos_i).max(0.0);
    if sin_t2 >= 1.0 {
        return 1.0; // total internal reflection
    }
    let cos_t = (1.0 - sin_t2).max(0.0).sqrt();

    let r_parl = ((eta_t * cos_i) - (eta_i * cos_t)) / ((eta_t * cos_i) + (eta_i * cos_t));
    let r_perp = ((eta_i * cos_i) - (eta_t * cos_t)) / ((eta_i * cos_i) + (eta_t * cos_t));
    0.5 * (r_parl * r_parl + r_perp * r_perp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_incidence_matches_schlick_r0() {
        let eta = 1.5;
        let r0 = ((eta - 1.0) / (eta + 1.0)).powi(2);
        let f = fresnel_dielectric(1.0, eta);
        assert!((f - r0).abs() < 1e-4);
    }

    #[test]
    fn grazing_incidence_approaches_total_reflection() {
        let f = fresnel_dielectric(0.001, 1.5);
        assert!(f > 0.9);
    }

    #[test]
    fn reflectance_stays_in_unit_range() {
        for i in 0..=20 {
            let cos_theta = i as f32 / 20.0;
            let f = fresnel_dielectric(cos_theta, 1.5);
            assert!((0.0..=1.0).contains(&f));
        }
    }
}
