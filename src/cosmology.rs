//! Cosmology helpers (spec §1: retained in the repo, explicitly not
//! part of the hard core). Grounded in
//! `original_source/src/Cosmology.cpp`, keeping only the parts that
//! are actually implemented there — `GravAcc`, `InitH2t`, `H2t` and
//! `A2Sec` are empty/`TEST`-gated in the source and spec §9 flags them
//! as out of scope, so they are not carried forward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CosmologicalParameters {
    pub omega_dm: f64,
    pub omega_l: f64,
    pub omega_m: f64,
    pub omega_b: f64,
    pub h: f64,
}

impl CosmologicalParameters {
    pub fn planck() -> Self {
        Self {
            omega_dm: 0.26,
            omega_l: 0.69,
            omega_m: 0.31,
            omega_b: 0.05,
            h: 0.67,
        }
    }

    pub fn wmap7() -> Self {
        Self {
            omega_dm: 0.23,
            omega_l: 0.73,
            omega_m: 0.27,
            omega_b: 0.04,
            h: 0.7,
        }
    }
}

/// Mean matter density of a box containing `n_part` particles of
/// uniform mass (`Cosmology::Rho0`).
pub fn rho0(box_size_mpc: f64, n_part: u64) -> f64 {
    let fact0 = 100.0 / 256.0;
    let mass0 = 1.05217e11 / 20.0;
    let fact1 = box_size_mpc / n_part as f64;
    let mass1 = (fact1 / fact0).powi(3) * mass0;
    mass1 * n_part as f64 / box_size_mpc.powi(3)
}

/// Critical density implied by `rho0` and `omega_l` (`Cosmology::RhoC`).
pub fn rho_c(box_size_mpc: f64, n_part: u64, params: &CosmologicalParameters) -> f64 {
    rho0(box_size_mpc, n_part) * (1.0 / (1.0 - params.omega_l))
}

pub fn redshift_to_scale_factor(z: f64) -> f64 {
    1.0 / (1.0 + z)
}

pub fn scale_factor_to_redshift(a: f64) -> f64 {
    1.0 / a - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redshift_and_scale_factor_are_inverse() {
        let z = 2.5;
        let a = redshift_to_scale_factor(z);
        assert!((scale_factor_to_redshift(a) - z).abs() < 1e-12);
    }

    #[test]
    fn planck_and_wmap7_differ() {
        assert_ne!(CosmologicalParameters::planck(), CosmologicalParameters::wmap7());
    }
}
