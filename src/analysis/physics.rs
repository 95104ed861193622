//! Propulsion formulas. Every calculator validates its own inputs and fails
//! fast with [`AnalysisError`]; none of them touch session state.

use crate::analysis::series;
use crate::error::{AnalysisError, AnalysisResult, require_finite, require_positive};

// ---------------------------------------------------------------------------
// Unit constants
// ---------------------------------------------------------------------------

pub const LBS_TO_KG: f64 = 0.453592;
pub const PSI_TO_PA: f64 = 6894.76;
pub const IN2_TO_M2: f64 = 0.00064516;
pub const FT_TO_M: f64 = 0.3048;
pub const IN2_PER_FT2: f64 = 144.0;
pub const GRAVITY_FT_S2: f64 = 32.174;
pub const GRAVITY_M_S2: f64 = 9.80665;

/// Sea-level ambient pressure preset for the downstream side of a flow test.
pub const AMBIENT_PSI: f64 = 14.7;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Propellant mass flow rates entered by the user, lb/s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowRates {
    pub fuel_lbs: f64,
    pub oxidizer_lbs: f64,
}

impl FlowRates {
    pub fn total_lbs(&self) -> f64 {
        self.fuel_lbs + self.oxidizer_lbs
    }

    /// Total flow in slug/s.
    pub fn total_slugs(&self) -> f64 {
        self.total_lbs() / GRAVITY_FT_S2
    }

    fn validated_total(&self) -> AnalysisResult<f64> {
        require_finite("fuel mass flow", self.fuel_lbs)?;
        require_finite("oxidizer mass flow", self.oxidizer_lbs)?;
        let total = self.total_lbs();
        if total <= 0.0 {
            return Err(AnalysisError::invalid(
                "total mass flow must be greater than zero",
            ));
        }
        Ok(total)
    }
}

/// Geometry and fluid of a venturi flow meter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VenturiSpec {
    /// Upstream area, in².
    pub inlet_area_in2: f64,
    /// Throat area, in².
    pub throat_area_in2: f64,
    /// Discharge coefficient, (0, 1].
    pub cd: f64,
    /// Expansion factor Y.
    pub expansion: f64,
    /// Fluid density, kg/m³.
    pub density: f64,
}

impl VenturiSpec {
    fn validate(&self) -> AnalysisResult<()> {
        let a1 = require_positive("A1 (upstream area)", self.inlet_area_in2)?;
        let a2 = require_positive("A2 (throat area)", self.throat_area_in2)?;
        if a2 >= a1 {
            return Err(AnalysisError::invalid(
                "A2 (throat) must be smaller than A1 (upstream)",
            ));
        }
        let cd = require_finite("discharge coefficient", self.cd)?;
        if cd <= 0.0 || cd > 1.0 {
            return Err(AnalysisError::invalid(
                "discharge coefficient must be between 0 and 1",
            ));
        }
        require_positive("expansion factor", self.expansion)?;
        require_positive("density", self.density)?;
        Ok(())
    }

    /// Throat-to-inlet area ratio β.
    pub fn beta(&self) -> f64 {
        self.throat_area_in2 / self.inlet_area_in2
    }
}

/// Result of the set-pressure calculator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetPressure {
    pub psi: f64,
    pub pa: f64,
    /// Pressure drop across the restriction, Pa.
    pub delta_p_pa: f64,
}

/// Summary statistics of a venturi flow trace over its flowing samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowSummary {
    pub mean: f64,
    pub max: f64,
}

// ---------------------------------------------------------------------------
// Calculators
// ---------------------------------------------------------------------------

/// Mass flow rate (kg/s) from the slope of tank weight (lb) over time (s).
///
/// The series must already be restricted to the window. A draining tank has a
/// negative slope, so flow out is reported positive.
pub fn mass_flow_from_weight(time: &[f64], weight: &[f64]) -> AnalysisResult<f64> {
    let fit = series::linear_regression(time, weight);
    if fit.points < 2 {
        return Err(AnalysisError::insufficient(format!(
            "{} valid samples in range, need at least 2",
            fit.points
        )));
    }
    if !fit.is_valid() {
        return Err(AnalysisError::insufficient(
            "time does not vary across the selected range",
        ));
    }
    Ok(-fit.slope * LBS_TO_KG)
}

/// Effective discharge area CdA (m²) of a restriction.
pub fn cda(mdot_kg_s: f64, p_high_psi: f64, p_low_psi: f64, density: f64) -> AnalysisResult<f64> {
    let mdot = require_finite("mass flow rate", mdot_kg_s)?;
    let p_high = require_finite("P_high", p_high_psi)?;
    let p_low = require_finite("P_low", p_low_psi)?;
    let rho = require_finite("density", density)?;

    let delta_p = (p_high - p_low) * PSI_TO_PA;
    if delta_p <= 0.0 {
        return Err(AnalysisError::invalid("P_high must be greater than P_low"));
    }
    if rho <= 0.0 {
        return Err(AnalysisError::invalid("density must be positive"));
    }
    Ok(mdot / (2.0 * rho * delta_p).sqrt())
}

/// Supply set pressure needed to push `mdot` through `cda` into a manifold.
pub fn set_pressure(
    cda: f64,
    mdot_kg_s: f64,
    density: f64,
    manifold_psi: f64,
) -> AnalysisResult<SetPressure> {
    let cda = require_positive("CdA", cda)?;
    let mdot = require_finite("mass flow rate", mdot_kg_s)?;
    let rho = require_positive("density", density)?;
    let manifold = require_finite("manifold pressure", manifold_psi)?;

    let delta_p_pa = (mdot / cda).powi(2) / (2.0 * rho);
    let pa = delta_p_pa + manifold * PSI_TO_PA;
    Ok(SetPressure {
        psi: pa / PSI_TO_PA,
        pa,
        delta_p_pa,
    })
}

/// Specific impulse (s) per thrust sample (lbf).
pub fn specific_impulse(thrust_lbf: &[f64], flow: FlowRates) -> AnalysisResult<Vec<f64>> {
    flow.validated_total()?;
    let weight_flow = flow.total_slugs() * GRAVITY_FT_S2;
    Ok(thrust_lbf.iter().map(|&t| t / weight_flow).collect())
}

/// Effective exhaust velocity (m/s) from an ISP series.
pub fn exhaust_velocity(isp_s: &[f64]) -> Vec<f64> {
    isp_s.iter().map(|&isp| isp * GRAVITY_M_S2).collect()
}

/// Characteristic velocity c* (m/s) from chamber pressure (psi).
pub fn characteristic_velocity(
    chamber_psi: &[f64],
    flow: FlowRates,
    throat_area_ft2: f64,
) -> AnalysisResult<Vec<f64>> {
    flow.validated_total()?;
    let area = require_positive("throat area", throat_area_ft2)?;
    let slugs = flow.total_slugs();
    Ok(chamber_psi
        .iter()
        .map(|&p| p * IN2_PER_FT2 * area / slugs * FT_TO_M)
        .collect())
}

/// Venturi mass flow rate (kg/s) from upstream and throat pressures (psi).
///
/// Reverse differential pressure is clamped to zero flow; a sample with a
/// missing pressure also reads zero.
pub fn venturi_mass_flow(
    p1_psi: &[f64],
    p2_psi: &[f64],
    spec: &VenturiSpec,
) -> AnalysisResult<Vec<f64>> {
    spec.validate()?;
    if p1_psi.len() != p2_psi.len() {
        return Err(AnalysisError::invalid(format!(
            "P1 has {} samples but P2 has {}",
            p1_psi.len(),
            p2_psi.len()
        )));
    }

    let throat_m2 = spec.throat_area_in2 * IN2_TO_M2;
    let beta = spec.beta();
    let denominator = 1.0 - beta * beta;

    Ok(p1_psi
        .iter()
        .zip(p2_psi.iter())
        .map(|(&p1, &p2)| {
            // f64::max drops NaN, so a missing pressure reads as no flow
            let delta_p = ((p1 - p2) * PSI_TO_PA).max(0.0);
            spec.cd
                * spec.expansion
                * throat_m2
                * (2.0 * spec.density * delta_p / denominator).sqrt()
        })
        .collect())
}

/// Mean and max over the strictly positive (flowing) samples.
pub fn flow_summary(mdot: &[f64]) -> Option<FlowSummary> {
    let flowing: Vec<f64> = mdot.iter().copied().filter(|&m| m > 0.0).collect();
    let max = series::max(&flowing)?;
    Some(FlowSummary {
        mean: series::mean(&flowing),
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel_close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1e-12)
    }

    fn flow(fuel: f64, ox: f64) -> FlowRates {
        FlowRates {
            fuel_lbs: fuel,
            oxidizer_lbs: ox,
        }
    }

    #[test]
    fn mass_flow_uses_negative_slope_in_kg() {
        let t = [0.0, 1.0, 2.0, 3.0];
        let w = [10.0, 8.0, 6.0, 4.0];
        let mdot = mass_flow_from_weight(&t, &w).unwrap();
        assert!(rel_close(mdot, 2.0 * LBS_TO_KG));
    }

    #[test]
    fn mass_flow_needs_two_points() {
        assert!(matches!(
            mass_flow_from_weight(&[1.0, f64::NAN], &[2.0, 3.0]),
            Err(AnalysisError::InsufficientData(_))
        ));
        assert!(matches!(
            mass_flow_from_weight(&[1.0, 1.0], &[2.0, 3.0]),
            Err(AnalysisError::InsufficientData(_))
        ));
    }

    #[test]
    fn cda_golden_value() {
        let value = cda(0.05, 100.0, 14.7, 1.2).unwrap();
        let expected = 0.05 / (2.0_f64 * 1.2 * (85.3 * 6894.76)).sqrt();
        assert!(rel_close(value, expected));
    }

    #[test]
    fn cda_rejects_bad_inputs() {
        assert!(cda(0.05, 14.7, 100.0, 1.2).is_err());
        assert!(cda(0.05, 100.0, 100.0, 1.2).is_err());
        assert!(cda(0.05, 100.0, 14.7, 0.0).is_err());
        assert!(cda(f64::NAN, 100.0, 14.7, 1.2).is_err());
    }

    #[test]
    fn set_pressure_round_trips_through_cda() {
        let (mdot, rho) = (0.05, 1.2);
        let area = cda(mdot, 100.0, 14.7, rho).unwrap();
        let set = set_pressure(area, mdot, rho, 50.0).unwrap();

        let original_dp = (100.0 - 14.7) * PSI_TO_PA;
        assert!(rel_close(set.delta_p_pa, original_dp));
        assert!(rel_close(set.psi, 50.0 + 85.3));

        let again = cda(mdot, set.psi, 50.0, rho).unwrap();
        assert!(rel_close(again, area));
    }

    #[test]
    fn set_pressure_rejects_nonpositive_cda_and_density() {
        assert!(set_pressure(0.0, 0.05, 1.2, 50.0).is_err());
        assert!(set_pressure(1e-5, 0.05, -1.0, 50.0).is_err());
    }

    #[test]
    fn isp_is_thrust_over_weight_flow() {
        let isp = specific_impulse(&[200.0, 0.0], flow(0.4, 0.6)).unwrap();
        assert!(rel_close(isp[0], 200.0));
        assert_eq!(isp[1], 0.0);

        let ve = exhaust_velocity(&isp);
        assert!(rel_close(ve[0], 200.0 * GRAVITY_M_S2));

        assert!(specific_impulse(&[1.0], flow(0.0, 0.0)).is_err());
        assert!(specific_impulse(&[1.0], flow(f64::NAN, 1.0)).is_err());
    }

    #[test]
    fn cstar_formula() {
        let c = characteristic_velocity(&[300.0], flow(0.5, 1.5), 0.01).unwrap();
        let slugs = 2.0 / GRAVITY_FT_S2;
        let expected = 300.0 * 144.0 * 0.01 / slugs * 0.3048;
        assert!(rel_close(c[0], expected));

        assert!(characteristic_velocity(&[300.0], flow(-1.0, 0.5), 0.01).is_err());
        assert!(characteristic_velocity(&[300.0], flow(1.0, 0.5), 0.0).is_err());
    }

    fn lox_venturi() -> VenturiSpec {
        VenturiSpec {
            inlet_area_in2: 1.0,
            throat_area_in2: 0.5,
            cd: 0.95,
            expansion: 1.0,
            density: 1141.0,
        }
    }

    #[test]
    fn venturi_golden_value() {
        let mdot = venturi_mass_flow(&[100.0], &[90.0], &lox_venturi()).unwrap();
        let expected = 0.95
            * 1.0
            * (0.5 * 0.00064516)
            * (2.0_f64 * 1141.0 * (10.0 * 6894.76) / (1.0 - 0.25)).sqrt();
        assert!(rel_close(mdot[0], expected));
        assert!((mdot[0] - 4.4386).abs() < 1e-3, "{}", mdot[0]);
    }

    #[test]
    fn venturi_clamps_reverse_flow_and_missing_samples() {
        let mdot =
            venturi_mass_flow(&[90.0, f64::NAN], &[100.0, 10.0], &lox_venturi()).unwrap();
        assert_eq!(mdot, vec![0.0, 0.0]);
    }

    #[test]
    fn venturi_rejects_bad_geometry() {
        let mut spec = lox_venturi();
        spec.throat_area_in2 = 1.0;
        assert!(venturi_mass_flow(&[1.0], &[0.0], &spec).is_err());

        let mut spec = lox_venturi();
        spec.cd = 1.2;
        assert!(venturi_mass_flow(&[1.0], &[0.0], &spec).is_err());

        let mut spec = lox_venturi();
        spec.cd = 0.0;
        assert!(venturi_mass_flow(&[1.0], &[0.0], &spec).is_err());

        assert!(venturi_mass_flow(&[1.0, 2.0], &[0.0], &lox_venturi()).is_err());
    }

    #[test]
    fn flow_summary_ignores_idle_samples() {
        let s = flow_summary(&[0.0, 1.0, 3.0, 0.0]).unwrap();
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.max, 3.0);
        assert!(flow_summary(&[0.0, 0.0]).is_none());
    }
}
