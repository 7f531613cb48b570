// Property Tests - impact and orbit calculators
// Invariants the casualty rings and orbit visualisation rely on across the input space

use approx::assert_relative_eq;
use proptest::prelude::*;

use crate::impact_physics::{
    calculate_atmospheric_effects, calculate_crater_size, calculate_impact_energy,
    calculate_seismic_effects, ImpactEnergy, ImpactParameters, TNT_JOULES,
};
use crate::orbital_mechanics::{
    generate_orbit_path, perifocal_position, solve_kepler_equation, OrbitData,
};
use crate::population::{calculate_casualties, PopulationData};

fn energy_mt(megatons: f64) -> ImpactEnergy {
    ImpactEnergy {
        joules: megatons * TNT_JOULES * 1000.0,
        megatons_tnt: megatons,
    }
}

#[test]
fn test_energy_fixture_matches_crate_conversion() {
    let params = ImpactParameters::new(500.0, 3000.0, 20.0, 45.0, 0.0, 0.0);
    let computed = calculate_impact_energy(&params);
    let fixture = energy_mt(computed.megatons_tnt);

    assert_relative_eq!(fixture.joules, computed.joules, max_relative = 1e-12);
    assert_relative_eq!(
        calculate_seismic_effects(&fixture).magnitude,
        calculate_seismic_effects(&computed).magnitude,
        max_relative = 1e-9
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_energy_monotonic(
        size in 1.0f64..2000.0,
        density in 500.0f64..8000.0,
        velocity in 5.0f64..70.0,
        bump in 1.01f64..2.0,
    ) {
        let base = ImpactParameters::new(size, density, velocity, 45.0, 0.0, 0.0);
        let e0 = calculate_impact_energy(&base).joules;

        let mut p = base.clone();
        p.size *= bump;
        prop_assert!(calculate_impact_energy(&p).joules > e0);

        let mut p = base.clone();
        p.density *= bump;
        prop_assert!(calculate_impact_energy(&p).joules > e0);

        let mut p = base;
        p.velocity *= bump;
        prop_assert!(calculate_impact_energy(&p).joules > e0);
    }

    /// Thermal >= overpressure >= fireball, so the casualty annuli never go negative.
    #[test]
    fn prop_atmospheric_rings_nested(log_mt in -6.0f64..9.0) {
        let effects = calculate_atmospheric_effects(&energy_mt(10f64.powf(log_mt)));

        prop_assert!(effects.fireball_radius > 0.0);
        prop_assert!(effects.overpressure >= effects.fireball_radius);
        prop_assert!(effects.thermal_radiation >= effects.overpressure);
    }

    #[test]
    fn prop_effects_finite_and_bounded(log_mt in -9.0f64..12.0, is_water: bool) {
        let energy = energy_mt(10f64.powf(log_mt));

        let crater = calculate_crater_size(&energy, is_water);
        prop_assert!(crater.diameter.is_finite() && crater.diameter >= 0.0);

        let seismic = calculate_seismic_effects(&energy);
        prop_assert!((0.0..=12.0).contains(&seismic.magnitude));
        prop_assert!((0.0..=1500.0).contains(&seismic.radius));
    }

    #[test]
    fn prop_casualties_never_exceed_affected(
        density in 0.0f64..50_000.0,
        fireball in 0.0f64..50.0,
        overpressure_extra in 0.0f64..200.0,
        thermal_extra in 0.0f64..500.0,
    ) {
        let population = PopulationData {
            density,
            ..PopulationData::global_default()
        };
        let overpressure = fireball + overpressure_extra;
        let thermal = overpressure + thermal_extra;

        let c = calculate_casualties(&population, fireball, overpressure, thermal);
        prop_assert!(c.estimated <= c.affected_population);

        let zone_sum = c.breakdown.fireball + c.breakdown.overpressure + c.breakdown.thermal;
        prop_assert!(zone_sum.abs_diff(c.estimated) <= 2);
    }

    #[test]
    fn prop_kepler_residual_small(m in 0.0f64..std::f64::consts::TAU, e in 0.0f64..0.999) {
        let ecc = solve_kepler_equation(m, e).unwrap();
        let residual = ecc - e * ecc.sin() - m;
        // residual modulo a full turn
        let wrapped = residual.rem_euclid(std::f64::consts::TAU);
        prop_assert!(wrapped < 1e-5 || wrapped > std::f64::consts::TAU - 1e-5);
    }

    #[test]
    fn prop_circular_orbit_radius_is_a(a in 0.3f64..40.0, mean_anomaly in 0.0f64..360.0) {
        let orbit = OrbitData::new(a, 0.0, 0.0, 0.0, 0.0, mean_anomaly);
        let (x, y) = perifocal_position(&orbit).unwrap();
        prop_assert!(((x * x + y * y).sqrt() - a).abs() < 1e-9 * a.max(1.0));
    }

    #[test]
    fn prop_orbit_path_closes(
        a in 0.5f64..5.0,
        e in 0.0f64..0.99,
        i in 0.0f64..180.0,
        omega in 0.0f64..360.0,
        node in 0.0f64..360.0,
        n in 1usize..256,
    ) {
        let orbit = OrbitData::new(a, e, i, omega, node, 0.0);
        let path = generate_orbit_path(&orbit, n).unwrap();

        prop_assert_eq!(path.len(), n + 1);
        prop_assert!(path[0].distance_to(&path[n]) < 1e-6);
    }
}
