//! Deterministic yield simulation.

use crate::catalog::{CarbonBalance, Catalog, Catalyst, Kpis, Yields};
use crate::conditions::{parse_modifier, parse_residence_time, parse_temperature};
use crate::material::{resolve, EffectiveMaterial, Feedstock};
use serde::{Deserialize, Serialize};
use studio_core::{CatalystId, HeatSourceId, ModeId};
use tracing::{debug, warn};

/// Drift from 100% tolerated before the gas phase absorbs the difference.
pub const RENORMALIZE_TOLERANCE: f64 = 0.01;

// Yield shift per unit deviation, in percentage points: (gas, liquid, solid).
const TEMPERATURE_SHIFT: (f64, f64, f64) = (0.05, -0.03, -0.02);
const RESIDENCE_SHIFT: (f64, f64, f64) = (5.0, -3.0, -2.0);
const OXYGEN_SHIFT: (f64, f64, f64) = (1.5, -1.0, -0.5);

/// Inputs of one simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationInputs {
    pub feedstock: Feedstock,
    pub mode_id: ModeId,
    pub heat_source_id: HeatSourceId,
    pub catalyst_id: Option<CatalystId>,
    pub temperature_c: f64,
    pub residence_time_s: f64,
    pub oxygen_pct: f64,
}

/// Gas phase composition in volume percent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GasComposition {
    pub h2: f64,
    pub co: f64,
    pub co2: f64,
    pub ch4: f64,
    pub c2_plus: f64,
}

impl GasComposition {
    /// Typical pyrolysis gas; not derived from the run.
    pub fn typical() -> Self {
        Self {
            h2: 20.0,
            co: 35.0,
            co2: 25.0,
            ch4: 15.0,
            c2_plus: 5.0,
        }
    }
}

/// How a [`PlantModel`] was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlantModelBasis {
    /// Fixed figures of a representative plant, independent of the inputs.
    Reference,
}

/// Plant-scale figures reported with a simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlantModel {
    pub basis: PlantModelBasis,
    pub feed_t_per_day: f64,
    pub bio_oil_t_per_day: f64,
    pub biochar_t_per_day: f64,
    pub gas_t_per_day: f64,
    pub operating_days_per_year: u32,
    pub capex_musd: f64,
    pub opex_musd_per_year: f64,
    pub revenue_musd_per_year: f64,
}

impl PlantModel {
    /// A 2000 t/day plant, the scale of a second-generation bioethanol
    /// facility.
    pub fn reference() -> Self {
        Self {
            basis: PlantModelBasis::Reference,
            feed_t_per_day: 2000.0,
            bio_oil_t_per_day: 1200.0,
            biochar_t_per_day: 300.0,
            gas_t_per_day: 500.0,
            operating_days_per_year: 350,
            capex_musd: 380.0,
            opex_musd_per_year: 60.0,
            revenue_musd_per_year: 150.0,
        }
    }
}

/// Outcome of a run. All optional fields are `None` when the inputs could
/// not be resolved against the catalog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub material: Option<EffectiveMaterial>,
    pub yields: Option<Yields>,
    pub kpis: Option<Kpis>,
    pub carbon_balance: Option<CarbonBalance>,
    pub gas_composition: Option<GasComposition>,
    pub plant_model: Option<PlantModel>,
    pub analysis: Option<String>,
    pub insights: Vec<String>,
}

impl SimulationResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }
}

fn shift(y: &mut Yields, (gas, liquid, solid): (f64, f64, f64), delta: f64) {
    y.gas += gas * delta;
    y.liquid += liquid * delta;
    y.solid += solid * delta;
}

fn apply_catalyst(y: &mut Yields, c: &Catalyst, insights: &mut Vec<String>) {
    y.liquid += parse_modifier(&c.yield_modifiers.liquid);
    y.solid += parse_modifier(&c.yield_modifiers.solid);
    y.gas += parse_modifier(&c.yield_modifiers.gas);
    insights.push(format!("{}: {}", c.name, c.liquid_quality));
    insights.push(format!("{}: {}", c.name, c.gas_quality));
}

/// Scale to 100%, let gas absorb residual drift, then clear negative
/// phases and rescale once more if that changed the total. A non-positive
/// total skips the first scaling so signs are never flipped.
fn renormalize(y: &mut Yields) {
    let total = y.total();
    if total > 0.0 && total.is_finite() {
        let k = 100.0 / total;
        y.components_mut().for_each(|v| *v *= k);
        let drift = 100.0 - y.total();
        if drift.abs() > RENORMALIZE_TOLERANCE {
            y.gas += drift;
        }
    }
    let mut clamped = false;
    for v in y.components_mut() {
        if *v < 0.0 {
            *v = 0.0;
            clamped = true;
        }
    }
    if clamped {
        let total = y.total();
        if total > 0.0 {
            let k = 100.0 / total;
            y.components_mut().for_each(|v| *v *= k);
        }
    }
}

/// Run one simulation. Never panics: unresolved references and invalid
/// inputs produce [`SimulationResult::empty`].
pub fn simulate(catalog: &Catalog, inputs: &SimulationInputs) -> SimulationResult {
    let Some(mode) = catalog.mode(&inputs.mode_id) else {
        warn!(mode = %inputs.mode_id, "unknown process mode");
        return SimulationResult::empty();
    };
    let Some(heat) = catalog.heat_source(&inputs.heat_source_id) else {
        warn!(heat_source = %inputs.heat_source_id, "unknown heat source");
        return SimulationResult::empty();
    };
    let catalyst = match &inputs.catalyst_id {
        Some(id) => match catalog.catalyst(id) {
            Some(c) => Some(c),
            None => {
                warn!(catalyst = %id, "unknown catalyst");
                return SimulationResult::empty();
            }
        },
        None => None,
    };
    if !(inputs.temperature_c.is_finite()
        && inputs.residence_time_s.is_finite()
        && inputs.oxygen_pct.is_finite())
    {
        warn!("non-finite process variables");
        return SimulationResult::empty();
    }
    let Some(material) = resolve(catalog, &inputs.feedstock) else {
        return SimulationResult::empty();
    };

    let mut insights = Vec::new();
    let mut y = mode.base_yield.clone();

    let ideal_temp = parse_temperature(&mode.temperature_c);
    let d_temp = inputs.temperature_c - ideal_temp;
    shift(&mut y, TEMPERATURE_SHIFT, d_temp);
    if d_temp.abs() > 50.0 {
        insights.push(format!(
            "Operating {:.0} °C {} the nominal {:.0} °C of {}: {}.",
            d_temp.abs(),
            if d_temp > 0.0 { "above" } else { "below" },
            ideal_temp,
            mode.name,
            if d_temp > 0.0 {
                "secondary cracking converts vapours into permanent gas"
            } else {
                "incomplete devolatilization leaves more char"
            }
        ));
    }

    let ideal_time = parse_residence_time(&mode.residence_time);
    let d_time = inputs.residence_time_s.max(1.0).log10() - ideal_time.log10();
    shift(&mut y, RESIDENCE_SHIFT, d_time);

    if inputs.oxygen_pct > 0.0 {
        shift(&mut y, OXYGEN_SHIFT, inputs.oxygen_pct);
        insights.push(format!(
            "{:.1}% oxygen in the reactor shifts the products toward gasification: partial oxidation raises gas yield at the expense of bio-oil and char.",
            inputs.oxygen_pct
        ));
    }

    if let Some(c) = catalyst {
        apply_catalyst(&mut y, c, &mut insights);
    }

    renormalize(&mut y);
    debug!(
        mode = %mode.id,
        material = %material.name,
        liquid = y.liquid,
        solid = y.solid,
        gas = y.gas,
        "simulation finished"
    );

    SimulationResult {
        material: Some(material),
        yields: Some(y),
        kpis: Some(heat.kpis.clone()),
        carbon_balance: Some(heat.carbon_balance.clone()),
        gas_composition: Some(GasComposition::typical()),
        plant_model: Some(PlantModel::reference()),
        analysis: Some(heat.analysis.clone()),
        insights,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogDocument, YieldModifiers};
    use proptest::prelude::*;
    use studio_core::{Composition, Mixture};

    fn inputs(mode: &str, catalyst: Option<&str>, t: f64, time: f64, o2: f64) -> SimulationInputs {
        SimulationInputs {
            feedstock: Feedstock::Simple(Composition::default()),
            mode_id: ModeId::new(mode),
            heat_source_id: HeatSourceId::new("solar_concentrada"),
            catalyst_id: catalyst.map(CatalystId::new),
            temperature_c: t,
            residence_time_s: time,
            oxygen_pct: o2,
        }
    }

    fn assert_normalized(y: &Yields) {
        assert!((y.total() - 100.0).abs() < RENORMALIZE_TOLERANCE, "{y:?}");
        assert!(y.liquid >= 0.0 && y.solid >= 0.0 && y.gas >= 0.0);
    }

    #[test]
    fn nominal_conditions_reproduce_base_yields() {
        let cat = Catalog::builtin();
        let r = simulate(&cat, &inputs("rapida", None, 500.0, 1.5, 0.0));
        let y = r.yields.unwrap();
        assert!((y.liquid - 75.0).abs() < 1e-9);
        assert!((y.solid - 12.0).abs() < 1e-9);
        assert!((y.gas - 13.0).abs() < 1e-9);
        assert!(r.insights.is_empty());
        assert_eq!(r.plant_model.unwrap().basis, PlantModelBasis::Reference);
        let heat = cat.heat_source(&HeatSourceId::new("solar_concentrada")).unwrap();
        assert_eq!(r.kpis.as_ref(), Some(&heat.kpis));
        assert_eq!(r.analysis.as_deref(), Some(heat.analysis.as_str()));
    }

    #[test]
    fn hotter_and_longer_favours_gas() {
        let cat = Catalog::builtin();
        // +100 °C: gas +5, liquid -3, solid -2.
        let y = simulate(&cat, &inputs("rapida", None, 600.0, 1.5, 0.0))
            .yields
            .unwrap();
        assert!((y.gas - 18.0).abs() < 1e-9);
        assert!((y.liquid - 72.0).abs() < 1e-9);
        assert!((y.solid - 10.0).abs() < 1e-9);
        // One decade longer residence: gas +5.
        let y = simulate(&cat, &inputs("rapida", None, 500.0, 15.0, 0.0))
            .yields
            .unwrap();
        assert!((y.gas - 18.0).abs() < 1e-9);
    }

    #[test]
    fn oxygen_adds_gasification_insight() {
        let cat = Catalog::builtin();
        let r = simulate(&cat, &inputs("rapida", None, 500.0, 1.5, 4.0));
        let y = r.yields.unwrap();
        assert!((y.gas - 19.0).abs() < 1e-9);
        assert!((y.liquid - 71.0).abs() < 1e-9);
        assert!((y.solid - 10.0).abs() < 1e-9);
        assert_eq!(r.insights.len(), 1);
        assert!(r.insights[0].contains("gasification"));
    }

    #[test]
    fn catalyst_modifiers_and_quality_notes() {
        let cat = Catalog::builtin();
        let plain = simulate(&cat, &inputs("intermedia", None, 450.0, 180.0, 0.0));
        let fcc = simulate(&cat, &inputs("intermedia", Some("fcc_usado"), 450.0, 180.0, 0.0));
        let (p, f) = (plain.yields.unwrap(), fcc.yields.unwrap());
        assert!(f.liquid > p.liquid);
        assert!(f.gas < p.gas);
        assert_normalized(&f);
        assert_eq!(fcc.insights.len(), 2);
        assert!(fcc.insights[0].starts_with("Catalizador FCC usado"));
    }

    #[test]
    fn wax_follows_the_mode_for_any_feedstock() {
        let cat = Catalog::builtin();
        let mut i = inputs("plasticos", None, 450.0, 180.0, 0.0);
        let y = simulate(&cat, &i).yields.unwrap();
        assert_eq!(y.wax, Some(25.0));
        assert!((y.liquid - 55.0).abs() < 1e-9);
        assert_normalized(&y);

        i.feedstock = Feedstock::Advanced(Mixture::new([("polietileno", 100.0)]).unwrap());
        let y = simulate(&cat, &i).yields.unwrap();
        assert!((y.wax.unwrap() - 25.0).abs() < 1e-9);
        assert_normalized(&y);

        let y = simulate(&cat, &inputs("rapida", None, 500.0, 1.5, 0.0))
            .yields
            .unwrap();
        assert_eq!(y.wax, None);
    }

    #[test]
    fn negative_total_does_not_flip_signs() {
        let builtin = Catalog::builtin();
        let mut doc = CatalogDocument {
            modes: builtin.modes().cloned().collect(),
            heat_sources: builtin.heat_sources().cloned().collect(),
            catalysts: builtin.catalysts().cloned().collect(),
            materials: builtin.materials().cloned().collect(),
        };
        doc.catalysts.push(Catalyst {
            id: CatalystId::new("veneno"),
            name: "Veneno".into(),
            yield_modifiers: YieldModifiers {
                liquid: "-300%".into(),
                solid: String::new(),
                gas: String::new(),
            },
            liquid_quality: "none".into(),
            gas_quality: "none".into(),
        });
        let cat = Catalog::from_document(doc).unwrap();
        // 75/12/13 with liquid -300 sums to -200; liquid clears, the rest rescale.
        let y = simulate(&cat, &inputs("rapida", Some("veneno"), 500.0, 1.5, 0.0))
            .yields
            .unwrap();
        assert_eq!(y.liquid, 0.0);
        assert!((y.solid - 48.0).abs() < 1e-9);
        assert!((y.gas - 52.0).abs() < 1e-9);
        assert_normalized(&y);
    }

    #[test]
    fn heavy_oxygen_clamps_negative_phases() {
        let cat = Catalog::builtin();
        let y = simulate(&cat, &inputs("torrefaccion", None, 250.0, 2700.0, 21.0))
            .yields
            .unwrap();
        assert_eq!(y.liquid, 0.0);
        assert_normalized(&y);
    }

    #[test]
    fn unknown_references_give_empty_result() {
        let cat = Catalog::builtin();
        let r = simulate(&cat, &inputs("no_such_mode", None, 500.0, 1.5, 0.0));
        assert!(r.is_empty());
        assert_eq!(r.yields, None);
        assert!(r.insights.is_empty());

        let mut i = inputs("rapida", None, 500.0, 1.5, 0.0);
        i.heat_source_id = HeatSourceId::new("fusion");
        assert!(simulate(&cat, &i).is_empty());

        assert!(simulate(&cat, &inputs("rapida", Some("magia"), 500.0, 1.5, 0.0)).is_empty());

        let mut i = inputs("rapida", None, 500.0, 1.5, 0.0);
        i.feedstock = Feedstock::Advanced(Mixture::new([("unobtainium", 10.0)]).unwrap());
        assert!(simulate(&cat, &i).is_empty());

        assert!(simulate(&cat, &inputs("rapida", None, f64::NAN, 1.5, 0.0)).is_empty());
    }

    #[test]
    fn empty_result_serializes_nulls() {
        let v = serde_json::to_value(SimulationResult::empty()).unwrap();
        assert!(v["yields"].is_null());
        assert!(v["material"].is_null());
        assert_eq!(v["insights"], serde_json::json!([]));
    }

    proptest! {
        #[test]
        fn yields_always_sum_to_100(mode in 0usize..5,
                                    catalyst in 0usize..5,
                                    t in 150.0f64..950.0,
                                    time in 0.0f64..20_000.0,
                                    o2 in 0.0f64..21.0) {
            let modes = ["lenta", "intermedia", "rapida", "torrefaccion", "plasticos"];
            let catalysts = [None, Some("zsm5"), Some("dolomita"), Some("ni_alumina"), Some("fcc_usado")];
            let r = simulate(&Catalog::builtin(), &inputs(modes[mode], catalysts[catalyst], t, time, o2));
            let y = r.yields.unwrap();
            prop_assert!((y.total() - 100.0).abs() < RENORMALIZE_TOLERANCE);
            prop_assert!(y.liquid >= 0.0 && y.solid >= 0.0 && y.gas >= 0.0);
            prop_assert!(y.wax.unwrap_or(0.0) >= 0.0);
        }

        #[test]
        fn plastic_blends_sum_to_100_with_wax(mode in 0usize..5,
                                              catalyst in 0usize..5,
                                              pe in 1.0f64..60.0,
                                              pp in 0.0f64..30.0,
                                              pino in 0.0f64..10.0,
                                              t in 150.0f64..950.0,
                                              time in 0.0f64..20_000.0,
                                              o2 in 0.0f64..21.0) {
            let modes = ["lenta", "intermedia", "rapida", "torrefaccion", "plasticos"];
            let catalysts = [None, Some("zsm5"), Some("dolomita"), Some("ni_alumina"), Some("fcc_usado")];
            let mut i = inputs(modes[mode], catalysts[catalyst], t, time, o2);
            let mix = Mixture::new([("polietileno", pe), ("polipropileno", pp), ("pino", pino)]).unwrap();
            i.feedstock = Feedstock::Advanced(mix);
            let y = simulate(&Catalog::builtin(), &i).yields.unwrap();
            prop_assert!((y.total() - 100.0).abs() < RENORMALIZE_TOLERANCE);
            prop_assert!(y.liquid >= 0.0 && y.solid >= 0.0 && y.gas >= 0.0);
            prop_assert_eq!(y.wax.is_some(), modes[mode] == "plasticos");
            prop_assert!(y.wax.unwrap_or(0.0) >= 0.0);
        }
    }
}
