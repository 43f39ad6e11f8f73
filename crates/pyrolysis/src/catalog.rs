//! Static reference tables: process modes, heat sources, catalysts and
//! feedstock materials.

use crate::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use studio_core::{CatalystId, HeatSourceId, MaterialId, ModeId};

const YIELD_SUM_TOLERANCE: f64 = 1e-6;

/// Product distribution in mass percent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Yields {
    #[serde(rename = "liquido")]
    pub liquid: f64,
    #[serde(rename = "solido")]
    pub solid: f64,
    pub gas: f64,
    /// Only reported for plastic feedstocks.
    #[serde(rename = "ceras", default, skip_serializing_if = "Option::is_none")]
    pub wax: Option<f64>,
}

impl Yields {
    pub fn new(liquid: f64, solid: f64, gas: f64) -> Self {
        Self {
            liquid,
            solid,
            gas,
            wax: None,
        }
    }

    pub fn total(&self) -> f64 {
        self.liquid + self.solid + self.gas + self.wax.unwrap_or(0.0)
    }

    pub(crate) fn components_mut(&mut self) -> impl Iterator<Item = &mut f64> {
        [&mut self.liquid, &mut self.solid, &mut self.gas]
            .into_iter()
            .chain(self.wax.as_mut())
    }
}

/// Preset bundle of process conditions with its typical yields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessMode {
    pub id: ModeId,
    pub name: String,
    /// Nominal temperature range, e.g. "450-550".
    pub temperature_c: String,
    pub heating_rate: String,
    /// Qualitative residence time, e.g. "< 2 s" or "horas".
    pub residence_time: String,
    pub base_yield: Yields,
}

/// Precomputed performance indicators of a heat source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    /// USD per tonne of bio-oil.
    pub cost_per_unit_bio_oil: f64,
    /// Percent of feedstock carbon retained in products.
    pub carbon_efficiency: f64,
    /// Percent of input energy recovered in products.
    pub energy_efficiency: f64,
    /// kg CO2-eq per tonne of feedstock (negative means net removal).
    pub net_emissions: f64,
}

/// Fate of feedstock carbon, in percent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarbonBalance {
    pub in_bio_oil: f64,
    pub in_biochar: f64,
    pub in_gas: f64,
    pub emitted: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeatSource {
    pub id: HeatSourceId,
    pub name: String,
    pub kpis: Kpis,
    pub carbon_balance: CarbonBalance,
    /// Pre-authored analysis text shown with the results.
    pub analysis: String,
}

/// Signed percentage deltas per phase, as authored ("+8%").
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct YieldModifiers {
    #[serde(default)]
    pub liquid: String,
    #[serde(default)]
    pub solid: String,
    #[serde(default)]
    pub gas: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Catalyst {
    pub id: CatalystId,
    pub name: String,
    pub yield_modifiers: YieldModifiers,
    pub liquid_quality: String,
    pub gas_quality: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialCategory {
    Biomass,
    Plastic,
    Residue,
}

/// Ultimate analysis, mass percent on a dry basis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementalAnalysis {
    pub carbon: f64,
    pub hydrogen: f64,
    pub oxygen: f64,
    pub nitrogen: f64,
    pub sulfur: f64,
}

/// Proximate analysis, mass percent as received.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProximateAnalysis {
    pub moisture: f64,
    pub volatile_matter: f64,
    pub fixed_carbon: f64,
    pub ash: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialProperties {
    pub elemental: ElementalAnalysis,
    pub proximate: ProximateAnalysis,
    /// Higher heating value, MJ/kg.
    pub hhv_mj_per_kg: f64,
}

impl MaterialProperties {
    /// Weighted average of several property blocks. Weights should sum to 1.
    pub fn weighted<'a, I>(parts: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a MaterialProperties, f64)>,
    {
        let mut acc: Option<MaterialProperties> = None;
        for (p, w) in parts {
            let scaled = p.scaled(w);
            acc = Some(match acc {
                None => scaled,
                Some(a) => a.plus(&scaled),
            });
        }
        acc
    }

    fn scaled(&self, w: f64) -> Self {
        let e = &self.elemental;
        let x = &self.proximate;
        Self {
            elemental: ElementalAnalysis {
                carbon: e.carbon * w,
                hydrogen: e.hydrogen * w,
                oxygen: e.oxygen * w,
                nitrogen: e.nitrogen * w,
                sulfur: e.sulfur * w,
            },
            proximate: ProximateAnalysis {
                moisture: x.moisture * w,
                volatile_matter: x.volatile_matter * w,
                fixed_carbon: x.fixed_carbon * w,
                ash: x.ash * w,
            },
            hhv_mj_per_kg: self.hhv_mj_per_kg * w,
        }
    }

    fn plus(&self, o: &Self) -> Self {
        let (e, f) = (&self.elemental, &o.elemental);
        let (x, y) = (&self.proximate, &o.proximate);
        Self {
            elemental: ElementalAnalysis {
                carbon: e.carbon + f.carbon,
                hydrogen: e.hydrogen + f.hydrogen,
                oxygen: e.oxygen + f.oxygen,
                nitrogen: e.nitrogen + f.nitrogen,
                sulfur: e.sulfur + f.sulfur,
            },
            proximate: ProximateAnalysis {
                moisture: x.moisture + y.moisture,
                volatile_matter: x.volatile_matter + y.volatile_matter,
                fixed_carbon: x.fixed_carbon + y.fixed_carbon,
                ash: x.ash + y.ash,
            },
            hhv_mj_per_kg: self.hhv_mj_per_kg + o.hhv_mj_per_kg,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    pub category: MaterialCategory,
    pub properties: MaterialProperties,
}

/// Serialized form of a catalog, as stored in YAML.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub modes: Vec<ProcessMode>,
    #[serde(default)]
    pub heat_sources: Vec<HeatSource>,
    #[serde(default)]
    pub catalysts: Vec<Catalyst>,
    #[serde(default)]
    pub materials: Vec<Material>,
}

/// Immutable lookup tables keyed by id.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    modes: BTreeMap<ModeId, ProcessMode>,
    heat_sources: BTreeMap<HeatSourceId, HeatSource>,
    catalysts: BTreeMap<CatalystId, Catalyst>,
    materials: BTreeMap<MaterialId, Material>,
}

fn index<K: Ord + Clone + ToString, V>(
    items: Vec<V>,
    key: impl Fn(&V) -> &K,
) -> Result<BTreeMap<K, V>, CatalogError> {
    let mut map = BTreeMap::new();
    for item in items {
        let k = key(&item).clone();
        if map.contains_key(&k) {
            return Err(CatalogError::DuplicateId(k.to_string()));
        }
        map.insert(k, item);
    }
    Ok(map)
}

impl Catalog {
    /// Build a catalog, checking id uniqueness and that every mode's base
    /// yields add up to 100.
    pub fn from_document(doc: CatalogDocument) -> Result<Self, CatalogError> {
        for m in &doc.modes {
            let total = m.base_yield.total();
            if !total.is_finite() || (total - 100.0).abs() > YIELD_SUM_TOLERANCE {
                return Err(CatalogError::YieldSum {
                    mode: m.id.to_string(),
                    total,
                });
            }
        }
        Ok(Self {
            modes: index(doc.modes, |m| &m.id)?,
            heat_sources: index(doc.heat_sources, |h| &h.id)?,
            catalysts: index(doc.catalysts, |c| &c.id)?,
            materials: index(doc.materials, |m| &m.id)?,
        })
    }

    /// Parse a YAML catalog document.
    pub fn from_yaml_str(text: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument =
            serde_yaml::from_str(text).map_err(|e| CatalogError::Yaml(e.to_string()))?;
        Self::from_document(doc)
    }

    pub fn mode(&self, id: &ModeId) -> Option<&ProcessMode> {
        self.modes.get(id)
    }

    pub fn heat_source(&self, id: &HeatSourceId) -> Option<&HeatSource> {
        self.heat_sources.get(id)
    }

    pub fn catalyst(&self, id: &CatalystId) -> Option<&Catalyst> {
        self.catalysts.get(id)
    }

    pub fn material(&self, id: &MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn modes(&self) -> impl Iterator<Item = &ProcessMode> {
        self.modes.values()
    }

    pub fn heat_sources(&self) -> impl Iterator<Item = &HeatSource> {
        self.heat_sources.values()
    }

    pub fn catalysts(&self) -> impl Iterator<Item = &Catalyst> {
        self.catalysts.values()
    }

    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.materials.values()
    }

    /// Built-in reference tables.
    pub fn builtin() -> Self {
        let doc = CatalogDocument {
            modes: builtin_modes(),
            heat_sources: builtin_heat_sources(),
            catalysts: builtin_catalysts(),
            materials: builtin_materials(),
        };
        Self {
            modes: doc.modes.into_iter().map(|m| (m.id.clone(), m)).collect(),
            heat_sources: doc
                .heat_sources
                .into_iter()
                .map(|h| (h.id.clone(), h))
                .collect(),
            catalysts: doc
                .catalysts
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
            materials: doc
                .materials
                .into_iter()
                .map(|m| (m.id.clone(), m))
                .collect(),
        }
    }
}

fn mode(
    id: &str,
    name: &str,
    temp: &str,
    rate: &str,
    time: &str,
    base_yield: Yields,
) -> ProcessMode {
    ProcessMode {
        id: ModeId::new(id),
        name: name.to_string(),
        temperature_c: temp.to_string(),
        heating_rate: rate.to_string(),
        residence_time: time.to_string(),
        base_yield,
    }
}

fn builtin_modes() -> Vec<ProcessMode> {
    vec![
        mode(
            "lenta",
            "Pirólisis lenta",
            "300-450",
            "0.1-1 °C/s",
            "horas",
            Yields::new(30.0, 35.0, 35.0),
        ),
        mode(
            "intermedia",
            "Pirólisis intermedia",
            "400-500",
            "1-10 °C/s",
            "segundos a minutos",
            Yields::new(50.0, 25.0, 25.0),
        ),
        mode(
            "rapida",
            "Pirólisis rápida",
            "450-550",
            "10-200 °C/s",
            "< 2 s",
            Yields::new(75.0, 12.0, 13.0),
        ),
        mode(
            "torrefaccion",
            "Torrefacción",
            "200-300",
            "< 50 °C/min",
            "30-60 min",
            Yields::new(5.0, 80.0, 15.0),
        ),
        mode(
            "plasticos",
            "Pirólisis de plásticos",
            "425-475",
            "5-20 °C/s",
            "segundos a minutos",
            Yields {
                liquid: 55.0,
                solid: 5.0,
                gas: 15.0,
                wax: Some(25.0),
            },
        ),
    ]
}

fn heat_source(
    id: &str,
    name: &str,
    kpis: [f64; 4],
    balance: [f64; 4],
    analysis: &str,
) -> HeatSource {
    HeatSource {
        id: HeatSourceId::new(id),
        name: name.to_string(),
        kpis: Kpis {
            cost_per_unit_bio_oil: kpis[0],
            carbon_efficiency: kpis[1],
            energy_efficiency: kpis[2],
            net_emissions: kpis[3],
        },
        carbon_balance: CarbonBalance {
            in_bio_oil: balance[0],
            in_biochar: balance[1],
            in_gas: balance[2],
            emitted: balance[3],
        },
        analysis: analysis.to_string(),
    }
}

fn builtin_heat_sources() -> Vec<HeatSource> {
    vec![
        heat_source(
            "gas_natural",
            "Gas natural",
            [420.0, 68.0, 62.0, 310.0],
            [48.0, 24.0, 10.0, 18.0],
            "Fossil heat keeps operating costs low and stable but adds direct process emissions; the biochar credit only partly offsets them.",
        ),
        heat_source(
            "electrica_renovable",
            "Electricidad renovable",
            [510.0, 74.0, 70.0, -180.0],
            [52.0, 26.0, 12.0, 10.0],
            "Resistive heating from renewable power removes combustion emissions; the economics hinge on the electricity tariff.",
        ),
        heat_source(
            "solar_concentrada",
            "Solar concentrada",
            [560.0, 79.0, 58.0, -240.0],
            [55.0, 27.0, 12.0, 6.0],
            "Concentrated solar heat gives the best carbon balance but needs thermal storage or hybrid backup to run around the clock.",
        ),
        heat_source(
            "autotermico",
            "Combustión de gas y carbón propios",
            [380.0, 60.0, 65.0, 40.0],
            [45.0, 18.0, 4.0, 33.0],
            "Burning the non-condensable gas and part of the char makes the plant energy self-sufficient at the cost of lower carbon retention.",
        ),
    ]
}

fn catalyst(
    id: &str,
    name: &str,
    mods: [&str; 3],
    liquid_quality: &str,
    gas_quality: &str,
) -> Catalyst {
    Catalyst {
        id: CatalystId::new(id),
        name: name.to_string(),
        yield_modifiers: YieldModifiers {
            liquid: mods[0].to_string(),
            solid: mods[1].to_string(),
            gas: mods[2].to_string(),
        },
        liquid_quality: liquid_quality.to_string(),
        gas_quality: gas_quality.to_string(),
    }
}

fn builtin_catalysts() -> Vec<Catalyst> {
    vec![
        catalyst(
            "zsm5",
            "Zeolita HZSM-5",
            ["-6%", "+2%", "+4%"],
            "Deoxygenated bio-oil rich in aromatics, with lower acidity and higher heating value.",
            "More light olefins and CO, less CO2 per tonne of feed.",
        ),
        catalyst(
            "dolomita",
            "Dolomita calcinada",
            ["-3%", "+1%", "+2%"],
            "Cracks heavy tars, giving a less viscous oil.",
            "Higher H2/CO ratio from tar reforming.",
        ),
        catalyst(
            "ni_alumina",
            "Níquel sobre alúmina",
            ["-10%", "-2%", "+12%"],
            "Residual oil is light but scarce.",
            "Hydrogen-rich syngas suited to synthesis or fuel cells.",
        ),
        catalyst(
            "fcc_usado",
            "Catalizador FCC usado",
            ["+6%", "-1%", "-5%"],
            "Narrower carbon range in the oil, closer to gasoline and diesel cuts.",
            "Less methane, slightly more C3-C4 hydrocarbons.",
        ),
    ]
}

fn material(
    id: &str,
    name: &str,
    category: MaterialCategory,
    chons: [f64; 5],
    proximate: [f64; 4],
    hhv: f64,
) -> Material {
    Material {
        id: MaterialId::new(id),
        name: name.to_string(),
        category,
        properties: MaterialProperties {
            elemental: ElementalAnalysis {
                carbon: chons[0],
                hydrogen: chons[1],
                oxygen: chons[2],
                nitrogen: chons[3],
                sulfur: chons[4],
            },
            proximate: ProximateAnalysis {
                moisture: proximate[0],
                volatile_matter: proximate[1],
                fixed_carbon: proximate[2],
                ash: proximate[3],
            },
            hhv_mj_per_kg: hhv,
        },
    }
}

fn builtin_materials() -> Vec<Material> {
    use MaterialCategory::*;
    vec![
        material(
            "pino",
            "Madera de pino",
            Biomass,
            [50.5, 6.1, 42.9, 0.3, 0.02],
            [8.0, 77.5, 14.2, 0.3],
            20.2,
        ),
        material(
            "bagazo",
            "Bagazo de caña",
            Biomass,
            [47.2, 6.0, 44.1, 0.4, 0.05],
            [10.0, 73.8, 13.2, 3.0],
            18.6,
        ),
        material(
            "cascara_arroz",
            "Cáscara de arroz",
            Residue,
            [38.9, 5.1, 35.6, 0.5, 0.06],
            [9.0, 56.0, 15.0, 20.0],
            15.3,
        ),
        material(
            "polietileno",
            "Polietileno (PE)",
            Plastic,
            [85.7, 14.3, 0.0, 0.0, 0.0],
            [0.1, 99.5, 0.2, 0.2],
            46.3,
        ),
        material(
            "polipropileno",
            "Polipropileno (PP)",
            Plastic,
            [85.6, 14.2, 0.1, 0.0, 0.1],
            [0.2, 99.2, 0.3, 0.3],
            46.0,
        ),
        material(
            "neumatico",
            "Neumático fuera de uso",
            Residue,
            [83.0, 7.0, 2.5, 0.4, 1.6],
            [1.0, 62.0, 29.0, 8.0],
            37.0,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_is_consistent() {
        let cat = Catalog::builtin();
        for m in cat.modes() {
            assert!((m.base_yield.total() - 100.0).abs() < YIELD_SUM_TOLERANCE, "{}", m.id);
        }
        for h in cat.heat_sources() {
            let b = &h.carbon_balance;
            assert!((b.in_bio_oil + b.in_biochar + b.in_gas + b.emitted - 100.0).abs() < 1e-9);
        }
        assert!(cat.mode(&ModeId::new("rapida")).is_some());
        assert!(cat.catalyst(&CatalystId::new("zsm5")).is_some());
        assert!(cat.material(&MaterialId::new("nope")).is_none());
        // Round-trips through the document validator.
        let doc = CatalogDocument {
            modes: cat.modes().cloned().collect(),
            heat_sources: cat.heat_sources().cloned().collect(),
            catalysts: cat.catalysts().cloned().collect(),
            materials: cat.materials().cloned().collect(),
        };
        assert!(Catalog::from_document(doc).is_ok());
    }

    #[test]
    fn yaml_catalog_loads() {
        let text = r#"
modes:
  - id: demo
    name: Demo
    temperature_c: "400-500"
    heating_rate: "1 °C/s"
    residence_time: "< 2 s"
    base_yield: { liquido: 60, solido: 20, gas: 20 }
heat_sources:
  - id: calor
    name: Calor
    kpis: { cost_per_unit_bio_oil: 1, carbon_efficiency: 2, energy_efficiency: 3, net_emissions: 4 }
    carbon_balance: { in_bio_oil: 50, in_biochar: 30, in_gas: 10, emitted: 10 }
    analysis: ok
"#;
        let cat = Catalog::from_yaml_str(text).unwrap();
        let m = cat.mode(&ModeId::new("demo")).unwrap();
        assert_eq!(m.base_yield.liquid, 60.0);
        assert_eq!(m.base_yield.wax, None);
        assert_eq!(cat.catalysts().count(), 0);
    }

    #[test]
    fn yaml_rejects_bad_yields_and_duplicates() {
        let bad = r#"
modes:
  - id: demo
    name: Demo
    temperature_c: "400"
    heating_rate: ""
    residence_time: ""
    base_yield: { liquido: 60, solido: 20, gas: 30 }
"#;
        assert!(matches!(
            Catalog::from_yaml_str(bad),
            Err(CatalogError::YieldSum { .. })
        ));
        let dup = r#"
catalysts:
  - { id: a, name: A, yield_modifiers: {}, liquid_quality: "", gas_quality: "" }
  - { id: a, name: B, yield_modifiers: {}, liquid_quality: "", gas_quality: "" }
"#;
        assert_eq!(
            Catalog::from_yaml_str(dup).unwrap_err(),
            CatalogError::DuplicateId("a".into())
        );
        assert!(matches!(
            Catalog::from_yaml_str("modes: 3"),
            Err(CatalogError::Yaml(_))
        ));
    }

    #[test]
    fn weighted_properties() {
        let cat = Catalog::builtin();
        let pino = &cat.material(&MaterialId::new("pino")).unwrap().properties;
        let pe = &cat.material(&MaterialId::new("polietileno")).unwrap().properties;
        let mix = MaterialProperties::weighted([(pino, 0.5), (pe, 0.5)]).unwrap();
        assert!((mix.elemental.carbon - (50.5 + 85.7) / 2.0).abs() < 1e-9);
        assert!((mix.hhv_mj_per_kg - (20.2 + 46.3) / 2.0).abs() < 1e-9);
        assert!(MaterialProperties::weighted(std::iter::empty()).is_none());
    }
}
