//! Resolution of the feedstock into a single "effective material".

use crate::catalog::{
    Catalog, ElementalAnalysis, MaterialCategory, MaterialProperties, ProximateAnalysis,
};
use serde::{Deserialize, Serialize};
use studio_core::{Composition, MaterialId, Mixture, MixtureEntry};
use tracing::warn;

/// Feedstock as entered by the user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Feedstock {
    /// Theoretical lignocellulosic biomass.
    Simple(Composition),
    /// Weighted mixture of catalog materials.
    Advanced(Mixture),
}

/// Where an effective material came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MaterialSource {
    Theoretical(Composition),
    Catalog(MaterialId),
    Blend(Vec<MixtureEntry>),
}

/// Single material record the simulator works with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectiveMaterial {
    pub name: String,
    pub category: MaterialCategory,
    pub properties: MaterialProperties,
    pub source: MaterialSource,
}

// Elemental analysis (C, H, O) of the pure polymers, mass percent.
const CELLULOSE_CHO: [f64; 3] = [44.4, 6.2, 49.4];
const HEMICELLULOSE_CHO: [f64; 3] = [45.5, 6.1, 48.4];
const LIGNIN_CHO: [f64; 3] = [63.4, 5.9, 30.7];
const THEORETICAL_NITROGEN: f64 = 0.3;
const THEORETICAL_SULFUR: f64 = 0.05;

/// Channiwala-Parikh correlation, MJ/kg on a dry basis.
fn hhv_from_analysis(e: &ElementalAnalysis, ash: f64) -> f64 {
    0.3491 * e.carbon + 1.1783 * e.hydrogen + 0.1005 * e.sulfur
        - 0.1034 * e.oxygen
        - 0.0151 * e.nitrogen
        - 0.0211 * ash
}

fn theoretical(c: &Composition) -> EffectiveMaterial {
    let w = [c.cellulose, c.hemicellulose, c.lignin].map(|v| v / 100.0);
    let mix = |i: usize| {
        w[0] * CELLULOSE_CHO[i] + w[1] * HEMICELLULOSE_CHO[i] + w[2] * LIGNIN_CHO[i]
    };
    // Polymer CHO fractions leave room for the fixed N and S defaults.
    let scale = (100.0 - THEORETICAL_NITROGEN - THEORETICAL_SULFUR) / 100.0;
    let elemental = ElementalAnalysis {
        carbon: mix(0) * scale,
        hydrogen: mix(1) * scale,
        oxygen: mix(2) * scale,
        nitrogen: THEORETICAL_NITROGEN,
        sulfur: THEORETICAL_SULFUR,
    };
    let proximate = ProximateAnalysis {
        moisture: 8.0,
        volatile_matter: 78.0,
        fixed_carbon: 13.5,
        ash: 0.5,
    };
    let hhv_mj_per_kg = hhv_from_analysis(&elemental, proximate.ash);
    EffectiveMaterial {
        name: format!(
            "Biomasa teórica ({:.0}% celulosa, {:.0}% hemicelulosa, {:.0}% lignina)",
            c.cellulose, c.hemicellulose, c.lignin
        ),
        category: MaterialCategory::Biomass,
        properties: MaterialProperties {
            elemental,
            proximate,
            hhv_mj_per_kg,
        },
        source: MaterialSource::Theoretical(c.clone()),
    }
}

fn blend(catalog: &Catalog, mixture: &Mixture) -> Option<EffectiveMaterial> {
    let mut parts = Vec::with_capacity(mixture.entries.len());
    for (id, weight) in mixture.normalized_weights() {
        let Some(m) = catalog.material(id) else {
            warn!(material = %id, "unknown material in mixture");
            return None;
        };
        parts.push((m, weight));
    }
    if let [(only, _)] = parts.as_slice() {
        return Some(EffectiveMaterial {
            name: only.name.clone(),
            category: only.category,
            properties: only.properties.clone(),
            source: MaterialSource::Catalog(only.id.clone()),
        });
    }
    let dominant = parts
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(m, _)| m.category)?;
    let name = mixture
        .entries
        .iter()
        .zip(&parts)
        .map(|(e, (m, _))| format!("{}% {}", e.percentage, m.name))
        .collect::<Vec<_>>()
        .join(" + ");
    let properties = MaterialProperties::weighted(parts.iter().map(|(m, w)| (&m.properties, *w)))?;
    Some(EffectiveMaterial {
        name: format!("Mix: {name}"),
        category: dominant,
        properties,
        source: MaterialSource::Blend(mixture.entries.clone()),
    })
}

/// Resolve the feedstock, or `None` when it is invalid or references
/// unknown materials.
pub fn resolve(catalog: &Catalog, feedstock: &Feedstock) -> Option<EffectiveMaterial> {
    match feedstock {
        Feedstock::Simple(c) => match c.validate() {
            Ok(()) => Some(theoretical(c)),
            Err(e) => {
                warn!(error = %e, "invalid composition");
                None
            }
        },
        Feedstock::Advanced(m) => match m.validate() {
            Ok(()) => blend(catalog, m),
            Err(e) => {
                warn!(error = %e, "invalid mixture");
                None
            }
        },
    }
}
