#![deny(warnings)]

//! Core domain models and invariants for the creative studio.
//!
//! This crate defines serializable types shared by the simulators and the
//! form layer, with validation helpers that guard their basic invariants.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Tolerance used when checking that percentages add up to 100.
pub const PERCENT_TOLERANCE: f64 = 1e-6;

/// Kinds of content the studio can request from the generative service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContentType {
    /// Long or short form text.
    Texto,
    /// Still images.
    Imagen,
    /// Video clips.
    Video,
    /// Audio and music.
    Audio,
    /// Source code.
    Codigo,
}

impl ContentType {
    /// All content types in display order.
    pub const ALL: [ContentType; 5] = [
        ContentType::Texto,
        ContentType::Imagen,
        ContentType::Video,
        ContentType::Audio,
        ContentType::Codigo,
    ];

    /// Stable key used in configuration documents.
    pub fn key(self) -> &'static str {
        match self {
            ContentType::Texto => "Texto",
            ContentType::Imagen => "Imagen",
            ContentType::Video => "Video",
            ContentType::Audio => "Audio",
            ContentType::Codigo => "Codigo",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

macro_rules! catalog_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

catalog_id!(
    /// Identifier of a pyrolysis process mode, e.g. "rapida".
    ModeId
);
catalog_id!(
    /// Identifier of a heat source, e.g. "solar_concentrada".
    HeatSourceId
);
catalog_id!(
    /// Identifier of a catalyst, e.g. "zsm5".
    CatalystId
);
catalog_id!(
    /// Identifier of a reference material, e.g. "pino".
    MaterialId
);

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be finite.
    #[error("non-finite numeric value encountered")]
    NonFinite,
    /// Percentages must be non-negative.
    #[error("negative percentage is invalid: {0}")]
    NegativePercentage(f64),
    /// Composition fields must add up to 100.
    #[error("composition must sum to 100, got {0}")]
    CompositionSum(f64),
    /// Mixture percentages must not exceed 100 in total.
    #[error("mixture percentages sum to {0}, which exceeds 100")]
    MixtureOverfull(f64),
    /// A mixture needs at least one material.
    #[error("mixture has no materials")]
    EmptyMixture,
}

fn check_percentage(v: f64) -> Result<(), ValidationError> {
    if !v.is_finite() {
        return Err(ValidationError::NonFinite);
    }
    if v < 0.0 {
        return Err(ValidationError::NegativePercentage(v));
    }
    Ok(())
}

/// One of the three fields of a theoretical biomass composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompositionField {
    Cellulose,
    Hemicellulose,
    Lignin,
}

/// Theoretical lignocellulosic composition in percent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    #[serde(rename = "celulosa")]
    pub cellulose: f64,
    #[serde(rename = "hemicelulosa")]
    pub hemicellulose: f64,
    #[serde(rename = "lignina")]
    pub lignin: f64,
}

impl Default for Composition {
    /// Typical hardwood split.
    fn default() -> Self {
        Self {
            cellulose: 45.0,
            hemicellulose: 30.0,
            lignin: 25.0,
        }
    }
}

impl Composition {
    /// Build a validated composition.
    pub fn new(cellulose: f64, hemicellulose: f64, lignin: f64) -> Result<Self, ValidationError> {
        let c = Self {
            cellulose,
            hemicellulose,
            lignin,
        };
        c.validate()?;
        Ok(c)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_percentage(self.cellulose)?;
        check_percentage(self.hemicellulose)?;
        check_percentage(self.lignin)?;
        let total = self.total();
        if (total - 100.0).abs() > PERCENT_TOLERANCE {
            return Err(ValidationError::CompositionSum(total));
        }
        Ok(())
    }

    pub fn total(&self) -> f64 {
        self.cellulose + self.hemicellulose + self.lignin
    }

    pub fn get(&self, field: CompositionField) -> f64 {
        match field {
            CompositionField::Cellulose => self.cellulose,
            CompositionField::Hemicellulose => self.hemicellulose,
            CompositionField::Lignin => self.lignin,
        }
    }

    fn slot(&mut self, field: CompositionField) -> &mut f64 {
        match field {
            CompositionField::Cellulose => &mut self.cellulose,
            CompositionField::Hemicellulose => &mut self.hemicellulose,
            CompositionField::Lignin => &mut self.lignin,
        }
    }

    /// Set one field and redistribute the remainder over the other two,
    /// proportionally to their current values.
    ///
    /// The value is clamped to [0, 100]. When both other fields are zero
    /// the remainder is split equally. Non-finite values leave the
    /// composition untouched.
    pub fn adjust(&mut self, field: CompositionField, value: f64) {
        if !value.is_finite() {
            warn!(?field, value, "ignoring non-finite composition edit");
            return;
        }
        let value = value.clamp(0.0, 100.0);
        let (a, b) = match field {
            CompositionField::Cellulose => {
                (CompositionField::Hemicellulose, CompositionField::Lignin)
            }
            CompositionField::Hemicellulose => {
                (CompositionField::Cellulose, CompositionField::Lignin)
            }
            CompositionField::Lignin => {
                (CompositionField::Cellulose, CompositionField::Hemicellulose)
            }
        };
        let remainder = 100.0 - value;
        let others = self.get(a) + self.get(b);
        let new_a = if others > 0.0 {
            remainder * self.get(a) / others
        } else {
            remainder / 2.0
        };
        *self.slot(field) = value;
        *self.slot(a) = new_a;
        *self.slot(b) = (remainder - new_a).max(0.0);
    }
}

/// A material and its share of an advanced-mode mixture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MixtureEntry {
    pub material: MaterialId,
    pub percentage: f64,
}

/// Weighted list of named materials, totalling at most 100%.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Mixture {
    pub entries: Vec<MixtureEntry>,
}

impl Mixture {
    /// Build a validated mixture from `(material, percentage)` pairs.
    pub fn new<I, S>(entries: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let m = Self {
            entries: entries
                .into_iter()
                .map(|(id, percentage)| MixtureEntry {
                    material: MaterialId::new(id),
                    percentage,
                })
                .collect(),
        };
        m.validate()?;
        Ok(m)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.entries.is_empty() {
            return Err(ValidationError::EmptyMixture);
        }
        for e in &self.entries {
            check_percentage(e.percentage)?;
        }
        let total = self.total();
        if total > 100.0 + PERCENT_TOLERANCE {
            return Err(ValidationError::MixtureOverfull(total));
        }
        Ok(())
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.percentage).sum()
    }

    /// Share of each entry relative to the mixture total (sums to 1).
    /// Returns an empty vector when the total is zero.
    pub fn normalized_weights(&self) -> Vec<(&MaterialId, f64)> {
        let total = self.total();
        if total <= 0.0 {
            return Vec::new();
        }
        self.entries
            .iter()
            .map(|e| (&e.material, e.percentage / total))
            .collect()
    }
}
