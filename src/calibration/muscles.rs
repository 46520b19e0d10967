// src/calibration/muscles.rs
//! Muscle identifiers and the fixed catalog of electrode sites

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Body side of an electrode site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Left side, also used for midline sites
    Left,
    /// Right side
    Right,
}

/// Identifier of a muscle/side pair, e.g. `bicep-left`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MuscleId(String);

impl MuscleId {
    /// Identifier from any string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Side implied by the identifier suffix, defaulting to left for
    /// midline sites
    pub fn side(&self) -> Side {
        find(&self.0)
            .map(|site| site.side)
            .unwrap_or_else(|| {
                if self.0.ends_with("-right") {
                    Side::Right
                } else {
                    Side::Left
                }
            })
    }
}

impl fmt::Display for MuscleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for MuscleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for MuscleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MuscleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MuscleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Catalog entry for an electrode site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuscleSite {
    /// Stable identifier, e.g. `bicep-left`
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// Body side
    pub side: Side,
    /// Short label shown on the body map
    pub icon: &'static str,
}

const fn site(id: &'static str, name: &'static str, side: Side, icon: &'static str) -> MuscleSite {
    MuscleSite { id, name, side, icon }
}

/// Every site the dashboard knows about, in display order
pub const CATALOG: [MuscleSite; 19] = [
    site("bicep-left", "Bicep", Side::Left, "BI-L"),
    site("bicep-right", "Bicep", Side::Right, "BI-R"),
    site("tricep-left", "Tricep", Side::Left, "TR-L"),
    site("tricep-right", "Tricep", Side::Right, "TR-R"),
    site("quadriceps-left", "Quadriceps", Side::Left, "QU-L"),
    site("quadriceps-right", "Quadriceps", Side::Right, "QU-R"),
    site("hamstring-left", "Hamstring", Side::Left, "HA-L"),
    site("hamstring-right", "Hamstring", Side::Right, "HA-R"),
    site("calves-left", "Calves", Side::Left, "CA-L"),
    site("calves-right", "Calves", Side::Right, "CA-R"),
    site("glutes-left", "Glutes", Side::Left, "GL-L"),
    site("glutes-right", "Glutes", Side::Right, "GL-R"),
    site("traps", "Traps", Side::Left, "TR"),
    site("lats-left", "Lats", Side::Left, "LA-L"),
    site("lats-right", "Lats", Side::Right, "LA-R"),
    site("rhomboids", "Rhomboids", Side::Left, "RH"),
    site("abs", "Abs", Side::Left, "AB"),
    site("pecs-left", "Pecs", Side::Left, "PE-L"),
    site("pecs-right", "Pecs", Side::Right, "PE-R"),
];

/// Catalog site with the given id
pub fn find(id: &str) -> Option<&'static MuscleSite> {
    CATALOG.iter().find(|site| site.id == id)
}

/// First `count` catalog sites as wizard order
pub fn wizard_sequence(count: usize) -> Vec<MuscleId> {
    CATALOG
        .iter()
        .take(count)
        .map(|site| MuscleId::from(site.id))
        .collect()
}
