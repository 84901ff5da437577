// src/phase.rs - Closed registry of the material phases the engines understand

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A microstructure phase with its fixed engine ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Porosity,
    C3s,
    C2s,
    C3a,
    C4af,
    K2so4,
    Na2so4,
    Dihydrate,
    Hemihydrate,
    Anhydrite,
    SilicaFume,
    InertFiller,
    Slag,
    Aggregate,
    /// Aluminosilicate glass (fly ash constituent)
    Asg,
    /// Calcium aluminodisilicate (fly ash constituent)
    Cas2,
    /// Amorphous silica (fly ash constituent)
    AmorphousSilica,
    /// Tricalcium aluminate carried by fly ash
    FlyAshC3a,
    FlyAsh,
    CaCl2,
    Caco3,
    FreeLime,
}

impl Phase {
    pub const ALL: [Phase; 22] = [
        Phase::Porosity,
        Phase::C3s,
        Phase::C2s,
        Phase::C3a,
        Phase::C4af,
        Phase::K2so4,
        Phase::Na2so4,
        Phase::Dihydrate,
        Phase::Hemihydrate,
        Phase::Anhydrite,
        Phase::SilicaFume,
        Phase::InertFiller,
        Phase::Slag,
        Phase::Aggregate,
        Phase::Asg,
        Phase::Cas2,
        Phase::AmorphousSilica,
        Phase::FlyAshC3a,
        Phase::FlyAsh,
        Phase::CaCl2,
        Phase::Caco3,
        Phase::FreeLime,
    ];

    /// Clinker phases in the order the engine reads their fractions.
    pub const CLINKER: [Phase; 6] = [
        Phase::C3s,
        Phase::C2s,
        Phase::C3a,
        Phase::C4af,
        Phase::K2so4,
        Phase::Na2so4,
    ];

    /// Integer ID used by the native protocol.
    pub fn id(self) -> u8 {
        match self {
            Phase::Porosity => 0,
            Phase::C3s => 1,
            Phase::C2s => 2,
            Phase::C3a => 3,
            Phase::C4af => 4,
            Phase::K2so4 => 5,
            Phase::Na2so4 => 6,
            Phase::Dihydrate => 7,
            Phase::Hemihydrate => 8,
            Phase::Anhydrite => 9,
            Phase::SilicaFume => 10,
            Phase::InertFiller => 11,
            Phase::Slag => 12,
            Phase::Aggregate => 13,
            Phase::Asg => 14,
            Phase::Cas2 => 15,
            Phase::AmorphousSilica => 16,
            Phase::FlyAshC3a => 17,
            Phase::FlyAsh => 18,
            Phase::CaCl2 => 28,
            Phase::Caco3 => 33,
            Phase::FreeLime => 35,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Porosity => "porosity",
            Phase::C3s => "c3s",
            Phase::C2s => "c2s",
            Phase::C3a => "c3a",
            Phase::C4af => "c4af",
            Phase::K2so4 => "k2so4",
            Phase::Na2so4 => "na2so4",
            Phase::Dihydrate => "dihydrate",
            Phase::Hemihydrate => "hemihydrate",
            Phase::Anhydrite => "anhydrite",
            Phase::SilicaFume => "silica_fume",
            Phase::InertFiller => "inert_filler",
            Phase::Slag => "slag",
            Phase::Aggregate => "aggregate",
            Phase::Asg => "asg",
            Phase::Cas2 => "cas2",
            Phase::AmorphousSilica => "amsil",
            Phase::FlyAshC3a => "fac3a",
            Phase::FlyAsh => "fly_ash",
            Phase::CaCl2 => "cacl2",
            Phase::Caco3 => "caco3",
            Phase::FreeLime => "free_lime",
        }
    }

    pub fn from_name(name: &str) -> Option<Phase> {
        PHASE_TABLE.get(name.trim().to_ascii_lowercase().as_str()).copied()
    }

    pub fn from_id(id: u8) -> Option<Phase> {
        Phase::ALL.iter().copied().find(|phase| phase.id() == id)
    }

    pub fn is_clinker(self) -> bool {
        Phase::CLINKER.contains(&self)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Name -> phase lookup, built once. Construction panics on a duplicated
/// name or ID, so a bad edit of the tables above fails on first use.
pub static PHASE_TABLE: Lazy<HashMap<&'static str, Phase>> = Lazy::new(|| {
    let mut table = HashMap::new();
    let mut ids = HashSet::new();
    for phase in Phase::ALL {
        assert!(ids.insert(phase.id()), "duplicate phase id {}", phase.id());
        assert!(
            table.insert(phase.name(), phase).is_none(),
            "duplicate phase name {}",
            phase.name()
        );
    }
    table
});
