//! Gameplay modifiers attached to records.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mod {
    Fast,
    Slow,
    Hidden,
    Flashlight,
    Mirror,
    Hard,
    ExHard,
    Auto,
}

impl Mod {
    /// Mods that disqualify a record from leaderboards, rating and exp.
    pub fn is_unranked(self) -> bool {
        matches!(self, Mod::Auto | Mod::Slow)
    }
}

/// Rejects duplicated or mutually exclusive mods.
pub fn validate_mods(mods: &[Mod]) -> Result<(), String> {
    for (i, m) in mods.iter().enumerate() {
        if mods[..i].contains(m) {
            return Err(format!("Duplicate mod: {m:?}"));
        }
    }
    if mods.contains(&Mod::Fast) && mods.contains(&Mod::Slow) {
        return Err("Fast and Slow cannot be combined".to_string());
    }
    if mods.contains(&Mod::Hard) && mods.contains(&Mod::ExHard) {
        return Err("Hard and ExHard cannot be combined".to_string());
    }
    Ok(())
}

pub fn is_ranked(mods: &[Mod]) -> bool {
    !mods.iter().any(|m| m.is_unranked())
}
