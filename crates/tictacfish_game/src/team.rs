//! Teams and their display characters.

use serde::{Deserialize, Serialize};

/// Which team a player plays for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CharacterTeam {
    /// 🐟
    Fish,
    /// 🐹
    Rodents,
}

const FISH: [&str; 3] = ["🐟", "🐠", "🐡"];
const RODENTS: [&str; 3] = ["🐹", "🐭", "🐰"];

impl CharacterTeam {
    /// Characters used by this team, in selection order.
    pub fn characters(self) -> &'static [&'static str; 3] {
        match self {
            CharacterTeam::Fish => &FISH,
            CharacterTeam::Rodents => &RODENTS,
        }
    }

    /// Picks a character for a (non-negative) index, wrapping around.
    pub fn select(self, index: usize) -> &'static str {
        let chars = self.characters();
        chars[index % chars.len()]
    }

    /// Character slot used for the given move number of a player.
    pub fn character_id(move_number: usize) -> usize {
        if move_number == 0 {
            return 0;
        }
        move_number % FISH.len()
    }

    /// The opposing team.
    pub fn opponent(self) -> Self {
        match self {
            CharacterTeam::Fish => CharacterTeam::Rodents,
            CharacterTeam::Rodents => CharacterTeam::Fish,
        }
    }

    /// Receptionist tag under which players of this team check in.
    pub fn tag(self) -> &'static str {
        match self {
            CharacterTeam::Fish => "team:fish",
            CharacterTeam::Rodents => "team:rodents",
        }
    }

    /// Recognises the team of a display character.
    pub fn from_character(character: &str) -> Option<Self> {
        if FISH.contains(&character) {
            Some(CharacterTeam::Fish)
        } else if RODENTS.contains(&character) {
            Some(CharacterTeam::Rodents)
        } else {
            None
        }
    }
}
