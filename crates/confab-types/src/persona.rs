//! Character personas.
//!
//! A persona is either one of the built-in characters, each with a fixed
//! system prompt, or the `Custom` sentinel whose prompt is supplied by the
//! caller on every turn.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Persona name whose system prompt comes from the caller.
pub const CUSTOM_PERSONA: &str = "Custom";

/// The built-in character set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltinPersona {
    #[serde(rename = "Sherlock Holmes")]
    SherlockHolmes,
    #[serde(rename = "Marie Curie")]
    MarieCurie,
    #[serde(rename = "Iron Man")]
    IronMan,
    #[serde(rename = "J.K. Rowling")]
    JkRowling,
}

impl BuiltinPersona {
    pub const ALL: [BuiltinPersona; 4] = [
        BuiltinPersona::SherlockHolmes,
        BuiltinPersona::MarieCurie,
        BuiltinPersona::IronMan,
        BuiltinPersona::JkRowling,
    ];

    /// Exact name used in conversation keys.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinPersona::SherlockHolmes => "Sherlock Holmes",
            BuiltinPersona::MarieCurie => "Marie Curie",
            BuiltinPersona::IronMan => "Iron Man",
            BuiltinPersona::JkRowling => "J.K. Rowling",
        }
    }

    /// Fixed system prompt for this character.
    pub fn system_prompt(&self) -> &'static str {
        match self {
            BuiltinPersona::SherlockHolmes => {
                "You are Sherlock Holmes, the world's greatest detective."
            }
            BuiltinPersona::MarieCurie => {
                "You are Marie Curie, the first woman to win a Nobel Prize and the only person to win in two scientific fields (Physics and Chemistry)"
            }
            BuiltinPersona::IronMan => {
                "You are Tony Stark, aka Iron Man, a genius billionaire playboy philanthropist."
            }
            BuiltinPersona::JkRowling => {
                "You are J.K. Rowling, a British author best known for creating the Harry Potter series, which is one of the best-selling book franchises in history"
            }
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            BuiltinPersona::SherlockHolmes => "🕵️",
            BuiltinPersona::MarieCurie => "🧪",
            BuiltinPersona::IronMan => "🦾",
            BuiltinPersona::JkRowling => "📖",
        }
    }

    /// Look up a built-in persona by its exact (case-sensitive) name.
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl fmt::Display for BuiltinPersona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BuiltinPersona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| format!("unknown built-in persona: '{s}'"))
    }
}

/// Catalog entry describing a selectable persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaInfo {
    /// Value to send as `persona`.
    pub name: String,
    /// Label for pickers, e.g. `🦾 Iron Man`.
    pub label: String,
    /// Fixed prompt, or `None` for `Custom`.
    pub system_prompt: Option<String>,
}

/// All selectable personas, `Custom` first.
pub fn persona_catalog() -> Vec<PersonaInfo> {
    let mut catalog = vec![PersonaInfo {
        name: CUSTOM_PERSONA.to_string(),
        label: format!("🦎 {CUSTOM_PERSONA}"),
        system_prompt: None,
    }];
    catalog.extend(BuiltinPersona::ALL.iter().map(|p| PersonaInfo {
        name: p.name().to_string(),
        label: format!("{} {}", p.icon(), p.name()),
        system_prompt: Some(p.system_prompt().to_string()),
    }));
    catalog
}
