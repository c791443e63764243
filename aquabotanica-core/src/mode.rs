use crate::config::THRESHOLDS;
use crate::irrigation::MoistureThreshold;
use enumset::{EnumSet, EnumSetType};

/// Watering-intensity profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlantMode {
    /// Mode 1, plants that need little water.
    #[default]
    Low = 1,

    /// Mode 2.
    Medium = 2,

    /// Mode 3, thirsty plants.
    High = 3,
}

impl PlantMode {
    /// Mode number as shown to the user (1..3).
    pub fn number(self) -> u8 {
        self as u8
    }

    /// Threshold band of this mode.
    pub fn threshold(self) -> MoistureThreshold {
        THRESHOLDS[self as usize - 1]
    }

    /// Second line of the mode confirmation banner.
    pub fn label(self) -> &'static str {
        match self {
            PlantMode::Low => "Wenig Wasser",
            PlantMode::Medium => "Mittel Wasser",
            PlantMode::High => "Viel Wasser",
        }
    }
}

/// Momentary mode-selection inputs.
#[derive(EnumSetType, Debug)]
pub enum ModeButton {
    A,
    B,
    C,
}

impl ModeButton {
    /// Mode this button selects.
    pub fn mode(self) -> PlantMode {
        match self {
            ModeButton::A => PlantMode::Low,
            ModeButton::B => PlantMode::Medium,
            ModeButton::C => PlantMode::High,
        }
    }
}

/// Resolve the buttons held down this tick to a mode.
///
/// Buttons are checked A, then B, then C; the last pressed one wins.
///
/// # Arguments
/// * `pressed` - Buttons currently reading low.
///
/// # Returns
/// * `Option<PlantMode>` - The selected mode, or `None` if nothing is pressed.
pub fn select(pressed: EnumSet<ModeButton>) -> Option<PlantMode> {
    [ModeButton::A, ModeButton::B, ModeButton::C]
        .into_iter()
        .filter(|button| pressed.contains(*button))
        .last()
        .map(ModeButton::mode)
}
