use serde::Deserialize;
use validator::Validate;

use crate::state::room::RoomSettings;

/// Partial settings update supplied by the host.
///
/// Unknown keys are rejected at deserialization time
/// (`deny_unknown_fields`); out-of-range values are rejected by
/// validation before anything is applied. Omitted fields leave the current
/// value untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SettingsUpdate {
    /// Countdown duration in seconds.
    #[serde(default)]
    #[validate(range(min = 1, max = 3600))]
    pub countdown_duration: Option<u64>,
    /// Preparation duration in seconds.
    #[serde(default)]
    #[validate(range(min = 1, max = 3600))]
    pub preparation_duration: Option<u64>,
    /// Selection duration in seconds.
    #[serde(default)]
    #[validate(range(min = 1, max = 3600))]
    pub selection_duration: Option<u64>,
    /// Truth/dare duration in seconds.
    #[serde(default)]
    #[validate(range(min = 1, max = 3600))]
    pub truth_dare_duration: Option<u64>,
    /// Remaining time after skip activation, in seconds.
    #[serde(default)]
    #[validate(range(min = 1, max = 3600))]
    pub skip_duration: Option<u64>,
    /// Number of rounds before the game ends.
    #[serde(default)]
    #[validate(range(min = 1, max = 100))]
    pub max_rounds: Option<u32>,
    /// Minigame chance as a percentage.
    #[serde(default)]
    #[validate(range(min = 0, max = 100))]
    pub minigame_chance_percent: Option<u8>,
    /// Whether to generate content when a list runs dry.
    #[serde(default)]
    pub ai_generation_enabled: Option<bool>,
}

impl SettingsUpdate {
    /// Overlay the present fields onto `settings`. Call only after
    /// [`Validate::validate`] has passed.
    pub fn apply_to(&self, settings: &mut RoomSettings) {
        if let Some(value) = self.countdown_duration {
            settings.countdown_duration = value;
        }
        if let Some(value) = self.preparation_duration {
            settings.preparation_duration = value;
        }
        if let Some(value) = self.selection_duration {
            settings.selection_duration = value;
        }
        if let Some(value) = self.truth_dare_duration {
            settings.truth_dare_duration = value;
        }
        if let Some(value) = self.skip_duration {
            settings.skip_duration = value;
        }
        if let Some(value) = self.max_rounds {
            settings.max_rounds = value;
        }
        if let Some(value) = self.minigame_chance_percent {
            settings.minigame_chance_percent = value;
        }
        if let Some(value) = self.ai_generation_enabled {
            settings.ai_generation_enabled = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_update_keeps_untouched_fields() {
        let update: SettingsUpdate =
            serde_json::from_value(serde_json::json!({ "max_rounds": 5 })).unwrap();
        update.validate().unwrap();

        let mut settings = RoomSettings::default();
        update.apply_to(&mut settings);

        assert_eq!(settings.max_rounds, 5);
        assert_eq!(settings.countdown_duration, 10);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<SettingsUpdate, _> =
            serde_json::from_value(serde_json::json!({ "spectator_mode": true }));
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_values_fail_validation() {
        let update: SettingsUpdate =
            serde_json::from_value(serde_json::json!({ "minigame_chance_percent": 100 })).unwrap();
        assert!(update.validate().is_ok());

        let update: SettingsUpdate =
            serde_json::from_value(serde_json::json!({ "countdown_duration": 0 })).unwrap();
        assert!(update.validate().is_err());
    }
}
