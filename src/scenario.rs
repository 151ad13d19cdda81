//! Scenarios: the (label, prompt) pairs a run generates, and the built-in
//! preset lists.

use crate::error::{Result, TryOnError};
use crate::image::ImageFormat;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Label used for a caller-supplied prompt when none is given.
pub const CUSTOM_LABEL: &str = "custom";

/// One variation to generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scenario {
    /// Short name, used in the output file name.
    pub label: String,
    /// Prompt text sent verbatim to the model.
    pub prompt: String,
}

impl Scenario {
    /// Creates a scenario.
    pub fn new(label: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            prompt: prompt.into(),
        }
    }

    /// Output path for this scenario: `{base}_{label}.{ext}`.
    pub fn output_path(&self, base: &Path, format: ImageFormat) -> PathBuf {
        output_path(base, &self.label, format)
    }
}

/// Derives `{base}_{label}.{ext}` from an output prefix.
pub fn output_path(base: &Path, label: &str, format: ImageFormat) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push("_");
    name.push(label);
    name.push(".");
    name.push(format.extension());
    PathBuf::from(name)
}

const IDENTITY_PREAMBLE: &str = "Generate a photorealistic image of the person. \
Maintain the person's identity, facial features, body proportions, and lighting. ";

/// Built-in scenario collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Five street-style shots of a hoodie outfit.
    #[default]
    Streetwear,
    /// Park, coffee shop and Madrid metro.
    Travel,
    /// Subway sprint, coffee break and gym floor.
    Lifestyle,
}

impl Preset {
    /// All presets, in display order.
    pub const ALL: [Preset; 3] = [Self::Streetwear, Self::Travel, Self::Lifestyle];

    /// Returns the preset name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Streetwear => "streetwear",
            Self::Travel => "travel",
            Self::Lifestyle => "lifestyle",
        }
    }

    /// Returns the preset's scenarios in order.
    pub fn scenarios(&self) -> Vec<Scenario> {
        match self {
            Self::Streetwear => vec![
                Scenario::new(
                    "urban_walk",
                    "Young adult with round glasses, long dark hair, wearing a teal/blue-green hoodie \
                     with a small light logo on the chest, black headphones resting around his neck. \
                     He walks on a modern urban street with mid-rise buildings and shopfronts, \
                     late-afternoon light, slight breeze showing the drape and fit of the hoodie, \
                     natural candid look, full-body, realistic photography.",
                ),
                Scenario::new(
                    "cafe_coffee",
                    "Same young man, same outfit and headphones around neck, sitting by a window in a \
                     bright cafe with natural light. He holds and sips a to-go coffee cup, relaxed \
                     posture that shows how the hoodie sits when seated, soft shadows, warm tones, \
                     realistic lifestyle photo.",
                ),
                Scenario::new(
                    "railing_pose",
                    "Same young man, teal hoodie with small logo, black headphones at neck. Leaning \
                     back against a railing or low wall, hands in hoodie pocket, looking forward \
                     confidently. Urban backdrop with subtle depth of field, morning light, hoodie fit \
                     visible around torso, realistic street-style photo.",
                ),
                Scenario::new(
                    "phone_check",
                    "Same character and outfit, checking his smartphone while standing on a city \
                     sidewalk, crosswalk and traffic blur in background, natural posture highlighting \
                     hoodie fit, golden-hour light, realistic photo.",
                ),
                Scenario::new(
                    "backpack_move",
                    "Same character and outfit, adjusting or carrying a backpack on one shoulder in a \
                     plaza or subway entrance, dynamic mid-step pose showing hoodie drape, cool \
                     daylight, realistic lifestyle photo.",
                ),
            ],
            Self::Travel => vec![
                Scenario::new(
                    "park",
                    "Keep the person's clothing identical to the reference photo, but place them \
                     walking through a park at sunset. Preserve their pose, body proportions, and \
                     styling for a realistic scene.",
                ),
                Scenario::new(
                    "coffee",
                    "Show the same person relaxing in a stylish coffee shop at golden hour, sitting \
                     with a warm drink while wearing the exact same outfit.",
                ),
                Scenario::new(
                    "metro",
                    "Depict the person standing on a platform inside the Madrid metro at sunset, \
                     keeping the outfit identical and ensuring realistic lighting.",
                ),
            ],
            Self::Lifestyle => vec![
                Scenario::new(
                    "subway",
                    format!(
                        "{IDENTITY_PREAMBLE}Same young man, same outfit, running towards the subway. \
                         He holds a white bag in his right hand, with a worrying posture that shows how \
                         the hoodie fits when in motion, soft shadows, warm tones, realistic lifestyle \
                         photo."
                    ),
                ),
                Scenario::new(
                    "cafe",
                    format!(
                        "{IDENTITY_PREAMBLE}Same young man, same outfit, sitting in a cafeteria, sipping \
                         coffee. He has a relaxed posture, showing comfort, showing how the hoodie fits \
                         when seated, soft shadows, warm tones, realistic lifestyle photo."
                    ),
                ),
                Scenario::new(
                    "gym",
                    format!(
                        "{IDENTITY_PREAMBLE}Same young man, same outfit, laying down in the gym, \
                         lifting weights. He has an athletic posture, showing effort, showing how the \
                         hoodie fits when laying on the floor, soft shadows, warm tones, realistic \
                         lifestyle photo."
                    ),
                ),
            ],
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Preset {
    type Err = TryOnError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TryOnError::InvalidScenario(format!("unknown preset '{s}'")))
    }
}

/// A validated, ordered, non-empty list of scenarios with unique labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ScenarioSet {
    scenarios: Vec<Scenario>,
}

impl ScenarioSet {
    /// Validates and wraps a list of scenarios.
    pub fn new(scenarios: Vec<Scenario>) -> Result<Self> {
        if scenarios.is_empty() {
            return Err(TryOnError::InvalidScenario("no scenarios to run".into()));
        }

        let mut seen = HashSet::new();
        for scenario in &scenarios {
            if scenario.label.trim().is_empty() {
                return Err(TryOnError::InvalidScenario(
                    "scenario labels must not be empty".into(),
                ));
            }
            if !seen.insert(scenario.label.as_str()) {
                return Err(TryOnError::InvalidScenario(format!(
                    "duplicate scenario label '{}'",
                    scenario.label
                )));
            }
        }

        Ok(Self { scenarios })
    }

    /// All scenarios of a built-in preset.
    pub fn from_preset(preset: Preset) -> Self {
        Self {
            scenarios: preset.scenarios(),
        }
    }

    /// A single caller-supplied prompt, labelled `custom` unless a label is
    /// given.
    pub fn custom(label: Option<&str>, prompt: impl Into<String>) -> Result<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(TryOnError::InvalidScenario("prompt must not be empty".into()));
        }
        Self::new(vec![Scenario::new(label.unwrap_or(CUSTOM_LABEL), prompt)])
    }

    /// Keeps only the scenarios whose labels are listed, preserving the
    /// set's order. Unknown labels are rejected.
    pub fn only<S: AsRef<str>>(self, labels: &[S]) -> Result<Self> {
        if labels.is_empty() {
            return Ok(self);
        }

        for wanted in labels {
            let wanted = wanted.as_ref();
            if !self.scenarios.iter().any(|s| s.label == wanted) {
                let known: Vec<&str> = self.labels().collect();
                return Err(TryOnError::InvalidScenario(format!(
                    "unknown scenario '{wanted}' (available: {})",
                    known.join(", ")
                )));
            }
        }

        let selected = self
            .scenarios
            .into_iter()
            .filter(|s| labels.iter().any(|l| l.as_ref() == s.label))
            .collect();
        Self::new(selected)
    }

    /// Scenario labels in order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.scenarios.iter().map(|s| s.label.as_str())
    }

    /// Number of scenarios.
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Always false for a constructed set; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Iterates over the scenarios in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Scenario> {
        self.scenarios.iter()
    }
}

impl<'a> IntoIterator for &'a ScenarioSet {
    type Item = &'a Scenario;
    type IntoIter = std::slice::Iter<'a, Scenario>;

    fn into_iter(self) -> Self::IntoIter {
        self.scenarios.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("out"), "park", ImageFormat::Png),
            PathBuf::from("out_park.png")
        );
        assert_eq!(
            Scenario::new("cafe", "p").output_path(Path::new("renders/ref"), ImageFormat::Jpeg),
            PathBuf::from("renders/ref_cafe.jpg")
        );
    }

    #[test]
    fn test_presets_are_valid_sets() {
        for preset in Preset::ALL {
            let scenarios = preset.scenarios();
            assert!(ScenarioSet::new(scenarios).is_ok(), "{preset} should validate");
        }
        assert_eq!(ScenarioSet::from_preset(Preset::Streetwear).len(), 5);
        assert_eq!(
            ScenarioSet::from_preset(Preset::Travel).labels().collect::<Vec<_>>(),
            vec!["park", "coffee", "metro"]
        );
    }

    #[test]
    fn test_lifestyle_prompts_carry_identity_preamble() {
        for scenario in Preset::Lifestyle.scenarios() {
            assert!(scenario.prompt.starts_with("Generate a photorealistic image"));
        }
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("Travel".parse::<Preset>().unwrap(), Preset::Travel);
        assert!("nope".parse::<Preset>().is_err());
    }

    #[test]
    fn test_rejects_empty_and_duplicates() {
        assert!(ScenarioSet::new(vec![]).is_err());
        assert!(ScenarioSet::new(vec![Scenario::new(" ", "p")]).is_err());

        let err = ScenarioSet::new(vec![Scenario::new("a", "1"), Scenario::new("a", "2")])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate scenario label 'a'"));
    }

    #[test]
    fn test_only_keeps_set_order() {
        let set = ScenarioSet::from_preset(Preset::Streetwear)
            .only(&["phone_check", "urban_walk"])
            .unwrap();
        assert_eq!(
            set.labels().collect::<Vec<_>>(),
            vec!["urban_walk", "phone_check"]
        );
    }

    #[test]
    fn test_only_rejects_unknown_label() {
        let err = ScenarioSet::from_preset(Preset::Travel)
            .only(&["beach"])
            .unwrap_err();
        assert!(matches!(err, TryOnError::InvalidScenario(_)));
        assert!(err.to_string().contains("park, coffee, metro"));
    }

    #[test]
    fn test_custom_prompt() {
        let set = ScenarioSet::custom(None, "On a beach").unwrap();
        assert_eq!(set.labels().collect::<Vec<_>>(), vec![CUSTOM_LABEL]);

        let labelled = ScenarioSet::custom(Some("beach"), "On a beach").unwrap();
        assert_eq!(labelled.iter().next().unwrap().label, "beach");

        assert!(ScenarioSet::custom(None, "  ").is_err());
    }
}
