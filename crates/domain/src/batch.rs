//! Batch — a brew taken from the recipe service, with its fermentation schedule.

use serde::{Deserialize, Serialize};

/// A brewing batch attached to a chamber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: String,
    pub number: u32,
    pub recipe: Recipe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub name: String,
    pub fermentation: Fermentation,
    #[serde(default)]
    pub original_gravity: f64,
    #[serde(default)]
    pub final_gravity: f64,
}

/// Ordered fermentation schedule of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fermentation {
    pub name: String,
    pub steps: Vec<FermentationStep>,
}

/// One phase of the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FermentationStep {
    /// Step label (e.g. `"Primary"`).
    pub name: String,
    /// Target temperature in degrees Celsius.
    pub temperature: f64,
    /// Duration in days.
    #[serde(default)]
    pub time: u32,
}

impl FermentationStep {
    #[must_use]
    pub fn new(name: impl Into<String>, temperature: f64, time: u32) -> Self {
        Self {
            name: name.into(),
            temperature,
            time,
        }
    }
}

impl Batch {
    /// The fermentation steps, in schedule order.
    #[must_use]
    pub fn steps(&self) -> &[FermentationStep] {
        &self.recipe.fermentation.steps
    }

    /// Find a step by label.
    ///
    /// Returns the 1-based position of the step in the schedule together with
    /// the step. When several steps share a label the first one wins.
    #[must_use]
    pub fn find_step(&self, label: &str) -> Option<(u32, &FermentationStep)> {
        self.steps()
            .iter()
            .zip(1..)
            .find(|(step, _)| step.name == label)
            .map(|(step, position)| (position, step))
    }

    /// Step at a 1-based schedule position.
    #[must_use]
    pub fn step_at(&self, position: u32) -> Option<&FermentationStep> {
        let index = usize::try_from(position.checked_sub(1)?).ok()?;
        self.steps().get(index)
    }
}
