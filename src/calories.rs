//! Daily calorie-burn estimate from a pet's profile and movement speed.
//!
//! `bmr(species) * weight^0.75 * age factor * sex factor * activity(speed)`

use log::warn;

use crate::types::SensorReading;

/// Activity multiplier below 2 speed units.
const ACTIVITY_REST: f64 = 1.2;
const ACTIVITY_MODERATE: f64 = 1.5;
/// At or above 4 speed units.
const ACTIVITY_VIGOROUS: f64 = 1.8;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CalorieError {
    #[error("Missing required input: {0}")]
    MissingInput(&'static str),
    #[error("Unknown species: {0}")]
    UnknownSpecies(String),
    #[error("Unknown age group: {0}")]
    UnknownAgeGroup(String),
    #[error("Unknown sex: {0}")]
    UnknownSex(String),
}

/// Inputs of the calorie estimate, borrowed from a reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalorieProfile<'a> {
    pub species: Option<&'a str>,
    pub weight_kg: Option<f64>,
    pub age_group: Option<&'a str>,
    pub sex: Option<&'a str>,
    pub speed: Option<f64>,
}

impl<'a> From<&'a SensorReading> for CalorieProfile<'a> {
    fn from(reading: &'a SensorReading) -> Self {
        Self {
            species: reading.species.as_deref(),
            weight_kg: reading.weight,
            age_group: reading.age_group.as_deref(),
            sex: reading.sex.as_deref(),
            speed: reading.speed,
        }
    }
}

/// Basal metabolic coefficient, kcal per kg^0.75 per day.
pub fn species_bmr(species: &str) -> Option<f64> {
    match species.trim().to_ascii_lowercase().as_str() {
        "labrador" | "golden retriever" | "german shepherd" | "beagle" | "poodle" => Some(70.0),
        "bulldog" => Some(65.0),
        "chihuahua" | "husky" => Some(75.0),
        "cat" => Some(60.0),
        _ => None,
    }
}

pub fn age_factor(age_group: &str) -> Option<f64> {
    match age_group.trim().to_ascii_lowercase().as_str() {
        "puppy (0-1 year)" => Some(1.5),
        "adult (1-7 years)" => Some(1.2),
        "senior (7+ years)" => Some(1.0),
        _ => None,
    }
}

pub fn sex_factor(sex: &str) -> Option<f64> {
    match sex.trim().to_ascii_lowercase().as_str() {
        "male" => Some(1.2),
        "female" => Some(1.1),
        _ => None,
    }
}

/// Step function of speed.
pub fn activity_factor(speed: f64) -> f64 {
    if speed < 2.0 {
        ACTIVITY_REST
    } else if speed < 4.0 {
        ACTIVITY_MODERATE
    } else {
        ACTIVITY_VIGOROUS
    }
}

fn required_text<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, CalorieError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(CalorieError::MissingInput(name)),
    }
}

fn required_number(value: Option<f64>, name: &'static str) -> Result<f64, CalorieError> {
    match value {
        Some(number) if number.is_finite() && number > 0.0 => Ok(number),
        _ => Err(CalorieError::MissingInput(name)),
    }
}

pub fn try_estimate_calories(profile: &CalorieProfile<'_>) -> Result<f64, CalorieError> {
    let species = required_text(profile.species, "species")?;
    let weight = required_number(profile.weight_kg, "weight")?;
    let age_group = required_text(profile.age_group, "ageGroup")?;
    let sex = required_text(profile.sex, "sex")?;
    let speed = required_number(profile.speed, "speed")?;

    let bmr = species_bmr(species).ok_or_else(|| CalorieError::UnknownSpecies(species.to_string()))?;
    let age = age_factor(age_group).ok_or_else(|| CalorieError::UnknownAgeGroup(age_group.to_string()))?;
    let sex = sex_factor(sex).ok_or_else(|| CalorieError::UnknownSex(sex.to_string()))?;

    Ok(bmr * weight.powf(0.75) * age * sex * activity_factor(speed))
}

/// Calorie estimate that never fails: bad or missing inputs give 0 and a warning.
pub fn estimate_calories(profile: &CalorieProfile<'_>) -> f64 {
    match try_estimate_calories(profile) {
        Ok(calories) => calories,
        Err(e) => {
            warn!("Calorie estimate skipped: {}", e);
            0.0
        }
    }
}
