use serde::{Deserialize, Serialize};

/// One sample batch sent by a wearable: biometric profile plus raw sensor values.
///
/// Profile fields are optional on the wire; the calorie estimate is 0 when any
/// of them is missing.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub species: Option<String>,
    pub weight: Option<f64>,
    pub age_group: Option<String>,
    pub sex: Option<String>,
    pub speed: Option<f64>,
    #[serde(default)]
    pub infrared_value: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    /// Device time in milliseconds.
    pub timestamp: Option<i64>,
}

impl SensorReading {
    pub fn new(infrared_value: f64, x: f64, y: f64, z: f64) -> Self {
        Self {
            infrared_value,
            x,
            y,
            z,
            ..Self::default()
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_profile(
        mut self,
        species: &str,
        weight: f64,
        age_group: &str,
        sex: &str,
        speed: f64,
    ) -> Self {
        self.species = Some(species.to_string());
        self.weight = Some(weight);
        self.age_group = Some(age_group.to_string());
        self.sex = Some(sex.to_string());
        self.speed = Some(speed);
        self
    }
}
