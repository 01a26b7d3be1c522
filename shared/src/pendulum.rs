use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{check_finite, check_length, check_mass, ParamError};

/// One pendulum as stored and served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../ui/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct Pendulum {
    pub id: String,
    /// Initial angle (radians) of the current motion phase
    #[serde(rename = "theta")]
    pub theta0: f64,
    /// Display only, the small-angle model ignores it
    pub mass: f64,
    /// Arm length (meters)
    pub length: f64,
    /// Start of the current motion phase (ms since epoch)
    #[ts(type = "number")]
    pub triggered_at: i64,
    pub moving: bool,
}

impl Pendulum {
    /// Build a moving pendulum whose phase starts at `now_ms`.
    pub fn create(id: String, params: &NewPendulum, now_ms: i64) -> Result<Self, ParamError> {
        params.validate()?;
        Ok(Self {
            id,
            theta0: params.theta,
            mass: params.mass,
            length: params.length,
            triggered_at: now_ms,
            moving: true,
        })
    }

    pub fn stop(&mut self) {
        self.moving = false;
    }

    /// Restart motion; elapsed time is measured from `now_ms` from here on.
    pub fn start(&mut self, now_ms: i64) {
        self.moving = true;
        self.triggered_at = now_ms;
    }
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../ui/src/generated/")]
pub struct NewPendulum {
    pub theta: f64,
    pub mass: f64,
    pub length: f64,
}

impl NewPendulum {
    pub fn validate(&self) -> Result<(), ParamError> {
        check_finite("theta", self.theta)?;
        check_mass(self.mass)?;
        check_length(self.length)?;
        Ok(())
    }
}

/// Body of an update request. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../ui/src/generated/")]
pub struct PendulumPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
}

impl PendulumPatch {
    pub fn validate(&self) -> Result<(), ParamError> {
        if let Some(theta) = self.theta {
            check_finite("theta", theta)?;
        }
        if let Some(mass) = self.mass {
            check_mass(mass)?;
        }
        if let Some(length) = self.length {
            check_length(length)?;
        }
        Ok(())
    }

    /// Merge into `pendulum`. Motion state (`moving`, `triggered_at`) is untouched.
    pub fn apply(&self, pendulum: &mut Pendulum) {
        if let Some(theta) = self.theta {
            pendulum.theta0 = theta;
        }
        if let Some(mass) = self.mass {
            pendulum.mass = mass;
        }
        if let Some(length) = self.length {
            pendulum.length = length;
        }
    }
}
