//! Serializable descriptions of a convoy and its time-stepping policy.

use crate::{Error, Simulation, UpdateOrder, VehicleAttributes};
use serde::{Deserialize, Serialize};

/// A vehicle to place in a scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehicleSpec {
    /// Initial position of the front bumper in m.
    pub position: f64,
    /// Initial speed in m/s.
    pub speed: f64,
    /// The vehicle's IDM parameters; missing fields take their defaults.
    #[serde(default)]
    pub attributes: VehicleAttributes,
}

/// A convoy of vehicles plus the time step and horizon to simulate it over.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scenario {
    /// The time step in s.
    pub dt: f64,
    /// The simulated duration in s.
    pub duration: f64,
    /// How vehicles are sequenced within a step.
    pub order: UpdateOrder,
    /// The vehicles, front to back.
    pub vehicles: Vec<VehicleSpec>,
}

impl Default for Scenario {
    /// A vehicle at 0 m doing 110 m/s following one 50 m ahead doing 123 m/s,
    /// simulated for 20 s in steps of 0.1 s.
    fn default() -> Self {
        Self {
            dt: 0.1,
            duration: 20.0,
            order: UpdateOrder::Simultaneous,
            vehicles: vec![
                VehicleSpec {
                    position: 50.0,
                    speed: 123.0,
                    attributes: Default::default(),
                },
                VehicleSpec {
                    position: 0.0,
                    speed: 110.0,
                    attributes: Default::default(),
                },
            ],
        }
    }
}

impl Scenario {
    /// Parses a scenario from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|err| Error::Scenario(err.to_string()))
    }

    /// The number of whole steps needed to cover the duration.
    pub fn num_steps(&self) -> usize {
        (self.duration / self.dt).round() as usize
    }

    /// Builds a simulation containing the scenario's vehicles.
    pub fn build(&self) -> Result<Simulation, Error> {
        crate::error::check_time_step(self.dt)?;
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "duration",
                value: self.duration,
            });
        }
        let mut sim = Simulation::new(self.order);
        for spec in &self.vehicles {
            sim.add_vehicle(&spec.attributes, spec.position, spec.speed)?;
        }
        Ok(sim)
    }
}
