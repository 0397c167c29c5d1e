//! Car-following simulation based on the Intelligent Driver Model (IDM).
//!
//! The core is [Vehicle], whose acceleration is a function of its own speed and
//! the gap and closing speed to the vehicle ahead. [Simulation] drives a convoy
//! of vehicles, one time step at a time.

pub use error::Error;
#[cfg(feature = "serde")]
pub use scenario::{Scenario, VehicleSpec};
pub use simulation::{Collision, Simulation, Snapshot, UpdateOrder};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use util::Interval;
pub use vehicle::{Vehicle, VehicleAttributes, VehicleState, VEHICLE_LENGTH};

#[cfg(feature = "debug")]
mod debug;
mod error;
#[cfg(feature = "serde")]
mod scenario;
mod simulation;
mod util;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
