#[cfg(feature = "debug")]
use crate::debug::{debug_collision, debug_follow, take_debug_frame};
use crate::error::check_time_step;
use crate::util::Interval;
use crate::vehicle::{Vehicle, VehicleAttributes, VehicleState};
use crate::{Error, VehicleId, VehicleSet};
use itertools::Itertools;
use log::{debug, warn};
use rand::Rng;
use rand_distr::Distribution;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Randomised velocity adjustment factors are clamped to this range.
const VELOCITY_ADJUST_RANGE: Interval<f64> = Interval::new(0.75, 1.25);

/// The order in which vehicles are advanced within a single step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum UpdateOrder {
    /// Every vehicle reacts to the state of its leader at the start of the step.
    #[default]
    Simultaneous,
    /// Vehicles are advanced front to back, so each one reacts to
    /// its leader's state at the end of the step.
    LeaderFirst,
}

/// Two adjacent vehicles whose bodies overlap.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Collision {
    /// The vehicle behind.
    pub follower: VehicleId,
    /// The vehicle ahead.
    pub leader: VehicleId,
    /// How far the follower's front has passed the leader's rear, in m.
    pub overlap: f64,
}

/// The state of every vehicle in the convoy at the end of a frame.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Snapshot {
    /// The frame index.
    pub frame: usize,
    /// The simulated time in s.
    pub time: f64,
    /// The vehicles' states, front to back.
    pub vehicles: Vec<VehicleState>,
}

/// A single-lane convoy simulation.
#[derive(Debug, Default)]
pub struct Simulation {
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// The vehicles ordered front to back; the leader of each entry is the one before it.
    convoy: Vec<VehicleId>,
    /// How vehicles are sequenced within a step.
    order: UpdateOrder,
    /// The current frame of simulation.
    frame: usize,
    /// The simulated time in s.
    time: f64,
    /// Collisions detected in the previous frame.
    collisions: SmallVec<[Collision; 4]>,
    /// Debugging information from the previously simulated frame.
    #[cfg(feature = "debug")]
    debug: serde_json::Value,
}

impl Simulation {
    /// Creates a new simulation.
    pub fn new(order: UpdateOrder) -> Self {
        Self {
            order,
            ..Default::default()
        }
    }

    /// Adds a vehicle to the back of the convoy.
    ///
    /// The new vehicle's front must be behind the front of the current last vehicle.
    pub fn add_vehicle(
        &mut self,
        attributes: &VehicleAttributes,
        position: f64,
        speed: f64,
    ) -> Result<VehicleId, Error> {
        let vehicle = Vehicle::new(attributes, position, speed)?;
        if let Some(tail) = self.convoy.last().map(|id| &self.vehicles[*id]) {
            if position >= tail.pos_front() {
                return Err(Error::OutOfOrder {
                    position,
                    tail: tail.pos_front(),
                });
            }
        }
        let vehicle_id = self.vehicles.insert(vehicle);
        self.convoy.push(vehicle_id);
        Ok(vehicle_id)
    }

    /// Removes a vehicle from the simulation.
    /// The vehicle behind it will follow the removed vehicle's leader.
    pub fn remove_vehicle(&mut self, vehicle_id: VehicleId) -> Option<Vehicle> {
        let vehicle = self.vehicles.remove(vehicle_id)?;
        self.convoy.retain(|id| *id != vehicle_id);
        Some(vehicle)
    }

    /// Randomly assigns a desired velocity adjustment factor to each vehicle,
    /// which is sampled from a normal distribution with a mean of 1 (no adjustment)
    /// and standard deviation of `stddev`.
    pub fn randomise_velocity_adjusts<R: Rng + ?Sized>(
        &mut self,
        stddev: f64,
        rng: &mut R,
    ) -> Result<(), Error> {
        let distr = rand_distr::Normal::new(1.0, stddev).map_err(|_| Error::InvalidParameter {
            name: "stddev",
            value: stddev,
        })?;
        for id in &self.convoy {
            let factor = VELOCITY_ADJUST_RANGE.clamp(distr.sample(rng));
            self.vehicles[*id].set_velocity_adjust(factor);
        }
        Ok(())
    }

    /// Advances the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f64) -> Result<(), Error> {
        check_time_step(dt)?;
        match self.order {
            UpdateOrder::Simultaneous => self.step_simultaneous(dt),
            UpdateOrder::LeaderFirst => self.step_leader_first(dt),
        }
        self.detect_collisions();
        self.frame += 1;
        self.time += dt;
        debug!(
            "frame {} (t = {:.3} s): advanced {} vehicles",
            self.frame,
            self.time,
            self.convoy.len()
        );

        #[cfg(feature = "debug")]
        {
            self.debug = take_debug_frame();
        }
        Ok(())
    }

    /// Computes every acceleration from the current state, then integrates.
    fn step_simultaneous(&mut self, dt: f64) {
        let accs = self
            .convoy
            .iter()
            .enumerate()
            .map(|(idx, id)| follow(idx, &self.vehicles[*id], self.leader_at(idx)))
            .collect::<Vec<_>>();
        for (id, acc) in self.convoy.iter().zip(accs) {
            self.vehicles[*id].integrate(acc, dt);
        }
    }

    /// Advances vehicles one at a time, front to back.
    fn step_leader_first(&mut self, dt: f64) {
        if let Some(head) = self.convoy.first().and_then(|id| self.vehicles.get_mut(*id)) {
            let acc = follow(0, head, None);
            head.integrate(acc, dt);
        }
        for (idx, (leader, follower)) in self.convoy.iter().tuple_windows().enumerate() {
            if let Some([leader, follower]) = self.vehicles.get_disjoint_mut([*leader, *follower]) {
                let acc = follow(idx + 1, follower, Some(&*leader));
                follower.integrate(acc, dt);
            }
        }
    }

    /// Records every adjacent pair of vehicles that overlap.
    fn detect_collisions(&mut self) {
        self.collisions.clear();
        for (idx, (leader, follower)) in self.convoy.iter().tuple_windows().enumerate() {
            let gap = self.vehicles[*follower].gap_to(&self.vehicles[*leader]);
            if gap < 0.0 {
                warn!(
                    "frame {}: vehicle #{} overlaps the vehicle ahead by {:.2} m",
                    self.frame,
                    idx + 1,
                    -gap
                );
                #[cfg(feature = "debug")]
                {
                    debug_collision(idx + 1, -gap);
                }
                self.collisions.push(Collision {
                    follower: *follower,
                    leader: *leader,
                    overlap: -gap,
                });
            }
        }
    }

    /// Gets the vehicle ahead of the vehicle at `idx` in the convoy.
    fn leader_at(&self, idx: usize) -> Option<&Vehicle> {
        let leader_idx = idx.checked_sub(1)?;
        self.convoy.get(leader_idx).map(|id| &self.vehicles[*id])
    }

    /// Gets the current simulation frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Gets the simulated time in s.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// The update order used by [Self::step].
    pub fn order(&self) -> UpdateOrder {
        self.order
    }

    /// The number of vehicles in the convoy.
    pub fn len(&self) -> usize {
        self.convoy.len()
    }

    /// Whether the convoy is empty.
    pub fn is_empty(&self) -> bool {
        self.convoy.is_empty()
    }

    /// Returns an iterator over the vehicles, front to back.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = (VehicleId, &Vehicle)> {
        self.convoy.iter().map(|id| (*id, &self.vehicles[*id]))
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(vehicle_id)
    }

    /// Gets the vehicle immediately ahead of the given vehicle, if there is one.
    pub fn leader_of(&self, vehicle_id: VehicleId) -> Option<&Vehicle> {
        let idx = self.convoy.iter().position(|id| *id == vehicle_id)?;
        self.leader_at(idx)
    }

    /// The collisions detected during the previous frame.
    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }

    /// Captures the state of every vehicle, front to back.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            frame: self.frame,
            time: self.time,
            vehicles: self.iter_vehicles().map(|(_, v)| v.state()).collect(),
        }
    }

    /// Gets debugging information from the previously simulated frame.
    #[cfg(feature = "debug")]
    pub fn debug(&self) -> &serde_json::Value {
        &self.debug
    }
}

/// Calculates the acceleration of the vehicle at `idx` in the convoy.
#[allow(unused_variables)]
fn follow(idx: usize, vehicle: &Vehicle, leader: Option<&Vehicle>) -> f64 {
    let acc = vehicle.calculate_acceleration(leader);
    #[cfg(feature = "debug")]
    {
        if let Some(leader) = leader {
            debug_follow(idx, vehicle.gap_to(leader), vehicle.desired_gap_to(leader), acc);
        }
    }
    acc
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn convoy(order: UpdateOrder) -> (Simulation, VehicleId, VehicleId) {
        let mut sim = Simulation::new(order);
        let attribs = VehicleAttributes::default();
        let lead = sim.add_vehicle(&attribs, 50.0, 123.0).unwrap();
        let follow = sim.add_vehicle(&attribs, 0.0, 110.0).unwrap();
        (sim, lead, follow)
    }

    #[test]
    fn rejects_out_of_order() {
        let (mut sim, _, _) = convoy(UpdateOrder::Simultaneous);
        let err = sim
            .add_vehicle(&VehicleAttributes::default(), 10.0, 0.0)
            .unwrap_err();
        assert_eq!(
            err,
            Error::OutOfOrder {
                position: 10.0,
                tail: 0.0
            }
        );
        assert_eq!(sim.len(), 2);
    }

    #[test]
    fn rejects_bad_time_step() {
        let (mut sim, _, _) = convoy(UpdateOrder::Simultaneous);
        assert_eq!(sim.step(-0.1), Err(Error::InvalidTimeStep(-0.1)));
        assert_eq!(sim.frame(), 0);
    }

    #[test]
    fn leader_lookup() {
        let (mut sim, lead, follow) = convoy(UpdateOrder::Simultaneous);
        assert!(sim.leader_of(lead).is_none());
        assert_eq!(sim.leader_of(follow).map(|v| v.pos_front()), Some(50.0));

        let removed = sim.remove_vehicle(lead).unwrap();
        assert_eq!(removed.pos_front(), 50.0);
        assert!(sim.leader_of(follow).is_none());
        assert!(sim.get_vehicle(lead).is_none());
        assert!(sim.remove_vehicle(lead).is_none());
    }

    #[test]
    fn simultaneous_matches_manual_updates() {
        let (mut sim, lead, follow) = convoy(UpdateOrder::Simultaneous);
        let mut leader = sim.get_vehicle(lead).unwrap().clone();
        let mut follower = sim.get_vehicle(follow).unwrap().clone();
        for _ in 0..50 {
            sim.step(0.1).unwrap();
            follower.update(Some(&leader), 0.1).unwrap();
            leader.update(None, 0.1).unwrap();
        }
        assert_eq!(sim.get_vehicle(lead).unwrap().state(), leader.state());
        assert_eq!(sim.get_vehicle(follow).unwrap().state(), follower.state());
    }

    #[test]
    fn leader_first_sees_advanced_leader() {
        let (mut sim, lead, follow) = convoy(UpdateOrder::LeaderFirst);
        let mut leader = sim.get_vehicle(lead).unwrap().clone();
        let mut follower = sim.get_vehicle(follow).unwrap().clone();
        sim.step(0.1).unwrap();
        leader.update(None, 0.1).unwrap();
        follower.update(Some(&leader), 0.1).unwrap();
        assert_eq!(sim.get_vehicle(follow).unwrap().state(), follower.state());
    }

    #[test]
    fn detects_collisions() {
        let mut sim = Simulation::default();
        let attribs = VehicleAttributes::default();
        let lead = sim.add_vehicle(&attribs, 10.0, 0.0).unwrap();
        let follow = sim.add_vehicle(&attribs, 8.0, 0.0).unwrap();
        sim.step(0.1).unwrap();
        let collisions = sim.collisions();
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].leader, lead);
        assert_eq!(collisions[0].follower, follow);
        assert!(collisions[0].overlap > 0.0);
        assert_eq!(sim.get_vehicle(follow).unwrap().vel(), 0.0);
    }

    #[test]
    fn randomised_adjusts_are_clamped_and_seeded() {
        let (mut a, _, _) = convoy(UpdateOrder::Simultaneous);
        let (mut b, _, _) = convoy(UpdateOrder::Simultaneous);
        a.randomise_velocity_adjusts(0.5, &mut StdRng::seed_from_u64(7))
            .unwrap();
        b.randomise_velocity_adjusts(0.5, &mut StdRng::seed_from_u64(7))
            .unwrap();
        for ((_, va), (_, vb)) in a.iter_vehicles().zip(b.iter_vehicles()) {
            assert!(VELOCITY_ADJUST_RANGE.contains(va.velocity_adjust()));
            assert_eq!(va.velocity_adjust(), vb.velocity_adjust());
        }
        assert!(a
            .randomise_velocity_adjusts(-1.0, &mut StdRng::seed_from_u64(7))
            .is_err());
    }
}
