use self::acceleration::AccelerationModel;
use crate::error::check_time_step;
use crate::util::Interval;
use crate::Error;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod acceleration;

/// The length of every simulated vehicle in m.
pub const VEHICLE_LENGTH: f64 = 3.0; // m

/// Vehicles slower than this are considered stopped, in m/s.
const STOPPED_VEL: f64 = 0.1; // m/s

/// A simulated vehicle.
///
/// The vehicle's position is the longitudinal position of its front bumper;
/// its rear bumper lies [VEHICLE_LENGTH] behind.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's length in m.
    length: f64,
    /// The acceleration model
    model: AccelerationModel,
    /// The longitudinal position of the front of the vehicle, in m.
    pos: f64,
    /// The velocity in m/s.
    vel: f64,
    /// The acceleration applied during the last update, in m/s^2.
    acc: f64,
}

/// The attributes of a simulated vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct VehicleAttributes {
    /// The maximum acceleration of the vehicle, in m/s^2.
    pub max_acceleration: f64,
    /// The free-flow speed the vehicle tends towards, in m/s.
    pub desired_speed: f64,
    /// The bumper-to-bumper gap kept at standstill, in m.
    pub min_gap: f64,
    /// The desired time gap to the vehicle ahead, in s.
    pub time_headway: f64,
    /// The comfortable deceleration of the vehicle, a positive number in m/s^2.
    pub comf_braking: f64,
    /// The exponent of the free-road term, typically 4.
    pub acc_exponent: f64,
}

/// The kinematic state of a vehicle at an instant.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleState {
    /// Position of the front bumper in m.
    pub position: f64,
    /// Speed in m/s.
    pub speed: f64,
    /// Acceleration applied during the last update in m/s^2.
    pub acceleration: f64,
}

impl Default for VehicleAttributes {
    fn default() -> Self {
        Self {
            max_acceleration: 1.0,
            desired_speed: 120.0,
            min_gap: 5.0,
            time_headway: 1.5,
            comf_braking: 2.0,
            acc_exponent: 4.0,
        }
    }
}

impl VehicleAttributes {
    /// Checks that every parameter is finite and within range.
    pub fn validate(&self) -> Result<(), Error> {
        let positive = [
            ("max_acceleration", self.max_acceleration),
            ("desired_speed", self.desired_speed),
            ("comf_braking", self.comf_braking),
            ("acc_exponent", self.acc_exponent),
        ];
        let non_negative = [
            ("min_gap", self.min_gap),
            ("time_headway", self.time_headway),
        ];
        let bad_positive = positive
            .into_iter()
            .find(|(_, value)| !(value.is_finite() && *value > 0.0));
        let bad_non_negative = non_negative
            .into_iter()
            .find(|(_, value)| !(value.is_finite() && *value >= 0.0));
        match bad_positive.or(bad_non_negative) {
            Some((name, value)) => Err(Error::InvalidParameter { name, value }),
            None => Ok(()),
        }
    }
}

impl Vehicle {
    /// Creates a new vehicle with its front bumper at `position`, travelling at `speed`.
    pub fn new(attributes: &VehicleAttributes, position: f64, speed: f64) -> Result<Self, Error> {
        attributes.validate()?;
        if !position.is_finite() {
            return Err(Error::InvalidParameter {
                name: "position",
                value: position,
            });
        }
        if !(speed.is_finite() && speed >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "speed",
                value: speed,
            });
        }
        Ok(Self {
            length: VEHICLE_LENGTH,
            model: AccelerationModel::new(&acceleration::ModelParams {
                max_acceleration: attributes.max_acceleration,
                comf_deceleration: attributes.comf_braking,
                desired_velocity: attributes.desired_speed,
                min_gap: attributes.min_gap,
                time_headway: attributes.time_headway,
                acc_exponent: attributes.acc_exponent,
            }),
            pos: position,
            vel: speed,
            acc: 0.0,
        })
    }

    /// The vehicle's length in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// The longitudinal position of the front of the vehicle in m.
    pub fn pos_front(&self) -> f64 {
        self.pos
    }

    /// The longitudinal position of the rear of the vehicle in m.
    pub fn pos_rear(&self) -> f64 {
        self.pos - self.length
    }

    /// The longitudinal extent of the vehicle, rear to front.
    pub fn extent(&self) -> Interval<f64> {
        Interval::new(self.pos_rear(), self.pos_front())
    }

    /// The vehicle's velocity in m/s.
    pub fn vel(&self) -> f64 {
        self.vel
    }

    /// The acceleration applied during the last update in m/s^2.
    pub fn acc(&self) -> f64 {
        self.acc
    }

    /// The kinematic state of the vehicle.
    pub fn state(&self) -> VehicleState {
        VehicleState {
            position: self.pos,
            speed: self.vel,
            acceleration: self.acc,
        }
    }

    /// The speed the vehicle tends towards on an empty road, in m/s.
    pub fn desired_speed(&self) -> f64 {
        self.model.desired_velocity()
    }

    /// Whether the vehicle is stopped.
    pub fn has_stopped(&self) -> bool {
        self.vel < STOPPED_VEL
    }

    /// Set the desired velocity adjustment factor for the vehicle, a scalar which is
    /// multiplied with the desired speed prior to calculating the acceleration.
    pub fn set_velocity_adjust(&mut self, factor: f64) {
        self.model.set_velocity_adjust(factor);
    }

    /// Gets the desired velocity adjustment factor. [Read more](Self::set_velocity_adjust).
    pub fn velocity_adjust(&self) -> f64 {
        self.model.velocity_adjust()
    }

    /// The net distance between the front of this vehicle and the rear of `leader`.
    /// Negative when the two overlap.
    pub fn gap_to(&self, leader: &Vehicle) -> f64 {
        leader.pos_rear() - self.pos_front()
    }

    /// The dynamic gap this vehicle wants to keep to `leader`, in m.
    pub fn desired_gap_to(&self, leader: &Vehicle) -> f64 {
        self.model.desired_gap(self.vel, self.vel - leader.vel)
    }

    /// Calculates the vehicle's acceleration given the vehicle ahead of it, if any.
    pub fn calculate_acceleration(&self, leader: Option<&Vehicle>) -> f64 {
        match leader {
            Some(leader) => self.model.idm(self.gap_to(leader), self.vel, leader.vel),
            None => self.model.idm(f64::INFINITY, self.vel, 0.0),
        }
    }

    /// Advances the vehicle by `dt` seconds, following `leader` if there is one.
    pub fn update(&mut self, leader: Option<&Vehicle>, dt: f64) -> Result<(), Error> {
        check_time_step(dt)?;
        let acc = self.calculate_acceleration(leader);
        self.integrate(acc, dt);
        Ok(())
    }

    /// Integrates the vehicle's velocity and position under a constant acceleration.
    ///
    /// # Parameters
    /// * `acc` - The acceleration over the interval in m/s^2
    /// * `dt` - The time step in seconds
    pub(crate) fn integrate(&mut self, acc: f64, dt: f64) {
        let vel = self.vel + dt * acc;
        let disp = if vel < 0.0 {
            // Halts part way through the interval: move the stopping distance, not
            // `v·dt + ½·a·dt²`, which would carry the vehicle backwards.
            0.5 * self.vel * self.vel / -acc
        } else {
            self.vel * dt + 0.5 * acc * dt * dt
        };
        self.vel = f64::max(vel, 0.0);
        self.pos += disp;
        self.acc = acc;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn vehicle(position: f64, speed: f64) -> Vehicle {
        Vehicle::new(&VehicleAttributes::default(), position, speed).unwrap()
    }

    #[test]
    fn rejects_bad_attributes() {
        let attribs = VehicleAttributes {
            desired_speed: 0.0,
            ..Default::default()
        };
        assert_eq!(
            Vehicle::new(&attribs, 0.0, 0.0).unwrap_err(),
            Error::InvalidParameter {
                name: "desired_speed",
                value: 0.0
            }
        );

        let attribs = VehicleAttributes {
            min_gap: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            attribs.validate(),
            Err(Error::InvalidParameter { name: "min_gap", .. })
        ));

        let attribs = VehicleAttributes {
            comf_braking: f64::NAN,
            ..Default::default()
        };
        assert!(attribs.validate().is_err());

        let zero_headway = VehicleAttributes {
            min_gap: 0.0,
            time_headway: 0.0,
            ..Default::default()
        };
        assert!(zero_headway.validate().is_ok());
    }

    #[test]
    fn rejects_bad_state() {
        let attribs = VehicleAttributes::default();
        assert!(Vehicle::new(&attribs, 0.0, -1.0).is_err());
        assert!(Vehicle::new(&attribs, f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn rejects_bad_time_step() {
        let mut veh = vehicle(0.0, 10.0);
        for dt in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                veh.update(None, dt),
                Err(Error::InvalidTimeStep(_))
            ));
        }
        assert_eq!(veh.pos_front(), 0.0);
        assert_eq!(veh.vel(), 10.0);
    }

    #[test]
    fn gap_uses_leader_rear() {
        let follower = vehicle(0.0, 0.0);
        let leader = vehicle(50.0, 0.0);
        assert_approx_eq!(leader.pos_rear(), 47.0);
        assert_approx_eq!(follower.gap_to(&leader), 47.0);
        assert!(!follower.extent().overlaps(&leader.extent()));
    }

    #[test]
    fn zero_interaction() {
        let veh = vehicle(0.0, 80.0);
        let expected = 1.0 * (1.0 - (80.0f64 / 120.0).powf(4.0));
        assert_eq!(veh.calculate_acceleration(None), expected);
    }

    #[test]
    fn brakes_when_too_close() {
        let follower = vehicle(0.0, 10.0);
        let leader = vehicle(20.0, 10.0);
        assert!(follower.gap_to(&leader) < follower.desired_gap_to(&leader));
        assert!(follower.calculate_acceleration(Some(&leader)) < 0.0);
    }

    #[test]
    fn integrates_with_previous_speed() {
        let mut veh = vehicle(0.0, 10.0);
        let acc = veh.calculate_acceleration(None);
        veh.update(None, 0.5).unwrap();
        assert_approx_eq!(veh.vel(), 10.0 + 0.5 * acc);
        assert_approx_eq!(veh.pos_front(), 10.0 * 0.5 + 0.5 * acc * 0.25);
        assert_eq!(veh.acc(), acc);
    }

    #[test]
    fn speed_never_negative() {
        let mut follower = vehicle(0.0, 1.0);
        let leader = vehicle(3.5, 0.0);
        follower.update(Some(&leader), 5.0).unwrap();
        assert_eq!(follower.vel(), 0.0);
        assert!(follower.pos_front() >= 0.0);
        assert!(follower.pos_front() < 0.01);
        assert!(follower.has_stopped());
    }

    #[test]
    fn free_road_converges() {
        let attribs = VehicleAttributes {
            desired_speed: 30.0,
            ..Default::default()
        };
        let mut veh = Vehicle::new(&attribs, 0.0, 0.0).unwrap();
        let mut prev = veh.vel();
        for _ in 0..20_000 {
            veh.update(None, 0.05).unwrap();
            assert!(veh.vel() <= 30.0);
            assert!(veh.vel() >= prev);
            prev = veh.vel();
        }
        assert_approx_eq!(veh.vel(), 30.0, 1e-6);
        assert_approx_eq!(veh.calculate_acceleration(None), 0.0, 1e-6);
    }
}
