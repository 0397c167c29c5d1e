/// The smallest net gap fed to the interaction term, in m.
/// Keeps the acceleration finite when vehicles touch or overlap.
pub const MIN_NET_GAP: f64 = 0.01; // m

/// The acceleration model of a vehicle.
#[derive(Clone, Debug)]
pub struct AccelerationModel {
    max_acc: f64,
    comf_dec: f64,
    desired_vel: f64,
    min_gap: f64,
    headway: f64,
    exponent: f64,
    vel_adj: f64,
}

/// The parameters of the acceleration model.
pub struct ModelParams {
    /// The vehicle's maximum acceleration in m/s<sup>2</sup>.
    pub max_acceleration: f64,
    /// The comfortable deceleration in m/s<sup>2</sup>, a positive number.
    pub comf_deceleration: f64,
    /// The free-flow speed the vehicle tends towards in m/s.
    pub desired_velocity: f64,
    /// The standstill gap to the vehicle ahead in m.
    pub min_gap: f64,
    /// The desired gap between this and the vehicle ahead in seconds.
    pub time_headway: f64,
    /// The exponent of the free-road term.
    pub acc_exponent: f64,
}

impl AccelerationModel {
    /// Creates a new acceleration model.
    pub fn new(params: &ModelParams) -> Self {
        AccelerationModel {
            max_acc: params.max_acceleration,
            comf_dec: params.comf_deceleration,
            desired_vel: params.desired_velocity,
            min_gap: params.min_gap,
            headway: params.time_headway,
            exponent: params.acc_exponent,
            vel_adj: 1.0,
        }
    }

    /// Set the desired velocity adjustment factor.
    pub fn set_velocity_adjust(&mut self, factor: f64) {
        self.vel_adj = factor;
    }

    /// Gets the desired velocity adjustment factor.
    pub fn velocity_adjust(&self) -> f64 {
        self.vel_adj
    }

    /// The desired velocity after adjustment, in m/s.
    pub fn desired_velocity(&self) -> f64 {
        self.vel_adj * self.desired_vel
    }

    /// Calculates the acceleration of the vehicle on an empty road.
    ///
    /// # Arguments
    /// * `vel` - The velocity of the simulated vehicle (m/s).
    pub fn free_road(&self, vel: f64) -> f64 {
        self.max_acc * (1. - (vel / self.desired_velocity()).powf(self.exponent))
    }

    /// Calculates the desired dynamic gap to the vehicle ahead, in m.
    ///
    /// # Arguments
    /// * `vel` - The velocity of the simulated vehicle (m/s).
    /// * `appr` - The approach rate, own velocity minus that of the vehicle ahead (m/s).
    pub fn desired_gap(&self, vel: f64, appr: f64) -> f64 {
        let factor = 1. / (2. * (self.max_acc * self.comf_dec).sqrt());
        self.min_gap + f64::max(0., vel * self.headway + vel * appr * factor)
    }

    /// Computes an acceleration using the intelligent driver model.
    ///
    /// # Arguments
    /// * `net_dist` - The distance between this vehicle and the vehicle ahead in metres,
    ///   or infinity if there is none.
    /// * `my_vel` - The velocity of the simulated vehicle (m/s).
    /// * `their_vel` - The vehicle ahead's velocity (m/s).
    pub fn idm(&self, net_dist: f64, my_vel: f64, their_vel: f64) -> f64 {
        let free = self.free_road(my_vel);
        if net_dist == f64::INFINITY {
            return free;
        }
        let net_dist = f64::max(net_dist, MIN_NET_GAP);
        let term = self.desired_gap(my_vel, my_vel - their_vel) / net_dist;
        free - self.max_acc * (term * term)
    }
}
