use rand::Rng;
use std::f32::consts::TAU;

/// One of the four 90-degree sectors around the listener, clockwise from
/// angle 0, each tied to a primary speaker of the 5.1 layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    FrontRight,
    RearRight,
    RearLeft,
    FrontLeft,
}

impl Quadrant {
    pub fn from_angle(angle: f32) -> Self {
        let sector = (angle.rem_euclid(TAU) / (TAU / 4.0)) as usize % 4;
        match sector {
            0 => Self::FrontRight,
            1 => Self::RearRight,
            2 => Self::RearLeft,
            _ => Self::FrontLeft,
        }
    }

    /// Azimuth of the sector center, where the primary speaker sits.
    pub fn center_angle(&self) -> f32 {
        let sector = match self {
            Self::FrontRight => 0.0,
            Self::RearRight => 1.0,
            Self::RearLeft => 2.0,
            Self::FrontLeft => 3.0,
        };
        (sector + 0.5) * (TAU / 4.0)
    }
}

/// Polar position around the fixed listener at the origin.
///
/// The angle is always normalized to `[0, 2*pi)` and the distance is clamped
/// to `[0, max_radius]` by every constructor, so a `Position` never holds an
/// out-of-area value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    angle: f32,
    distance: f32,
}

impl Position {
    pub fn new(angle: f32, distance: f32, max_radius: f32) -> Self {
        Self {
            angle: angle.rem_euclid(TAU),
            distance: distance.clamp(0.0, max_radius),
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R, max_radius: f32) -> Self {
        Self::new(
            rng.random_range(0.0..TAU),
            rng.random_range(0.0..=max_radius),
            max_radius,
        )
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn quadrant(&self) -> Quadrant {
        Quadrant::from_angle(self.angle)
    }

    pub fn to_cartesian(&self) -> (f32, f32) {
        (
            self.distance * self.angle.cos(),
            self.distance * self.angle.sin(),
        )
    }

    /// Positions past `max_radius` keep their angle and land on the boundary.
    pub fn from_cartesian(x: f32, y: f32, max_radius: f32) -> Self {
        let distance = (x * x + y * y).sqrt();
        let angle = if distance > 0.0 { y.atan2(x) } else { 0.0 };
        Self::new(angle, distance, max_radius)
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let (x1, y1) = self.to_cartesian();
        let (x2, y2) = other.to_cartesian();
        ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
    }

    /// Walk a step of the given magnitude in a uniformly random direction.
    ///
    /// The step happens in cartesian space and the result is converted back
    /// to polar. Perturbing the polar coordinates directly would make small
    /// steps near the origin look like huge angular jumps.
    pub fn walk<R: Rng + ?Sized>(&self, step: f32, rng: &mut R, max_radius: f32) -> Self {
        let direction = rng.random_range(0.0..TAU);
        let (x, y) = self.to_cartesian();
        Self::from_cartesian(
            x + step * direction.cos(),
            y + step * direction.sin(),
            max_radius,
        )
    }
}
