//! Types and math shared by the pendulum server and its clients.
//!
//! Everything here is pure: the angle model, the screen projection and the
//! pairwise collision scan take a clock reading as input and never touch I/O.

pub mod collision;
pub mod config;
pub mod error;
pub mod motion;
pub mod pendulum;
pub mod protocol;
pub mod vec2;

pub use collision::{find_collision, CollisionPair};
pub use config::LayoutConfig;
pub use error::ParamError;
pub use motion::{bob_position, current_angle, effective_angle, GRAVITY};
pub use pendulum::{NewPendulum, Pendulum, PendulumPatch};
pub use vec2::Vec2;
