//! Weather scene wiring: camera, clocks, fixed-step physics, weather state
//! and the scene that ties rain, snow and terrain together.

pub mod camera;
pub mod clock;
pub mod error;
pub mod scene;
pub mod stepper;
pub mod weather;

pub use camera::{Camera, CameraMovement};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::SceneError;
pub use scene::{SceneFrame, WeatherScene};
pub use stepper::{FIXED_DT, FixedStepper, MAX_FRAME_TIME};
pub use weather::{ShaderSelection, WeatherKind, WeatherState};
