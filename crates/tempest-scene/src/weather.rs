//! Weather toggles and the surface wetness/snow cover ramps.

use tempest_config::WeatherConfig;
use tracing::info;

/// A kind of precipitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherKind {
    Rain,
    Snow,
}

/// Which terrain shader the renderer should bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderSelection {
    Normal,
    /// Wet surfaces; reads the wet level.
    Wet,
    /// Snow cover; reads the snow level.
    Snow,
}

/// Rain/snow/fog switches and the levels they drive.
///
/// Rain and snow never run together. Enabling one restarts its level from
/// `level_start`; each frame the wet level rises towards `wet_max` and the
/// snow level falls towards `snow_min`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherState {
    rain: bool,
    snow: bool,
    fog: bool,
    wet_level: f32,
    snow_level: f32,
    config: WeatherConfig,
}

impl WeatherState {
    /// Starts from the configured toggles; rain wins if both are set.
    pub fn from_config(config: &WeatherConfig) -> Self {
        let mut state = Self {
            rain: false,
            snow: false,
            fog: config.fog,
            wet_level: config.level_start,
            snow_level: config.level_start,
            config: config.clone(),
        };
        if config.rain {
            state.set(Some(WeatherKind::Rain));
        } else if config.snow {
            state.set(Some(WeatherKind::Snow));
        }
        state
    }

    pub fn is_raining(&self) -> bool {
        self.rain
    }

    pub fn is_snowing(&self) -> bool {
        self.snow
    }

    pub fn fog_active(&self) -> bool {
        self.fog
    }

    pub fn wet_level(&self) -> f32 {
        self.wet_level
    }

    pub fn snow_level(&self) -> f32 {
        self.snow_level
    }

    /// Current precipitation, if any.
    pub fn current(&self) -> Option<WeatherKind> {
        if self.rain {
            Some(WeatherKind::Rain)
        } else if self.snow {
            Some(WeatherKind::Snow)
        } else {
            None
        }
    }

    /// Switches rain on or off. Snow always ends.
    pub fn toggle_rain(&mut self) {
        let next = (!self.rain).then_some(WeatherKind::Rain);
        self.set(next);
    }

    /// Switches snow on or off. Rain always ends.
    pub fn toggle_snow(&mut self) {
        let next = (!self.snow).then_some(WeatherKind::Snow);
        self.set(next);
    }

    pub fn toggle_fog(&mut self) {
        self.fog = !self.fog;
        info!(fog = self.fog, "fog toggled");
    }

    /// Selects the precipitation and restarts its level.
    pub fn set(&mut self, kind: Option<WeatherKind>) {
        self.rain = kind == Some(WeatherKind::Rain);
        self.snow = kind == Some(WeatherKind::Snow);
        match kind {
            Some(WeatherKind::Rain) => self.wet_level = self.config.level_start,
            Some(WeatherKind::Snow) => self.snow_level = self.config.level_start,
            None => {}
        }
        info!(rain = self.rain, snow = self.snow, "weather changed");
    }

    /// Advances the active level by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        if self.snow && self.config.snow_ramp_seconds > 0.0 {
            self.snow_level =
                (self.snow_level - dt / self.config.snow_ramp_seconds).max(self.config.snow_min);
        }
        if self.rain && self.config.wet_ramp_seconds > 0.0 {
            self.wet_level =
                (self.wet_level + dt / self.config.wet_ramp_seconds).min(self.config.wet_max);
        }
    }

    pub fn shader(&self) -> ShaderSelection {
        match self.current() {
            Some(WeatherKind::Rain) => ShaderSelection::Wet,
            Some(WeatherKind::Snow) => ShaderSelection::Snow,
            None => ShaderSelection::Normal,
        }
    }

    /// Level uniform for the selected shader.
    pub fn shader_level(&self) -> Option<f32> {
        match self.shader() {
            ShaderSelection::Wet => Some(self.wet_level),
            ShaderSelection::Snow => Some(self.snow_level),
            ShaderSelection::Normal => None,
        }
    }
}

impl Default for WeatherState {
    fn default() -> Self {
        Self::from_config(&WeatherConfig::default())
    }
}
