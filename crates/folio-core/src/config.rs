use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub reveal: RevealConfig,
    #[serde(default)]
    pub lazy_load: LazyLoadConfig,
    #[serde(default)]
    pub count_up: CountUpConfig,
    #[serde(default)]
    pub typing: TypingConfig,
    #[serde(default)]
    pub cursor: CursorConfig,
    #[serde(default)]
    pub scroll_top: ScrollTopConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
}

/// Deployment environment; the performance monitor only runs in development
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

/// What the composer does when a controller fails to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failure and keep constructing the remaining controllers
    #[default]
    Isolate,
    /// Abandon the remaining controllers after the first failure
    FailFast,
}

/// Easing curve applied to animation progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingType {
    /// Jump to the end value when the duration elapses
    None,
    Linear,
    /// 1 - (1-t)^3
    #[default]
    Cubic,
    /// 1 - (1-t)^5
    Quintic,
    /// 1 - 2^(-10t)
    EaseOut,
}

impl std::str::FromStr for EasingType {
    type Err = crate::Error;

    /// Case-insensitive; `ease_out`, `ease-out` and `EaseOut` are the same curve
    fn from_str(name: &str) -> crate::Result<Self> {
        let folded: String = name
            .chars()
            .filter(|c| !matches!(c, '_' | '-'))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match folded.as_str() {
            "none" => Ok(Self::None),
            "linear" => Ok(Self::Linear),
            "cubic" => Ok(Self::Cubic),
            "quintic" => Ok(Self::Quintic),
            "easeout" => Ok(Self::EaseOut),
            _ => Err(crate::Error::Config(format!("unknown easing '{}'", name))),
        }
    }
}

impl<'de> Deserialize<'de> for EasingType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};
        use std::fmt;

        struct EasingVisitor;

        impl Visitor<'_> for EasingVisitor {
            type Value = EasingType;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an easing name: none, linear, cubic, quintic or ease_out")
            }

            fn visit_str<E>(self, value: &str) -> Result<EasingType, E>
            where
                E: de::Error,
            {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(EasingVisitor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            environment: Environment::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_birth_year")]
    pub birth_year: i32,
    #[serde(default = "default_career_start_year")]
    pub career_start_year: i32,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            birth_year: default_birth_year(),
            career_start_year: default_career_start_year(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Height of the fixed navigation bar, subtracted from scroll targets
    #[serde(default = "default_nav_height")]
    pub nav_height: f64,
    /// Offset added to the scroll position when picking the active section
    #[serde(default = "default_scroll_offset")]
    pub scroll_offset: f64,
    /// Scroll position past which the nav gets the `scrolled` class
    #[serde(default = "default_scrolled_threshold")]
    pub scrolled_threshold: f64,
    #[serde(default = "default_scroll_throttle")]
    pub scroll_throttle_ms: u64,
    #[serde(default = "default_resize_debounce")]
    pub resize_debounce_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            nav_height: default_nav_height(),
            scroll_offset: default_scroll_offset(),
            scrolled_threshold: default_scrolled_threshold(),
            scroll_throttle_ms: default_scroll_throttle(),
            resize_debounce_ms: default_resize_debounce(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealConfig {
    #[serde(default = "default_visibility_threshold")]
    pub threshold: f64,
    /// CSS margin shorthand, e.g. "0px 0px -50px 0px"
    #[serde(default = "default_reveal_margin")]
    pub root_margin: String,
    #[serde(default = "default_reveal_selector")]
    pub selector: String,
    #[serde(default = "default_hover_selector")]
    pub hover_selector: String,
    #[serde(default = "default_hover_lift")]
    pub hover_lift_px: f64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            threshold: default_visibility_threshold(),
            root_margin: default_reveal_margin(),
            selector: default_reveal_selector(),
            hover_selector: default_hover_selector(),
            hover_lift_px: default_hover_lift(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LazyLoadConfig {
    #[serde(default = "default_visibility_threshold")]
    pub threshold: f64,
    #[serde(default = "default_lazy_margin")]
    pub root_margin: String,
}

impl Default for LazyLoadConfig {
    fn default() -> Self {
        Self {
            threshold: default_visibility_threshold(),
            root_margin: default_lazy_margin(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountUpConfig {
    #[serde(default = "default_count_up_duration")]
    pub duration_ms: u64,
    #[serde(default = "default_count_up_threshold")]
    pub threshold: f64,
    /// Overrides `animation.easing` for counters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<EasingType>,
}

impl Default for CountUpConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_count_up_duration(),
            threshold: default_count_up_threshold(),
            easing: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Words cycled through by the typing effect
    #[serde(default = "default_typing_words")]
    pub words: Vec<String>,
    #[serde(default = "default_type_ms")]
    pub type_ms: u64,
    #[serde(default = "default_delete_ms")]
    pub delete_ms: u64,
    #[serde(default = "default_pause_full_ms")]
    pub pause_full_ms: u64,
    #[serde(default = "default_pause_empty_ms")]
    pub pause_empty_ms: u64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            words: default_typing_words(),
            type_ms: default_type_ms(),
            delete_ms: default_delete_ms(),
            pause_full_ms: default_pause_full_ms(),
            pause_empty_ms: default_pause_empty_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fraction of the remaining distance covered each frame
    #[serde(default = "default_follow_factor")]
    pub follow_factor: f64,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            follow_factor: default_follow_factor(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollTopConfig {
    #[serde(default = "default_show_after")]
    pub show_after: f64,
}

impl Default for ScrollTopConfig {
    fn default() -> Self {
        Self {
            show_after: default_show_after(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Frame rate of the real-time driver
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Curve for tweens that do not configure their own
    #[serde(default)]
    pub easing: EasingType,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            easing: EasingType::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_birth_year() -> i32 {
    1989
}

fn default_career_start_year() -> i32 {
    2014
}

fn default_nav_height() -> f64 {
    70.0
}

fn default_scroll_offset() -> f64 {
    100.0
}

fn default_scrolled_threshold() -> f64 {
    50.0
}

fn default_scroll_throttle() -> u64 {
    16 // ~60fps
}

fn default_resize_debounce() -> u64 {
    250
}

fn default_visibility_threshold() -> f64 {
    0.1
}

fn default_reveal_margin() -> String {
    "0px 0px -50px 0px".to_string()
}

fn default_lazy_margin() -> String {
    "50px".to_string()
}

fn default_reveal_selector() -> String {
    ".timeline-item, .project-card, .skill-category".to_string()
}

fn default_hover_selector() -> String {
    ".project-card, .document-card, .video-card, .photo-card".to_string()
}

fn default_hover_lift() -> f64 {
    4.0
}

fn default_count_up_duration() -> u64 {
    2000
}

fn default_count_up_threshold() -> f64 {
    0.5
}

fn default_typing_words() -> Vec<String> {
    vec![
        "Software Engineer".to_string(),
        "Systems Builder".to_string(),
        "Problem Solver".to_string(),
    ]
}

fn default_type_ms() -> u64 {
    100
}

fn default_delete_ms() -> u64 {
    50
}

fn default_pause_full_ms() -> u64 {
    2000
}

fn default_pause_empty_ms() -> u64 {
    500
}

fn default_follow_factor() -> f64 {
    0.1
}

fn default_show_after() -> f64 {
    300.0
}

/// Highest frame rate the real-time driver accepts
pub const MAX_FPS: u32 = 1000;

fn default_fps() -> u32 {
    60
}

impl AppConfig {
    /// Load configuration from the default path or return defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path; a missing file yields defaults
    pub fn load_from(path: &std::path::Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Easing for count-up tweens
    pub fn count_up_easing(&self) -> EasingType {
        self.count_up.easing.unwrap_or(self.animation.easing)
    }

    /// Serialize to pretty TOML
    pub fn to_toml(&self) -> crate::Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Reject values no controller can work with
    pub fn validate(&self) -> crate::Result<()> {
        for (name, threshold) in [
            ("reveal.threshold", self.reveal.threshold),
            ("lazy_load.threshold", self.lazy_load.threshold),
            ("count_up.threshold", self.count_up.threshold),
        ] {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(crate::Error::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, threshold
                )));
            }
        }
        let factor = self.cursor.follow_factor;
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(crate::Error::Config(format!(
                "cursor.follow_factor must be within (0, 1], got {}",
                factor
            )));
        }
        if !(1..=MAX_FPS).contains(&self.animation.fps) {
            return Err(crate::Error::Config(format!(
                "animation.fps must be within [1, {}], got {}",
                MAX_FPS, self.animation.fps
            )));
        }
        Ok(())
    }

    /// Get the configuration file path
    /// Always uses ~/.config/folio/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("folio")
            .join("config.toml")
    }
}
