use serde::{Deserialize, Serialize};
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use embedded_graphics::pixelcolor::Rgb888;
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::display::layout::{PanelGeometry, Theme};
use crate::display::text::font_by_name;
use crate::weather::Units;

/// Environment fallback for the OpenWeatherMap key.
pub const API_KEY_ENV: &str = "OPENWEATHERMAP_API_KEY";

pub const DEFAULT_PRIMARY_URL: &str = "http://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_SECONDARY_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_REFRESH_SECS: u64 = 900;
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_TICK_MS: u64 = 1000;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration, every field optional so layers can merge.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub tick_ms: Option<u64>,          // overlay cadence
    pub location: Option<LocationConfig>,
    pub weather: Option<WeatherConfig>,
    pub display: Option<DisplayConfig>,
    pub assets: Option<AssetsConfig>,
    pub fonts: Option<FontsConfig>,
    pub theme: Option<ThemeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocationConfig {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub units: Option<Units>,
    pub primary_url: Option<String>,
    pub secondary_url: Option<String>,
    pub secondary_enabled: Option<bool>,
    pub refresh_secs: Option<u64>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub rows: Option<u32>,
    pub cols: Option<u32>,
    pub chain: Option<u32>,
    pub sink: Option<SinkConfig>,      // <- strongly-typed sink selection
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AssetsConfig {
    pub icons_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FontsConfig {
    pub clock: Option<String>,         // e.g. "10x20"
    pub text: Option<String>,          // e.g. "6x12"
}

/// Colours as [r, g, b].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ThemeConfig {
    pub clock: Option<[u8; 3]>,
    pub temperature: Option<[u8; 3]>,
    pub labels: Option<[u8; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Framebuffer {
        device: PathBuf,            // e.g. "/dev/fb0"
        #[serde(default = "default_bpp")]
        bits_per_pixel: u32,        // 16 | 32
        #[serde(default)]
        line_length: Option<u32>,   // bytes per row when padded
    },
    Snapshot {
        path: PathBuf,              // PPM written on every swap
    },
    Mock,
}

fn default_bpp() -> u32 { 32 }

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Framebuffer { device: PathBuf::from("/dev/fb0"), bits_per_pixel: 32, line_length: None }
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "pixclock", about = "LED matrix clock and weather panel", version)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    pub lat: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub lon: Option<f64>,
    /// metric | imperial
    #[arg(long)]
    pub units: Option<Units>,
    #[arg(long)]
    pub api_key: Option<String>,
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub icons_dir: Option<PathBuf>,
    /// Rows per panel
    #[arg(long)]
    pub led_rows: Option<u32>,
    /// Columns per panel
    #[arg(long)]
    pub led_cols: Option<u32>,
    /// Panels chained left to right
    #[arg(long)]
    pub led_chain: Option<u32>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Everything resolved to concrete values, defaults filled in.
#[derive(Debug, Clone)]
pub struct Settings {
    pub log_level: String,
    pub tick: Duration,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub weather: WeatherSettings,
    pub geometry: PanelGeometry,
    pub sink: SinkConfig,
    pub icons_dir: PathBuf,
    pub clock_font: String,
    pub text_font: String,
    pub theme: Theme,
}

#[derive(Debug, Clone)]
pub struct WeatherSettings {
    pub api_key: String,
    pub units: Units,
    pub primary_url: String,
    /// None when the secondary source is disabled
    pub secondary_url: Option<String>,
    pub refresh: Duration,
    pub timeout: Duration,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = load_with(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Layer defaults, YAML and `cli`, then validate.
pub fn load_with(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/pixclock/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/pixclock/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/pixclock.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["pixclock.yaml", "config.yaml", "config/pixclock.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    Ok(cfg)
}

/// Merge one optional section: take `src` whole, or field-merge into `dst`.
fn merge_section<T>(dst: &mut Option<T>, src: Option<T>, fields: impl FnOnce(&mut T, T)) {
    if let Some(s) = src {
        match dst {
            Some(d) => fields(d, s),
            None => *dst = Some(s),
        }
    }
}

/// Shallow merge `src` into `dst`, Option-by-Option.
pub fn merge(dst: &mut Config, src: Config) {
    // top-level
    if src.log_level.is_some()      { dst.log_level = src.log_level; }
    if src.tick_ms.is_some()        { dst.tick_ms = src.tick_ms; }

    merge_section(&mut dst.location, src.location, |d, s| {
        if s.lat.is_some()              { d.lat = s.lat; }
        if s.lon.is_some()              { d.lon = s.lon; }
    });
    merge_section(&mut dst.weather, src.weather, |d, s| {
        if s.api_key.is_some()          { d.api_key = s.api_key; }
        if s.units.is_some()            { d.units = s.units; }
        if s.primary_url.is_some()      { d.primary_url = s.primary_url; }
        if s.secondary_url.is_some()    { d.secondary_url = s.secondary_url; }
        if s.secondary_enabled.is_some() { d.secondary_enabled = s.secondary_enabled; }
        if s.refresh_secs.is_some()     { d.refresh_secs = s.refresh_secs; }
        if s.timeout_ms.is_some()       { d.timeout_ms = s.timeout_ms; }
    });
    merge_section(&mut dst.display, src.display, |d, s| {
        if s.rows.is_some()             { d.rows = s.rows; }
        if s.cols.is_some()             { d.cols = s.cols; }
        if s.chain.is_some()            { d.chain = s.chain; }
        if s.sink.is_some()             { d.sink = s.sink; }
    });
    merge_section(&mut dst.assets, src.assets, |d, s| {
        if s.icons_dir.is_some()        { d.icons_dir = s.icons_dir; }
    });
    merge_section(&mut dst.fonts, src.fonts, |d, s| {
        if s.clock.is_some()            { d.clock = s.clock; }
        if s.text.is_some()             { d.text = s.text; }
    });
    merge_section(&mut dst.theme, src.theme, |d, s| {
        if s.clock.is_some()            { d.clock = s.clock; }
        if s.temperature.is_some()      { d.temperature = s.temperature; }
        if s.labels.is_some()           { d.labels = s.labels; }
    });
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()       { cfg.log_level = cli.log_level.clone(); }

    if cli.lat.is_some() || cli.lon.is_some() {
        let location = cfg.location.get_or_insert_with(LocationConfig::default);
        if cli.lat.is_some()         { location.lat = cli.lat; }
        if cli.lon.is_some()         { location.lon = cli.lon; }
    }

    if cli.units.is_some() || cli.api_key.is_some() {
        let weather = cfg.weather.get_or_insert_with(WeatherConfig::default);
        if cli.units.is_some()       { weather.units = cli.units; }
        if cli.api_key.is_some()     { weather.api_key = cli.api_key.clone(); }
    }

    if cli.icons_dir.is_some() {
        cfg.assets.get_or_insert_with(AssetsConfig::default).icons_dir = cli.icons_dir.clone();
    }

    let any_panel = cli.led_rows.is_some() || cli.led_cols.is_some() || cli.led_chain.is_some();
    if any_panel {
        let display = cfg.display.get_or_insert_with(DisplayConfig::default);
        if cli.led_rows.is_some()    { display.rows = cli.led_rows; }
        if cli.led_cols.is_some()    { display.cols = cli.led_cols; }
        if cli.led_chain.is_some()   { display.chain = cli.led_chain; }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.tick_ms == Some(0) {
        return Err(ConfigError::Validation("tick_ms must be > 0".into()));
    }
    if let Some(location) = cfg.location.as_ref() {
        if let Some(lat) = location.lat {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(ConfigError::Validation(format!("latitude {lat} out of range")));
            }
        }
        if let Some(lon) = location.lon {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(ConfigError::Validation(format!("longitude {lon} out of range")));
            }
        }
    }
    if let Some(weather) = cfg.weather.as_ref() {
        if weather.refresh_secs == Some(0) {
            return Err(ConfigError::Validation("weather refresh_secs must be > 0".into()));
        }
        if weather.timeout_ms == Some(0) {
            return Err(ConfigError::Validation("weather timeout_ms must be > 0".into()));
        }
    }
    if let Some(display) = cfg.display.as_ref() {
        for (name, v) in [("rows", display.rows), ("cols", display.cols), ("chain", display.chain)] {
            if v == Some(0) {
                return Err(ConfigError::Validation(format!("display {name} must be > 0")));
            }
        }
        if let Some(SinkConfig::Framebuffer { bits_per_pixel, .. }) = display.sink.as_ref() {
            match *bits_per_pixel {
                16 | 32 => {},
                _ => return Err(ConfigError::Validation("framebuffer bits_per_pixel must be 16|32".into()))
            }
        }
    }
    if let Some(fonts) = cfg.fonts.as_ref() {
        for name in [fonts.clock.as_deref(), fonts.text.as_deref()].into_iter().flatten() {
            if font_by_name(name).is_none() {
                return Err(ConfigError::Validation(format!("unknown font '{name}'")));
            }
        }
    }
    Ok(())
}

fn rgb(c: Option<[u8; 3]>, fallback: Rgb888) -> Rgb888 {
    c.map(|[r, g, b]| Rgb888::new(r, g, b)).unwrap_or(fallback)
}

impl Config {
    /// Fill every gap with its default.
    pub fn resolve(&self) -> Settings {
        let location = self.location.clone().unwrap_or_default();
        let weather = self.weather.clone().unwrap_or_default();
        let display = self.display.clone().unwrap_or_default();
        let assets = self.assets.clone().unwrap_or_default();
        let fonts = self.fonts.clone().unwrap_or_default();
        let theme = self.theme.clone().unwrap_or_default();

        let defaults = PanelGeometry::default();
        let base = Theme::default();

        let api_key = weather.api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .unwrap_or_default();
        let secondary_url = if weather.secondary_enabled.unwrap_or(true) {
            Some(weather.secondary_url.unwrap_or_else(|| DEFAULT_SECONDARY_URL.to_string()))
        } else {
            None
        };

        Settings {
            log_level: self.log_level.clone().unwrap_or_else(|| "info".to_string()),
            tick: Duration::from_millis(self.tick_ms.unwrap_or(DEFAULT_TICK_MS)),
            latitude: location.lat,
            longitude: location.lon,
            weather: WeatherSettings {
                api_key,
                units: weather.units.unwrap_or_default(),
                primary_url: weather.primary_url.unwrap_or_else(|| DEFAULT_PRIMARY_URL.to_string()),
                secondary_url,
                refresh: Duration::from_secs(weather.refresh_secs.unwrap_or(DEFAULT_REFRESH_SECS)),
                timeout: Duration::from_millis(weather.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
            },
            geometry: PanelGeometry {
                rows: display.rows.unwrap_or(defaults.rows),
                cols: display.cols.unwrap_or(defaults.cols),
                chain: display.chain.unwrap_or(defaults.chain),
            },
            sink: display.sink.unwrap_or_default(),
            icons_dir: assets.icons_dir.unwrap_or_else(|| PathBuf::from("./assets/icons")),
            clock_font: fonts.clock.unwrap_or_else(|| "10x20".to_string()),
            text_font: fonts.text.unwrap_or_else(|| "6x12".to_string()),
            theme: Theme {
                clock: rgb(theme.clock, base.clock),
                labels: rgb(theme.labels, base.labels),
                temperature: rgb(theme.temperature, base.temperature),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
log_level: debug
location:
  lat: 37.77
  lon: -122.42
weather:
  api_key: abc123
  units: metric
  refresh_secs: 600
display:
  chain: 3
  sink:
    type: snapshot
    path: /tmp/pixclock.ppm
fonts:
  clock: 9x18_bold
theme:
  clock: [255, 0, 0]
"#;

    #[test]
    fn test_defaults_resolve() {
        let mut cfg = Config::default();
        cfg.weather = Some(WeatherConfig { api_key: Some("k".into()), ..Default::default() });
        let s = cfg.resolve();
        assert_eq!(s.geometry, PanelGeometry { rows: 64, cols: 64, chain: 2 });
        assert_eq!(s.tick, Duration::from_secs(1));
        assert_eq!(s.weather.refresh, Duration::from_secs(900));
        assert_eq!(s.weather.timeout, Duration::from_millis(3000));
        assert_eq!(s.weather.units, Units::Imperial);
        assert_eq!(s.weather.api_key, "k");
        assert_eq!(s.weather.secondary_url.as_deref(), Some(DEFAULT_SECONDARY_URL));
        assert_eq!(s.clock_font, "10x20");
        assert_eq!(s.text_font, "6x12");
        assert_eq!(s.theme, Theme::default());
        assert!(matches!(s.sink, SinkConfig::Framebuffer { bits_per_pixel: 32, .. }));
    }

    #[test]
    fn test_yaml_parses() {
        let cfg = parse_yaml(YAML).unwrap();
        validate(&cfg).unwrap();
        let s = cfg.resolve();
        assert_eq!(s.log_level, "debug");
        assert_eq!(s.latitude, Some(37.77));
        assert_eq!(s.longitude, Some(-122.42));
        assert_eq!(s.weather.units, Units::Metric);
        assert_eq!(s.weather.refresh, Duration::from_secs(600));
        assert_eq!(s.geometry.chain, 3);
        assert_eq!(s.geometry.rows, 64);
        assert_eq!(s.sink, SinkConfig::Snapshot { path: PathBuf::from("/tmp/pixclock.ppm") });
        assert_eq!(s.clock_font, "9x18_bold");
        assert_eq!(s.theme.clock, Rgb888::new(255, 0, 0));
        assert_eq!(s.theme.labels, Theme::default().labels);
    }

    #[test]
    fn test_cli_overrides_yaml() {
        let mut cfg = parse_yaml(YAML).unwrap();
        let cli = Cli {
            lat: Some(51.5),
            units: Some(Units::Imperial),
            led_rows: Some(32),
            log_level: Some("warn".into()),
            ..Default::default()
        };
        apply_cli_overrides(&mut cfg, &cli);
        let s = cfg.resolve();
        assert_eq!(s.latitude, Some(51.5));
        assert_eq!(s.longitude, Some(-122.42));
        assert_eq!(s.weather.units, Units::Imperial);
        assert_eq!(s.weather.api_key, "abc123");
        assert_eq!(s.geometry, PanelGeometry { rows: 32, cols: 64, chain: 3 });
        assert_eq!(s.log_level, "warn");
    }

    #[test]
    fn test_merge_is_field_wise() {
        let mut base = parse_yaml("weather:\n  api_key: one\n  units: metric\n").unwrap();
        let over = parse_yaml("weather:\n  units: imperial\n").unwrap();
        merge(&mut base, over);
        let w = base.weather.unwrap();
        assert_eq!(w.api_key.as_deref(), Some("one"));
        assert_eq!(w.units, Some(Units::Imperial));
    }

    #[test]
    fn test_validation_rejects() {
        let bad = [
            "display:\n  rows: 0\n",
            "display:\n  sink:\n    type: framebuffer\n    device: /dev/fb0\n    bits_per_pixel: 24\n",
            "location:\n  lat: 91\n",
            "location:\n  lon: -180.5\n",
            "tick_ms: 0\n",
            "weather:\n  refresh_secs: 0\n",
            "fonts:\n  text: 12x24\n",
        ];
        for y in bad {
            let cfg = parse_yaml(y).unwrap();
            assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))), "{y}");
        }
    }

    #[test]
    fn test_secondary_can_be_disabled() {
        let cfg = parse_yaml("weather:\n  api_key: x\n  secondary_enabled: false\n").unwrap();
        assert!(cfg.resolve().weather.secondary_url.is_none());
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let cli = Cli { config: Some(PathBuf::from("/nonexistent/pixclock.yaml")), ..Default::default() };
        assert!(matches!(load_with(&cli), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_framebuffer_sink_defaults() {
        let cfg = parse_yaml("display:\n  sink:\n    type: framebuffer\n    device: /dev/fb1\n").unwrap();
        let s = cfg.resolve();
        assert_eq!(
            s.sink,
            SinkConfig::Framebuffer { device: PathBuf::from("/dev/fb1"), bits_per_pixel: 32, line_length: None }
        );
    }
}
