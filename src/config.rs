use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub renderer: RendererConfig,
    pub video: VideoConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RendererConfig {
    pub engine: String, // "native" or "manim"
    pub output_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VideoConfig {
    pub default_resolution: String,
    pub default_fps: u32,
    pub default_language: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            renderer: RendererConfig {
                engine: "native".to_string(),
                output_dir: PathBuf::from("output"),
            },
            video: VideoConfig {
                default_resolution: "1920x1080".to_string(),
                default_fps: 60,
                default_language: "en".to_string(),
            },
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("renderer.engine", "native")?
            .set_default("renderer.output_dir", "output")?
            .set_default("video.default_resolution", "1920x1080")?
            .set_default("video.default_fps", 60)?
            .set_default("video.default_language", "en")?
            // Load from file if exists
            .add_source(config::File::with_name("chalkmotion").required(false))
            // Allow env var overrides (e.g. CHALKMOTION_RENDERER__ENGINE=manim)
            .add_source(config::Environment::with_prefix("CHALKMOTION").separator("__"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.renderer.engine, "native");
        assert_eq!(cfg.video.default_fps, 60);
        assert_eq!(cfg.video.default_resolution, "1920x1080");
    }
}
