use crate::storyboard::Storyboard;
use anyhow::{Context, Result};
use std::path::Path;

/// Parser for storyboard files saved as JSON
pub struct StoryboardParser;

impl StoryboardParser {
    /// Parse a JSON storyboard file
    pub fn parse_json(path: &Path) -> Result<Storyboard> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read storyboard file: {}", path.display()))?;

        let storyboard: Storyboard = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON storyboard: {}", path.display()))?;

        Self::validate(&storyboard)?;

        Ok(storyboard)
    }

    /// Validate the storyboard structure
    pub fn validate(storyboard: &Storyboard) -> Result<()> {
        // Validate metadata
        if storyboard.metadata.title.is_empty() {
            anyhow::bail!("Storyboard title cannot be empty");
        }

        if storyboard.metadata.fps == 0 {
            anyhow::bail!("FPS must be greater than 0");
        }

        if storyboard.metadata.duration <= 0.0 {
            anyhow::bail!("Duration must be positive");
        }

        let (width, height) = storyboard.metadata.resolution.dimensions();
        if width == 0 || height == 0 {
            anyhow::bail!("Resolution must be non-zero");
        }

        // Validate scenes
        if storyboard.scenes.is_empty() {
            anyhow::bail!("Storyboard must contain at least one scene");
        }

        for (idx, scene) in storyboard.scenes.iter().enumerate() {
            if scene.id.is_empty() {
                anyhow::bail!("Scene {} has empty ID", idx);
            }

            if scene.duration <= 0.0 {
                anyhow::bail!("Scene '{}' duration must be positive", scene.id);
            }

            if scene.layers.is_empty() {
                anyhow::bail!("Scene '{}' must have at least one layer", scene.id);
            }

            for (layer_idx, layer) in scene.layers.iter().enumerate() {
                for animation in &layer.animations {
                    if animation.start() < 0.0 || animation.duration() < 0.0 {
                        anyhow::bail!(
                            "Scene '{}' layer {} has an animation with negative timing",
                            scene.id,
                            layer_idx
                        );
                    }
                    if animation.end() > scene.duration + 0.01 {
                        anyhow::bail!(
                            "Scene '{}' layer {} has an animation ending at {:.2}s, past the scene's {:.2}s",
                            scene.id,
                            layer_idx,
                            animation.end(),
                            scene.duration
                        );
                    }
                }
            }
        }

        // Validate total duration matches scenes
        let total_scene_duration: f32 = storyboard.scenes.iter().map(|s| s.duration).sum();
        let duration_diff = (total_scene_duration - storyboard.metadata.duration).abs();

        if duration_diff > 0.1 {
            eprintln!(
                "Warning: Total scene duration ({:.2}s) differs from metadata duration ({:.2}s)",
                total_scene_duration, storyboard.metadata.duration
            );
        }

        Ok(())
    }

    /// Get a summary of the storyboard structure
    pub fn summarize(storyboard: &Storyboard) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("Title: {}\n", storyboard.metadata.title));
        summary.push_str(&format!(
            "Resolution: {}x{}\n",
            storyboard.metadata.resolution.dimensions().0,
            storyboard.metadata.resolution.dimensions().1
        ));
        summary.push_str(&format!("FPS: {}\n", storyboard.metadata.fps));
        summary.push_str(&format!("Duration: {:.2}s\n", storyboard.metadata.duration));
        summary.push_str(&format!("Language: {:?}\n", storyboard.metadata.language));
        summary.push_str(&format!("Scenes: {}\n", storyboard.scenes.len()));

        for (idx, scene) in storyboard.scenes.iter().enumerate() {
            let animations: usize = scene.layers.iter().map(|l| l.animations.len()).sum();
            summary.push_str(&format!(
                "  Scene {}: '{}' ({:.2}s, {} layers, {} animations)\n",
                idx + 1,
                scene.id,
                scene.duration,
                scene.layers.len(),
                animations
            ));
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Language;
    use crate::storyboard::{self, Resolution, StoryboardKind};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_board() -> Storyboard {
        storyboard::build(
            StoryboardKind::Pipeline,
            Language::En,
            1,
            Resolution::Named("640x360".into()),
            30,
        )
    }

    #[test]
    fn test_parse_valid_json() {
        let board = sample_board();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&board).unwrap().as_bytes())
            .unwrap();

        let result = StoryboardParser::parse_json(file.path());
        assert!(result.is_ok());
        assert_eq!(result.unwrap().scenes.len(), board.scenes.len());
    }

    #[test]
    fn test_parse_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json ").unwrap();

        let result = StoryboardParser::parse_json(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = StoryboardParser::parse_json(Path::new("/nonexistent/board.json"));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to read storyboard file"));
    }

    #[test]
    fn test_validate_rejects_empty_scenes() {
        let mut board = sample_board();
        board.scenes.clear();
        let result = StoryboardParser::validate(&board);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("at least one scene"));
    }

    #[test]
    fn test_validate_rejects_zero_fps() {
        let mut board = sample_board();
        board.metadata.fps = 0;
        assert!(StoryboardParser::validate(&board).is_err());
    }

    #[test]
    fn test_validate_rejects_layerless_scene() {
        let mut board = sample_board();
        board.scenes[0].layers.clear();
        let result = StoryboardParser::validate(&board);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("at least one layer"));
    }

    #[test]
    fn test_validate_rejects_overlong_animation() {
        let mut board = sample_board();
        let scene_duration = board.scenes[0].duration;
        board.scenes[0].layers[0]
            .animations
            .push(crate::storyboard::Animation::FadeOut {
                start: scene_duration,
                duration: 5.0,
            });
        let result = StoryboardParser::validate(&board);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("ending at"));
    }

    #[test]
    fn test_built_in_storyboards_validate() {
        for kind in [
            StoryboardKind::Clock,
            StoryboardKind::Pipeline,
            StoryboardKind::Network,
        ] {
            for seed in [0, 9, 42] {
                let board = storyboard::build(
                    kind,
                    Language::Tr,
                    seed,
                    Resolution::Named("1920x1080".into()),
                    60,
                );
                StoryboardParser::validate(&board).expect("generated storyboard must validate");
            }
        }
    }

    #[test]
    fn test_summarize() {
        let board = sample_board();
        let summary = StoryboardParser::summarize(&board);
        assert!(summary.contains("Producer-Consumer Mechanism"));
        assert!(summary.contains("640x360"));
        assert!(summary.contains("Scenes: 3"));
    }
}
