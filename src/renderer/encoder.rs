use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

/// Handles video encoding using an external FFmpeg process
pub struct VideoEncoder;

impl VideoEncoder {
    /// Check if FFmpeg is available
    pub fn is_available() -> bool {
        Command::new("ffmpeg").arg("-version").output().is_ok()
    }

    /// Encode a sequence of frames to a video file
    ///
    /// # Arguments
    /// * `frame_pattern` - Pattern for input frames (e.g., "output/frame_%d.ppm")
    /// * `output_path` - Path for the output video (e.g., "output.mp4")
    /// * `fps` - Frames per second
    /// * `width` - Video width
    /// * `height` - Video height
    pub fn encode(
        frame_pattern: &str,
        output_path: &Path,
        fps: u32,
        width: u32,
        height: u32,
    ) -> Result<()> {
        if !Self::is_available() {
            anyhow::bail!("FFmpeg not found. Please install ffmpeg to enable video encoding.");
        }

        println!("🎥 Encoding video to {}...", output_path.display());

        let status = Command::new("ffmpeg")
            .arg("-y") // Overwrite output
            .arg("-f")
            .arg("image2") // Input format
            .arg("-framerate")
            .arg(fps.to_string())
            .arg("-i")
            .arg(frame_pattern)
            .arg("-c:v")
            .arg("libx264") // Video codec
            .arg("-pix_fmt")
            .arg("yuv420p") // Pixel format for compatibility
            .arg("-s")
            .arg(format!("{}x{}", width, height))
            .arg(output_path)
            .status()
            .context("Failed to execute ffmpeg")?;

        if !status.success() {
            anyhow::bail!("FFmpeg encoding failed");
        }

        Ok(())
    }

    /// Concatenate already-encoded clips into one file, in order. Used by the
    /// external-engine backend, which renders one clip per scene.
    pub fn concat(clips: &[std::path::PathBuf], output_path: &Path) -> Result<()> {
        if !Self::is_available() {
            anyhow::bail!("FFmpeg not found. Please install ffmpeg to enable video encoding.");
        }
        if clips.is_empty() {
            anyhow::bail!("No clips to concatenate");
        }

        let list_path = output_path.with_extension("clips.txt");
        let mut list = String::new();
        for clip in clips {
            let absolute = std::fs::canonicalize(clip)
                .with_context(|| format!("Missing clip: {}", clip.display()))?;
            list.push_str(&format!("file '{}'\n", absolute.display()));
        }
        std::fs::write(&list_path, list)
            .with_context(|| format!("Failed to write concat list: {}", list_path.display()))?;

        let status = Command::new("ffmpeg")
            .arg("-y")
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .arg("-i")
            .arg(&list_path)
            .arg("-c")
            .arg("copy")
            .arg(output_path)
            .status()
            .context("Failed to execute ffmpeg")?;

        let _ = std::fs::remove_file(&list_path);

        if !status.success() {
            anyhow::bail!("FFmpeg concat failed");
        }
        Ok(())
    }
}
