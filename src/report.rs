use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::sim::network::NetworkTrace;
use crate::sim::pipeline::PipelineTrace;

/// Statistics of a simulation run, exportable alongside the rendered video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub animation: String,
    pub cycles: u32,
    pub produced: u32,
    pub consumed: u32,
    pub dropped: u32,
    /// Cycles the producer spent waiting on a full buffer (pipeline only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_cycles: Option<u32>,
    /// Drop split around the buffer expansion (network only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropped_before_upgrade: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropped_after_upgrade: Option<u32>,
    pub items_left_in_buffer: u32,
}

impl SimulationReport {
    pub fn from_pipeline(trace: &PipelineTrace) -> Self {
        Self {
            animation: "pipeline".into(),
            cycles: trace.cycles.len() as u32,
            produced: trace.produced,
            consumed: trace.consumed,
            dropped: 0,
            blocked_cycles: Some(trace.blocked),
            dropped_before_upgrade: None,
            dropped_after_upgrade: None,
            items_left_in_buffer: trace.final_len as u32,
        }
    }

    pub fn from_network(trace: &NetworkTrace) -> Self {
        Self {
            animation: "network".into(),
            cycles: trace.cycles.len() as u32,
            produced: trace.produced,
            consumed: trace.consumed,
            dropped: trace.dropped,
            blocked_cycles: None,
            dropped_before_upgrade: Some(trace.dropped_before_upgrade),
            dropped_after_upgrade: Some(trace.dropped_after_upgrade()),
            items_left_in_buffer: trace.final_in_flight as u32,
        }
    }

    /// Render the report as Markdown
    pub fn to_markdown(&self) -> String {
        let mut md = format!(
            "# Simulation Report: {}\n\n- Cycles: {}\n- Produced: {}\n- Consumed: {}\n- Dropped: {}\n",
            self.animation, self.cycles, self.produced, self.consumed, self.dropped
        );
        if let Some(blocked) = self.blocked_cycles {
            md.push_str(&format!("- Producer blocked cycles: {}\n", blocked));
        }
        if let (Some(before), Some(after)) =
            (self.dropped_before_upgrade, self.dropped_after_upgrade)
        {
            md.push_str(&format!(
                "- Dropped before buffer expansion: {}\n- Dropped after buffer expansion: {}\n",
                before, after
            ));
        }
        md.push_str(&format!(
            "- Items left in buffer: {}\n",
            self.items_left_in_buffer
        ));
        md
    }

    /// Write the report to a file: JSON when the extension is `.json`,
    /// Markdown otherwise.
    pub fn export(&self, path: &Path) -> Result<()> {
        let content = if path.extension().map_or(false, |ext| ext == "json") {
            serde_json::to_string_pretty(self)?
        } else {
            self.to_markdown()
        };
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_pipeline_report_totals() {
        let mut rng = StdRng::seed_from_u64(8);
        let trace = crate::sim::pipeline::run(&mut rng);
        let report = SimulationReport::from_pipeline(&trace);
        assert_eq!(report.cycles, 8);
        assert_eq!(report.produced - report.consumed, report.items_left_in_buffer);
        assert!(report.dropped_before_upgrade.is_none());
    }

    #[test]
    fn test_network_report_split_adds_up() {
        let mut rng = StdRng::seed_from_u64(8);
        let trace = crate::sim::network::run(&mut rng);
        let report = SimulationReport::from_network(&trace);
        assert_eq!(
            report.dropped_before_upgrade.unwrap() + report.dropped_after_upgrade.unwrap(),
            report.dropped
        );
    }

    #[test]
    fn test_markdown_mentions_blocked_cycles() {
        let mut rng = StdRng::seed_from_u64(8);
        let trace = crate::sim::pipeline::run(&mut rng);
        let report = SimulationReport::from_pipeline(&trace);
        let md = report.to_markdown();
        assert!(md.contains("Producer blocked cycles"));
        assert!(md.starts_with("# Simulation Report: pipeline"));
    }

    #[test]
    fn test_export_json_and_markdown() {
        let mut rng = StdRng::seed_from_u64(8);
        let trace = crate::sim::network::run(&mut rng);
        let report = SimulationReport::from_network(&trace);
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("report.json");
        report.export(&json_path).unwrap();
        let text = std::fs::read_to_string(&json_path).unwrap();
        let back: SimulationReport = serde_json::from_str(&text).unwrap();
        assert_eq!(back.dropped, report.dropped);

        let md_path = dir.path().join("report.md");
        report.export(&md_path).unwrap();
        assert!(std::fs::read_to_string(&md_path)
            .unwrap()
            .contains("buffer expansion"));
    }
}
