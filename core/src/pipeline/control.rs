// zipline/src/pipeline/control.rs

/// Signal from a handler indicating whether the run should go on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  Continue,
  /// Halt the run. No later step executes.
  Stop,
}

/// Outcome of a full pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every non-skipped step ran (best-effort failures included).
  Completed,
  /// A handler returned `PipelineControl::Stop`.
  Stopped,
}
