// zipline/src/pipeline/execution.rs

//! `Pipeline::run()`: executes steps in order against one shared context.

use crate::error::PipelineError;
use crate::pipeline::context_data::ContextData;
use crate::pipeline::control::{PipelineControl, PipelineResult};
use crate::pipeline::definition::Pipeline;
use tracing::{event, instrument, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  /// Runs every step. A required step's error aborts the run and is returned;
  /// a best-effort step's error is logged and the next step runs.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      pipeline_context_data_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name_str = step_def.name.as_str();

      if let Some(skip_cond_fn) = &step_def.skip_if {
        if skip_cond_fn(&ctx_data) {
          event!(Level::DEBUG, step_name = step_name_str, "Step skipped.");
          continue;
        }
      }

      let handlers = match self.on.get(step_name_str) {
        Some(handlers) if !handlers.is_empty() => handlers,
        _ if step_def.best_effort => {
          event!(Level::DEBUG, step_name = step_name_str, "Best-effort step has no handlers, skipping.");
          continue;
        }
        _ => {
          event!(Level::ERROR, step_name = step_name_str, "Required step has no handlers.");
          return Err(Err::from(PipelineError::HandlerMissing {
            step_name: step_def.name.clone(),
          }));
        }
      };

      let step_span = tracing::info_span!(
        "pipeline_step",
        step_name = step_name_str,
        step_index = step_idx,
        best_effort = step_def.best_effort
      );

      for handler_fn in handlers {
        match handler_fn(ctx_data.clone()).instrument(step_span.clone()).await {
          Ok(PipelineControl::Continue) => {}
          Ok(PipelineControl::Stop) => {
            event!(Level::INFO, step_name = step_name_str, "Pipeline stopped by handler.");
            return Ok(PipelineResult::Stopped);
          }
          Err(e) if step_def.best_effort => {
            event!(Level::WARN, step_name = step_name_str, error = %e, "Best-effort step failed; continuing.");
            break;
          }
          Err(e) => {
            event!(Level::ERROR, step_name = step_name_str, error = %e, "Required step failed.");
            return Err(e);
          }
        }
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }
}
