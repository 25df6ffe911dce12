// Animation driver - Feeds scheduler ticks into a renderer
// The renderer owns all drawing; this only sequences the run

use super::frame_log::{RenderError, Renderer};
use crate::scheduler::{RunSummary, Scheduler};

/// Run the scheduler over its whole grid, handing every tick to `renderer`
pub fn animate(scheduler: &Scheduler<'_>, renderer: &mut dyn Renderer) -> Result<RunSummary, RenderError> {
    let summary = scheduler.run(|tick| renderer.render_tick(tick))?;
    renderer.finish()?;
    Ok(summary)
}
