//! Post-hoc compaction of recorded scripts.

use namouse_core::types::{Event, Script};

/// Moves closer together than this (seconds) collapse into the later one.
pub const MOVE_MERGE_WINDOW_SECS: f64 = 0.02;

/// Collapse bursts of near-simultaneous pointer moves into their latest sample.
///
/// A move within `MOVE_MERGE_WINDOW_SECS` of the pending move replaces its
/// position and time. Any other event closes the burst and is kept as-is.
/// Returns the compacted script and the number of events removed.
///
/// The pass is idempotent: no two adjacent moves in the output are within
/// the merge window of each other.
pub fn optimize(script: &Script) -> (Script, usize) {
    let mut output: Vec<Event> = Vec::with_capacity(script.len());
    let mut pending: Option<Event> = None;

    for event in script {
        if let Event::MouseMove { time, x, y } = event {
            if let Some(Event::MouseMove {
                time: p_time,
                x: p_x,
                y: p_y,
            }) = pending.as_mut()
            {
                if *time - *p_time < MOVE_MERGE_WINDOW_SECS {
                    *p_time = *time;
                    *p_x = *x;
                    *p_y = *y;
                    continue;
                }
            }
            output.extend(pending.replace(event.clone()));
        } else {
            output.extend(pending.take());
            output.push(event.clone());
        }
    }
    output.extend(pending);

    let removed = script.len() - output.len();
    // Merging only moves times forward within a burst, so order is preserved.
    let optimized = match Script::from_events(output) {
        Ok(optimized) => optimized,
        Err(e) => {
            tracing::warn!(error = %e, "Optimized script rejected, keeping original");
            return (script.clone(), 0);
        }
    };
    tracing::debug!(
        before = script.len(),
        after = optimized.len(),
        removed,
        "Script optimized"
    );
    (optimized, removed)
}
