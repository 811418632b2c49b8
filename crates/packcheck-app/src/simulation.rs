//! Scripted simulation driver
//!
//! Replays a `SimulationScript` against a session that uses a
//! `ScriptedScale`, ticking the session on a simulated clock.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use packcheck_domain::model::Checklist;
use packcheck_domain::repository::NotificationSink;
use packcheck_infra::{ScriptEvent, ScriptedScale, SimulationScript};

use crate::session::{AssemblySession, SessionSnapshot};

pub const DEFAULT_STEP_MS: u64 = 50;

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub snapshot: SessionSnapshot,
    pub checklist: Checklist,
    pub transitions: usize,
    pub elapsed_ms: u64,
}

/// Apply one script step to the session and its scripted scale
pub fn apply_script_event<N: NotificationSink>(
    session: &mut AssemblySession<ScriptedScale, N>,
    event: &ScriptEvent,
    now: DateTime<Utc>,
) {
    tracing::debug!(?event, at = %now, "script event");
    let result = match event {
        ScriptEvent::Reading { weight, stable } => {
            session.device_mut().place(*weight, *stable);
            Ok(())
        }
        ScriptEvent::Scan { code } => {
            session.device_mut().queue_barcode(code.clone());
            Ok(())
        }
        ScriptEvent::Select { item_id } => session.select_item(item_id, now),
        ScriptEvent::ConfirmBox { box_index } => session.confirm_box(*box_index, now),
        ScriptEvent::SetActiveBox { box_index } => session.set_active_box(*box_index, now),
        ScriptEvent::Disconnect => {
            session.device_mut().set_connected(false);
            Ok(())
        }
        ScriptEvent::Reconnect => {
            session.device_mut().set_connected(true);
            Ok(())
        }
        ScriptEvent::Leave => {
            session.leave();
            Ok(())
        }
    };
    if let Err(e) = result {
        tracing::warn!(?event, "script event ignored: {}", e);
    }
}

/// Run `script` to completion on a simulated clock starting at `start`
///
/// The clock keeps running past the last event long enough for pending
/// settle delays to elapse.
pub fn run_script<N: NotificationSink>(
    session: &mut AssemblySession<ScriptedScale, N>,
    script: &SimulationScript,
    start: DateTime<Utc>,
    step_ms: u64,
) -> SimulationReport {
    let step_ms = step_ms.max(1);
    let config = session.config();
    let tail = config.success_settle_ms + config.error_settle_ms + config.active_poll_ms * 2;
    let end = script.duration_ms() + tail;

    let mut next_event = 0;
    let mut elapsed = 0;
    while elapsed <= end {
        let now = start + Duration::milliseconds(elapsed as i64);
        session.device_mut().advance_to(now);
        while let Some(timed) = script.events.get(next_event) {
            if timed.at_ms > elapsed {
                break;
            }
            apply_script_event(session, &timed.event, now);
            next_event += 1;
        }
        session.tick(now);
        elapsed += step_ms;
    }

    SimulationReport {
        snapshot: session.snapshot(),
        checklist: session.checklist().clone(),
        transitions: session.transitions(),
        elapsed_ms: end,
    }
}
