//! Replayable CSV event scripts.
//!
//! Each row is one GUI event, e.g.
//!
//! ```text
//! action,x,y,frame,time
//! calibrate,,,,
//! click,0,0,,
//! click,100,0,,
//! click,50,50,0,
//! click,60,30,15,
//! plot,,,,
//! ```
//!
//! Click rows take their timestamp from `time` when present, otherwise from
//! `frame` through the [`FrameClock`].

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::{FitError, ScriptError};
use crate::fit::TrajectoryFit;
use crate::frame_clock::FrameClock;
use crate::session::SessionController;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScriptAction {
    Calibrate,
    Collect,
    Click,
    Undo,
    Clear,
    Plot,
}

#[derive(Debug, Deserialize)]
struct ScriptRow {
    action: ScriptAction,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default)]
    frame: Option<u64>,
    #[serde(default)]
    time: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptEvent {
    Calibrate,
    Collect,
    Click { x: f64, y: f64, time: f64 },
    Undo,
    Clear,
    Plot,
}

/// What one replayed event produced
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayStep {
    Status(String),
    Plot(Result<TrajectoryFit, FitError>),
}

impl ScriptEvent {
    pub fn apply(&self, session: &mut SessionController) -> ReplayStep {
        match *self {
            ScriptEvent::Calibrate => ReplayStep::Status(session.on_calibrate_requested()),
            ScriptEvent::Collect => ReplayStep::Status(session.on_collect_requested()),
            ScriptEvent::Click { x, y, time } => ReplayStep::Status(session.on_click(x, y, time)),
            ScriptEvent::Undo => ReplayStep::Status(session.on_undo_requested()),
            ScriptEvent::Clear => ReplayStep::Status(session.on_clear_requested()),
            ScriptEvent::Plot => ReplayStep::Plot(session.on_plot_requested()),
        }
    }
}

/// Events that parsed, plus one error per skipped row
#[derive(Debug, Default)]
pub struct ParsedScript {
    pub events: Vec<ScriptEvent>,
    pub errors: Vec<ScriptError>,
}

pub fn parse_script<R: Read>(reader: R, clock: FrameClock) -> ParsedScript {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut parsed = ParsedScript::default();
    let headers = match rdr.headers() {
        Ok(h) => h.clone(),
        Err(source) => {
            parsed.errors.push(ScriptError::Csv { row: 1, source });
            return parsed;
        }
    };

    for result in rdr.records() {
        let event = result
            .map_err(|source| ScriptError::Csv {
                row: line_of(source.position()),
                source,
            })
            .and_then(|record| {
                let row = line_of(record.position());
                record
                    .deserialize::<ScriptRow>(Some(&headers))
                    .map_err(|source| ScriptError::Csv { row, source })
                    .and_then(|r| to_event(r, row, clock))
            });
        match event {
            Ok(ev) => parsed.events.push(ev),
            Err(e) => {
                warn!(error = %e, "skipping script row");
                parsed.errors.push(e);
            }
        }
    }
    parsed
}

pub fn parse_script_file<P: AsRef<Path>>(
    path: P,
    clock: FrameClock,
) -> Result<ParsedScript, ScriptError> {
    let file = File::open(path)?;
    Ok(parse_script(BufReader::new(file), clock))
}

fn line_of(position: Option<&csv::Position>) -> usize {
    position.map_or(0, |p| p.line() as usize)
}

fn to_event(r: ScriptRow, row: usize, clock: FrameClock) -> Result<ScriptEvent, ScriptError> {
    let event = match r.action {
        ScriptAction::Calibrate => ScriptEvent::Calibrate,
        ScriptAction::Collect => ScriptEvent::Collect,
        ScriptAction::Undo => ScriptEvent::Undo,
        ScriptAction::Clear => ScriptEvent::Clear,
        ScriptAction::Plot => ScriptEvent::Plot,
        ScriptAction::Click => {
            let (Some(x), Some(y)) = (r.x, r.y) else {
                return Err(ScriptError::Invalid {
                    row,
                    message: "click needs both x and y".to_string(),
                });
            };
            let time = match (r.time, r.frame) {
                (Some(t), _) => t,
                (None, Some(frame)) => clock.time_at(frame),
                // Calibration clicks do not need a timestamp
                (None, None) => 0.0,
            };
            ScriptEvent::Click { x, y, time }
        }
    };
    Ok(event)
}
