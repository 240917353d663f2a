use tracing::debug;

use crate::car::TurnCommand;

/// A decision component must exceed this to steer.
pub const DECISION_THRESHOLD: f64 = 0.7;

/// Minimum number of components a controller decision must carry.
pub const DECISION_MIN_LEN: usize = 2;

/// Map a controller decision onto a turn command.
///
/// Component 0 above the threshold steers right and wins over component 1,
/// which steers left. Infinities compare like any other number. Decisions that
/// are too short or carry NaN in either component drive straight.
pub fn turn_command(decision: &[f64]) -> TurnCommand {
    let [right, left] = match decision {
        [right, left, ..] if !right.is_nan() && !left.is_nan() => [*right, *left],
        _ => {
            debug!(?decision, "malformed controller decision, driving straight");
            return TurnCommand::Straight;
        }
    };

    if right > DECISION_THRESHOLD {
        TurnCommand::Right
    } else if left > DECISION_THRESHOLD {
        TurnCommand::Left
    } else {
        TurnCommand::Straight
    }
}
