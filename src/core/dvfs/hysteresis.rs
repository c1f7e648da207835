use super::state::GovernorState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Outcome of feeding one candidate through the commit policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Candidate equals the committed step.
    Steady,
    /// Backoff requested but the hysteresis counter has not run out.
    Pending { remaining: i32 },
    /// Step change to hand to the applier.
    Change {
        from: usize,
        to: usize,
        direction: Direction,
    },
}

impl Commit {
    pub fn target(&self) -> Option<usize> {
        match self {
            Self::Change { to, .. } => Some(*to),
            _ => None,
        }
    }
}

/// Boost immediately, back off only once `stay_count` drains, rearm otherwise.
pub fn commit(mut state: GovernorState, candidate: usize) -> (GovernorState, Commit) {
    state.level = candidate;
    let from = state.current_step;

    if candidate > from {
        state.rearm();
        state.current_step = candidate;
        return (
            state,
            Commit::Change {
                from,
                to: candidate,
                direction: Direction::Up,
            },
        );
    }

    if candidate < from {
        state.stay_count -= 1;
        if state.stay_count > 0 {
            let remaining = state.stay_count;
            return (state, Commit::Pending { remaining });
        }
        state.rearm();
        state.current_step = candidate;
        return (
            state,
            Commit::Change {
                from,
                to: candidate,
                direction: Direction::Down,
            },
        );
    }

    state.rearm();
    (state, Commit::Steady)
}

/// Forced selections skip the hysteresis in both directions.
pub fn commit_forced(mut state: GovernorState, target: usize) -> (GovernorState, Commit) {
    let from = state.current_step;
    state.level = target;
    state.rearm();

    if target == from {
        return (state, Commit::Steady);
    }

    state.current_step = target;
    let direction = if target > from {
        Direction::Up
    } else {
        Direction::Down
    };
    (
        state,
        Commit::Change {
            from,
            to: target,
            direction,
        },
    )
}
