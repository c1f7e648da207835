use super::state::GovernorState;
use super::table::DvfsTable;

/// Next candidate step for an automatic tick.
///
/// Thresholds are taken from the committed step. The candidate walks one index
/// per tick and never strays more than one index from the committed step; a
/// sample inside the band pulls it back to the committed step.
pub fn select_candidate(table: &DvfsTable, state: &GovernorState, utilization: u8) -> usize {
    let max = table.max_index();
    let current = table.wrap(state.current_step);
    let op = table.get(current);
    let util = u32::from(utilization);

    let lo = current.saturating_sub(1);
    let hi = (current + 1).min(max);
    let level = state.level.clamp(lo, hi);

    let next = if util > op.up_threshold() {
        level + 1
    } else if util < op.down_threshold() {
        level.saturating_sub(1)
    } else {
        current
    };

    next.clamp(lo, hi)
}

/// Step chosen while a clock is forced: highest step at or below `forced_mhz`.
pub fn select_forced(table: &DvfsTable, forced_mhz: u32) -> usize {
    table.highest_at_or_below(forced_mhz)
}
