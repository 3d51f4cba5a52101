//! Ordering: second stage of the run pipeline.
//!
//! Up runs ascend by version. Down runs are the exact mirror of the Up
//! sequence, so migrations sharing a version are reverted in the reverse of
//! the order they were applied.

use crate::descriptor::MigrationDescriptor;
use crate::options::Direction;

/// Sort `descriptors` for `direction`. Equal versions keep discovery order (Up)
/// or reversed discovery order (Down).
pub fn order_for(mut descriptors: Vec<MigrationDescriptor>, direction: Direction) -> Vec<MigrationDescriptor> {
    // stable sort, ties stay in discovery order
    descriptors.sort_by_key(MigrationDescriptor::version);
    if direction == Direction::Down {
        descriptors.reverse();
    }
    descriptors
}

/// Cut an ordered plan after the first descriptor whose version equals
/// `to_version`. Without such a descriptor the plan is returned whole.
pub fn through_target(mut descriptors: Vec<MigrationDescriptor>, to_version: Option<i64>) -> Vec<MigrationDescriptor> {
    let cut = to_version.and_then(|target| descriptors.iter().position(|d| d.version() == target));
    if let Some(index) = cut {
        descriptors.truncate(index + 1);
    }
    descriptors
}
