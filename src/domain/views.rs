use std::collections::BTreeMap;

use chrono::NaiveTime;

use crate::domain::package::Package;
use crate::domain::types::{Deadline, GroupId, PackageId, PriorityTier};

/// Destinations shared by two or more ready packages. Derived once per
/// loading pass and read-only for the rest of it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupView {
    groups: BTreeMap<String, (GroupId, Vec<PackageId>)>,
}

impl GroupView {
    pub fn group_of(&self, destination: &str) -> Option<&[PackageId]> {
        self.groups.get(destination).map(|(_, ids)| ids.as_slice())
    }

    pub fn group_id(&self, destination: &str) -> Option<GroupId> {
        self.groups.get(destination).map(|(id, _)| *id)
    }

    /// Smallest group first; equal sizes keep destination order.
    pub fn by_size(&self) -> Vec<(&str, &[PackageId])> {
        let mut groups: Vec<(&str, &[PackageId])> = self
            .groups
            .iter()
            .map(|(dest, (_, ids))| (dest.as_str(), ids.as_slice()))
            .collect();
        groups.sort_by_key(|(_, ids)| ids.len());
        groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// One pass over `pool`, grouping by destination. Group ids restart at 1 on
/// every call.
pub fn derive_groups<'a>(pool: impl IntoIterator<Item = &'a Package>) -> GroupView {
    let mut by_destination: BTreeMap<String, Vec<PackageId>> = BTreeMap::new();
    for package in pool {
        by_destination
            .entry(package.destination())
            .or_default()
            .push(package.id);
    }

    let mut next_id = 0;
    let groups = by_destination
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(dest, mut ids)| {
            next_id += 1;
            ids.sort_unstable();
            (dest, (GroupId(next_id), ids))
        })
        .collect();
    GroupView { groups }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorityView {
    pub tier_one: Vec<PackageId>,
    pub tier_two: Vec<PackageId>,
}

impl PriorityView {
    pub fn tier_of(&self, id: PackageId) -> Option<PriorityTier> {
        if self.tier_one.contains(&id) {
            Some(PriorityTier::One)
        } else if self.tier_two.contains(&id) {
            Some(PriorityTier::Two)
        } else {
            None
        }
    }
}

pub fn classify(
    deadline: Deadline,
    tier_one: NaiveTime,
    tier_two: NaiveTime,
) -> Option<PriorityTier> {
    match deadline.time() {
        Some(t) if t <= tier_one => Some(PriorityTier::One),
        Some(t) if t <= tier_two => Some(PriorityTier::Two),
        _ => None,
    }
}

pub fn derive_priority<'a>(
    pool: impl IntoIterator<Item = &'a Package>,
    tier_one: NaiveTime,
    tier_two: NaiveTime,
) -> PriorityView {
    let mut view = PriorityView::default();
    for package in pool {
        match classify(package.deadline, tier_one, tier_two) {
            Some(PriorityTier::One) => view.tier_one.push(package.id),
            Some(PriorityTier::Two) => view.tier_two.push(package.id),
            None => {}
        }
    }
    view.tier_one.sort_unstable();
    view.tier_two.sort_unstable();
    view
}
