use std::collections::{BTreeSet, VecDeque};

use crate::domain::registry::PackageRegistry;
use crate::domain::types::{PackageId, PackageStatus};
use crate::domain::views::GroupView;
use crate::error::Result;

/// Packages that must board together: the closure of one package under
/// shared destination and binding-set membership. Members already past the
/// ready state are dropped, they have left the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadUnit {
    pub members: BTreeSet<PackageId>,
    pub bound: bool,
}

impl LoadUnit {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

pub fn load_unit_of(
    seed: PackageId,
    registry: &PackageRegistry,
    groups: &GroupView,
) -> Result<LoadUnit> {
    let mut members = BTreeSet::new();
    let mut bound = false;
    let mut queue = VecDeque::from([seed]);

    while let Some(id) = queue.pop_front() {
        if !members.insert(id) {
            continue;
        }
        let package = registry.lookup(id)?;
        if let Some(set_id) = package.binding {
            bound = true;
            if let Some(set) = registry.binding_set(set_id) {
                queue.extend(set.iter().copied());
            }
        }
        if let Some(group) = groups.group_of(&package.destination()) {
            queue.extend(group.iter().copied());
        }
    }

    let mut departed = Vec::new();
    for id in &members {
        let status = registry.lookup(*id)?.status();
        if matches!(
            status,
            PackageStatus::Loaded | PackageStatus::OutForDelivery | PackageStatus::Delivered
        ) {
            departed.push(*id);
        }
    }
    for id in departed {
        members.remove(&id);
    }
    Ok(LoadUnit { members, bound })
}
