use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveTime;
use tracing::{debug, info};

use crate::domain::package::Package;
use crate::domain::types::{BindingSetId, PackageId, PackageStatus, VehicleId};
use crate::domain::views::{derive_groups, derive_priority, GroupView, PriorityView};
use crate::error::{DispatchError, Result};

/// Every package known to the hub plus the pool of those ready for dispatch.
#[derive(Debug, Clone, Default)]
pub struct PackageRegistry {
    packages: HashMap<PackageId, Package>,
    ready: BTreeSet<PackageId>,
    bindings: BTreeMap<BindingSetId, BTreeSet<PackageId>>,
    next_binding: usize,
}

impl PackageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_packages(packages: impl IntoIterator<Item = Package>) -> Self {
        let mut registry = Self::new();
        for package in packages {
            registry.insert(package);
        }
        registry
    }

    /// Inserts or replaces by id. A replaced record leaves the ready pool but
    /// keeps its binding-set membership.
    pub fn insert(&mut self, mut package: Package) -> Option<Package> {
        let id = package.id;
        let previous = self.packages.remove(&id);
        if let Some(old) = &previous {
            debug!("Replacing package {}", id);
            package.binding = package.binding.or(old.binding);
            self.ready.remove(&id);
        }
        self.packages.insert(id, package);
        previous
    }

    pub fn lookup(&self, id: PackageId) -> Result<&Package> {
        self.packages.get(&id).ok_or(DispatchError::UnknownPackage(id))
    }

    pub fn lookup_mut(&mut self, id: PackageId) -> Result<&mut Package> {
        self.packages
            .get_mut(&id)
            .ok_or(DispatchError::UnknownPackage(id))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// All packages sorted by id.
    pub fn all_packages(&self) -> Vec<&Package> {
        let mut all: Vec<&Package> = self.packages.values().collect();
        all.sort_by_key(|p| p.id);
        all
    }

    pub fn ready_pool(&self) -> &BTreeSet<PackageId> {
        &self.ready
    }

    pub fn is_ready(&self, id: PackageId) -> bool {
        self.ready.contains(&id)
    }

    /// Ready packages in id order.
    pub fn ready_packages(&self) -> impl Iterator<Item = &Package> + '_ {
        self.ready.iter().filter_map(|id| self.packages.get(id))
    }

    /// Moves the package to ready-for-dispatch and into the pool.
    pub fn admit(&mut self, id: PackageId) -> Result<()> {
        self.lookup_mut(id)?
            .set_status(PackageStatus::ReadyForDispatch, None)?;
        self.ready.insert(id);
        Ok(())
    }

    pub fn mark_address_invalid(&mut self, id: PackageId) -> Result<()> {
        self.lookup_mut(id)?
            .set_status(PackageStatus::AddressInvalid, None)?;
        self.ready.remove(&id);
        Ok(())
    }

    /// Removes from the pool; the caller records where the package went.
    pub(crate) fn take_from_pool(&mut self, id: PackageId) -> bool {
        self.ready.remove(&id)
    }

    pub fn restrict_to_vehicle(&mut self, id: PackageId, vehicle: VehicleId) -> Result<()> {
        self.lookup_mut(id)?.vehicle_restriction = Some(vehicle);
        Ok(())
    }

    /// Rewrites delivery-group annotations from the current pool and returns
    /// the view. Previous assignments are discarded.
    pub fn compute_delivery_groups(&mut self) -> GroupView {
        let view = derive_groups(self.ready.iter().filter_map(|id| self.packages.get(id)));
        for package in self.packages.values_mut() {
            package.delivery_group = view.group_id(&package.destination());
            if !self.ready.contains(&package.id) {
                package.delivery_group = None;
            }
        }
        debug!("{} delivery groups among {} ready packages", view.len(), self.ready.len());
        view
    }

    pub fn compute_delivery_priority(
        &mut self,
        tier_one: NaiveTime,
        tier_two: NaiveTime,
    ) -> PriorityView {
        let view = derive_priority(
            self.ready.iter().filter_map(|id| self.packages.get(id)),
            tier_one,
            tier_two,
        );
        for id in &self.ready {
            if let Some(package) = self.packages.get_mut(id) {
                package.priority = view.tier_of(*id);
            }
        }
        debug!(
            "Priority tiers: {} tier one, {} tier two",
            view.tier_one.len(),
            view.tier_two.len()
        );
        view
    }

    /// Declares `ids` as one binding set. Sets that share a member with `ids`
    /// are merged into the new set.
    pub fn bind_packages(
        &mut self,
        ids: impl IntoIterator<Item = PackageId>,
    ) -> Result<BindingSetId> {
        let mut members: BTreeSet<PackageId> = BTreeSet::new();
        for id in ids {
            self.lookup(id)?;
            members.insert(id);
        }

        let overlapping: Vec<BindingSetId> = members
            .iter()
            .filter_map(|id| self.packages.get(id).and_then(|p| p.binding))
            .collect();
        for set_id in overlapping {
            if let Some(old) = self.bindings.remove(&set_id) {
                members.extend(old);
            }
        }

        let set_id = BindingSetId(self.next_binding);
        self.next_binding += 1;
        for id in &members {
            if let Some(package) = self.packages.get_mut(id) {
                package.binding = Some(set_id);
            }
        }
        info!("Bound {} packages as set {:?}", members.len(), set_id);
        self.bindings.insert(set_id, members);
        Ok(set_id)
    }

    pub fn binding_set(&self, id: BindingSetId) -> Option<&BTreeSet<PackageId>> {
        self.bindings.get(&id)
    }

    pub fn binding_sets(&self) -> impl Iterator<Item = (BindingSetId, &BTreeSet<PackageId>)> + '_ {
        self.bindings.iter().map(|(id, members)| (*id, members))
    }

    /// Every package bucketed by the status it had at `at`.
    pub fn snapshot_at(&self, at: NaiveTime) -> BTreeMap<PackageStatus, Vec<PackageId>> {
        let mut snapshot: BTreeMap<PackageStatus, Vec<PackageId>> = BTreeMap::new();
        for package in self.all_packages() {
            snapshot
                .entry(package.status_at(at))
                .or_default()
                .push(package.id);
        }
        snapshot
    }
}
