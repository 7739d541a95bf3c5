//! Collection vehicles.

use serde::{Deserialize, Serialize};

use crate::entity::{self, DirectWrite, Entity};

/// Operational status of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    Available,
    OnMission,
    Maintenance,
    BrokenDown,
    UnderRepair,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: u32,
    pub vehicle_type: String,
    /// Load capacity in litres.
    pub capacity: f64,
    pub available: bool,
    pub plate_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<VehicleStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<u32>,
}

impl Vehicle {
    pub fn new(plate_number: impl Into<String>, vehicle_type: impl Into<String>, capacity: f64) -> Self {
        Self {
            id: 0,
            vehicle_type: vehicle_type.into(),
            capacity,
            available: true,
            plate_number: plate_number.into(),
            status: None,
            driver_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehiclePatch {
    pub vehicle_type: Option<String>,
    pub capacity: Option<f64>,
    pub available: Option<bool>,
    pub plate_number: Option<String>,
    pub status: Option<VehicleStatus>,
    pub driver_id: Option<u32>,
}

impl Entity for Vehicle {
    type Patch = VehiclePatch;

    const COLLECTION: &'static str = "vehicles";

    fn id(&self) -> u32 {
        self.id
    }

    fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    /// A vehicle without a status takes one matching its `available` flag.
    fn apply_defaults(&mut self) {
        if self.status.is_none() {
            self.status = Some(if self.available {
                VehicleStatus::Available
            } else {
                VehicleStatus::Maintenance
            });
        }
    }

    fn apply_patch(&mut self, patch: VehiclePatch) {
        entity::patch(&mut self.vehicle_type, patch.vehicle_type);
        entity::patch(&mut self.capacity, patch.capacity);
        entity::patch_value(&mut self.available, patch.available);
        entity::patch(&mut self.plate_number, patch.plate_number);
        entity::overwrite_opt(&mut self.status, patch.status);
        entity::patch_opt(&mut self.driver_id, patch.driver_id);
    }

    fn overwrite_from(&mut self, incoming: Vehicle) {
        entity::overwrite(&mut self.vehicle_type, incoming.vehicle_type);
        entity::overwrite(&mut self.capacity, incoming.capacity);
        self.available = incoming.available;
        entity::overwrite(&mut self.plate_number, incoming.plate_number);
        entity::overwrite_opt(&mut self.status, incoming.status);
        entity::overwrite_opt(&mut self.driver_id, incoming.driver_id);
    }
}

impl DirectWrite for Vehicle {}
