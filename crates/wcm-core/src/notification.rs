//! Role-targeted notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{self, DirectWrite, Entity};
use crate::staff::Role;

/// Kind tag for notifications raised when a vehicle breaks down.
pub const VEHICLE_BREAKDOWN: &str = "VEHICLE_BREAKDOWN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u32,
    pub title: String,
    pub message: String,
    pub target_role: Role,
    /// Stamped with the current time on creation when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Notification {
    pub fn new(target_role: Role, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: title.into(),
            message: message.into(),
            target_role,
            created_at: None,
            read: false,
            vehicle_id: None,
            kind: None,
        }
    }

    /// Notice for technicians that a vehicle needs intervention.
    #[must_use]
    pub fn vehicle_breakdown(vehicle_id: u32, plate_number: &str) -> Self {
        let mut notification = Self::new(
            Role::Technician,
            "Vehicle broken down",
            format!(
                "Vehicle {plate_number} (id {vehicle_id}) has broken down and needs an intervention."
            ),
        );
        notification.vehicle_id = Some(vehicle_id);
        notification.kind = Some(VEHICLE_BREAKDOWN.to_string());
        notification
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationPatch {
    pub title: Option<String>,
    pub message: Option<String>,
    pub target_role: Option<Role>,
    pub read: Option<bool>,
    pub vehicle_id: Option<u32>,
    pub kind: Option<String>,
}

impl Entity for Notification {
    type Patch = NotificationPatch;

    const COLLECTION: &'static str = "notifications";

    fn id(&self) -> u32 {
        self.id
    }

    fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    fn apply_defaults(&mut self) {
        if self.created_at.is_none() {
            self.created_at = Some(Utc::now());
        }
    }

    fn apply_patch(&mut self, patch: NotificationPatch) {
        entity::patch(&mut self.title, patch.title);
        entity::patch(&mut self.message, patch.message);
        entity::patch_value(&mut self.target_role, patch.target_role);
        entity::patch_value(&mut self.read, patch.read);
        entity::patch_opt(&mut self.vehicle_id, patch.vehicle_id);
        entity::patch_opt(&mut self.kind, patch.kind);
    }

    fn overwrite_from(&mut self, incoming: Notification) {
        entity::overwrite(&mut self.title, incoming.title);
        entity::overwrite(&mut self.message, incoming.message);
        self.target_role = incoming.target_role;
        entity::overwrite_opt(&mut self.created_at, incoming.created_at);
        self.read = incoming.read;
        entity::overwrite(&mut self.vehicle_id, incoming.vehicle_id);
        entity::overwrite(&mut self.kind, incoming.kind);
    }
}

impl DirectWrite for Notification {}
