//! Tours: a dated collection route with one employee, one vehicle and an
//! ordered list of collection points.
//!
//! A stored tour embeds full copies of what it references. Later edits to the
//! employee, vehicle or points do not flow back into existing tours.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::entity::{self, Entity};
use crate::point::CollectionPoint;
use crate::staff::StaffMember;
use crate::vehicle::Vehicle;

/// Tour lifecycle: `PLANNED -> IN_PROGRESS -> COMPLETED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TourStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
}

impl TourStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Completed
    }

    fn rank(self) -> u8 {
        match self {
            Self::Planned => 0,
            Self::InProgress => 1,
            Self::Completed => 2,
        }
    }

    /// Status only moves forward; a completed tour stays completed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return next == self;
        }
        next.rank() >= self.rank()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    pub id: u32,
    pub planned_date: NaiveDate,
    pub status: TourStatus,
    pub employee: StaffMember,
    pub vehicle: Vehicle,
    pub collection_points: Vec<CollectionPoint>,
    /// `HH:mm`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub distance_km: f64,
}

/// A tour to schedule, with references given by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TourRequest {
    /// Defaults to today when absent.
    pub planned_date: Option<NaiveDate>,
    pub status: Option<TourStatus>,
    pub employee_id: Option<u32>,
    pub vehicle_id: Option<u32>,
    #[serde(default)]
    pub point_ids: Vec<u32>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(default)]
    pub distance_km: f64,
}

/// Changes to an existing tour, with references given by id. Absent, zero
/// and empty values keep the stored ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TourUpdate {
    pub planned_date: Option<NaiveDate>,
    pub status: Option<TourStatus>,
    pub employee_id: Option<u32>,
    pub vehicle_id: Option<u32>,
    pub point_ids: Option<Vec<u32>>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub distance_km: Option<f64>,
}

/// A [`TourUpdate`] whose references have been resolved to full copies.
#[derive(Debug, Clone, Default)]
pub struct TourPatch {
    pub planned_date: Option<NaiveDate>,
    pub status: Option<TourStatus>,
    pub employee: Option<StaffMember>,
    pub vehicle: Option<Vehicle>,
    pub collection_points: Option<Vec<CollectionPoint>>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub distance_km: Option<f64>,
}

impl Entity for Tour {
    type Patch = TourPatch;

    const COLLECTION: &'static str = "tours";

    fn id(&self) -> u32 {
        self.id
    }

    fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    fn apply_patch(&mut self, patch: TourPatch) {
        entity::patch_value(&mut self.planned_date, patch.planned_date);
        entity::patch_value(&mut self.status, patch.status);
        if let Some(employee) = patch.employee.filter(|e| e.id != 0) {
            self.employee = employee;
        }
        if let Some(vehicle) = patch.vehicle.filter(|v| v.id != 0) {
            self.vehicle = vehicle;
        }
        entity::patch(&mut self.collection_points, patch.collection_points);
        entity::patch_opt(&mut self.start_time, patch.start_time);
        entity::patch_opt(&mut self.end_time, patch.end_time);
        entity::patch(&mut self.distance_km, patch.distance_km);
    }

    fn overwrite_from(&mut self, incoming: Tour) {
        self.planned_date = incoming.planned_date;
        self.status = incoming.status;
        self.employee = incoming.employee;
        self.vehicle = incoming.vehicle;
        entity::overwrite(&mut self.collection_points, incoming.collection_points);
        entity::overwrite(&mut self.start_time, incoming.start_time);
        entity::overwrite(&mut self.end_time, incoming.end_time);
        entity::overwrite(&mut self.distance_km, incoming.distance_km);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staff::Role;

    fn sample_tour() -> Tour {
        Tour {
            id: 1,
            planned_date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            status: TourStatus::Planned,
            employee: StaffMember::new(Role::Employee, "a@b.fr", "Ada", "Martin"),
            vehicle: Vehicle::new("AB-123-CD", "compactor", 500.0),
            collection_points: vec![CollectionPoint::new("1 rue Haute", 20.0)],
            start_time: Some("08:00".to_string()),
            end_time: None,
            distance_km: 12.5,
        }
    }

    #[test]
    fn status_transitions_only_move_forward() {
        assert!(TourStatus::Planned.can_transition_to(TourStatus::InProgress));
        assert!(TourStatus::Planned.can_transition_to(TourStatus::Completed));
        assert!(TourStatus::InProgress.can_transition_to(TourStatus::Completed));
        assert!(!TourStatus::InProgress.can_transition_to(TourStatus::Planned));
        assert!(!TourStatus::Completed.can_transition_to(TourStatus::InProgress));
        assert!(TourStatus::Completed.can_transition_to(TourStatus::Completed));
    }

    #[test]
    fn empty_patch_leaves_tour_untouched() {
        let mut tour = sample_tour();
        let before = tour.clone();
        tour.apply_patch(TourPatch {
            collection_points: Some(Vec::new()),
            start_time: Some(String::new()),
            distance_km: Some(0.0),
            ..TourPatch::default()
        });
        assert_eq!(tour, before);
    }

    #[test]
    fn tour_yaml_uses_plain_date_and_status_names() {
        let yaml = serde_yaml::to_string(&sample_tour()).unwrap();
        assert!(yaml.contains("planned_date:"));
        assert!(yaml.contains("2024-06-10"));
        assert!(yaml.contains("status: PLANNED"));
        let back: Tour = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, sample_tour());
    }
}
