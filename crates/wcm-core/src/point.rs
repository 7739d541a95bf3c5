//! Collection points (waste receptacle locations).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{self, DirectWrite, Entity};

/// Container state of a collection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerState {
    Active,
    Maintenance,
    OutOfService,
}

/// Waste classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WasteKind {
    Plastic,
    Glass,
    Paper,
    Organic,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteType {
    pub id: u32,
    pub name: WasteKind,
}

impl WasteType {
    /// Applied when a point is created without a classification.
    #[must_use]
    pub fn mixed() -> Self {
        Self {
            id: 1,
            name: WasteKind::Mixed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionPoint {
    pub id: u32,
    pub address: String,
    /// Percentage, 0 to 100.
    pub fill_level: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ContainerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_collected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waste_type: Option<WasteType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Explicit container capacity in litres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl CollectionPoint {
    pub fn new(address: impl Into<String>, fill_level: f64) -> Self {
        Self {
            id: 0,
            address: address.into(),
            fill_level,
            state: None,
            last_collected_at: None,
            waste_type: None,
            latitude: None,
            longitude: None,
            capacity: None,
            model: None,
        }
    }

    /// Volume this point contributes to a tour: the explicit capacity when
    /// set, otherwise `nominal_capacity` scaled by the fill level.
    #[must_use]
    pub fn estimated_volume(&self, nominal_capacity: f64) -> f64 {
        match self.capacity {
            Some(capacity) if capacity > 0 => f64::from(capacity),
            _ => nominal_capacity * (self.fill_level / 100.0),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointPatch {
    pub address: Option<String>,
    pub fill_level: Option<f64>,
    pub state: Option<ContainerState>,
    pub last_collected_at: Option<DateTime<Utc>>,
    pub waste_type: Option<WasteType>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub capacity: Option<u32>,
    pub model: Option<String>,
}

impl Entity for CollectionPoint {
    type Patch = PointPatch;

    const COLLECTION: &'static str = "collection_points";

    fn id(&self) -> u32 {
        self.id
    }

    fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    fn apply_defaults(&mut self) {
        if self.state.is_none() {
            self.state = Some(ContainerState::Active);
        }
        if self.last_collected_at.is_none() {
            self.last_collected_at = Some(Utc::now());
        }
        if self.waste_type.is_none() {
            self.waste_type = Some(WasteType::mixed());
        }
    }

    fn apply_patch(&mut self, patch: PointPatch) {
        entity::patch(&mut self.address, patch.address);
        entity::patch(&mut self.fill_level, patch.fill_level);
        entity::overwrite_opt(&mut self.state, patch.state);
        entity::overwrite_opt(&mut self.last_collected_at, patch.last_collected_at);
        entity::overwrite_opt(&mut self.waste_type, patch.waste_type);
        entity::patch_opt(&mut self.latitude, patch.latitude);
        entity::patch_opt(&mut self.longitude, patch.longitude);
        entity::patch_opt(&mut self.capacity, patch.capacity);
        entity::patch_opt(&mut self.model, patch.model);
    }

    fn overwrite_from(&mut self, incoming: CollectionPoint) {
        entity::overwrite(&mut self.address, incoming.address);
        entity::overwrite(&mut self.fill_level, incoming.fill_level);
        entity::overwrite_opt(&mut self.state, incoming.state);
        entity::overwrite_opt(&mut self.last_collected_at, incoming.last_collected_at);
        entity::overwrite_opt(&mut self.waste_type, incoming.waste_type);
        entity::overwrite(&mut self.latitude, incoming.latitude);
        entity::overwrite(&mut self.longitude, incoming.longitude);
        entity::overwrite(&mut self.capacity, incoming.capacity);
        entity::overwrite(&mut self.model, incoming.model);
    }
}

impl DirectWrite for CollectionPoint {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_state_type_and_collection_date() {
        let mut p = CollectionPoint::new("12 rue des Lilas", 40.0);
        p.apply_defaults();
        assert_eq!(p.state, Some(ContainerState::Active));
        assert_eq!(p.waste_type, Some(WasteType::mixed()));
        assert!(p.last_collected_at.is_some());
    }

    #[test]
    fn explicit_capacity_wins_over_fill_estimate() {
        let mut p = CollectionPoint::new("1 place du Marché", 50.0);
        assert!((p.estimated_volume(1000.0) - 500.0).abs() < f64::EPSILON);
        p.capacity = Some(400);
        assert!((p.estimated_volume(1000.0) - 400.0).abs() < f64::EPSILON);
        p.capacity = Some(0);
        assert!((p.estimated_volume(1000.0) - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn patch_with_zero_fill_level_keeps_existing() {
        let mut p = CollectionPoint::new("1 place du Marché", 75.0);
        p.apply_patch(PointPatch {
            fill_level: Some(0.0),
            model: Some("C-660".to_string()),
            ..PointPatch::default()
        });
        assert!((p.fill_level - 75.0).abs() < f64::EPSILON);
        assert_eq!(p.model.as_deref(), Some("C-660"));
    }
}
