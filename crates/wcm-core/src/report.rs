//! Incident reports filed by staff or citizens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{self, DirectWrite, Entity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportKind {
    Overflow,
    Damage,
    Accident,
    TruckBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    New,
    InProgress,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: u32,
    pub kind: ReportKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citizen_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ReportStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl Report {
    pub fn new(kind: ReportKind, description: impl Into<String>) -> Self {
        Self {
            id: 0,
            kind,
            description: description.into(),
            point_id: None,
            employee_id: None,
            citizen_id: None,
            reported_at: None,
            status: None,
            photo_url: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportPatch {
    pub kind: Option<ReportKind>,
    pub description: Option<String>,
    pub point_id: Option<u32>,
    pub employee_id: Option<u32>,
    pub citizen_id: Option<u32>,
    pub status: Option<ReportStatus>,
    pub photo_url: Option<String>,
}

impl Entity for Report {
    type Patch = ReportPatch;

    const COLLECTION: &'static str = "reports";

    fn id(&self) -> u32 {
        self.id
    }

    fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    fn apply_defaults(&mut self) {
        if self.reported_at.is_none() {
            self.reported_at = Some(Utc::now());
        }
        if self.status.is_none() {
            self.status = Some(ReportStatus::New);
        }
    }

    fn apply_patch(&mut self, patch: ReportPatch) {
        entity::patch_value(&mut self.kind, patch.kind);
        entity::patch(&mut self.description, patch.description);
        entity::patch_opt(&mut self.point_id, patch.point_id);
        entity::patch_opt(&mut self.employee_id, patch.employee_id);
        entity::patch_opt(&mut self.citizen_id, patch.citizen_id);
        entity::overwrite_opt(&mut self.status, patch.status);
        entity::patch_opt(&mut self.photo_url, patch.photo_url);
    }

    fn overwrite_from(&mut self, incoming: Report) {
        self.kind = incoming.kind;
        entity::overwrite(&mut self.description, incoming.description);
        entity::overwrite(&mut self.point_id, incoming.point_id);
        entity::overwrite(&mut self.employee_id, incoming.employee_id);
        entity::overwrite(&mut self.citizen_id, incoming.citizen_id);
        entity::overwrite_opt(&mut self.reported_at, incoming.reported_at);
        entity::overwrite_opt(&mut self.status, incoming.status);
        entity::overwrite(&mut self.photo_url, incoming.photo_url);
    }
}

impl DirectWrite for Report {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_reports_default_to_new_status() {
        let mut r = Report::new(ReportKind::Overflow, "bin overflowing");
        r.apply_defaults();
        assert_eq!(r.status, Some(ReportStatus::New));
        assert!(r.reported_at.is_some());
    }

    #[test]
    fn import_overwrite_keeps_fields_the_incoming_side_leaves_out() {
        let mut stored = Report::new(ReportKind::Damage, "broken lid");
        stored.point_id = Some(4);
        stored.status = Some(ReportStatus::InProgress);

        let incoming = Report::new(ReportKind::Damage, "lid replaced");
        stored.overwrite_from(incoming);

        assert_eq!(stored.description, "lid replaced");
        assert_eq!(stored.point_id, Some(4));
        assert_eq!(stored.status, Some(ReportStatus::InProgress));
    }
}
