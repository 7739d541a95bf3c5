//! Collection point queries, fill-level tracking and statistics.

use serde::Serialize;

use wcm_core::error::{Result, WcmError};
use wcm_core::point::{CollectionPoint, ContainerState, WasteKind};

use crate::repository::Repository;

/// Aggregate view over every collection point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointStatistics {
    pub total: usize,
    pub active: usize,
    pub maintenance: usize,
    pub out_of_service: usize,
    /// Points above the critical fill threshold.
    pub critical: usize,
    /// Mean fill level, rounded to two decimals; `0` with no points.
    pub average_fill_level: f64,
}

#[derive(Clone)]
pub struct PointService {
    repo: Repository<CollectionPoint>,
    maintenance_threshold: f64,
    critical_threshold: f64,
}

impl PointService {
    pub(crate) fn new(
        repo: Repository<CollectionPoint>,
        maintenance_threshold: f64,
        critical_threshold: f64,
    ) -> Self {
        Self {
            repo,
            maintenance_threshold,
            critical_threshold,
        }
    }

    #[must_use]
    pub fn repository(&self) -> &Repository<CollectionPoint> {
        &self.repo
    }

    /// # Errors
    ///
    /// Returns [`WcmError::Parse`] if the stored document is malformed.
    pub fn by_waste_type(&self, kind: WasteKind) -> Result<Vec<CollectionPoint>> {
        self.repo
            .find(|p| p.waste_type.as_ref().is_some_and(|w| w.name == kind))
    }

    /// # Errors
    ///
    /// See [`PointService::by_waste_type`].
    pub fn by_state(&self, state: ContainerState) -> Result<Vec<CollectionPoint>> {
        self.repo.find(|p| p.state == Some(state))
    }

    /// Points filled above `threshold`, fullest first.
    ///
    /// # Errors
    ///
    /// See [`PointService::by_waste_type`].
    pub fn critical(&self, threshold: f64) -> Result<Vec<CollectionPoint>> {
        let mut points = self.repo.find(|p| p.fill_level > threshold)?;
        points.sort_by(|a, b| b.fill_level.total_cmp(&a.fill_level));
        Ok(points)
    }

    /// Record a new fill level in place. Crossing the maintenance threshold
    /// moves the point to `MAINTENANCE`.
    ///
    /// # Errors
    ///
    /// Returns [`WcmError::InvalidArgument`] if `level` is outside `0..=100`.
    pub fn update_fill_level(&self, id: u32, level: f64) -> Result<Option<CollectionPoint>> {
        if !(0.0..=100.0).contains(&level) {
            return Err(WcmError::InvalidArgument(format!(
                "fill level must be between 0 and 100, got {level}"
            )));
        }
        let threshold = self.maintenance_threshold;
        self.repo.update_in_place(id, |point| {
            point.fill_level = level;
            if level > threshold && point.state != Some(ContainerState::Maintenance) {
                point.state = Some(ContainerState::Maintenance);
            }
            Ok(())
        })
    }

    /// # Errors
    ///
    /// See [`PointService::by_waste_type`].
    pub fn statistics(&self) -> Result<PointStatistics> {
        let points = self.repo.get_all()?;
        let count_state =
            |state: ContainerState| points.iter().filter(|p| p.state == Some(state)).count();

        let average_fill_level = if points.is_empty() {
            0.0
        } else {
            let sum: f64 = points.iter().map(|p| p.fill_level).sum();
            #[allow(clippy::cast_precision_loss)]
            let mean = sum / points.len() as f64;
            (mean * 100.0).round() / 100.0
        };

        Ok(PointStatistics {
            total: points.len(),
            active: count_state(ContainerState::Active),
            maintenance: count_state(ContainerState::Maintenance),
            out_of_service: count_state(ContainerState::OutOfService),
            critical: points
                .iter()
                .filter(|p| p.fill_level > self.critical_threshold)
                .count(),
            average_fill_level,
        })
    }
}
