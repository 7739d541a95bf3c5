//! Vehicle status tracking and breakdown alerts.

use tracing::info;

use wcm_core::error::Result;
use wcm_core::notification::Notification;
use wcm_core::vehicle::{Vehicle, VehicleStatus};

use crate::repository::Repository;

#[derive(Clone)]
pub struct FleetService {
    repo: Repository<Vehicle>,
    notifications: Repository<Notification>,
}

impl FleetService {
    pub(crate) fn new(repo: Repository<Vehicle>, notifications: Repository<Notification>) -> Self {
        Self {
            repo,
            notifications,
        }
    }

    #[must_use]
    pub fn repository(&self) -> &Repository<Vehicle> {
        &self.repo
    }

    /// # Errors
    ///
    /// Returns [`wcm_core::WcmError::Parse`] if the stored document is malformed.
    pub fn by_status(&self, status: VehicleStatus) -> Result<Vec<Vehicle>> {
        self.repo.find(|v| v.status == Some(status))
    }

    /// # Errors
    ///
    /// See [`FleetService::by_status`].
    pub fn available(&self) -> Result<Vec<Vehicle>> {
        self.repo.find(|v| v.available)
    }

    /// Set a vehicle's status. It stays available only while `AVAILABLE`.
    /// Entering `BROKEN_DOWN` notifies technicians.
    ///
    /// The notification is written first, while the vehicles lock is held;
    /// if it cannot be written the status change is not saved either. A
    /// failure saving the vehicle afterwards leaves the notification behind.
    ///
    /// # Errors
    ///
    /// Returns the load or save error of either collection.
    pub fn update_status(&self, id: u32, status: VehicleStatus) -> Result<Option<Vehicle>> {
        self.repo.update_with(id, |vehicle| {
            let entering_breakdown = status == VehicleStatus::BrokenDown
                && vehicle.status != Some(VehicleStatus::BrokenDown);
            if entering_breakdown {
                let notice = self
                    .notifications
                    .create(Notification::vehicle_breakdown(vehicle.id, &vehicle.plate_number))?;
                info!(vehicle_id = vehicle.id, notification = notice.id, "breakdown reported");
            }
            vehicle.status = Some(status);
            vehicle.available = status == VehicleStatus::Available;
            Ok(())
        })
    }
}
