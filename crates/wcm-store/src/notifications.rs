//! Role-targeted notifications.

use wcm_core::error::Result;
use wcm_core::notification::Notification;
use wcm_core::staff::Role;

use crate::repository::Repository;

#[derive(Clone)]
pub struct NotificationService {
    repo: Repository<Notification>,
}

impl NotificationService {
    pub(crate) fn new(repo: Repository<Notification>) -> Self {
        Self { repo }
    }

    #[must_use]
    pub fn repository(&self) -> &Repository<Notification> {
        &self.repo
    }

    /// # Errors
    ///
    /// Returns the save error.
    pub fn create(&self, notification: Notification) -> Result<Notification> {
        self.repo.create(notification)
    }

    /// Newest first.
    ///
    /// # Errors
    ///
    /// Returns [`wcm_core::WcmError::Parse`] if the stored document is malformed.
    pub fn for_role(&self, role: Role) -> Result<Vec<Notification>> {
        let mut notices = self.repo.find(|n| n.target_role == role)?;
        notices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notices)
    }

    /// # Errors
    ///
    /// See [`NotificationService::for_role`].
    pub fn unread_for_role(&self, role: Role) -> Result<Vec<Notification>> {
        Ok(self
            .for_role(role)?
            .into_iter()
            .filter(|n| !n.read)
            .collect())
    }

    /// Returns `false` if there is no notification `id`.
    ///
    /// # Errors
    ///
    /// Returns the save error.
    pub fn mark_as_read(&self, id: u32) -> Result<bool> {
        let updated = self.repo.update_with(id, |n| {
            n.read = true;
            Ok(())
        })?;
        Ok(updated.is_some())
    }

    /// Tell technicians that `vehicle_id` has broken down.
    ///
    /// # Errors
    ///
    /// Returns the save error.
    pub fn vehicle_breakdown(&self, vehicle_id: u32, plate_number: &str) -> Result<Notification> {
        self.create(Notification::vehicle_breakdown(vehicle_id, plate_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::open_store;

    #[test]
    fn unread_filter_and_mark_as_read() {
        let (_dir, store) = open_store();
        let notices = store.notifications();
        let n = notices.vehicle_breakdown(4, "AB-123-CD").unwrap();
        notices
            .create(Notification::new(Role::Supervisor, "Zone", "North zone late"))
            .unwrap();

        assert_eq!(notices.unread_for_role(Role::Technician).unwrap().len(), 1);
        assert!(notices.mark_as_read(n.id).unwrap());
        assert!(notices.unread_for_role(Role::Technician).unwrap().is_empty());
        assert_eq!(notices.for_role(Role::Technician).unwrap().len(), 1);
        assert!(!notices.mark_as_read(404).unwrap());
    }
}
