//! Staff lookups and role-checked creation.

use tracing::warn;

use wcm_core::error::{Result, WcmError};
use wcm_core::staff::{Role, StaffMember};

use crate::repository::Repository;

#[derive(Clone)]
pub struct StaffService {
    repo: Repository<StaffMember>,
    /// Role every member of this collection must have; `None` for the
    /// combined users collection.
    role: Option<Role>,
}

impl StaffService {
    pub(crate) fn new(repo: Repository<StaffMember>, role: Option<Role>) -> Self {
        Self { repo, role }
    }

    #[must_use]
    pub fn repository(&self) -> &Repository<StaffMember> {
        &self.repo
    }

    /// Store a new member after checking its role against this collection
    /// and the role policy.
    ///
    /// # Errors
    ///
    /// Returns [`WcmError::InvalidArgument`] if the member's role does not
    /// belong here or it carries fields its role does not allow.
    pub fn create(&self, member: StaffMember) -> Result<StaffMember> {
        if let Some(role) = self.role.filter(|r| *r != member.role) {
            warn!(collection = %self.repo.collection(), ?role, "staff member with wrong role rejected");
            return Err(WcmError::InvalidArgument(format!(
                "{} only holds {role:?} members, got {:?}",
                self.repo.collection(),
                member.role
            )));
        }
        member.check_policy()?;
        self.repo.create(member)
    }

    /// Case-insensitive exact match on the email address.
    ///
    /// # Errors
    ///
    /// Returns [`WcmError::Parse`] if the stored document is malformed.
    pub fn find_by_email(&self, email: &str) -> Result<Option<StaffMember>> {
        let email = email.trim();
        Ok(self
            .repo
            .get_all()?
            .into_iter()
            .find(|m| m.email.eq_ignore_ascii_case(email)))
    }

    /// Members whose first or last name contains `query`, ignoring case.
    ///
    /// # Errors
    ///
    /// See [`StaffService::find_by_email`].
    pub fn search_by_name(&self, query: &str) -> Result<Vec<StaffMember>> {
        let query = query.trim().to_lowercase();
        self.repo.find(|m| {
            m.first_name.to_lowercase().contains(&query)
                || m.last_name.to_lowercase().contains(&query)
        })
    }

    /// # Errors
    ///
    /// See [`StaffService::find_by_email`].
    pub fn available(&self) -> Result<Vec<StaffMember>> {
        self.repo.find(StaffMember::is_available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::open_store;

    #[test]
    fn role_must_match_collection() {
        let (_dir, store) = open_store();
        let employees = store.staff(Role::Employee);
        let admin = StaffMember::new(Role::Admin, "root@city.fr", "Ana", "Lopez");
        assert!(matches!(
            employees.create(admin.clone()),
            Err(WcmError::InvalidArgument(_))
        ));

        let created = store.users().create(admin).unwrap();
        assert_eq!(created.id, 1);
    }

    #[test]
    fn policy_violations_are_rejected() {
        let (_dir, store) = open_store();
        let mut tech = StaffMember::new(Role::Technician, "t@city.fr", "Tom", "Petit");
        tech.zone = Some("north".to_string());
        assert!(store.staff(Role::Technician).create(tech).is_err());

        let mut boss = StaffMember::new(Role::Supervisor, "s@city.fr", "Sam", "Roux");
        boss.zone = Some("north".to_string());
        let boss = store.staff(Role::Supervisor).create(boss).unwrap();
        assert_eq!(boss.zone.as_deref(), Some("north"));
    }

    #[test]
    fn lookups_by_email_and_name() {
        let (_dir, store) = open_store();
        let employees = store.staff(Role::Employee);
        let ada = employees
            .create(StaffMember::new(Role::Employee, "ada@city.fr", "Ada", "Martin"))
            .unwrap();
        employees
            .create(StaffMember::new(Role::Employee, "bob@city.fr", "Bob", "Martinez"))
            .unwrap();

        assert_eq!(ada.available, Some(true));
        assert_eq!(
            employees.find_by_email(" ADA@city.fr").unwrap().map(|m| m.id),
            Some(ada.id)
        );
        assert!(employees.find_by_email("nobody@city.fr").unwrap().is_none());
        assert_eq!(employees.search_by_name("martin").unwrap().len(), 2);
        assert_eq!(employees.search_by_name("BOB").unwrap().len(), 1);
        assert_eq!(employees.available().unwrap().len(), 2);
    }
}
