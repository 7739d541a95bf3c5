//! Staff members: one record shape for every role, with role-specific fields
//! governed by [`ROLE_POLICIES`].

use serde::{Deserialize, Serialize};

use crate::entity::{self, DirectWrite, Entity};
use crate::error::{Result, WcmError};

/// Role of a staff member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Supervisor,
    Technician,
    Employee,
}

impl Role {
    #[must_use]
    pub fn policy(self) -> &'static RolePolicy {
        // Table is indexed in declaration order.
        &ROLE_POLICIES[self as usize]
    }
}

/// What a role is allowed to carry and where its records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolePolicy {
    pub role: Role,
    /// Collection holding members of this role.
    pub collection: &'static str,
    /// Members carry an `available` flag, defaulting to `true`.
    pub tracks_availability: bool,
    /// Members may carry a supervised `zone`.
    pub has_zone: bool,
}

pub const ROLE_POLICIES: [RolePolicy; 4] = [
    RolePolicy {
        role: Role::Admin,
        collection: "admins",
        tracks_availability: false,
        has_zone: false,
    },
    RolePolicy {
        role: Role::Supervisor,
        collection: "supervisors",
        tracks_availability: false,
        has_zone: true,
    },
    RolePolicy {
        role: Role::Technician,
        collection: "technicians",
        tracks_availability: false,
        has_zone: false,
    },
    RolePolicy {
        role: Role::Employee,
        collection: "employees",
        tracks_availability: true,
        has_zone: false,
    },
];

/// Combined collection used for account lookup across all roles.
pub const USERS_COLLECTION: &str = "users";

/// A person on staff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: u32,
    pub email: String,
    pub last_name: String,
    pub first_name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

impl StaffMember {
    /// New member with the given role and identity; everything else empty.
    pub fn new(
        role: Role,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            email: email.into(),
            last_name: last_name.into(),
            first_name: first_name.into(),
            phone: String::new(),
            password: None,
            role,
            available: None,
            zone: None,
        }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Members of roles without availability tracking are always available.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !self.role.policy().tracks_availability || self.available == Some(true)
    }

    /// Check role-specific fields against the role's policy.
    ///
    /// # Errors
    ///
    /// Returns [`WcmError::InvalidArgument`] if a field not allowed for the
    /// role is set.
    pub fn check_policy(&self) -> Result<()> {
        let policy = self.role.policy();
        if !policy.tracks_availability && self.available.is_some() {
            return Err(WcmError::InvalidArgument(format!(
                "role {:?} does not track availability",
                self.role
            )));
        }
        if !policy.has_zone && self.zone.is_some() {
            return Err(WcmError::InvalidArgument(format!(
                "role {:?} cannot be assigned a zone",
                self.role
            )));
        }
        Ok(())
    }
}

/// Partial update for a [`StaffMember`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaffPatch {
    pub email: Option<String>,
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub available: Option<bool>,
    pub zone: Option<String>,
}

impl Entity for StaffMember {
    type Patch = StaffPatch;

    const COLLECTION: &'static str = "employees";

    fn id(&self) -> u32 {
        self.id
    }

    fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    fn apply_defaults(&mut self) {
        if self.role.policy().tracks_availability && self.available.is_none() {
            self.available = Some(true);
        }
    }

    fn apply_patch(&mut self, patch: StaffPatch) {
        entity::patch(&mut self.email, patch.email);
        entity::patch(&mut self.last_name, patch.last_name);
        entity::patch(&mut self.first_name, patch.first_name);
        entity::patch(&mut self.phone, patch.phone);
        entity::patch_opt(&mut self.password, patch.password);
        entity::patch_value(&mut self.role, patch.role);
        if patch.available.is_some() {
            self.available = patch.available;
        }
        entity::patch_opt(&mut self.zone, patch.zone);
    }

    fn overwrite_from(&mut self, incoming: StaffMember) {
        entity::overwrite(&mut self.email, incoming.email);
        entity::overwrite(&mut self.last_name, incoming.last_name);
        entity::overwrite(&mut self.first_name, incoming.first_name);
        entity::overwrite(&mut self.phone, incoming.phone);
        entity::overwrite(&mut self.password, incoming.password);
        self.role = incoming.role;
        entity::overwrite_opt(&mut self.available, incoming.available);
        entity::overwrite(&mut self.zone, incoming.zone);
    }
}

impl DirectWrite for StaffMember {}
