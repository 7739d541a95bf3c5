//! # wcm-core
//!
//! Core types, schemas, and scheduling rules for the waste-collection store.
//!
//! This crate defines the foundational types used by the other WCM crates:
//! - [`Entity`]: the contract every persisted record satisfies
//! - Records ([`StaffMember`], [`Vehicle`], [`CollectionPoint`], [`Tour`],
//!   [`Notification`], [`Report`])
//! - [`SchemaDefinition`]: collection document contracts
//! - [`SchedulingRules`]: availability, double-booking and capacity checks
//! - Error hierarchy ([`WcmError`], [`ValidationError`], [`ScheduleError`],
//!   [`SchemaError`])

pub mod entity;
pub mod error;
pub mod notification;
pub mod point;
pub mod report;
pub mod scheduling;
pub mod schema;
pub mod staff;
pub mod tour;
pub mod vehicle;

pub use entity::{DirectWrite, Entity};
pub use error::{Location, Result, ScheduleError, SchemaError, ValidationError, WcmError};
pub use notification::{Notification, NotificationPatch};
pub use point::{CollectionPoint, ContainerState, PointPatch, WasteKind, WasteType};
pub use report::{Report, ReportKind, ReportPatch, ReportStatus};
pub use scheduling::SchedulingRules;
pub use schema::{FieldDef, FieldType, SchemaDefinition};
pub use staff::{Role, RolePolicy, StaffMember, StaffPatch, ROLE_POLICIES};
pub use tour::{Tour, TourPatch, TourRequest, TourStatus, TourUpdate};
pub use vehicle::{Vehicle, VehiclePatch, VehicleStatus};
