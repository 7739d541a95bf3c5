//! Business rules a tour must satisfy before it is stored.
//!
//! Checks run in a fixed order, and the first failure wins:
//! 1. the assigned employee is available
//! 2. the employee is not already booked on another live tour in the same
//!    date and start hour
//! 3. the collection points fit in the vehicle
//!
//! Start times are compared by hour only. A missing or unreadable start time
//! on either tour counts as a clash.

use crate::error::ScheduleError;
use crate::point::CollectionPoint;
use crate::staff::StaffMember;
use crate::tour::Tour;
use crate::vehicle::Vehicle;

/// Default volume assumed for a container without an explicit capacity.
pub const NOMINAL_BIN_CAPACITY: f64 = 1000.0;

/// Hour component of an `HH:mm` string.
#[must_use]
pub fn start_hour(time: Option<&str>) -> Option<u32> {
    let time = time?.trim();
    if time.is_empty() {
        return None;
    }
    let hour = time.split(':').next()?.trim().parse::<u32>().ok()?;
    (hour < 24).then_some(hour)
}

/// Whether two start times fall in the same clock hour.
#[must_use]
pub fn same_hour_slot(a: Option<&str>, b: Option<&str>) -> bool {
    match (start_hour(a), start_hour(b)) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// Sum of the volumes the tour's points are expected to produce.
#[must_use]
pub fn required_volume(points: &[CollectionPoint], nominal_capacity: f64) -> f64 {
    points
        .iter()
        .map(|p| p.estimated_volume(nominal_capacity))
        .sum()
}

/// Tour-level scheduling rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulingRules {
    pub nominal_bin_capacity: f64,
}

impl Default for SchedulingRules {
    fn default() -> Self {
        Self {
            nominal_bin_capacity: NOMINAL_BIN_CAPACITY,
        }
    }
}

impl SchedulingRules {
    #[must_use]
    pub fn new(nominal_bin_capacity: f64) -> Self {
        Self {
            nominal_bin_capacity,
        }
    }

    /// Run every rule against `tour`.
    ///
    /// `employee` and `vehicle` are the current stored records for the ids
    /// the tour references; `others` are the tours already in the collection.
    /// A completed tour skips the availability and booking checks.
    ///
    /// # Errors
    ///
    /// Returns the first [`ScheduleError`] encountered.
    pub fn validate(
        &self,
        tour: &Tour,
        employee: &StaffMember,
        vehicle: &Vehicle,
        others: &[Tour],
    ) -> Result<(), ScheduleError> {
        if !tour.status.is_terminal() {
            Self::check_availability(employee)?;
            Self::check_double_booking(tour, others)?;
        }
        self.check_capacity(vehicle, &tour.collection_points)
    }

    /// # Errors
    ///
    /// Returns [`ScheduleError::EmployeeUnavailable`] if the employee's
    /// availability flag is not set.
    pub fn check_availability(employee: &StaffMember) -> Result<(), ScheduleError> {
        if employee.is_available() {
            Ok(())
        } else {
            Err(ScheduleError::EmployeeUnavailable {
                employee_id: employee.id,
                name: employee.full_name(),
            })
        }
    }

    /// # Errors
    ///
    /// Returns [`ScheduleError::Conflict`] naming the first clashing tour.
    pub fn check_double_booking(tour: &Tour, others: &[Tour]) -> Result<(), ScheduleError> {
        let start = tour.start_time.as_deref();
        let clash = others.iter().find(|other| {
            other.id != tour.id
                && !other.status.is_terminal()
                && other.employee.id == tour.employee.id
                && other.planned_date == tour.planned_date
                && same_hour_slot(other.start_time.as_deref(), start)
        });

        match clash {
            Some(other) => Err(ScheduleError::Conflict {
                employee_id: tour.employee.id,
                date: tour.planned_date.to_string(),
                hour: start_hour(start),
                conflicting_tour: other.id,
            }),
            None => Ok(()),
        }
    }

    /// # Errors
    ///
    /// Returns [`ScheduleError::CapacityExceeded`] when the points' combined
    /// volume is larger than the vehicle's capacity.
    pub fn check_capacity(
        &self,
        vehicle: &Vehicle,
        points: &[CollectionPoint],
    ) -> Result<(), ScheduleError> {
        let required = required_volume(points, self.nominal_bin_capacity);
        if required > vehicle.capacity {
            return Err(ScheduleError::CapacityExceeded {
                capacity: vehicle.capacity,
                required,
            });
        }
        Ok(())
    }
}
