//! Tour scheduling: resolves references, enforces the scheduling rules and
//! commits under the tours lock.
//!
//! Referenced employees, vehicles and points are read without taking their
//! collections' locks.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Local, NaiveDate, Weekday};
use serde::Serialize;
use tracing::{info, warn};

use wcm_core::error::{Result, WcmError};
use wcm_core::point::{CollectionPoint, WasteKind};
use wcm_core::scheduling::SchedulingRules;
use wcm_core::staff::StaffMember;
use wcm_core::tour::{Tour, TourPatch, TourRequest, TourStatus, TourUpdate};
use wcm_core::vehicle::Vehicle;
use wcm_core::Entity;

use crate::import::ImportSummary;
use crate::repository::Repository;

/// One weekday and waste type served in a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneSchedule {
    pub weekday: Weekday,
    pub waste_type: WasteKind,
    /// Distinct `HH:mm` start times, sorted.
    pub start_times: Vec<String>,
}

#[derive(Clone)]
pub struct TourScheduler {
    tours: Repository<Tour>,
    employees: Repository<StaffMember>,
    vehicles: Repository<Vehicle>,
    points: Repository<CollectionPoint>,
    rules: SchedulingRules,
}

impl TourScheduler {
    pub(crate) fn new(
        tours: Repository<Tour>,
        employees: Repository<StaffMember>,
        vehicles: Repository<Vehicle>,
        points: Repository<CollectionPoint>,
        rules: SchedulingRules,
    ) -> Self {
        Self {
            tours,
            employees,
            vehicles,
            points,
            rules,
        }
    }

    /// # Errors
    ///
    /// Returns [`WcmError::Parse`] if the tours document is malformed.
    pub fn get_all(&self) -> Result<Vec<Tour>> {
        self.tours.get_all()
    }

    /// # Errors
    ///
    /// See [`TourScheduler::get_all`].
    pub fn get_by_id(&self, id: u32) -> Result<Option<Tour>> {
        self.tours.get_by_id(id)
    }

    /// # Errors
    ///
    /// See [`TourScheduler::get_all`].
    pub fn by_employee(&self, employee_id: u32) -> Result<Vec<Tour>> {
        self.tours.find(|t| t.employee.id == employee_id)
    }

    /// # Errors
    ///
    /// See [`TourScheduler::get_all`].
    pub fn by_date(&self, date: NaiveDate) -> Result<Vec<Tour>> {
        self.tours.find(|t| t.planned_date == date)
    }

    /// # Errors
    ///
    /// See [`Repository::delete`].
    pub fn delete(&self, id: u32) -> Result<bool> {
        self.tours.delete(id)
    }

    /// Schedule a new tour.
    ///
    /// # Errors
    ///
    /// - [`WcmError::InvalidArgument`] if the employee, the vehicle or the
    ///   points are missing or zero
    /// - [`WcmError::NotFound`] if a referenced entity does not exist
    /// - [`WcmError::Schedule`] if a scheduling rule rejects the tour
    /// - [`WcmError::Validation`] if the resulting document breaks its schema
    pub fn create(&self, request: TourRequest) -> Result<Tour> {
        let employee_id = required_ref("employee", request.employee_id)?;
        let vehicle_id = required_ref("vehicle", request.vehicle_id)?;
        check_point_ids(&request.point_ids)?;

        let employee = self.resolve_employee(employee_id)?;
        let vehicle = self.resolve_vehicle(vehicle_id)?;
        let collection_points = self.resolve_points(&request.point_ids)?;

        let mut tour = Tour {
            id: 0,
            planned_date: request
                .planned_date
                .unwrap_or_else(|| Local::now().date_naive()),
            status: request.status.unwrap_or_default(),
            employee: employee.clone(),
            vehicle: vehicle.clone(),
            collection_points,
            start_time: request.start_time.filter(|s| !s.trim().is_empty()),
            end_time: request.end_time.filter(|s| !s.trim().is_empty()),
            distance_km: request.distance_km,
        };

        let created = self.tours.locked(|items| {
            if let Err(e) = self.rules.validate(&tour, &employee, &vehicle, items) {
                warn!(employee_id, error = %e, "tour rejected");
                return Err(e.into());
            }
            tour.set_id(self.tours.next_id(items)?);
            tour.apply_defaults();
            items.push(tour.clone());
            Ok((tour, true))
        })?;
        info!(id = created.id, employee_id, date = %created.planned_date, "tour scheduled");
        Ok(created)
    }

    /// Change an existing tour and re-run every scheduling rule on the
    /// result. Returns `None` if there is no tour `id`.
    ///
    /// # Errors
    ///
    /// As for [`TourScheduler::create`], plus [`WcmError::InvalidArgument`]
    /// when the tour is completed or the status would move backwards.
    pub fn update(&self, id: u32, update: TourUpdate) -> Result<Option<Tour>> {
        if let Some(point_ids) = update.point_ids.as_deref().filter(|ids| !ids.is_empty()) {
            check_point_ids(point_ids)?;
        }

        let patch = TourPatch {
            planned_date: update.planned_date,
            status: update.status,
            employee: match update.employee_id.filter(|id| *id != 0) {
                Some(id) => Some(self.resolve_employee(id)?),
                None => None,
            },
            vehicle: match update.vehicle_id.filter(|id| *id != 0) {
                Some(id) => Some(self.resolve_vehicle(id)?),
                None => None,
            },
            collection_points: match update.point_ids.as_deref().filter(|ids| !ids.is_empty()) {
                Some(ids) => Some(self.resolve_points(ids)?),
                None => None,
            },
            start_time: update.start_time,
            end_time: update.end_time,
            distance_km: update.distance_km,
        };

        let updated = self.tours.locked(|items| {
            let Some(pos) = items.iter().position(|t| t.id == id) else {
                return Ok((None, false));
            };
            let current = &items[pos];
            if current.status.is_terminal() {
                return Err(WcmError::InvalidArgument(format!(
                    "tour {id} is completed and can no longer change"
                )));
            }
            if let Some(next) = patch.status {
                if !current.status.can_transition_to(next) {
                    return Err(WcmError::InvalidArgument(format!(
                        "tour {id} cannot go from {:?} to {next:?}",
                        current.status
                    )));
                }
            }

            let mut merged = current.clone();
            merged.apply_patch(patch);
            let employee = self.resolve_employee(merged.employee.id)?;
            let vehicle = self.resolve_vehicle(merged.vehicle.id)?;
            if let Err(e) = self.rules.validate(&merged, &employee, &vehicle, items) {
                warn!(id, error = %e, "tour update rejected");
                return Err(e.into());
            }

            items.remove(pos);
            items.push(merged.clone());
            Ok((Some(merged), true))
        })?;
        if updated.is_some() {
            info!(id, "tour updated");
        }
        Ok(updated)
    }

    /// Merge a tours document into the collection. Every incoming tour, in
    /// its merged form, must pass the same rules as [`TourScheduler::create`]
    /// against the tours already stored and those imported before it.
    ///
    /// # Errors
    ///
    /// As for [`Repository::import_document`], plus [`WcmError::NotFound`]
    /// and [`WcmError::Schedule`] from the scheduling rules. Nothing is
    /// saved when any tour is rejected.
    pub fn import_document(&self, text: &str) -> Result<ImportSummary> {
        self.tours.import_checked(text, |tour, others| {
            let employee = self.resolve_employee(tour.employee.id)?;
            let vehicle = self.resolve_vehicle(tour.vehicle.id)?;
            self.rules
                .validate(tour, &employee, &vehicle, others)
                .map_err(|e| {
                    warn!(id = tour.id, error = %e, "imported tour rejected");
                    e.into()
                })
        })
    }

    /// Collection days for a zone: tours with at least one point whose
    /// address contains `zone` (case-insensitive), grouped by weekday and
    /// waste type, with the start times seen for each.
    ///
    /// # Errors
    ///
    /// See [`TourScheduler::get_all`].
    pub fn schedules_by_zone(&self, zone: &str) -> Result<Vec<ZoneSchedule>> {
        let zone = zone.to_lowercase();
        let mut slots: BTreeMap<(u32, WasteKind), (Weekday, BTreeSet<String>)> = BTreeMap::new();

        for tour in self.tours.get_all()? {
            let in_zone = tour
                .collection_points
                .iter()
                .any(|p| p.address.to_lowercase().contains(&zone));
            if !in_zone {
                continue;
            }
            let weekday = tour.planned_date.weekday();
            for kind in tour
                .collection_points
                .iter()
                .filter_map(|p| p.waste_type.as_ref().map(|w| w.name))
            {
                let (_, times) = slots
                    .entry((weekday.num_days_from_monday(), kind))
                    .or_insert_with(|| (weekday, BTreeSet::new()));
                if let Some(start) = &tour.start_time {
                    times.insert(start.clone());
                }
            }
        }

        Ok(slots
            .into_iter()
            .map(|((_, waste_type), (weekday, times))| ZoneSchedule {
                weekday,
                waste_type,
                start_times: times.into_iter().collect(),
            })
            .collect())
    }

    /// Move tour `id` to `status`.
    ///
    /// # Errors
    ///
    /// See [`TourScheduler::update`].
    pub fn update_status(&self, id: u32, status: TourStatus) -> Result<Option<Tour>> {
        self.update(
            id,
            TourUpdate {
                status: Some(status),
                ..TourUpdate::default()
            },
        )
    }

    fn resolve_employee(&self, id: u32) -> Result<StaffMember> {
        self.employees
            .get_by_id(id)?
            .ok_or_else(|| WcmError::not_found(self.employees.collection(), id))
    }

    fn resolve_vehicle(&self, id: u32) -> Result<Vehicle> {
        self.vehicles
            .get_by_id(id)?
            .ok_or_else(|| WcmError::not_found(self.vehicles.collection(), id))
    }

    fn resolve_points(&self, ids: &[u32]) -> Result<Vec<CollectionPoint>> {
        let all = self.points.get_all()?;
        ids.iter()
            .map(|id| {
                all.iter()
                    .find(|p| p.id == *id)
                    .cloned()
                    .ok_or_else(|| WcmError::not_found(self.points.collection(), *id))
            })
            .collect()
    }
}

fn required_ref(what: &str, id: Option<u32>) -> Result<u32> {
    match id {
        Some(id) if id != 0 => Ok(id),
        _ => Err(WcmError::InvalidArgument(format!("a tour needs a {what}"))),
    }
}

fn check_point_ids(ids: &[u32]) -> Result<()> {
    if ids.is_empty() {
        return Err(WcmError::InvalidArgument(
            "a tour needs at least one collection point".to_string(),
        ));
    }
    if ids.contains(&0) {
        return Err(WcmError::InvalidArgument(
            "collection point ids must be non-zero".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wcm_core::error::ScheduleError;
    use wcm_core::point::WasteType;

    use crate::test_support::{open_store, seed_fleet};

    fn request(employee: u32, vehicle: u32, points: Vec<u32>, start: &str) -> TourRequest {
        TourRequest {
            planned_date: NaiveDate::from_ymd_opt(2024, 6, 10),
            employee_id: Some(employee),
            vehicle_id: Some(vehicle),
            point_ids: points,
            start_time: Some(start.to_string()),
            ..TourRequest::default()
        }
    }

    #[test]
    fn missing_references_are_invalid_arguments() {
        let (_dir, store) = open_store();
        let tours = store.tours();
        for bad in [
            TourRequest::default(),
            request(0, 1, vec![1], "08:00"),
            request(1, 0, vec![1], "08:00"),
            request(1, 1, vec![], "08:00"),
            request(1, 1, vec![1, 0], "08:00"),
        ] {
            assert!(matches!(
                tours.create(bad),
                Err(WcmError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn unknown_references_are_not_found() {
        let (_dir, store) = open_store();
        let fleet = seed_fleet(&store);
        let err = store
            .tours()
            .create(request(fleet.employee, fleet.truck, vec![fleet.point, 77], "08:00"))
            .unwrap_err();
        match err {
            WcmError::NotFound { collection, id } => {
                assert_eq!(collection, "collection_points");
                assert_eq!(id, 77);
            }
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn created_tour_embeds_resolved_copies() {
        let (_dir, store) = open_store();
        let fleet = seed_fleet(&store);
        let tour = store
            .tours()
            .create(request(fleet.employee, fleet.truck, vec![fleet.point], "08:00"))
            .unwrap();

        assert_eq!(tour.status, TourStatus::Planned);
        assert_eq!(tour.employee.id, fleet.employee);
        assert_eq!(tour.employee.first_name, "Ada");
        assert_eq!(tour.vehicle.plate_number, "AB-123-CD");
        assert_eq!(tour.collection_points[0].address, "1 rue Haute");
    }

    #[test]
    fn update_excludes_itself_from_conflicts() {
        let (_dir, store) = open_store();
        let fleet = seed_fleet(&store);
        let tours = store.tours();
        let tour = tours
            .create(request(fleet.employee, fleet.truck, vec![fleet.point], "08:00"))
            .unwrap();

        let moved = tours
            .update(
                tour.id,
                TourUpdate {
                    start_time: Some("08:45".to_string()),
                    distance_km: Some(14.0),
                    ..TourUpdate::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(moved.start_time.as_deref(), Some("08:45"));
        assert!((moved.distance_km - 14.0).abs() < f64::EPSILON);
    }

    #[test]
    fn status_cannot_regress_and_completed_tours_are_frozen() {
        let (_dir, store) = open_store();
        let fleet = seed_fleet(&store);
        let tours = store.tours();
        let tour = tours
            .create(request(fleet.employee, fleet.truck, vec![fleet.point], "08:00"))
            .unwrap();

        tours.update_status(tour.id, TourStatus::InProgress).unwrap();
        assert!(matches!(
            tours.update_status(tour.id, TourStatus::Planned),
            Err(WcmError::InvalidArgument(_))
        ));

        tours.update_status(tour.id, TourStatus::Completed).unwrap();
        assert!(matches!(
            tours.update(
                tour.id,
                TourUpdate {
                    distance_km: Some(3.0),
                    ..TourUpdate::default()
                }
            ),
            Err(WcmError::InvalidArgument(_))
        ));
    }

    #[test]
    fn imported_tours_pass_the_scheduling_rules() {
        let (_dir, store) = open_store();
        let fleet = seed_fleet(&store);
        let tours = store.tours();
        let booked = tours
            .create(request(fleet.employee, fleet.truck, vec![fleet.point], "08:00"))
            .unwrap();

        let document = |start: &str| {
            let mut tour = booked.clone();
            tour.id = 0;
            tour.start_time = Some(start.to_string());
            serde_yaml::to_string(&BTreeMap::from([("tours", vec![tour])])).unwrap()
        };

        let err = tours.import_document(&document("08:30")).unwrap_err();
        assert!(matches!(
            err,
            WcmError::Schedule(ScheduleError::Conflict { .. })
        ));
        assert_eq!(tours.get_all().unwrap().len(), 1);

        let summary = tours.import_document(&document("10:00")).unwrap();
        assert_eq!(summary.imported_count, 1);
        assert_eq!(tours.get_all().unwrap().len(), 2);
    }

    #[test]
    fn schedules_by_zone_groups_by_weekday_and_waste_type() {
        let (_dir, store) = open_store();
        let fleet = seed_fleet(&store);
        let mut glass = CollectionPoint::new("8 RUE HAUTE", 20.0);
        glass.waste_type = Some(WasteType {
            id: 2,
            name: WasteKind::Glass,
        });
        let glass = store.repository::<CollectionPoint>().create(glass).unwrap();
        let elsewhere = store
            .repository::<CollectionPoint>()
            .create(CollectionPoint::new("3 quai Bas", 10.0))
            .unwrap();

        let tours = store.tours();
        let on = |date: (i32, u32, u32), points: Vec<u32>, start: &str| {
            let mut req = request(fleet.employee, fleet.truck, points, start);
            req.planned_date = NaiveDate::from_ymd_opt(date.0, date.1, date.2);
            tours.create(req).unwrap();
        };
        // 2024-06-10 and 2024-06-17 are Mondays, 2024-06-12 a Wednesday.
        on((2024, 6, 10), vec![fleet.point], "08:00");
        on((2024, 6, 17), vec![fleet.point], "10:00");
        on((2024, 6, 12), vec![glass.id], "14:00");
        on((2024, 6, 13), vec![elsewhere.id], "09:00");

        let schedules = tours.schedules_by_zone("haute").unwrap();
        assert_eq!(
            schedules,
            vec![
                ZoneSchedule {
                    weekday: Weekday::Mon,
                    waste_type: WasteKind::Mixed,
                    start_times: vec!["08:00".to_string(), "10:00".to_string()],
                },
                ZoneSchedule {
                    weekday: Weekday::Wed,
                    waste_type: WasteKind::Glass,
                    start_times: vec!["14:00".to_string()],
                },
            ]
        );
        assert!(tours.schedules_by_zone("avenue").unwrap().is_empty());
    }

    #[test]
    fn completed_tour_frees_the_slot() {
        let (_dir, store) = open_store();
        let fleet = seed_fleet(&store);
        let tours = store.tours();
        let first = tours
            .create(request(fleet.employee, fleet.truck, vec![fleet.point], "08:00"))
            .unwrap();
        tours.update_status(first.id, TourStatus::Completed).unwrap();

        let second = tours
            .create(request(fleet.employee, fleet.truck, vec![fleet.point], "08:15"))
            .unwrap();
        assert!(second.id > first.id);
        assert_eq!(tours.by_employee(fleet.employee).unwrap().len(), 2);
        assert_eq!(
            tours
                .by_date(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap())
                .unwrap()
                .len(),
            2
        );
    }
}
