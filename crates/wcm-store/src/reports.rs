//! Incident reports.

use wcm_core::error::Result;
use wcm_core::report::{Report, ReportStatus};

use crate::repository::Repository;

#[derive(Clone)]
pub struct ReportService {
    repo: Repository<Report>,
}

impl ReportService {
    pub(crate) fn new(repo: Repository<Report>) -> Self {
        Self { repo }
    }

    #[must_use]
    pub fn repository(&self) -> &Repository<Report> {
        &self.repo
    }

    /// File a report; it starts as `NEW` and is stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns the save error.
    pub fn create(&self, report: Report) -> Result<Report> {
        self.repo.create(report)
    }

    /// # Errors
    ///
    /// Returns [`wcm_core::WcmError::Parse`] if the stored document is malformed.
    pub fn by_employee(&self, employee_id: u32) -> Result<Vec<Report>> {
        self.repo.find(|r| r.employee_id == Some(employee_id))
    }

    /// # Errors
    ///
    /// Returns the save error.
    pub fn update_status(&self, id: u32, status: ReportStatus) -> Result<Option<Report>> {
        self.repo.update_with(id, |r| {
            r.status = Some(status);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::open_store;
    use wcm_core::report::ReportKind;

    #[test]
    fn reports_by_employee_and_status_changes() {
        let (_dir, store) = open_store();
        let reports = store.reports();
        let mut mine = Report::new(ReportKind::TruckBreakdown, "engine smoke");
        mine.employee_id = Some(3);
        let mine = reports.create(mine).unwrap();
        reports
            .create(Report::new(ReportKind::Overflow, "from a citizen"))
            .unwrap();

        assert_eq!(reports.by_employee(3).unwrap(), vec![mine.clone()]);
        let resolved = reports
            .update_status(mine.id, ReportStatus::Resolved)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.status, Some(ReportStatus::Resolved));
    }
}
