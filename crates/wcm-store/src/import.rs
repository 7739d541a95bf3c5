//! Bulk import of external collection documents, deduplicated by id.

use std::collections::HashSet;

use serde::Serialize;
use tracing::info;

use wcm_core::entity::Entity;
use wcm_core::error::Result;

use crate::repository::Repository;

/// Outcome of [`Repository::import_document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported_count: usize,
    pub total_in_document: usize,
}

impl<T: Entity> Repository<T> {
    /// Fold `incoming` into the collection and save once.
    ///
    /// An incoming entity whose id is already stored overwrites the stored
    /// entity's fields wherever its own are non-blank. Any other entity is
    /// appended with defaults applied; it keeps its id unless that id is `0`
    /// or was already taken earlier in the same batch, in which case it gets
    /// a fresh one. Returns how many entities were imported.
    ///
    /// # Errors
    ///
    /// Returns [`wcm_core::WcmError::Validation`] if the merged document
    /// breaks its schema. Nothing is saved in that case.
    pub fn merge(&self, incoming: Vec<T>) -> Result<usize> {
        self.merge_checked(incoming, |_, _| Ok(()))
    }

    /// [`merge`](Repository::merge) with `check` run on every entity in its
    /// final form, against the collection as it stands before that entity
    /// goes in. A failed check aborts the whole batch.
    pub(crate) fn merge_checked(
        &self,
        incoming: Vec<T>,
        mut check: impl FnMut(&T, &[T]) -> Result<()>,
    ) -> Result<usize> {
        let count = self.locked(|items| {
            let original: HashSet<u32> = items.iter().map(Entity::id).collect();
            let mut consumed: HashSet<u32> = HashSet::new();
            let mut count = 0;

            for mut entity in incoming {
                let id = entity.id();
                if id != 0 && original.contains(&id) {
                    if let Some(pos) = items.iter().position(|e| e.id() == id) {
                        let mut merged = items[pos].clone();
                        merged.overwrite_from(entity);
                        check(&merged, items)?;
                        items[pos] = merged;
                    }
                    consumed.insert(id);
                    count += 1;
                    continue;
                }

                if id == 0 || consumed.contains(&id) {
                    let fresh = self.next_id(items)?;
                    entity.set_id(fresh);
                }
                entity.apply_defaults();
                check(&entity, items)?;
                consumed.insert(entity.id());
                items.push(entity);
                count += 1;
            }
            Ok((count, count > 0))
        })?;
        info!(collection = %self.collection(), count, "entities merged");
        Ok(count)
    }

    /// Parse `text` as a document of this collection, check each entry
    /// against the freshly reloaded schema, then [`merge`](Repository::merge)
    /// it. Repeated ids in the document are resolved by the merge; the
    /// merged collection must still satisfy the schema.
    ///
    /// # Errors
    ///
    /// Returns [`wcm_core::WcmError::Parse`] for malformed input and
    /// [`wcm_core::WcmError::Validation`] for schema violations in either the
    /// incoming entries or the merged document.
    pub fn import_document(&self, text: &str) -> Result<ImportSummary> {
        self.import_checked(text, |_, _| Ok(()))
    }

    pub(crate) fn import_checked(
        &self,
        text: &str,
        check: impl FnMut(&T, &[T]) -> Result<()>,
    ) -> Result<ImportSummary> {
        let documents = &self.shared().documents;
        let schema = documents.schema_name(self.collection())?;
        documents.registry().invalidate(&schema)?;

        let incoming: Vec<T> = documents.parse_document(self.collection(), text)?;
        let total_in_document = incoming.len();
        let imported_count = self.merge_checked(incoming, check)?;
        info!(
            collection = %self.collection(),
            imported_count,
            total_in_document,
            "document imported"
        );
        Ok(ImportSummary {
            imported_count,
            total_in_document,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;
    use wcm_core::report::{Report, ReportKind, ReportStatus};
    use wcm_core::vehicle::Vehicle;

    use crate::test_support::open_store;

    fn report(id: u32, description: &str) -> Report {
        let mut r = Report::new(ReportKind::Overflow, description);
        r.id = id;
        r
    }

    #[test]
    fn matching_id_overwrites_non_blank_fields() {
        let (_dir, store) = open_store();
        let reports = store.repository::<Report>();
        let mut stored = reports.create(report(0, "bin full")).unwrap();
        stored.point_id = Some(12);
        reports.merge(vec![stored.clone()]).unwrap();

        let mut incoming = report(stored.id, "bin emptied");
        incoming.status = Some(ReportStatus::Resolved);
        assert_eq!(reports.merge(vec![incoming]).unwrap(), 1);

        let all = reports.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].description, "bin emptied");
        assert_eq!(all[0].status, Some(ReportStatus::Resolved));
        assert_eq!(all[0].point_id, Some(12));
    }

    #[test]
    fn zero_and_repeated_ids_get_fresh_ones() {
        let (_dir, store) = open_store();
        let reports = store.repository::<Report>();
        reports.create(report(0, "existing")).unwrap();

        let imported = reports
            .merge(vec![report(0, "a"), report(9, "b"), report(9, "c")])
            .unwrap();
        assert_eq!(imported, 3);

        let ids: Vec<u32> = reports.get_all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 9, 10]);
    }

    #[test]
    fn invalid_batch_persists_nothing() {
        let (dir, store) = open_store();
        let vehicles = store.repository::<Vehicle>();
        vehicles
            .create(Vehicle::new("AB-123-CD", "van", 900.0))
            .unwrap();
        let before = std::fs::read(dir.path().join("vehicles.yaml")).unwrap();

        let bad = Vehicle::new("", "van", -1.0);
        assert!(vehicles.merge(vec![bad]).unwrap_err().is_validation());
        assert_eq!(std::fs::read(dir.path().join("vehicles.yaml")).unwrap(), before);
    }

    #[test]
    fn import_document_reports_both_counts() {
        let (_dir, store) = open_store();
        let reports = store.repository::<Report>();
        let summary = reports
            .import_document(
                "reports:\n  - id: 0\n    kind: DAMAGE\n    description: dented\n  - id: 0\n    kind: OVERFLOW\n    description: full\n",
            )
            .unwrap();
        assert_eq!(summary.imported_count, 2);
        assert_eq!(summary.total_in_document, 2);
        assert_eq!(reports.get_all().unwrap().len(), 2);
    }

    #[test]
    fn import_document_reassigns_repeated_ids() {
        let (_dir, store) = open_store();
        let reports = store.repository::<Report>();
        let summary = reports
            .import_document(
                "reports:\n  - id: 9\n    kind: DAMAGE\n    description: dented\n  - id: 9\n    kind: OVERFLOW\n    description: full\n",
            )
            .unwrap();
        assert_eq!(summary.imported_count, 2);

        let all = reports.get_all().unwrap();
        let ids: Vec<u32> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![9, 10]);
        assert_eq!(all[1].description, "full");
    }

    #[test]
    fn import_document_rejects_schema_violations() {
        let (_dir, store) = open_store();
        let reports = store.repository::<Report>();
        let err = reports
            .import_document("reports:\n  - id: 1\n    kind: FLOOD\n    description: x\n")
            .unwrap_err();
        assert!(err.is_validation());
        assert!(reports.get_all().unwrap().is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn merge_never_duplicates_ids(
            existing in 0usize..5,
            incoming in proptest::collection::vec(0u32..8, 0..12),
        ) {
            let (_dir, store) = open_store();
            let reports = store.repository::<Report>();
            for i in 0..existing {
                reports.create(report(0, &format!("r{i}"))).unwrap();
            }

            let batch: Vec<Report> = incoming.iter().map(|id| report(*id, "imported")).collect();
            let imported = reports.merge(batch).unwrap();
            prop_assert_eq!(imported, incoming.len());

            let all = reports.get_all().unwrap();
            let unique: HashSet<u32> = all.iter().map(|r| r.id).collect();
            prop_assert_eq!(unique.len(), all.len());
        }
    }
}
