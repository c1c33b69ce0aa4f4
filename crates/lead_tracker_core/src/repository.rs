//! crates/lead_tracker_core/src/repository.rs
//!
//! CRUD and query operations over the lead collection.
//!
//! Each operation reads the whole collection from the `LeadStore`, works on it
//! in memory and, for mutations, writes the whole collection back. Mutations in
//! this process are serialized by `write_lock`; separate processes sharing the
//! same backing store still overwrite each other (last writer wins).

use crate::domain::{Lead, LeadFilter, LeadForm, LeadPatch, LeadStatus};
use crate::ports::{PortError, PortResult};
use crate::store::LeadStore;
use crate::validation::{validate_lead, validate_lead_form};
use mockable::Clock;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What to do when the stored collection cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CorruptionPolicy {
    /// Keep a timestamped copy of the bad value, log a warning and continue
    /// with an empty collection.
    #[default]
    Reset,
    /// Return `PortError::Corrupted` to the caller.
    Fail,
}

impl FromStr for CorruptionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reset" => Ok(CorruptionPolicy::Reset),
            "fail" => Ok(CorruptionPolicy::Fail),
            other => Err(format!("'{other}' is not one of: reset, fail")),
        }
    }
}

pub struct LeadRepository {
    store: LeadStore,
    clock: Arc<dyn Clock>,
    policy: CorruptionPolicy,
    write_lock: Mutex<()>,
}

impl LeadRepository {
    pub fn new(store: LeadStore, clock: Arc<dyn Clock>) -> Self {
        Self::with_policy(store, clock, CorruptionPolicy::default())
    }

    pub fn with_policy(store: LeadStore, clock: Arc<dyn Clock>, policy: CorruptionPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
            write_lock: Mutex::new(()),
        }
    }

    //=====================================================================================
    // Queries
    //=====================================================================================

    /// All leads created by `user_id`, in insertion order.
    pub fn list_by_owner(&self, user_id: &str) -> PortResult<Vec<Lead>> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|lead| lead.created_by == user_id)
            .collect())
    }

    pub fn get_by_id(&self, id: &str) -> PortResult<Option<Lead>> {
        Ok(self.load()?.into_iter().find(|lead| lead.id == id))
    }

    /// The owner's leads narrowed by every criterion set in `criteria`.
    pub fn filter(&self, user_id: &str, criteria: &LeadFilter) -> PortResult<Vec<Lead>> {
        let mut leads = self.list_by_owner(user_id)?;
        leads.retain(|lead| criteria.matches(lead));
        debug!(user_id, matched = leads.len(), "Filtered leads");
        Ok(leads)
    }

    /// Open leads whose follow-up date is today in local time.
    pub fn due_today(&self, user_id: &str) -> PortResult<Vec<Lead>> {
        let today = self.clock.local().date_naive();
        let mut leads = self.list_by_owner(user_id)?;
        leads.retain(|lead| lead.follow_up_date == today && lead.status.is_open());
        Ok(leads)
    }

    //=====================================================================================
    // Mutations
    //=====================================================================================

    /// Validates `form` and appends a new lead owned by `user_id`.
    pub fn create(&self, form: LeadForm, user_id: &str) -> PortResult<Lead> {
        validate_lead_form(&form)?;
        let _guard = self.lock()?;

        let mut leads = self.load()?;
        let lead = Lead::from_form(self.next_id(&leads), form, user_id, self.clock.utc());
        leads.push(lead.clone());
        self.store.save(&leads)?;

        info!(lead_id = %lead.id, user_id, "Created lead");
        Ok(lead)
    }

    /// Merges `patch` into the lead and refreshes `updated_at`.
    /// The merged lead must still pass the same checks as a new one.
    pub fn update(&self, id: &str, patch: LeadPatch) -> PortResult<Lead> {
        let _guard = self.lock()?;

        let mut leads = self.load()?;
        let lead = leads
            .iter_mut()
            .find(|lead| lead.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Lead {id} not found")))?;

        let mut updated = lead.clone();
        updated.apply(patch);
        validate_lead(&updated)?;
        // Never move backwards, even if the clock does.
        updated.updated_at = self.clock.utc().max(updated.updated_at).max(updated.created_at);
        *lead = updated.clone();
        self.store.save(&leads)?;

        info!(lead_id = %id, status = %updated.status.as_str(), "Updated lead");
        Ok(updated)
    }

    pub fn update_status(&self, id: &str, status: LeadStatus) -> PortResult<Lead> {
        self.update(id, LeadPatch::status(status))
    }

    /// Removes the lead. Deleting an unknown id is a no-op.
    pub fn delete(&self, id: &str) -> PortResult<()> {
        let _guard = self.lock()?;

        let mut leads = self.load()?;
        let before = leads.len();
        leads.retain(|lead| lead.id != id);
        if leads.len() == before {
            debug!(lead_id = %id, "Delete of unknown lead ignored");
            return Ok(());
        }
        self.store.save(&leads)?;

        info!(lead_id = %id, "Deleted lead");
        Ok(())
    }

    //=====================================================================================
    // Helpers
    //=====================================================================================

    fn load(&self) -> PortResult<Vec<Lead>> {
        match self.store.load() {
            Err(PortError::Corrupted { key, reason }) if self.policy == CorruptionPolicy::Reset => {
                let copy = self.store.quarantine(self.clock.utc())?;
                warn!(
                    key = %key,
                    reason = %reason,
                    copy = copy.as_deref().unwrap_or("-"),
                    "Lead collection is corrupted; continuing with an empty collection"
                );
                Ok(Vec::new())
            }
            other => other,
        }
    }

    fn lock(&self) -> PortResult<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| PortError::Unexpected("lead repository lock poisoned".to_string()))
    }

    fn next_id(&self, existing: &[Lead]) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if !existing.iter().any(|lead| lead.id == id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LeadSource;
    use crate::ports::{InMemoryStore, KeyValueStore};
    use crate::store::LEADS_KEY;
    use crate::test_support::MutableClock;
    use chrono::{DateTime, Days, NaiveDate, Utc};
    use rstest::{fixture, rstest};
    use std::collections::HashSet;

    const OWNER: &str = "owner-1";

    struct Fixture {
        kv: Arc<InMemoryStore>,
        clock: Arc<MutableClock>,
        repo: LeadRepository,
    }

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn form(student: &str) -> LeadForm {
        LeadForm {
            student_name: student.into(),
            parent_name: format!("{student}'s parent"),
            contact_number: "555-0100".into(),
            contact_email: None,
            class_name: "Grade 2".into(),
            street: "12 Oak Ave".into(),
            source: LeadSource::Website,
            follow_up_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            notes: String::new(),
        }
    }

    fn seeded(id: &str, student: &str, parent: &str, status: LeadStatus, created: &str) -> Lead {
        let at = utc(created);
        Lead {
            id: id.into(),
            student_name: student.into(),
            parent_name: parent.into(),
            contact_number: "555-0100".into(),
            contact_email: None,
            class_name: "Grade 2".into(),
            street: "12 Oak Ave".into(),
            source: LeadSource::Website,
            follow_up_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            notes: String::new(),
            status,
            created_at: at,
            updated_at: at,
            created_by: OWNER.into(),
        }
    }

    #[fixture]
    fn fx() -> Fixture {
        let kv = Arc::new(InMemoryStore::new());
        let clock = Arc::new(MutableClock::new(utc("2025-02-10T12:00:00Z")));
        let repo = LeadRepository::new(LeadStore::new(kv.clone()), clock.clone());
        Fixture { kv, clock, repo }
    }

    fn seed(fx: &Fixture, leads: &[Lead]) {
        LeadStore::new(fx.kv.clone()).save(leads).unwrap();
    }

    #[rstest]
    fn create_assigns_new_status_and_timestamps(fx: Fixture) {
        let lead = fx.repo.create(form("Alice"), OWNER).unwrap();
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.created_at, utc("2025-02-10T12:00:00Z"));
        assert_eq!(lead.updated_at, lead.created_at);
        assert_eq!(lead.created_by, OWNER);
        assert_eq!(fx.repo.get_by_id(&lead.id).unwrap(), Some(lead));
    }

    #[rstest]
    fn created_ids_are_distinct(fx: Fixture) {
        let ids: HashSet<String> = (0..50)
            .map(|n| fx.repo.create(form(&format!("S{n}")), OWNER).unwrap().id)
            .collect();
        assert_eq!(ids.len(), 50);
        assert_eq!(fx.repo.list_by_owner(OWNER).unwrap().len(), 50);
    }

    #[rstest]
    fn create_rejects_missing_fields_without_writing(fx: Fixture) {
        let mut bad = form("Alice");
        bad.student_name = String::new();
        assert!(matches!(
            fx.repo.create(bad, OWNER),
            Err(PortError::Validation(_))
        ));
        assert_eq!(fx.kv.get(LEADS_KEY).unwrap(), None);
    }

    #[rstest]
    fn list_by_owner_excludes_other_users(fx: Fixture) {
        fx.repo.create(form("Mine"), OWNER).unwrap();
        fx.repo.create(form("Theirs"), "someone-else").unwrap();
        let mine = fx.repo.list_by_owner(OWNER).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].student_name, "Mine");
    }

    #[rstest]
    fn update_merges_and_refreshes_updated_at(fx: Fixture) {
        let lead = fx.repo.create(form("Alice"), OWNER).unwrap();
        fx.clock.advance_seconds(90);
        let updated = fx
            .repo
            .update(
                &lead.id,
                LeadPatch {
                    notes: Some("Called twice".into()),
                    ..LeadPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.notes, "Called twice");
        assert_eq!(updated.student_name, "Alice");
        assert_eq!(updated.created_at, lead.created_at);
        assert_eq!(updated.updated_at, utc("2025-02-10T12:01:30Z"));
        assert_eq!(fx.repo.get_by_id(&lead.id).unwrap(), Some(updated));
    }

    #[rstest]
    fn updated_at_never_moves_backwards(fx: Fixture) {
        let lead = fx.repo.create(form("Alice"), OWNER).unwrap();
        fx.clock.advance_seconds(-3600);
        let updated = fx.repo.update_status(&lead.id, LeadStatus::Contacted).unwrap();
        assert!(updated.updated_at >= lead.updated_at);
        assert!(updated.updated_at >= updated.created_at);
    }

    #[rstest]
    fn update_unknown_id_is_not_found(fx: Fixture) {
        assert!(matches!(
            fx.repo.update_status("missing", LeadStatus::Closed),
            Err(PortError::NotFound(_))
        ));
    }

    #[rstest]
    fn update_rejects_invalid_merge_without_writing(fx: Fixture) {
        let lead = fx.repo.create(form("Alice"), OWNER).unwrap();
        fx.clock.advance_seconds(60);

        let patches = [
            LeadPatch {
                student_name: Some("   ".into()),
                ..LeadPatch::default()
            },
            LeadPatch {
                contact_number: Some("call me".into()),
                ..LeadPatch::default()
            },
            LeadPatch {
                contact_email: Some("nope".into()),
                ..LeadPatch::default()
            },
        ];
        for patch in patches {
            assert!(matches!(
                fx.repo.update(&lead.id, patch),
                Err(PortError::Validation(_))
            ));
        }
        assert_eq!(fx.repo.get_by_id(&lead.id).unwrap(), Some(lead.clone()));

        // Clearing the optional email is still allowed.
        let cleared = fx
            .repo
            .update(
                &lead.id,
                LeadPatch {
                    contact_email: Some(String::new()),
                    ..LeadPatch::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.contact_email, None);
    }

    #[rstest]
    fn delete_is_idempotent(fx: Fixture) {
        let keep = fx.repo.create(form("Keep"), OWNER).unwrap();
        let gone = fx.repo.create(form("Gone"), OWNER).unwrap();

        fx.repo.delete(&gone.id).unwrap();
        let once = fx.repo.list_by_owner(OWNER).unwrap();
        fx.repo.delete(&gone.id).unwrap();
        let twice = fx.repo.list_by_owner(OWNER).unwrap();

        assert_eq!(once, twice);
        assert_eq!(once, vec![keep]);
    }

    #[rstest]
    fn filter_seeded_scenario(fx: Fixture) {
        seed(
            &fx,
            &[
                seeded("l1", "Alice", "Ann", LeadStatus::New, "2025-01-01T00:00:00Z"),
                seeded("l2", "Bob", "Ben", LeadStatus::Converted, "2025-01-03T00:00:00Z"),
            ],
        );
        let ids = |criteria: LeadFilter| -> Vec<String> {
            fx.repo
                .filter(OWNER, &criteria)
                .unwrap()
                .into_iter()
                .map(|l| l.id)
                .collect()
        };

        assert_eq!(
            ids(LeadFilter {
                status: Some(LeadStatus::New),
                ..LeadFilter::default()
            }),
            vec!["l1"]
        );
        assert_eq!(
            ids(LeadFilter {
                search_query: Some("bob".into()),
                ..LeadFilter::default()
            }),
            vec!["l2"]
        );
        assert_eq!(ids(LeadFilter::default()), vec!["l1", "l2"]);
    }

    #[rstest]
    fn filter_is_conjunction_of_predicates(fx: Fixture) {
        let mut fixtures = Vec::new();
        let names = ["Alice", "Bob", "Carla", "Dmitri"];
        for (n, status) in LeadStatus::ALL.into_iter().enumerate() {
            for (m, source) in [LeadSource::Website, LeadSource::Community]
                .into_iter()
                .enumerate()
            {
                let idx = n * 2 + m;
                let mut lead = seeded(
                    &format!("l{idx}"),
                    names[idx % names.len()],
                    "Parent",
                    status,
                    &format!("2025-01-{:02}T08:00:00Z", idx + 1),
                );
                lead.source = source;
                fixtures.push(lead);
            }
        }
        seed(&fx, &fixtures);

        let statuses = [None, Some(LeadStatus::New), Some(LeadStatus::Closed)];
        let sources = [None, Some(LeadSource::Community)];
        let froms = [None, Some(utc("2025-01-03T08:00:00Z"))];
        let tos = [None, Some(utc("2025-01-07T08:00:00Z"))];
        let queries = [None, Some("AL".to_string())];

        for status in statuses {
            for source in sources {
                for from in froms {
                    for to in tos {
                        for query in &queries {
                            let criteria = LeadFilter {
                                status,
                                source,
                                from,
                                to,
                                search_query: query.clone(),
                            };
                            let expected: Vec<&str> = fixtures
                                .iter()
                                .filter(|l| status.map_or(true, |s| l.status == s))
                                .filter(|l| source.map_or(true, |s| l.source == s))
                                .filter(|l| from.map_or(true, |f| l.created_at >= f))
                                .filter(|l| to.map_or(true, |t| l.created_at <= t))
                                .filter(|l| {
                                    query.as_ref().map_or(true, |q| {
                                        let q = q.to_lowercase();
                                        l.student_name.to_lowercase().contains(&q)
                                            || l.parent_name.to_lowercase().contains(&q)
                                    })
                                })
                                .map(|l| l.id.as_str())
                                .collect();
                            let actual = fx.repo.filter(OWNER, &criteria).unwrap();
                            let actual: Vec<&str> = actual.iter().map(|l| l.id.as_str()).collect();
                            assert_eq!(actual, expected, "criteria: {criteria:?}");
                        }
                    }
                }
            }
        }
    }

    #[rstest]
    fn due_today_skips_closed_and_other_days(fx: Fixture) {
        let today = fx.clock.local().date_naive();
        let mut leads = Vec::new();
        for (id, date, status) in [
            ("due", today, LeadStatus::Contacted),
            ("tomorrow", today + Days::new(1), LeadStatus::New),
            ("yesterday", today - Days::new(1), LeadStatus::New),
            ("converted", today, LeadStatus::Converted),
            ("closed", today, LeadStatus::Closed),
        ] {
            let mut lead = seeded(id, "S", "P", status, "2025-01-01T00:00:00Z");
            lead.follow_up_date = date;
            leads.push(lead);
        }
        seed(&fx, &leads);

        let due: Vec<String> = fx
            .repo
            .due_today(OWNER)
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(due, vec!["due"]);
    }

    #[rstest]
    fn corrupted_collection_resets_and_keeps_a_copy(fx: Fixture) {
        fx.kv.set(LEADS_KEY, "[{\"id\":").unwrap();
        assert!(fx.repo.list_by_owner(OWNER).unwrap().is_empty());
        assert_eq!(
            fx.kv
                .get("leads.corrupt-20250210T120000000Z")
                .unwrap()
                .as_deref(),
            Some("[{\"id\":")
        );

        fx.repo.create(form("Fresh"), OWNER).unwrap();
        assert_eq!(fx.repo.list_by_owner(OWNER).unwrap().len(), 1);
    }

    #[rstest]
    fn fail_policy_surfaces_corruption(fx: Fixture) {
        fx.kv.set(LEADS_KEY, "not json").unwrap();
        let repo = LeadRepository::with_policy(
            LeadStore::new(fx.kv.clone()),
            fx.clock.clone(),
            CorruptionPolicy::Fail,
        );
        assert!(matches!(
            repo.list_by_owner(OWNER),
            Err(PortError::Corrupted { .. })
        ));
        assert!(matches!(
            repo.create(form("Alice"), OWNER),
            Err(PortError::Corrupted { .. })
        ));
    }

    #[test]
    fn corruption_policy_parses() {
        assert_eq!("RESET".parse::<CorruptionPolicy>(), Ok(CorruptionPolicy::Reset));
        assert_eq!("fail".parse::<CorruptionPolicy>(), Ok(CorruptionPolicy::Fail));
        assert!("ignore".parse::<CorruptionPolicy>().is_err());
    }
}
