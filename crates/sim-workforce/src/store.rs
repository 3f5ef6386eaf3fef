//! In-memory consultant roster and title-history log.
//!
//! Append-mostly: consultants and entries are only added, and the single
//! mutation is closing an open entry's end date. Every write is checked
//! against the gapless non-overlap invariant and rejected with
//! `BadHistoryWrite` when it would break it.

use chrono::{Days, NaiveDate};
use std::collections::HashMap;

use sim_core::{
    domain::validate_title_entry, Consultant, ConsultantId, EventKind, SimError,
    TitleHistoryEntry, TitleId,
};

/// Owner of consultants and their title histories.
#[derive(Debug, Default)]
pub struct WorkforceStore {
    consultants: Vec<Consultant>,
    by_id: HashMap<ConsultantId, usize>,
    entries: Vec<TitleHistoryEntry>,
    history: HashMap<ConsultantId, Vec<usize>>,
}

impl WorkforceStore {
    pub fn new() -> WorkforceStore {
        WorkforceStore::default()
    }

    pub fn len(&self) -> usize {
        self.consultants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consultants.is_empty()
    }

    /// Append a consultant; ids must be unique.
    pub fn add_consultant(&mut self, c: Consultant) -> Result<(), SimError> {
        if self.by_id.contains_key(&c.id) {
            return Err(SimError::invariant(format!(
                "duplicate consultant id {}",
                c.id
            )));
        }
        self.by_id.insert(c.id.clone(), self.consultants.len());
        self.consultants.push(c);
        Ok(())
    }

    /// Append a title-history entry, enforcing the chronological gapless
    /// non-overlap contract for the consultant.
    pub fn add_title_entry(&mut self, e: TitleHistoryEntry) -> Result<(), SimError> {
        validate_title_entry(&e)?;
        if !self.by_id.contains_key(&e.consultant) {
            return Err(SimError::BadHistoryWrite {
                consultant: e.consultant.0.clone(),
                date: e.start,
                reason: "unknown consultant".into(),
            });
        }
        let indices = self.history.entry(e.consultant.clone()).or_default();
        match indices.last().map(|i| &self.entries[*i]) {
            None => {
                if e.event != EventKind::Hire {
                    return Err(SimError::BadHistoryWrite {
                        consultant: e.consultant.0.clone(),
                        date: e.start,
                        reason: format!("first entry must be Hire, got {}", e.event.as_str()),
                    });
                }
            }
            Some(last) => {
                if e.event == EventKind::Hire {
                    return Err(SimError::BadHistoryWrite {
                        consultant: e.consultant.0.clone(),
                        date: e.start,
                        reason: "Hire must be the first entry".into(),
                    });
                }
                if last.event.is_terminal() {
                    return Err(SimError::BadHistoryWrite {
                        consultant: e.consultant.0.clone(),
                        date: e.start,
                        reason: format!("history already terminated by {}", last.event.as_str()),
                    });
                }
                let Some(last_end) = last.end else {
                    return Err(SimError::BadHistoryWrite {
                        consultant: e.consultant.0.clone(),
                        date: e.start,
                        reason: "previous entry is still open".into(),
                    });
                };
                let expected = last_end
                    .checked_add_days(Days::new(1))
                    .unwrap_or(last_end);
                if e.start != expected {
                    return Err(SimError::BadHistoryWrite {
                        consultant: e.consultant.0.clone(),
                        date: e.start,
                        reason: format!("gap or overlap after {last_end}"),
                    });
                }
            }
        }
        indices.push(self.entries.len());
        self.entries.push(e);
        Ok(())
    }

    /// Close the consultant's open entry on `end`.
    pub fn close_open_entry(
        &mut self,
        id: &ConsultantId,
        end: NaiveDate,
    ) -> Result<(), SimError> {
        let Some(indices) = self.history.get(id) else {
            return Err(SimError::BadHistoryWrite {
                consultant: id.0.clone(),
                date: end,
                reason: "no history".into(),
            });
        };
        for i in indices.iter().rev() {
            let entry = &mut self.entries[*i];
            if entry.end.is_none() {
                if end < entry.start {
                    return Err(SimError::BadHistoryWrite {
                        consultant: id.0.clone(),
                        date: end,
                        reason: format!("close date precedes start {}", entry.start),
                    });
                }
                entry.end = Some(end);
                return Ok(());
            }
        }
        Err(SimError::BadHistoryWrite {
            consultant: id.0.clone(),
            date: end,
            reason: "no open entry".into(),
        })
    }

    pub fn consultant(&self, id: &ConsultantId) -> Option<&Consultant> {
        self.by_id.get(id).map(|i| &self.consultants[*i])
    }

    pub fn consultant_mut(&mut self, id: &ConsultantId) -> Option<&mut Consultant> {
        self.by_id.get(id).map(|i| &mut self.consultants[*i])
    }

    /// All consultants in insertion order.
    pub fn consultants(&self) -> impl Iterator<Item = &Consultant> {
        self.consultants.iter()
    }

    pub fn entries(&self) -> impl Iterator<Item = &TitleHistoryEntry> {
        self.entries.iter()
    }

    pub fn entries_for(&self, id: &ConsultantId) -> Vec<&TitleHistoryEntry> {
        self.history
            .get(id)
            .map(|indices| indices.iter().map(|i| &self.entries[*i]).collect())
            .unwrap_or_default()
    }

    /// The currently open (end = null) entry, if any.
    pub fn open_entry(&self, id: &ConsultantId) -> Option<&TitleHistoryEntry> {
        self.entries_for(id).into_iter().find(|e| e.end.is_none())
    }

    /// The entry whose window contains `date`, open or closed.
    pub fn entry_on(&self, id: &ConsultantId, date: NaiveDate) -> Option<&TitleHistoryEntry> {
        self.entries_for(id)
            .into_iter()
            .find(|e| e.start <= date && e.end.map_or(true, |end| end >= date))
    }

    /// The single open-ended entry whose window contains `date`.
    pub fn open_entry_on(&self, id: &ConsultantId, date: NaiveDate) -> Option<&TitleHistoryEntry> {
        self.open_entry(id).filter(|e| e.start <= date)
    }

    /// Whether the history covers `date` at all (terminal windows included).
    pub fn has_entry_on(&self, id: &ConsultantId, date: NaiveDate) -> bool {
        self.entry_on(id, date).is_some()
    }

    pub fn latest_event(&self, id: &ConsultantId) -> Option<EventKind> {
        self.entries_for(id).last().map(|e| e.event)
    }

    /// Title id from the entry covering `date`.
    pub fn latest_title_id(&self, id: &ConsultantId, date: NaiveDate) -> Option<TitleId> {
        self.entry_on(id, date).map(|e| e.title)
    }

    /// The staffing pool: employed on `date` and not already marked as
    /// leaving (latest event is not Attrition/Layoff).
    pub fn consultants_employed_on(&self, date: NaiveDate) -> Vec<&Consultant> {
        self.consultants
            .iter()
            .filter(|c| {
                self.has_entry_on(&c.id, date)
                    && !self.latest_event(&c.id).map_or(true, EventKind::is_terminal)
            })
            .collect()
    }

    /// Years spent at the current title as of `as_of`, anchored on the most
    /// recent Hire or Promotion entry at that title.
    pub fn years_in_role(&self, id: &ConsultantId, title: TitleId, as_of: NaiveDate) -> f64 {
        let entries = self.entries_for(id);
        let anchor = entries
            .iter()
            .rev()
            .find(|e| e.title == title && matches!(e.event, EventKind::Hire | EventKind::Promotion))
            .or_else(|| entries.iter().find(|e| e.title == title));
        match anchor {
            Some(e) => (as_of - e.start).num_days() as f64 / 365.25,
            None => 0.0,
        }
    }

    /// Full-store invariant sweep used by tests and the end-of-run check:
    /// chronological order, gaplessness, single open entry, Hire first,
    /// terminal entries last.
    pub fn validate(&self) -> Result<(), SimError> {
        for c in &self.consultants {
            let entries = self.entries_for(&c.id);
            if entries.is_empty() {
                return Err(SimError::invariant(format!("{} has no history", c.id)));
            }
            let mut open_count = 0;
            for (i, e) in entries.iter().enumerate() {
                if i == 0 && e.event != EventKind::Hire {
                    return Err(SimError::invariant(format!("{} does not begin with Hire", c.id)));
                }
                if i > 0 {
                    let prev = entries[i - 1];
                    let Some(prev_end) = prev.end else {
                        return Err(SimError::invariant(format!(
                            "{} has an open entry before the last",
                            c.id
                        )));
                    };
                    if prev.event.is_terminal() {
                        return Err(SimError::invariant(format!(
                            "{} has entries after a terminal event",
                            c.id
                        )));
                    }
                    if e.start != prev_end + chrono::Duration::days(1) {
                        return Err(SimError::invariant(format!(
                            "{} history has a gap or overlap at {}",
                            c.id, e.start
                        )));
                    }
                }
                if e.end.is_none() {
                    open_count += 1;
                }
            }
            if open_count > 1 {
                return Err(SimError::invariant(format!("{} has {open_count} open entries", c.id)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::ConsultantMeta;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn consultant(id: &str) -> Consultant {
        Consultant {
            id: ConsultantId(id.into()),
            first_name: "Ada".into(),
            last_name: "Quinn".into(),
            email: "aquinn0001@example.com".into(),
            phone: "+1-555-010-0000".into(),
            business_unit: sim_core::UnitId(1),
            hire_year: 2015,
            meta: ConsultantMeta::default(),
        }
    }

    fn entry(id: &str, title: u8, start: NaiveDate, event: EventKind) -> TitleHistoryEntry {
        TitleHistoryEntry {
            consultant: ConsultantId(id.into()),
            title: TitleId(title),
            start,
            end: None,
            event,
            salary: 80_000,
        }
    }

    #[test]
    fn hire_then_promotion_is_gapless() {
        let mut store = WorkforceStore::new();
        store.add_consultant(consultant("C0001")).unwrap();
        store
            .add_title_entry(entry("C0001", 1, ymd(2015, 1, 1), EventKind::Hire))
            .unwrap();
        store
            .close_open_entry(&ConsultantId("C0001".into()), ymd(2016, 5, 31))
            .unwrap();
        store
            .add_title_entry(entry("C0001", 2, ymd(2016, 6, 1), EventKind::Promotion))
            .unwrap();
        store.validate().unwrap();
        let id = ConsultantId("C0001".into());
        assert_eq!(store.latest_title_id(&id, ymd(2016, 7, 1)), Some(TitleId(2)));
        assert_eq!(store.latest_title_id(&id, ymd(2015, 7, 1)), Some(TitleId(1)));
    }

    #[test]
    fn gap_is_rejected() {
        let mut store = WorkforceStore::new();
        store.add_consultant(consultant("C0001")).unwrap();
        store
            .add_title_entry(entry("C0001", 1, ymd(2015, 1, 1), EventKind::Hire))
            .unwrap();
        store
            .close_open_entry(&ConsultantId("C0001".into()), ymd(2015, 12, 31))
            .unwrap();
        let err = store
            .add_title_entry(entry("C0001", 1, ymd(2016, 1, 5), EventKind::Continuation))
            .unwrap_err();
        assert!(matches!(err, SimError::BadHistoryWrite { .. }));
    }

    #[test]
    fn second_open_entry_is_rejected() {
        let mut store = WorkforceStore::new();
        store.add_consultant(consultant("C0001")).unwrap();
        store
            .add_title_entry(entry("C0001", 1, ymd(2015, 1, 1), EventKind::Hire))
            .unwrap();
        let err = store
            .add_title_entry(entry("C0001", 2, ymd(2015, 6, 1), EventKind::Promotion))
            .unwrap_err();
        assert!(matches!(err, SimError::BadHistoryWrite { .. }));
    }

    #[test]
    fn writes_after_terminal_are_rejected() {
        let mut store = WorkforceStore::new();
        store.add_consultant(consultant("C0001")).unwrap();
        store
            .add_title_entry(entry("C0001", 1, ymd(2015, 1, 1), EventKind::Hire))
            .unwrap();
        store
            .close_open_entry(&ConsultantId("C0001".into()), ymd(2015, 12, 31))
            .unwrap();
        let mut terminal = entry("C0001", 1, ymd(2016, 1, 1), EventKind::Attrition);
        terminal.end = Some(ymd(2016, 6, 3));
        store.add_title_entry(terminal).unwrap();
        let err = store
            .add_title_entry(entry("C0001", 1, ymd(2016, 6, 4), EventKind::Continuation))
            .unwrap_err();
        assert!(matches!(err, SimError::BadHistoryWrite { .. }));
    }

    #[test]
    fn terminal_entry_excludes_from_staffing_pool() {
        let mut store = WorkforceStore::new();
        store.add_consultant(consultant("C0001")).unwrap();
        store
            .add_title_entry(entry("C0001", 1, ymd(2015, 1, 1), EventKind::Hire))
            .unwrap();
        store
            .close_open_entry(&ConsultantId("C0001".into()), ymd(2015, 12, 31))
            .unwrap();
        let mut terminal = entry("C0001", 1, ymd(2016, 1, 1), EventKind::Layoff);
        terminal.end = Some(ymd(2016, 4, 10));
        store.add_title_entry(terminal).unwrap();
        // History still covers the terminal window...
        assert!(store.has_entry_on(&ConsultantId("C0001".into()), ymd(2016, 2, 1)));
        // ...but the consultant is no longer staffable.
        assert!(store.consultants_employed_on(ymd(2016, 2, 1)).is_empty());
    }

    #[test]
    fn years_in_role_anchors_on_promotion() {
        let mut store = WorkforceStore::new();
        store.add_consultant(consultant("C0001")).unwrap();
        store
            .add_title_entry(entry("C0001", 1, ymd(2015, 1, 1), EventKind::Hire))
            .unwrap();
        store
            .close_open_entry(&ConsultantId("C0001".into()), ymd(2016, 12, 31))
            .unwrap();
        store
            .add_title_entry(entry("C0001", 2, ymd(2017, 1, 1), EventKind::Promotion))
            .unwrap();
        store
            .close_open_entry(&ConsultantId("C0001".into()), ymd(2017, 12, 31))
            .unwrap();
        store
            .add_title_entry(entry("C0001", 2, ymd(2018, 1, 1), EventKind::Continuation))
            .unwrap();
        let id = ConsultantId("C0001".into());
        let years = store.years_in_role(&id, TitleId(2), ymd(2019, 1, 1));
        assert!((years - 2.0).abs() < 0.02, "promotion anchor, got {years}");
    }
}
