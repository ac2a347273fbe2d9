//! Queue bucketing and wait estimates.
//!
//! Buckets are derived on demand from a case listing and never stored. A case belongs to the
//! bucket of its triage level while it has been triaged and is not yet completed. Within a
//! bucket, cases are ordered by score (highest first), then by arrival (earliest first), then by
//! id, which gives a total order: bucketing the same cases twice yields the same sequence.

use crate::case::{Case, CaseStatus};
use crate::config::QueueConfig;
use crate::triage::TriageLevel;
use chrono::{DateTime, Utc};
use medflow_uuid::CaseId;
use serde::Serialize;
use std::cmp::Ordering;

/// Active cases partitioned by level, each bucket in queue order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueBuckets<'a> {
    pub critical: Vec<&'a Case>,
    pub urgent: Vec<&'a Case>,
    pub routine: Vec<&'a Case>,
}

impl<'a> QueueBuckets<'a> {
    pub fn get(&self, level: TriageLevel) -> &[&'a Case] {
        match level {
            TriageLevel::Critical => &self.critical,
            TriageLevel::Urgent => &self.urgent,
            TriageLevel::Routine => &self.routine,
        }
    }

    fn get_mut(&mut self, level: TriageLevel) -> &mut Vec<&'a Case> {
        match level {
            TriageLevel::Critical => &mut self.critical,
            TriageLevel::Urgent => &mut self.urgent,
            TriageLevel::Routine => &mut self.routine,
        }
    }

    pub fn len(&self) -> usize {
        self.critical.len() + self.urgent.len() + self.routine.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn queue_order(a: &Case, b: &Case) -> Ordering {
    let score_a = a.triage_score().unwrap_or_default();
    let score_b = b.triage_score().unwrap_or_default();
    score_b
        .total_cmp(&score_a)
        .then_with(|| a.created_at().cmp(&b.created_at()))
        .then_with(|| a.id().cmp(&b.id()))
}

/// Partitions active cases by triage level.
///
/// Pending and completed cases are left out.
pub fn bucket<'a, I>(cases: I) -> QueueBuckets<'a>
where
    I: IntoIterator<Item = &'a Case>,
{
    let mut buckets = QueueBuckets::default();
    for case in cases {
        if !case.is_active() {
            continue;
        }
        if let Some(level) = case.triage_level() {
            buckets.get_mut(level).push(case);
        }
    }
    for level in TriageLevel::ALL {
        buckets.get_mut(level).sort_by(|a, b| queue_order(a, b));
    }
    buckets
}

/// Estimated wait for the case at 0-based `position`.
pub fn estimated_wait_minutes(config: &QueueConfig, level: TriageLevel, position: usize) -> u64 {
    position as u64 * u64::from(config.service_minutes(level))
}

/// Estimated time to clear a bucket of `len` cases.
pub fn estimated_clearance_minutes(config: &QueueConfig, level: TriageLevel, len: usize) -> u64 {
    len as u64 * u64::from(config.service_minutes(level))
}

/// One row of a queue listing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueueEntry {
    pub case_id: CaseId,
    pub chief_complaint: String,
    pub score: f64,
    pub status: CaseStatus,
    pub claimed_by: Option<String>,
    pub position: usize,
    pub estimated_wait_minutes: u64,
}

/// Ordered cases of one level.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LevelQueue {
    pub level: TriageLevel,
    pub entries: Vec<QueueEntry>,
    pub estimated_clearance_minutes: u64,
}

/// Owned view of every bucket, most urgent level first.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueueSnapshot {
    pub levels: Vec<LevelQueue>,
}

impl QueueSnapshot {
    pub fn from_buckets(buckets: &QueueBuckets<'_>, config: &QueueConfig) -> Self {
        let levels = TriageLevel::ALL
            .into_iter()
            .map(|level| {
                let cases = buckets.get(level);
                let entries = cases
                    .iter()
                    .enumerate()
                    .map(|(position, case)| QueueEntry {
                        case_id: case.id(),
                        chief_complaint: case.chief_complaint().to_string(),
                        score: case.triage_score().unwrap_or_default(),
                        status: case.status(),
                        claimed_by: case.claimed_by().map(str::to_owned),
                        position,
                        estimated_wait_minutes: estimated_wait_minutes(config, level, position),
                    })
                    .collect();
                LevelQueue {
                    level,
                    entries,
                    estimated_clearance_minutes: estimated_clearance_minutes(
                        config,
                        level,
                        cases.len(),
                    ),
                }
            })
            .collect();
        Self { levels }
    }

    pub fn level(&self, level: TriageLevel) -> Option<&LevelQueue> {
        self.levels.iter().find(|l| l.level == level)
    }
}

/// Per-level counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LevelStats {
    pub active: usize,
    pub average_wait_minutes: f64,
}

/// Aggregate queue figures.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QueueStats {
    pub total_cases: usize,
    pub pending: usize,
    pub in_review: usize,
    pub completed_today: usize,
    pub critical: LevelStats,
    pub urgent: LevelStats,
    pub routine: LevelStats,
}

impl QueueStats {
    /// Computes statistics over `cases`. "Today" is the UTC calendar day of `now`.
    pub fn compute(cases: &[Case], config: &QueueConfig, now: DateTime<Utc>) -> Self {
        let buckets = bucket(cases);
        let today = now.date_naive();

        let level_stats = |level: TriageLevel| {
            let active = buckets.get(level).len();
            let average_wait_minutes = if active == 0 {
                0.0
            } else {
                let total: u64 = (0..active)
                    .map(|p| estimated_wait_minutes(config, level, p))
                    .sum();
                total as f64 / active as f64
            };
            LevelStats {
                active,
                average_wait_minutes,
            }
        };

        Self {
            total_cases: cases.len(),
            pending: cases
                .iter()
                .filter(|c| c.status() == CaseStatus::Pending)
                .count(),
            in_review: cases
                .iter()
                .filter(|c| c.status() == CaseStatus::InReview)
                .count(),
            completed_today: cases
                .iter()
                .filter_map(Case::completed_at)
                .filter(|at| at.date_naive() == today)
                .count(),
            critical: level_stats(TriageLevel::Critical),
            urgent: level_stats(TriageLevel::Urgent),
            routine: level_stats(TriageLevel::Routine),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Actor, Role};
    use crate::case::NewCase;
    use crate::triage::TriageEvaluator;
    use chrono::Duration;

    fn triaged(severity: u8, symptoms: &[&str], created_at: DateTime<Utc>) -> Case {
        let mut case = Case::new(
            NewCase {
                chief_complaint: "Consultation".into(),
                symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
                severity,
                ..Default::default()
            },
            created_at,
        )
        .unwrap();
        let assessment = TriageEvaluator::default()
            .evaluate(&case.snapshot())
            .unwrap();
        case.apply_triage(assessment, created_at).unwrap();
        case
    }

    fn nurse() -> Actor {
        Actor::new("Nurse Demo", Role::Nurse).unwrap()
    }

    #[test]
    fn orders_by_score_then_arrival() {
        let t0 = Utc::now();
        let red = ["chest pain"];
        // 7 → 2.8 + 2.5 = 5.3, 9 → 3.6 + 2.5 = 6.1; all urgent
        let a = triaged(7, &red, t0 + Duration::minutes(1));
        let b = triaged(7, &red, t0);
        let c = triaged(9, &red, t0 + Duration::minutes(5));
        let cases = vec![a.clone(), b.clone(), c.clone()];

        let buckets = bucket(&cases);
        let ids: Vec<CaseId> = buckets.urgent.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![c.id(), b.id(), a.id()]);
        assert!(buckets.critical.is_empty());
        assert!(buckets.routine.is_empty());
    }

    #[test]
    fn bucketing_is_idempotent() {
        let t0 = Utc::now();
        let cases: Vec<Case> = (1..=10)
            .map(|s| triaged(s, &["cough"], t0 + Duration::seconds(i64::from(s % 3))))
            .collect();
        let first = bucket(&cases);
        let reversed: Vec<Case> = cases.iter().rev().cloned().collect();
        let second = bucket(&reversed);
        for level in TriageLevel::ALL {
            let ids_a: Vec<_> = first.get(level).iter().map(|c| c.id()).collect();
            let ids_b: Vec<_> = second.get(level).iter().map(|c| c.id()).collect();
            assert_eq!(ids_a, ids_b);
        }
        assert_eq!(bucket(&cases), first);
    }

    #[test]
    fn empty_input_gives_empty_buckets() {
        let no_cases: Vec<Case> = Vec::new();
        let buckets = bucket(&no_cases);
        assert!(buckets.is_empty());
        for level in TriageLevel::ALL {
            assert!(buckets.get(level).is_empty());
        }
    }

    #[test]
    fn pending_and_completed_cases_are_excluded() {
        let pending = Case::new(
            NewCase {
                chief_complaint: "Cough".into(),
                symptoms: vec!["cough".into()],
                severity: 3,
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        let mut done = triaged(5, &["cough"], Utc::now());
        done.claim(&nurse()).unwrap();
        done.complete(&nurse(), Utc::now()).unwrap();
        let mut reviewing = triaged(5, &["cough"], Utc::now());
        reviewing.claim(&nurse()).unwrap();

        let cases = vec![pending, done, reviewing.clone()];
        let buckets = bucket(&cases);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets.routine[0].id(), reviewing.id());
    }

    #[test]
    fn snapshot_estimates_waits_by_position() {
        let t0 = Utc::now();
        let cases: Vec<Case> = (0..3)
            .map(|i| triaged(2, &["cough"], t0 + Duration::minutes(i)))
            .collect();
        let config = QueueConfig::default();
        let snapshot = QueueSnapshot::from_buckets(&bucket(&cases), &config);

        let routine = snapshot.level(TriageLevel::Routine).unwrap();
        let waits: Vec<u64> = routine
            .entries
            .iter()
            .map(|e| e.estimated_wait_minutes)
            .collect();
        assert_eq!(waits, vec![0, 30, 60]);
        assert_eq!(routine.estimated_clearance_minutes, 90);
        assert_eq!(
            snapshot
                .level(TriageLevel::Critical)
                .unwrap()
                .estimated_clearance_minutes,
            0
        );
    }

    #[test]
    fn stats_count_each_state() {
        let now = Utc::now();
        let pending = Case::new(
            NewCase {
                chief_complaint: "Rash".into(),
                symptoms: vec!["rash".into()],
                severity: 2,
                ..Default::default()
            },
            now,
        )
        .unwrap();
        let routine_a = triaged(2, &["rash"], now);
        let routine_b = triaged(3, &["rash"], now);
        let mut done = triaged(4, &["rash"], now);
        done.claim(&nurse()).unwrap();
        done.complete(&nurse(), now).unwrap();

        let stats = QueueStats::compute(
            &[pending, routine_a, routine_b, done],
            &QueueConfig::default(),
            now,
        );
        assert_eq!(stats.total_cases, 4);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.in_review, 0);
        assert_eq!(stats.completed_today, 1);
        assert_eq!(stats.routine.active, 2);
        assert_eq!(stats.routine.average_wait_minutes, 15.0);
        assert_eq!(stats.critical, LevelStats::default());
    }
}
