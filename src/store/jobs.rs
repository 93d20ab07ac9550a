//! Job queue table and lease transitions

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::MeshStore;
use super::cursors::upsert_cursor;
use super::error::{Result, StoreError};
use super::models::{
    Job, JobId, JobRow, JobStatus, JsonMap, LeasedJob, LeasedJobRow, to_millis,
};

const JOB_COLUMNS: &str = "id, site_id, payload, status, leased_by, leased_at, attempts, \
                           error_message, created_at, updated_at";

/// Selection and marking happen in one statement. The outer `status =
/// 'pending'` guard is re-checked by the writer, so a row another caller
/// leased first is skipped instead of being handed out twice.
///
/// Parameters: ?1 node_id, ?2 now_ms, ?3 JSON array of wanted sites or NULL,
/// ?4 max distinct workers per site (0 = unlimited), ?5 batch limit.
const LEASE_SQL: &str = r#"
    UPDATE jobs
    SET status = 'leased',
        leased_by = ?1,
        leased_at = ?2,
        updated_at = ?2,
        attempts = attempts + 1
    WHERE status = 'pending'
      AND id IN (
          SELECT id FROM jobs
          WHERE status = 'pending'
            AND (?3 IS NULL OR site_id IN (SELECT value FROM json_each(?3)))
            AND (?4 = 0 OR site_id NOT IN (
                SELECT site_id FROM jobs
                WHERE status = 'leased' AND leased_by <> ?1
                GROUP BY site_id
                HAVING COUNT(DISTINCT leased_by) >= ?4
            ))
          ORDER BY created_at ASC, id ASC
          LIMIT ?5
      )
    RETURNING id, site_id, payload
"#;

/// Terminal transition for a job the caller may finish: unleased, or leased
/// by the caller itself.
///
/// Parameters: ?1 job_id, ?2 target status, ?3 error message, ?4 now_ms, ?5 node_id.
const FINISH_OWNED_SQL: &str = r#"
    UPDATE jobs
    SET status = ?2,
        error_message = ?3,
        leased_by = NULL,
        leased_at = NULL,
        updated_at = ?4
    WHERE id = ?1
      AND (status = 'pending' OR (status = 'leased' AND leased_by = ?5))
    RETURNING site_id
"#;

/// Terminal transition that ignores lease ownership
const FINISH_FOREIGN_SQL: &str = r#"
    UPDATE jobs
    SET status = ?2,
        error_message = ?3,
        leased_by = NULL,
        leased_at = NULL,
        updated_at = ?4
    WHERE id = ?1 AND status = 'leased'
"#;

/// Re-apply the terminal state of an already finished job
const FINISH_REPLAY_SQL: &str = r#"
    UPDATE jobs
    SET error_message = ?2,
        updated_at = ?3
    WHERE id = ?1
"#;

/// Expired leases go back to `pending`, or to `failed` once `attempts`
/// reached the limit. SET expressions read the pre-update row.
///
/// Parameters: ?1 cutoff_ms, ?2 now_ms, ?3 max attempts (0 = unlimited).
const REAP_SQL: &str = r#"
    UPDATE jobs
    SET status = CASE WHEN ?3 > 0 AND attempts >= ?3 THEN 'failed' ELSE 'pending' END,
        error_message = CASE WHEN ?3 > 0 AND attempts >= ?3
            THEN 'lease expired after ' || attempts || ' attempts'
            ELSE error_message END,
        leased_by = NULL,
        leased_at = NULL,
        updated_at = ?2
    WHERE status = 'leased' AND leased_at <= ?1
    RETURNING status
"#;

/// Parameters of one lease call
#[derive(Debug, Clone)]
pub struct LeaseQuery<'a> {
    pub node_id: &'a str,
    /// `None` leases from every site; an empty slice matches nothing
    pub want_sites: Option<&'a [String]>,
    pub limit: u32,
    /// Distinct workers allowed on one site at once (0 = unlimited)
    pub max_workers_per_site: u32,
}

/// Parameters of one finish call
#[derive(Debug, Clone)]
pub struct FinishJob<'a> {
    pub job_id: JobId,
    pub node_id: &'a str,
    pub success: bool,
    pub error_message: Option<&'a str>,
    pub new_cursor_value: Option<&'a str>,
    /// Refuse to finish a job leased by another worker
    pub reject_foreign: bool,
}

/// What a successful finish did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishReceipt {
    pub job_id: JobId,
    pub site_id: String,
    pub status: JobStatus,
    /// The job already had this terminal status; nothing but `updated_at` changed
    pub replayed: bool,
    /// Lease holder overridden by this call, when it was not the caller
    pub foreign_owner: Option<String>,
    pub cursor_updated: bool,
}

/// Outcome of one expiry sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReapStats {
    pub requeued: u64,
    pub failed: u64,
}

impl ReapStats {
    pub fn total(&self) -> u64 {
        self.requeued + self.failed
    }
}

/// Row counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub pending: u64,
    pub leased: u64,
    pub done: u64,
    pub failed: u64,
}

impl MeshStore {
    /// Create a `pending` job (producer side)
    pub async fn insert_job(
        &self,
        site_id: &str,
        payload: &JsonMap,
        now: DateTime<Utc>,
    ) -> Result<Job> {
        let payload = serde_json::to_string(payload)?;
        let query = format!(
            "INSERT INTO jobs (site_id, payload, status, created_at, updated_at) \
             VALUES (?1, ?2, 'pending', ?3, ?3) \
             RETURNING {JOB_COLUMNS}"
        );
        let row: JobRow = sqlx::query_as(&query)
            .bind(site_id)
            .bind(payload)
            .bind(to_millis(now))
            .fetch_one(self.pool())
            .await?;
        Job::try_from(row)
    }

    pub async fn get_job(&self, job_id: JobId) -> Result<Option<Job>> {
        let query = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1");
        let row: Option<JobRow> = sqlx::query_as(&query)
            .bind(job_id)
            .fetch_optional(self.pool())
            .await?;
        row.map(Job::try_from).transpose()
    }

    /// Atomically move up to `limit` eligible pending jobs to `leased`
    ///
    /// Oldest jobs are preferred. The result is ordered by job id and may be
    /// empty.
    pub async fn lease_jobs(
        &self,
        query: &LeaseQuery<'_>,
        now: DateTime<Utc>,
    ) -> Result<Vec<LeasedJob>> {
        let want_sites = query
            .want_sites
            .map(serde_json::to_string)
            .transpose()?;

        let rows: Vec<LeasedJobRow> = sqlx::query_as(LEASE_SQL)
            .bind(query.node_id)
            .bind(to_millis(now))
            .bind(want_sites)
            .bind(i64::from(query.max_workers_per_site))
            .bind(i64::from(query.limit))
            .fetch_all(self.pool())
            .await?;

        let mut jobs = rows
            .into_iter()
            .map(LeasedJob::try_from)
            .collect::<Result<Vec<_>>>()?;
        jobs.sort_by_key(|job| job.id);
        Ok(jobs)
    }

    /// Move a job to its terminal state and optionally advance its site cursor
    ///
    /// Runs in one transaction whose first statement is a write, so the
    /// database lock is held from the start and the follow-up read used to
    /// classify a rejected call is consistent.
    pub async fn finish_job(
        &self,
        req: &FinishJob<'_>,
        now: DateTime<Utc>,
    ) -> Result<FinishReceipt> {
        let now_ms = to_millis(now);
        let target = JobStatus::from_outcome(req.success);
        let error_message = if req.success { None } else { req.error_message };

        let mut tx = self.pool().begin().await?;

        let finished: Option<String> = sqlx::query_scalar(FINISH_OWNED_SQL)
            .bind(req.job_id)
            .bind(target.as_str())
            .bind(error_message)
            .bind(now_ms)
            .bind(req.node_id)
            .fetch_optional(&mut *tx)
            .await?;

        let (site_id, replayed, foreign_owner) = match finished {
            Some(site_id) => (site_id, false, None),
            None => {
                let query = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1");
                let row: Option<JobRow> = sqlx::query_as(&query)
                    .bind(req.job_id)
                    .fetch_optional(&mut *tx)
                    .await?;
                let current = row
                    .map(Job::try_from)
                    .transpose()?
                    .ok_or(StoreError::JobNotFound(req.job_id))?;

                if current.status == target {
                    sqlx::query(FINISH_REPLAY_SQL)
                        .bind(req.job_id)
                        .bind(error_message)
                        .bind(now_ms)
                        .execute(&mut *tx)
                        .await?;
                    (current.site_id, true, None)
                } else if current.status.is_terminal() {
                    return Err(StoreError::OutcomeConflict {
                        job_id: req.job_id,
                        current: current.status,
                    });
                } else {
                    let owner = current.leased_by.unwrap_or_default();
                    if req.reject_foreign {
                        return Err(StoreError::LeaseConflict {
                            job_id: req.job_id,
                            owner,
                            node_id: req.node_id.to_string(),
                        });
                    }
                    sqlx::query(FINISH_FOREIGN_SQL)
                        .bind(req.job_id)
                        .bind(target.as_str())
                        .bind(error_message)
                        .bind(now_ms)
                        .execute(&mut *tx)
                        .await?;
                    (current.site_id, false, Some(owner))
                }
            }
        };

        // A replay never moves the cursor; a later job may already have advanced it
        let cursor_updated = match req.new_cursor_value {
            Some(value) if !replayed => {
                upsert_cursor(&mut *tx, &site_id, value, now_ms).await?;
                true
            }
            _ => false,
        };

        tx.commit().await?;

        Ok(FinishReceipt {
            job_id: req.job_id,
            site_id,
            status: target,
            replayed,
            foreign_owner,
            cursor_updated,
        })
    }

    /// Reclaim every lease taken at or before `now - lease_duration`
    pub async fn reclaim_expired_leases(
        &self,
        lease_duration: chrono::Duration,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<ReapStats> {
        let cutoff = now
            .checked_sub_signed(lease_duration)
            .map(to_millis)
            .unwrap_or(i64::MIN);

        let statuses: Vec<String> = sqlx::query_scalar(REAP_SQL)
            .bind(cutoff)
            .bind(to_millis(now))
            .bind(i64::from(max_attempts))
            .fetch_all(self.pool())
            .await?;

        let mut stats = ReapStats::default();
        for status in statuses {
            match status.parse::<JobStatus>()? {
                JobStatus::Failed => stats.failed += 1,
                _ => stats.requeued += 1,
            }
        }
        Ok(stats)
    }

    pub async fn job_counts(&self) -> Result<JobCounts> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM jobs GROUP BY status")
                .fetch_all(self.pool())
                .await?;

        let mut counts = JobCounts::default();
        for (status, count) in rows {
            let count = u64::try_from(count).unwrap_or_default();
            match status.parse::<JobStatus>()? {
                JobStatus::Pending => counts.pending = count,
                JobStatus::Leased => counts.leased = count,
                JobStatus::Done => counts.done = count,
                JobStatus::Failed => counts.failed = count,
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> JsonMap {
        value.as_object().cloned().unwrap()
    }

    fn lease<'a>(node_id: &'a str, limit: u32) -> LeaseQuery<'a> {
        LeaseQuery {
            node_id,
            want_sites: None,
            limit,
            max_workers_per_site: 0,
        }
    }

    fn finish<'a>(job_id: JobId, node_id: &'a str, success: bool) -> FinishJob<'a> {
        FinishJob {
            job_id,
            node_id,
            success,
            error_message: None,
            new_cursor_value: None,
            reject_foreign: true,
        }
    }

    async fn seed(store: &MeshStore, site_id: &str, count: usize) -> Vec<JobId> {
        let base = Utc::now();
        let mut ids = Vec::new();
        for i in 0..count {
            let created = base + chrono::Duration::milliseconds(i as i64);
            let job = store
                .insert_job(site_id, &payload(json!({"page": i})), created)
                .await
                .unwrap();
            ids.push(job.id);
        }
        ids
    }

    #[tokio::test]
    async fn test_insert_job_starts_pending() {
        let store = MeshStore::in_memory().await.unwrap();
        let job = store
            .insert_job("siteA", &payload(json!({"q": "dune"})), Utc::now())
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 0);
        assert!(job.leased_by.is_none());
        assert!(job.leased_at.is_none());
        assert_eq!(job.payload["q"], json!("dune"));
    }

    #[tokio::test]
    async fn test_lease_prefers_oldest_and_marks_rows() {
        let store = MeshStore::in_memory().await.unwrap();
        let ids = seed(&store, "siteA", 4).await;
        let now = Utc::now();

        let leased = store.lease_jobs(&lease("w1", 2), now).await.unwrap();
        let leased_ids: Vec<_> = leased.iter().map(|j| j.id).collect();
        assert_eq!(leased_ids, ids[..2].to_vec());

        for id in &leased_ids {
            let job = store.get_job(*id).await.unwrap().unwrap();
            assert_eq!(job.status, JobStatus::Leased);
            assert_eq!(job.leased_by.as_deref(), Some("w1"));
            assert_eq!(
                job.leased_at.map(|t| t.timestamp_millis()),
                Some(now.timestamp_millis())
            );
            assert_eq!(job.attempts, 1);
        }
    }

    #[tokio::test]
    async fn test_lease_respects_want_sites() {
        let store = MeshStore::in_memory().await.unwrap();
        seed(&store, "siteA", 2).await;
        let site_b = seed(&store, "siteB", 1).await;

        let wanted = vec!["siteB".to_string()];
        let query = LeaseQuery {
            want_sites: Some(&wanted),
            ..lease("w1", 10)
        };
        let leased = store.lease_jobs(&query, Utc::now()).await.unwrap();
        assert_eq!(leased.len(), 1);
        assert_eq!(leased[0].id, site_b[0]);

        let nothing: Vec<String> = Vec::new();
        let query = LeaseQuery {
            want_sites: Some(&nothing),
            ..lease("w1", 10)
        };
        assert!(store.lease_jobs(&query, Utc::now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lease_caps_workers_per_site() {
        let store = MeshStore::in_memory().await.unwrap();
        seed(&store, "siteA", 3).await;
        let site_b = seed(&store, "siteB", 1).await;
        let now = Utc::now();

        let capped = |node_id| LeaseQuery {
            max_workers_per_site: 1,
            ..lease(node_id, 1)
        };

        let first = store.lease_jobs(&capped("w1"), now).await.unwrap();
        assert_eq!(first[0].site_id, "siteA");

        // siteA is occupied by w1, so w2 is routed to siteB
        let second = store.lease_jobs(&capped("w2"), now).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, site_b[0]);

        // w1 may keep pulling from the site it already works on
        let again = store.lease_jobs(&capped("w1"), now).await.unwrap();
        assert_eq!(again[0].site_id, "siteA");

        // both sites are taken by someone else
        assert!(store.lease_jobs(&capped("w3"), now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_finish_success_sets_done_and_clears_lease() {
        let store = MeshStore::in_memory().await.unwrap();
        seed(&store, "siteA", 1).await;
        let leased = store.lease_jobs(&lease("w1", 1), Utc::now()).await.unwrap();
        let job_id = leased[0].id;

        let receipt = store
            .finish_job(&finish(job_id, "w1", true), Utc::now())
            .await
            .unwrap();
        assert_eq!(receipt.status, JobStatus::Done);
        assert!(!receipt.replayed);
        assert!(!receipt.cursor_updated);

        let job = store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert!(job.leased_by.is_none());
        assert!(job.leased_at.is_none());
    }

    #[tokio::test]
    async fn test_finish_failure_records_error_without_cursor() {
        let store = MeshStore::in_memory().await.unwrap();
        seed(&store, "siteA", 1).await;
        let leased = store.lease_jobs(&lease("w1", 1), Utc::now()).await.unwrap();
        let job_id = leased[0].id;

        let req = FinishJob {
            error_message: Some("HTTP 503 from tracker"),
            ..finish(job_id, "w1", false)
        };
        store.finish_job(&req, Utc::now()).await.unwrap();

        let job = store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("HTTP 503 from tracker"));
        assert!(store.get_cursor("siteA").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_finish_twice_with_same_outcome_is_replay() {
        let store = MeshStore::in_memory().await.unwrap();
        seed(&store, "siteA", 1).await;
        let job_id = store.lease_jobs(&lease("w1", 1), Utc::now()).await.unwrap()[0].id;

        let req = FinishJob {
            new_cursor_value: Some("v1"),
            ..finish(job_id, "w1", true)
        };
        let first = store.finish_job(&req, Utc::now()).await.unwrap();
        let second = store.finish_job(&req, Utc::now()).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(
            store.get_job(job_id).await.unwrap().unwrap().status,
            JobStatus::Done
        );
        assert_eq!(store.list_cursors().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replayed_finish_does_not_rewind_cursor() {
        let store = MeshStore::in_memory().await.unwrap();
        seed(&store, "siteA", 2).await;
        let jobs = store.lease_jobs(&lease("w1", 2), Utc::now()).await.unwrap();

        let first = FinishJob {
            new_cursor_value: Some("page-1"),
            ..finish(jobs[0].id, "w1", true)
        };
        let second = FinishJob {
            new_cursor_value: Some("page-2"),
            ..finish(jobs[1].id, "w1", true)
        };
        store.finish_job(&first, Utc::now()).await.unwrap();
        store.finish_job(&second, Utc::now()).await.unwrap();

        // retry of the first finish after its response was lost
        let replay = store.finish_job(&first, Utc::now()).await.unwrap();
        assert!(replay.replayed);
        assert!(!replay.cursor_updated);

        let cursor = store.get_cursor("siteA").await.unwrap().unwrap();
        assert_eq!(cursor.cursor_value, "page-2");
    }

    #[tokio::test]
    async fn test_finish_with_other_outcome_conflicts() {
        let store = MeshStore::in_memory().await.unwrap();
        seed(&store, "siteA", 1).await;
        let job_id = store.lease_jobs(&lease("w1", 1), Utc::now()).await.unwrap()[0].id;

        store
            .finish_job(&finish(job_id, "w1", true), Utc::now())
            .await
            .unwrap();
        let err = store
            .finish_job(&finish(job_id, "w1", false), Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::OutcomeConflict {
                current: JobStatus::Done,
                ..
            }
        ));
        assert_eq!(
            store.get_job(job_id).await.unwrap().unwrap().status,
            JobStatus::Done
        );
    }

    #[tokio::test]
    async fn test_foreign_finish_rejected_without_side_effects() {
        let store = MeshStore::in_memory().await.unwrap();
        seed(&store, "siteA", 1).await;
        let job_id = store.lease_jobs(&lease("w1", 1), Utc::now()).await.unwrap()[0].id;

        let req = FinishJob {
            new_cursor_value: Some("stolen"),
            ..finish(job_id, "w2", true)
        };
        let err = store.finish_job(&req, Utc::now()).await.unwrap_err();
        match err {
            StoreError::LeaseConflict { owner, node_id, .. } => {
                assert_eq!(owner, "w1");
                assert_eq!(node_id, "w2");
            }
            other => panic!("expected LeaseConflict, got {other:?}"),
        }

        let job = store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Leased);
        assert_eq!(job.leased_by.as_deref(), Some("w1"));
        assert!(store.get_cursor("siteA").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_foreign_finish_accepted_when_allowed() {
        let store = MeshStore::in_memory().await.unwrap();
        seed(&store, "siteA", 1).await;
        let job_id = store.lease_jobs(&lease("w1", 1), Utc::now()).await.unwrap()[0].id;

        let req = FinishJob {
            reject_foreign: false,
            ..finish(job_id, "w2", true)
        };
        let receipt = store.finish_job(&req, Utc::now()).await.unwrap();
        assert_eq!(receipt.foreign_owner.as_deref(), Some("w1"));

        let job = store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert!(job.leased_by.is_none());
    }

    #[tokio::test]
    async fn test_finish_unknown_job_is_not_found() {
        let store = MeshStore::in_memory().await.unwrap();
        let req = FinishJob {
            new_cursor_value: Some("v1"),
            ..finish(4242, "w1", true)
        };

        let err = store.finish_job(&req, Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::JobNotFound(4242)));
        assert!(store.list_cursors().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reclaim_requeues_expired_leases_only() {
        let store = MeshStore::in_memory().await.unwrap();
        seed(&store, "siteA", 2).await;
        let start = Utc::now();
        let lease_duration = chrono::Duration::minutes(10);

        let old = store.lease_jobs(&lease("w1", 1), start).await.unwrap();
        let fresh = store
            .lease_jobs(&lease("w2", 1), start + chrono::Duration::minutes(8))
            .await
            .unwrap();

        let stats = store
            .reclaim_expired_leases(lease_duration, 5, start + chrono::Duration::minutes(11))
            .await
            .unwrap();
        assert_eq!(stats, ReapStats { requeued: 1, failed: 0 });

        let reclaimed = store.get_job(old[0].id).await.unwrap().unwrap();
        assert_eq!(reclaimed.status, JobStatus::Pending);
        assert!(reclaimed.leased_by.is_none());
        assert!(reclaimed.leased_at.is_none());

        let kept = store.get_job(fresh[0].id).await.unwrap().unwrap();
        assert_eq!(kept.status, JobStatus::Leased);
    }

    #[tokio::test]
    async fn test_reclaim_fails_jobs_out_of_attempts() {
        let store = MeshStore::in_memory().await.unwrap();
        let ids = seed(&store, "siteA", 1).await;
        let lease_duration = chrono::Duration::minutes(1);
        let mut now = Utc::now();

        // two leases that both expire; max_attempts = 2
        for expected_requeued in [1, 0] {
            let leased = store.lease_jobs(&lease("w1", 1), now).await.unwrap();
            assert_eq!(leased.len(), 1);
            now += chrono::Duration::minutes(2);
            let stats = store
                .reclaim_expired_leases(lease_duration, 2, now)
                .await
                .unwrap();
            assert_eq!(stats.requeued, expected_requeued);
        }

        let job = store.get_job(ids[0]).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempts, 2);
        assert_eq!(
            job.error_message.as_deref(),
            Some("lease expired after 2 attempts")
        );
        assert!(job.leased_by.is_none());
    }

    #[tokio::test]
    async fn test_late_finish_after_reclaim_is_accepted() {
        let store = MeshStore::in_memory().await.unwrap();
        seed(&store, "siteA", 1).await;
        let start = Utc::now();
        let job_id = store.lease_jobs(&lease("w1", 1), start).await.unwrap()[0].id;

        store
            .reclaim_expired_leases(chrono::Duration::seconds(30), 0, start + chrono::Duration::minutes(1))
            .await
            .unwrap();
        store
            .finish_job(&finish(job_id, "w1", true), Utc::now())
            .await
            .unwrap();

        assert_eq!(
            store.get_job(job_id).await.unwrap().unwrap().status,
            JobStatus::Done
        );
    }

    #[tokio::test]
    async fn test_job_counts() {
        let store = MeshStore::in_memory().await.unwrap();
        seed(&store, "siteA", 3).await;
        let leased = store.lease_jobs(&lease("w1", 2), Utc::now()).await.unwrap();
        store
            .finish_job(&finish(leased[0].id, "w1", false), Utc::now())
            .await
            .unwrap();

        let counts = store.job_counts().await.unwrap();
        assert_eq!(
            counts,
            JobCounts {
                pending: 1,
                leased: 1,
                done: 0,
                failed: 1
            }
        );
    }
}
