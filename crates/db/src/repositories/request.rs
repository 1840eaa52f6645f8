use sqlx::Row;

use ticketry_core::domain::category::{CategoryId, SiteId, SubcategoryId};
use ticketry_core::domain::request::{Request, RequestId, RequestStatus};
use ticketry_core::domain::user::UserId;

use super::user::parse_timestamp;
use super::{RepositoryError, RequestRepository, StatusUpdate};
use crate::DbPool;

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_status(label: &str) -> Result<RequestStatus, RepositoryError> {
    RequestStatus::parse_label(label)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown request status: {label}")))
}

const REQUEST_COLUMNS: &str =
    "id, title, description, category_id, subcategory_id, user_id, site_id, status,
     approved_by_manager_id, approved_by_manager_date, manager_remarks,
     approved_by_it_manager_id, approved_by_it_manager_date, it_manager_remarks,
     rejected_by_id, rejected_date, rejection_remarks, created_at, updated_at";

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<Request, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let id: String = row.try_get("id").map_err(decode)?;
    let title: String = row.try_get("title").map_err(decode)?;
    let description: String = row.try_get("description").map_err(decode)?;
    let category_id: String = row.try_get("category_id").map_err(decode)?;
    let subcategory_id: String = row.try_get("subcategory_id").map_err(decode)?;
    let user_id: String = row.try_get("user_id").map_err(decode)?;
    let site_id: Option<String> = row.try_get("site_id").map_err(decode)?;
    let status_label: String = row.try_get("status").map_err(decode)?;
    let approved_by_manager_id: Option<String> =
        row.try_get("approved_by_manager_id").map_err(decode)?;
    let approved_by_manager_date: Option<String> =
        row.try_get("approved_by_manager_date").map_err(decode)?;
    let manager_remarks: Option<String> = row.try_get("manager_remarks").map_err(decode)?;
    let approved_by_it_manager_id: Option<String> =
        row.try_get("approved_by_it_manager_id").map_err(decode)?;
    let approved_by_it_manager_date: Option<String> =
        row.try_get("approved_by_it_manager_date").map_err(decode)?;
    let it_manager_remarks: Option<String> = row.try_get("it_manager_remarks").map_err(decode)?;
    let rejected_by_id: Option<String> = row.try_get("rejected_by_id").map_err(decode)?;
    let rejected_date: Option<String> = row.try_get("rejected_date").map_err(decode)?;
    let rejection_remarks: Option<String> = row.try_get("rejection_remarks").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode)?;

    Ok(Request {
        id: RequestId(id),
        title,
        description,
        category_id: CategoryId(category_id),
        subcategory_id: SubcategoryId(subcategory_id),
        user_id: UserId(user_id),
        site_id: site_id.map(SiteId),
        status: parse_status(&status_label)?,
        approved_by_manager_id: approved_by_manager_id.map(UserId),
        approved_by_manager_date: approved_by_manager_date.as_deref().map(parse_timestamp),
        manager_remarks,
        approved_by_it_manager_id: approved_by_it_manager_id.map(UserId),
        approved_by_it_manager_date: approved_by_it_manager_date.as_deref().map(parse_timestamp),
        it_manager_remarks,
        rejected_by_id: rejected_by_id.map(UserId),
        rejected_date: rejected_date.as_deref().map(parse_timestamp),
        rejection_remarks,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

fn rows_to_requests(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<Request>, RepositoryError> {
    rows.iter().map(row_to_request).collect::<Result<Vec<_>, _>>()
}

#[async_trait::async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, request: Request) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO requests (id, title, description, category_id, subcategory_id, user_id,
                                   site_id, status,
                                   approved_by_manager_id, approved_by_manager_date, manager_remarks,
                                   approved_by_it_manager_id, approved_by_it_manager_date,
                                   it_manager_remarks, rejected_by_id, rejected_date,
                                   rejection_remarks, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 description = excluded.description,
                 category_id = excluded.category_id,
                 subcategory_id = excluded.subcategory_id,
                 site_id = excluded.site_id,
                 status = excluded.status,
                 approved_by_manager_id = excluded.approved_by_manager_id,
                 approved_by_manager_date = excluded.approved_by_manager_date,
                 manager_remarks = excluded.manager_remarks,
                 approved_by_it_manager_id = excluded.approved_by_it_manager_id,
                 approved_by_it_manager_date = excluded.approved_by_it_manager_date,
                 it_manager_remarks = excluded.it_manager_remarks,
                 rejected_by_id = excluded.rejected_by_id,
                 rejected_date = excluded.rejected_date,
                 rejection_remarks = excluded.rejection_remarks,
                 updated_at = excluded.updated_at",
        )
        .bind(&request.id.0)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.category_id.0)
        .bind(&request.subcategory_id.0)
        .bind(&request.user_id.0)
        .bind(request.site_id.as_ref().map(|id| id.0.as_str()))
        .bind(request.status.label())
        .bind(request.approved_by_manager_id.as_ref().map(|id| id.0.as_str()))
        .bind(request.approved_by_manager_date.map(|dt| dt.to_rfc3339()))
        .bind(&request.manager_remarks)
        .bind(request.approved_by_it_manager_id.as_ref().map(|id| id.0.as_str()))
        .bind(request.approved_by_it_manager_date.map(|dt| dt.to_rfc3339()))
        .bind(&request.it_manager_remarks)
        .bind(request.rejected_by_id.as_ref().map(|id| id.0.as_str()))
        .bind(request.rejected_date.map(|dt| dt.to_rfc3339()))
        .bind(&request.rejection_remarks)
        .bind(request.created_at.to_rfc3339())
        .bind(request.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &RequestId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM requests WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn apply_transition(&self, update: StatusUpdate) -> Result<bool, RepositoryError> {
        let result = match update {
            StatusUpdate::ManagerApproval { id, expected, approver, remarks, at } => {
                sqlx::query(
                    "UPDATE requests SET
                         status = ?,
                         approved_by_manager_id = ?,
                         approved_by_manager_date = ?,
                         manager_remarks = ?,
                         updated_at = ?
                     WHERE id = ? AND status = ?",
                )
                .bind(RequestStatus::PendingItHod.label())
                .bind(&approver.0)
                .bind(at.to_rfc3339())
                .bind(&remarks)
                .bind(at.to_rfc3339())
                .bind(&id.0)
                .bind(expected.label())
                .execute(&self.pool)
                .await?
            }
            StatusUpdate::ItApproval { id, expected, approver, remarks, at, combined } => {
                if combined {
                    // Both id/date stamps carry the acting approver, but
                    // the remarks land on the IT side only; any existing
                    // manager remarks stay as they are.
                    sqlx::query(
                        "UPDATE requests SET
                             status = ?,
                             approved_by_manager_id = ?,
                             approved_by_manager_date = ?,
                             approved_by_it_manager_id = ?,
                             approved_by_it_manager_date = ?,
                             it_manager_remarks = ?,
                             updated_at = ?
                         WHERE id = ? AND status = ?",
                    )
                    .bind(RequestStatus::Approved.label())
                    .bind(&approver.0)
                    .bind(at.to_rfc3339())
                    .bind(&approver.0)
                    .bind(at.to_rfc3339())
                    .bind(&remarks)
                    .bind(at.to_rfc3339())
                    .bind(&id.0)
                    .bind(expected.label())
                    .execute(&self.pool)
                    .await?
                } else {
                    sqlx::query(
                        "UPDATE requests SET
                             status = ?,
                             approved_by_it_manager_id = ?,
                             approved_by_it_manager_date = ?,
                             it_manager_remarks = ?,
                             updated_at = ?
                         WHERE id = ? AND status = ?",
                    )
                    .bind(RequestStatus::Approved.label())
                    .bind(&approver.0)
                    .bind(at.to_rfc3339())
                    .bind(&remarks)
                    .bind(at.to_rfc3339())
                    .bind(&id.0)
                    .bind(expected.label())
                    .execute(&self.pool)
                    .await?
                }
            }
            StatusUpdate::Rejection { id, expected, rejected_by, remarks, at } => {
                sqlx::query(
                    "UPDATE requests SET
                         status = ?,
                         rejected_by_id = ?,
                         rejected_date = ?,
                         rejection_remarks = ?,
                         updated_at = ?
                     WHERE id = ? AND status = ?",
                )
                .bind(RequestStatus::Rejected.label())
                .bind(&rejected_by.0)
                .bind(at.to_rfc3339())
                .bind(&remarks)
                .bind(at.to_rfc3339())
                .bind(&id.0)
                .bind(expected.label())
                .execute(&self.pool)
                .await?
            }
        };

        Ok(result.rows_affected() > 0)
    }

    async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Request>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(&owner.0)
        .fetch_all(&self.pool)
        .await?;

        rows_to_requests(rows)
    }

    async fn list_for_manager(&self, manager: &UserId) -> Result<Vec<Request>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests
             WHERE user_id = ?
                OR user_id IN (SELECT id FROM users WHERE reporting_manager_id = ?)
             ORDER BY created_at DESC"
        ))
        .bind(&manager.0)
        .bind(&manager.0)
        .fetch_all(&self.pool)
        .await?;

        rows_to_requests(rows)
    }

    async fn list_all(&self) -> Result<Vec<Request>, RepositoryError> {
        let rows =
            sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM requests ORDER BY created_at DESC"))
                .fetch_all(&self.pool)
                .await?;

        rows_to_requests(rows)
    }

    async fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<Request>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE status = ? ORDER BY created_at DESC"
        ))
        .bind(status.label())
        .fetch_all(&self.pool)
        .await?;

        rows_to_requests(rows)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use ticketry_core::domain::category::{CategoryId, SubcategoryId};
    use ticketry_core::domain::request::{Request, RequestId, RequestStatus};
    use ticketry_core::domain::user::UserId;

    use super::SqlRequestRepository;
    use crate::repositories::{RequestRepository, StatusUpdate};
    use crate::{connect_memory, fixtures, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_memory().await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        fixtures::insert_org_baseline(&pool).await.expect("org baseline");
        fixtures::insert_user_baseline(&pool).await.expect("user baseline");
        pool
    }

    fn sample_request(id: &str, owner: &str, status: RequestStatus) -> Request {
        let now = Utc::now();
        Request {
            id: RequestId(id.to_string()),
            title: "New monitor".to_string(),
            description: "Current one flickers".to_string(),
            category_id: CategoryId(fixtures::CATEGORY_HARDWARE.to_string()),
            subcategory_id: SubcategoryId(fixtures::SUBCATEGORY_PERIPHERALS.to_string()),
            user_id: UserId(owner.to_string()),
            site_id: None,
            status,
            approved_by_manager_id: None,
            approved_by_manager_date: None,
            manager_remarks: None,
            approved_by_it_manager_id: None,
            approved_by_it_manager_date: None,
            it_manager_remarks: None,
            rejected_by_id: None,
            rejected_date: None,
            rejection_remarks: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn save_and_find_round_trips_status_labels() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);

        repo.save(sample_request("R-1", fixtures::USER_EMPLOYEE, RequestStatus::PendingManager))
            .await
            .expect("save");

        let found = repo
            .find_by_id(&RequestId("R-1".to_string()))
            .await
            .expect("find")
            .expect("should exist");
        assert_eq!(found.status, RequestStatus::PendingManager);
        assert!(found.approved_by_manager_id.is_none());
    }

    #[tokio::test]
    async fn transition_with_stale_expected_status_changes_nothing() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);

        repo.save(sample_request("R-1", fixtures::USER_EMPLOYEE, RequestStatus::PendingItHod))
            .await
            .expect("save");

        let applied = repo
            .apply_transition(StatusUpdate::ManagerApproval {
                id: RequestId("R-1".to_string()),
                expected: RequestStatus::PendingManager,
                approver: UserId(fixtures::USER_MANAGER.to_string()),
                remarks: None,
                at: Utc::now(),
            })
            .await
            .expect("apply");
        assert!(!applied, "stale transition must match zero rows");

        let found =
            repo.find_by_id(&RequestId("R-1".to_string())).await.expect("find").expect("exists");
        assert_eq!(found.status, RequestStatus::PendingItHod);
        assert!(found.approved_by_manager_id.is_none());
    }

    #[tokio::test]
    async fn combined_approval_stamps_both_audit_trails() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);

        repo.save(sample_request("R-1", fixtures::USER_EMPLOYEE, RequestStatus::PendingItHod))
            .await
            .expect("save");

        let applied = repo
            .apply_transition(StatusUpdate::ItApproval {
                id: RequestId("R-1".to_string()),
                expected: RequestStatus::PendingItHod,
                approver: UserId(fixtures::USER_IT_MANAGER.to_string()),
                remarks: Some("approved on both stages".to_string()),
                at: Utc::now(),
                combined: true,
            })
            .await
            .expect("apply");
        assert!(applied);

        let found =
            repo.find_by_id(&RequestId("R-1".to_string())).await.expect("find").expect("exists");
        assert_eq!(found.status, RequestStatus::Approved);
        assert_eq!(
            found.approved_by_manager_id.as_ref().map(|id| id.0.as_str()),
            Some(fixtures::USER_IT_MANAGER)
        );
        assert_eq!(
            found.approved_by_it_manager_id.as_ref().map(|id| id.0.as_str()),
            Some(fixtures::USER_IT_MANAGER)
        );
        assert_eq!(found.it_manager_remarks.as_deref(), Some("approved on both stages"));
        assert!(
            found.manager_remarks.is_none(),
            "the combined stamp must not invent manager remarks"
        );
    }

    #[tokio::test]
    async fn manager_listing_covers_reports_and_own_requests() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);

        repo.save(sample_request("R-own", fixtures::USER_MANAGER, RequestStatus::PendingItHod))
            .await
            .expect("save own");
        repo.save(sample_request("R-report", fixtures::USER_EMPLOYEE, RequestStatus::PendingManager))
            .await
            .expect("save report");
        repo.save(sample_request("R-other", fixtures::USER_LONER, RequestStatus::PendingItHod))
            .await
            .expect("save unrelated");

        let listed = repo
            .list_for_manager(&UserId(fixtures::USER_MANAGER.to_string()))
            .await
            .expect("list");
        let mut ids: Vec<&str> = listed.iter().map(|r| r.id.0.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["R-own", "R-report"]);
    }
}
