use sqlx::Row;

use ticketry_core::domain::request::RequestStatus;

use crate::repositories::RepositoryError;
use crate::DbPool;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusCount {
    pub status: RequestStatus,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

pub async fn status_summary(pool: &DbPool) -> Result<Vec<StatusCount>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT status, COUNT(1) AS count FROM requests GROUP BY status ORDER BY status",
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let label: String =
                row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let count: i64 =
                row.try_get("count").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let status = RequestStatus::parse_label(&label)
                .ok_or_else(|| RepositoryError::Decode(format!("unknown status: {label}")))?;
            Ok(StatusCount { status, count })
        })
        .collect()
}

pub async fn category_summary(pool: &DbPool) -> Result<Vec<CategoryCount>, RepositoryError> {
    let rows = sqlx::query(
        "SELECT c.name AS category, COUNT(1) AS count
         FROM requests r
         JOIN categories c ON c.id = r.category_id
         GROUP BY c.name
         ORDER BY count DESC, c.name ASC",
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let category: String =
                row.try_get("category").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let count: i64 =
                row.try_get("count").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            Ok(CategoryCount { category, count })
        })
        .collect()
}

const EXPORT_HEADER: &str =
    "Request ID,Title,Requester,Department,Category,Subcategory,Status,Created At";

/// Flat export of every request with its organisational context, one CSV
/// row per request, newest first.
pub async fn export_requests_csv(pool: &DbPool) -> Result<String, RepositoryError> {
    let rows = sqlx::query(
        "SELECT r.id, r.title, u.name AS requester, d.name AS department,
                c.name AS category, s.name AS subcategory, r.status, r.created_at
         FROM requests r
         JOIN users u ON u.id = r.user_id
         JOIN departments d ON d.id = u.department_id
         JOIN categories c ON c.id = r.category_id
         JOIN subcategories s ON s.id = r.subcategory_id
         ORDER BY r.created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    let mut out = String::from(EXPORT_HEADER);
    out.push('\n');

    for row in &rows {
        let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());
        let fields: [String; 8] = [
            row.try_get("id").map_err(decode)?,
            row.try_get("title").map_err(decode)?,
            row.try_get("requester").map_err(decode)?,
            row.try_get("department").map_err(decode)?,
            row.try_get("category").map_err(decode)?,
            row.try_get("subcategory").map_err(decode)?,
            row.try_get("status").map_err(decode)?,
            row.try_get("created_at").map_err(decode)?,
        ];

        let line = fields.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(",");
        out.push_str(&line);
        out.push('\n');
    }

    Ok(out)
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use ticketry_core::domain::category::{CategoryId, SubcategoryId};
    use ticketry_core::domain::request::{Request, RequestId, RequestStatus};
    use ticketry_core::domain::user::UserId;

    use super::{category_summary, csv_field, export_requests_csv, status_summary, EXPORT_HEADER};
    use crate::repositories::{RequestRepository, SqlRequestRepository};
    use crate::{connect_memory, fixtures, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_memory().await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        fixtures::insert_org_baseline(&pool).await.expect("org baseline");
        fixtures::insert_user_baseline(&pool).await.expect("user baseline");
        pool
    }

    fn request(id: &str, title: &str, status: RequestStatus) -> Request {
        let now = Utc::now();
        Request {
            id: RequestId(id.to_string()),
            title: title.to_string(),
            description: "details".to_string(),
            category_id: CategoryId(fixtures::CATEGORY_HARDWARE.to_string()),
            subcategory_id: SubcategoryId(fixtures::SUBCATEGORY_PERIPHERALS.to_string()),
            user_id: UserId(fixtures::USER_EMPLOYEE.to_string()),
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

    #[test]
    fn csv_fields_with_separators_are_quoted() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[tokio::test]
    async fn summaries_group_by_status_and_category() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool.clone());

        repo.save(request("R-1", "One", RequestStatus::PendingManager)).await.expect("save");
        repo.save(request("R-2", "Two", RequestStatus::PendingManager)).await.expect("save");
        repo.save(request("R-3", "Three", RequestStatus::Approved)).await.expect("save");

        let statuses = status_summary(&pool).await.expect("status summary");
        let pending = statuses
            .iter()
            .find(|s| s.status == RequestStatus::PendingManager)
            .expect("pending bucket");
        assert_eq!(pending.count, 2);

        let categories = category_summary(&pool).await.expect("category summary");
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].count, 3);
    }

    #[tokio::test]
    async fn export_contains_header_and_quoted_titles() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool.clone());

        repo.save(request("R-1", "Keyboard, ergonomic", RequestStatus::PendingManager))
            .await
            .expect("save");

        let csv = export_requests_csv(&pool).await.expect("export");
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(EXPORT_HEADER));
        let row = lines.next().expect("one data row");
        assert!(row.contains("\"Keyboard, ergonomic\""));
        assert!(row.contains("Pending Manager"));
    }
}
