use sqlx::Row;

use ticketry_core::domain::category::{Category, CategoryId, Subcategory, SubcategoryId};

use super::user::parse_timestamp;
use super::{CategoryRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCategoryRepository {
    pool: DbPool,
}

impl SqlCategoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_category(row: &sqlx::sqlite::SqliteRow) -> Result<Category, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let id: String = row.try_get("id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    let description: Option<String> = row.try_get("description").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;

    Ok(Category { id: CategoryId(id), name, description, created_at: parse_timestamp(&created_at) })
}

fn row_to_subcategory(row: &sqlx::sqlite::SqliteRow) -> Result<Subcategory, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let id: String = row.try_get("id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    let description: Option<String> = row.try_get("description").map_err(decode)?;
    let category_id: String = row.try_get("category_id").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;

    Ok(Subcategory {
        id: SubcategoryId(id),
        name,
        description,
        category_id: CategoryId(category_id),
        created_at: parse_timestamp(&created_at),
    })
}

#[async_trait::async_trait]
impl CategoryRepository for SqlCategoryRepository {
    async fn find_category(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row =
            sqlx::query("SELECT id, name, description, created_at FROM categories WHERE id = ?")
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_category(r)?)),
            None => Ok(None),
        }
    }

    async fn find_subcategory(
        &self,
        id: &SubcategoryId,
    ) -> Result<Option<Subcategory>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, description, category_id, created_at
             FROM subcategories WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_subcategory(r)?)),
            None => Ok(None),
        }
    }

    async fn save_category(&self, category: Category) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO categories (id, name, description, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 description = excluded.description",
        )
        .bind(&category.id.0)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_subcategory(&self, subcategory: Subcategory) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO subcategories (id, name, description, category_id, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 description = excluded.description,
                 category_id = excluded.category_id",
        )
        .bind(&subcategory.id.0)
        .bind(&subcategory.name)
        .bind(&subcategory.description)
        .bind(&subcategory.category_id.0)
        .bind(subcategory.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, description, created_at FROM categories ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_category).collect::<Result<Vec<_>, _>>()
    }

    async fn list_subcategories(
        &self,
        category_id: &CategoryId,
    ) -> Result<Vec<Subcategory>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, description, category_id, created_at
             FROM subcategories WHERE category_id = ? ORDER BY name ASC",
        )
        .bind(&category_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_subcategory).collect::<Result<Vec<_>, _>>()
    }

    async fn request_count_for_category(&self, id: &CategoryId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM requests WHERE category_id = ?")
            .bind(&id.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn request_count_for_subcategory(
        &self,
        id: &SubcategoryId,
    ) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM requests WHERE subcategory_id = ?")
                .bind(&id.0)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn subcategory_count_for_category(
        &self,
        id: &CategoryId,
    ) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM subcategories WHERE category_id = ?")
                .bind(&id.0)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn delete_category(&self, id: &CategoryId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM categories WHERE id = ?").bind(&id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_subcategory(&self, id: &SubcategoryId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM subcategories WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use ticketry_core::domain::category::{CategoryId, SubcategoryId};

    use super::SqlCategoryRepository;
    use crate::repositories::CategoryRepository;
    use crate::{connect_memory, fixtures, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_memory().await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        fixtures::insert_org_baseline(&pool).await.expect("org baseline");
        pool
    }

    #[tokio::test]
    async fn subcategories_are_scoped_to_their_category() {
        let pool = setup().await;
        let repo = SqlCategoryRepository::new(pool);

        let hardware = repo
            .list_subcategories(&CategoryId(fixtures::CATEGORY_HARDWARE.to_string()))
            .await
            .expect("list");
        assert!(hardware.iter().all(|s| s.category_id.0 == fixtures::CATEGORY_HARDWARE));

        let sub = repo
            .find_subcategory(&SubcategoryId(fixtures::SUBCATEGORY_PERIPHERALS.to_string()))
            .await
            .expect("find")
            .expect("should exist");
        assert_eq!(sub.category_id.0, fixtures::CATEGORY_HARDWARE);
    }

    #[tokio::test]
    async fn usage_counts_start_at_zero() {
        let pool = setup().await;
        let repo = SqlCategoryRepository::new(pool);

        let count = repo
            .request_count_for_category(&CategoryId(fixtures::CATEGORY_HARDWARE.to_string()))
            .await
            .expect("count");
        assert_eq!(count, 0);

        let subs = repo
            .subcategory_count_for_category(&CategoryId(fixtures::CATEGORY_HARDWARE.to_string()))
            .await
            .expect("count");
        assert!(subs > 0);
    }
}
