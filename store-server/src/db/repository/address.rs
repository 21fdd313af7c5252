//! Address Repository

use super::RepoResult;
use shared::models::Address;
use sqlx::SqlitePool;

const ADDRESS_SELECT: &str = "SELECT id, user_id, full_name, phone, line1, line2, city, state, postal_code, country, created_at, updated_at FROM address";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Address>> {
    let row = sqlx::query_as::<_, Address>(&format!("{ADDRESS_SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}
