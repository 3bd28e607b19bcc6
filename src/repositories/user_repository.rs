use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::user::User;
use crate::utils::errors::{AppResult, DbErrorExt};

pub struct UserRepository;

impl UserRepository {
    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_db_err("Error buscando usuario")
    }
}
