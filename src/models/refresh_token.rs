use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub user_id: String,
    pub token: String,
    pub expires_at: i64,
    pub created_at: i64,
}
