use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::models::jwt::AccessPayload;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_admin: bool,
    pub created_at: i64,
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub is_admin: bool,
    pub created_at: i64,
}

const USER_COLUMNS: &str =
    "id, email, username, password_hash, first_name, last_name, is_admin, created_at";

impl User {
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, username"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn create(pool: &SqlitePool, new_user: NewUser<'_>) -> Result<User, sqlx::Error> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, password_hash, first_name, last_name, is_admin, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(new_user.email)
        .bind(new_user.username)
        .bind(new_user.password_hash)
        .bind(new_user.first_name)
        .bind(new_user.last_name)
        .bind(new_user.is_admin)
        .bind(new_user.created_at)
        .execute(pool)
        .await?;

        Ok(User {
            id,
            email: new_user.email.to_string(),
            username: new_user.username.to_string(),
            password_hash: new_user.password_hash.to_string(),
            first_name: new_user.first_name.map(str::to_string),
            last_name: new_user.last_name.map(str::to_string),
            is_admin: new_user.is_admin,
            created_at: new_user.created_at,
        })
    }

    pub fn access_payload(&self) -> AccessPayload {
        AccessPayload {
            user_id: self.id.clone(),
            email: self.email.clone(),
            username: self.username.clone(),
            is_admin: self.is_admin,
        }
    }
}
