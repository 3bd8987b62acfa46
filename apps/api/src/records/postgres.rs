use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tokio::time::timeout;
use tracing::info;

use super::{application_not_found, status_not_found, ApplicationStore};
use crate::errors::AppError;
use crate::models::application::{
    AddressDegreeRow, Application, NewAddressDegree, NewFile, NewPersonalInfo, NewStatus,
    StatusRow, SubmitApplication, UpdateStatus,
};

/// Flattened aggregate: status ⋈ personal_info ⟕ address_degree.
/// Lookups by id also see a personal_info row whose address is missing;
/// listings add `COMPLETE_ONLY`.
const APPLICATION_SELECT: &str = r#"
    SELECT p.id, s.id AS status_id, s.status, s.job_title, s.created_at AS submitted_at,
           p.firstname, p.lastname, p.gender, p.birthdate, p.phone, p.email, p.file_id,
           a.id AS address_degree_id, a.zipcode, a.state_province, a.town_city,
           a.degree, a.course, a.program, a.institution
    FROM statuses s
    JOIN personal_info p ON p.status_id = s.id
    LEFT JOIN address_degree a ON a.personal_info_id = p.id
"#;

const COMPLETE_ONLY: &str = "WHERE a.id IS NOT NULL";

const ADDRESS_DEGREE_COLUMNS: &str = "id, zipcode, state_province, town_city, degree, \
    course, program, institution, personal_info_id";

/// PostgreSQL-backed record manager. Holds the pool; every operation
/// acquires its own connection or transaction.
#[derive(Clone)]
pub struct PgApplicationStore {
    pool: PgPool,
    /// Bounds the inserts of a submission. The COMMIT itself is not bounded:
    /// once it is sent, the caller must learn the outcome.
    submit_timeout: Duration,
}

impl PgApplicationStore {
    pub fn new(pool: PgPool, submit_timeout: Duration) -> Self {
        Self {
            pool,
            submit_timeout,
        }
    }

    async fn stage_submission(
        &self,
        submission: &SubmitApplication,
    ) -> Result<(Transaction<'static, Postgres>, Application), AppError> {
        let mut tx = self.pool.begin().await?;

        let file_id = match &submission.file {
            Some(file) => Some(insert_file(&mut tx, file).await?),
            None => None,
        };
        let status_id = insert_status(&mut tx, &submission.status).await?;
        let personal_info_id =
            insert_personal_info(&mut tx, status_id, file_id, &submission.personal_info).await?;
        insert_address_degree(&mut tx, personal_info_id, &submission.address_degree).await?;

        let application = fetch_application(&mut tx, personal_info_id)
            .await?
            .ok_or_else(|| application_not_found(personal_info_id))?;
        Ok((tx, application))
    }
}

#[async_trait]
impl ApplicationStore for PgApplicationStore {
    async fn create_status(&self, status: &NewStatus) -> Result<i32, AppError> {
        let mut conn = self.pool.acquire().await?;
        insert_status(&mut conn, status).await
    }

    async fn create_file(&self, file: &NewFile) -> Result<i32, AppError> {
        let mut conn = self.pool.acquire().await?;
        insert_file(&mut conn, file).await
    }

    async fn create_personal_info(
        &self,
        status_id: i32,
        file_id: Option<i32>,
        info: &NewPersonalInfo,
    ) -> Result<i32, AppError> {
        let mut conn = self.pool.acquire().await?;
        insert_personal_info(&mut conn, status_id, file_id, info).await
    }

    async fn create_address_degree(
        &self,
        personal_info_id: i32,
        address: &NewAddressDegree,
    ) -> Result<AddressDegreeRow, AppError> {
        let mut conn = self.pool.acquire().await?;
        insert_address_degree(&mut conn, personal_info_id, address).await
    }

    async fn submit_application(
        &self,
        submission: &SubmitApplication,
    ) -> Result<Application, AppError> {
        // Dropping the transaction on any early return (or on timeout) rolls
        // everything back.
        let (tx, application) =
            match timeout(self.submit_timeout, self.stage_submission(submission)).await {
                Ok(staged) => staged?,
                Err(_) => return Err(AppError::Timeout("database")),
            };

        tx.commit().await?;

        info!(
            "Stored application {} (status {}, file {:?})",
            application.id, application.status_id, application.file_id
        );
        Ok(application)
    }

    async fn get_application(&self, id: i32) -> Result<Application, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_application(&mut conn, id)
            .await?
            .ok_or_else(|| application_not_found(id))
    }

    async fn list_applications(&self) -> Result<Vec<Application>, AppError> {
        let query = format!("{APPLICATION_SELECT} {COMPLETE_ONLY} ORDER BY s.id");
        Ok(sqlx::query_as::<_, Application>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn delete_application(&self, id: i32) -> Result<Application, AppError> {
        let mut tx = self.pool.begin().await?;

        let application = fetch_application(&mut tx, id)
            .await?
            .ok_or_else(|| application_not_found(id))?;

        sqlx::query("DELETE FROM address_degree WHERE personal_info_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM personal_info WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM statuses WHERE id = $1")
            .bind(application.status_id)
            .execute(&mut *tx)
            .await?;
        if let Some(file_id) = application.file_id {
            sqlx::query("DELETE FROM files WHERE id = $1")
                .bind(file_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!("Deleted application {id}");
        Ok(application)
    }

    async fn update_status(&self, id: i32, update: &UpdateStatus) -> Result<StatusRow, AppError> {
        sqlx::query_as::<_, StatusRow>(
            r#"
            UPDATE statuses
            SET status = $1, job_title = COALESCE($2, job_title)
            WHERE id = $3
            RETURNING id, status, job_title, created_at
            "#,
        )
        .bind(&update.status)
        .bind(&update.job_title)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from_write)?
        .ok_or_else(|| status_not_found(id))
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

async fn insert_status(conn: &mut PgConnection, status: &NewStatus) -> Result<i32, AppError> {
    sqlx::query_scalar("INSERT INTO statuses (status, job_title) VALUES ($1, $2) RETURNING id")
        .bind(&status.status)
        .bind(&status.job_title)
        .fetch_one(conn)
        .await
        .map_err(AppError::from_write)
}

async fn insert_file(conn: &mut PgConnection, file: &NewFile) -> Result<i32, AppError> {
    sqlx::query_scalar("INSERT INTO files (name, size, type) VALUES ($1, $2, $3) RETURNING id")
        .bind(&file.name)
        .bind(file.size)
        .bind(&file.content_type)
        .fetch_one(conn)
        .await
        .map_err(AppError::from_write)
}

async fn insert_personal_info(
    conn: &mut PgConnection,
    status_id: i32,
    file_id: Option<i32>,
    info: &NewPersonalInfo,
) -> Result<i32, AppError> {
    sqlx::query_scalar(
        r#"
        INSERT INTO personal_info
            (firstname, lastname, gender, birthdate, phone, email, status_id, file_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(&info.firstname)
    .bind(&info.lastname)
    .bind(&info.gender)
    .bind(&info.birthdate)
    .bind(&info.phone)
    .bind(info.email.trim())
    .bind(status_id)
    .bind(file_id)
    .fetch_one(conn)
    .await
    .map_err(AppError::from_write)
}

async fn insert_address_degree(
    conn: &mut PgConnection,
    personal_info_id: i32,
    address: &NewAddressDegree,
) -> Result<AddressDegreeRow, AppError> {
    let query = format!(
        "INSERT INTO address_degree \
            (zipcode, state_province, town_city, degree, course, program, institution, \
             personal_info_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {ADDRESS_DEGREE_COLUMNS}"
    );
    sqlx::query_as::<_, AddressDegreeRow>(&query)
        .bind(&address.zipcode)
        .bind(&address.state_province)
        .bind(&address.town_city)
        .bind(&address.degree)
        .bind(&address.course)
        .bind(&address.program)
        .bind(&address.institution)
        .bind(personal_info_id)
        .fetch_one(conn)
        .await
        .map_err(AppError::from_write)
}

async fn fetch_application(
    conn: &mut PgConnection,
    id: i32,
) -> Result<Option<Application>, sqlx::Error> {
    let query = format!("{APPLICATION_SELECT} WHERE p.id = $1");
    sqlx::query_as::<_, Application>(&query)
        .bind(id)
        .fetch_optional(conn)
        .await
}
