//! Record Manager — CRUD over the four application tables.
//!
//! The submit workflow inserts file metadata, status, personal info and
//! address/degree rows in one transaction: either the whole aggregate is
//! stored or none of it is. Deleting an application removes every row of the
//! aggregate in one transaction as well.
//!
//! `AppState` holds an `Arc<dyn ApplicationStore>` so handlers stay agnostic
//! of the backing database.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::application::{
    AddressDegreeRow, Application, NewAddressDegree, NewFile, NewPersonalInfo, NewStatus,
    StatusRow, SubmitApplication, UpdateStatus,
};

mod postgres;

#[cfg(test)]
pub mod memory;

pub use postgres::PgApplicationStore;

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    // The single-row creates are not routed; HTTP submissions go through
    // `submit_application` so the aggregate stays atomic.
    #[allow(dead_code)]
    async fn create_status(&self, status: &NewStatus) -> Result<i32, AppError>;

    #[allow(dead_code)]
    async fn create_file(&self, file: &NewFile) -> Result<i32, AppError>;

    /// Fails with `AppError::Conflict` when the email is already registered.
    #[allow(dead_code)]
    async fn create_personal_info(
        &self,
        status_id: i32,
        file_id: Option<i32>,
        info: &NewPersonalInfo,
    ) -> Result<i32, AppError>;

    #[allow(dead_code)]
    async fn create_address_degree(
        &self,
        personal_info_id: i32,
        address: &NewAddressDegree,
    ) -> Result<AddressDegreeRow, AppError>;

    /// Stores the whole aggregate atomically, parents before children.
    async fn submit_application(
        &self,
        submission: &SubmitApplication,
    ) -> Result<Application, AppError>;

    /// Looks up an application by personal_info id. A personal_info row
    /// without its address_degree child is returned with the address unset.
    async fn get_application(&self, id: i32) -> Result<Application, AppError>;

    /// Complete applications ordered by status id.
    async fn list_applications(&self) -> Result<Vec<Application>, AppError>;

    /// Removes the aggregate keyed by personal_info id and returns it.
    /// Not-found only when no personal_info row has that id.
    async fn delete_application(&self, id: i32) -> Result<Application, AppError>;

    /// Replaces the status (and optionally job title) of the status row `id`.
    /// Keyed by status id, unlike the personal_info-keyed lookups above.
    async fn update_status(&self, id: i32, update: &UpdateStatus) -> Result<StatusRow, AppError>;

    /// Readiness probe: succeeds when the backing store answers.
    async fn ping(&self) -> Result<(), AppError>;
}

pub(crate) fn application_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Post {id} not found"))
}

pub(crate) fn status_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Status {id} not found"))
}
