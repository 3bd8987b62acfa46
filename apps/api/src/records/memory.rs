use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{application_not_found, status_not_found, ApplicationStore};
use crate::errors::AppError;
use crate::models::application::{
    AddressDegreeRow, Application, NewAddressDegree, NewFile, NewPersonalInfo, NewStatus,
    StatusRow, SubmitApplication, UpdateStatus,
};

#[derive(Debug, Clone)]
struct PersonalInfoRow {
    id: i32,
    info: NewPersonalInfo,
    status_id: i32,
    file_id: Option<i32>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    files: Vec<(i32, NewFile)>,
    statuses: Vec<StatusRow>,
    personal_info: Vec<PersonalInfoRow>,
    address_degree: Vec<AddressDegreeRow>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn insert_status(&mut self, status: &NewStatus) -> i32 {
        let id = self.next_id();
        self.statuses.push(StatusRow {
            id,
            status: status.status.clone(),
            job_title: status.job_title.clone(),
            created_at: Utc::now(),
        });
        id
    }

    fn insert_file(&mut self, file: &NewFile) -> i32 {
        let id = self.next_id();
        self.files.push((id, file.clone()));
        id
    }

    fn insert_personal_info(
        &mut self,
        status_id: i32,
        file_id: Option<i32>,
        info: &NewPersonalInfo,
    ) -> Result<i32, AppError> {
        if self
            .personal_info
            .iter()
            .any(|p| p.info.email == info.email.trim())
        {
            return Err(AppError::Conflict(
                "An application with this email already exists".to_string(),
            ));
        }
        let status_known = self.statuses.iter().any(|s| s.id == status_id);
        let file_known = file_id.map_or(true, |f| self.files.iter().any(|(id, _)| *id == f));
        if !status_known || !file_known {
            return Err(AppError::Validation(
                "Referenced record does not exist".to_string(),
            ));
        }

        let id = self.next_id();
        let mut info = info.clone();
        info.email = info.email.trim().to_string();
        self.personal_info.push(PersonalInfoRow {
            id,
            info,
            status_id,
            file_id,
        });
        Ok(id)
    }

    fn insert_address_degree(
        &mut self,
        personal_info_id: i32,
        address: &NewAddressDegree,
    ) -> Result<AddressDegreeRow, AppError> {
        if !self.personal_info.iter().any(|p| p.id == personal_info_id) {
            return Err(AppError::Validation(
                "Referenced record does not exist".to_string(),
            ));
        }
        let row = AddressDegreeRow {
            id: self.next_id(),
            zipcode: address.zipcode.clone(),
            state_province: address.state_province.clone(),
            town_city: address.town_city.clone(),
            degree: address.degree.clone(),
            course: address.course.clone(),
            program: address.program.clone(),
            institution: address.institution.clone(),
            personal_info_id,
        };
        self.address_degree.push(row.clone());
        Ok(row)
    }

    fn application(&self, personal_info_id: i32) -> Option<Application> {
        let person = self
            .personal_info
            .iter()
            .find(|p| p.id == personal_info_id)?;
        let status = self.statuses.iter().find(|s| s.id == person.status_id)?;
        let address = self
            .address_degree
            .iter()
            .find(|a| a.personal_info_id == person.id);
        Some(Application {
            id: person.id,
            status_id: status.id,
            status: status.status.clone(),
            job_title: status.job_title.clone(),
            submitted_at: status.created_at,
            firstname: person.info.firstname.clone(),
            lastname: person.info.lastname.clone(),
            gender: person.info.gender.clone(),
            birthdate: person.info.birthdate.clone(),
            phone: person.info.phone.clone(),
            email: person.info.email.clone(),
            file_id: person.file_id,
            address_degree_id: address.map(|a| a.id),
            zipcode: address.map(|a| a.zipcode.clone()),
            state_province: address.map(|a| a.state_province.clone()),
            town_city: address.map(|a| a.town_city.clone()),
            degree: address.map(|a| a.degree.clone()),
            course: address.and_then(|a| a.course.clone()),
            program: address.and_then(|a| a.program.clone()),
            institution: address.map(|a| a.institution.clone()),
        })
    }
}

/// In-process record manager with the same constraints as the PostgreSQL
/// schema: unique email, foreign keys, atomic submit and cascading delete.
#[derive(Default)]
pub struct MemoryApplicationStore {
    tables: Mutex<Tables>,
}

impl MemoryApplicationStore {
    /// Row counts for (statuses, personal_info, address_degree, files).
    pub fn row_counts(&self) -> (usize, usize, usize, usize) {
        let t = self.tables.lock().unwrap();
        (
            t.statuses.len(),
            t.personal_info.len(),
            t.address_degree.len(),
            t.files.len(),
        )
    }
}

#[async_trait]
impl ApplicationStore for MemoryApplicationStore {
    async fn create_status(&self, status: &NewStatus) -> Result<i32, AppError> {
        Ok(self.tables.lock().unwrap().insert_status(status))
    }

    async fn create_file(&self, file: &NewFile) -> Result<i32, AppError> {
        Ok(self.tables.lock().unwrap().insert_file(file))
    }

    async fn create_personal_info(
        &self,
        status_id: i32,
        file_id: Option<i32>,
        info: &NewPersonalInfo,
    ) -> Result<i32, AppError> {
        self.tables
            .lock()
            .unwrap()
            .insert_personal_info(status_id, file_id, info)
    }

    async fn create_address_degree(
        &self,
        personal_info_id: i32,
        address: &NewAddressDegree,
    ) -> Result<AddressDegreeRow, AppError> {
        self.tables
            .lock()
            .unwrap()
            .insert_address_degree(personal_info_id, address)
    }

    async fn submit_application(
        &self,
        submission: &SubmitApplication,
    ) -> Result<Application, AppError> {
        let mut tables = self.tables.lock().unwrap();
        // Work on a copy and swap it in only when every insert succeeded.
        let mut staged = tables.clone();

        let file_id = submission.file.as_ref().map(|f| staged.insert_file(f));
        let status_id = staged.insert_status(&submission.status);
        let personal_info_id =
            staged.insert_personal_info(status_id, file_id, &submission.personal_info)?;
        staged.insert_address_degree(personal_info_id, &submission.address_degree)?;

        let application = staged
            .application(personal_info_id)
            .ok_or_else(|| application_not_found(personal_info_id))?;
        *tables = staged;
        Ok(application)
    }

    async fn get_application(&self, id: i32) -> Result<Application, AppError> {
        self.tables
            .lock()
            .unwrap()
            .application(id)
            .ok_or_else(|| application_not_found(id))
    }

    async fn list_applications(&self) -> Result<Vec<Application>, AppError> {
        let tables = self.tables.lock().unwrap();
        let mut applications: Vec<_> = tables
            .personal_info
            .iter()
            .filter_map(|p| tables.application(p.id))
            .filter(|a| a.address_degree_id.is_some())
            .collect();
        applications.sort_by_key(|a| a.status_id);
        Ok(applications)
    }

    async fn delete_application(&self, id: i32) -> Result<Application, AppError> {
        let mut tables = self.tables.lock().unwrap();
        let application = tables.application(id).ok_or_else(|| application_not_found(id))?;

        tables.address_degree.retain(|a| a.personal_info_id != id);
        tables.personal_info.retain(|p| p.id != id);
        tables.statuses.retain(|s| s.id != application.status_id);
        if let Some(file_id) = application.file_id {
            tables.files.retain(|(f, _)| *f != file_id);
        }
        Ok(application)
    }

    async fn update_status(&self, id: i32, update: &UpdateStatus) -> Result<StatusRow, AppError> {
        let mut tables = self.tables.lock().unwrap();
        let row = tables
            .statuses
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| status_not_found(id))?;
        row.status = update.status.clone();
        if let Some(job_title) = &update.job_title {
            row.job_title = job_title.clone();
        }
        Ok(row.clone())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::fixtures::ann_lee;

    #[tokio::test]
    async fn test_submit_then_get_round_trips_fields() {
        let store = MemoryApplicationStore::default();
        let application = store.submit_application(&ann_lee()).await.unwrap();
        let fetched = store.get_application(application.id).await.unwrap();

        assert_eq!(fetched.status, "new");
        assert_eq!(fetched.job_title, "Engineer");
        assert_eq!(fetched.firstname, "Ann");
        assert_eq!(fetched.lastname, "Lee");
        assert_eq!(fetched.birthdate, "2000-01-01");
        assert_eq!(fetched.email, "ann@example.com");
        assert_eq!(fetched.zipcode.as_deref(), Some("10001"));
        assert_eq!(fetched.town_city.as_deref(), Some("NYC"));
        assert_eq!(fetched.degree.as_deref(), Some("BSc"));
        assert_eq!(store.row_counts(), (1, 1, 1, 0));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_all_or_nothing() {
        let store = MemoryApplicationStore::default();
        store.submit_application(&ann_lee()).await.unwrap();

        let mut again = ann_lee();
        again.file = Some(NewFile {
            name: "cv.pdf".to_string(),
            size: 3,
            content_type: "application/pdf".to_string(),
        });
        let err = store.submit_application(&again).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.row_counts(), (1, 1, 1, 0));
    }

    #[tokio::test]
    async fn test_delete_cascades_over_aggregate() {
        let store = MemoryApplicationStore::default();
        let mut submission = ann_lee();
        submission.file = Some(NewFile {
            name: "cv.pdf".to_string(),
            size: 3,
            content_type: "application/pdf".to_string(),
        });
        let application = store.submit_application(&submission).await.unwrap();

        assert!(matches!(
            store.delete_application(application.id + 1000).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(store.row_counts(), (1, 1, 1, 1));

        store.delete_application(application.id).await.unwrap();
        assert_eq!(store.row_counts(), (0, 0, 0, 0));
    }

    #[tokio::test]
    async fn test_address_requires_parent() {
        let store = MemoryApplicationStore::default();
        let err = store
            .create_address_degree(42, &ann_lee().address_degree)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_ordered_by_status_id() {
        let store = MemoryApplicationStore::default();
        let first = store.submit_application(&ann_lee()).await.unwrap();
        let mut other = ann_lee();
        other.personal_info.email = "bob@example.com".to_string();
        let second = store.submit_application(&other).await.unwrap();

        let listed = store.list_applications().await.unwrap();
        let ids: Vec<_> = listed.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_delete_personal_info_without_address() {
        let store = MemoryApplicationStore::default();
        let submission = ann_lee();
        let status_id = store.create_status(&submission.status).await.unwrap();
        let personal_info_id = store
            .create_personal_info(status_id, None, &submission.personal_info)
            .await
            .unwrap();

        assert!(store.list_applications().await.unwrap().is_empty());
        let deleted = store.delete_application(personal_info_id).await.unwrap();
        assert_eq!(deleted.id, personal_info_id);
        assert_eq!(deleted.address_degree_id, None);
        assert_eq!(store.row_counts(), (0, 0, 0, 0));
    }

    #[tokio::test]
    async fn test_created_file_links_to_personal_info() {
        let store = MemoryApplicationStore::default();
        let submission = ann_lee();
        let file_id = store
            .create_file(&NewFile {
                name: "cv.pdf".to_string(),
                size: 2048,
                content_type: "application/pdf".to_string(),
            })
            .await
            .unwrap();
        let status_id = store.create_status(&submission.status).await.unwrap();
        let personal_info_id = store
            .create_personal_info(status_id, Some(file_id), &submission.personal_info)
            .await
            .unwrap();
        store
            .create_address_degree(personal_info_id, &submission.address_degree)
            .await
            .unwrap();

        let fetched = store.get_application(personal_info_id).await.unwrap();
        assert_eq!(fetched.file_id, Some(file_id));
        assert_eq!(store.row_counts(), (1, 1, 1, 1));
    }
}
