use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use tokio::sync::Notify;

use crate::applications::domain::{
    ApplicantContact, Application, ApplicationId, ApplicationStatus, JobListing,
};
use crate::documents::{
    Collection, Document, DocumentError, DocumentStore, Fields, MemoryDocumentStore, Predicate,
    WriteMode,
};
use crate::session::{Role, Session, UserId, Visitor};

pub(super) fn employer() -> UserId {
    UserId::new("emp-1")
}

pub(super) fn other_employer() -> UserId {
    UserId::new("emp-2")
}

pub(super) fn seeker() -> UserId {
    UserId::new("seeker-1")
}

pub(super) fn ready(user: UserId, role: Role, profile_complete: bool) -> Session {
    Session::Ready(Visitor {
        user_id: user,
        role,
        profile_complete,
        email: Some("visitor@example.com".to_string()),
    })
}

pub(super) fn listing(job_id: &str) -> JobListing {
    JobListing {
        job_id: job_id.to_string(),
        job_title: "Backend Engineer".to_string(),
        company_name: "Medrin".to_string(),
        employer_id: employer(),
    }
}

pub(super) fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap()
}

pub(super) fn application(
    job_id: &str,
    applicant: &UserId,
    status: ApplicationStatus,
    created_at: DateTime<Utc>,
) -> Application {
    Application {
        id: ApplicationId::for_listing(job_id, applicant),
        job_id: job_id.to_string(),
        applicant_id: applicant.clone(),
        employer_id: employer(),
        job_title: "Backend Engineer".to_string(),
        company_name: "Medrin".to_string(),
        applicant_contact: ApplicantContact {
            email: format!("{applicant}@example.com"),
            phone: Some("+254700000000".to_string()),
        },
        status,
        created_at,
    }
}

pub(super) async fn seed(documents: &MemoryDocumentStore, record: &Application) {
    documents
        .create(
            Collection::Applications,
            record.id.as_str(),
            record.to_fields(),
        )
        .await
        .expect("seed application");
}

pub(super) async fn seeded_pending() -> (Arc<MemoryDocumentStore>, Application) {
    let documents = Arc::new(MemoryDocumentStore::new());
    let record = application("job-1", &seeker(), ApplicationStatus::Pending, at(1));
    seed(&documents, &record).await;
    (documents, record)
}

pub(super) async fn stored_status(documents: &MemoryDocumentStore, id: &ApplicationId) -> String {
    documents
        .get(Collection::Applications, id.as_str())
        .await
        .expect("read")
        .and_then(|document| document.str_field("status").map(str::to_string))
        .expect("status present")
}

pub(super) async fn seed_profile(documents: &MemoryDocumentStore, user: &UserId, fields: Fields) {
    documents
        .put(Collection::Users, user.as_str(), fields, WriteMode::Replace)
        .await
        .expect("seed profile");
}

pub(super) fn seeker_profile() -> Fields {
    json!({
        "userType": "job_seeker",
        "email": "seeker-1@example.com",
        "phone": "+254711111111",
    })
    .as_object()
    .cloned()
    .expect("object literal")
}

pub(super) fn complete_seeker_profile() -> Fields {
    json!({
        "userType": "job_seeker",
        "email": "seeker-1@example.com",
        "firstname": "Amina",
        "lastname": "Otieno",
        "location": "Mombasa",
        "phone": "+254711111111",
        "dateOfBirth": "1996-05-14",
    })
    .as_object()
    .cloned()
    .expect("object literal")
}

pub(super) fn employer_profile() -> Fields {
    json!({ "userType": "employer", "company_name": "Medrin" })
        .as_object()
        .cloned()
        .expect("object literal")
}

/// Document store whose conditional updates fail while reads keep working.
#[derive(Default)]
pub(super) struct FailingUpdates {
    pub(super) inner: MemoryDocumentStore,
}

#[async_trait]
impl DocumentStore for FailingUpdates {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, DocumentError> {
        self.inner.get(collection, id).await
    }

    async fn put(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
        mode: WriteMode,
    ) -> Result<(), DocumentError> {
        self.inner.put(collection, id, fields, mode).await
    }

    async fn create(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<(), DocumentError> {
        self.inner.create(collection, id, fields).await
    }

    async fn query(
        &self,
        collection: Collection,
        predicate: &Predicate,
    ) -> Result<Vec<Document>, DocumentError> {
        self.inner.query(collection, predicate).await
    }

    async fn update(
        &self,
        _collection: Collection,
        _id: &str,
        _fields: Fields,
        _condition: &Predicate,
    ) -> Result<Document, DocumentError> {
        Err(DocumentError::Unavailable("write quorum lost".to_string()))
    }
}

/// Document store that is down for every operation.
pub(super) struct OfflineDocuments;

#[async_trait]
impl DocumentStore for OfflineDocuments {
    async fn get(&self, _: Collection, _: &str) -> Result<Option<Document>, DocumentError> {
        Err(DocumentError::Unavailable("offline".to_string()))
    }

    async fn put(&self, _: Collection, _: &str, _: Fields, _: WriteMode) -> Result<(), DocumentError> {
        Err(DocumentError::Unavailable("offline".to_string()))
    }

    async fn create(&self, _: Collection, _: &str, _: Fields) -> Result<(), DocumentError> {
        Err(DocumentError::Unavailable("offline".to_string()))
    }

    async fn query(&self, _: Collection, _: &Predicate) -> Result<Vec<Document>, DocumentError> {
        Err(DocumentError::Unavailable("offline".to_string()))
    }

    async fn update(
        &self,
        _: Collection,
        _: &str,
        _: Fields,
        _: &Predicate,
    ) -> Result<Document, DocumentError> {
        Err(DocumentError::Unavailable("offline".to_string()))
    }
}

/// Document store whose updates park until released, for observing in-flight writes.
#[derive(Default)]
pub(super) struct ParkedUpdates {
    pub(super) inner: MemoryDocumentStore,
    pub(super) release: Notify,
    pub(super) parked: AtomicUsize,
}

impl ParkedUpdates {
    pub(super) fn parked(&self) -> usize {
        self.parked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for ParkedUpdates {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, DocumentError> {
        self.inner.get(collection, id).await
    }

    async fn put(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
        mode: WriteMode,
    ) -> Result<(), DocumentError> {
        self.inner.put(collection, id, fields, mode).await
    }

    async fn create(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<(), DocumentError> {
        self.inner.create(collection, id, fields).await
    }

    async fn query(
        &self,
        collection: Collection,
        predicate: &Predicate,
    ) -> Result<Vec<Document>, DocumentError> {
        self.inner.query(collection, predicate).await
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
        condition: &Predicate,
    ) -> Result<Document, DocumentError> {
        self.parked.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        self.inner.update(collection, id, fields, condition).await
    }
}
