use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        certificate::{self, Entity as Certificate},
        course::Entity as Course,
        user::Entity as User,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::notifications::{EmailNotification, NotificationSender},
};

/// Minimum final score required for a certificate.
pub const PASSING_SCORE: i16 = 70;

/// Renders an HTML document into PDF bytes.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, html: &str) -> Result<Vec<u8>, ServiceError>;
}

/// Persists a rendered document and returns a durable public URL.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn store(&self, name: &str, bytes: Vec<u8>) -> Result<String, ServiceError>;
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct IssueCertificateRequest {
    pub user_id: Uuid,
    pub course_id: Uuid,
    #[validate(range(min = 0, max = 100, message = "Score must be between 0 and 100"))]
    pub score: i16,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CertificateResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub url: String,
    pub score: i16,
    pub serial_number: String,
    pub issuer: String,
}

/// Issues completion certificates. Rendering and storage are behind
/// traits so the service stays testable without a PDF engine or a CDN.
#[derive(Clone)]
pub struct CertificateService {
    db: Arc<DbPool>,
    renderer: Arc<dyn DocumentRenderer>,
    media: Arc<dyn MediaStore>,
    notifier: Arc<dyn NotificationSender>,
    event_sender: Option<Arc<EventSender>>,
}

impl CertificateService {
    pub fn new(
        db: Arc<DbPool>,
        renderer: Arc<dyn DocumentRenderer>,
        media: Arc<dyn MediaStore>,
        notifier: Arc<dyn NotificationSender>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db,
            renderer,
            media,
            notifier,
            event_sender,
        }
    }

    /// Issues a certificate for a passing score. A certificate already on
    /// file for the (user, course) pair is returned as-is rather than
    /// re-rendered. The document URL must exist before the row is
    /// persisted, so a storage failure leaves no dangling record.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, course_id = %request.course_id))]
    pub async fn issue(
        &self,
        request: IssueCertificateRequest,
    ) -> Result<CertificateResponse, ServiceError> {
        request.validate()?;
        if request.score < PASSING_SCORE {
            return Err(ServiceError::InvalidInput(format!(
                "A score of at least {} is required for a certificate",
                PASSING_SCORE
            )));
        }

        if let Some(existing) = Certificate::find()
            .filter(certificate::Column::UserId.eq(request.user_id))
            .filter(certificate::Column::CourseId.eq(request.course_id))
            .one(&*self.db)
            .await?
        {
            info!(certificate_id = %existing.id, "Certificate already issued; returning existing");
            return Ok(model_to_response(existing));
        }

        let user = User::find_by_id(request.user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("User {} not found", request.user_id))
            })?;
        let course = Course::find_by_id(request.course_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Course {} not found", request.course_id))
            })?;

        let serial_number = format!("CERT-{}", Uuid::new_v4().simple());
        let html = certificate_html(&user.name, &course.title, request.score, &serial_number);
        let pdf = self.renderer.render(&html).await?;
        let url = self
            .media
            .store(&format!("certificates/{}.pdf", serial_number), pdf)
            .await?;

        let record = certificate::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            course_id: Set(course.id),
            url: Set(url),
            score: Set(request.score),
            serial_number: Set(serial_number),
            issuer: Set("Courseline".to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        info!(certificate_id = %record.id, "Certificate issued");
        self.notify_issued(&user.email, &course.title, &record).await;
        self.emit(Event::CertificateIssued {
            certificate_id: record.id,
            user_id: user.id,
            course_id: course.id,
        })
        .await;

        Ok(model_to_response(record))
    }

    async fn notify_issued(&self, email: &str, course_title: &str, record: &certificate::Model) {
        let note = EmailNotification {
            to: email.to_string(),
            subject: "Your course certificate is ready".to_string(),
            template: "certificate-issued".to_string(),
            data: json!({
                "course_title": course_title,
                "url": record.url,
                "serial_number": record.serial_number,
            }),
        };
        if let Err(e) = self.notifier.send(note).await {
            warn!(error = %e, certificate_id = %record.id, "Failed to send certificate email");
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send certificate event");
            }
        }
    }
}

fn certificate_html(user_name: &str, course_title: &str, score: i16, serial: &str) -> String {
    format!(
        "<html><body><h1>Certificate of Completion</h1>\
         <p>{} has completed <strong>{}</strong> with a score of {}.</p>\
         <p>Serial: {}</p></body></html>",
        user_name, course_title, score, serial
    )
}

fn model_to_response(model: certificate::Model) -> CertificateResponse {
    CertificateResponse {
        id: model.id,
        user_id: model.user_id,
        course_id: model.course_id,
        url: model.url,
        score: model.score,
        serial_number: model.serial_number,
        issuer: model.issuer,
    }
}

/// Renderer that emits the HTML bytes unchanged. Stands in until a real
/// PDF engine is wired up, and keeps tests hermetic.
#[derive(Default)]
pub struct PassthroughRenderer;

#[async_trait]
impl DocumentRenderer for PassthroughRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>, ServiceError> {
        Ok(html.as_bytes().to_vec())
    }
}

/// Stores nothing and returns a synthetic URL. Used when no media
/// backend is configured and in tests.
#[derive(Default)]
pub struct LocalMediaStore;

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn store(&self, name: &str, _bytes: Vec<u8>) -> Result<String, ServiceError> {
        Ok(format!("https://media.local/{}", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_includes_the_serial() {
        let html = certificate_html("Ada", "Systems Programming", 91, "CERT-abc");
        assert!(html.contains("Ada"));
        assert!(html.contains("Systems Programming"));
        assert!(html.contains("CERT-abc"));
    }

    #[tokio::test]
    async fn local_store_builds_a_url() {
        let store = LocalMediaStore;
        let url = store.store("certificates/x.pdf", vec![1, 2]).await.unwrap();
        assert_eq!(url, "https://media.local/certificates/x.pdf");
    }
}
