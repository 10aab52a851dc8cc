pub mod memory;
pub mod postgres;

pub use memory::MemStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::activities::{Activity, NewActivity};
use crate::brochures::{Brochure, BrochureDownload, NewBrochure, NewBrochureDownload};
use crate::crm::types::{Appointment, Lead, ListFilter, NewAppointment, NewLead};
use crate::testimonials::{NewTestimonial, Testimonial};
use crate::videos::{NewVideo, Video};
use crate::visits::{NewSiteVisit, SiteVisit};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection pool error: {0}")]
    Pool(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Blocking task error: {0}")]
    Task(String),
}

/// Per-entity CRUD contract shared by the Postgres and in-memory backends.
///
/// `create_*` validates nothing (callers validate), generates the id and
/// `created_at`, and returns the stored row. `update_*` is a full-row
/// replace returning `None` for a missing id. `delete_*` reports a missing
/// id as `false`, not an error. Infrastructure failures are `StoreError`.
#[async_trait]
pub trait Store: Send + Sync {
    // Site visits
    async fn create_site_visit(&self, new: NewSiteVisit) -> Result<SiteVisit, StoreError>;
    async fn list_site_visits(&self) -> Result<Vec<SiteVisit>, StoreError>;
    async fn delete_site_visit(&self, id: Uuid) -> Result<bool, StoreError>;

    // Leads
    async fn create_lead(&self, new: NewLead) -> Result<Lead, StoreError>;
    async fn list_leads(&self, filter: ListFilter) -> Result<Vec<Lead>, StoreError>;
    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, StoreError>;
    async fn update_lead(&self, id: Uuid, row: Lead) -> Result<Option<Lead>, StoreError>;
    async fn delete_lead(&self, id: Uuid) -> Result<bool, StoreError>;

    // Appointments
    async fn create_appointment(&self, new: NewAppointment) -> Result<Appointment, StoreError>;
    async fn list_appointments(&self, filter: ListFilter) -> Result<Vec<Appointment>, StoreError>;
    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;
    async fn update_appointment(
        &self,
        id: Uuid,
        row: Appointment,
    ) -> Result<Option<Appointment>, StoreError>;
    async fn delete_appointment(&self, id: Uuid) -> Result<bool, StoreError>;

    // Testimonials
    async fn create_testimonial(&self, new: NewTestimonial) -> Result<Testimonial, StoreError>;
    async fn list_testimonials(&self) -> Result<Vec<Testimonial>, StoreError>;
    async fn get_testimonial(&self, id: Uuid) -> Result<Option<Testimonial>, StoreError>;
    async fn update_testimonial(
        &self,
        id: Uuid,
        row: Testimonial,
    ) -> Result<Option<Testimonial>, StoreError>;
    async fn delete_testimonial(&self, id: Uuid) -> Result<bool, StoreError>;

    // Activities
    async fn create_activity(&self, new: NewActivity) -> Result<Activity, StoreError>;
    async fn list_activities(&self) -> Result<Vec<Activity>, StoreError>;
    async fn list_recent_activities(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Activity>, StoreError>;
    async fn get_activity(&self, id: Uuid) -> Result<Option<Activity>, StoreError>;
    async fn update_activity(
        &self,
        id: Uuid,
        row: Activity,
    ) -> Result<Option<Activity>, StoreError>;
    async fn delete_activity(&self, id: Uuid) -> Result<bool, StoreError>;

    // Brochures and download records
    async fn create_brochure(&self, new: NewBrochure) -> Result<Brochure, StoreError>;
    async fn list_brochures(&self) -> Result<Vec<Brochure>, StoreError>;
    async fn get_brochure(&self, id: Uuid) -> Result<Option<Brochure>, StoreError>;
    async fn update_brochure(
        &self,
        id: Uuid,
        row: Brochure,
    ) -> Result<Option<Brochure>, StoreError>;
    async fn delete_brochure(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn create_brochure_download(
        &self,
        new: NewBrochureDownload,
    ) -> Result<BrochureDownload, StoreError>;
    async fn list_brochure_downloads(&self) -> Result<Vec<BrochureDownload>, StoreError>;
    async fn delete_brochure_download(&self, id: Uuid) -> Result<bool, StoreError>;

    // Videos
    async fn create_video(&self, new: NewVideo) -> Result<Video, StoreError>;
    async fn list_videos(&self) -> Result<Vec<Video>, StoreError>;
    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, StoreError>;
    async fn update_video(&self, id: Uuid, row: Video) -> Result<Option<Video>, StoreError>;
    async fn delete_video(&self, id: Uuid) -> Result<bool, StoreError>;

    // Admin settings (single value per key)
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn put_setting(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
