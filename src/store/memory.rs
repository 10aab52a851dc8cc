use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::activities::{Activity, NewActivity};
use crate::brochures::{Brochure, BrochureDownload, NewBrochure, NewBrochureDownload};
use crate::crm::types::{Appointment, Lead, ListFilter, NewAppointment, NewLead};
use crate::testimonials::{NewTestimonial, Testimonial};
use crate::videos::{NewVideo, Video};
use crate::visits::{NewSiteVisit, SiteVisit};

use super::{Store, StoreError};

/// Map-backed store. Ephemeral: all rows are gone on restart. Rows are kept
/// in insertion order; no locking beyond the per-entity RwLock, matching the
/// last-write-wins semantics of the Postgres backend.
#[derive(Default)]
pub struct MemStore {
    site_visits: RwLock<Vec<SiteVisit>>,
    leads: RwLock<Vec<Lead>>,
    appointments: RwLock<Vec<Appointment>>,
    testimonials: RwLock<Vec<Testimonial>>,
    activities: RwLock<Vec<Activity>>,
    brochures: RwLock<Vec<Brochure>>,
    brochure_downloads: RwLock<Vec<BrochureDownload>>,
    videos: RwLock<Vec<Video>>,
    settings: RwLock<HashMap<String, String>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T: Clone>(rows: &[T], created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut rows = rows.to_vec();
    rows.sort_by_key(|r| std::cmp::Reverse(created_at(r)));
    rows
}

fn remove_by_id<T>(rows: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> bool {
    let before = rows.len();
    rows.retain(|r| !matches(r));
    rows.len() < before
}

fn replace_by_id<T: Clone>(rows: &mut [T], id_of: impl Fn(&T) -> Uuid, id: Uuid, row: T) -> Option<T> {
    let slot = rows.iter_mut().find(|r| id_of(r) == id)?;
    *slot = row.clone();
    Some(row)
}

fn matches_filter(filter: &ListFilter, status: &str, haystack: &[&str]) -> bool {
    if let Some(ref wanted) = filter.status {
        if status != wanted {
            return false;
        }
    }
    if let Some(ref search) = filter.search {
        let needle = search.to_lowercase();
        if !haystack
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
        {
            return false;
        }
    }
    true
}

#[async_trait]
impl Store for MemStore {
    async fn create_site_visit(&self, new: NewSiteVisit) -> Result<SiteVisit, StoreError> {
        let visit = SiteVisit {
            id: Uuid::new_v4(),
            name: new.name,
            mobile: new.mobile,
            email: new.email,
            preferred_date: new.preferred_date,
            plot_size: new.plot_size,
            budget: new.budget,
            created_at: Utc::now(),
        };
        self.site_visits.write().await.push(visit.clone());
        Ok(visit)
    }

    async fn list_site_visits(&self) -> Result<Vec<SiteVisit>, StoreError> {
        Ok(newest_first(&self.site_visits.read().await, |v| v.created_at))
    }

    async fn delete_site_visit(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(remove_by_id(&mut *self.site_visits.write().await, |v| v.id == id))
    }

    async fn create_lead(&self, new: NewLead) -> Result<Lead, StoreError> {
        let now = Utc::now();
        let lead = Lead {
            id: Uuid::new_v4(),
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            phone: new.phone,
            source: new.source,
            status: new.status,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };
        self.leads.write().await.push(lead.clone());
        Ok(lead)
    }

    async fn list_leads(&self, filter: ListFilter) -> Result<Vec<Lead>, StoreError> {
        let leads: Vec<Lead> = self
            .leads
            .read()
            .await
            .iter()
            .filter(|l| {
                matches_filter(
                    &filter,
                    &l.status,
                    &[l.first_name.as_str(), l.last_name.as_str(), l.email.as_str()],
                )
            })
            .cloned()
            .collect();
        Ok(newest_first(&leads, |l| l.created_at))
    }

    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, StoreError> {
        Ok(self.leads.read().await.iter().find(|l| l.id == id).cloned())
    }

    async fn update_lead(&self, id: Uuid, row: Lead) -> Result<Option<Lead>, StoreError> {
        Ok(replace_by_id(&mut self.leads.write().await, |l| l.id, id, row))
    }

    async fn delete_lead(&self, id: Uuid) -> Result<bool, StoreError> {
        let deleted = remove_by_id(&mut *self.leads.write().await, |l| l.id == id);
        if deleted {
            // Mirrors the relational ON DELETE CASCADE.
            self.appointments.write().await.retain(|a| a.lead_id != id);
        }
        Ok(deleted)
    }

    async fn create_appointment(&self, new: NewAppointment) -> Result<Appointment, StoreError> {
        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            lead_id: new.lead_id,
            title: new.title,
            description: new.description,
            appointment_date: new.appointment_date,
            duration_minutes: new.duration_minutes,
            location: new.location,
            status: new.status,
            created_at: now,
            updated_at: now,
        };
        self.appointments.write().await.push(appointment.clone());
        Ok(appointment)
    }

    async fn list_appointments(
        &self,
        filter: ListFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        Ok(self
            .appointments
            .read()
            .await
            .iter()
            .filter(|a| matches_filter(&filter, &a.status, &[a.title.as_str(), a.location.as_str()]))
            .cloned()
            .collect())
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self
            .appointments
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn update_appointment(
        &self,
        id: Uuid,
        row: Appointment,
    ) -> Result<Option<Appointment>, StoreError> {
        Ok(replace_by_id(
            &mut self.appointments.write().await,
            |a| a.id,
            id,
            row,
        ))
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(remove_by_id(&mut *self.appointments.write().await, |a| {
            a.id == id
        }))
    }

    async fn create_testimonial(&self, new: NewTestimonial) -> Result<Testimonial, StoreError> {
        let testimonial = Testimonial {
            id: Uuid::new_v4(),
            name: new.name,
            location: new.location,
            investment: new.investment,
            plot_size: new.plot_size,
            returns: new.returns,
            duration: new.duration,
            review: new.review,
            created_at: Utc::now(),
        };
        self.testimonials.write().await.push(testimonial.clone());
        Ok(testimonial)
    }

    async fn list_testimonials(&self) -> Result<Vec<Testimonial>, StoreError> {
        Ok(newest_first(&self.testimonials.read().await, |t| {
            t.created_at
        }))
    }

    async fn get_testimonial(&self, id: Uuid) -> Result<Option<Testimonial>, StoreError> {
        Ok(self
            .testimonials
            .read()
            .await
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn update_testimonial(
        &self,
        id: Uuid,
        row: Testimonial,
    ) -> Result<Option<Testimonial>, StoreError> {
        Ok(replace_by_id(
            &mut self.testimonials.write().await,
            |t| t.id,
            id,
            row,
        ))
    }

    async fn delete_testimonial(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(remove_by_id(&mut *self.testimonials.write().await, |t| {
            t.id == id
        }))
    }

    async fn create_activity(&self, new: NewActivity) -> Result<Activity, StoreError> {
        let activity = Activity {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            activity_type: new.activity_type,
            created_at: Utc::now(),
        };
        self.activities.write().await.push(activity.clone());
        Ok(activity)
    }

    async fn list_activities(&self) -> Result<Vec<Activity>, StoreError> {
        Ok(newest_first(&self.activities.read().await, |a| a.created_at))
    }

    async fn list_recent_activities(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Activity>, StoreError> {
        let recent: Vec<Activity> = self
            .activities
            .read()
            .await
            .iter()
            .filter(|a| a.created_at >= since)
            .cloned()
            .collect();
        Ok(newest_first(&recent, |a| a.created_at))
    }

    async fn get_activity(&self, id: Uuid) -> Result<Option<Activity>, StoreError> {
        Ok(self
            .activities
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn update_activity(
        &self,
        id: Uuid,
        row: Activity,
    ) -> Result<Option<Activity>, StoreError> {
        Ok(replace_by_id(
            &mut self.activities.write().await,
            |a| a.id,
            id,
            row,
        ))
    }

    async fn delete_activity(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(remove_by_id(&mut *self.activities.write().await, |a| {
            a.id == id
        }))
    }

    async fn create_brochure(&self, new: NewBrochure) -> Result<Brochure, StoreError> {
        let brochure = Brochure {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            file_url: new.file_url,
            created_at: Utc::now(),
        };
        self.brochures.write().await.push(brochure.clone());
        Ok(brochure)
    }

    async fn list_brochures(&self) -> Result<Vec<Brochure>, StoreError> {
        Ok(newest_first(&self.brochures.read().await, |b| b.created_at))
    }

    async fn get_brochure(&self, id: Uuid) -> Result<Option<Brochure>, StoreError> {
        Ok(self
            .brochures
            .read()
            .await
            .iter()
            .find(|b| b.id == id)
            .cloned())
    }

    async fn update_brochure(
        &self,
        id: Uuid,
        row: Brochure,
    ) -> Result<Option<Brochure>, StoreError> {
        Ok(replace_by_id(
            &mut self.brochures.write().await,
            |b| b.id,
            id,
            row,
        ))
    }

    async fn delete_brochure(&self, id: Uuid) -> Result<bool, StoreError> {
        let deleted = remove_by_id(&mut *self.brochures.write().await, |b| b.id == id);
        if deleted {
            self.brochure_downloads
                .write()
                .await
                .retain(|d| d.brochure_id != id);
        }
        Ok(deleted)
    }

    async fn create_brochure_download(
        &self,
        new: NewBrochureDownload,
    ) -> Result<BrochureDownload, StoreError> {
        let download = BrochureDownload {
            id: Uuid::new_v4(),
            brochure_id: new.brochure_id,
            user_name: new.user_name,
            user_email: new.user_email,
            user_phone: new.user_phone,
            created_at: Utc::now(),
        };
        self.brochure_downloads.write().await.push(download.clone());
        Ok(download)
    }

    async fn list_brochure_downloads(&self) -> Result<Vec<BrochureDownload>, StoreError> {
        Ok(newest_first(&self.brochure_downloads.read().await, |d| {
            d.created_at
        }))
    }

    async fn delete_brochure_download(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(remove_by_id(&mut *self.brochure_downloads.write().await, |d| {
            d.id == id
        }))
    }

    async fn create_video(&self, new: NewVideo) -> Result<Video, StoreError> {
        let video = Video {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            video_url: new.video_url,
            created_at: Utc::now(),
        };
        self.videos.write().await.push(video.clone());
        Ok(video)
    }

    async fn list_videos(&self) -> Result<Vec<Video>, StoreError> {
        Ok(newest_first(&self.videos.read().await, |v| v.created_at))
    }

    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, StoreError> {
        Ok(self
            .videos
            .read()
            .await
            .iter()
            .find(|v| v.id == id)
            .cloned())
    }

    async fn update_video(&self, id: Uuid, row: Video) -> Result<Option<Video>, StoreError> {
        Ok(replace_by_id(&mut self.videos.write().await, |v| v.id, id, row))
    }

    async fn delete_video(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(remove_by_id(&mut *self.videos.write().await, |v| v.id == id))
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.settings.read().await.get(key).cloned())
    }

    async fn put_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.settings
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn visit(name: &str) -> NewSiteVisit {
        NewSiteVisit {
            name: name.to_string(),
            mobile: "9876543210".to_string(),
            email: None,
            preferred_date: None,
            plot_size: None,
            budget: None,
        }
    }

    #[tokio::test]
    async fn identical_submissions_get_distinct_ids() {
        let store = MemStore::new();
        let a = store.create_site_visit(visit("Asha")).await.unwrap();
        let b = store.create_site_visit(visit("Asha")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.list_site_visits().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn deleting_missing_rows_reports_false() {
        let store = MemStore::new();
        assert!(!store.delete_site_visit(Uuid::new_v4()).await.unwrap());
        assert!(!store.delete_appointment(Uuid::new_v4()).await.unwrap());
        assert!(!store.delete_lead(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn updating_missing_rows_reports_none() {
        let store = MemStore::new();
        let lead = store
            .create_lead(NewLead {
                first_name: "Asha".to_string(),
                last_name: "Rao".to_string(),
                email: "asha@example.com".to_string(),
                phone: "9876543210".to_string(),
                source: None,
                status: "new".to_string(),
                notes: None,
            })
            .await
            .unwrap();
        let mut orphan = lead.clone();
        orphan.id = Uuid::new_v4();
        assert!(store
            .update_lead(orphan.id, orphan)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn deleting_a_lead_removes_its_appointments() {
        let store = MemStore::new();
        let lead = store
            .create_lead(NewLead {
                first_name: "Asha".to_string(),
                last_name: "Rao".to_string(),
                email: "asha@example.com".to_string(),
                phone: "9876543210".to_string(),
                source: None,
                status: "new".to_string(),
                notes: None,
            })
            .await
            .unwrap();
        store
            .create_appointment(NewAppointment {
                lead_id: lead.id,
                title: "Site tour".to_string(),
                description: None,
                appointment_date: Utc::now(),
                duration_minutes: 60,
                location: "Site office".to_string(),
                status: "scheduled".to_string(),
            })
            .await
            .unwrap();
        assert!(store.delete_lead(lead.id).await.unwrap());
        assert!(store
            .list_appointments(ListFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn recent_activities_excludes_stale_rows() {
        let store = MemStore::new();
        store
            .create_activity(NewActivity {
                title: "Fresh booking".to_string(),
                description: "Plot inquiry from Dehradun".to_string(),
                activity_type: "inquiry".to_string(),
            })
            .await
            .unwrap();
        let stale = store
            .create_activity(NewActivity {
                title: "Old sale".to_string(),
                description: "Closed last week".to_string(),
                activity_type: "sale".to_string(),
            })
            .await
            .unwrap();
        if let Some(a) = store
            .activities
            .write()
            .await
            .iter_mut()
            .find(|a| a.id == stale.id)
        {
            a.created_at = Utc::now() - Duration::days(3);
        }

        let since = Utc::now() - Duration::hours(48);
        let recent = store.list_recent_activities(since).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].title, "Fresh booking");
    }

    #[tokio::test]
    async fn appointment_filter_matches_status_and_text() {
        let store = MemStore::new();
        let lead_id = Uuid::new_v4();
        for (title, status) in [("Site tour", "scheduled"), ("Paperwork", "completed")] {
            store
                .create_appointment(NewAppointment {
                    lead_id,
                    title: title.to_string(),
                    description: None,
                    appointment_date: Utc::now(),
                    duration_minutes: 30,
                    location: "Office".to_string(),
                    status: status.to_string(),
                })
                .await
                .unwrap();
        }
        let by_status = store
            .list_appointments(ListFilter {
                search: None,
                status: Some("completed".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(by_status.len(), 1);
        assert_eq!(by_status[0].title, "Paperwork");

        let by_text = store
            .list_appointments(ListFilter {
                search: Some("tour".to_string()),
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(by_text.len(), 1);
        assert_eq!(by_text[0].title, "Site tour");
    }

    #[tokio::test]
    async fn settings_upsert() {
        let store = MemStore::new();
        assert!(store.get_setting("admin_password").await.unwrap().is_none());
        store.put_setting("admin_password", "one").await.unwrap();
        store.put_setting("admin_password", "two").await.unwrap();
        assert_eq!(
            store.get_setting("admin_password").await.unwrap().as_deref(),
            Some("two")
        );
    }
}
