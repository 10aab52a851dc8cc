use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::upsert::excluded;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use uuid::Uuid;

use crate::activities::{Activity, NewActivity};
use crate::brochures::{Brochure, BrochureDownload, NewBrochure, NewBrochureDownload};
use crate::crm::types::{Appointment, Lead, ListFilter, NewAppointment, NewLead};
use crate::shared::schema::{
    activities, admin_settings, appointments, brochure_downloads, brochures, leads, site_visits,
    testimonials, videos,
};
use crate::testimonials::{NewTestimonial, Testimonial};
use crate::videos::{NewVideo, Video};
use crate::visits::{NewSiteVisit, SiteVisit};

use super::{Store, StoreError};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = admin_settings)]
struct AdminSetting {
    key: String,
    value: String,
    updated_at: DateTime<Utc>,
}

fn db_err(e: diesel::result::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn connect(database_url: &str) -> Result<Self, StoreError> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .build(manager)
            .map_err(|e| StoreError::Pool(e.to_string()))?;
        let mut conn = pool.get().map_err(|e| StoreError::Pool(e.to_string()))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(Self { pool })
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| StoreError::Pool(e.to_string()))?;
            op(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_site_visit(&self, new: NewSiteVisit) -> Result<SiteVisit, StoreError> {
        self.blocking(move |conn| {
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
            diesel::insert_into(site_visits::table)
                .values(&visit)
                .execute(conn)
                .map_err(db_err)?;
            Ok(visit)
        })
        .await
    }

    async fn list_site_visits(&self) -> Result<Vec<SiteVisit>, StoreError> {
        self.blocking(move |conn| {
            site_visits::table
                .order(site_visits::created_at.desc())
                .load(conn)
                .map_err(db_err)
        })
        .await
    }

    async fn delete_site_visit(&self, id: Uuid) -> Result<bool, StoreError> {
        self.blocking(move |conn| {
            let deleted = diesel::delete(site_visits::table.find(id))
                .execute(conn)
                .map_err(db_err)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn create_lead(&self, new: NewLead) -> Result<Lead, StoreError> {
        self.blocking(move |conn| {
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
            diesel::insert_into(leads::table)
                .values(&lead)
                .execute(conn)
                .map_err(db_err)?;
            Ok(lead)
        })
        .await
    }

    async fn list_leads(&self, filter: ListFilter) -> Result<Vec<Lead>, StoreError> {
        self.blocking(move |conn| {
            let mut q = leads::table.into_boxed();
            if let Some(status) = filter.status {
                q = q.filter(leads::status.eq(status));
            }
            if let Some(search) = filter.search {
                let pattern = format!("%{search}%");
                q = q.filter(
                    leads::first_name
                        .ilike(pattern.clone())
                        .or(leads::last_name.ilike(pattern.clone()))
                        .or(leads::email.ilike(pattern)),
                );
            }
            q.order(leads::created_at.desc()).load(conn).map_err(db_err)
        })
        .await
    }

    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, StoreError> {
        self.blocking(move |conn| {
            leads::table
                .find(id)
                .first(conn)
                .optional()
                .map_err(db_err)
        })
        .await
    }

    async fn update_lead(&self, id: Uuid, row: Lead) -> Result<Option<Lead>, StoreError> {
        self.blocking(move |conn| {
            let updated = diesel::update(leads::table.find(id))
                .set(&row)
                .execute(conn)
                .map_err(db_err)?;
            Ok(if updated == 0 { None } else { Some(row) })
        })
        .await
    }

    async fn delete_lead(&self, id: Uuid) -> Result<bool, StoreError> {
        self.blocking(move |conn| {
            let deleted = diesel::delete(leads::table.find(id))
                .execute(conn)
                .map_err(db_err)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn create_appointment(&self, new: NewAppointment) -> Result<Appointment, StoreError> {
        self.blocking(move |conn| {
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
            diesel::insert_into(appointments::table)
                .values(&appointment)
                .execute(conn)
                .map_err(db_err)?;
            Ok(appointment)
        })
        .await
    }

    async fn list_appointments(
        &self,
        filter: ListFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.blocking(move |conn| {
            let mut q = appointments::table.into_boxed();
            if let Some(status) = filter.status {
                q = q.filter(appointments::status.eq(status));
            }
            if let Some(search) = filter.search {
                let pattern = format!("%{search}%");
                q = q.filter(
                    appointments::title
                        .ilike(pattern.clone())
                        .or(appointments::location.ilike(pattern)),
                );
            }
            q.order(appointments::created_at.asc())
                .load(conn)
                .map_err(db_err)
        })
        .await
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        self.blocking(move |conn| {
            appointments::table
                .find(id)
                .first(conn)
                .optional()
                .map_err(db_err)
        })
        .await
    }

    async fn update_appointment(
        &self,
        id: Uuid,
        row: Appointment,
    ) -> Result<Option<Appointment>, StoreError> {
        self.blocking(move |conn| {
            let updated = diesel::update(appointments::table.find(id))
                .set(&row)
                .execute(conn)
                .map_err(db_err)?;
            Ok(if updated == 0 { None } else { Some(row) })
        })
        .await
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<bool, StoreError> {
        self.blocking(move |conn| {
            let deleted = diesel::delete(appointments::table.find(id))
                .execute(conn)
                .map_err(db_err)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn create_testimonial(&self, new: NewTestimonial) -> Result<Testimonial, StoreError> {
        self.blocking(move |conn| {
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
            diesel::insert_into(testimonials::table)
                .values(&testimonial)
                .execute(conn)
                .map_err(db_err)?;
            Ok(testimonial)
        })
        .await
    }

    async fn list_testimonials(&self) -> Result<Vec<Testimonial>, StoreError> {
        self.blocking(move |conn| {
            testimonials::table
                .order(testimonials::created_at.desc())
                .load(conn)
                .map_err(db_err)
        })
        .await
    }

    async fn get_testimonial(&self, id: Uuid) -> Result<Option<Testimonial>, StoreError> {
        self.blocking(move |conn| {
            testimonials::table
                .find(id)
                .first(conn)
                .optional()
                .map_err(db_err)
        })
        .await
    }

    async fn update_testimonial(
        &self,
        id: Uuid,
        row: Testimonial,
    ) -> Result<Option<Testimonial>, StoreError> {
        self.blocking(move |conn| {
            let updated = diesel::update(testimonials::table.find(id))
                .set(&row)
                .execute(conn)
                .map_err(db_err)?;
            Ok(if updated == 0 { None } else { Some(row) })
        })
        .await
    }

    async fn delete_testimonial(&self, id: Uuid) -> Result<bool, StoreError> {
        self.blocking(move |conn| {
            let deleted = diesel::delete(testimonials::table.find(id))
                .execute(conn)
                .map_err(db_err)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn create_activity(&self, new: NewActivity) -> Result<Activity, StoreError> {
        self.blocking(move |conn| {
            let activity = Activity {
                id: Uuid::new_v4(),
                title: new.title,
                description: new.description,
                activity_type: new.activity_type,
                created_at: Utc::now(),
            };
            diesel::insert_into(activities::table)
                .values(&activity)
                .execute(conn)
                .map_err(db_err)?;
            Ok(activity)
        })
        .await
    }

    async fn list_activities(&self) -> Result<Vec<Activity>, StoreError> {
        self.blocking(move |conn| {
            activities::table
                .order(activities::created_at.desc())
                .load(conn)
                .map_err(db_err)
        })
        .await
    }

    async fn list_recent_activities(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Activity>, StoreError> {
        self.blocking(move |conn| {
            activities::table
                .filter(activities::created_at.ge(since))
                .order(activities::created_at.desc())
                .load(conn)
                .map_err(db_err)
        })
        .await
    }

    async fn get_activity(&self, id: Uuid) -> Result<Option<Activity>, StoreError> {
        self.blocking(move |conn| {
            activities::table
                .find(id)
                .first(conn)
                .optional()
                .map_err(db_err)
        })
        .await
    }

    async fn update_activity(
        &self,
        id: Uuid,
        row: Activity,
    ) -> Result<Option<Activity>, StoreError> {
        self.blocking(move |conn| {
            let updated = diesel::update(activities::table.find(id))
                .set(&row)
                .execute(conn)
                .map_err(db_err)?;
            Ok(if updated == 0 { None } else { Some(row) })
        })
        .await
    }

    async fn delete_activity(&self, id: Uuid) -> Result<bool, StoreError> {
        self.blocking(move |conn| {
            let deleted = diesel::delete(activities::table.find(id))
                .execute(conn)
                .map_err(db_err)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn create_brochure(&self, new: NewBrochure) -> Result<Brochure, StoreError> {
        self.blocking(move |conn| {
            let brochure = Brochure {
                id: Uuid::new_v4(),
                title: new.title,
                description: new.description,
                file_url: new.file_url,
                created_at: Utc::now(),
            };
            diesel::insert_into(brochures::table)
                .values(&brochure)
                .execute(conn)
                .map_err(db_err)?;
            Ok(brochure)
        })
        .await
    }

    async fn list_brochures(&self) -> Result<Vec<Brochure>, StoreError> {
        self.blocking(move |conn| {
            brochures::table
                .order(brochures::created_at.desc())
                .load(conn)
                .map_err(db_err)
        })
        .await
    }

    async fn get_brochure(&self, id: Uuid) -> Result<Option<Brochure>, StoreError> {
        self.blocking(move |conn| {
            brochures::table
                .find(id)
                .first(conn)
                .optional()
                .map_err(db_err)
        })
        .await
    }

    async fn update_brochure(
        &self,
        id: Uuid,
        row: Brochure,
    ) -> Result<Option<Brochure>, StoreError> {
        self.blocking(move |conn| {
            let updated = diesel::update(brochures::table.find(id))
                .set(&row)
                .execute(conn)
                .map_err(db_err)?;
            Ok(if updated == 0 { None } else { Some(row) })
        })
        .await
    }

    async fn delete_brochure(&self, id: Uuid) -> Result<bool, StoreError> {
        self.blocking(move |conn| {
            let deleted = diesel::delete(brochures::table.find(id))
                .execute(conn)
                .map_err(db_err)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn create_brochure_download(
        &self,
        new: NewBrochureDownload,
    ) -> Result<BrochureDownload, StoreError> {
        self.blocking(move |conn| {
            let download = BrochureDownload {
                id: Uuid::new_v4(),
                brochure_id: new.brochure_id,
                user_name: new.user_name,
                user_email: new.user_email,
                user_phone: new.user_phone,
                created_at: Utc::now(),
            };
            diesel::insert_into(brochure_downloads::table)
                .values(&download)
                .execute(conn)
                .map_err(db_err)?;
            Ok(download)
        })
        .await
    }

    async fn list_brochure_downloads(&self) -> Result<Vec<BrochureDownload>, StoreError> {
        self.blocking(move |conn| {
            brochure_downloads::table
                .order(brochure_downloads::created_at.desc())
                .load(conn)
                .map_err(db_err)
        })
        .await
    }

    async fn delete_brochure_download(&self, id: Uuid) -> Result<bool, StoreError> {
        self.blocking(move |conn| {
            let deleted = diesel::delete(brochure_downloads::table.find(id))
                .execute(conn)
                .map_err(db_err)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn create_video(&self, new: NewVideo) -> Result<Video, StoreError> {
        self.blocking(move |conn| {
            let video = Video {
                id: Uuid::new_v4(),
                title: new.title,
                description: new.description,
                video_url: new.video_url,
                created_at: Utc::now(),
            };
            diesel::insert_into(videos::table)
                .values(&video)
                .execute(conn)
                .map_err(db_err)?;
            Ok(video)
        })
        .await
    }

    async fn list_videos(&self) -> Result<Vec<Video>, StoreError> {
        self.blocking(move |conn| {
            videos::table
                .order(videos::created_at.desc())
                .load(conn)
                .map_err(db_err)
        })
        .await
    }

    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, StoreError> {
        self.blocking(move |conn| {
            videos::table
                .find(id)
                .first(conn)
                .optional()
                .map_err(db_err)
        })
        .await
    }

    async fn update_video(&self, id: Uuid, row: Video) -> Result<Option<Video>, StoreError> {
        self.blocking(move |conn| {
            let updated = diesel::update(videos::table.find(id))
                .set(&row)
                .execute(conn)
                .map_err(db_err)?;
            Ok(if updated == 0 { None } else { Some(row) })
        })
        .await
    }

    async fn delete_video(&self, id: Uuid) -> Result<bool, StoreError> {
        self.blocking(move |conn| {
            let deleted = diesel::delete(videos::table.find(id))
                .execute(conn)
                .map_err(db_err)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        self.blocking(move |conn| {
            admin_settings::table
                .find(key)
                .select(admin_settings::value)
                .first(conn)
                .optional()
                .map_err(db_err)
        })
        .await
    }

    async fn put_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let row = AdminSetting {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: Utc::now(),
        };
        self.blocking(move |conn| {
            diesel::insert_into(admin_settings::table)
                .values(&row)
                .on_conflict(admin_settings::key)
                .do_update()
                .set((
                    admin_settings::value.eq(excluded(admin_settings::value)),
                    admin_settings::updated_at.eq(excluded(admin_settings::updated_at)),
                ))
                .execute(conn)
                .map_err(db_err)?;
            Ok(())
        })
        .await
    }
}
