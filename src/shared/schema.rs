diesel::table! {
    site_visits (id) {
        id -> Uuid,
        name -> Text,
        mobile -> Text,
        email -> Nullable<Text>,
        preferred_date -> Nullable<Text>,
        plot_size -> Nullable<Text>,
        budget -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    leads (id) {
        id -> Uuid,
        first_name -> Text,
        last_name -> Text,
        email -> Text,
        phone -> Text,
        source -> Nullable<Text>,
        status -> Text,
        notes -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    appointments (id) {
        id -> Uuid,
        lead_id -> Uuid,
        title -> Text,
        description -> Nullable<Text>,
        appointment_date -> Timestamptz,
        duration_minutes -> Int4,
        location -> Text,
        status -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    testimonials (id) {
        id -> Uuid,
        name -> Text,
        location -> Text,
        investment -> Text,
        plot_size -> Text,
        returns -> Text,
        duration -> Text,
        review -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    activities (id) {
        id -> Uuid,
        title -> Text,
        description -> Text,
        activity_type -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    brochures (id) {
        id -> Uuid,
        title -> Text,
        description -> Nullable<Text>,
        file_url -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    brochure_downloads (id) {
        id -> Uuid,
        brochure_id -> Uuid,
        user_name -> Text,
        user_email -> Text,
        user_phone -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    videos (id) {
        id -> Uuid,
        title -> Text,
        description -> Nullable<Text>,
        video_url -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    admin_settings (key) {
        key -> Text,
        value -> Text,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(appointments -> leads (lead_id));
diesel::joinable!(brochure_downloads -> brochures (brochure_id));

diesel::allow_tables_to_appear_in_same_query!(
    site_visits,
    leads,
    appointments,
    testimonials,
    activities,
    brochures,
    brochure_downloads,
    videos,
    admin_settings,
);
