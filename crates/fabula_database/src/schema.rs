//! Diesel table definitions.

diesel::table! {
    users (id) {
        id -> Int4,
        username -> Text,
        text_credits -> Int8,
        image_credits -> Int8,
        audio_credits -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    stories (id) {
        id -> Int4,
        user_id -> Int4,
        title -> Text,
        details -> Text,
        tags -> Jsonb,
        inspirations -> Text,
        writing_style -> Text,
        chapter_count -> Int4,
        cover_image_key -> Nullable<Text>,
        cover_image_prompt -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    chapters (id) {
        id -> Int4,
        story_id -> Int4,
        number -> Int4,
        title -> Text,
        summary -> Text,
        content -> Nullable<Text>,
        image_key -> Nullable<Text>,
        image_prompt -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    characters (id) {
        id -> Int4,
        story_id -> Int4,
        name -> Text,
        description -> Text,
        example_dialogue -> Text,
    }
}

diesel::table! {
    locations (id) {
        id -> Int4,
        story_id -> Int4,
        name -> Text,
        description -> Text,
    }
}

diesel::table! {
    story_arcs (id) {
        id -> Int4,
        story_id -> Int4,
        arc_index -> Int4,
        arc_text -> Text,
    }
}

diesel::table! {
    chapter_guides (id) {
        id -> Int4,
        story_id -> Int4,
        chapter_title -> Text,
        part_index -> Int4,
        part_text -> Text,
        characters -> Jsonb,
        locations -> Jsonb,
    }
}

diesel::table! {
    generation_jobs (task_id) {
        task_id -> Text,
        user_id -> Int4,
        story_id -> Int4,
        kind -> Text,
        status -> Text,
        predicted_cost -> Int8,
        actual_cost -> Nullable<Int8>,
        input_tokens -> Nullable<Int8>,
        output_tokens -> Nullable<Int8>,
        model -> Nullable<Text>,
        error -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    pricing_configs (id) {
        id -> Int4,
        standard_cost_per_credit -> Float8,
        standard_cost_per_1m_input -> Float8,
        standard_cost_per_1m_output -> Float8,
        premium_cost_per_credit -> Float8,
        premium_cost_per_1m_input -> Float8,
        premium_cost_per_1m_output -> Float8,
        price_per_image -> Float8,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    credit_modifiers (action) {
        action -> Text,
        modifier -> Float8,
    }
}

diesel::joinable!(stories -> users (user_id));
diesel::joinable!(chapters -> stories (story_id));
diesel::joinable!(characters -> stories (story_id));
diesel::joinable!(locations -> stories (story_id));
diesel::joinable!(story_arcs -> stories (story_id));
diesel::joinable!(chapter_guides -> stories (story_id));
diesel::joinable!(generation_jobs -> users (user_id));
diesel::joinable!(generation_jobs -> stories (story_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    stories,
    chapters,
    characters,
    locations,
    story_arcs,
    chapter_guides,
    generation_jobs,
    pricing_configs,
    credit_modifiers,
);
