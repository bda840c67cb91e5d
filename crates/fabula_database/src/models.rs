//! Diesel row models.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

/// Database row for the users table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: i32,
    pub username: String,
    pub text_credits: i64,
    pub image_credits: i64,
    pub audio_credits: i64,
    pub created_at: DateTime<Utc>,
}

/// Database row for the stories table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::stories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StoryRow {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub details: String,
    pub tags: serde_json::Value,
    pub inspirations: String,
    pub writing_style: String,
    pub chapter_count: i32,
    pub cover_image_key: Option<String>,
    pub cover_image_prompt: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for the chapters table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::chapters)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChapterRow {
    pub id: i32,
    pub story_id: i32,
    pub number: i32,
    pub title: String,
    pub summary: String,
    pub content: Option<String>,
    pub image_key: Option<String>,
    pub image_prompt: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insertable chapter, used when summaries generate more chapters than exist.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::chapters)]
pub struct NewChapterRow {
    pub story_id: i32,
    pub number: i32,
    pub title: String,
    pub summary: String,
}

/// Database row for the characters table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::characters)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CharacterRow {
    pub id: i32,
    pub story_id: i32,
    pub name: String,
    pub description: String,
    pub example_dialogue: String,
}

/// Insertable character.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::characters)]
pub struct NewCharacterRow {
    pub story_id: i32,
    pub name: String,
    pub description: String,
    pub example_dialogue: String,
}

/// Database row for the locations table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::locations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LocationRow {
    pub id: i32,
    pub story_id: i32,
    pub name: String,
    pub description: String,
}

/// Insertable location.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::locations)]
pub struct NewLocationRow {
    pub story_id: i32,
    pub name: String,
    pub description: String,
}

/// Database row for the story_arcs table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::story_arcs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StoryArcRow {
    pub id: i32,
    pub story_id: i32,
    pub arc_index: i32,
    pub arc_text: String,
}

/// Insertable story arc.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::story_arcs)]
pub struct NewStoryArcRow {
    pub story_id: i32,
    pub arc_index: i32,
    pub arc_text: String,
}

/// Database row for the chapter_guides table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::chapter_guides)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GuidePartRow {
    pub id: i32,
    pub story_id: i32,
    pub chapter_title: String,
    pub part_index: i32,
    pub part_text: String,
    pub characters: serde_json::Value,
    pub locations: serde_json::Value,
}

/// Insertable guide part.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::chapter_guides)]
pub struct NewGuidePartRow {
    pub story_id: i32,
    pub chapter_title: String,
    pub part_index: i32,
    pub part_text: String,
    pub characters: serde_json::Value,
    pub locations: serde_json::Value,
}

/// Database row for the generation_jobs audit log.
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::generation_jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GenerationJobRow {
    pub task_id: String,
    pub user_id: i32,
    pub story_id: i32,
    pub kind: String,
    pub status: String,
    pub predicted_cost: i64,
    pub actual_cost: Option<i64>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub model: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable pending job row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::generation_jobs)]
pub struct NewGenerationJobRow {
    pub task_id: String,
    pub user_id: i32,
    pub story_id: i32,
    pub kind: String,
    pub status: String,
    pub predicted_cost: i64,
}

/// Database row for the pricing_configs table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::pricing_configs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PricingConfigRow {
    pub id: i32,
    pub standard_cost_per_credit: f64,
    pub standard_cost_per_1m_input: f64,
    pub standard_cost_per_1m_output: f64,
    pub premium_cost_per_credit: f64,
    pub premium_cost_per_1m_input: f64,
    pub premium_cost_per_1m_output: f64,
    pub price_per_image: f64,
    pub updated_at: DateTime<Utc>,
}

/// Database row for the credit_modifiers table.
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::credit_modifiers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreditModifierRow {
    pub action: String,
    pub modifier: f64,
}

/// Insertable credit modifier, used when seeding defaults.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::credit_modifiers)]
pub struct NewCreditModifierRow {
    pub action: String,
    pub modifier: f64,
}
