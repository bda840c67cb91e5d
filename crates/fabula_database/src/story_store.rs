//! Postgres-backed story content store.

use crate::{
    ChapterRow, CharacterRow, DatabaseResult, GuidePartRow, LocationRow, NewChapterRow,
    NewCharacterRow, NewGuidePartRow, NewLocationRow, NewStoryArcRow, PgPool, StoryArcRow,
    StoryRow,
};
use diesel::prelude::*;
use fabula_core::{
    ChapterSnapshot, CharacterSheet, GuidePart, LocationSheet, StorySnapshot, SummaryEntry,
};
use fabula_error::{DatabaseError, DatabaseErrorKind, FabulaResult};
use fabula_interface::StoryStore;

/// Postgres implementation of [`StoryStore`].
///
/// Every write method runs in a transaction so a failure partway through a
/// replace leaves the previous content intact.
#[derive(Clone)]
pub struct PostgresStoryStore {
    pool: PgPool,
}

impl PostgresStoryStore {
    /// Create a store over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> DatabaseResult<crate::PooledPg> {
        self.pool
            .get()
            .map_err(|e| DatabaseError::new(DatabaseErrorKind::Connection(e.to_string())))
    }
}

fn names_from_json(value: serde_json::Value) -> DatabaseResult<Vec<String>> {
    serde_json::from_value(value)
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Serialization(e.to_string())))
}

fn chapter_snapshot(row: &ChapterRow) -> ChapterSnapshot {
    ChapterSnapshot::new(row.id, row.number, row.title.clone(), row.summary.clone())
}

impl StoryStore for PostgresStoryStore {
    fn load_story(&self, story_id: i32, user_id: i32) -> FabulaResult<Option<StorySnapshot>> {
        use crate::schema::{
            chapter_guides::dsl as cg, chapters::dsl as ch, characters::dsl as cr,
            locations::dsl as lo, stories::dsl as st, story_arcs::dsl as sa,
        };

        let mut conn = self.conn()?;
        let story: Option<StoryRow> = st::stories
            .find(story_id)
            .filter(st::user_id.eq(user_id))
            .first(&mut conn)
            .optional()
            .map_err(DatabaseError::from)?;
        let Some(story) = story else {
            return Ok(None);
        };

        let chapters: Vec<ChapterRow> = ch::chapters
            .filter(ch::story_id.eq(story_id))
            .order(ch::number.asc())
            .load(&mut conn)
            .map_err(DatabaseError::from)?;
        let characters: Vec<CharacterRow> = cr::characters
            .filter(cr::story_id.eq(story_id))
            .order(cr::id.asc())
            .load(&mut conn)
            .map_err(DatabaseError::from)?;
        let locations: Vec<LocationRow> = lo::locations
            .filter(lo::story_id.eq(story_id))
            .order(lo::id.asc())
            .load(&mut conn)
            .map_err(DatabaseError::from)?;
        let arcs: Vec<StoryArcRow> = sa::story_arcs
            .filter(sa::story_id.eq(story_id))
            .order(sa::arc_index.asc())
            .load(&mut conn)
            .map_err(DatabaseError::from)?;
        let guide: Vec<GuidePartRow> = cg::chapter_guides
            .filter(cg::story_id.eq(story_id))
            .order((cg::chapter_title.asc(), cg::part_index.asc()))
            .load(&mut conn)
            .map_err(DatabaseError::from)?;

        let tags: Vec<String> = names_from_json(story.tags)?;
        let guide = guide
            .into_iter()
            .map(|row| {
                Ok(GuidePart::new(
                    row.chapter_title,
                    row.part_index,
                    row.part_text,
                    names_from_json(row.characters)?,
                    names_from_json(row.locations)?,
                ))
            })
            .collect::<DatabaseResult<Vec<_>>>()?;

        Ok(Some(StorySnapshot::new(
            story.id,
            story.user_id,
            story.title,
            story.details,
            tags,
            story.inspirations,
            story.writing_style,
            story.chapter_count,
            chapters.iter().map(chapter_snapshot).collect(),
            characters
                .into_iter()
                .map(|c| CharacterSheet::new(c.name, c.description, c.example_dialogue))
                .collect(),
            locations
                .into_iter()
                .map(|l| LocationSheet::new(l.name, l.description))
                .collect(),
            arcs.into_iter().map(|a| a.arc_text).collect(),
            guide,
        )))
    }

    fn replace_meta(
        &self,
        story_id: i32,
        characters: &[CharacterSheet],
        locations: &[LocationSheet],
    ) -> FabulaResult<()> {
        use crate::schema::{characters::dsl as cr, locations::dsl as lo};

        let mut conn = self.conn()?;
        conn.transaction::<_, DatabaseError, _>(|conn| {
            diesel::delete(cr::characters.filter(cr::story_id.eq(story_id))).execute(conn)?;
            diesel::delete(lo::locations.filter(lo::story_id.eq(story_id))).execute(conn)?;

            let new_characters: Vec<NewCharacterRow> = characters
                .iter()
                .map(|c| NewCharacterRow {
                    story_id,
                    name: c.name().clone(),
                    description: c.description().clone(),
                    example_dialogue: c.example_dialogue().clone(),
                })
                .collect();
            diesel::insert_into(cr::characters)
                .values(&new_characters)
                .execute(conn)?;

            let new_locations: Vec<NewLocationRow> = locations
                .iter()
                .map(|l| NewLocationRow {
                    story_id,
                    name: l.name().clone(),
                    description: l.description().clone(),
                })
                .collect();
            diesel::insert_into(lo::locations)
                .values(&new_locations)
                .execute(conn)?;
            Ok(())
        })?;
        Ok(())
    }

    fn replace_arcs(&self, story_id: i32, arcs: &[String]) -> FabulaResult<()> {
        use crate::schema::story_arcs::dsl as sa;

        let mut conn = self.conn()?;
        conn.transaction::<_, DatabaseError, _>(|conn| {
            diesel::delete(sa::story_arcs.filter(sa::story_id.eq(story_id))).execute(conn)?;
            let rows: Vec<NewStoryArcRow> = arcs
                .iter()
                .enumerate()
                .map(|(i, text)| NewStoryArcRow {
                    story_id,
                    arc_index: i as i32,
                    arc_text: text.clone(),
                })
                .collect();
            diesel::insert_into(sa::story_arcs).values(&rows).execute(conn)?;
            Ok(())
        })?;
        Ok(())
    }

    fn replace_guide(&self, story_id: i32, parts: &[GuidePart]) -> FabulaResult<()> {
        use crate::schema::chapter_guides::dsl as cg;

        let mut conn = self.conn()?;
        let rows: Vec<NewGuidePartRow> = parts
            .iter()
            .map(|p| {
                Ok(NewGuidePartRow {
                    story_id,
                    chapter_title: p.chapter_title().clone(),
                    part_index: *p.part_index(),
                    part_text: p.part_text().clone(),
                    characters: serde_json::to_value(p.characters()).map_err(|e| {
                        DatabaseError::new(DatabaseErrorKind::Serialization(e.to_string()))
                    })?,
                    locations: serde_json::to_value(p.locations()).map_err(|e| {
                        DatabaseError::new(DatabaseErrorKind::Serialization(e.to_string()))
                    })?,
                })
            })
            .collect::<DatabaseResult<Vec<_>>>()?;
        conn.transaction::<_, DatabaseError, _>(|conn| {
            diesel::delete(cg::chapter_guides.filter(cg::story_id.eq(story_id))).execute(conn)?;
            diesel::insert_into(cg::chapter_guides)
                .values(&rows)
                .execute(conn)?;
            Ok(())
        })?;
        Ok(())
    }

    fn apply_summaries(
        &self,
        story_id: i32,
        entries: &[SummaryEntry],
    ) -> FabulaResult<Vec<ChapterSnapshot>> {
        use crate::schema::{chapters::dsl as ch, stories::dsl as st};

        let mut conn = self.conn()?;
        let applied = conn.transaction::<_, DatabaseError, _>(|conn| {
            let existing: Vec<ChapterRow> = ch::chapters
                .filter(ch::story_id.eq(story_id))
                .order(ch::number.asc())
                .load(conn)?;

            // Entries map onto chapters positionally; extras become new rows.
            for (i, entry) in entries.iter().enumerate() {
                if let Some(row) = existing.get(i) {
                    diesel::update(ch::chapters.find(row.id))
                        .set((
                            ch::title.eq(entry.title()),
                            ch::summary.eq(entry.summary()),
                        ))
                        .execute(conn)?;
                } else {
                    diesel::insert_into(ch::chapters)
                        .values(&NewChapterRow {
                            story_id,
                            number: (i + 1) as i32,
                            title: entry.title().clone(),
                            summary: entry.summary().clone(),
                        })
                        .execute(conn)?;
                }
            }

            if entries.len() > existing.len() {
                diesel::update(st::stories.find(story_id))
                    .set(st::chapter_count.eq(entries.len() as i32))
                    .execute(conn)?;
            }

            let refreshed: Vec<ChapterRow> = ch::chapters
                .filter(ch::story_id.eq(story_id))
                .order(ch::number.asc())
                .load(conn)?;
            Ok(refreshed.iter().map(chapter_snapshot).collect())
        })?;
        Ok(applied)
    }

    fn set_chapter_content(&self, chapter_id: i32, content: &str) -> FabulaResult<()> {
        use crate::schema::chapters::dsl as ch;

        let mut conn = self.conn()?;
        let updated = diesel::update(ch::chapters.find(chapter_id))
            .set(ch::content.eq(Some(content)))
            .execute(&mut conn)
            .map_err(DatabaseError::from)?;
        if updated == 0 {
            return Err(DatabaseError::new(DatabaseErrorKind::NotFound).into());
        }
        Ok(())
    }

    fn set_cover_image(&self, story_id: i32, key: &str, prompt: &str) -> FabulaResult<()> {
        use crate::schema::stories::dsl as st;

        let mut conn = self.conn()?;
        let updated = diesel::update(st::stories.find(story_id))
            .set((
                st::cover_image_key.eq(Some(key)),
                st::cover_image_prompt.eq(Some(prompt)),
            ))
            .execute(&mut conn)
            .map_err(DatabaseError::from)?;
        if updated == 0 {
            return Err(DatabaseError::new(DatabaseErrorKind::NotFound).into());
        }
        Ok(())
    }

    fn set_chapter_image(&self, chapter_id: i32, key: &str, prompt: &str) -> FabulaResult<()> {
        use crate::schema::chapters::dsl as ch;

        let mut conn = self.conn()?;
        let updated = diesel::update(ch::chapters.find(chapter_id))
            .set((
                ch::image_key.eq(Some(key)),
                ch::image_prompt.eq(Some(prompt)),
            ))
            .execute(&mut conn)
            .map_err(DatabaseError::from)?;
        if updated == 0 {
            return Err(DatabaseError::new(DatabaseErrorKind::NotFound).into());
        }
        Ok(())
    }
}
