//! Story snapshots rendered into prompts at dispatch time.
//!
//! A snapshot is a read-only view of a story assembled in one query pass.
//! Prompt builders consume snapshots instead of live rows so a concurrent
//! edit cannot change the text mid-render.

use serde::{Deserialize, Serialize};

/// A character as the prompt builders see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct CharacterSheet {
    /// Character name
    name: String,
    /// Free-form description
    description: String,
    /// Sample dialogue capturing the character's voice
    example_dialogue: String,
}

impl CharacterSheet {
    /// Create a character sheet.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        example_dialogue: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            example_dialogue: example_dialogue.into(),
        }
    }
}

/// A location as the prompt builders see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct LocationSheet {
    /// Location name
    name: String,
    /// Free-form description
    description: String,
}

impl LocationSheet {
    /// Create a location sheet.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// One part of the detailed chapter guide.
///
/// A chapter's guide is a sequence of parts; `part_index` orders them
/// within the chapter named by `chapter_title`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct GuidePart {
    /// Title of the chapter this part belongs to
    chapter_title: String,
    /// Position within the chapter, 0-based
    part_index: i32,
    /// The guide text itself
    part_text: String,
    /// Character names featured in this part
    characters: Vec<String>,
    /// Location names featured in this part
    locations: Vec<String>,
}

impl GuidePart {
    /// Create a guide part.
    pub fn new(
        chapter_title: impl Into<String>,
        part_index: i32,
        part_text: impl Into<String>,
        characters: Vec<String>,
        locations: Vec<String>,
    ) -> Self {
        Self {
            chapter_title: chapter_title.into(),
            part_index,
            part_text: part_text.into(),
            characters,
            locations,
        }
    }
}

/// A chapter's title and summary as stored, without the prose body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ChapterSnapshot {
    /// Chapter row id
    id: i32,
    /// Chapter number, 1-based
    number: i32,
    /// Chapter title
    title: String,
    /// Chapter summary, empty until summaries are generated
    summary: String,
}

impl ChapterSnapshot {
    /// Create a chapter snapshot.
    pub fn new(id: i32, number: i32, title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            id,
            number,
            title: title.into(),
            summary: summary.into(),
        }
    }
}

/// A generated title/summary pair, produced by summary parsing and applied
/// to chapters positionally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct SummaryEntry {
    /// Generated chapter title
    title: String,
    /// Generated chapter summary
    summary: String,
}

impl SummaryEntry {
    /// Create a summary entry.
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
        }
    }
}

/// Everything the prompt builders need to know about a story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct StorySnapshot {
    /// Story row id
    id: i32,
    /// Owning user
    user_id: i32,
    /// Story title
    title: String,
    /// Premise and plot details supplied by the author
    details: String,
    /// Genre and theme tags
    tags: Vec<String>,
    /// Works the author cited as inspiration
    inspirations: String,
    /// Requested writing style
    writing_style: String,
    /// Number of chapters the story is planned to have
    chapter_count: i32,
    /// Chapters in reading order
    chapters: Vec<ChapterSnapshot>,
    /// Generated characters, empty before metadata generation
    characters: Vec<CharacterSheet>,
    /// Generated locations, empty before metadata generation
    locations: Vec<LocationSheet>,
    /// Generated story arcs, one string per arc
    arcs: Vec<String>,
    /// Generated guide parts across all chapters
    guide: Vec<GuidePart>,
}

impl StorySnapshot {
    /// Assemble a snapshot from its parts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: i32,
        user_id: i32,
        title: impl Into<String>,
        details: impl Into<String>,
        tags: Vec<String>,
        inspirations: impl Into<String>,
        writing_style: impl Into<String>,
        chapter_count: i32,
        chapters: Vec<ChapterSnapshot>,
        characters: Vec<CharacterSheet>,
        locations: Vec<LocationSheet>,
        arcs: Vec<String>,
        guide: Vec<GuidePart>,
    ) -> Self {
        Self {
            id,
            user_id,
            title: title.into(),
            details: details.into(),
            tags,
            inspirations: inspirations.into(),
            writing_style: writing_style.into(),
            chapter_count,
            chapters,
            characters,
            locations,
            arcs,
            guide,
        }
    }

    /// Find a chapter by its 1-based number.
    pub fn chapter_by_number(&self, number: i32) -> Option<&ChapterSnapshot> {
        self.chapters.iter().find(|c| *c.number() == number)
    }

    /// Guide parts for the chapter with the given title, in part order.
    pub fn guide_for_chapter(&self, chapter_title: &str) -> Vec<&GuidePart> {
        let mut parts: Vec<&GuidePart> = self
            .guide
            .iter()
            .filter(|p| p.chapter_title() == chapter_title)
            .collect();
        parts.sort_by_key(|p| *p.part_index());
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StorySnapshot {
        StorySnapshot::new(
            1,
            7,
            "The Glass Harbor",
            "A smuggler inherits a lighthouse.",
            vec!["fantasy".into(), "mystery".into()],
            "",
            "atmospheric",
            3,
            vec![
                ChapterSnapshot::new(10, 1, "Arrival", "She lands at the harbor."),
                ChapterSnapshot::new(11, 2, "The Keeper", ""),
            ],
            vec![],
            vec![],
            vec!["Act one: arrival".into()],
            vec![
                GuidePart::new("Arrival", 1, "second part", vec![], vec![]),
                GuidePart::new("Arrival", 0, "first part", vec![], vec![]),
            ],
        )
    }

    #[test]
    fn test_chapter_lookup_by_number() {
        let story = sample();
        assert_eq!(story.chapter_by_number(2).map(|c| *c.id()), Some(11));
        assert!(story.chapter_by_number(9).is_none());
    }

    #[test]
    fn test_guide_parts_sorted_by_index() {
        let story = sample();
        let parts = story.guide_for_chapter("Arrival");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].part_text(), "first part");
        assert_eq!(parts[1].part_text(), "second part");
    }
}
