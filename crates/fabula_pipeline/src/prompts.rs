//! Prompt builders.
//!
//! Prompts are rendered from a [`StorySnapshot`] at dispatch time and
//! travel on the job spec, so the text the model sees is fixed at the
//! moment the user confirmed the predicted cost. Builders are pure
//! functions of the snapshot; the same snapshot always yields the same
//! prompt and therefore the same token count.

use fabula_core::{ChapterSnapshot, StorySnapshot};
use fabula_error::{DispatchError, DispatchErrorKind, FabulaResult};
use std::collections::BTreeSet;

fn tag_line(story: &StorySnapshot) -> String {
    story.tags().join(", ")
}

fn inspirations_block(story: &StorySnapshot) -> String {
    if story.inspirations().is_empty() {
        String::new()
    } else {
        format!("<inspirations>{}</inspirations>\n", story.inspirations())
    }
}

/// Prompt for generating characters and locations.
pub fn metadata_prompt(story: &StorySnapshot) -> String {
    format!(
        "You are a creative, experienced novelist tasked with establishing the \
         foundational world of a new novel. Please avoid cliched or generic phrases \
         and focus on rich, bursty narrative details.\n\n\
         <story>\n\
         \x20 <title>{title}</title>\n\
         \x20 <details>{details}</details>\n\
         \x20 <tags>{tags}</tags>\n\
         \x20 {inspirations}\
         \x20 <structure totalChapters='{chapters}' />\n\
         </story>\n\n\
         Your task: Generate a JSON object with two keys: 'locations' and 'characters'. \
         Each key must map to an array of objects. Each object in 'locations' must \
         include 'name' and 'description'. Each object in 'characters' must include \
         'name', 'description', and an 'example_dialogue' field. Ensure your response \
         is creative, contextually rich, and strictly in JSON format with no markdown \
         formatting.",
        title = story.title(),
        details = story.details(),
        tags = tag_line(story),
        inspirations = inspirations_block(story),
        chapters = story.chapter_count(),
    )
}

/// Prompt for generating overall story arcs.
pub fn arcs_prompt(story: &StorySnapshot) -> String {
    let characters = story
        .characters()
        .iter()
        .map(|c| c.name().as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let locations = story
        .locations()
        .iter()
        .map(|l| l.name().as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "As an imaginative novelist, you are to conceive a series of cohesive story \
         arcs for the following tale. Aim for a natural, human tone that avoids overly \
         mechanical phrasing.\n\n\
         <novel>\n\
         \x20 <title>{title}</title>\n\
         \x20 <details>{details}</details>\n\
         \x20 <tags>{tags}</tags>\n\
         \x20 <metadata characters='{characters}' locations='{locations}' />\n\
         \x20 <structure chapters='{chapters}' />\n\
         </novel>\n\n\
         Instructions: Generate an unstructured list (JSON array of strings) of \
         overarching story arcs. Do not assign arcs to specific chapters in this step. \
         Output must be valid JSON with no markdown formatting.",
        title = story.title(),
        details = story.details(),
        tags = tag_line(story),
        characters = characters,
        locations = locations,
        chapters = story.chapter_count(),
    )
}

/// Prompt for generating a title and summary per chapter.
pub fn summaries_prompt(story: &StorySnapshot) -> String {
    let characters = story
        .characters()
        .iter()
        .map(|c| format!("    <character name='{}'>{}</character>", c.name(), c.description()))
        .collect::<Vec<_>>()
        .join("\n");
    let locations = story
        .locations()
        .iter()
        .map(|l| format!("    <location name='{}'>{}</location>", l.name(), l.description()))
        .collect::<Vec<_>>()
        .join("\n");
    let arcs = story
        .arcs()
        .iter()
        .map(|a| format!("    <arc>{a}</arc>"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are a master storyteller tasked with outlining the structure for a novel. \
         Avoid common AI cliches; be vibrant and human-like.\n\n\
         <storyContext>\n\
         \x20 <title>{title}</title>\n\
         \x20 <details>{details}</details>\n\
         \x20 <tags>{tags}</tags>\n\
         \x20 <metadata>\n\
         \x20   <characters>\n{characters}\n    </characters>\n\
         \x20   <locations>\n{locations}\n    </locations>\n\
         \x20 </metadata>\n\
         \x20 <arcs>\n{arcs}\n  </arcs>\n\
         \x20 {inspirations}\
         \x20 <chapters total='{chapters}' />\n\
         </storyContext>\n\n\
         Task: Generate an array of JSON objects, each with a 'title' and 'summary' \
         for every chapter. Each chapter summary should be concise yet evocative, \
         hinting at key emotional beats and events, without revealing every detail. \
         Respond solely with valid JSON (no markdown formatting).",
        title = story.title(),
        details = story.details(),
        tags = tag_line(story),
        characters = characters,
        locations = locations,
        arcs = arcs,
        inspirations = inspirations_block(story),
        chapters = story.chapter_count(),
    )
}

/// Prompt for decomposing the story into per-chapter guide parts.
pub fn guide_prompt(story: &StorySnapshot) -> String {
    let chapters = story
        .chapters()
        .iter()
        .map(|c| format!("    <chapter>{}</chapter>", c.title()))
        .collect::<Vec<_>>()
        .join("\n");
    let summaries = story
        .chapters()
        .iter()
        .map(|c| {
            let text = if c.summary().is_empty() { c.title() } else { c.summary() };
            format!("    <summary>{text}</summary>")
        })
        .collect::<Vec<_>>()
        .join("\n");
    let characters = story
        .characters()
        .iter()
        .map(|c| c.name().as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let locations = story
        .locations()
        .iter()
        .map(|l| l.name().as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You are a seasoned narrative architect. Using the XML framework below, \
         decompose the story into detailed arc segments for each chapter. Ensure your \
         language is dynamic, varied, and avoids the repetitive phrasing often seen in \
         generic AI outputs.\n\n\
         <novel>\n\
         \x20 <title>{title}</title>\n\
         \x20 <details>{details}</details>\n\
         \x20 <tags>{tags}</tags>\n\
         \x20 <metadata characters='{characters}' locations='{locations}' />\n\
         \x20 <overallArcs>{arcs}</overallArcs>\n\
         \x20 <chapters>\n{chapters}\n  </chapters>\n\
         \x20 <chapterSummaries>\n{summaries}\n  </chapterSummaries>\n\
         </novel>\n\n\
         For each chapter, break down the narrative into a series of arc objects. Each \
         object should include:\n\
         \x20 - 'arc': a sequence number\n\
         \x20 - 'arc_text': a descriptive narrative segment\n\
         \x20 - 'characters': a list of referenced character names\n\
         \x20 - 'locations': a list of referenced location names\n\n\
         Output your answer as a JSON object where each key is a chapter title and its \
         value is an array of arc objects. The response must be valid JSON with no \
         markdown formatting.",
        title = story.title(),
        details = story.details(),
        tags = tag_line(story),
        characters = characters,
        locations = locations,
        arcs = story.arcs().join(", "),
        chapters = chapters,
        summaries = summaries,
    )
}

/// Prompt for generating the prose of one chapter.
///
/// Pulls in the chapter's guide parts, the neighboring chapter summaries
/// for continuity, and metadata for only the characters and locations the
/// guide references (all of them when the guide references none).
pub fn chapter_prompt(story: &StorySnapshot, chapter_number: i32) -> FabulaResult<String> {
    let chapter = story
        .chapter_by_number(chapter_number)
        .ok_or_else(|| DispatchError::new(DispatchErrorKind::ChapterNotFound))?;
    let prev_summary = story
        .chapter_by_number(chapter_number - 1)
        .map(ChapterSnapshot::summary)
        .cloned()
        .unwrap_or_default();
    let next_summary = story
        .chapter_by_number(chapter_number + 1)
        .map(ChapterSnapshot::summary)
        .cloned()
        .unwrap_or_default();

    let parts = story.guide_for_chapter(chapter.title());
    let mut referenced_characters: BTreeSet<&str> = BTreeSet::new();
    let mut referenced_locations: BTreeSet<&str> = BTreeSet::new();
    let mut arc_lines = Vec::new();
    for (idx, part) in parts.iter().enumerate() {
        let mut line = format!("{}. {}", idx + 1, part.part_text());
        if !part.characters().is_empty() {
            line.push_str(&format!(" (Characters: {})", part.characters().join(", ")));
        }
        if !part.locations().is_empty() {
            line.push_str(&format!(" (Locations: {})", part.locations().join(", ")));
        }
        arc_lines.push(line);
        referenced_characters.extend(part.characters().iter().map(String::as_str));
        referenced_locations.extend(part.locations().iter().map(String::as_str));
    }
    let arcs_block = if arc_lines.is_empty() {
        String::new()
    } else {
        format!("Detailed Arc Breakdown:\n{}\n", arc_lines.join("\n"))
    };

    let character_block = story
        .characters()
        .iter()
        .filter(|c| {
            referenced_characters.is_empty() || referenced_characters.contains(c.name().as_str())
        })
        .map(|c| {
            format!(
                "- {}: {} (Dialogue: {})",
                c.name(),
                c.description(),
                c.example_dialogue()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let location_block = story
        .locations()
        .iter()
        .filter(|l| {
            referenced_locations.is_empty() || referenced_locations.contains(l.name().as_str())
        })
        .map(|l| format!("- {}: {}", l.name(), l.description()))
        .collect::<Vec<_>>()
        .join("\n");

    let writing_style = if story.writing_style().is_empty() {
        String::new()
    } else {
        format!("<writingStyle>{}</writingStyle>\n", story.writing_style())
    };

    Ok(format!(
        "You are a highly skilled storyteller with a talent for crafting immersive and \
         emotionally charged chapters. Your language should be vivid, dynamic, and \
         avoid formulaic phrasing. Below is the XML-structured context for this \
         chapter.\n\n\
         <chapterContext>\n\
         \x20 <bookTitle>{book_title}</bookTitle>\n\
         \x20 <chapterTitle>{chapter_title}</chapterTitle>\n\
         \x20 <chapterSummary>{chapter_summary}</chapterSummary>\n\
         \x20 <previousSummary>{prev_summary}</previousSummary>\n\
         \x20 <nextSummary>{next_summary}</nextSummary>\n\
         \x20 <details>{details}</details>\n\
         \x20 <tags>{tags}</tags>\n\
         \x20 {inspirations}\
         \x20 {writing_style}\
         \x20 <metadata>\n\
         \x20   <characters>\n{characters}\n    </characters>\n\
         \x20   <locations>\n{locations}\n    </locations>\n\
         \x20 </metadata>\n\
         </chapterContext>\n\n\
         {arcs_block}\n\
         Instructions: Using the above context and detailed arc breakdown, craft a \
         complete, cohesive chapter in Markdown format. Ensure the narrative has a \
         clear beginning, middle, and end, and flows naturally from the previous \
         chapter while setting up the next. Do not include the chapter title as a \
         header in the final output.",
        book_title = story.title(),
        chapter_title = chapter.title(),
        chapter_summary = chapter.summary(),
        prev_summary = prev_summary,
        next_summary = next_summary,
        details = story.details(),
        tags = tag_line(story),
        inspirations = inspirations_block(story),
        writing_style = writing_style,
        characters = character_block,
        locations = location_block,
        arcs_block = arcs_block,
    ))
}

/// Storage key for a story's cover image.
pub fn cover_image_key(story_id: i32) -> String {
    format!("stories/{story_id}/cover.jpg")
}

/// Storage key for a chapter's image.
pub fn chapter_image_key(story_id: i32, chapter_id: i32) -> String {
    format!("stories/{story_id}/chapters/{chapter_id}.jpg")
}
