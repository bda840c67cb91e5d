//! Parsers for structured model output.
//!
//! Every text kind except chapter prose asks the model for bare JSON. A
//! parse failure or a degenerate (empty) result fails the job: nothing is
//! persisted, no credits move, and the job row records the error.

use fabula_core::{CharacterSheet, GenerationKind, GuidePart, LocationSheet, SummaryEntry};
use fabula_error::{FabulaResult, WorkerError, WorkerErrorKind};
use serde::Deserialize;
use std::collections::BTreeMap;

fn parse_error(kind: GenerationKind, err: &serde_json::Error) -> WorkerError {
    WorkerError::new(WorkerErrorKind::OutputParse {
        kind: kind.to_string(),
        message: err.to_string(),
    })
}

fn degenerate(kind: GenerationKind, message: &str) -> WorkerError {
    WorkerError::new(WorkerErrorKind::DegenerateOutput {
        kind: kind.to_string(),
        message: message.to_string(),
    })
}

#[derive(Deserialize)]
struct RawMetadata {
    #[serde(default)]
    characters: Vec<RawCharacter>,
    #[serde(default)]
    locations: Vec<RawLocation>,
}

#[derive(Deserialize)]
struct RawCharacter {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    example_dialogue: String,
}

#[derive(Deserialize)]
struct RawLocation {
    name: String,
    #[serde(default)]
    description: String,
}

/// Parse metadata output into character and location sheets.
///
/// An output with no characters and no locations counts as degenerate
/// even when it parses cleanly.
pub fn parse_metadata(text: &str) -> FabulaResult<(Vec<CharacterSheet>, Vec<LocationSheet>)> {
    let raw: RawMetadata =
        serde_json::from_str(text).map_err(|e| parse_error(GenerationKind::Metadata, &e))?;
    if raw.characters.is_empty() && raw.locations.is_empty() {
        return Err(degenerate(GenerationKind::Metadata, "no characters or locations").into());
    }
    Ok((
        raw.characters
            .into_iter()
            .map(|c| CharacterSheet::new(c.name, c.description, c.example_dialogue))
            .collect(),
        raw.locations
            .into_iter()
            .map(|l| LocationSheet::new(l.name, l.description))
            .collect(),
    ))
}

/// Parse story arcs output, a JSON array of strings.
pub fn parse_arcs(text: &str) -> FabulaResult<Vec<String>> {
    let arcs: Vec<String> =
        serde_json::from_str(text).map_err(|e| parse_error(GenerationKind::StoryArcs, &e))?;
    if arcs.is_empty() {
        return Err(degenerate(GenerationKind::StoryArcs, "no arcs").into());
    }
    Ok(arcs)
}

#[derive(Deserialize)]
struct RawSummary {
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
}

/// Parse chapter summaries output, a JSON array of title/summary objects.
pub fn parse_summaries(text: &str) -> FabulaResult<Vec<SummaryEntry>> {
    if text.trim().is_empty() {
        return Err(degenerate(GenerationKind::ChapterSummaries, "empty response").into());
    }
    let raw: Vec<RawSummary> = serde_json::from_str(text)
        .map_err(|e| parse_error(GenerationKind::ChapterSummaries, &e))?;
    if raw.is_empty() {
        return Err(degenerate(GenerationKind::ChapterSummaries, "no summaries").into());
    }
    Ok(raw
        .into_iter()
        .map(|s| SummaryEntry::new(s.title, s.summary))
        .collect())
}

#[derive(Deserialize)]
struct RawGuidePart {
    arc: Option<i32>,
    arc_text: Option<String>,
    #[serde(default)]
    characters: Vec<String>,
    #[serde(default)]
    locations: Vec<String>,
}

/// Parse chapter guide output, a JSON object mapping chapter titles to
/// arrays of arc-part objects.
///
/// Parts missing their sequence number or text are skipped rather than
/// failing the whole job; the result is degenerate only when nothing
/// usable remains.
pub fn parse_guide(text: &str) -> FabulaResult<Vec<GuidePart>> {
    let raw: BTreeMap<String, Vec<RawGuidePart>> =
        serde_json::from_str(text).map_err(|e| parse_error(GenerationKind::ChapterGuide, &e))?;
    let mut parts = Vec::new();
    for (chapter_title, arcs) in raw {
        for arc in arcs {
            let (Some(index), Some(part_text)) = (arc.arc, arc.arc_text) else {
                continue;
            };
            parts.push(GuidePart::new(
                chapter_title.clone(),
                index,
                part_text,
                arc.characters,
                arc.locations,
            ));
        }
    }
    if parts.is_empty() {
        return Err(degenerate(GenerationKind::ChapterGuide, "no usable guide parts").into());
    }
    Ok(parts)
}
