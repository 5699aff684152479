//! PowerPoint decks: every top-level text shape of every slide, in presentation order.
//!
//! A shape contributes its paragraphs joined by newlines followed by a newline. Shapes
//! inside groups, pictures, tables and charts do not contribute.

use super::ooxml::{self, Package};
use crate::error::ExtractError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

pub(crate) fn extract_text(path: &Path) -> Result<String, ExtractError> {
    let mut package = ooxml::open_package(path)?;
    let slides = slide_parts(&mut package)?;
    debug!(path = %path.display(), slides = slides.len(), "reading slides");

    let mut text = String::new();
    for part in slides {
        let xml = ooxml::read_part(&mut package, &part)?;
        text.push_str(&slide_text(&xml)?);
    }
    Ok(text)
}

/// Slide part names in the order the presentation lists them. Falls back to the
/// numeric order of `ppt/slides/slideN.xml` when the listing is unavailable.
fn slide_parts(package: &mut Package) -> Result<Vec<String>, ExtractError> {
    let presentation = ooxml::read_optional_part(package, PRESENTATION_PART)?;
    let rels = ooxml::read_optional_part(package, PRESENTATION_RELS)?;
    if let (Some(presentation), Some(rels)) = (presentation, rels) {
        let targets = relationship_targets(&rels)?;
        let ordered: Vec<String> = slide_ids(&presentation)?
            .iter()
            .filter_map(|id| targets.get(id))
            .map(|target| resolve_target(target))
            .collect();
        if !ordered.is_empty() {
            return Ok(ordered);
        }
    }

    let mut numbered: Vec<(u32, String)> = package
        .file_names()
        .filter_map(|name| {
            let n = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((n, name.to_string()))
        })
        .collect();
    numbered.sort();
    Ok(numbered.into_iter().map(|(_, name)| name).collect())
}

/// `r:id` values of `p:sldId` entries, in document order.
fn slide_ids(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"p:sldId" => {
                if let Some(id) = ooxml::attribute(&e, b"r:id")? {
                    ids.push(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ids)
}

fn relationship_targets(xml: &str) -> Result<HashMap<String, String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = ooxml::attribute(&e, b"Id")?;
                let target = ooxml::attribute(&e, b"Target")?;
                if let (Some(id), Some(target)) = (id, target) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

/// Relationship targets are relative to `ppt/` unless absolute within the package.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{target}"),
    }
}

fn slide_text(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut group_depth = 0usize;
    let mut in_shape = false;
    let mut in_text = false;
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"p:grpSp" => group_depth += 1,
                b"p:sp" if group_depth == 0 => {
                    in_shape = true;
                    paragraphs.clear();
                }
                b"a:p" if in_shape => current.clear(),
                b"a:t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"p:grpSp" => group_depth = group_depth.saturating_sub(1),
                b"p:sp" if in_shape => {
                    text.push_str(&paragraphs.join("\n"));
                    text.push('\n');
                    in_shape = false;
                }
                b"a:p" if in_shape => paragraphs.push(std::mem::take(&mut current)),
                b"a:t" => in_text = false,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"p:sp" if group_depth == 0 => text.push('\n'),
                b"a:p" if in_shape => paragraphs.push(String::new()),
                // Soft line breaks read as a vertical tab, keeping paragraph joins distinct.
                b"a:br" if in_shape => current.push('\u{b}'),
                _ => {}
            },
            Event::Text(e) => {
                if in_shape && in_text {
                    current.push_str(&ooxml::text_of(&e)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn slide(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
       xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:cSld><p:spTree>{body}</p:spTree></p:cSld>
</p:sld>"#
        )
    }

    fn shape(paragraphs: &str) -> String {
        format!("<p:sp><p:nvSpPr/><p:txBody><a:bodyPr/>{paragraphs}</p:txBody></p:sp>")
    }

    #[test]
    fn shapes_are_joined_by_paragraph_and_terminated() {
        let xml = slide(&format!(
            "{}{}<p:pic><p:blipFill/></p:pic><p:grpSp>{}</p:grpSp>",
            shape("<a:p><a:r><a:t>Title</a:t></a:r></a:p>"),
            shape(
                "<a:p><a:r><a:t>one</a:t></a:r><a:br/><a:r><a:t>two</a:t></a:r></a:p><a:p/>\
                 <a:p><a:r><a:t>R&amp;D</a:t></a:r></a:p>"
            ),
            shape("<a:p><a:r><a:t>grouped</a:t></a:r></a:p>"),
        ));
        assert_eq!(slide_text(&xml).unwrap(), "Title\none\u{b}two\n\nR&D\n");
    }

    fn write_deck(path: &Path, parts: &[(&str, String)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, body) in parts {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn slides_follow_presentation_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        let presentation = r#"<p:presentation xmlns:p="p" xmlns:r="r">
  <p:sldIdLst><p:sldId id="256" r:id="rId3"/><p:sldId id="257" r:id="rId2"/></p:sldIdLst>
</p:presentation>"#;
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId2" Type="slide" Target="slides/slide1.xml"/>
  <Relationship Id="rId3" Type="slide" Target="/ppt/slides/slide2.xml"/>
</Relationships>"#;
        write_deck(
            &path,
            &[
                (PRESENTATION_PART, presentation.to_string()),
                (PRESENTATION_RELS, rels.to_string()),
                (
                    "ppt/slides/slide1.xml",
                    slide(&shape("<a:p><a:r><a:t>first file</a:t></a:r></a:p>")),
                ),
                (
                    "ppt/slides/slide2.xml",
                    slide(&shape("<a:p><a:r><a:t>shown first</a:t></a:r></a:p>")),
                ),
            ],
        );

        assert_eq!(extract_text(&path).unwrap(), "shown first\nfirst file\n");
    }

    #[test]
    fn numbered_slides_are_used_without_a_listing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bare.pptx");
        write_deck(
            &path,
            &[
                (
                    "ppt/slides/slide10.xml",
                    slide(&shape("<a:p><a:r><a:t>ten</a:t></a:r></a:p>")),
                ),
                (
                    "ppt/slides/slide2.xml",
                    slide(&shape("<a:p><a:r><a:t>two</a:t></a:r></a:p>")),
                ),
                ("ppt/slides/_rels/slide2.xml.rels", "<Relationships/>".into()),
            ],
        );

        assert_eq!(extract_text(&path).unwrap(), "two\nten\n");
    }
}
