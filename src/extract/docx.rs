//! Word documents: text of the top-level body paragraphs, one line each.
//!
//! Only paragraphs that are direct children of `w:body` count. Table cells, content
//! controls, text boxes, headers and footers are skipped.

use super::ooxml;
use crate::error::ExtractError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;

const DOCUMENT_PART: &str = "word/document.xml";

pub(crate) fn extract_text(path: &Path) -> Result<String, ExtractError> {
    let mut package = ooxml::open_package(path)?;
    let xml = ooxml::read_part(&mut package, DOCUMENT_PART)?;
    Ok(body_paragraphs(&xml)?.join("\n"))
}

fn body_paragraphs(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    // Element nesting depth; `body_depth` is the depth of the open `w:body`.
    let mut depth = 0usize;
    let mut body_depth: Option<usize> = None;
    // Only a `w:p` whose parent is `w:body` is collected. Paragraphs in tables,
    // content controls, custom XML or text boxes are not.
    let mut collecting = false;
    let mut nested = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                match e.name().as_ref() {
                    b"w:body" if body_depth.is_none() => body_depth = Some(depth),
                    b"w:p" if collecting => nested += 1,
                    b"w:p" if body_depth.is_some_and(|b| depth == b + 1) => {
                        collecting = true;
                        current.clear();
                    }
                    b"w:t" => in_text = true,
                    _ => {}
                }
            }
            Event::End(e) => {
                match e.name().as_ref() {
                    b"w:body" => body_depth = None,
                    b"w:p" if collecting && nested > 0 => nested -= 1,
                    b"w:p" if collecting => {
                        paragraphs.push(std::mem::take(&mut current));
                        collecting = false;
                    }
                    b"w:t" => in_text = false,
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Empty(e) => {
                let inside = collecting && nested == 0;
                match e.name().as_ref() {
                    b"w:p" if body_depth == Some(depth) => paragraphs.push(String::new()),
                    b"w:tab" if inside => current.push('\t'),
                    b"w:br" | b"w:cr" if inside => current.push('\n'),
                    _ => {}
                }
            }
            Event::Text(e) => {
                if in_text && collecting && nested == 0 {
                    current.push_str(&ooxml::text_of(&e)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(paragraphs)
}
