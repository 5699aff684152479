//! Shared helpers for the zip + XML based Office formats.

use crate::error::ExtractError;
use quick_xml::events::{BytesStart, BytesText};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use zip::ZipArchive;

pub(crate) type Package = ZipArchive<BufReader<File>>;

pub(crate) fn open_package(path: &Path) -> Result<Package, ExtractError> {
    let file = File::open(path)?;
    Ok(ZipArchive::new(BufReader::new(file))?)
}

/// Read a required part into a string.
pub(crate) fn read_part(package: &mut Package, name: &str) -> Result<String, ExtractError> {
    match read_optional_part(package, name)? {
        Some(xml) => Ok(xml),
        None => Err(ExtractError::MissingPart(name.to_string())),
    }
}

pub(crate) fn read_optional_part(
    package: &mut Package,
    name: &str,
) -> Result<Option<String>, ExtractError> {
    let mut part = match package.by_name(name) {
        Ok(part) => part,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

/// Value of the attribute with the qualified name `key`, if present.
pub(crate) fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, ExtractError> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Unescaped text content of a text event.
pub(crate) fn text_of(e: &BytesText<'_>) -> Result<String, ExtractError> {
    Ok(e.unescape()?.into_owned())
}
