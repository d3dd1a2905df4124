use serde_json::Value;

use super::fields::{Fields, resolve_url};
use super::{ConversionError, Hosts};
use crate::model::{Edition, EditionBlock, EditionPreview};

const EDITION: &str = "edition";
const EDITION_PREVIEW: &str = "edition_preview";
const EDITION_BLOCK: &str = "edition_block";

pub fn convert_edition(json: &Value, hosts: &Hosts) -> Result<Edition, ConversionError> {
    let fields = Fields::new(EDITION, json);

    let publisher = fields
        .object("creators")
        .array("publishers")
        .iter()
        .map(|p| Fields::new(EDITION, p).str("name"))
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(Edition {
        id: fields.required_id("edition_id")?,
        name: fields.str("edition_name"),
        image: fields.url("image", &hosts.images),
        correct_level: fields.float("correct_level"),
        year: fields.int("year"),
        plan_date: fields.str("plan_date"),
        edition_type: fields.str("edition_type"),
        copies: fields.int("copies"),
        pages: fields.int("pages"),
        cover_type: fields.str("cover_type"),
        publisher,
        format: clean_format(&fields.str("format")),
        isbn: primary_isbn(fields.array("isbns")),
        lang: fields.str("lang"),
        content: fields.strings("content"),
        description: fields.str("description"),
        notes: fields.str("notes"),
        plan_description: fields.str("plan_description"),
    })
}

/// The service reports an unknown format as `"0"`.
fn clean_format(raw: &str) -> String {
    if raw == "0" {
        String::new()
    } else {
        raw.to_owned()
    }
}

/// First ISBN without the alternate forms appended after it, e.g.
/// `978-2-2-07-25804-0 [<small>2-207-25804-1</small>]`.
fn primary_isbn(isbns: &[Value]) -> String {
    let first = isbns.first().and_then(Value::as_str).unwrap_or_default();
    first
        .split(' ')
        .next()
        .unwrap_or(first)
        .to_owned()
}

/// Converts the `editions_blocks` mapping.
///
/// Blocks come out in ascending key order; each block's editions are sorted
/// by year, newest first, keeping source order for equal years.
pub fn convert_edition_blocks(
    mapping: &Value,
    hosts: &Hosts,
) -> Result<Vec<EditionBlock>, ConversionError> {
    let Some(mapping) = mapping.as_object() else {
        return Ok(Vec::new());
    };

    let mut keys: Vec<&String> = mapping.keys().collect();
    keys.sort();

    keys.into_iter()
        .map(|key| edition_block(&mapping[key.as_str()], hosts))
        .collect()
}

fn edition_block(json: &Value, hosts: &Hosts) -> Result<EditionBlock, ConversionError> {
    let fields = Fields::new(EDITION_BLOCK, json);

    let mut editions = fields
        .array("list")
        .iter()
        .map(|item| edition_preview(item, hosts))
        .collect::<Result<Vec<_>, _>>()?;
    editions.sort_by(|a, b| b.year.cmp(&a.year));

    Ok(EditionBlock {
        kind: fields.str("name"),
        title: fields.str("title"),
        editions,
    })
}

fn edition_preview(json: &Value, hosts: &Hosts) -> Result<EditionPreview, ConversionError> {
    let fields = Fields::new(EDITION_PREVIEW, json);
    let id = fields.required_id("edition_id")?;

    Ok(EditionPreview {
        id,
        lang_code: fields.str("lang_code"),
        year: fields.int("year"),
        cover: resolve_url(&format!("/images/editions/big/{id}"), &hosts.data),
        correct_level: fields.float("correct_level"),
    })
}
