use serde_json::Value;

use super::fields::Fields;
use super::work::award_records;
use super::{
    BIO_DATE_FORMAT, ConversionError, Hosts, build_author_bibliography, group_awards, parse_date,
};
use crate::model::{Author, AuthorSite};

const AUTHOR: &str = "author";

/// Converts an extended author payload.
///
/// The bibliography lists cycle blocks before work blocks.
pub fn convert_author(json: &Value, hosts: &Hosts) -> Result<Author, ConversionError> {
    let fields = Fields::new(AUTHOR, json);
    let id = fields.required_id("id")?;
    let name = fields.required_str("name")?;

    let pseudonyms = fields
        .array("name_pseudonyms")
        .iter()
        .map(|p| {
            let p = Fields::new(AUTHOR, p);
            p.opt_str("name")
                .map(str::to_owned)
                .unwrap_or_else(|| p.str("name_orig"))
        })
        .filter(|name| !name.is_empty())
        .collect();

    let sites = fields
        .array("sites")
        .iter()
        .map(|s| {
            let s = Fields::new(AUTHOR, s);
            AuthorSite {
                link: s.str("site"),
                title: s.str("descr"),
            }
        })
        .collect();

    let mut bibliography = build_author_bibliography(fields.get("cycles_blocks"))?;
    bibliography.extend(build_author_bibliography(fields.get("works_blocks"))?);

    Ok(Author {
        id,
        is_opened: fields.bool("is_opened"),
        name,
        orig_name: fields.str("name_orig"),
        pseudonyms,
        country_name: fields.str("country_name"),
        country_code: fields.str("country_id"),
        image: fields.url("image", &hosts.images),
        birth_date: parse_date(&fields.str("birthday"), BIO_DATE_FORMAT),
        death_date: parse_date(&fields.str("deathday"), BIO_DATE_FORMAT),
        bio: fields.str("biography"),
        notes: fields.str("biography_notes"),
        compiler: fields.str("compiler"),
        sites,
        awards: group_awards(&award_records(&fields), hosts)?,
        bibliography,
    })
}
