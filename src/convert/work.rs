use serde_json::Value;

use super::fields::Fields;
use super::{
    ConversionError, Hosts, convert_edition_blocks, convert_genre_tree, flatten_child_tree,
    group_awards,
};
use crate::model::{AuthorRef, Genre, GenreGroup, ParentWork, Work};

const WORK: &str = "work";
const WORK_AUTHOR: &str = "work_author";
const PARENT_WORK: &str = "parent_work";
const GENRE_GROUP: &str = "genre_group";

/// Depth offset of a work's own children: they are listed relative to the work.
const WORK_CHILDREN_DEPTH_OFFSET: u32 = 0;

/// Converts an extended work payload. Fails as a whole when any nested
/// entity is missing a required field.
pub fn convert_work(json: &Value, hosts: &Hosts) -> Result<Work, ConversionError> {
    let fields = Fields::new(WORK, json);
    let id = fields.required_id("work_id")?;
    let name = fields.required_str("work_name")?;
    let rating = fields.object("rating");

    let authors = fields
        .array("authors")
        .iter()
        .map(author_ref)
        .collect::<Result<Vec<_>, _>>()?;

    let parents = fields
        .object("parents")
        .array("cycles")
        .iter()
        .map(|cycle| {
            cycle
                .as_array()
                .map(Vec::as_slice)
                .unwrap_or(&[])
                .iter()
                .map(parent_work)
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    let classification = fields
        .object("classificatory")
        .array("genre_group")
        .iter()
        .map(genre_group)
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(
        work_id = id,
        groups = classification.len(),
        genres = classification
            .iter()
            .flat_map(|group| &group.genres)
            .map(Genre::subtree_size)
            .sum::<usize>(),
        "converted classification"
    );

    Ok(Work {
        id,
        name,
        orig_name: fields.str("work_name_orig"),
        year: fields.int("work_year"),
        image: fields.url("image", &hosts.images),
        work_type: fields.str("work_type"),
        publish_statuses: fields.strings("publish_statuses"),
        rating: rating.float("rating"),
        votes: rating.int("voters"),
        reviews_count: fields.int("val_responsecount"),
        description: fields.str("work_description"),
        description_author: fields.str("work_description_author"),
        notes: fields.str("work_notes"),
        linguistic_analysis: fields.strings("la_resume"),
        authors,
        children: flatten_child_tree(fields.get("children"), WORK_CHILDREN_DEPTH_OFFSET)?,
        parents,
        classification,
        awards: group_awards(&award_records(&fields), hosts)?,
        edition_blocks: convert_edition_blocks(fields.get("editions_blocks"), hosts)?,
    })
}

/// Wins followed by nominations, as flat records for [`group_awards`].
pub(super) fn award_records(fields: &Fields<'_>) -> Vec<Value> {
    let awards = fields.object("awards");
    awards
        .array("win")
        .iter()
        .chain(awards.array("nom"))
        .cloned()
        .collect()
}

fn author_ref(json: &Value) -> Result<AuthorRef, ConversionError> {
    let fields = Fields::new(WORK_AUTHOR, json);
    Ok(AuthorRef {
        id: fields.required_id("id")?,
        name: fields.str("name"),
        kind: fields.str("type"),
        is_opened: fields.bool("is_opened"),
    })
}

fn parent_work(json: &Value) -> Result<ParentWork, ConversionError> {
    let fields = Fields::new(PARENT_WORK, json);
    Ok(ParentWork {
        id: fields.required_id("work_id")?,
        name: fields.str("work_name"),
        work_type: fields.str("work_type"),
    })
}

fn genre_group(json: &Value) -> Result<GenreGroup, ConversionError> {
    let fields = Fields::new(GENRE_GROUP, json);
    Ok(GenreGroup {
        title: fields.str("label"),
        genres: fields
            .array("genre")
            .iter()
            .map(convert_genre_tree)
            .collect::<Result<Vec<_>, _>>()?,
    })
}
