use serde_json::Value;

use super::fields::Fields;
use super::{ConversionError, Hosts, ListOutcome, REVIEW_DATE_FORMAT, parse_datetime};
use crate::model::{Review, UserRef, WorkPreview};

const REVIEW: &str = "review";
const WORK_PREVIEW: &str = "work_preview";

pub fn convert_review(json: &Value, hosts: &Hosts) -> Result<Review, ConversionError> {
    let fields = Fields::new(REVIEW, json);

    Ok(Review {
        id: fields.required_id("response_id")?,
        date: parse_datetime(&fields.str("response_date"), REVIEW_DATE_FORMAT),
        text: fields.str("response_text"),
        votes: fields.int("response_votes"),
        mark: fields.int("mark"),
        user: UserRef {
            id: fields.required_id("user_id")?,
            name: fields.str("user_name"),
            avatar: fields.url("user_avatar", &hosts.images),
        },
    })
}

/// Converts one page of work reviews (`items`), skipping malformed entries.
pub fn convert_work_reviews(json: &Value, hosts: &Hosts) -> ListOutcome<Review> {
    let items = Fields::new(REVIEW, json).array("items");
    convert_list(items, |item| convert_review(item, hosts))
}

pub fn convert_work_preview(json: &Value, hosts: &Hosts) -> Result<WorkPreview, ConversionError> {
    let fields = Fields::new(WORK_PREVIEW, json);
    let stat = fields.object("stat");

    let authors = fields
        .object("creators")
        .array("authors")
        .iter()
        .map(|author| {
            let author = Fields::new(WORK_PREVIEW, author);
            author
                .opt_str("name")
                .map(str::to_owned)
                .unwrap_or_else(|| author.str("name_orig"))
        })
        .collect();

    Ok(WorkPreview {
        id: fields.required_id("id")?,
        name: fields.str("name"),
        orig_name: fields.str("name_orig"),
        work_type: fields.str("name_type"),
        image: fields.url("image", &hosts.images),
        year: fields.int("year"),
        authors,
        rating: stat.float("rating"),
        votes: stat.int("voters"),
        reviews_count: stat.int("responses"),
    })
}

/// Converts a top-level array of work previews, skipping malformed entries.
pub fn convert_work_previews(json: &Value, hosts: &Hosts) -> ListOutcome<WorkPreview> {
    let items = json.as_array().map(Vec::as_slice).unwrap_or(&[]);
    convert_list(items, |item| convert_work_preview(item, hosts))
}

fn convert_list<T>(
    items: &[Value],
    convert: impl Fn(&Value) -> Result<T, ConversionError>,
) -> ListOutcome<T> {
    let mut outcome = ListOutcome::default();
    for (index, item) in items.iter().enumerate() {
        match convert(item) {
            Ok(converted) => outcome.items.push(converted),
            Err(err) => {
                tracing::warn!(index, %err, "skipping malformed list item");
                outcome.skipped.push(err);
            }
        }
    }
    outcome
}
