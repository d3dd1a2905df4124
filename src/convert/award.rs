use std::collections::HashMap;

use serde_json::Value;

use super::fields::Fields;
use super::{ConversionError, Hosts, compare_names};
use crate::model::{Award, Contest};

const AWARD: &str = "award";

/// Groups flat win/nomination records into awards.
///
/// One [`Award`] per distinct `award_id`, built from the first record of its
/// group. Contests are ordered by year ascending and awards by display name
/// (localized name, falling back to the canonical one), case-insensitively.
/// Both sorts are stable.
pub fn group_awards(records: &[Value], hosts: &Hosts) -> Result<Vec<Award>, ConversionError> {
    let mut groups: Vec<Vec<Fields<'_>>> = Vec::new();
    let mut index: HashMap<u64, usize> = HashMap::new();

    for record in records {
        let fields = Fields::new(AWARD, record);
        let award_id = fields.required_id("award_id")?;
        let slot = *index.entry(award_id).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(fields);
    }

    let mut awards = groups
        .iter()
        .map(|group| award_from_group(group, hosts))
        .collect::<Result<Vec<_>, _>>()?;

    awards.sort_by(|a, b| compare_names(a.display_name(), b.display_name()));
    Ok(awards)
}

fn award_from_group(group: &[Fields<'_>], hosts: &Hosts) -> Result<Award, ConversionError> {
    let first = group
        .first()
        .ok_or_else(|| ConversionError::missing(AWARD, "award_id"))?;

    let mut contests: Vec<Contest> = group.iter().map(contest).collect();
    contests.sort_by_key(|c| c.year);

    Ok(Award {
        id: first.required_id("award_id")?,
        name: first.str("award_name"),
        local_name: first.str("award_rusname"),
        is_open: first.bool("award_is_opened"),
        icon: first.url("award_icon", &hosts.images),
        contests,
    })
}

fn contest(fields: &Fields<'_>) -> Contest {
    Contest {
        id: u64::try_from(fields.int("contest_id")).unwrap_or(0),
        year: fields.int("contest_year"),
        name: fields
            .opt_str("nomination_rusname")
            .map(str::to_owned)
            .unwrap_or_else(|| fields.str("nomination_name")),
        work_id: u64::try_from(fields.int("work_id")).unwrap_or(0),
        work_name: fields
            .opt_str("work_rusname")
            .map(str::to_owned)
            .unwrap_or_else(|| fields.str("work_name")),
        is_win: fields.bool("cw_is_winner"),
    }
}
