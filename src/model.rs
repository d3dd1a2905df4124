use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Work {
    pub id: u64,
    pub name: String,
    pub orig_name: String,
    pub year: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Url>,
    pub work_type: String,
    pub publish_statuses: Vec<String>,
    pub rating: f64,
    pub votes: i64,
    pub reviews_count: i64,
    pub description: String,
    pub description_author: String,
    pub notes: String,
    pub linguistic_analysis: Vec<String>,
    pub authors: Vec<AuthorRef>,
    pub children: Vec<ChildWork>,
    /// One inner list per cycle the work belongs to, outermost first.
    pub parents: Vec<Vec<ParentWork>>,
    pub classification: Vec<GenreGroup>,
    pub awards: Vec<Award>,
    pub edition_blocks: Vec<EditionBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorRef {
    pub id: u64,
    pub name: String,
    pub kind: String,
    pub is_opened: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParentWork {
    pub id: u64,
    pub name: String,
    pub work_type: String,
}

/// A flattened entry of a hierarchical bibliography listing.
///
/// `depth` is the nesting distance from the owning work or author. Section
/// headers inside an author bibliography have `id == 0`, only `name` set and
/// `depth == 1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildWork {
    pub id: u64,
    pub name: String,
    pub orig_name: String,
    pub name_bonus: String,
    pub rating: f64,
    pub votes: i64,
    pub work_type: String,
    pub work_type_key: String,
    pub publish_status: String,
    pub is_published: bool,
    pub year: i64,
    pub depth: u32,
    pub plus: bool,
}

impl ChildWork {
    pub fn section_header(title: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: title.into(),
            orig_name: String::new(),
            name_bonus: String::new(),
            rating: 0.0,
            votes: 0,
            work_type: String::new(),
            work_type_key: String::new(),
            publish_status: String::new(),
            is_published: true,
            year: 0,
            depth: 1,
            plus: false,
        }
    }

    pub fn is_section_header(&self) -> bool {
        self.id == 0 && self.depth == 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreGroup {
    pub title: String,
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Genre {
    pub id: u64,
    pub label: String,
    pub votes: i64,
    pub percent: f64,
    pub children: Vec<Genre>,
}

impl Genre {
    /// Number of genres in this subtree, including `self`.
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(Genre::subtree_size).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Award {
    pub id: u64,
    pub name: String,
    pub local_name: String,
    pub is_open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Url>,
    pub contests: Vec<Contest>,
}

impl Award {
    /// Name used for display and ordering: the localized name unless it is empty.
    pub fn display_name(&self) -> &str {
        if self.local_name.is_empty() {
            &self.name
        } else {
            &self.local_name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contest {
    pub id: u64,
    pub year: i64,
    pub name: String,
    pub work_id: u64,
    pub work_name: String,
    pub is_win: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditionBlock {
    pub kind: String,
    pub title: String,
    pub editions: Vec<EditionPreview>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditionPreview {
    pub id: u64,
    pub lang_code: String,
    pub year: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<Url>,
    pub correct_level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edition {
    pub id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Url>,
    pub correct_level: f64,
    pub year: i64,
    pub plan_date: String,
    pub edition_type: String,
    pub copies: i64,
    pub pages: i64,
    pub cover_type: String,
    pub publisher: String,
    pub format: String,
    pub isbn: String,
    pub lang: String,
    pub content: Vec<String>,
    pub description: String,
    pub notes: String,
    pub plan_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Author {
    pub id: u64,
    pub is_opened: bool,
    pub name: String,
    pub orig_name: String,
    pub pseudonyms: Vec<String>,
    pub country_name: String,
    pub country_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub death_date: Option<NaiveDate>,
    pub bio: String,
    pub notes: String,
    pub compiler: String,
    pub sites: Vec<AuthorSite>,
    pub awards: Vec<Award>,
    pub bibliography: Vec<ChildWork>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorSite {
    pub link: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDateTime>,
    pub text: String,
    pub votes: i64,
    pub mark: i64,
    pub user: UserRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRef {
    pub id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Url>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkPreview {
    pub id: u64,
    pub name: String,
    pub orig_name: String,
    pub work_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Url>,
    pub year: i64,
    pub authors: Vec<String>,
    pub rating: f64,
    pub votes: i64,
    pub reviews_count: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ReviewsSort {
    Date,
    #[default]
    Rating,
    Mark,
}

impl ReviewsSort {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Rating => "rating",
            Self::Mark => "mark",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Date => "Дата",
            Self::Rating => "Рейтинг",
            Self::Mark => "Оценка",
        }
    }
}

impl std::fmt::Display for ReviewsSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genre(id: u64, children: Vec<Genre>) -> Genre {
        Genre {
            id,
            label: String::new(),
            votes: 0,
            percent: 0.0,
            children,
        }
    }

    #[test]
    fn genre_subtree_size_counts_every_node() {
        let tree = genre(1, vec![genre(2, vec![genre(3, vec![])]), genre(4, vec![])]);
        assert_eq!(tree.subtree_size(), 4);
        assert_eq!(tree.children[1].subtree_size(), 1);
    }

    #[test]
    fn section_header_shape() {
        let header = ChildWork::section_header("Романы");
        assert!(header.is_section_header());
        assert_eq!(header.depth, 1);
    }

    #[test]
    fn reviews_sort_wire_and_display_names() {
        assert_eq!(ReviewsSort::default(), ReviewsSort::Rating);
        assert_eq!(ReviewsSort::Mark.to_string(), "mark");
        assert_eq!(ReviewsSort::Date.label(), "Дата");
        assert_eq!(serde_json::to_value(ReviewsSort::Date).unwrap(), "date");
    }
}
