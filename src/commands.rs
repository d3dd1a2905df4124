use std::io::{Read as _, Write as _};

use anyhow::Context as _;
use serde::Serialize;
use serde_json::Value;

use crate::api::CatalogClient;
use crate::cli::{ConvertArgs, PayloadKind, ReviewsArgs};
use crate::config::{ClientConfig, Hosts};
use crate::convert::{self, ListOutcome};
use crate::model::{Review, ReviewsSort};
use crate::paginator::PageState;

#[derive(Debug, Serialize)]
struct ListReport<'a, T> {
    items: &'a [T],
    skipped: Vec<String>,
}

impl<'a, T> From<&'a ListOutcome<T>> for ListReport<'a, T> {
    fn from(outcome: &'a ListOutcome<T>) -> Self {
        Self {
            items: &outcome.items,
            skipped: outcome.skipped.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReviewsReport<'a> {
    work_id: u64,
    sort: ReviewsSort,
    pages: u32,
    complete: bool,
    reviews: &'a [Review],
}

pub fn client_config(api_base_url: Option<&str>) -> anyhow::Result<ClientConfig> {
    let config = ClientConfig::from_env().context("load config from env")?;
    match api_base_url {
        Some(raw) => config
            .with_api_base_url(raw)
            .with_context(|| format!("invalid --api-base-url {raw:?}")),
        None => Ok(config),
    }
}

pub fn convert(args: ConvertArgs, hosts: &Hosts) -> anyhow::Result<()> {
    let json = read_json(&args.input)?;
    tracing::info!(kind = ?args.kind, input = %args.input, "converting payload");

    match args.kind {
        PayloadKind::Work => emit(&convert::convert_work(&json, hosts)?),
        PayloadKind::Author => emit(&convert::convert_author(&json, hosts)?),
        PayloadKind::Edition => emit(&convert::convert_edition(&json, hosts)?),
        PayloadKind::Reviews => {
            let outcome = convert::convert_work_reviews(&json, hosts);
            emit(&ListReport::from(&outcome))
        }
        PayloadKind::Previews => {
            let outcome = convert::convert_work_previews(&json, hosts);
            emit(&ListReport::from(&outcome))
        }
    }
}

pub async fn work(client: &CatalogClient, id: u64) -> anyhow::Result<()> {
    emit(&client.work(id).await?)
}

pub async fn author(client: &CatalogClient, id: u64) -> anyhow::Result<()> {
    emit(&client.author(id).await?)
}

pub async fn edition(client: &CatalogClient, id: u64) -> anyhow::Result<()> {
    emit(&client.edition(id).await?)
}

pub async fn analogs(client: &CatalogClient, work_id: u64) -> anyhow::Result<()> {
    let outcome = client.work_analogs(work_id).await?;
    emit(&ListReport::from(&outcome))
}

/// Drives a reviews paginator until the list ends, `args.pages` pages have
/// loaded, or a page keeps failing after `args.retries` retries.
pub async fn reviews(client: &CatalogClient, args: ReviewsArgs) -> anyhow::Result<()> {
    let paginator = client.reviews_paginator(args.work_id);
    let mut states = paginator.subscribe();
    tracing::info!(work_id = args.work_id, sort = args.sort.label(), "loading reviews");
    paginator.set_sort(args.sort);

    let mut pages = 0;
    let mut retries_left = args.retries;
    let (items, complete) = loop {
        let state = states
            .recv()
            .await
            .context("reviews paginator stopped publishing")?;
        match state {
            PageState::Idle | PageState::Loading { .. } => {}
            PageState::Loaded { items, has_more } => {
                if !has_more {
                    break (items, true);
                }
                pages += 1;
                retries_left = args.retries;
                tracing::info!(page = pages, total = items.len(), "reviews page loaded");
                if pages >= args.pages {
                    break (items, false);
                }
                paginator.load_next_page();
            }
            PageState::Failed { error, .. } => {
                if retries_left == 0 {
                    return Err(anyhow::Error::new(error))
                        .with_context(|| format!("load reviews of work {}", args.work_id));
                }
                retries_left -= 1;
                tracing::warn!(%error, retries_left, "reviews page failed; retrying");
                paginator.retry();
            }
        }
    };

    emit(&ReviewsReport {
        work_id: args.work_id,
        sort: args.sort,
        pages,
        complete,
        reviews: &items,
    })
}

fn read_json(input: &str) -> anyhow::Result<Value> {
    let raw = if input == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("read stdin")?;
        raw
    } else {
        std::fs::read_to_string(input).with_context(|| format!("read {input}"))?
    };
    serde_json::from_str(&raw).with_context(|| format!("parse json: {input}"))
}

fn emit<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).context("write json to stdout")?;
    writeln!(stdout).context("write json to stdout")?;
    Ok(())
}
