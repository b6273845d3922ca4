//! The per-record import loop shared by every source.
//!
//! Records are processed strictly one after another. Each record is
//! normalized and upserted on its own; a failure is counted and described in
//! the summary and the loop moves on. After the loop all pending changes are
//! saved once, and the surrounding dry-run executor decides whether they are
//! committed.

use std::borrow::Cow;
use std::collections::HashSet;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::cancel::CancellationToken;
use crate::database::{UnitOfWork, run_with_dry_run};
use crate::error::{ImportError, RecordError, Result};
use crate::fields;
use crate::models::{ImportOptions, ImportSummary};
use crate::payload::RawRecord;
use crate::traits::{CardSource, PagedSource, ScrapedSource};
use crate::upsert;

/// Safety limit on followed continuation links.
const MAX_PAGES: u32 = 500;

const LABEL_SET: &[&str] = &["set", "set_code", "setCode", "Set", "set.id", "set.code"];
const LABEL_NUMBER: &[&str] = &[
    "collector_number",
    "number",
    "Number",
    "collectorNumber",
    "card_number",
];
const LABEL_NAME: &[&str] = &["name", "Name", "card_name", "title"];

/// Human-readable locator for a raw record.
pub fn describe_record(raw: &Value) -> String {
    let field = |candidates: &[&str]| fields::text(raw, candidates).unwrap_or_else(|| "?".into());
    format!(
        "set={} number={} name={}",
        field(LABEL_SET),
        field(LABEL_NUMBER),
        field(LABEL_NAME)
    )
}

/// Progress of one import call
pub struct ImportRun<'a, S: ?Sized> {
    source: &'a S,
    summary: ImportSummary,
    limit: Option<usize>,
    default_set: Option<String>,
    processed: usize,
}

impl<'a, S: CardSource + ?Sized> ImportRun<'a, S> {
    pub fn new(source: &'a S, options: &ImportOptions) -> Self {
        Self {
            source,
            summary: ImportSummary::new(source.key(), options.dry_run),
            limit: options.limit,
            default_set: options.set_code().map(fields::set_code),
            processed: 0,
        }
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Whether `Limit` records have been processed.
    pub fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.processed >= limit)
    }

    /// Normalize and upsert one raw record, isolating any failure to it.
    pub async fn process(&mut self, uow: &mut UnitOfWork, raw: &Value) {
        self.processed += 1;
        let raw = self.with_default_set(raw);
        if let Err(err) = self.upsert_raw(uow, &raw).await {
            self.fail(&describe_record(&raw), &err);
        }
    }

    /// A record without a set of its own inherits the requested set code.
    fn with_default_set<'v>(&self, raw: &'v Value) -> Cow<'v, Value> {
        match (&self.default_set, raw) {
            (Some(code), Value::Object(map)) if fields::lookup(raw, LABEL_SET).is_none() => {
                let mut map = map.clone();
                map.insert("set".to_string(), Value::String(code.clone()));
                Cow::Owned(Value::Object(map))
            }
            _ => Cow::Borrowed(raw),
        }
    }

    async fn upsert_raw(
        &mut self,
        uow: &mut UnitOfWork,
        raw: &Value,
    ) -> std::result::Result<(), RecordError> {
        let records = self.source.normalize(raw)?;
        let matching = self.source.config().printing_match;
        for record in &records {
            let outcome = upsert::upsert_record(uow, record, matching).await?;
            self.summary.record(outcome);
        }
        Ok(())
    }

    /// Count a record that failed before it could be normalized.
    pub fn skip(&mut self, locator: &str, err: &RecordError) {
        self.processed += 1;
        self.fail(locator, err);
    }

    fn fail(&mut self, locator: &str, err: &RecordError) {
        warn!("{}: record #{} ({}) failed: {}", self.source.key(), self.processed, locator, err);
        self.summary.record_error(format!(
            "{}: record #{} ({}) failed: {}",
            self.source.key(),
            self.processed,
            locator,
            err
        ));
    }

    /// Save all pending changes once and close the summary.
    pub async fn finish(mut self, uow: &mut UnitOfWork, scope: &str) -> Result<ImportSummary> {
        uow.save_changes().await?;

        self.summary.push_message(format!(
            "Processed {} records for set={}",
            self.processed, scope
        ));
        self.summary.finished_at = Some(Utc::now());

        info!(
            source = %self.summary.source,
            dry_run = self.summary.dry_run,
            cards_created = self.summary.cards_created,
            cards_updated = self.summary.cards_updated,
            printings_created = self.summary.printings_created,
            printings_updated = self.summary.printings_updated,
            errors = self.summary.errors,
            "Processed {} records for set={}",
            self.processed,
            scope
        );
        Ok(self.summary)
    }
}

fn scope_label(options: &ImportOptions) -> String {
    options
        .set_code()
        .map(fields::set_code)
        .unwrap_or_else(|| "*".to_string())
}

/// Import already-parsed raw records (the file entry point).
pub async fn import_records<S: CardSource + ?Sized>(
    source: &S,
    records: Vec<RawRecord>,
    options: &ImportOptions,
    cancel: &CancellationToken,
) -> Result<ImportSummary> {
    info!(
        "Importing {} uploaded records into {} (dry_run={}, limit={:?})",
        records.len(),
        source.key(),
        options.dry_run,
        options.limit
    );

    run_with_dry_run(source.catalog(), options.dry_run, |mut uow| async move {
        let result = drive_records(source, &mut uow, &records, options, cancel).await;
        (uow, result)
    })
    .await
}

async fn drive_records<S: CardSource + ?Sized>(
    source: &S,
    uow: &mut UnitOfWork,
    records: &[RawRecord],
    options: &ImportOptions,
    cancel: &CancellationToken,
) -> Result<ImportSummary> {
    let mut run = ImportRun::new(source, options);
    for record in records {
        if run.is_full() {
            break;
        }
        cancel.check()?;
        match record {
            Ok(raw) => run.process(uow, raw).await,
            Err(err) => run.skip("unreadable upload row", err),
        }
    }
    run.finish(uow, &scope_label(options)).await
}

/// Import a set by following a JSON API's continuation links.
pub async fn import_paged<S: PagedSource + ?Sized>(
    source: &S,
    options: &ImportOptions,
    cancel: &CancellationToken,
) -> Result<ImportSummary> {
    let set_code = source.required_set_code(options)?;
    info!(
        "Importing set {} from {} (dry_run={}, limit={:?})",
        set_code,
        source.config().name,
        options.dry_run,
        options.limit
    );

    run_with_dry_run(source.catalog(), options.dry_run, |mut uow| async move {
        let result = drive_pages(source, &mut uow, &set_code, options, cancel).await;
        (uow, result)
    })
    .await
}

async fn drive_pages<S: PagedSource + ?Sized>(
    source: &S,
    uow: &mut UnitOfWork,
    set_code: &str,
    options: &ImportOptions,
    cancel: &CancellationToken,
) -> Result<ImportSummary> {
    let mut run = ImportRun::new(source, options);
    let mut next_url = Some(source.first_page_url(set_code));
    let mut page_num = 0;

    while let Some(url) = next_url.take() {
        if run.is_full() {
            break;
        }
        if page_num >= MAX_PAGES {
            warn!("Reached maximum page limit ({}) for {}", MAX_PAGES, source.key());
            break;
        }
        if page_num > 0 {
            cancel.sleep(source.config().request_delay).await?;
        }
        page_num += 1;

        info!("Fetching page {} for set {} from {}", page_num, set_code, source.config().name);
        let page = source.fetcher().get_json(&url, cancel).await?;

        for raw in source.page_records(&page, set_code) {
            if run.is_full() {
                break;
            }
            cancel.check()?;
            run.process(uow, &raw).await;
        }

        next_url = source
            .next_page_url(&page, &url)
            .filter(|next| *next != url);
    }

    run.finish(uow, set_code).await
}

/// Import a set by scraping its listing pages and every card detail page.
pub async fn import_scraped<S: ScrapedSource + ?Sized>(
    source: &S,
    options: &ImportOptions,
    cancel: &CancellationToken,
) -> Result<ImportSummary> {
    let set_code = source.required_set_code(options)?;
    info!(
        "Scraping set {} from {} (dry_run={}, limit={:?})",
        set_code,
        source.config().name,
        options.dry_run,
        options.limit
    );

    run_with_dry_run(source.catalog(), options.dry_run, |mut uow| async move {
        let result = drive_scrape(source, &mut uow, &set_code, options, cancel).await;
        (uow, result)
    })
    .await
}

async fn collect_detail_links<S: ScrapedSource + ?Sized>(
    source: &S,
    set_code: &str,
    limit: Option<usize>,
    cancel: &CancellationToken,
) -> Result<Vec<String>> {
    let delay = source.config().request_delay;
    let mut links = Vec::new();
    let mut seen = HashSet::new();
    let mut next_url = Some(source.listing_url(set_code));
    let mut page_num = 0;

    while let Some(url) = next_url.take() {
        if page_num >= MAX_PAGES {
            warn!("Reached maximum listing page limit ({}) for {}", MAX_PAGES, source.key());
            break;
        }
        if page_num > 0 {
            cancel.sleep(delay).await?;
        }
        page_num += 1;

        info!("Fetching listing page {} for set {} from {}", page_num, set_code, source.config().name);
        let html = source.fetcher().get_text(&url, cancel).await?;
        let page = source.listing().parse(&html, &url);

        for link in page.card_links {
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }

        if limit.is_some_and(|limit| links.len() >= limit) {
            break;
        }
        next_url = page.next_page.filter(|next| *next != url);
    }

    info!("Found {} card pages for set {} on {}", links.len(), set_code, source.config().name);
    Ok(links)
}

async fn drive_scrape<S: ScrapedSource + ?Sized>(
    source: &S,
    uow: &mut UnitOfWork,
    set_code: &str,
    options: &ImportOptions,
    cancel: &CancellationToken,
) -> Result<ImportSummary> {
    let links = collect_detail_links(source, set_code, options.limit, cancel).await?;
    let mut run = ImportRun::new(source, options);

    for url in &links {
        if run.is_full() {
            break;
        }
        cancel.sleep(source.config().request_delay).await?;

        let html = match source.fetcher().get_text(url, cancel).await {
            Ok(html) => html,
            Err(ImportError::Cancelled) => return Err(ImportError::Cancelled),
            Err(err) => {
                let err = RecordError::Fetch {
                    url: url.clone(),
                    message: err.to_string(),
                };
                run.skip(url, &err);
                continue;
            }
        };

        match source.parse_detail(&html, url) {
            Ok(raw) => run.process(uow, &raw).await,
            Err(err) => run.skip(url, &err),
        }
    }

    run.finish(uow, set_code).await
}
