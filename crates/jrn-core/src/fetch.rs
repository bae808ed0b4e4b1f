//! Results page fetcher: one HTTP GET plus top-row extraction.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use crate::{config::Config, domain::ResultRow, errors::Error, Result};

/// Port for the results page.
///
/// The live site sits behind `HttpFetcher`; tests supply fakes.
#[async_trait]
pub trait ResultsSource: Send + Sync {
    async fn fetch_top_row(&self) -> Result<ResultRow>;
}

/// reqwest-backed fetcher for the live results site.
pub struct HttpFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpFetcher {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&cfg.user_agent)
            .timeout(cfg.http_timeout)
            .build()?;
        Ok(Self {
            client,
            url: cfg.results_url.clone(),
        })
    }
}

#[async_trait]
impl ResultsSource for HttpFetcher {
    async fn fetch_top_row(&self) -> Result<ResultRow> {
        tracing::debug!(url = %self.url, "fetching results page");
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_top_row(&body)
    }
}

/// Extract the first data row of the first table, by column position:
/// 2nd cell = publish date, 3rd = course, 6th = details. When the 6th cell is
/// absent the remaining cells from the 3rd onward are joined instead.
///
/// A row whose extracted fields are all empty is returned as-is; the caller
/// treats it as "no data this cycle".
pub fn parse_top_row(html: &str) -> Result<ResultRow> {
    let doc = Html::parse_document(html);

    let table_sel = Selector::parse("table").expect("valid selector");
    let row_sel = Selector::parse("tr").expect("valid selector");
    let cell_sel = Selector::parse("td, th").expect("valid selector");

    let Some(table) = doc.select(&table_sel).next() else {
        return Err(Error::Parse("no table element found on page".to_string()));
    };

    // First body row: header rows live in a distinct <thead> section.
    let Some(row) = table.select(&row_sel).find(|r| !in_thead(r)) else {
        return Err(Error::Parse(
            "no rows found inside the results table".to_string(),
        ));
    };

    let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();

    let publish_date = cells.get(1).cloned().unwrap_or_default();
    let course = cells.get(2).cloned().unwrap_or_default();
    let details = match cells.get(5) {
        Some(d) => d.clone(),
        None if cells.len() > 2 => cells[2..].join(" "),
        None => String::new(),
    };

    Ok(ResultRow {
        publish_date,
        course,
        details,
    })
}

fn in_thead(row: &ElementRef) -> bool {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == "thead")
}

/// Visible text of a cell, whitespace-normalized.
fn cell_text(cell: ElementRef) -> String {
    cell.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
