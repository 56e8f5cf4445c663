//! `geo triples` command implementation.
//!
//! ```text
//! # Every Description triple as a table
//! geo triples --attribute Description
//!
//! # First triple as JSON, one request per call
//! geo triples --first 1 --format json --pagination disabled
//! ```

use std::io::Write;

use anyhow::{Result, bail};
use clap::Args;
use geo_data::{
    DEFAULT_FIRST, GeoData, GeoDataConfig, Pagination, PaginationStrategy, QueryOutput,
    TripleQueryOptions,
};

/// Arguments for the `geo triples` command.
#[derive(Args, Debug)]
pub struct TriplesArgs {
    /// Maximum number of triples.
    #[arg(
        long,
        short = 'n',
        default_value_t = DEFAULT_FIRST,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub first: u64,

    /// Only triples whose attribute has this exact name.
    #[arg(long, short = 'a')]
    pub attribute: Option<String>,

    /// Output format: `table` or `json`.
    #[arg(long, short = 'f', default_value = "table")]
    pub format: String,

    /// Rename a raw table column, e.g. `triples_stringValue=value`.
    /// Replaces the default renames when given.
    #[arg(long = "rename", value_name = "FROM=TO", value_parser = parse_rename)]
    pub renames: Vec<(String, String)>,

    /// Pagination strategy: `shallow`, `skip` or `disabled`.
    #[arg(long, value_parser = parse_strategy)]
    pub pagination: Option<PaginationStrategy>,

    /// Rows requested per page.
    #[arg(long)]
    pub page_size: Option<usize>,
}

impl TriplesArgs {
    fn options(&self, defaults: Pagination) -> TripleQueryOptions {
        let mut options = TripleQueryOptions::new()
            .first(self.first)
            .output_format(self.format.clone());
        if let Some(attribute) = &self.attribute {
            options = options.attribute_name(attribute.clone());
        }
        for (from, to) in &self.renames {
            options = options.rename(from.clone(), to.clone());
        }
        if self.pagination.is_some() || self.page_size.is_some() {
            let mut pagination = defaults;
            if let Some(strategy) = self.pagination {
                pagination = pagination.with_strategy(strategy);
            }
            if let Some(page_size) = self.page_size {
                pagination = pagination.with_page_size(page_size);
            }
            options = options.pagination(pagination);
        }
        options
    }
}

fn parse_rename(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((from, to)) if !from.is_empty() && !to.is_empty() => {
            Ok((from.to_string(), to.to_string()))
        }
        _ => Err(format!("expected FROM=TO, got `{raw}`")),
    }
}

fn parse_strategy(raw: &str) -> Result<PaginationStrategy, String> {
    match raw.to_ascii_lowercase().as_str() {
        "shallow" => Ok(PaginationStrategy::Shallow),
        "skip" => Ok(PaginationStrategy::Skip),
        "disabled" | "none" => Ok(PaginationStrategy::Disabled),
        other => Err(format!(
            "unknown pagination strategy `{other}` (expected shallow, skip or disabled)"
        )),
    }
}

/// Run the triples command.
///
/// # Errors
///
/// Returns an error if the subgraph cannot be reached or the query fails.
pub async fn run(config: &GeoDataConfig, args: &TriplesArgs) -> Result<()> {
    if args.page_size == Some(0) {
        bail!("--page-size must be at least 1");
    }

    let geo = GeoData::from_config(config).await?;
    let options = args.options(geo.pagination());

    let output = geo.query_triples(&options).await?;

    let mut stdout = std::io::stdout().lock();
    match output {
        Some(QueryOutput::Table(table)) => write!(stdout, "{}", table.to_tsv()?)?,
        Some(QueryOutput::Json(json)) => writeln!(stdout, "{json}")?,
        None => {}
    }
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_pairs() {
        assert_eq!(
            parse_rename("triples_stringValue=value"),
            Ok(("triples_stringValue".to_string(), "value".to_string()))
        );
        assert!(parse_rename("triples_stringValue").is_err());
        assert!(parse_rename("=value").is_err());
    }

    #[test]
    fn strategies() {
        assert_eq!(parse_strategy("Skip"), Ok(PaginationStrategy::Skip));
        assert_eq!(parse_strategy("none"), Ok(PaginationStrategy::Disabled));
        assert!(parse_strategy("deep").is_err());
    }

    #[test]
    fn pagination_override_only_when_asked() {
        let args = TriplesArgs {
            first: 5,
            attribute: Some("Name".into()),
            format: "json".into(),
            renames: vec![],
            pagination: None,
            page_size: None,
        };
        let options = args.options(Pagination::default());
        assert_eq!(options.first, 5);
        assert_eq!(options.attribute_name.as_deref(), Some("Name"));
        assert!(options.pagination.is_none());
        assert!(options.column_renames.is_none());

        let args = TriplesArgs {
            page_size: Some(10),
            ..args
        };
        let pagination = args
            .options(Pagination::default())
            .pagination
            .expect("override");
        assert_eq!(pagination.page_size, 10);
        assert_eq!(pagination.strategy, PaginationStrategy::Shallow);
    }
}
