//! `vinrecon run`, `dealers` and `validate`: config assembly and the
//! fetch → decode → map → reconcile pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use vinrecon_feed::{FeedClient, FeedSource, FetchOptions};
use vinrecon_io::{decode, RowSet};
use vinrecon_recon::config::{
    ColumnOverrides, DuplicateVinPolicy, FeedMapping, FeedOverrides, UnknownTypePolicy, VocabularyOverrides,
};
use vinrecon_recon::{run_rows, ReconConfig};

use crate::exit_codes::{EXIT_CONFIG, EXIT_DECODE_FAILED, EXIT_DISCREPANCIES};
use crate::report::{self, ReportFormat};
use crate::{CliError, RunArgs};

// ---------------------------------------------------------------------------
// Config assembly
// ---------------------------------------------------------------------------

/// Read a config file. Relative file sources inside it are resolved against
/// the file's directory so a config and its snapshots can move together.
pub(crate) fn load_config_file(path: &Path) -> Result<ReconConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_CONFIG, format!("cannot read config {}: {e}", path.display()))
    })?;
    let mut config = ReconConfig::from_toml(&text)?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for mapping in [&mut config.primary, &mut config.comparison] {
        if let Some(ref raw) = mapping.source {
            let source = FeedSource::parse(raw)
                .map_err(|e| CliError::new(EXIT_CONFIG, format!("{}: {e}", path.display())))?;
            mapping.source = Some(source.relative_to(base).to_string());
        }
    }
    Ok(config)
}

fn overrides(
    source: Option<String>,
    columns: ColumnOverrides,
    new_labels: Vec<String>,
    used_labels: Vec<String>,
) -> FeedOverrides {
    FeedOverrides {
        source,
        delimiter: None,
        columns,
        vocabulary: VocabularyOverrides {
            // Flags extend the vocabulary rather than replace it.
            new: (!new_labels.is_empty()).then_some(new_labels),
            used: (!used_labels.is_empty()).then_some(used_labels),
        },
    }
}

fn extend_labels(mapping: &FeedMapping, o: &mut FeedOverrides) {
    if let Some(ref mut labels) = o.vocabulary.new {
        labels.splice(0..0, mapping.vocabulary.new.iter().cloned());
    }
    if let Some(ref mut labels) = o.vocabulary.used {
        labels.splice(0..0, mapping.vocabulary.used.iter().cloned());
    }
}

/// Config file (if any) with flags applied on top, validated, with every
/// required input present. Nothing touches the network before this returns.
fn build_config(args: RunArgs) -> Result<(ReconConfig, ReportOptions), CliError> {
    let mut config = match args.config {
        Some(ref path) => load_config_file(path)?,
        None => ReconConfig::default(),
    };

    let mut primary = overrides(
        args.primary,
        ColumnOverrides {
            vin: args.primary_vin_field,
            vehicle_type: args.primary_type_field,
            new_price: args.primary_new_price_field,
            used_price: args.primary_used_price_field,
            dealer_id: None,
        },
        args.primary_new_label,
        args.primary_used_label,
    );
    let mut comparison = overrides(
        args.comparison,
        ColumnOverrides {
            vin: args.comparison_vin_field,
            vehicle_type: args.comparison_type_field,
            new_price: args.comparison_new_price_field,
            used_price: args.comparison_used_price_field,
            dealer_id: args.comparison_dealer_field,
        },
        args.comparison_new_label,
        args.comparison_used_label,
    );
    extend_labels(&config.primary, &mut primary);
    extend_labels(&config.comparison, &mut comparison);
    config.primary.apply(&primary)?;
    config.comparison.apply(&comparison)?;

    if let Some(dealer) = args.dealer {
        config.dealer = Some(dealer);
    }
    if let Some(ref p) = args.on_duplicate {
        config.on_duplicate_vin = p.parse::<DuplicateVinPolicy>().map_err(CliError::args)?;
    }
    if let Some(ref p) = args.unknown_type {
        config.unknown_type = p.parse::<UnknownTypePolicy>().map_err(CliError::args)?;
    }
    if let Some(secs) = args.timeout {
        config.fetch.timeout_secs = secs;
    }

    let missing = config.missing_inputs();
    if !missing.is_empty() {
        return Err(CliError::args(format!("missing required input: {}", missing.join(", ")))
            .with_hint("pass --primary, --comparison and --dealer, or set them in --config"));
    }

    config.validate()?;

    let format = if args.json {
        ReportFormat::Json
    } else if args.csv {
        ReportFormat::Csv
    } else {
        match args.output {
            Some(ref path) => ReportFormat::from_extension(path),
            None => ReportFormat::Table,
        }
    };

    Ok((config, ReportOptions { format, output: args.output }))
}

pub(crate) struct ReportOptions {
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub(crate) fn client_for(config: &ReconConfig) -> FeedClient {
    FeedClient::new(FetchOptions {
        timeout: Duration::from_secs(config.fetch.timeout_secs),
        max_bytes: config.fetch.max_bytes,
    })
}

fn source_of(feed: &str, mapping: &FeedMapping) -> Result<FeedSource, CliError> {
    let raw = mapping.source.as_deref().unwrap_or("");
    FeedSource::parse(raw).map_err(|e| CliError::args(format!("{feed} feed: {e}")))
}

/// Download and decode one feed.
pub(crate) fn load_feed(
    client: &FeedClient,
    feed: &str,
    source: &FeedSource,
    delimiter: Option<u8>,
) -> Result<RowSet, CliError> {
    let bytes = client.fetch(source)?;
    let rowset = decode(bytes, delimiter)
        .map_err(|e| CliError::new(EXIT_DECODE_FAILED, format!("{feed} feed ({source}): {e}")))?;
    log::info!(
        "{feed} feed: {} rows, {} columns, {}",
        rowset.len(),
        rowset.headers.len(),
        rowset.encoding
    );
    Ok(rowset)
}

pub fn cmd_run(args: RunArgs, quiet: bool) -> Result<(), CliError> {
    let (config, opts) = build_config(args)?;

    // Both sources must parse before the first request goes out.
    let primary_source = source_of("primary", &config.primary)?;
    let comparison_source = source_of("comparison", &config.comparison)?;

    let client = client_for(&config);
    let primary_rows = load_feed(&client, "primary", &primary_source, config.primary.delimiter)?;
    let comparison_rows = load_feed(&client, "comparison", &comparison_source, config.comparison.delimiter)?;

    let result = run_rows(&config, &primary_rows, &comparison_rows)?;

    report::write(&result, opts.format, opts.output.as_deref())?;

    if !quiet {
        let s = &result.summary;
        eprintln!(
            "dealer {}: {} primary, {} comparison records: {} matched, {} discrepancies, {} unmatched, {} missing price",
            result.meta.dealer_id.as_deref().unwrap_or("-"),
            s.primary_records,
            s.comparison_records,
            s.matched,
            s.discrepancies,
            s.unmatched,
            s.missing_price,
        );
        if s.skipped_unknown_type > 0 || s.duplicate_vins > 0 {
            eprintln!(
                "skipped: {} unknown vehicle type, {} duplicate VIN",
                s.skipped_unknown_type, s.duplicate_vins,
            );
        }
    }

    if !result.discrepancies.is_empty() {
        // Report is already out; the exit code alone signals the difference.
        return Err(CliError::new(EXIT_DISCREPANCIES, ""));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// dealers
// ---------------------------------------------------------------------------

pub fn cmd_dealers(
    config_path: Option<PathBuf>,
    comparison: Option<String>,
    dealer_field: Option<String>,
    timeout: Option<u64>,
) -> Result<(), CliError> {
    let mut config = match config_path {
        Some(ref path) => load_config_file(path)?,
        None => ReconConfig::default(),
    };
    config.comparison.apply(&FeedOverrides {
        source: comparison,
        columns: ColumnOverrides {
            dealer_id: dealer_field,
            ..ColumnOverrides::default()
        },
        ..FeedOverrides::default()
    })?;
    if let Some(secs) = timeout {
        config.fetch.timeout_secs = secs;
    }

    if config.comparison.source.as_deref().map_or(true, |s| s.trim().is_empty()) {
        return Err(CliError::args("missing required input: comparison feed source")
            .with_hint("pass --comparison or set [comparison] source in --config"));
    }
    let column = config
        .comparison
        .columns
        .dealer_id
        .clone()
        .ok_or_else(|| CliError::args("comparison feed has no dealer column mapped"))?;
    if config.fetch.timeout_secs == 0 {
        return Err(CliError::args("--timeout must be > 0"));
    }

    let source = source_of("comparison", &config.comparison)?;
    let rowset = load_feed(&client_for(&config), "comparison", &source, config.comparison.delimiter)?;

    let idx = rowset.column(&column).ok_or_else(|| {
        CliError::from(vinrecon_recon::ReconError::MissingColumn {
            feed: "comparison".into(),
            column: column.clone(),
        })
    })?;

    let dealers = rowset.distinct(idx);
    for dealer in &dealers {
        println!("{dealer}");
    }
    log::info!("{} dealer ids in column '{}'", dealers.len(), column);
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config_file(&config_path)?;

    eprintln!(
        "valid: '{}' primary [{}], comparison [{}]{}",
        config.name,
        describe(&config.primary),
        describe(&config.comparison),
        config
            .dealer
            .as_deref()
            .map(|d| format!(", dealer {d}"))
            .unwrap_or_default(),
    );

    let missing = config.missing_inputs();
    if !missing.is_empty() {
        eprintln!("note: must be given on the command line: {}", missing.join(", "));
    }
    Ok(())
}

fn describe(mapping: &FeedMapping) -> String {
    let c = &mapping.columns;
    let mut parts = vec![format!("vin={}", c.vin)];
    if let Some(ref t) = c.vehicle_type {
        parts.push(format!("type={t}"));
    }
    parts.push(format!("new={}", c.new_price));
    parts.push(format!("used={}", c.used_price));
    if let Some(ref d) = c.dealer_id {
        parts.push(format!("dealer={d}"));
    }
    parts.join(" ")
}
