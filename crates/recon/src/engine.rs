use std::collections::HashMap;

use vinrecon_io::RowSet;

use crate::config::{DuplicateVinPolicy, ReconConfig};
use crate::error::ReconError;
use crate::model::{
    DiscrepancyRecord, Normalized, PriceCell, ReconMeta, ReconResult, ReconSummary, VehicleRecord,
};
use crate::normalize::{filter_dealer, normalize};

/// Knobs for one reconcile call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    pub on_duplicate_vin: DuplicateVinPolicy,
}

/// Output of the join, before meta is attached.
#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    pub discrepancies: Vec<DiscrepancyRecord>,
    pub summary: ReconSummary,
}

/// Join primary against comparison on VIN and report price disagreements.
///
/// Comparison records are first restricted to `dealer_id` (exact match) when
/// one is given. Output follows primary order. Unmatched primary VINs and
/// pairs with a missing price on either side are counted, never reported.
/// Only the price cell selected for a matched pair is parsed.
pub fn reconcile(
    primary: &[VehicleRecord],
    comparison: &[VehicleRecord],
    dealer_id: Option<&str>,
    options: ReconcileOptions,
) -> Result<Reconciled, ReconError> {
    let filtered: Vec<&VehicleRecord> = match dealer_id {
        Some(dealer) => comparison
            .iter()
            .filter(|r| r.dealer_id.as_deref() == Some(dealer))
            .collect(),
        None => comparison.iter().collect(),
    };

    let mut summary = ReconSummary {
        primary_records: primary.len(),
        comparison_records: filtered.len(),
        ..ReconSummary::default()
    };

    let mut by_vin: HashMap<&str, &VehicleRecord> = HashMap::with_capacity(filtered.len());
    for &rec in &filtered {
        if by_vin.contains_key(rec.vin.as_str()) {
            match options.on_duplicate_vin {
                DuplicateVinPolicy::First => {
                    log::warn!("comparison feed: duplicate VIN {}, keeping first occurrence", rec.vin);
                    summary.duplicate_vins += 1;
                }
                DuplicateVinPolicy::Error => {
                    return Err(ReconError::DuplicateVin {
                        feed: "comparison".into(),
                        vin: rec.vin.clone(),
                    });
                }
            }
        } else {
            by_vin.insert(rec.vin.as_str(), rec);
        }
    }

    let mut discrepancies = Vec::new();

    for left in primary {
        let Some(right) = by_vin.get(left.vin.as_str()) else {
            summary.unmatched += 1;
            continue;
        };
        summary.matched += 1;

        let vehicle_type = left.vehicle_type.or(right.vehicle_type).ok_or_else(|| {
            ReconError::ConfigValidation(format!(
                "VIN '{}': neither feed has a type column, cannot choose a price column",
                left.vin
            ))
        })?;

        let price_a = parse_cell("primary", &left.vin, left.price.cell_for(vehicle_type))?;
        let price_b = parse_cell("comparison", &left.vin, right.price.cell_for(vehicle_type))?;
        let (Some(price_a), Some(price_b)) = (price_a, price_b) else {
            log::debug!("VIN {}: price missing on one side, not compared", left.vin);
            summary.missing_price += 1;
            continue;
        };

        if price_a != price_b {
            discrepancies.push(DiscrepancyRecord::new(
                left.vin.clone(),
                vehicle_type,
                price_a,
                price_b,
            ));
        }
    }

    summary.discrepancies = discrepancies.len();

    Ok(Reconciled { discrepancies, summary })
}

fn parse_cell(feed: &str, vin: &str, cell: &PriceCell) -> Result<Option<i64>, ReconError> {
    cell.cents().map_err(|_| ReconError::PriceParse {
        feed: feed.into(),
        vin: vin.into(),
        column: cell.column.clone(),
        value: cell.raw.trim().into(),
    })
}

/// Map both decoded feeds and reconcile them.
///
/// With a dealer set, comparison rows are restricted to that dealer before
/// mapping, so the unknown-type policy and skip counters only see its rows.
pub fn run_rows(
    config: &ReconConfig,
    primary: &RowSet,
    comparison: &RowSet,
) -> Result<ReconResult, ReconError> {
    let primary = normalize("primary", primary, &config.primary, config.unknown_type)?;
    let comparison = match config.dealer.as_deref() {
        Some(dealer) => {
            let rows = filter_dealer("comparison", comparison, &config.comparison, dealer)?;
            normalize("comparison", &rows, &config.comparison, config.unknown_type)?
        }
        None => normalize("comparison", comparison, &config.comparison, config.unknown_type)?,
    };
    run(config, &primary, &comparison)
}

/// Reconcile two mapped feeds per config. Returns discrepancies + summary + meta.
pub fn run(
    config: &ReconConfig,
    primary: &Normalized,
    comparison: &Normalized,
) -> Result<ReconResult, ReconError> {
    let options = ReconcileOptions {
        on_duplicate_vin: config.on_duplicate_vin,
    };
    let Reconciled { discrepancies, mut summary } = reconcile(
        &primary.records,
        &comparison.records,
        config.dealer.as_deref(),
        options,
    )?;

    summary.skipped_unknown_type = primary.skipped_unknown_type + comparison.skipped_unknown_type;
    summary.skipped_empty_vin = primary.skipped_empty_vin + comparison.skipped_empty_vin;

    log::info!(
        "reconciled {} primary vs {} comparison records: {} matched, {} discrepancies",
        summary.primary_records,
        summary.comparison_records,
        summary.matched,
        summary.discrepancies,
    );

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            dealer_id: config.dealer.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        discrepancies,
    })
}
