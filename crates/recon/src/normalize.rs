use vinrecon_io::RowSet;

use crate::config::{FeedMapping, UnknownTypePolicy};
use crate::error::ReconError;
use crate::model::{Normalized, PriceCell, Pricing, VehicleRecord, VehicleType};

/// Resolved header positions for one feed.
struct ColumnIndex {
    vin: usize,
    vehicle_type: Option<usize>,
    new_price: usize,
    used_price: usize,
    dealer_id: Option<usize>,
}

impl ColumnIndex {
    fn resolve(feed: &str, rowset: &RowSet, mapping: &FeedMapping) -> Result<Self, ReconError> {
        let idx = |name: &str| -> Result<usize, ReconError> {
            rowset.column(name).ok_or_else(|| ReconError::MissingColumn {
                feed: feed.into(),
                column: name.into(),
            })
        };

        let col = &mapping.columns;
        Ok(Self {
            vin: idx(&col.vin)?,
            vehicle_type: col.vehicle_type.as_deref().map(idx).transpose()?,
            new_price: idx(&col.new_price)?,
            used_price: idx(&col.used_price)?,
            dealer_id: col.dealer_id.as_deref().map(idx).transpose()?,
        })
    }
}

/// Map one decoded feed onto canonical vehicle records.
///
/// Every configured column is checked against the header before any row is
/// read, so a bad mapping fails with `MissingColumn` even on an empty feed.
/// Price cells are carried as text; the engine parses the ones it compares.
pub fn normalize(
    feed: &str,
    rowset: &RowSet,
    mapping: &FeedMapping,
    unknown_type: UnknownTypePolicy,
) -> Result<Normalized, ReconError> {
    let cols = ColumnIndex::resolve(feed, rowset, mapping)?;

    let mut out = Normalized {
        feed: feed.to_string(),
        ..Normalized::default()
    };

    for row in &rowset.rows {
        let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");

        let vin = cell(cols.vin).trim();
        if vin.is_empty() {
            out.skipped_empty_vin += 1;
            continue;
        }

        let price_at = |i: usize| PriceCell::new(rowset.headers[i].as_str(), cell(i));

        let (vehicle_type, price) = match cols.vehicle_type {
            Some(ti) => {
                let raw_type = cell(ti);
                let vt = match mapping.vocabulary.classify(raw_type) {
                    Some(vt) => vt,
                    None => match unknown_type {
                        UnknownTypePolicy::Skip => {
                            log::warn!("{feed} feed: skipping VIN {vin} with unrecognised type {:?}", raw_type.trim());
                            out.skipped_unknown_type += 1;
                            continue;
                        }
                        UnknownTypePolicy::Error => {
                            return Err(ReconError::UnknownVehicleType {
                                feed: feed.into(),
                                vin: vin.into(),
                                value: raw_type.trim().into(),
                            });
                        }
                        UnknownTypePolicy::Used => VehicleType::Used,
                    },
                };
                let column = match vt {
                    VehicleType::New => cols.new_price,
                    VehicleType::Used => cols.used_price,
                };
                (Some(vt), Pricing::Typed(price_at(column)))
            }
            None => (
                None,
                Pricing::Untyped {
                    new: price_at(cols.new_price),
                    used: price_at(cols.used_price),
                },
            ),
        };

        let dealer_id = cols.dealer_id.map(|i| cell(i).to_string());

        out.records.push(VehicleRecord {
            vin: vin.to_string(),
            vehicle_type,
            price,
            dealer_id,
        });
    }

    log::debug!(
        "{feed} feed: {} records mapped, {} unknown type, {} empty VIN",
        out.records.len(),
        out.skipped_unknown_type,
        out.skipped_empty_vin,
    );

    Ok(out)
}

/// Keep only the rows whose dealer cell equals `dealer` exactly.
///
/// Runs before `normalize` so other dealers' rows never reach the type
/// policy or the counters.
pub fn filter_dealer(
    feed: &str,
    rowset: &RowSet,
    mapping: &FeedMapping,
    dealer: &str,
) -> Result<RowSet, ReconError> {
    let column = mapping.columns.dealer_id.as_deref().ok_or_else(|| {
        ReconError::ConfigValidation(format!("dealer filter set but the {feed} feed has no dealer column"))
    })?;
    let idx = rowset.column(column).ok_or_else(|| ReconError::MissingColumn {
        feed: feed.into(),
        column: column.into(),
    })?;

    let rows: Vec<Vec<String>> = rowset
        .rows
        .iter()
        .filter(|row| row.get(idx).map(String::as_str) == Some(dealer))
        .cloned()
        .collect();
    log::debug!("{feed} feed: {} of {} rows for dealer {dealer}", rows.len(), rowset.len());

    Ok(RowSet {
        headers: rowset.headers.clone(),
        rows,
        encoding: rowset.encoding,
    })
}
