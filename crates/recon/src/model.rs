use serde::Serialize;

// ---------------------------------------------------------------------------
// Canonical records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VehicleType {
    New,
    Used,
}

impl std::fmt::Display for VehicleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "New"),
            Self::Used => write!(f, "Used"),
        }
    }
}

/// One raw price cell, kept as text until a matched pair needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceCell {
    pub column: String,
    pub raw: String,
}

impl PriceCell {
    pub fn new(column: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            raw: raw.into(),
        }
    }

    /// Cents, or `None` for an empty cell.
    pub fn cents(&self) -> Result<Option<i64>, String> {
        if self.raw.trim().is_empty() {
            return Ok(None);
        }
        parse_price(&self.raw).map(Some)
    }
}

/// Price cells carried by a canonical record.
///
/// Typed feeds pick the column from the row's own type during mapping.
/// Untyped feeds keep both columns and let the engine pick using the
/// counterpart's type. Nothing is parsed until the engine compares a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pricing {
    Typed(PriceCell),
    Untyped { new: PriceCell, used: PriceCell },
}

impl Pricing {
    /// Cell to compare for a vehicle of type `vt`.
    pub fn cell_for(&self, vt: VehicleType) -> &PriceCell {
        match self {
            Self::Typed(cell) => cell,
            Self::Untyped { new, used } => match vt {
                VehicleType::New => new,
                VehicleType::Used => used,
            },
        }
    }
}

/// One feed row after field mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleRecord {
    pub vin: String,
    /// `None` when the feed has no type column mapped.
    pub vehicle_type: Option<VehicleType>,
    pub price: Pricing,
    pub dealer_id: Option<String>,
}

/// Field mapper output for one feed.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub feed: String,
    pub records: Vec<VehicleRecord>,
    pub skipped_unknown_type: usize,
    pub skipped_empty_vin: usize,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscrepancyRecord {
    pub vin: String,
    pub vehicle_type: VehicleType,
    pub price_a_cents: i64,
    pub price_b_cents: i64,
    pub discrepancy_cents: i64,
}

impl DiscrepancyRecord {
    pub fn new(vin: String, vehicle_type: VehicleType, price_a_cents: i64, price_b_cents: i64) -> Self {
        Self {
            vin,
            vehicle_type,
            price_a_cents,
            price_b_cents,
            discrepancy_cents: i64::try_from(price_a_cents.abs_diff(price_b_cents)).unwrap_or(i64::MAX),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub primary_records: usize,
    pub comparison_records: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub discrepancies: usize,
    pub missing_price: usize,
    pub duplicate_vins: usize,
    pub skipped_unknown_type: usize,
    pub skipped_empty_vin: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dealer_id: Option<String>,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub discrepancies: Vec<DiscrepancyRecord>,
}

/// Render cents as a plain decimal with two places (`-1234` → `-12.34`).
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Parse a plain decimal price into cents. At most two fractional digits;
/// no sign, currency symbols or grouping separators.
pub fn parse_price(s: &str) -> Result<i64, String> {
    let s = s.trim();
    if s.starts_with('-') {
        return Err(format!("negative price: {s}"));
    }
    let digits = s.strip_prefix('+').unwrap_or(s);
    if digits.is_empty() {
        return Err("empty amount".into());
    }

    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(format!("bad amount: {s}"));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("bad amount: {s}"));
    }

    let units: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|e| format!("bad amount: {e}"))?
    };
    let cents: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|e| format!("bad cents: {e}"))? * 10,
        2 => frac.parse().map_err(|e| format!("bad cents: {e}"))?,
        // Trailing zeros beyond two places are exact ("20000.000").
        _ if frac[2..].bytes().all(|b| b == b'0') => {
            frac[..2].parse().map_err(|e| format!("bad cents: {e}"))?
        }
        _ => return Err(format!("too many decimal places: {s}")),
    };

    units
        .checked_mul(100)
        .and_then(|u| u.checked_add(cents))
        .ok_or_else(|| format!("amount out of range: {s}"))
}
