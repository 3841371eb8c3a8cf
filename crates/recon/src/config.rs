use serde::Deserialize;

use crate::error::ReconError;
use crate::model::VehicleType;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Everything one reconciliation run needs besides the feed bytes.
///
/// Built from a TOML file (`from_toml`), from CLI flags, or both: the file
/// is read first and flags are applied on top with `FeedMapping::apply`.
#[derive(Debug, Clone)]
pub struct ReconConfig {
    pub name: String,
    pub dealer: Option<String>,
    pub on_duplicate_vin: DuplicateVinPolicy,
    pub unknown_type: UnknownTypePolicy,
    pub fetch: FetchSettings,
    pub primary: FeedMapping,
    pub comparison: FeedMapping,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: "vin-price-recon".into(),
            dealer: None,
            on_duplicate_vin: DuplicateVinPolicy::default(),
            unknown_type: UnknownTypePolicy::default(),
            fetch: FetchSettings::default(),
            primary: FeedMapping::primary_defaults(),
            comparison: FeedMapping::comparison_defaults(),
        }
    }
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// What to do when the dealer-filtered comparison feed lists a VIN twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateVinPolicy {
    /// First occurrence in feed order wins; later ones are counted and ignored.
    #[default]
    First,
    Error,
}

/// What to do with a row whose type string is neither a new nor a used label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownTypePolicy {
    /// Exclude the row, count it, log a warning.
    #[default]
    Skip,
    Error,
    /// Treat as used. Matches legacy exports; opt-in only.
    Used,
}

impl std::str::FromStr for DuplicateVinPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown duplicate policy '{other}' (expected first|error)")),
        }
    }
}

impl std::str::FromStr for UnknownTypePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(Self::Skip),
            "error" => Ok(Self::Error),
            "used" => Ok(Self::Used),
            other => Err(format!("unknown type policy '{other}' (expected skip|error|used)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_bytes() -> u64 {
    50 * 1024 * 1024
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_bytes: default_max_bytes(),
        }
    }
}

// ---------------------------------------------------------------------------
// Feed mapping
// ---------------------------------------------------------------------------

/// Per-feed source, column names and type vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMapping {
    /// URL or local path. Required at run time, not at parse time.
    pub source: Option<String>,
    /// `None` sniffs the delimiter from the feed.
    pub delimiter: Option<u8>,
    pub columns: ColumnMapping,
    pub vocabulary: TypeVocabulary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub vin: String,
    /// `None`: the feed carries no type; prices follow the counterpart's type.
    pub vehicle_type: Option<String>,
    pub new_price: String,
    pub used_price: String,
    pub dealer_id: Option<String>,
}

impl FeedMapping {
    /// Column layout of the inventory export most dealers hand over.
    pub fn primary_defaults() -> Self {
        Self {
            source: None,
            delimiter: Some(b','),
            columns: ColumnMapping {
                vin: "VIN".into(),
                vehicle_type: Some("Type".into()),
                new_price: "BookValue".into(),
                used_price: "SellingPrice".into(),
                dealer_id: None,
            },
            vocabulary: TypeVocabulary::default(),
        }
    }

    /// Column layout of the website listing feed.
    pub fn comparison_defaults() -> Self {
        Self {
            source: None,
            delimiter: Some(b','),
            columns: ColumnMapping {
                vin: "vin".into(),
                vehicle_type: None,
                new_price: "RetailValue".into(),
                used_price: "InternetPrice".into(),
                dealer_id: Some("dealer_id".into()),
            },
            vocabulary: TypeVocabulary::default(),
        }
    }

    /// Apply overrides on top of this mapping. An empty string for an
    /// optional column (type, dealer) unmaps it.
    pub fn apply(&mut self, o: &FeedOverrides) -> Result<(), ReconError> {
        if let Some(ref s) = o.source {
            self.source = Some(s.clone());
        }
        if let Some(ref d) = o.delimiter {
            self.delimiter = parse_delimiter(d)?;
        }
        let c = &o.columns;
        if let Some(ref v) = c.vin {
            self.columns.vin = v.clone();
        }
        if let Some(ref v) = c.vehicle_type {
            self.columns.vehicle_type = non_empty(v);
        }
        if let Some(ref v) = c.new_price {
            self.columns.new_price = v.clone();
        }
        if let Some(ref v) = c.used_price {
            self.columns.used_price = v.clone();
        }
        if let Some(ref v) = c.dealer_id {
            self.columns.dealer_id = non_empty(v);
        }
        if let Some(ref labels) = o.vocabulary.new {
            self.vocabulary.new = labels.clone();
        }
        if let Some(ref labels) = o.vocabulary.used {
            self.vocabulary.used = labels.clone();
        }
        Ok(())
    }

    fn validate(&self, feed: &str) -> Result<(), ReconError> {
        let required = [
            ("vin", &self.columns.vin),
            ("new_price", &self.columns.new_price),
            ("used_price", &self.columns.used_price),
        ];
        for (field, column) in required {
            if column.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "{feed}: column name for '{field}' is empty"
                )));
            }
        }
        self.vocabulary.validate(feed)
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// `"auto"` → sniff; otherwise a single ASCII character (`"\t"` allowed).
pub fn parse_delimiter(s: &str) -> Result<Option<u8>, ReconError> {
    match s {
        "auto" => Ok(None),
        "\\t" | "tab" => Ok(Some(b'\t')),
        _ if s.len() == 1 && s.is_ascii() => Ok(Some(s.as_bytes()[0])),
        _ => Err(ReconError::ConfigValidation(format!(
            "delimiter must be a single ASCII character or \"auto\", got {s:?}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// Extra labels meaning new / used, on top of the literal `New` and `Used`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeVocabulary {
    pub new: Vec<String>,
    pub used: Vec<String>,
}

impl TypeVocabulary {
    /// Classify a raw type cell. `None` is the unknown state.
    pub fn classify(&self, raw: &str) -> Option<VehicleType> {
        let value = raw.trim();
        if value == "New" || self.new.iter().any(|l| l.trim() == value) {
            Some(VehicleType::New)
        } else if value == "Used" || self.used.iter().any(|l| l.trim() == value) {
            Some(VehicleType::Used)
        } else {
            None
        }
    }

    fn validate(&self, feed: &str) -> Result<(), ReconError> {
        let new_labels = self.new.iter().map(|l| l.trim()).chain(["New"]);
        for label in new_labels {
            if label.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "{feed}: vocabulary contains an empty label"
                )));
            }
            if label == "Used" || self.used.iter().any(|u| u.trim() == label) {
                return Err(ReconError::ConfigValidation(format!(
                    "{feed}: label '{label}' maps to both New and Used"
                )));
            }
        }
        if self.used.iter().any(|l| l.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(format!(
                "{feed}: vocabulary contains an empty label"
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Overrides (TOML file sections and CLI flags share this shape)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedOverrides {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub columns: ColumnOverrides,
    #[serde(default)]
    pub vocabulary: VocabularyOverrides,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnOverrides {
    pub vin: Option<String>,
    #[serde(rename = "type")]
    pub vehicle_type: Option<String>,
    pub new_price: Option<String>,
    pub used_price: Option<String>,
    pub dealer_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VocabularyOverrides {
    pub new: Option<Vec<String>>,
    pub used: Option<Vec<String>>,
}

/// On-disk shape of a `.recon.toml` file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    name: Option<String>,
    dealer: Option<String>,
    on_duplicate_vin: Option<DuplicateVinPolicy>,
    unknown_type: Option<UnknownTypePolicy>,
    fetch: Option<FetchSettings>,
    #[serde(default)]
    primary: FeedOverrides,
    #[serde(default)]
    comparison: FeedOverrides,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let file: ConfigFile =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;

        let mut config = ReconConfig::default();
        if let Some(name) = file.name {
            config.name = name;
        }
        config.dealer = file.dealer;
        if let Some(p) = file.on_duplicate_vin {
            config.on_duplicate_vin = p;
        }
        if let Some(p) = file.unknown_type {
            config.unknown_type = p;
        }
        if let Some(f) = file.fetch {
            config.fetch = f;
        }
        config.primary.apply(&file.primary)?;
        config.comparison.apply(&file.comparison)?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        self.primary.validate("primary")?;
        self.comparison.validate("comparison")?;

        if self.primary.columns.vehicle_type.is_none() && self.comparison.columns.vehicle_type.is_none() {
            return Err(ReconError::ConfigValidation(
                "at least one feed needs a type column to choose between new and used prices".into(),
            ));
        }

        if let Some(ref dealer) = self.dealer {
            if dealer.trim().is_empty() {
                return Err(ReconError::ConfigValidation("dealer id is empty".into()));
            }
            if self.comparison.columns.dealer_id.is_none() {
                return Err(ReconError::ConfigValidation(
                    "dealer filter set but the comparison feed has no dealer column".into(),
                ));
            }
        }

        if self.fetch.timeout_secs == 0 {
            return Err(ReconError::ConfigValidation("fetch.timeout_secs must be > 0".into()));
        }

        Ok(())
    }

    /// Inputs a run cannot start without, by flag name. Empty when complete.
    pub fn missing_inputs(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.primary.source.as_deref().map_or(true, |s| s.trim().is_empty()) {
            missing.push("primary feed source");
        }
        if self.comparison.source.as_deref().map_or(true, |s| s.trim().is_empty()) {
            missing.push("comparison feed source");
        }
        if self.dealer.as_deref().map_or(true, |s| s.trim().is_empty()) {
            missing.push("dealer id");
        }
        missing
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
