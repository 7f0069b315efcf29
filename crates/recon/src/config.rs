use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::ReconError;
use crate::model::CanonicalField;

/// Default per-table row ceiling enforced before the engine runs.
pub const DEFAULT_MAX_ROWS: usize = 100_000;

/// Default per-document byte ceiling enforced by extraction (16 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 16 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Validated engine configuration. Immutable once built; construct through
/// [`ReconConfig::from_toml`] or [`ReconConfig::default`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReconConfig {
    pub name: String,
    pub aliases: AliasTable,
    pub compare: Vec<CanonicalField>,
    pub tolerance: ToleranceConfig,
    pub limits: LimitsConfig,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            aliases: AliasTable::default(),
            compare: CanonicalField::DEFAULT_COMPARE.to_vec(),
            tolerance: ToleranceConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// On-disk shape before validation. Field names stay strings here so that a
/// typo surfaces as `ConfigInvalid` with a useful message.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default = "default_name")]
    name: String,
    #[serde(default)]
    aliases: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    compare: Option<Vec<String>>,
    #[serde(default)]
    tolerance: ToleranceConfig,
    #[serde(default)]
    limits: LimitsConfig,
}

fn default_name() -> String {
    "PO/Invoice reconciliation".into()
}

// ---------------------------------------------------------------------------
// Aliases
// ---------------------------------------------------------------------------

/// Ordered mapping from canonical field to the lower-cased header strings
/// that resolve to it. The canonical name is always present as an alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    entries: Vec<(CanonicalField, Vec<String>)>,
}

impl Default for AliasTable {
    fn default() -> Self {
        let mut map = BTreeMap::new();
        map.insert(
            CanonicalField::PoNumber,
            vec!["po number", "po id", "po detail", "purchase order"],
        );
        map.insert(
            CanonicalField::InvoiceNumber,
            vec!["invoice number", "inv no", "invoice id"],
        );
        map.insert(
            CanonicalField::Vendor,
            vec!["vendor", "supplier", "vendor name", "supplier name"],
        );
        map.insert(CanonicalField::TotalAmount, vec!["total amount", "amount", "total"]);
        map.insert(CanonicalField::Quantity, vec!["quantity", "qty"]);
        map.insert(CanonicalField::Currency, vec!["currency", "curr"]);

        let entries = CanonicalField::ALL
            .into_iter()
            .map(|f| (f, map[&f].iter().map(|s| s.to_string()).collect()))
            .collect();
        Self { entries }
    }
}

impl AliasTable {
    /// Build and validate an alias table. Every canonical field must be listed;
    /// aliases are trimmed and lower-cased, and may not be blank or shared
    /// between two fields.
    pub fn new(map: BTreeMap<CanonicalField, Vec<String>>) -> Result<Self, ReconError> {
        let mut entries = Vec::with_capacity(CanonicalField::ALL.len());
        let mut owner: BTreeMap<String, CanonicalField> = BTreeMap::new();

        for field in CanonicalField::ALL {
            let listed = map.get(&field).ok_or_else(|| {
                ReconError::ConfigInvalid(format!(
                    "alias table is missing canonical field '{}'",
                    field.key()
                ))
            })?;

            let mut aliases: Vec<String> = Vec::with_capacity(listed.len() + 1);
            for raw in std::iter::once(field.name()).chain(listed.iter().map(String::as_str)) {
                let alias = normalize_header(raw);
                if alias.is_empty() {
                    return Err(ReconError::ConfigInvalid(format!(
                        "blank alias for field '{}'",
                        field.key()
                    )));
                }
                if let Some(other) = owner.get(&alias) {
                    if *other != field {
                        return Err(ReconError::ConfigInvalid(format!(
                            "alias '{alias}' is listed for both '{}' and '{}'",
                            other.key(),
                            field.key()
                        )));
                    }
                    continue;
                }
                owner.insert(alias.clone(), field);
                aliases.push(alias);
            }
            entries.push((field, aliases));
        }

        Ok(Self { entries })
    }

    /// Resolve a source header. Fields are scanned in declaration order and
    /// the first one listing the header wins.
    pub fn resolve(&self, header: &str) -> Option<CanonicalField> {
        let needle = normalize_header(header);
        if needle.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|a| *a == needle))
            .map(|(field, _)| *field)
    }

    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, a)| a.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &[String])> {
        self.entries.iter().map(|(f, a)| (*f, a.as_slice()))
    }
}

/// Header comparison form: surrounding whitespace removed, lower case.
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Tolerance + Limits
// ---------------------------------------------------------------------------

/// Optional relaxation of exact comparison. With `numeric` unset every field
/// compares exactly as extracted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToleranceConfig {
    #[serde(default)]
    pub numeric: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

fn default_max_rows() -> usize {
    DEFAULT_MAX_ROWS
}

fn default_max_file_bytes() -> u64 {
    DEFAULT_MAX_FILE_BYTES
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let raw: RawConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;

        let aliases = match raw.aliases {
            None => AliasTable::default(),
            Some(map) => {
                let mut typed = BTreeMap::new();
                for (key, list) in map {
                    let field = parse_field_key(&key, "aliases")?;
                    typed.insert(field, list);
                }
                AliasTable::new(typed)?
            }
        };

        let compare = match raw.compare {
            None => CanonicalField::DEFAULT_COMPARE.to_vec(),
            Some(keys) => keys
                .iter()
                .map(|k| parse_field_key(k, "compare"))
                .collect::<Result<Vec<_>, _>>()?,
        };

        let config = Self {
            name: raw.name,
            aliases,
            compare,
            tolerance: raw.tolerance,
            limits: raw.limits,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.compare.is_empty() {
            return Err(ReconError::ConfigInvalid("compare list is empty".into()));
        }

        for (i, field) in self.compare.iter().enumerate() {
            if field.is_identifier() {
                return Err(ReconError::ConfigInvalid(format!(
                    "compare list may not include identifier field '{}'",
                    field.key()
                )));
            }
            if self.compare[..i].contains(field) {
                return Err(ReconError::ConfigInvalid(format!(
                    "compare list repeats field '{}'",
                    field.key()
                )));
            }
        }

        if let Some(tol) = self.tolerance.numeric {
            if !tol.is_finite() || tol < 0.0 {
                return Err(ReconError::ConfigInvalid(format!(
                    "tolerance.numeric must be a finite non-negative number, got {tol}"
                )));
            }
        }

        if self.limits.max_rows == 0 {
            return Err(ReconError::ConfigInvalid("limits.max_rows must be > 0".into()));
        }
        if self.limits.max_file_bytes == 0 {
            return Err(ReconError::ConfigInvalid(
                "limits.max_file_bytes must be > 0".into(),
            ));
        }

        Ok(())
    }
}

fn parse_field_key(key: &str, section: &str) -> Result<CanonicalField, ReconError> {
    CanonicalField::from_key(key).ok_or_else(|| {
        let known: Vec<&str> = CanonicalField::ALL.iter().map(|f| f.key()).collect();
        ReconError::ConfigInvalid(format!(
            "{section}: unknown field '{key}' (expected one of: {})",
            known.join(", ")
        ))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
