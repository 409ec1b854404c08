//! Chart fingerprinting.
//!
//! A [`Fingerprint`] is the deterministic identity of a chart
//! configuration, used as the interpretation cache key. Two requests with
//! identical semantic parameters hash to the same fingerprint; any
//! parameter that affects interpretation content changes it.
//!
//! # Key design
//!
//! The fingerprint is a blake3 hash of a canonical encoding of
//! `(kind, subject, reference date, partner?, as-of day?, cycle?)`,
//! rendered as lowercase hex. blake3 is stable across processes, so the
//! same key works for the in-memory backend and any future shared one.
//!
//! # As-of granularity
//!
//! Transit charts fold the "as of" instant into the key at **calendar
//! day** granularity. Re-requesting the same transit later the same day
//! hits the cache; the key rolls over naturally at midnight UTC. This is
//! a deliberate trade: bounded cache cardinality, no regeneration just
//! because "now" advanced by seconds. Sub-day drift is the
//! [`staleness`](crate::staleness) module's concern, not the cache's.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, UraniaError};

/// Closed set of chart configurations the interpretation layer knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Birth chart for a single subject.
    Natal,
    /// Current-sky overlay; requires an "as of" instant.
    Transit,
    /// Two-subject relationship overlay; requires a partner.
    Synastry,
    /// Two-subject midpoint chart; requires a partner.
    Composite,
    /// Solar return for a given cycle (years since birth).
    SolarReturn,
    /// Lunar return for a given cycle index.
    LunarReturn,
}

impl ChartKind {
    /// Stable lowercase name, used in the fingerprint encoding and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Natal => "natal",
            ChartKind::Transit => "transit",
            ChartKind::Synastry => "synastry",
            ChartKind::Composite => "composite",
            ChartKind::SolarReturn => "solar_return",
            ChartKind::LunarReturn => "lunar_return",
        }
    }
}

/// Stable identity of a chart subject.
///
/// A numeric id when the subject is a saved record; otherwise name plus
/// birth date, which is stable across repeated calls for the same logical
/// person. The identifier must be non-empty — validation happens before
/// any hashing so malformed inputs never decay into a colliding key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubjectKey {
    /// Saved subject referenced by database id.
    Id(u64),
    /// Unsaved subject identified by name and birth date.
    Named { name: String, birth_date: NaiveDate },
}

impl SubjectKey {
    /// Subject key for a saved record.
    pub fn from_id(id: u64) -> Self {
        SubjectKey::Id(id)
    }

    /// Subject key for an unsaved subject.
    pub fn named(name: impl Into<String>, birth_date: NaiveDate) -> Self {
        SubjectKey::Named {
            name: name.into(),
            birth_date,
        }
    }

    /// Canonical encoding fed to the hasher.
    fn canonical(&self) -> String {
        match self {
            SubjectKey::Id(id) => format!("id:{id}"),
            SubjectKey::Named { name, birth_date } => {
                format!("named:{}:{}", name.trim().to_lowercase(), birth_date)
            }
        }
    }

    fn validate(&self, role: &str) -> Result<()> {
        if let SubjectKey::Named { name, .. } = self
            && name.trim().is_empty()
        {
            return Err(UraniaError::Validation(format!(
                "{role} subject name must not be empty"
            )));
        }
        Ok(())
    }
}

/// The semantically relevant parameters of a chart request.
///
/// Everything the fingerprint covers lives here; everything it must NOT
/// cover (time-of-day on dates, display options) is normalized away by
/// [`fingerprint()`](ChartSpec::fingerprint).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub subject: SubjectKey,
    /// Natal (or reference) date, date-only by construction.
    pub reference_date: NaiveDate,
    /// Second subject for synastry/composite charts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner: Option<SubjectKey>,
    /// "As of" instant for transit charts. Folded into the fingerprint at
    /// day granularity; kept at full resolution here for staleness checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
    /// Cycle index for solar/lunar returns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle: Option<u32>,
}

impl ChartSpec {
    /// Natal chart for a single subject.
    pub fn natal(subject: SubjectKey, reference_date: NaiveDate) -> Self {
        Self {
            kind: ChartKind::Natal,
            subject,
            reference_date,
            partner: None,
            as_of: None,
            cycle: None,
        }
    }

    /// Transit chart as of the given instant.
    pub fn transit(subject: SubjectKey, reference_date: NaiveDate, as_of: DateTime<Utc>) -> Self {
        Self {
            kind: ChartKind::Transit,
            subject,
            reference_date,
            partner: None,
            as_of: Some(as_of),
            cycle: None,
        }
    }

    /// Relationship chart (synastry or composite) for two subjects.
    pub fn relationship(
        kind: ChartKind,
        subject: SubjectKey,
        reference_date: NaiveDate,
        partner: SubjectKey,
    ) -> Self {
        Self {
            kind,
            subject,
            reference_date,
            partner: Some(partner),
            as_of: None,
            cycle: None,
        }
    }

    /// Return chart (solar or lunar) for the given cycle index.
    pub fn cyclic(
        kind: ChartKind,
        subject: SubjectKey,
        reference_date: NaiveDate,
        cycle: u32,
    ) -> Self {
        Self {
            kind,
            subject,
            reference_date,
            partner: None,
            as_of: None,
            cycle: Some(cycle),
        }
    }

    /// Check per-kind required parameters.
    ///
    /// Fails fast with [`UraniaError::Validation`] before any hashing,
    /// cache, or limiter interaction.
    pub fn validate(&self) -> Result<()> {
        self.subject.validate("primary")?;
        if let Some(partner) = &self.partner {
            partner.validate("partner")?;
        }
        match self.kind {
            ChartKind::Transit if self.as_of.is_none() => Err(UraniaError::Validation(
                "transit chart requires an as-of instant".into(),
            )),
            ChartKind::Synastry | ChartKind::Composite if self.partner.is_none() => {
                Err(UraniaError::Validation(format!(
                    "{} chart requires a partner subject",
                    self.kind.as_str()
                )))
            }
            ChartKind::SolarReturn | ChartKind::LunarReturn if self.cycle.is_none() => {
                Err(UraniaError::Validation(format!(
                    "{} chart requires a cycle index",
                    self.kind.as_str()
                )))
            }
            _ => Ok(()),
        }
    }

    /// Derive the cache key for this chart configuration.
    ///
    /// Pure: no side effects, no I/O. Identical inputs always yield the
    /// identical fingerprint.
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        self.validate()?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(self.kind.as_str().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(self.subject.canonical().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(self.reference_date.to_string().as_bytes());
        if let Some(partner) = &self.partner {
            hasher.update(b"\x1fpartner:");
            hasher.update(partner.canonical().as_bytes());
        }
        if let Some(as_of) = &self.as_of {
            // Day granularity: interpretations are not regenerated merely
            // because the current instant advanced by seconds.
            hasher.update(b"\x1fas_of:");
            hasher.update(as_of.date_naive().to_string().as_bytes());
        }
        if let Some(cycle) = self.cycle {
            hasher.update(b"\x1fcycle:");
            hasher.update(cycle.to_string().as_bytes());
        }

        Ok(Fingerprint(hasher.finalize().to_hex().to_string()))
    }
}

/// Opaque, deterministic identity of a chart configuration.
///
/// Lowercase hex; not reversible; carries no PII beyond what the caller
/// already supplied to construct it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// The hex form, e.g. for logging or as a store key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ada() -> SubjectKey {
        SubjectKey::named("Ada", NaiveDate::from_ymd_opt(1815, 12, 10).unwrap())
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(1815, 12, 10).unwrap()
    }

    #[test]
    fn fingerprint_deterministic() {
        let spec = ChartSpec::natal(ada(), reference());
        assert_eq!(
            spec.fingerprint().unwrap(),
            spec.fingerprint().unwrap(),
        );
    }

    #[test]
    fn fingerprint_differs_on_kind() {
        let natal = ChartSpec::natal(ada(), reference());
        let solar = ChartSpec::cyclic(ChartKind::SolarReturn, ada(), reference(), 1);
        assert_ne!(natal.fingerprint().unwrap(), solar.fingerprint().unwrap());
    }

    #[test]
    fn fingerprint_differs_on_subject() {
        let a = ChartSpec::natal(ada(), reference());
        let b = ChartSpec::natal(SubjectKey::from_id(42), reference());
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn fingerprint_differs_on_partner() {
        let a = ChartSpec::relationship(ChartKind::Synastry, ada(), reference(), SubjectKey::from_id(1));
        let b = ChartSpec::relationship(ChartKind::Synastry, ada(), reference(), SubjectKey::from_id(2));
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn transit_same_day_instants_collide() {
        let morning = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let noonish = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let a = ChartSpec::transit(ada(), reference(), morning);
        let b = ChartSpec::transit(ada(), reference(), noonish);
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn transit_day_rollover_changes_fingerprint() {
        let before = Utc.with_ymd_and_hms(2025, 3, 1, 23, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 3, 2, 0, 1, 0).unwrap();
        let a = ChartSpec::transit(ada(), reference(), before);
        let b = ChartSpec::transit(ada(), reference(), after);
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn fingerprint_differs_on_cycle() {
        let a = ChartSpec::cyclic(ChartKind::LunarReturn, ada(), reference(), 3);
        let b = ChartSpec::cyclic(ChartKind::LunarReturn, ada(), reference(), 4);
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn named_subject_key_is_case_and_whitespace_insensitive() {
        let date = NaiveDate::from_ymd_opt(1815, 12, 10).unwrap();
        let a = ChartSpec::natal(SubjectKey::named("Ada", date), reference());
        let b = ChartSpec::natal(SubjectKey::named("  ada ", date), reference());
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn empty_subject_name_fails_validation() {
        let date = NaiveDate::from_ymd_opt(1815, 12, 10).unwrap();
        let spec = ChartSpec::natal(SubjectKey::named("   ", date), reference());
        let err = spec.fingerprint().unwrap_err();
        assert!(matches!(err, UraniaError::Validation(_)));
    }

    #[test]
    fn transit_without_as_of_fails_validation() {
        let mut spec = ChartSpec::natal(ada(), reference());
        spec.kind = ChartKind::Transit;
        assert!(matches!(
            spec.fingerprint(),
            Err(UraniaError::Validation(_))
        ));
    }

    #[test]
    fn synastry_without_partner_fails_validation() {
        let mut spec = ChartSpec::natal(ada(), reference());
        spec.kind = ChartKind::Synastry;
        assert!(matches!(
            spec.fingerprint(),
            Err(UraniaError::Validation(_))
        ));
    }

    #[test]
    fn return_without_cycle_fails_validation() {
        let mut spec = ChartSpec::natal(ada(), reference());
        spec.kind = ChartKind::SolarReturn;
        assert!(matches!(
            spec.fingerprint(),
            Err(UraniaError::Validation(_))
        ));
    }
}
