//! Alteration-requirement flags and the field property classifier.
//!
//! Every schema change falls into one or more requirement categories that
//! together determine the cheapest execution strategy:
//!
//! - [`Requirements::PHYSICAL`] — the table must be physically recreated.
//! - [`Requirements::MAIN_SCHEMA`] — main catalog metadata must be
//!   rewritten.
//! - [`Requirements::EXTENDED_SCHEMA`] — only driver-specific side-table
//!   metadata changes.
//! - [`Requirements::DATA_CONVERSION`] — existing row data must be
//!   transformed.
//!
//! Flags combine with `|`. A physical rebuild always invalidates the main
//! catalog entry, so `PHYSICAL` carries `MAIN_SCHEMA` with it by
//! construction.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::properties::is_extended_field_property;

const PHYSICAL_BIT: u8 = 0b0001;
const MAIN_SCHEMA_BIT: u8 = 0b0010;
const EXTENDED_SCHEMA_BIT: u8 = 0b0100;
const DATA_CONVERSION_BIT: u8 = 0b1000;

/// Set of alteration-requirement flags.
///
/// # Examples
///
/// ```
/// use table_alter_core::Requirements;
///
/// let r = Requirements::PHYSICAL | Requirements::DATA_CONVERSION;
/// assert!(r.contains(Requirements::PHYSICAL));
/// // physical altering always implies main-schema altering
/// assert!(r.contains(Requirements::MAIN_SCHEMA));
/// assert!(!r.contains(Requirements::EXTENDED_SCHEMA));
///
/// assert!(Requirements::NONE.is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Requirements(u8);

impl Requirements {
    /// No alteration required.
    pub const NONE: Requirements = Requirements(0);
    /// The table must be physically recreated. Carries
    /// [`MAIN_SCHEMA`](Requirements::MAIN_SCHEMA) by construction.
    pub const PHYSICAL: Requirements = Requirements(PHYSICAL_BIT | MAIN_SCHEMA_BIT);
    /// Main catalog metadata must be rewritten.
    pub const MAIN_SCHEMA: Requirements = Requirements(MAIN_SCHEMA_BIT);
    /// Only driver-specific side-table metadata changes.
    pub const EXTENDED_SCHEMA: Requirements = Requirements(EXTENDED_SCHEMA_BIT);
    /// Existing row data must be transformed.
    pub const DATA_CONVERSION: Requirements = Requirements(DATA_CONVERSION_BIT);

    /// Whether every flag of `other` is set in `self`.
    pub fn contains(self, other: Requirements) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no flag is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Requirements {
    type Output = Requirements;

    fn bitor(self, rhs: Requirements) -> Requirements {
        Requirements(self.0 | rhs.0)
    }
}

impl BitOrAssign for Requirements {
    fn bitor_assign(&mut self, rhs: Requirements) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Requirements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut names = Vec::new();
        if self.0 & PHYSICAL_BIT != 0 {
            names.push("physical");
        }
        if self.0 & MAIN_SCHEMA_BIT != 0 {
            names.push("mainSchema");
        }
        if self.0 & EXTENDED_SCHEMA_BIT != 0 {
            names.push("extendedSchema");
        }
        if self.0 & DATA_CONVERSION_BIT != 0 {
            names.push("dataConversion");
        }
        f.write_str(&names.join("|"))
    }
}

/// Classifies a field property name into the requirement categories its
/// change demands.
///
/// The mapping is fixed for core properties (case-insensitive). Names not
/// in the core table fall back to the extended-property predicate; a name
/// that is neither is logged as a warning and classified as requiring
/// nothing — an explicit policy, not a failure.
///
/// # Examples
///
/// ```
/// use table_alter_core::{classify_property, Requirements};
///
/// assert_eq!(
///     classify_property("caption"),
///     Requirements::MAIN_SCHEMA,
/// );
/// assert!(classify_property("type").contains(Requirements::PHYSICAL | Requirements::DATA_CONVERSION));
/// assert_eq!(
///     classify_property("rowSource"),
///     Requirements::EXTENDED_SCHEMA,
/// );
/// assert_eq!(classify_property("bogus"), Requirements::NONE);
/// ```
pub fn classify_property(name: &str) -> Requirements {
    match name.to_ascii_lowercase().as_str() {
        // a rename is catalog metadata; backends rename the physical column
        // in place when persisting the main schema
        "name" => Requirements::MAIN_SCHEMA,
        "type" => Requirements::PHYSICAL | Requirements::DATA_CONVERSION,
        "caption" | "description" => Requirements::MAIN_SCHEMA,
        "unsigned" | "maxlength" | "precision" => {
            Requirements::PHYSICAL | Requirements::DATA_CONVERSION
        }
        "defaultwidth" | "visibledecimalplaces" => Requirements::EXTENDED_SCHEMA,
        // a default value is catalog metadata only; backends differ on what
        // expressions they accept, so no physical rewrite is forced here
        "defaultvalue" => Requirements::MAIN_SCHEMA,
        "primarykey" | "unique" | "notnull" | "autoincrement" | "indexed" => {
            Requirements::PHYSICAL | Requirements::DATA_CONVERSION
        }
        "allowempty" => Requirements::PHYSICAL,
        other => {
            if is_extended_field_property(other) {
                Requirements::EXTENDED_SCHEMA
            } else {
                tracing::warn!(property = name, "unknown field property, classified as no-op");
                Requirements::NONE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_implies_main_schema() {
        assert!(Requirements::PHYSICAL.contains(Requirements::MAIN_SCHEMA));
        let r = Requirements::PHYSICAL | Requirements::EXTENDED_SCHEMA;
        assert!(r.contains(Requirements::MAIN_SCHEMA));
    }

    #[test]
    fn test_classify_type_is_physical_and_data_conversion() {
        let r = classify_property("type");
        assert!(r.contains(Requirements::PHYSICAL));
        assert!(r.contains(Requirements::DATA_CONVERSION));
        assert!(r.contains(Requirements::MAIN_SCHEMA));
        assert!(!r.contains(Requirements::EXTENDED_SCHEMA));
    }

    #[test]
    fn test_classify_caption_is_main_schema_only() {
        assert_eq!(classify_property("caption"), Requirements::MAIN_SCHEMA);
        assert_eq!(classify_property("description"), Requirements::MAIN_SCHEMA);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify_property("MAXLENGTH"), classify_property("maxLength"));
        assert_eq!(classify_property("PrimaryKey"), classify_property("primarykey"));
    }

    #[test]
    fn test_classify_extended_fallback() {
        assert_eq!(
            classify_property("boundColumn"),
            Requirements::EXTENDED_SCHEMA
        );
        assert_eq!(
            classify_property("visibleColumn"),
            Requirements::EXTENDED_SCHEMA
        );
    }

    #[test]
    fn test_classify_unknown_is_none() {
        assert_eq!(classify_property("noSuchProperty"), Requirements::NONE);
    }

    #[test]
    fn test_display_lists_flags() {
        assert_eq!(Requirements::NONE.to_string(), "none");
        assert_eq!(
            (Requirements::PHYSICAL | Requirements::DATA_CONVERSION).to_string(),
            "physical|mainSchema|dataConversion"
        );
    }
}
