//! Resource schema identifiers exposed by an export.
//!
//! An export lists its schemas as `version.resource.group` strings. Only the
//! first two dots separate components, so the group keeps its own dots:
//! `v1.tests.catalog.kcp.dev` is version `v1`, resource `tests`, group
//! `catalog.kcp.dev`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::resource::GroupResource;

/// A parsed `version.resource.group` schema identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaIdentifier {
    pub version: String,
    pub resource: String,
    pub group: String,
}

impl SchemaIdentifier {
    /// Parse an identifier.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedSchemaIdentifier` when the string does not
    /// split into exactly three components.
    pub fn parse(identifier: &str) -> Result<Self> {
        let mut parts = identifier.splitn(3, '.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(version), Some(resource), Some(group)) => Ok(Self {
                version: version.to_string(),
                resource: resource.to_string(),
                group: group.to_string(),
            }),
            _ => Err(Error::malformed_schema(identifier)),
        }
    }

    /// The group/resource pair this schema serves.
    pub fn to_group_resource(&self) -> GroupResource {
        GroupResource::new(self.group.clone(), self.resource.clone())
    }
}

impl FromStr for SchemaIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SchemaIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.version, self.resource, self.group)
    }
}

/// What to do with a schema identifier that fails to parse.
///
/// Malformed identifiers never affect the validity condition of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedSchemaPolicy {
    /// Discard silently.
    #[default]
    Drop,
    /// Discard, but keep the identifier in the pass outcome and log a warning.
    Report,
}

impl fmt::Display for MalformedSchemaPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drop => write!(f, "drop"),
            Self::Report => write!(f, "report"),
        }
    }
}

impl FromStr for MalformedSchemaPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "report" => Ok(Self::Report),
            other => Err(Error::invalid_resource(format!(
                "unknown malformed schema policy '{other}' (expected drop or report)"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_group_keeps_dots() {
        let id = SchemaIdentifier::parse("v1.tests.catalog.kcp.dev").unwrap();
        assert_eq!(id.version, "v1");
        assert_eq!(id.resource, "tests");
        assert_eq!(id.group, "catalog.kcp.dev");
        assert_eq!(
            id.to_group_resource(),
            GroupResource::new("catalog.kcp.dev", "tests")
        );
    }

    #[test]
    fn test_too_few_parts_is_malformed() {
        assert!(SchemaIdentifier::parse("badformat").is_err());
        assert!(SchemaIdentifier::parse("v1.widgets").is_err());
        assert!(SchemaIdentifier::parse("").is_err());
    }

    #[test]
    fn test_empty_components_are_accepted() {
        let id = SchemaIdentifier::parse("v1..core").unwrap();
        assert_eq!(id.resource, "");
        assert_eq!(id.group, "core");
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "Report".parse::<MalformedSchemaPolicy>().ok(),
            Some(MalformedSchemaPolicy::Report)
        );
        assert!("ignore".parse::<MalformedSchemaPolicy>().is_err());
    }

    proptest! {
        #[test]
        fn parses_iff_at_least_two_dots(s in "[a-z.]{0,16}") {
            let dots = s.matches('.').count();
            prop_assert_eq!(SchemaIdentifier::parse(&s).is_ok(), dots >= 2);
        }
    }
}
