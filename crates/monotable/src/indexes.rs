//! Physical layout of named secondary indexes.
//!
//! Key patterns declare indexes with logical names (`GSI1PK`, `GSI1SK`); the
//! table projects them to physical attributes with different names. Writes
//! must store expanded values under the physical names, and index queries
//! must reference the physical names in their key conditions.

/// Physical configuration of one named index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexKeyConfig {
    /// The index name as known to the provider.
    pub index_name: &'static str,
    /// Physical partition key attribute name.
    pub partition_key: &'static str,
    /// Physical sort key attribute name.
    pub sort_key: &'static str,
}

const INDEX_CONFIGS: &[(&str, IndexKeyConfig)] = &[
    (
        "GSI1",
        IndexKeyConfig {
            index_name: "GSI1",
            partition_key: "PK1",
            sort_key: "SK1",
        },
    ),
    (
        "GSI2",
        IndexKeyConfig {
            index_name: "GSI2",
            partition_key: "PK2",
            sort_key: "SK2",
        },
    ),
    (
        "GSI3",
        IndexKeyConfig {
            index_name: "GSI3",
            partition_key: "PK3",
            sort_key: "SK3",
        },
    ),
];

/// Looks up the physical configuration for an index tag such as `"GSI1"`.
pub fn index_config(tag: &str) -> Option<&'static IndexKeyConfig> {
    INDEX_CONFIGS
        .iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, config)| config)
}

/// Resolves a logical key-pattern name (`PK`, `SK`, `GSI1PK`, `GSI1SK`, ...)
/// to the physical attribute name items are written under. Returns `None`
/// for names that reference no configured index.
pub fn physical_attribute(logical: &str) -> Option<&'static str> {
    match logical {
        "PK" => Some("PK"),
        "SK" => Some("SK"),
        _ => {
            if let Some(tag) = logical.strip_suffix("PK") {
                index_config(tag).map(|config| config.partition_key)
            } else if let Some(tag) = logical.strip_suffix("SK") {
                index_config(tag).map(|config| config.sort_key)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs_exist() {
        let gsi1 = index_config("GSI1").unwrap();
        assert_eq!(gsi1.partition_key, "PK1");
        assert_eq!(gsi1.sort_key, "SK1");
        assert_eq!(gsi1.index_name, "GSI1");

        let gsi2 = index_config("GSI2").unwrap();
        assert_eq!(gsi2.partition_key, "PK2");

        let gsi3 = index_config("GSI3").unwrap();
        assert_eq!(gsi3.partition_key, "PK3");
    }

    #[test]
    fn test_unknown_index() {
        assert!(index_config("GSI99").is_none());
    }

    #[test]
    fn test_physical_attribute_resolution() {
        assert_eq!(physical_attribute("PK"), Some("PK"));
        assert_eq!(physical_attribute("SK"), Some("SK"));
        assert_eq!(physical_attribute("GSI1PK"), Some("PK1"));
        assert_eq!(physical_attribute("GSI1SK"), Some("SK1"));
        assert_eq!(physical_attribute("GSI3SK"), Some("SK3"));
        assert_eq!(physical_attribute("GSI99PK"), None);
        assert_eq!(physical_attribute("Name"), None);
    }
}
