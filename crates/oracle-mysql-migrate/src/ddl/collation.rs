//! Oracle collation / character-set translation and version gating.

/// MySQL character set emitted into every CREATE TABLE.
pub const MYSQL_CHARACTER_SET: &str = "UTF8MB4";

/// Minimum Oracle version supporting per-table and per-column collation.
pub const COLLATION_DB_VERSION: &str = "12.2";

/// Map an Oracle collation (or NLS_COMP value) to a MySQL collation.
///
/// Oracle only distinguishes binary and case/accent-insensitive comparison
/// semantics; a miss means the source uses linguistic rules MySQL cannot
/// reproduce and is fatal for the table.
pub fn mysql_collation(oracle_collation: &str) -> Option<&'static str> {
    match oracle_collation.to_uppercase().as_str() {
        "BINARY" => Some("utf8mb4_bin"),
        "BINARY_CI" => Some("utf8mb4_general_ci"),
        "BINARY_AI" => Some("utf8mb4_general_ci"),
        _ => None,
    }
}

/// Map an Oracle database character set to its MySQL equivalent.
pub fn mysql_character_set(oracle_charset: &str) -> Option<&'static str> {
    match oracle_charset.to_uppercase().as_str() {
        "AL32UTF8" => Some("UTF8MB4"),
        "ZHS16GBK" => Some("GBK"),
        _ => None,
    }
}

/// Extract the character-set component from an NLS language string such as
/// "AMERICAN_AMERICA.AL32UTF8".
pub fn charset_component(nls_language: &str) -> &str {
    nls_language
        .rsplit('.')
        .next()
        .unwrap_or(nls_language)
}

/// Compare dotted version strings by numeric component.
///
/// Trailing zero components are insignificant: "12.2" >= "12.2.0.1" is false
/// but "12.2.0.0" == "12.2".
pub fn version_at_least(version: &str, floor: &str) -> bool {
    version_components(version) >= version_components(floor)
}

fn version_components(version: &str) -> Vec<u64> {
    let mut parts: Vec<u64> = version
        .split('.')
        .map(|p| p.trim().parse::<u64>().unwrap_or(0))
        .collect();
    while parts.last() == Some(&0) {
        parts.pop();
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collation_map() {
        assert_eq!(mysql_collation("BINARY"), Some("utf8mb4_bin"));
        assert_eq!(mysql_collation("binary_ci"), Some("utf8mb4_general_ci"));
        assert_eq!(mysql_collation("BINARY_AI"), Some("utf8mb4_general_ci"));
        assert_eq!(mysql_collation("LINGUISTIC"), None);
    }

    #[test]
    fn test_charset_map_and_component() {
        assert_eq!(
            charset_component("AMERICAN_AMERICA.AL32UTF8"),
            "AL32UTF8"
        );
        assert_eq!(charset_component("ZHS16GBK"), "ZHS16GBK");
        assert_eq!(mysql_character_set("AL32UTF8"), Some("UTF8MB4"));
        assert_eq!(mysql_character_set("ZHS16GBK"), Some("GBK"));
        assert_eq!(mysql_character_set("WE8ISO8859P1"), None);
    }

    #[test]
    fn test_version_gate() {
        assert!(version_at_least("19.3.0.0.0", COLLATION_DB_VERSION));
        assert!(version_at_least("12.2.0.1.0", COLLATION_DB_VERSION));
        assert!(version_at_least("12.2", COLLATION_DB_VERSION));
        assert!(!version_at_least("12.1.0.2.0", COLLATION_DB_VERSION));
        assert!(!version_at_least("11.2.0.4.0", COLLATION_DB_VERSION));
    }
}
