/*!
 * Tests for database name resolution
 */

use wikireplica::language_utils::{
    is_special_case, language_from_site_url, resolve_database_name, strip_wiki_suffix,
    wiki_without_replica_suffix,
};

const SPECIAL_CODES: &[&str] = &[
    "gsw", "vro", "be-tarask", "be_tarask", "sgs", "rup", "lzh", "yue", "nan", "nb", "egl", "bho",
];

/// Every special-case code resolves the same in bare, wiki and wiki_p form
#[test]
fn test_resolve_withSpecialCaseInAnyForm_shouldAgree() {
    for code in SPECIAL_CODES {
        let bare = resolve_database_name(code);
        assert_eq!(resolve_database_name(&format!("{}wiki", code)), bare, "{}wiki", code);
        assert_eq!(resolve_database_name(&format!("{}wiki_p", code)), bare, "{}wiki_p", code);
        assert!(is_special_case(code));
    }
}

#[test]
fn test_resolve_withKnownSpecialCases_shouldReturnHistoricalNames() {
    assert_eq!(resolve_database_name("gsw"), "alswiki_p");
    assert_eq!(resolve_database_name("vro"), "fiu_vrowiki_p");
    assert_eq!(resolve_database_name("be-tarask"), "be_x_oldwiki_p");
    assert_eq!(resolve_database_name("sgs"), "bat_smgwiki_p");
    assert_eq!(resolve_database_name("nb"), "nowiki_p");
    assert_eq!(resolve_database_name("yue"), "zh_yuewiki_p");
}

/// Codes without an entry become `<code with underscores>wiki_p`
#[test]
fn test_resolve_withRegularCodes_shouldUseDefaultRule() {
    for code in ["en", "fr", "de", "zh-min-nan", "roa-tara", "simple", "be-x-old"] {
        assert_eq!(resolve_database_name(code), format!("{}wiki_p", code.replace('-', "_")));
        assert!(!is_special_case(code));
    }
}

#[test]
fn test_resolve_appliedTwice_shouldBeStable() {
    for code in ["en", "gsw", "enwiki", "dewiki_p", "zh-min-nan", "nb"] {
        let once = resolve_database_name(code);
        assert_eq!(resolve_database_name(&once), once);
    }
}

#[test]
fn test_stripWikiSuffix_withOnlyPSuffix_shouldKeepInput() {
    assert_eq!(strip_wiki_suffix("meta_p"), "meta_p");
}

#[test]
fn test_wikiWithoutReplicaSuffix_shouldDropTrailingP() {
    assert_eq!(wiki_without_replica_suffix("enwiki_p"), "enwiki");
    assert_eq!(wiki_without_replica_suffix("enwiki"), "enwiki");
}

#[test]
fn test_languageFromSiteUrl_withWikipediaUrls_shouldReturnSubdomain() {
    assert_eq!(language_from_site_url("https://de.wikipedia.org/").as_deref(), Some("de"));
    assert_eq!(language_from_site_url("https://FR.wikipedia.org/wiki/X").as_deref(), Some("fr"));
    assert_eq!(
        language_from_site_url("https://zh-min-nan.wikipedia.org").as_deref(),
        Some("zh-min-nan")
    );
}

#[test]
fn test_languageFromSiteUrl_withNonLanguagePrefix_shouldBeNone() {
    assert_eq!(language_from_site_url("https://www.wikipedia.org/"), None);
    assert_eq!(language_from_site_url(""), None);
}
