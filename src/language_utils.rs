//! Language utilities for wiki database naming
//!
//! This module turns language codes and wiki names into the physical
//! replica database name (`<code>wiki_p`), and recovers language codes
//! from site URLs.

use url::Url;

/// Suffix carried by every replica database name
pub const REPLICA_SUFFIX: &str = "wiki_p";

/// Suffix of a wiki's internal name
pub const WIKI_SUFFIX: &str = "wiki";

/// Language codes whose database name cannot be derived from the code.
/// Keys use underscores in place of hyphens.
const SPECIAL_CASES: &[(&str, &str)] = &[
    ("be_tarask", "be_x_oldwiki_p"), // Belarusian (Taraškievica) kept its old name
    ("bho", "bhwiki_p"),             // Bhojpuri lives on the Bihari wiki
    ("egl", "emlwiki_p"),            // Emilian under the Emilian-Romagnol wiki
    ("gsw", "alswiki_p"),            // Alemannic
    ("lzh", "zh_classicalwiki_p"),
    ("nan", "zh_min_nanwiki_p"),
    ("nb", "nowiki_p"),              // Norwegian Bokmål
    ("rup", "roa_rupwiki_p"),        // Aromanian
    ("sgs", "bat_smgwiki_p"),        // Samogitian
    ("vro", "fiu_vrowiki_p"),        // Võro
    ("yue", "zh_yuewiki_p"),         // Cantonese
];

/// Strip a trailing `wiki_p` or `wiki` from `input`
pub fn strip_wiki_suffix(input: &str) -> &str {
    input
        .strip_suffix(REPLICA_SUFFIX)
        .or_else(|| input.strip_suffix(WIKI_SUFFIX))
        .unwrap_or(input)
}

/// Normalise a bare code for table lookups
fn lookup_key(bare: &str) -> String {
    bare.replace('-', "_")
}

fn special_case(bare: &str) -> Option<&'static str> {
    let key = lookup_key(bare);
    SPECIAL_CASES
        .iter()
        .find(|(code, _)| *code == key)
        .map(|(_, database)| *database)
}

/// Whether `input` (bare, `wiki` or `wiki_p` form) has an irregular database name
pub fn is_special_case(input: &str) -> bool {
    special_case(strip_wiki_suffix(input)).is_some()
}

/// Resolve a language code or wiki name to its replica database name.
///
/// `gsw`, `gswwiki` and `gswwiki_p` all resolve to `alswiki_p`; codes
/// without an irregular name become `<code with underscores>wiki_p`.
/// Resolving an already resolved name returns it unchanged.
pub fn resolve_database_name(input: &str) -> String {
    let bare = strip_wiki_suffix(input);
    if let Some(database) = special_case(bare) {
        return database.to_string();
    }
    format!("{}{}", lookup_key(bare), REPLICA_SUFFIX)
}

/// Drop the replica `_p` suffix: `enwiki_p` -> `enwiki`
pub fn wiki_without_replica_suffix(name: &str) -> &str {
    name.strip_suffix("_p").unwrap_or(name)
}

/// Derive a language code from a site URL such as `https://de.wikipedia.org/`
///
/// The code is the first label of a host with at least three labels;
/// `www` and mobile `m` prefixes are not language codes.
pub fn language_from_site_url(site_url: &str) -> Option<String> {
    let parsed = Url::parse(site_url.trim()).ok()?;
    let host = parsed.host_str()?;
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 3 {
        return None;
    }

    let code = labels[0].to_lowercase();
    if code.is_empty() || code == "www" || code == "m" {
        return None;
    }
    Some(code)
}
