//! The hard-coded map reduce applications run over the tag table
//! Every map function sees one row and emits `(key, 1)` pairs, every reduce function sums them

use std::sync::OnceLock;

use regex::Regex;

use crate::mr::{table::TagAttributeRow, worker::KeyValue};

/// Keys are cut to this many characters before being shown
pub const DISPLAY_WIDTH: usize = 30;

/// U+FFFD, left behind wherever the loader met bytes it could not decode
pub const REPLACEMENT_MARKER: char = '\u{FFFD}';

pub type MapFn = fn(&TagAttributeRow) -> Vec<KeyValue>;
pub type ReduceFn = fn(&str, &[u64]) -> u64;

fn js_filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^/]+\.js").expect("js filename pattern is valid"))
}

/// Pull the `name.js` segment out of a script `src`
/// Returns the last slash-free run ending in `.js`, or `""` when nothing matches.
/// Anything after `.js` (query string, fragment) is not part of the match.
pub fn extract_js_filename(value: &str) -> &str {
    js_filename_pattern()
        .find_iter(value)
        .last()
        .map_or("", |m| m.as_str())
}

/// Split a keyword list on commas, `k` commas always give `k + 1` pieces
pub fn split_keywords(value: &str) -> impl Iterator<Item = &str> {
    value.split(',')
}

/// Keep the first `width` characters (not bytes) of `key`
pub fn truncate_key(key: &str, width: usize) -> String {
    key.chars().take(width).collect()
}

/// Empty keys and keys carrying the replacement marker never reach the output
pub fn is_displayable(key: &str) -> bool {
    !key.is_empty() && !key.contains(REPLACEMENT_MARKER)
}

/// Script library application
pub mod js_libraries {
    use super::*;

    pub fn map(row: &TagAttributeRow) -> Vec<KeyValue> {
        if row.tag != "script" || row.attribute != "src" {
            return Vec::new();
        }
        vec![KeyValue::new(extract_js_filename(&row.value).to_owned(), 1)]
    }

    pub fn reduce(_key: &str, values: &[u64]) -> u64 {
        values.iter().sum()
    }
}

/// Meta keyword application
pub mod keywords {
    use super::*;

    pub fn map(row: &TagAttributeRow) -> Vec<KeyValue> {
        // Matching on the raw tag text is a heuristic, `xkeywordsy` passes as well
        if row.tag != "meta" || row.attribute != "content" || !row.original.contains("keywords") {
            return Vec::new();
        }
        split_keywords(&row.value)
            .map(|x| KeyValue::new(truncate_key(x.trim(), DISPLAY_WIDTH), 1))
            .collect()
    }

    pub fn reduce(_key: &str, values: &[u64]) -> u64 {
        values.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_last_segment_of_url() {
        assert_eq!(extract_js_filename("https://cdn.example.com/jquery.js"), "jquery.js");
        assert_eq!(extract_js_filename("/static/js/app.min.js"), "app.min.js");
        assert_eq!(extract_js_filename("a.js"), "a.js");
    }

    #[test]
    fn host_names_containing_js_do_not_win() {
        assert_eq!(
            extract_js_filename("https://cdn.jsdelivr.net/npm/jquery@3/dist/jquery.min.js"),
            "jquery.min.js"
        );
        assert_eq!(extract_js_filename("//cdnjs.cloudflare.com/ajax/libs/vue/2.6.14/vue.js"), "vue.js");
    }

    #[test]
    fn no_match_gives_empty_key() {
        assert_eq!(extract_js_filename(""), "");
        assert_eq!(extract_js_filename("https://example.com/script.php"), "");
        assert_eq!(extract_js_filename("/js/"), "");
    }

    #[test]
    fn match_stops_at_js_suffix() {
        assert_eq!(extract_js_filename("/lib/jquery.js?v=2"), "jquery.js");
        assert_eq!(extract_js_filename("/lib/jquery.js#top"), "jquery.js");
        // The final segment wins when several look like scripts
        assert_eq!(extract_js_filename("/a/first.js/second.js"), "second.js");
        // Slash-free query text stays glued to the name
        assert_eq!(extract_js_filename("/x/loader?name=util.js"), "loader?name=util.js");
    }

    #[test]
    fn split_yields_comma_count_plus_one() {
        for (value, expected) in [("", 1), ("a", 1), ("a,b", 2), (",,", 3), ("news, sports, weather", 3)] {
            assert_eq!(split_keywords(value).count(), expected, "value {value:?}");
        }
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_key("abc", 30), "abc");
        assert_eq!(truncate_key(&"x".repeat(40), 30).len(), 30);
        assert_eq!(truncate_key("ééé", 2), "éé");
    }

    #[test]
    fn displayable_rejects_empty_and_garbled() {
        assert!(is_displayable("news"));
        assert!(!is_displayable(""));
        assert!(!is_displayable("n\u{FFFD}ws"));
    }

    #[test]
    fn js_map_ignores_other_tags() {
        let link = TagAttributeRow::new("link", "href", "/a.js", "<link>");
        let img = TagAttributeRow::new("script", "type", "text/javascript", "<script>");
        assert!(js_libraries::map(&link).is_empty());
        assert!(js_libraries::map(&img).is_empty());
    }

    #[test]
    fn keyword_map_trims_and_needs_keywords_in_original() {
        let row = TagAttributeRow::new("meta", "content", " news ,sports", "<meta name=keywords>");
        let keys = keywords::map(&row).into_iter().map(|kv| kv.key).collect::<Vec<_>>();
        assert_eq!(keys, vec!["news", "sports"]);

        let description = TagAttributeRow::new("meta", "content", "news", "<meta name=description>");
        assert!(keywords::map(&description).is_empty());
    }

    #[test]
    fn keyword_filter_is_a_case_sensitive_substring() {
        let embedded = TagAttributeRow::new("meta", "content", "news", "<meta name=xkeywordsy>");
        assert_eq!(keywords::map(&embedded).len(), 1);

        let capitalised = TagAttributeRow::new("meta", "content", "news", "<meta name=Keywords>");
        assert!(keywords::map(&capitalised).is_empty());
    }

    #[test]
    fn reduce_sums_values() {
        assert_eq!(js_libraries::reduce("a.js", &[1, 1, 1]), 3);
        assert_eq!(keywords::reduce("news", &[]), 0);
    }
}
