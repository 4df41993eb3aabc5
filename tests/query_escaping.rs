// tests/query_escaping.rs
mod common;
use crate::common::builders::ENGINE_TEMPLATE;

use evalrun::materialize::patch::{escape_basic_string, insert_user_query, rewrite_quoted_field};
use proptest::prelude::*;

fn parse(text: &str) -> toml::Table {
    toml::from_str(text).unwrap_or_else(|e| panic!("invalid TOML ({e}):\n{text}"))
}

proptest! {
    // Whatever the user types, the injected value parses back unchanged.
    #[test]
    fn injected_query_survives_parsing(query in any::<String>()) {
        let patched = insert_user_query(ENGINE_TEMPLATE, &escape_basic_string(&query)).unwrap();
        let table = parse(&patched);

        prop_assert_eq!(table["runflow"]["user_query"].as_str(), Some(query.as_str()));
        prop_assert_eq!(table["runflow"]["use_data_analysis_agent"].as_bool(), Some(true));
        prop_assert!(table["sandbox"].get("user_query").is_none());
    }

    #[test]
    fn rewritten_paths_survive_parsing(dir in "[A-Za-z0-9_ ./\\\\\"-]{1,40}") {
        let (patched, count) = rewrite_quoted_field(ENGINE_TEMPLATE, "output_dir", &dir).unwrap();
        prop_assert_eq!(count, 1);

        let table = parse(&patched);
        prop_assert_eq!(table["io"]["output_dir"].as_str(), Some(dir.as_str()));
        prop_assert_eq!(table["io"]["input_dir"].as_str(), Some("/placeholder/input"));
    }
}

#[test]
fn reinjecting_replaces_the_previous_query() {
    let once = insert_user_query(ENGINE_TEMPLATE, &escape_basic_string("first")).unwrap();
    let twice = insert_user_query(&once, &escape_basic_string("second")).unwrap();

    assert_eq!(twice.matches("user_query").count(), 1);
    assert_eq!(parse(&twice)["runflow"]["user_query"].as_str(), Some("second"));
}
