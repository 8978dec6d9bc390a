//! End-to-end compilation of filter values as they arrive from a form or a
//! persisted list state.

use dina_filter::{
    compile, compile_model, FieldUpdate, FilterAttribute, FilterModel, FilterTree, GroupOperator,
    Predicate, RsqlCompiler, SearchType,
};
use pretty_assertions::assert_eq;

fn parse(json: &str) -> FilterModel {
    serde_json::from_str(json).expect("valid filter model")
}

#[test]
fn test_mixed_groups_compile_with_parentheses() {
    let model = parse(
        r#"{
            "type": "FILTER_GROUP", "id": 6, "operator": "AND",
            "children": [
                {
                    "type": "FILTER_GROUP", "id": 4, "operator": "OR",
                    "children": [
                        {"type": "FILTER_ROW", "id": 1, "attribute": "name",
                         "predicate": "IS", "searchType": "EXACT_MATCH", "value": "101F"},
                        {"type": "FILTER_ROW", "id": 3, "attribute": "group.groupName",
                         "predicate": "IS", "searchType": "EXACT_MATCH", "value": "poffm"}
                    ]
                },
                {"type": "FILTER_ROW", "id": 5, "attribute": "name",
                 "predicate": "IS NOT", "searchType": "EXACT_MATCH", "value": "1075R"}
            ]
        }"#,
    );

    assert_eq!(
        compile_model(&model, &[]),
        "(name==101F,group.groupName==poffm);name!=1075R"
    );
}

#[test]
fn test_no_filter_compiles_to_empty_string() {
    assert_eq!(compile(None), "");
}

#[test]
fn test_blank_values_are_left_out() {
    let model = FilterModel::group(
        GroupOperator::And,
        vec![
            FilterModel::row("name", Predicate::Is, SearchType::PartialMatch, ""),
            FilterModel::row("name", Predicate::Is, SearchType::ExactMatch, "x"),
        ],
    );
    assert_eq!(compile_model(&model, &[]), "name==x");
}

#[test]
fn test_groups_with_only_blank_values_disappear() {
    let model = FilterModel::group(
        GroupOperator::And,
        vec![
            FilterModel::group(
                GroupOperator::Or,
                vec![
                    FilterModel::row("name", Predicate::Is, SearchType::PartialMatch, ""),
                    FilterModel::row("remarks", Predicate::Is, SearchType::ExactMatch, ""),
                ],
            ),
            FilterModel::row("name", Predicate::IsNot, SearchType::ExactMatch, "1075R"),
        ],
    );
    assert_eq!(compile_model(&model, &[]), "name!=1075R");

    let all_blank = FilterModel::group(
        GroupOperator::Or,
        vec![FilterModel::row("name", Predicate::Is, SearchType::PartialMatch, "")],
    );
    assert_eq!(compile_model(&all_blank, &[]), "");
}

#[test]
fn test_default_tree_compiles_to_empty_string() {
    let tree = FilterTree::new(&["name"]);
    assert_eq!(compile(Some(&tree)), "");
}

#[test]
fn test_tree_edited_into_nested_expression() {
    let attributes = vec![
        FilterAttribute::text("name"),
        FilterAttribute::date("createdOn"),
    ];
    let mut tree = FilterTree::new(&attributes);
    let first = tree.predicates()[0].id;
    tree.update_field(first, FieldUpdate::Value("101F".into()))
        .unwrap();

    let second = tree.insert_after(first, GroupOperator::Or).unwrap();
    tree.update_field(second, FieldUpdate::Value("102F".into()))
        .unwrap();

    let root = tree.root_id();
    let third = tree.insert_after(root, GroupOperator::And).unwrap();
    tree.update_field(third, FieldUpdate::Attribute("createdOn".into()))
        .unwrap();
    tree.update_field(third, FieldUpdate::Predicate(Predicate::From))
        .unwrap();
    tree.update_field(third, FieldUpdate::Value("2021-03-01".into()))
        .unwrap();

    assert_eq!(
        RsqlCompiler::new(attributes).compile(Some(&tree)),
        "(name==*101F*,name==*102F*);createdOn=ge=2021-03-01T00:00:00+00:00"
    );
}

#[test]
fn test_range_attributes_from_configuration() {
    let attributes: Vec<FilterAttribute> = serde_json::from_str(
        r#"[{"name": "number", "label": "Number", "allowRange": true}]"#,
    )
    .unwrap();
    let model = FilterModel::group(
        GroupOperator::And,
        vec![FilterModel::row(
            "number",
            Predicate::Is,
            SearchType::PartialMatch,
            "1-3",
        )],
    );
    assert_eq!(
        compile_model(&model, &attributes),
        "number=ge=1;number=le=3"
    );
}
