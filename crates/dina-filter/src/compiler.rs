//! Compiler from filter trees to RSQL.
//!
//! Compilation never fails. Predicates that cannot produce a comparison
//! (blank values, unparseable dates, malformed ranges) are left out, and a
//! group whose operands were all left out disappears with them.

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, SecondsFormat, TimeZone, Utc,
};
use tracing::debug;

use crate::attribute::{AttributeKind, FilterAttribute};
use crate::rsql::{Comparison, RsqlExpr};
use crate::tree::{FilterNode, FilterTree, GroupNode, GroupOperator, Predicate, PredicateNode, SearchType};

/// Compiler for filter trees.
#[derive(Debug, Clone)]
pub struct RsqlCompiler {
    attributes: Vec<FilterAttribute>,
    offset: FixedOffset,
}

impl Default for RsqlCompiler {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl RsqlCompiler {
    /// Create a compiler that knows about the given attributes. Attributes it
    /// does not know are compiled as free text.
    pub fn new(attributes: Vec<FilterAttribute>) -> Self {
        Self {
            attributes,
            offset: Utc.fix(),
        }
    }

    /// Set the UTC offset day boundaries are computed in.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Compile a tree to an RSQL string. No tree compiles to `""`.
    pub fn compile(&self, tree: Option<&FilterTree>) -> String {
        tree.and_then(|t| self.compile_expr(t))
            .map(|expr| expr.to_string())
            .unwrap_or_default()
    }

    /// Compile a tree to an RSQL expression, `None` when nothing survives.
    pub fn compile_expr(&self, tree: &FilterTree) -> Option<RsqlExpr> {
        self.compile_group(tree, tree.root())
    }

    fn compile_group(&self, tree: &FilterTree, group: &GroupNode) -> Option<RsqlExpr> {
        let operands = group
            .children
            .iter()
            .filter_map(|id| match tree.node(*id)? {
                FilterNode::Predicate(p) => self.compile_predicate(p),
                FilterNode::Group(g) => self.compile_group(tree, g),
            })
            .collect();
        RsqlExpr::combine(group.operator, operands)
    }

    fn compile_predicate(&self, predicate: &PredicateNode) -> Option<RsqlExpr> {
        let selector = predicate.attribute.as_str();

        if predicate.search_type == SearchType::BlankField {
            return Some(blank_field(selector, predicate.predicate));
        }
        if predicate.value.is_empty() {
            return None;
        }

        let attribute = self.attributes.iter().find(|a| a.name == selector);
        let kind = attribute.map(|a| a.kind).unwrap_or_default();

        match attribute {
            Some(a) if kind != AttributeKind::Date && (a.allow_range || a.allow_list) => {
                list_or_range(a, predicate)
            }
            _ => match kind {
                AttributeKind::Date => self.date(selector, predicate),
                AttributeKind::Dropdown => Some(RsqlExpr::compare(
                    selector,
                    comparison_for(predicate.predicate),
                    predicate.value.clone(),
                )),
                AttributeKind::Text => Some(text(selector, predicate)),
            },
        }
    }

    fn date(&self, selector: &str, predicate: &PredicateNode) -> Option<RsqlExpr> {
        let Some(day) = self.parse_day(&predicate.value) else {
            debug!(
                attribute = selector,
                value = %predicate.value,
                "dropping date predicate with unparseable value"
            );
            return None;
        };

        let start = self.timestamp(day.and_hms_opt(0, 0, 0)?)?;
        let end = self.timestamp(day.and_hms_opt(23, 59, 59)?)?;

        Some(match predicate.predicate {
            Predicate::Is => between(selector, start, end, true),
            Predicate::IsNot => between(selector, start, end, false),
            Predicate::From => RsqlExpr::compare(selector, Comparison::Ge, start),
            Predicate::Until => RsqlExpr::compare(selector, Comparison::Le, end),
        })
    }

    fn parse_day(&self, value: &str) -> Option<NaiveDate> {
        let value = value.trim();
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(value)
                    .ok()
                    .map(|dt| dt.with_timezone(&self.offset).date_naive())
            })
    }

    fn timestamp(&self, naive: NaiveDateTime) -> Option<String> {
        self.offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, false))
    }
}

/// Compile a tree with no attribute configuration.
pub fn compile(tree: Option<&FilterTree>) -> String {
    RsqlCompiler::default().compile(tree)
}

fn comparison_for(predicate: Predicate) -> Comparison {
    match predicate {
        Predicate::Is => Comparison::Eq,
        Predicate::IsNot => Comparison::Ne,
        Predicate::From => Comparison::Ge,
        Predicate::Until => Comparison::Le,
    }
}

fn text(selector: &str, predicate: &PredicateNode) -> RsqlExpr {
    let comparison = comparison_for(predicate.predicate);
    let value = match (predicate.search_type, comparison) {
        (SearchType::PartialMatch, Comparison::Eq | Comparison::Ne) => {
            format!("*{}*", predicate.value)
        }
        _ => predicate.value.clone(),
    };
    RsqlExpr::compare(selector, comparison, value)
}

/// A blank field is either null or the empty string.
fn blank_field(selector: &str, predicate: Predicate) -> RsqlExpr {
    let (comparison, operator) = match predicate {
        Predicate::IsNot => (Comparison::Ne, GroupOperator::And),
        _ => (Comparison::Eq, GroupOperator::Or),
    };
    RsqlExpr::Group {
        operator,
        operands: vec![
            RsqlExpr::compare(selector, comparison, "null"),
            RsqlExpr::compare(selector, comparison, ""),
        ],
    }
}

fn list_or_range(attribute: &FilterAttribute, predicate: &PredicateNode) -> Option<RsqlExpr> {
    let selector = attribute.name.as_str();
    let negated = predicate.predicate == Predicate::IsNot;
    let parts: Vec<&str> = predicate
        .value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let (singles, ranges): (Vec<&str>, Vec<&str>) = if attribute.allow_range {
        parts.into_iter().partition(|p| !p.contains('-'))
    } else {
        (parts, Vec::new())
    };

    let mut operands = Vec::new();
    if !singles.is_empty() {
        let comparison = if negated {
            Comparison::Out
        } else {
            Comparison::In
        };
        operands.push(RsqlExpr::list(
            selector,
            comparison,
            singles.into_iter().map(String::from).collect(),
        ));
    }

    for range in ranges {
        let Some((a, b)) = range.split_once('-') else {
            continue;
        };
        let (a, b) = (a.trim(), b.trim());
        if a.is_empty() || b.is_empty() {
            debug!(attribute = selector, range, "dropping malformed range");
            continue;
        }
        let (low, high) = order_numerically(a, b);
        operands.push(between(selector, low.to_string(), high.to_string(), !negated));
    }

    let operator = if negated {
        GroupOperator::And
    } else {
        GroupOperator::Or
    };
    RsqlExpr::combine(operator, operands)
}

fn order_numerically<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) if y < x => (b, a),
        (Ok(_), Ok(_)) => (a, b),
        _ if b < a => (b, a),
        _ => (a, b),
    }
}

/// Inside `[low, high]` when `positive`, outside it otherwise.
fn between(selector: &str, low: String, high: String, positive: bool) -> RsqlExpr {
    if positive {
        RsqlExpr::Group {
            operator: GroupOperator::And,
            operands: vec![
                RsqlExpr::compare(selector, Comparison::Ge, low),
                RsqlExpr::compare(selector, Comparison::Le, high),
            ],
        }
    } else {
        RsqlExpr::Group {
            operator: GroupOperator::Or,
            operands: vec![
                RsqlExpr::compare(selector, Comparison::Lt, low),
                RsqlExpr::compare(selector, Comparison::Gt, high),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FilterModel;
    use pretty_assertions::assert_eq;

    fn row(attribute: &str, predicate: Predicate, search_type: SearchType, value: &str) -> FilterModel {
        FilterModel::row(attribute, predicate, search_type, value)
    }

    fn and(children: Vec<FilterModel>) -> FilterModel {
        FilterModel::group(GroupOperator::And, children)
    }

    fn compile_with(attributes: Vec<FilterAttribute>, model: FilterModel) -> String {
        let tree = FilterTree::from_model(&model, "name");
        RsqlCompiler::new(attributes).compile(Some(&tree))
    }

    #[test]
    fn test_compile_none() {
        assert_eq!(compile(None), "");
    }

    #[test]
    fn test_partial_match_adds_wildcards() {
        let model = and(vec![row("name", Predicate::Is, SearchType::PartialMatch, "101F")]);
        assert_eq!(compile_with(vec![], model), "name==*101F*");
    }

    #[test]
    fn test_exact_match_keeps_value() {
        let model = and(vec![row("name", Predicate::Is, SearchType::ExactMatch, "101F")]);
        assert_eq!(compile_with(vec![], model), "name==101F");
    }

    #[test]
    fn test_blank_field() {
        let model = and(vec![row(
            "description",
            Predicate::Is,
            SearchType::BlankField,
            "ignored",
        )]);
        assert_eq!(
            compile_with(vec![], model),
            "description==null,description==''"
        );

        let model = and(vec![row(
            "description",
            Predicate::IsNot,
            SearchType::BlankField,
            "",
        )]);
        assert_eq!(
            compile_with(vec![], model),
            "description!=null;description!=''"
        );
    }

    #[test]
    fn test_list_and_range() {
        let number = FilterAttribute::text("number").with_range().with_list();
        let model = and(vec![row("number", Predicate::Is, SearchType::PartialMatch, "10,30-50,90")]);
        assert_eq!(
            compile_with(vec![number.clone()], model),
            "number=in=(10,90),(number=ge=30;number=le=50)"
        );

        let model = and(vec![row("number", Predicate::IsNot, SearchType::PartialMatch, "10,30-50,90")]);
        assert_eq!(
            compile_with(vec![number], model),
            "number=out=(10,90);(number=lt=30,number=gt=50)"
        );
    }

    #[test]
    fn test_list_without_range() {
        let number = FilterAttribute::text("number").with_list();
        let model = and(vec![row("number", Predicate::Is, SearchType::PartialMatch, "10,30-50,90")]);
        assert_eq!(compile_with(vec![number], model), "number=in=(10,30-50,90)");
    }

    #[test]
    fn test_backwards_range() {
        let number = FilterAttribute::text("number").with_range();
        let model = and(vec![row("number", Predicate::Is, SearchType::PartialMatch, "200-100")]);
        assert_eq!(compile_with(vec![number], model), "number=ge=100;number=le=200");
    }

    #[test]
    fn test_date_predicates() {
        let date = FilterAttribute::date("myDateField");
        let cases = [
            (
                Predicate::Is,
                "myDateField=ge=2020-10-06T00:00:00+00:00;myDateField=le=2020-10-06T23:59:59+00:00",
            ),
            (
                Predicate::IsNot,
                "myDateField=lt=2020-10-06T00:00:00+00:00,myDateField=gt=2020-10-06T23:59:59+00:00",
            ),
            (Predicate::From, "myDateField=ge=2020-10-06T00:00:00+00:00"),
            (Predicate::Until, "myDateField=le=2020-10-06T23:59:59+00:00"),
        ];

        for (predicate, expected) in cases {
            let model = and(vec![row("myDateField", predicate, SearchType::PartialMatch, "2020-10-06")]);
            assert_eq!(compile_with(vec![date.clone()], model), expected);
        }
    }

    #[test]
    fn test_date_from_rfc3339_in_offset() {
        let date = FilterAttribute::date("d");
        let tree = FilterTree::from_model(
            &and(vec![row("d", Predicate::From, SearchType::ExactMatch, "2020-10-06T20:14:30Z")]),
            "d",
        );
        let offset = FixedOffset::east_opt(5 * 3600).unwrap();
        let rsql = RsqlCompiler::new(vec![date])
            .with_utc_offset(offset)
            .compile(Some(&tree));
        assert_eq!(rsql, "d=ge=2020-10-07T00:00:00+05:00");
    }

    #[test]
    fn test_unparseable_date_is_dropped() {
        let date = FilterAttribute::date("d");
        let model = and(vec![
            row("d", Predicate::Is, SearchType::ExactMatch, "not a date"),
            row("name", Predicate::Is, SearchType::ExactMatch, "x"),
        ]);
        assert_eq!(compile_with(vec![date], model), "name==x");
    }

    #[test]
    fn test_dropdown_ignores_search_type() {
        let collection = FilterAttribute::dropdown("collection.uuid");
        let model = and(vec![row("collection.uuid", Predicate::Is, SearchType::PartialMatch, "abc-123")]);
        assert_eq!(compile_with(vec![collection], model), "collection.uuid==abc-123");
    }

    #[test]
    fn test_values_with_spaces_are_quoted() {
        let model = and(vec![row("name", Predicate::Is, SearchType::ExactMatch, "big tree")]);
        assert_eq!(compile_with(vec![], model), "name=='big tree'");
    }
}
