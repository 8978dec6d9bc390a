//! RSQL expression types and rendering.
//!
//! Groups join their operands with `;` (AND) or `,` (OR). A nested group is
//! parenthesized when both it and its parent have more than one operand.

use std::borrow::Cow;
use std::fmt;

use crate::tree::GroupOperator;

/// Characters that force an argument to be quoted.
const RESERVED: &[char] = &['"', '\'', '(', ')', ';', ',', '=', '!', '~', '<', '>'];

/// RSQL comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Out,
}

impl Comparison {
    /// The operator's RSQL spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
            Comparison::Lt => "=lt=",
            Comparison::Le => "=le=",
            Comparison::Gt => "=gt=",
            Comparison::Ge => "=ge=",
            Comparison::In => "=in=",
            Comparison::Out => "=out=",
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arguments {
    Single(String),
    List(Vec<String>),
}

/// A compiled RSQL expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RsqlExpr {
    /// `selector<op>arguments`
    Comparison {
        selector: String,
        comparison: Comparison,
        arguments: Arguments,
    },
    /// Operands joined by one boolean operator.
    Group {
        operator: GroupOperator,
        operands: Vec<RsqlExpr>,
    },
}

impl RsqlExpr {
    /// Create a single-argument comparison.
    pub fn compare(
        selector: impl Into<String>,
        comparison: Comparison,
        argument: impl Into<String>,
    ) -> Self {
        RsqlExpr::Comparison {
            selector: selector.into(),
            comparison,
            arguments: Arguments::Single(argument.into()),
        }
    }

    /// Create a list comparison (`=in=` / `=out=`).
    pub fn list(selector: impl Into<String>, comparison: Comparison, values: Vec<String>) -> Self {
        RsqlExpr::Comparison {
            selector: selector.into(),
            comparison,
            arguments: Arguments::List(values),
        }
    }

    /// Combine operands, returning the single operand unwrapped and `None`
    /// when there is nothing to combine.
    pub fn combine(operator: GroupOperator, mut operands: Vec<RsqlExpr>) -> Option<Self> {
        match operands.len() {
            0 => None,
            1 => operands.pop(),
            _ => Some(RsqlExpr::Group { operator, operands }),
        }
    }

    fn operand_count(&self) -> usize {
        match self {
            RsqlExpr::Comparison { .. } => 1,
            RsqlExpr::Group { operands, .. } => operands.len(),
        }
    }
}

impl fmt::Display for RsqlExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RsqlExpr::Comparison {
                selector,
                comparison,
                arguments,
            } => {
                write!(f, "{}{}", selector, comparison.as_str())?;
                match arguments {
                    Arguments::Single(arg) => write!(f, "{}", quote_argument(arg)),
                    Arguments::List(args) => {
                        let quoted: Vec<Cow<'_, str>> =
                            args.iter().map(|a| quote_argument(a)).collect();
                        write!(f, "({})", quoted.join(","))
                    }
                }
            }
            RsqlExpr::Group { operator, operands } => {
                let separator = match operator {
                    GroupOperator::And => ";",
                    GroupOperator::Or => ",",
                };
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(separator)?;
                    }
                    if operand.operand_count() > 1 && operands.len() > 1 {
                        write!(f, "({})", operand)?;
                    } else {
                        write!(f, "{}", operand)?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Quote an argument when it is empty or contains reserved characters.
pub fn quote_argument(arg: &str) -> Cow<'_, str> {
    let needs_quotes =
        arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || RESERVED.contains(&c));
    if needs_quotes {
        let escaped = arg.replace('\\', "\\\\").replace('\'', "\\'");
        Cow::Owned(format!("'{}'", escaped))
    } else {
        Cow::Borrowed(arg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_comparison() {
        let expr = RsqlExpr::compare("name", Comparison::Eq, "*101F*");
        assert_eq!(expr.to_string(), "name==*101F*");

        let expr = RsqlExpr::compare("date", Comparison::Ge, "2020-10-06T00:00:00+00:00");
        assert_eq!(expr.to_string(), "date=ge=2020-10-06T00:00:00+00:00");
    }

    #[test]
    fn test_render_list() {
        let expr = RsqlExpr::list("number", Comparison::Out, vec!["10".into(), "90".into()]);
        assert_eq!(expr.to_string(), "number=out=(10,90)");
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_argument(""), "''");
        assert_eq!(quote_argument("abc"), "abc");
        assert_eq!(quote_argument("a b"), "'a b'");
        assert_eq!(quote_argument("it's"), "'it\\'s'");
        assert_eq!(quote_argument("a;b"), "'a;b'");
    }

    #[test]
    fn test_nested_groups_are_parenthesized() {
        let inner = RsqlExpr::Group {
            operator: GroupOperator::Or,
            operands: vec![
                RsqlExpr::compare("name", Comparison::Eq, "101F"),
                RsqlExpr::compare("group.groupName", Comparison::Eq, "poffm"),
            ],
        };
        let outer = RsqlExpr::Group {
            operator: GroupOperator::And,
            operands: vec![inner.clone(), RsqlExpr::compare("name", Comparison::Ne, "1075R")],
        };
        assert_eq!(
            outer.to_string(),
            "(name==101F,group.groupName==poffm);name!=1075R"
        );
        assert_eq!(inner.to_string(), "name==101F,group.groupName==poffm");
    }

    #[test]
    fn test_combine() {
        assert_eq!(RsqlExpr::combine(GroupOperator::And, vec![]), None);
        let single = RsqlExpr::compare("a", Comparison::Eq, "b");
        assert_eq!(
            RsqlExpr::combine(GroupOperator::And, vec![single.clone()]),
            Some(single)
        );
    }
}
