use core::fmt;

use crate::errors::{Diagnostic, Severity};
use crate::parser::{Rule, Span};

/// A syntax error reported by the parse front end.
///
/// Displays as `(line L, col C): message`, the form shown next to a lever's
/// script editor.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub span: Span,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: usize, column: usize, span: Span, message: String) -> Self {
        Self {
            line,
            column,
            span,
            message,
        }
    }

    /// Convert to a Diagnostic for API boundary
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic {
            severity: Severity::Error,
            message: self.message.clone(),
            span: Some(self.span.clone()),
            help: None,
            code: Some("P001".to_string()),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(line {}, col {}): {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for SyntaxError {}

/// Convert Pest error to human-readable SyntaxError
pub fn convert_pest_error(err: pest::error::Error<Rule>) -> SyntaxError {
    use pest::error::{ErrorVariant, InputLocation, LineColLocation};

    let span = match err.location {
        InputLocation::Pos(pos) => Span(pos..pos),
        InputLocation::Span((start, end)) => Span(start..end),
    };
    let (line, column) = match err.line_col {
        LineColLocation::Pos(pos) => pos,
        LineColLocation::Span(start, _) => start,
    };

    let message = match err.variant {
        ErrorVariant::ParsingError {
            positives,
            negatives,
        } => {
            let expected = format_expected_rules(&positives);
            if negatives.is_empty() {
                format!("expected {}", expected)
            } else {
                format!(
                    "expected {}, found {}",
                    expected,
                    format_found_rules(&negatives)
                )
            }
        }
        ErrorVariant::CustomError { message } => message,
    };

    SyntaxError::new(line, column, span, message)
}

/// Format expected rules in a human-readable way
fn format_expected_rules(rules: &[Rule]) -> String {
    if rules.is_empty() {
        return "something else".to_string();
    }

    // Group related rules into higher-level concepts
    let mut concepts: Vec<&str> = Vec::new();
    for rule in rules {
        let concept = describe_rule(*rule);
        if !concepts.contains(&concept) {
            concepts.push(concept);
        }
    }

    match concepts.split_last() {
        Some((last, [])) => last.to_string(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
        None => "something else".to_string(),
    }
}

/// Format found rules in a human-readable way
fn format_found_rules(rules: &[Rule]) -> String {
    match rules.first() {
        Some(rule) => describe_rule(*rule).to_string(),
        None => "unexpected token".to_string(),
    }
}

fn describe_rule(rule: Rule) -> &'static str {
    match rule {
        Rule::identifier | Rule::ident_part => "identifier",
        Rule::number | Rule::unsigned | Rule::sign => "number",
        Rule::EOI => "end of input",
        Rule::add | Rule::sub | Rule::mul | Rule::div | Rule::pow => "operator",
        Rule::eq | Rule::neq | Rule::lt | Rule::gt | Rule::lte | Rule::gte => "comparison",
        Rule::definition
        | Rule::assignment
        | Rule::limit
        | Rule::distribute
        | Rule::change
        | Rule::inspect => "statement",
        Rule::proportionally | Rule::linearly => "proportionally or linearly",
        Rule::target => "distribution target",
        Rule::kw_if => "if",
        Rule::kw_else => "else",
        Rule::kw_to => "to",
        Rule::kw_of => "of",
        Rule::kw_by => "by",
        Rule::kw_over => "over",
        Rule::kw_across => "across",
        _ => "expression",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display() {
        let error = SyntaxError::new(2, 7, Span::new(10, 11), "expected ;".to_string());
        assert_eq!(error.to_string(), "(line 2, col 7): expected ;");
    }

    #[test]
    fn test_format_expected_rules_groups_concepts() {
        let rules = vec![Rule::number, Rule::unsigned, Rule::identifier];
        assert_eq!(format_expected_rules(&rules), "number or identifier");
    }

    #[test]
    fn test_format_expected_rules_single() {
        assert_eq!(format_expected_rules(&[Rule::EOI]), "end of input");
    }

    #[test]
    fn test_syntax_error_to_diagnostic() {
        let error = SyntaxError::new(1, 1, Span::new(0, 1), "expected statement".to_string());
        let diagnostic = error.to_diagnostic();
        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.code, Some("P001".to_string()));
        assert_eq!(diagnostic.span, Some(Span::new(0, 1)));
    }
}
