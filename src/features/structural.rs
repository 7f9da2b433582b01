//! Syntax-tree features using tree-sitter
//!
//! Parses Python source and counts the node kinds that separate plausible
//! code from fabricated code. A snippet that does not parse yields
//! [`StructuralOutcome::Unparsable`]; that is a signal, never an error.

use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Parser};

/// Default bound on traversal depth
pub const DEFAULT_MAX_TREE_DEPTH: usize = 1000;

/// Counts and depth derived from a parsed syntax tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralFeatures {
    pub parsable: bool,
    pub function_count: u32,
    pub class_count: u32,
    /// `import x` and `from x import y` together
    pub import_count: u32,
    /// Deepest named node below the root (root = 0)
    pub max_depth: u32,
    pub if_count: u32,
    pub for_count: u32,
    pub while_count: u32,
    pub call_count: u32,
    pub assign_count: u32,
    pub return_count: u32,
    /// Traversal hit the depth bound; counts cover only the visited part
    pub truncated: bool,
}

impl StructuralFeatures {
    /// The degenerate record for source that failed to parse
    pub fn unparsable() -> Self {
        Self::default()
    }

    /// Named numeric values, in a fixed order
    pub fn named_values(&self) -> Vec<(&'static str, f64)> {
        let mut values = self.base_values();
        values.extend([
            ("if_count", self.if_count as f64),
            ("for_count", self.for_count as f64),
            ("while_count", self.while_count as f64),
            ("call_count", self.call_count as f64),
            ("assign_count", self.assign_count as f64),
            ("return_count", self.return_count as f64),
        ]);
        values
    }

    fn base_values(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("parsable", if self.parsable { 1.0 } else { 0.0 }),
            ("function_count", self.function_count as f64),
            ("class_count", self.class_count as f64),
            ("import_count", self.import_count as f64),
            ("max_depth", self.max_depth as f64),
        ]
    }
}

/// Result of structural extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralOutcome {
    Parsed(StructuralFeatures),
    Unparsable,
}

impl StructuralOutcome {
    pub fn is_parsable(&self) -> bool {
        matches!(self, StructuralOutcome::Parsed(_))
    }

    /// Flat record; all zero with `parsable = false` when unparsable
    pub fn record(&self) -> StructuralFeatures {
        match self {
            StructuralOutcome::Parsed(features) => *features,
            StructuralOutcome::Unparsable => StructuralFeatures::unparsable(),
        }
    }

    /// Named numeric values for the vectorizer.
    ///
    /// An unparsable snippet only reports the five base keys; the per-kind
    /// counts are absent rather than zero.
    pub fn named_values(&self) -> Vec<(&'static str, f64)> {
        match self {
            StructuralOutcome::Parsed(features) => features.named_values(),
            StructuralOutcome::Unparsable => StructuralFeatures::unparsable().base_values(),
        }
    }
}

/// Node-kind categories that are counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KindCategory {
    Function,
    Class,
    Import,
    Conditional,
    ForLoop,
    WhileLoop,
    Call,
    Assignment,
    Return,
}

fn categorize(node: &Node, parent_kind: &str) -> Option<KindCategory> {
    match node.kind() {
        "function_definition" => Some(KindCategory::Function),
        "class_definition" => Some(KindCategory::Class),
        "import_statement" | "import_from_statement" | "future_import_statement" => {
            Some(KindCategory::Import)
        }
        "if_statement" | "elif_clause" => Some(KindCategory::Conditional),
        "for_statement" => Some(KindCategory::ForLoop),
        "while_statement" => Some(KindCategory::WhileLoop),
        "call" => Some(KindCategory::Call),
        // `x: int = 1` is an annotation, and `a = b = 1` is one binding
        "assignment"
            if parent_kind != "assignment" && node.child_by_field_name("type").is_none() =>
        {
            Some(KindCategory::Assignment)
        }
        "return_statement" => Some(KindCategory::Return),
        _ => None,
    }
}

/// Extracts [`StructuralFeatures`] from Python source
#[derive(Debug, Clone)]
pub struct StructuralExtractor {
    max_depth: usize,
}

impl StructuralExtractor {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_TREE_DEPTH,
        }
    }

    /// Override the traversal depth bound
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Parse `text` and count node kinds
    pub fn extract(&self, text: &str) -> StructuralOutcome {
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&tree_sitter_python::LANGUAGE.into()) {
            tracing::debug!("python grammar unavailable: {}", e);
            return StructuralOutcome::Unparsable;
        }

        let tree = match parser.parse(text, None) {
            Some(tree) => tree,
            None => return StructuralOutcome::Unparsable,
        };

        let root = tree.root_node();
        if root.has_error() {
            return StructuralOutcome::Unparsable;
        }
        if let Some(reason) = rejected_construct(root, text.as_bytes()) {
            tracing::debug!("tree accepted by recovery but not valid python 3: {}", reason);
            return StructuralOutcome::Unparsable;
        }

        StructuralOutcome::Parsed(self.walk(root))
    }

    /// Iterative pre-order walk over named nodes, bounded by `max_depth`
    fn walk(&self, root: Node) -> StructuralFeatures {
        let mut features = StructuralFeatures {
            parsable: true,
            ..Default::default()
        };
        let mut deepest = 0usize;
        let mut stack: Vec<(Node, usize, &'static str)> = vec![(root, 0, "")];

        while let Some((node, depth, parent_kind)) = stack.pop() {
            deepest = deepest.max(depth);

            match categorize(&node, parent_kind) {
                Some(KindCategory::Function) => features.function_count += 1,
                Some(KindCategory::Class) => features.class_count += 1,
                Some(KindCategory::Import) => features.import_count += 1,
                Some(KindCategory::Conditional) => features.if_count += 1,
                Some(KindCategory::ForLoop) => features.for_count += 1,
                Some(KindCategory::WhileLoop) => features.while_count += 1,
                Some(KindCategory::Call) => features.call_count += 1,
                Some(KindCategory::Assignment) => features.assign_count += 1,
                Some(KindCategory::Return) => features.return_count += 1,
                None => {}
            }

            if node.named_child_count() == 0 {
                continue;
            }
            if depth >= self.max_depth {
                features.truncated = true;
                continue;
            }

            let kind = node.kind();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                stack.push((child, depth + 1, kind));
            }
        }

        features.max_depth = u32::try_from(deepest).unwrap_or(u32::MAX);
        features
    }
}

/// Statements of a `module` or `block`, comments excluded
fn statements<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// Every statement that opens a new line must sit at the same column
fn misaligned(node: Node, statements: &[Node]) -> bool {
    let expected = match (node.kind(), statements.first()) {
        ("module", _) => 0,
        (_, Some(first)) => first.start_position().column,
        (_, None) => return false,
    };
    let mut prev_end_row: Option<usize> = None;
    for stmt in statements {
        let start = stmt.start_position();
        let opens_line = prev_end_row.is_none_or(|row| start.row > row);
        if opens_line && start.column != expected {
            return true;
        }
        prev_end_row = Some(stmt.end_position().row);
    }
    false
}

/// Constructs tree-sitter's error recovery accepts without an ERROR node
/// that Python 3 rejects. Full-tree walk on an explicit stack.
fn rejected_construct(root: Node, source: &[u8]) -> Option<&'static str> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "print_statement" | "exec_statement" => return Some("python 2 statement"),
            "module" | "block" => {
                let body = statements(node);
                if node.kind() == "block" && body.is_empty() {
                    return Some("empty block");
                }
                if misaligned(node, &body) {
                    return Some("inconsistent indentation");
                }
            }
            "identifier" if matches!(node.utf8_text(source), Ok("async" | "await")) => {
                return Some("keyword used as a name");
            }
            "for_in_clause" => {
                let mut cursor = node.walk();
                if node.children_by_field_name("right", &mut cursor).count() > 1 {
                    return Some("unparenthesized tuple in comprehension");
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    None
}

impl Default for StructuralExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract with the default depth bound
pub fn extract(text: &str) -> StructuralOutcome {
    StructuralExtractor::new().extract(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_function() {
        let outcome = extract("def add(a, b):\n    return a + b\n");
        let f = outcome.record();
        assert!(f.parsable);
        assert_eq!(f.function_count, 1);
        assert_eq!(f.class_count, 0);
        assert_eq!(f.import_count, 0);
        assert_eq!(f.return_count, 1);
        assert_eq!(f.call_count, 0);
        assert!(f.max_depth >= 3);
        assert!(!f.truncated);
    }

    #[test]
    fn test_syntax_error_is_unparsable() {
        let outcome = extract("def foo(:\n");
        assert_eq!(outcome, StructuralOutcome::Unparsable);
        let f = outcome.record();
        assert!(!f.parsable);
        assert_eq!(f.function_count, 0);
        assert_eq!(f.max_depth, 0);
        assert_eq!(f, StructuralFeatures::unparsable());
    }

    #[test]
    fn test_unindented_body_is_unparsable() {
        assert!(!extract("def f():\nreturn 1\n").is_parsable());
        assert!(!extract("class C:\n    # nothing here\n").is_parsable());
    }

    #[test]
    fn test_unexpected_indent_is_unparsable() {
        assert!(!extract("x = 1\n    y = 2\n").is_parsable());
        assert!(!extract("    x = 1\n").is_parsable());
        assert!(!extract("def f():\n    a = 1\n      b = 2\n").is_parsable());
    }

    #[test]
    fn test_python2_statements_are_unparsable() {
        assert!(!extract("print \"hello\"\n").is_parsable());
        assert!(!extract("exec \"code\"\n").is_parsable());
        assert!(extract("print(\"hello\")\n").is_parsable());
    }

    #[test]
    fn test_recovered_keyword_and_comprehension_errors() {
        assert!(!extract("async = 1\n").is_parsable());
        assert!(!extract("f(a for a in b, c)\n").is_parsable());
        assert!(extract("f(a for a in (b, c))\n").is_parsable());
    }

    #[test]
    fn test_valid_layouts_stay_parsable() {
        let code = "\
import os  # trailing
x = 1; y = 2
if x: z = 3
def f():
    # leading comment
    a = 1
    return a
class C:
    def m(self):
        pass
";
        assert!(extract(code).is_parsable());
    }

    #[test]
    fn test_imports_are_aggregated() {
        let code = "import os\nfrom collections import Counter\nimport math, sys\n";
        let f = extract(code).record();
        assert_eq!(f.import_count, 3);
    }

    #[test]
    fn test_class_and_method_counts() {
        let code = "class MyClass:\n    def __init__(self, x):\n        self.x = x\n    def get(self):\n        return self.x\n";
        let f = extract(code).record();
        assert_eq!(f.class_count, 1);
        assert_eq!(f.function_count, 2);
        assert_eq!(f.assign_count, 1);
        assert_eq!(f.return_count, 1);
    }

    #[test]
    fn test_control_flow_counts() {
        let code = "\
for i in range(3):
    if i > 1:
        print(i)
    elif i == 0:
        pass
while False:
    break
";
        let f = extract(code).record();
        assert_eq!(f.for_count, 1);
        assert_eq!(f.if_count, 2);
        assert_eq!(f.while_count, 1);
        assert_eq!(f.call_count, 2);
    }

    #[test]
    fn test_assignment_variants() {
        let f = extract("a = b = 1\nc: int = 2\nd += 3\ne = 4\n").record();
        assert_eq!(f.assign_count, 2);
    }

    #[test]
    fn test_empty_source_is_parsable() {
        let f = extract("").record();
        assert!(f.parsable);
        assert_eq!(f.max_depth, 0);
        assert_eq!(f.function_count, 0);
    }

    #[test]
    fn test_depth_bound_truncates() {
        let mut code = String::from("x = ");
        for _ in 0..50 {
            code.push('(');
        }
        code.push('1');
        for _ in 0..50 {
            code.push(')');
        }
        code.push('\n');

        let unbounded = extract(&code).record();
        assert!(unbounded.parsable);
        assert!(!unbounded.truncated);
        assert!(unbounded.max_depth > 10);

        let bounded = StructuralExtractor::new().with_max_depth(5).extract(&code).record();
        assert!(bounded.parsable);
        assert!(bounded.truncated);
        assert_eq!(bounded.max_depth, 5);
    }

    #[test]
    fn test_unparsable_named_values_only_base_keys() {
        let names: Vec<_> = StructuralOutcome::Unparsable
            .named_values()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(
            names,
            vec!["parsable", "function_count", "class_count", "import_count", "max_depth"]
        );

        let parsed = extract("x = 1\n").named_values();
        assert_eq!(parsed.len(), 11);
    }
}
