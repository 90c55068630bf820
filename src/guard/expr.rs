//! Role-guard boolean expressions.
//!
//! ```text
//! expr   = term *( OR term )
//! term   = factor *( AND factor )
//! factor = "(" expr ")" / role
//! OR     = "," / "|" / "||"
//! AND    = "&" / "&&"
//! role   = 1*( any char except whitespace , | & ( ) )
//! ```
//!
//! AND binds tighter than OR. A role token containing `*` or `?` is a glob and
//! is only legal when a declared-roles universe is supplied; it is resolved at
//! compile time to the declared roles it matches.

use regex::Regex;
use std::collections::HashSet;
use std::fmt;

/// Caller roles as supplied by the authentication layer
pub type RoleSet = HashSet<String>;

/// Error produced by the role-guard compiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardParseError {
    /// A token appeared where it is not allowed
    UnexpectedToken {
        /// The expression
        expr: String,
        /// Byte offset of the token
        position: usize,
        /// The token text
        found: String,
    },
    /// The expression ended where an operand was expected
    UnexpectedEnd {
        /// The expression
        expr: String,
    },
    /// A `(` was never closed
    UnclosedParen {
        /// The expression
        expr: String,
    },
    /// A glob token was used without a declared-roles universe
    GlobWithoutUniverse {
        /// The expression
        expr: String,
        /// The glob token
        token: String,
    },
    /// A glob token could not be compiled
    InvalidPattern {
        /// The glob token
        token: String,
        /// Compiler message
        message: String,
    },
}

impl fmt::Display for GuardParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardParseError::UnexpectedToken {
                expr,
                position,
                found,
            } => write!(f, "unexpected '{found}' at offset {position} in '{expr}'"),
            GuardParseError::UnexpectedEnd { expr } => {
                write!(f, "'{expr}' ends where a role or '(' was expected")
            }
            GuardParseError::UnclosedParen { expr } => write!(f, "unclosed '(' in '{expr}'"),
            GuardParseError::GlobWithoutUniverse { expr, token } => write!(
                f,
                "pattern '{token}' in '{expr}' requires a declared roles list"
            ),
            GuardParseError::InvalidPattern { token, message } => {
                write!(f, "pattern '{token}' cannot be compiled: {message}")
            }
        }
    }
}

impl std::error::Error for GuardParseError {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Or,
    And,
    Open,
    Close,
    Role(&'a str),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Or => f.write_str("|"),
            Token::And => f.write_str("&"),
            Token::Open => f.write_str("("),
            Token::Close => f.write_str(")"),
            Token::Role(r) => f.write_str(r),
        }
    }
}

fn tokenize(expr: &str) -> Vec<(usize, Token<'_>)> {
    let bytes = expr.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'(' => {
                tokens.push((i, Token::Open));
                i += 1;
            }
            b')' => {
                tokens.push((i, Token::Close));
                i += 1;
            }
            b',' => {
                tokens.push((i, Token::Or));
                i += 1;
            }
            b'|' | b'&' => {
                let tok = if c == b'|' { Token::Or } else { Token::And };
                tokens.push((i, tok));
                i += if bytes.get(i + 1) == Some(&c) { 2 } else { 1 };
            }
            _ => {
                let start = i;
                while i < bytes.len()
                    && !matches!(
                        bytes[i],
                        b' ' | b'\t' | b'\r' | b'\n' | b'(' | b')' | b',' | b'|' | b'&'
                    )
                {
                    i += 1;
                }
                tokens.push((start, Token::Role(&expr[start..i])));
            }
        }
    }
    tokens
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Or(Vec<Node>),
    And(Vec<Node>),
    Role(String),
    /// A glob resolved against the declared universe
    AnyOf(Vec<String>),
}

impl Node {
    fn eval(&self, roles: &RoleSet) -> bool {
        match self {
            Node::Or(nodes) => nodes.iter().any(|n| n.eval(roles)),
            Node::And(nodes) => nodes.iter().all(|n| n.eval(roles)),
            Node::Role(role) => roles.contains(role),
            Node::AnyOf(declared) => declared.iter().any(|r| roles.contains(r)),
        }
    }
}

struct Parser<'a, 'u> {
    expr: &'a str,
    tokens: Vec<(usize, Token<'a>)>,
    pos: usize,
    universe: Option<&'u [String]>,
}

impl<'a> Parser<'a, '_> {
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn unexpected(&self) -> GuardParseError {
        match self.tokens.get(self.pos) {
            Some((position, tok)) => GuardParseError::UnexpectedToken {
                expr: self.expr.to_string(),
                position: *position,
                found: tok.to_string(),
            },
            None => GuardParseError::UnexpectedEnd {
                expr: self.expr.to_string(),
            },
        }
    }

    fn parse_or(&mut self) -> Result<Node, GuardParseError> {
        let mut nodes = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            nodes.push(self.parse_and()?);
        }
        Ok(if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Node::Or(nodes)
        })
    }

    fn parse_and(&mut self) -> Result<Node, GuardParseError> {
        let mut nodes = vec![self.parse_factor()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            nodes.push(self.parse_factor()?);
        }
        Ok(if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Node::And(nodes)
        })
    }

    fn parse_factor(&mut self) -> Result<Node, GuardParseError> {
        match self.peek() {
            Some(Token::Open) => {
                self.pos += 1;
                let node = self.parse_or()?;
                match self.peek() {
                    Some(Token::Close) => {
                        self.pos += 1;
                        Ok(node)
                    }
                    Some(_) => Err(self.unexpected()),
                    None => Err(GuardParseError::UnclosedParen {
                        expr: self.expr.to_string(),
                    }),
                }
            }
            Some(Token::Role(role)) => {
                let role = *role;
                self.pos += 1;
                self.role_node(role)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn role_node(&self, role: &str) -> Result<Node, GuardParseError> {
        if !role.contains(['*', '?']) {
            return Ok(Node::Role(role.to_string()));
        }
        let Some(universe) = self.universe else {
            return Err(GuardParseError::GlobWithoutUniverse {
                expr: self.expr.to_string(),
                token: role.to_string(),
            });
        };
        let re = glob_to_regex(role).map_err(|e| GuardParseError::InvalidPattern {
            token: role.to_string(),
            message: e.to_string(),
        })?;
        Ok(Node::AnyOf(
            universe.iter().filter(|r| re.is_match(r)).cloned().collect(),
        ))
    }
}

fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::with_capacity(glob.len() + 8);
    pattern.push('^');
    let mut buf = [0u8; 4];
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    pattern.push('$');
    Regex::new(&pattern)
}

/// A compiled role-guard expression
///
/// An empty expression evaluates to `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleExpression {
    raw: String,
    root: Option<Node>,
}

impl RoleExpression {
    /// Compile an expression that may only use exact role names
    ///
    /// # Errors
    ///
    /// Returns a [`GuardParseError`] for syntax errors or glob tokens.
    pub fn parse(expr: &str) -> Result<Self, GuardParseError> {
        Self::compile(expr, None)
    }

    /// Compile an expression, resolving glob tokens against `declared` roles
    ///
    /// # Errors
    ///
    /// Returns a [`GuardParseError`] for syntax errors, or for glob tokens
    /// when `declared` is `None`.
    pub fn compile(expr: &str, declared: Option<&[String]>) -> Result<Self, GuardParseError> {
        let tokens = tokenize(expr);
        if tokens.is_empty() {
            return Ok(Self {
                raw: expr.to_string(),
                root: None,
            });
        }
        let mut parser = Parser {
            expr,
            tokens,
            pos: 0,
            universe: declared,
        };
        let root = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            return Err(parser.unexpected());
        }
        Ok(Self {
            raw: expr.to_string(),
            root: Some(root),
        })
    }

    /// The expression as declared
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `true` if the expression has no operands (and therefore never passes)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Evaluate against the caller's roles
    #[must_use]
    pub fn evaluate(&self, roles: &RoleSet) -> bool {
        self.root.as_ref().is_some_and(|root| root.eval(roles))
    }
}

impl fmt::Display for RoleExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(list: &[&str]) -> RoleSet {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_or_and_precedence() {
        let expr = RoleExpression::parse("ROLE_ADMIN || (ROLE_READ_WRITE && ROLE_SPECIAL)").unwrap();
        assert!(expr.evaluate(&roles(&["ROLE_ADMIN"])));
        assert!(expr.evaluate(&roles(&["ROLE_READ_WRITE", "ROLE_SPECIAL"])));
        assert!(!expr.evaluate(&roles(&["ROLE_READ_WRITE"])));
        assert!(!expr.evaluate(&roles(&[])));
    }

    #[test]
    fn test_and_binds_tighter_without_parens() {
        let expr = RoleExpression::parse("a | b & c").unwrap();
        assert!(expr.evaluate(&roles(&["a"])));
        assert!(!expr.evaluate(&roles(&["b"])));
        assert!(expr.evaluate(&roles(&["b", "c"])));
    }

    #[test]
    fn test_all_operator_spellings() {
        let expr = RoleExpression::parse("a,b").unwrap();
        assert!(expr.evaluate(&roles(&["b"])));
        let expr = RoleExpression::parse("a|b").unwrap();
        assert!(expr.evaluate(&roles(&["a"])));
        let expr = RoleExpression::parse("a&b").unwrap();
        assert!(!expr.evaluate(&roles(&["a"])));
        let expr = RoleExpression::parse("a&&b").unwrap();
        assert!(expr.evaluate(&roles(&["a", "b"])));
    }

    #[test]
    fn test_empty_expression_is_false() {
        let expr = RoleExpression::parse("").unwrap();
        assert!(expr.is_empty());
        assert!(!expr.evaluate(&roles(&["anything"])));
        let expr = RoleExpression::parse("   ").unwrap();
        assert!(!expr.evaluate(&roles(&[""])));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            RoleExpression::parse("a ||"),
            Err(GuardParseError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            RoleExpression::parse("(a | b"),
            Err(GuardParseError::UnclosedParen { .. })
        ));
        assert!(matches!(
            RoleExpression::parse("a | b)"),
            Err(GuardParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            RoleExpression::parse("a b"),
            Err(GuardParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            RoleExpression::parse("& a"),
            Err(GuardParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            RoleExpression::parse("()"),
            Err(GuardParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_glob_requires_universe() {
        assert!(matches!(
            RoleExpression::parse("ROLE_*"),
            Err(GuardParseError::GlobWithoutUniverse { .. })
        ));
    }

    #[test]
    fn test_glob_resolves_against_universe() {
        let declared = vec![
            "ROLE_ADMIN".to_string(),
            "ROLE_AUDIT".to_string(),
            "USER".to_string(),
        ];
        let expr = RoleExpression::compile("ROLE_A*", Some(&declared)).unwrap();
        assert!(expr.evaluate(&roles(&["ROLE_AUDIT"])));
        assert!(!expr.evaluate(&roles(&["USER"])));
        // Undeclared roles never satisfy a glob, even if they match the pattern
        assert!(!expr.evaluate(&roles(&["ROLE_ANYTHING"])));

        let expr = RoleExpression::compile("USE?", Some(&declared)).unwrap();
        assert!(expr.evaluate(&roles(&["USER"])));
    }

    #[test]
    fn test_glob_with_no_declared_match_is_false() {
        let declared = vec!["USER".to_string()];
        let expr = RoleExpression::compile("ADMIN_*", Some(&declared)).unwrap();
        assert!(!expr.evaluate(&roles(&["USER", "ADMIN_X"])));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        let declared = vec!["a.b".to_string(), "axb".to_string()];
        let expr = RoleExpression::compile("a.*", Some(&declared)).unwrap();
        assert!(expr.evaluate(&roles(&["a.b"])));
        assert!(!expr.evaluate(&roles(&["axb"])));
    }
}
