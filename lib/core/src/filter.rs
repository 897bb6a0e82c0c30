// Scalar filter expressions: parsing and evaluation against documents.
//
//   expr  := or
//   or    := and (("or" | "||") and)*
//   and   := unary (("and" | "&&") unary)*
//   unary := ("not" | "!") unary | "(" expr ")" | cmp
//   cmp   := ident op literal
//          | ident "is" ["not"] "null"
//          | ident ["not"] "in" "(" literal ("," literal)* ")"
use crate::{CollectionSchema, Doc, Error, Result, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn accepts(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    Compare { field: String, op: CompareOp, value: Literal },
    IsNull { field: String, negated: bool },
    In { field: String, values: Vec<Literal>, negated: bool },
    And(Vec<FilterCondition>),
    Or(Vec<FilterCondition>),
    Not(Box<FilterCondition>),
}

impl FilterCondition {
    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            FilterCondition::Compare { field, .. }
            | FilterCondition::IsNull { field, .. }
            | FilterCondition::In { field, .. } => out.push(field),
            FilterCondition::And(conds) | FilterCondition::Or(conds) => {
                conds.iter().for_each(|c| c.collect_fields(out))
            }
            FilterCondition::Not(cond) => cond.collect_fields(out),
        }
    }

    fn matches(&self, doc: &Doc) -> bool {
        match self {
            FilterCondition::Compare { field, op, value } => doc
                .get(field)
                .map(|v| any_element(v, |e| compare(e, value).map(|o| op.accepts(o)).unwrap_or(false)))
                .unwrap_or(false),
            FilterCondition::IsNull { field, negated } => doc.has_value(field) == *negated,
            FilterCondition::In { field, values, negated } => match doc.get(field) {
                Some(v) => {
                    let found = any_element(v, |e| {
                        values.iter().any(|lit| compare(e, lit) == Some(Ordering::Equal))
                    });
                    found != *negated
                }
                None => false,
            },
            FilterCondition::And(conds) => conds.iter().all(|c| c.matches(doc)),
            FilterCondition::Or(conds) => conds.iter().any(|c| c.matches(doc)),
            FilterCondition::Not(cond) => !cond.matches(doc),
        }
    }
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    condition: FilterCondition,
}

impl Filter {
    pub fn new(condition: FilterCondition) -> Self {
        Self { condition }
    }

    pub fn parse(expr: &str) -> Result<Self> {
        let tokens = tokenize(expr)?;
        if tokens.is_empty() {
            return Err(Error::InvalidArgument("filter expression is empty".to_string()));
        }
        let mut parser = Parser { tokens, pos: 0 };
        let condition = parser.parse_or()?;
        if let Some(tok) = parser.peek() {
            return Err(Error::InvalidArgument(format!(
                "unexpected token {:?} in filter",
                tok
            )));
        }
        Ok(Self { condition })
    }

    /// Parse and check every referenced field against `schema`.
    pub fn compile(expr: &str, schema: &CollectionSchema) -> Result<Self> {
        let filter = Self::parse(expr)?;
        filter.validate(schema)?;
        Ok(filter)
    }

    pub fn condition(&self) -> &FilterCondition {
        &self.condition
    }

    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.condition.collect_fields(&mut out);
        out
    }

    pub fn validate(&self, schema: &CollectionSchema) -> Result<()> {
        for name in self.fields() {
            match schema.field(name) {
                None => {
                    return Err(Error::InvalidArgument(format!(
                        "filter references unknown field '{}'",
                        name
                    )))
                }
                Some(f) if f.is_vector() => {
                    return Err(Error::InvalidArgument(format!(
                        "filter cannot reference vector field '{}'",
                        name
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    #[inline]
    pub fn matches(&self, doc: &Doc) -> bool {
        self.condition.matches(doc)
    }
}

/// Parse a single literal such as `42`, `'text'` or `true`.
pub fn parse_literal(expr: &str) -> Result<Literal> {
    let mut parser = Parser {
        tokens: tokenize(expr)?,
        pos: 0,
    };
    let literal = parser.parse_literal()?;
    if parser.peek().is_some() {
        return Err(Error::InvalidArgument(format!(
            "expected a single literal, got '{}'",
            expr
        )));
    }
    Ok(literal)
}

fn any_element<F: Fn(&Value) -> bool>(value: &Value, check: F) -> bool {
    match value {
        Value::ArrayInt32(v) => v.iter().any(|e| check(&Value::Int32(*e))),
        Value::ArrayInt64(v) => v.iter().any(|e| check(&Value::Int64(*e))),
        Value::ArrayFloat(v) => v.iter().any(|e| check(&Value::Float(*e))),
        Value::ArrayDouble(v) => v.iter().any(|e| check(&Value::Double(*e))),
        Value::ArrayString(v) => v.iter().any(|e| check(&Value::String(e.clone()))),
        other => check(other),
    }
}

fn compare(value: &Value, literal: &Literal) -> Option<Ordering> {
    match (value, literal) {
        (Value::Bool(a), Literal::Bool(b)) => Some(a.cmp(b)),
        (Value::String(a), Literal::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::Int32(a), Literal::Int(b)) => Some((*a as i128).cmp(&(*b as i128))),
        (Value::Int64(a), Literal::Int(b)) => Some((*a as i128).cmp(&(*b as i128))),
        (Value::UInt32(a), Literal::Int(b)) => Some((*a as i128).cmp(&(*b as i128))),
        (Value::UInt64(a), Literal::Int(b)) => Some((*a as i128).cmp(&(*b as i128))),
        (v, Literal::Int(b)) => v.as_f64()?.partial_cmp(&(*b as f64)),
        (v, Literal::Float(b)) => v.as_f64()?.partial_cmp(b),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Op(CompareOp),
    LParen,
    RParen,
    Comma,
    And,
    Or,
    Not,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '=' => {
                tokens.push(Token::Op(CompareOp::Eq));
                i += if chars.get(i + 1) == Some(&'=') { 2 } else { 1 };
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op(CompareOp::Ne));
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '<' => match chars.get(i + 1) {
                Some('=') => {
                    tokens.push(Token::Op(CompareOp::Le));
                    i += 2;
                }
                Some('>') => {
                    tokens.push(Token::Op(CompareOp::Ne));
                    i += 2;
                }
                _ => {
                    tokens.push(Token::Op(CompareOp::Lt));
                    i += 1;
                }
            },
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(CompareOp::Ge));
                    i += 2;
                } else {
                    tokens.push(Token::Op(CompareOp::Gt));
                    i += 1;
                }
            }
            '\'' | '"' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => {
                            return Err(Error::InvalidArgument(
                                "unterminated string literal in filter".to_string(),
                            ))
                        }
                        Some('\\') => {
                            if let Some(next) = chars.get(i + 1) {
                                s.push(*next);
                            }
                            i += 2;
                        }
                        Some(ch) if *ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            s.push(*ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let start = i;
                i += 1;
                while i < chars.len()
                    && (chars[i].is_ascii_digit()
                        || chars[i] == '.'
                        || chars[i] == 'e'
                        || chars[i] == 'E'
                        || ((chars[i] == '-' || chars[i] == '+')
                            && matches!(chars[i - 1], 'e' | 'E')))
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                if let Ok(v) = text.parse::<i64>() {
                    tokens.push(Token::Int(v));
                } else if let Ok(v) = text.parse::<f64>() {
                    tokens.push(Token::Float(v));
                } else {
                    return Err(Error::InvalidArgument(format!(
                        "invalid number '{}' in filter",
                        text
                    )));
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let token = match word.to_ascii_lowercase().as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Ident(word),
                };
                tokens.push(token);
            }
            other => {
                return Err(Error::InvalidArgument(format!(
                    "unexpected character '{}' in filter",
                    other
                )))
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(Error::InvalidArgument(format!(
                "expected {:?} in filter, found {:?}",
                expected, tok
            ))),
            None => Err(Error::InvalidArgument(format!(
                "expected {:?} at end of filter",
                expected
            ))),
        }
    }

    fn keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(w)) if w.eq_ignore_ascii_case(word))
    }

    fn parse_or(&mut self) -> Result<FilterCondition> {
        let mut conds = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            conds.push(self.parse_and()?);
        }
        Ok(if conds.len() == 1 { conds.remove(0) } else { FilterCondition::Or(conds) })
    }

    fn parse_and(&mut self) -> Result<FilterCondition> {
        let mut conds = vec![self.parse_unary()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            conds.push(self.parse_unary()?);
        }
        Ok(if conds.len() == 1 { conds.remove(0) } else { FilterCondition::And(conds) })
    }

    fn parse_unary(&mut self) -> Result<FilterCondition> {
        match self.peek() {
            Some(Token::Not) => {
                self.pos += 1;
                Ok(FilterCondition::Not(Box::new(self.parse_unary()?)))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            _ => self.parse_comparison(),
        }
    }

    fn parse_comparison(&mut self) -> Result<FilterCondition> {
        let field = match self.next() {
            Some(Token::Ident(name)) => name,
            Some(tok) => {
                return Err(Error::InvalidArgument(format!(
                    "expected field name in filter, found {:?}",
                    tok
                )))
            }
            None => return Err(Error::InvalidArgument("filter ended early".to_string())),
        };

        if self.keyword("is") {
            self.pos += 1;
            let negated = if self.peek() == Some(&Token::Not) {
                self.pos += 1;
                true
            } else {
                false
            };
            if !self.keyword("null") {
                return Err(Error::InvalidArgument(format!(
                    "expected 'null' after 'is' for field '{}'",
                    field
                )));
            }
            self.pos += 1;
            return Ok(FilterCondition::IsNull { field, negated });
        }

        let negated = if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            true
        } else {
            false
        };
        if self.keyword("in") {
            self.pos += 1;
            self.expect(Token::LParen)?;
            let mut values = vec![self.parse_literal()?];
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                values.push(self.parse_literal()?);
            }
            self.expect(Token::RParen)?;
            return Ok(FilterCondition::In { field, values, negated });
        }
        if negated {
            return Err(Error::InvalidArgument(format!(
                "expected 'in' after 'not' for field '{}'",
                field
            )));
        }

        let op = match self.next() {
            Some(Token::Op(op)) => op,
            other => {
                return Err(Error::InvalidArgument(format!(
                    "expected comparison operator after '{}', found {:?}",
                    field, other
                )))
            }
        };
        let value = self.parse_literal()?;
        Ok(FilterCondition::Compare { field, op, value })
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        match self.next() {
            Some(Token::Int(v)) => Ok(Literal::Int(v)),
            Some(Token::Float(v)) => Ok(Literal::Float(v)),
            Some(Token::Str(s)) => Ok(Literal::String(s)),
            Some(Token::Ident(w)) if w.eq_ignore_ascii_case("true") => Ok(Literal::Bool(true)),
            Some(Token::Ident(w)) if w.eq_ignore_ascii_case("false") => Ok(Literal::Bool(false)),
            other => Err(Error::InvalidArgument(format!(
                "expected literal in filter, found {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataType, FieldSchema};

    fn doc() -> Doc {
        let mut doc = Doc::new("p1");
        doc.set("age", 30i32);
        doc.set("score", 0.75f64);
        doc.set("city", "paris");
        doc.set("active", true);
        doc.set("tags", vec!["a".to_string(), "b".to_string()]);
        doc.set_null("note");
        doc
    }

    #[test]
    fn test_comparisons() {
        let d = doc();
        assert!(Filter::parse("age = 30").unwrap().matches(&d));
        assert!(Filter::parse("age >= 30 and age < 31").unwrap().matches(&d));
        assert!(Filter::parse("score > 0.5").unwrap().matches(&d));
        assert!(Filter::parse("city == 'paris'").unwrap().matches(&d));
        assert!(Filter::parse("city <> \"rome\"").unwrap().matches(&d));
        assert!(Filter::parse("active = true").unwrap().matches(&d));
        assert!(!Filter::parse("age != 30").unwrap().matches(&d));
    }

    #[test]
    fn test_boolean_structure() {
        let d = doc();
        assert!(Filter::parse("age < 10 OR city = 'paris'").unwrap().matches(&d));
        assert!(Filter::parse("not (age < 10) && active = true").unwrap().matches(&d));
        assert!(!Filter::parse("!(city = 'paris') || age = 1").unwrap().matches(&d));
    }

    #[test]
    fn test_null_and_in() {
        let d = doc();
        assert!(Filter::parse("note is null").unwrap().matches(&d));
        assert!(Filter::parse("missing is null").unwrap().matches(&d));
        assert!(Filter::parse("city is not null").unwrap().matches(&d));
        assert!(!Filter::parse("note = 1").unwrap().matches(&d));
        assert!(Filter::parse("city in ('rome', 'paris')").unwrap().matches(&d));
        assert!(Filter::parse("age not in (1, 2)").unwrap().matches(&d));
        assert!(Filter::parse("tags in ('b')").unwrap().matches(&d));
        assert!(Filter::parse("tags = 'a'").unwrap().matches(&d));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Filter::parse("").is_err());
        assert!(Filter::parse("age =").is_err());
        assert!(Filter::parse("(age = 1").is_err());
        assert!(Filter::parse("age = 'x").is_err());
        assert!(Filter::parse("age is 3").is_err());
    }

    #[test]
    fn test_validate_against_schema() {
        let mut schema = CollectionSchema::new("c");
        schema.add_field(FieldSchema::new("age", DataType::Int32)).unwrap();
        schema
            .add_field(FieldSchema::with_dimension("emb", DataType::VectorFp32, 2))
            .unwrap();
        assert!(Filter::compile("age > 1", &schema).is_ok());
        assert!(Filter::compile("height > 1", &schema).is_err());
        assert!(Filter::compile("emb = 1", &schema).is_err());
    }
}
