//! Textual filter and selector syntax, parsed with nom.
//!
//! # Syntax Overview
//!
//! ```text
//! IsActive && (Price < 2000 || Category.Name.contains('tools'))
//! ───┬──── ─┬  ──┬─ ┬ ──┬─      ──┬─── ─┬── ───┬────────────
//!    │      │    │  │   │         │     │      └── String method (LIKE)
//!    │      │    │  │   │         │     └── Field of an included entity
//!    │      │    │  │   │         └── Entity
//!    │      │    │  │   └── Literal (NULL, true, 42, 1.5, 'text')
//!    │      │    │  └── Operator (= == != <> > >= < <= LIKE)
//!    │      │    └── Root field
//!    │      └── Logical operator (&& AND || OR, ! NOT)
//!    └── Bare boolean field
//! ```
//!
//! Bare names resolve against the root entity. `User.Name@Order.CreatedBy`
//! selects the `User` table joined through `Order.CreatedBy`; appending
//! `#e1` (`User.Name@User.CreatedBy#e1`) picks the hop leaving alias `e1`. `now()`,
//! `utcnow()` and `today()` are evaluated when the filter is translated.
//! Sort keys are fields with an optional `+` (ascending) or `-` prefix.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while},
    character::complete::{char, digit1, multispace0, none_of, satisfy},
    combinator::{map, map_res, not, opt, peek, recognize, value, verify},
    error::ErrorKind,
    multi::{fold_many0, many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
};

use crate::ast::{self, CompareOp, Expr, FieldRef, JoinKey, SortDirection, TableAlias, Value};
use crate::error::{QueryError, SqbResult};

const KEYWORDS: &[&str] = &["and", "or", "not", "like", "null", "true", "false"];

/// Parse a filter expression; bare field names belong to `root`.
pub fn parse_filter(root: &str, input: &str) -> SqbResult<Expr> {
    let parser = FilterParser { root };
    finish(input, |i| parser.expr(i))
}

/// Parse a field selector such as `Name`, `Order.UserId` or
/// `User.Email@Order.CreatedBy`.
pub fn parse_field(root: &str, input: &str) -> SqbResult<FieldRef> {
    let parser = FilterParser { root };
    finish(input, |i| parser.field(i))
}

/// Parse a sort key: `+Field`, `-Field` or `Field` (ascending).
pub fn parse_sort_key(root: &str, input: &str) -> SqbResult<(FieldRef, SortDirection)> {
    let parser = FilterParser { root };
    finish(input, |i| {
        let (i, direction) = opt(alt((
            value(SortDirection::Asc, char('+')),
            value(SortDirection::Desc, char('-')),
        )))(i)?;
        let (i, field) = parser.field(i)?;
        Ok((i, (field, direction.unwrap_or_default())))
    })
}

fn finish<'a, O>(
    input: &'a str,
    mut parser: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> SqbResult<O> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(QueryError::parse(input.len(), "Empty input"));
    }
    // Positions are reported against the untrimmed input.
    let lead = input.len() - input.trim_start().len();
    let position = |rest: &str| lead + trimmed.len() - rest.len();

    match parser(trimmed) {
        Ok(("", out)) => Ok(out),
        Ok((remaining, _)) => Err(QueryError::parse(
            position(remaining),
            format!("Unexpected trailing content: '{}'", remaining),
        )),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(QueryError::parse(position(e.input), describe(e.code)))
        }
        Err(nom::Err::Incomplete(_)) => {
            Err(QueryError::parse(position(""), "Unexpected end of input"))
        }
    }
}

fn describe(code: ErrorKind) -> String {
    match code {
        ErrorKind::Verify => "Invalid field reference".to_string(),
        ErrorKind::MapOpt => "Unknown function".to_string(),
        ErrorKind::MapRes => "Number out of range".to_string(),
        ErrorKind::Char | ErrorKind::Tag => "Unexpected token".to_string(),
        other => format!("Parse failed: {:?}", other),
    }
}

struct FilterParser<'r> {
    root: &'r str,
}

impl FilterParser<'_> {
    fn expr<'a>(&self, input: &'a str) -> IResult<&'a str, Expr> {
        let (input, first) = self.and_expr(input)?;
        let (input, rest) = many0(preceded(ws(or_op), |i| self.and_expr(i)))(input)?;
        Ok((input, combine(first, rest, |ops| ast::or(ops))))
    }

    fn and_expr<'a>(&self, input: &'a str) -> IResult<&'a str, Expr> {
        let (input, first) = self.unary(input)?;
        let (input, rest) = many0(preceded(ws(and_op), |i| self.unary(i)))(input)?;
        Ok((input, combine(first, rest, |ops| ast::and(ops))))
    }

    fn unary<'a>(&self, input: &'a str) -> IResult<&'a str, Expr> {
        alt((
            map(preceded(ws(not_op), |i| self.unary(i)), |e| ast::not(e)),
            |i| self.comparison(i),
        ))(input)
    }

    fn comparison<'a>(&self, input: &'a str) -> IResult<&'a str, Expr> {
        let (input, left) = ws(|i| self.operand(i))(input)?;
        let (input, right) = opt(pair(ws(compare_op), ws(|i| self.operand(i))))(input)?;

        Ok((
            input,
            match right {
                Some((op, right)) => ast::compare(op, left, right),
                None => left,
            },
        ))
    }

    fn operand<'a>(&self, input: &'a str) -> IResult<&'a str, Expr> {
        alt((
            delimited(char('('), |i| self.expr(i), ws(char(')'))),
            map(literal, Expr::Literal),
            |i| self.reference(i),
        ))(input)
    }

    /// A field, a method call on a field, or a zero-argument function.
    fn reference<'a>(&self, input: &'a str) -> IResult<&'a str, Expr> {
        let start = input;
        let (input, mut head) = separated_list1(char('.'), identifier)(input)?;
        let (input, mut via) = opt(edge)(input)?;
        // A pinned edge ends the segment list, so its method follows separately.
        let (input, tail) = opt(preceded(char('.'), identifier))(input)?;
        let (input, args) = opt(delimited(
            pair(char('('), multispace0),
            opt(literal),
            pair(multispace0, char(')')),
        ))(input)?;

        let Some(arg) = args else {
            if tail.is_some() {
                return Err(failure(start, ErrorKind::Verify));
            }
            return self
                .field_ref(head, via)
                .map(|f| (input, Expr::Field(f)))
                .ok_or_else(|| failure(start, ErrorKind::Verify));
        };

        let method = match (tail, via.as_mut()) {
            (Some(name), _) => Some(name),
            (None, Some((segments, None))) => segments.pop(),
            (None, Some((_, Some(_)))) => None,
            (None, None) => head.pop(),
        }
        .unwrap_or_default();

        if head.is_empty() {
            return match (arg, via) {
                (None, None) => function(method)
                    .map(|f| (input, f))
                    .ok_or_else(|| failure(start, ErrorKind::MapOpt)),
                _ => Err(failure(start, ErrorKind::Verify)),
            };
        }

        let (Some(arg), Some(target), false) = (arg, self.field_ref(head, via), method.is_empty())
        else {
            return Err(failure(start, ErrorKind::Verify));
        };
        Ok((input, ast::call(method, target, Expr::Literal(arg))))
    }

    fn field<'a>(&self, input: &'a str) -> IResult<&'a str, FieldRef> {
        let start = input;
        let (input, head) = separated_list1(char('.'), identifier)(input)?;
        let (input, via) = opt(edge)(input)?;
        self.field_ref(head, via)
            .map(|f| (input, f))
            .ok_or_else(|| failure(start, ErrorKind::Verify))
    }

    fn field_ref(&self, head: Vec<&str>, via: Option<Edge<'_>>) -> Option<FieldRef> {
        let field = self.qualify(&head)?;
        match via {
            None => Some(field),
            Some((segments, from)) => {
                let edge = self.qualify(&segments)?;
                let key = JoinKey::new(edge.entity, edge.field);
                Some(field.via(match from {
                    Some(alias) => key.from_alias(alias),
                    None => key,
                }))
            }
        }
    }

    fn qualify(&self, segments: &[&str]) -> Option<FieldRef> {
        match segments {
            [field] => Some(FieldRef::new(self.root, *field)),
            [entity, field] => Some(FieldRef::new(*entity, *field)),
            _ => None,
        }
    }
}

/// `@Entity.Field` with an optional `#eN` pin to the alias the edge leaves.
type Edge<'a> = (Vec<&'a str>, Option<TableAlias>);

fn edge(input: &str) -> IResult<&str, Edge<'_>> {
    preceded(
        char('@'),
        pair(
            separated_list1(char('.'), identifier),
            opt(preceded(char('#'), table_alias)),
        ),
    )(input)
}

fn table_alias(input: &str) -> IResult<&str, TableAlias> {
    map_res(preceded(char('e'), digit1), |n: &str| {
        n.parse().map(TableAlias)
    })(input)
}

fn combine(first: Expr, rest: Vec<Expr>, group: impl FnOnce(Vec<Expr>) -> Expr) -> Expr {
    if rest.is_empty() {
        first
    } else {
        group(std::iter::once(first).chain(rest).collect())
    }
}

fn failure(input: &str, kind: ErrorKind) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Failure(nom::error::Error::new(input, kind))
}

fn function(name: &str) -> Option<Expr> {
    match name.to_ascii_lowercase().as_str() {
        "now" => Some(ast::computed(|| {
            Value::DateTime(chrono::Local::now().naive_local())
        })),
        "utcnow" => Some(ast::computed(|| Value::DateTime(chrono::Utc::now().naive_utc()))),
        "today" => Some(ast::computed(|| {
            Value::Date(chrono::Local::now().date_naive())
        })),
        _ => None,
    }
}

fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(multispace0, inner, multispace0)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Case-insensitive keyword not followed by an identifier character.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(word), not(peek(satisfy(is_ident_char))))
}

fn identifier(input: &str) -> IResult<&str, &str> {
    verify(
        recognize(pair(
            satisfy(|c: char| c.is_alphabetic() || c == '_'),
            take_while(is_ident_char),
        )),
        |s: &str| !KEYWORDS.contains(&s.to_ascii_lowercase().as_str()),
    )(input)
}

fn or_op(input: &str) -> IResult<&str, &str> {
    alt((tag("||"), keyword("or")))(input)
}

fn and_op(input: &str) -> IResult<&str, &str> {
    alt((tag("&&"), keyword("and")))(input)
}

fn not_op(input: &str) -> IResult<&str, &str> {
    alt((terminated(tag("!"), not(peek(char('=')))), keyword("not")))(input)
}

fn compare_op(input: &str) -> IResult<&str, CompareOp> {
    alt((
        value(CompareOp::Eq, tag("==")),
        value(CompareOp::Ne, tag("!=")),
        value(CompareOp::Ne, tag("<>")),
        value(CompareOp::Gte, tag(">=")),
        value(CompareOp::Lte, tag("<=")),
        value(CompareOp::Gt, char('>')),
        value(CompareOp::Lt, char('<')),
        value(CompareOp::Eq, char('=')),
        value(CompareOp::Like, keyword("like")),
    ))(input)
}

fn literal(input: &str) -> IResult<&str, Value> {
    alt((
        value(Value::Null, keyword("null")),
        value(Value::Bool(true), keyword("true")),
        value(Value::Bool(false), keyword("false")),
        parse_number,
        map(parse_quoted_string, Value::Text),
    ))(input)
}

/// Parse a number (integer or float).
fn parse_number(input: &str) -> IResult<&str, Value> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
        ))),
        |num: &str| {
            if num.contains('.') {
                num.parse().map(Value::Float).map_err(|_| ())
            } else {
                num.parse().map(Value::Int).map_err(|_| ())
            }
        },
    )(input)
}

/// Parse a quoted string; `''` is an escaped quote.
fn parse_quoted_string(input: &str) -> IResult<&str, String> {
    delimited(
        char('\''),
        fold_many0(
            alt((value('\'', tag("''")), none_of("'"))),
            String::new,
            |mut s, c| {
                s.push(c);
                s
            },
        ),
        char('\''),
    )(input)
}
