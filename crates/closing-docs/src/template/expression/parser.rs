//! Condition grammar.
//!
//! ```text
//! expr       := and_expr (("||" | "or" | "orelse") and_expr)*
//! and_expr   := not_expr (("&&" | "and" | "andalso") not_expr)*
//! not_expr   := ("!" | "not") not_expr | comparison
//! comparison := primary (("==" | "!=" | "<=" | ">=" | "<" | ">") primary)?
//! primary    := "(" expr ")" | string | number | true | false | null | @path
//! ```
//!
//! Paths must already carry the `@` qualifier added by [`super::qualify`].

use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while},
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, recognize, value},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use rust_decimal::Decimal;

use crate::template::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Path(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, CompareOp, Box<Expr>),
}

/// Parse a normalised, qualified condition.
pub fn parse(input: &str) -> Result<Expr, String> {
    all_consuming(ws(or_expr))(input)
        .map(|(_, expr)| expr)
        .map_err(|err| err.to_string())
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Case-insensitive word that is not the prefix of a longer identifier.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(word), not(satisfy(is_ident_char)))
}

fn or_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(
        ws(alt((tag("||"), keyword("orelse"), keyword("or")))),
        and_expr,
    ))(input)?;
    let expr = rest
        .into_iter()
        .fold(first, |acc, next| Expr::Or(Box::new(acc), Box::new(next)));
    Ok((input, expr))
}

fn and_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = not_expr(input)?;
    let (input, rest) = many0(preceded(
        ws(alt((tag("&&"), keyword("andalso"), keyword("and")))),
        not_expr,
    ))(input)?;
    let expr = rest
        .into_iter()
        .fold(first, |acc, next| Expr::And(Box::new(acc), Box::new(next)));
    Ok((input, expr))
}

fn not_expr(input: &str) -> IResult<&str, Expr> {
    alt((
        map(
            preceded(
                ws(alt((terminated(tag("!"), not(char('='))), keyword("not")))),
                not_expr,
            ),
            |expr| Expr::Not(Box::new(expr)),
        ),
        comparison,
    ))(input)
}

fn comparison(input: &str) -> IResult<&str, Expr> {
    let (input, left) = primary(input)?;
    let (input, tail) = opt(pair(ws(compare_op), primary))(input)?;
    let expr = match tail {
        Some((op, right)) => Expr::Compare(Box::new(left), op, Box::new(right)),
        None => left,
    };
    Ok((input, expr))
}

fn compare_op(input: &str) -> IResult<&str, CompareOp> {
    alt((
        value(CompareOp::Eq, tag("==")),
        value(CompareOp::Ne, tag("!=")),
        value(CompareOp::Le, tag("<=")),
        value(CompareOp::Ge, tag(">=")),
        value(CompareOp::Lt, tag("<")),
        value(CompareOp::Gt, tag(">")),
    ))(input)
}

fn primary(input: &str) -> IResult<&str, Expr> {
    ws(alt((
        delimited(char('('), or_expr, char(')')),
        map(string_literal, |text: &str| {
            Expr::Literal(Value::Text(text.to_string()))
        }),
        map(number, |number| Expr::Literal(Value::Number(number))),
        value(Expr::Literal(Value::Bool(true)), keyword("true")),
        value(Expr::Literal(Value::Bool(false)), keyword("false")),
        value(
            Expr::Literal(Value::Null),
            alt((keyword("null"), keyword("nothing"))),
        ),
        map(path, |path: &str| Expr::Path(path.to_string())),
    )))(input)
}

fn string_literal(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
    ))(input)
}

fn number(input: &str) -> IResult<&str, Decimal> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
        ))),
        Decimal::from_str,
    )(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))(input)
}

fn path(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), recognize(separated_list1(char('.'), identifier)))(input)
}
