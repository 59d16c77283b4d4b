//! Expression grammar.
//!
//! ```text
//! expression  = conditional
//! conditional = or [ "?" expression ":" expression ]
//! or          = and { "||" and }
//! and         = equality { "&&" equality }
//! equality    = relational { ("===" | "!==" | "==" | "!=") relational }
//! relational  = additive { ("<=" | ">=" | "<" | ">") additive }
//! additive    = multiplicative { ("+" | "-") multiplicative }
//! multiplicative = unary { ("*" | "/" | "%") unary }
//! unary       = ("!" | "-" | "+") unary | postfix
//! postfix     = primary { "." identifier | "(" [ expression { "," expression } ] ")" }
//! primary     = number | string | "(" expression ")" | identifier
//! ```

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit0, digit1, multispace0, one_of},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use std::cell::Cell;

use super::{BinaryOp, EvalError, Expr, JsValue, UnaryOp};

type PResult<'a, T> = IResult<&'a str, T>;

/// Longest accepted expression source, in bytes.
pub const MAX_EXPRESSION_LEN: usize = 1024;

/// Deepest accepted nesting of sub-expressions and prefix operators.
pub const MAX_NESTING: usize = 64;

thread_local! {
    static NESTING: Cell<usize> = const { Cell::new(0) };
}

/// Parses a complete expression; trailing input is an error.
pub fn parse_expression(source: &str) -> Result<Expr, EvalError> {
    if source.len() > MAX_EXPRESSION_LEN {
        return Err(EvalError::Parse(format!(
            "expression longer than {MAX_EXPRESSION_LEN} bytes"
        )));
    }
    NESTING.with(|n| n.set(0));
    match all_consuming(ws(expression))(source) {
        Ok((_, expr)) => Ok(expr),
        Err(e) => Err(EvalError::Parse(e.to_string())),
    }
}

/// Held while a nested parser runs; releases its level on drop.
struct NestingGuard;

impl NestingGuard {
    fn enter(i: &str) -> Result<Self, nom::Err<Error<&str>>> {
        NESTING.with(|n| {
            if n.get() >= MAX_NESTING {
                return Err(nom::Err::Failure(Error::new(i, ErrorKind::TooLarge)));
            }
            n.set(n.get() + 1);
            Ok(NestingGuard)
        })
    }
}

impl Drop for NestingGuard {
    fn drop(&mut self) {
        NESTING.with(|n| n.set(n.get().saturating_sub(1)));
    }
}

fn nested<'a, O>(i: &'a str, parser: fn(&'a str) -> PResult<'a, O>) -> PResult<'a, O> {
    let _guard = NestingGuard::enter(i)?;
    parser(i)
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: FnMut(&'a str) -> PResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn expression(i: &str) -> PResult<'_, Expr> {
    nested(i, conditional)
}

fn conditional(i: &str) -> PResult<'_, Expr> {
    let (i, cond) = logical_or(i)?;
    match preceded(ws(char('?')), expression)(i) {
        Ok((rest, then)) => {
            let (rest, _) = ws(char(':'))(rest)?;
            let (rest, otherwise) = expression(rest)?;
            Ok((
                rest,
                Expr::Conditional(Box::new(cond), Box::new(then), Box::new(otherwise)),
            ))
        }
        Err(nom::Err::Error(_)) => Ok((i, cond)),
        Err(e) => Err(e),
    }
}

/// Left-associative chain of `operand (operator operand)*`.
fn binary_level<'a>(
    i: &'a str,
    operand: fn(&'a str) -> PResult<'a, Expr>,
    operator: fn(&'a str) -> PResult<'a, BinaryOp>,
) -> PResult<'a, Expr> {
    let (mut i, mut lhs) = operand(i)?;
    loop {
        match operator(i) {
            Ok((rest, op)) => {
                let (rest, rhs) = operand(rest)?;
                lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
                i = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((i, lhs)),
            Err(e) => return Err(e),
        }
    }
}

fn logical_or(i: &str) -> PResult<'_, Expr> {
    binary_level(i, logical_and, |i| ws(value(BinaryOp::Or, tag("||")))(i))
}

fn logical_and(i: &str) -> PResult<'_, Expr> {
    binary_level(i, equality, |i| ws(value(BinaryOp::And, tag("&&")))(i))
}

fn equality(i: &str) -> PResult<'_, Expr> {
    binary_level(i, relational, |i| {
        ws(alt((
            value(BinaryOp::StrictEq, tag("===")),
            value(BinaryOp::StrictNe, tag("!==")),
            value(BinaryOp::Eq, tag("==")),
            value(BinaryOp::Ne, tag("!=")),
        )))(i)
    })
}

fn relational(i: &str) -> PResult<'_, Expr> {
    binary_level(i, additive, |i| {
        ws(alt((
            value(BinaryOp::Le, tag("<=")),
            value(BinaryOp::Ge, tag(">=")),
            value(BinaryOp::Lt, tag("<")),
            value(BinaryOp::Gt, tag(">")),
        )))(i)
    })
}

fn additive(i: &str) -> PResult<'_, Expr> {
    binary_level(i, multiplicative, |i| {
        ws(alt((
            value(BinaryOp::Add, char('+')),
            value(BinaryOp::Sub, char('-')),
        )))(i)
    })
}

fn multiplicative(i: &str) -> PResult<'_, Expr> {
    binary_level(i, unary, |i| {
        ws(alt((
            value(BinaryOp::Mul, char('*')),
            value(BinaryOp::Div, char('/')),
            value(BinaryOp::Rem, char('%')),
        )))(i)
    })
}

fn unary(i: &str) -> PResult<'_, Expr> {
    alt((
        map(preceded(ws(char('!')), |i| nested(i, unary)), |e| {
            Expr::Unary(UnaryOp::Not, Box::new(e))
        }),
        map(preceded(ws(char('-')), |i| nested(i, unary)), |e| {
            Expr::Unary(UnaryOp::Neg, Box::new(e))
        }),
        map(preceded(ws(char('+')), |i| nested(i, unary)), |e| {
            Expr::Unary(UnaryOp::Plus, Box::new(e))
        }),
        postfix,
    ))(i)
}

fn postfix(i: &str) -> PResult<'_, Expr> {
    let (mut i, mut expr) = primary(i)?;
    loop {
        if let Ok((rest, name)) = preceded(ws(char('.')), ws(identifier))(i) {
            expr = Expr::Member(Box::new(expr), name.to_string());
            i = rest;
            continue;
        }
        if let Ok((rest, args)) = call_args(i) {
            expr = Expr::Call(Box::new(expr), args);
            i = rest;
            continue;
        }
        return Ok((i, expr));
    }
}

fn call_args(i: &str) -> PResult<'_, Vec<Expr>> {
    delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), expression),
        ws(char(')')),
    )(i)
}

fn primary(i: &str) -> PResult<'_, Expr> {
    ws(alt((
        map(number, |n| Expr::Literal(JsValue::Number(n))),
        map(string_literal, |s| Expr::Literal(JsValue::Str(s))),
        delimited(char('('), ws(expression), char(')')),
        map(identifier, keyword_or_identifier),
    )))(i)
}

fn keyword_or_identifier(name: &str) -> Expr {
    match name {
        "true" => Expr::Literal(JsValue::Bool(true)),
        "false" => Expr::Literal(JsValue::Bool(false)),
        "null" => Expr::Literal(JsValue::Null),
        "undefined" => Expr::Literal(JsValue::Undefined),
        "NaN" => Expr::Literal(JsValue::Number(f64::NAN)),
        "Infinity" => Expr::Literal(JsValue::Number(f64::INFINITY)),
        _ => Expr::Identifier(name.to_string()),
    }
}

fn identifier(i: &str) -> PResult<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"), tag("$"))),
        many0(alt((alphanumeric1, tag("_"), tag("$")))),
    ))(i)
}

/// Unsigned decimal literal text: `12`, `1.5`, `.5`, `2e10`.
pub(super) fn decimal_text(i: &str) -> PResult<'_, &str> {
    recognize(tuple((
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(i)
}

fn number(i: &str) -> PResult<'_, f64> {
    map_res(decimal_text, |s: &str| s.parse::<f64>())(i)
}

fn string_literal(i: &str) -> PResult<'_, String> {
    match quoted(i, '"') {
        Err(nom::Err::Error(_)) => quoted(i, '\''),
        other => other,
    }
}

fn quoted(i: &str, quote: char) -> PResult<'_, String> {
    let (body, _) = char::<_, Error<&str>>(quote)(i)?;
    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((idx, c)) = chars.next() {
        if c == quote {
            return Ok((&body[idx + c.len_utf8()..], out));
        }
        if c == '\\' {
            match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, other)) => out.push(other),
                None => break,
            }
        } else {
            out.push(c);
        }
    }
    Err(nom::Err::Error(Error::new(i, ErrorKind::Char)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Literal(JsValue::Number(1.0))),
                Box::new(Expr::Binary(
                    BinaryOp::Mul,
                    Box::new(Expr::Literal(JsValue::Number(2.0))),
                    Box::new(Expr::Literal(JsValue::Number(3.0))),
                )),
            )
        );
    }

    #[test]
    fn test_member_call() {
        let expr = parse_expression("Math.floor(2.5)").unwrap();
        assert_eq!(
            expr,
            Expr::Call(
                Box::new(Expr::Member(
                    Box::new(Expr::Identifier("Math".to_string())),
                    "floor".to_string()
                )),
                vec![Expr::Literal(JsValue::Number(2.5))],
            )
        );
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(
            parse_expression(r#"'it\'s'"#).unwrap(),
            Expr::Literal(JsValue::Str("it's".to_string()))
        );
        assert_eq!(
            parse_expression(r#""a\nb""#).unwrap(),
            Expr::Literal(JsValue::Str("a\nb".to_string()))
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            parse_expression("true").unwrap(),
            Expr::Literal(JsValue::Bool(true))
        );
        assert_eq!(
            parse_expression("undefinedVar").unwrap(),
            Expr::Identifier("undefinedVar".to_string())
        );
    }

    #[test]
    fn test_trailing_input_is_error() {
        assert!(parse_expression("1 +").is_err());
        assert!(parse_expression("1 2").is_err());
        assert!(parse_expression("(1").is_err());
        assert!(parse_expression("'open").is_err());
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let source = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(parse_expression(&source), Err(EvalError::Parse(_))));

        let deep = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert!(parse_expression(&deep).is_err());

        let bangs = format!("{}1", "!".repeat(500));
        assert!(parse_expression(&bangs).is_err());
    }

    #[test]
    fn test_moderate_nesting_parses_and_resets() {
        let source = format!("{}1{}", "(".repeat(40), ")".repeat(40));
        assert_eq!(
            parse_expression(&source).unwrap(),
            Expr::Literal(JsValue::Number(1.0))
        );
        // depth is released after a rejected parse
        assert!(parse_expression(&"(".repeat(100)).is_err());
        assert!(parse_expression(&source).is_ok());
    }

    #[test]
    fn test_overlong_source_is_rejected() {
        let source = vec!["1"; MAX_EXPRESSION_LEN].join("+");
        assert!(matches!(parse_expression(&source), Err(EvalError::Parse(_))));
    }

    #[test]
    fn test_conditional() {
        assert!(matches!(
            parse_expression("1 < 2 ? 'a' : 'b'").unwrap(),
            Expr::Conditional(..)
        ));
    }
}
