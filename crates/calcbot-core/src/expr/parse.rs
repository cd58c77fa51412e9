//! Front end over `meval`.
//!
//! meval tokenizes the input and orders it with its shunting-yard pass; the
//! reverse Polish output is folded here into an [`Expr`] tree. meval writes
//! powers as `^`, so `**` is rewritten before tokenizing and error offsets
//! are mapped back to the text the user typed.

use meval::tokenizer::{self, Operation, Token};
use meval::{shunting_yard, Context, ContextProvider};

use super::{Constant, Expr, Func};
use crate::error::ParseError;

/// Deepest tree the recursive passes (derivative, printing) accept.
const MAX_DEPTH: usize = 256;

/// Characters the grammar uses. meval also knows `%` and `,`, which are
/// not part of it.
fn is_expression_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_whitespace() || "_.+-*/^()".contains(c)
}

/// Input rewritten for meval, with the 0-based char index of every byte in
/// the original text.
struct Rewritten {
    text: String,
    origin: Vec<usize>,
}

impl Rewritten {
    fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let mut text = String::with_capacity(input.len());
        let mut origin = Vec::with_capacity(input.len());
        let mut i = 0;
        while i < chars.len() {
            let c = if chars[i] == '*' && chars.get(i + 1) == Some(&'*') {
                '^'
            } else {
                chars[i]
            };
            text.push(c);
            origin.extend(std::iter::repeat(i).take(c.len_utf8()));
            i += if c == '^' && chars[i] == '*' { 2 } else { 1 };
        }
        Self { text, origin }
    }

    /// 1-based position in the original input of the byte at `offset`.
    fn position(&self, offset: usize) -> usize {
        self.origin.get(offset).map_or(self.origin.len() + 1, |i| i + 1)
    }
}

pub(crate) fn parse(input: &str) -> Result<Expr, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    for (i, ch) in input.chars().enumerate() {
        if !is_expression_char(ch) {
            return Err(ParseError::UnexpectedChar { ch, position: i + 1 });
        }
    }
    check_literals(input)?;

    let rewritten = Rewritten::new(input);
    let tokens = tokenizer::tokenize(&rewritten.text).map_err(|e| match e {
        tokenizer::ParseError::UnexpectedToken(offset) => {
            let position = rewritten.position(offset);
            ParseError::UnexpectedToken {
                found: token_at(input, position),
                position,
            }
        }
        tokenizer::ParseError::MissingRParen(_) => ParseError::UnclosedParen {
            position: first_unclosed(input).unwrap_or(1),
        },
        tokenizer::ParseError::MissingArgument => ParseError::UnexpectedEnd,
    })?;
    let rpn = shunting_yard::to_rpn(&tokens).map_err(|e| ParseError::Malformed(e.to_string()))?;
    from_rpn(&rpn)
}

/// The token text starting at 1-based `position`: `**` or a single char.
fn token_at(input: &str, position: usize) -> String {
    let rest: String = input.chars().skip(position - 1).take(2).collect();
    if rest == "**" {
        rest
    } else {
        rest.chars().take(1).collect()
    }
}

fn first_unclosed(input: &str) -> Option<usize> {
    let mut open = Vec::new();
    for (i, c) in input.chars().enumerate() {
        match c {
            '(' => open.push(i + 1),
            ')' => {
                open.pop();
            }
            _ => {}
        }
    }
    open.first().copied()
}

/// Reject literals that overflow to infinity, e.g. `1e400`. meval would
/// accept them as `inf`.
fn check_literals(input: &str) -> Result<(), ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let inside_name = i > 0 && (chars[i - 1].is_ascii_alphanumeric() || chars[i - 1] == '_');
        if !chars[i].is_ascii_digit() || inside_name {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
            i += 1;
        }
        if matches!(chars.get(i), Some('e' | 'E')) {
            let mut j = i + 1;
            if matches!(chars.get(j), Some('+' | '-')) {
                j += 1;
            }
            if chars.get(j).is_some_and(|c| c.is_ascii_digit()) {
                while chars.get(j).is_some_and(|c| c.is_ascii_digit()) {
                    j += 1;
                }
                i = j;
            }
        }
        let text: String = chars[start..i].iter().collect();
        if text.parse::<f64>().is_ok_and(f64::is_infinite) {
            return Err(ParseError::InvalidNumber {
                text,
                position: start + 1,
            });
        }
    }
    Ok(())
}

/// Fold reverse Polish tokens into a tree, tracking depth as we go.
fn from_rpn(rpn: &[Token]) -> Result<Expr, ParseError> {
    let mut stack: Vec<(Expr, usize)> = Vec::new();
    let pop = |stack: &mut Vec<(Expr, usize)>| stack.pop().ok_or(ParseError::UnexpectedEnd);

    for token in rpn {
        let node = match token {
            Token::Number(n) => (Expr::Number(*n), 1),
            Token::Var(name) => (leaf(name)?, 1),
            Token::Unary(op) => {
                let (operand, depth) = pop(&mut stack)?;
                match op {
                    Operation::Minus => (Expr::neg(operand), depth + 1),
                    _ => (operand, depth),
                }
            }
            Token::Binary(op) => {
                let (right, rd) = pop(&mut stack)?;
                let (left, ld) = pop(&mut stack)?;
                let node = match op {
                    Operation::Plus => Expr::add(left, right),
                    Operation::Minus => Expr::sub(left, right),
                    Operation::Times => Expr::mul(left, right),
                    Operation::Div => Expr::div(left, right),
                    Operation::Pow => Expr::pow(left, right),
                    Operation::Rem => {
                        return Err(ParseError::Malformed("'%' is not supported".into()))
                    }
                };
                (node, ld.max(rd) + 1)
            }
            Token::Func(name, args) => {
                let func = Func::from_name(name).ok_or_else(|| ParseError::UnknownName {
                    name: name.clone(),
                })?;
                if *args != Some(1) {
                    return Err(ParseError::MissingArgument { name: name.clone() });
                }
                let (arg, depth) = pop(&mut stack)?;
                (Expr::call(func, arg), depth + 1)
            }
            other => return Err(ParseError::Malformed(format!("stray token {other:?}"))),
        };
        if node.1 > MAX_DEPTH {
            return Err(ParseError::TooDeep);
        }
        stack.push(node);
    }

    match (stack.pop(), stack.is_empty()) {
        (Some((expr, _)), true) => Ok(expr),
        _ => Err(ParseError::Malformed("operands left over".into())),
    }
}

fn leaf(name: &str) -> Result<Expr, ParseError> {
    if name == "x" {
        return Ok(Expr::X);
    }
    if let Some(constant) = Constant::from_name(name) {
        return Ok(Expr::Const(constant));
    }
    if Func::from_name(name).is_some() {
        return Err(ParseError::MissingArgument { name: name.into() });
    }
    Err(ParseError::UnknownName { name: name.into() })
}

/// meval's builtins plus the spellings this grammar adds on top.
pub(crate) fn context() -> Context<'static> {
    let mut ctx = Context::new();
    ctx.var("E", std::f64::consts::E)
        .func("log", f64::ln)
        .func("Abs", f64::abs)
        .func("arcsin", f64::asin)
        .func("arccos", f64::acos)
        .func("arctan", f64::atan);
    ctx
}

/// Compile `input` into a closure over `x` with meval's evaluator.
///
/// Callers parse first, so every name in `input` is known to [`context`].
pub(crate) fn compile(input: &str) -> Result<impl Fn(f64) -> f64, ParseError> {
    let rewritten = Rewritten::new(input);
    let compiled: meval::Expr = rewritten
        .text
        .parse()
        .map_err(|e: meval::Error| ParseError::Malformed(e.to_string()))?;
    let ctx = context();
    if let Some(name) = compiled.iter().find_map(|t| match t {
        Token::Var(name) if name != "x" && ctx.get_var(name).is_none() => Some(name.clone()),
        _ => None,
    }) {
        return Err(ParseError::UnknownName { name });
    }
    compiled
        .bind_with_context(ctx, "x")
        .map_err(|e| ParseError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_star_and_caret_are_the_same_power() {
        assert_eq!(parse("x**2").unwrap(), parse("x^2").unwrap());
        assert_eq!(
            parse("x**2").unwrap(),
            Expr::pow(Expr::X, Expr::Number(2.0))
        );
    }

    #[test]
    fn precedence() {
        // x + 2 * 3 should be x + (2 * 3)
        match parse("x + 2 * 3").unwrap() {
            Expr::Add(left, right) => {
                assert_eq!(*left, Expr::X);
                assert!(matches!(*right, Expr::Mul(_, _)));
            }
            other => panic!("expected Add at top level, got {other:?}"),
        }
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(parse("2**3**2").unwrap().eval(0.0), 512.0);
    }

    #[test]
    fn unary_minus_binds_looser_than_power() {
        assert_eq!(parse("-x**2").unwrap().eval(3.0), -9.0);
        assert_eq!(parse("(-x)**2").unwrap().eval(3.0), 9.0);
        assert_eq!(parse("x**-1").unwrap().eval(4.0), 0.25);
    }

    #[test]
    fn subtraction_is_left_associative() {
        assert_eq!(parse("10 - 4 - 3").unwrap().eval(0.0), 3.0);
        assert_eq!(parse("8 / 4 / 2").unwrap().eval(0.0), 1.0);
    }

    #[test]
    fn function_calls_and_constants() {
        assert_eq!(parse("sin(x)").unwrap(), Expr::call(Func::Sin, Expr::X));
        assert_eq!(parse("ln(x)").unwrap(), Expr::call(Func::Ln, Expr::X));
        assert_eq!(parse("pi").unwrap(), Expr::Const(Constant::Pi));
        assert_eq!(parse("E").unwrap(), Expr::Const(Constant::E));
    }

    #[test]
    fn malformed_operator_sequence() {
        assert_eq!(
            parse("x +* 2"),
            Err(ParseError::UnexpectedToken {
                found: "*".into(),
                position: 4
            })
        );
    }

    #[test]
    fn positions_refer_to_the_typed_text() {
        // The `**` before the error is one byte longer than meval's `^`
        assert_eq!(
            parse("x**2 +* 1"),
            Err(ParseError::UnexpectedToken {
                found: "*".into(),
                position: 7
            })
        );
        assert_eq!(
            parse("x + ** 2"),
            Err(ParseError::UnexpectedToken {
                found: "**".into(),
                position: 5
            })
        );
    }

    #[test]
    fn implicit_multiplication_is_rejected() {
        assert_eq!(
            parse("2x"),
            Err(ParseError::UnexpectedToken {
                found: "x".into(),
                position: 2
            })
        );
    }

    #[test]
    fn characters_outside_the_grammar() {
        assert_eq!(
            parse("x $ 2"),
            Err(ParseError::UnexpectedChar { ch: '$', position: 3 })
        );
        assert!(matches!(
            parse("x % 2"),
            Err(ParseError::UnexpectedChar { ch: '%', .. })
        ));
        assert!(matches!(
            parse("х + 1"),
            Err(ParseError::UnexpectedChar { position: 1, .. })
        ));
    }

    #[test]
    fn overflowing_literals_are_invalid_numbers() {
        assert_eq!(
            parse("1e400*x"),
            Err(ParseError::InvalidNumber {
                text: "1e400".into(),
                position: 1
            })
        );
        assert!(matches!(
            parse("x + 2.5E+999"),
            Err(ParseError::InvalidNumber { position: 5, .. })
        ));
        assert!(parse("1e300*x").is_ok());
        assert!(parse("x2e999").is_err());
    }

    #[test]
    fn unknown_names_and_missing_arguments() {
        assert_eq!(
            parse("y + 1"),
            Err(ParseError::UnknownName { name: "y".into() })
        );
        assert_eq!(
            parse("foo(x)"),
            Err(ParseError::UnknownName { name: "foo".into() })
        );
        assert_eq!(
            parse("sin + 1"),
            Err(ParseError::MissingArgument { name: "sin".into() })
        );
    }

    #[test]
    fn parenthesis_errors() {
        assert_eq!(
            parse("(x + 1"),
            Err(ParseError::UnclosedParen { position: 1 })
        );
        assert!(matches!(
            parse("x + 1)"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(parse("()").is_err());
    }

    #[test]
    fn empty_and_truncated_input() {
        assert_eq!(parse("   "), Err(ParseError::Empty));
        assert_eq!(parse("x +"), Err(ParseError::UnexpectedEnd));
    }

    #[test]
    fn deep_nesting_is_bounded() {
        let input = format!("{}x{}", "(-".repeat(300), ")".repeat(300));
        assert_eq!(parse(&input), Err(ParseError::TooDeep));
        // Parentheses alone do not add tree depth
        let input = format!("{}x{}", "(".repeat(300), ")".repeat(300));
        assert_eq!(parse(&input), Ok(Expr::X));
    }

    #[test]
    fn compiled_function_matches_the_tree() {
        for input in ["x**2 - 4*x + 4", "log(x) + Abs(x)", "E**x * sin(pi*x)", "arctan(x)/2"] {
            let tree = parse(input).unwrap();
            let f = compile(input).unwrap();
            for x in [0.5, 1.5, 3.0] {
                let (a, b) = (tree.eval(x), f(x));
                assert!((a - b).abs() < 1e-9 * (1.0 + a.abs()), "{input} at {x}: {a} vs {b}");
            }
        }
    }
}
