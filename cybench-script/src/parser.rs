use crate::error::ParseError;
use crate::expr::Expr;
use crate::lexer::{Cursor, Token};
use crate::script::{Command, Script, SleepUnit};

/// Parses a workload script. `filename` is user-facing (a path or
/// `builtin:...`) and appears in error positions; `weight` is the script's
/// share in weighted selection.
pub fn parse(filename: &str, source: &str, weight: u32) -> Result<Script, ParseError> {
    let mut cursor = Cursor::new(filename, source);
    let mut commands = Vec::new();

    loop {
        cursor.skip_blank();
        match cursor.peek_char() {
            None => break,
            Some('\n') => {
                cursor.bump();
            }
            Some('\\') => commands.push(meta_command(&mut cursor)?),
            Some(_) => commands.push(Command::Query(cursor.read_query_text()?)),
        }
    }

    Ok(Script {
        name: filename.to_string(),
        weight,
        readonly: false,
        commands,
    })
}

fn meta_command(cursor: &mut Cursor<'_>) -> Result<Command, ParseError> {
    expect_punct(cursor, '\\')?;
    let (name, position) = expect_ident(cursor)?;

    let command = match name.as_str() {
        "set" => {
            let (var, _) = expect_ident(cursor)?;
            let expr = expr(cursor)?;
            Command::Set { var, expr }
        }
        "sleep" => {
            let duration = expr(cursor)?;
            let unit = sleep_unit(cursor)?;
            Command::Sleep { duration, unit }
        }
        _ => {
            return Err(ParseError::new(
                position,
                format!("unexpected meta command: '{name}'"),
            ));
        }
    };

    // Meta commands are newline-terminated.
    let (token, position) = cursor.next_token()?;
    match token {
        Token::Newline | Token::Eof => Ok(command),
        other => Err(ParseError::new(
            position,
            format!("expected newline after \\{name}, got {}", other.describe()),
        )),
    }
}

fn sleep_unit(cursor: &mut Cursor<'_>) -> Result<SleepUnit, ParseError> {
    let (token, position) = cursor.peek_token()?;
    let Token::Ident(unit) = token else {
        // No suffix means seconds.
        return Ok(SleepUnit::S);
    };
    cursor.next_token()?;
    match unit.as_str() {
        "us" => Ok(SleepUnit::Us),
        "ms" => Ok(SleepUnit::Ms),
        "s" => Ok(SleepUnit::S),
        _ => Err(ParseError::new(
            position,
            format!(
                "\\sleep command must use 'us', 'ms', or 's' unit argument - or none. got: {unit}"
            ),
        )),
    }
}

fn expr(cursor: &mut Cursor<'_>) -> Result<Expr, ParseError> {
    let mut lhs = term(cursor)?;
    loop {
        let (token, _) = cursor.peek_token()?;
        match token {
            Token::Punct(op @ ('+' | '-')) => {
                cursor.next_token()?;
                let rhs = term(cursor)?;
                lhs = binary(op, lhs, rhs);
            }
            _ => return Ok(lhs),
        }
    }
}

fn term(cursor: &mut Cursor<'_>) -> Result<Expr, ParseError> {
    let mut lhs = factor(cursor)?;
    loop {
        let (token, _) = cursor.peek_token()?;
        match token {
            Token::Punct(op @ ('*' | '/')) => {
                cursor.next_token()?;
                let rhs = factor(cursor)?;
                lhs = binary(op, lhs, rhs);
            }
            _ => return Ok(lhs),
        }
    }
}

fn binary(op: char, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Call {
        name: op.to_string(),
        args: vec![lhs, rhs],
    }
}

fn factor(cursor: &mut Cursor<'_>) -> Result<Expr, ParseError> {
    let (token, position) = cursor.next_token()?;
    match token {
        Token::Int(value) => Ok(Expr::Int(value)),
        Token::Float(value) => Ok(Expr::Float(value)),
        Token::Punct('-') => {
            let (next, position) = cursor.next_token()?;
            match next {
                Token::Int(value) => Ok(Expr::Int(-value)),
                Token::Float(value) => Ok(Expr::Float(-value)),
                other => Err(ParseError::new(
                    position,
                    format!(
                        "unexpected token, expected a number after minus sign: {}",
                        other.describe()
                    ),
                )),
            }
        }
        Token::Punct(':') => {
            let (name, _) = expect_ident(cursor)?;
            Ok(Expr::Var(name))
        }
        Token::Punct('(') => {
            let inner = expr(cursor)?;
            expect_punct(cursor, ')')?;
            Ok(inner)
        }
        Token::Ident(name) => {
            expect_punct(cursor, '(')?;
            let mut args = Vec::new();
            loop {
                let (token, _) = cursor.peek_token()?;
                if token == Token::Punct(')') {
                    cursor.next_token()?;
                    return Ok(Expr::Call { name, args });
                }
                if !args.is_empty() {
                    expect_punct(cursor, ',')?;
                }
                args.push(expr(cursor)?);
            }
        }
        other => Err(ParseError::new(
            position,
            format!("unexpected token, expected expression: {}", other.describe()),
        )),
    }
}

fn expect_ident(cursor: &mut Cursor<'_>) -> Result<(String, crate::Position), ParseError> {
    let (token, position) = cursor.next_token()?;
    match token {
        Token::Ident(name) => Ok((name, position)),
        other => Err(ParseError::new(
            position,
            format!("expected identifier, got {}", other.describe()),
        )),
    }
}

fn expect_punct(cursor: &mut Cursor<'_>, expected: char) -> Result<(), ParseError> {
    let (token, position) = cursor.next_token()?;
    if token == Token::Punct(expected) {
        return Ok(());
    }
    Err(ParseError::new(
        position,
        format!("expected '{expected}', got {}", token.describe()),
    ))
}
