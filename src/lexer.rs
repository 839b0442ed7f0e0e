//! PDF lexer (tokenizer).
//!
//! Splits a byte stream into numbers, strings, names, delimiters and keywords.
//! Whitespace (space, \t, \r, \n, \0, \f) and comments (% to EOL) are skipped
//! before every token.
//!
//! Keywords are read as a whole run of regular characters and then classified,
//! so `R` is only a reference marker when it stands alone (`RG` is an operator).

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{map, opt, value},
    multi::many0,
    sequence::{delimited, preceded},
    IResult,
};

/// Token types recognized by the PDF lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Integer number (e.g., 42, -123)
    Integer(i64),

    /// Real number (e.g., 3.14, -2.5, .5)
    Real(f64),

    /// Raw bytes between the parentheses of a literal string; escapes undecoded
    LiteralString(&'a [u8]),

    /// Raw bytes between the angle brackets of a hex string
    HexString(&'a [u8]),

    /// Name without its slash, `#XX` escapes decoded
    Name(String),

    /// `true`
    True,

    /// `false`
    False,

    /// `null`
    Null,

    /// `[`
    ArrayStart,

    /// `]`
    ArrayEnd,

    /// `<<`
    DictStart,

    /// `>>`
    DictEnd,

    /// `obj`
    ObjStart,

    /// `endobj`
    ObjEnd,

    /// `stream`
    StreamStart,

    /// `endstream`
    StreamEnd,

    /// `R`
    R,

    /// Any other run of regular characters (`xref`, `trailer`, operators)
    Keyword(&'a [u8]),
}

/// PDF whitespace: space, tab, CR, LF, NUL, form feed.
pub fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

/// PDF delimiters.
pub fn is_delimiter(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

/// Neither whitespace nor a delimiter.
pub fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

fn whitespace(input: &[u8]) -> IResult<&[u8], ()> {
    value((), take_while1(is_whitespace))(input)
}

fn comment(input: &[u8]) -> IResult<&[u8], ()> {
    value((), preceded(char('%'), take_till(|c| c == b'\r' || c == b'\n')))(input)
}

/// Skip all whitespace and comments.
pub fn skip_ws(input: &[u8]) -> IResult<&[u8], ()> {
    value((), many0(alt((whitespace, comment))))(input)
}

fn number_error(input: &[u8]) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
}

/// Integer or real: `42`, `-123`, `+17`, `3.14`, `.5`, `5.`, `-.002`.
fn parse_number(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let start = input;
    let (input, sign) = opt(one_of("+-"))(input)?;
    let (input, int_part) = opt(digit1)(input)?;
    let (input, frac_part) = opt(preceded(char('.'), opt(digit1)))(input)?;

    if int_part.is_none() && !matches!(frac_part, Some(Some(_))) {
        return Err(number_error(start));
    }

    let negative = sign == Some('-');
    let int_value = match int_part {
        Some(digits) => std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse::<i64>().ok()),
        None => Some(0),
    };

    match frac_part {
        None => {
            // Integers too large for i64 degrade to reals
            let value = match int_value {
                Some(v) => Token::Integer(if negative { -v } else { v }),
                None => {
                    let text = std::str::from_utf8(&start[..start.len() - input.len()])
                        .map_err(|_| number_error(start))?;
                    Token::Real(text.parse::<f64>().map_err(|_| number_error(start))?)
                },
            };
            Ok((input, value))
        },
        Some(frac) => {
            let int_text = int_part.and_then(|d| std::str::from_utf8(d).ok()).unwrap_or("0");
            let frac_text = frac.and_then(|d| std::str::from_utf8(d).ok()).unwrap_or("0");
            let mut real: f64 = format!("{}.{}", int_text, frac_text)
                .parse()
                .map_err(|_| number_error(start))?;
            if negative {
                real = -real;
            }
            Ok((input, Token::Real(real)))
        },
    }
}

/// Literal string with balanced parentheses; backslash escapes are skipped over
/// but left encoded.
fn parse_literal_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (body, _) = char('(')(input)?;
    let mut depth = 1usize;
    let mut pos = 0;

    while pos < body.len() {
        match body[pos] {
            b'\\' => pos += 2,
            b'(' => {
                depth += 1;
                pos += 1;
            },
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&body[pos + 1..], Token::LiteralString(&body[..pos])));
                }
                pos += 1;
            },
            _ => pos += 1,
        }
    }

    Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)))
}

/// Hex string; must not be a dictionary start.
fn parse_hex_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    if input.starts_with(b"<<") {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }

    delimited(
        char('<'),
        map(
            take_while(|c: u8| c.is_ascii_hexdigit() || is_whitespace(c)),
            Token::HexString,
        ),
        char('>'),
    )(input)
}

/// Decode `#XX` escape sequences in a name. Invalid sequences are kept literally.
///
/// ```
/// # use pdf_kiln::lexer::decode_name_escapes;
/// assert_eq!(decode_name_escapes(b"A#20B#23C"), "A B#C");
/// assert_eq!(decode_name_escapes(b"A#"), "A#");
/// ```
pub fn decode_name_escapes(raw: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            let hex = &raw[i + 1..i + 3];
            if let Some(byte) = std::str::from_utf8(hex)
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok())
            {
                bytes.push(byte);
                i += 3;
                continue;
            }
        }
        bytes.push(raw[i]);
        i += 1;
    }

    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

fn parse_name(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    preceded(
        char('/'),
        map(take_while(is_regular), |raw: &[u8]| Token::Name(decode_name_escapes(raw))),
    )(input)
}

fn parse_delimiter(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    alt((
        value(Token::DictStart, tag(b"<<")),
        value(Token::DictEnd, tag(b">>")),
        value(Token::ArrayStart, tag(b"[")),
        value(Token::ArrayEnd, tag(b"]")),
    ))(input)
}

/// A run of regular characters classified as a keyword.
fn parse_keyword(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    map(take_while1(is_regular), |word: &[u8]| match word {
        b"true" => Token::True,
        b"false" => Token::False,
        b"null" => Token::Null,
        b"obj" => Token::ObjStart,
        b"endobj" => Token::ObjEnd,
        b"stream" => Token::StreamStart,
        b"endstream" => Token::StreamEnd,
        b"R" => Token::R,
        other => Token::Keyword(other),
    })(input)
}

/// Parse a single token after skipping whitespace and comments.
///
/// Numbers are tried before keywords so `-5` and `.5` are not read as words.
pub fn token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (input, _) = skip_ws(input)?;
    alt((
        parse_delimiter,
        parse_name,
        parse_number_token,
        parse_literal_string,
        parse_hex_string,
        parse_keyword,
    ))(input)
}

/// A number must end at a non-regular character (`12abc` is a keyword).
fn parse_number_token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, tok) = parse_number(input)?;
    match rest.first() {
        Some(&c) if is_regular(c) => Err(number_error(input)),
        _ => Ok((rest, tok)),
    }
}

/// Tokenize until the input is exhausted or an error occurs.
pub fn tokens(input: &[u8]) -> IResult<&[u8], Vec<Token<'_>>> {
    many0(token)(input)
}
