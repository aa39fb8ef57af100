//! Nom-based line parser producing owned [`Message`]s.

use std::str::FromStr;

use nom::{
    bytes::complete::{take_till1, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    error::ErrorKind,
    sequence::preceded,
    IResult,
};
use smallvec::SmallVec;

use crate::error::{ParseErrorKind, WireError};
use crate::prefix::Prefix;

use super::tags::unescape_tag_value;
use super::{Message, Tag};

/// At most 15 parameters (RFC 2812).
const MAX_PARAMS: usize = 15;

fn parse_tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_till1(|c| c == ' '))(input)
}

fn parse_prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_till1(|c| c == ' '))(input)
}

/// `1*letter / 3digit`
fn parse_command(input: &str) -> IResult<&str, &str> {
    let (rest, cmd) = take_while1(|c: char| c.is_ascii_alphanumeric())(input)?;

    let letters = cmd.chars().all(|c| c.is_ascii_alphabetic());
    let numeric = cmd.len() == 3 && cmd.chars().all(|c| c.is_ascii_digit());
    if letters || numeric {
        Ok((rest, cmd))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::AlphaNumeric,
        )))
    }
}

/// Space separated middles, then an optional `:trailing`. Runs of spaces
/// count as one separator.
fn parse_params(mut rest: &str) -> SmallVec<[&str; MAX_PARAMS]> {
    let mut params = SmallVec::new();

    while rest.starts_with(' ') && params.len() < MAX_PARAMS {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }

        if let Some(trailing) = rest.strip_prefix(':') {
            params.push(trailing);
            break;
        }

        let end = rest.find(' ').unwrap_or(rest.len());
        params.push(&rest[..end]);
        rest = &rest[end..];
    }

    params
}

/// Tags, prefix, and command: everything before the parameters.
fn parse_header(input: &str) -> IResult<&str, (Option<&str>, Option<&str>, &str)> {
    let (input, tags) = opt(parse_tags)(input)?;
    let (input, _) = space0(input)?;
    let (input, prefix) = opt(parse_prefix)(input)?;
    let (input, _) = space0(input)?;
    let (input, command) = parse_command(input)?;
    Ok((input, (tags, prefix, command)))
}

fn parse_tags_string(tags: &str) -> Vec<Tag> {
    tags.split(';')
        .filter(|s| !s.is_empty())
        .map(|tag| match tag.split_once('=') {
            Some((key, value)) => Tag {
                key: key.to_owned(),
                value: Some(unescape_tag_value(value)),
            },
            None => Tag {
                key: tag.to_owned(),
                value: None,
            },
        })
        .collect()
}

impl FromStr for Message {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        let line = s.trim_end_matches(['\r', '\n']);
        let input = line.trim_start_matches(' ');
        if input.is_empty() {
            return Err(WireError::InvalidMessage {
                line: line.to_owned(),
                cause: ParseErrorKind::Empty,
            });
        }

        let invalid_command = |at: &str| WireError::InvalidMessage {
            line: line.to_owned(),
            cause: ParseErrorKind::InvalidCommand(line.len() - at.len()),
        };

        let (rest, (tags, prefix, command)) = match parse_header(input) {
            Ok(parsed) => parsed,
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                return Err(invalid_command(e.input))
            }
            Err(nom::Err::Incomplete(_)) => return Err(invalid_command("")),
        };

        Ok(Message {
            tags: tags.map(parse_tags_string).unwrap_or_default(),
            prefix: prefix.map(Prefix::parse),
            command: command.to_ascii_uppercase(),
            params: parse_params(rest).into_iter().map(str::to_owned).collect(),
        })
    }
}
