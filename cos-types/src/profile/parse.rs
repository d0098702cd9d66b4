/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Ini-style profile file parser
//!
//! The parser only splits a file into sections and properties. Profile name rules (the `profile `
//! prefix, identifier validation, `[profile default]` precedence) live in `normalize`.
//!
//! Grammar:
//! - `#` and `;` start a comment line
//! - `[name]` starts a section, trailing comments are allowed after `]`
//! - `key = value` defines a property, ` #` / ` ;` start an inline comment in the value
//! - an indented line continues the previous property's value on a new line

use crate::profile::source::File;
use std::borrow::Cow;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// A set of profiles that still carry their raw section names (`profile foo`)
pub type RawProfileSet<'a> = HashMap<&'a str, HashMap<&'a str, Cow<'a, str>>>;

/// An error encountered while parsing a profile file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileParseError {
    location: Location,
    message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Location {
    line_number: usize,
    path: String,
}

impl ProfileParseError {
    pub fn line_number(&self) -> usize {
        self.location.line_number
    }

    pub fn path(&self) -> &str {
        &self.location.path
    }
}

impl Display for ProfileParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error parsing {} on line {}:\n  {}",
            self.location.path, self.location.line_number, self.message
        )
    }
}

impl Error for ProfileParseError {}

struct Parser<'a> {
    data: RawProfileSet<'a>,
    state: State<'a>,
    location: Location,
}

enum State<'a> {
    Starting,
    ReadingProfile {
        profile: &'a str,
        property: Option<&'a str>,
    },
}

/// Parse `file` into sections and raw properties
pub fn parse_profile_file(file: &File) -> Result<RawProfileSet<'_>, ProfileParseError> {
    let mut parser = Parser {
        data: HashMap::new(),
        state: State::Starting,
        location: Location {
            line_number: 0,
            path: file.path.clone().unwrap_or_else(|| "<memory>".to_string()),
        },
    };
    parser.parse_profile(&file.contents)?;
    Ok(parser.data)
}

impl<'a> Parser<'a> {
    fn parse_profile(&mut self, file: &'a str) -> Result<(), ProfileParseError> {
        for (line_number, line) in file.lines().enumerate() {
            self.location.line_number = line_number + 1;
            let line = prepare_line(line, false);
            if is_empty_line(line) || is_comment_line(line) {
                continue;
            }
            if line.starts_with('[') {
                self.read_profile_line(line)?;
            } else if line.starts_with(char::is_whitespace) {
                self.read_property_continuation(line)?;
            } else {
                self.read_property_line(line)?;
            }
        }
        Ok(())
    }

    fn read_profile_line(&mut self, line: &'a str) -> Result<(), ProfileParseError> {
        let line = prepare_line(line, false);
        let profile_name = line
            .strip_prefix('[')
            .ok_or_else(|| self.make_error("Profile definition must start with '['"))?;
        let (profile_name, rest) = profile_name
            .split_once(']')
            .ok_or_else(|| self.make_error("Profile definition must end with ']'"))?;
        if !is_empty_line(rest) && !is_comment_line(rest) {
            return Err(self.make_error("Unexpected trailing text after profile definition"));
        }
        let profile_name = profile_name.trim();
        self.data.entry(profile_name).or_default();
        self.state = State::ReadingProfile {
            profile: profile_name,
            property: None,
        };
        Ok(())
    }

    fn read_property_line(&mut self, line: &'a str) -> Result<(), ProfileParseError> {
        let profile = match &self.state {
            State::Starting => return Err(self.make_error("Expected a profile definition")),
            State::ReadingProfile { profile, .. } => *profile,
        };
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| self.make_error("Expected an '=' sign defining a property"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(self.make_error("Property did not have a name"));
        }
        let value = prepare_line(value, true).trim();
        self.data
            .entry(profile)
            .or_default()
            .insert(key, Cow::Borrowed(value));
        self.state = State::ReadingProfile {
            profile,
            property: Some(key),
        };
        Ok(())
    }

    fn read_property_continuation(&mut self, line: &'a str) -> Result<(), ProfileParseError> {
        let (profile, property) = match &self.state {
            State::ReadingProfile {
                profile,
                property: Some(property),
            } => (*profile, *property),
            _ => {
                return Err(
                    self.make_error("Expected a property definition, found continuation")
                )
            }
        };
        let continuation = prepare_line(line, true).trim();
        let value = self
            .data
            .entry(profile)
            .or_default()
            .entry(property)
            .or_default();
        let mut joined = value.to_string();
        if !joined.is_empty() {
            joined.push('\n');
        }
        joined.push_str(continuation);
        *value = Cow::Owned(joined);
        Ok(())
    }

    fn make_error(&self, message: &str) -> ProfileParseError {
        ProfileParseError {
            location: self.location.clone(),
            message: message.into(),
        }
    }
}

fn is_empty_line(line: &str) -> bool {
    line.trim().is_empty()
}

fn is_comment_line(line: &str) -> bool {
    line.trim_start().starts_with(|c| c == '#' || c == ';')
}

/// Strip trailing whitespace and, in property values, an inline comment
///
/// An inline comment must be preceded by whitespace: `a=b#c` keeps `b#c`.
fn prepare_line(line: &str, comments_need_whitespace: bool) -> &str {
    let line = line.trim_end_matches(|c| c == '\r' || c == '\n');
    let mut prev_char_whitespace = false;
    let mut comment_idx = None;
    for (idx, chr) in line.char_indices() {
        if (chr == '#' || chr == ';') && (!comments_need_whitespace || prev_char_whitespace) {
            comment_idx = Some(idx);
            break;
        }
        prev_char_whitespace = chr.is_whitespace();
    }
    match comment_idx {
        // full-line comments are filtered by the caller, the profile line keeps its brackets
        Some(idx) if comments_need_whitespace => &line[..idx],
        _ => line,
    }
    .trim_end()
}
