use std::fmt::Debug;
use std::ops::Range;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderMatch {
    pub name: String,
    pub span: Range<usize>,
}

pub trait PlaceholderMatcher: Send + Sync + Debug {
    /// All occurrences, left to right. Repeated names are reported every time.
    fn find_all(&self, text: &str) -> Vec<PlaceholderMatch>;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("placeholder pattern `{pattern}` is not a valid regex: {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("placeholder pattern `{pattern}` has no capture group for the parameter name")]
    NoCaptureGroup { pattern: String },

    #[error("placeholder prefix `{prefix}` is not supported (use `:`, `@` or `$`)")]
    UnsupportedPrefix { prefix: char },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameGroup {
    Named,
    First,
}

/// Regex matcher. The name comes from the group called `name` when the
/// pattern defines one, otherwise from the first capture group.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
    name_group: NameGroup,
}

impl RegexMatcher {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(pattern).map_err(|error| PatternError::InvalidRegex {
            pattern: pattern.to_string(),
            message: error.to_string(),
        })?;

        let name_group = if regex.capture_names().flatten().any(|name| name == "name") {
            NameGroup::Named
        } else if regex.captures_len() > 1 {
            NameGroup::First
        } else {
            return Err(PatternError::NoCaptureGroup {
                pattern: pattern.to_string(),
            });
        };

        Ok(Self { regex, name_group })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl PlaceholderMatcher for RegexMatcher {
    fn find_all(&self, text: &str) -> Vec<PlaceholderMatch> {
        self.regex
            .captures_iter(text)
            .filter_map(|captures| {
                let group = match self.name_group {
                    NameGroup::Named => captures.name("name"),
                    NameGroup::First => captures.get(1),
                }?;
                if group.as_str().is_empty() {
                    return None;
                }
                let whole = captures.get(0)?;
                Some(PlaceholderMatch {
                    name: group.as_str().to_string(),
                    span: whole.range(),
                })
            })
            .collect()
    }

    fn describe(&self) -> String {
        format!("regex:{}", self.regex.as_str())
    }
}

/// Tokenizing matcher for prefixed names such as `:name`, `@name` or `$name`.
///
/// Occurrences inside quoted text, `--` and `/* */` comments are skipped, as
/// is the `::` cast operator when the prefix is `:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixMatcher {
    prefix: char,
}

impl PrefixMatcher {
    pub fn new(prefix: char) -> Result<Self, PatternError> {
        if matches!(prefix, ':' | '@' | '$') {
            Ok(Self { prefix })
        } else {
            Err(PatternError::UnsupportedPrefix { prefix })
        }
    }

    #[must_use]
    pub const fn prefix(self) -> char {
        self.prefix
    }
}

impl PlaceholderMatcher for PrefixMatcher {
    fn find_all(&self, text: &str) -> Vec<PlaceholderMatch> {
        let bytes = text.as_bytes();
        // Only ASCII prefixes are accepted by `new`.
        let prefix = self.prefix as u8;
        let mut matches = Vec::new();
        let mut index = 0;

        while index < bytes.len() {
            match bytes[index] {
                b'\'' | b'"' => index = skip_quoted(bytes, index),
                b'-' if bytes.get(index + 1) == Some(&b'-') => index = skip_line(bytes, index),
                b'/' if bytes.get(index + 1) == Some(&b'*') => index = skip_block(bytes, index),
                byte if byte == prefix => {
                    if prefix == b':' && bytes.get(index + 1) == Some(&b':') {
                        index += 2;
                        continue;
                    }

                    let name_start = index + 1;
                    let mut end = name_start;
                    while end < bytes.len() && is_identifier_byte(bytes[end], end == name_start) {
                        end += 1;
                    }

                    if end > name_start {
                        matches.push(PlaceholderMatch {
                            name: text[name_start..end].to_string(),
                            span: index..end,
                        });
                    }
                    index = end.max(index + 1);
                }
                _ => index += 1,
            }
        }

        matches
    }

    fn describe(&self) -> String {
        format!("prefix:{}", self.prefix)
    }
}

fn skip_quoted(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    bytes[start + 1..]
        .iter()
        .position(|byte| *byte == quote)
        .map_or(bytes.len(), |offset| start + 1 + offset + 1)
}

fn skip_line(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|byte| *byte == b'\n')
        .map_or(bytes.len(), |offset| start + offset + 1)
}

fn skip_block(bytes: &[u8], start: usize) -> usize {
    bytes[start + 2..]
        .windows(2)
        .position(|pair| pair == b"*/")
        .map_or(bytes.len(), |offset| start + 2 + offset + 2)
}

fn is_identifier_byte(byte: u8, first: bool) -> bool {
    if first {
        byte.is_ascii_alphabetic() || byte == b'_'
    } else {
        byte.is_ascii_alphanumeric() || byte == b'_'
    }
}
