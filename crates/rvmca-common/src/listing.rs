//! Reader for annotated assembly listings.
//!
//! A listing is plain assembly, one instruction per line, with `#` comments.
//! Comments of the form `# MCA-<WORD> <ARGS>` carry directives:
//!
//! ```text
//! # MCA-BEGIN saxpy        <- starts a named analysis region
//! # MCA-RISCV-LMUL M2      <- an instrumentation directive (kind, data)
//! vadd.vv v1, v2, v3
//! # MCA-END                <- ends the current region
//! ```
//!
//! The reader doesn't interpret instrumentation directives; it only splits them
//! into a kind name and raw data.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::inst::{Inst, InstParseError};

pub const DIRECTIVE_PREFIX: &str = "MCA-";

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ListingItem {
    Instruction(Inst),
    Instrument { kind: String, data: String },
    RegionBegin { name: Option<String> },
    RegionEnd,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ListingLine {
    /// 1-based line number.
    pub line: usize,
    pub item: ListingItem,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ListingError {
    line: usize,
    kind: ListingErrorKind,
}

#[derive(Clone, PartialEq, Eq, Debug)]
enum ListingErrorKind {
    Instruction(InstParseError),
    NestedRegion,
    UnmatchedRegionEnd,
    UnterminatedRegion,
    EmptyDirective,
}

impl ListingError {
    pub fn line(&self) -> usize {
        self.line
    }
}

impl core::fmt::Display for ListingError {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(fmt, "line {}: ", self.line)?;
        match &self.kind {
            ListingErrorKind::Instruction(error) => write!(fmt, "{error}"),
            ListingErrorKind::NestedRegion => fmt.write_str("regions cannot be nested"),
            ListingErrorKind::UnmatchedRegionEnd => fmt.write_str("found a region end without a matching region begin"),
            ListingErrorKind::UnterminatedRegion => fmt.write_str("region is never terminated"),
            ListingErrorKind::EmptyDirective => fmt.write_str("empty directive"),
        }
    }
}

impl core::error::Error for ListingError {}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(position) => &line[..position],
        None => line,
    }
}

fn parse_directive(body: &str, line: usize) -> Result<ListingItem, ListingError> {
    let (word, args) = match body.split_once(char::is_whitespace) {
        Some((word, args)) => (word, args.trim()),
        None => (body, ""),
    };

    Ok(match word {
        "" => {
            return Err(ListingError {
                line,
                kind: ListingErrorKind::EmptyDirective,
            })
        }
        "BEGIN" => ListingItem::RegionBegin {
            name: if args.is_empty() { None } else { Some(args.to_string()) },
        },
        "END" => ListingItem::RegionEnd,
        kind => ListingItem::Instrument {
            kind: kind.to_string(),
            data: args.to_string(),
        },
    })
}

/// Parses a whole listing, validating that regions are properly delimited.
pub fn parse_listing(text: &str) -> Result<Vec<ListingLine>, ListingError> {
    let mut output = Vec::new();
    let mut open_region: Option<usize> = None;

    for (index, raw_line) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw_line.trim();

        if let Some(comment) = trimmed.strip_prefix('#') {
            let Some(body) = comment.trim_start().strip_prefix(DIRECTIVE_PREFIX) else {
                continue;
            };

            let item = parse_directive(body.trim(), line)?;
            match item {
                ListingItem::RegionBegin { .. } => {
                    if open_region.is_some() {
                        return Err(ListingError {
                            line,
                            kind: ListingErrorKind::NestedRegion,
                        });
                    }
                    open_region = Some(line);
                }
                ListingItem::RegionEnd => {
                    if open_region.take().is_none() {
                        return Err(ListingError {
                            line,
                            kind: ListingErrorKind::UnmatchedRegionEnd,
                        });
                    }
                }
                _ => {}
            }

            output.push(ListingLine { line, item });
            continue;
        }

        let mut code = strip_comment(trimmed).trim();

        // Labels carry no cost; drop them but keep anything which follows.
        if let Some((label, rest)) = code.split_once(':') {
            if !label.is_empty() && !label.contains(char::is_whitespace) {
                code = rest.trim();
            }
        }

        if code.is_empty() || code.starts_with('.') {
            continue;
        }

        let inst = code.parse::<Inst>().map_err(|error| ListingError {
            line,
            kind: ListingErrorKind::Instruction(error),
        })?;

        output.push(ListingLine {
            line,
            item: ListingItem::Instruction(inst),
        });
    }

    if let Some(line) = open_region {
        return Err(ListingError {
            line,
            kind: ListingErrorKind::UnterminatedRegion,
        });
    }

    Ok(output)
}
