use std::{
    ops::Range,
    path::{Path, PathBuf},
};

use crate::chop;

/// The kata's assertion table: `(target, sequence, expected)`.
const BUILTIN: [(i64, &[i64], isize); 19] = [
    (3, &[], -1),
    (3, &[1], -1),
    (1, &[1], 0),
    //
    (1, &[1, 3, 5], 0),
    (3, &[1, 3, 5], 1),
    (5, &[1, 3, 5], 2),
    (0, &[1, 3, 5], -1),
    (2, &[1, 3, 5], -1),
    (4, &[1, 3, 5], -1),
    (6, &[1, 3, 5], -1),
    //
    (1, &[1, 3, 5, 7], 0),
    (3, &[1, 3, 5, 7], 1),
    (5, &[1, 3, 5, 7], 2),
    (7, &[1, 3, 5, 7], 3),
    (0, &[1, 3, 5, 7], -1),
    (2, &[1, 3, 5, 7], -1),
    (4, &[1, 3, 5, 7], -1),
    (6, &[1, 3, 5, 7], -1),
    (8, &[1, 3, 5, 7], -1),
];

/// Extension of files picked up when walking a directory for case tables.
pub const EXTENSION: &str = "chop";

/// A single assertion: `chop(target, sequence) == expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub target: i64,
    pub sequence: Vec<i64>,
    pub expected: isize,
    span: Range<usize>,
    expected_span: Range<usize>,
}

impl Case {
    /// Whether `actual` is an acceptable answer.
    ///
    /// When the target occurs more than once any index holding it is accepted.
    pub fn accepts(&self, actual: isize) -> bool {
        if actual == self.expected {
            return true;
        }
        self.expected != chop::NOT_FOUND
            && usize::try_from(actual)
                .ok()
                .and_then(|idx| self.sequence.get(idx))
                .is_some_and(|&value| value == self.target)
    }

    /// Span of the whole assertion in the table source.
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    /// Span of the expected index in the table source.
    pub fn expected_span(&self) -> Range<usize> {
        self.expected_span.clone()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseError {
    Malformed,
    InvalidInteger { start: usize, end: usize },
    Unsorted { start: usize, end: usize },
    InvalidExpectation { start: usize, end: usize },
}

#[derive(Debug)]
struct Entry {
    case: Result<Case, ParseError>,
    /// Span of the line, without the trailing newline
    span: Range<usize>,
}

/// An assertion that could not be parsed.
pub struct InvalidCase<'a> {
    pub error: ParseError,
    entry: &'a Entry,
}

impl InvalidCase<'_> {
    pub fn span(&self) -> Range<usize> {
        self.entry.span.clone()
    }
}

/// A named list of assertions together with the text they were read from.
#[derive(Debug)]
pub struct CaseTable {
    pub name: String,
    pub source: String,
    entries: Vec<Entry>,
}

impl CaseTable {
    /// The fixed kata table, rendered in the case file syntax.
    pub fn builtin() -> Self {
        let mut source = String::new();
        let mut entries = vec![];
        for (target, sequence, expected) in BUILTIN {
            let start = source.len();
            source.push_str(&format!("chop({target}, {sequence:?}) == "));
            let expected_start = source.len();
            source.push_str(&expected.to_string());
            let end = source.len();
            source.push('\n');
            entries.push(Entry {
                case: Ok(Case {
                    target,
                    sequence: sequence.to_vec(),
                    expected,
                    span: start..end,
                    expected_span: expected_start..end,
                }),
                span: start..end,
            });
        }
        Self {
            name: "<builtin>".to_string(),
            source,
            entries,
        }
    }

    /// Parses a case table. Errors are kept per line, see [`CaseTable::invalid`].
    pub fn parse(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let parser = Parser::new();
        let mut entries = vec![];
        let mut offset = 0;
        for line in source.split_inclusive('\n') {
            let start = offset;
            offset += line.len();
            let line = line.trim_end_matches(['\n', '\r']);
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            entries.push(Entry {
                case: parser.parse_line(start, line),
                span: start..start + line.len(),
            });
        }
        Self {
            name: name.into(),
            source,
            entries,
        }
    }

    pub fn read(path: &Path) -> std::io::Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Ok(Self::parse(path.display().to_string(), source))
    }

    /// Reads every table named by `paths`. Directories are walked for `*.chop` files, honoring
    /// ignore files along the way.
    pub fn collect(paths: &[PathBuf]) -> Result<Vec<Self>, ignore::Error> {
        let mut tables = vec![];
        for path in paths {
            for result in ignore::Walk::new(path) {
                let entry = result?;

                let Some(file_type) = entry.file_type() else {
                    continue;
                };

                let explicit = entry.depth() == 0;
                let has_extension = entry.path().extension().is_some_and(|ext| ext == EXTENSION);
                if file_type.is_file() && (explicit || has_extension) {
                    tables.push(Self::read(entry.path())?);
                }
            }
        }
        Ok(tables)
    }

    /// Iterator over all valid cases
    pub fn cases(&self) -> impl Iterator<Item = &Case> + '_ {
        self.entries.iter().filter_map(|entry| entry.case.as_ref().ok())
    }

    /// Iterator over all lines that failed to parse
    pub fn invalid(&self) -> impl Iterator<Item = InvalidCase<'_>> + '_ {
        self.entries.iter().filter_map(|entry| match entry.case {
            Ok(_) => None,
            Err(error) => Some(InvalidCase { error, entry }),
        })
    }
}

struct Parser {
    re: regex::Regex,
}

impl Parser {
    fn new() -> Parser {
        const CASE_REGEX: &str =
            r"^\s*chop\(\s*([^,\s]+)\s*,\s*\[([^\]]*)\]\s*\)\s*==\s*(\S+)\s*$";
        Parser {
            re: regex::Regex::new(CASE_REGEX).unwrap(),
        }
    }

    fn parse_line(&self, byte_offset: usize, line: &str) -> Result<Case, ParseError> {
        let Some(captures) = self.re.captures(line) else {
            return Err(ParseError::Malformed);
        };
        let span_of = |m: regex::Match| byte_offset + m.start()..byte_offset + m.end();

        let target_match = captures.get(1).ok_or(ParseError::Malformed)?;
        let target = parse_integer(target_match.as_str(), span_of(target_match))?;

        let sequence_match = captures.get(2).ok_or(ParseError::Malformed)?;
        let sequence = parse_sequence(byte_offset + sequence_match.start(), sequence_match.as_str())?;
        if sequence.windows(2).any(|w| w[0] > w[1]) {
            let span = span_of(sequence_match);
            return Err(ParseError::Unsorted {
                start: span.start,
                end: span.end,
            });
        }

        let expected_match = captures.get(3).ok_or(ParseError::Malformed)?;
        let expected_span = span_of(expected_match);
        let expected: isize = parse_integer(expected_match.as_str(), expected_span.clone())?;
        if !is_consistent(&sequence, target, expected) {
            return Err(ParseError::InvalidExpectation {
                start: expected_span.start,
                end: expected_span.end,
            });
        }

        Ok(Case {
            target,
            sequence,
            expected,
            span: byte_offset..byte_offset + line.len(),
            expected_span,
        })
    }
}

fn parse_integer<T: std::str::FromStr>(s: &str, span: Range<usize>) -> Result<T, ParseError> {
    s.parse::<T>().map_err(|_| ParseError::InvalidInteger {
        start: span.start,
        end: span.end,
    })
}

fn parse_sequence(byte_offset: usize, inner: &str) -> Result<Vec<i64>, ParseError> {
    if inner.trim().is_empty() {
        return Ok(vec![]);
    }
    let mut sequence = vec![];
    let mut offset = byte_offset;
    for item in inner.split(',') {
        let leading = item.len() - item.trim_start().len();
        let value = item.trim();
        let start = offset + leading;
        sequence.push(parse_integer(value, start..start + value.len())?);
        offset += item.len() + 1;
    }
    Ok(sequence)
}

/// Whether `expected` is a correct answer for `chop(target, sequence)`.
fn is_consistent(sequence: &[i64], target: i64, expected: isize) -> bool {
    if expected == chop::NOT_FOUND {
        !sequence.contains(&target)
    } else {
        usize::try_from(expected)
            .ok()
            .and_then(|idx| sequence.get(idx))
            .is_some_and(|&value| value == target)
    }
}
