//! Path pattern matching for keep/drop/allow policies.
//!
//! Patterns use the same dot-and-bracket notation as concrete paths
//! (`pedido.itens[2].valor`). A `[]` segment matches any concrete index, so
//! `pedido.itens[].valor` matches every element's `valor`.
//!
//! Each pattern compiles to two anchored regexes: one for the full path and
//! one that also accepts any descendant of a matching path.

use crate::error::{Result, SanitizeError};
use crate::node::PathStep;
use crate::normalize::normalize_field_name;
use regex::Regex;

/// One segment of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSegment {
    /// Literal field name.
    Key(String),
    /// Concrete index `[n]`.
    Index(usize),
    /// Wildcard index `[]`.
    AnyIndex,
}

impl PatternSegment {
    fn matches_step(&self, step: &PathStep) -> bool {
        match (self, step) {
            (PatternSegment::Key(k), PathStep::Key(s)) => k == s,
            (PatternSegment::Index(n), PathStep::Index(m)) => n == m,
            (PatternSegment::AnyIndex, PathStep::Index(_)) => true,
            _ => false,
        }
    }
}

/// A compiled, anchored path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    segments: Vec<PatternSegment>,
    exact: Regex,
    prefix: Regex,
}

impl PathPattern {
    /// Compile a pattern matching raw paths literally.
    pub fn compile(pattern: &str) -> Result<Self> {
        let segments = parse_segments(pattern)?;
        Self::from_segments(pattern, segments)
    }

    /// Compile a pattern whose key segments are normalized field names.
    ///
    /// Used for the allow-list, which is matched against normalized paths.
    pub fn compile_normalized(pattern: &str) -> Result<Self> {
        let segments = parse_segments(pattern)?
            .into_iter()
            .map(|seg| match seg {
                PatternSegment::Key(k) => {
                    let normalized = normalize_field_name(&k);
                    if normalized.is_empty() {
                        Err(SanitizeError::pattern(
                            pattern,
                            format!("segment '{}' normalizes to nothing", k),
                        ))
                    } else {
                        Ok(PatternSegment::Key(normalized))
                    }
                }
                other => Ok(other),
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_segments(pattern, segments)
    }

    fn from_segments(source: &str, segments: Vec<PatternSegment>) -> Result<Self> {
        let body = regex_body(&segments);
        let exact = Regex::new(&format!("^{}$", body))
            .map_err(|e| SanitizeError::pattern(source, e.to_string()))?;
        let prefix = Regex::new(&format!(r"^{}(?:$|[.\[])", body))
            .map_err(|e| SanitizeError::pattern(source, e.to_string()))?;
        Ok(Self {
            source: source.to_string(),
            segments,
            exact,
            prefix,
        })
    }

    /// The pattern text as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    /// Whether the pattern matches the whole path.
    pub fn matches(&self, path: &str) -> bool {
        self.exact.is_match(path)
    }

    /// Whether the pattern matches `path` or one of its ancestors.
    pub fn matches_prefix_of(&self, path: &str) -> bool {
        self.prefix.is_match(path)
    }

    /// Whether `steps` is an ancestor of (or equal to) some path this pattern
    /// can match.
    pub fn could_match_descendant(&self, steps: &[PathStep]) -> bool {
        steps.len() <= self.segments.len()
            && self
                .segments
                .iter()
                .zip(steps)
                .all(|(seg, step)| seg.matches_step(step))
    }
}

/// A set of patterns; a path matches the set if any pattern matches.
#[derive(Debug, Clone, Default)]
pub struct PathPatternSet {
    patterns: Vec<PathPattern>,
}

impl PathPatternSet {
    /// Compile raw-path patterns.
    pub fn compile<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| PathPattern::compile(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Compile normalized-path patterns (allow-list).
    pub fn compile_normalized<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| PathPattern::compile_normalized(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn patterns(&self) -> &[PathPattern] {
        &self.patterns
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }

    pub fn matches_prefix_of(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches_prefix_of(path))
    }

    pub fn could_match_descendant(&self, steps: &[PathStep]) -> bool {
        self.patterns.iter().any(|p| p.could_match_descendant(steps))
    }
}

fn regex_body(segments: &[PatternSegment]) -> String {
    let mut body = String::new();
    for (i, seg) in segments.iter().enumerate() {
        match seg {
            PatternSegment::Key(k) => {
                if i > 0 {
                    body.push_str(r"\.");
                }
                body.push_str(&regex::escape(k));
            }
            PatternSegment::Index(n) => {
                body.push_str(&format!(r"\[{}\]", n));
            }
            PatternSegment::AnyIndex => body.push_str(r"\[\d+\]"),
        }
    }
    body
}

/// Parse dot-and-bracket text into segments.
fn parse_segments(pattern: &str) -> Result<Vec<PatternSegment>> {
    if pattern.trim().is_empty() {
        return Err(SanitizeError::pattern(pattern, "empty pattern"));
    }

    let mut segments = Vec::new();
    let mut key = String::new();
    // A key is required after a '.' separator
    let mut key_required = false;
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !key.is_empty() {
                    segments.push(PatternSegment::Key(std::mem::take(&mut key)));
                } else if key_required
                    || !matches!(
                        segments.last(),
                        Some(PatternSegment::Index(_) | PatternSegment::AnyIndex)
                    )
                {
                    return Err(SanitizeError::pattern(pattern, "empty field name"));
                }
                key_required = true;
            }
            '[' => {
                if !key.is_empty() {
                    segments.push(PatternSegment::Key(std::mem::take(&mut key)));
                } else if key_required {
                    return Err(SanitizeError::pattern(pattern, "empty field name"));
                }
                key_required = false;

                let mut inner = String::new();
                let mut closed = false;
                for ic in chars.by_ref() {
                    if ic == ']' {
                        closed = true;
                        break;
                    }
                    inner.push(ic);
                }
                if !closed {
                    return Err(SanitizeError::pattern(pattern, "unclosed '['"));
                }
                if inner.is_empty() {
                    segments.push(PatternSegment::AnyIndex);
                } else {
                    let idx = inner.parse::<usize>().map_err(|_| {
                        SanitizeError::pattern(pattern, format!("invalid index '{}'", inner))
                    })?;
                    segments.push(PatternSegment::Index(idx));
                }
            }
            ']' => return Err(SanitizeError::pattern(pattern, "unmatched ']'")),
            other => {
                key.push(other);
                key_required = false;
            }
        }
    }

    if !key.is_empty() {
        segments.push(PatternSegment::Key(key));
    } else if key_required {
        return Err(SanitizeError::pattern(pattern, "trailing '.'"));
    }

    Ok(segments)
}
