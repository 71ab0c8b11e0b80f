//! Byte-budget enforcement for sanitized trees.
//!
//! Size is the compact JSON serialization in bytes. Reductions, cheapest
//! large win first:
//! 1. empty sequences, largest first
//! 2. truncate strings, longest first, to a fixed prefix plus a suffix
//!
//! The size is recomputed after every step and the enforcer stops as soon as
//! the budget is met. Failing to fit is reported, never raised.

use crate::node::{Node, PathStep};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Characters kept when the budget enforcer truncates a string.
pub const BUDGET_STRING_PREFIX: usize = 256;

/// Suffix appended to every truncated string.
pub const TRUNCATION_SUFFIX: &str = "...[TRUNCATED]";

/// What the enforcer did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetReport {
    pub max_bytes: usize,
    pub original_bytes: usize,
    pub final_bytes: usize,
    pub arrays_zeroed: usize,
    pub strings_truncated: usize,
    /// The tree is still larger than `max_bytes`.
    pub exceeded: bool,
    /// Size before the first step and after each step; non-increasing.
    pub size_trace: Vec<usize>,
}

impl BudgetReport {
    /// Whether any reduction was applied.
    pub fn reduced(&self) -> bool {
        self.arrays_zeroed > 0 || self.strings_truncated > 0
    }
}

/// Budgeted tree plus report.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetOutcome {
    pub value: Node,
    pub report: BudgetReport,
}

/// Truncate `text` to `max_chars` characters plus [`TRUNCATION_SUFFIX`].
///
/// Returns `None` when the text already fits.
pub fn truncate_chars(text: &str, max_chars: usize) -> Option<String> {
    let mut indices = text.char_indices();
    let (cut, _) = indices.nth(max_chars)?;
    let mut out = String::with_capacity(cut + TRUNCATION_SUFFIX.len());
    out.push_str(&text[..cut]);
    out.push_str(TRUNCATION_SUFFIX);
    Some(out)
}

/// Fit `node` into `max_bytes`.
pub fn enforce_budget(node: &Node, max_bytes: usize) -> BudgetOutcome {
    let original_bytes = node.serialized_len();
    let mut report = BudgetReport {
        max_bytes,
        original_bytes,
        final_bytes: original_bytes,
        arrays_zeroed: 0,
        strings_truncated: 0,
        exceeded: false,
        size_trace: vec![original_bytes],
    };

    if original_bytes <= max_bytes {
        return BudgetOutcome {
            value: node.clone(),
            report,
        };
    }

    let mut value = node.clone();
    let mut current = original_bytes;

    let mut sequences = Vec::new();
    collect_sequences(&value, &mut Vec::new(), &mut sequences);
    // Stable sort keeps document order among equal sizes
    sequences.sort_by(|a, b| b.1.cmp(&a.1));

    for (steps, _) in &sequences {
        if current <= max_bytes {
            break;
        }
        // Gone when an enclosing sequence was already emptied
        let Some(Node::Sequence(items)) = value.get_mut_by_steps(steps) else {
            continue;
        };
        if items.is_empty() {
            continue;
        }
        let before: usize = Node::Sequence(std::mem::take(items)).serialized_len();
        current -= before - "[]".len();
        report.arrays_zeroed += 1;
        report.size_trace.push(current);
        debug!(bytes = current, "budget: emptied sequence");
    }

    if current > max_bytes {
        let mut strings = Vec::new();
        collect_strings(&value, &mut Vec::new(), &mut strings);
        strings.sort_by(|a, b| b.1.cmp(&a.1));

        for (steps, _) in &strings {
            if current <= max_bytes {
                break;
            }
            let Some(Node::String(text)) = value.get_mut_by_steps(steps) else {
                continue;
            };
            let Some(cut) = truncate_chars(text, BUDGET_STRING_PREFIX) else {
                continue;
            };
            if cut.len() >= text.len() {
                continue;
            }
            let before = Node::String(std::mem::replace(text, cut)).serialized_len();
            let after = Node::String(text.clone()).serialized_len();
            current = current - before + after;
            report.strings_truncated += 1;
            report.size_trace.push(current);
            debug!(bytes = current, "budget: truncated string");
        }
    }

    report.final_bytes = current;
    report.exceeded = current > max_bytes;

    if report.exceeded {
        warn!(
            max_bytes,
            original_bytes,
            final_bytes = current,
            "payload still exceeds byte budget"
        );
    } else {
        info!(
            max_bytes,
            original_bytes,
            final_bytes = current,
            arrays_zeroed = report.arrays_zeroed,
            strings_truncated = report.strings_truncated,
            "payload reduced to fit byte budget"
        );
    }

    BudgetOutcome { value, report }
}

fn collect_sequences(node: &Node, steps: &mut Vec<PathStep>, out: &mut Vec<(Vec<PathStep>, usize)>) {
    match node {
        Node::Sequence(items) => {
            if !items.is_empty() {
                out.push((steps.clone(), node.serialized_len()));
            }
            for (idx, item) in items.iter().enumerate() {
                steps.push(PathStep::Index(idx));
                collect_sequences(item, steps, out);
                steps.pop();
            }
        }
        Node::Mapping(map) => {
            for (key, value) in map {
                steps.push(PathStep::Key(key.clone()));
                collect_sequences(value, steps, out);
                steps.pop();
            }
        }
        _ => {}
    }
}

fn collect_strings(node: &Node, steps: &mut Vec<PathStep>, out: &mut Vec<(Vec<PathStep>, usize)>) {
    match node {
        Node::String(text) => out.push((steps.clone(), text.chars().count())),
        Node::Sequence(items) => {
            for (idx, item) in items.iter().enumerate() {
                steps.push(PathStep::Index(idx));
                collect_strings(item, steps, out);
                steps.pop();
            }
        }
        Node::Mapping(map) => {
            for (key, value) in map {
                steps.push(PathStep::Key(key.clone()));
                collect_strings(value, steps, out);
                steps.pop();
            }
        }
        _ => {}
    }
}
