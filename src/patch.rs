//! # Patch Engine
//!
//! Applies and removes named textual patches on host files. The marker of a
//! rule is the only record of its state: if the target contains the marker
//! (exact substring) the rule is applied, otherwise it is not.
//!
//! Two placements are supported:
//!
//! - `insert-after` wraps the payload in boundary lines and inserts the block
//!   right after the line holding the anchor:
//!
//!   ```text
//!   src-$(CONFIG_WANT_LDC1612) += sensor_ldc1612.c
//!   # >>> eddy-ng:makefile-sources
//!   src-$(CONFIG_WANT_LDC1612) += sensor_ldc1612_ng.c
//!   # <<< makefile-sources
//!   ```
//!
//! - `replace` swaps the first occurrence of the anchor for the payload, which
//!   carries the marker inline.
//!
//! Removal undoes exactly what apply did, so apply followed by remove gives
//! back the original bytes. When the anchor line was the last line and had
//! no terminator, apply adds one before the block and removal takes it away
//! again. The block uses the line ending of the anchor line.

use std::path::Path;

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::host::HostTree;
use crate::manifest::{PatchKind, PatchRule};
use crate::report::{Item, OperationOutcome, Status};

fn item(rule: &PatchRule) -> Item {
    Item::Patch {
        name: rule.name.clone(),
        target: rule.target.clone(),
    }
}

/// Apply every rule in declared order.
pub fn apply(host: &mut HostTree, rules: &[PatchRule]) -> Vec<OperationOutcome> {
    rules
        .iter()
        .map(|rule| {
            let status = apply_rule(host, rule).unwrap_or_else(Status::Failed);
            OperationOutcome::new(item(rule), status)
        })
        .collect()
}

/// Remove every rule, last declared first.
pub fn remove(host: &mut HostTree, rules: &[PatchRule]) -> Vec<OperationOutcome> {
    rules
        .iter()
        .rev()
        .map(|rule| {
            let status = remove_rule(host, rule).unwrap_or_else(Status::Failed);
            OperationOutcome::new(item(rule), status)
        })
        .collect()
}

fn apply_rule(host: &mut HostTree, rule: &PatchRule) -> Result<Status> {
    let Some(content) = host.read_text(&rule.target)? else {
        if rule.optional {
            debug!("optional target {} absent", rule.target.display());
            return Ok(Status::Skipped("optional target not present".to_string()));
        }
        return Err(Error::MissingTarget {
            path: rule.target.clone(),
        });
    };

    if content.contains(&rule.marker) {
        debug!("rule '{}' already applied", rule.name);
        return Ok(Status::AlreadyApplied);
    }

    let Some(patched) = apply_to(&content, rule) else {
        warn!(
            "anchor of rule '{}' not found in {}",
            rule.name,
            rule.target.display()
        );
        return Err(Error::AnchorNotFound {
            rule: rule.name.clone(),
            path: rule.target.clone(),
            anchor: rule.anchor.clone(),
        });
    };

    host.write(&rule.target, patched.as_bytes())?;
    info!("applied rule '{}' to {}", rule.name, rule.target.display());
    Ok(Status::Applied)
}

fn remove_rule(host: &mut HostTree, rule: &PatchRule) -> Result<Status> {
    let Some(content) = host.read_text(&rule.target)? else {
        debug!("target {} absent, nothing to remove", rule.target.display());
        return Ok(Status::AlreadyApplied);
    };

    if !content.contains(&rule.marker) {
        return Ok(Status::AlreadyApplied);
    }

    let restored = remove_from(&content, rule, &rule.target)?;
    host.write(&rule.target, restored.as_bytes())?;
    info!("removed rule '{}' from {}", rule.name, rule.target.display());
    Ok(Status::Applied)
}

/// Apply `rule` to `content`. Returns `None` when the anchor is absent.
///
/// The caller is expected to have checked that the marker is not present.
pub fn apply_to(content: &str, rule: &PatchRule) -> Option<String> {
    let pos = content.find(&rule.anchor)?;
    match rule.kind {
        PatchKind::Replace => {
            let mut out = String::with_capacity(content.len() + rule.payload.len());
            out.push_str(&content[..pos]);
            out.push_str(&rule.payload);
            out.push_str(&content[pos + rule.anchor.len()..]);
            Some(out)
        }
        PatchKind::InsertAfter => {
            let search_from = pos + rule.anchor.len();
            let line_end = content[search_from..]
                .find('\n')
                .map(|i| search_from + i + 1);
            let eol = match line_end {
                Some(end) if content[..end].ends_with("\r\n") => "\r\n",
                Some(_) => "\n",
                None if content.contains("\r\n") => "\r\n",
                None => "\n",
            };
            let block = render_block(rule, eol);

            let mut out = String::with_capacity(content.len() + block.len() + 2 * eol.len());
            match line_end {
                Some(end) => {
                    out.push_str(&content[..end]);
                    out.push_str(&block);
                    out.push_str(eol);
                    out.push_str(&content[end..]);
                }
                None => {
                    out.push_str(content);
                    out.push_str(eol);
                    out.push_str(&block);
                }
            }
            Some(out)
        }
    }
}

/// Begin line, payload lines, and end line joined by `eol`, without a final
/// terminator.
fn render_block(rule: &PatchRule, eol: &str) -> String {
    let mut lines = vec![rule.begin_line()];
    let payload = rule.payload.trim_end_matches(['\r', '\n']);
    lines.extend(payload.lines().map(str::to_string));
    lines.push(rule.end_line());
    lines.join(eol)
}

/// Undo `rule` in `content`, which must contain the marker. `target` is only
/// used for error context.
pub fn remove_from(content: &str, rule: &PatchRule, target: &Path) -> Result<String> {
    let corrupt = |message: &str| Error::CorruptBlock {
        rule: rule.name.clone(),
        path: target.to_path_buf(),
        message: message.to_string(),
    };

    match rule.kind {
        PatchKind::Replace => {
            let pos = content
                .find(&rule.payload)
                .ok_or_else(|| corrupt("marker present but payload was edited"))?;
            let mut out = String::with_capacity(content.len());
            out.push_str(&content[..pos]);
            out.push_str(&rule.anchor);
            out.push_str(&content[pos + rule.payload.len()..]);
            Ok(out)
        }
        PatchKind::InsertAfter => {
            let begin = rule.begin_line();
            let start = content
                .find(&begin)
                .ok_or_else(|| corrupt("marker present but begin line is missing"))?;
            if start != 0 && !content[..start].ends_with('\n') {
                return Err(corrupt("begin line does not start a line"));
            }

            let end = rule.end_line();
            let mut cursor = start + begin.len();
            let end_stop = loop {
                let found = content[cursor..]
                    .find(&end)
                    .map(|i| cursor + i)
                    .ok_or_else(|| corrupt("end line is missing"))?;
                let stop = found + end.len();
                let rest = &content[stop..];
                let at_line_start = content[..found].ends_with('\n');
                let at_line_end =
                    rest.is_empty() || rest.starts_with('\n') || rest.starts_with("\r\n");
                if at_line_start && at_line_end {
                    break stop;
                }
                cursor = stop;
            };

            // The block's own line ending, which apply also used around it.
            let eol = if content[start + begin.len()..].starts_with("\r\n") {
                "\r\n"
            } else {
                "\n"
            };

            let rest = &content[end_stop..];
            let mut out = String::with_capacity(content.len());
            if rest.is_empty() {
                let head = &content[..start];
                out.push_str(head.strip_suffix(eol).unwrap_or(head));
            } else {
                let rest = rest
                    .strip_prefix(eol)
                    .ok_or_else(|| corrupt("end line terminator does not match the block"))?;
                out.push_str(&content[..start]);
                out.push_str(rest);
            }
            Ok(out)
        }
    }
}
