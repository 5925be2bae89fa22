// SPDX-License-Identifier: MIT

//! jm-compiler: turns a plan document into a buffered set of enqueue and
//! dependency operations.
//!
//! The grammar is intentionally loose — `policy:` lines, an optional
//! `plan_id=` header, and `- [ ] field=value ...` step lines — matched the
//! way a quick internal tool would match it, not a general-purpose markdown
//! parser.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use jm_core::{JobId, Lane, SchedulerError};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

/// Plans are compiled at most once per `/expand` call, so these are built
/// fresh rather than cached behind a `Lazy` — not worth the dependency.
// Allow expect here as the regex is compile-time verified to be valid.
#[allow(clippy::expect_used)]
fn step_re() -> Regex {
    Regex::new(r"^-\s*\[\s*\]\s+(.+)$").expect("constant regex pattern is valid")
}

#[allow(clippy::expect_used)]
fn field_re() -> Regex {
    Regex::new(r"(\w+)=(\S+)").expect("constant regex pattern is valid")
}

#[allow(clippy::expect_used)]
fn sha_re() -> Regex {
    Regex::new(r"#sha1=([a-fA-F0-9]+)").expect("constant regex pattern is valid")
}

/// One compiled step: a step-local id, its global id, and everything the
/// scheduler needs to enqueue it.
#[derive(Debug, Clone)]
pub struct Step {
    pub local_id: String,
    pub global_id: JobId,
    pub lane: Lane,
    pub payload: String,
    pub deps: Vec<String>,
    pub dedupe_key: Option<String>,
}

/// Everything parsed out of one plan document.
#[derive(Debug, Clone)]
pub struct CompiledPlan {
    pub plan_id: String,
    pub steps: Vec<Step>,
}

/// Sanitize a filename stem to the identifier charset the rest of the
/// system expects for a bare `plan_id`.
pub fn plan_slug(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("plan");
    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') { c } else { '_' })
        .collect()
}

/// Pull a `#sha1=<hex>` dedupe key out of a payload string, if present.
pub fn extract_sha_from_payload(payload: &str) -> Option<String> {
    sha_re().captures(payload).map(|c| c[1].to_string())
}

/// Parse plan text (the file has already been read) into a [`CompiledPlan`].
/// `default_slug` is used as `plan_id` when the document carries no
/// `plan_id=` header.
pub fn parse_plan(text: &str, default_slug: &str) -> Result<CompiledPlan, SchedulerError> {
    let mut policy: HashMap<String, String> = HashMap::new();
    for line in text.lines() {
        let stripped = line.trim().to_lowercase();
        if let Some(rest) = stripped.strip_prefix("policy:") {
            for part in rest.split(',') {
                let part = part.trim();
                if let Some((k, v)) = part.split_once('=') {
                    policy.insert(k.trim().to_string(), v.trim().to_string());
                }
            }
        }
    }

    let mut plan_id = default_slug.to_string();
    for line in text.lines() {
        let stripped = line.trim();
        if stripped.to_lowercase().starts_with("plan_id=") {
            if let Some((_, v)) = stripped.split_once('=') {
                plan_id = v.trim().to_string();
            }
            break;
        }
    }

    let accrue = policy.get("accrue_all_ideas").map(|v| v == "true").unwrap_or(false);
    if accrue {
        let orphan_count = text.lines().filter(|l| l.contains("TODO_ORPHAN:")).count();
        if orphan_count > 0 {
            return Err(SchedulerError::OrphanIdeas { count: orphan_count });
        }
    }

    let step_re = step_re();
    let field_re = field_re();
    let mut steps = Vec::new();
    for line in text.lines() {
        let Some(caps) = step_re.captures(line.trim()) else { continue };
        let rest = &caps[1];

        let mut fields: HashMap<String, String> = HashMap::new();
        for m in field_re.captures_iter(rest) {
            fields.insert(m[1].to_string(), m[2].to_string());
        }

        let Some(step_id) = fields.get("id").cloned() else { continue };
        let Some(lane_str) = fields.get("lane").cloned() else { continue };
        let Ok(lane) = lane_str.parse::<i64>() else { continue };

        let payload = match extract_payload(rest) {
            Some(p) if !p.is_empty() => p,
            _ => continue,
        };

        let deps_str = fields.get("deps").cloned().unwrap_or_default();
        let deps: Vec<String> = deps_str.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect();
        let dedupe_key = fields.get("dedupe").cloned().or_else(|| extract_sha_from_payload(&payload));

        steps.push(Step {
            global_id: JobId::new(format!("{plan_id}::{step_id}")),
            local_id: step_id,
            lane: Lane(lane),
            payload,
            deps,
            dedupe_key,
        });
    }

    if steps.is_empty() {
        return Err(SchedulerError::EmptyPlan);
    }

    let known_ids: std::collections::HashSet<&str> = steps.iter().map(|s| s.local_id.as_str()).collect();
    for step in &steps {
        for dep in &step.deps {
            if !known_ids.contains(dep.as_str()) {
                return Err(SchedulerError::UnknownDep { step: step.local_id.clone(), dep: dep.clone() });
            }
        }
    }

    Ok(CompiledPlan { plan_id, steps })
}

/// Extract the `payload=` value from a step's field tail: starts at the
/// first `payload=` and runs to end-of-line, minus any trailing `deps=` or
/// `dedupe=` field that follows it. Payloads that legitimately contain the
/// substring `deps=` or `dedupe=` are an open question the original tool
/// also punts on — see DESIGN.md.
fn extract_payload(rest: &str) -> Option<String> {
    let start = rest.find("payload=")?;
    let raw = &rest[start + "payload=".len()..];
    let mut cleaned = raw;
    for trailing in ["deps=", "dedupe="] {
        if let Some(idx) = cleaned.rfind(trailing) {
            if idx > 0 {
                cleaned = cleaned[..idx].trim_end();
            }
        }
    }
    Some(cleaned.to_string())
}

/// Read `path` from disk and compile it.
pub fn compile_plan_file(path: &Path) -> Result<CompiledPlan, SchedulerError> {
    let text = std::fs::read_to_string(path)?;
    let slug = plan_slug(path);
    parse_plan(&text, &slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plan_id_header_and_steps() {
        let text = "plan_id=demo\n- [ ] id=s1 lane=0 payload=@doc:readme\n";
        let plan = parse_plan(text, "fallback").expect("parse");
        assert_eq!(plan.plan_id, "demo");
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].global_id, JobId::new("demo::s1"));
        assert_eq!(plan.steps[0].payload, "@doc:readme");
    }

    #[test]
    fn defaults_plan_id_to_slug_when_absent() {
        let text = "- [ ] id=s1 lane=0 payload=@doc:readme\n";
        let plan = parse_plan(text, "myplan").expect("parse");
        assert_eq!(plan.plan_id, "myplan");
    }

    #[test]
    fn payload_tail_strips_trailing_deps_and_dedupe_fields() {
        let text = "- [ ] id=s1 lane=0 payload=@cmd:echo hello world deps=s0 dedupe=abc123\n";
        let plan = parse_plan(text, "p").expect("parse");
        assert_eq!(plan.steps[0].payload, "@cmd:echo hello world");
        assert_eq!(plan.steps[0].dedupe_key.as_deref(), Some("abc123"));
    }

    #[test]
    fn resolves_deps_to_global_ids_and_rejects_unknown_dep() {
        let text = "- [ ] id=s1 lane=0 payload=@doc:a\n- [ ] id=s2 lane=0 payload=@doc:b deps=missing\n";
        let err = parse_plan(text, "p").unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownDep { .. }));
    }

    #[test]
    fn accrue_all_ideas_rejects_orphan_markers() {
        let text = "policy: accrue_all_ideas=true\nTODO_ORPHAN: investigate X\n- [ ] id=s1 lane=0 payload=@doc:a\n";
        let err = parse_plan(text, "p").unwrap_err();
        assert!(matches!(err, SchedulerError::OrphanIdeas { count: 1 }));
    }

    #[test]
    fn accrue_all_ideas_allows_plan_without_orphans() {
        let text = "policy: accrue_all_ideas=true\n- [ ] id=s1 lane=0 payload=@doc:a\n";
        assert!(parse_plan(text, "p").is_ok());
    }

    #[test]
    fn extracts_sha1_dedupe_key_from_payload_when_dedupe_field_absent() {
        let text = "- [ ] id=s1 lane=2 payload=@file:out.bin#sha1=deadbeef\n";
        let plan = parse_plan(text, "p").expect("parse");
        assert_eq!(plan.steps[0].dedupe_key.as_deref(), Some("deadbeef"));
    }

    #[test]
    fn empty_plan_is_rejected() {
        let err = parse_plan("no steps here\n", "p").unwrap_err();
        assert!(matches!(err, SchedulerError::EmptyPlan));
    }

    #[test]
    fn plan_slug_sanitizes_non_identifier_characters() {
        let slug = plan_slug(Path::new("my plan (v2).md"));
        assert_eq!(slug, "my_plan__v2_");
    }
}
