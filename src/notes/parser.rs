//! Tolerant parser for the language model's structured output.
//!
//! The model is prompted for Summary / Decisions / Action Items sections
//! with bullets, but small models drift: numbering instead of dashes,
//! bold headers, missing sections. The parser accepts those variations
//! and returns `None` only when no structure at all can be found, which
//! the caller turns into a degraded raw-text summary.

use super::{ActionItem, MeetingNotes};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Summary,
    Decisions,
    Actions,
}

/// Parse model output into structured notes. `None` means no discernible
/// structure: no recognized section header and no bullet lines.
pub fn parse(raw: &str) -> Option<MeetingNotes> {
    let mut summary_lines: Vec<String> = Vec::new();
    let mut decisions: Vec<String> = Vec::new();
    let mut actions: Vec<ActionItem> = Vec::new();

    let mut section = Section::None;
    let mut saw_header = false;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((new_section, rest)) = match_header(line) {
            section = new_section;
            saw_header = true;
            // Header and content on one line: "Summary: the team agreed..."
            if !rest.is_empty() {
                push_content(rest, section, &mut summary_lines, &mut decisions, &mut actions);
            }
            continue;
        }

        let (content, was_bullet) = strip_bullet(line);
        if content.is_empty() {
            continue;
        }

        match section {
            Section::None => {
                // Bullets before any header read as decisions; prose
                // before any header reads as summary.
                if was_bullet {
                    decisions.push(content.to_string());
                } else {
                    summary_lines.push(content.to_string());
                }
            }
            other => push_content(content, other, &mut summary_lines, &mut decisions, &mut actions),
        }
    }

    let any_bullets = !decisions.is_empty() || !actions.is_empty();
    if !saw_header && !any_bullets {
        return None;
    }

    Some(MeetingNotes {
        summary: summary_lines.join(" "),
        decisions,
        actions,
    })
}

fn push_content(
    content: &str,
    section: Section,
    summary: &mut Vec<String>,
    decisions: &mut Vec<String>,
    actions: &mut Vec<ActionItem>,
) {
    let (content, _) = strip_bullet(content);
    if content.is_empty() {
        return;
    }
    match section {
        Section::Summary | Section::None => summary.push(content.to_string()),
        Section::Decisions => decisions.push(content.to_string()),
        Section::Actions => actions.push(parse_action(content)),
    }
}

/// Recognize a section header line, returning the section and any content
/// after a `:` separator. Trailing title words without a separator
/// ("Follow-up Tasks", "Decisions Made") belong to the header and are
/// swallowed.
fn match_header(line: &str) -> Option<(Section, &str)> {
    let stripped = line
        .trim_start_matches(['#', '*', '_'])
        .trim_end_matches(['*', '_'])
        .trim();

    let lower = stripped.to_lowercase();

    let (section, header_len) = if lower.starts_with("summary") {
        (Section::Summary, "summary".len())
    } else if lower.starts_with("key decisions") {
        (Section::Decisions, "key decisions".len())
    } else if lower.starts_with("decisions") {
        (Section::Decisions, "decisions".len())
    } else if lower.starts_with("action items") {
        (Section::Actions, "action items".len())
    } else if lower.starts_with("actions") {
        (Section::Actions, "actions".len())
    } else if lower.starts_with("follow-up") || lower.starts_with("follow up") {
        (Section::Actions, "follow-up".len())
    } else {
        return None;
    };

    let after = &stripped[header_len..];

    // Word continuation ("summarize") is not a header match
    if after.starts_with(|c: char| c.is_alphanumeric()) {
        return None;
    }

    let after = after.trim_start_matches(['*', '_']).trim_start();
    let rest = match after.split_once(':') {
        Some((_, content)) => content.trim_start_matches(['*', '_']).trim(),
        None => "",
    };

    Some((section, rest))
}

/// Strip list markers: dashes, asterisks, bullets, "1." / "1)" numbering.
fn strip_bullet(line: &str) -> (&str, bool) {
    let trimmed = line.trim();

    for marker in ["- ", "* ", "• ", "– "] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return (rest.trim(), true);
        }
    }

    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 && digits <= 3 {
        let after = &trimmed[digits..];
        if let Some(rest) = after.strip_prefix('.').or_else(|| after.strip_prefix(')')) {
            return (rest.trim(), true);
        }
    }

    (trimmed, false)
}

/// Pull an owner out of an action line.
///
/// Accepted forms: "Owner: name" suffix, "(name)" suffix, "name: task"
/// prefix, "task — name" suffix.
fn parse_action(content: &str) -> ActionItem {
    let content = content.trim();

    let owner_marker = content
        .rfind("Owner:")
        .or_else(|| content.rfind("owner:"));
    if let Some(idx) = owner_marker {
        let owner = content[idx + "owner:".len()..]
            .trim()
            .trim_end_matches([')', ']', '.'])
            .trim();
        let text = content[..idx]
            .trim()
            .trim_end_matches(['(', '[', ',', '-', '—'])
            .trim();
        if !owner.is_empty() && !text.is_empty() {
            return ActionItem {
                text: text.to_string(),
                owner: Some(owner.to_string()),
            };
        }
    }

    if content.ends_with(')') {
        if let Some(idx) = content.rfind('(') {
            let owner = content[idx + 1..content.len() - 1].trim();
            let text = content[..idx].trim();
            // Parenthesized owners are short names, not clauses
            if !owner.is_empty() && owner.len() <= 32 && !text.is_empty() {
                return ActionItem {
                    text: text.to_string(),
                    owner: Some(owner.to_string()),
                };
            }
        }
    }

    if let Some((head, tail)) = content.split_once(':') {
        let head = head.trim();
        let tail = tail.trim();
        let looks_like_name = !head.is_empty()
            && head.len() <= 32
            && head.split_whitespace().count() <= 3
            && !tail.is_empty();
        if looks_like_name {
            return ActionItem {
                text: tail.to_string(),
                owner: Some(head.to_string()),
            };
        }
    }

    ActionItem {
        text: content.to_string(),
        owner: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_output() {
        let raw = "\
Summary: The team reviewed the release plan and settled the launch date.

Decisions:
- Launch moves to March 3rd
- Beta stays open another week

Action Items:
- Update the status page (Priya)
- Dana: send the release email
";
        let notes = parse(raw).expect("structured output");

        assert_eq!(
            notes.summary,
            "The team reviewed the release plan and settled the launch date."
        );
        assert_eq!(
            notes.decisions,
            vec!["Launch moves to March 3rd", "Beta stays open another week"]
        );
        assert_eq!(notes.actions.len(), 2);
        assert_eq!(notes.actions[0].text, "Update the status page");
        assert_eq!(notes.actions[0].owner.as_deref(), Some("Priya"));
        assert_eq!(notes.actions[1].text, "send the release email");
        assert_eq!(notes.actions[1].owner.as_deref(), Some("Dana"));
    }

    #[test]
    fn test_parse_numbered_and_bold_variants() {
        let raw = "\
**Summary**
Quarterly planning recap.

**Key Decisions**
1. Hire two engineers
2) Freeze scope for Q2

**Follow-up Tasks**
1. Book the offsite venue, Owner: Lee
";
        let notes = parse(raw).expect("structured output");

        assert_eq!(notes.summary, "Quarterly planning recap.");
        assert_eq!(
            notes.decisions,
            vec!["Hire two engineers", "Freeze scope for Q2"]
        );
        assert_eq!(notes.actions.len(), 1);
        assert_eq!(notes.actions[0].text, "Book the offsite venue");
        assert_eq!(notes.actions[0].owner.as_deref(), Some("Lee"));
    }

    #[test]
    fn test_parse_bullets_without_headers() {
        let raw = "\
The standup covered deployment issues.
- Roll back the cache change
- Postpone the migration
";
        let notes = parse(raw).expect("bullets count as structure");

        assert_eq!(notes.summary, "The standup covered deployment issues.");
        assert_eq!(
            notes.decisions,
            vec!["Roll back the cache change", "Postpone the migration"]
        );
        assert!(notes.actions.is_empty());
    }

    #[test]
    fn test_parse_free_text_has_no_structure() {
        let raw = "I could not find anything actionable in this conversation, sorry.";
        assert!(parse(raw).is_none());
    }

    #[test]
    fn test_parse_empty_output_has_no_structure() {
        assert!(parse("").is_none());
        assert!(parse("\n\n").is_none());
    }

    #[test]
    fn test_action_without_owner() {
        let item = parse_action("Investigate the flaky login test");
        assert_eq!(item.text, "Investigate the flaky login test");
        assert!(item.owner.is_none());
    }

    #[test]
    fn test_action_rejects_long_parenthetical_as_owner() {
        let item = parse_action("Ship the fix (once the upstream dependency releases a patch)");
        assert!(item.owner.is_none());
    }
}
