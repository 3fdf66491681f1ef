use chrono::NaiveDateTime;
use domain::format::{excerpt, format_timestamp, EXCERPT_CHARS};
use domain::{Forest, OrphanReason, ParentLink, ThreadNode};
use std::fmt::Write;

const INDENT: &str = "    ";

/// Plain-text rendering of the reply forest, one block per comment with
/// replies indented under their parent.
pub fn render_forest(forest: &Forest, now: NaiveDateTime) -> String {
    if forest.is_empty() {
        return "No comments yet.\n".to_string();
    }
    let mut out = String::new();
    let mut stack: Vec<(&ThreadNode, Option<&ThreadNode>)> =
        forest.roots().iter().rev().map(|root| (root, None)).collect();
    while let Some((node, parent)) = stack.pop() {
        render_node(&mut out, node, parent, now);
        stack.extend(node.replies.iter().rev().map(|reply| (reply, Some(node))));
    }
    out
}

/// Writes one comment block, without its replies.
fn render_node(
    out: &mut String,
    node: &ThreadNode,
    parent: Option<&ThreadNode>,
    now: NaiveDateTime,
) {
    let pad = INDENT.repeat(node.depth);
    let comment = &node.comment;

    let _ = writeln!(
        out,
        "{pad}{} User: {}  [{}]",
        comment.id,
        comment.author_email,
        format_timestamp(comment.created_at, now)
    );
    match (node.link, parent) {
        (ParentLink::Attached, Some(parent)) => {
            let _ = writeln!(
                out,
                "{pad}  Replying to: \"{}\"",
                excerpt(&parent.comment.text, EXCERPT_CHARS)
            );
        }
        (ParentLink::Unknown(reason), _) => {
            let _ = writeln!(out, "{pad}  ({})", orphan_note(reason, node));
        }
        _ => {}
    }
    let _ = writeln!(out, "{pad}  {}", comment.text);
}

fn orphan_note(reason: OrphanReason, node: &ThreadNode) -> String {
    let parent = node
        .comment
        .parent_id
        .map(|id| id.to_string())
        .unwrap_or_default();
    match reason {
        OrphanReason::MissingParent => format!("reply to {parent}, not loaded"),
        OrphanReason::SelfReference => "reply to itself".to_string(),
        OrphanReason::Cycle => format!("reply to {parent}, parent chain loops"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use domain::{build_forest, CommentId, CommentRecord, UserId};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .unwrap()
    }

    fn record(id: i64, parent: Option<i64>, text: &str, email: &str, minute: u32) -> CommentRecord {
        CommentRecord {
            id: CommentId::new(id),
            author_id: UserId::new(1),
            author_email: email.to_string(),
            parent_id: parent.map(CommentId::new),
            text: text.to_string(),
            created_at: at(10, minute),
        }
    }

    #[test]
    fn empty_forest_has_placeholder() {
        assert_eq!(
            render_forest(&Forest::default(), at(12, 0)),
            "No comments yet.\n"
        );
    }

    #[test]
    fn replies_are_indented_with_parent_excerpt() {
        let forest = build_forest(&[
            record(2, Some(1), "hi back", "one@example.com", 6),
            record(
                1,
                None,
                "hello there, this is a rather long opener",
                "two@example.com",
                5,
            ),
        ]);

        let text = render_forest(&forest, at(12, 0));
        let expected = "\
#1 User: two@example.com  [Today 10:05]
  hello there, this is a rather long opener
    #2 User: one@example.com  [Today 10:06]
      Replying to: \"hello there, this is a ra...\"
      hi back
";
        assert_eq!(text, expected);
    }

    #[test]
    fn orphans_are_marked() {
        let forest = build_forest(&[record(5, Some(3), "late", "user@example.com", 1)]);
        let text = render_forest(&forest, at(12, 0));
        assert!(text.contains("(reply to #3, not loaded)"));
    }

    #[test]
    fn deep_chain_renders_every_level() {
        let len: i64 = 1_500;
        let records: Vec<CommentRecord> = (1..=len)
            .rev()
            .map(|id| {
                let parent = (id > 1).then_some(id - 1);
                record(id, parent, "step", "user@example.com", 0)
            })
            .collect();
        let forest = build_forest(&records);

        let text = render_forest(&forest, at(12, 0));
        let replies = text.matches("Replying to: \"step\"").count();
        assert_eq!(replies, len as usize - 1);
        let last = format!("{}#{len} User:", INDENT.repeat(len as usize - 1));
        assert!(text.contains(&last));
    }
}
