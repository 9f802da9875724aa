use std::fmt::Write as _;

use academy_core::model::ForumReply;
use services::ThreadView;

fn reply_line(out: &mut String, depth: usize, reply: &ForumReply) {
    let edited = if reply.is_edited() { " (edited)" } else { "" };
    let _ = writeln!(
        out,
        "{:indent$}#{} {}{}: {}",
        "",
        reply.id,
        reply.author_id,
        edited,
        reply.content,
        indent = depth * 2 + 2,
    );
}

/// Plain-text rendering of a thread: header, nested replies, then any replies
/// caught in a parent cycle.
pub fn thread_to_text(view: &ThreadView) -> String {
    let mut out = String::new();
    let edited = if view.thread.is_edited() { " (edited)" } else { "" };
    let _ = writeln!(
        out,
        "[{}] {}{} ({} replies)",
        view.thread.id(),
        view.thread.title(),
        edited,
        view.replies.len()
    );
    let _ = writeln!(out, "{}", view.thread.content());

    for (depth, reply) in view.replies.depth_first() {
        reply_line(&mut out, depth, reply);
    }

    let mut detached = view.replies.detached().peekable();
    if detached.peek().is_some() {
        out.push_str("unreachable replies:\n");
        for node in detached {
            reply_line(&mut out, 0, node.reply());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use academy_core::build_tree;
    use academy_core::model::{ForumId, ForumThread, LearnerId, ReplyId, ThreadDraft};
    use academy_core::time::fixed_now;

    fn reply(id: u64, parent: Option<u64>) -> ForumReply {
        ForumReply {
            id: ReplyId::new(id),
            forum_id: ForumId::new(1),
            author_id: LearnerId::new(Default::default()),
            content: format!("r{id}"),
            parent_reply_id: parent.map(ReplyId::new),
            created_at: fixed_now(),
            updated_at: fixed_now(),
        }
    }

    #[test]
    fn nested_replies_are_indented() {
        let thread = ForumThread::from_draft(
            ForumId::new(1),
            ThreadDraft::new(LearnerId::random(), "T", "body").unwrap(),
            fixed_now(),
        );
        let view = ThreadView {
            thread,
            replies: build_tree(vec![reply(1, None), reply(2, Some(1)), reply(3, Some(3))]),
        };
        let text = thread_to_text(&view);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[2].starts_with("  #1 "));
        assert!(lines[3].starts_with("    #2 "));
        assert_eq!(lines[4], "unreachable replies:");
        assert!(lines[5].ends_with(": r3"));
    }

    #[test]
    fn edited_thread_is_marked_in_header() {
        let mut thread = ForumThread::from_draft(
            ForumId::new(7),
            ThreadDraft::new(LearnerId::random(), "Old", "body").unwrap(),
            fixed_now(),
        );
        thread
            .edit(Some("New"), None, fixed_now() + chrono::Duration::minutes(1))
            .unwrap();
        let view = ThreadView {
            thread,
            replies: build_tree(Vec::<ForumReply>::new()),
        };
        assert_eq!(
            thread_to_text(&view).lines().next(),
            Some("[7] New (edited) (0 replies)")
        );
    }
}
