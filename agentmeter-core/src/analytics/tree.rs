//! Session tree reduction.
//!
//! Nesting is one level deep. A session attaches to its parent only when the
//! parent is itself a root; anything else (missing parent, self-reference,
//! grandchild) is promoted to a root.

use std::collections::{HashMap, HashSet};

use super::session::SessionSummary;

/// Merge child sessions into their parents and return the root forest.
///
/// Each root's totals become its own plus the sum of its direct children.
/// Roots and children are sorted by `updated_at` descending.
pub fn build_session_forest(sessions: Vec<SessionSummary>) -> Vec<SessionSummary> {
    let ids: HashSet<String> = sessions.iter().map(|s| s.id.clone()).collect();
    let is_root = |s: &SessionSummary| match s.parent_id.as_deref() {
        None => true,
        Some(parent) => parent == s.id || !ids.contains(parent),
    };
    let root_ids: HashSet<String> = sessions
        .iter()
        .filter(|s| is_root(s))
        .map(|s| s.id.clone())
        .collect();

    let mut roots = Vec::new();
    let mut children: HashMap<String, Vec<SessionSummary>> = HashMap::new();
    let mut promoted = 0usize;

    for session in sessions {
        let attach_to = session
            .parent_id
            .as_deref()
            .filter(|parent| *parent != session.id && root_ids.contains(*parent))
            .map(str::to_string);
        match attach_to {
            Some(parent) => children.entry(parent).or_default().push(session),
            None => {
                if session.parent_id.is_some() {
                    promoted += 1;
                }
                roots.push(session);
            }
        }
    }

    if promoted > 0 {
        tracing::debug!(promoted, "Promoted sessions with unresolvable parents to roots");
    }

    for root in &mut roots {
        if let Some(mut kids) = children.remove(&root.id) {
            sort_by_recency(&mut kids);
            for child in &kids {
                merge_child(root, child);
            }
            root.children = kids;
        }
    }

    sort_by_recency(&mut roots);
    roots
}

fn merge_child(parent: &mut SessionSummary, child: &SessionSummary) {
    for (agent, stats) in &child.agents {
        match parent.agents.get_mut(agent) {
            Some(existing) => existing.absorb(stats),
            None => {
                parent.agents.insert(agent.clone(), stats.clone());
            }
        }
    }
    parent.tokens.add(&child.tokens);
    parent.total_cost += child.total_cost;
    parent.billing_cost += child.billing_cost;
    parent.message_count += child.message_count;
    parent.updated_at = parent.updated_at.max(child.updated_at);
    parent.duration = parent.updated_at.saturating_sub(parent.created_at);
}

fn sort_by_recency(sessions: &mut [SessionSummary]) {
    sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
}
