//! Output entity (§3.3): an ordered sequence of changesets, each pairing a
//! forward statement with its rollback and a changeset id drawn from a
//! [`crate::config::ChangesetIdSource`].
//!
//! The core never writes XML or talks to a file; rendering/saving a
//! changelog to the Liquibase-style file the reference emits is an
//! external collaborator's job (§6). This module supplies only the
//! `(id, author, forward_text, rollback_text, run_always)` records, in
//! order, the way §6 "Outputs" specifies.

use crate::config::ChangesetIdSource;
use crate::cypher::Statement;

/// A forward-and-rollback migration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changeset {
    pub id: String,
    pub author: String,
    pub forward_text: String,
    pub rollback_text: String,
    /// True for mapping (synonymy) changesets (§4.5); false otherwise.
    pub run_always: bool,
}

/// An ordered sequence of [`Changeset`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changelog {
    pub changesets: Vec<Changeset>,
}

impl Changelog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, changeset: Changeset) {
        self.changesets.push(changeset);
    }

    pub fn len(&self) -> usize {
        self.changesets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changesets.is_empty()
    }
}

/// Drains `pairs` in order into a [`Changelog`], assigning each pair the
/// next id from `ids`. Used by the model mapper and the diff splitter,
/// whose changesets always carry both a forward and a rollback statement
/// and are never `run_always`.
pub fn build_changelog(
    pairs: Vec<(Statement, Statement)>,
    author: &str,
    ids: &mut dyn ChangesetIdSource,
) -> Changelog {
    let mut changelog = Changelog::new();
    for (fwd, rollback) in pairs {
        changelog.push(Changeset {
            id: ids.next_id().to_string(),
            author: author.to_string(),
            forward_text: fwd.render(),
            rollback_text: rollback.render(),
            run_always: false,
        });
    }
    changelog
}

/// Drains mapping-synthesizer statements (§4.5) into a [`Changelog`]. Each
/// statement is `run_always` and carries no rollback - re-running the
/// synthesized FOREACH/CASE guard is always safe, so there is nothing to
/// roll back.
pub fn build_mapping_changelog(
    statements: Vec<Statement>,
    author: &str,
    ids: &mut dyn ChangesetIdSource,
) -> Changelog {
    let mut changelog = Changelog::new();
    for stmt in statements {
        changelog.push(Changeset {
            id: ids.next_id().to_string(),
            author: author.to_string(),
            forward_text: stmt.render(),
            rollback_text: String::new(),
            run_always: true,
        });
    }
    changelog
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CounterIdSequence;
    use crate::cypher::{detach_delete, match_, merge, BuilderContext, GNode, NodeSlot};
    use indexmap::IndexMap;

    fn pair() -> (Statement, Statement) {
        let mut ctx = BuilderContext::new();
        let n = GNode::new(&mut ctx, Some("node"), IndexMap::new());
        let fwd = Statement::new(vec![merge(&[&NodeSlot::Full(n.clone())])]).terminated();
        let rollback =
            Statement::new(vec![match_(&[&NodeSlot::Full(n.clone())]), detach_delete(&[&NodeSlot::Var(n)])])
                .terminated();
        (fwd, rollback)
    }

    #[test]
    fn build_changelog_assigns_sequential_ids_and_is_never_run_always() {
        let mut ids = CounterIdSequence::starting_at(5);
        let changelog = build_changelog(vec![pair(), pair()], "Tolkien", &mut ids);
        assert_eq!(changelog.len(), 2);
        assert_eq!(changelog.changesets[0].id, "5");
        assert_eq!(changelog.changesets[1].id, "6");
        assert!(changelog.changesets.iter().all(|c| !c.run_always));
        assert!(!changelog.changesets[0].rollback_text.is_empty());
    }

    #[test]
    fn build_mapping_changelog_is_always_run_always_with_empty_rollback() {
        let mut ids = CounterIdSequence::starting_at(0);
        let (fwd, _) = pair();
        let changelog = build_mapping_changelog(vec![fwd], "Tolkien", &mut ids);
        assert_eq!(changelog.len(), 1);
        assert!(changelog.changesets[0].run_always);
        assert!(changelog.changesets[0].rollback_text.is_empty());
    }
}
