//! Link Graph: derived views and invariant checks over the Store's current
//! snapshot (§4.3). Holds no state of its own — every operation takes a
//! fresh read of the Store.

use std::collections::{HashMap, HashSet};

use crate::error::LinkError;
use crate::model::{Bean, BeanId, LinkKind};
use crate::store::Store;

pub struct LinkGraph<'a> {
    store: &'a Store,
}

/// The result of [`LinkGraph::check_all`]: every invariant violation found
/// in one pass over the current snapshot.
#[derive(Debug, Default)]
pub struct GraphIssues {
    /// Links whose target id does not exist in the Store.
    pub broken: Vec<(BeanId, LinkKind, BeanId)>,
    /// Links whose target is the source bean itself.
    pub self_links: Vec<(BeanId, LinkKind)>,
    /// Cycles among hierarchical links (`parent`, `blocks`), one canonical
    /// closed walk per cycle, rotated to start at its lexicographically
    /// smallest id.
    pub cycles: Vec<Vec<BeanId>>,
}

impl<'a> LinkGraph<'a> {
    #[must_use]
    pub fn new(store: &'a Store) -> Self {
        LinkGraph { store }
    }

    /// Every bean with an outgoing link to `target_id`, regardless of kind.
    #[must_use]
    pub fn incoming(&self, target_id: &BeanId) -> Vec<(BeanId, LinkKind)> {
        self.store
            .all()
            .into_iter()
            .flat_map(|bean| {
                bean.links()
                    .into_iter()
                    .filter(|link| &link.target == target_id)
                    .map(move |link| (bean.id.clone(), link.kind))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Would adding `from --kind--> to` create a cycle? Only hierarchical
    /// kinds (`parent`, `blocks`) can cycle; other kinds always return
    /// `None`. On a cycle, returns the full closed walk, canonicalized to
    /// start at its lexicographically smallest id.
    #[must_use]
    pub fn would_cycle(&self, from: &BeanId, kind: LinkKind, to: &BeanId) -> Option<Vec<BeanId>> {
        if !kind.is_hierarchical() {
            return None;
        }
        if from == to {
            return Some(vec![from.clone(), to.clone()]);
        }
        let beans = self.store.all();
        let by_id: HashMap<BeanId, Bean> = beans.into_iter().map(|b| (b.id.clone(), b)).collect();

        // A cycle forms iff `from` is reachable from `to` via edges of
        // `kind` — i.e. adding `from -> to` would close a loop back to `from`.
        // Track the walk taken so far so a found cycle can report its path.
        let mut stack = vec![vec![to.clone()]];
        let mut seen = HashSet::new();
        while let Some(path) = stack.pop() {
            let current = path.last().expect("path is never empty").clone();
            if &current == from {
                let mut cycle = vec![from.clone()];
                cycle.extend(path);
                return Some(canonicalize(&cycle));
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(bean) = by_id.get(&current) else {
                continue;
            };
            for link in bean.links() {
                if link.kind == kind {
                    let mut next = path.clone();
                    next.push(link.target);
                    stack.push(next);
                }
            }
        }
        None
    }

    /// Validate a prospective parent assignment against §3 invariant 4's
    /// allowed-parent-type table.
    pub fn validate_parent(&self, bean: &Bean, parent_id: &BeanId) -> Result<(), LinkError> {
        if &bean.id == parent_id {
            return Err(LinkError::SelfLink {
                id: bean.id.to_string(),
            });
        }
        let parent = self
            .store
            .get(parent_id.as_str())
            .map_err(|_| LinkError::InvalidParentType {
                message: format!("parent {parent_id} does not exist"),
            })?;
        let allowed = bean.bean_type.allowed_parent_types();
        if !allowed.contains(&parent.bean_type) {
            return Err(LinkError::InvalidParentType {
                message: format!(
                    "a {} cannot have a {} parent",
                    bean.bean_type, parent.bean_type
                ),
            });
        }
        if let Some(cycle) = self.would_cycle(&bean.id, LinkKind::Parent, parent_id) {
            return Err(LinkError::CycleDetected {
                path: cycle.iter().map(BeanId::to_string).collect(),
            });
        }
        Ok(())
    }

    /// Run every invariant check over the current snapshot in one pass.
    #[must_use]
    pub fn check_all(&self) -> GraphIssues {
        let beans = self.store.all();
        let by_id: HashMap<BeanId, Bean> =
            beans.iter().map(|b| (b.id.clone(), b.clone())).collect();

        let mut issues = GraphIssues::default();

        for bean in &beans {
            for link in bean.links() {
                if link.target == bean.id {
                    issues.self_links.push((bean.id.clone(), link.kind));
                } else if !by_id.contains_key(&link.target) {
                    issues
                        .broken
                        .push((bean.id.clone(), link.kind, link.target));
                }
            }
        }

        for kind in [LinkKind::Parent, LinkKind::Blocks] {
            issues.cycles.extend(find_cycles(&by_id, kind));
        }

        issues
    }

    /// Strip every outgoing link to `target_id` from every bean, persisting
    /// each modified bean via the Store.
    pub fn remove_links_to(&self, target_id: &BeanId) -> Result<usize, LinkError> {
        let mut modified = 0;
        for mut bean in self.store.all() {
            let had_parent = bean.parent.as_ref() == Some(target_id);
            let before_lens = (bean.blocking.len(), bean.duplicates.len(), bean.related.len());

            if had_parent {
                bean.parent = None;
            }
            bean.blocking.retain(|id| id != target_id);
            bean.duplicates.retain(|id| id != target_id);
            bean.related.retain(|id| id != target_id);

            let changed = had_parent
                || before_lens != (bean.blocking.len(), bean.duplicates.len(), bean.related.len());
            if changed {
                self.store
                    .update(bean)
                    .map_err(|e| LinkError::InvalidParentType {
                        message: e.to_string(),
                    })?;
                modified += 1;
            }
        }
        Ok(modified)
    }

    /// Drop every broken and self-link found by [`Self::check_all`],
    /// persisting each modified bean. Does not touch cycles — those require
    /// a deliberate choice of which edge to break.
    pub fn fix_broken(&self) -> Result<usize, LinkError> {
        let issues = self.check_all();
        let mut flagged_by_source: HashMap<BeanId, HashSet<(LinkKind, BeanId)>> = HashMap::new();
        for (source, kind, target) in issues.broken {
            flagged_by_source
                .entry(source)
                .or_default()
                .insert((kind, target));
        }
        for (source, kind) in issues.self_links {
            let target = source.clone();
            flagged_by_source
                .entry(source)
                .or_default()
                .insert((kind, target));
        }

        let mut modified = 0;
        for (id, flagged) in flagged_by_source {
            let Ok(mut bean) = self.store.get(id.as_str()) else {
                continue;
            };
            if let Some(parent) = bean.parent.clone() {
                if flagged.contains(&(LinkKind::Parent, parent)) {
                    bean.parent = None;
                }
            }
            bean.blocking
                .retain(|t| !flagged.contains(&(LinkKind::Blocks, t.clone())));
            bean.duplicates
                .retain(|t| !flagged.contains(&(LinkKind::Duplicates, t.clone())));
            bean.related
                .retain(|t| !flagged.contains(&(LinkKind::Related, t.clone())));

            self.store
                .update(bean)
                .map_err(|e| LinkError::InvalidParentType {
                    message: e.to_string(),
                })?;
            modified += 1;
        }
        Ok(modified)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// 3-color DFS per source bean, one independent recursion stack per `kind`.
/// Cycles are canonicalized by rotating to start at the lexicographically
/// smallest id so the same cycle found from different starting points
/// de-duplicates.
fn find_cycles(by_id: &HashMap<BeanId, Bean>, kind: LinkKind) -> Vec<Vec<BeanId>> {
    let mut color: HashMap<BeanId, Color> =
        by_id.keys().map(|id| (id.clone(), Color::White)).collect();
    let mut found = Vec::new();
    let mut seen_canonical: HashSet<Vec<BeanId>> = HashSet::new();

    let mut ids: Vec<&BeanId> = by_id.keys().collect();
    ids.sort();

    for start in ids {
        if color[start] != Color::White {
            continue;
        }
        let mut path = Vec::new();
        visit(
            start,
            by_id,
            kind,
            &mut color,
            &mut path,
            &mut found,
            &mut seen_canonical,
        );
    }

    found
}

fn visit(
    id: &BeanId,
    by_id: &HashMap<BeanId, Bean>,
    kind: LinkKind,
    color: &mut HashMap<BeanId, Color>,
    path: &mut Vec<BeanId>,
    found: &mut Vec<Vec<BeanId>>,
    seen_canonical: &mut HashSet<Vec<BeanId>>,
) {
    color.insert(id.clone(), Color::Gray);
    path.push(id.clone());

    if let Some(bean) = by_id.get(id) {
        for link in bean.links() {
            if link.kind != kind {
                continue;
            }
            match color.get(&link.target) {
                Some(Color::White) => {
                    visit(&link.target, by_id, kind, color, path, found, seen_canonical);
                }
                Some(Color::Gray) => {
                    if let Some(start_idx) = path.iter().position(|p| p == &link.target) {
                        let mut cycle: Vec<BeanId> = path[start_idx..].to_vec();
                        cycle.push(link.target.clone());
                        let canonical = canonicalize(&cycle);
                        if seen_canonical.insert(canonical.clone()) {
                            found.push(canonical);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    path.pop();
    color.insert(id.clone(), Color::Black);
}

/// Rotate a closed walk `[a, b, c, a]` to start at its lexicographically
/// smallest id, dropping the duplicated closing id first, then re-closing.
fn canonicalize(cycle: &[BeanId]) -> Vec<BeanId> {
    let mut open = cycle.to_vec();
    open.pop();
    if open.is_empty() {
        return open;
    }
    let min_idx = open
        .iter()
        .enumerate()
        .min_by_key(|(_, id)| id.as_str())
        .map(|(i, _)| i)
        .unwrap_or(0);
    let mut rotated: Vec<BeanId> = open[min_idx..].to_vec();
    rotated.extend_from_slice(&open[..min_idx]);
    rotated.push(rotated[0].clone());
    rotated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BeansConfig;
    use crate::model::BeanType;
    use crate::store::{NewBean, Store};
    use tempfile::TempDir;

    fn new_store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().to_path_buf(), BeansConfig::default());
        (dir, store)
    }

    fn create(store: &Store, title: &str) -> BeanId {
        store
            .create(NewBean {
                title: title.to_string(),
                ..NewBean::default()
            })
            .unwrap()
            .id
    }

    #[test]
    fn incoming_finds_links_by_kind() {
        let (_dir, store) = new_store();
        let a = create(&store, "A");
        let c_id = create(&store, "C");
        let mut c = store.get(c_id.as_str()).unwrap();
        c.related.push(a.clone());
        store.update(c).unwrap();

        let graph = LinkGraph::new(&store);
        let incoming = graph.incoming(&a);
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0], (c_id, LinkKind::Related));
    }

    #[test]
    fn would_cycle_detects_direct_and_transitive_loops() {
        let (_dir, store) = new_store();
        let a = create(&store, "A");
        let b = create(&store, "B");

        let mut bean_b = store.get(b.as_str()).unwrap();
        bean_b.parent = Some(a.clone());
        store.update(bean_b).unwrap();

        let graph = LinkGraph::new(&store);
        assert!(graph.would_cycle(&a, LinkKind::Parent, &b).is_some());
        assert!(graph.would_cycle(&b, LinkKind::Parent, &a).is_none());
    }

    #[test]
    fn check_all_finds_broken_links() {
        let (_dir, store) = new_store();
        let a = create(&store, "A");
        let mut bean_a = store.get(a.as_str()).unwrap();
        bean_a.related.push(BeanId::parse("beans-ghost").unwrap());
        store.update(bean_a).unwrap();

        let graph = LinkGraph::new(&store);
        let issues = graph.check_all();
        assert_eq!(issues.broken.len(), 1);
    }

    #[test]
    fn check_all_finds_self_links() {
        let (_dir, store) = new_store();
        let a = create(&store, "A");
        let mut bean_a = store.get(a.as_str()).unwrap();
        bean_a.related.push(a.clone());
        store.update(bean_a).unwrap();

        let graph = LinkGraph::new(&store);
        let issues = graph.check_all();
        assert_eq!(issues.self_links.len(), 1);
    }

    #[test]
    fn check_all_finds_and_canonicalizes_cycles() {
        let (_dir, store) = new_store();
        let a = create(&store, "A");
        let b = create(&store, "B");
        let c = create(&store, "C");

        let mut bean_a = store.get(a.as_str()).unwrap();
        bean_a.blocking.push(b.clone());
        store.update(bean_a).unwrap();
        let mut bean_b = store.get(b.as_str()).unwrap();
        bean_b.blocking.push(c.clone());
        store.update(bean_b).unwrap();
        let mut bean_c = store.get(c.as_str()).unwrap();
        bean_c.blocking.push(a.clone());
        store.update(bean_c).unwrap();

        let graph = LinkGraph::new(&store);
        let issues = graph.check_all();
        assert_eq!(issues.cycles.len(), 1);
        let cycle = &issues.cycles[0];
        assert_eq!(cycle.first(), cycle.last());
        let mut ids: Vec<_> = cycle[..cycle.len() - 1].to_vec();
        ids.sort();
        assert_eq!(ids[0], cycle[0]);
    }

    #[test]
    fn remove_links_to_strips_every_reference() {
        let (_dir, store) = new_store();
        let a = create(&store, "A");
        let b = create(&store, "B");
        let mut bean_b = store.get(b.as_str()).unwrap();
        bean_b.related.push(a.clone());
        bean_b.duplicates.push(a.clone());
        store.update(bean_b).unwrap();

        let graph = LinkGraph::new(&store);
        let count = graph.remove_links_to(&a).unwrap();
        assert_eq!(count, 1);
        let bean_b = store.get(b.as_str()).unwrap();
        assert!(bean_b.related.is_empty());
        assert!(bean_b.duplicates.is_empty());
    }

    #[test]
    fn fix_broken_clears_dangling_targets() {
        let (_dir, store) = new_store();
        let a = create(&store, "A");
        let mut bean_a = store.get(a.as_str()).unwrap();
        bean_a.related.push(BeanId::parse("beans-ghost").unwrap());
        store.update(bean_a).unwrap();

        let graph = LinkGraph::new(&store);
        graph.fix_broken().unwrap();
        let issues = graph.check_all();
        assert!(issues.broken.is_empty());
    }

    #[test]
    fn validate_parent_enforces_allowed_types() {
        let (_dir, store) = new_store();
        let task_id = create(&store, "A task");
        let feature = store
            .create(NewBean {
                title: "A feature".to_string(),
                bean_type: BeanType::Feature,
                ..NewBean::default()
            })
            .unwrap();

        let graph = LinkGraph::new(&store);
        let task = store.get(task_id.as_str()).unwrap();
        assert!(graph.validate_parent(&task, &feature.id).is_ok());

        let err = graph.validate_parent(&feature, &task.id);
        assert!(err.is_err());
    }
}
