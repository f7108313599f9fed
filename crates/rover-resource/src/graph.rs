//! The resource dependency graph.

use crate::api::Api;
use crate::errors::ResourceError;
use crate::name::ResourceName;
use crate::node::GraphNode;
use crate::resource::Resource;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A directed graph of named resource nodes.
///
/// Edges run child → parent: a child depends on its parents. The graph
/// rejects any mutation that would introduce a cycle, and bumps an integer
/// logical clock on every structural mutation so observers can order
/// decisions against graph generations.
pub struct Graph {
    nodes: BTreeMap<ResourceName, Arc<GraphNode>>,
    /// child → its parents (dependencies).
    parents: BTreeMap<ResourceName, BTreeSet<ResourceName>>,
    /// parent → its children (dependents).
    children: BTreeMap<ResourceName, BTreeSet<ResourceName>>,
    clock: Arc<AtomicU64>,
}

impl Graph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            parents: BTreeMap::new(),
            children: BTreeMap::new(),
            clock: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The current logical clock value. A snapshot taken at clock `c`
    /// reflects all mutations committed with clock ≤ `c`.
    #[must_use]
    pub fn logical_clock(&self) -> u64 {
        self.clock.load(Ordering::SeqCst)
    }

    fn bump_clock(&self) {
        self.clock.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of nodes in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a node to the graph.
    ///
    /// # Errors
    ///
    /// Returns a duplicate-name error if a node with the same name is
    /// present.
    pub fn add_node(&mut self, node: GraphNode) -> Result<Arc<GraphNode>, ResourceError> {
        let name = node.name().clone();
        if self.nodes.contains_key(&name) {
            return Err(rover_error::CommonError::duplicate(name.to_string()).into());
        }
        node.bind_clock(self.clock.clone());
        let node = Arc::new(node);
        self.nodes.insert(name, node.clone());
        self.bump_clock();
        Ok(node)
    }

    /// Looks up a node by fully-qualified name.
    #[must_use]
    pub fn node(&self, name: &ResourceName) -> Option<Arc<GraphNode>> {
        self.nodes.get(name).cloned()
    }

    /// All node names, ordered by (api, name).
    #[must_use]
    pub fn names(&self) -> Vec<ResourceName> {
        self.nodes.keys().cloned().collect()
    }

    /// All node names whose nodes are currently reachable.
    #[must_use]
    pub fn reachable_names(&self) -> Vec<ResourceName> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.is_reachable())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Names of all nodes with the given API, ordered.
    #[must_use]
    pub fn find_by_api(&self, api: &Api) -> Vec<ResourceName> {
        self.nodes
            .keys()
            .filter(|name| &name.api == api)
            .cloned()
            .collect()
    }

    /// Names matching the local name and API of `target`, across any remote
    /// chain. An exact match would also be returned here; callers are
    /// expected to try exact lookup first.
    #[must_use]
    pub fn find_by_short_name_and_api(&self, target: &ResourceName) -> Vec<ResourceName> {
        self.nodes
            .keys()
            .filter(|name| name.api == target.api && name.name == target.name)
            .cloned()
            .collect()
    }

    /// Names whose remote-chain-qualified short name matches `short`,
    /// regardless of API. `short` may carry a remote-chain prefix
    /// (`gantry1:arm1`), which must be a suffix of the candidate's chain.
    #[must_use]
    pub fn find_by_short_name(&self, short: &str) -> Vec<ResourceName> {
        let mut segments: Vec<&str> = short.split(':').collect();
        let Some(local) = segments.pop() else {
            return Vec::new();
        };
        self.nodes
            .keys()
            .filter(|name| {
                name.name == local
                    && name.remote.len() >= segments.len()
                    && name.remote[name.remote.len() - segments.len()..]
                        .iter()
                        .zip(&segments)
                        .all(|(have, want)| have.as_str() == *want)
            })
            .cloned()
            .collect()
    }

    /// Adds a dependency edge from `child` to `parent`.
    ///
    /// If the parent does not exist yet, an uninitialized placeholder node is
    /// created for it so the child can be resolved before the parent's config
    /// arrives.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Cycle`] if the edge would create a cycle, or
    /// a not-found error if the child does not exist.
    pub fn add_child(
        &mut self,
        child: &ResourceName,
        parent: &ResourceName,
    ) -> Result<(), ResourceError> {
        if !self.nodes.contains_key(child) {
            return Err(ResourceError::NotFound(child.to_string()));
        }
        if child == parent {
            return Err(ResourceError::Cycle(child.to_string()));
        }
        if self
            .parents
            .get(child)
            .is_some_and(|set| set.contains(parent))
        {
            return Ok(());
        }
        if self.depends_on(parent, child) {
            return Err(ResourceError::Cycle(child.to_string()));
        }
        if !self.nodes.contains_key(parent) {
            let placeholder = GraphNode::placeholder(parent.clone());
            placeholder.bind_clock(self.clock.clone());
            self.nodes.insert(parent.clone(), Arc::new(placeholder));
        }
        self.parents
            .entry(child.clone())
            .or_default()
            .insert(parent.clone());
        self.children
            .entry(parent.clone())
            .or_default()
            .insert(child.clone());
        self.bump_clock();
        Ok(())
    }

    /// Removes the dependency edge from `child` to `parent`, if present.
    pub fn remove_child(&mut self, child: &ResourceName, parent: &ResourceName) {
        let mut removed = false;
        if let Some(set) = self.parents.get_mut(child) {
            removed |= set.remove(parent);
        }
        if let Some(set) = self.children.get_mut(parent) {
            removed |= set.remove(child);
        }
        if removed {
            self.bump_clock();
        }
    }

    /// The direct dependencies of `child`, ordered.
    #[must_use]
    pub fn parents_of(&self, child: &ResourceName) -> Vec<ResourceName> {
        self.parents
            .get(child)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The direct dependents of `parent`, ordered.
    #[must_use]
    pub fn children_of(&self, parent: &ResourceName) -> Vec<ResourceName> {
        self.children
            .get(parent)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// True if `from` transitively depends on `target` through parent edges.
    fn depends_on(&self, from: &ResourceName, target: &ResourceName) -> bool {
        let mut queue = VecDeque::from([from.clone()]);
        let mut seen = BTreeSet::new();
        while let Some(current) = queue.pop_front() {
            if &current == target {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(parents) = self.parents.get(&current) {
                queue.extend(parents.iter().cloned());
            }
        }
        false
    }

    /// All descendants reachable from `root` through child edges, including
    /// `root` itself. This is the set to invalidate when `root` changes.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if `root` is not in the graph.
    pub fn subgraph_from(
        &self,
        root: &ResourceName,
    ) -> Result<BTreeSet<ResourceName>, ResourceError> {
        if !self.nodes.contains_key(root) {
            return Err(ResourceError::NotFound(root.to_string()));
        }
        let mut out = BTreeSet::new();
        let mut queue = VecDeque::from([root.clone()]);
        while let Some(current) = queue.pop_front() {
            if !out.insert(current.clone()) {
                continue;
            }
            if let Some(children) = self.children.get(&current) {
                queue.extend(children.iter().cloned());
            }
        }
        Ok(out)
    }

    /// Marks the named nodes for removal by the next sweep. Unknown names are
    /// ignored.
    pub fn mark_for_removal<I>(&self, names: I)
    where
        I: IntoIterator<Item = ResourceName>,
    {
        for name in names {
            if let Some(node) = self.nodes.get(&name) {
                node.mark_for_removal();
            }
        }
    }

    /// Removes every node marked for removal, returning the ejected objects
    /// so callers can close them. The nodes' object references are cleared
    /// before removal so no later path can close them twice.
    pub fn remove_marked(&mut self) -> Vec<(ResourceName, Arc<dyn Resource>)> {
        let marked: Vec<ResourceName> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.is_marked_for_removal())
            .map(|(name, _)| name.clone())
            .collect();
        let mut ejected = Vec::new();
        for name in marked {
            if let Some(node) = self.remove_node(&name) {
                if let Ok(resource) = node.unsafe_resource() {
                    node.unset_resource();
                    ejected.push((name, resource));
                }
            }
        }
        ejected
    }

    /// Removes a node and every edge referencing it, returning the node.
    pub fn remove_node(&mut self, name: &ResourceName) -> Option<Arc<GraphNode>> {
        let node = self.nodes.remove(name)?;
        if let Some(parents) = self.parents.remove(name) {
            for parent in parents {
                if let Some(set) = self.children.get_mut(&parent) {
                    set.remove(name);
                }
            }
        }
        if let Some(children) = self.children.remove(name) {
            for child in children {
                if let Some(set) = self.parents.get_mut(&child) {
                    set.remove(name);
                }
            }
        }
        self.bump_clock();
        Some(node)
    }

    /// Sets the reachability flag on `name` and all of its descendants.
    ///
    /// Reachability is independent of structural presence: resources of a
    /// disconnected remote stay in the graph but are excluded from
    /// [`Graph::reachable_names`].
    ///
    /// # Errors
    ///
    /// Returns a not-found error if `name` is not in the graph.
    pub fn mark_reachability(
        &self,
        name: &ResourceName,
        reachable: bool,
    ) -> Result<(), ResourceError> {
        for member in self.subgraph_from(name)? {
            if let Some(node) = self.nodes.get(&member) {
                node.set_reachable(reachable);
            }
        }
        Ok(())
    }

    /// Groups all nodes into topological levels: each level is an antichain,
    /// and level `k` depends only on levels `< k`. Within a level, names are
    /// ordered by (api, name).
    #[must_use]
    pub fn topological_sort_in_levels(&self) -> Vec<Vec<ResourceName>> {
        let mut remaining: BTreeMap<ResourceName, usize> = self
            .nodes
            .keys()
            .map(|name| {
                let degree = self.parents.get(name).map_or(0, BTreeSet::len);
                (name.clone(), degree)
            })
            .collect();
        let mut levels = Vec::new();
        while !remaining.is_empty() {
            let level: Vec<ResourceName> = remaining
                .iter()
                .filter(|(_, degree)| **degree == 0)
                .map(|(name, _)| name.clone())
                .collect();
            if level.is_empty() {
                // Unreachable while add_child rejects cycles; drain the rest
                // rather than spin.
                levels.push(std::mem::take(&mut remaining).into_keys().collect());
                break;
            }
            for name in &level {
                remaining.remove(name);
                for child in self.children_of(name) {
                    if let Some(degree) = remaining.get_mut(&child) {
                        *degree = degree.saturating_sub(1);
                    }
                }
            }
            levels.push(level);
        }
        levels
    }

    /// Flat topological order, dependencies first.
    #[must_use]
    pub fn topological_sort(&self) -> Vec<ResourceName> {
        self.topological_sort_in_levels().into_iter().flatten().collect()
    }

    /// Transforms every pending node's declared dependency names into edges.
    ///
    /// Declared names are resolved (in (api, name) order over nodes, declared
    /// order within a node) either as fully-qualified names or as short names
    /// via unambiguous lookup. A short name matching nodes on two or more
    /// remotes is a clash. Resolution failures are recorded on the node as
    /// its last error and leave the node pending without aborting the pass;
    /// cycle errors are reported, never masked.
    ///
    /// # Errors
    ///
    /// Returns the combined per-node resolution errors, if any.
    pub fn resolve_dependencies(&mut self) -> Result<(), ResourceError> {
        let pending: Vec<ResourceName> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.needs_reconfigure() && !node.is_marked_for_removal())
            .map(|(name, _)| name.clone())
            .collect();

        let mut errs = Vec::new();
        for child in pending {
            let Some(node) = self.node(&child) else {
                continue;
            };
            for parent in self.parents_of(&child) {
                self.remove_child(&child, &parent);
            }
            match self.resolve_node(&child) {
                Ok(()) => node.set_dependencies_unresolved(false),
                Err(err) => {
                    node.set_dependencies_unresolved(true);
                    node.log_and_set_last_error(match &err {
                        ResourceError::Cycle(name) => ResourceError::Cycle(name.clone()),
                        other => ResourceError::validation_failed(
                            child.to_string(),
                            format!("dependency resolution error: {other}"),
                        ),
                    });
                    errs.push(err);
                }
            }
        }
        ResourceError::combine(errs).map_or(Ok(()), Err)
    }

    fn resolve_node(&mut self, child: &ResourceName) -> Result<(), ResourceError> {
        let deps = self
            .node(child)
            .map(|node| node.dependency_names())
            .unwrap_or_default();
        for dep in deps {
            let target = self.resolve_dependency_name(child, &dep)?;
            if &target == child {
                return Err(ResourceError::Cycle(child.to_string()));
            }
            self.add_child(child, &target)?;
        }
        Ok(())
    }

    fn resolve_dependency_name(
        &self,
        child: &ResourceName,
        dep: &str,
    ) -> Result<ResourceName, ResourceError> {
        if dep.contains('/') {
            return dep.parse();
        }
        let mut matches = self.find_by_short_name(dep);
        match matches.len() {
            0 => Err(ResourceError::NotFound(dep.to_string())),
            1 => Ok(matches.remove(0)),
            _ => {
                // A node may depend on a same-named resource of a different
                // API (e.g. a sensor named like its board); prefer the only
                // candidate that is not the child itself.
                matches.retain(|m| m != child);
                if matches.len() == 1 {
                    Ok(matches.remove(0))
                } else {
                    Err(ResourceError::Clash(dep.to_string()))
                }
            }
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceConfig;
    use crate::model::Model;
    use crate::resource::Dependencies;
    use async_trait::async_trait;

    struct NullResource(ResourceName);

    #[async_trait]
    impl Resource for NullResource {
        fn name(&self) -> ResourceName {
            self.0.clone()
        }

        async fn reconfigure(
            &self,
            _deps: &Dependencies,
            _conf: &ResourceConfig,
        ) -> Result<(), ResourceError> {
            Ok(())
        }

        async fn close(&self) -> Result<(), ResourceError> {
            Ok(())
        }
    }

    fn name(api_subtype: &str, name: &str) -> ResourceName {
        ResourceName::new(Api::component(api_subtype), name)
    }

    fn unconfigured(graph: &mut Graph, rname: &ResourceName, deps: &[&str]) -> Arc<GraphNode> {
        let conf = ResourceConfig::new(rname.api.clone(), Model::unknown(), rname.name.clone());
        graph
            .add_node(GraphNode::unconfigured(
                conf,
                deps.iter().map(ToString::to_string).collect(),
            ))
            .unwrap()
    }

    fn configured(graph: &mut Graph, rname: &ResourceName) -> Arc<GraphNode> {
        graph
            .add_node(GraphNode::configured(
                rname.clone(),
                None,
                Arc::new(NullResource(rname.clone())),
                Model::unknown(),
            ))
            .unwrap()
    }

    #[test]
    fn test_add_node_rejects_duplicates() {
        let mut graph = Graph::new();
        let board = name("board", "board1");
        unconfigured(&mut graph, &board, &[]);
        let conf = ResourceConfig::new(board.api.clone(), Model::unknown(), board.name.clone());
        let err = graph
            .add_node(GraphNode::unconfigured(conf, Vec::new()))
            .unwrap_err();
        assert!(err.to_string().contains("already in use"));
    }

    #[test]
    fn test_add_child_rejects_cycles() {
        let mut graph = Graph::new();
        let a = name("board", "a");
        let b = name("board", "b");
        let c = name("board", "c");
        unconfigured(&mut graph, &a, &[]);
        unconfigured(&mut graph, &b, &[]);
        unconfigured(&mut graph, &c, &[]);
        graph.add_child(&b, &a).unwrap();
        graph.add_child(&c, &b).unwrap();
        // a depending on c would close the loop a <- b <- c <- a.
        let err = graph.add_child(&a, &c).unwrap_err();
        assert!(err.is_cycle());
        // self-loop
        assert!(graph.add_child(&a, &a).unwrap_err().is_cycle());
    }

    #[test]
    fn test_add_child_creates_placeholder_parent() {
        let mut graph = Graph::new();
        let motor = name("motor", "motor1");
        let board = name("board", "board1");
        unconfigured(&mut graph, &motor, &[]);
        graph.add_child(&motor, &board).unwrap();
        let placeholder = graph.node(&board).unwrap();
        assert!(placeholder.is_uninitialized());
        assert!(placeholder.config().is_none());
    }

    #[test]
    fn test_clock_bumps_on_structural_mutation() {
        let mut graph = Graph::new();
        let start = graph.logical_clock();
        let a = name("board", "a");
        let b = name("motor", "b");
        unconfigured(&mut graph, &a, &[]);
        unconfigured(&mut graph, &b, &[]);
        graph.add_child(&b, &a).unwrap();
        assert!(graph.logical_clock() >= start + 3);
        let before_remove = graph.logical_clock();
        graph.remove_node(&b);
        assert!(graph.logical_clock() > before_remove);
    }

    #[test]
    fn test_topological_levels_are_ordered_and_deterministic() {
        let mut graph = Graph::new();
        let board = name("board", "board1");
        let encoder = name("encoder", "encoder1");
        let motor = name("motor", "motor1");
        unconfigured(&mut graph, &board, &[]);
        unconfigured(&mut graph, &encoder, &[]);
        unconfigured(&mut graph, &motor, &[]);
        graph.add_child(&encoder, &board).unwrap();
        graph.add_child(&motor, &board).unwrap();
        graph.add_child(&motor, &encoder).unwrap();

        let levels = graph.topological_sort_in_levels();
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[0], vec![board.clone()]);
        assert_eq!(levels[1], vec![encoder.clone()]);
        assert_eq!(levels[2], vec![motor.clone()]);

        // level(child) > level(parent) for every edge.
        let level_of = |target: &ResourceName| {
            levels
                .iter()
                .position(|level| level.contains(target))
                .unwrap()
        };
        for child in graph.names() {
            for parent in graph.parents_of(&child) {
                assert!(level_of(&child) > level_of(&parent));
            }
        }
    }

    #[test]
    fn test_subgraph_from_collects_descendants() {
        let mut graph = Graph::new();
        let board = name("board", "board1");
        let encoder = name("encoder", "encoder1");
        let motor = name("motor", "motor1");
        let camera = name("camera", "camera1");
        unconfigured(&mut graph, &board, &[]);
        unconfigured(&mut graph, &encoder, &[]);
        unconfigured(&mut graph, &motor, &[]);
        unconfigured(&mut graph, &camera, &[]);
        graph.add_child(&encoder, &board).unwrap();
        graph.add_child(&motor, &encoder).unwrap();

        let sub = graph.subgraph_from(&board).unwrap();
        assert!(sub.contains(&board));
        assert!(sub.contains(&encoder));
        assert!(sub.contains(&motor));
        assert!(!sub.contains(&camera));

        assert!(graph.subgraph_from(&name("arm", "missing")).is_err());
    }

    #[test]
    fn test_short_name_lookup_exact_single_and_clash() {
        let mut graph = Graph::new();
        let local = name("arm", "arm1");
        let on_r1 = name("arm", "arm2").prepend_remote("r1");
        let on_r2 = name("arm", "arm2").prepend_remote("r2");
        configured(&mut graph, &local);
        configured(&mut graph, &on_r1);
        configured(&mut graph, &on_r2);

        assert_eq!(graph.find_by_short_name("arm1"), vec![local]);
        assert_eq!(graph.find_by_short_name("arm2").len(), 2);
        assert_eq!(graph.find_by_short_name("r1:arm2"), vec![on_r1.clone()]);
        assert!(graph.find_by_short_name("zzz").is_empty());

        let by_api = graph.find_by_short_name_and_api(&name("arm", "arm2"));
        assert_eq!(by_api.len(), 2);
    }

    #[test]
    fn test_remove_marked_ejects_objects() {
        let mut graph = Graph::new();
        let arm = name("arm", "arm1");
        let camera = name("camera", "camera1");
        configured(&mut graph, &arm);
        configured(&mut graph, &camera);

        graph.mark_for_removal(vec![arm.clone()]);
        let ejected = graph.remove_marked();
        assert_eq!(ejected.len(), 1);
        assert_eq!(ejected[0].0, arm);
        assert!(graph.node(&arm).is_none());
        assert!(graph.node(&camera).is_some());
    }

    #[test]
    fn test_mark_reachability_propagates_to_descendants() {
        let mut graph = Graph::new();
        let remote = ResourceName::remote_node("r1");
        let arm = name("arm", "arm1").prepend_remote("r1");
        let camera = name("camera", "camera1").prepend_remote("r1");
        let unrelated = name("board", "board1");
        configured(&mut graph, &remote);
        configured(&mut graph, &arm);
        configured(&mut graph, &camera);
        configured(&mut graph, &unrelated);
        graph.add_child(&arm, &remote).unwrap();
        graph.add_child(&camera, &remote).unwrap();

        graph.mark_reachability(&remote, false).unwrap();
        let reachable = graph.reachable_names();
        assert!(!reachable.contains(&arm));
        assert!(!reachable.contains(&camera));
        assert!(reachable.contains(&unrelated));
        // Structural presence is unaffected.
        assert!(graph.names().contains(&arm));

        graph.mark_reachability(&remote, true).unwrap();
        assert!(graph.reachable_names().contains(&arm));
    }

    #[test]
    fn test_resolve_dependencies_builds_edges() {
        let mut graph = Graph::new();
        let board = name("board", "board1");
        let motor = name("motor", "motor1");
        unconfigured(&mut graph, &board, &[]);
        unconfigured(&mut graph, &motor, &["board1"]);

        graph.resolve_dependencies().unwrap();
        assert_eq!(graph.parents_of(&motor), vec![board]);
        assert!(!graph.node(&motor).unwrap().dependencies_unresolved());
    }

    #[test]
    fn test_resolve_dependencies_reports_cycle() {
        let mut graph = Graph::new();
        let a = name("board", "a");
        let b = name("board", "b");
        unconfigured(&mut graph, &a, &["b"]);
        unconfigured(&mut graph, &b, &["a"]);

        let err = graph.resolve_dependencies().unwrap_err();
        assert!(err.to_string().contains("circular"));
        // One of the two nodes carries the cycle error and stays pending.
        let errored = [&a, &b]
            .iter()
            .filter(|n| graph.node(n).unwrap().dependencies_unresolved())
            .count();
        assert_eq!(errored, 1);
    }

    #[test]
    fn test_resolve_dependencies_missing_dep_is_recorded_not_fatal() {
        let mut graph = Graph::new();
        let motor = name("motor", "motor1");
        unconfigured(&mut graph, &motor, &["ghost"]);

        let err = graph.resolve_dependencies().unwrap_err();
        assert!(err.to_string().contains("not found"));
        let node = graph.node(&motor).unwrap();
        assert!(node.dependencies_unresolved());
        assert!(node.last_error().is_some());
    }

    #[test]
    fn test_resolve_dependencies_clash_across_remotes() {
        let mut graph = Graph::new();
        let on_r1 = name("arm", "arm1").prepend_remote("r1");
        let on_r2 = name("arm", "arm1").prepend_remote("r2");
        let gripper = name("gripper", "gripper1");
        configured(&mut graph, &on_r1);
        configured(&mut graph, &on_r2);
        unconfigured(&mut graph, &gripper, &["arm1"]);

        let err = graph.resolve_dependencies().unwrap_err();
        assert!(err.is_clash());

        // Qualifying with the remote name disambiguates.
        let gripper2 = name("gripper", "gripper2");
        unconfigured(&mut graph, &gripper2, &["r1:arm1"]);
        graph.resolve_dependencies().unwrap_err(); // gripper1 still clashes
        assert_eq!(graph.parents_of(&gripper2), vec![on_r1]);
    }

    #[test]
    fn test_resolve_dependencies_fully_qualified_creates_placeholder() {
        let mut graph = Graph::new();
        let motor = name("motor", "motor1");
        unconfigured(&mut graph, &motor, &["rdk:component:board/board1"]);

        graph.resolve_dependencies().unwrap();
        let board = name("board", "board1");
        assert_eq!(graph.parents_of(&motor), vec![board.clone()]);
        assert!(graph.node(&board).unwrap().is_uninitialized());
    }
}
