//! Structural and field edits on the process tree.
//!
//! Every edit resolves its target by id before touching anything, so a
//! rejected edit leaves the tree exactly as it was. Accepted edits go
//! through [`Arc::make_mut`]: nodes on the path to the target are copied
//! when a snapshot still shares them, everything else is left in place.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ids::IdGenerator;
use super::model::{Element, Failure, Process, ScoreField, Subprocess};
use super::model::DEFAULT_PROCESS_COLOR;
use super::{ElementKind, NodeKind};
use crate::error::{Error, Result};
use crate::patterns;
use crate::rpn::Score;

/// Identifies a failure by the ids along its path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FailurePath {
    /// Process id.
    pub process: String,
    /// Subprocess id.
    pub subprocess: String,
    /// Failure id.
    pub failure: String,
}

impl FailurePath {
    /// Create a path from its three ids.
    #[must_use]
    pub fn new(
        process: impl Into<String>,
        subprocess: impl Into<String>,
        failure: impl Into<String>,
    ) -> Self {
        Self {
            process: process.into(),
            subprocess: subprocess.into(),
            failure: failure.into(),
        }
    }
}

/// The ordered list of processes of a document, plus its id generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<Arc<Process>>", into = "Vec<Arc<Process>>")]
pub struct ProcessTree {
    processes: Vec<Arc<Process>>,
    ids: IdGenerator,
    color: String,
}

impl Default for ProcessTree {
    fn default() -> Self {
        Self::with_color(DEFAULT_PROCESS_COLOR)
    }
}

impl PartialEq for ProcessTree {
    fn eq(&self, other: &Self) -> bool {
        self.processes == other.processes
    }
}

impl Eq for ProcessTree {}

impl From<Vec<Arc<Process>>> for ProcessTree {
    fn from(processes: Vec<Arc<Process>>) -> Self {
        let ids = IdGenerator::new();
        for process in &processes {
            for id in process.all_ids() {
                ids.observe(id);
            }
        }
        Self {
            processes,
            ids,
            color: DEFAULT_PROCESS_COLOR.to_string(),
        }
    }
}

impl From<ProcessTree> for Vec<Arc<Process>> {
    fn from(tree: ProcessTree) -> Self {
        tree.processes
    }
}

impl ProcessTree {
    /// A tree with one process, subprocess, failure, effect, cause and barrier.
    #[must_use]
    pub fn with_color(color: &str) -> Self {
        let ids = IdGenerator::new();
        let processes = vec![Arc::new(Process::blank(&ids, color))];
        Self {
            processes,
            ids,
            color: color.to_string(),
        }
    }

    /// Set the color given to processes added from now on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidColor`] if `color` is not `#RRGGBB`.
    pub fn set_default_color(&mut self, color: &str) -> Result<()> {
        check_color(color)?;
        self.color = color.to_string();
        Ok(())
    }

    /// The processes, in display order.
    #[must_use]
    pub fn processes(&self) -> &[Arc<Process>] {
        &self.processes
    }

    /// The id generator shared by this tree and its clones.
    #[must_use]
    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    /// Look up a process.
    #[must_use]
    pub fn process(&self, process_id: &str) -> Option<&Arc<Process>> {
        self.processes.iter().find(|p| p.id == process_id)
    }

    /// Look up a subprocess.
    #[must_use]
    pub fn subprocess(&self, process_id: &str, subprocess_id: &str) -> Option<&Arc<Subprocess>> {
        self.process(process_id)?
            .subprocesses
            .iter()
            .find(|s| s.id == subprocess_id)
    }

    /// Look up a failure.
    #[must_use]
    pub fn failure(&self, path: &FailurePath) -> Option<&Arc<Failure>> {
        self.subprocess(&path.process, &path.subprocess)?
            .failures
            .iter()
            .find(|f| f.id == path.failure)
    }

    /// Every failure with its path, in document order.
    pub fn failures(&self) -> impl Iterator<Item = (FailurePath, &Failure)> {
        self.processes.iter().flat_map(|p| {
            p.subprocesses.iter().flat_map(move |s| {
                s.failures.iter().map(move |f| {
                    (
                        FailurePath::new(p.id.as_str(), s.id.as_str(), f.id.as_str()),
                        f.as_ref(),
                    )
                })
            })
        })
    }

    /// Highest RPN in the tree.
    #[must_use]
    pub fn max_rpn(&self) -> Option<u8> {
        self.failures().map(|(_, f)| f.rpn()).max()
    }

    /// Lists that must hold at least one node but are empty, with the dotted
    /// wire path of each list.
    ///
    /// Edits never produce these; documents read from a file or a store may.
    #[must_use]
    pub fn empty_lists(&self) -> Vec<(String, NodeKind)> {
        let mut empty = Vec::new();
        if self.processes.is_empty() {
            empty.push(("procesos".to_string(), NodeKind::Process));
        }
        for p in &self.processes {
            let process = format!("procesos.{}.subprocesos", p.id);
            if p.subprocesses.is_empty() {
                empty.push((process.clone(), NodeKind::Subprocess));
            }
            for s in &p.subprocesses {
                let subprocess = format!("{process}.{}.fallasPotenciales", s.id);
                if s.failures.is_empty() {
                    empty.push((subprocess.clone(), NodeKind::Failure));
                }
                for f in &s.failures {
                    for kind in ElementKind::ALL.into_iter().filter(|k| k.is_required()) {
                        if f.elements(kind).is_empty() {
                            empty.push((
                                format!("{subprocess}.{}.{}", f.id, kind.wire_name()),
                                kind.into(),
                            ));
                        }
                    }
                }
            }
        }
        empty
    }

    // === Processes ===

    /// Append a blank process and return its id.
    pub fn add_process(&mut self) -> String {
        let process = Process::blank(&self.ids, &self.color);
        let id = process.id.clone();
        self.processes.push(Arc::new(process));
        debug!(process = %id, "added process");
        id
    }

    /// Remove a process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for an unknown id and
    /// [`Error::MinimumChildren`] when it is the only process.
    pub fn remove_process(&mut self, process_id: &str) -> Result<()> {
        let pi = self.process_index(process_id)?;
        ensure_not_last(self.processes.len(), NodeKind::Process)?;
        self.processes.remove(pi);
        debug!(process = %process_id, "removed process");
        Ok(())
    }

    /// Rename a process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for an unknown id.
    pub fn rename_process(&mut self, process_id: &str, name: impl Into<String>) -> Result<()> {
        let pi = self.process_index(process_id)?;
        Arc::make_mut(&mut self.processes[pi]).name = name.into();
        Ok(())
    }

    /// Change the display color of a process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for an unknown id and
    /// [`Error::InvalidColor`] if `color` is not `#RRGGBB`.
    pub fn recolor_process(&mut self, process_id: &str, color: &str) -> Result<()> {
        let pi = self.process_index(process_id)?;
        check_color(color)?;
        Arc::make_mut(&mut self.processes[pi]).color = color.to_string();
        Ok(())
    }

    // === Subprocesses ===

    /// Append a blank subprocess to a process and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for an unknown process id.
    pub fn add_subprocess(&mut self, process_id: &str) -> Result<String> {
        let pi = self.process_index(process_id)?;
        let subprocess = Subprocess::blank(&self.ids);
        let id = subprocess.id.clone();
        Arc::make_mut(&mut self.processes[pi])
            .subprocesses
            .push(Arc::new(subprocess));
        debug!(process = %process_id, subprocess = %id, "added subprocess");
        Ok(id)
    }

    /// Remove a subprocess.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for an unknown id and
    /// [`Error::MinimumChildren`] when it is the only subprocess.
    pub fn remove_subprocess(&mut self, process_id: &str, subprocess_id: &str) -> Result<()> {
        let (pi, si) = self.subprocess_index(process_id, subprocess_id)?;
        ensure_not_last(self.processes[pi].subprocesses.len(), NodeKind::Subprocess)?;
        Arc::make_mut(&mut self.processes[pi]).subprocesses.remove(si);
        debug!(process = %process_id, subprocess = %subprocess_id, "removed subprocess");
        Ok(())
    }

    /// Rename a subprocess.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for an unknown id.
    pub fn rename_subprocess(
        &mut self,
        process_id: &str,
        subprocess_id: &str,
        name: impl Into<String>,
    ) -> Result<()> {
        let (pi, si) = self.subprocess_index(process_id, subprocess_id)?;
        self.subprocess_at(pi, si).name = name.into();
        Ok(())
    }

    // === Failures ===

    /// Append a blank failure to a subprocess and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for an unknown id.
    pub fn add_failure(&mut self, process_id: &str, subprocess_id: &str) -> Result<String> {
        let (pi, si) = self.subprocess_index(process_id, subprocess_id)?;
        let failure = Failure::blank(&self.ids);
        let id = failure.id.clone();
        self.subprocess_at(pi, si).failures.push(Arc::new(failure));
        debug!(subprocess = %subprocess_id, failure = %id, "added failure");
        Ok(id)
    }

    /// Remove a failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for an unknown id and
    /// [`Error::MinimumChildren`] when it is the only failure.
    pub fn remove_failure(&mut self, path: &FailurePath) -> Result<()> {
        let (pi, si, fi) = self.failure_index(path)?;
        ensure_not_last(
            self.processes[pi].subprocesses[si].failures.len(),
            NodeKind::Failure,
        )?;
        self.subprocess_at(pi, si).failures.remove(fi);
        debug!(failure = %path.failure, "removed failure");
        Ok(())
    }

    /// Replace the description of a failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for an unknown id.
    pub fn describe_failure(
        &mut self,
        path: &FailurePath,
        description: impl Into<String>,
    ) -> Result<()> {
        let at = self.failure_index(path)?;
        self.failure_at(at).description = description.into();
        Ok(())
    }

    /// Set the responsible party of a failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for an unknown id.
    pub fn set_responsible(&mut self, path: &FailurePath, who: impl Into<String>) -> Result<()> {
        let at = self.failure_index(path)?;
        self.failure_at(at).responsible = who.into();
        Ok(())
    }

    /// Change one evaluation score and return the recomputed RPN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for an unknown id.
    pub fn set_score(&mut self, path: &FailurePath, field: ScoreField, score: Score) -> Result<u8> {
        let at = self.failure_index(path)?;
        let rpn = self.failure_at(at).evaluation.set(field, score);
        debug!(failure = %path.failure, field = field.wire_name(), %score, rpn, "score changed");
        Ok(rpn)
    }

    // === Elements ===

    /// Append a blank element to one of a failure's lists and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for an unknown id.
    pub fn add_element(&mut self, path: &FailurePath, kind: ElementKind) -> Result<String> {
        let at = self.failure_index(path)?;
        let element = Element::blank(&self.ids, kind);
        let id = element.id.clone();
        self.failure_at(at).elements_mut(kind).push(element);
        debug!(failure = %path.failure, kind = kind.wire_name(), element = %id, "added element");
        Ok(id)
    }

    /// Remove an element from one of a failure's lists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for an unknown id and
    /// [`Error::MinimumChildren`] when it is the last element of its list.
    pub fn remove_element(
        &mut self,
        path: &FailurePath,
        kind: ElementKind,
        element_id: &str,
    ) -> Result<()> {
        let at = self.failure_index(path)?;
        let (pi, si, fi) = at;
        let list = self.processes[pi].subprocesses[si].failures[fi].elements(kind);
        let ei = element_position(list, kind, element_id)?;
        ensure_not_last(list.len(), kind.into())?;
        self.failure_at(at).elements_mut(kind).remove(ei);
        Ok(())
    }

    /// Replace the text of an element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`] for an unknown id.
    pub fn edit_element(
        &mut self,
        path: &FailurePath,
        kind: ElementKind,
        element_id: &str,
        text: impl Into<String>,
    ) -> Result<()> {
        let at = self.failure_index(path)?;
        let (pi, si, fi) = at;
        let list = self.processes[pi].subprocesses[si].failures[fi].elements(kind);
        let ei = element_position(list, kind, element_id)?;
        self.failure_at(at).elements_mut(kind)[ei].text = text.into();
        Ok(())
    }

    // === Index resolution ===

    fn process_index(&self, process_id: &str) -> Result<usize> {
        self.processes
            .iter()
            .position(|p| p.id == process_id)
            .ok_or_else(|| Error::node_not_found(NodeKind::Process, process_id))
    }

    fn subprocess_index(&self, process_id: &str, subprocess_id: &str) -> Result<(usize, usize)> {
        let pi = self.process_index(process_id)?;
        let si = self.processes[pi]
            .subprocesses
            .iter()
            .position(|s| s.id == subprocess_id)
            .ok_or_else(|| Error::node_not_found(NodeKind::Subprocess, subprocess_id))?;
        Ok((pi, si))
    }

    fn failure_index(&self, path: &FailurePath) -> Result<(usize, usize, usize)> {
        let (pi, si) = self.subprocess_index(&path.process, &path.subprocess)?;
        let fi = self.processes[pi].subprocesses[si]
            .failures
            .iter()
            .position(|f| f.id == path.failure)
            .ok_or_else(|| Error::node_not_found(NodeKind::Failure, path.failure.as_str()))?;
        Ok((pi, si, fi))
    }

    fn subprocess_at(&mut self, pi: usize, si: usize) -> &mut Subprocess {
        let process = Arc::make_mut(&mut self.processes[pi]);
        Arc::make_mut(&mut process.subprocesses[si])
    }

    fn failure_at(&mut self, (pi, si, fi): (usize, usize, usize)) -> &mut Failure {
        let subprocess = self.subprocess_at(pi, si);
        Arc::make_mut(&mut subprocess.failures[fi])
    }
}

fn element_position(list: &[Element], kind: ElementKind, element_id: &str) -> Result<usize> {
    list.iter()
        .position(|e| e.id == element_id)
        .ok_or_else(|| Error::node_not_found(kind.into(), element_id))
}

fn ensure_not_last(len: usize, kind: NodeKind) -> Result<()> {
    if len <= 1 {
        warn!(%kind, "{}", kind.minimum_warning());
        return Err(Error::MinimumChildren { kind });
    }
    Ok(())
}

fn check_color(color: &str) -> Result<()> {
    if patterns::color().matches(color) {
        Ok(())
    } else {
        Err(Error::InvalidColor(color.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(v: i64) -> Score {
        Score::new(v).unwrap()
    }

    fn first_path(tree: &ProcessTree) -> FailurePath {
        tree.failures().next().map(|(path, _)| path).unwrap()
    }

    #[test]
    fn test_new_tree_has_one_of_everything() {
        let tree = ProcessTree::default();
        assert_eq!(tree.processes().len(), 1);
        let process = &tree.processes()[0];
        assert_eq!(process.color, DEFAULT_PROCESS_COLOR);
        assert_eq!(process.subprocesses.len(), 1);
        assert_eq!(process.subprocesses[0].failures.len(), 1);
        assert_eq!(tree.failures().count(), 1);
    }

    #[test]
    fn test_remove_last_process_is_rejected() {
        let mut tree = ProcessTree::default();
        let before = tree.clone();
        let pid = tree.processes()[0].id.clone();

        let err = tree.remove_process(&pid).unwrap_err();
        assert!(matches!(
            err,
            Error::MinimumChildren {
                kind: NodeKind::Process
            }
        ));
        assert_eq!(tree, before);
        assert!(Arc::ptr_eq(&tree.processes()[0], &before.processes()[0]));
    }

    #[test]
    fn test_add_and_remove_process() {
        let mut tree = ProcessTree::default();
        let id = tree.add_process();
        assert_eq!(tree.processes().len(), 2);
        tree.remove_process(&id).unwrap();
        assert_eq!(tree.processes().len(), 1);
    }

    #[test]
    fn test_remove_unknown_process() {
        let mut tree = ProcessTree::default();
        tree.add_process();
        let err = tree.remove_process("proc-0").unwrap_err();
        assert!(matches!(err, Error::NodeNotFound { .. }));
        assert_eq!(tree.processes().len(), 2);
    }

    #[test]
    fn test_remove_last_subprocess_and_failure_rejected() {
        let mut tree = ProcessTree::default();
        let path = first_path(&tree);

        let err = tree
            .remove_subprocess(&path.process, &path.subprocess)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MinimumChildren {
                kind: NodeKind::Subprocess
            }
        ));

        let err = tree.remove_failure(&path).unwrap_err();
        assert!(matches!(
            err,
            Error::MinimumChildren {
                kind: NodeKind::Failure
            }
        ));
    }

    #[test]
    fn test_remove_last_element_rejected_for_every_kind() {
        let mut tree = ProcessTree::default();
        let path = first_path(&tree);
        // action lists start empty; give them one element each
        tree.add_element(&path, ElementKind::RecommendedAction).unwrap();
        tree.add_element(&path, ElementKind::TakenAction).unwrap();
        let before = tree.clone();

        for kind in ElementKind::ALL {
            let only = tree.failure(&path).unwrap().elements(kind)[0].id.clone();
            let err = tree.remove_element(&path, kind, &only).unwrap_err();
            assert!(matches!(err, Error::MinimumChildren { kind: k } if k == NodeKind::from(kind)));
        }
        assert_eq!(tree, before);
    }

    #[test]
    fn test_add_then_remove_element_restores_list() {
        let mut tree = ProcessTree::default();
        let path = first_path(&tree);
        let cause = tree.failure(&path).unwrap().causes[0].id.clone();
        tree.edit_element(&path, ElementKind::Cause, &cause, "battery depleted")
            .unwrap();
        let before = tree.failure(&path).unwrap().causes.clone();

        let id = tree.add_element(&path, ElementKind::Cause).unwrap();
        assert_eq!(tree.failure(&path).unwrap().causes.len(), 2);
        tree.remove_element(&path, ElementKind::Cause, &id).unwrap();

        assert_eq!(tree.failure(&path).unwrap().causes, before);
    }

    #[test]
    fn test_set_score_recomputes_rpn() {
        let mut tree = ProcessTree::default();
        let path = first_path(&tree);
        tree.set_score(&path, ScoreField::Severity, score(3)).unwrap();
        tree.set_score(&path, ScoreField::Occurrence, score(4)).unwrap();
        let rpn = tree
            .set_score(&path, ScoreField::Detectability, score(2))
            .unwrap();
        assert_eq!(rpn, 24);
        assert_eq!(tree.failure(&path).unwrap().rpn(), 24);
        assert_eq!(tree.max_rpn(), Some(24));
    }

    #[test]
    fn test_edit_leaves_siblings_shared() {
        let mut tree = ProcessTree::default();
        let p1 = tree.processes()[0].id.clone();
        let p2 = tree.add_process();
        let s2 = tree.add_subprocess(&p1).unwrap();
        let snapshot = tree.clone();

        let s1 = snapshot.processes()[0].subprocesses[0].id.clone();
        tree.rename_subprocess(&p1, &s1, "Recepción").unwrap();

        // untouched process is the same allocation
        assert!(Arc::ptr_eq(
            tree.process(&p2).unwrap(),
            snapshot.process(&p2).unwrap()
        ));
        // untouched sibling subprocess is shared too
        assert!(Arc::ptr_eq(
            tree.subprocess(&p1, &s2).unwrap(),
            snapshot.subprocess(&p1, &s2).unwrap()
        ));
        // the path to the edit was copied and the snapshot is unchanged
        assert!(!Arc::ptr_eq(
            tree.process(&p1).unwrap(),
            snapshot.process(&p1).unwrap()
        ));
        assert_eq!(snapshot.subprocess(&p1, &s1).unwrap().name, "");
        assert_eq!(tree.subprocess(&p1, &s1).unwrap().name, "Recepción");
    }

    #[test]
    fn test_recolor_validates() {
        let mut tree = ProcessTree::default();
        let pid = tree.processes()[0].id.clone();
        tree.recolor_process(&pid, "#FF0000").unwrap();
        assert_eq!(tree.process(&pid).unwrap().color, "#FF0000");

        let err = tree.recolor_process(&pid, "red").unwrap_err();
        assert!(matches!(err, Error::InvalidColor(_)));
        assert_eq!(tree.process(&pid).unwrap().color, "#FF0000");
    }

    #[test]
    fn test_default_color_applies_to_new_processes() {
        let mut tree = ProcessTree::default();
        tree.set_default_color("#AABBCC").unwrap();
        let id = tree.add_process();
        assert_eq!(tree.process(&id).unwrap().color, "#AABBCC");
        assert!(tree.set_default_color("#12").is_err());
    }

    #[test]
    fn test_field_edits() {
        let mut tree = ProcessTree::default();
        let path = first_path(&tree);
        tree.rename_process(&path.process, "PLANEACIÓN").unwrap();
        tree.describe_failure(&path, "Bomba no enciende").unwrap();
        tree.set_responsible(&path, "Ingeniería biomédica").unwrap();

        let failure = tree.failure(&path).unwrap();
        assert_eq!(failure.description, "Bomba no enciende");
        assert_eq!(failure.responsible, "Ingeniería biomédica");
        assert_eq!(tree.process(&path.process).unwrap().name, "PLANEACIÓN");
    }

    #[test]
    fn test_unknown_failure_path() {
        let mut tree = ProcessTree::default();
        let mut path = first_path(&tree);
        path.failure = "falla-0".to_string();
        assert!(matches!(
            tree.describe_failure(&path, "x"),
            Err(Error::NodeNotFound {
                kind: NodeKind::Failure,
                ..
            })
        ));
        assert!(tree.add_element(&path, ElementKind::Effect).is_err());
    }

    #[test]
    fn test_unknown_element_id() {
        let mut tree = ProcessTree::default();
        let path = first_path(&tree);
        let err = tree
            .edit_element(&path, ElementKind::Barrier, "barrera-0", "x")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NodeNotFound {
                kind: NodeKind::Barrier,
                ..
            }
        ));
    }

    #[test]
    fn test_deserialize_seeds_id_generator() {
        let json = r##"[{
            "id": "proc-9000000000000",
            "nombre": "P",
            "color": "#C6E0B4",
            "subprocesos": [{
                "id": "subproc-9000000000001",
                "nombre": "S",
                "fallasPotenciales": [{
                    "id": "falla-9000000000002",
                    "descripcion": "",
                    "efectosPotenciales": [{"id": "efecto-9000000000005", "descripcion": ""}],
                    "causasPotenciales": [{"id": "causa-9000000000003", "descripcion": ""}],
                    "barrerasExistentes": [{"id": "barrera-9000000000004", "descripcion": ""}],
                    "evaluacion": {"severidad": 1, "detectabilidad": 1, "ocurrencia": 1, "rpn": 1},
                    "accionesRecomendadas": [],
                    "accionesTomadas": [],
                    "responsable": ""
                }]
            }]
        }]"##;
        let mut tree: ProcessTree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.ids().last(), 9_000_000_000_005);
        let id = tree.add_process();
        assert_eq!(id, "proc-9000000000006");
    }

    #[test]
    fn test_empty_lists_on_fresh_tree() {
        assert!(ProcessTree::default().empty_lists().is_empty());
        let tree: ProcessTree = serde_json::from_str("[]").unwrap();
        assert_eq!(
            tree.empty_lists(),
            vec![("procesos".to_string(), NodeKind::Process)]
        );
    }

    #[test]
    fn test_empty_lists_ignore_action_lists() {
        let mut tree = ProcessTree::default();
        let path = tree.failures().next().unwrap().0;
        let action = tree.add_element(&path, ElementKind::TakenAction).unwrap();
        assert!(tree.empty_lists().is_empty());
        assert!(tree
            .remove_element(&path, ElementKind::TakenAction, &action)
            .is_err());
        assert!(tree.empty_lists().is_empty());
    }

    #[test]
    fn test_loaded_max_id_does_not_freeze_generator() {
        let json = format!(
            r#"[{{"id": "proc-{}", "nombre": "P", "subprocesos": []}}]"#,
            u64::MAX
        );
        let mut tree: ProcessTree = serde_json::from_str(&json).unwrap();
        let a = tree.add_process();
        let b = tree.add_process();
        assert_ne!(a, b);
        assert_ne!(a, format!("proc-{}", u64::MAX));
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let tree = ProcessTree::default();
        let json = serde_json::to_value(&tree).unwrap();
        assert!(json.is_array());
        assert_eq!(json.as_array().unwrap().len(), 1);
    }
}
