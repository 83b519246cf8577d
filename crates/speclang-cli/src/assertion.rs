//! Assertion tree: MUST / MAY / MUST_NOT groups over predicate leaves.
//!
//! The tree is built once per case by [`crate::case`]. Evaluation is
//! driven here; the caller supplies the leaf evaluator (which resolves the
//! leaf's target to a subject and runs the interpreter) and an observer
//! that sees every top-level clause as it settles.
//!
//! Only assertion failures are absorbed by `MAY` and `MUST_NOT`. Schema,
//! budget, capability and runtime errors always propagate.

use std::sync::Arc;

use serde::Serialize;
use speclang_ast::ast::Expr;
use speclang_types::Class;

use crate::error::{EvalError, RunError};

/// At most this many child failures are quoted in a failed `MAY` message.
const MAY_FAILURE_DETAILS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum AssertNode {
    Group {
        class: Class,
        /// Contract step id for top-level clauses.
        id: Option<String>,
        target: Option<String>,
        assert_path: String,
        children: Vec<AssertNode>,
    },
    Leaf {
        target: Option<String>,
        assert_path: String,
        expr: Arc<Expr>,
    },
}

impl AssertNode {
    /// An empty `MUST` root, which always passes.
    pub fn empty() -> AssertNode {
        AssertNode::Group {
            class: Class::Must,
            id: None,
            target: None,
            assert_path: "contract".to_string(),
            children: Vec::new(),
        }
    }

    pub fn assert_path(&self) -> &str {
        match self {
            AssertNode::Group { assert_path, .. } | AssertNode::Leaf { assert_path, .. } => {
                assert_path
            }
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            AssertNode::Group { target, .. } | AssertNode::Leaf { target, .. } => {
                target.as_deref()
            }
        }
    }

    /// The clauses of a contract: children of a `MUST` root, otherwise the
    /// node itself.
    fn clauses(&self) -> Vec<&AssertNode> {
        match self {
            AssertNode::Group {
                class: Class::Must,
                id: None,
                children,
                ..
            } => children.iter().collect(),
            other => vec![other],
        }
    }
}

/// Running clause counts, updated after every top-level clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub passed_clauses: u64,
    pub failed_clauses: u64,
    pub must_passed: u64,
    pub may_passed: u64,
    pub must_not_passed: u64,
}

impl Totals {
    fn record_pass(&mut self, class: Class) {
        self.passed_clauses += 1;
        match class {
            Class::Must => self.must_passed += 1,
            Class::May => self.may_passed += 1,
            Class::MustNot => self.must_not_passed += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClauseRecord {
    pub index: usize,
    pub id: Option<String>,
    pub class: Class,
    pub assert_path: String,
    pub target: Option<String>,
    pub passed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContractReport {
    pub totals: Totals,
    pub clauses: Vec<ClauseRecord>,
}

/// Side channel notified as each clause settles.
pub trait ClauseObserver {
    fn clause_passed(&mut self, _clause: &ClauseRecord, _totals: &Totals) -> Result<(), RunError> {
        Ok(())
    }

    fn clause_failed(
        &mut self,
        _clause: &ClauseRecord,
        _totals: &Totals,
        _failure: &RunError,
    ) -> Result<(), RunError> {
        Ok(())
    }

    fn completed(&mut self, _totals: &Totals) -> Result<(), RunError> {
        Ok(())
    }
}

/// Observer that ignores every notification.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl ClauseObserver for NoopObserver {}

/// Evaluate `tree` clause by clause. The first failing clause stops the
/// run after the observer has seen it.
pub fn evaluate<F, O>(
    tree: &AssertNode,
    case_id: &str,
    leaf: F,
    observer: &mut O,
) -> Result<ContractReport, RunError>
where
    F: FnMut(&Expr, Option<&str>) -> Result<bool, EvalError>,
    O: ClauseObserver + ?Sized,
{
    let mut walker = Walker { case_id, leaf };
    let mut report = ContractReport::default();
    for (index, clause) in tree.clauses().into_iter().enumerate() {
        let (class, id) = match clause {
            AssertNode::Group { class, id, .. } => (*class, id.clone()),
            AssertNode::Leaf { .. } => (Class::Must, None),
        };
        let outcome = walker.node(clause, None);
        let mut record = ClauseRecord {
            index,
            id,
            class,
            assert_path: clause.assert_path().to_string(),
            target: clause.target().map(str::to_string),
            passed: outcome.is_ok(),
        };
        match outcome {
            Ok(()) => {
                report.totals.record_pass(class);
                report.clauses.push(record);
                let last = &report.clauses[report.clauses.len() - 1];
                observer.clause_passed(last, &report.totals)?;
            }
            Err(failure) => {
                record.passed = false;
                report.totals.failed_clauses += 1;
                observer.clause_failed(&record, &report.totals, &failure)?;
                return Err(failure);
            }
        }
    }
    observer.completed(&report.totals)?;
    Ok(report)
}

struct Walker<'a, F> {
    case_id: &'a str,
    leaf: F,
}

impl<F> Walker<'_, F>
where
    F: FnMut(&Expr, Option<&str>) -> Result<bool, EvalError>,
{
    fn context(&self, assert_path: &str, target: Option<&str>) -> String {
        let mut ctx = format!("[case_id={} assert_path={assert_path}", self.case_id);
        if let Some(target) = target {
            ctx.push_str(&format!(" target={target}"));
        }
        ctx.push_str(" op=evaluate]");
        ctx
    }

    fn node(&mut self, node: &AssertNode, inherited: Option<&str>) -> Result<(), RunError> {
        match node {
            AssertNode::Leaf {
                target,
                assert_path,
                expr,
            } => {
                let target = target.as_deref().or(inherited);
                match (self.leaf)(expr, target) {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(RunError::Assertion(format!(
                        "{} evaluate assertion failed",
                        self.context(assert_path, target)
                    ))),
                    Err(source) => Err(RunError::Evaluate {
                        context: self.context(assert_path, target),
                        source,
                    }),
                }
            }
            AssertNode::Group {
                class,
                target,
                children,
                ..
            } => {
                let inherited = target.as_deref().or(inherited);
                match class {
                    Class::Must => children.iter().try_for_each(|c| self.node(c, inherited)),
                    Class::May => self.any_passes(children, inherited),
                    Class::MustNot => self.none_pass(children, inherited),
                }
            }
        }
    }

    fn any_passes(&mut self, children: &[AssertNode], inherited: Option<&str>) -> Result<(), RunError> {
        let mut failures = Vec::new();
        for child in children {
            match self.node(child, inherited) {
                Ok(()) => return Ok(()),
                Err(e) if e.is_assertion() => failures.push(e.to_string()),
                Err(e) => return Err(e),
            }
        }
        let mut msg = String::from("all 'can' branches failed");
        if !failures.is_empty() {
            let details: Vec<String> = failures
                .iter()
                .take(MAY_FAILURE_DETAILS)
                .map(|f| format!("- {f}"))
                .collect();
            msg.push_str(":\n");
            msg.push_str(&details.join("\n"));
        }
        Err(RunError::Assertion(msg))
    }

    fn none_pass(&mut self, children: &[AssertNode], inherited: Option<&str>) -> Result<(), RunError> {
        let mut passed = 0usize;
        for child in children {
            match self.node(child, inherited) {
                Ok(()) => passed += 1,
                Err(e) if e.is_assertion() => {}
                Err(e) => return Err(e),
            }
        }
        if passed > 0 {
            return Err(RunError::Assertion(format!(
                "'cannot' failed: {passed} branch(es) passed"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(path: &str, value: bool) -> AssertNode {
        AssertNode::Leaf {
            target: None,
            assert_path: path.to_string(),
            expr: Arc::new(Expr::lit(value)),
        }
    }

    fn group(class: Class, children: Vec<AssertNode>) -> AssertNode {
        AssertNode::Group {
            class,
            id: Some("g".into()),
            target: Some("text".into()),
            assert_path: "contract.steps[0]".into(),
            children,
        }
    }

    fn root(children: Vec<AssertNode>) -> AssertNode {
        AssertNode::Group {
            class: Class::Must,
            id: None,
            target: None,
            assert_path: "contract".into(),
            children,
        }
    }

    fn literal_leaf(expr: &Expr, _: Option<&str>) -> Result<bool, EvalError> {
        match expr {
            Expr::Lit(v) => Ok(v.as_bool().unwrap_or(false)),
            _ => Err(EvalError::schema("unexpected expr")),
        }
    }

    fn run(tree: &AssertNode) -> Result<ContractReport, RunError> {
        evaluate(tree, "c1", literal_leaf, &mut NoopObserver)
    }

    #[test]
    fn must_not_passes_only_when_nothing_passes() {
        assert!(run(&root(vec![group(Class::MustNot, vec![])])).is_ok());
        assert!(run(&root(vec![group(Class::MustNot, vec![leaf("a", false)])])).is_ok());
        let err = run(&root(vec![group(
            Class::MustNot,
            vec![leaf("a", true), leaf("b", false), leaf("c", true)],
        )]))
        .unwrap_err();
        assert_eq!(err.to_string(), "'cannot' failed: 2 branch(es) passed");
    }

    #[test]
    fn may_aggregates_child_failures() {
        let err = run(&root(vec![group(Class::May, vec![leaf("a", false), leaf("b", false)])]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "all 'can' branches failed:\n\
             - [case_id=c1 assert_path=a target=text op=evaluate] evaluate assertion failed\n\
             - [case_id=c1 assert_path=b target=text op=evaluate] evaluate assertion failed"
        );
        assert!(run(&root(vec![group(Class::May, vec![leaf("a", false), leaf("b", true)])])).is_ok());
    }

    #[test]
    fn evaluation_errors_escape_may() {
        let bad = AssertNode::Leaf {
            target: None,
            assert_path: "x".into(),
            expr: Arc::new(Expr::var("nope")),
        };
        let err = run(&root(vec![group(Class::May, vec![bad, leaf("b", true)])])).unwrap_err();
        assert!(!err.is_assertion());
        assert_eq!(
            err.to_string(),
            "[case_id=c1 assert_path=x target=text op=evaluate] unexpected expr"
        );
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ClauseObserver for Recorder {
        fn clause_passed(&mut self, clause: &ClauseRecord, totals: &Totals) -> Result<(), RunError> {
            self.events.push(format!("pass {} {}", clause.index, totals.passed_clauses));
            Ok(())
        }

        fn clause_failed(
            &mut self,
            clause: &ClauseRecord,
            totals: &Totals,
            _: &RunError,
        ) -> Result<(), RunError> {
            self.events.push(format!("fail {} {}", clause.index, totals.failed_clauses));
            Ok(())
        }

        fn completed(&mut self, _: &Totals) -> Result<(), RunError> {
            self.events.push("complete".into());
            Ok(())
        }
    }

    #[test]
    fn observer_sees_each_clause() {
        let tree = root(vec![
            group(Class::Must, vec![leaf("a", true)]),
            group(Class::MustNot, vec![leaf("b", false)]),
        ]);
        let mut rec = Recorder::default();
        let report = evaluate(&tree, "c1", literal_leaf, &mut rec).unwrap();
        assert_eq!(rec.events, vec!["pass 0 1", "pass 1 2", "complete"]);
        assert_eq!(report.totals.must_passed, 1);
        assert_eq!(report.totals.must_not_passed, 1);

        let tree = root(vec![group(Class::Must, vec![leaf("a", false)]), group(Class::Must, vec![])]);
        let mut rec = Recorder::default();
        assert!(evaluate(&tree, "c1", literal_leaf, &mut rec).is_err());
        assert_eq!(rec.events, vec!["fail 0 1"]);
    }
}
