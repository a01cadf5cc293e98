//! Capture analysis
//!
//! Second walk over a declaration body. It mirrors the scope stack of
//! `ScopeTree::build` and keeps a stack of the closures being visited; every
//! reference that resolves to a scope outside the innermost closure is a
//! capture for each enclosing closure nested deeper than that scope.

use crate::error::{LowerError, LowerResult};
use crate::scope::{DeclarationBody, ScopeId, ScopeTree};
use rustc_hash::{FxHashMap, FxHashSet};
use strata_ast::ast::*;
use strata_ast::Span;
use tracing::trace;

/// What one closure needs from its surroundings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosureInfo {
    /// Enclosing scopes read or written from inside the closure, shallowest first
    pub captured_scopes: Vec<ScopeId>,
    /// The closure uses the enclosing receiver
    pub references_this: bool,
}

impl ClosureInfo {
    /// Whether the definition site can be a plain function reference.
    pub fn is_self_contained(&self) -> bool {
        self.captured_scopes.is_empty() && !self.references_this
    }
}

/// Scope tree and capture facts of one declaration body
#[derive(Debug, Clone)]
pub struct Analysis {
    pub tree: ScopeTree,
    closures: FxHashMap<NodeId, ClosureInfo>,
    /// The body, or some closure inside it, uses the receiver
    pub root_references_this: bool,
}

impl Analysis {
    pub fn closure(&self, id: NodeId) -> Option<&ClosureInfo> {
        self.closures.get(&id)
    }

    pub fn closure_count(&self) -> usize {
        self.closures.len()
    }
}

/// Build the scope tree of `body` and run capture analysis over it.
pub fn analyze(body: DeclarationBody<'_>) -> LowerResult<Analysis> {
    let tree = ScopeTree::build(body);
    let mut analyzer = CaptureAnalyzer {
        scopes: vec![tree.root()],
        closures: Vec::new(),
        captured: FxHashMap::default(),
        receivers: FxHashSet::default(),
        root_references_this: false,
        error: None,
        tree,
    };
    analyzer.analyze_root(body);
    if let Some(err) = analyzer.error {
        return Err(err);
    }

    let tree = analyzer.tree;
    let mut closures = FxHashMap::default();
    for (id, scopes) in analyzer.captured {
        let mut captured_scopes: Vec<ScopeId> = scopes.into_iter().collect();
        captured_scopes.sort_by_key(|&scope| (tree.depth(scope), scope));
        closures.insert(
            id,
            ClosureInfo {
                captured_scopes,
                references_this: analyzer.receivers.contains(&id),
            },
        );
    }

    Ok(Analysis {
        tree,
        closures,
        root_references_this: analyzer.root_references_this,
    })
}

struct CaptureAnalyzer {
    tree: ScopeTree,
    scopes: Vec<ScopeId>,
    /// Active closures and the depth of their own scope
    closures: Vec<(NodeId, u32)>,
    captured: FxHashMap<NodeId, FxHashSet<ScopeId>>,
    receivers: FxHashSet<NodeId>,
    root_references_this: bool,
    error: Option<LowerError>,
}

impl CaptureAnalyzer {
    fn analyze_root(&mut self, body: DeclarationBody<'_>) {
        match body {
            DeclarationBody::Function(func) => walk_function_body(self, &func.body),
            DeclarationBody::Constructor(ctor) => {
                for init in &ctor.initializers {
                    self.visit_expression(&init.value);
                }
                if let Some(super_call) = &ctor.super_call {
                    self.visit_arguments(&super_call.arguments);
                }
                walk_function_body(self, &ctor.function.body);
            }
            DeclarationBody::Expression(expr) => self.visit_expression(expr),
            DeclarationBody::Block(block) => walk_block_statement(self, block),
            DeclarationBody::Empty => {}
        }
    }

    fn current(&self) -> ScopeId {
        self.scopes.last().copied().unwrap_or(ScopeId(0))
    }

    fn with_scope_of(&mut self, node: NodeId, f: impl FnOnce(&mut Self)) {
        match self.tree.scope_of(node) {
            Some(scope) => {
                self.scopes.push(scope);
                f(self);
                self.scopes.pop();
            }
            None => self.fail(LowerError::internal(format!(
                "scope of node {} was not recorded",
                node
            ))),
        }
    }

    fn fail(&mut self, err: LowerError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn record_local(&mut self, local: LocalId) {
        let Some(owner) = self.tree.resolve(self.current(), local) else {
            self.fail(LowerError::UnboundLocal {
                local: local.as_u32(),
            });
            return;
        };
        let owner_depth = self.tree.depth(owner);
        let Some(&(_, innermost)) = self.closures.last() else {
            return;
        };
        if owner_depth >= innermost {
            return;
        }
        for &(closure, depth) in &self.closures {
            if depth > owner_depth {
                trace!(%closure, %local, scope = %owner, "captured");
                self.captured.entry(closure).or_default().insert(owner);
            }
        }
        self.tree.mark_captured(local);
    }

    fn record_receiver(&mut self) {
        self.root_references_this = true;
        for &(closure, _) in &self.closures {
            self.receivers.insert(closure);
        }
    }
}

impl Visitor for CaptureAnalyzer {
    fn visit_function(&mut self, func: &Function) {
        self.with_scope_of(func.id, |analyzer| {
            let depth = analyzer.tree.depth(analyzer.current());
            analyzer.closures.push((func.id, depth));
            analyzer.captured.entry(func.id).or_default();
            walk_function_body(analyzer, &func.body);
            analyzer.closures.pop();
        });
    }

    fn visit_parameter(&mut self, _param: &Parameter) {}

    fn visit_block_statement(&mut self, block: &BlockStatement) {
        self.with_scope_of(block.id, |analyzer| walk_block_statement(analyzer, block));
    }

    fn visit_for_statement(&mut self, stmt: &ForStatement) {
        self.with_scope_of(stmt.id, |analyzer| walk_for_statement(analyzer, stmt));
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause) {
        self.with_scope_of(clause.id, |analyzer| walk_catch_clause(analyzer, clause));
    }

    fn visit_reference(&mut self, reference: &Reference) {
        match reference.binding {
            Binding::Local(local) => self.record_local(local),
            Binding::Member(member) if !member.is_static => self.record_receiver(),
            Binding::Member(_) | Binding::Function(_) | Binding::Class(_) => {}
        }
    }

    fn visit_this(&mut self, _span: Span) {
        self.record_receiver();
    }

    fn visit_super_member(&mut self, _expr: &SuperMemberExpression) {
        self.record_receiver();
    }
}
