//! Scope tree construction
//!
//! One `ScopeTree` is built per declaration body. Scopes live in an arena and
//! are addressed by `ScopeId`, so sibling closures' scopes stay alive together
//! and later passes can refer to them by identity.

use rustc_hash::FxHashMap;
use std::fmt;
use strata_ast::ast::{self, *};
use strata_ast::Symbol;

/// Index of a scope in its `ScopeTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The declaration body itself
    Root,
    /// Body of a nested function
    Function,
    Block,
    /// `for` statement header
    ForHeader,
    Catch,
}

/// The flat function a piece of code ends up in after hoisting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FunctionKey {
    /// The declaration's own function
    Root,
    /// A hoisted closure
    Closure(NodeId),
}

/// Per-(symbol, scope) facts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolInfo {
    pub owner: ScopeId,
    /// Referenced from a closure nested more deeply than `owner`
    pub captured: bool,
}

/// One lexical scope
#[derive(Debug, Clone)]
pub struct ScopeNode {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    pub depth: u32,
    pub kind: ScopeKind,
    pub symbols: FxHashMap<LocalId, SymbolInfo>,
    /// Alias-object names already allocated for this scope, per flat function
    alias_names: FxHashMap<FunctionKey, String>,
}

impl ScopeNode {
    fn new(id: ScopeId, parent: Option<ScopeId>, depth: u32, kind: ScopeKind) -> Self {
        Self {
            id,
            parent,
            depth,
            kind,
            symbols: FxHashMap::default(),
            alias_names: FxHashMap::default(),
        }
    }

    /// Closure-referenced symbols, in a stable order.
    pub fn captured_symbols(&self) -> Vec<LocalId> {
        let mut captured: Vec<LocalId> = self
            .symbols
            .iter()
            .filter(|(_, info)| info.captured)
            .map(|(&local, _)| local)
            .collect();
        captured.sort();
        captured
    }

    pub fn has_captures(&self) -> bool {
        self.symbols.values().any(|info| info.captured)
    }
}

/// A declaration body handed to the scope passes
#[derive(Debug, Clone, Copy)]
pub enum DeclarationBody<'a> {
    /// Method, getter, setter, operator or top-level function
    Function(&'a Function),
    /// Constructor: parameters, initializer list, super call and body
    Constructor(&'a ConstructorDecl),
    /// Field initializer or parameter default value
    Expression(&'a Expression),
    /// Static initializer block
    Block(&'a BlockStatement),
    /// No source code, such as a synthesized default constructor
    Empty,
}

/// Scopes of one declaration body
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<ScopeNode>,
    /// Scope-introducing node → scope
    node_scopes: FxHashMap<NodeId, ScopeId>,
    /// Local binding → owning scope
    local_owners: FxHashMap<LocalId, ScopeId>,
    local_names: FxHashMap<LocalId, Symbol>,
}

impl ScopeTree {
    fn new() -> Self {
        Self {
            scopes: vec![ScopeNode::new(ScopeId(0), None, 0, ScopeKind::Root)],
            node_scopes: FxHashMap::default(),
            local_owners: FxHashMap::default(),
            local_names: FxHashMap::default(),
        }
    }

    /// Build the scope tree of one declaration body.
    pub fn build(body: DeclarationBody<'_>) -> Self {
        let mut builder = ScopeTreeBuilder {
            tree: ScopeTree::new(),
            stack: vec![ScopeId(0)],
        };
        builder.build_root(body);
        builder.tree
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn get(&self, id: ScopeId) -> &ScopeNode {
        &self.scopes[id.0 as usize]
    }

    fn get_mut(&mut self, id: ScopeId) -> &mut ScopeNode {
        &mut self.scopes[id.0 as usize]
    }

    pub fn scopes(&self) -> impl Iterator<Item = &ScopeNode> {
        self.scopes.iter()
    }

    pub fn depth(&self, id: ScopeId) -> u32 {
        self.get(id).depth
    }

    /// Scope introduced by a function, block, for statement or catch clause.
    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.node_scopes.get(&node).copied()
    }

    /// Scope declaring a local.
    pub fn owner_of(&self, local: LocalId) -> Option<ScopeId> {
        self.local_owners.get(&local).copied()
    }

    /// Source name of a local.
    pub fn local_name(&self, local: LocalId) -> Option<Symbol> {
        self.local_names.get(&local).copied()
    }

    pub fn symbol(&self, local: LocalId) -> Option<&SymbolInfo> {
        let owner = self.owner_of(local)?;
        self.get(owner).symbols.get(&local)
    }

    pub fn is_captured(&self, local: LocalId) -> bool {
        self.symbol(local).is_some_and(|info| info.captured)
    }

    pub(crate) fn mark_captured(&mut self, local: LocalId) {
        if let Some(owner) = self.owner_of(local) {
            if let Some(info) = self.get_mut(owner).symbols.get_mut(&local) {
                info.captured = true;
            }
        }
    }

    /// Walk outward from `from` until the scope declaring `local` is found.
    pub fn resolve(&self, from: ScopeId, local: LocalId) -> Option<ScopeId> {
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = self.get(id);
            if scope.symbols.contains_key(&local) {
                return Some(id);
            }
            current = scope.parent;
        }
        None
    }

    /// Alias-object name of `scope` inside the flat function `function`.
    pub fn alias_name(&self, scope: ScopeId, function: FunctionKey) -> Option<&str> {
        self.get(scope).alias_names.get(&function).map(String::as_str)
    }

    /// Return the alias name of `scope` in `function`, allocating it with
    /// `make` on first use.
    pub fn alias_name_or_insert_with(
        &mut self,
        scope: ScopeId,
        function: FunctionKey,
        make: impl FnOnce() -> String,
    ) -> String {
        self.get_mut(scope)
            .alias_names
            .entry(function)
            .or_insert_with(make)
            .clone()
    }

    fn push_scope(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        let depth = self.get(parent).depth + 1;
        self.scopes.push(ScopeNode::new(id, Some(parent), depth, kind));
        id
    }

    fn declare(&mut self, scope: ScopeId, local: LocalId, name: Option<Symbol>) {
        if let Some(name) = name {
            self.local_names.insert(local, name);
        }
        self.get_mut(scope).symbols.insert(
            local,
            SymbolInfo {
                owner: scope,
                captured: false,
            },
        );
        self.local_owners.insert(local, scope);
    }
}

/// Pre-order traversal that opens a scope for every function body, block,
/// for header and catch clause.
struct ScopeTreeBuilder {
    tree: ScopeTree,
    stack: Vec<ScopeId>,
}

impl ScopeTreeBuilder {
    fn current(&self) -> ScopeId {
        self.stack.last().copied().unwrap_or(ScopeId(0))
    }

    fn build_root(&mut self, body: DeclarationBody<'_>) {
        let root = self.tree.root();
        match body {
            DeclarationBody::Function(func) => {
                self.tree.node_scopes.insert(func.id, root);
                self.declare_params(root, func);
                self.walk_body(root, &func.body);
            }
            DeclarationBody::Constructor(ctor) => {
                let func = &ctor.function;
                self.tree.node_scopes.insert(func.id, root);
                self.declare_params(root, func);
                for init in &ctor.initializers {
                    self.visit_expression(&init.value);
                }
                if let Some(super_call) = &ctor.super_call {
                    self.visit_arguments(&super_call.arguments);
                }
                self.walk_body(root, &func.body);
            }
            DeclarationBody::Expression(expr) => self.visit_expression(expr),
            DeclarationBody::Block(block) => {
                self.tree.node_scopes.insert(block.id, root);
                walk_block_statement(self, block);
            }
            DeclarationBody::Empty => {}
        }
    }

    fn declare_params(&mut self, scope: ScopeId, func: &Function) {
        for param in &func.params {
            self.tree.declare(scope, param.local, Some(param.name.name));
        }
    }

    /// A block body shares the function's scope.
    fn walk_body(&mut self, scope: ScopeId, body: &FunctionBody) {
        if let FunctionBody::Block(block) = body {
            self.tree.node_scopes.insert(block.id, scope);
        }
        walk_function_body(self, body);
    }

    fn enter(&mut self, node: NodeId, kind: ScopeKind) -> ScopeId {
        let scope = self.tree.push_scope(self.current(), kind);
        self.tree.node_scopes.insert(node, scope);
        self.stack.push(scope);
        scope
    }

    fn exit(&mut self) {
        self.stack.pop();
    }
}

impl Visitor for ScopeTreeBuilder {
    fn visit_function(&mut self, func: &Function) {
        // The name is a value bound in the enclosing scope
        if let Some(binding) = func.binding {
            let name = func.name.map(|ident| ident.name);
            self.tree.declare(self.current(), binding, name);
        }
        let scope = self.enter(func.id, ScopeKind::Function);
        self.declare_params(scope, func);
        self.walk_body(scope, &func.body);
        self.exit();
    }

    // Default values are lowered in the trampoline, not the body
    fn visit_parameter(&mut self, _param: &Parameter) {}

    fn visit_variable_decl(&mut self, decl: &VariableDecl) {
        self.tree.declare(self.current(), decl.local, Some(decl.name.name));
        walk_variable_decl(self, decl);
    }

    fn visit_block_statement(&mut self, block: &BlockStatement) {
        self.enter(block.id, ScopeKind::Block);
        walk_block_statement(self, block);
        self.exit();
    }

    fn visit_for_statement(&mut self, stmt: &ast::ForStatement) {
        self.enter(stmt.id, ScopeKind::ForHeader);
        walk_for_statement(self, stmt);
        self.exit();
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause) {
        let scope = self.enter(clause.id, ScopeKind::Catch);
        self.tree.node_scopes.insert(clause.body.id, scope);
        if let Some(param) = &clause.param {
            self.tree.declare(scope, param.local, Some(param.name.name));
        }
        walk_catch_clause(self, clause);
        self.exit();
    }
}
