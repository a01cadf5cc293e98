//! Per-declaration lowering state
//!
//! A `FunctionLowerer` owns the analysis of the body being lowered and the
//! `Frame` of the flat function currently being built. Hoisting a closure
//! swaps in a fresh frame; lowering a field initializer or a default value
//! swaps in that expression's own analysis.

use super::{ProgramBuilder, CallTarget};
use crate::capture::{analyze, Analysis};
use crate::error::{LowerError, LowerResult};
use crate::flat::*;
use crate::mangle::{LocalNamer, NameKey};
use crate::scope::{DeclarationBody, FunctionKey, ScopeId};
use rustc_hash::{FxHashMap, FxHashSet};
use strata_ast::ast::*;
use strata_ast::Symbol;
use tracing::trace;

/// The flat function being built
pub(crate) struct Frame {
    /// Global name, used in diagnostics
    pub name: String,
    pub key: FunctionKey,
    pub receiver: bool,
    pub namer: LocalNamer,
    pub locals: FxHashMap<LocalId, String>,
    label_namer: LocalNamer,
    labels: FxHashMap<Symbol, Vec<String>>,
}

impl Frame {
    pub fn root(name: String, receiver: bool, reserved: &[String]) -> Self {
        Self::new(name, FunctionKey::Root, receiver, reserved)
    }

    pub fn new(name: String, key: FunctionKey, receiver: bool, reserved: &[String]) -> Self {
        Self {
            name,
            key,
            receiver,
            namer: LocalNamer::new(reserved),
            locals: FxHashMap::default(),
            label_namer: LocalNamer::new(&[]),
            labels: FxHashMap::default(),
        }
    }
}

/// Record layout of one captured scope
#[derive(Debug, Clone)]
pub(super) struct ScopeRecord {
    pub name: String,
    pub fields: Vec<(LocalId, String)>,
}

impl ScopeRecord {
    pub fn field(&self, local: LocalId) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| *l == local)
            .map(|(_, field)| field.as_str())
    }
}

/// Analysis of the body being lowered
pub(super) struct BodyState {
    pub analysis: Analysis,
    records: FxHashMap<ScopeId, ScopeRecord>,
    /// Global name hoisted closures are named after
    pub declaration: String,
    pub closure_seq: u32,
}

impl BodyState {
    fn new(body: DeclarationBody<'_>, declaration: &str) -> LowerResult<Self> {
        Ok(Self {
            analysis: analyze(body)?,
            records: FxHashMap::default(),
            declaration: declaration.to_string(),
            closure_seq: 0,
        })
    }
}

pub(crate) struct FunctionLowerer<'p, 'a> {
    pub(super) program: &'p mut ProgramBuilder<'a>,
    pub(super) body: BodyState,
    pub(super) frame: Frame,
    /// Closures and trampolines hoisted so far
    pub(super) hoisted: Vec<FlatFunction>,
}

impl<'p, 'a> FunctionLowerer<'p, 'a> {
    pub fn new(
        program: &'p mut ProgramBuilder<'a>,
        body: DeclarationBody<'_>,
        declaration: &str,
        frame: Frame,
    ) -> LowerResult<Self> {
        let body = BodyState::new(body, declaration)?;
        trace!(
            declaration,
            scopes = body.analysis.tree.len(),
            closures = body.analysis.closure_count(),
            "analysed declaration"
        );
        Ok(Self {
            program,
            body,
            frame,
            hoisted: Vec::new(),
        })
    }

    /// Hand back the hoisted functions.
    pub fn finish(self) -> Vec<FlatFunction> {
        self.hoisted
    }

    pub(super) fn text(&self, symbol: Symbol) -> &'a str {
        let interner: &'a strata_ast::Interner = self.program.interner;
        interner.resolve(symbol)
    }

    /// Lower `f` against the analysis of another body, such as a field
    /// initializer, keeping the current frame.
    pub(super) fn with_body<T>(
        &mut self,
        body: DeclarationBody<'_>,
        declaration: &str,
        f: impl FnOnce(&mut Self) -> LowerResult<T>,
    ) -> LowerResult<T> {
        let state = BodyState::new(body, declaration)?;
        let saved = std::mem::replace(&mut self.body, state);
        let result = f(self);
        self.body = saved;
        result
    }

    // ------------------------------------------------------------------
    // Locals and labels
    // ------------------------------------------------------------------

    /// Flat name for a source identifier, clear of locals and global names.
    pub(super) fn claim_source(&mut self, name: Symbol) -> String {
        let text = self.text(name);
        self.frame.namer.claim_source(text, self.program.mangler.names())
    }

    /// Give a non-captured local its function-unique name.
    pub(super) fn declare_local(&mut self, local: LocalId, name: Symbol) -> String {
        let flat = self.claim_source(name);
        self.frame.locals.insert(local, flat.clone());
        flat
    }

    /// Where a local lives: a flat local, or a field of its scope's alias object.
    pub(super) fn local_place(&mut self, local: LocalId) -> LowerResult<Place> {
        if self.body.analysis.tree.is_captured(local) {
            let owner = self
                .body
                .analysis
                .tree
                .owner_of(local)
                .ok_or(LowerError::UnboundLocal {
                    local: local.as_u32(),
                })?;
            let alias = self.alias_for(owner)?;
            let record = self.record(owner)?;
            let field = record.field(local).ok_or_else(|| {
                LowerError::internal(format!("local {} missing from record {}", local, record.name))
            })?;
            return Ok(Place::Alias {
                alias,
                field: field.to_string(),
            });
        }
        self.frame
            .locals
            .get(&local)
            .map(|name| Place::Local(name.clone()))
            .ok_or(LowerError::UnboundLocal {
                local: local.as_u32(),
            })
    }

    /// Bind parameters; captured ones are returned as alias initial values.
    pub(super) fn bind_params(&mut self, params: &[Parameter]) -> (Vec<String>, Vec<(LocalId, FlatExpr)>) {
        let mut names = Vec::with_capacity(params.len());
        let mut captured = Vec::new();
        for param in params {
            if self.body.analysis.tree.is_captured(param.local) {
                let name = self.claim_source(param.name.name);
                captured.push((param.local, FlatExpr::Local(name.clone())));
                names.push(name);
            } else {
                names.push(self.declare_local(param.local, param.name.name));
            }
        }
        (names, captured)
    }

    pub(super) fn push_label(&mut self, label: Symbol) -> String {
        let text = self.text(label);
        let name = self.frame.label_namer.claim(text);
        self.frame.labels.entry(label).or_default().push(name.clone());
        name
    }

    pub(super) fn pop_label(&mut self, label: Symbol) {
        if let Some(stack) = self.frame.labels.get_mut(&label) {
            stack.pop();
        }
    }

    pub(super) fn resolve_label(&self, label: Symbol) -> LowerResult<String> {
        self.frame
            .labels
            .get(&label)
            .and_then(|stack| stack.last())
            .cloned()
            .ok_or_else(|| {
                LowerError::internal(format!("label {} is not in scope", self.text(label)))
            })
    }

    // ------------------------------------------------------------------
    // Scope alias objects
    // ------------------------------------------------------------------

    /// Record type of a captured scope, created on first use.
    pub(super) fn record(&mut self, scope: ScopeId) -> LowerResult<ScopeRecord> {
        if let Some(record) = self.body.records.get(&scope) {
            return Ok(record.clone());
        }

        let tree = &self.body.analysis.tree;
        let mut seen = FxHashSet::default();
        let mut fields = Vec::new();
        for local in tree.get(scope).captured_symbols() {
            let base = match tree.local_name(local) {
                Some(name) => self.text(name).to_string(),
                None => format!("v{}", local.as_u32()),
            };
            let field = if seen.contains(&base) {
                format!("{}${}", base, local.as_u32())
            } else {
                base
            };
            seen.insert(field.clone());
            fields.push((local, field));
        }

        let key = NameKey::AliasRecord {
            declaration: self.body.declaration.clone(),
            scope: scope.as_u32(),
        };
        let candidate = format!("{}$A{}", self.body.declaration, scope.as_u32());
        let name = self.program.mangler.claim(key, candidate);
        if !self.program.alias_records.iter().any(|r| r.name == name) {
            self.program.alias_records.push(AliasRecord {
                name: name.clone(),
                fields: fields.iter().map(|(_, f)| f.clone()).collect(),
            });
        }

        let record = ScopeRecord { name, fields };
        self.body.records.insert(scope, record.clone());
        Ok(record)
    }

    /// Alias object name of `scope` in the current frame.
    pub(super) fn alias_for(&self, scope: ScopeId) -> LowerResult<String> {
        self.body
            .analysis
            .tree
            .alias_name(scope, self.frame.key)
            .map(str::to_string)
            .ok_or_else(|| LowerError::UnresolvedScopeAlias {
                scope: scope.as_u32(),
                function: self.frame.name.clone(),
            })
    }

    /// Allocate (or look up) the alias name of `scope` in the current frame.
    pub(super) fn allocate_alias(&mut self, scope: ScopeId) -> String {
        let namer = &mut self.frame.namer;
        self.body
            .analysis
            .tree
            .alias_name_or_insert_with(scope, self.frame.key, || {
                namer.claim(&format!("$s{}", scope.as_u32()))
            })
    }

    /// Create the alias object of `scope` if any of its symbols is captured.
    ///
    /// `initial` supplies values for parameters; every other field starts absent.
    pub(super) fn enter_scope(
        &mut self,
        scope: ScopeId,
        initial: &[(LocalId, FlatExpr)],
        out: &mut Vec<FlatStmt>,
    ) -> LowerResult<Option<String>> {
        if !self.body.analysis.tree.get(scope).has_captures() {
            return Ok(None);
        }
        let record = self.record(scope)?;
        let alias = self.allocate_alias(scope);
        let fields = record
            .fields
            .iter()
            .map(|(local, field)| {
                let value = initial
                    .iter()
                    .find(|(l, _)| l == local)
                    .map(|(_, value)| value.clone())
                    .unwrap_or(FlatExpr::Absent);
                (field.clone(), value)
            })
            .collect();
        trace!(alias = %alias, record = %record.name, "scope alias");
        out.push(FlatStmt::InitAlias {
            alias: alias.clone(),
            record: record.name,
            fields,
        });
        Ok(Some(alias))
    }

    pub(super) fn exit_scope(&self, alias: Option<String>, out: &mut Vec<FlatStmt>) {
        if let Some(alias) = alias {
            if self.program.options.clear_scope_aliases {
                out.push(FlatStmt::ClearAlias(alias));
            }
        }
    }

    /// Lower a statement list that lives in `scope`.
    pub(super) fn lower_scoped(
        &mut self,
        scope: ScopeId,
        initial: &[(LocalId, FlatExpr)],
        stmts: &[Statement],
        clear: bool,
    ) -> LowerResult<Vec<FlatStmt>> {
        let mut out = Vec::new();
        let alias = self.enter_scope(scope, initial, &mut out)?;
        for stmt in stmts {
            self.lower_stmt(stmt, &mut out)?;
        }
        if clear {
            self.exit_scope(alias, &mut out);
        }
        Ok(out)
    }

    pub(super) fn scope_of(&self, node: NodeId) -> LowerResult<ScopeId> {
        self.body
            .analysis
            .tree
            .scope_of(node)
            .ok_or_else(|| LowerError::internal(format!("no scope recorded for node {}", node)))
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    pub(super) fn lower_function_body(&mut self, body: &FunctionBody, out: &mut Vec<FlatStmt>) -> LowerResult<()> {
        match body {
            FunctionBody::Block(block) => {
                for stmt in &block.statements {
                    self.lower_stmt(stmt, out)?;
                }
            }
            FunctionBody::Expression(expr) => {
                let value = self.lower_expr(expr)?;
                out.push(FlatStmt::Return(Some(value)));
            }
        }
        Ok(())
    }

    /// Lower the root function of a method, top-level function or factory.
    pub fn lower_function(&mut self, func: &Function, origin: FunctionOrigin) -> LowerResult<FlatFunction> {
        let (params, captured) = self.bind_params(&func.params);
        let root = self.body.analysis.tree.root();
        let mut body = Vec::new();
        self.enter_scope(root, &captured, &mut body)?;
        self.lower_function_body(&func.body, &mut body)?;
        Ok(FlatFunction {
            name: self.frame.name.clone(),
            receiver: self.frame.receiver,
            params,
            body,
            origin,
        })
    }

    /// Lower a generative constructor, or the default constructor when `ctor` is `None`.
    ///
    /// The body runs the class's field initializers, then the initializer
    /// list, then the superclass constructor on the same receiver, then the
    /// constructor body. Super arguments are evaluated once.
    pub fn lower_constructor(&mut self, class: &ClassDecl, ctor: Option<&ConstructorDecl>) -> LowerResult<FlatFunction> {
        let params = ctor.map(|c| c.function.params.as_slice()).unwrap_or(&[]);
        let (params, captured) = self.bind_params(params);
        let root = self.body.analysis.tree.root();
        let mut body = Vec::new();
        self.enter_scope(root, &captured, &mut body)?;

        self.initialize_fields(class, &mut body)?;

        if let Some(ctor) = ctor {
            for init in &ctor.initializers {
                let property = self.field_property(class.id, init.field.name)?;
                let value = self.lower_expr(&init.value)?;
                body.push(FlatStmt::Expr(FlatExpr::assign(
                    Place::Field {
                        object: FlatExpr::This,
                        property,
                    },
                    value,
                )));
            }
        }

        let super_call = ctor.and_then(|c| c.super_call.as_ref());
        match (class.superclass, super_call) {
            (Some(superclass), call) => {
                let name = call.and_then(|c| c.constructor.map(|n| n.name));
                let empty = Arguments::default();
                let arguments = call.map(|c| &c.arguments).unwrap_or(&empty);
                let target = self.super_constructor(superclass, name)?;
                let args = self.call_args(&target, arguments)?;
                body.push(FlatStmt::Expr(FlatExpr::CallWithReceiver {
                    function: target.entry().to_string(),
                    receiver: Box::new(FlatExpr::This),
                    args,
                }));
            }
            (None, Some(_)) => {
                return Err(LowerError::internal(format!(
                    "{} calls a super constructor but has no superclass",
                    self.frame.name
                )));
            }
            (None, None) => {}
        }

        if let Some(ctor) = ctor {
            self.lower_function_body(&ctor.function.body, &mut body)?;
        }

        Ok(FlatFunction {
            name: self.frame.name.clone(),
            receiver: true,
            params,
            body,
            origin: FunctionOrigin::Constructor,
        })
    }

    fn super_constructor(&self, superclass: ClassId, name: Option<Symbol>) -> LowerResult<CallTarget> {
        let entry = self
            .program
            .index
            .constructor(superclass, name, self.program.interner)?;
        if entry.factory {
            return Err(LowerError::internal(format!(
                "{} calls factory {} as a super constructor",
                self.frame.name, entry.target.name
            )));
        }
        Ok(entry.target.clone())
    }

    pub(super) fn field_property(&self, class: ClassId, field: Symbol) -> LowerResult<String> {
        let entry = self.program.index.class(class)?;
        entry
            .member(field, MemberKind::Field)
            .map(|m| m.property.clone())
            .ok_or_else(|| LowerError::UnknownMember {
                class: class.as_u32(),
                member: self.text(field).to_string(),
            })
    }

    /// Instance field initializers, in declaration order. Each is analysed
    /// on its own, so the closures inside are hoisted once and shared by
    /// every constructor.
    fn initialize_fields(&mut self, class: &ClassDecl, out: &mut Vec<FlatStmt>) -> LowerResult<()> {
        let class_name = self.program.index.class(class.id)?.name.clone();
        for field in class.fields().filter(|f| !f.is_static) {
            let property = self.field_property(class.id, field.name.name)?;
            let value = match &field.initializer {
                Some(init) => {
                    let declaration = format!("{}{}", class_name, property);
                    self.with_body(DeclarationBody::Expression(init), &declaration, |lowerer| {
                        lowerer.lower_expr(init)
                    })?
                }
                None => FlatExpr::Literal(FlatLiteral::Null),
            };
            out.push(FlatStmt::Expr(FlatExpr::assign(
                Place::Field {
                    object: FlatExpr::This,
                    property,
                },
                value,
            )));
        }
        Ok(())
    }

    /// Static field initializers followed by the static block.
    pub fn lower_static_init(&mut self, class: &ClassDecl) -> LowerResult<Vec<FlatStmt>> {
        let mut out = Vec::new();
        for field in class.fields().filter(|f| f.is_static) {
            let Some(init) = &field.initializer else {
                continue;
            };
            let entry = self.program.index.class(class.id)?;
            let global = entry
                .member(field.name.name, MemberKind::Field)
                .and_then(|m| m.global.clone())
                .ok_or_else(|| LowerError::UnknownMember {
                    class: class.id.as_u32(),
                    member: self.text(field.name.name).to_string(),
                })?;
            let value = self.with_body(DeclarationBody::Expression(init), &global, |lowerer| {
                lowerer.lower_expr(init)
            })?;
            out.push(FlatStmt::Expr(FlatExpr::assign(Place::Global(global), value)));
        }

        if let Some(block) = &class.static_init {
            let declaration = self.frame.name.clone();
            let stmts = self.with_body(DeclarationBody::Block(block), &declaration, |lowerer| {
                let root = lowerer.body.analysis.tree.root();
                lowerer.lower_scoped(root, &[], &block.statements, false)
            })?;
            out.extend(stmts);
        }
        Ok(out)
    }
}
