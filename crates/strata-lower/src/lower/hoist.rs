//! Closure hoisting
//!
//! A function literal or local function becomes a global function whose
//! leading parameters are the alias objects of the scopes it captures. The
//! definition site turns into a reference to that global, bound to the
//! current aliases (and receiver) when it needs any.

use super::function::{FunctionLowerer, Frame};
use super::with_trampoline;
use crate::capture::ClosureInfo;
use crate::error::{LowerError, LowerResult};
use crate::flat::*;
use crate::mangle::{escape, NameKey, Role};
use crate::scope::FunctionKey;
use strata_ast::ast::*;
use tracing::debug;

/// A closure that has already been hoisted
#[derive(Debug, Clone)]
pub(crate) struct HoistedClosure {
    /// Global implementing function
    pub name: String,
    /// What the definition site refers to: the trampoline if there is one
    pub entry: String,
    pub receiver: bool,
}

impl<'p, 'a> FunctionLowerer<'p, 'a> {
    /// Hoist `func` (once) and return the value of its definition site.
    pub(super) fn lower_closure(&mut self, func: &Function) -> LowerResult<FlatExpr> {
        let info = self
            .body
            .analysis
            .closure(func.id)
            .cloned()
            .ok_or_else(|| LowerError::internal(format!("closure {} was not analysed", func.id)))?;

        let hoisted = match self.program.hoisted.get(&func.id) {
            Some(hoisted) => {
                debug!(closure = %hoisted.name, "reusing hoisted closure");
                hoisted.clone()
            }
            None => self.hoist(func, &info)?,
        };
        self.definition_site(&hoisted, &info)
    }

    /// A function literal in expression position. A name it refers to from
    /// its own body lives in the enclosing scope's alias object, so the
    /// value is stored there before the literal's value is used.
    pub(super) fn lower_function_expr(&mut self, func: &Function) -> LowerResult<FlatExpr> {
        let value = self.lower_closure(func)?;
        match func.binding {
            Some(binding) if self.body.analysis.tree.is_captured(binding) => {
                let place = self.local_place(binding)?;
                Ok(FlatExpr::assign(place, value))
            }
            _ => Ok(value),
        }
    }

    fn hoist(&mut self, func: &Function, info: &ClosureInfo) -> LowerResult<HoistedClosure> {
        let seq = self.body.closure_seq;
        self.body.closure_seq += 1;
        let mut candidate = format!("{}${}", self.body.declaration, seq);
        if let Some(name) = func.name {
            candidate.push('_');
            candidate.push_str(&escape(self.text(name.name)));
        }
        candidate.push_str(Role::HoistedClosure.suffix());
        let key = NameKey::Closure {
            declaration: self.body.declaration.clone(),
            node: func.id,
        };
        let name = self.program.mangler.claim(key, candidate);
        let receiver = info.references_this && self.frame.receiver;
        debug!(
            closure = %name,
            captured = info.captured_scopes.len(),
            receiver,
            "hoisting closure"
        );

        let frame = Frame::new(
            name.clone(),
            FunctionKey::Closure(func.id),
            receiver,
            &self.program.options.reserved,
        );
        let saved = std::mem::replace(&mut self.frame, frame);
        let result = self.closure_function(func, info, &name);
        self.frame = saved;
        let (function, alias_params) = result?;

        let target = with_trampoline(&mut self.program.mangler, name.clone(), func);
        let hoisted = HoistedClosure {
            name: name.clone(),
            entry: target.entry().to_string(),
            receiver,
        };
        self.program.hoisted.insert(func.id, hoisted.clone());
        self.hoisted.push(function);
        if target.is_uniform() {
            let trampoline = self.build_trampoline(&target, func, receiver, &alias_params)?;
            self.hoisted.push(trampoline);
        }
        Ok(hoisted)
    }

    /// Body of the hoisted function, lowered in its own frame.
    fn closure_function(
        &mut self,
        func: &Function,
        info: &ClosureInfo,
        name: &str,
    ) -> LowerResult<(FlatFunction, Vec<String>)> {
        let alias_params: Vec<String> = info
            .captured_scopes
            .iter()
            .map(|&scope| self.allocate_alias(scope))
            .collect();
        let (own, captured) = self.bind_params(&func.params);
        let scope = self.scope_of(func.id)?;
        let mut body = Vec::new();
        self.enter_scope(scope, &captured, &mut body)?;
        self.lower_function_body(&func.body, &mut body)?;

        let mut params = alias_params.clone();
        params.extend(own);
        let function = FlatFunction {
            name: name.to_string(),
            receiver: self.frame.receiver,
            params,
            body,
            origin: FunctionOrigin::Closure,
        };
        Ok((function, alias_params))
    }

    fn definition_site(&self, hoisted: &HoistedClosure, info: &ClosureInfo) -> LowerResult<FlatExpr> {
        if info.captured_scopes.is_empty() && !hoisted.receiver {
            return Ok(FlatExpr::Global(hoisted.entry.clone()));
        }
        let scopes = info
            .captured_scopes
            .iter()
            .map(|&scope| self.alias_for(scope))
            .collect::<LowerResult<Vec<_>>>()?;
        Ok(FlatExpr::Bind {
            function: hoisted.entry.clone(),
            receiver: hoisted.receiver,
            scopes,
        })
    }
}
