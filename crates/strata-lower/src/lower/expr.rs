//! Expression flattening
//!
//! Resolved member accesses go through the program index: instance members
//! become receiver field reads and method calls on mangled properties,
//! static members become global references, and `super` accesses call the
//! superclass's implementing function with an explicit receiver. Unresolved
//! member accesses keep the source name and dispatch at runtime.

use super::function::FunctionLowerer;
use super::{CallTarget, MemberEntry};
use crate::error::{LowerError, LowerResult};
use crate::flat::*;
use strata_ast::ast::*;

/// Where an assignment writes to
enum AssignTarget {
    Place(Place),
    Setter(SetterCall),
}

/// A setter invocation still waiting for its value
struct SetterCall {
    binding: MemberBinding,
    dispatch: SetterDispatch,
}

enum SetterDispatch {
    /// Through the object's setter slot
    Method { object: FlatExpr, property: String },
    /// `super.x = v`
    Receiver { function: String },
    Static { function: String },
}

impl SetterCall {
    fn apply(self, value: FlatExpr) -> FlatExpr {
        match self.dispatch {
            SetterDispatch::Method { object, property } => FlatExpr::MethodCall {
                object: Box::new(object),
                property,
                args: vec![value],
            },
            SetterDispatch::Receiver { function } => FlatExpr::CallWithReceiver {
                function,
                receiver: Box::new(FlatExpr::This),
                args: vec![value],
            },
            SetterDispatch::Static { function } => FlatExpr::Call {
                function,
                args: vec![value],
            },
        }
    }
}

impl<'p, 'a> FunctionLowerer<'p, 'a> {
    pub(super) fn lower_expr(&mut self, expr: &Expression) -> LowerResult<FlatExpr> {
        match expr {
            Expression::Literal(lit) => Ok(FlatExpr::Literal(self.lower_literal(&lit.value))),
            Expression::Identifier(reference) => self.lower_reference(reference),
            Expression::This(_) => Ok(FlatExpr::This),
            Expression::Assignment(assign) => self.lower_assignment(assign),
            Expression::Binary(binary) => {
                let left = self.lower_expr(&binary.left)?;
                let right = self.lower_expr(&binary.right)?;
                Ok(FlatExpr::binary(binary.operator.as_str(), left, right))
            }
            Expression::Unary(unary) => Ok(FlatExpr::Unary {
                operator: unary.operator.as_str().to_string(),
                operand: Box::new(self.lower_expr(&unary.operand)?),
            }),
            Expression::Conditional(cond) => Ok(FlatExpr::Conditional {
                condition: Box::new(self.lower_expr(&cond.condition)?),
                consequent: Box::new(self.lower_expr(&cond.consequent)?),
                alternate: Box::new(self.lower_expr(&cond.alternate)?),
            }),
            Expression::Call(call) => self.lower_call(call),
            Expression::Member(member) => self.lower_member(member),
            Expression::SuperMember(member) => self.lower_super_member(member),
            Expression::Index(index) => Ok(FlatExpr::Index {
                object: Box::new(self.lower_expr(&index.object)?),
                index: Box::new(self.lower_expr(&index.index)?),
            }),
            Expression::New(new) => self.lower_new(new),
            Expression::List(list) => {
                let elements = list
                    .elements
                    .iter()
                    .map(|element| self.lower_expr(element))
                    .collect::<LowerResult<Vec<_>>>()?;
                Ok(FlatExpr::List(elements))
            }
            Expression::Function(func) => self.lower_function_expr(func),
        }
    }

    fn lower_literal(&self, literal: &Literal) -> FlatLiteral {
        match literal {
            Literal::Int(value) => FlatLiteral::Int(*value),
            Literal::Float(value) => FlatLiteral::Float(*value),
            Literal::String(symbol) => FlatLiteral::String(self.text(*symbol).to_string()),
            Literal::Bool(value) => FlatLiteral::Bool(*value),
            Literal::Null => FlatLiteral::Null,
        }
    }

    fn lower_reference(&mut self, reference: &Reference) -> LowerResult<FlatExpr> {
        match reference.binding {
            Binding::Local(local) => Ok(self.local_place(local)?.read()),
            Binding::Function(id) => {
                let target = self.program.index.function(id)?;
                Ok(FlatExpr::Global(target.entry().to_string()))
            }
            Binding::Class(id) => Ok(FlatExpr::Global(self.program.index.class(id)?.name.clone())),
            Binding::Member(binding) => {
                let object = (!binding.is_static).then_some(FlatExpr::This);
                self.member_read(object, &binding)
            }
        }
    }

    fn member_entry(&self, binding: &MemberBinding) -> LowerResult<MemberEntry> {
        self.program
            .index
            .member(binding, self.program.interner)
            .cloned()
    }

    fn member_target(&self, binding: &MemberBinding) -> LowerResult<(MemberEntry, CallTarget)> {
        let entry = self.member_entry(binding)?;
        let target = entry.target.clone().ok_or_else(|| {
            LowerError::internal(format!("member {} has no implementing function", entry.property))
        })?;
        Ok((entry, target))
    }

    /// Read a resolved member; `object` is `None` for static members.
    fn member_read(&mut self, object: Option<FlatExpr>, binding: &MemberBinding) -> LowerResult<FlatExpr> {
        match (object, binding.kind) {
            (None, MemberKind::Field) => {
                let entry = self.member_entry(binding)?;
                entry.global.map(FlatExpr::Global).ok_or_else(|| {
                    LowerError::internal(format!("static field {} has no global", entry.property))
                })
            }
            (None, MemberKind::Method) => {
                let (_, target) = self.member_target(binding)?;
                Ok(FlatExpr::Global(target.entry().to_string()))
            }
            (None, MemberKind::Getter) => {
                let (_, target) = self.member_target(binding)?;
                Ok(FlatExpr::Call {
                    function: target.entry().to_string(),
                    args: Vec::new(),
                })
            }
            (Some(object), MemberKind::Field) | (Some(object), MemberKind::Method) => {
                let entry = self.member_entry(binding)?;
                Ok(FlatExpr::GetField {
                    object: Box::new(object),
                    property: entry.property,
                })
            }
            (Some(object), MemberKind::Getter) => {
                let entry = self.member_entry(binding)?;
                Ok(FlatExpr::MethodCall {
                    object: Box::new(object),
                    property: entry.property,
                    args: Vec::new(),
                })
            }
            (_, MemberKind::Setter) => Err(LowerError::internal(format!(
                "setter {} is read as a value",
                self.text(binding.name)
            ))),
        }
    }

    fn lower_member(&mut self, member: &MemberExpression) -> LowerResult<FlatExpr> {
        match &member.target {
            Some(binding) if binding.is_static => self.member_read(None, binding),
            Some(binding) => {
                let object = self.lower_expr(&member.object)?;
                self.member_read(Some(object), binding)
            }
            None => Ok(FlatExpr::GetField {
                object: Box::new(self.lower_expr(&member.object)?),
                property: self.text(member.property.name).to_string(),
            }),
        }
    }

    fn lower_super_member(&mut self, member: &SuperMemberExpression) -> LowerResult<FlatExpr> {
        let binding = &member.target;
        match binding.kind {
            MemberKind::Field => {
                let entry = self.member_entry(binding)?;
                Ok(FlatExpr::GetField {
                    object: Box::new(FlatExpr::This),
                    property: entry.property,
                })
            }
            MemberKind::Getter => {
                let (_, target) = self.member_target(binding)?;
                Ok(FlatExpr::CallWithReceiver {
                    function: target.entry().to_string(),
                    receiver: Box::new(FlatExpr::This),
                    args: Vec::new(),
                })
            }
            MemberKind::Method => {
                let (_, target) = self.member_target(binding)?;
                Ok(FlatExpr::Bind {
                    function: target.entry().to_string(),
                    receiver: true,
                    scopes: Vec::new(),
                })
            }
            MemberKind::Setter => Err(LowerError::internal(format!(
                "setter {} is read as a value",
                self.text(binding.name)
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Assignment
    // ------------------------------------------------------------------

    fn lower_assignment(&mut self, assign: &AssignmentExpression) -> LowerResult<FlatExpr> {
        let target = self.assign_target(&assign.target)?;
        let mut value = self.lower_expr(&assign.value)?;
        if let Some(operator) = assign.operator {
            let current = self.current_value(&target)?;
            value = FlatExpr::binary(operator.as_str(), current, value);
        }
        Ok(match target {
            AssignTarget::Place(place) => FlatExpr::assign(place, value),
            AssignTarget::Setter(setter) => setter.apply(value),
        })
    }

    fn assign_target(&mut self, target: &Expression) -> LowerResult<AssignTarget> {
        match target {
            Expression::Identifier(reference) => match reference.binding {
                Binding::Local(local) => Ok(AssignTarget::Place(self.local_place(local)?)),
                Binding::Member(binding) => {
                    let object = (!binding.is_static).then_some(FlatExpr::This);
                    self.member_write(object, &binding)
                }
                Binding::Function(_) | Binding::Class(_) => Err(LowerError::internal(format!(
                    "cannot assign to {}",
                    self.text(reference.name.name)
                ))),
            },
            Expression::Member(member) => match &member.target {
                Some(binding) if binding.is_static => self.member_write(None, binding),
                Some(binding) => {
                    let object = self.lower_expr(&member.object)?;
                    self.member_write(Some(object), binding)
                }
                None => Ok(AssignTarget::Place(Place::Field {
                    object: self.lower_expr(&member.object)?,
                    property: self.text(member.property.name).to_string(),
                })),
            },
            Expression::SuperMember(member) => {
                let binding = member.target;
                match binding.kind {
                    MemberKind::Field => {
                        let entry = self.member_entry(&binding)?;
                        Ok(AssignTarget::Place(Place::Field {
                            object: FlatExpr::This,
                            property: entry.property,
                        }))
                    }
                    MemberKind::Setter => {
                        let (_, target) = self.member_target(&binding)?;
                        Ok(AssignTarget::Setter(SetterCall {
                            binding,
                            dispatch: SetterDispatch::Receiver {
                                function: target.entry().to_string(),
                            },
                        }))
                    }
                    MemberKind::Getter | MemberKind::Method => Err(LowerError::internal(format!(
                        "cannot assign to super.{}",
                        self.text(binding.name)
                    ))),
                }
            }
            Expression::Index(index) => Ok(AssignTarget::Place(Place::Index {
                object: self.lower_expr(&index.object)?,
                index: self.lower_expr(&index.index)?,
            })),
            _ => Err(LowerError::internal("invalid assignment target".to_string())),
        }
    }

    /// Write target of a resolved member; `object` is `None` for static members.
    fn member_write(&mut self, object: Option<FlatExpr>, binding: &MemberBinding) -> LowerResult<AssignTarget> {
        let entry = self.member_entry(binding)?;
        match (object, binding.kind) {
            (None, MemberKind::Field) => match entry.global {
                Some(global) => Ok(AssignTarget::Place(Place::Global(global))),
                None => Err(LowerError::internal(format!(
                    "static field {} has no global",
                    entry.property
                ))),
            },
            (Some(object), MemberKind::Field) => Ok(AssignTarget::Place(Place::Field {
                object,
                property: entry.property,
            })),
            (None, MemberKind::Setter) => {
                let (_, target) = self.member_target(binding)?;
                Ok(AssignTarget::Setter(SetterCall {
                    binding: *binding,
                    dispatch: SetterDispatch::Static {
                        function: target.entry().to_string(),
                    },
                }))
            }
            (Some(object), MemberKind::Setter) => Ok(AssignTarget::Setter(SetterCall {
                binding: *binding,
                dispatch: SetterDispatch::Method {
                    object,
                    property: entry.property,
                },
            })),
            (_, MemberKind::Getter) | (_, MemberKind::Method) => Err(LowerError::internal(format!(
                "cannot assign to {}",
                self.text(binding.name)
            ))),
        }
    }

    /// Current value of a compound assignment target. The object expression
    /// is evaluated again.
    fn current_value(&mut self, target: &AssignTarget) -> LowerResult<FlatExpr> {
        let setter = match target {
            AssignTarget::Place(place) => return Ok(place.read()),
            AssignTarget::Setter(setter) => setter,
        };
        let getter = MemberBinding {
            kind: MemberKind::Getter,
            ..setter.binding
        };
        let (entry, getter) = self.member_target(&getter)?;
        Ok(match &setter.dispatch {
            SetterDispatch::Method { object, .. } => FlatExpr::MethodCall {
                object: Box::new(object.clone()),
                property: entry.property,
                args: Vec::new(),
            },
            SetterDispatch::Receiver { .. } => FlatExpr::CallWithReceiver {
                function: getter.entry().to_string(),
                receiver: Box::new(FlatExpr::This),
                args: Vec::new(),
            },
            SetterDispatch::Static { .. } => FlatExpr::Call {
                function: getter.entry().to_string(),
                args: Vec::new(),
            },
        })
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    fn lower_call(&mut self, call: &CallExpression) -> LowerResult<FlatExpr> {
        let arguments = &call.arguments;
        match &*call.callee {
            Expression::Identifier(reference) => match reference.binding {
                Binding::Function(id) => {
                    let target = self.program.index.function(id)?.clone();
                    self.direct_call(&target, arguments)
                }
                Binding::Member(binding) if binding.kind == MemberKind::Method => {
                    if binding.is_static {
                        let (_, target) = self.member_target(&binding)?;
                        self.direct_call(&target, arguments)
                    } else {
                        self.method_call(FlatExpr::This, &binding, arguments)
                    }
                }
                _ => self.dynamic_call(&call.callee, arguments),
            },
            Expression::Member(member) => match &member.target {
                Some(binding) if binding.kind == MemberKind::Method => {
                    if binding.is_static {
                        let (_, target) = self.member_target(binding)?;
                        self.direct_call(&target, arguments)
                    } else {
                        let object = self.lower_expr(&member.object)?;
                        self.method_call(object, binding, arguments)
                    }
                }
                _ => self.dynamic_call(&call.callee, arguments),
            },
            Expression::SuperMember(member) if member.target.kind == MemberKind::Method => {
                let (_, target) = self.member_target(&member.target)?;
                let args = self.call_args(&target, arguments)?;
                Ok(FlatExpr::CallWithReceiver {
                    function: target.entry().to_string(),
                    receiver: Box::new(FlatExpr::This),
                    args,
                })
            }
            _ => self.dynamic_call(&call.callee, arguments),
        }
    }

    fn direct_call(&mut self, target: &CallTarget, arguments: &Arguments) -> LowerResult<FlatExpr> {
        let args = self.call_args(target, arguments)?;
        Ok(FlatExpr::Call {
            function: target.entry().to_string(),
            args,
        })
    }

    /// Call through the receiver's method slot, in the convention of the
    /// resolved declaration.
    fn method_call(&mut self, object: FlatExpr, binding: &MemberBinding, arguments: &Arguments) -> LowerResult<FlatExpr> {
        let (entry, target) = self.member_target(binding)?;
        let args = self.call_args(&target, arguments)?;
        Ok(FlatExpr::MethodCall {
            object: Box::new(object),
            property: entry.property,
            args,
        })
    }

    fn dynamic_call(&mut self, callee: &Expression, arguments: &Arguments) -> LowerResult<FlatExpr> {
        let callee = self.lower_expr(callee)?;
        let positional = self.lower_exprs(&arguments.positional)?;
        let named = self.lower_named(&arguments.named)?;
        Ok(FlatExpr::DynamicCall {
            callee: Box::new(callee),
            positional,
            named,
        })
    }

    /// Arguments in the target's convention. Uniform calls evaluate the
    /// named arguments first.
    pub(super) fn call_args(&mut self, target: &CallTarget, arguments: &Arguments) -> LowerResult<Vec<FlatExpr>> {
        if !target.is_uniform() {
            if !arguments.named.is_empty() {
                return Err(LowerError::internal(format!(
                    "{} takes no named arguments",
                    target.name
                )));
            }
            return self.lower_exprs(&arguments.positional);
        }
        let named = self.lower_named(&arguments.named)?;
        let positional = self.lower_exprs(&arguments.positional)?;
        let named_count = named.len() as i64;
        let mut args = Vec::with_capacity(positional.len() + 3);
        args.push(FlatExpr::int(positional.len() as i64));
        args.push(FlatExpr::NamedBag(named));
        args.push(FlatExpr::int(named_count));
        args.extend(positional);
        Ok(args)
    }

    fn lower_exprs(&mut self, exprs: &[Expression]) -> LowerResult<Vec<FlatExpr>> {
        exprs.iter().map(|expr| self.lower_expr(expr)).collect()
    }

    fn lower_named(&mut self, named: &[NamedArgument]) -> LowerResult<Vec<(String, FlatExpr)>> {
        named
            .iter()
            .map(|arg| {
                let value = self.lower_expr(&arg.value)?;
                Ok((self.text(arg.name.name).to_string(), value))
            })
            .collect()
    }

    fn lower_new(&mut self, new: &NewExpression) -> LowerResult<FlatExpr> {
        let name = new.constructor.map(|ident| ident.name);
        let entry = self
            .program
            .index
            .constructor(new.class, name, self.program.interner)?
            .clone();
        let args = self.call_args(&entry.target, &new.arguments)?;
        if entry.factory {
            return Ok(FlatExpr::Call {
                function: entry.target.entry().to_string(),
                args,
            });
        }
        Ok(FlatExpr::New {
            class: self.program.index.class(new.class)?.name.clone(),
            constructor: entry.target.entry().to_string(),
            args,
        })
    }
}
