//! Shared helpers for lowering integration tests
//!
//! `Machine` is a small evaluator for the flat model. It exists only to run
//! lowered programs so tests can compare their observable behaviour with
//! the nested source program.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use strata_ast::ast::*;
use strata_ast::{AstBuilder, Interner};
use strata_lower::flat::*;
use strata_lower::{lower_program, LowerOptions};

/// Lower a program with default options, panicking on failure.
pub fn lower(program: &Program, interner: &Interner) -> FlatProgram {
    lower_program(program, interner, &LowerOptions::default()).expect("lowering failed")
}

/// A one-unit program.
pub fn single_unit(items: Vec<Item>) -> Program {
    Program::new(vec![CompilationUnit::new("lib/main.st", items)])
}

/// `function name(params) { body }` as a top-level item.
pub fn top_level(
    b: &AstBuilder,
    id: FunctionId,
    name: &str,
    params: Vec<Parameter>,
    body: Vec<Statement>,
) -> Item {
    b.function_decl(id, name, b.function(params, body))
}

// ============================================================================
// Evaluator
// ============================================================================

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
    Absent,
    List(Rc<RefCell<Vec<Value>>>),
    Object(Rc<Instance>),
    Alias(Rc<RefCell<HashMap<String, Value>>>),
    Closure {
        function: String,
        receiver: Option<Box<Value>>,
        scopes: Vec<Value>,
    },
    Class(String),
    Bag(Rc<Vec<(String, Value)>>),
    NoSuchMethod(String),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) | (Value::Absent, Value::Absent) => true,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Alias(a), Value::Alias(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => a == b,
            (Value::NoSuchMethod(a), Value::NoSuchMethod(b)) => a == b,
            (Value::List(a), Value::List(b)) => *a.borrow() == *b.borrow(),
            _ => false,
        }
    }
}

#[derive(Debug)]
pub struct Instance {
    pub class: String,
    pub fields: RefCell<HashMap<String, Value>>,
}

enum Flow {
    Normal,
    Return(Value),
    Break(Option<String>),
    Continue(Option<String>),
}

type Eval<T> = Result<T, Failure>;

/// Thrown value or evaluator error
#[derive(Debug)]
pub enum Failure {
    Thrown(Value),
    Error(String),
}

fn error<T>(message: impl Into<String>) -> Eval<T> {
    Err(Failure::Error(message.into()))
}

struct Frame {
    locals: HashMap<String, Value>,
    this: Option<Value>,
}

pub struct Machine<'p> {
    functions: HashMap<&'p str, &'p FlatFunction>,
    classes: HashMap<&'p str, &'p FlatClass>,
    program: &'p FlatProgram,
    globals: HashMap<String, Value>,
}

impl<'p> Machine<'p> {
    pub fn new(program: &'p FlatProgram) -> Self {
        let mut functions = HashMap::new();
        let mut classes = HashMap::new();
        let mut globals = HashMap::new();
        for decl in &program.declarations {
            match decl {
                FlatDecl::Function(func) => {
                    functions.insert(func.name.as_str(), func);
                }
                FlatDecl::Class(class) => {
                    classes.insert(class.name.as_str(), class);
                    for field in &class.static_fields {
                        globals.insert(field.clone(), Value::Null);
                    }
                }
                FlatDecl::Barrier { .. } | FlatDecl::StaticInit(_) => {}
            }
        }
        Self {
            functions,
            classes,
            program,
            globals,
        }
    }

    /// Run every static initializer in emission order.
    pub fn initialize(&mut self) -> Eval<()> {
        let program = self.program;
        for decl in &program.declarations {
            if let FlatDecl::StaticInit(init) = decl {
                let mut frame = Frame {
                    locals: HashMap::new(),
                    this: None,
                };
                match self.exec_block(&init.body, &mut frame)? {
                    Flow::Normal | Flow::Return(_) => {}
                    _ => return error("break out of a static initializer"),
                }
            }
        }
        Ok(())
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// Call a global function with plain arguments.
    pub fn call(&mut self, function: &str, args: Vec<Value>) -> Eval<Value> {
        self.invoke(function, None, args)
    }

    /// Call a value the way a dynamic call site would.
    pub fn call_value(&mut self, callee: Value, positional: Vec<Value>) -> Eval<Value> {
        self.dynamic_call(callee, positional, Vec::new())
    }

    fn invoke(&mut self, function: &str, this: Option<Value>, args: Vec<Value>) -> Eval<Value> {
        let func = match self.functions.get(function) {
            Some(func) => *func,
            None => return error(format!("no function {}", function)),
        };
        let mut locals = HashMap::new();
        let mut args = args.into_iter();
        for param in &func.params {
            locals.insert(param.clone(), args.next().unwrap_or(Value::Absent));
        }
        let mut frame = Frame { locals, this };
        match self.exec_block(&func.body, &mut frame)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Null),
            _ => error(format!("break escaped {}", function)),
        }
    }

    fn exec_block(&mut self, stmts: &[FlatStmt], frame: &mut Frame) -> Eval<Flow> {
        for stmt in stmts {
            match self.exec(stmt, frame)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &FlatStmt, frame: &mut Frame) -> Eval<Flow> {
        match stmt {
            FlatStmt::Let { name, value } => {
                let value = match value {
                    Some(value) => self.eval(value, frame)?,
                    None => Value::Null,
                };
                frame.locals.insert(name.clone(), value);
            }
            FlatStmt::Expr(expr) => {
                self.eval(expr, frame)?;
            }
            FlatStmt::Return(value) => {
                let value = match value {
                    Some(value) => self.eval(value, frame)?,
                    None => Value::Null,
                };
                return Ok(Flow::Return(value));
            }
            FlatStmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let branch = if truthy(&self.eval(condition, frame)?) {
                    then_branch
                } else {
                    else_branch
                };
                return self.exec_block(branch, frame);
            }
            FlatStmt::While { condition, body } => {
                while truthy(&self.eval(condition, frame)?) {
                    match self.exec_block(body, frame)? {
                        Flow::Break(None) => break,
                        Flow::Continue(None) | Flow::Normal => {}
                        flow => return Ok(flow),
                    }
                }
            }
            FlatStmt::For {
                init,
                condition,
                renew,
                update,
                body,
            } => {
                self.exec_block(init, frame)?;
                loop {
                    if let Some(condition) = condition {
                        if !truthy(&self.eval(condition, frame)?) {
                            break;
                        }
                    }
                    match self.exec_block(body, frame)? {
                        Flow::Break(None) => break,
                        Flow::Continue(None) | Flow::Normal => {}
                        flow => return Ok(flow),
                    }
                    if let Some(alias) = renew {
                        let copy = alias_record(frame, alias)?.borrow().clone();
                        frame
                            .locals
                            .insert(alias.clone(), Value::Alias(Rc::new(RefCell::new(copy))));
                    }
                    if let Some(update) = update {
                        self.eval(update, frame)?;
                    }
                }
            }
            FlatStmt::Block(body) => return self.exec_block(body, frame),
            FlatStmt::Try {
                body,
                catch,
                finally,
            } => {
                let mut result = self.exec_block(body, frame);
                if let (Err(Failure::Thrown(value)), Some(catch)) = (&result, catch) {
                    if let Some(param) = &catch.param {
                        frame.locals.insert(param.clone(), value.clone());
                    }
                    result = self.exec_block(&catch.body, frame);
                }
                if let Some(finally) = finally {
                    match self.exec_block(finally, frame)? {
                        Flow::Normal => {}
                        flow => return Ok(flow),
                    }
                }
                return result;
            }
            FlatStmt::Throw(value) => {
                let value = self.eval(value, frame)?;
                return Err(Failure::Thrown(value));
            }
            FlatStmt::Break(label) => return Ok(Flow::Break(label.clone())),
            FlatStmt::Continue(label) => return Ok(Flow::Continue(label.clone())),
            FlatStmt::Labeled { label, body } => {
                return match self.exec_block(body, frame)? {
                    Flow::Break(Some(l)) if &l == label => Ok(Flow::Normal),
                    flow => Ok(flow),
                };
            }
            FlatStmt::InitAlias { alias, fields, .. } => {
                let mut record = HashMap::new();
                for (field, value) in fields {
                    let value = self.eval(value, frame)?;
                    record.insert(field.clone(), value);
                }
                frame
                    .locals
                    .insert(alias.clone(), Value::Alias(Rc::new(RefCell::new(record))));
            }
            FlatStmt::ClearAlias(alias) => {
                frame.locals.insert(alias.clone(), Value::Null);
            }
        }
        Ok(Flow::Normal)
    }

    fn eval(&mut self, expr: &FlatExpr, frame: &mut Frame) -> Eval<Value> {
        Ok(match expr {
            FlatExpr::Literal(lit) => match lit {
                FlatLiteral::Int(v) => Value::Int(*v),
                FlatLiteral::Float(v) => Value::Float(*v),
                FlatLiteral::String(v) => Value::Str(v.clone()),
                FlatLiteral::Bool(v) => Value::Bool(*v),
                FlatLiteral::Null => Value::Null,
            },
            FlatExpr::Local(name) => match frame.locals.get(name) {
                Some(value) => value.clone(),
                None => return error(format!("unbound local {}", name)),
            },
            FlatExpr::Global(name) => self.global_value(name)?,
            FlatExpr::AliasGet { alias, field } => {
                let record = alias_record(frame, alias)?;
                let value = record.borrow().get(field).cloned();
                match value {
                    Some(value) => value,
                    None => return error(format!("{} has no field {}", alias, field)),
                }
            }
            FlatExpr::This => match &frame.this {
                Some(this) => this.clone(),
                None => return error("no receiver"),
            },
            FlatExpr::Assign { target, value } => {
                let value = self.eval(value, frame)?;
                self.store(target, value.clone(), frame)?;
                value
            }
            FlatExpr::Bind {
                function,
                receiver,
                scopes,
            } => {
                let receiver = if *receiver {
                    frame.this.clone().map(Box::new)
                } else {
                    None
                };
                let scopes = scopes
                    .iter()
                    .map(|alias| alias_record(frame, alias).map(Value::Alias))
                    .collect::<Eval<Vec<_>>>()?;
                Value::Closure {
                    function: function.clone(),
                    receiver,
                    scopes,
                }
            }
            FlatExpr::Call { function, args } => {
                let args = self.eval_all(args, frame)?;
                self.invoke(function, None, args)?
            }
            FlatExpr::CallWithReceiver {
                function,
                receiver,
                args,
            } => {
                let receiver = self.eval(receiver, frame)?;
                let args = self.eval_all(args, frame)?;
                self.invoke(function, Some(receiver), args)?
            }
            FlatExpr::MethodCall {
                object,
                property,
                args,
            } => {
                let object = self.eval(object, frame)?;
                let args = self.eval_all(args, frame)?;
                let function = self.method_of(&object, property)?;
                self.invoke(&function, Some(object), args)?
            }
            FlatExpr::DynamicCall {
                callee,
                positional,
                named,
            } => {
                let callee = self.eval(callee, frame)?;
                let positional = self.eval_all(positional, frame)?;
                let mut bag = Vec::new();
                for (name, value) in named {
                    bag.push((name.clone(), self.eval(value, frame)?));
                }
                self.dynamic_call(callee, positional, bag)?
            }
            FlatExpr::GetField { object, property } => {
                let object = self.eval(object, frame)?;
                self.get_field(object, property)?
            }
            FlatExpr::Index { object, index } => {
                let object = self.eval(object, frame)?;
                let index = self.eval(index, frame)?;
                match (object, index) {
                    (Value::List(list), Value::Int(i)) => {
                        list.borrow().get(i as usize).cloned().unwrap_or(Value::Null)
                    }
                    _ => return error("bad index"),
                }
            }
            FlatExpr::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.eval(left, frame)?;
                if operator == "&&" && !truthy(&left) {
                    return Ok(Value::Bool(false));
                }
                if operator == "||" && truthy(&left) {
                    return Ok(Value::Bool(true));
                }
                let right = self.eval(right, frame)?;
                binary(operator, left, right)?
            }
            FlatExpr::Unary { operator, operand } => {
                let operand = self.eval(operand, frame)?;
                match (operator.as_str(), operand) {
                    ("!", value) => Value::Bool(!truthy(&value)),
                    ("-", Value::Int(v)) => Value::Int(-v),
                    ("-", Value::Float(v)) => Value::Float(-v),
                    (op, _) => return error(format!("bad unary {}", op)),
                }
            }
            FlatExpr::Conditional {
                condition,
                consequent,
                alternate,
            } => {
                if truthy(&self.eval(condition, frame)?) {
                    self.eval(consequent, frame)?
                } else {
                    self.eval(alternate, frame)?
                }
            }
            FlatExpr::New {
                class,
                constructor,
                args,
            } => {
                let args = self.eval_all(args, frame)?;
                let object = self.instantiate(class)?;
                self.invoke(constructor, Some(object.clone()), args)?;
                object
            }
            FlatExpr::List(elements) => {
                let elements = self.eval_all(elements, frame)?;
                Value::List(Rc::new(RefCell::new(elements)))
            }
            FlatExpr::NamedBag(entries) => {
                let mut bag = Vec::new();
                for (name, value) in entries {
                    bag.push((name.clone(), self.eval(value, frame)?));
                }
                Value::Bag(Rc::new(bag))
            }
            FlatExpr::NamedHas { bag, name } => {
                let bag = named_bag(frame, bag)?;
                Value::Bool(bag.iter().any(|(n, _)| n == name))
            }
            FlatExpr::NamedGet { bag, name } => {
                let bag = named_bag(frame, bag)?;
                bag.iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v.clone())
                    .unwrap_or(Value::Absent)
            }
            FlatExpr::Absent => Value::Absent,
            FlatExpr::NoSuchMethod(target) => Value::NoSuchMethod(target.clone()),
        })
    }

    fn eval_all(&mut self, exprs: &[FlatExpr], frame: &mut Frame) -> Eval<Vec<Value>> {
        exprs.iter().map(|expr| self.eval(expr, frame)).collect()
    }

    fn global_value(&self, name: &str) -> Eval<Value> {
        if self.functions.contains_key(name) {
            return Ok(Value::Closure {
                function: name.to_string(),
                receiver: None,
                scopes: Vec::new(),
            });
        }
        if self.classes.contains_key(name) {
            return Ok(Value::Class(name.to_string()));
        }
        match self.globals.get(name) {
            Some(value) => Ok(value.clone()),
            None => error(format!("no global {}", name)),
        }
    }

    fn store(&mut self, place: &Place, value: Value, frame: &mut Frame) -> Eval<()> {
        match place {
            Place::Local(name) => {
                frame.locals.insert(name.clone(), value);
            }
            Place::Alias { alias, field } => {
                alias_record(frame, alias)?
                    .borrow_mut()
                    .insert(field.clone(), value);
            }
            Place::Field { object, property } => match self.eval(object, frame)? {
                Value::Object(instance) => {
                    instance.fields.borrow_mut().insert(property.clone(), value);
                }
                _ => return error(format!("field store {} on a non-object", property)),
            },
            Place::Index { object, index } => {
                let object = self.eval(object, frame)?;
                let index = self.eval(index, frame)?;
                match (object, index) {
                    (Value::List(list), Value::Int(i)) => {
                        let mut list = list.borrow_mut();
                        let i = i as usize;
                        if i >= list.len() {
                            list.resize(i + 1, Value::Null);
                        }
                        list[i] = value;
                    }
                    _ => return error("bad index store"),
                }
            }
            Place::Global(name) => {
                self.globals.insert(name.clone(), value);
            }
        }
        Ok(())
    }

    fn instantiate(&self, class: &str) -> Eval<Value> {
        let mut fields = HashMap::new();
        let mut current = Some(class);
        while let Some(name) = current {
            let Some(class) = self.classes.get(name) else {
                return error(format!("no class {}", name));
            };
            for field in &class.fields {
                fields.entry(field.clone()).or_insert(Value::Null);
            }
            current = class.superclass.as_deref();
        }
        Ok(Value::Object(Rc::new(Instance {
            class: class.to_string(),
            fields: RefCell::new(fields),
        })))
    }

    fn find_slot(&self, class: &str, property: &str) -> Option<&'p MethodSlot> {
        let mut current = Some(class);
        while let Some(name) = current {
            let class: &'p FlatClass = self.classes.get(name).copied()?;
            if let Some(slot) = class.methods.iter().find(|m| m.property == property) {
                return Some(slot);
            }
            current = class.superclass.as_deref();
        }
        None
    }

    fn method_of(&self, object: &Value, property: &str) -> Eval<String> {
        let Value::Object(instance) = object else {
            return error(format!("method {} on a non-object", property));
        };
        match self.find_slot(&instance.class, property) {
            Some(slot) => Ok(slot.function.clone()),
            None => error(format!("{} has no method {}", instance.class, property)),
        }
    }

    /// Mangled lookup first, then the runtime's source-name fallbacks.
    fn get_field(&mut self, object: Value, property: &str) -> Eval<Value> {
        let Value::Object(instance) = &object else {
            return error(format!("field {} on a non-object", property));
        };
        for candidate in [property.to_string(), format!("{}$F", property)] {
            if let Some(value) = instance.fields.borrow().get(&candidate) {
                return Ok(value.clone());
            }
        }
        if let Some(slot) = self.find_slot(&instance.class, &format!("{}$G", property)) {
            return self.invoke(&slot.function.clone(), Some(object.clone()), Vec::new());
        }
        for candidate in [property.to_string(), format!("{}$M", property)] {
            if let Some(slot) = self.find_slot(&instance.class, &candidate) {
                return Ok(Value::Closure {
                    function: slot.function.clone(),
                    receiver: Some(Box::new(object.clone())),
                    scopes: Vec::new(),
                });
            }
        }
        error(format!("{} has no member {}", instance.class, property))
    }

    /// Calls through a function value. Trampolines receive the uniform convention.
    fn dynamic_call(&mut self, callee: Value, positional: Vec<Value>, named: Vec<(String, Value)>) -> Eval<Value> {
        let Value::Closure {
            function,
            receiver,
            scopes,
        } = callee
        else {
            return error("call of a non-function");
        };
        let Some(func) = self.functions.get(function.as_str()).copied() else {
            return error(format!("no function {}", function));
        };
        let mut args = scopes;
        if func.origin == FunctionOrigin::Trampoline {
            let slots = func.params.len() - args.len() - 3;
            args.push(Value::Int(positional.len() as i64));
            let named_count = named.len() as i64;
            args.push(Value::Bag(Rc::new(named)));
            args.push(Value::Int(named_count));
            let mut positional = positional;
            if positional.len() < slots {
                positional.resize(slots, Value::Absent);
            }
            args.extend(positional);
        } else {
            if !named.is_empty() {
                return error(format!("{} takes no named arguments", function));
            }
            args.extend(positional);
        }
        self.invoke(&function, receiver.map(|r| *r), args)
    }
}

fn alias_record(frame: &Frame, alias: &str) -> Eval<Rc<RefCell<HashMap<String, Value>>>> {
    match frame.locals.get(alias) {
        Some(Value::Alias(record)) => Ok(record.clone()),
        _ => error(format!("{} is not a live alias", alias)),
    }
}

fn named_bag(frame: &Frame, bag: &str) -> Eval<Rc<Vec<(String, Value)>>> {
    match frame.locals.get(bag) {
        Some(Value::Bag(bag)) => Ok(bag.clone()),
        _ => error(format!("{} is not a named-argument bag", bag)),
    }
}

fn truthy(value: &Value) -> bool {
    !matches!(value, Value::Bool(false) | Value::Null | Value::Absent)
}

fn binary(operator: &str, left: Value, right: Value) -> Eval<Value> {
    use Value::*;
    Ok(match (operator, left, right) {
        ("+", Int(a), Int(b)) => Int(a + b),
        ("-", Int(a), Int(b)) => Int(a - b),
        ("*", Int(a), Int(b)) => Int(a * b),
        ("/", Int(a), Int(b)) if b != 0 => Int(a / b),
        ("%", Int(a), Int(b)) if b != 0 => Int(a % b),
        ("+", Float(a), Float(b)) => Float(a + b),
        ("+", Str(a), Str(b)) => Str(a + &b),
        ("<", Int(a), Int(b)) => Bool(a < b),
        ("<=", Int(a), Int(b)) => Bool(a <= b),
        (">", Int(a), Int(b)) => Bool(a > b),
        (">=", Int(a), Int(b)) => Bool(a >= b),
        ("==", a, b) => Bool(a == b),
        ("!=", a, b) => Bool(a != b),
        ("&&", a, b) => Bool(truthy(&a) && truthy(&b)),
        ("||", a, b) => Bool(truthy(&a) || truthy(&b)),
        (op, a, b) => return error(format!("bad operands for {}: {:?}, {:?}", op, a, b)),
    })
}
