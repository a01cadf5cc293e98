//! Flat output model
//!
//! What the printer receives: one ordered list of globally named
//! declarations. No function in here contains another function; closures
//! have been hoisted and their captured state travels in alias records.

mod pretty;

pub use pretty::PrettyPrint;

use crate::error::{LowerError, LowerResult};
use crate::mangle::NameTable;
use serde::Serialize;

/// A lowered program, declarations in emission order
#[derive(Debug, Clone, Serialize)]
pub struct FlatProgram {
    pub declarations: Vec<FlatDecl>,
    /// Record types of scope alias objects
    pub alias_records: Vec<AliasRecord>,
    pub names: NameTable,
}

impl FlatProgram {
    /// Serialize for an out-of-process printer.
    pub fn to_json(&self) -> LowerResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LowerError::internal(format!("failed to serialize program: {}", e)))
    }

    pub fn function(&self, name: &str) -> Option<&FlatFunction> {
        self.declarations.iter().find_map(|decl| match decl {
            FlatDecl::Function(func) if func.name == name => Some(func),
            _ => None,
        })
    }

    pub fn class(&self, name: &str) -> Option<&FlatClass> {
        self.declarations.iter().find_map(|decl| match decl {
            FlatDecl::Class(class) if class.name == name => Some(class),
            _ => None,
        })
    }

    pub fn alias_record(&self, name: &str) -> Option<&AliasRecord> {
        self.alias_records.iter().find(|record| record.name == name)
    }

    /// Declaration names in emission order.
    pub fn declaration_names(&self) -> Vec<&str> {
        self.declarations.iter().map(FlatDecl::name).collect()
    }

    /// Position of a declaration in emission order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.declarations.iter().position(|decl| decl.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlatDecl {
    Class(FlatClass),
    Function(FlatFunction),
    /// Start of a unit's static initialization
    Barrier { name: String, unit: String },
    StaticInit(FlatStaticInit),
}

impl FlatDecl {
    pub fn name(&self) -> &str {
        match self {
            FlatDecl::Class(class) => &class.name,
            FlatDecl::Function(func) => &func.name,
            FlatDecl::Barrier { name, .. } => name,
            FlatDecl::StaticInit(init) => &init.name,
        }
    }
}

/// Class object: instance field slots and member property → function slots
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatClass {
    pub name: String,
    pub superclass: Option<String>,
    /// Instance field property names
    pub fields: Vec<String>,
    pub methods: Vec<MethodSlot>,
    /// Global names holding static fields
    pub static_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSlot {
    pub property: String,
    pub kind: SlotKind,
    /// Global implementing function
    pub function: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Method,
    Getter,
    Setter,
    Operator,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatStaticInit {
    pub name: String,
    pub class: String,
    pub body: Vec<FlatStmt>,
}

/// A top-level function
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatFunction {
    pub name: String,
    /// Takes a receiver (`this`) in addition to `params`
    pub receiver: bool,
    pub params: Vec<String>,
    pub body: Vec<FlatStmt>,
    pub origin: FunctionOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionOrigin {
    Function,
    Method,
    Getter,
    Setter,
    Operator,
    Constructor,
    Factory,
    Closure,
    Trampoline,
}

/// Record type of one captured scope's alias object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasRecord {
    pub name: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlatStmt {
    Let {
        name: String,
        value: Option<FlatExpr>,
    },
    Expr(FlatExpr),
    Return(Option<FlatExpr>),
    If {
        condition: FlatExpr,
        then_branch: Vec<FlatStmt>,
        else_branch: Vec<FlatStmt>,
    },
    While {
        condition: FlatExpr,
        body: Vec<FlatStmt>,
    },
    For {
        init: Vec<FlatStmt>,
        condition: Option<FlatExpr>,
        /// Alias object of the header scope, replaced by a copy of itself
        /// before each update so every iteration has its own variables
        renew: Option<String>,
        update: Option<FlatExpr>,
        body: Vec<FlatStmt>,
    },
    Block(Vec<FlatStmt>),
    Try {
        body: Vec<FlatStmt>,
        catch: Option<FlatCatch>,
        finally: Option<Vec<FlatStmt>>,
    },
    Throw(FlatExpr),
    Break(Option<String>),
    Continue(Option<String>),
    Labeled {
        label: String,
        body: Vec<FlatStmt>,
    },
    /// Create a scope's alias object
    InitAlias {
        alias: String,
        record: String,
        fields: Vec<(String, FlatExpr)>,
    },
    /// Drop a scope's alias object on scope exit
    ClearAlias(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatCatch {
    pub param: Option<String>,
    pub body: Vec<FlatStmt>,
}

/// Assignable location
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Place {
    Local(String),
    /// Field of a scope alias object
    Alias { alias: String, field: String },
    Field { object: FlatExpr, property: String },
    Index { object: FlatExpr, index: FlatExpr },
    Global(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlatLiteral {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlatExpr {
    Literal(FlatLiteral),
    Local(String),
    Global(String),
    AliasGet {
        alias: String,
        field: String,
    },
    This,
    Assign {
        target: Box<Place>,
        value: Box<FlatExpr>,
    },
    /// Hoisted function packaged with its receiver and alias objects
    Bind {
        function: String,
        receiver: bool,
        scopes: Vec<String>,
    },
    /// Direct call of a global function
    Call {
        function: String,
        args: Vec<FlatExpr>,
    },
    /// Global function called with an explicit receiver
    CallWithReceiver {
        function: String,
        receiver: Box<FlatExpr>,
        args: Vec<FlatExpr>,
    },
    /// Dispatch through a class property slot
    MethodCall {
        object: Box<FlatExpr>,
        property: String,
        args: Vec<FlatExpr>,
    },
    /// Call of a function value whose target is unknown
    DynamicCall {
        callee: Box<FlatExpr>,
        positional: Vec<FlatExpr>,
        named: Vec<(String, FlatExpr)>,
    },
    GetField {
        object: Box<FlatExpr>,
        property: String,
    },
    Index {
        object: Box<FlatExpr>,
        index: Box<FlatExpr>,
    },
    Binary {
        operator: String,
        left: Box<FlatExpr>,
        right: Box<FlatExpr>,
    },
    Unary {
        operator: String,
        operand: Box<FlatExpr>,
    },
    Conditional {
        condition: Box<FlatExpr>,
        consequent: Box<FlatExpr>,
        alternate: Box<FlatExpr>,
    },
    /// Allocate an instance of `class` and run `constructor` on it
    New {
        class: String,
        constructor: String,
        args: Vec<FlatExpr>,
    },
    List(Vec<FlatExpr>),
    /// Named-argument bag of a uniform-convention call
    NamedBag(Vec<(String, FlatExpr)>),
    NamedHas {
        bag: String,
        name: String,
    },
    NamedGet {
        bag: String,
        name: String,
    },
    /// Value of an omitted parameter without a default
    Absent,
    /// Shared failure path for calls whose argument shape does not match
    NoSuchMethod(String),
}

impl FlatExpr {
    pub fn int(value: i64) -> Self {
        FlatExpr::Literal(FlatLiteral::Int(value))
    }

    pub fn local(name: impl Into<String>) -> Self {
        FlatExpr::Local(name.into())
    }

    pub fn global(name: impl Into<String>) -> Self {
        FlatExpr::Global(name.into())
    }

    pub fn assign(target: Place, value: FlatExpr) -> Self {
        FlatExpr::Assign {
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    pub fn binary(operator: &str, left: FlatExpr, right: FlatExpr) -> Self {
        FlatExpr::Binary {
            operator: operator.to_string(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

impl Place {
    /// Read the current value of this place.
    pub fn read(&self) -> FlatExpr {
        match self {
            Place::Local(name) => FlatExpr::Local(name.clone()),
            Place::Alias { alias, field } => FlatExpr::AliasGet {
                alias: alias.clone(),
                field: field.clone(),
            },
            Place::Field { object, property } => FlatExpr::GetField {
                object: Box::new(object.clone()),
                property: property.clone(),
            },
            Place::Index { object, index } => FlatExpr::Index {
                object: Box::new(object.clone()),
                index: Box::new(index.clone()),
            },
            Place::Global(name) => FlatExpr::Global(name.clone()),
        }
    }
}
