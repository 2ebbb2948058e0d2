//! Query AST: literal values, field selectors, filter expressions and the
//! predicate tree they compile into.
//!
//! Callers describe a condition as an [`Expr`] (built with the helper
//! functions at the bottom of this module, or parsed from text). The
//! translator resolves it against the join graph and produces a
//! [`Predicate`], whose leaves carry concrete table aliases and columns.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Values
// ============================================================================

/// A literal value in a condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Uuid(Uuid),
}

impl Value {
    /// The value's plain text, without SQL quoting. Used to build LIKE patterns.
    pub fn raw_text(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d),
            Value::DateTime(dt) => write!(f, "{}", dt),
            Value::Uuid(u) => write!(f, "{}", u),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident $(as $cast:ty)?),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v $(as $cast)?)
                }
            }

            impl From<$ty> for Expr {
                fn from(v: $ty) -> Self {
                    Expr::Literal(Value::from(v))
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int,
    u8 => Int as i64,
    u16 => Int as i64,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float,
    String => Text,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
    Uuid => Uuid,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&str> for Expr {
    fn from(v: &str) -> Self {
        Expr::Literal(Value::from(v))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Literal(v)
    }
}

// ============================================================================
// Operators
// ============================================================================

/// Comparison operator of a predicate leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl CompareOp {
    /// The operator to use once the operands have been swapped.
    pub fn flip(self) -> Self {
        match self {
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Gte => CompareOp::Lte,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Lte => CompareOp::Gte,
            other => other,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Like => "LIKE",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Logical connective of a predicate group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => f.write_str("AND"),
            LogicalOp::Or => f.write_str("OR"),
        }
    }
}

/// Sort direction of an ORDER BY key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("ASC"),
            SortDirection::Desc => f.write_str("DESC"),
        }
    }
}

// ============================================================================
// Field selectors
// ============================================================================

/// Identity of an include edge: the foreign-key field it was joined through,
/// optionally pinned to the table occurrence the edge leaves from.
///
/// Without `from`, a key matches the most recent edge through that field.
/// Two hops through the same field differ only in `from`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinKey {
    pub entity: String,
    pub field: String,
    pub from: Option<TableAlias>,
}

impl JoinKey {
    pub fn new(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            field: field.into(),
            from: None,
        }
    }

    /// Pin the key to the edge leaving the table aliased `alias`.
    pub fn from_alias(mut self, alias: TableAlias) -> Self {
        self.from = Some(alias);
        self
    }

    /// Whether this key selects `edge`, a fully pinned key of a join.
    pub fn matches(&self, edge: &JoinKey) -> bool {
        self.entity == edge.entity
            && self.field == edge.field
            && (self.from.is_none() || self.from == edge.from)
    }
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.field)?;
        if let Some(alias) = self.from {
            write!(f, "#{}", alias)?;
        }
        Ok(())
    }
}

impl From<FieldRef> for JoinKey {
    fn from(r: FieldRef) -> Self {
        JoinKey::new(r.entity, r.field)
    }
}

/// A reference to one field of one entity.
///
/// Without `via`, the reference resolves to the table the entity was most
/// recently joined as, except that the root entity always resolves to `e0`.
/// With `via`, it resolves to the table introduced by that include edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub entity: String,
    pub field: String,
    pub via: Option<JoinKey>,
}

impl FieldRef {
    pub fn new(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            field: field.into(),
            via: None,
        }
    }

    /// Pin this reference to the table joined through `edge`.
    pub fn via(mut self, edge: impl Into<JoinKey>) -> Self {
        self.via = Some(edge.into());
        self
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.field)?;
        if let Some(via) = &self.via {
            write!(f, "@{}", via)?;
        }
        Ok(())
    }
}

impl From<FieldRef> for Expr {
    fn from(r: FieldRef) -> Self {
        Expr::Field(r)
    }
}

// ============================================================================
// Filter expressions
// ============================================================================

/// A zero-argument function evaluated when the filter is translated.
#[derive(Clone)]
pub struct Thunk(Arc<dyn Fn() -> Value + Send + Sync>);

impl Thunk {
    pub fn new(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn eval(&self) -> Value {
        (self.0)()
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Thunk(..)")
    }
}

/// A boolean filter expression, before alias resolution.
#[derive(Debug, Clone)]
pub enum Expr {
    Field(FieldRef),
    Literal(Value),
    Computed(Thunk),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        operands: Vec<Expr>,
    },
    Not(Box<Expr>),
    /// `target.method(arg)`, e.g. `Name.contains('x')`.
    Call {
        method: String,
        target: Box<Expr>,
        arg: Box<Expr>,
    },
}

impl Expr {
    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Expr::Field(r) => format!("field {}", r),
            Expr::Literal(v) => format!("literal {}", v),
            Expr::Computed(_) => "computed value".to_string(),
            Expr::Compare { op, .. } => format!("comparison '{}'", op),
            Expr::Logical { op, .. } => format!("{} group", op),
            Expr::Not(_) => "negation".to_string(),
            Expr::Call { method, .. } => format!("call {}()", method),
        }
    }
}

/// Build a field reference.
pub fn field(entity: impl Into<String>, name: impl Into<String>) -> FieldRef {
    FieldRef::new(entity, name)
}

/// Build a literal expression.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

/// Build a value computed at translation time.
pub fn computed(f: impl Fn() -> Value + Send + Sync + 'static) -> Expr {
    Expr::Computed(Thunk::new(f))
}

pub fn compare(op: CompareOp, left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::Compare {
        op,
        left: Box::new(left.into()),
        right: Box::new(right.into()),
    }
}

pub fn eq(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    compare(CompareOp::Eq, left, right)
}

pub fn ne(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    compare(CompareOp::Ne, left, right)
}

pub fn gt(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    compare(CompareOp::Gt, left, right)
}

pub fn gte(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    compare(CompareOp::Gte, left, right)
}

pub fn lt(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    compare(CompareOp::Lt, left, right)
}

pub fn lte(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    compare(CompareOp::Lte, left, right)
}

/// Raw LIKE with a caller-supplied pattern.
pub fn like(left: impl Into<Expr>, pattern: impl Into<Expr>) -> Expr {
    compare(CompareOp::Like, left, pattern)
}

pub fn and<I, E>(operands: I) -> Expr
where
    I: IntoIterator<Item = E>,
    E: Into<Expr>,
{
    Expr::Logical {
        op: LogicalOp::And,
        operands: operands.into_iter().map(Into::into).collect(),
    }
}

pub fn or<I, E>(operands: I) -> Expr
where
    I: IntoIterator<Item = E>,
    E: Into<Expr>,
{
    Expr::Logical {
        op: LogicalOp::Or,
        operands: operands.into_iter().map(Into::into).collect(),
    }
}

pub fn not(operand: impl Into<Expr>) -> Expr {
    Expr::Not(Box::new(operand.into()))
}

pub fn call(method: impl Into<String>, target: impl Into<Expr>, arg: impl Into<Expr>) -> Expr {
    Expr::Call {
        method: method.into(),
        target: Box::new(target.into()),
        arg: Box::new(arg.into()),
    }
}

pub fn contains(target: impl Into<Expr>, needle: impl Into<Expr>) -> Expr {
    call("contains", target, needle)
}

pub fn starts_with(target: impl Into<Expr>, prefix: impl Into<Expr>) -> Expr {
    call("starts_with", target, prefix)
}

pub fn ends_with(target: impl Into<Expr>, suffix: impl Into<Expr>) -> Expr {
    call("ends_with", target, suffix)
}

// ============================================================================
// Predicate tree
// ============================================================================

/// Alias of one table occurrence in the generated SQL (`e0`, `e1`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableAlias(pub usize);

impl TableAlias {
    pub const ROOT: TableAlias = TableAlias(0);
}

impl fmt::Display for TableAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// A resolved column: table alias plus SQL column name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub alias: TableAlias,
    pub column: String,
}

/// A node of a WHERE condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Comparison {
        column: ColumnRef,
        op: CompareOp,
        value: Value,
    },
    Group {
        op: LogicalOp,
        children: Vec<Predicate>,
    },
}

impl Predicate {
    pub fn comparison(column: ColumnRef, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Comparison {
            column,
            op,
            value: value.into(),
        }
    }

    /// Build a group; `None` when there are no children.
    pub fn group(op: LogicalOp, children: Vec<Predicate>) -> Option<Self> {
        if children.is_empty() {
            None
        } else {
            Some(Predicate::Group { op, children })
        }
    }

    /// Number of comparison leaves under this node.
    pub fn leaf_count(&self) -> usize {
        match self {
            Predicate::Comparison { .. } => 1,
            Predicate::Group { children, .. } => children.iter().map(Predicate::leaf_count).sum(),
        }
    }
}
