//! Operator dispatch over the numeric tower.
//!
//! Every value kind maps to a static [`TypeInfo`] descriptor: type name,
//! byte size, dispatch precedence, and a table of nullable operator
//! slots. Dispatch picks the operand with the highest precedence (ties
//! break in favour of the left operand) and invokes that type's slot.
//!
//! A missing slot raises `matte:undefined-function` naming the operator
//! and the operand types. A slot that returns `None` has refused the
//! operands: if it reported its own failure the pending exception is
//! propagated, otherwise the refusal itself is promoted to
//! `matte:undefined-function`. Either way the caller never observes a
//! bare `None`.

use matte_core::except::{self, ids};
use matte_core::list::ObjectList;
use matte_core::value::{Value, ValueKind};
use matte_core::{Exception, error};

use crate::{complex, complex_matrix, complex_vector, display, float, int, matrix, range, string, vector};

pub type UnarySlot = fn(&Value) -> Option<Value>;
pub type BinarySlot = fn(&Value, &Value) -> Option<Value>;
pub type TernarySlot = fn(&Value, &Value, &Value) -> Option<Value>;
pub type VariadicSlot = fn(&[&Value]) -> Option<Value>;
pub type TruthSlot = fn(&Value) -> bool;
pub type DispSlot = fn(&Value, &str) -> String;
pub type MethodSlot = fn(this: *mut Value, args: &ObjectList) -> Option<Value>;

/// Type descriptor: name, size, precedence and the operator slot table.
pub struct TypeInfo {
    pub name: &'static str,
    pub size: usize,
    pub precedence: u32,

    pub disp: Option<DispSlot>,
    pub truth: Option<TruthSlot>,

    pub plus: Option<BinarySlot>,
    pub minus: Option<BinarySlot>,
    pub uminus: Option<UnarySlot>,
    pub times: Option<BinarySlot>,
    pub mtimes: Option<BinarySlot>,
    pub rdivide: Option<BinarySlot>,
    pub ldivide: Option<BinarySlot>,
    pub mrdivide: Option<BinarySlot>,
    pub mldivide: Option<BinarySlot>,
    pub power: Option<BinarySlot>,
    pub mpower: Option<BinarySlot>,
    pub lt: Option<BinarySlot>,
    pub gt: Option<BinarySlot>,
    pub le: Option<BinarySlot>,
    pub ge: Option<BinarySlot>,
    pub ne: Option<BinarySlot>,
    pub eq: Option<BinarySlot>,
    pub and: Option<BinarySlot>,
    pub or: Option<BinarySlot>,
    pub mand: Option<BinarySlot>,
    pub mor: Option<BinarySlot>,
    pub not: Option<UnarySlot>,
    pub colon: Option<TernarySlot>,
    pub ctranspose: Option<UnarySlot>,
    pub transpose: Option<UnarySlot>,
    pub horzcat: Option<VariadicSlot>,
    pub vertcat: Option<VariadicSlot>,
    pub subsref: Option<BinarySlot>,
    pub subsasgn: Option<TernarySlot>,
    pub subsindex: Option<UnarySlot>,

    pub methods: &'static [(&'static str, MethodSlot)],
}

/// Descriptor with every slot empty; concrete descriptors override the
/// slots their type implements.
const NULL_INFO: TypeInfo = TypeInfo {
    name: "",
    size: size_of::<Value>(),
    precedence: 0,
    disp: None,
    truth: None,
    plus: None,
    minus: None,
    uminus: None,
    times: None,
    mtimes: None,
    rdivide: None,
    ldivide: None,
    mrdivide: None,
    mldivide: None,
    power: None,
    mpower: None,
    lt: None,
    gt: None,
    le: None,
    ge: None,
    ne: None,
    eq: None,
    and: None,
    or: None,
    mand: None,
    mor: None,
    not: None,
    colon: None,
    ctranspose: None,
    transpose: None,
    horzcat: None,
    vertcat: None,
    subsref: None,
    subsasgn: None,
    subsindex: None,
    methods: &[],
};

static EMPTY_INFO: TypeInfo = TypeInfo { name: "Empty", disp: Some(display::disp_empty), ..NULL_INFO };

static INT_INFO: TypeInfo = TypeInfo {
    name: "Int",
    precedence: 1,
    disp: Some(display::disp_scalar),
    truth: Some(int::truth),
    plus: Some(int::plus),
    minus: Some(int::minus),
    uminus: Some(int::uminus),
    times: Some(int::times),
    mtimes: Some(int::times),
    rdivide: Some(int::rdivide),
    ldivide: Some(int::ldivide),
    mrdivide: Some(int::rdivide),
    mldivide: Some(int::ldivide),
    power: Some(int::power),
    mpower: Some(int::power),
    lt: Some(int::lt),
    gt: Some(int::gt),
    le: Some(int::le),
    ge: Some(int::ge),
    ne: Some(int::ne),
    eq: Some(int::eq),
    and: Some(int::and),
    or: Some(int::or),
    mand: Some(int::and),
    mor: Some(int::or),
    not: Some(int::not),
    colon: Some(int::colon),
    ctranspose: Some(int::transpose),
    transpose: Some(int::transpose),
    horzcat: Some(int::horzcat),
    vertcat: Some(int::vertcat),
    ..NULL_INFO
};

static FLOAT_INFO: TypeInfo = TypeInfo {
    name: "Float",
    precedence: 3,
    disp: Some(display::disp_scalar),
    truth: Some(float::truth),
    plus: Some(float::plus),
    minus: Some(float::minus),
    uminus: Some(float::uminus),
    times: Some(float::times),
    mtimes: Some(float::times),
    rdivide: Some(float::rdivide),
    ldivide: Some(float::ldivide),
    mrdivide: Some(float::rdivide),
    mldivide: Some(float::ldivide),
    power: Some(float::power),
    mpower: Some(float::power),
    lt: Some(float::lt),
    gt: Some(float::gt),
    le: Some(float::le),
    ge: Some(float::ge),
    ne: Some(float::ne),
    eq: Some(float::eq),
    and: Some(float::and),
    or: Some(float::or),
    mand: Some(float::and),
    mor: Some(float::or),
    not: Some(float::not),
    colon: Some(float::colon),
    ctranspose: Some(float::transpose),
    transpose: Some(float::transpose),
    horzcat: Some(float::horzcat),
    vertcat: Some(float::vertcat),
    ..NULL_INFO
};

static COMPLEX_INFO: TypeInfo = TypeInfo {
    name: "Complex",
    precedence: 4,
    disp: Some(display::disp_scalar),
    truth: Some(complex::truth),
    plus: Some(complex::plus),
    minus: Some(complex::minus),
    uminus: Some(complex::uminus),
    times: Some(complex::times),
    mtimes: Some(complex::times),
    rdivide: Some(complex::rdivide),
    ldivide: Some(complex::ldivide),
    mrdivide: Some(complex::rdivide),
    mldivide: Some(complex::ldivide),
    power: Some(complex::power),
    mpower: Some(complex::power),
    ne: Some(complex::ne),
    eq: Some(complex::eq),
    not: Some(complex::not),
    ctranspose: Some(complex::ctranspose),
    transpose: Some(complex::transpose),
    horzcat: Some(complex::horzcat),
    vertcat: Some(complex::vertcat),
    ..NULL_INFO
};

static RANGE_INFO: TypeInfo = TypeInfo {
    name: "Range",
    precedence: 2,
    disp: Some(display::disp_scalar),
    truth: Some(range::truth),
    plus: Some(range::plus),
    minus: Some(range::minus),
    uminus: Some(range::uminus),
    ne: Some(range::ne),
    eq: Some(range::eq),
    transpose: Some(range::transpose),
    ctranspose: Some(range::transpose),
    horzcat: Some(range::horzcat),
    vertcat: Some(range::vertcat),
    ..NULL_INFO
};

static STR_INFO: TypeInfo = TypeInfo {
    name: "String",
    disp: Some(display::disp_scalar),
    plus: Some(string::plus),
    ne: Some(string::ne),
    eq: Some(string::eq),
    horzcat: Some(string::horzcat),
    ..NULL_INFO
};

static VECTOR_INFO: TypeInfo = TypeInfo {
    name: "Vector",
    precedence: 5,
    disp: Some(display::disp_array),
    truth: Some(vector::truth),
    plus: Some(vector::plus),
    minus: Some(vector::minus),
    uminus: Some(vector::uminus),
    times: Some(vector::times),
    mtimes: Some(vector::mtimes),
    rdivide: Some(vector::rdivide),
    lt: Some(vector::lt),
    gt: Some(vector::gt),
    le: Some(vector::le),
    ge: Some(vector::ge),
    ne: Some(vector::ne),
    eq: Some(vector::eq),
    ctranspose: Some(vector::transpose),
    transpose: Some(vector::transpose),
    horzcat: Some(vector::horzcat),
    vertcat: Some(vector::vertcat),
    ..NULL_INFO
};

static MATRIX_INFO: TypeInfo = TypeInfo {
    name: "Matrix",
    precedence: 6,
    disp: Some(display::disp_array),
    truth: Some(matrix::truth),
    plus: Some(matrix::plus),
    minus: Some(matrix::minus),
    uminus: Some(matrix::uminus),
    times: Some(matrix::times),
    mtimes: Some(matrix::mtimes),
    ne: Some(matrix::ne),
    eq: Some(matrix::eq),
    ctranspose: Some(matrix::transpose),
    transpose: Some(matrix::transpose),
    horzcat: Some(matrix::horzcat),
    vertcat: Some(matrix::vertcat),
    ..NULL_INFO
};

static COMPLEX_VECTOR_INFO: TypeInfo = TypeInfo {
    name: "ComplexVector",
    precedence: 7,
    disp: Some(display::disp_array),
    truth: Some(complex_vector::truth),
    plus: Some(complex_vector::plus),
    minus: Some(complex_vector::minus),
    uminus: Some(complex_vector::uminus),
    ne: Some(complex_vector::ne),
    eq: Some(complex_vector::eq),
    ctranspose: Some(complex_vector::ctranspose),
    transpose: Some(complex_vector::transpose),
    horzcat: Some(complex_vector::horzcat),
    ..NULL_INFO
};

static COMPLEX_MATRIX_INFO: TypeInfo = TypeInfo {
    name: "ComplexMatrix",
    precedence: 8,
    disp: Some(display::disp_array),
    plus: Some(complex_matrix::plus),
    minus: Some(complex_matrix::minus),
    uminus: Some(complex_matrix::uminus),
    ctranspose: Some(complex_matrix::ctranspose),
    transpose: Some(complex_matrix::transpose),
    ..NULL_INFO
};

static CELL_INFO: TypeInfo = TypeInfo { name: "Cell", ..NULL_INFO };
static RECORD_INFO: TypeInfo = TypeInfo { name: "Struct", ..NULL_INFO };
static LIST_INFO: TypeInfo = TypeInfo { name: "ObjectList", ..NULL_INFO };
static ITER_INFO: TypeInfo = TypeInfo { name: "Iter", ..NULL_INFO };

fn except_add_cause(this: *mut Value, args: &ObjectList) -> Option<Value> {
    if args.len() != 1 {
        error!(ids::INVALID_INPUT_ARG, "one or more invalid arguments");
        return None;
    }
    // Method slots receive the receiver by pointer so mutation is visible
    // through every alias of the exception value.
    unsafe {
        let cause = args.get(0);
        if this.is_null() || cause.is_null() {
            error!(ids::INVALID_INPUT_ARG, "one or more invalid arguments");
            return None;
        }
        match (&mut *this, &*cause) {
            (Value::Exception(e), Value::Exception(sub)) => {
                e.add_cause(sub);
                Some(Value::Exception(e.clone()))
            }
            _ => {
                error!(ids::INVALID_INPUT_ARG, "one or more invalid arguments");
                None
            }
        }
    }
}

static EXCEPTION_INFO: TypeInfo = TypeInfo {
    name: "Exception",
    disp: Some(display::disp_exception),
    methods: &[("addCause", except_add_cause)],
    ..NULL_INFO
};

/// Descriptor of a value kind. The mapping is total and static; a value's
/// descriptor never changes after construction.
pub fn type_info(kind: ValueKind) -> &'static TypeInfo {
    match kind {
        ValueKind::Empty => &EMPTY_INFO,
        ValueKind::Int => &INT_INFO,
        ValueKind::Float => &FLOAT_INFO,
        ValueKind::Complex => &COMPLEX_INFO,
        ValueKind::Range => &RANGE_INFO,
        ValueKind::Str => &STR_INFO,
        ValueKind::Vector => &VECTOR_INFO,
        ValueKind::Matrix => &MATRIX_INFO,
        ValueKind::ComplexVector => &COMPLEX_VECTOR_INFO,
        ValueKind::ComplexMatrix => &COMPLEX_MATRIX_INFO,
        ValueKind::Cell => &CELL_INFO,
        ValueKind::Record => &RECORD_INFO,
        ValueKind::List => &LIST_INFO,
        ValueKind::Exception => &EXCEPTION_INFO,
        ValueKind::Iterator => &ITER_INFO,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Uminus,
    Not,
    Ctranspose,
    Transpose,
    Subsindex,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Uminus => "uminus",
            UnaryOp::Not => "not",
            UnaryOp::Ctranspose => "ctranspose",
            UnaryOp::Transpose => "transpose",
            UnaryOp::Subsindex => "subsindex",
        }
    }

    fn slot(self, info: &TypeInfo) -> Option<UnarySlot> {
        match self {
            UnaryOp::Uminus => info.uminus,
            UnaryOp::Not => info.not,
            UnaryOp::Ctranspose => info.ctranspose,
            UnaryOp::Transpose => info.transpose,
            UnaryOp::Subsindex => info.subsindex,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Times,
    Mtimes,
    Rdivide,
    Ldivide,
    Mrdivide,
    Mldivide,
    Power,
    Mpower,
    Lt,
    Gt,
    Le,
    Ge,
    Ne,
    Eq,
    And,
    Or,
    Mand,
    Mor,
    Subsref,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Plus => "plus",
            BinaryOp::Minus => "minus",
            BinaryOp::Times => "times",
            BinaryOp::Mtimes => "mtimes",
            BinaryOp::Rdivide => "rdivide",
            BinaryOp::Ldivide => "ldivide",
            BinaryOp::Mrdivide => "mrdivide",
            BinaryOp::Mldivide => "mldivide",
            BinaryOp::Power => "power",
            BinaryOp::Mpower => "mpower",
            BinaryOp::Lt => "lt",
            BinaryOp::Gt => "gt",
            BinaryOp::Le => "le",
            BinaryOp::Ge => "ge",
            BinaryOp::Ne => "ne",
            BinaryOp::Eq => "eq",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Mand => "mand",
            BinaryOp::Mor => "mor",
            BinaryOp::Subsref => "subsref",
        }
    }

    fn slot(self, info: &TypeInfo) -> Option<BinarySlot> {
        match self {
            BinaryOp::Plus => info.plus,
            BinaryOp::Minus => info.minus,
            BinaryOp::Times => info.times,
            BinaryOp::Mtimes => info.mtimes,
            BinaryOp::Rdivide => info.rdivide,
            BinaryOp::Ldivide => info.ldivide,
            BinaryOp::Mrdivide => info.mrdivide,
            BinaryOp::Mldivide => info.mldivide,
            BinaryOp::Power => info.power,
            BinaryOp::Mpower => info.mpower,
            BinaryOp::Lt => info.lt,
            BinaryOp::Gt => info.gt,
            BinaryOp::Le => info.le,
            BinaryOp::Ge => info.ge,
            BinaryOp::Ne => info.ne,
            BinaryOp::Eq => info.eq,
            BinaryOp::And => info.and,
            BinaryOp::Or => info.or,
            BinaryOp::Mand => info.mand,
            BinaryOp::Mor => info.mor,
            BinaryOp::Subsref => info.subsref,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TernaryOp {
    Colon,
    Subsasgn,
}

impl TernaryOp {
    pub fn name(self) -> &'static str {
        match self {
            TernaryOp::Colon => "colon",
            TernaryOp::Subsasgn => "subsasgn",
        }
    }

    fn slot(self, info: &TypeInfo) -> Option<TernarySlot> {
        match self {
            TernaryOp::Colon => info.colon,
            TernaryOp::Subsasgn => info.subsasgn,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariadicOp {
    Horzcat,
    Vertcat,
}

impl VariadicOp {
    pub fn name(self) -> &'static str {
        match self {
            VariadicOp::Horzcat => "horzcat",
            VariadicOp::Vertcat => "vertcat",
        }
    }

    fn slot(self, info: &TypeInfo) -> Option<VariadicSlot> {
        match self {
            VariadicOp::Horzcat => info.horzcat,
            VariadicOp::Vertcat => info.vertcat,
        }
    }
}

/// Pending exception, or a fresh one if the slot is somehow empty.
fn pending() -> Exception {
    except::get().unwrap_or_else(|| {
        Exception::new(ids::UNDEFINED_FUNCTION, "operation failed without a report")
    })
}

/// A slot returned `None`: propagate its own report, or promote the
/// refusal to `matte:undefined-function`.
fn refused(op: &str, operands: &str) -> Exception {
    if !except::check() {
        error!(ids::UNDEFINED_FUNCTION, "method {op}({operands}) is unimplemented");
    }
    pending()
}

pub fn unary(op: UnaryOp, a: &Value) -> Result<Value, Exception> {
    let info = type_info(a.kind());
    match op.slot(info) {
        Some(slot) => slot(a).ok_or_else(|| refused(op.name(), info.name)),
        None => {
            error!(ids::UNDEFINED_FUNCTION, "method {}({}) is unimplemented", op.name(), info.name);
            Err(pending())
        }
    }
}

pub fn binary(op: BinaryOp, a: &Value, b: &Value) -> Result<Value, Exception> {
    let ta = type_info(a.kind());
    let tb = type_info(b.kind());

    // The higher-precedence operand owns dispatch; the left operand wins
    // ties.
    let owner = if ta.precedence >= tb.precedence { ta } else { tb };

    match op.slot(owner) {
        Some(slot) => {
            slot(a, b).ok_or_else(|| refused(op.name(), &format!("{}, {}", ta.name, tb.name)))
        }
        None => {
            error!(
                ids::UNDEFINED_FUNCTION,
                "method {}({}, {}) is unimplemented",
                op.name(),
                ta.name,
                tb.name
            );
            Err(pending())
        }
    }
}

pub fn ternary(op: TernaryOp, a: &Value, b: &Value, c: &Value) -> Result<Value, Exception> {
    let ta = type_info(a.kind());
    let tb = type_info(b.kind());
    let tc = type_info(c.kind());

    let owner = if ta.precedence >= tb.precedence && ta.precedence >= tc.precedence {
        ta
    } else if tb.precedence >= tc.precedence {
        tb
    } else {
        tc
    };

    match op.slot(owner) {
        Some(slot) => slot(a, b, c)
            .ok_or_else(|| refused(op.name(), &format!("{}, {}, {}", ta.name, tb.name, tc.name))),
        None => {
            error!(
                ids::UNDEFINED_FUNCTION,
                "method {}({}, {}, {}) is unimplemented",
                op.name(),
                ta.name,
                tb.name,
                tc.name
            );
            Err(pending())
        }
    }
}

pub fn variadic(op: VariadicOp, args: &[&Value]) -> Result<Value, Exception> {
    let Some(first) = args.first() else {
        error!(ids::INVALID_INPUT_ARG, "one or more invalid arguments");
        return Err(pending());
    };

    let mut owner = type_info(first.kind());
    for arg in &args[1..] {
        let t = type_info(arg.kind());
        if t.precedence > owner.precedence {
            owner = t;
        }
    }

    match op.slot(owner) {
        Some(slot) => {
            slot(args).ok_or_else(|| refused(op.name(), &format!("{}, ...", owner.name)))
        }
        None => {
            error!(
                ids::UNDEFINED_FUNCTION,
                "method {}({}, ...) is unimplemented",
                op.name(),
                owner.name
            );
            Err(pending())
        }
    }
}

/// Invoke a named method from the dispatching value's method table.
pub fn method(name: &str, this: *mut Value, args: &ObjectList) -> Result<Value, Exception> {
    if this.is_null() {
        error!(ids::INVALID_INPUT_ARG, "one or more invalid arguments");
        return Err(pending());
    }
    let kind = unsafe { (*this).kind() };
    let info = type_info(kind);
    for (mname, slot) in info.methods {
        if *mname == name {
            return slot(this, args).ok_or_else(|| refused(name, info.name));
        }
    }
    error!(ids::UNDEFINED_FUNCTION, "method {}({}) is unimplemented", name, info.name);
    Err(pending())
}
