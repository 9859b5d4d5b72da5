//! Builtin function library invoked through the `call` opcode.
//!
//! Operator builtins (the jump family, arithmetic, comparisons, boolean and
//! bitwise operators) pop their operands positionally. Every other builtin
//! consumes a single params array from the top of the stack. Each call pushes
//! exactly one value, except the jump family (nothing) and `explode` (one per
//! element).

use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::value::{Value, format_number};
use crate::vm::{Stack, Variables, VmResult};

mod array;
mod encoding;
mod fs;
mod math;
mod operators;
pub mod pattern;
mod random;
mod sets;
mod string;
mod time;

static NULL: Value = Value::Null;

/// State a builtin may touch. Builtins never see the call stack.
pub struct Context<'a> {
    pub stack: &'a mut Stack,
    pub variables: &'a Variables,
    pub rng: &'a mut fastrand::Rng,
    pub diagnostics: &'a mut Diagnostics,
    /// `operand_1` of the calling instruction.
    pub arg: i64,
    pub line: i32,
    /// Set by the jump family: index of the next instruction to execute.
    pub jump: Option<usize>,
}

/// Largest padding width a builtin will produce.
pub const MAX_WIDTH: usize = operators::MAX_SLICE as usize;

impl Context<'_> {
    pub fn warn(&mut self, message: impl Into<String>) {
        self.diagnostics.emit(Diagnostic::warning(message).with_line(self.line));
    }

    /// A user-supplied padding width, clamped to [`MAX_WIDTH`] with a warning.
    pub fn width(&mut self, name: &str, raw: f64) -> usize {
        let raw = if raw.is_nan() { 0.0 } else { raw.max(0.0) };
        if raw > MAX_WIDTH as f64 {
            self.warn(format!("{name}() width {} exceeds the maximum of {MAX_WIDTH}. Width clamped.", format_number(raw)));
            return MAX_WIDTH;
        }
        raw as usize
    }
}

/// Positional arguments of a builtin; missing entries read as Null.
#[derive(Debug, Clone, Default)]
pub struct Params(Vec<Value>);

impl Params {
    pub fn new(values: Vec<Value>) -> Self {
        Params(values)
    }

    pub fn pop(stack: &mut Stack) -> Self {
        Params(stack.pop().into_array())
    }

    pub fn get(&self, i: usize) -> &Value {
        self.0.get(i).unwrap_or(&NULL)
    }

    pub fn num(&self, i: usize) -> f64 {
        self.get(i).to_number()
    }

    pub fn text(&self, i: usize) -> String {
        self.get(i).to_string()
    }

    pub fn array(&self, i: usize) -> Vec<Value> {
        self.get(i).to_array()
    }

    pub fn flag(&self, i: usize) -> bool {
        self.get(i).to_bool()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }
}

macro_rules! builtins {
    ($($variant:ident => $name:literal,)*) => {
        /// Closed set of builtins; the declaration order is the wire index.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum Builtin {
            $($variant,)*
        }

        const ALL: &[Builtin] = &[$(Builtin::$variant,)*];

        impl Builtin {
            pub fn name(self) -> &'static str {
                match self {
                    $(Builtin::$variant => $name,)*
                }
            }
        }
    };
}

builtins! {
    Jump => "jump",
    JumpIfNil => "jumpifnil",
    JumpIfFalse => "jumpiffalse",
    Explode => "explode",
    Implode => "implode",
    SuperImplode => "superimplode",
    Add => "add",
    Sub => "sub",
    Mul => "mul",
    Div => "div",
    Rem => "rem",
    Length => "length",
    ArrayIndex => "arrayindex",
    ArraySlice => "arrayslice",
    Concat => "concat",
    BoolAnd => "booland",
    BoolOr => "boolor",
    BoolXor => "boolxor",
    InArray => "inarray",
    StrLike => "strlike",
    Equal => "equal",
    NotEqual => "notequal",
    Greater => "greater",
    GreaterEqual => "greaterequal",
    Less => "less",
    LessEqual => "lessequal",
    BoolNot => "boolnot",
    VarExists => "varexists",
    RandomInt => "random_int",
    RandomFloat => "random_float",
    WordDiff => "word_diff",
    Dist => "dist",
    Sin => "sin",
    Cos => "cos",
    Tan => "tan",
    Asin => "asin",
    Acos => "acos",
    Atan => "atan",
    Atan2 => "atan2",
    Sqrt => "sqrt",
    Sum => "sum",
    Mult => "mult",
    Pow => "pow",
    Min => "min",
    Max => "max",
    Split => "split",
    Join => "join",
    Type => "type",
    Bool => "bool",
    Num => "num",
    Str => "str",
    Floor => "floor",
    Ceil => "ceil",
    Round => "round",
    Abs => "abs",
    Append => "append",
    Index => "index",
    Lower => "lower",
    Upper => "upper",
    Camel => "camel",
    Replace => "replace",
    JsonEncode => "json_encode",
    JsonDecode => "json_decode",
    JsonValid => "json_valid",
    B64Encode => "b64_encode",
    B64Decode => "b64_decode",
    Lpad => "lpad",
    Rpad => "rpad",
    Hex => "hex",
    Filter => "filter",
    Matches => "matches",
    ClockTime => "clocktime",
    Reverse => "reverse",
    Sort => "sort",
    Bytes => "bytes",
    FromBytes => "frombytes",
    Merge => "merge",
    Update => "update",
    Insert => "insert",
    Delete => "delete",
    Lerp => "lerp",
    RandomElement => "random_element",
    Hash => "hash",
    Object => "object",
    Array => "array",
    Keys => "keys",
    Values => "values",
    Pairs => "pairs",
    Interleave => "interleave",
    Unique => "unique",
    Union => "union",
    Intersection => "intersection",
    Difference => "difference",
    SymmetricDifference => "symmetric_difference",
    IsDisjoint => "is_disjoint",
    IsSubset => "is_subset",
    IsSuperset => "is_superset",
    Count => "count",
    Find => "find",
    Flatten => "flatten",
    SmoothStep => "smoothstep",
    Sinh => "sinh",
    Cosh => "cosh",
    Tanh => "tanh",
    Sign => "sign",
    Ascii => "ascii",
    Char => "char",
    BeginsWith => "beginswith",
    EndsWith => "endswith",
    NumericString => "numeric_string",
    Time => "time",
    Date => "date",
    RandomElements => "random_elements",
    Match => "match",
    Splice => "splice",
    Uuid => "uuid",
    BitwiseAnd => "bitwise_and",
    BitwiseOr => "bitwise_or",
    BitwiseXor => "bitwise_xor",
    BitwiseNot => "bitwise_not",
    Trim => "trim",
    Chunk => "chunk",
    Fmod => "fmod",
    Modf => "modf",
    Log => "log",
    Normalize => "normalize",
    ToBase => "to_base",
    FromBase => "from_base",
    Timestamp => "timestamp",
    EpochNow => "epochnow",
    FromEpoch => "fromepoch",
    ToEpoch => "toepoch",
    Sorted => "sorted",
    RandomWeighted => "random_weighted",
    Glob => "glob",
    EnvGet => "env_get",
    FileExists => "file_exists",
    FileRead => "file_read",
    FileWrite => "file_write",
    FileAppend => "file_append",
    FileDelete => "file_delete",
    FileCopy => "file_copy",
    FileMove => "file_move",
    FileType => "file_type",
    FileStat => "file_stat",
    FileGlob => "file_glob",
    DirCreate => "dir_create",
    DirDelete => "dir_delete",
    DirList => "dir_list",
}

impl Builtin {
    pub fn from_index(index: i64) -> Option<Builtin> {
        ALL.get(usize::try_from(index).ok()?).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn all() -> &'static [Builtin] {
        ALL
    }

    /// Builtins that reach the file system or the process environment.
    pub fn is_sandboxed(self) -> bool {
        use Builtin::*;
        matches!(
            self,
            EnvGet
                | FileExists
                | FileRead
                | FileWrite
                | FileAppend
                | FileDelete
                | FileCopy
                | FileMove
                | FileType
                | FileStat
                | FileGlob
                | DirCreate
                | DirDelete
                | DirList
        )
    }

    pub fn call(self, ctx: &mut Context) -> VmResult<()> {
        if operators::call(self, ctx)? {
            return Ok(());
        }
        let params = Params::pop(ctx.stack);
        let result = self.apply(ctx, &params)?;
        ctx.stack.push(result);
        Ok(())
    }

    fn apply(self, ctx: &mut Context, p: &Params) -> VmResult<Value> {
        use Builtin::*;
        let value = match self {
            RandomInt => random::random_int(ctx, p),
            RandomFloat => random::random_float(ctx, p),
            RandomElement => random::random_element(ctx, p),
            RandomElements => random::random_elements(ctx, p),
            RandomWeighted => random::random_weighted(ctx, p),
            Uuid => random::uuid(ctx),

            WordDiff => string::word_diff(p),
            Split => string::split(p),
            Join => string::join(p),
            Lower => Value::String(p.text(0).to_lowercase()),
            Upper => Value::String(p.text(0).to_uppercase()),
            Camel => string::camel(p),
            Replace => string::replace(p),
            Lpad => string::pad(ctx, p, true),
            Rpad => string::pad(ctx, p, false),
            Filter => string::filter(p),
            Matches => string::matches(p),
            Match => string::first_match(p),
            Ascii => string::ascii(p),
            Char => string::char_code(p),
            BeginsWith => Value::Bool(p.text(0).starts_with(&p.text(1))),
            EndsWith => Value::Bool(p.text(0).ends_with(&p.text(1))),
            NumericString => string::numeric_string(p),
            Trim => string::trim(p),
            Glob => string::glob(p),

            Dist => math::dist(p),
            Sin => math::unary(p, f64::sin),
            Cos => math::unary(p, f64::cos),
            Tan => math::unary(p, f64::tan),
            Asin => math::unary(p, f64::asin),
            Acos => math::unary(p, f64::acos),
            Atan => math::unary(p, f64::atan),
            Sinh => math::unary(p, f64::sinh),
            Cosh => math::unary(p, f64::cosh),
            Tanh => math::unary(p, f64::tanh),
            Sqrt => math::unary(p, f64::sqrt),
            Floor => math::unary(p, f64::floor),
            Ceil => math::unary(p, f64::ceil),
            Round => math::unary(p, f64::round),
            Abs => math::unary(p, f64::abs),
            Atan2 => Value::from(p.num(0).atan2(p.num(1))),
            Pow => Value::from(p.num(0).powf(p.num(1))),
            Sum => math::fold(p, 0.0, |acc, n| acc + n),
            Mult => math::fold(p, 1.0, |acc, n| acc * n),
            Min => math::extreme(p, f64::min),
            Max => math::extreme(p, f64::max),
            Lerp => math::lerp(p),
            SmoothStep => math::smoothstep(p),
            Sign => Value::from(if p.num(0).is_sign_negative() { -1.0 } else { 1.0 }),
            Fmod => Value::from(p.num(0) % p.num(1)),
            Modf => math::modf(p),
            Log => math::log(p),
            Normalize => math::normalize(p),

            Type => Value::from(p.get(0).type_name()),
            Bool => Value::Bool(p.flag(0)),
            Num => Value::from(p.num(0)),
            Str => Value::String(p.text(0)),
            JsonEncode => encoding::json_encode(p),
            JsonDecode => encoding::json_decode(ctx, p)?,
            JsonValid => encoding::json_valid(p),
            B64Encode => encoding::b64_encode(p),
            B64Decode => encoding::b64_decode(ctx, p),
            Hex => encoding::hex(ctx, p),
            Bytes => encoding::bytes(p),
            FromBytes => encoding::from_bytes(p),
            Hash => encoding::hash(p),
            ToBase => encoding::to_base(ctx, p),
            FromBase => encoding::from_base(ctx, p),

            Append => array::append(p),
            Index => array::index(p),
            Reverse => array::reverse(p),
            Sort => array::sort(p),
            Sorted => array::sorted(p),
            Merge => array::append(p),
            Update => array::update(ctx, p),
            Insert => array::insert(ctx, p),
            Delete => array::delete(ctx, p),
            Object => array::object(p),
            Array => array::array(p),
            Keys => array::keys(p),
            Values => array::values(p),
            Pairs => array::pairs(p),
            Interleave => array::interleave(ctx, p),
            Unique => array::unique(p),
            Count => array::count(ctx, p),
            Find => array::find(p),
            Flatten => array::flatten(p),
            Splice => array::splice(ctx, p),
            Chunk => array::chunk(ctx, p),

            Union => sets::union(ctx, p),
            Intersection => sets::intersection(ctx, p),
            Difference => sets::difference(ctx, p),
            SymmetricDifference => sets::symmetric_difference(ctx, p),
            IsDisjoint => sets::is_disjoint(ctx, p),
            IsSubset => sets::is_subset(ctx, p),
            IsSuperset => sets::is_superset(ctx, p),

            ClockTime => time::clocktime(p),
            Time => time::time(ctx, p),
            Date => time::date(ctx, p),
            Timestamp => time::timestamp(p),
            EpochNow => time::epochnow(),
            FromEpoch => time::fromepoch(p),
            ToEpoch => time::toepoch(p),

            EnvGet => fs::env_get(p),
            FileExists => fs::file_exists(p),
            FileRead => fs::file_read(p),
            FileWrite => fs::file_write(p, false),
            FileAppend => fs::file_write(p, true),
            FileDelete => fs::file_delete(p),
            FileCopy => fs::file_copy(p),
            FileMove => fs::file_move(p),
            FileType => fs::file_type(p),
            FileStat => fs::file_stat(p),
            FileGlob => fs::file_glob(p),
            DirCreate => fs::dir_create(p),
            DirDelete => fs::dir_delete(p),
            DirList => fs::dir_list(p),

            Jump | JumpIfNil | JumpIfFalse | Explode | Implode | SuperImplode | Add | Sub | Mul | Div | Rem
            | Length | ArrayIndex | ArraySlice | Concat | BoolAnd | BoolOr | BoolXor | InArray | StrLike
            | Equal | NotEqual | Greater | GreaterEqual | Less | LessEqual | BoolNot | VarExists
            | BitwiseAnd | BitwiseOr | BitwiseXor | BitwiseNot => Value::Null,
        };
        Ok(value)
    }
}
