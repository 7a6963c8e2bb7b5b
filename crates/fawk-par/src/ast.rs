//! fawk-par - AST node definitions.
//!
//! A parsed AWK program is a flat list of items (user functions and
//! pattern/action rules) in source order. Every node is a tagged
//! variant matched exhaustively by the interpreter; there is no
//! downcasting and no shared ownership inside the tree - the `Program`
//! owns everything and walkers borrow.

use fawk_util::Span;

/// A complete parsed program.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub items: Vec<Item>,
}

impl Program {
    /// Iterates over the function definitions in source order.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(f) => Some(f),
            Item::Rule(_) => None,
        })
    }

    /// Iterates over the rules in source order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.items.iter().filter_map(|item| match item {
            Item::Rule(r) => Some(r),
            Item::Function(_) => None,
        })
    }
}

/// Top-level item.
#[derive(Debug, Clone)]
pub enum Item {
    /// User function definition.
    Function(Function),

    /// Pattern/action rule.
    Rule(Rule),
}

/// User function definition.
///
/// The name is fully namespace-qualified by the parser. Parameters
/// beyond the supplied arguments act as local variables (the
/// conventional "extra spaces in the parameter list" idiom).
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// One pattern/action rule.
///
/// `action` is `None` for a pattern with no action, which prints `$0`.
#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: Pattern,
    pub action: Option<Vec<Stmt>>,
    pub span: Span,
}

/// Rule guard.
#[derive(Debug, Clone)]
pub enum Pattern {
    Begin,
    End,
    BeginFile,
    EndFile,

    /// Empty pattern: matches every record.
    Always,

    /// Expression pattern (a bare regex literal matches `$0`).
    Expr(Expr),

    /// Range pattern `start, stop`. Activates at the first record
    /// matching `start`, deactivates after the first record matching
    /// `stop`; per-rule activation state lives in the interpreter.
    Range(Expr, Expr),
}

/// Statement.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// `{ ... }`
    Block(Vec<Stmt>),

    /// Expression evaluated for its side effects.
    Expr(Expr),

    /// `print [args] [redirect]`
    Print(PrintStmt),

    /// `printf fmt[, args] [redirect]`
    Printf(PrintStmt),

    If(IfStmt),
    While(WhileStmt),
    DoWhile(DoWhileStmt),
    For(Box<ForStmt>),
    ForIn(ForInStmt),
    Switch(SwitchStmt),

    /// `delete arr` or `delete arr[i, ...]`
    Delete(DeleteStmt),

    Break,
    Continue,
    Next,
    NextFile,

    /// `exit [status]`
    Exit(Option<Expr>),

    /// `return [value]`
    Return(Option<Expr>),
}

/// `print`/`printf` statement body. For `printf`, the first argument
/// is the format string.
#[derive(Debug, Clone)]
pub struct PrintStmt {
    pub args: Vec<Expr>,
    pub redirect: Option<Redirect>,
}

/// Output redirection on `print`/`printf`.
#[derive(Debug, Clone)]
pub struct Redirect {
    pub kind: RedirectKind,
    pub target: Expr,
}

/// Redirection operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// `> target` - truncate on first open.
    File,
    /// `>> target` - append.
    Append,
    /// `| command` - pipe to command.
    Pipe,
    /// `|& command` - coprocess write side.
    Coprocess,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone)]
pub struct DoWhileStmt {
    pub body: Box<Stmt>,
    pub cond: Expr,
}

/// C-style `for (init; cond; update)`.
#[derive(Debug, Clone)]
pub struct ForStmt {
    pub init: Option<Stmt>,
    pub cond: Option<Expr>,
    pub update: Option<Stmt>,
    pub body: Stmt,
}

/// `for (var in array)`.
#[derive(Debug, Clone)]
pub struct ForInStmt {
    pub var: String,
    pub array: String,
    pub body: Box<Stmt>,
}

/// `switch (subject) { case ...: ... default: ... }`.
///
/// Cases are kept in source order; execution falls through to the next
/// case body until a `break`, C-style.
#[derive(Debug, Clone)]
pub struct SwitchStmt {
    pub subject: Expr,
    pub cases: Vec<SwitchCase>,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub label: CaseLabel,
    pub body: Vec<Stmt>,
}

/// A `case` label. gawk restricts labels to constants.
#[derive(Debug, Clone)]
pub enum CaseLabel {
    Num(f64),
    Str(String),
    Regex(String),
    Default,
}

#[derive(Debug, Clone)]
pub struct DeleteStmt {
    pub array: String,
    /// Empty means delete the whole array.
    pub indices: Vec<Expr>,
}

/// Assignable place.
#[derive(Debug, Clone, PartialEq)]
pub enum LValue {
    /// Named variable (namespace-qualified by the parser).
    Var(String),

    /// Field `$expr`.
    Field(Box<Expr>),

    /// Array element `name[i, ...]`.
    Index(String, Vec<Expr>),
}

/// Expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Str(String),

    /// Regex literal. In value position it matches against `$0`; as a
    /// direct argument to the regex-taking builtins, or on the right of
    /// `~`/`!~`, it is the pattern itself.
    Regex(String),

    /// Variable reference.
    Var(String),

    /// Field reference `$expr`.
    Field(Box<Expr>),

    /// Array element `name[i, ...]`; multiple indices join on `SUBSEP`.
    Index(String, Vec<Expr>),

    /// Assignment, including compound forms. Right-associative; yields
    /// the assigned value.
    Assign {
        op: AssignOp,
        target: LValue,
        value: Box<Expr>,
    },

    /// Pre/post increment/decrement.
    IncrDecr {
        op: IncDecOp,
        postfix: bool,
        target: LValue,
    },

    Binary(BinOp, Box<Expr>, Box<Expr>),
    Unary(UnOp, Box<Expr>),

    /// `cond ? then : else`.
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),

    /// Concatenation by juxtaposition, two or more parts.
    Concat(Vec<Expr>),

    /// `subject ~ pattern` / `subject !~ pattern`.
    MatchOp {
        negated: bool,
        subject: Box<Expr>,
        pattern: Box<Expr>,
    },

    /// `key in arr` or `(k1, k2) in arr`.
    In { keys: Vec<Expr>, array: String },

    /// Function call (user or builtin, resolved at run time).
    Call { name: String, args: Vec<Expr> },

    /// Indirect call `@name(args)` or `@(expr)(args)`.
    IndirectCall { target: Box<Expr>, args: Vec<Expr> },

    /// Any `getline` form.
    Getline(GetlineExpr),

    /// Parenthesized expression list of two or more elements. Only
    /// meaningful before `in` or as a `print`/`printf` argument list;
    /// anywhere else the evaluator diagnoses it.
    Group(Vec<Expr>),

    /// Placeholder produced by error recovery; evaluates as
    /// uninitialized.
    Error,
}

/// `getline` in any of its eight forms.
#[derive(Debug, Clone, PartialEq)]
pub struct GetlineExpr {
    /// Target l-value; `None` reads into `$0` and re-splits.
    pub target: Option<LValue>,
    pub source: GetlineSource,
}

/// Where `getline` reads from.
#[derive(Debug, Clone, PartialEq)]
pub enum GetlineSource {
    /// Next record of the main input (updates `NR`/`FNR`).
    Main,
    /// `getline [var] < file`.
    File(Box<Expr>),
    /// `cmd | getline [var]`.
    Command(Box<Expr>),
    /// `cmd |& getline [var]`.
    Coprocess(Box<Expr>),
}

/// Binary operators. `&&`/`||` short-circuit in the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Neg,
    Pos,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

/// Increment/decrement operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDecOp {
    Incr,
    Decr,
}

impl Expr {
    /// Converts this expression to an l-value if it has one.
    pub fn as_lvalue(&self) -> Option<LValue> {
        match self {
            Expr::Var(name) => Some(LValue::Var(name.clone())),
            Expr::Field(index) => Some(LValue::Field(index.clone())),
            Expr::Index(name, indices) => Some(LValue::Index(name.clone(), indices.clone())),
            _ => None,
        }
    }
}
