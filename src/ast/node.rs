//! The AST (spec §3.2): a closed tagged union of node kinds with
//! attached source locations. Unlike the teacher's `NodeData` trait
//! object design (open, extensible, `Arc<dyn NodeData>`), this tree is
//! a plain Rust enum tree — spec §3.1/3.2 describe a *closed* set of
//! variants, and a closed set is exactly what an enum is for. See
//! DESIGN.md for the full rationale.

use super::flags::ModifierFlags;
use super::ids::NodeId;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextRange {
    pub start: u32,
    pub end: u32,
}

impl TextRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

/// A parsed, as-yet-unresolved type annotation, produced by the
/// (out-of-scope) parser. The validator resolves these into `Type`.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeAnnotation {
    Name {
        name: String,
        type_args: Option<Vec<TypeAnnotation>>,
    },
    Array {
        element: Box<TypeAnnotation>,
        length: Option<u64>,
    },
    Map {
        key: Box<TypeAnnotation>,
        value: Box<TypeAnnotation>,
    },
    Set(Box<TypeAnnotation>),
    Weak(String),
    Union(Vec<TypeAnnotation>),
    Nullable(Box<TypeAnnotation>),
    Function {
        params: Vec<TypeAnnotation>,
        ret: Box<TypeAnnotation>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Function(FunctionDecl),
    Class(ClassDecl),
    Enum(EnumDecl),
    TypeAlias(TypeAliasDecl),
    Import(ImportDecl),
    Export(ExportDecl),
    ExternClass(ExternClassDecl),
    /// Only valid when the enclosing file/options allow top-level
    /// statements (spec §6, `allowTopLevelStatements`).
    Statement(Stmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub id: NodeId,
    pub name: String,
    pub ty: TypeAnnotation,
    pub default: Option<Expr>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub id: NodeId,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub return_ty: TypeAnnotation,
    pub body: Block,
    pub modifiers: ModifierFlags,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDecl {
    pub id: NodeId,
    pub params: Vec<Param>,
    pub body: Block,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub id: NodeId,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub return_ty: TypeAnnotation,
    pub body: Block,
    pub modifiers: ModifierFlags,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub id: NodeId,
    pub name: String,
    pub ty: TypeAnnotation,
    /// `Some(_)` when declared `const name = literal` — a discriminant
    /// candidate (spec §4.3).
    pub const_init: Option<Literal>,
    pub init: Option<Expr>,
    pub modifiers: ModifierFlags,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub id: NodeId,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub fields: Vec<FieldDecl>,
    pub constructor: Option<ConstructorDecl>,
    pub methods: Vec<MethodDecl>,
    pub modifiers: ModifierFlags,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: String,
    pub value: Option<Literal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub id: NodeId,
    pub name: String,
    pub members: Vec<EnumMember>,
    pub modifiers: ModifierFlags,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDecl {
    pub id: NodeId,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub aliased: TypeAnnotation,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpecifier {
    pub imported_name: String,
    pub local_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub id: NodeId,
    pub module_path: String,
    pub specifiers: Vec<ImportSpecifier>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportDecl {
    pub id: NodeId,
    pub name: String,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternMethodSig {
    pub name: String,
    pub params: Vec<Param>,
    pub return_ty: TypeAnnotation,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternClassDecl {
    pub id: NodeId,
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<ExternMethodSig>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub id: NodeId,
    pub name: String,
    pub declared_ty: Option<TypeAnnotation>,
    pub init: Option<Expr>,
    pub modifiers: ModifierFlags,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForHead {
    /// `for (init; cond; update)`.
    Classic {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        update: Option<Expr>,
    },
    /// `for (const pattern of expr)`.
    Of {
        binding: ForOfBinding,
        iterable: Expr,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForOfBinding {
    Single(String),
    /// `(key, value)` destructure — spec §11.1 of SPEC_FULL.md.
    KeyValue(String, String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Var(VarDecl),
    Expr(Expr, TextRange),
    Block(Block),
    If {
        cond: Expr,
        then_branch: Block,
        else_branch: Option<Box<Stmt>>,
        range: TextRange,
    },
    While {
        cond: Expr,
        body: Block,
        range: TextRange,
    },
    For {
        head: ForHead,
        body: Block,
        range: TextRange,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
        range: TextRange,
    },
    Return {
        value: Option<Expr>,
        range: TextRange,
    },
    Break(TextRange),
    Continue(TextRange),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Double(f64),
    Bool(bool),
    Str(String),
    Char(char),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
}

impl BinOp {
    pub fn is_compound_assign(self) -> bool {
        matches!(
            self,
            BinOp::AddAssign
                | BinOp::SubAssign
                | BinOp::MulAssign
                | BinOp::DivAssign
                | BinOp::ModAssign
        )
    }

    /// The plain binary operator a compound-assign desugars its RHS
    /// through, per spec §4.2 ("type-checked as the corresponding
    /// binary plus an assignability check").
    pub fn underlying(self) -> BinOp {
        match self {
            BinOp::AddAssign => BinOp::Add,
            BinOp::SubAssign => BinOp::Sub,
            BinOp::MulAssign => BinOp::Mul,
            BinOp::DivAssign => BinOp::Div,
            BinOp::ModAssign => BinOp::Mod,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    PreIncr,
    PreDecr,
    PostIncr,
    PostDecr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedArg {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Expr>,
    pub named: Vec<NamedArg>,
    pub explicit_type_args: Option<Vec<TypeAnnotation>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectLiteralKind {
    /// `{ field: value, ... }`, possibly of an undetermined union member.
    Plain,
    Map,
    Set,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectField {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaParam {
    pub name: String,
    pub ty: Option<TypeAnnotation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LambdaBody {
    Block(Block),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlAttribute {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterpolatedPart {
    Literal(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownTableRow {
    pub conditions: Vec<Expr>,
    pub actions: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownTable {
    pub condition_headers: Vec<String>,
    pub action_headers: Vec<String>,
    pub rows: Vec<MarkdownTableRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Identifier(String),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: CallArgs,
    },
    Member {
        object: Box<Expr>,
        property: String,
        computed: bool,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Array(Vec<Expr>),
    Object {
        kind: ObjectLiteralKind,
        class_name: Option<String>,
        fields: Vec<ObjectField>,
        entries: Vec<(Expr, Expr)>,
    },
    /// `new C(a, b)` / `C(a, b)` constructor-style call (spec §3.2).
    PositionalObject {
        class_name: String,
        type_args: Option<Vec<TypeAnnotation>>,
        args: CallArgs,
    },
    Range {
        start: Box<Expr>,
        end: Box<Expr>,
        inclusive: bool,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    InterpolatedString(Vec<InterpolatedPart>),
    TaggedTemplate {
        tag: Box<Expr>,
        parts: Vec<InterpolatedPart>,
    },
    Lambda {
        params: Vec<LambdaParam>,
        return_ty: Option<TypeAnnotation>,
        body: LambdaBody,
        is_short_form: bool,
    },
    TrailingLambda {
        call: Box<Expr>,
        lambda: Box<Expr>,
    },
    /// `.MEMBER` shorthand, resolved against the expected enum type.
    EnumShorthand(String),
    Is {
        value: Box<Expr>,
        type_ann: TypeAnnotation,
    },
    XmlCall {
        tag: String,
        attributes: Vec<XmlAttribute>,
        children: Vec<Expr>,
    },
    MarkdownTable(MarkdownTable),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub range: TextRange,
}

/// Resolved-type annotations attached out-of-band by the validator,
/// keyed by `NodeId` rather than inlined on `Expr`, so the AST stays a
/// pure syntax tree and the context (spec §3.3) owns inferred types.
pub type InferredTypes = std::collections::HashMap<NodeId, Type>;
