//! Python AST annotation rules.
//!
//! One rule per node type; where a type needs both structural grouping and
//! plain annotation, both live in the same rule. `arguments` is the
//! exception: the Python 3 shape is tried before the Python 2 fallback.
use crate::mapping::{annotate_type, annotate_type_token, map_ast, FieldRoles, Mapping};
use crate::op::{ObjectOp, Op, Repeated};
use crate::uast::{Role as R, Role, KEY_ROLES, KEY_TOKEN, KEY_TYPE};

const FUNC_BODY: &[Role] = &[R::Function, R::Declaration, R::Body];
const FUNC_DECORATORS: &[Role] = &[R::Function, R::Declaration, R::Incomplete];
const IMPORT_NAMES: &[Role] = &[R::Import, R::Pathname, R::Identifier, R::Incomplete];

// ---- helpers ----

/// Synthesized node hosting a list (or other child) under its own roles.
fn group(typ: &str, roles: &[Role], fields: ObjectOp) -> Op {
    Op::obj(ObjectOp::new()
        .field(KEY_TYPE, Op::is(typ))
        .field(KEY_ROLES, Op::roles(roles))
        .merge(fields))
}

/// Grouping node holding one captured variable under the same name.
fn group_var(typ: &str, roles: &[Role], var: &str) -> Op {
    group(typ, roles, ObjectOp::new().field(var, Op::var(var)))
}

/// `map_ast` plus plain field annotations on the same type.
fn map_annotated(
    typ: &str,
    native: ObjectOp,
    norm: ObjectOp,
    fields: FieldRoles,
    roles: &[Role],
) -> Mapping {
    let (field_native, field_norm) = fields.into_ops();
    map_ast(typ, native.merge(field_native), norm.merge(field_norm), roles)
}

fn function_def(typ: &str, roles: &[Role]) -> Mapping {
    map_ast(
        typ,
        ObjectOp::new()
            .field("decorator_list", Op::var("decors"))
            .field("body", Op::var("body_stmts"))
            .field("name", Op::var("name")),
        ObjectOp::new()
            .field("decorator_list", group(
                "FunctionDef.decorators",
                FUNC_DECORATORS,
                ObjectOp::new().field("decorators", Op::var("decors")),
            ))
            .field("body", group_var("FunctionDef.body", FUNC_BODY, "body_stmts"))
            .field(KEY_TOKEN, Op::var("name")),
        roles,
    )
}

fn with_stmt(typ: &str, token: &str, roles: &[Role]) -> Mapping {
    map_annotated(
        typ,
        ObjectOp::new()
            .field("body", Op::var("body_stmts"))
            .field("items", Op::var("itms")),
        ObjectOp::new()
            .field("body", group_var(
                &format!("{typ}.body"),
                &[R::Block, R::Scope, R::Body, R::Incomplete],
                "body_stmts",
            ))
            .field("items", group(
                &format!("{typ}.items"),
                &[R::Block, R::Scope, R::Incomplete],
                ObjectOp::new().field("items", Op::var("itms")),
            )),
        FieldRoles::new().add(KEY_TOKEN, token),
        roles,
    )
}

fn loop_stmt(typ: &str, token: &str, main: Role, fields: FieldRoles, roles: &[Role]) -> Mapping {
    map_annotated(
        typ,
        ObjectOp::new()
            .field("body", Op::var("body_stmts"))
            .field("orelse", Op::var("else_stmts")),
        ObjectOp::new()
            .field("body", group_var(&format!("{typ}.body"), &[main, R::Body, R::Then], "body_stmts"))
            .field("orelse", group(
                &format!("{typ}.orelse"),
                &[main, R::Body, R::Else],
                ObjectOp::new()
                    .field("else_stmts", Op::var("else_stmts"))
                    .field(KEY_TOKEN, Op::is("else")),
            )),
        fields.add(KEY_TOKEN, token),
        roles,
    )
}

fn arguments(py3: bool) -> Mapping {
    const ARG: &[Role] = &[R::Function, R::Declaration, R::Argument, R::Name, R::Identifier];
    const DEFAULT: &[Role] = &[R::Function, R::Declaration, R::ArgsList, R::Value, R::Default];
    const KWARG: &[Role] = &[R::Function, R::Declaration, R::ArgsList, R::Map, R::Name, R::Identifier];
    const VARARG: &[Role] = &[R::Function, R::Declaration, R::ArgsList, R::Name, R::Identifier];

    let fields = FieldRoles::new()
        .arr("args", ARG)
        .arr("defaults", DEFAULT);
    let fields = if py3 {
        fields
            .arr("kw_defaults", &[R::Function, R::Declaration, R::ArgsList, R::Map, R::Value, R::Default])
            .arr("kwonlyargs", KWARG)
            .opt("kwarg", KWARG)
            .opt("vararg", VARARG)
    } else {
        // python 2 names these with plain strings, which cannot carry roles
        fields.opt("kwarg", &[]).opt("vararg", &[])
    };
    let name = if py3 { "annotate:arguments(py3)" } else { "annotate:arguments(py2)" };
    annotate_type("arguments", fields, &[R::Function, R::Declaration, R::Argument, R::Incomplete])
        .named(name)
}

// ---- rules ----

pub fn annotations() -> Vec<Mapping> {
    let mut rules = vec![annotate_type("Module", FieldRoles::new(), &[R::File, R::Module])];
    rules.extend(operators());
    rules.extend(expressions());
    rules.extend(statements());
    rules.extend(definitions());
    rules.extend(imports());
    rules
}

fn operators() -> Vec<Mapping> {
    vec![
        // comparison
        annotate_type_token("Eq", "==", &[R::Operator, R::Relational, R::Equal]),
        annotate_type_token("NotEq", "!=", &[R::Operator, R::Relational, R::Not, R::Equal]),
        annotate_type_token("Lt", "<", &[R::Operator, R::Relational, R::LessThan]),
        annotate_type_token("LtE", "<=", &[R::Operator, R::Relational, R::LessThanOrEqual]),
        annotate_type_token("Gt", ">", &[R::Operator, R::Relational, R::GreaterThan]),
        annotate_type_token("GtE", ">=", &[R::Operator, R::Relational, R::GreaterThanOrEqual]),
        annotate_type_token("Is", "is", &[R::Operator, R::Relational, R::Identical]),
        annotate_type_token("IsNot", "is not", &[R::Operator, R::Relational, R::Not, R::Identical]),
        annotate_type_token("In", "in", &[R::Operator, R::Relational, R::Contains]),
        annotate_type_token("NotIn", "not in", &[R::Operator, R::Relational, R::Not, R::Contains]),
        // arithmetic
        annotate_type_token("Add", "+", &[R::Operator, R::Arithmetic, R::Add]),
        annotate_type_token("Sub", "-", &[R::Operator, R::Arithmetic, R::Substract]),
        annotate_type_token("Mult", "*", &[R::Operator, R::Arithmetic, R::Multiply]),
        annotate_type_token("MatMult", "@", &[R::Operator, R::Arithmetic, R::Multiply, R::Incomplete]),
        annotate_type_token("Div", "/", &[R::Operator, R::Arithmetic, R::Divide]),
        annotate_type_token("Mod", "%", &[R::Operator, R::Arithmetic, R::Modulo]),
        annotate_type_token("FloorDiv", "//", &[R::Operator, R::Arithmetic, R::Divide, R::Incomplete]),
        annotate_type_token("Pow", "**", &[R::Operator, R::Arithmetic, R::Incomplete]),
        // bitwise
        annotate_type_token("LShift", "<<", &[R::Operator, R::Bitwise, R::LeftShift]),
        annotate_type_token("RShift", ">>", &[R::Operator, R::Bitwise, R::RightShift]),
        annotate_type_token("BitOr", "|", &[R::Operator, R::Bitwise, R::Or]),
        annotate_type_token("BitXor", "^", &[R::Operator, R::Bitwise, R::Xor]),
        annotate_type_token("BitAnd", "&", &[R::Operator, R::Bitwise, R::And]),
        // boolean: prefix nodes in the AST, so no Binary role
        annotate_type_token("And", "and", &[R::Operator, R::Boolean, R::And]),
        annotate_type_token("Or", "or", &[R::Operator, R::Boolean, R::Or]),
        annotate_type_token("Not", "not", &[R::Operator, R::Boolean, R::Not]),
        annotate_type("UnaryOp", FieldRoles::new(), &[R::Operator, R::Unary, R::Expression]),
        // unary
        annotate_type_token("Invert", "~", &[R::Operator, R::Unary, R::Bitwise, R::Not]),
        annotate_type_token("UAdd", "+", &[R::Operator, R::Unary, R::Positive]),
        annotate_type_token("USub", "-", &[R::Operator, R::Unary, R::Negative]),
    ]
}

fn expressions() -> Vec<Mapping> {
    const LITERAL: &[Role] = &[R::Literal, R::Expression, R::Primitive];
    let literal = |extra: Role| {
        let mut roles = LITERAL.to_vec();
        roles.push(extra);
        roles
    };
    vec![
        annotate_type("Set", FieldRoles::new(), &literal(R::Set)),
        annotate_type("List", FieldRoles::new(), &literal(R::List)),
        annotate_type("Tuple", FieldRoles::new(), &literal(R::Tuple)),
        annotate_type("Expression", FieldRoles::new(), &[R::Expression]),
        annotate_type("Expr", FieldRoles::new(), &[R::Expression]),
        annotate_type("BoolOp", FieldRoles::new(), &[R::Literal, R::Boolean, R::Incomplete]),
        annotate_type_token("Ellipsis", "...", &[R::Identifier, R::Incomplete]),
        annotate_type("Subscript", FieldRoles::new(), &[R::Expression, R::Incomplete]),
        annotate_type("Index", FieldRoles::new(), &[R::Expression, R::Incomplete]),
        annotate_type("Slice", FieldRoles::new(), &[R::Expression, R::Incomplete]),
        annotate_type("ExtSlice", FieldRoles::new(), &[R::Expression, R::Incomplete]),
        annotate_type(
            "Name",
            FieldRoles::new().rename("id", KEY_TOKEN),
            &[R::Identifier, R::Expression],
        ),
        // a.b.c: the object side of every attribute is qualified
        annotate_type(
            "Attribute",
            FieldRoles::new().rename("attr", KEY_TOKEN).roles("value", &[R::Qualified]),
            &[R::Identifier, R::Expression],
        ),
        annotate_type(
            "BinOp",
            FieldRoles::new()
                .roles("left", &[R::Expression, R::Binary, R::Left])
                .roles("right", &[R::Expression, R::Binary, R::Right])
                .roles("op", &[R::Binary]),
            &[R::Expression, R::Binary],
        ),
        annotate_type("Str", FieldRoles::new().rename("s", KEY_TOKEN), &literal(R::String)),
        annotate_type("Bytes", FieldRoles::new().rename("s", KEY_TOKEN), &literal(R::ByteString)),
        annotate_type("StringLiteral", FieldRoles::new().rename("s", KEY_TOKEN), &literal(R::String)),
        annotate_type("BoolLiteral", FieldRoles::new().rename("LiteralValue", KEY_TOKEN), &literal(R::Boolean)),
        annotate_type_token("NoneLiteral", "None", &literal(R::Null)),
        annotate_type("Num", FieldRoles::new().rename("n", KEY_TOKEN), &literal(R::Number)),
        annotate_type(
            "Dict",
            FieldRoles::new()
                .arr("keys", &[R::Map, R::Key])
                .arr("values", &[R::Map, R::Value]),
            &literal(R::Map),
        ),
        annotate_type(
            "JoinedStr",
            FieldRoles::new(),
            &[R::Expression, R::Literal, R::Primitive, R::String, R::Incomplete],
        ),
        annotate_type("FormattedValue", FieldRoles::new(), &[R::Expression, R::Incomplete]),
        annotate_type(
            "IfExp",
            FieldRoles::new()
                .roles("body", &[R::If, R::Body, R::Then])
                .roles("test", &[R::If, R::Condition])
                .roles("orelse", &[R::If, R::Body, R::Else]),
            &[R::If, R::Expression],
        ),
        annotate_type("ListComp", FieldRoles::new(), &[R::List, R::For, R::Expression]),
        annotate_type("DictComp", FieldRoles::new(), &[R::Map, R::For, R::Expression]),
        annotate_type("SetComp", FieldRoles::new(), &[R::Set, R::For, R::Expression]),
        annotate_type(
            "comprehension",
            FieldRoles::new()
                .arr("ifs", &[R::If, R::Condition])
                .roles("iter", &[R::For, R::Update, R::Statement])
                .roles("target", &[R::For, R::Expression]),
            &[R::For, R::Iterator, R::Expression, R::Incomplete],
        ),
        annotate_type(
            "Call",
            FieldRoles::new()
                .arr("args", &[R::Function, R::Call, R::Positional, R::Argument, R::Name])
                .roles("func", &[R::Call, R::Callee])
                .arr("keywords", &[R::Function, R::Call, R::Argument]),
            &[R::Function, R::Call, R::Expression],
        ),
        annotate_type(
            "keyword",
            FieldRoles::new()
                .roles("value", &[R::Argument, R::Value])
                .rename("arg", KEY_TOKEN),
            &[R::Name],
        ),
        // `ops` and `comparators` are parallel lists; each gets its own node
        map_annotated(
            "Compare",
            ObjectOp::new()
                .field("ops", Op::var("ops"))
                .field("comparators", Op::var("comparators")),
            ObjectOp::new()
                .field("ops", group_var("Compare.ops", &[R::Expression], "ops"))
                .field("comparators", group_var(
                    "Compare.comparators",
                    &[R::Expression, R::Right],
                    "comparators",
                )),
            FieldRoles::new().roles("left", &[R::Expression, R::Left]),
            &[R::Expression, R::Binary, R::Condition],
        ),
    ]
}

fn statements() -> Vec<Mapping> {
    vec![
        annotate_type_token("Return", "return", &[R::Return, R::Statement]),
        annotate_type_token("Break", "break", &[R::Break, R::Statement]),
        annotate_type_token("Continue", "continue", &[R::Continue, R::Statement]),
        annotate_type_token("Delete", "del", &[R::Statement, R::Incomplete]),
        annotate_type_token("Await", "await", &[R::Statement, R::Incomplete]),
        annotate_type_token("Global", "global", &[R::Statement, R::Visibility, R::World, R::Incomplete]),
        annotate_type_token("Nonlocal", "nonlocal", &[R::Statement, R::Visibility, R::Module, R::Incomplete]),
        annotate_type_token("Yield", "yield", &[R::Statement, R::Return, R::Incomplete]),
        annotate_type_token("YieldFrom", "yield from", &[R::Statement, R::Return, R::Incomplete]),
        annotate_type_token("Pass", "pass", &[R::Noop, R::Statement]),
        annotate_type_token("Assert", "assert", &[R::Assert, R::Statement]),
        annotate_type(
            "Assign",
            FieldRoles::new()
                .arr("targets", &[R::Left])
                .roles("value", &[R::Right]),
            &[R::Binary, R::Expression, R::Assignment],
        ),
        annotate_type(
            "AugAssign",
            FieldRoles::new()
                .roles("op", &[R::Operator])
                .roles("target", &[R::Left])
                .roles("value", &[R::Right]),
            &[R::Binary, R::Expression, R::Operator, R::Assignment],
        ),
        // annotations carry no runtime meaning; they are kept as noops
        annotate_type("AnnAssign", FieldRoles::new(), &[R::Operator, R::Binary, R::Assignment]),
        annotate_type("annotation", FieldRoles::new(), &[R::Annotation, R::Noop]),
        annotate_type("returns", FieldRoles::new(), &[R::Annotation, R::Noop]),
        map_annotated(
            "Try",
            ObjectOp::new()
                .field("body", Op::var("body_stmts"))
                .field("finalbody", Op::var("final_stmts"))
                .field("handlers", Op::var("handlers_list"))
                .field("orelse", Op::var("else_stmts")),
            ObjectOp::new()
                .field("body", group_var("Try.body", &[R::Try, R::Body], "body_stmts"))
                .field("finalbody", group(
                    "Try.finalbody",
                    &[R::Try, R::Finally],
                    ObjectOp::new()
                        .field("final_stmts", Op::var("final_stmts"))
                        .field(KEY_TOKEN, Op::is("finally")),
                ))
                .field("handlers", group(
                    "Try.handlers",
                    &[R::Try, R::Catch],
                    ObjectOp::new()
                        .field("handlers", Op::var("handlers_list"))
                        .field(KEY_TOKEN, Op::is("except")),
                ))
                .field("orelse", group(
                    "Try.else",
                    &[R::Try, R::Else],
                    ObjectOp::new()
                        .field("else_stmts", Op::var("else_stmts"))
                        .field(KEY_TOKEN, Op::is("else")),
                )),
            FieldRoles::new().add(KEY_TOKEN, "try"),
            &[R::Try, R::Statement],
        ),
        // python 2 exception handling
        annotate_type("TryExcept", FieldRoles::new(), &[R::Try, R::Catch, R::Statement]),
        annotate_type("TryFinally", FieldRoles::new(), &[R::Try, R::Finally, R::Statement]),
        annotate_type(
            "ExceptHandler",
            FieldRoles::new().rename("name", KEY_TOKEN),
            &[R::Try, R::Catch, R::Identifier],
        ),
        annotate_type(
            "Raise",
            FieldRoles::new()
                .opt("exc", &[R::Call])
                .add(KEY_TOKEN, "raise"),
            &[R::Throw, R::Statement],
        ),
        with_stmt("With", "with", &[R::Block, R::Scope, R::Statement]),
        with_stmt("AsyncWith", "async with", &[R::Block, R::Scope, R::Statement, R::Incomplete]),
        annotate_type("withitem", FieldRoles::new(), &[R::Identifier, R::Expression, R::Incomplete]),
        map_annotated(
            "If",
            ObjectOp::new()
                .field("body", Op::var("body_stmts"))
                .field("orelse", Op::var("else_stmts")),
            ObjectOp::new()
                .field("body", group_var("If.body", &[R::If, R::Body, R::Then], "body_stmts"))
                .field("orelse", group(
                    "If.orelse",
                    &[R::If, R::Body, R::Else],
                    ObjectOp::new()
                        .field("else_stmts", Op::var("else_stmts"))
                        .field(KEY_TOKEN, Op::is("else")),
                )),
            FieldRoles::new()
                .roles("test", &[R::If, R::Condition])
                .add(KEY_TOKEN, "if"),
            &[R::If, R::Statement],
        ),
        loop_stmt(
            "For",
            "for",
            R::For,
            FieldRoles::new()
                .roles("iter", &[R::For, R::Expression])
                .roles("target", &[R::For, R::Update]),
            &[R::For, R::Iterator, R::Statement],
        ),
        loop_stmt(
            "AsyncFor",
            "async for",
            R::For,
            FieldRoles::new()
                .roles("iter", &[R::For, R::Expression])
                .roles("target", &[R::For, R::Update]),
            &[R::For, R::Iterator, R::Statement, R::Incomplete],
        ),
        loop_stmt(
            "While",
            "while",
            R::While,
            FieldRoles::new().roles("test", &[R::While, R::Condition]),
            &[R::While, R::Statement],
        ),
        // python 2 statements, shaped like the python 3 builtin calls
        annotate_type(
            "Exec",
            FieldRoles::new()
                .roles("body", &[R::Call, R::Argument, R::Positional])
                .roles("globals", &[R::Call, R::Argument, R::Positional])
                .roles("locals", &[R::Call, R::Argument, R::Positional])
                .add(KEY_TOKEN, "exec"),
            &[R::Function, R::Call, R::Expression],
        ),
        annotate_type(
            "Print",
            FieldRoles::new()
                .arr("values", &[R::Call, R::Argument, R::Positional])
                .add(KEY_TOKEN, "print"),
            &[R::Function, R::Call, R::Callee, R::Identifier, R::Expression],
        ),
        // comments and blank lines
        annotate_type("SameLineNoops", FieldRoles::new(), &[R::Comment]),
        annotate_type("PreviousNoops", FieldRoles::new().arr("lines", &[R::Noop]), &[R::Noop]),
        annotate_type("RemainderNoops", FieldRoles::new().arr("lines", &[R::Noop]), &[R::Noop]),
        annotate_type("NoopLine", FieldRoles::new().rename("noop_line", KEY_TOKEN), &[R::Noop, R::Comment]),
        annotate_type("NoopSameLine", FieldRoles::new().rename("s", KEY_TOKEN), &[R::Noop, R::Comment]),
    ]
}

fn definitions() -> Vec<Mapping> {
    vec![
        function_def("FunctionDef", &[R::Function, R::Declaration, R::Name, R::Identifier]),
        function_def(
            "AsyncFunctionDef",
            &[R::Function, R::Declaration, R::Name, R::Identifier, R::Incomplete],
        ),
        map_ast(
            "Lambda",
            ObjectOp::new().field("body", Op::var("body_stmts")),
            ObjectOp::new().field("body", group_var("FunctionDef.body", FUNC_BODY, "body_stmts")),
            &[R::Function, R::Declaration, R::Value, R::Anonymous],
        ),
        arguments(true),
        arguments(false),
        map_annotated(
            "ClassDef",
            ObjectOp::new()
                .field("decorator_list", Op::var("decors"))
                .field("body", Op::var("body_stmts"))
                .field("bases", Op::var("bases"))
                .field("name", Op::var("name")),
            ObjectOp::new()
                .field("decorator_list", group(
                    "ClassDef.decorator_list",
                    &[R::Type, R::Declaration, R::Call, R::Incomplete],
                    ObjectOp::new().field("decorators", Op::var("decors")),
                ))
                .field("body", group_var("ClassDef.body", &[R::Type, R::Declaration, R::Body], "body_stmts"))
                .field("bases", group_var("ClassDef.bases", &[R::Type, R::Declaration, R::Base], "bases"))
                .field(KEY_TOKEN, Op::var("name")),
            FieldRoles::new().opt_arr("keywords", &[R::Incomplete]),
            &[R::Type, R::Declaration, R::Identifier, R::Statement],
        ),
    ]
}

fn imports() -> Vec<Mapping> {
    vec![
        map_ast(
            "Import",
            ObjectOp::new().field("names", Op::var("names")),
            ObjectOp::new()
                .field("names", group(
                    "Import.names",
                    IMPORT_NAMES,
                    ObjectOp::new().field("name_list", Op::var("names")),
                ))
                .field(KEY_TOKEN, Op::is("import")),
            &[R::Import, R::Declaration, R::Statement],
        ),
        // `level` becomes the dots of a relative import; the number is kept
        // next to it so either side can rebuild the other
        map_ast(
            "ImportFrom",
            ObjectOp::new()
                .field("module", Op::var("module"))
                .field("level", Op::custom(Repeated::dots(Op::var("level"), Op::var("origlevel"))))
                .field("names", Op::var("names")),
            ObjectOp::new()
                .field("names", group(
                    "ImportFrom.names",
                    IMPORT_NAMES,
                    ObjectOp::new().field("name_list", Op::var("names")),
                ))
                .field("level", group(
                    "ImportFrom.level",
                    &[R::Import, R::Incomplete],
                    ObjectOp::new().field(KEY_TOKEN, Op::var("level")),
                ))
                .field("module", group(
                    "ImportFrom.module",
                    &[R::Import, R::Pathname, R::Identifier],
                    ObjectOp::new().field(KEY_TOKEN, Op::var("module")),
                ))
                .field("num_level", Op::var("origlevel")),
            &[R::Import, R::Declaration, R::Statement],
        ),
        map_ast(
            "alias",
            ObjectOp::new()
                .field("asname", Op::var("asname"))
                .field("name", Op::var("name")),
            ObjectOp::new()
                .field("asname", group(
                    "alias.asname",
                    &[R::Import, R::Pathname, R::Identifier, R::Alias],
                    ObjectOp::new().field(KEY_TOKEN, Op::var("asname")),
                ))
                .field(KEY_TOKEN, Op::var("name")),
            &[R::Import, R::Pathname, R::Identifier],
        ),
    ]
}
