use super::scanner::{Lexed, Statement, split_statements, split_top_level};
use super::{
    ClassEntity, ClassKind, Entity, FunctionEntity, FunctionForm, FunctionRole, Param,
    ParseAnomaly,
};

const CLASS_HEAD: &str = r"^(?P<abstract>abstract\s+)?class\b\s*(?P<name>[A-Za-z_$][\w$]*)?";
const INTERFACE_HEAD: &str = r"^interface\s+(?P<name>[A-Za-z_$][\w$]*)";
const TYPE_ALIAS_HEAD: &str = r"^type\s+(?P<name>[A-Za-z_$][\w$]*)";
const FUNCTION_HEAD: &str =
    r"^(?P<async>async\s+)?function\b\s*(?P<star>\*)?\s*(?P<name>[A-Za-z_$][\w$]*)?";
const VARIABLE_HEAD: &str = r"^(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)";
const WRAPPER_CALL: &str = r"^(?:React\.)?(?P<wrapper>memo|forwardRef)\s*(?:<[^(]*>)?\s*\(";
const ASYNC_PREFIX: &str = r"^async\b\s*";
const SINGLE_PARAM_ARROW: &str = r"^(?P<param>[A-Za-z_$][\w$]*)\s*=>";
const METHOD_MEMBER: &str = r"^(?:@[\w$.]+(?:\([^)]*\))?\s+)*(?:(?:public|private|protected|static|async|readonly|abstract|override|declare|get|set)\s+)*\*?\s*(?P<name>#?[A-Za-z_$][\w$]*)\s*\??\s*(?:<[^(]*>)?\s*\(";
const ARROW_MEMBER: &str = r"^(?:(?:public|private|protected|static|readonly|override)\s+)*(?P<name>#?[A-Za-z_$][\w$]*)\s*[?!]?\s*(?::[^=]+)?=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*(?::[^=]*)?=>";
const DECORATORS: &str = r"^(?:@[\w$.]+(?:\([^)]*\))?\s*)+";
const HOOK_CALL: &str = r"(?:^|[^\w$])(?P<name>use[A-Z0-9][\w$]*)\s*(?:<[^()]*>)?\s*\(";
const HOOK_NAME: &str = r"^use[A-Z0-9][\w$]*$";
const MARKUP_RETURN: &str =
    r"(?:\breturn\b|=>|\?|:|&&|\|\|)\s*\(?\s*<\s*(?:[A-Za-z][\w.:-]*|>)|\bcreateElement\s*\(";
const COMPONENT_BASE: &str = r"^(?:React\.)?(?:Pure)?Component$";
const EXTENDS_WORD: &str = r"\bextends\b";
const IMPLEMENTS_WORD: &str = r"\bimplements\b";

pattern!(class_head, CLASS_HEAD);
pattern!(interface_head, INTERFACE_HEAD);
pattern!(type_alias_head, TYPE_ALIAS_HEAD);
pattern!(function_head, FUNCTION_HEAD);
pattern!(variable_head, VARIABLE_HEAD);
pattern!(wrapper_call, WRAPPER_CALL);
pattern!(async_prefix, ASYNC_PREFIX);
pattern!(single_param_arrow, SINGLE_PARAM_ARROW);
pattern!(method_member, METHOD_MEMBER);
pattern!(arrow_member, ARROW_MEMBER);
pattern!(decorators, DECORATORS);
pattern!(hook_call, HOOK_CALL);
pattern!(hook_name, HOOK_NAME);
pattern!(markup_return, MARKUP_RETURN);
pattern!(component_base, COMPONENT_BASE);
pattern!(extends_word, EXTENDS_WORD);
pattern!(implements_word, IMPLEMENTS_WORD);

/// Names that look like members but are statements or operators.
const NON_MEMBER_WORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "new", "typeof", "delete", "void",
    "await", "yield", "super", "this",
];

const PARAM_MODIFIERS: &[&str] = &["public", "private", "protected", "readonly", "override"];

/// Class component lifecycle method names.
const LIFECYCLE_METHODS: &[&str] = &[
    "componentDidMount",
    "componentDidUpdate",
    "componentWillUnmount",
    "shouldComponentUpdate",
    "getSnapshotBeforeUpdate",
    "componentDidCatch",
    "getDerivedStateFromProps",
    "getDerivedStateFromError",
    "render",
];

/// Recognise a class-like or function-like declaration.
///
/// `Ok(None)` means the statement is well-formed but declares nothing of interest
/// (a plain variable, an expression, a bodiless overload signature). `Err` means it starts
/// like a declaration but its shape could not be recovered.
pub fn classify_declaration(stmt: &Statement) -> Result<Option<Entity>, ParseAnomaly> {
    let lexed = Lexed::new(&stmt.text);
    let (start, exported, default_export) = strip_modifiers(&lexed.text);
    let decl = Decl {
        lexed: &lexed,
        code: lexed.code_only(),
        line: stmt.line,
        exported,
        default_export,
    };
    let rest = &lexed.text[start..];

    if let Some(caps) = class_head().captures(rest) {
        let whole_end = caps.get(0).map_or(0, |m| m.end());
        // `class extends Base` has no name; the optional group swallowed the keyword.
        let (name, head_end) = match caps.name("name") {
            Some(m) if !matches!(m.as_str(), "extends" | "implements") => {
                (Some(m.as_str()), start + m.end())
            }
            Some(m) => (None, start + m.start()),
            None => (None, start + whole_end),
        };
        let is_abstract = caps.name("abstract").is_some();
        return decl
            .class_like(name, ClassKind::Class, is_abstract, head_end)
            .map(Some);
    }

    if let Some(caps) = interface_head().captures(rest) {
        let head_end = start + caps.get(0).map_or(0, |m| m.end());
        return decl
            .class_like(caps.name("name").map(|m| m.as_str()), ClassKind::Interface, false, head_end)
            .map(Some);
    }

    if let Some(caps) = type_alias_head().captures(rest) {
        let head_end = start + caps.get(0).map_or(0, |m| m.end());
        return decl.type_alias(&caps["name"], head_end);
    }

    if let Some(caps) = function_head().captures(rest) {
        let head_end = start + caps.get(0).map_or(0, |m| m.end());
        let name = match caps.name("name") {
            Some(m) => m.as_str().to_owned(),
            None if default_export => "default".to_owned(),
            None => return Err(decl.anomaly("function declaration without a name")),
        };
        let is_async = caps.name("async").is_some();
        return decl.function_from_parens(name, FunctionForm::Declaration, is_async, head_end, None);
    }

    if let Some(caps) = variable_head().captures(rest) {
        let head_end = start + caps.get(0).map_or(0, |m| m.end());
        let Some(eq) = decl.assignment(head_end) else {
            return Ok(None);
        };
        let value = skip_ws(&lexed.text, eq + 1);
        return decl.function_value(caps["name"].to_owned(), value, None);
    }

    if default_export {
        return decl.function_value("default".to_owned(), start, None);
    }

    Ok(None)
}

/// Consume leading `export`, `default` and `declare` keywords.
/// Returns the offset of the first remaining token and the two export flags.
fn strip_modifiers(text: &str) -> (usize, bool, bool) {
    let mut pos = 0;
    let mut exported = false;
    let mut default_export = false;
    loop {
        let rest = &text[pos..];
        let word_len = rest
            .bytes()
            .position(|b| !is_ident_byte(b))
            .unwrap_or(rest.len());
        match &rest[..word_len] {
            "export" if !exported => exported = true,
            "default" if exported && !default_export => default_export = true,
            "declare" => {}
            _ => break,
        }
        pos = skip_ws(text, pos + word_len);
    }
    (pos, exported, default_export)
}

/// Per-statement recognition state.
struct Decl<'a> {
    lexed: &'a Lexed,
    /// `lexed.text` with literal contents blanked; same byte offsets.
    code: String,
    line: usize,
    exported: bool,
    default_export: bool,
}

impl Decl<'_> {
    fn text(&self) -> &str {
        &self.lexed.text
    }

    fn anomaly(&self, message: impl Into<String>) -> ParseAnomaly {
        ParseAnomaly {
            line: self.line,
            message: message.into(),
        }
    }

    fn class_like(
        &self,
        name: Option<&str>,
        kind: ClassKind,
        is_abstract: bool,
        head_end: usize,
    ) -> Result<Entity, ParseAnomaly> {
        let name = match name {
            Some(n) => n.to_owned(),
            None if self.default_export => "default".to_owned(),
            None => return Err(self.anomaly("class declaration without a name")),
        };
        let open = self
            .lexed
            .find_top_level(head_end, b'{')
            .ok_or_else(|| self.anomaly(format!("declaration of {name} has no body")))?;
        let (extends, implements) = parse_heritage(&self.text()[head_end..open]);
        self.class_body(name, kind, is_abstract, extends, implements, open)
    }

    /// `type X = { ... }` becomes a class-like node; any other alias declares nothing.
    fn type_alias(&self, name: &str, head_end: usize) -> Result<Option<Entity>, ParseAnomaly> {
        let Some(eq) = self.assignment(head_end) else {
            return Ok(None);
        };
        let open = skip_ws(self.text(), eq + 1);
        if self.text().as_bytes().get(open) != Some(&b'{') {
            return Ok(None);
        }
        self.class_body(
            name.to_owned(),
            ClassKind::TypeAlias,
            false,
            Vec::new(),
            Vec::new(),
            open,
        )
        .map(Some)
    }

    fn class_body(
        &self,
        name: String,
        kind: ClassKind,
        is_abstract: bool,
        extends: Vec<String>,
        implements: Vec<String>,
        open: usize,
    ) -> Result<Entity, ParseAnomaly> {
        let close = self
            .lexed
            .matching_close(open)
            .ok_or_else(|| self.anomaly(format!("unterminated body of {name}")))?;
        let methods = member_names(&self.text()[open + 1..close]);
        let lifecycle = methods
            .iter()
            .filter(|m| LIFECYCLE_METHODS.contains(&m.as_str()))
            .cloned()
            .collect();
        let is_component =
            kind == ClassKind::Class && extends.iter().any(|b| component_base().is_match(b));

        Ok(Entity::Class(ClassEntity {
            name,
            kind,
            is_abstract,
            extends,
            implements,
            methods,
            lifecycle,
            is_component,
            exported: self.exported,
            default_export: self.default_export,
            line: self.line,
        }))
    }

    /// First depth-0 `=` at or after `from` that is an assignment, not `==` or `=>`.
    fn assignment(&self, from: usize) -> Option<usize> {
        let bytes = self.text().as_bytes();
        let mut at = from;
        loop {
            let i = self.lexed.find_top_level(at, b'=')?;
            if matches!(bytes.get(i + 1), Some(b'>' | b'=')) {
                at = i + 2;
                continue;
            }
            return Some(i);
        }
    }

    /// A `function` head has been matched up to `from`; parse the parameter list and body.
    fn function_from_parens(
        &self,
        name: String,
        form: FunctionForm,
        is_async: bool,
        from: usize,
        wrapper: Option<String>,
    ) -> Result<Option<Entity>, ParseAnomaly> {
        let open = self
            .lexed
            .find_top_level(from, b'(')
            .ok_or_else(|| self.anomaly(format!("function {name} has no parameter list")))?;
        let close = self
            .lexed
            .matching_close(open)
            .ok_or_else(|| self.anomaly(format!("unterminated parameters of {name}")))?;
        // Overload and ambient signatures have no body.
        let Some(body) = self.lexed.find_top_level(close + 1, b'{') else {
            return Ok(None);
        };
        let return_type = return_annotation(&self.text()[close + 1..body]);
        let params = &self.text()[open + 1..close];
        Ok(Some(Entity::Function(self.function(
            name,
            form,
            is_async,
            params,
            return_type,
            close + 1,
            wrapper,
        ))))
    }

    /// Recognise a function value starting at `at`: a function expression, an arrow, or
    /// either wrapped in `memo(...)` / `forwardRef(...)`.
    fn function_value(
        &self,
        name: String,
        at: usize,
        wrapper: Option<String>,
    ) -> Result<Option<Entity>, ParseAnomaly> {
        let text = self.text();
        let rest = &text[at..];

        if let Some(caps) = function_head().captures(rest) {
            let end = at + caps.get(0).map_or(0, |m| m.end());
            let name = match caps.name("name") {
                Some(inner) if name == "default" => inner.as_str().to_owned(),
                _ => name,
            };
            let is_async = caps.name("async").is_some();
            return self.function_from_parens(name, FunctionForm::Expression, is_async, end, wrapper);
        }

        if wrapper.is_none()
            && let Some(caps) = wrapper_call().captures(rest)
        {
            let inner = skip_ws(text, at + caps.get(0).map_or(0, |m| m.end()));
            return self.function_value(name, inner, Some(caps["wrapper"].to_owned()));
        }

        let mut p = at;
        let mut is_async = false;
        if let Some(m) = async_prefix().find(&text[p..]) {
            is_async = true;
            p += m.end();
        }
        if text[p..].starts_with('<') {
            let Some(after) = self.skip_generics(p) else {
                return Ok(None);
            };
            p = skip_ws(text, after);
        }

        if text.as_bytes().get(p) == Some(&b'(') {
            let close = self
                .lexed
                .matching_close(p)
                .ok_or_else(|| self.anomaly(format!("unterminated parameters of {name}")))?;
            let Some(arrow) = self.arrow_after(close + 1) else {
                return Ok(None);
            };
            let return_type = return_annotation(&text[close + 1..arrow]);
            let params = &text[p + 1..close];
            return Ok(Some(Entity::Function(self.function(
                name,
                FunctionForm::Arrow,
                is_async,
                params,
                return_type,
                arrow,
                wrapper,
            ))));
        }

        match single_param_arrow().captures(&text[p..]) {
            Some(caps) => {
                // Body scanning starts at the arrow itself.
                let body = p + caps.get(0).map_or(2, |m| m.end()) - 2;
                let param = caps.name("param").map_or("", |m| m.as_str());
                Ok(Some(Entity::Function(self.function(
                    name,
                    FunctionForm::Arrow,
                    is_async,
                    param,
                    None,
                    body,
                    wrapper,
                ))))
            }
            None => Ok(None),
        }
    }

    /// The `=>` following a parenthesised parameter list, allowing a return annotation.
    fn arrow_after(&self, from: usize) -> Option<usize> {
        let i = self.lexed.find_top_level(from, b'=')?;
        let between = self.text()[from..i].trim();
        (self.text().as_bytes().get(i + 1) == Some(&b'>')
            && (between.is_empty() || between.starts_with(':')))
        .then_some(i)
    }

    /// Offset just past the `>` closing the generic parameter list opened at `open`.
    fn skip_generics(&self, open: usize) -> Option<usize> {
        let bytes = self.text().as_bytes();
        let mut angle = 0i32;
        for i in open..bytes.len() {
            if !self.lexed.is_code(i) {
                continue;
            }
            match bytes[i] {
                b'<' => angle += 1,
                b'>' if bytes[i - 1] != b'=' => {
                    angle -= 1;
                    if angle == 0 {
                        return Some(i + 1);
                    }
                }
                _ => {}
            }
        }
        None
    }

    #[allow(clippy::too_many_arguments)]
    fn function(
        &self,
        name: String,
        form: FunctionForm,
        is_async: bool,
        params: &str,
        return_type: Option<String>,
        body_from: usize,
        wrapper: Option<String>,
    ) -> FunctionEntity {
        let body = &self.code[body_from..];
        let hooks = hook_calls(body, &name);
        let renders = self.lexed.rendered_components(body_from);
        let capitalised = name.starts_with(|c: char| c.is_ascii_uppercase()) || name == "default";
        let role = if hook_name().is_match(&name) {
            FunctionRole::Hook
        } else if capitalised && markup_return().is_match(body) {
            FunctionRole::Component
        } else {
            FunctionRole::Function
        };
        let props = if role == FunctionRole::Component {
            destructured_props(params)
        } else {
            None
        };

        FunctionEntity {
            name,
            role,
            form,
            params: parse_params(params),
            is_async,
            return_type,
            props,
            hooks,
            renders,
            wrapper,
            exported: self.exported,
            default_export: self.default_export,
            line: self.line,
        }
    }
}

/// Split `<T> extends A, B<C> implements D` into base and interface names.
fn parse_heritage(heritage: &str) -> (Vec<String>, Vec<String>) {
    let span = |m: regex::Match<'_>| (m.start(), m.end());
    let extends_at = extends_word().find(heritage).map(span);
    let implements_at = implements_word().find(heritage).map(span);

    let clause = |at: Option<(usize, usize)>, other: Option<(usize, usize)>| -> Vec<String> {
        let Some((start, end)) = at else {
            return Vec::new();
        };
        let stop = other
            .map(|(o, _)| o)
            .filter(|&o| o > start)
            .unwrap_or(heritage.len());
        split_top_level(&heritage[end..stop], b',')
            .iter()
            .filter_map(|item| type_name(item))
            .collect()
    };

    (
        clause(extends_at, implements_at),
        clause(implements_at, extends_at),
    )
}

/// The dotted name at the start of a type expression: `React.Component<P>` -> `React.Component`.
fn type_name(expr: &str) -> Option<String> {
    let end = expr
        .bytes()
        .position(|b| !(is_ident_byte(b) || b == b'.'))
        .unwrap_or(expr.len());
    let name = expr[..end].trim_end_matches('.');
    (!name.is_empty()).then(|| name.to_owned())
}

/// Method and arrow-property names declared directly in a class-like body.
fn member_names(body: &str) -> Vec<String> {
    let (members, _) = split_statements(body);
    let mut names: Vec<String> = Vec::new();
    for member in &members {
        let caps = method_member()
            .captures(&member.text)
            .or_else(|| arrow_member().captures(&member.text));
        if let Some(caps) = caps {
            let name = &caps["name"];
            if !NON_MEMBER_WORDS.contains(&name) && !names.iter().any(|n| n == name) {
                names.push(name.to_owned());
            }
        }
    }
    names
}

fn parse_params(params: &str) -> Vec<Param> {
    split_top_level(params, b',')
        .iter()
        .filter_map(|p| parse_param(p))
        .collect()
}

/// One parameter: its name or whitespace-collapsed destructuring pattern, plus the type
/// annotation and default value when present. `this` annotations yield nothing.
fn parse_param(param: &str) -> Option<Param> {
    let mut p = param.trim();
    if let Some(m) = decorators().find(p) {
        p = &p[m.end()..];
    }
    while let Some(rest) = PARAM_MODIFIERS
        .iter()
        .find_map(|m| p.strip_prefix(m))
        .filter(|r| r.starts_with(char::is_whitespace))
    {
        p = rest.trim_start();
    }
    if p == "this" || p.starts_with("this:") || p.starts_with("this ") {
        return None;
    }

    let (rest, p) = match p.strip_prefix("...") {
        Some(tail) => (true, tail.trim_start()),
        None => (false, p),
    };
    let destructured = p.starts_with('{') || p.starts_with('[');
    let name_end = if destructured {
        Lexed::new(p).matching_close(0)? + 1
    } else {
        p.bytes().position(|b| !is_ident_byte(b)).unwrap_or(p.len())
    };
    if name_end == 0 {
        return None;
    }
    let name = collapse_ws(&p[..name_end]);

    let tail = p[name_end..].trim_start();
    let tail = tail.strip_prefix(['?', '!']).unwrap_or(tail).trim_start();
    let lexed = Lexed::new(tail);
    let eq = default_eq(&lexed);
    let (annotation, default) = match eq {
        Some(i) => (&tail[..i], Some(&tail[i + 1..])),
        None => (tail, None),
    };
    let annotation = annotation
        .trim()
        .strip_prefix(':')
        .map(collapse_ws)
        .filter(|a| !a.is_empty());
    let default = default.map(collapse_ws).filter(|d| !d.is_empty());

    Some(Param {
        name,
        annotation,
        default,
        destructured,
        rest,
    })
}

/// The depth-0 `=` that introduces a default value, skipping `=>` and comparisons.
fn default_eq(lexed: &Lexed) -> Option<usize> {
    let bytes = lexed.text.as_bytes();
    let mut at = 0;
    loop {
        let i = lexed.find_top_level(at, b'=')?;
        let prev = i.checked_sub(1).map(|j| bytes[j]);
        if matches!(bytes.get(i + 1), Some(b'>' | b'='))
            || matches!(prev, Some(b'=' | b'!'))
        {
            at = i + 2;
            continue;
        }
        return Some(i);
    }
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Property names destructured in the first parameter, e.g. `({ title, onClose })`.
fn destructured_props(params: &str) -> Option<Vec<String>> {
    let first = split_top_level(params, b',').into_iter().next()?;
    if !first.starts_with('{') {
        return None;
    }
    let close = Lexed::new(&first).matching_close(0)?;
    let props = split_top_level(&first[1..close], b',')
        .iter()
        .filter_map(|item| {
            let item = item.trim_start_matches("...").trim();
            let end = item
                .bytes()
                .position(|b| !is_ident_byte(b))
                .unwrap_or(item.len());
            (end > 0).then(|| item[..end].to_owned())
        })
        .collect();
    Some(props)
}

fn return_annotation(between: &str) -> Option<String> {
    let annotation = between.trim().strip_prefix(':')?.trim();
    (!annotation.is_empty()).then(|| collapse_ws(annotation))
}

/// Hook calls in `body`, first-seen order, without duplicates or self-recursion.
fn hook_calls(body: &str, own_name: &str) -> Vec<String> {
    let mut hooks: Vec<String> = Vec::new();
    for caps in hook_call().captures_iter(body) {
        let hook = &caps["name"];
        if hook != own_name && !hooks.iter().any(|h| h == hook) {
            hooks.push(hook.to_owned());
        }
    }
    hooks
}

fn skip_ws(text: &str, from: usize) -> usize {
    let rest = &text[from..];
    from + (rest.len() - rest.trim_start().len())
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}
