use super::ParseAnomaly;

/// Comment-blanked source with a per-byte "is code" mask.
///
/// Blanking replaces every comment byte except newlines with a space, so byte offsets and
/// line numbers in `text` match the original source. String, template and regex literal
/// contents and JSX child text are kept in `text` but masked out of the code.
pub struct Lexed {
    pub text: String,
    code: Vec<bool>,
    /// Bytes inside a JSX element tree.
    markup: Vec<bool>,
    /// Offsets of the `<` opening each JSX element, in source order.
    elements: Vec<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    LineComment,
    BlockComment,
    Str(u8),
    Template,
    Regex { class: bool },
    /// Between a JSX tag's `<` and `>`.
    Tag { closing: bool },
    TagStr(u8),
    /// Child text of a JSX element.
    MarkupText,
}

/// Nesting that outlives a single state.
#[derive(Clone, Copy)]
enum Frame {
    /// `${ ... }` inside a template literal, with its open brace count.
    Substitution(usize),
    /// A JSX element tree, with its open element count.
    Markup(usize),
    /// `{ ... }` inside JSX, with its open brace count and the state to resume.
    Embedded(usize, State),
}

/// Keywords after which `/` starts a regex and `<` starts markup.
const OPERAND_KEYWORDS: &[&[u8]] = &[
    b"return", b"typeof", b"case", b"do", b"else", b"in", b"of", b"new", b"delete", b"void",
    b"throw", b"yield", b"await", b"instanceof", b"default",
];

/// Type names that read as an assertion, not an element, in `<any>x`.
const ASSERTION_TYPES: &[&[u8]] = &[
    b"any", b"string", b"number", b"boolean", b"unknown", b"never", b"object",
];

impl Lexed {
    pub fn new(source: &str) -> Self {
        let src = source.as_bytes();
        let mut out = src.to_vec();
        let mut code = vec![true; src.len()];
        let mut markup = vec![false; src.len()];
        let mut elements = Vec::new();
        let mut frames: Vec<Frame> = Vec::new();
        let mut trees = 0usize;
        let mut state = State::Code;
        // Last significant code byte, to tell operands from operators.
        let mut last: Option<usize> = None;
        let mut i = 0;

        while i < src.len() {
            let b = src[i];
            let next = src.get(i + 1).copied();
            markup[i] = trees > 0;
            match state {
                State::Code => match b {
                    b'/' if next == Some(b'/') => {
                        state = State::LineComment;
                        out[i] = b' ';
                        code[i] = false;
                    }
                    b'/' if next == Some(b'*') => {
                        state = State::BlockComment;
                        out[i] = b' ';
                        out[i + 1] = b' ';
                        code[i] = false;
                        code[i + 1] = false;
                        i += 1;
                    }
                    b'/' if next != Some(b'>') && expects_operand(src, last) => {
                        state = State::Regex { class: false };
                        code[i] = false;
                    }
                    b'\'' | b'"' => {
                        state = State::Str(b);
                        code[i] = false;
                    }
                    b'`' => {
                        state = State::Template;
                        code[i] = false;
                    }
                    b'<' if expects_operand(src, last) && opens_element(src, i) => {
                        frames.push(Frame::Markup(0));
                        trees += 1;
                        elements.push(i);
                        state = State::Tag { closing: false };
                    }
                    b'{' => {
                        if let Some(Frame::Substitution(depth) | Frame::Embedded(depth, _)) =
                            frames.last_mut()
                        {
                            *depth += 1;
                        }
                        last = Some(i);
                    }
                    b'}' => {
                        match frames.last_mut() {
                            Some(Frame::Substitution(0)) => {
                                frames.pop();
                                state = State::Template;
                                code[i] = false;
                            }
                            Some(Frame::Embedded(0, resume)) => {
                                state = *resume;
                                frames.pop();
                            }
                            Some(Frame::Substitution(depth) | Frame::Embedded(depth, _)) => {
                                *depth -= 1
                            }
                            _ => {}
                        }
                        last = Some(i);
                    }
                    _ if !b.is_ascii_whitespace() => last = Some(i),
                    _ => {}
                },
                State::LineComment => {
                    if b == b'\n' {
                        state = State::Code;
                    } else {
                        out[i] = b' ';
                        code[i] = false;
                    }
                }
                State::BlockComment => {
                    code[i] = false;
                    if b == b'*' && next == Some(b'/') {
                        out[i] = b' ';
                        out[i + 1] = b' ';
                        code[i + 1] = false;
                        state = State::Code;
                        i += 1;
                    } else if b != b'\n' {
                        out[i] = b' ';
                    }
                }
                State::Str(quote) => {
                    code[i] = false;
                    if b == b'\\' && next.is_some_and(|n| n != b'\n') {
                        code[i + 1] = false;
                        i += 1;
                    } else if b == quote || b == b'\n' {
                        // Plain strings cannot span lines; an unterminated one ends here.
                        state = State::Code;
                        code[i] = b == b'\n';
                        last = Some(i);
                    }
                }
                State::Template => {
                    code[i] = false;
                    if b == b'\\' && next.is_some() {
                        code[i + 1] = false;
                        i += 1;
                    } else if b == b'`' {
                        state = State::Code;
                        last = Some(i);
                    } else if b == b'$' && next == Some(b'{') {
                        code[i + 1] = false;
                        frames.push(Frame::Substitution(0));
                        state = State::Code;
                        i += 1;
                    }
                }
                State::Regex { class } => {
                    code[i] = false;
                    match b {
                        b'\\' if next.is_some_and(|n| n != b'\n') => {
                            code[i + 1] = false;
                            i += 1;
                        }
                        b'[' => state = State::Regex { class: true },
                        b']' => state = State::Regex { class: false },
                        b'/' if !class => {
                            state = State::Code;
                            last = Some(i);
                        }
                        b'\n' => {
                            state = State::Code;
                            code[i] = true;
                        }
                        _ => {}
                    }
                }
                State::Tag { closing } => match b {
                    b'"' | b'\'' => {
                        state = State::TagStr(b);
                        code[i] = false;
                    }
                    b'{' => {
                        frames.push(Frame::Embedded(0, state));
                        state = State::Code;
                    }
                    b'/' if next == Some(b'>') => {
                        i += 1;
                        state = end_tag(&mut frames, &mut trees, 0);
                        last = Some(i);
                    }
                    b'>' => {
                        state = end_tag(&mut frames, &mut trees, if closing { -1 } else { 1 });
                        last = Some(i);
                    }
                    b'\n' if leaves_markup(source, i) => {
                        state = abandon_markup(&mut frames, &mut trees);
                    }
                    _ => {}
                },
                State::TagStr(quote) => {
                    code[i] = false;
                    if b == quote {
                        state = State::Tag { closing: false };
                    }
                }
                State::MarkupText => match b {
                    b'{' => {
                        frames.push(Frame::Embedded(0, State::MarkupText));
                        state = State::Code;
                    }
                    b'<' => {
                        let closing = next == Some(b'/');
                        if closing {
                            i += 1;
                        } else {
                            elements.push(i);
                        }
                        state = State::Tag { closing };
                    }
                    b'\n' if leaves_markup(source, i) => {
                        state = abandon_markup(&mut frames, &mut trees);
                    }
                    _ => code[i] = false,
                },
            }
            i += 1;
        }

        // Only ASCII bytes were substituted, and always for whole characters' bytes,
        // so the buffer stays valid UTF-8.
        let text = String::from_utf8(out)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
        Self {
            text,
            code,
            markup,
            elements,
        }
    }

    /// True if byte `i` is outside any string, template or comment.
    pub fn is_code(&self, i: usize) -> bool {
        self.code.get(i).copied().unwrap_or(false)
    }

    /// True if byte `i` lies inside a JSX element tree.
    pub fn in_markup(&self, i: usize) -> bool {
        self.markup.get(i).copied().unwrap_or(false)
    }

    /// Capitalised JSX element names opened at or after byte `from`, first-seen order,
    /// without duplicates: `<Button>`, `<Modal.Header />`.
    pub fn rendered_components(&self, from: usize) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for &at in self.elements.iter().filter(|&&at| at >= from) {
            let rest = &self.text[at + 1..];
            let len = rest
                .bytes()
                .position(|b| !(is_ident_byte(b) || b == b'.'))
                .unwrap_or(rest.len());
            let name = &rest[..len];
            if name.starts_with(|c: char| c.is_ascii_uppercase()) && !names.iter().any(|n| n == name)
            {
                names.push(name.to_owned());
            }
        }
        names
    }

    /// The text with literal contents and JSX child text also blanked. Used for scans that
    /// must not match inside literals (hook calls, markup evidence).
    pub fn code_only(&self) -> String {
        let bytes: Vec<u8> = self
            .text
            .bytes()
            .enumerate()
            .map(|(i, b)| if self.code[i] || b == b'\n' { b } else { b' ' })
            .collect();
        // Literal contents are blanked whole, so multi-byte characters are either kept
        // intact or replaced byte for byte.
        String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
    }

    /// Index of the bracket closing the one at `open`, honouring nesting of all three
    /// bracket kinds and skipping literal contents. `None` when unbalanced.
    pub fn matching_close(&self, open: usize) -> Option<usize> {
        let bytes = self.text.as_bytes();
        if !matches!(bytes.get(open), Some(b'(' | b'[' | b'{')) {
            return None;
        }
        let mut depth = 0usize;
        for (i, &b) in bytes.iter().enumerate().skip(open) {
            if !self.code[i] {
                continue;
            }
            match b {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// First code byte at or after `from` equal to `target` at bracket depth zero,
    /// treating `<`/`>` as brackets too (generic argument lists). Arrow `=>` is not a
    /// closing angle.
    pub fn find_top_level(&self, from: usize, target: u8) -> Option<usize> {
        let bytes = self.text.as_bytes();
        let mut depth = 0i32;
        let mut angle = 0i32;
        for i in from..bytes.len() {
            if !self.code[i] {
                continue;
            }
            let b = bytes[i];
            if b == target && depth == 0 && angle <= 0 {
                return Some(i);
            }
            match b {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth -= 1,
                b'<' => angle += 1,
                b'>' if i > 0 && bytes[i - 1] == b'=' => {}
                b'>' => angle -= 1,
                _ => {}
            }
            if depth < 0 {
                return None;
            }
        }
        None
    }
}

/// Whether the token after the code byte at `last` is an operand, so `/` opens a regex
/// and `<` may open markup rather than being an operator.
fn expects_operand(src: &[u8], last: Option<usize>) -> bool {
    let Some(at) = last else {
        return true;
    };
    match src[at] {
        b if is_ident_byte(b) => {
            let start = src[..at]
                .iter()
                .rposition(|&c| !is_ident_byte(c))
                .map_or(0, |p| p + 1);
            OPERAND_KEYWORDS.contains(&&src[start..=at])
        }
        b'>' => at > 0 && src[at - 1] == b'=',
        b'(' | b',' | b'=' | b':' | b'[' | b'!' | b'&' | b'|' | b'?' | b'{' | b'}' | b';'
        | b'+' | b'-' | b'*' | b'%' | b'~' | b'^' => true,
        _ => false,
    }
}

/// Whether the `<` at `at` opens a JSX element rather than generic parameters
/// (`<T,>`, `<T extends U>`, `<T = D>`, `<T>(`) or a type assertion (`<any>x`).
fn opens_element(src: &[u8], at: usize) -> bool {
    let rest = &src[at + 1..];
    match rest.first() {
        Some(b'>') => return true,
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    let name_len = rest
        .iter()
        .position(|&c| !(is_ident_byte(c) || matches!(c, b'.' | b'-' | b':')))
        .unwrap_or(rest.len());
    let after = &rest[name_len..];
    let gap = after
        .iter()
        .position(|c| !c.is_ascii_whitespace())
        .unwrap_or(after.len());
    let after = &after[gap..];
    if after.starts_with(b",") || after.starts_with(b"=") || after.starts_with(b"extends ") {
        return false;
    }
    if after.starts_with(b">") {
        let tail = &after[1..];
        let gap = tail
            .iter()
            .position(|c| !c.is_ascii_whitespace())
            .unwrap_or(tail.len());
        return !(tail[gap..].starts_with(b"(") || ASSERTION_TYPES.contains(&&rest[..name_len]));
    }
    true
}

/// Leave a JSX tag at its `>`. `delta` is 1 for an opening tag, -1 for a closing tag and 0
/// for a self-closing one.
fn end_tag(frames: &mut Vec<Frame>, trees: &mut usize, delta: isize) -> State {
    if let Some(Frame::Markup(open)) = frames.last_mut() {
        *open = open.saturating_add_signed(delta);
        if *open == 0 {
            frames.pop();
            *trees = trees.saturating_sub(1);
            return State::Code;
        }
        return State::MarkupText;
    }
    State::Code
}

/// A JSX tree that runs into a column-0 declaration was not markup after all.
fn leaves_markup(source: &str, newline: usize) -> bool {
    let line = source[newline + 1..].split('\n').next().unwrap_or("");
    is_recovery_line(line)
}

fn abandon_markup(frames: &mut Vec<Frame>, trees: &mut usize) -> State {
    if let Some(at) = frames.iter().position(|f| matches!(f, Frame::Markup(_))) {
        frames.truncate(at);
    }
    *trees = 0;
    State::Code
}

/// Split `text` at depth-0 occurrences of `sep`, treating generic angles as brackets.
/// Empty pieces are dropped and every piece is trimmed.
pub fn split_top_level(text: &str, sep: u8) -> Vec<String> {
    let lexed = Lexed::new(text);
    let bytes = lexed.text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, &b) in bytes.iter().enumerate() {
        if !lexed.is_code(i) {
            continue;
        }
        match b {
            b'(' | b'[' | b'{' | b'<' => depth += 1,
            b'>' if i > 0 && bytes[i - 1] == b'=' => {}
            b')' | b']' | b'}' | b'>' => depth -= 1,
            _ if b == sep && depth == 0 => {
                parts.push(lexed.text[start..i].trim().to_owned());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(lexed.text[start..].trim().to_owned());
    parts.retain(|p| !p.is_empty());
    parts
}

/// A depth-0 statement: trimmed comment-blanked text and its 1-based starting line.
#[derive(Debug, Clone)]
pub struct Statement {
    pub text: String,
    pub line: usize,
}

/// Split `source` into top-level statements.
///
/// Unbalanced regions are reported as anomalies and dropped; scanning resumes at the next
/// balanced boundary. A line starting in column 0 with a declaration keyword while a
/// region is still open is taken as that boundary.
pub fn split_statements(source: &str) -> (Vec<Statement>, Vec<ParseAnomaly>) {
    split_lexed(&Lexed::new(source))
}

/// [`split_statements`] over already lexed text.
pub fn split_lexed(lexed: &Lexed) -> (Vec<Statement>, Vec<ParseAnomaly>) {
    let text = lexed.text.as_str();
    let bytes = text.as_bytes();

    let lines: Vec<(usize, usize)> = line_spans(text);
    let mut statements = Vec::new();
    let mut anomalies = Vec::new();

    let mut start: Option<(usize, usize)> = None; // (byte offset, line number)
    let mut depth: i32 = 0;

    let push = |statements: &mut Vec<Statement>, from: usize, to: usize, line: usize| {
        let stmt = text[from..to].trim();
        if !stmt.is_empty() && stmt != ";" {
            statements.push(Statement {
                text: stmt.to_owned(),
                line,
            });
        }
    };

    for (idx, &(line_start, line_end)) in lines.iter().enumerate() {
        let line_no = idx + 1;

        if let Some((_, open_line)) = start
            && depth > 0
            && open_line < line_no
            && lexed.is_code(line_start)
            && is_recovery_line(&text[line_start..line_end])
        {
            anomalies.push(ParseAnomaly {
                line: open_line,
                message: format!("unbalanced region (depth {depth}) skipped before line {line_no}"),
            });
            start = None;
            depth = 0;
        }

        for i in line_start..line_end {
            let b = bytes[i];
            if start.is_none() {
                if b.is_ascii_whitespace() {
                    continue;
                }
                start = Some((i, line_no));
            }
            if !lexed.is_code(i) {
                continue;
            }
            match b {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => {
                    depth -= 1;
                    if depth < 0 {
                        anomalies.push(ParseAnomaly {
                            line: line_no,
                            message: format!("unmatched closing '{}'", b as char),
                        });
                        depth = 0;
                        start = None;
                    }
                }
                b';' if depth == 0 => {
                    if let Some((from, line)) = start.take() {
                        push(&mut statements, from, i + 1, line);
                    }
                }
                _ => {}
            }
        }

        if depth == 0
            && !lexed.in_markup(line_end)
            && let Some((from, line)) = start
        {
            let so_far = text[from..line_end].trim_end();
            let next = lines[idx + 1..]
                .iter()
                .map(|&(s, e)| text[s..e].trim())
                .find(|l| !l.is_empty());
            if !continues(so_far, next) {
                push(&mut statements, from, line_end, line);
                start = None;
            }
        }
    }

    if let Some((from, line)) = start {
        if depth > 0 {
            anomalies.push(ParseAnomaly {
                line,
                message: format!("unterminated region (depth {depth}) at end of input"),
            });
        } else {
            push(&mut statements, from, text.len(), line);
        }
    }

    (statements, anomalies)
}

/// Byte spans `[start, end)` of each line, excluding the newline.
fn line_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            spans.push((start, i));
            start = i + 1;
        }
    }
    spans.push((start, text.len()));
    spans
}

const DECLARATION_STARTS: &[&str] = &[
    "export ",
    "import ",
    "import{",
    "function ",
    "function*",
    "async function",
    "class ",
    "abstract class",
    "interface ",
    "const ",
    "let ",
    "var ",
    "type ",
];

fn is_recovery_line(line: &str) -> bool {
    let starts_in_column_zero = line
        .bytes()
        .next()
        .is_some_and(|b| !b.is_ascii_whitespace());
    starts_in_column_zero && DECLARATION_STARTS.iter().any(|kw| line.starts_with(kw))
}

const CONTINUATION_WORDS: &[&str] = &[
    "extends",
    "implements",
    "from",
    "as",
    "new",
    "typeof",
    "keyof",
    "await",
    "async",
    "export",
    "default",
    "function",
    "class",
    "interface",
    "type",
    "const",
    "let",
    "var",
    "import",
    "abstract",
    "declare",
    "return",
];

/// Whether a depth-0 statement ending with `current` carries on to the `next` line.
fn continues(current: &str, next: Option<&str>) -> bool {
    let Some(last) = current.bytes().last() else {
        return false;
    };
    if matches!(
        last,
        b'=' | b',' | b'+' | b'-' | b'*' | b'/' | b'%' | b'.' | b'?' | b':' | b'|' | b'&' | b'<'
            | b'!'
    ) {
        return true;
    }
    // `>` closes generic arguments far more often than it continues an expression; only
    // an arrow carries on.
    if current.ends_with("=>") {
        return true;
    }
    if let Some(word) = trailing_word(current)
        && CONTINUATION_WORDS.contains(&word)
    {
        return true;
    }

    let Some(next) = next else {
        return false;
    };
    if next.starts_with("...") {
        return false;
    }
    if matches!(
        next.bytes().next(),
        Some(b'.' | b'?' | b':' | b'=' | b'|' | b'&' | b'+' | b'*')
    ) {
        return true;
    }
    if ["extends", "implements", "from", "as"]
        .iter()
        .any(|kw| leading_word(next) == Some(kw))
    {
        return true;
    }
    // Allman-style braces: `function f()` / `class A` followed by `{` on its own line.
    next.starts_with('{')
        && (last == b')' || last.is_ascii_alphanumeric() || last == b'_' || last == b'$')
        && is_declaration_head(current)
}

fn is_declaration_head(stmt: &str) -> bool {
    let mut rest = stmt;
    for prefix in ["export ", "default ", "declare ", "abstract ", "async "] {
        rest = rest.strip_prefix(prefix).map(str::trim_start).unwrap_or(rest);
    }
    ["function", "class", "interface"]
        .iter()
        .any(|kw| leading_word(rest) == Some(kw))
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn trailing_word(s: &str) -> Option<&str> {
    let start = s
        .bytes()
        .rposition(|b| !is_ident_byte(b))
        .map_or(0, |p| p + 1);
    let word = &s[start..];
    (!word.is_empty()).then_some(word)
}

fn leading_word(s: &str) -> Option<&str> {
    let end = s.bytes().position(|b| !is_ident_byte(b)).unwrap_or(s.len());
    (end > 0).then(|| &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<String> {
        split_statements(source).0.into_iter().map(|s| s.text).collect()
    }

    #[test]
    fn test_lexer_blanks_comments_and_masks_strings() {
        let lexed = Lexed::new("a // b {\nc /* { */ 'x{' `t${d}`");
        assert!(!lexed.text.contains("b {"));
        assert!(!lexed.text.contains("/*"));
        assert_eq!(lexed.text.len(), "a // b {\nc /* { */ 'x{' `t${d}`".len());
        let code_only = lexed.code_only();
        assert!(!code_only.contains("x{"), "string contents masked: {code_only}");
        assert!(code_only.contains('d'), "template substitution stays code: {code_only}");
    }

    #[test]
    fn test_matching_close_skips_literals() {
        let lexed = Lexed::new("f(a, ')', [1, 2], { b })");
        assert_eq!(lexed.matching_close(1), Some(23));
        assert_eq!(Lexed::new("f(a").matching_close(1), None);
    }

    #[test]
    fn test_split_top_level_respects_nesting() {
        assert_eq!(
            split_top_level("a, { b, c }: Props, d: Map<string, number>, e = f(1, 2)", b','),
            vec!["a", "{ b, c }: Props", "d: Map<string, number>", "e = f(1, 2)"]
        );
        assert!(split_top_level("  ", b',').is_empty());
    }

    #[test]
    fn test_split_on_semicolons_and_lines() {
        let stmts = texts("import a from 'a'; import b from 'b'\nconst c = 1\n");
        assert_eq!(
            stmts,
            vec!["import a from 'a';", "import b from 'b'", "const c = 1"]
        );
    }

    #[test]
    fn test_multiline_statements_stay_together() {
        let source = "import {\n  a,\n  b,\n} from './x';\nconst f = (x) =>\n  x + 1;\nfoo()\n  .then(bar)\n";
        let stmts = texts(source);
        assert_eq!(stmts.len(), 3, "{stmts:?}");
        assert!(stmts[0].starts_with("import {") && stmts[0].ends_with("from './x';"));
        assert!(stmts[1].contains("x + 1"));
        assert!(stmts[2].contains(".then(bar)"));
    }

    #[test]
    fn test_function_block_is_one_statement_with_line() {
        let source = "\n\nfunction add(a, b) {\n  return a + b;\n}\nconst x = 1;\n";
        let (stmts, anomalies) = split_statements(source);
        assert!(anomalies.is_empty());
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].line, 3);
        assert!(stmts[0].text.ends_with('}'));
    }

    #[test]
    fn test_allman_braces_join_declaration() {
        let stmts = texts("function f()\n{\n  return 1;\n}\n");
        assert_eq!(stmts.len(), 1, "{stmts:?}");
    }

    #[test]
    fn test_recovers_from_unclosed_region_at_declaration() {
        let source = "class Broken {\n  method( {\n    return 1;\n}\n\nfunction ok() {\n  return 2;\n}\n";
        let (stmts, anomalies) = split_statements(source);
        assert_eq!(anomalies.len(), 1, "{anomalies:?}");
        assert_eq!(anomalies[0].line, 1);
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].text.starts_with("function ok()"));
    }

    #[test]
    fn test_unmatched_close_is_anomaly() {
        let (stmts, anomalies) = split_statements("}\nconst a = 1;\n");
        assert_eq!(anomalies.len(), 1);
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].text, "const a = 1;");
    }

    #[test]
    fn test_unterminated_region_at_eof_is_anomaly() {
        let (stmts, anomalies) = split_statements("const a = 1;\nfunction f() {\n  return 1;\n");
        assert_eq!(stmts.len(), 1);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].line, 2);
    }

    #[test]
    fn test_regex_literals_are_masked() {
        let source = "function f(line) {\n  return line.split(/\\(/);\n}\nfunction g() {}\n";
        let (stmts, anomalies) = split_statements(source);
        assert!(anomalies.is_empty(), "{anomalies:?}");
        assert_eq!(stmts.len(), 2);
        assert!(stmts[1].text.starts_with("function g()"));

        let lexed = Lexed::new("s.replace(/'/g, '').replace(/[{]/g, x)");
        assert_eq!(lexed.matching_close(9), Some(18));
        assert!(!lexed.code_only().contains('{'));
    }

    #[test]
    fn test_division_stays_code() {
        let lexed = Lexed::new("x = a / (b) / c");
        assert!(lexed.code_only().contains("(b)"));
        assert_eq!(lexed.matching_close(8), Some(10));
    }

    #[test]
    fn test_markup_text_is_not_code() {
        let source = "const el = <p>Don't miss {items.map(i => <Item key={i} />)}</p>;\nconst y = 1;\n";
        let (stmts, anomalies) = split_statements(source);
        assert!(anomalies.is_empty(), "{anomalies:?}");
        assert_eq!(stmts.len(), 2);

        let lexed = Lexed::new(source);
        let code_only = lexed.code_only();
        assert!(!code_only.contains("Don't"));
        assert!(code_only.contains("items.map"));
        assert!(lexed.in_markup(source.find("miss").unwrap()));
        assert!(!lexed.in_markup(source.find("const y").unwrap()));
    }

    #[test]
    fn test_multiline_markup_without_parens_is_one_statement() {
        let stmts = texts("const el =\n  <div>\n    hi\n  </div>;\nconst y = 1;\n");
        assert_eq!(stmts.len(), 2, "{stmts:?}");
        assert!(stmts[0].ends_with("</div>;"));
    }

    #[test]
    fn test_generic_arrows_are_not_markup() {
        for source in [
            "const id = <T,>(x: T) => x;\nconst y = 1;\n",
            "type F = <T>(x: T) => T;\nconst y = 1;\n",
            "const n = <any>value;\nconst y = 1;\n",
        ] {
            let (stmts, anomalies) = split_statements(source);
            assert!(anomalies.is_empty(), "{source}: {anomalies:?}");
            assert_eq!(stmts.len(), 2, "{source}");
            assert!(Lexed::new(source).rendered_components(0).is_empty(), "{source}");
        }
    }

    #[test]
    fn test_rendered_components_in_order_without_duplicates() {
        let lexed = Lexed::new("<Layout><Nav.Bar /><div /><Nav.Bar /></Layout>");
        assert_eq!(lexed.rendered_components(0), vec!["Layout", "Nav.Bar"]);
        assert_eq!(lexed.rendered_components(1), vec!["Nav.Bar"]);
    }
}
