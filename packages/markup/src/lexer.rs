//! Lexer for HTML fragments using logos
//!
//! Tags are lexed as whole units (name plus raw attribute text) so the
//! tree builder never has to track "inside a tag" state. Anything that
//! fails to lex as markup, such as a stray `<`, comes back as text.
//!
//! The content of `<script>` and `<style>` is raw text: everything up to
//! the matching close tag is one text token, whatever it contains.

use logos::{Lexer, Logos};

/// Elements whose content is raw text, neither parsed nor entity-decoded
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub fn is_raw_text(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS
        .iter()
        .any(|raw| raw.eq_ignore_ascii_case(tag))
}

/// Raw open tag as it appeared in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTag<'src> {
    pub name: &'src str,
    /// Attribute text between the tag name and the closing `>`
    pub attrs: &'src str,
    pub self_closing: bool,
}

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
pub enum Token<'src> {
    #[regex(r"<[a-zA-Z][a-zA-Z0-9-]*", lex_open_tag)]
    OpenTag(OpenTag<'src>),

    #[regex(r"</[a-zA-Z][a-zA-Z0-9-]*[ \t\r\n]*>", |lex| {
        let s = lex.slice();
        s[2..s.len() - 1].trim_end()
    })]
    CloseTag(&'src str),

    #[token("<!--", lex_comment)]
    Comment(&'src str),

    // Doctypes and processing instructions carry nothing for a fragment
    #[regex(r"<[!?][a-zA-Z][^>]*>", logos::skip)]
    Doctype,

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),
}

fn lex_open_tag<'src>(lex: &mut Lexer<'src, Token<'src>>) -> OpenTag<'src> {
    let name = &lex.slice()[1..];
    let rest = lex.remainder();

    let mut quote: Option<char> = None;
    let mut end = rest.len();
    for (i, ch) in rest.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == '>' => {
                end = i + 1;
                break;
            }
            None => {}
        }
    }

    let raw = &rest[..end];
    lex.bump(end);

    let body = raw.strip_suffix('>').unwrap_or(raw).trim_end();
    let (attrs, self_closing) = match body.strip_suffix('/') {
        Some(attrs) => (attrs, true),
        None => (body, false),
    };

    OpenTag {
        name,
        attrs,
        self_closing,
    }
}

fn lex_comment<'src>(lex: &mut Lexer<'src, Token<'src>>) -> &'src str {
    let rest = lex.remainder();
    match rest.find("-->") {
        Some(idx) => {
            lex.bump(idx + 3);
            &rest[..idx]
        }
        None => {
            // Unterminated comment swallows the rest of the input
            lex.bump(rest.len());
            rest
        }
    }
}

/// Tokenize a fragment. Never fails: unlexable input becomes text.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(Token::OpenTag(tag)) => {
                let raw = !tag.self_closing && is_raw_text(tag.name);
                let name = tag.name;
                tokens.push(Token::OpenTag(tag));

                if raw {
                    let rest = lexer.remainder();
                    let end = raw_text_end(name, rest);
                    if end > 0 {
                        tokens.push(Token::Text(&rest[..end]));
                    }
                    lexer.bump(end);
                }
            }
            Ok(token) => tokens.push(token),
            Err(()) => tokens.push(Token::Text(lexer.slice())),
        }
    }

    tokens
}

/// Byte length of raw text before the close tag for `name`. An
/// unterminated element runs to the end of the input.
fn raw_text_end(name: &str, rest: &str) -> usize {
    let lower = rest.to_ascii_lowercase();
    let needle = format!("</{}", name.to_ascii_lowercase());

    let mut from = 0;
    while let Some(found) = lower[from..].find(&needle) {
        let at = from + found;
        let after = lower[at + needle.len()..]
            .trim_start_matches(|c: char| matches!(c, ' ' | '\t' | '\r' | '\n'));
        if after.starts_with('>') {
            return at;
        }
        from = at + needle.len();
    }

    rest.len()
}

/// Split raw attribute text into decoded `(name, value)` pairs.
///
/// Names are lowercased. Valueless attributes get an empty value.
/// Repeated names keep the first occurrence, as browsers do.
pub fn parse_attributes(src: &str) -> Vec<(String, String)> {
    let bytes = src.as_bytes();
    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && bytes[i] != b'='
            && bytes[i] != b'/'
        {
            i += 1;
        }
        let name = src[name_start..i].to_ascii_lowercase();

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut value = String::new();
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                i += 1;
                let value_start = i;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                value = decode_entities(&src[value_start..i]);
                i = (i + 1).min(bytes.len());
            } else {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                value = decode_entities(&src[value_start..i]);
            }
        }

        if !name.is_empty() && !attrs.iter().any(|(existing, _)| *existing == name) {
            attrs.push((name, value));
        }
    }

    attrs
}

/// Decode the character references that show up in generated markup.
/// Unknown references are left as written.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        let decoded = tail.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &tail[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            ch.map(|ch| (ch, semi + 1))
        });

        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
