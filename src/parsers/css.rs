//! CSS rewriting
//!
//! Stylesheets are walked token by token with cssparser. Every URL (the
//! `url(...)` token, quoted strings passed to `url()` / `image-set()`, and
//! `@import` preludes) goes through the [`UrlRewriter`]; every other token
//! is copied as written in the source.
//!
//! Stylesheets named by `@import` are queued on the rewriter so they get
//! the same treatment, see [`UrlRewriter::take_pending_imports`].
//!
//! Top-level rules that cannot be valid (stray closing brackets, bad URL or
//! string tokens, a selector list without a block) are dropped from the
//! output instead of failing the whole stylesheet.
//!
//! ```rust
//! use mindtouch2zim::parsers::css::rewrite_css;
//! use mindtouch2zim::parsers::url_rewriter::{DocumentContext, UrlRewriter};
//! use mindtouch2zim::utils::url::Url;
//!
//! let mut rewriter = UrlRewriter::default();
//! let document_url = Url::parse("https://www.acme.com/styles/main.css").unwrap();
//! let document = DocumentContext::new(&document_url, "content/screen.css");
//!
//! let css = rewrite_css(&mut rewriter, &document, "div { background: url('../image.jpg'); }");
//! assert_eq!(css, "div { background: url(\"css_assets/image.jpg\"); }");
//! ```

use cssparser::{serialize_string, ParseError, Parser, ParserInput, Token};

use super::url_rewriter::{AssetLayout, DocumentContext, RewriteResult, UrlRewriter};

/// Functions whose quoted string arguments are URLs.
const CSS_URL_FUNCTIONS: &[&str] = &["url", "image-set", "-webkit-image-set"];

/// Rewrites all URLs of a stylesheet; `document` is the stylesheet itself.
pub fn rewrite_css(url_rewriter: &mut UrlRewriter, document: &DocumentContext, css: &str) -> String {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);

    process_stylesheet(url_rewriter, document, &mut parser)
}

pub fn format_quoted_string(string: &str) -> String {
    let mut res: String = "".to_string();
    let _ = serialize_string(string, &mut res);
    res
}

/// Escapes what cannot appear raw inside an unquoted `url(...)`.
pub fn format_unquoted_url(url: &str) -> String {
    let mut res = String::with_capacity(url.len());
    for c in url.chars() {
        if matches!(c, '(' | ')' | '"' | '\'' | '\\') || c.is_whitespace() {
            res.push('\\');
        }
        res.push(c);
    }
    res
}

/// Where the tokenizer currently is, as far as URL detection cares.
#[derive(Debug, Clone, Default)]
pub struct CssProcessingContext {
    /// Lowercased at-rule name (`import`, `font-face`...)
    pub current_rule: String,
    /// Lowercased name of the innermost function
    pub current_function: String,
}

impl CssProcessingContext {
    pub fn new(rule_name: &str, function_name: &str) -> Self {
        Self {
            current_rule: rule_name.to_string(),
            current_function: function_name.to_string(),
        }
    }

    fn strings_are_urls(&self) -> bool {
        CSS_URL_FUNCTIONS.contains(&self.current_function.as_str())
            || (self.current_function.is_empty() && self.current_rule == "import")
    }

    fn is_import_target(&self) -> bool {
        self.current_rule == "import"
            && (self.current_function.is_empty() || self.current_function == "url")
    }
}

fn rewrite_url(
    url_rewriter: &mut UrlRewriter,
    document: &DocumentContext,
    value: &str,
    context: &CssProcessingContext,
) -> RewriteResult {
    if context.is_import_target() {
        url_rewriter.rewrite_import(value, document)
    } else {
        url_rewriter.rewrite_asset(value, document, AssetLayout::Stylesheet)
    }
}

/// Top-level rule being accumulated.
#[derive(Default)]
struct PendingRule {
    text: String,
    started: bool,
    malformed: bool,
    at_rule: Option<String>,
}

impl PendingRule {
    fn context(&self) -> CssProcessingContext {
        CssProcessingContext::new(self.at_rule.as_deref().unwrap_or_default(), "")
    }

    fn flush_into(&mut self, output: &mut String) {
        if !self.malformed {
            output.push_str(&self.text);
        }
        *self = PendingRule::default();
    }
}

fn nested_block<'i, 't>(
    parser: &mut Parser<'i, 't>,
    process: impl for<'tt> FnOnce(&mut Parser<'i, 'tt>) -> String,
) -> String {
    parser
        .parse_nested_block(|nested| Ok::<_, ParseError<'i, ()>>(process(nested)))
        .unwrap_or_default()
}

fn process_stylesheet<'i, 't>(
    url_rewriter: &mut UrlRewriter,
    document: &DocumentContext,
    parser: &mut Parser<'i, 't>,
) -> String {
    let mut result = String::new();
    let mut rule = PendingRule::default();

    loop {
        let token_offset = parser.position();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::WhiteSpace(_) | Token::Comment(_) | Token::CDO | Token::CDC
                if !rule.started =>
            {
                result.push_str(parser.slice_from(token_offset));
            }
            Token::AtKeyword(ref name) if !rule.started => {
                rule.started = true;
                rule.at_rule = Some(name.to_lowercase());
                rule.text.push_str(parser.slice_from(token_offset));
            }
            Token::CurlyBracketBlock => {
                let context = rule.context();
                let block = nested_block(parser, |nested| {
                    process_tokens(url_rewriter, document, nested, &context)
                });
                rule.text.push('{');
                rule.text.push_str(&block);
                rule.text.push('}');
                rule.flush_into(&mut result);
            }
            Token::Semicolon => {
                rule.text.push(';');
                // Only at-rules may end with a semicolon.
                if rule.at_rule.is_none() {
                    rule.malformed = true;
                }
                rule.flush_into(&mut result);
            }
            Token::CloseCurlyBracket
            | Token::CloseParenthesis
            | Token::CloseSquareBracket
            | Token::BadUrl(_)
            | Token::BadString(_) => {
                rule.started = true;
                rule.malformed = true;
                rule.text.push_str(parser.slice_from(token_offset));
            }
            other => {
                rule.started = true;
                let context = rule.context();
                let text =
                    process_token(url_rewriter, document, parser, &other, token_offset, &context);
                rule.text.push_str(&text);
            }
        }
    }

    // A trailing at-rule statement may omit its semicolon, a trailing
    // selector list without a block is garbage.
    if rule.started && !rule.malformed && rule.at_rule.is_some() {
        result.push_str(&rule.text);
    }

    result
}

fn process_tokens<'i, 't>(
    url_rewriter: &mut UrlRewriter,
    document: &DocumentContext,
    parser: &mut Parser<'i, 't>,
    context: &CssProcessingContext,
) -> String {
    let mut result = String::new();
    let mut context = context.clone();
    let entry_rule = context.current_rule.clone();

    loop {
        let token_offset = parser.position();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::AtKeyword(ref name) => {
                context.current_rule = name.to_lowercase();
                result.push_str(parser.slice_from(token_offset));
            }
            Token::Semicolon => {
                context.current_rule = entry_rule.clone();
                result.push(';');
            }
            // Dropped: there is no way to serialize them back as valid CSS.
            Token::BadUrl(_) | Token::BadString(_) => {}
            other => {
                let text =
                    process_token(url_rewriter, document, parser, &other, token_offset, &context);
                result.push_str(&text);

                if matches!(other, Token::CurlyBracketBlock) {
                    context.current_rule = entry_rule.clone();
                }
            }
        }
    }

    result
}

fn process_token<'i, 't>(
    url_rewriter: &mut UrlRewriter,
    document: &DocumentContext,
    parser: &mut Parser<'i, 't>,
    token: &Token<'i>,
    token_offset: cssparser::SourcePosition,
    context: &CssProcessingContext,
) -> String {
    match token {
        Token::QuotedString(value) if context.strings_are_urls() => {
            let result = rewrite_url(url_rewriter, document, value, context);
            if result.zim_path.is_some() {
                format_quoted_string(&result.rewritten)
            } else {
                parser.slice_from(token_offset).to_string()
            }
        }
        Token::UnquotedUrl(value) => {
            let result = rewrite_url(url_rewriter, document, value, context);
            if result.zim_path.is_some() {
                format!("url({})", format_unquoted_url(&result.rewritten))
            } else {
                parser.slice_from(token_offset).to_string()
            }
        }
        Token::Function(name) => {
            let mut text = parser.slice_from(token_offset).to_string();
            let inner_context = CssProcessingContext::new(&context.current_rule, &name.to_lowercase());
            let inner = nested_block(parser, |nested| {
                process_tokens(url_rewriter, document, nested, &inner_context)
            });
            text.push_str(&inner);
            text.push(')');
            text
        }
        Token::ParenthesisBlock | Token::SquareBracketBlock | Token::CurlyBracketBlock => {
            let (open, close) = match token {
                Token::ParenthesisBlock => ('(', ')'),
                Token::SquareBracketBlock => ('[', ']'),
                _ => ('{', '}'),
            };
            let inner_context = CssProcessingContext::new(&context.current_rule, "");
            let inner = nested_block(parser, |nested| {
                process_tokens(url_rewriter, document, nested, &inner_context)
            });
            format!("{}{}{}", open, inner, close)
        }
        _ => parser.slice_from(token_offset).to_string(),
    }
}
