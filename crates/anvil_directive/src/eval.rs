//! Restricted evaluation of directive statements.
//!
//! The directive language is a fixed-vocabulary configuration-mutation
//! script, deliberately reimplemented as an expression evaluator over a
//! known key/value schema rather than a general interpreter: statements
//! can only mutate the build config and query the binding layer's include
//! paths, never touch the filesystem or run code.

use crate::block::{DirectiveBlock, SourceLine};
use crate::error::DirectiveError;
use anvil_config::{Bindgen, BuildConfig, ConfigKey, Settings, Value};
use anvil_source::SourceUnit;

/// Evaluates a directive block into a populated [`BuildConfig`].
pub fn evaluate(
    block: &DirectiveBlock,
    unit: &SourceUnit,
    settings: &Settings,
    bindgen: &Bindgen,
) -> Result<BuildConfig, DirectiveError> {
    let mut cfg = BuildConfig::new();

    match block {
        DirectiveBlock::Script { lines } => {
            for line in lines {
                eval_statement(&mut cfg, line, unit, settings, bindgen)?;
            }
        }
        DirectiveBlock::Marker { json, assignments } => {
            if let Some(json) = json {
                apply_json(&mut cfg, json, unit)?;
            }
            for line in assignments {
                let (key, rest) = parse_bare_key(line, unit)?;
                let value = parse_expr_line(rest, line, unit, bindgen)?;
                cfg.set(key, value)?;
            }
        }
    }

    Ok(cfg)
}

/// Evaluates one script-block statement.
fn eval_statement(
    cfg: &mut BuildConfig,
    line: &SourceLine,
    unit: &SourceUnit,
    settings: &Settings,
    bindgen: &Bindgen,
) -> Result<(), DirectiveError> {
    let text = line.text.trim();

    if text.is_empty() || text.starts_with('#') {
        return Ok(());
    }
    if text.starts_with("import ") || text == "import" {
        // Import lines are vocabulary compatibility only; nothing is
        // actually imported.
        return Ok(());
    }

    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact == "setup_bindgen(cfg)" {
        apply_setup_bindgen(cfg, settings, bindgen)?;
        return Ok(());
    }

    if let Some(rest) = text.strip_prefix("cfg[") {
        let (key, rest) = parse_subscript_key(rest, line, unit)?;
        let rest = rest.trim_start();

        if let Some(call) = rest.strip_prefix('.') {
            let call: String = call.chars().filter(|c| !c.is_whitespace()).collect();
            if call == "clear()" {
                cfg.clear(key)?;
                return Ok(());
            }
            return Err(DirectiveError::syntax(
                &unit.path,
                line.line,
                &line.text,
                format!("unsupported method call on '{key}' (only .clear() is recognized)"),
            ));
        }
        if let Some(rest) = rest.strip_prefix("+=") {
            let value = parse_expr_line(rest, line, unit, bindgen)?;
            cfg.append(key, value)?;
            return Ok(());
        }
        if let Some(rest) = rest.strip_prefix('=') {
            if rest.starts_with('=') {
                return Err(DirectiveError::syntax(
                    &unit.path,
                    line.line,
                    &line.text,
                    "'==' is not an assignment",
                ));
            }
            let value = parse_expr_line(rest, line, unit, bindgen)?;
            cfg.set(key, value)?;
            return Ok(());
        }
        return Err(DirectiveError::syntax(
            &unit.path,
            line.line,
            &line.text,
            "expected '=', '+=' or '.clear()' after key",
        ));
    }

    Err(DirectiveError::syntax(
        &unit.path,
        line.line,
        &line.text,
        "unrecognized directive statement",
    ))
}

/// Applies the `setup_bindgen(cfg)` call: standard and visibility flags
/// prepended (so a later directive-specified standard wins on the command
/// line) and the binding layer's include directories appended.
fn apply_setup_bindgen(
    cfg: &mut BuildConfig,
    settings: &Settings,
    bindgen: &Bindgen,
) -> Result<(), DirectiveError> {
    cfg.prepend(
        ConfigKey::CompilerArgs,
        vec![settings.std_flag(), "-fvisibility=hidden".to_string()],
    )?;
    cfg.append(
        ConfigKey::IncludeDirs,
        Value::List(vec![
            bindgen.include(false).display().to_string(),
            bindgen.include(true).display().to_string(),
        ]),
    )?;
    Ok(())
}

/// Applies the marker-line JSON object form.
fn apply_json(
    cfg: &mut BuildConfig,
    json: &SourceLine,
    unit: &SourceUnit,
) -> Result<(), DirectiveError> {
    let parsed: serde_json::Value = serde_json::from_str(&json.text).map_err(|e| {
        DirectiveError::syntax(&unit.path, json.line, &json.text, format!("invalid JSON: {e}"))
    })?;
    let serde_json::Value::Object(map) = parsed else {
        return Err(DirectiveError::syntax(
            &unit.path,
            json.line,
            &json.text,
            "directive JSON must be an object",
        ));
    };

    for (name, value) in map {
        let key = lookup_key(&name, json, unit)?;
        let value = match value {
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        serde_json::Value::String(s) => out.push(s),
                        other => {
                            return Err(DirectiveError::syntax(
                                &unit.path,
                                json.line,
                                &json.text,
                                format!("list values must be strings, got {other}"),
                            ))
                        }
                    }
                }
                Value::List(out)
            }
            other => {
                return Err(DirectiveError::syntax(
                    &unit.path,
                    json.line,
                    &json.text,
                    format!("unsupported value for '{name}': {other}"),
                ))
            }
        };
        cfg.set(key, value)?;
    }
    Ok(())
}

/// Parses `'key']` / `"key"]` after `cfg[`, returning the key and the rest.
fn parse_subscript_key<'a>(
    rest: &'a str,
    line: &SourceLine,
    unit: &SourceUnit,
) -> Result<(ConfigKey, &'a str), DirectiveError> {
    let rest = rest.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '\'' || *c == '"');
    let Some(quote) = quote else {
        return Err(DirectiveError::syntax(
            &unit.path,
            line.line,
            &line.text,
            "expected quoted key after 'cfg['",
        ));
    };
    let body = &rest[1..];
    let Some(close) = body.find(quote) else {
        return Err(DirectiveError::syntax(
            &unit.path,
            line.line,
            &line.text,
            "unterminated key string",
        ));
    };
    let name = &body[..close];
    let after = body[close + 1..].trim_start();
    let Some(after) = after.strip_prefix(']') else {
        return Err(DirectiveError::syntax(
            &unit.path,
            line.line,
            &line.text,
            "expected ']' after key",
        ));
    };
    let key = lookup_key(name, line, unit)?;
    Ok((key, after))
}

/// Parses the bare `key` on the left of a marker-form assignment.
fn parse_bare_key<'a>(
    line: &'a SourceLine,
    unit: &SourceUnit,
) -> Result<(ConfigKey, &'a str), DirectiveError> {
    let Some(eq) = line.text.find('=') else {
        return Err(DirectiveError::syntax(
            &unit.path,
            line.line,
            &line.text,
            "expected 'key = value'",
        ));
    };
    let name = line.text[..eq].trim();
    let key = lookup_key(name, line, unit)?;
    Ok((key, &line.text[eq + 1..]))
}

/// Resolves a key name, rejecting anything outside the vocabulary.
fn lookup_key(
    name: &str,
    line: &SourceLine,
    unit: &SourceUnit,
) -> Result<ConfigKey, DirectiveError> {
    ConfigKey::parse(name).ok_or_else(|| {
        DirectiveError::syntax(
            &unit.path,
            line.line,
            &line.text,
            format!("unknown configuration key '{name}'"),
        )
    })
}

/// Parses a full expression and rejects trailing garbage.
fn parse_expr_line(
    text: &str,
    line: &SourceLine,
    unit: &SourceUnit,
    bindgen: &Bindgen,
) -> Result<Value, DirectiveError> {
    let mut parser = ExprParser {
        text,
        pos: 0,
        line,
        unit,
        bindgen,
    };
    let value = parser.parse_expr()?;
    parser.skip_ws();
    if parser.pos < parser.text.len() && !parser.text[parser.pos..].trim_start().starts_with('#') {
        return Err(parser.error("unexpected trailing text after expression"));
    }
    Ok(value)
}

/// Hand-rolled cursor over one expression.
struct ExprParser<'a> {
    text: &'a str,
    pos: usize,
    line: &'a SourceLine,
    unit: &'a SourceUnit,
    bindgen: &'a Bindgen,
}

impl<'a> ExprParser<'a> {
    fn error(&self, reason: impl Into<String>) -> DirectiveError {
        DirectiveError::syntax(&self.unit.path, self.line.line, &self.line.text, reason)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn parse_expr(&mut self) -> Result<Value, DirectiveError> {
        self.skip_ws();
        match self.peek() {
            Some(quote @ ('\'' | '"')) => self.parse_string(quote).map(Value::Str),
            Some('[') => self.parse_list(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.parse_word(),
            Some(c) => Err(self.error(format!("unexpected character '{c}' in expression"))),
            None => Err(self.error("expected an expression")),
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<String, DirectiveError> {
        self.pos += quote.len_utf8();
        let rest = &self.text[self.pos..];
        let Some(close) = rest.find(quote) else {
            return Err(self.error("unterminated string literal"));
        };
        let value = rest[..close].to_string();
        self.pos += close + quote.len_utf8();
        Ok(value)
    }

    fn parse_list(&mut self) -> Result<Value, DirectiveError> {
        self.pos += 1; // consume '['
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(']') => {
                    self.pos += 1;
                    return Ok(Value::List(items));
                }
                Some(_) => {
                    match self.parse_expr()? {
                        Value::Str(s) => items.push(s),
                        Value::Bool(_) => {
                            return Err(self.error("lists may only contain strings"))
                        }
                        Value::List(_) => {
                            return Err(self.error("nested lists are not supported"))
                        }
                    }
                    self.skip_ws();
                    match self.peek() {
                        Some(',') => {
                            self.pos += 1;
                        }
                        Some(']') => {}
                        _ => return Err(self.error("expected ',' or ']' in list")),
                    }
                }
                None => return Err(self.error("unterminated list: missing ']'")),
            }
        }
    }

    /// Bare words: booleans and the binding-layer include call.
    fn parse_word(&mut self) -> Result<Value, DirectiveError> {
        let rest = &self.text[self.pos..];
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(rest.len());
        let word = &rest[..end];
        self.pos += end;

        match word {
            "true" | "True" => Ok(Value::Bool(true)),
            "false" | "False" => Ok(Value::Bool(false)),
            "bindgen.include" => {
                let user = self.parse_include_call_args()?;
                Ok(Value::Str(self.bindgen.include(user).display().to_string()))
            }
            other => Err(self.error(format!("unknown name '{other}' in expression"))),
        }
    }

    /// Parses `()` or `(user)` / `(true)` after `bindgen.include`.
    fn parse_include_call_args(&mut self) -> Result<bool, DirectiveError> {
        self.skip_ws();
        if self.peek() != Some('(') {
            return Err(self.error("expected '(' after bindgen.include"));
        }
        self.pos += 1;
        self.skip_ws();
        let rest = &self.text[self.pos..];
        let Some(close) = rest.find(')') else {
            return Err(self.error("unterminated call: missing ')'"));
        };
        let arg = rest[..close].trim();
        self.pos += close + 1;
        match arg {
            "" => Ok(false),
            "user" | "true" | "True" => Ok(true),
            other => Err(self.error(format!("unsupported argument '{other}' to bindgen.include"))),
        }
    }
}
