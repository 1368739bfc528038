//! Recursive-descent parser for the filter string representation.

use dirtree_entry::Value;

use crate::ast::{Assertion, Extensible, Filter, Substrings};
use crate::error::{FilterError, FilterResult};

/// Parse a filter such as `(&(objectClass=person)(cn=foo*))`.
///
/// Whitespace is only allowed inside values; leading or trailing
/// whitespace, or whitespace next to parentheses and operators, is an error.
pub fn parse_filter(text: &str) -> FilterResult<Filter> {
    let mut parser = Parser::new(text);
    let filter = parser.filter()?;
    if parser.pos != parser.bytes.len() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(filter)
}

/// Parse a bare value for `attribute`, with `*` as a wildcard.
///
/// Yields `Present` for exactly `*`, `Equality` when the text has no
/// unescaped `*`, and `Substrings` otherwise. Parentheses need no escaping
/// and empty fragments between stars are dropped.
///
/// ```
/// use dirtree_filter::{parse_maybe_substring, Filter};
///
/// assert_eq!(parse_maybe_substring("cn", "*").unwrap(), Filter::present("cn"));
/// assert_eq!(parse_maybe_substring("cn", "foo").unwrap(), Filter::equality("cn", "foo"));
/// assert_eq!(parse_maybe_substring("cn", "f*o").unwrap().to_string(), "(cn=f*o)");
/// ```
pub fn parse_maybe_substring(attribute: &str, text: &str) -> FilterResult<Filter> {
    let mut parser = Parser::new(text);
    let mut fragments = vec![Vec::new()];
    while let Some(b) = parser.peek() {
        parser.pos += 1;
        match b {
            b'*' => fragments.push(Vec::new()),
            b'\\' => {
                let decoded = parser.hex_escape()?;
                if let Some(last) = fragments.last_mut() {
                    last.push(decoded);
                }
            }
            b => {
                if let Some(last) = fragments.last_mut() {
                    last.push(b);
                }
            }
        }
    }

    if fragments.len() == 1 {
        let value = fragments.pop().unwrap_or_default();
        return Ok(Filter::equality(attribute, value));
    }

    let last = fragments.len() - 1;
    let mut substrings = Substrings {
        attribute: attribute.to_string(),
        initial: None,
        any: Vec::new(),
        final_: None,
    };
    for (i, fragment) in fragments.into_iter().enumerate() {
        if fragment.is_empty() {
            continue;
        }
        let value = Value::new(fragment);
        if i == 0 {
            substrings.initial = Some(value);
        } else if i == last {
            substrings.final_ = Some(value);
        } else {
            substrings.any.push(value);
        }
    }
    if substrings.initial.is_none() && substrings.any.is_empty() && substrings.final_.is_none() {
        return Ok(Filter::Present(substrings.attribute));
    }
    Ok(Filter::Substrings(substrings))
}

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> FilterError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> FilterError {
        FilterError::Parse {
            message: message.into(),
            offset,
            text: self.text.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect(&mut self, expected: u8) -> FilterResult<()> {
        match self.peek() {
            Some(b) if b == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(self.error(format!(
                "expected {:?}, found {:?}",
                expected as char, b as char
            ))),
            None => Err(self.error(format!("expected {:?}, found end of input", expected as char))),
        }
    }

    fn filter(&mut self) -> FilterResult<Filter> {
        self.expect(b'(')?;
        let filter = match self.peek() {
            Some(b'&') => {
                self.pos += 1;
                Filter::And(self.filter_list()?)
            }
            Some(b'|') => {
                self.pos += 1;
                Filter::Or(self.filter_list()?)
            }
            Some(b'!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.filter()?))
            }
            _ => self.item()?,
        };
        self.expect(b')')?;
        Ok(filter)
    }

    fn filter_list(&mut self) -> FilterResult<Vec<Filter>> {
        let mut filters = vec![self.filter()?];
        while self.peek() == Some(b'(') {
            filters.push(self.filter()?);
        }
        Ok(filters)
    }

    fn item(&mut self) -> FilterResult<Filter> {
        if self.peek() == Some(b':') {
            return self.extensible(None);
        }
        let attribute = self.attribute_description()?;
        match self.peek() {
            Some(b'=') => {
                self.pos += 1;
                self.equality_or_substrings(attribute)
            }
            Some(b'~') => {
                self.pos += 1;
                self.expect(b'=')?;
                Ok(Filter::Approx(Assertion::new(attribute, self.value()?)))
            }
            Some(b'>') => {
                self.pos += 1;
                self.expect(b'=')?;
                Ok(Filter::GreaterOrEqual(Assertion::new(attribute, self.value()?)))
            }
            Some(b'<') => {
                self.pos += 1;
                self.expect(b'=')?;
                Ok(Filter::LessOrEqual(Assertion::new(attribute, self.value()?)))
            }
            Some(b':') => self.extensible(Some(attribute)),
            Some(b) => Err(self.error(format!("unexpected {:?} after attribute", b as char))),
            None => Err(self.error("unexpected end of input after attribute")),
        }
    }

    /// `keystring` or `numericoid`, optionally followed by `;option`s.
    fn attribute_description(&mut self) -> FilterResult<String> {
        let start = self.pos;
        match self.peek() {
            Some(b) if b.is_ascii_alphanumeric() => {}
            Some(b) => return Err(self.error(format!("expected attribute, found {:?}", b as char))),
            None => return Err(self.error("expected attribute, found end of input")),
        }
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'.' || b == b';' {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(self.text[start..self.pos].to_string())
    }

    fn token(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        &self.text[start..self.pos]
    }

    fn extensible(&mut self, attribute: Option<String>) -> FilterResult<Filter> {
        let start = self.pos;
        let mut dn_attributes = false;
        let mut matching_rule = None;
        loop {
            self.expect(b':')?;
            if self.peek() == Some(b'=') {
                self.pos += 1;
                break;
            }
            let token_start = self.pos;
            let token = self.token();
            if token.is_empty() {
                return Err(self.error("expected \"dn\" or a matching rule"));
            }
            if token.eq_ignore_ascii_case("dn") && !dn_attributes && matching_rule.is_none() {
                dn_attributes = true;
            } else if matching_rule.is_none() {
                matching_rule = Some(token.to_string());
            } else {
                return Err(self.error_at(token_start, "unexpected token in extensible match"));
            }
        }
        if attribute.is_none() && matching_rule.is_none() {
            return Err(self.error_at(start, "extensible match without attribute needs a matching rule"));
        }
        Ok(Filter::Extensible(Extensible {
            attribute,
            dn_attributes,
            matching_rule,
            value: self.value()?,
        }))
    }

    fn equality_or_substrings(&mut self, attribute: String) -> FilterResult<Filter> {
        let mut fragments = vec![self.value_bytes(true)?];
        while self.peek() == Some(b'*') {
            self.pos += 1;
            fragments.push(self.value_bytes(true)?);
        }

        if fragments.len() == 1 {
            let value = fragments.pop().unwrap_or_default();
            return Ok(Filter::equality(attribute, value));
        }
        if fragments.len() == 2 && fragments.iter().all(Vec::is_empty) {
            return Ok(Filter::Present(attribute));
        }

        let last = fragments.len() - 1;
        let mut substrings = Substrings {
            attribute,
            initial: None,
            any: Vec::new(),
            final_: None,
        };
        for (i, fragment) in fragments.into_iter().enumerate() {
            if i == 0 {
                substrings.initial = (!fragment.is_empty()).then(|| Value::new(fragment));
            } else if i == last {
                substrings.final_ = (!fragment.is_empty()).then(|| Value::new(fragment));
            } else if fragment.is_empty() {
                return Err(self.error("empty substring between '*'"));
            } else {
                substrings.any.push(Value::new(fragment));
            }
        }
        Ok(Filter::Substrings(substrings))
    }

    fn value(&mut self) -> FilterResult<Value> {
        Ok(Value::new(self.value_bytes(false)?))
    }

    /// Read a value up to the closing `)`, or up to `*` when `stars` is set.
    fn value_bytes(&mut self, stars: bool) -> FilterResult<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(b) = self.peek() {
            match b {
                b')' => break,
                b'*' if stars => break,
                b'*' | b'(' | 0 => {
                    return Err(self.error(format!("unescaped {:?} in value", b as char)))
                }
                b'\\' => {
                    self.pos += 1;
                    out.push(self.hex_escape()?);
                }
                b => {
                    self.pos += 1;
                    out.push(b);
                }
            }
        }
        Ok(out)
    }

    /// Decode the two hex digits following a backslash.
    fn hex_escape(&mut self) -> FilterResult<u8> {
        let pair = self
            .bytes
            .get(self.pos..self.pos + 2)
            .ok_or_else(|| self.error("truncated escape"))?;
        let decoded = hex::decode(pair).map_err(|_| self.error("invalid hex escape"))?;
        self.pos += 2;
        Ok(decoded[0])
    }
}
