//! JVM descriptor decoding
//!
//! Translates descriptor strings into canonical dotted type names:
//! `Lcom/axelor/db/Model;` -> `com.axelor.db.Model`,
//! `[Ljava/lang/String;` -> `java.lang.String[]`, `I` -> `int`.
//! Nested-class separators (`$`) become `.` so that every consumer of the
//! fact base sees one naming scheme.

use crate::error::ClassParseError;

/// Canonicalize an internal class name (`com/ex/Outer$Inner`) to the dotted
/// form used throughout the store (`com.ex.Outer.Inner`).
pub fn canonical_class_name(internal: &str) -> String {
    internal.replace(['/', '$'], ".")
}

/// Decode a single field descriptor to a canonical type name.
pub fn parse_field_descriptor(descriptor: &str) -> Result<String, ClassParseError> {
    let mut parser = DescriptorParser::new(descriptor);
    let ty = parser.parse_type()?;
    if parser.remaining() != 0 {
        return Err(ClassParseError::InvalidDescriptor(descriptor.to_string()));
    }
    Ok(ty)
}

/// Decode a method descriptor into (parameter types, return type).
pub fn parse_method_descriptor(
    descriptor: &str,
) -> Result<(Vec<String>, String), ClassParseError> {
    let mut parser = DescriptorParser::new(descriptor);
    parser.expect('(')?;
    let mut parameters = Vec::new();
    while !parser.peek_char(')')? {
        parameters.push(parser.parse_type()?);
    }
    parser.expect(')')?;
    let return_type = if parser.peek_char('V')? {
        parser.advance(1);
        "void".to_string()
    } else {
        parser.parse_type()?
    };

    if parser.remaining() != 0 {
        return Err(ClassParseError::InvalidDescriptor(descriptor.to_string()));
    }

    Ok((parameters, return_type))
}

/// Method FQN in store form: `<owner>.<name>(<p1>, <p2>)`.
pub fn method_fqn(owner_fqn: &str, name: &str, params: &[String]) -> String {
    format!("{}.{}({})", owner_fqn, name, params.join(", "))
}

/// Annotation descriptor (`Ljava/lang/Override;`) to canonical FQN.
pub fn annotation_fqn(descriptor: &str) -> Option<String> {
    descriptor
        .strip_prefix('L')
        .and_then(|s| s.strip_suffix(';'))
        .map(canonical_class_name)
}

struct DescriptorParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> DescriptorParser<'a> {
    fn new(descriptor: &'a str) -> Self {
        Self {
            bytes: descriptor.as_bytes(),
            pos: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn expect(&mut self, ch: char) -> Result<(), ClassParseError> {
        if self.remaining() < 1 || self.bytes[self.pos] != ch as u8 {
            return Err(ClassParseError::InvalidDescriptor(format!(
                "expected '{}' in descriptor",
                ch
            )));
        }
        self.pos += 1;
        Ok(())
    }

    fn advance(&mut self, count: usize) {
        self.pos += count;
    }

    fn peek_char(&self, ch: char) -> Result<bool, ClassParseError> {
        if self.remaining() < 1 {
            return Err(ClassParseError::InvalidDescriptor(String::new()));
        }
        Ok(self.bytes[self.pos] == ch as u8)
    }

    fn parse_type(&mut self) -> Result<String, ClassParseError> {
        if self.remaining() == 0 {
            return Err(ClassParseError::InvalidDescriptor(String::new()));
        }

        match self.bytes[self.pos] {
            b'B' => self.primitive("byte"),
            b'C' => self.primitive("char"),
            b'D' => self.primitive("double"),
            b'F' => self.primitive("float"),
            b'I' => self.primitive("int"),
            b'J' => self.primitive("long"),
            b'S' => self.primitive("short"),
            b'Z' => self.primitive("boolean"),
            b'L' => self.parse_reference_type(),
            b'[' => self.parse_array_type(),
            other => Err(ClassParseError::InvalidDescriptor(format!(
                "unexpected descriptor tag '{}'",
                other as char
            ))),
        }
    }

    fn primitive(&mut self, name: &str) -> Result<String, ClassParseError> {
        self.pos += 1;
        Ok(name.to_string())
    }

    fn parse_reference_type(&mut self) -> Result<String, ClassParseError> {
        self.expect('L')?;
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b';' {
            self.pos += 1;
        }
        if self.pos >= self.bytes.len() {
            return Err(ClassParseError::InvalidDescriptor(
                "unterminated reference descriptor".into(),
            ));
        }
        let name = &self.bytes[start..self.pos];
        self.pos += 1; // consume ';'
        let internal = std::str::from_utf8(name)
            .map_err(|_| ClassParseError::InvalidDescriptor("non-UTF-8 class name".into()))?;
        Ok(canonical_class_name(internal))
    }

    fn parse_array_type(&mut self) -> Result<String, ClassParseError> {
        let mut dimensions = 0;
        while self.remaining() > 0 && self.bytes[self.pos] == b'[' {
            dimensions += 1;
            self.pos += 1;
        }
        let element = self.parse_type()?;
        let mut ty = element;
        for _ in 0..dimensions {
            ty.push_str("[]");
        }
        Ok(ty)
    }
}
