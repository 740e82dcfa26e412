//! Class image decoding
//!
//! Parses one compiled JVM class into a [`ClassView`]: class-level access
//! flags and names, declared fields with resolved types, and methods with
//! their annotations, line-number tables and method-invocation sites.
//! The decoder performs no I/O; callers hand it the raw bytes.
//!
//! Name canonicalization happens here, once: internal slash-separated
//! names become dotted FQNs, `$` nesting separators become `.`, and
//! descriptors are decoded to source-like type names (`int`,
//! `java.lang.String[]`). Downstream consumers never see JVM internal
//! forms.

mod descriptor;
mod opcodes;
mod pool;
mod reader;

pub use descriptor::{
    annotation_fqn, canonical_class_name, method_fqn, parse_field_descriptor,
    parse_method_descriptor,
};
pub use opcodes::{INVOKESPECIAL, InvocationSite, scan_invocations};

use crate::error::ClassParseError;

use pool::ConstantPool;
use reader::ClassReader;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_ENUM: u16 = 0x4000;

/// Decoded view of one class image.
#[derive(Debug, Clone)]
pub struct ClassView {
    /// Canonical dotted FQN (nested classes use `.`, not `$`).
    pub fqn: String,
    pub access: u16,
    /// Canonical superclass FQN; `None` only for `java.lang.Object` itself
    /// and module-info images.
    pub super_fqn: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldView>,
    pub methods: Vec<MethodView>,
}

impl ClassView {
    pub fn is_interface(&self) -> bool {
        self.access & ACC_INTERFACE != 0
    }

    pub fn is_enum(&self) -> bool {
        self.access & ACC_ENUM != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.access & ACC_ABSTRACT != 0
    }
}

#[derive(Debug, Clone)]
pub struct FieldView {
    pub name: String,
    /// Canonical declared type (`com.ex.Thing`, `int`, `byte[]`).
    pub type_name: String,
    pub access: u16,
}

#[derive(Debug, Clone)]
pub struct MethodView {
    /// Simple name; constructors are `<init>`.
    pub name: String,
    pub access: u16,
    pub params: Vec<String>,
    pub return_type: String,
    /// Canonical FQNs of declared annotations, visible and invisible.
    pub annotations: Vec<String>,
    /// Line of the first instruction per the LineNumberTable, or -1.
    pub line: i64,
    pub calls: Vec<CallSite>,
}

/// One method-invocation instruction inside a method body.
#[derive(Debug, Clone)]
pub struct CallSite {
    /// Target method FQN: `owner.name(p1, p2)`.
    pub target_fqn: String,
    pub opcode: u8,
    /// Whether the target's simple name is `<init>`.
    pub targets_constructor: bool,
    /// Source line of the call site, or -1 without line info.
    pub line: i64,
}

/// Decode a class image into a [`ClassView`].
///
/// Partial views are never returned: any structural error yields
/// [`ClassParseError`] and the caller records the file as malformed.
pub fn parse_class_view(bytes: &[u8]) -> Result<ClassView, ClassParseError> {
    let mut reader = ClassReader::new(bytes);
    reader.expect_magic()?;
    let _minor_version = reader.read_u2()?;
    let _major_version = reader.read_u2()?;
    let pool = ConstantPool::parse(&mut reader)?;

    let access = reader.read_u2()?;
    let this_class = reader.read_u2()?;
    let super_class = reader.read_u2()?;
    let fqn = canonical_class_name(pool.class_name(this_class)?);
    let super_fqn = if super_class == 0 {
        None
    } else {
        Some(canonical_class_name(pool.class_name(super_class)?))
    };

    let interfaces_count = reader.read_u2()?;
    let mut interfaces = Vec::with_capacity(interfaces_count as usize);
    for _ in 0..interfaces_count {
        let iface_index = reader.read_u2()?;
        interfaces.push(canonical_class_name(pool.class_name(iface_index)?));
    }

    let fields_count = reader.read_u2()?;
    let mut fields = Vec::with_capacity(fields_count as usize);
    for _ in 0..fields_count {
        let field_access = reader.read_u2()?;
        let name_index = reader.read_u2()?;
        let descriptor_index = reader.read_u2()?;
        let name = pool.utf8(name_index)?.to_string();
        let type_name = parse_field_descriptor(pool.utf8(descriptor_index)?)?;
        let attributes_count = reader.read_u2()?;
        skip_attributes(&mut reader, attributes_count)?;
        fields.push(FieldView {
            name,
            type_name,
            access: field_access,
        });
    }

    let methods_count = reader.read_u2()?;
    let mut methods = Vec::with_capacity(methods_count as usize);
    for _ in 0..methods_count {
        methods.push(parse_method(&mut reader, &pool)?);
    }

    // Class-level attributes carry nothing the fact base needs.
    let attributes_count = reader.read_u2()?;
    skip_attributes(&mut reader, attributes_count)?;

    Ok(ClassView {
        fqn,
        access,
        super_fqn,
        interfaces,
        fields,
        methods,
    })
}

fn parse_method(
    reader: &mut ClassReader<'_>,
    pool: &ConstantPool,
) -> Result<MethodView, ClassParseError> {
    let access = reader.read_u2()?;
    let name_index = reader.read_u2()?;
    let descriptor_index = reader.read_u2()?;
    let name = pool.utf8(name_index)?.to_string();
    let (params, return_type) = parse_method_descriptor(pool.utf8(descriptor_index)?)?;

    let mut annotations = Vec::new();
    let mut line = -1i64;
    let mut calls = Vec::new();

    let attributes_count = reader.read_u2()?;
    for _ in 0..attributes_count {
        let attr_name_index = reader.read_u2()?;
        let attr_length = reader.read_u4()? as usize;
        let attr_name = pool.utf8(attr_name_index)?;
        match attr_name {
            "Code" => {
                let slice = reader.read_slice(attr_length)?;
                let body = parse_code_attribute(slice, pool)?;
                line = body.start_line;
                calls = body.calls;
            }
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                let slice = reader.read_slice(attr_length)?;
                collect_annotations(slice, pool, &mut annotations)?;
            }
            _ => reader.skip(attr_length)?,
        }
    }

    Ok(MethodView {
        name,
        access,
        params,
        return_type,
        annotations,
        line,
        calls,
    })
}

struct MethodBody {
    start_line: i64,
    calls: Vec<CallSite>,
}

/// Parse a Code attribute: instruction stream plus its LineNumberTable.
fn parse_code_attribute(bytes: &[u8], pool: &ConstantPool) -> Result<MethodBody, ClassParseError> {
    let mut reader = ClassReader::new(bytes);
    let _max_stack = reader.read_u2()?;
    let _max_locals = reader.read_u2()?;
    let code_length = reader.read_u4()? as usize;
    let code = reader.read_slice(code_length)?;

    let exception_count = reader.read_u2()?;
    reader.skip(exception_count as usize * 8)?;

    // A Code attribute may carry several LineNumberTable attributes;
    // their entries are merged before lookup.
    let mut line_entries: Vec<(u32, i64)> = Vec::new();
    let attributes_count = reader.read_u2()?;
    for _ in 0..attributes_count {
        let attr_name_index = reader.read_u2()?;
        let attr_length = reader.read_u4()? as usize;
        let attr_name = pool.utf8(attr_name_index)?;
        if attr_name == "LineNumberTable" {
            let slice = reader.read_slice(attr_length)?;
            let mut sub = ClassReader::new(slice);
            let entry_count = sub.read_u2()?;
            for _ in 0..entry_count {
                let start_pc = sub.read_u2()? as u32;
                let line = sub.read_u2()? as i64;
                line_entries.push((start_pc, line));
            }
        } else {
            reader.skip(attr_length)?;
        }
    }
    line_entries.sort_unstable();

    let start_line = line_entries.first().map(|&(_, l)| l).unwrap_or(-1);

    let mut calls = Vec::new();
    for site in scan_invocations(code)? {
        let (owner, target_name, target_descriptor) = pool.method_ref(site.cp_index)?;
        let owner_fqn = canonical_class_name(owner);
        let (target_params, _ret) = parse_method_descriptor(target_descriptor)?;
        calls.push(CallSite {
            target_fqn: method_fqn(&owner_fqn, target_name, &target_params),
            opcode: site.opcode,
            targets_constructor: target_name == "<init>",
            line: line_at(&line_entries, site.pc),
        });
    }

    Ok(MethodBody { start_line, calls })
}

/// Line associated with the instruction at `pc`: the entry with the
/// greatest start_pc not exceeding it.
fn line_at(entries: &[(u32, i64)], pc: u32) -> i64 {
    let mut line = -1;
    for &(start_pc, entry_line) in entries {
        if start_pc > pc {
            break;
        }
        line = entry_line;
    }
    line
}

/// Collect annotation type FQNs from a RuntimeVisible/InvisibleAnnotations
/// attribute body. Element values are skipped structurally.
fn collect_annotations(
    bytes: &[u8],
    pool: &ConstantPool,
    out: &mut Vec<String>,
) -> Result<(), ClassParseError> {
    let mut reader = ClassReader::new(bytes);
    let count = reader.read_u2()?;
    for _ in 0..count {
        read_annotation(&mut reader, pool, out)?;
    }
    Ok(())
}

fn read_annotation(
    reader: &mut ClassReader<'_>,
    pool: &ConstantPool,
    out: &mut Vec<String>,
) -> Result<(), ClassParseError> {
    let type_index = reader.read_u2()?;
    if let Some(fqn) = annotation_fqn(pool.utf8(type_index)?) {
        out.push(fqn);
    }
    let pair_count = reader.read_u2()?;
    for _ in 0..pair_count {
        let _element_name_index = reader.read_u2()?;
        skip_element_value(reader, pool)?;
    }
    Ok(())
}

/// Skip one element_value structure (annotation parameter payload).
fn skip_element_value(
    reader: &mut ClassReader<'_>,
    pool: &ConstantPool,
) -> Result<(), ClassParseError> {
    let tag = reader.read_u1()?;
    match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' | b'c' => {
            reader.read_u2()?;
        }
        b'e' => {
            reader.read_u2()?;
            reader.read_u2()?;
        }
        b'@' => {
            // Nested annotation; its type is not a declared method
            // annotation, so discard into a scratch vector.
            let mut scratch = Vec::new();
            read_annotation(reader, pool, &mut scratch)?;
        }
        b'[' => {
            let count = reader.read_u2()?;
            for _ in 0..count {
                skip_element_value(reader, pool)?;
            }
        }
        other => {
            return Err(ClassParseError::InvalidDescriptor(format!(
                "unknown element_value tag '{}'",
                other as char
            )))
        }
    }
    Ok(())
}

fn skip_attributes(reader: &mut ClassReader<'_>, count: u16) -> Result<(), ClassParseError> {
    for _ in 0..count {
        reader.read_u2()?; // attribute_name_index
        let length = reader.read_u4()? as usize;
        reader.skip(length)?;
    }
    Ok(())
}
