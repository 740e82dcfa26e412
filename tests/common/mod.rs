//! Synthetic class-file builder for tests
//!
//! Assembles minimal but structurally valid JVM class images: constant
//! pool, fields, methods with Code attributes, LineNumberTable entries
//! and runtime-visible annotations. Enough surface to exercise every
//! extraction path without shelling out to a Java toolchain.

// Not every test binary touches every helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_ENUM: u16 = 0x4000;

pub const INVOKEVIRTUAL: u8 = 0xb6;
pub const INVOKESPECIAL: u8 = 0xb7;
pub const INVOKESTATIC: u8 = 0xb8;
pub const INVOKEINTERFACE: u8 = 0xb9;

const RETURN: u8 = 0xb1;

/// Incrementally built constant pool with entry dedup.
#[derive(Default)]
struct Pool {
    entries: Vec<Vec<u8>>,
    lookup: HashMap<Vec<u8>, u16>,
}

impl Pool {
    fn add(&mut self, entry: Vec<u8>) -> u16 {
        if let Some(&index) = self.lookup.get(&entry) {
            return index;
        }
        self.entries.push(entry.clone());
        let index = self.entries.len() as u16; // 1-based
        self.lookup.insert(entry, index);
        index
    }

    fn utf8(&mut self, value: &str) -> u16 {
        let mut entry = vec![1u8];
        entry.extend_from_slice(&(value.len() as u16).to_be_bytes());
        entry.extend_from_slice(value.as_bytes());
        self.add(entry)
    }

    fn class(&mut self, internal_name: &str) -> u16 {
        let name_index = self.utf8(internal_name);
        let mut entry = vec![7u8];
        entry.extend_from_slice(&name_index.to_be_bytes());
        self.add(entry)
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let mut entry = vec![12u8];
        entry.extend_from_slice(&name_index.to_be_bytes());
        entry.extend_from_slice(&descriptor_index.to_be_bytes());
        self.add(entry)
    }

    fn method_ref(&mut self, tag: u8, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(owner);
        let nat_index = self.name_and_type(name, descriptor);
        let mut entry = vec![tag];
        entry.extend_from_slice(&class_index.to_be_bytes());
        entry.extend_from_slice(&nat_index.to_be_bytes());
        self.add(entry)
    }
}

/// One invoke instruction to place in a method body.
pub struct Call {
    pub opcode: u8,
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    /// Source line for the call site; None leaves it off the line table.
    pub line: Option<u16>,
}

/// One method under construction.
pub struct Method {
    name: String,
    descriptor: String,
    access: u16,
    start_line: Option<u16>,
    calls: Vec<Call>,
    annotations: Vec<String>,
    has_code: bool,
}

impl Method {
    pub fn new(name: &str, descriptor: &str, access: u16) -> Self {
        Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access,
            start_line: None,
            calls: Vec::new(),
            annotations: Vec::new(),
            has_code: true,
        }
    }

    /// First line of the method body (LineNumberTable entry at pc 0).
    pub fn line(mut self, line: u16) -> Self {
        self.start_line = Some(line);
        self
    }

    pub fn call(mut self, opcode: u8, owner: &str, name: &str, descriptor: &str, line: u16) -> Self {
        self.calls.push(Call {
            opcode,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            line: Some(line),
        });
        self
    }

    /// Annotation by descriptor, e.g. `Ljava/lang/Override;`.
    pub fn annotation(mut self, descriptor: &str) -> Self {
        self.annotations.push(descriptor.to_string());
        self
    }

    /// Abstract/native methods carry no Code attribute.
    pub fn without_code(mut self) -> Self {
        self.has_code = false;
        self
    }
}

/// Builder for one class image.
pub struct ClassFile {
    this_class: String,
    super_class: Option<String>,
    access: u16,
    interfaces: Vec<String>,
    fields: Vec<(String, String)>,
    methods: Vec<Method>,
}

impl ClassFile {
    /// Public class extending `java/lang/Object`.
    pub fn new(internal_name: &str) -> Self {
        Self {
            this_class: internal_name.to_string(),
            super_class: Some("java/lang/Object".to_string()),
            access: ACC_PUBLIC | ACC_SUPER,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn access(mut self, access: u16) -> Self {
        self.access = access;
        self
    }

    pub fn extends(mut self, internal_name: &str) -> Self {
        self.super_class = Some(internal_name.to_string());
        self
    }

    pub fn implements(mut self, internal_name: &str) -> Self {
        self.interfaces.push(internal_name.to_string());
        self
    }

    /// Field by name and descriptor, e.g. `("repo", "Lcom/ex/Repo;")`.
    pub fn field(mut self, name: &str, descriptor: &str) -> Self {
        self.fields.push((name.to_string(), descriptor.to_string()));
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut pool = Pool::default();

        let this_index = pool.class(&self.this_class);
        let super_index = self.super_class.as_deref().map(|s| pool.class(s)).unwrap_or(0);
        let interface_indices: Vec<u16> =
            self.interfaces.iter().map(|i| pool.class(i)).collect();

        let field_indices: Vec<(u16, u16)> = self
            .fields
            .iter()
            .map(|(name, descriptor)| (pool.utf8(name), pool.utf8(descriptor)))
            .collect();

        // Method bodies and attributes are rendered before the pool is
        // serialized, since they intern constants as they go.
        let mut rendered_methods: Vec<Vec<u8>> = Vec::new();
        for method in &self.methods {
            rendered_methods.push(render_method(&mut pool, method));
        }

        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // minor
        out.extend_from_slice(&52u16.to_be_bytes()); // major: Java 8

        out.extend_from_slice(&((pool.entries.len() + 1) as u16).to_be_bytes());
        for entry in &pool.entries {
            out.extend_from_slice(entry);
        }

        out.extend_from_slice(&self.access.to_be_bytes());
        out.extend_from_slice(&this_index.to_be_bytes());
        out.extend_from_slice(&super_index.to_be_bytes());

        out.extend_from_slice(&(interface_indices.len() as u16).to_be_bytes());
        for index in &interface_indices {
            out.extend_from_slice(&index.to_be_bytes());
        }

        out.extend_from_slice(&(field_indices.len() as u16).to_be_bytes());
        for (name_index, descriptor_index) in &field_indices {
            out.extend_from_slice(&ACC_PRIVATE.to_be_bytes());
            out.extend_from_slice(&name_index.to_be_bytes());
            out.extend_from_slice(&descriptor_index.to_be_bytes());
            out.extend_from_slice(&0u16.to_be_bytes()); // no attributes
        }

        out.extend_from_slice(&(rendered_methods.len() as u16).to_be_bytes());
        for rendered in &rendered_methods {
            out.extend_from_slice(rendered);
        }

        out.extend_from_slice(&0u16.to_be_bytes()); // no class attributes
        out
    }
}

fn render_method(pool: &mut Pool, method: &Method) -> Vec<u8> {
    let name_index = pool.utf8(&method.name);
    let descriptor_index = pool.utf8(&method.descriptor);

    let mut attributes: Vec<Vec<u8>> = Vec::new();
    if method.has_code {
        attributes.push(render_code(pool, method));
    }
    if !method.annotations.is_empty() {
        attributes.push(render_annotations(pool, &method.annotations));
    }

    let mut out = Vec::new();
    out.extend_from_slice(&method.access.to_be_bytes());
    out.extend_from_slice(&name_index.to_be_bytes());
    out.extend_from_slice(&descriptor_index.to_be_bytes());
    out.extend_from_slice(&(attributes.len() as u16).to_be_bytes());
    for attribute in attributes {
        out.extend_from_slice(&attribute);
    }
    out
}

fn render_code(pool: &mut Pool, method: &Method) -> Vec<u8> {
    let mut code: Vec<u8> = Vec::new();
    let mut line_entries: Vec<(u16, u16)> = Vec::new();

    if let Some(line) = method.start_line {
        line_entries.push((0, line));
    }

    for call in &method.calls {
        let pc = code.len() as u16;
        if let Some(line) = call.line {
            line_entries.push((pc, line));
        }
        let tag = if call.opcode == INVOKEINTERFACE { 11 } else { 10 };
        let ref_index = pool.method_ref(tag, &call.owner, &call.name, &call.descriptor);
        code.push(call.opcode);
        code.extend_from_slice(&ref_index.to_be_bytes());
        if call.opcode == INVOKEINTERFACE {
            code.push(1); // count
            code.push(0); // reserved
        }
    }
    code.push(RETURN);

    let mut body = Vec::new();
    body.extend_from_slice(&8u16.to_be_bytes()); // max_stack
    body.extend_from_slice(&8u16.to_be_bytes()); // max_locals
    body.extend_from_slice(&(code.len() as u32).to_be_bytes());
    body.extend_from_slice(&code);
    body.extend_from_slice(&0u16.to_be_bytes()); // exception table

    if line_entries.is_empty() {
        body.extend_from_slice(&0u16.to_be_bytes()); // no code attributes
    } else {
        let lnt_name = pool.utf8("LineNumberTable");
        let mut table = Vec::new();
        table.extend_from_slice(&(line_entries.len() as u16).to_be_bytes());
        for (pc, line) in &line_entries {
            table.extend_from_slice(&pc.to_be_bytes());
            table.extend_from_slice(&line.to_be_bytes());
        }
        body.extend_from_slice(&1u16.to_be_bytes());
        body.extend_from_slice(&lnt_name.to_be_bytes());
        body.extend_from_slice(&(table.len() as u32).to_be_bytes());
        body.extend_from_slice(&table);
    }

    let code_name = pool.utf8("Code");
    let mut out = Vec::new();
    out.extend_from_slice(&code_name.to_be_bytes());
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
    out
}

fn render_annotations(pool: &mut Pool, descriptors: &[String]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(descriptors.len() as u16).to_be_bytes());
    for descriptor in descriptors {
        let type_index = pool.utf8(descriptor);
        body.extend_from_slice(&type_index.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes()); // no element-value pairs
    }

    let attr_name = pool.utf8("RuntimeVisibleAnnotations");
    let mut out = Vec::new();
    out.extend_from_slice(&attr_name.to_be_bytes());
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
    out
}

/// Write a class image under `dir` at its conventional relative path
/// (`com/ex/Empty` -> `com/ex/Empty.class`).
pub fn write_class(dir: &Path, internal_name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(format!("{}.class", internal_name));
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, bytes).unwrap();
    path
}
