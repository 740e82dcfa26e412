//! Decoder and fact-emitter tests over synthetic class images
//!
//! Each scenario assembles a real class file byte-for-byte, decodes it,
//! and checks the emitted fact stream against the taxonomy.

mod common;

use common::{
    ACC_ABSTRACT, ACC_ENUM, ACC_INTERFACE, ACC_PROTECTED, ACC_PUBLIC, ACC_SUPER, ClassFile,
    INVOKEINTERFACE, INVOKESPECIAL, INVOKESTATIC, INVOKEVIRTUAL, Method,
};

use meridian::classfile::parse_class_view;
use meridian::error::ClassParseError;
use meridian::facts::{EdgeKind, EdgeType, NodeType, Visibility, emit_class_facts};

#[test]
fn minimal_class_yields_one_node_and_no_edges() {
    let bytes = ClassFile::new("com/ex/Empty").build();
    let view = parse_class_view(&bytes).unwrap();

    assert_eq!(view.fqn, "com.ex.Empty");
    assert_eq!(view.super_fqn.as_deref(), Some("java.lang.Object"));

    let facts = emit_class_facts(&view);
    assert_eq!(facts.nodes.len(), 1);
    assert_eq!(facts.nodes[0].node_type, NodeType::Class);
    assert_eq!(facts.nodes[0].visibility, Visibility::Public);
    assert!(!facts.nodes[0].has_override);
    assert!(!facts.nodes[0].is_transactional);
    assert!(facts.edges.is_empty());
}

#[test]
fn inheritance_edges_skip_object_but_keep_interfaces() {
    let bytes = ClassFile::new("com/ex/Child")
        .extends("com/ex/Parent")
        .implements("com/ex/I1")
        .implements("com/ex/I2")
        .build();
    let facts = emit_class_facts(&parse_class_view(&bytes).unwrap());

    let inheritance: Vec<_> = facts
        .edges
        .iter()
        .filter(|e| e.edge_type == EdgeType::Inheritance)
        .collect();
    assert_eq!(inheritance.len(), 3);
    assert!(inheritance
        .iter()
        .any(|e| e.kind == EdgeKind::Extends && e.to_fqn == "com.ex.Parent"));
    assert!(inheritance
        .iter()
        .any(|e| e.kind == EdgeKind::Implements && e.to_fqn == "com.ex.I1"));
    assert!(inheritance
        .iter()
        .any(|e| e.kind == EdgeKind::Implements && e.to_fqn == "com.ex.I2"));
    assert!(!inheritance.iter().any(|e| e.to_fqn == "java.lang.Object"));
}

#[test]
fn constructor_invocation_becomes_call_new() {
    // public void f() { new com.ex.B().g(); }
    let bytes = ClassFile::new("com/ex/A")
        .method(
            Method::new("f", "()V", ACC_PUBLIC)
                .line(3)
                .call(INVOKESPECIAL, "com/ex/B", "<init>", "()V", 3)
                .call(INVOKEVIRTUAL, "com/ex/B", "g", "()V", 3),
        )
        .build();
    let facts = emit_class_facts(&parse_class_view(&bytes).unwrap());

    let method_node = facts
        .nodes
        .iter()
        .find(|n| n.node_type == NodeType::Method)
        .unwrap();
    assert_eq!(method_node.fqn, "com.ex.A.f()");
    assert_eq!(method_node.line, Some(3));

    assert!(facts.edges.iter().any(|e| {
        e.edge_type == EdgeType::MemberOf
            && e.kind == EdgeKind::Method
            && e.from_fqn == "com.ex.A.f()"
            && e.to_fqn == "com.ex.A"
    }));
    assert!(facts.edges.iter().any(|e| {
        e.edge_type == EdgeType::Call
            && e.kind == EdgeKind::New
            && e.to_fqn == "com.ex.B.<init>()"
            && e.from_line == Some(3)
    }));
    assert!(facts.edges.iter().any(|e| {
        e.edge_type == EdgeType::Call && e.kind == EdgeKind::Standard && e.to_fqn == "com.ex.B.g()"
    }));
}

#[test]
fn parameter_and_return_types_respect_pervasive_filter() {
    // public com.ex.R m(com.ex.P1 p, String s, int i)
    let bytes = ClassFile::new("com/ex/A")
        .method(Method::new(
            "m",
            "(Lcom/ex/P1;Ljava/lang/String;I)Lcom/ex/R;",
            ACC_PUBLIC,
        ))
        .build();
    let facts = emit_class_facts(&parse_class_view(&bytes).unwrap());

    let method_fqn = "com.ex.A.m(com.ex.P1, java.lang.String, int)";
    assert!(facts.nodes.iter().any(|n| n.fqn == method_fqn));

    assert!(facts.edges.iter().any(|e| {
        e.kind == EdgeKind::Return && e.from_fqn == "com.ex.R" && e.to_fqn == method_fqn
    }));
    assert!(facts.edges.iter().any(|e| {
        e.kind == EdgeKind::Argument && e.from_fqn == "com.ex.P1" && e.to_fqn == method_fqn
    }));
    assert!(!facts
        .edges
        .iter()
        .any(|e| e.from_fqn == "java.lang.String" || e.from_fqn == "int"));
}

#[test]
fn annotations_drive_override_and_transactional_flags() {
    let bytes = ClassFile::new("com/ex/A")
        .method(
            Method::new("h", "()V", ACC_PROTECTED)
                .line(12)
                .annotation("Ljava/lang/Override;")
                .annotation("Lorg/springframework/transaction/annotation/Transactional;"),
        )
        .build();
    let facts = emit_class_facts(&parse_class_view(&bytes).unwrap());

    let node = facts
        .nodes
        .iter()
        .find(|n| n.node_type == NodeType::Method)
        .unwrap();
    assert_eq!(node.visibility, Visibility::Protected);
    assert!(node.has_override);
    assert!(node.is_transactional);
}

#[test]
fn field_types_emit_member_of_class_edges() {
    let bytes = ClassFile::new("com/ex/Service")
        .field("repo", "Lcom/ex/Repo;")
        .field("name", "Ljava/lang/String;")
        .field("count", "I")
        .build();
    let facts = emit_class_facts(&parse_class_view(&bytes).unwrap());

    let fields: Vec<_> = facts
        .edges
        .iter()
        .filter(|e| e.kind == EdgeKind::Class)
        .collect();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].from_fqn, "com.ex.Repo");
    assert_eq!(fields[0].to_fqn, "com.ex.Service");
}

#[test]
fn method_without_line_table_reports_minus_one() {
    let bytes = ClassFile::new("com/ex/A")
        .method(
            Method::new("f", "()V", ACC_PUBLIC).call(INVOKESTATIC, "com/ex/Util", "go", "()V", 0),
        )
        .build();
    // Rebuild without the call's line entry: use a body with no lines at all.
    let bytes_no_lines = ClassFile::new("com/ex/B")
        .method(Method::new("g", "()V", ACC_PUBLIC))
        .build();

    let view = parse_class_view(&bytes_no_lines).unwrap();
    assert_eq!(view.methods[0].line, -1);

    let with_line_zero = parse_class_view(&bytes).unwrap();
    assert_eq!(with_line_zero.methods[0].calls[0].line, 0);
}

#[test]
fn interface_and_enum_access_flags_set_node_type() {
    let iface = ClassFile::new("com/ex/Api")
        .access(ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
        .build();
    let facts = emit_class_facts(&parse_class_view(&iface).unwrap());
    assert_eq!(facts.node_type, NodeType::Interface);

    let enum_bytes = ClassFile::new("com/ex/Color")
        .access(ACC_PUBLIC | ACC_SUPER | ACC_ENUM)
        .extends("java/lang/Enum")
        .build();
    let facts = emit_class_facts(&parse_class_view(&enum_bytes).unwrap());
    assert_eq!(facts.node_type, NodeType::Enum);
}

#[test]
fn nested_class_names_are_canonicalized_with_dots() {
    let bytes = ClassFile::new("com/ex/Outer$Inner")
        .method(Method::new("f", "(Lcom/ex/Outer$Helper;)V", ACC_PUBLIC))
        .build();
    let view = parse_class_view(&bytes).unwrap();
    assert_eq!(view.fqn, "com.ex.Outer.Inner");
    assert_eq!(view.methods[0].params[0], "com.ex.Outer.Helper");
}

#[test]
fn interface_invocations_are_standard_calls() {
    let bytes = ClassFile::new("com/ex/A")
        .method(
            Method::new("f", "()V", ACC_PUBLIC)
                .line(7)
                .call(INVOKEINTERFACE, "com/ex/Api", "ping", "()V", 8),
        )
        .build();
    let facts = emit_class_facts(&parse_class_view(&bytes).unwrap());

    let call = facts
        .edges
        .iter()
        .find(|e| e.edge_type == EdgeType::Call)
        .unwrap();
    assert_eq!(call.kind, EdgeKind::Standard);
    assert_eq!(call.to_fqn, "com.ex.Api.ping()");
    assert_eq!(call.from_line, Some(8));
}

#[test]
fn garbage_bytes_are_a_decode_error_not_a_panic() {
    assert!(matches!(
        parse_class_view(&[0xDE, 0xAD, 0xBE, 0xEF, 0, 0]),
        Err(ClassParseError::InvalidMagic)
    ));

    // Valid magic, then truncation inside the constant pool.
    let mut truncated = ClassFile::new("com/ex/A").build();
    truncated.truncate(12);
    assert!(parse_class_view(&truncated).is_err());
}
