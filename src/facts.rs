//! Fact emission from decoded classes
//!
//! Translates one [`ClassView`] into the node/edge taxonomy persisted by
//! the store:
//!
//! - nodes: `class` / `interface` / `enum` / `method`
//! - edges: `inheritance` (`extends`, `implements`), `call` (`new`,
//!   `standard`), `member_of` (`method`, `class`, `return`, `argument`)
//!
//! Pervasive base types (the eight primitives, `void`, and anything under
//! `java.lang.`) are excluded from `member_of` edges; they dominate fan-in
//! without carrying signal. All other platform types are retained.

use crate::classfile::{
    ACC_ABSTRACT, ACC_FINAL, ACC_PRIVATE, ACC_PROTECTED, ACC_PUBLIC, ACC_STATIC, ClassView,
    INVOKESPECIAL, MethodView, method_fqn,
};

/// Annotations that mark a method transactional.
const TRANSACTIONAL_ANNOTATIONS: [&str; 3] = [
    "org.springframework.transaction.annotation.Transactional",
    "javax.transaction.Transactional",
    "jakarta.transaction.Transactional",
];

const OVERRIDE_ANNOTATION: &str = "java.lang.Override";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Class,
    Interface,
    Enum,
    Method,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Class => "class",
            NodeType::Interface => "interface",
            NodeType::Enum => "enum",
            NodeType::Method => "method",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeType {
    Inheritance,
    Call,
    MemberOf,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Inheritance => "inheritance",
            EdgeType::Call => "call",
            EdgeType::MemberOf => "member_of",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Extends,
    Implements,
    New,
    Standard,
    Method,
    Class,
    Return,
    Argument,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Extends => "extends",
            EdgeKind::Implements => "implements",
            EdgeKind::New => "new",
            EdgeKind::Standard => "standard",
            EdgeKind::Method => "method",
            EdgeKind::Class => "class",
            EdgeKind::Return => "return",
            EdgeKind::Argument => "argument",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
    Protected,
    Package,
}

impl Visibility {
    pub fn from_access(access: u16) -> Self {
        if access & ACC_PUBLIC != 0 {
            Visibility::Public
        } else if access & ACC_PRIVATE != 0 {
            Visibility::Private
        } else if access & ACC_PROTECTED != 0 {
            Visibility::Protected
        } else {
            Visibility::Package
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Protected => "protected",
            Visibility::Package => "package",
        }
    }
}

/// One node of the fact stream.
#[derive(Debug, Clone)]
pub struct Node {
    pub fqn: String,
    pub node_type: NodeType,
    /// First declared line for methods (-1 without line info); None for
    /// type-level nodes, which class images carry no line for.
    pub line: Option<i64>,
    pub visibility: Visibility,
    pub has_override: bool,
    pub is_transactional: bool,
}

/// One edge of the fact stream. Endpoints are FQNs, not foreign keys;
/// dangling references into unanalyzed libraries are expected.
#[derive(Debug, Clone)]
pub struct Edge {
    pub from_fqn: String,
    pub edge_type: EdgeType,
    pub to_fqn: String,
    pub kind: EdgeKind,
    /// Call-site line for call edges; None otherwise.
    pub from_line: Option<i64>,
}

/// Everything C2 derives from one class image.
#[derive(Debug, Clone)]
pub struct ClassFacts {
    pub class_fqn: String,
    pub node_type: NodeType,
    pub modifiers: Vec<String>,
    pub is_abstract: bool,
    pub is_entity: bool,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Whether a type is excluded from `member_of` edges.
///
/// Exact primitive names plus the `java.lang.` prefix; arrays of
/// primitives (`int[]`) are NOT pervasive, arrays under `java.lang.` are
/// caught by the prefix test.
pub fn is_pervasive(type_name: &str) -> bool {
    matches!(
        type_name,
        "void" | "boolean" | "byte" | "char" | "short" | "int" | "long" | "float" | "double"
    ) || type_name.starts_with("java.lang.")
}

/// Modifier names for the wire protocol, in flag order.
pub fn modifiers_of(access: u16) -> Vec<String> {
    let mut mods = Vec::new();
    if access & ACC_PUBLIC != 0 {
        mods.push("public".to_string());
    }
    if access & ACC_PRIVATE != 0 {
        mods.push("private".to_string());
    }
    if access & ACC_PROTECTED != 0 {
        mods.push("protected".to_string());
    }
    if access & ACC_STATIC != 0 {
        mods.push("static".to_string());
    }
    if access & ACC_FINAL != 0 {
        mods.push("final".to_string());
    }
    if access & ACC_ABSTRACT != 0 {
        mods.push("abstract".to_string());
    }
    mods
}

/// Persistence-entity heuristic: extends an auditable base model, or lives
/// in a `.db.` package (excluding the base model type itself). Annotation
/// only; nothing downstream depends on it for correctness.
fn detect_entity(view: &ClassView) -> bool {
    match &view.super_fqn {
        Some(super_fqn) => {
            super_fqn.contains("AuditableModel")
                || (view.fqn.contains(".db.") && view.fqn != "com.axelor.db.Model")
        }
        None => false,
    }
}

fn class_node_type(view: &ClassView) -> NodeType {
    if view.is_interface() {
        NodeType::Interface
    } else if view.is_enum() {
        NodeType::Enum
    } else {
        NodeType::Class
    }
}

/// Emit the full fact stream for one decoded class.
///
/// # Behavior
/// 1. One class/interface/enum node
/// 2. `inheritance/extends` (implicit `java.lang.Object` omitted) and
///    one `inheritance/implements` per interface
/// 3. `member_of/class` per non-pervasive field type
/// 4. Per method: `member_of/return` and `member_of/argument` for
///    non-pervasive types, the method node, `member_of/method`, then one
///    `call` edge per invocation site
///
/// # Guarantees
/// - Emission order is deterministic and matches declaration order
/// - Synthetic and bridge methods are emitted like any other; filtering
///   them is a query-time concern
pub fn emit_class_facts(view: &ClassView) -> ClassFacts {
    let node_type = class_node_type(view);
    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    nodes.push(Node {
        fqn: view.fqn.clone(),
        node_type,
        line: None,
        visibility: Visibility::from_access(view.access),
        has_override: false,
        is_transactional: false,
    });

    // Implicit java.lang.Object roots are noise; everything extends it.
    if let Some(super_fqn) = &view.super_fqn {
        if super_fqn != "java.lang.Object" {
            edges.push(Edge {
                from_fqn: view.fqn.clone(),
                edge_type: EdgeType::Inheritance,
                to_fqn: super_fqn.clone(),
                kind: EdgeKind::Extends,
                from_line: None,
            });
        }
    }

    for iface in &view.interfaces {
        edges.push(Edge {
            from_fqn: view.fqn.clone(),
            edge_type: EdgeType::Inheritance,
            to_fqn: iface.clone(),
            kind: EdgeKind::Implements,
            from_line: None,
        });
    }

    for field in &view.fields {
        if !is_pervasive(&field.type_name) {
            edges.push(Edge {
                from_fqn: field.type_name.clone(),
                edge_type: EdgeType::MemberOf,
                to_fqn: view.fqn.clone(),
                kind: EdgeKind::Class,
                from_line: None,
            });
        }
    }

    for method in &view.methods {
        emit_method_facts(view, method, &mut nodes, &mut edges);
    }

    ClassFacts {
        class_fqn: view.fqn.clone(),
        node_type,
        modifiers: modifiers_of(view.access),
        is_abstract: view.is_abstract(),
        is_entity: detect_entity(view),
        nodes,
        edges,
    }
}

fn emit_method_facts(
    view: &ClassView,
    method: &MethodView,
    nodes: &mut Vec<Node>,
    edges: &mut Vec<Edge>,
) {
    let fqn = method_fqn(&view.fqn, &method.name, &method.params);

    if !is_pervasive(&method.return_type) {
        edges.push(Edge {
            from_fqn: method.return_type.clone(),
            edge_type: EdgeType::MemberOf,
            to_fqn: fqn.clone(),
            kind: EdgeKind::Return,
            from_line: None,
        });
    }

    // One edge per parameter position; the same type twice yields two edges.
    for param in &method.params {
        if !is_pervasive(param) {
            edges.push(Edge {
                from_fqn: param.clone(),
                edge_type: EdgeType::MemberOf,
                to_fqn: fqn.clone(),
                kind: EdgeKind::Argument,
                from_line: None,
            });
        }
    }

    nodes.push(Node {
        fqn: fqn.clone(),
        node_type: NodeType::Method,
        line: Some(method.line),
        visibility: Visibility::from_access(method.access),
        has_override: method.annotations.iter().any(|a| a == OVERRIDE_ANNOTATION),
        is_transactional: method
            .annotations
            .iter()
            .any(|a| TRANSACTIONAL_ANNOTATIONS.contains(&a.as_str())),
    });

    edges.push(Edge {
        from_fqn: fqn.clone(),
        edge_type: EdgeType::MemberOf,
        to_fqn: view.fqn.clone(),
        kind: EdgeKind::Method,
        from_line: None,
    });

    for call in &method.calls {
        let kind = if call.opcode == INVOKESPECIAL && call.targets_constructor {
            EdgeKind::New
        } else {
            EdgeKind::Standard
        };
        edges.push(Edge {
            from_fqn: fqn.clone(),
            edge_type: EdgeType::Call,
            to_fqn: call.target_fqn.clone(),
            kind,
            from_line: Some(call.line),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::CallSite;

    fn empty_class(fqn: &str) -> ClassView {
        ClassView {
            fqn: fqn.to_string(),
            access: ACC_PUBLIC,
            super_fqn: Some("java.lang.Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    #[test]
    fn pervasive_filter_matches_taxonomy() {
        assert!(is_pervasive("int"));
        assert!(is_pervasive("void"));
        assert!(is_pervasive("java.lang.String"));
        assert!(is_pervasive("java.lang.Object"));
        assert!(is_pervasive("java.lang.String[]"));
        assert!(!is_pervasive("java.util.List"));
        assert!(!is_pervasive("int[]"));
        assert!(!is_pervasive("com.ex.Thing"));
    }

    #[test]
    fn minimal_class_emits_one_node_no_edges() {
        let facts = emit_class_facts(&empty_class("com.ex.Empty"));
        assert_eq!(facts.nodes.len(), 1);
        assert_eq!(facts.nodes[0].fqn, "com.ex.Empty");
        assert_eq!(facts.nodes[0].node_type, NodeType::Class);
        assert_eq!(facts.nodes[0].visibility, Visibility::Public);
        assert!(!facts.nodes[0].has_override);
        assert!(!facts.nodes[0].is_transactional);
        assert!(facts.edges.is_empty());
    }

    #[test]
    fn extends_object_is_omitted_others_kept() {
        let mut view = empty_class("com.ex.Child");
        view.super_fqn = Some("com.ex.Parent".to_string());
        view.interfaces = vec!["com.ex.I1".to_string(), "com.ex.I2".to_string()];

        let facts = emit_class_facts(&view);
        let inh: Vec<_> = facts
            .edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::Inheritance)
            .collect();
        assert_eq!(inh.len(), 3);
        assert_eq!(inh[0].to_fqn, "com.ex.Parent");
        assert_eq!(inh[0].kind, EdgeKind::Extends);
        assert_eq!(inh[1].to_fqn, "com.ex.I1");
        assert_eq!(inh[1].kind, EdgeKind::Implements);
        assert_eq!(inh[2].to_fqn, "com.ex.I2");
    }

    #[test]
    fn method_with_calls_emits_member_and_call_edges() {
        let mut view = empty_class("com.ex.A");
        view.methods.push(MethodView {
            name: "f".to_string(),
            access: ACC_PUBLIC,
            params: Vec::new(),
            return_type: "void".to_string(),
            annotations: Vec::new(),
            line: 3,
            calls: vec![
                CallSite {
                    target_fqn: "com.ex.B.<init>()".to_string(),
                    opcode: INVOKESPECIAL,
                    targets_constructor: true,
                    line: 3,
                },
                CallSite {
                    target_fqn: "com.ex.B.g()".to_string(),
                    opcode: 0xb6,
                    targets_constructor: false,
                    line: 3,
                },
            ],
        });

        let facts = emit_class_facts(&view);
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
        }));
        assert!(facts.edges.iter().any(|e| {
            e.edge_type == EdgeType::Call
                && e.kind == EdgeKind::Standard
                && e.to_fqn == "com.ex.B.g()"
        }));
    }

    #[test]
    fn pervasive_params_and_returns_emit_no_member_edges() {
        let mut view = empty_class("com.ex.A");
        view.methods.push(MethodView {
            name: "m".to_string(),
            access: ACC_PUBLIC,
            params: vec![
                "com.ex.P1".to_string(),
                "java.lang.String".to_string(),
                "int".to_string(),
            ],
            return_type: "com.ex.R".to_string(),
            annotations: Vec::new(),
            line: -1,
            calls: Vec::new(),
        });

        let facts = emit_class_facts(&view);
        let member: Vec<_> = facts
            .edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::MemberOf && e.kind != EdgeKind::Method)
            .collect();
        assert_eq!(member.len(), 2);
        assert!(member
            .iter()
            .any(|e| e.kind == EdgeKind::Return && e.from_fqn == "com.ex.R"));
        assert!(member
            .iter()
            .any(|e| e.kind == EdgeKind::Argument && e.from_fqn == "com.ex.P1"));
    }

    #[test]
    fn annotations_set_override_and_transactional() {
        let mut view = empty_class("com.ex.A");
        view.methods.push(MethodView {
            name: "h".to_string(),
            access: ACC_PROTECTED,
            params: Vec::new(),
            return_type: "void".to_string(),
            annotations: vec![
                "java.lang.Override".to_string(),
                "org.springframework.transaction.annotation.Transactional".to_string(),
            ],
            line: 12,
            calls: Vec::new(),
        });

        let facts = emit_class_facts(&view);
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
    fn duplicate_argument_types_yield_duplicate_edges() {
        let mut view = empty_class("com.ex.A");
        view.methods.push(MethodView {
            name: "pair".to_string(),
            access: ACC_PUBLIC,
            params: vec!["com.ex.P".to_string(), "com.ex.P".to_string()],
            return_type: "void".to_string(),
            annotations: Vec::new(),
            line: -1,
            calls: Vec::new(),
        });

        let facts = emit_class_facts(&view);
        let args = facts
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Argument)
            .count();
        assert_eq!(args, 2);
    }

    #[test]
    fn entity_detection_matches_heuristic() {
        let mut view = empty_class("com.ex.db.Order");
        view.super_fqn = Some("com.axelor.auth.db.AuditableModel".to_string());
        assert!(emit_class_facts(&view).is_entity);

        let mut plain = empty_class("com.ex.service.OrderService");
        plain.super_fqn = Some("java.lang.Object".to_string());
        assert!(!emit_class_facts(&plain).is_entity);
    }
}
