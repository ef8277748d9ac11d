//! Identity constraints evaluated over whole documents

use std::sync::Arc;

use pretty_assertions::assert_eq;

use xmlschema_automata::documents::Document;
use xmlschema_automata::limits::Limits;
use xmlschema_automata::namespaces::{NamespaceContext, QName};
use xmlschema_automata::validators::{
    AtomicType, Declarations, ElementParticle, IdentityBuilder, IdentityConstraint,
    IdentityValidator, IdentityViolation, Occurs, SimpleType,
};
use xmlschema_automata::xpath::{ActiveAxis, Asttree};
use xmlschema_automata::Error;

const SHOP_NS: &str = "urn:example:shop";

fn shop(local: &str) -> QName {
    QName::namespaced(SHOP_NS, local)
}

fn schema_namespaces() -> NamespaceContext {
    let mut namespaces = NamespaceContext::new();
    namespaces.add_prefix("s", SHOP_NS);
    namespaces
}

fn compile(builder: IdentityBuilder) -> IdentityConstraint {
    builder
        .compile(&schema_namespaces(), &Limits::default())
        .unwrap()
}

fn element(name: QName) -> ElementParticle {
    ElementParticle::new(name, Occurs::once())
}

/// A shop with products keyed by SKU and orders referring to them
fn shop_declarations() -> Declarations {
    let sku = compile(
        IdentityBuilder::key()
            .name(shop("sku"))
            .selector("s:products/s:product")
            .field("@sku"),
    );
    let product_name = compile(
        IdentityBuilder::unique()
            .name(shop("productName"))
            .selector("s:products/s:product")
            .field("s:name")
            .field("s:name/@lang"),
    );
    let ordered = compile(
        IdentityBuilder::keyref()
            .name(shop("ordered"))
            .selector(".//s:line")
            .field("@sku")
            .refer(shop("sku")),
    );

    Declarations::new()
        .with_element(
            element(shop("shop"))
                .with_identity(sku)
                .with_identity(product_name)
                .with_identity(ordered),
        )
        .with_element(element(shop("products")))
        .with_element(element(shop("product")))
        .with_element(element(shop("name")).with_simple_type(AtomicType::Token))
        .with_element(element(shop("orders")))
        .with_element(element(shop("line")))
        .with_attribute(QName::local("sku"), AtomicType::Integer)
        .with_attribute(QName::local("lang"), AtomicType::Language)
}

fn check(xml: &str) -> Vec<IdentityViolation> {
    let document = Document::from_string(xml).unwrap();
    IdentityValidator::new().validate_document(&document, &shop_declarations())
}

#[test]
fn test_valid_shop() {
    let xml = r#"<shop xmlns="urn:example:shop">
  <products>
    <product sku="1"><name lang="en">Kettle</name></product>
    <product sku="2"><name lang="en">Toaster</name></product>
    <product sku="3"><name lang="de">Kettle</name></product>
  </products>
  <orders>
    <order><line sku="1"/><line sku="03"/></order>
  </orders>
</shop>"#;
    assert_eq!(check(xml), vec![]);
}

#[test]
fn test_duplicate_sku_by_value() {
    let xml = r#"<shop xmlns="urn:example:shop">
  <products>
    <product sku="7"><name lang="en">Kettle</name></product>
    <product sku="+007"><name lang="en">Toaster</name></product>
  </products>
</shop>"#;
    let violations = check(xml);
    assert_eq!(violations.len(), 1);
    match &violations[0] {
        IdentityViolation::DuplicateKey {
            constraint,
            line,
            column,
            ..
        } => {
            assert_eq!(constraint, &shop("sku"));
            assert_eq!((*line, *column), (4, 5));
        }
        other => panic!("unexpected violation {:?}", other),
    }
}

#[test]
fn test_unique_across_two_fields() {
    let xml = r#"<shop xmlns="urn:example:shop">
  <products>
    <product sku="1"><name lang="en">  Kettle </name></product>
    <product sku="2"><name lang="en">Kettle</name></product>
    <product sku="3"><name>Kettle</name></product>
    <product sku="4"><name>Kettle</name></product>
  </products>
</shop>"#;
    let violations = check(xml);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].constraint(), &shop("productName"));
}

#[test]
fn test_dangling_order_line() {
    let xml = r#"<shop xmlns="urn:example:shop">
  <products><product sku="1"><name>Kettle</name></product></products>
  <orders><order><line sku="1"/><line sku="9"/></order></orders>
</shop>"#;
    let violations = check(xml);
    assert_eq!(violations.len(), 1);
    match &violations[0] {
        IdentityViolation::UnresolvedKeyref {
            constraint,
            refer,
            key,
            ..
        } => {
            assert_eq!(constraint, &shop("ordered"));
            assert_eq!(refer, &shop("sku"));
            assert_eq!(key, "'9'");
        }
        other => panic!("unexpected violation {:?}", other),
    }
}

#[test]
fn test_missing_sku_and_bad_value() {
    let xml = r#"<shop xmlns="urn:example:shop">
  <products>
    <product><name>Kettle</name></product>
    <product sku="many"><name>Toaster</name></product>
  </products>
</shop>"#;
    let violations = check(xml);
    assert_eq!(violations.len(), 3);
    assert!(matches!(violations[0], IdentityViolation::MissingKey { line: 3, .. }));
    assert!(matches!(violations[1], IdentityViolation::InvalidValue { .. }));
    assert!(matches!(violations[2], IdentityViolation::MissingKey { line: 4, .. }));
}

#[test]
fn test_other_namespace_is_not_selected() {
    let xml = r#"<shop xmlns="urn:example:shop" xmlns:o="urn:other">
  <products>
    <product sku="1"><name>Kettle</name></product>
    <o:product sku="1"/>
  </products>
</shop>"#;
    assert_eq!(check(xml), vec![]);
}

#[test]
fn test_selector_matches_only_at_its_depth() {
    let tree = Asttree::compile("a/b", false, &NamespaceContext::new(), &Limits::default()).unwrap();
    let mut axis = ActiveAxis::new(Arc::new(tree));
    let (a, b) = (QName::local("a"), QName::local("b"));

    assert!(!axis.move_to_start_element(&QName::local("scope")));
    assert!(!axis.move_to_start_element(&a));
    assert!(axis.move_to_start_element(&b));
    assert!(!axis.move_to_start_element(&b));
    axis.end_element(&b);
    axis.end_element(&b);
    assert!(axis.move_to_start_element(&b));
}

#[test]
fn test_descendant_selector_matches_every_depth() {
    // <a><c><b/></c><b/></a>
    let tree = Asttree::compile(".//b", false, &NamespaceContext::new(), &Limits::default()).unwrap();
    let mut axis = ActiveAxis::new(Arc::new(tree));
    let (a, b, c) = (QName::local("a"), QName::local("b"), QName::local("c"));
    assert!(!axis.move_to_start_element(&a));
    assert!(!axis.move_to_start_element(&c));
    assert!(axis.move_to_start_element(&b));
    axis.end_element(&b);
    axis.end_element(&c);
    assert!(axis.move_to_start_element(&b));
    axis.end_element(&b);
    axis.end_element(&a);
    assert!(!axis.is_active());
}

#[test]
fn test_descendant_selector_matches_nested_candidates() {
    let tree = Asttree::compile(".//b", false, &NamespaceContext::new(), &Limits::default()).unwrap();
    let mut axis = ActiveAxis::new(Arc::new(tree));
    let (scope, a, b) = (QName::local("scope"), QName::local("a"), QName::local("b"));

    assert!(!axis.move_to_start_element(&scope));
    assert!(axis.move_to_start_element(&b));
    assert!(!axis.move_to_start_element(&a));
    assert!(axis.move_to_start_element(&b));
    axis.end_element(&b);
    axis.end_element(&a);
    axis.end_element(&b);
    axis.end_element(&scope);
    assert!(!axis.is_active());
}

#[test]
fn test_decimal_keys_compare_by_value() {
    let key = IdentityBuilder::key()
        .name(QName::local("price"))
        .selector("item")
        .field("@price")
        .compile(&NamespaceContext::new(), &Limits::default())
        .unwrap();
    let declarations = Declarations::new()
        .with_element(element(QName::local("list")).with_identity(key))
        .with_attribute(QName::local("price"), SimpleType::atomic(AtomicType::Decimal));

    let document = Document::from_string(r#"<list><item price="1"/><item price="1.0"/></list>"#).unwrap();
    let violations = IdentityValidator::new().validate_document(&document, &declarations);
    assert_eq!(violations.len(), 1);
    assert!(matches!(violations[0], IdentityViolation::DuplicateKey { .. }));

    let untyped = Declarations::new().with_element(
        element(QName::local("list")).with_identity(
            IdentityBuilder::key()
                .name(QName::local("price"))
                .selector("item")
                .field("@price")
                .compile(&NamespaceContext::new(), &Limits::default())
                .unwrap(),
        ),
    );
    assert_eq!(IdentityValidator::new().validate_document(&document, &untyped), vec![]);
}

#[test]
fn test_invalid_constraints_are_rejected() {
    let limits = Limits::default();
    let namespaces = NamespaceContext::new();

    let absolute = IdentityBuilder::key()
        .name(QName::local("k"))
        .selector("/a")
        .field("@id")
        .compile(&namespaces, &limits);
    assert!(matches!(absolute, Err(Error::Parse(_))));

    let unknown_prefix = IdentityBuilder::key()
        .name(QName::local("k"))
        .selector("p:a")
        .field("@id")
        .compile(&namespaces, &limits);
    assert!(matches!(unknown_prefix, Err(Error::Parse(_))));

    let attribute_selector = IdentityBuilder::unique()
        .name(QName::local("u"))
        .selector("a/@id")
        .field(".")
        .compile(&namespaces, &limits);
    assert!(attribute_selector.is_err());
}
