use kiln_ir::ValueType;
use pretty_assertions::assert_eq;

use super::*;

fn to_string(method: &str) -> MethodDescriptor {
    MethodDescriptor::new(method, vec![], ValueType::object("java.lang.String"))
}

#[test]
fn aliases_are_cached_per_symbol() {
    let mut naming = NamingStrategy::readable();
    let first = naming.name_for_class("app.Point");
    let again = naming.name_for_class("app.Point");
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(&*first, "a_Point");
}

#[test]
fn overrides_share_the_virtual_alias() {
    let mut naming = NamingStrategy::minifying();
    let base = naming.name_for_method(&to_string("toString"));
    let other = naming.name_for_method(&to_string("hashCode"));
    assert_eq!(naming.name_for_method(&to_string("toString")), base);
    assert_ne!(base, other);
}

#[test]
fn static_and_instance_fields_are_distinct() {
    let mut naming = NamingStrategy::readable();
    let field = FieldReference::new("app.Point", "x");
    assert_eq!(&*naming.name_for_field(&field), "f_x");
    assert_eq!(&*naming.name_for_static_field(&field), "a_Point_x");
    assert_eq!(&*naming.name_for_field(&field), "f_x");
}

#[test]
fn every_kind_draws_from_the_provider_once() {
    let mut naming = NamingStrategy::minifying();
    let names = [
        naming.name_for_class("A"),
        naming.name_for_function("alloc"),
        naming.name_for_class_init("A"),
        naming.full_name_for(&MethodReference::new("A", to_string("make"))),
        naming.name_for_class("A"),
        naming.name_for_function("alloc"),
    ];
    let names: Vec<&str> = names.iter().map(|name| &**name).collect();
    assert_eq!(names, vec!["a", "b", "c", "d", "a", "b"]);
}

#[test]
fn borrowed_names_hit_the_cache() {
    let mut naming = NamingStrategy::readable();
    let class = String::from("app.Point");
    let function = String::from("rt.alloc");
    let first = (
        naming.name_for_class(&class),
        naming.name_for_function(&function),
        naming.name_for_class_init(&class),
    );
    let again = (
        naming.name_for_class("app.Point"),
        naming.name_for_function("rt.alloc"),
        naming.name_for_class_init("app.Point"),
    );
    assert!(Arc::ptr_eq(&first.0, &again.0));
    assert!(Arc::ptr_eq(&first.1, &again.1));
    assert!(Arc::ptr_eq(&first.2, &again.2));
}
